//! Markdown rendering of run-stopping errors.

use std::path::Path;

use crate::config::CONFIG_FILE_NAME;
use crate::error::Error;

/// ANSI bold on.
const BOLD: &str = "\x1b[1m";
/// ANSI attributes off.
const RESET: &str = "\x1b[0m";

/// Render an error as markdown with bold headings and print to stderr.
pub fn print_error(e: &Error) {
    let md = render_error(e);
    for line in md.lines() {
        if line.starts_with('#') {
            eprintln!("{BOLD}{line}{RESET}");
        } else {
            eprintln!("{line}");
        }
    }
}

/// Render an error as a structured markdown diagnostic: what happened and,
/// where the operator can do something about it, how to fix it.
pub fn render_error(e: &Error) -> String {
    return match e {
        Error::InvalidFilter(err) => render_invalid_filter(err),
        Error::InvalidPattern(err) => format!(
            "\
# Error: Invalid Built-in Pattern

{err}
"
        ),
        Error::Io(err) => format!(
            "\
# Error: I/O

{err}
"
        ),
        Error::LedgerCorrupt { content, line, path } => render_ledger_corrupt(path, *line, content),
        Error::PathNotFound { path } => format!(
            "\
# Error: Path Not Found

`{}` does not exist. No files were changed.
",
            path.display()
        ),
        Error::TomlDe(err) => format!(
            "\
# Error: Invalid {CONFIG_FILE_NAME}

{err}
"
        ),
    };
}

/// Diagnostic for a `--filter` value that does not compile.
fn render_invalid_filter(err: &regex::Error) -> String {
    return format!(
        "\
# Error: Invalid Filter

{err}

## Fix

`--filter` takes a regular expression matched against the symbol, e.g.

    fix-xrefs --filter '^Session\\.' lib/
"
    );
}

/// Diagnostic for an unreadable ledger line.
fn render_ledger_corrupt(path: &Path, line: usize, content: &str) -> String {
    return format!(
        "\
# Error: Ledger Corrupt

Line {line} of `{}` is not a `symbol replacement` record:

    {content}

## Fix

Edit or delete that line, then run again. Every line must hold a symbol,
one space, and the replacement text.
",
        path.display()
    );
}
