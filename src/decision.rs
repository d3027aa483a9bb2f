//! Interactive decision engine: one prompt loop per flagged reference.

use std::fmt::Write as _;
use std::path::Path;

use regex::Regex;

use crate::error::Error;
use crate::ledger::{Ledger, LedgerEntry};
use crate::operator::Operator;
use crate::types::{Fragment, LineTokens, ReferenceToken};

/// ANSI bold on.
const BOLD: &str = "\x1b[1m";
/// Command menu printed under every prompt.
const MENU: &str = "\
[s]kip  skip [a]ll of these  skip [f]ile  [w]rite file and stop
[F]inish all files with current instructions  [e]nter new replacement
[1-9] use numbered replacement  [u]se numbered replacement for all future occurrences
[A]pply all unambiguous replacements  [q]uit  [s]? ";
/// ANSI attributes off.
const RESET: &str = "\x1b[0m";
/// Separator between prompt sections.
const RULE: &str = "-----------------------------------------------------------------";
/// ANSI underline on.
const UNDERLINE: &str = "\x1b[4m";

/// Process-wide state for one run. Never persisted.
#[derive(Debug)]
pub struct AppState {
    /// Only symbols matching this are offered for replacement.
    pub filter: Option<Regex>,
    /// Cleared by finish-all: from then on nothing prompts.
    pub prompting: bool,
}

impl AppState {
    /// Fresh state with prompting enabled.
    pub const fn new(filter: Option<Regex>) -> Self {
        return Self {
            filter,
            prompting: true,
        };
    }
}

/// A keystroke command at the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `q`: stop everything now.
    Abort,
    /// `A`: apply every single-choice symbol automatically from now on.
    ApplyAllUnambiguous,
    /// `e`: type a new replacement.
    EnterReplacement,
    /// `F`: stop prompting for the rest of the run.
    FinishAll,
    /// `1`-`9`: use the n-th replacement (one-based).
    Pick(usize),
    /// `s` or Enter: leave this reference alone.
    Skip,
    /// `f`: abandon the current file without writing it.
    SkipFile,
    /// `a`: leave every occurrence of this symbol alone.
    SkipSymbol,
    /// `u`: use a numbered replacement here and for all later occurrences.
    UseForAllFuture,
    /// `w`: write the current file after this line and end the run.
    WriteAndStop,
}

impl Command {
    /// Map a keystroke to its command.
    pub fn from_key(key: char) -> Option<Self> {
        return match key {
            '\n' | 's' => Some(Self::Skip),
            'A' => Some(Self::ApplyAllUnambiguous),
            'F' => Some(Self::FinishAll),
            'a' => Some(Self::SkipSymbol),
            'e' => Some(Self::EnterReplacement),
            'f' => Some(Self::SkipFile),
            'q' => Some(Self::Abort),
            'u' => Some(Self::UseForAllFuture),
            'w' => Some(Self::WriteAndStop),
            digit => digit
                .to_digit(10)
                .and_then(|d| return usize::try_from(d).ok())
                .map(Self::Pick),
        };
    }
}

/// Where the reference sits, for drawing the prompt screen.
pub struct PromptContext<'a> {
    /// Lines of context to show around the current line.
    pub context_lines: usize,
    /// File being processed.
    pub file: &'a Path,
    /// Zero-based index of the current line.
    pub line_index: usize,
    /// Every line of the file, as currently edited.
    pub lines: &'a [String],
    /// Index of the reference within `tokens`.
    pub token_index: usize,
    /// The current line, tokenized.
    pub tokens: &'a LineTokens,
}

/// How one reference was settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Stop the run without writing the current file.
    Abort,
    /// Replace the reference with this text.
    Apply(String),
    /// Leave the reference as it is.
    Skip,
    /// Abandon the current file.
    SkipFile,
    /// Write the current file after this line and end the run.
    WriteAndStop,
}

/// Render the current line with the reference at `token_index` in bold.
fn highlighted(tokens: &LineTokens, token_index: usize) -> String {
    let mut out = String::new();
    for (idx, fragment) in tokens.fragments.iter().enumerate() {
        if idx == token_index {
            out.push_str(BOLD);
            out.push_str(fragment.as_str());
            out.push_str(RESET);
        } else {
            out.push_str(fragment.as_str());
        }
    }
    return out;
}

/// The one-based `number`-th replacement, if there is one.
fn nth_replacement(replacements: &[String], number: usize) -> Option<String> {
    return number
        .checked_sub(1)
        .and_then(|idx| return replacements.get(idx))
        .cloned();
}

/// The reference at `index`, if that fragment is one.
pub fn reference_at(tokens: &LineTokens, index: usize) -> Option<&ReferenceToken> {
    return match tokens.fragments.get(index) {
        Some(Fragment::Reference(token)) => Some(token),
        _ => None,
    };
}

/// Draw the full prompt screen for one reference.
pub fn render_prompt(ctx: &PromptContext<'_>, token: &ReferenceToken, replacements: &[String]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "{UNDERLINE}{}{RESET}", ctx.file.display());
    let _ = writeln!(out);

    let half = ctx.context_lines / 2;
    let start = ctx.line_index.saturating_sub(half);
    let end = ctx.line_index.saturating_add(half).min(ctx.lines.len());
    for idx in start..end {
        let content = if idx == ctx.line_index {
            highlighted(ctx.tokens, ctx.token_index)
        } else {
            ctx.lines.get(idx).cloned().unwrap_or_default()
        };
        let _ = writeln!(out, "{:>4}: {}", idx.saturating_add(1), content.trim_end());
    }

    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "EXISTING TEXT: {}", token.raw);
    let numbered: Vec<String> = replacements
        .iter()
        .enumerate()
        .map(|(idx, text)| return format!("[{}] {text}", idx.saturating_add(1)))
        .collect();
    let _ = writeln!(out, "REPLACEMENTS: {}", numbered.join(" "));
    let _ = writeln!(out, "{RULE}");
    out.push_str(MENU);
    return out;
}

/// Settle one reference, prompting the operator unless the ledger or the
/// run state already decides it.
///
/// # Errors
///
/// Returns `Error::Io` if the terminal or the ledger file fails.
pub fn resolve<O: Operator>(
    ctx: &PromptContext<'_>,
    token: &ReferenceToken,
    ledger: &mut Ledger,
    state: &mut AppState,
    operator: &mut O,
) -> Result<Resolution, Error> {
    if let Some(resolution) = resolve_silently(ledger.entry(&token.symbol), state) {
        log::debug!("{} settled without prompt: {resolution:?}", token.symbol);
        return Ok(resolution);
    }

    // Snapshot so the menu numbering stays stable while the loop runs.
    let mut local = ledger
        .get(&token.symbol)
        .map(|entry| return entry.replacements.clone())
        .unwrap_or_default();

    loop {
        operator.show(&render_prompt(ctx, token, &local))?;
        let Some(key) = operator.read_key()? else {
            return Ok(Resolution::Abort);
        };
        let Some(command) = Command::from_key(key) else {
            operator.notify(&format!("unknown command {key:?}"))?;
            continue;
        };
        log::debug!("{}: {command:?}", token.symbol);

        match command {
            Command::Abort => return Ok(Resolution::Abort),
            Command::ApplyAllUnambiguous => {
                let changed = ledger.apply_all_unambiguous();
                operator.notify(&format!("{changed} symbols will be replaced automatically"))?;
            },
            Command::EnterReplacement => {
                let answer = operator.read_line("Enter replacement text: ")?;
                let text = answer.trim();
                if text.is_empty() {
                    operator.notify("empty replacement ignored")?;
                    continue;
                }
                ledger.record_replacement(&token.symbol, text)?;
                if !local.iter().any(|r| return r == text) {
                    local.push(text.to_string());
                }
            },
            Command::FinishAll => {
                state.prompting = false;
                return Ok(Resolution::Skip);
            },
            Command::Pick(number) => {
                let Some(text) = nth_replacement(&local, number) else {
                    operator.notify(&format!("no such replacement {number}"))?;
                    continue;
                };
                ledger.record_replacement(&token.symbol, &text)?;
                return Ok(Resolution::Apply(text));
            },
            Command::Skip => return Ok(Resolution::Skip),
            Command::SkipFile => return Ok(Resolution::SkipFile),
            Command::SkipSymbol => {
                ledger.entry(&token.symbol).skip_all = true;
                return Ok(Resolution::Skip);
            },
            Command::UseForAllFuture => {
                let answer = operator.read_line("Enter number of replacement: ")?;
                let Ok(number) = answer.trim().parse::<usize>() else {
                    operator.notify(&format!("not a number: {answer}"))?;
                    continue;
                };
                let Some(text) = nth_replacement(&local, number) else {
                    operator.notify(&format!("no such replacement {number}"))?;
                    continue;
                };
                ledger.record_replacement(&token.symbol, &text)?;
                let entry = ledger.entry(&token.symbol);
                entry.apply_all = entry.replacements.iter().position(|r| return *r == text);
                entry.suppress_prompt = true;
                return Ok(Resolution::Apply(text));
            },
            Command::WriteAndStop => return Ok(Resolution::WriteAndStop),
        }
    }
}

/// Decide a reference from policy alone, or `None` if the operator must be asked.
fn resolve_silently(entry: &LedgerEntry, state: &AppState) -> Option<Resolution> {
    if entry.skip_all {
        return Some(Resolution::Skip);
    }
    if (entry.suppress_prompt || !state.prompting)
        && let Some(text) = entry.applied()
    {
        return Some(Resolution::Apply(text.to_string()));
    }
    if !state.prompting {
        return Some(Resolution::Skip);
    }
    return None;
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, reason = "test code")]
#[allow(clippy::unwrap_used, reason = "test code")]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::config::Config;
    use crate::operator::StreamOperator;
    use crate::tokenizer::Tokenizer;

    struct Fixture {
        _dir: tempfile::TempDir,
        ledger: Ledger,
        ledger_path: PathBuf,
        lines: Vec<String>,
        state: AppState,
        tokens: LineTokens,
    }

    impl Fixture {
        fn new(line: &str, log: &str) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let ledger_path = dir.path().join("fix_xref_state.txt");
            std::fs::write(&ledger_path, log).unwrap();
            let ledger = Ledger::restore(&ledger_path).unwrap();
            let tokens = Tokenizer::new(&Config::default()).unwrap().tokenize(line, None).unwrap();
            return Self {
                _dir: dir,
                ledger,
                ledger_path,
                lines: vec![line.to_string()],
                state: AppState::new(None),
                tokens,
            };
        }

        fn first_reference(&self) -> (usize, ReferenceToken) {
            let idx = self
                .tokens
                .fragments
                .iter()
                .position(|f| return matches!(f, Fragment::Reference(_)))
                .unwrap();
            return (idx, reference_at(&self.tokens, idx).unwrap().clone());
        }

        fn run(&mut self, script: &str) -> (Resolution, String) {
            let (token_index, token) = self.first_reference();
            let ctx = PromptContext {
                context_lines: 12,
                file: Path::new("doc/intro.rst"),
                line_index: 0,
                lines: &self.lines,
                token_index,
                tokens: &self.tokens,
            };
            let mut output = Vec::new();
            let mut operator = StreamOperator::new(script.as_bytes(), &mut output);
            let resolution =
                resolve(&ctx, &token, &mut self.ledger, &mut self.state, &mut operator).unwrap();
            return (resolution, String::from_utf8(output).unwrap());
        }

        fn log(&self) -> String {
            return std::fs::read_to_string(&self.ledger_path).unwrap();
        }
    }

    #[test]
    fn keys_map_to_commands() {
        assert_eq!(Command::from_key('\n'), Some(Command::Skip));
        assert_eq!(Command::from_key('s'), Some(Command::Skip));
        assert_eq!(Command::from_key('3'), Some(Command::Pick(3)));
        assert_eq!(Command::from_key('F'), Some(Command::FinishAll));
        assert_eq!(Command::from_key('A'), Some(Command::ApplyAllUnambiguous));
        assert_eq!(Command::from_key('x'), None);
    }

    #[test]
    fn enter_then_pick_records_once() {
        let mut fx = Fixture::new("See :meth:`.Foo.bar` for details.\n", "");
        let (resolution, screen) = fx.run("eWidget.bar\n1");
        assert_eq!(resolution, Resolution::Apply("Widget.bar".to_string()));
        assert!(screen.contains("REPLACEMENTS: [1] Widget.bar"));
        assert!(screen.contains("EXISTING TEXT: :meth:`.Foo.bar`"));
        assert_eq!(fx.log(), "Foo.bar Widget.bar\n");
    }

    #[test]
    fn skip_appends_nothing() {
        let mut fx = Fixture::new("See :meth:`.Foo.bar` for details.\n", "");
        assert_eq!(fx.run("s").0, Resolution::Skip);
        assert_eq!(fx.run("\n").0, Resolution::Skip);
        assert_eq!(fx.log(), "");
    }

    #[test]
    fn skip_symbol_silences_later_occurrences() {
        let mut fx = Fixture::new(":class:`.Foo`\n", "");
        assert_eq!(fx.run("a").0, Resolution::Skip);
        // no input left: a prompt would resolve as abort
        assert_eq!(fx.run("").0, Resolution::Skip);
    }

    #[test]
    fn use_for_all_future_applies_silently_afterwards() {
        let mut fx = Fixture::new(":class:`.Foo`\n", "Foo Bar\nFoo Baz\n");
        let (resolution, _) = fx.run("u2\n");
        assert_eq!(resolution, Resolution::Apply("Baz".to_string()));
        assert_eq!(fx.ledger.get("Foo").unwrap().apply_all, Some(1));
        assert_eq!(fx.run("").0, Resolution::Apply("Baz".to_string()));
        assert_eq!(fx.log(), "Foo Bar\nFoo Baz\n");
    }

    #[test]
    fn bad_numbers_reprompt() {
        let mut fx = Fixture::new(":class:`.Foo`\n", "Foo Bar\n");
        let (resolution, screen) = fx.run("9unope\nu0\n1");
        assert_eq!(resolution, Resolution::Apply("Bar".to_string()));
        assert!(screen.contains("no such replacement 9"));
        assert!(screen.contains("not a number: nope"));
        assert!(screen.contains("no such replacement 0"));
    }

    #[test]
    fn empty_replacement_is_ignored() {
        let mut fx = Fixture::new(":class:`.Foo`\n", "");
        let (resolution, screen) = fx.run("e  \ns");
        assert_eq!(resolution, Resolution::Skip);
        assert!(screen.contains("empty replacement ignored"));
        assert_eq!(fx.log(), "");
    }

    #[test]
    fn finish_all_stops_prompting_but_keeps_apply_all() {
        let mut fx = Fixture::new(":class:`.Foo`\n", "Foo Bar\n");
        assert_eq!(fx.run("F").0, Resolution::Skip);
        assert!(!fx.state.prompting);
        assert_eq!(fx.run("").0, Resolution::Skip);

        fx.ledger.entry("Foo").apply_all = Some(0);
        assert_eq!(fx.run("").0, Resolution::Apply("Bar".to_string()));
    }

    #[test]
    fn apply_all_unambiguous_leaves_current_token_open() {
        let mut fx = Fixture::new(":class:`.B`\n", "A A2\nB B1\nB B2\n");
        let (resolution, screen) = fx.run("As");
        assert_eq!(resolution, Resolution::Skip);
        assert!(screen.contains("1 symbols will be replaced automatically"));

        let a = fx.ledger.get("A").unwrap();
        assert_eq!(a.applied(), Some("A2"));
        assert!(a.suppress_prompt);
        let b = fx.ledger.get("B").unwrap();
        assert_eq!(b.apply_all, None);

        // B still prompts: with no input the prompt resolves as abort
        assert_eq!(fx.run("").0, Resolution::Abort);
    }

    #[test]
    fn quit_and_end_of_input_abort() {
        let mut fx = Fixture::new(":class:`.Foo`\n", "");
        assert_eq!(fx.run("q").0, Resolution::Abort);
        assert_eq!(fx.run("").0, Resolution::Abort);
    }

    #[test]
    fn file_level_commands_pass_through() {
        let mut fx = Fixture::new(":class:`.Foo`\n", "");
        assert_eq!(fx.run("f").0, Resolution::SkipFile);
        assert_eq!(fx.run("w").0, Resolution::WriteAndStop);
    }

    #[test]
    fn unknown_key_is_reported() {
        let mut fx = Fixture::new(":class:`.Foo`\n", "");
        let (resolution, screen) = fx.run("zs");
        assert_eq!(resolution, Resolution::Skip);
        assert!(screen.contains("unknown command 'z'"));
    }

    #[test]
    fn prompt_shows_numbered_context() {
        let lines: Vec<String> = (1..=20).map(|n| return format!("line {n}\n")).collect();
        let tokens = Tokenizer::new(&Config::default())
            .unwrap()
            .tokenize("line :class:`.Foo`\n", None)
            .unwrap();
        let (token_index, token) = tokens
            .fragments
            .iter()
            .enumerate()
            .find_map(|(i, f)| {
                return match f {
                    Fragment::Reference(r) => Some((i, r.clone())),
                    Fragment::Text(_) => None,
                };
            })
            .unwrap();
        let ctx = PromptContext {
            context_lines: 12,
            file: Path::new("lib/orm.py"),
            line_index: 9,
            lines: &lines,
            token_index,
            tokens: &tokens,
        };
        let screen = render_prompt(&ctx, &token, &[]);
        assert!(screen.contains("   4: line 4"));
        assert!(!screen.contains("   3: line 3"));
        assert!(screen.contains(&format!("  10: line {BOLD}:class:`.Foo`{RESET}")));
        assert!(screen.contains("  15: line 15"));
        assert!(!screen.contains("  16: line 16"));
    }
}
