//! `fix-xrefs`: walk Python and reST sources and interactively rewrite
//! Sphinx cross-reference markup, remembering every answer in a ledger.

mod config;
mod decision;
mod diagnostics;
mod driver;
mod error;
mod ledger;
mod operator;
mod reformat;
mod tokenizer;
mod types;

use std::io::IsTerminal as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use regex::Regex;

use crate::config::Config;
use crate::driver::{RunSummary, Session};
use crate::error::Error;
use crate::operator::{StreamOperator, TtyOperator};

/// Command-line arguments.
#[derive(Parser)]
#[command(
    name = "fix-xrefs",
    about = "Interactively rewrite Sphinx cross-references in .py and .rst files"
)]
struct Cli {
    /// Only offer symbols matching this regular expression
    #[arg(long, value_name = "REGEX")]
    filter: Option<String>,
    /// Files or directories to process, in order
    #[arg(required = true, value_name = "PATH")]
    paths: Vec<PathBuf>,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    return match run(&cli) {
        Ok(summary) => {
            report(&summary);
            ExitCode::SUCCESS
        },
        Err(e) => {
            diagnostics::print_error(&e);
            ExitCode::FAILURE
        },
    };
}

/// Print end-of-run totals to stderr.
fn report(summary: &RunSummary) {
    if summary.aborted {
        eprintln!("Aborted.");
    }
    eprintln!(
        "{} files scanned, {} written, {} references replaced",
        summary.files_scanned, summary.files_written, summary.replacements
    );
}

/// Load config and ledger, then process every path with the operator
/// attached to stdin.
///
/// # Errors
///
/// Returns config, filter, ledger, path and I/O errors from the run.
fn run(cli: &Cli) -> Result<RunSummary, Error> {
    let config = Config::load(Path::new("."))?;
    let filter = cli
        .filter
        .as_deref()
        .map(Regex::new)
        .transpose()
        .map_err(Error::InvalidFilter)?;
    log::debug!("config: {config:?}");

    let stdin = std::io::stdin();
    if stdin.is_terminal() {
        return Session::new(config, filter, TtyOperator::new())?.run(&cli.paths);
    }
    let operator = StreamOperator::new(stdin.lock(), std::io::stdout());
    return Session::new(config, filter, operator)?.run(&cli.paths);
}
