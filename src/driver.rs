//! File and tree driver: walks inputs, runs every line through
//! tokenize → decide → reformat, and writes changed files back.

use std::path::{Path, PathBuf};

use regex::Regex;
use walkdir::WalkDir;

use crate::config::Config;
use crate::decision::{self, AppState, PromptContext, Resolution};
use crate::error::Error;
use crate::ledger::Ledger;
use crate::operator::Operator;
use crate::reformat::Reformatter;
use crate::tokenizer::Tokenizer;
use crate::types::{FileKind, LineTokens};

/// What happened to one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    /// The operator quit; nothing was written.
    Aborted,
    /// Skipped by the operator or unreadable; nothing was written.
    Skipped,
    /// The operator asked to write and stop the run.
    Stopped {
        /// Whether the file had changes and was written.
        written: bool,
    },
    /// Processed with no changes.
    Unchanged,
    /// Processed and written back.
    Written,
}

/// What happened to one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineOutcome {
    /// Stop the run immediately.
    Abort,
    /// The line (or its underline) was rewritten.
    Changed,
    /// Abandon the file.
    SkipFile,
    /// Nothing to do.
    Unchanged,
    /// Write the file after this line and stop the run.
    WriteAndStop {
        /// Whether this line was rewritten before stopping.
        changed: bool,
    },
}

/// Totals reported at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// The operator quit before the inputs were exhausted.
    pub aborted: bool,
    /// Files read and processed.
    pub files_scanned: usize,
    /// Files written back.
    pub files_written: usize,
    /// References replaced, including silently applied ones.
    pub replacements: usize,
}

/// One run over a batch of inputs. The ledger and run state carry across
/// every file in the batch.
pub struct Session<O> {
    /// Run configuration.
    config: Config,
    /// Replacement history.
    ledger: Ledger,
    /// Who answers the prompts.
    operator: O,
    /// Re-renders substituted lines.
    reformatter: Reformatter,
    /// Prompting switch and symbol filter.
    state: AppState,
    /// Running totals.
    summary: RunSummary,
    /// Finds references on each line.
    tokenizer: Tokenizer,
}

impl<O: Operator> Session<O> {
    /// Run one line through the pipeline, rewriting it in `lines` when any
    /// reference on it was replaced.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the operator terminal or the ledger fails.
    fn handle_line(
        &mut self,
        path: &Path,
        kind: FileKind,
        lines: &mut [String],
        index: usize,
    ) -> Result<LineOutcome, Error> {
        let Some(line) = lines.get(index) else {
            return Ok(LineOutcome::Unchanged);
        };
        let Some(mut tokens) = self.tokenizer.tokenize(line, self.state.filter.as_ref()) else {
            return Ok(LineOutcome::Unchanged);
        };

        let mut replaced = false;
        let mut stop = false;
        for token_index in 0..tokens.fragments.len() {
            let Some(token) = decision::reference_at(&tokens, token_index).cloned() else {
                continue;
            };
            let ctx = PromptContext {
                context_lines: self.config.context_lines,
                file: path,
                line_index: index,
                lines,
                token_index,
                tokens: &tokens,
            };
            match decision::resolve(&ctx, &token, &mut self.ledger, &mut self.state, &mut self.operator)? {
                Resolution::Abort => return Ok(LineOutcome::Abort),
                Resolution::Apply(text) => {
                    replaced |= tokens.replace(token_index, &text);
                    self.summary.replacements = self.summary.replacements.saturating_add(1);
                },
                Resolution::Skip => {},
                Resolution::SkipFile => return Ok(LineOutcome::SkipFile),
                Resolution::WriteAndStop => {
                    stop = true;
                    break;
                },
            }
        }

        let changed = replaced && self.rewrite_line(kind, &tokens, lines, index);
        if stop {
            return Ok(LineOutcome::WriteAndStop { changed });
        }
        return Ok(if changed { LineOutcome::Changed } else { LineOutcome::Unchanged });
    }

    /// Start a session, replaying the ledger named in the config.
    ///
    /// # Errors
    ///
    /// Returns `Error::LedgerCorrupt` or `Error::Io` from the ledger, or
    /// `Error::InvalidPattern` if a built-in pattern fails to compile.
    pub fn new(config: Config, filter: Option<Regex>, operator: O) -> Result<Self, Error> {
        let ledger = Ledger::restore(&config.ledger)?;
        let tokenizer = Tokenizer::new(&config)?;
        let reformatter = Reformatter::new(config.width)?;
        return Ok(Self {
            config,
            ledger,
            operator,
            reformatter,
            state: AppState::new(filter),
            summary: RunSummary::default(),
            tokenizer,
        });
    }

    /// Process a single file and write it back if anything changed.
    /// Files that cannot be read as UTF-8 text are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the file cannot be written, or if the
    /// operator terminal or the ledger fails.
    pub fn process_file(&mut self, path: &Path, kind: FileKind) -> Result<FileOutcome, Error> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                log::warn!("skipping {}: {e}", path.display());
                return Ok(FileOutcome::Skipped);
            },
        };
        log::debug!("processing {} as {kind:?}", path.display());

        let mut lines: Vec<String> = content.split_inclusive('\n').map(String::from).collect();
        let mut dirty = false;
        let mut stopped = false;

        for index in 0..lines.len() {
            match self.handle_line(path, kind, &mut lines, index)? {
                LineOutcome::Abort => return Ok(FileOutcome::Aborted),
                LineOutcome::Changed => dirty = true,
                LineOutcome::SkipFile => return Ok(FileOutcome::Skipped),
                LineOutcome::Unchanged => {},
                LineOutcome::WriteAndStop { changed } => {
                    dirty |= changed;
                    stopped = true;
                    break;
                },
            }
        }

        if dirty {
            eprintln!("Writing {}..", path.display());
            std::fs::write(path, lines.concat())?;
            log::info!("wrote {} ({} lines)", path.display(), lines.len());
        }

        if stopped {
            return Ok(FileOutcome::Stopped { written: dirty });
        }
        return Ok(if dirty { FileOutcome::Written } else { FileOutcome::Unchanged });
    }

    /// Reformat a substituted line into `lines`, resizing the following
    /// underline if needed. Returns whether anything actually changed.
    fn rewrite_line(
        &self,
        kind: FileKind,
        tokens: &LineTokens,
        lines: &mut [String],
        index: usize,
    ) -> bool {
        let next = lines.get(index.saturating_add(1)).map(String::as_str);
        let out = self.reformatter.reformat(kind, tokens, next);
        let mut changed = false;

        if let Some(underline) = out.underline
            && let Some(slot) = lines.get_mut(index.saturating_add(1))
        {
            *slot = underline;
            changed = true;
        }
        if let Some(slot) = lines.get_mut(index)
            && *slot != out.line
        {
            *slot = out.line;
            changed = true;
        }
        return changed;
    }

    /// Process every input path in order. Every path is checked for
    /// existence before any file is touched.
    ///
    /// # Errors
    ///
    /// Returns `Error::PathNotFound` for a missing input, or any error from
    /// [`Session::process_file`].
    pub fn run(&mut self, paths: &[PathBuf]) -> Result<RunSummary, Error> {
        if let Some(missing) = paths.iter().find(|p| return !p.exists()) {
            return Err(Error::PathNotFound { path: missing.clone() });
        }

        for path in paths {
            for (file, kind) in collect_files(path, &self.config) {
                self.summary.files_scanned = self.summary.files_scanned.saturating_add(1);
                match self.process_file(&file, kind)? {
                    FileOutcome::Aborted => {
                        self.summary.aborted = true;
                        return Ok(self.summary.clone());
                    },
                    FileOutcome::Skipped | FileOutcome::Unchanged => {},
                    FileOutcome::Stopped { written } => {
                        if written {
                            self.summary.files_written = self.summary.files_written.saturating_add(1);
                        }
                        return Ok(self.summary.clone());
                    },
                    FileOutcome::Written => {
                        self.summary.files_written = self.summary.files_written.saturating_add(1);
                    },
                }
            }
        }

        return Ok(self.summary.clone());
    }
}

/// Expand one input into the files to process. Directories are walked
/// recursively in file-name order, keeping `.py` and `.rst` files that pass
/// the config's include/exclude prefixes. A file named directly is always
/// processed; an unrecognized suffix is treated as prose.
pub fn collect_files(path: &Path, config: &Config) -> Vec<(PathBuf, FileKind)> {
    if !path.is_dir() {
        let kind = FileKind::for_path(path).unwrap_or(FileKind::Prose);
        return vec![(path.to_path_buf(), kind)];
    }

    return WalkDir::new(path)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| return e.file_type().is_file())
        .filter_map(|e| {
            let kind = FileKind::for_path(e.path())?;
            let relative = e.path().strip_prefix(path).unwrap_or(e.path());
            if !config.should_scan(&relative.to_string_lossy()) {
                return None;
            }
            return Some((e.into_path(), kind));
        })
        .collect();
}
