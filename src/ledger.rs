//! Replacement ledger: per-symbol replacement history backed by an
//! append-only log of `symbol replacement` lines.

use std::collections::HashMap;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use crate::error::Error;

/// Everything known about one symbol during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerEntry {
    /// Index into `replacements` applied automatically to later occurrences.
    pub apply_all: Option<usize>,
    /// Distinct replacement texts in the order they were first entered.
    pub replacements: Vec<String>,
    /// Never prompt for this symbol again during the run.
    pub skip_all: bool,
    /// Apply `apply_all` without showing the prompt.
    pub suppress_prompt: bool,
}

impl LedgerEntry {
    /// The replacement selected by `apply_all`, if any.
    pub fn applied(&self) -> Option<&str> {
        return self
            .apply_all
            .and_then(|idx| return self.replacements.get(idx))
            .map(String::as_str);
    }
}

/// Replacement history keyed by symbol portion. Only replacement texts are
/// persisted; `apply_all`, `skip_all` and `suppress_prompt` last one run.
#[derive(Debug)]
pub struct Ledger {
    /// Symbol portion to its entry.
    entries: HashMap<String, LedgerEntry>,
    /// The append-only log file.
    path: PathBuf,
}

impl Ledger {
    /// Promote every symbol with exactly one replacement and no `apply_all`
    /// to apply that replacement silently from now on.
    /// Returns how many entries changed.
    pub fn apply_all_unambiguous(&mut self) -> usize {
        let mut changed = 0_usize;
        for entry in self.entries.values_mut() {
            if entry.apply_all.is_none() && entry.replacements.len() == 1 {
                entry.apply_all = Some(0);
                entry.suppress_prompt = true;
                changed = changed.saturating_add(1);
            }
        }
        return changed;
    }

    /// Look up a symbol, creating an empty entry on first encounter.
    pub fn entry(&mut self, symbol: &str) -> &mut LedgerEntry {
        return self.entries.entry(symbol.to_string()).or_default();
    }

    /// Look up a symbol without creating it.
    pub fn get(&self, symbol: &str) -> Option<&LedgerEntry> {
        return self.entries.get(symbol);
    }

    /// Rebuild a ledger by replaying log content. `path` is where later
    /// records are appended.
    ///
    /// # Errors
    ///
    /// Returns `Error::LedgerCorrupt` for a line that does not split into a
    /// non-empty symbol and a non-empty replacement.
    pub fn parse(path: &Path, content: &str) -> Result<Self, Error> {
        let mut entries: HashMap<String, LedgerEntry> = HashMap::new();

        for (idx, line) in content.lines().enumerate() {
            let Some((symbol, text)) = split_record(line) else {
                return Err(Error::LedgerCorrupt {
                    content: line.to_string(),
                    line: idx.saturating_add(1),
                    path: path.to_path_buf(),
                });
            };
            let entry = entries.entry(symbol.to_string()).or_default();
            if !entry.replacements.iter().any(|r| return r == text) {
                entry.replacements.push(text.to_string());
            }
        }

        return Ok(Self {
            entries,
            path: path.to_path_buf(),
        });
    }

    /// Add a replacement for a symbol. New texts are appended to the log
    /// immediately; the file is opened and closed for each record.
    /// Returns `false` if the text was already known for the symbol.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the log cannot be opened or written.
    pub fn record_replacement(&mut self, symbol: &str, text: &str) -> Result<bool, Error> {
        let entry = self.entries.entry(symbol.to_string()).or_default();
        if entry.replacements.iter().any(|r| return r == text) {
            return Ok(false);
        }
        entry.replacements.push(text.to_string());

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{symbol} {text}")?;
        log::debug!("recorded {symbol} -> {text} in {}", self.path.display());

        return Ok(true);
    }

    /// Read and replay the log at `path`. A missing log is an empty ledger.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` for read failures other than not-found, or
    /// `Error::LedgerCorrupt` for an unsplittable line.
    pub fn restore(path: &Path) -> Result<Self, Error> {
        let content = match std::fs::read_to_string(path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(Error::Io(e)),
            Ok(c) => c,
        };
        let ledger = Self::parse(path, &content)?;
        log::info!("restored {} symbols from {}", ledger.symbol_count(), path.display());
        return Ok(ledger);
    }

    /// Number of symbols with an entry.
    pub fn symbol_count(&self) -> usize {
        return self.entries.len();
    }
}

/// Split one log line into `(symbol, replacement)`.
fn split_record(line: &str) -> Option<(&str, &str)> {
    let (symbol, text) = line.trim().split_once(' ')?;
    if symbol.is_empty() || text.trim().is_empty() {
        return None;
    }
    return Some((symbol, text.trim()));
}
