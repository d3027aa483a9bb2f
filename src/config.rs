use std::path::{Path, PathBuf};

use crate::error::Error;

/// Name of the optional config file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".fix_xrefs.toml";

/// Default ledger file name, relative to the working directory.
const DEFAULT_LEDGER: &str = "fix_xref_state.txt";

/// Run configuration loaded from `.fix_xrefs.toml`.
/// Include/exclude patterns are path prefixes applied to files found while
/// walking a directory; explicitly named files are always processed.
#[derive(Debug, Clone)]
pub struct Config {
    /// Lines of context shown around the current line at the prompt.
    pub context_lines: usize,
    /// Path prefixes excluded from directory walks.
    exclude: Vec<String>,
    /// Path prefixes a walked file must start with, if any are given.
    include: Vec<String>,
    /// Append-only replacement log.
    pub ledger: PathBuf,
    /// How many package qualifier components a reference may carry and
    /// still be offered for replacement.
    pub max_package_qualifiers: usize,
    /// How qualified symbols split into package qualifier and target.
    pub split: SplitRule,
    /// Maximum rendered width for rewrapped source lines.
    pub width: usize,
}

/// Raw TOML structure for `.fix_xrefs.toml`.
#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct FixXrefsTomlConfig {
    /// See [`Config::context_lines`].
    #[serde(default = "default_context_lines")]
    context_lines: usize,
    /// See [`Config::exclude`].
    #[serde(default)]
    exclude: Vec<String>,
    /// See [`Config::include`].
    #[serde(default)]
    include: Vec<String>,
    /// See [`Config::ledger`].
    #[serde(default = "default_ledger")]
    ledger: PathBuf,
    /// See [`Config::max_package_qualifiers`].
    #[serde(default)]
    max_package_qualifiers: usize,
    /// See [`Config::split`].
    #[serde(default)]
    split: SplitRule,
    /// See [`Config::width`].
    #[serde(default = "default_width")]
    width: usize,
}

/// Policy deciding which trailing components of a dotted symbol name the
/// entity itself and which leading ones are its package qualifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SplitRule {
    /// Role-aware: methods and attributes keep their class, parameter
    /// references keep their function and an uppercase class name.
    #[default]
    ByRole,
    /// Only the final component is the target.
    LastComponent,
}

impl Config {
    /// Load config from `.fix_xrefs.toml` in the given directory.
    /// Returns defaults if the file doesn't exist. A file that exists but is
    /// malformed is an error; it never silently falls back to defaults.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if reading fails (other than not-found),
    /// or `Error::TomlDe` if the TOML is malformed.
    pub fn load(root: &Path) -> Result<Self, Error> {
        let path = root.join(CONFIG_FILE_NAME);
        let content = match std::fs::read_to_string(&path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(Error::Io(e)),
            Ok(c) => c,
        };
        return Self::parse(&content);
    }

    /// Parse config from TOML content.
    ///
    /// # Errors
    ///
    /// Returns `Error::TomlDe` if the TOML is malformed or has unknown keys.
    pub fn parse(content: &str) -> Result<Self, Error> {
        let raw: FixXrefsTomlConfig = toml::from_str(content)?;
        return Ok(Self {
            context_lines: raw.context_lines,
            exclude: raw.exclude,
            include: raw.include,
            ledger: raw.ledger,
            max_package_qualifiers: raw.max_package_qualifiers,
            split: raw.split,
            width: raw.width,
        });
    }

    /// Check whether a walked file should be processed.
    ///
    /// A path is included if no include patterns are set, or if it starts
    /// with at least one include pattern. An included path is then excluded
    /// if it starts with any exclude pattern.
    pub fn should_scan(&self, relative_path: &str) -> bool {
        let included = self.include.is_empty()
            || self.include.iter().any(|p| return relative_path.starts_with(p.as_str()));

        if !included {
            return false;
        }

        return !self.exclude.iter().any(|p| return relative_path.starts_with(p.as_str()));
    }
}

impl Default for Config {
    fn default() -> Self {
        return Self {
            context_lines: default_context_lines(),
            exclude: Vec::new(),
            include: Vec::new(),
            ledger: default_ledger(),
            max_package_qualifiers: 0,
            split: SplitRule::ByRole,
            width: default_width(),
        };
    }
}

/// Twelve lines of context: six above and six below the current line.
const fn default_context_lines() -> usize {
    return 12;
}

/// `fix_xref_state.txt` in the working directory.
fn default_ledger() -> PathBuf {
    return PathBuf::from(DEFAULT_LEDGER);
}

/// Classic 79-column limit.
const fn default_width() -> usize {
    return 79;
}
