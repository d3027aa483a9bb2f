/// Crate-level error types for fix-xrefs diagnostics.
use std::path::PathBuf;

/// Errors that stop a run. Operator mistakes at the prompt (bad numbers,
/// unknown keys) are reported inline and never become an `Error`.
#[allow(clippy::error_impl_error, reason = "crate-internal error type in binary")]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The `--filter` argument is not a valid regular expression.
    #[error("invalid filter: {0}")]
    InvalidFilter(
        /// The wrapped regex compilation error.
        regex::Error,
    ),

    /// One of the built-in recognition patterns failed to compile.
    #[error("invalid pattern: {0}")]
    InvalidPattern(
        /// The wrapped regex compilation error.
        #[from]
        regex::Error,
    ),

    /// Underlying I/O error from the filesystem or terminal.
    #[error("io: {0}")]
    Io(
        /// The wrapped I/O error.
        #[from]
        std::io::Error,
    ),

    /// A ledger line could not be split into `symbol replacement`.
    #[error("ledger corrupt: {}:{line}: `{content}`", path.display())]
    LedgerCorrupt {
        /// The offending line, verbatim.
        content: String,
        /// One-based line number within the ledger file.
        line: usize,
        /// Path to the ledger file.
        path: PathBuf,
    },

    /// A path given on the command line does not exist.
    #[error("path not found: {}", path.display())]
    PathNotFound {
        /// The missing path.
        path: PathBuf,
    },

    /// TOML deserialization of the config file failed.
    #[error("toml deserialize: {0}")]
    TomlDe(
        /// The wrapped TOML deserialization error.
        #[from]
        toml::de::Error,
    ),
}
