//! Error types shared by the analyzer, emitter and build orchestrator.

use std::path::PathBuf;

/// Errors raised while analyzing a source file or producing its outputs.
///
/// `ParseFailure` is file-scoped: batch builds log it and move on. The other
/// kinds, `ParserUnavailable` included, abort the current invocation.
#[derive(Debug, thiserror::Error)]
pub enum CodegenError {
    /// The parser could not produce a syntax tree for the file.
    #[error("failed to parse {path}: {reason}")]
    ParseFailure {
        /// The file that failed to parse.
        path: PathBuf,
        /// Parser-reported reason.
        reason: String,
    },

    /// The parser itself could not be started, e.g. libclang failed to load.
    #[error("parser library {path} is unavailable: {reason}")]
    ParserUnavailable {
        /// The configured parser library.
        path: PathBuf,
        /// Loader-reported reason.
        reason: String,
    },

    /// A semantic-parent walk ended before reaching the translation unit.
    #[error("scope chain of '{name}' does not end at a translation unit")]
    MalformedScopeChain {
        /// Spelling of the declaration whose chain was walked.
        name: String,
    },

    /// Creating a directory, writing or deleting a file failed.
    #[error("file system error at {path}: {source}")]
    FileSystem {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A required configuration value was not supplied.
    #[error("missing required configuration: {0}")]
    MissingConfiguration(&'static str),

    /// The emitter could not render the generated text.
    #[error("render error: {0}")]
    Render(String),
}

impl CodegenError {
    /// Wraps an I/O error with the path it happened at.
    pub fn fs(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CodegenError::FileSystem {
            path: path.into(),
            source,
        }
    }

    /// True for errors that only invalidate the current file in a batch.
    pub fn is_file_scoped(&self) -> bool {
        matches!(self, CodegenError::ParseFailure { .. })
    }
}
