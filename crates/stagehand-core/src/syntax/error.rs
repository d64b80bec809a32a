use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading a Go test package.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The directory parsed fine but contains no file declaring the package.
    #[error("{} does not have go package {name}", path.display())]
    PackageNotFound { path: PathBuf, name: String },

    /// A source file does not parse.
    #[error("syntax error in {}", path.display())]
    Syntax { path: PathBuf },

    /// The tree-sitter grammar could not be loaded.
    #[error("Go grammar error: {0}")]
    Grammar(String),

    /// IO error.
    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ParseError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ParseError::Io {
            path: path.into(),
            source,
        }
    }
}
