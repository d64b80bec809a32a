use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur in the test-data store.
#[derive(Debug, Error)]
pub enum TestDataError {
    /// No record exists at the expected path.
    #[error("no test data record at {}", path.display())]
    Missing { path: PathBuf },

    /// A record exists but cannot be parsed.
    #[error("corrupt test data record at {}: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The value could not be serialized.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TestDataError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TestDataError::Io {
            path: path.into(),
            source,
        }
    }
}
