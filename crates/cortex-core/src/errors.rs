//! Error types for the cortex core library.

use std::path::PathBuf;

/// Top-level error enum for the cortex core library.
#[derive(Debug, thiserror::Error)]
pub enum CortexError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Project root does not exist or is not a directory: {}", .0.display())]
    RootMissing(PathBuf),

    #[error("repo-map discovery timed out")]
    Timeout,

    #[error("Store error: {0}")]
    Store(String),
}

#[cfg(feature = "python")]
impl From<CortexError> for pyo3::PyErr {
    fn from(err: CortexError) -> pyo3::PyErr {
        use pyo3::exceptions::{PyIOError, PyRuntimeError, PyValueError};
        match &err {
            CortexError::Io(_) | CortexError::RootMissing(_) => PyIOError::new_err(err.to_string()),
            CortexError::Json(_) | CortexError::Config(_) => PyValueError::new_err(err.to_string()),
            CortexError::Sqlite(_) | CortexError::Timeout | CortexError::Store(_) => {
                PyRuntimeError::new_err(err.to_string())
            }
        }
    }
}

pub type CortexResult<T> = Result<T, CortexError>;
