//! Journal errors

use thiserror::Error;

/// Errors from the journal store/reader
#[derive(Error, Debug)]
pub enum JournalError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
