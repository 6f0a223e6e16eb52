use dolphin_core::StoreError;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to decode line {line} as UTF-8")]
    InvalidUtf8 { line: usize },

    #[error("Line number {index} is out of bounds. Total lines: {total}")]
    OutOfBounds { index: usize, total: usize },

    #[error("No file is currently open.")]
    NoFileOpen,
}

impl From<DocumentError> for StoreError {
    fn from(err: DocumentError) -> Self {
        match err {
            DocumentError::Io(err) => StoreError::Io(err.to_string()),
            DocumentError::InvalidUtf8 { line } => StoreError::InvalidUtf8(line),
            DocumentError::OutOfBounds { index, total } => StoreError::OutOfBounds { index, total },
            DocumentError::NoFileOpen => StoreError::NoFileOpen,
        }
    }
}

#[derive(Error, Debug)]
pub enum IndexCacheError {
    #[error("index cache I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("index cache is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("file modification time is before the Unix epoch")]
    Timestamp(#[from] std::time::SystemTimeError),
}
