//! Contract between the viewer engine and the backend that indexes a file
//! and serves its lines.

use crate::session::SessionId;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Backend line store.
///
/// Every method may block on disk IO; drivers run them off the UI thread and
/// hand the results back to the engine through its `apply_*` methods.
///
/// Opens can overlap when a new file is picked while the previous one is
/// still indexing. The store must let the open with the newest `session`
/// win: an older open finishing late returns [`StoreError::Superseded`] and
/// leaves the document and status of the newer one untouched.
pub trait LineStore: Send + Sync {
    /// Open and index `path` for `session`, returning the total number of
    /// lines.
    fn open(&self, session: SessionId, path: &Path) -> Result<usize, StoreError>;

    /// Progress of the current (or most recent) open/index operation.
    fn status(&self) -> Result<IndexingStatus, StoreError>;

    /// Up to `count` lines starting at `start`, truncated at end of file.
    fn get_lines(&self, start: usize, count: usize) -> Result<Vec<String>, StoreError>;

    /// The raw content of a single line.
    fn get_line(&self, index: usize) -> Result<String, StoreError>;
}

impl<T: LineStore + ?Sized> LineStore for Arc<T> {
    fn open(&self, session: SessionId, path: &Path) -> Result<usize, StoreError> {
        (**self).open(session, path)
    }

    fn status(&self) -> Result<IndexingStatus, StoreError> {
        (**self).status()
    }

    fn get_lines(&self, start: usize, count: usize) -> Result<Vec<String>, StoreError> {
        (**self).get_lines(start, count)
    }

    fn get_line(&self, index: usize) -> Result<String, StoreError> {
        (**self).get_line(index)
    }
}

/// Free-text progress report published by the backend while indexing.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IndexingStatus {
    pub message: String,
    pub progress: f32,
}

impl IndexingStatus {
    pub fn new(message: impl Into<String>, progress: f32) -> Self {
        Self {
            message: message.into(),
            progress,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.progress >= 1.0
    }

    /// Case-insensitive substring match on the message. The backend has no
    /// structured status code, so this is the contract.
    pub fn indicates_error(&self) -> bool {
        self.message.to_lowercase().contains("error")
    }

    pub fn is_terminal(&self) -> bool {
        self.is_complete() || self.indicates_error() || self.message.to_lowercase() == "ready"
    }

    /// `"{message} ({percent}%)"`
    pub fn display_text(&self) -> String {
        let percent = (self.progress * 100.0).round() as i64;
        format!("{} ({}%)", self.message, percent)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("No file is currently open.")]
    NoFileOpen,

    #[error("Line number {index} is out of bounds. Total lines: {total}")]
    OutOfBounds { index: usize, total: usize },

    #[error("Failed to decode line {0} as UTF-8")]
    InvalidUtf8(usize),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Open {0} was superseded by a newer one.")]
    Superseded(SessionId),

    #[error("{0}")]
    Backend(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err.to_string())
    }
}
