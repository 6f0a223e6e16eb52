//! File-backed [`LineStore`].

use crate::error::DocumentError;
use crate::index_cache::{FileStamp, IndexCache};
use crate::line_index::LineIndex;
use crate::mapped::{MappedDocument, MappedFile};
use dolphin_core::{IndexingStatus, LineStore, SessionId, StoreError};
use parking_lot::{Mutex, RwLock};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Serves lines of one memory-mapped file.
///
/// `open` blocks while the file is indexed; the status is kept behind its
/// own lock so another thread can poll progress in the meantime. Only the
/// open carrying the newest session may publish status or install its
/// document. Lock order is `latest` before `status` or `document`.
#[derive(Debug, Default)]
pub struct FileLineStore {
    document: RwLock<Option<Arc<MappedDocument>>>,
    status: Mutex<IndexingStatus>,
    latest: Mutex<SessionId>,
    cache: Option<IndexCache>,
}

impl FileLineStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that persists line indices under `cache`.
    pub fn with_index_cache(cache: IndexCache) -> Self {
        Self {
            cache: Some(cache),
            ..Self::default()
        }
    }

    pub fn index_cache(&self) -> Option<&IndexCache> {
        self.cache.as_ref()
    }

    /// Claim the store for `session`, dropping the previous document.
    /// Fails when a newer session already claimed it.
    fn begin(&self, session: SessionId) -> Result<(), StoreError> {
        let mut latest = self.latest.lock();
        if session < *latest {
            return Err(StoreError::Superseded(session));
        }
        *latest = session;
        *self.document.write() = None;
        *self.status.lock() = IndexingStatus::new("Opening file...", 0.0);
        Ok(())
    }

    fn set_status(&self, session: SessionId, message: &str, progress: f32) {
        let latest = self.latest.lock();
        if *latest != session {
            return;
        }
        debug!(message, progress, "indexing status");
        *self.status.lock() = IndexingStatus::new(message, progress);
    }

    fn install(&self, session: SessionId, document: MappedDocument) -> Result<(), StoreError> {
        let latest = self.latest.lock();
        if *latest != session {
            return Err(StoreError::Superseded(session));
        }
        *self.document.write() = Some(Arc::new(document));
        *self.status.lock() = IndexingStatus::new("Ready", 1.0);
        Ok(())
    }

    fn document(&self) -> Result<Arc<MappedDocument>, DocumentError> {
        self.document
            .read()
            .as_ref()
            .cloned()
            .ok_or(DocumentError::NoFileOpen)
    }

    fn load_document(&self, session: SessionId, path: &Path) -> Result<MappedDocument, DocumentError> {
        let file = MappedFile::open(path)?;
        self.set_status(session, "Indexing line offsets...", 0.1);

        let stamp = match FileStamp::of(path) {
            Ok(stamp) => Some(stamp),
            Err(err) => {
                warn!("Cannot stamp {} for the index cache: {}", path.display(), err);
                None
            }
        };

        let cached = match (&self.cache, stamp) {
            (Some(cache), Some(stamp)) => cache.load(path, stamp).unwrap_or_else(|err| {
                warn!("Ignoring unreadable index cache for {}: {}", path.display(), err);
                None
            }),
            _ => None,
        };

        let index = match cached {
            Some(index) => {
                self.set_status(session, "Loaded line offsets from cache.", 0.25);
                index
            }
            None => {
                let index = LineIndex::build_with_progress(file.as_bytes(), |fraction| {
                    self.set_status(session, "Indexing line offsets...", 0.1 + 0.15 * fraction);
                });
                if let (Some(cache), Some(stamp)) = (&self.cache, stamp) {
                    if let Err(err) = cache.save(path, stamp, &index) {
                        warn!("Failed to save line offset index to cache: {}", err);
                    }
                }
                self.set_status(session, "Built line offsets.", 0.25);
                index
            }
        };

        Ok(MappedDocument::new(file, index))
    }
}

impl LineStore for FileLineStore {
    fn open(&self, session: SessionId, path: &Path) -> Result<usize, StoreError> {
        self.begin(session)?;

        match self.load_document(session, path) {
            Ok(document) => {
                let total = document.total_lines();
                let bytes = document.file_size();
                self.install(session, document).inspect_err(|_| {
                    debug!(%session, path = %path.display(), "dropping superseded document");
                })?;
                info!(%session, path = %path.display(), total_lines = total, bytes, "file indexed");
                Ok(total)
            }
            Err(err) => {
                self.set_status(session, &format!("Error: {err}"), 0.0);
                Err(err.into())
            }
        }
    }

    fn status(&self) -> Result<IndexingStatus, StoreError> {
        Ok(self.status.lock().clone())
    }

    fn get_lines(&self, start: usize, count: usize) -> Result<Vec<String>, StoreError> {
        Ok(self.document()?.get_lines(start, count)?)
    }

    fn get_line(&self, index: usize) -> Result<String, StoreError> {
        Ok(self.document()?.get_line(index)?)
    }
}
