//! On-disk cache of line indices, keyed by file fingerprint and validated
//! against the file's size and modification time.

use crate::error::IndexCacheError;
use crate::indexing::compute_fingerprint;
use crate::line_index::{LineIndex, LineSpan};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, Metadata};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tracing::debug;

const CACHE_EXTENSION: &str = "indexcache";

/// Size and modification time a cached index was built against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStamp {
    pub size: u64,
    pub modified_secs: u64,
    pub modified_nanos: u32,
}

impl FileStamp {
    pub fn from_metadata(metadata: &Metadata) -> Result<Self, IndexCacheError> {
        let modified = metadata.modified()?.duration_since(UNIX_EPOCH)?;
        Ok(Self {
            size: metadata.len(),
            modified_secs: modified.as_secs(),
            modified_nanos: modified.subsec_nanos(),
        })
    }

    pub fn of(path: &Path) -> Result<Self, IndexCacheError> {
        Self::from_metadata(&fs::metadata(path)?)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CachedIndex {
    stamp: FileStamp,
    spans: Vec<LineSpan>,
}

#[derive(Debug, Clone)]
pub struct IndexCache {
    dir: PathBuf,
}

impl IndexCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn entry_path(&self, file: &Path) -> PathBuf {
        self.dir
            .join(format!("{}.{CACHE_EXTENSION}", compute_fingerprint(file)))
    }

    /// The cached index for `file`, or `None` when there is no entry or the
    /// file changed since it was written.
    pub fn load(&self, file: &Path, current: FileStamp) -> Result<Option<LineIndex>, IndexCacheError> {
        let entry = self.entry_path(file);
        let reader = match File::open(&entry) {
            Ok(handle) => BufReader::new(handle),
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        let cached: CachedIndex = serde_json::from_reader(reader)?;
        if cached.stamp != current {
            debug!(entry = %entry.display(), "index cache is stale");
            return Ok(None);
        }

        let index = LineIndex::from_spans(cached.spans);
        if !index.covers(current.size) {
            debug!(entry = %entry.display(), "index cache does not match file length");
            return Ok(None);
        }
        Ok(Some(index))
    }

    pub fn save(&self, file: &Path, stamp: FileStamp, index: &LineIndex) -> Result<(), IndexCacheError> {
        fs::create_dir_all(&self.dir)?;
        let entry = self.entry_path(file);
        let mut writer = BufWriter::new(File::create(&entry)?);
        serde_json::to_writer(
            &mut writer,
            &CachedIndex {
                stamp,
                spans: index.spans().to_vec(),
            },
        )?;
        writer.flush()?;
        debug!(entry = %entry.display(), lines = index.len(), "index cache written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trips_for_unchanged_file() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("data.jsonl");
        fs::write(&file, "{}\n[]\n").unwrap();
        let cache = IndexCache::new(dir.path().join("cache"));
        let stamp = FileStamp::of(&file).unwrap();
        let index = LineIndex::build(&fs::read(&file).unwrap());

        assert_eq!(cache.load(&file, stamp).unwrap(), None);
        cache.save(&file, stamp, &index).unwrap();
        assert_eq!(cache.load(&file, stamp).unwrap(), Some(index));
    }

    #[test]
    fn changed_file_invalidates_entry() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("data.jsonl");
        fs::write(&file, "{}\n").unwrap();
        let cache = IndexCache::new(dir.path());
        let stamp = FileStamp::of(&file).unwrap();
        cache
            .save(&file, stamp, &LineIndex::build(b"{}\n"))
            .unwrap();

        let grown = FileStamp {
            size: stamp.size + 3,
            ..stamp
        };
        assert_eq!(cache.load(&file, grown).unwrap(), None);

        let touched = FileStamp {
            modified_nanos: stamp.modified_nanos.wrapping_add(1),
            ..stamp
        };
        assert_eq!(cache.load(&file, touched).unwrap(), None);
    }

    #[test]
    fn corrupt_entry_is_an_error() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("data.jsonl");
        fs::write(&file, "{}\n").unwrap();
        let cache = IndexCache::new(dir.path());
        fs::write(cache.entry_path(&file), "not json").unwrap();

        let stamp = FileStamp::of(&file).unwrap();
        assert!(matches!(cache.load(&file, stamp), Err(IndexCacheError::Json(_))));
    }
}
