use crate::error::DocumentError;
use crate::line_index::LineIndex;
use memmap2::{Mmap, MmapOptions};
use std::fs::File;
use std::path::{Path, PathBuf};

/// Memory-mapped file
#[derive(Debug)]
pub struct MappedFile {
    path: PathBuf,
    mmap: Mmap,
}

impl MappedFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        // SAFETY: the map is read-only; concurrent truncation by another
        // process is outside what a viewer can guard against.
        let mmap = unsafe { MmapOptions::new().map(&file)? };
        Ok(Self { path, mmap })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.mmap
    }

    pub fn len(&self) -> u64 {
        self.mmap.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }
}

/// A mapped file together with its line index
#[derive(Debug)]
pub struct MappedDocument {
    file: MappedFile,
    index: LineIndex,
}

impl MappedDocument {
    /// Map `path` and index it from scratch.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let file = MappedFile::open(path)?;
        let index = LineIndex::build(file.as_bytes());
        Ok(Self { file, index })
    }

    pub fn new(file: MappedFile, index: LineIndex) -> Self {
        Self { file, index }
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn file_size(&self) -> u64 {
        self.file.len()
    }

    pub fn total_lines(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.file.is_empty()
    }

    pub fn line_index(&self) -> &LineIndex {
        &self.index
    }

    /// A single line without its terminator.
    pub fn get_line(&self, line: usize) -> Result<String, DocumentError> {
        let bytes = self.file.as_bytes();
        let range = self
            .index
            .content_range(line, bytes)
            .ok_or(DocumentError::OutOfBounds {
                index: line,
                total: self.total_lines(),
            })?;
        String::from_utf8(bytes[range].to_vec()).map_err(|_| DocumentError::InvalidUtf8 { line })
    }

    /// Up to `count` lines starting at `start`; fewer when the range runs
    /// past the end of the file.
    pub fn get_lines(&self, start: usize, count: usize) -> Result<Vec<String>, DocumentError> {
        let end = start.saturating_add(count).min(self.total_lines());
        (start..end).map(|line| self.get_line(line)).collect()
    }
}
