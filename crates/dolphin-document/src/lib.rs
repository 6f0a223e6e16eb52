//! File backend for the dolphin viewer
//!
//! This crate provides:
//! - Memory-mapped access to large line-delimited files
//! - Line indexing with `memchr`
//! - A persistent index cache validated by file size and mtime
//! - [`FileLineStore`], the [`dolphin_core::LineStore`] used by the app

pub mod error;
pub mod index_cache;
pub mod indexing;
pub mod line_index;
pub mod mapped;
pub mod store;

pub use error::{DocumentError, IndexCacheError};
pub use index_cache::{FileStamp, IndexCache};
pub use indexing::compute_fingerprint;
pub use line_index::{LineIndex, LineSpan};
pub use mapped::{MappedDocument, MappedFile};
pub use store::FileLineStore;
