//! Virtualized line viewer engine.
//!
//! Maps a scroll position to the small window of lines that needs to exist,
//! fetches only what is missing from a [`LineStore`] in as few contiguous
//! requests as possible, and describes the rows to draw.

pub mod coalescer;
pub mod error;
pub mod line_cache;
pub mod poller;
pub mod render;
pub mod selection;
pub mod session;
pub mod store;
pub mod viewport;

pub use coalescer::{FetchCoalescer, FetchRange, FillOutcome, FillTicket, coalesce};
pub use error::{FetchError, ViewerError, ViewerResult};
pub use line_cache::LineCache;
pub use poller::{IndexingStatusPoller, PollUpdate, READY_TEXT};
pub use render::{RenderEngine, RenderScheduler, RowDescriptor, RowSet};
pub use selection::{LineResponse, LineTicket, SelectionController, StructuredView, structure_line};
pub use session::{
    OpenResponse, OpenTicket, SessionController, SessionId, SessionState, StatusResponse,
    StatusTicket, execute_open, execute_status,
};
pub use store::{IndexingStatus, LineStore, StoreError};
pub use viewport::{RowProbe, ViewportController, Window, compute_window};
