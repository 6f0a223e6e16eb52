//! One open file at a time: lifecycle, owned engine state and the display
//! projections the front end reads.
//!
//! The controller never calls the backend itself (except in
//! [`SessionController::ensure_range`]). Every backend-bound operation hands
//! out a ticket tagged with the current [`SessionId`]; the driver runs it off
//! the UI thread and feeds the response back through the matching `apply_*`
//! method. Responses carrying an older session id are dropped, so opening a
//! new file silently invalidates everything still in flight for the old one.

use crate::coalescer::{self, FetchCoalescer, FillOutcome, FillTicket};
use crate::error::{ViewerError, ViewerResult};
use crate::line_cache::LineCache;
use crate::poller::{IndexingStatusPoller, READY_TEXT};
use crate::render::{RenderEngine, RenderScheduler, RowSet};
use crate::selection::{LineResponse, LineTicket, SelectionController, StructuredView};
use crate::store::{IndexingStatus, LineStore, StoreError};
use crate::viewport::{RowProbe, ViewportController, Window};
use dolphin_config::ViewerConfig;
use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

const FETCHING_LINES_TEXT: &str = "Fetching lines...";
const EMPTY_CURSOR_TEXT: &str = "Ln 0, Col 0";

/// Generation counter of open files. `SessionId::default()` is the idle
/// session that exists before the first open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SessionId(u64);

impl SessionId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(self) -> u64 {
        self.0
    }

    fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Opening,
    Indexing(f32),
    Ready,
    Failed(String),
}

impl SessionState {
    pub fn is_busy(&self) -> bool {
        matches!(self, SessionState::Opening | SessionState::Indexing(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpenTicket {
    pub session: SessionId,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpenResponse {
    pub ticket: OpenTicket,
    pub result: Result<usize, StoreError>,
    /// Status read right after a successful open, so indexing that finished
    /// between two polls still ends on its final text.
    pub final_status: Option<Result<IndexingStatus, StoreError>>,
}

pub fn execute_open<S: LineStore + ?Sized>(store: &S, ticket: OpenTicket) -> OpenResponse {
    let result = store.open(ticket.session, &ticket.path);
    let final_status = result.is_ok().then(|| store.status());
    OpenResponse {
        ticket,
        result,
        final_status,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusTicket {
    pub session: SessionId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusResponse {
    pub ticket: StatusTicket,
    pub result: Result<IndexingStatus, StoreError>,
}

pub fn execute_status<S: LineStore + ?Sized>(store: &S, ticket: StatusTicket) -> StatusResponse {
    StatusResponse {
        ticket,
        result: store.status(),
    }
}

/// Owns all viewer state for the currently open file.
#[derive(Debug)]
pub struct SessionController {
    session: SessionId,
    state: SessionState,
    path: Option<PathBuf>,
    total_lines: usize,
    cache: LineCache,
    coalescer: FetchCoalescer,
    viewport: ViewportController,
    renderer: RenderEngine,
    scheduler: RenderScheduler,
    selection: SelectionController,
    poller: IndexingStatusPoller,
    max_cached_lines: usize,
    file_path_text: String,
    status_text: String,
    cursor_text: String,
    last_error: Option<ViewerError>,
}

impl SessionController {
    pub fn new(config: &ViewerConfig) -> Self {
        Self {
            session: SessionId::default(),
            state: SessionState::Idle,
            path: None,
            total_lines: 0,
            cache: LineCache::new(),
            coalescer: FetchCoalescer::new(),
            viewport: ViewportController::new(config.overscan, config.fallback_line_height),
            renderer: RenderEngine::new(),
            scheduler: RenderScheduler::default(),
            selection: SelectionController::new(),
            poller: IndexingStatusPoller::new(Duration::from_millis(config.poll_interval_ms)),
            max_cached_lines: config.max_cached_lines,
            file_path_text: String::new(),
            status_text: String::new(),
            cursor_text: EMPTY_CURSOR_TEXT.to_string(),
            last_error: None,
        }
    }

    /// Start a new session for `path`, discarding everything that belonged
    /// to the previous file.
    pub fn open(&mut self, path: impl Into<PathBuf>) -> OpenTicket {
        let path = path.into();
        self.session = self.session.next();
        info!(session = %self.session, path = %path.display(), "opening file");

        self.cache.clear();
        self.coalescer.reset();
        self.selection.clear();
        self.viewport.reset_scroll();
        self.renderer.clear();
        self.scheduler.take();
        self.total_lines = 0;
        self.last_error = None;

        self.file_path_text = path.display().to_string();
        self.cursor_text = EMPTY_CURSOR_TEXT.to_string();
        self.poller.stop();
        self.poller.start();
        self.status_text = IndexingStatus::new("Opening file...", 0.0).display_text();
        self.state = SessionState::Opening;
        self.path = Some(path.clone());

        OpenTicket {
            session: self.session,
            path,
        }
    }

    /// Finish an open. On success the row height is measured if it is not
    /// known yet and the fetch for the first window is returned.
    pub fn apply_open(
        &mut self,
        response: OpenResponse,
        probe: &dyn RowProbe,
    ) -> Option<FillTicket> {
        if response.ticket.session != self.session {
            debug!(stale = %response.ticket.session, current = %self.session, "discarding stale open response");
            return None;
        }

        match response.result {
            Ok(total) => {
                info!(session = %self.session, total_lines = total, "file opened");
                self.total_lines = total;
                self.state = SessionState::Ready;
                if let Some(status) = response.final_status {
                    self.take_status(status);
                }

                let line_height = self.viewport.ensure_line_height(probe);
                self.renderer.update_extent(total, line_height);
                self.request_window()
            }
            Err(err) => {
                warn!(session = %self.session, "failed to open file: {}", err);
                self.total_lines = 0;
                self.renderer.clear();
                self.poller.stop();
                self.file_path_text = format!("Error: {err}");
                self.status_text = format!("Error opening: {err}");
                self.state = SessionState::Failed(err.to_string());
                self.last_error = Some(ViewerError::Open(err));
                None
            }
        }
    }

    /// Claim the next status poll, if the poller is due one.
    pub fn poll_status(&mut self) -> Option<StatusTicket> {
        self.poller.begin_poll().then_some(StatusTicket {
            session: self.session,
        })
    }

    pub fn apply_status(&mut self, response: StatusResponse) {
        if response.ticket.session != self.session {
            debug!(stale = %response.ticket.session, "discarding stale status response");
            return;
        }
        self.take_status(response.result);
    }

    fn take_status(&mut self, result: Result<IndexingStatus, StoreError>) {
        let Some(update) = self.poller.on_status(result) else {
            return;
        };
        if !update.stopped && self.state.is_busy() {
            if let Some(progress) = update.progress {
                self.state = SessionState::Indexing(progress);
            }
        }
        self.status_text = update.text;
        if let Some(err) = update.error {
            self.last_error = Some(err);
        }
    }

    /// Record a new scroll offset. Returns `true` when this scheduled a
    /// render pass; a burst of scrolls schedules exactly one.
    pub fn scroll_to(&mut self, offset: f64) -> bool {
        self.viewport.set_scroll_offset(offset);
        self.scheduler.request()
    }

    pub fn resize(&mut self, viewport_height: f64) -> bool {
        self.viewport.set_viewport_height(viewport_height);
        self.scheduler.request()
    }

    /// Run the pending render pass, if any, returning the fetch it needs.
    pub fn frame(&mut self) -> Option<FillTicket> {
        if !self.scheduler.take() {
            return None;
        }
        self.request_window()
    }

    pub fn render_pending(&self) -> bool {
        self.scheduler.is_pending()
    }

    /// Plan the fetch for whatever the current window is missing. Lines far
    /// from the window are evicted first once the cache outgrows its bound.
    pub fn request_window(&mut self) -> Option<FillTicket> {
        let window = self.window();
        if window.is_empty() {
            return None;
        }
        let evicted = self.cache.evict_outside(window, self.max_cached_lines);
        if evicted > 0 {
            debug!(evicted, cached = self.cache.len(), "evicted lines far from the viewport");
        }
        let ticket = self
            .coalescer
            .plan(&self.cache, window.start, window.end, self.session)?;
        self.status_text = FETCHING_LINES_TEXT.to_string();
        Some(ticket)
    }

    /// Store the lines of a finished fill. Outcomes from an older session
    /// are dropped and report zero lines.
    pub fn apply_fill(&mut self, outcome: FillOutcome) -> ViewerResult<usize> {
        if outcome.session != self.session {
            debug!(stale = %outcome.session, call = outcome.call, "discarding stale fill");
            return Ok(0);
        }

        match self.coalescer.complete(&mut self.cache, outcome) {
            Ok(stored) => {
                if self.status_text == FETCHING_LINES_TEXT {
                    self.status_text = READY_TEXT.to_string();
                }
                Ok(stored)
            }
            Err(err) => {
                warn!(start = err.range.start, count = err.range.count, "error fetching lines: {}", err);
                self.status_text = format!("Error: {err}");
                let err = ViewerError::from(err);
                self.last_error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Fill `[start, end)` synchronously against `store`.
    ///
    /// Indices already reserved by an outstanding ticket are left to that
    /// ticket. Lines past the end of the file are never requested.
    pub fn ensure_range<S: LineStore + ?Sized>(
        &mut self,
        store: &S,
        start: usize,
        end: usize,
    ) -> ViewerResult<()> {
        let end = end.min(self.total_lines);
        let Some(ticket) = self.coalescer.plan(&self.cache, start, end, self.session) else {
            return Ok(());
        };
        let outcome = coalescer::execute(store, &ticket);
        self.apply_fill(outcome).map(|_| ())
    }

    /// Activate a row and request its content for the structured view.
    pub fn click_row(&mut self, index: usize) -> Option<LineTicket> {
        let ticket = self.selection.select(index, self.total_lines, self.session);
        match &ticket {
            Some(_) => {
                self.cursor_text = format!("Ln {}, Col 1", index + 1);
                self.status_text = format!("Fetching line {} for pretty view...", index + 1);
            }
            None => self.cursor_text = EMPTY_CURSOR_TEXT.to_string(),
        }
        ticket
    }

    pub fn apply_line(&mut self, response: LineResponse) -> bool {
        if response.ticket.session != self.session {
            debug!(stale = %response.ticket.session, "discarding stale line response");
            return false;
        }
        let applied = self.selection.apply(response);
        if applied && self.status_text.starts_with("Fetching line ") {
            self.status_text = READY_TEXT.to_string();
        }
        applied
    }

    pub fn window(&self) -> Window {
        self.viewport.window(self.total_lines)
    }

    pub fn render(&self) -> RowSet<'_> {
        self.renderer.render(
            self.window(),
            &self.cache,
            self.selection.active(),
            self.viewport.line_height(),
        )
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn total_lines(&self) -> usize {
        self.total_lines
    }

    pub fn active_line(&self) -> Option<usize> {
        self.selection.active()
    }

    pub fn viewport(&self) -> &ViewportController {
        &self.viewport
    }

    pub fn cached_lines(&self) -> usize {
        self.cache.len()
    }

    pub fn is_polling(&self) -> bool {
        self.poller.is_running()
    }

    pub fn poll_interval(&self) -> Duration {
        self.poller.interval()
    }

    pub fn last_error(&self) -> Option<&ViewerError> {
        self.last_error.as_ref()
    }

    pub fn file_path_text(&self) -> &str {
        &self.file_path_text
    }

    pub fn total_lines_text(&self) -> String {
        format!("Total Lines: {}", self.total_lines)
    }

    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    pub fn cursor_text(&self) -> &str {
        &self.cursor_text
    }

    pub fn structured_view(&self) -> &StructuredView {
        self.selection.view()
    }

    pub fn structured_text(&self) -> Cow<'_, str> {
        self.selection.view().text()
    }
}
