//! Row descriptors for the materialized window.
//!
//! The engine never touches a widget toolkit. A render pass produces plain
//! [`RowDescriptor`]s that a front end turns into whatever it draws, plus the
//! extent of the whole document so the scroll surface can size its
//! scrollbar for lines that were never materialized.

use crate::line_cache::LineCache;
use crate::viewport::Window;

/// One positioned row of the raw view.
#[derive(Debug, Clone, PartialEq)]
pub struct RowDescriptor<'a> {
    pub index: usize,
    /// Cached content, or empty while the line is still being fetched.
    pub text: &'a str,
    /// 1-based line number.
    pub label: String,
    /// Absolute vertical offset, `index * line_height`.
    pub offset: f64,
    pub height: f64,
    pub is_active: bool,
    /// No content has been cached for this line yet. A cached blank line is
    /// not pending.
    pub is_pending: bool,
}

/// Output of one render pass.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RowSet<'a> {
    pub window: Window,
    pub rows: Vec<RowDescriptor<'a>>,
    /// Height of the extent marker, `total_lines * line_height`.
    pub extent: f64,
}

impl<'a> RowSet<'a> {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, index: usize) -> Option<&RowDescriptor<'a>> {
        if !self.window.contains(index) {
            return None;
        }
        self.rows.get(index - self.window.start)
    }

    pub fn active_row(&self) -> Option<&RowDescriptor<'a>> {
        self.rows.iter().find(|row| row.is_active)
    }

    /// Space above the first materialized row.
    pub fn leading_space(&self) -> f64 {
        self.rows.first().map(|row| row.offset).unwrap_or(self.extent)
    }

    /// Space below the last materialized row.
    pub fn trailing_space(&self) -> f64 {
        self.rows
            .last()
            .map(|row| (self.extent - row.offset - row.height).max(0.0))
            .unwrap_or(0.0)
    }
}

/// Produces row descriptors and owns the extent marker.
#[derive(Debug, Default)]
pub struct RenderEngine {
    extent: f64,
}

impl RenderEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extent(&self) -> f64 {
        self.extent
    }

    pub fn update_extent(&mut self, total_lines: usize, line_height: f64) -> f64 {
        self.extent = total_lines as f64 * line_height.max(0.0);
        self.extent
    }

    pub fn clear(&mut self) {
        self.extent = 0.0;
    }

    /// Build a fresh row for every index of `window`.
    ///
    /// Rows carry no identity across passes: the active flag is recomputed
    /// from `active_line` each time.
    pub fn render<'a>(
        &self,
        window: Window,
        cache: &'a LineCache,
        active_line: Option<usize>,
        line_height: f64,
    ) -> RowSet<'a> {
        let rows = (window.start..window.end)
            .map(|index| {
                let cached = cache.get(index);
                RowDescriptor {
                    index,
                    text: cached.unwrap_or(""),
                    label: (index + 1).to_string(),
                    offset: index as f64 * line_height,
                    height: line_height,
                    is_active: active_line == Some(index),
                    is_pending: cached.is_none(),
                }
            })
            .collect();

        RowSet {
            window,
            rows,
            extent: self.extent,
        }
    }
}

/// Collapses bursts of scroll and resize events into one pending render
/// pass per display frame.
#[derive(Debug, Default)]
pub struct RenderScheduler {
    pending: bool,
    requests: u64,
}

impl RenderScheduler {
    /// Returns `true` when this request scheduled a new pass, `false` when
    /// one was already pending.
    pub fn request(&mut self) -> bool {
        self.requests += 1;
        !std::mem::replace(&mut self.pending, true)
    }

    /// Consume the pending pass, if any.
    pub fn take(&mut self) -> bool {
        std::mem::take(&mut self.pending)
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn requests(&self) -> u64 {
        self.requests
    }
}
