/// Half-open range of line indices `[start, end)` to materialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Window {
    pub start: usize,
    pub end: usize,
}

impl Window {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, index: usize) -> bool {
        index >= self.start && index < self.end
    }
}

/// Measures the height of one rendered row.
///
/// Implemented by the front end with a representative probe element. A
/// result of zero (or anything non-finite) means the measurement failed.
pub trait RowProbe {
    fn measure_row_height(&self) -> f64;
}

impl<F: Fn() -> f64> RowProbe for F {
    fn measure_row_height(&self) -> f64 {
        self()
    }
}

/// Lines that intersect the viewport plus `overscan` rows on either side,
/// clamped to `[0, total_lines]`.
///
/// `line_height` must be positive; an unmeasured height yields an empty
/// window. Geometry is `f64` so every row of a multi-million line document
/// keeps a distinct offset.
pub fn compute_window(
    scroll_offset: f64,
    line_height: f64,
    viewport_height: f64,
    total_lines: usize,
    overscan: usize,
) -> Window {
    if !(line_height > 0.0) || total_lines == 0 {
        return Window::default();
    }

    let first_visible = (scroll_offset.max(0.0) / line_height).floor() as usize;
    let visible = visible_count(viewport_height, line_height);

    let end = first_visible
        .saturating_add(visible)
        .saturating_add(overscan)
        .min(total_lines);
    let start = first_visible.saturating_sub(overscan).min(end);
    Window { start, end }
}

/// Number of rows needed to cover `viewport_height`.
pub fn visible_count(viewport_height: f64, line_height: f64) -> usize {
    if !(line_height > 0.0) || !(viewport_height > 0.0) {
        return 0;
    }
    (viewport_height / line_height).ceil() as usize
}

/// Scroll position, viewport size and row metrics for one session.
#[derive(Debug, Clone)]
pub struct ViewportController {
    scroll_offset: f64,
    line_height: f64,
    viewport_height: f64,
    overscan: usize,
    fallback_line_height: f64,
}

impl ViewportController {
    pub fn new(overscan: usize, fallback_line_height: f64) -> Self {
        Self {
            scroll_offset: 0.0,
            line_height: 0.0,
            viewport_height: 0.0,
            overscan,
            fallback_line_height,
        }
    }

    pub fn scroll_offset(&self) -> f64 {
        self.scroll_offset
    }

    pub fn set_scroll_offset(&mut self, offset: f64) {
        self.scroll_offset = if offset.is_finite() { offset.max(0.0) } else { 0.0 };
    }

    pub fn viewport_height(&self) -> f64 {
        self.viewport_height
    }

    pub fn set_viewport_height(&mut self, height: f64) {
        self.viewport_height = if height.is_finite() { height.max(0.0) } else { 0.0 };
    }

    pub fn line_height(&self) -> f64 {
        self.line_height
    }

    pub fn is_measured(&self) -> bool {
        self.line_height > 0.0
    }

    pub fn overscan(&self) -> usize {
        self.overscan
    }

    /// Measure the row height once, falling back to the configured constant
    /// when the probe reports nothing usable.
    pub fn ensure_line_height(&mut self, probe: &dyn RowProbe) -> f64 {
        if self.is_measured() {
            return self.line_height;
        }

        let measured = probe.measure_row_height();
        self.line_height = if measured.is_finite() && measured > 0.0 {
            measured
        } else {
            tracing::warn!(measured, fallback = self.fallback_line_height, "line height measurement failed, using fallback");
            self.fallback_line_height
        };
        tracing::debug!(line_height = self.line_height, "measured line height");
        self.line_height
    }

    pub fn visible_count(&self) -> usize {
        visible_count(self.viewport_height, self.line_height)
    }

    pub fn window(&self, total_lines: usize) -> Window {
        compute_window(
            self.scroll_offset,
            self.line_height,
            self.viewport_height,
            total_lines,
            self.overscan,
        )
    }

    /// Back to the top of the document. Row metrics survive a file switch.
    pub fn reset_scroll(&mut self) {
        self.scroll_offset = 0.0;
    }
}
