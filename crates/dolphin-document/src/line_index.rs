use memchr::memchr_iter;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Bytes scanned between two progress reports while building an index.
const PROGRESS_CHUNK: usize = 64 * 1024 * 1024;

/// Location of one line in the file, terminator included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSpan {
    pub offset: u64,
    pub length: u64,
}

impl LineSpan {
    pub fn end(&self) -> u64 {
        self.offset + self.length
    }
}

/// Line number -> byte span mapping for a whole file.
///
/// Lines are separated by `\n`. A final line without a terminator still
/// counts, while a trailing `\n` does not start an extra empty line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineIndex {
    spans: Vec<LineSpan>,
}

impl LineIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_spans(spans: Vec<LineSpan>) -> Self {
        Self { spans }
    }

    pub fn build(bytes: &[u8]) -> Self {
        Self::build_with_progress(bytes, |_| {})
    }

    /// Scan `bytes` for line boundaries, reporting the scanned fraction
    /// (`0.0..=1.0`) every few dozen megabytes.
    pub fn build_with_progress(bytes: &[u8], mut progress: impl FnMut(f32)) -> Self {
        let mut spans = Vec::new();
        let mut line_start = 0usize;
        let mut next_report = PROGRESS_CHUNK;

        for newline in memchr_iter(b'\n', bytes) {
            spans.push(LineSpan {
                offset: line_start as u64,
                length: (newline + 1 - line_start) as u64,
            });
            line_start = newline + 1;

            if line_start >= next_report {
                progress(line_start as f32 / bytes.len() as f32);
                next_report = line_start + PROGRESS_CHUNK;
            }
        }

        if line_start < bytes.len() {
            spans.push(LineSpan {
                offset: line_start as u64,
                length: (bytes.len() - line_start) as u64,
            });
        }
        progress(1.0);

        Self { spans }
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub fn span(&self, line: usize) -> Option<LineSpan> {
        self.spans.get(line).copied()
    }

    pub fn spans(&self) -> &[LineSpan] {
        &self.spans
    }

    /// Byte range of `line` without its `\n` or `\r\n` terminator.
    pub fn content_range(&self, line: usize, bytes: &[u8]) -> Option<Range<usize>> {
        let span = self.span(line)?;
        let start = usize::try_from(span.offset).ok()?;
        let mut end = usize::try_from(span.end()).ok()?.min(bytes.len());
        if start > end {
            return None;
        }

        if end > start && bytes[end - 1] == b'\n' {
            end -= 1;
            if end > start && bytes[end - 1] == b'\r' {
                end -= 1;
            }
        }
        Some(start..end)
    }

    /// Whether the spans tile a file of `len` bytes exactly.
    pub fn covers(&self, len: u64) -> bool {
        let mut expected = 0u64;
        for span in &self.spans {
            if span.offset != expected || span.length == 0 {
                return false;
            }
            expected = span.end();
        }
        expected == len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(bytes: &[u8]) -> Vec<&[u8]> {
        let index = LineIndex::build(bytes);
        (0..index.len())
            .map(|line| &bytes[index.content_range(line, bytes).unwrap()])
            .collect()
    }

    #[test]
    fn trailing_newline_does_not_add_a_line() {
        assert_eq!(lines(b"a\nb\n"), vec![b"a".as_slice(), b"b"]);
        assert_eq!(lines(b"a\nb"), vec![b"a".as_slice(), b"b"]);
        assert!(lines(b"").is_empty());
    }

    #[test]
    fn blank_lines_and_crlf() {
        assert_eq!(lines(b"\n\r\nx\r\n"), vec![b"".as_slice(), b"", b"x"]);
    }

    #[test]
    fn spans_tile_the_file() {
        let bytes = b"{\"a\":1}\n{}\n[1,2]";
        let index = LineIndex::build(bytes);
        assert_eq!(index.len(), 3);
        assert_eq!(index.span(1), Some(LineSpan { offset: 8, length: 3 }));
        assert!(index.covers(bytes.len() as u64));
        assert!(!index.covers(bytes.len() as u64 + 1));
    }

    #[test]
    fn progress_ends_complete() {
        let mut reports = Vec::new();
        LineIndex::build_with_progress(b"x\ny\n", |fraction| reports.push(fraction));
        assert_eq!(reports.last(), Some(&1.0));
    }
}
