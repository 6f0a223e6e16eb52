use crate::viewport::Window;
use std::collections::HashMap;

/// Fetched line content keyed by absolute line index.
///
/// A cache belongs to exactly one open file. Indices from different files
/// are not comparable, so a file switch discards it wholesale. Within a file
/// the owner bounds it with [`LineCache::evict_outside`].
#[derive(Debug, Default)]
pub struct LineCache {
    lines: HashMap<usize, String>,
}

impl LineCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.lines.get(&index).map(String::as_str)
    }

    pub fn contains(&self, index: usize) -> bool {
        self.lines.contains_key(&index)
    }

    pub fn insert(&mut self, index: usize, line: String) {
        self.lines.insert(index, line);
    }

    /// Store `lines` at consecutive indices starting from `start`.
    pub fn fill(&mut self, start: usize, lines: impl IntoIterator<Item = String>) -> usize {
        let mut stored = 0;
        for (offset, line) in lines.into_iter().enumerate() {
            self.lines.insert(start + offset, line);
            stored += 1;
        }
        stored
    }

    /// Indices in `[start, end)` with no cached content, ascending.
    pub fn missing(&self, start: usize, end: usize) -> Vec<usize> {
        (start..end).filter(|index| !self.contains(*index)).collect()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Once more than `limit` lines are cached, drop every line outside
    /// `keep` widened by an equal margin on both sides, so at most `limit`
    /// survive (or `keep.len()` when that is larger). Returns how many
    /// lines were dropped.
    pub fn evict_outside(&mut self, keep: Window, limit: usize) -> usize {
        if self.lines.len() <= limit {
            return 0;
        }
        let margin = limit.saturating_sub(keep.len()) / 2;
        let start = keep.start.saturating_sub(margin);
        let end = keep.end.saturating_add(margin);

        let before = self.lines.len();
        self.lines.retain(|index, _| *index >= start && *index < end);
        before - self.lines.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_stores_at_consecutive_indices() {
        let mut cache = LineCache::new();
        let stored = cache.fill(40, vec!["a".to_string(), "b".to_string()]);

        assert_eq!(stored, 2);
        assert_eq!(cache.get(40), Some("a"));
        assert_eq!(cache.get(41), Some("b"));
        assert_eq!(cache.get(42), None);
    }

    #[test]
    fn missing_reports_gaps_in_order() {
        let mut cache = LineCache::new();
        cache.insert(1, "x".into());
        cache.insert(2, "y".into());
        cache.insert(5, "z".into());

        assert_eq!(cache.missing(0, 7), vec![0, 3, 4, 6]);
        assert!(cache.missing(1, 3).is_empty());
        assert!(cache.missing(4, 4).is_empty());
    }

    #[test]
    fn eviction_keeps_lines_around_the_window() {
        let mut cache = LineCache::new();
        cache.fill(0, (0..100).map(|i| i.to_string()));

        assert_eq!(cache.evict_outside(Window::new(50, 60), 100), 0);
        assert_eq!(cache.len(), 100);

        assert_eq!(cache.evict_outside(Window::new(50, 60), 30), 70);
        assert_eq!(cache.len(), 30);
        assert!(cache.contains(40));
        assert!(cache.contains(69));
        assert!(!cache.contains(39));
        assert!(!cache.contains(70));
    }

    #[test]
    fn eviction_never_drops_the_window_itself() {
        let mut cache = LineCache::new();
        cache.fill(0, (0..40).map(|i| i.to_string()));

        cache.evict_outside(Window::new(10, 30), 5);
        assert_eq!(cache.len(), 20);
        assert!(cache.missing(10, 30).is_empty());
    }
}
