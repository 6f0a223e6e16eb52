//! Fetch coalescing: turning scattered cache misses into the fewest
//! contiguous `get_lines` requests.
//!
//! A fill happens in three steps so that the backend call can run off the
//! UI thread:
//!
//! 1. [`FetchCoalescer::plan`] collects the missing indices of a window,
//!    skips anything already in flight, groups the rest into maximal runs and
//!    reserves them under a [`FillTicket`].
//! 2. [`execute`] issues one request per run, sequentially, stopping at the
//!    first failure.
//! 3. [`FetchCoalescer::complete`] stores what arrived and releases the
//!    ticket's reservation.

use crate::error::FetchError;
use crate::line_cache::LineCache;
use crate::session::SessionId;
use crate::store::LineStore;
use std::collections::BTreeMap;
use std::ops::Range;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FetchRange {
    pub start: usize,
    pub count: usize,
}

impl FetchRange {
    pub fn new(start: usize, count: usize) -> Self {
        Self { start, count }
    }

    pub fn end(&self) -> usize {
        self.start + self.count
    }

    pub fn indices(&self) -> Range<usize> {
        self.start..self.end()
    }

    pub fn contains(&self, index: usize) -> bool {
        index >= self.start && index < self.end()
    }
}

/// Group ascending, distinct indices into maximal contiguous runs.
pub fn coalesce(missing: &[usize]) -> Vec<FetchRange> {
    let mut ranges = Vec::new();
    let mut iter = missing.iter().copied();
    let Some(first) = iter.next() else {
        return ranges;
    };

    let mut current = FetchRange::new(first, 1);
    let mut previous = first;
    for index in iter {
        if index == previous + 1 {
            current.count += 1;
        } else {
            ranges.push(current);
            current = FetchRange::new(index, 1);
        }
        previous = index;
    }
    ranges.push(current);
    ranges
}

/// Runs reserved by one `plan` call, tagged with the session that issued them.
#[derive(Debug, Clone, PartialEq)]
pub struct FillTicket {
    pub session: SessionId,
    pub call: u64,
    pub ranges: Vec<FetchRange>,
}

impl FillTicket {
    pub fn line_count(&self) -> usize {
        self.ranges.iter().map(|range| range.count).sum()
    }
}

/// What came back for a [`FillTicket`].
#[derive(Debug, Clone, PartialEq)]
pub struct FillOutcome {
    pub session: SessionId,
    pub call: u64,
    /// Runs that loaded, in issue order, with the lines the backend returned.
    pub filled: Vec<(FetchRange, Vec<String>)>,
    /// The run that failed, if any. Runs after it were never issued.
    pub failure: Option<FetchError>,
    pub unissued: Vec<FetchRange>,
}

/// Issue one `get_lines` per run of `ticket`, in order, aborting the
/// remaining runs at the first failure.
pub fn execute<S: LineStore + ?Sized>(store: &S, ticket: &FillTicket) -> FillOutcome {
    let mut filled = Vec::with_capacity(ticket.ranges.len());
    let mut failure = None;
    let mut unissued = Vec::new();

    for (position, range) in ticket.ranges.iter().enumerate() {
        match store.get_lines(range.start, range.count) {
            Ok(lines) => filled.push((*range, lines)),
            Err(source) => {
                failure = Some(FetchError {
                    range: *range,
                    source,
                });
                unissued.extend_from_slice(&ticket.ranges[position + 1..]);
                break;
            }
        }
    }

    FillOutcome {
        session: ticket.session,
        call: ticket.call,
        filled,
        failure,
        unissued,
    }
}

/// Plans fetches and tracks which ranges are outstanding.
#[derive(Debug, Default)]
pub struct FetchCoalescer {
    in_flight: BTreeMap<u64, Vec<FetchRange>>,
    next_call: u64,
}

impl FetchCoalescer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve every index of `[start, end)` that is neither cached nor
    /// already in flight. Returns `None` when there is nothing to fetch.
    pub fn plan(
        &mut self,
        cache: &LineCache,
        start: usize,
        end: usize,
        session: SessionId,
    ) -> Option<FillTicket> {
        let missing: Vec<usize> = cache
            .missing(start, end)
            .into_iter()
            .filter(|index| !self.is_in_flight(*index))
            .collect();
        if missing.is_empty() {
            return None;
        }

        let ranges = coalesce(&missing);
        let call = self.next_call;
        self.next_call = self.next_call.wrapping_add(1);
        self.in_flight.insert(call, ranges.clone());
        debug!(call, runs = ranges.len(), lines = missing.len(), "planned line fetch");

        Some(FillTicket {
            session,
            call,
            ranges,
        })
    }

    /// Store the lines of `outcome` and release its reservation.
    ///
    /// Returns the number of lines stored, or the failure of the call. An
    /// outcome whose call is not outstanding (for example one issued before
    /// a [`reset`](Self::reset)) is ignored.
    pub fn complete(
        &mut self,
        cache: &mut LineCache,
        outcome: FillOutcome,
    ) -> Result<usize, FetchError> {
        if self.in_flight.remove(&outcome.call).is_none() {
            debug!(call = outcome.call, "dropping fill for a call that is no longer outstanding");
            return Ok(0);
        }

        let mut stored = 0;
        for (range, mut lines) in outcome.filled {
            if lines.len() > range.count {
                warn!(start = range.start, requested = range.count, returned = lines.len(), "backend returned extra lines; truncating");
                lines.truncate(range.count);
            } else if lines.len() < range.count {
                warn!(start = range.start, requested = range.count, returned = lines.len(), "short read; remaining lines stay missing");
            }
            stored += cache.fill(range.start, lines);
        }

        match outcome.failure {
            Some(failure) => {
                if !outcome.unissued.is_empty() {
                    debug!(skipped = outcome.unissued.len(), "runs abandoned after fetch failure");
                }
                Err(failure)
            }
            None => Ok(stored),
        }
    }

    pub fn is_in_flight(&self, index: usize) -> bool {
        self.in_flight
            .values()
            .flatten()
            .any(|range| range.contains(index))
    }

    pub fn outstanding_calls(&self) -> usize {
        self.in_flight.len()
    }

    /// Forget every reservation. Call ids keep increasing so late outcomes
    /// from before the reset can never match a new reservation.
    pub fn reset(&mut self) {
        self.in_flight.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{IndexingStatus, StoreError};
    use proptest::prelude::*;
    use std::collections::BTreeSet;
    use std::path::Path;
    use std::sync::Mutex;

    struct ScriptedStore {
        total: usize,
        fail_at: Option<usize>,
        calls: Mutex<Vec<(usize, usize)>>,
    }

    impl ScriptedStore {
        fn new(total: usize) -> Self {
            Self {
                total,
                fail_at: None,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<(usize, usize)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl LineStore for ScriptedStore {
        fn open(&self, _session: SessionId, _path: &Path) -> Result<usize, StoreError> {
            Ok(self.total)
        }

        fn status(&self) -> Result<IndexingStatus, StoreError> {
            Ok(IndexingStatus::new("Ready", 1.0))
        }

        fn get_lines(&self, start: usize, count: usize) -> Result<Vec<String>, StoreError> {
            self.calls.lock().unwrap().push((start, count));
            if self.fail_at == Some(start) {
                return Err(StoreError::Io("disk unplugged".into()));
            }
            let end = (start + count).min(self.total);
            Ok((start..end).map(|index| format!("line {index}")).collect())
        }

        fn get_line(&self, index: usize) -> Result<String, StoreError> {
            Ok(format!("line {index}"))
        }
    }

    fn session() -> SessionId {
        SessionId::default()
    }

    #[test]
    fn coalesce_groups_runs() {
        assert_eq!(
            coalesce(&[1, 2, 3, 7, 9, 10]),
            vec![
                FetchRange::new(1, 3),
                FetchRange::new(7, 1),
                FetchRange::new(9, 2)
            ]
        );
        assert!(coalesce(&[]).is_empty());
    }

    #[test]
    fn second_plan_on_cached_range_issues_nothing() {
        let store = ScriptedStore::new(100);
        let mut cache = LineCache::new();
        let mut coalescer = FetchCoalescer::new();

        let ticket = coalescer.plan(&cache, 10, 30, session()).unwrap();
        let outcome = execute(&store, &ticket);
        assert_eq!(coalescer.complete(&mut cache, outcome), Ok(20));

        assert!(coalescer.plan(&cache, 10, 30, session()).is_none());
        assert_eq!(store.calls(), vec![(10, 20)]);
    }

    #[test]
    fn in_flight_ranges_are_not_requested_twice() {
        let mut cache = LineCache::new();
        let mut coalescer = FetchCoalescer::new();

        let first = coalescer.plan(&cache, 0, 20, session()).unwrap();
        let second = coalescer.plan(&cache, 10, 30, session()).unwrap();
        assert_eq!(second.ranges, vec![FetchRange::new(20, 10)]);
        assert!(coalescer.plan(&cache, 5, 25, session()).is_none());

        let store = ScriptedStore::new(100);
        coalescer.complete(&mut cache, execute(&store, &first)).unwrap();
        assert!(!coalescer.is_in_flight(5));
        assert!(coalescer.is_in_flight(25));
        assert!(coalescer.plan(&cache, 0, 20, session()).is_none());
    }

    #[test]
    fn failure_keeps_earlier_runs_and_aborts_later_ones() {
        let mut cache = LineCache::new();
        cache.insert(5, "cached".into());
        cache.insert(10, "cached".into());
        let mut coalescer = FetchCoalescer::new();
        let store = ScriptedStore {
            fail_at: Some(6),
            ..ScriptedStore::new(100)
        };

        let ticket = coalescer.plan(&cache, 0, 15, session()).unwrap();
        assert_eq!(ticket.ranges.len(), 3);
        let outcome = execute(&store, &ticket);
        assert_eq!(outcome.unissued, vec![FetchRange::new(11, 4)]);

        let err = coalescer.complete(&mut cache, outcome).unwrap_err();
        assert_eq!(err.range, FetchRange::new(6, 4));
        assert_eq!(store.calls(), vec![(0, 5), (6, 4)]);
        assert_eq!(cache.get(0), Some("line 0"));
        assert_eq!(cache.get(5), Some("cached"));
        assert!(!cache.contains(7));
        assert_eq!(coalescer.outstanding_calls(), 0);

        let retry = coalescer.plan(&cache, 0, 15, session()).unwrap();
        assert_eq!(
            retry.ranges,
            vec![FetchRange::new(6, 4), FetchRange::new(11, 4)]
        );
    }

    #[test]
    fn short_read_leaves_tail_missing() {
        let store = ScriptedStore::new(12);
        let mut cache = LineCache::new();
        let mut coalescer = FetchCoalescer::new();

        let ticket = coalescer.plan(&cache, 10, 15, session()).unwrap();
        assert_eq!(ticket.ranges, vec![FetchRange::new(10, 5)]);

        assert_eq!(coalescer.complete(&mut cache, execute(&store, &ticket)), Ok(2));
        assert_eq!(cache.missing(10, 15), vec![12, 13, 14]);
    }

    #[test]
    fn outcome_after_reset_is_ignored() {
        let store = ScriptedStore::new(50);
        let mut cache = LineCache::new();
        let mut coalescer = FetchCoalescer::new();

        let stale = coalescer.plan(&cache, 0, 10, session()).unwrap();
        coalescer.reset();
        let fresh = coalescer.plan(&cache, 0, 10, session()).unwrap();
        assert_ne!(stale.call, fresh.call);

        assert_eq!(coalescer.complete(&mut cache, execute(&store, &stale)), Ok(0));
        assert!(cache.is_empty());
        assert!(coalescer.is_in_flight(3));
    }

    proptest! {
        #[test]
        fn coalesced_runs_cover_exactly_the_missing_set(
            indices in prop::collection::btree_set(0usize..500, 0..120)
        ) {
            let missing: Vec<usize> = indices.iter().copied().collect();
            let ranges = coalesce(&missing);

            let covered: BTreeSet<usize> = ranges.iter().flat_map(|r| r.indices()).collect();
            prop_assert_eq!(&covered, &indices);
            prop_assert_eq!(ranges.iter().map(|r| r.count).sum::<usize>(), missing.len());

            for pair in ranges.windows(2) {
                prop_assert!(pair[0].count > 0);
                prop_assert!(pair[0].end() < pair[1].start);
            }
        }

        #[test]
        fn planning_twice_never_overlaps(
            cached in prop::collection::btree_set(0usize..200, 0..80),
            a in 0usize..200,
            b in 0usize..200,
        ) {
            let mut cache = LineCache::new();
            for index in &cached {
                cache.insert(*index, String::new());
            }
            let mut coalescer = FetchCoalescer::new();
            let (start, end) = (a.min(b), a.max(b));

            let first = coalescer.plan(&cache, start, end, session());
            let second = coalescer.plan(&cache, 0, 200, session());

            let first_set: BTreeSet<usize> = first.iter().flat_map(|t| t.ranges.iter().flat_map(|r| r.indices())).collect();
            let second_set: BTreeSet<usize> = second.iter().flat_map(|t| t.ranges.iter().flat_map(|r| r.indices())).collect();
            prop_assert!(first_set.is_disjoint(&second_set));
            prop_assert!(first_set.is_disjoint(&cached));
            prop_assert!(second_set.is_disjoint(&cached));
        }
    }
}
