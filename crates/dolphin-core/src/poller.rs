use crate::error::ViewerError;
use crate::store::{IndexingStatus, StoreError};
use std::time::Duration;
use tracing::{debug, error};

pub const READY_TEXT: &str = "Ready";
pub const STATUS_FETCH_FAILED_TEXT: &str = "Error fetching status.";

/// Result of feeding one status response to the poller.
#[derive(Debug, Clone, PartialEq)]
pub struct PollUpdate {
    /// Text for the status area.
    pub text: String,
    pub progress: Option<f32>,
    /// The poller stopped because of this response.
    pub stopped: bool,
    pub error: Option<ViewerError>,
}

/// Fixed-interval poll of backend indexing progress.
///
/// The poller only tracks whether it is armed and whether a poll is in
/// flight; the driver owns the timer and asks [`begin_poll`](Self::begin_poll)
/// on every tick. Dropping or stopping the poller cancels the cycle.
#[derive(Debug)]
pub struct IndexingStatusPoller {
    interval: Duration,
    running: bool,
    in_flight: bool,
    polls: u64,
}

impl IndexingStatusPoller {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            running: false,
            in_flight: false,
            polls: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn polls(&self) -> u64 {
        self.polls
    }

    /// Arm the poller. Returns `false` without re-arming when it is already
    /// running.
    pub fn start(&mut self) -> bool {
        if self.running {
            return false;
        }
        self.running = true;
        self.in_flight = false;
        debug!(interval_ms = self.interval.as_millis() as u64, "status polling started");
        true
    }

    pub fn stop(&mut self) {
        if self.running {
            debug!(polls = self.polls, "status polling stopped");
        }
        self.running = false;
        self.in_flight = false;
    }

    /// Claim the next poll. Refused while stopped or while a previous poll
    /// has not been answered.
    pub fn begin_poll(&mut self) -> bool {
        if !self.running || self.in_flight {
            return false;
        }
        self.in_flight = true;
        self.polls += 1;
        true
    }

    /// Apply a status response. Returns `None` when the poller is no longer
    /// running, so late responses cannot overwrite newer text.
    pub fn on_status(&mut self, result: Result<IndexingStatus, StoreError>) -> Option<PollUpdate> {
        if !self.running {
            return None;
        }
        self.in_flight = false;

        match result {
            Ok(status) => {
                let mut text = status.display_text();
                let stopped = status.is_terminal();
                if stopped {
                    self.stop();
                    if status.is_complete() && !status.indicates_error() {
                        text = READY_TEXT.to_string();
                    }
                }
                Some(PollUpdate {
                    text,
                    progress: Some(status.progress),
                    stopped,
                    error: None,
                })
            }
            Err(err) => {
                error!("Error fetching indexing status: {}", err);
                self.stop();
                Some(PollUpdate {
                    text: STATUS_FETCH_FAILED_TEXT.to_string(),
                    progress: None,
                    stopped: true,
                    error: Some(ViewerError::Status(err)),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn poller() -> IndexingStatusPoller {
        let mut poller = IndexingStatusPoller::new(Duration::from_millis(500));
        assert!(poller.start());
        poller
    }

    #[test]
    fn start_does_not_rearm() {
        let mut poller = poller();
        assert!(poller.begin_poll());
        assert!(!poller.start());
        assert!(!poller.begin_poll());
    }

    #[test]
    fn one_poll_in_flight_at_a_time() {
        let mut poller = poller();
        assert!(poller.begin_poll());
        assert!(!poller.begin_poll());

        let update = poller
            .on_status(Ok(IndexingStatus::new("Indexing line offsets...", 0.1)))
            .unwrap();
        assert_eq!(update.text, "Indexing line offsets... (10%)");
        assert!(!update.stopped);
        assert!(poller.begin_poll());
    }

    #[test]
    fn completion_forces_ready_and_stops_polling() {
        let mut poller = poller();
        assert!(poller.begin_poll());

        let update = poller
            .on_status(Ok(IndexingStatus::new("Built line offsets.", 1.0)))
            .unwrap();
        assert_eq!(update.text, READY_TEXT);
        assert!(update.stopped);
        assert!(!poller.is_running());
        assert!(!poller.begin_poll());
        assert_eq!(poller.polls(), 1);
    }

    #[test]
    fn error_message_stops_without_ready() {
        let mut poller = poller();
        poller.begin_poll();
        let update = poller
            .on_status(Ok(IndexingStatus::new("Error: permission denied", 1.0)))
            .unwrap();
        assert_eq!(update.text, "Error: permission denied (100%)");
        assert!(update.stopped);
    }

    #[test]
    fn transport_failure_stops_and_surfaces() {
        let mut poller = poller();
        poller.begin_poll();
        let update = poller
            .on_status(Err(StoreError::Backend("channel closed".into())))
            .unwrap();
        assert_eq!(update.text, STATUS_FETCH_FAILED_TEXT);
        assert!(matches!(update.error, Some(ViewerError::Status(_))));
        assert!(!poller.is_running());
        assert!(poller.on_status(Ok(IndexingStatus::new("Ready", 1.0))).is_none());
    }
}
