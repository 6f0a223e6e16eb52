//! Active line tracking and the structured (pretty-printed) view of the
//! selected line.

use crate::session::SessionId;
use crate::store::{LineStore, StoreError};
use std::borrow::Cow;
use tracing::debug;

/// Request for the raw content of one line, tagged for latest-wins.
#[derive(Debug, Clone, PartialEq)]
pub struct LineTicket {
    pub session: SessionId,
    pub seq: u64,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineResponse {
    pub ticket: LineTicket,
    pub result: Result<String, StoreError>,
}

pub fn execute<S: LineStore + ?Sized>(store: &S, ticket: LineTicket) -> LineResponse {
    let result = store.get_line(ticket.index);
    LineResponse { ticket, result }
}

/// What the structured view currently shows.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum StructuredView {
    #[default]
    Empty,
    Loading(usize),
    /// Canonical re-serialization of a valid line.
    Pretty(String),
    /// The line is not valid JSON; the raw content is kept verbatim.
    Invalid { error: String, raw: String },
    /// The backend could not deliver the line.
    Unavailable(String),
}

impl StructuredView {
    pub fn text(&self) -> Cow<'_, str> {
        match self {
            StructuredView::Empty | StructuredView::Loading(_) => Cow::Borrowed(""),
            StructuredView::Pretty(text) => Cow::Borrowed(text),
            StructuredView::Invalid { error, raw } => Cow::Owned(format!(
                "Invalid JSON on this line: {error}\n\nRaw content:\n{raw}"
            )),
            StructuredView::Unavailable(error) => {
                Cow::Owned(format!("Error fetching line content: {error}"))
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, StructuredView::Empty)
    }
}

/// Parse `raw` as JSON and pretty-print it with two-space indentation,
/// keeping object keys in their original order.
pub fn structure_line(raw: &str) -> StructuredView {
    let parsed = serde_json::from_str::<serde_json::Value>(raw)
        .and_then(|value| serde_json::to_string_pretty(&value));
    match parsed {
        Ok(pretty) => StructuredView::Pretty(pretty),
        Err(err) => StructuredView::Invalid {
            error: err.to_string(),
            raw: raw.to_string(),
        },
    }
}

#[derive(Debug, Default)]
pub struct SelectionController {
    active: Option<usize>,
    latest_seq: u64,
    pending: Option<LineTicket>,
    view: StructuredView,
}

impl SelectionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<usize> {
        self.active
    }

    pub fn view(&self) -> &StructuredView {
        &self.view
    }

    pub fn pending(&self) -> Option<&LineTicket> {
        self.pending.as_ref()
    }

    /// Make `index` the active line and request its content.
    ///
    /// Any earlier request becomes stale. An index outside
    /// `[0, total_lines)` clears the view and requests nothing.
    pub fn select(
        &mut self,
        index: usize,
        total_lines: usize,
        session: SessionId,
    ) -> Option<LineTicket> {
        self.latest_seq = self.latest_seq.wrapping_add(1);

        if index >= total_lines {
            debug!(index, total_lines, "selection outside document");
            self.active = None;
            self.pending = None;
            self.view = StructuredView::Empty;
            return None;
        }

        self.active = Some(index);
        self.view = StructuredView::Loading(index);
        let ticket = LineTicket {
            session,
            seq: self.latest_seq,
            index,
        };
        self.pending = Some(ticket.clone());
        Some(ticket)
    }

    /// Show `response` if it answers the most recent request. Returns
    /// whether it was applied.
    pub fn apply(&mut self, response: LineResponse) -> bool {
        if self.pending.as_ref() != Some(&response.ticket) {
            debug!(
                index = response.ticket.index,
                seq = response.ticket.seq,
                "discarding stale line response"
            );
            return false;
        }

        self.pending = None;
        self.view = match response.result {
            Ok(raw) => structure_line(&raw),
            Err(err) => StructuredView::Unavailable(err.to_string()),
        };
        true
    }

    pub fn clear(&mut self) {
        self.latest_seq = self.latest_seq.wrapping_add(1);
        self.active = None;
        self.pending = None;
        self.view = StructuredView::Empty;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn respond(ticket: &LineTicket, raw: &str) -> LineResponse {
        LineResponse {
            ticket: ticket.clone(),
            result: Ok(raw.to_string()),
        }
    }

    #[test]
    fn valid_line_is_pretty_printed_in_key_order() {
        let view = structure_line(r#"{"b":1,"a":[true,null]}"#);
        assert_eq!(
            view,
            StructuredView::Pretty("{\n  \"b\": 1,\n  \"a\": [\n    true,\n    null\n  ]\n}".into())
        );
        assert_eq!(view, structure_line(r#"{"b":1,"a":[true,null]}"#));
    }

    #[test]
    fn invalid_line_keeps_raw_text() {
        let raw = r#"{"unterminated": "#;
        let text = structure_line(raw).text().into_owned();
        assert!(text.starts_with("Invalid JSON on this line: "));
        assert!(text.ends_with(&format!("Raw content:\n{raw}")));
    }

    #[test]
    fn latest_selection_wins() {
        let mut selection = SelectionController::new();
        let session = SessionId::default();
        let five = selection.select(5, 10, session).unwrap();
        let six = selection.select(6, 10, session).unwrap();

        assert!(selection.apply(respond(&six, "[6]")));
        assert!(!selection.apply(respond(&five, "[5]")));
        assert_eq!(selection.active(), Some(6));
        assert_eq!(selection.view(), &StructuredView::Pretty("[\n  6\n]".into()));
    }

    #[test]
    fn stale_response_arriving_first_is_discarded() {
        let mut selection = SelectionController::new();
        let session = SessionId::default();
        let five = selection.select(5, 10, session).unwrap();
        let six = selection.select(6, 10, session).unwrap();

        assert!(!selection.apply(respond(&five, "[5]")));
        assert_eq!(selection.view(), &StructuredView::Loading(6));
        assert!(selection.apply(respond(&six, "[6]")));
    }

    #[test]
    fn out_of_range_selection_clears_without_fetching() {
        let mut selection = SelectionController::new();
        let session = SessionId::default();
        let ticket = selection.select(2, 3, session).unwrap();

        assert!(selection.select(3, 3, session).is_none());
        assert!(selection.view().is_empty());
        assert_eq!(selection.active(), None);
        assert!(!selection.apply(respond(&ticket, "{}")));
    }

    #[test]
    fn backend_error_is_shown_inline() {
        let mut selection = SelectionController::new();
        let ticket = selection.select(0, 1, SessionId::default()).unwrap();
        selection.apply(LineResponse {
            ticket,
            result: Err(StoreError::NoFileOpen),
        });
        assert_eq!(
            selection.view().text(),
            "Error fetching line content: No file is currently open."
        );
    }
}
