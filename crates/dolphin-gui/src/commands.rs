//! Async work handed to iced as `Task`s.
//!
//! Backend calls block on disk IO, so each one runs on tokio's blocking pool
//! and comes back as the response the session expects. A worker that dies
//! before answering is reported as a backend error on that response.

use dolphin_config::ViewerConfig;
use dolphin_core::{
    FetchError, FillOutcome, FillTicket, LineResponse, LineTicket, OpenResponse, OpenTicket,
    StatusResponse, StatusTicket, StoreError, coalescer, execute_open, execute_status, selection,
};
use dolphin_document::FileLineStore;
use rfd::AsyncFileDialog;
use std::path::PathBuf;
use std::sync::Arc;

async fn blocking<T, F>(job: F) -> Result<T, StoreError>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|err| StoreError::Backend(format!("Background task failed: {err}")))
}

pub async fn pick_file() -> Option<PathBuf> {
    AsyncFileDialog::new()
        .add_filter("JSON Lines", &["jsonl", "json"])
        .add_filter("All Files", &["*"])
        .pick_file()
        .await
        .map(|handle| handle.path().to_path_buf())
}

pub async fn open_file(store: Arc<FileLineStore>, ticket: OpenTicket) -> OpenResponse {
    let fallback = ticket.clone();
    match blocking(move || execute_open(store.as_ref(), ticket)).await {
        Ok(response) => response,
        Err(err) => OpenResponse {
            ticket: fallback,
            result: Err(err),
            final_status: None,
        },
    }
}

pub async fn fetch_lines(store: Arc<FileLineStore>, ticket: FillTicket) -> FillOutcome {
    let fallback = ticket.clone();
    match blocking(move || coalescer::execute(store.as_ref(), &ticket)).await {
        Ok(outcome) => outcome,
        Err(source) => {
            let (failed, rest) = match fallback.ranges.split_first() {
                Some((first, rest)) => (Some(*first), rest.to_vec()),
                None => (None, Vec::new()),
            };
            FillOutcome {
                session: fallback.session,
                call: fallback.call,
                filled: Vec::new(),
                failure: failed.map(|range| FetchError { range, source }),
                unissued: rest,
            }
        }
    }
}

pub async fn fetch_line(store: Arc<FileLineStore>, ticket: LineTicket) -> LineResponse {
    let fallback = ticket.clone();
    match blocking(move || selection::execute(store.as_ref(), ticket)).await {
        Ok(response) => response,
        Err(err) => LineResponse {
            ticket: fallback,
            result: Err(err),
        },
    }
}

pub async fn fetch_status(store: Arc<FileLineStore>, ticket: StatusTicket) -> StatusResponse {
    match blocking(move || execute_status(store.as_ref(), ticket)).await {
        Ok(response) => response,
        Err(err) => StatusResponse {
            ticket,
            result: Err(err),
        },
    }
}

pub async fn save_config(path: PathBuf, config: ViewerConfig) -> Result<PathBuf, String> {
    blocking(move || {
        config
            .save(&path)
            .map(|()| path)
            .map_err(|err| format!("Failed to save settings: {}", err))
    })
    .await
    .map_err(|err| err.to_string())?
}
