use dolphin_core::{FillOutcome, LineResponse, OpenResponse, StatusResponse};
use iced::Size;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub enum Message {
    OpenFileRequested,
    FilePicked(Option<PathBuf>),
    OpenPath(PathBuf),
    FileOpened(OpenResponse),
    LinesFetched(FillOutcome),
    Scrolled { offset: f32, height: f32 },
    WindowResized(Size),
    Frame,
    RowClicked(usize),
    LineFetched(LineResponse),
    PollTick,
    StatusFetched(StatusResponse),
    ConfigSaved(Result<PathBuf, String>),
}
