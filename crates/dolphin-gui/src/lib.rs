mod app;
mod commands;
mod message;
mod view;

pub use app::run;
pub use iced::Error;
