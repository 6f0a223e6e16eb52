use crate::commands;
use crate::message::Message;
use crate::view::{self, CHROME_HEIGHT, ROW_HEIGHT};
use dolphin_config::{ViewerConfig, default_config_path, index_cache_dir};
use dolphin_core::{FillTicket, SessionController};
use dolphin_document::{FileLineStore, IndexCache};
use iced::event::{self, Event};
use iced::{Element, Subscription, Task, Theme, time, window};
use std::path::PathBuf;
use std::sync::Arc;

pub fn run() -> iced::Result {
    iced::application(ViewerApp::boot, ViewerApp::update, ViewerApp::view)
        .title(ViewerApp::title)
        .subscription(ViewerApp::subscription)
        .theme(ViewerApp::theme)
        .run()
}

struct ViewerApp {
    session: SessionController,
    store: Arc<FileLineStore>,
    config: ViewerConfig,
    config_path: Option<PathBuf>,
}

/// Rows are drawn at a fixed height, so measuring one is a constant.
fn row_probe() -> f64 {
    f64::from(ROW_HEIGHT)
}

impl ViewerApp {
    fn boot() -> (Self, Task<Message>) {
        let config_path = default_config_path();
        let config = match &config_path {
            Some(path) => ViewerConfig::load_or_default(path).unwrap_or_else(|err| {
                tracing::warn!("Failed to load settings from {}: {}", path.display(), err);
                ViewerConfig::default()
            }),
            None => ViewerConfig::default(),
        };

        let store = match index_cache_dir().filter(|_| config.use_index_cache) {
            Some(dir) => FileLineStore::with_index_cache(IndexCache::new(dir)),
            None => FileLineStore::new(),
        };

        let app = Self {
            session: SessionController::new(&config),
            store: Arc::new(store),
            config,
            config_path,
        };
        (app, Task::none())
    }

    fn title(&self) -> String {
        match self.session.path().and_then(|path| path.file_name()) {
            Some(name) => format!("Dolphin - {}", name.to_string_lossy()),
            None => "Dolphin".to_string(),
        }
    }

    fn theme(&self) -> Theme {
        Theme::Dark
    }

    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::OpenFileRequested => {
                return Task::perform(commands::pick_file(), Message::FilePicked);
            }
            Message::FilePicked(Some(path)) | Message::OpenPath(path) => {
                return self.open(path);
            }
            Message::FilePicked(None) => {
                // user cancelled dialog
            }
            Message::FileOpened(response) => {
                let current = response.ticket.session == self.session.session();
                let opened = response.result.is_ok();
                let path = response.ticket.path.clone();

                let fill = self.session.apply_open(response, &row_probe);
                if current && opened {
                    return Task::batch([self.fetch(fill), self.remember(path)]);
                }
                return self.fetch(fill);
            }
            Message::LinesFetched(outcome) => {
                if let Err(err) = self.session.apply_fill(outcome) {
                    tracing::debug!("line fetch failed: {}", err);
                }
            }
            Message::Scrolled { offset, height } => {
                let height = f64::from(height);
                if (height - self.session.viewport().viewport_height()).abs() > f64::EPSILON {
                    self.session.resize(height);
                }
                self.session.scroll_to(f64::from(offset));
            }
            Message::WindowResized(size) => {
                let height = (size.height - CHROME_HEIGHT).max(ROW_HEIGHT);
                self.session.resize(f64::from(height));
            }
            Message::Frame => {
                let fill = self.session.frame();
                return self.fetch(fill);
            }
            Message::RowClicked(index) => {
                if let Some(ticket) = self.session.click_row(index) {
                    return Task::perform(
                        commands::fetch_line(Arc::clone(&self.store), ticket),
                        Message::LineFetched,
                    );
                }
            }
            Message::LineFetched(response) => {
                self.session.apply_line(response);
            }
            Message::PollTick => {
                if let Some(ticket) = self.session.poll_status() {
                    return Task::perform(
                        commands::fetch_status(Arc::clone(&self.store), ticket),
                        Message::StatusFetched,
                    );
                }
            }
            Message::StatusFetched(response) => {
                self.session.apply_status(response);
            }
            Message::ConfigSaved(result) => match result {
                Ok(path) => tracing::debug!("settings saved to {}", path.display()),
                Err(err) => tracing::warn!("{}", err),
            },
        }

        Task::none()
    }

    fn view(&self) -> Element<'_, Message> {
        view::view(&self.session, self.config.recent_files())
    }

    fn subscription(&self) -> Subscription<Message> {
        let mut subscriptions = vec![event::listen_with(window_event)];
        if self.session.is_polling() {
            subscriptions.push(time::every(self.session.poll_interval()).map(|_| Message::PollTick));
        }
        if self.session.render_pending() {
            subscriptions.push(window::frames().map(|_| Message::Frame));
        }
        Subscription::batch(subscriptions)
    }

    fn open(&mut self, path: PathBuf) -> Task<Message> {
        let ticket = self.session.open(path);
        tracing::info!("Opening {}", ticket.path.display());
        Task::perform(
            commands::open_file(Arc::clone(&self.store), ticket),
            Message::FileOpened,
        )
    }

    fn fetch(&self, ticket: Option<FillTicket>) -> Task<Message> {
        match ticket {
            Some(ticket) => Task::perform(
                commands::fetch_lines(Arc::clone(&self.store), ticket),
                Message::LinesFetched,
            ),
            None => Task::none(),
        }
    }

    /// Promote `path` in the recent files list and persist the settings.
    fn remember(&mut self, path: PathBuf) -> Task<Message> {
        if !self.config.record_recent_file(&path) {
            return Task::none();
        }
        match &self.config_path {
            Some(config_path) => Task::perform(
                commands::save_config(config_path.clone(), self.config.clone()),
                Message::ConfigSaved,
            ),
            None => Task::none(),
        }
    }
}

fn window_event(event: Event, _status: event::Status, _window: window::Id) -> Option<Message> {
    match event {
        Event::Window(window::Event::FileDropped(path)) => Some(Message::OpenPath(path)),
        Event::Window(window::Event::Resized(size)) => Some(Message::WindowResized(size)),
        Event::Window(window::Event::Opened { size, .. }) => Some(Message::WindowResized(size)),
        _ => None,
    }
}
