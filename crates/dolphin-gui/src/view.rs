use crate::message::Message;
use dolphin_core::{RowDescriptor, SessionController};
use iced::widget::{Column, button, column, container, mouse_area, row, scrollable, text};
use iced::{Alignment, Element, Font, Length, Theme};

pub const FONT_SIZE: f32 = 13.0;
/// Height of one raw-view row. Rows are laid out at this fixed height so the
/// engine's offsets match what is drawn.
pub const ROW_HEIGHT: f32 = FONT_SIZE * 1.3;
/// Toolbar, status bar and padding around the raw view.
pub const CHROME_HEIGHT: f32 = 96.0;
const GUTTER_WIDTH: f32 = 72.0;
const RECENT_FILES_SHOWN: usize = 5;

pub fn view<'a>(
    session: &'a SessionController,
    recent_files: impl Iterator<Item = &'a str>,
) -> Element<'a, Message> {
    column![
        toolbar(recent_files),
        row![raw_view(session), pretty_view(session)]
            .spacing(8)
            .height(Length::Fill),
        status_bar(session),
    ]
    .spacing(8)
    .padding(8)
    .into()
}

fn toolbar<'a>(recent_files: impl Iterator<Item = &'a str>) -> Element<'a, Message> {
    let mut bar = row![button(text("Open File…")).on_press(Message::OpenFileRequested)]
        .spacing(8)
        .align_y(Alignment::Center);

    for path in recent_files.take(RECENT_FILES_SHOWN) {
        let label = std::path::Path::new(path)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string());
        bar = bar.push(
            button(text(label).size(12))
                .style(button::secondary)
                .on_press(Message::OpenPath(path.into())),
        );
    }

    container(bar).width(Length::Fill).into()
}

fn raw_view(session: &SessionController) -> Element<'_, Message> {
    let rows = session.render();
    // iced lays out in f32; engine geometry is converted only here.
    let leading = rows.leading_space() as f32;
    let trailing = rows.trailing_space() as f32;

    let mut content = Column::new().width(Length::Fill).push(spacer(leading));
    for descriptor in rows.rows {
        content = content.push(raw_row(descriptor));
    }
    content = content.push(spacer(trailing));

    let surface = scrollable(content)
        .on_scroll(|viewport| Message::Scrolled {
            offset: viewport.absolute_offset().y,
            height: viewport.bounds().height,
        })
        .width(Length::Fill)
        .height(Length::Fill);

    container(surface)
        .style(container::bordered_box)
        .width(Length::FillPortion(3))
        .height(Length::Fill)
        .into()
}

fn spacer<'a>(height: f32) -> Element<'a, Message> {
    Column::new()
        .width(Length::Fill)
        .height(Length::Fixed(height))
        .into()
}

fn raw_row(descriptor: RowDescriptor<'_>) -> Element<'_, Message> {
    let index = descriptor.index;
    let is_active = descriptor.is_active;

    let line = row![
        text(descriptor.label)
            .size(FONT_SIZE)
            .font(Font::MONOSPACE)
            .width(Length::Fixed(GUTTER_WIDTH)),
        text(descriptor.text)
            .size(FONT_SIZE)
            .font(Font::MONOSPACE)
            .wrapping(text::Wrapping::None),
    ]
    .spacing(8);

    let body = container(line)
        .width(Length::Fill)
        .height(Length::Fixed(descriptor.height as f32))
        .clip(true)
        .style(move |theme: &Theme| row_style(theme, is_active));

    mouse_area(body).on_press(Message::RowClicked(index)).into()
}

fn row_style(theme: &Theme, is_active: bool) -> container::Style {
    if !is_active {
        return container::Style::default();
    }
    let palette = theme.extended_palette();
    container::Style {
        background: Some(palette.primary.weak.color.into()),
        text_color: Some(palette.primary.weak.text),
        ..container::Style::default()
    }
}

fn pretty_view(session: &SessionController) -> Element<'_, Message> {
    let body = text(session.structured_text().into_owned())
        .size(FONT_SIZE)
        .font(Font::MONOSPACE);

    container(scrollable(container(body).padding(8)).height(Length::Fill))
        .style(container::bordered_box)
        .width(Length::FillPortion(2))
        .height(Length::Fill)
        .into()
}

fn status_bar(session: &SessionController) -> Element<'_, Message> {
    container(
        row![
            text(session.file_path_text()).size(12).width(Length::Fill),
            text(session.total_lines_text()).size(12),
            text(session.status_text()).size(12),
            text(session.cursor_text()).size(12),
        ]
        .spacing(24)
        .align_y(Alignment::Center),
    )
    .padding([4, 8])
    .width(Length::Fill)
    .into()
}
