use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};
use crate::app::{App, Modal, Screen, CONFIRM_DELETE};
use crate::dispatch::DispatchState;
use crate::format::{self, Segment};
use crate::model::{Chat, Message, Sender};
use crate::transcript::Entry;

/// Rows per chat in the list: title, preview, footer, spacer
pub const ITEM_HEIGHT: u16 = 4;
/// Columns at the right edge of a title row that act as the delete button
pub const DELETE_HIT_WIDTH: u16 = 3;
const MAX_INPUT_LINES: u16 = 6;

/// Convert `**bold**` runs in one line to styled spans
fn styled_line(text: &str, base: Style) -> Line<'static> {
    let spans: Vec<Span<'static>> = format::segments(text)
        .into_iter()
        .map(|seg| match seg {
            Segment::Plain(s) => Span::styled(s.to_string(), base),
            Segment::Bold(s) => Span::styled(s.to_string(), base.add_modifier(Modifier::BOLD)),
        })
        .collect();

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(4));
    let height = height.min(area.height.saturating_sub(2));
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    match app.screen {
        Screen::ChatList => render_chat_list(app, frame, body_area),
        Screen::Chat => render_chat(app, frame, body_area),
    }

    render_footer(app, frame, footer_area);

    app.modal_area = match app.modal {
        Some(Modal::NewChat) => Some(render_new_chat_modal(app, frame, area)),
        Some(Modal::Settings) => Some(render_settings_modal(app, frame, area)),
        Some(Modal::ConfirmDelete) => Some(render_confirm_delete(frame, area)),
        None => None,
    };
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let location = match app.screen {
        Screen::ChatList => format!(" [{} миров]", app.chats.len()),
        Screen::Chat => {
            let waiting = match app.view.dispatcher.state() {
                DispatchState::Sending(_) => " ⏳",
                DispatchState::Idle => "",
            };
            format!(" {}  💬 {}{}", app.chat_title, app.transcript.messages().count(), waiting)
        }
    };

    let title = Line::from(vec![
        Span::styled(" 🖤 Тейя ", Style::default().fg(Color::Magenta).bold()),
        Span::styled(location, Style::default().fg(Color::White)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let keys: &[(&str, &str)] = match (app.modal, app.screen) {
        (Some(Modal::NewChat), _) => &[
            ("Enter", "создать"),
            ("Alt+Enter", "новая строка"),
            ("Esc", "закрыть"),
        ],
        (Some(Modal::Settings), _) => &[("Esc", "закрыть")],
        (Some(Modal::ConfirmDelete), _) => &[("y", "удалить"), ("n", "отмена")],
        (None, Screen::ChatList) => &[
            ("j/k", "выбор"),
            ("Enter", "открыть"),
            ("n", "новый мир"),
            ("d", "удалить"),
            ("r", "обновить"),
            ("q", "выход"),
        ],
        (None, Screen::Chat) if app.view.dispatcher.is_pending() => &[
            ("Ctrl+X", "стоп"),
            ("PgUp/PgDn", "прокрутка"),
            ("Esc", "назад"),
        ],
        (None, Screen::Chat) => &[
            ("Enter", "отправить"),
            ("Alt+Enter", "строка"),
            ("Ctrl+X", "стоп"),
            ("Ctrl+S", "запрос"),
            ("Ctrl+D", "удалить"),
            ("PgUp/PgDn", "прокрутка"),
            ("Esc", "назад"),
        ],
    };

    let mode_text = match app.screen {
        Screen::ChatList => " МИРЫ ",
        Screen::Chat => " ЧАТ ",
    };
    let mut spans = vec![Span::styled(
        mode_text,
        Style::default().bg(Color::Magenta).fg(Color::White),
    )];
    for (key, label) in keys {
        spans.push(Span::styled(format!(" {} ", key), key_style));
        spans.push(Span::styled(format!(" {} ", label), label_style));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_chat_list(app: &mut App, frame: &mut Frame, area: Rect) {
    let (status_area, list_area) = if app.list_status.is_some() {
        let [status, list] =
            Layout::vertical([Constraint::Length(1), Constraint::Min(0)]).areas(area);
        (Some(status), list)
    } else {
        (None, area)
    };

    if let (Some(status), Some(text)) = (status_area, app.list_status.as_deref()) {
        frame.render_widget(
            Paragraph::new(format!(" ⚠ {}", text)).style(Style::default().fg(Color::Red)),
            status,
        );
    }

    app.list_area = Some(list_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta))
        .title(" Миры ");

    if app.chats.is_empty() {
        let text = if app.chats_loaded {
            Text::from(vec![
                Line::default(),
                Line::from("🖤 У тебя пока нет миров"),
                Line::from(Span::styled(
                    "Нажми n чтобы создать первый",
                    Style::default().fg(Color::DarkGray),
                )),
            ])
        } else {
            Text::from(Span::styled("Загрузка...", Style::default().fg(Color::DarkGray)))
        };
        let placeholder = Paragraph::new(text).alignment(Alignment::Center).block(block);
        frame.render_widget(placeholder, list_area);
        return;
    }

    // Inner width minus the "> " highlight symbol
    let width = list_area.width.saturating_sub(4) as usize;
    let items: Vec<ListItem> = app.chats.iter().map(|chat| chat_item(chat, width)).collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(Color::Blue).fg(Color::White))
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, list_area, &mut app.chats_state);
}

fn chat_item(chat: &Chat, width: usize) -> ListItem<'static> {
    let delete = "✕";
    let title_room = width.saturating_sub(DELETE_HIT_WIDTH as usize);
    let title: String = chat.title.chars().take(title_room).collect();
    let pad = title_room.saturating_sub(title.chars().count()) + 1;

    let title_line = Line::from(vec![
        Span::styled(title, Style::default().fg(Color::Yellow).bold()),
        Span::raw(" ".repeat(pad)),
        Span::styled(delete, Style::default().fg(Color::Red)),
    ]);
    // Previews are plain text; bold markup is only rendered in the transcript
    let preview_line = Line::from(format::preview(chat.last_message.as_deref()).replace('\n', " "));
    let footer_line = Line::from(vec![
        Span::styled(
            format::list_date(chat.last_updated.as_deref()),
            Style::default().fg(Color::DarkGray),
        ),
        Span::raw("   "),
        Span::styled(
            format!("💬 {}", chat.message_count()),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    ListItem::new(vec![title_line, preview_line, footer_line, Line::default()])
}

fn message_lines(message: &Message, lines: &mut Vec<Line<'static>>) {
    let (label, label_style, body_style) = match message.sender {
        Sender::User => (
            "Ты:",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            Style::default(),
        ),
        Sender::Assistant => (
            "Тейя:",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            Style::default(),
        ),
        Sender::System => (
            "",
            Style::default(),
            Style::default().fg(Color::Magenta).add_modifier(Modifier::ITALIC),
        ),
    };

    if !label.is_empty() {
        lines.push(Line::from(Span::styled(label, label_style)));
    }
    for line in message.content.split('\n') {
        lines.push(styled_line(line, body_style));
    }
    lines.push(Line::default());
}

/// Rows a set of lines occupies once wrapped to `width`
fn wrapped_height(lines: &[Line], width: u16) -> u16 {
    let width = width.max(1) as usize;
    lines
        .iter()
        .map(|l| l.width().max(1).div_ceil(width) as u16)
        .fold(0u16, |acc, h| acc.saturating_add(h))
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let input_lines = (app.input.line_count() as u16).clamp(1, MAX_INPUT_LINES);
    let [chat_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(input_lines + 2),
    ])
    .areas(area);

    let mut lines: Vec<Line<'static>> = Vec::new();
    for entry in app.transcript.entries() {
        if let Entry::Settled(message) = entry {
            message_lines(message, &mut lines);
        }
    }

    if app.transcript.is_typing() {
        lines.push(Line::from(Span::styled(
            "Тейя:",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Тейя печатает{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    let inner_width = chat_area.width.saturating_sub(2);
    let inner_height = chat_area.height.saturating_sub(2);
    app.transcript.fit(wrapped_height(&lines, inner_width), inner_height);

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta))
        .title(format!(" {} ", app.chat_title));

    let chat = Paragraph::new(Text::from(lines))
        .block(chat_block)
        .wrap(Wrap { trim: false })
        .scroll((app.transcript.scroll, 0));
    frame.render_widget(chat, chat_area);

    app.scroll_button_area = if app.transcript.show_scroll_button() && chat_area.width > 6 {
        let button = Rect::new(
            chat_area.x + chat_area.width - 5,
            chat_area.y + chat_area.height.saturating_sub(2),
            3,
            1,
        );
        frame.render_widget(
            Paragraph::new(" ↓ ").style(Style::default().bg(Color::Magenta).fg(Color::White)),
            button,
        );
        Some(button)
    } else {
        None
    };

    render_input(app, frame, input_area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Сообщение ");

    let inner_width = area.width.saturating_sub(2) as usize;
    let inner_height = area.height.saturating_sub(2) as usize;
    let (line, column) = app.input.cursor_position();

    // Keep the cursor visible in both directions
    let v_offset = (line + 1).saturating_sub(inner_height);
    let h_offset = if inner_width == 0 {
        0
    } else {
        (column + 1).saturating_sub(inner_width)
    };

    let input = Paragraph::new(app.input.text().to_string())
        .style(Style::default().fg(Color::Cyan))
        .block(block)
        .scroll((v_offset as u16, h_offset as u16));
    frame.render_widget(input, area);

    if app.modal.is_none() {
        frame.set_cursor_position((
            area.x + 1 + column.saturating_sub(h_offset) as u16,
            area.y + 1 + line.saturating_sub(v_offset) as u16,
        ));
    }
}

fn render_new_chat_modal(app: &App, frame: &mut Frame, area: Rect) -> Rect {
    let popup_area = centered(area, 64, 12);
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta))
        .title(" Новый мир ");
    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let [hint_area, input_area, notice_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(1),
        Constraint::Length(1),
    ])
    .areas(inner);

    frame.render_widget(
        Paragraph::new("О чём будет история?").style(Style::default().fg(Color::DarkGray)),
        hint_area,
    );

    let input = &app.new_chat_input;
    let (line, column) = input.cursor_position();
    let width = input_area.width.max(1) as usize;
    let height = input_area.height.max(1) as usize;
    let v_offset = (line + 1).saturating_sub(height);
    let h_offset = (column + 1).saturating_sub(width);

    frame.render_widget(
        Paragraph::new(input.text().to_string())
            .style(Style::default().fg(Color::Cyan))
            .scroll((v_offset as u16, h_offset as u16)),
        input_area,
    );
    frame.set_cursor_position((
        input_area.x + (column - h_offset) as u16,
        input_area.y + (line - v_offset) as u16,
    ));

    if let Some(notice) = &app.new_chat_notice {
        frame.render_widget(
            Paragraph::new(notice.as_str()).style(Style::default().fg(Color::Red).bold()),
            notice_area,
        );
    }

    popup_area
}

fn render_settings_modal(app: &App, frame: &mut Frame, area: Rect) -> Rect {
    let popup_area = centered(area, 70, 14);
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Запрос на историю ");

    let request = Paragraph::new(app.settings_request.clone())
        .block(block)
        .wrap(Wrap { trim: false });
    frame.render_widget(request, popup_area);

    popup_area
}

fn render_confirm_delete(frame: &mut Frame, area: Rect) -> Rect {
    let popup_area = centered(area, 40, 5);
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red));

    let text = Text::from(vec![
        Line::from(CONFIRM_DELETE),
        Line::from(Span::styled("y — да, n — нет", Style::default().fg(Color::DarkGray))),
    ]);
    frame.render_widget(
        Paragraph::new(text).alignment(Alignment::Center).block(block),
        popup_area,
    );

    popup_area
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::{chat, setup};
    use ratatui::{backend::TestBackend, Terminal};

    /// Screen contents as text, skipping the filler cell after wide glyphs.
    fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let mut out = String::new();
        for row in buffer.content().chunks(buffer.area.width as usize) {
            let mut skip = 0;
            for cell in row {
                if skip > 0 {
                    skip -= 1;
                    continue;
                }
                out.push_str(cell.symbol());
                skip = Span::raw(cell.symbol()).width().saturating_sub(1);
            }
            out.push('\n');
        }
        out
    }

    #[test]
    fn test_styled_line_bold_span() {
        let line = styled_line("a **b** c", Style::default());
        assert_eq!(line.spans.len(), 3);
        assert!(line.spans[1].style.add_modifier.contains(Modifier::BOLD));
        assert_eq!(line.spans[1].content, "b");
    }

    #[test]
    fn test_wrapped_height() {
        let lines = vec![Line::from("abcdefghij"), Line::default(), Line::from("abc")];
        assert_eq!(wrapped_height(&lines, 4), 3 + 1 + 1);
    }

    #[tokio::test]
    async fn test_render_chat_list_items() {
        let (mut app, _backend, _rx) = setup();
        let mut first = chat("1", "Dragon...", "dragon");
        first.last_message = Some("x".repeat(80));
        first.messages_count = Some(4);
        app.chats = vec![first, chat("2", "Forest...", "forest")];
        app.chats_loaded = true;
        app.chats_state.select(Some(0));

        let mut terminal = Terminal::new(TestBackend::new(90, 20)).unwrap();
        terminal.draw(|f| render(&mut app, f)).unwrap();
        let text = buffer_text(&terminal);

        assert!(text.contains("Dragon..."));
        assert!(text.contains("Forest..."));
        assert!(text.contains(&format!("{}...", "x".repeat(60))));
        assert!(!text.contains(&"x".repeat(61)));
        assert!(text.contains("💬 4"));
        assert!(text.contains("17.10.2026, 14:05"));
    }

    #[tokio::test]
    async fn test_list_preview_keeps_markup_literal() {
        let (mut app, _backend, _rx) = setup();
        let mut first = chat("1", "Dragon...", "dragon");
        first.last_message = Some("the **dragon** wakes".to_string());
        app.chats = vec![first];
        app.chats_loaded = true;

        let mut terminal = Terminal::new(TestBackend::new(90, 12)).unwrap();
        terminal.draw(|f| render(&mut app, f)).unwrap();
        assert!(buffer_text(&terminal).contains("the **dragon** wakes"));
    }

    #[tokio::test]
    async fn test_render_empty_state() {
        let (mut app, _backend, _rx) = setup();
        app.chats_loaded = true;
        let mut terminal = Terminal::new(TestBackend::new(60, 12)).unwrap();
        terminal.draw(|f| render(&mut app, f)).unwrap();
        assert!(buffer_text(&terminal).contains("У тебя пока нет миров"));
    }

    #[tokio::test]
    async fn test_render_typing_indicator() {
        let (mut app, _backend, _rx) = setup();
        app.screen = Screen::Chat;
        app.view.current_chat_id = Some("1".to_string());
        app.transcript.push(Message::user("hi"));
        app.transcript.push_pending(1);

        let mut terminal = Terminal::new(TestBackend::new(60, 16)).unwrap();
        terminal.draw(|f| render(&mut app, f)).unwrap();
        let text = buffer_text(&terminal);
        assert!(text.contains("Тейя печатает"));
        assert!(text.contains("hi"));
    }
}
