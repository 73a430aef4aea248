use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use crate::app::{App, Modal, Screen};
use crate::input::TextInput;
use crate::tui::AppEvent;
use crate::ui::{DELETE_HIT_WIDTH, ITEM_HEIGHT};

const PAGE: u16 = 10;
const WHEEL: u16 = 3;

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize => {}
        AppEvent::Tick => app.tick_animation(),
        AppEvent::Api(api) => app.apply(api),
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match app.modal {
        Some(Modal::NewChat) => handle_new_chat_modal(app, key),
        Some(Modal::Settings) => {
            if matches!(key.code, KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q')) {
                app.close_modal();
            }
        }
        Some(Modal::ConfirmDelete) => match key.code {
            KeyCode::Char('y') | KeyCode::Enter => app.confirm_delete(),
            KeyCode::Char('n') | KeyCode::Esc => app.cancel_delete(),
            _ => {}
        },
        None => match app.screen {
            Screen::ChatList => handle_list_key(app, key),
            Screen::Chat => handle_chat_key(app, key),
        },
    }
}

/// Shift/Alt+Enter insert a newline, plain Enter submits.
fn is_newline(key: &KeyEvent) -> bool {
    key.code == KeyCode::Enter
        && key.modifiers.intersects(KeyModifiers::SHIFT | KeyModifiers::ALT)
}

/// Shared editing keys. Returns false if the key was not an edit.
fn edit(input: &mut TextInput, key: KeyEvent) -> bool {
    if is_newline(&key) {
        input.newline();
        return true;
    }
    match key.code {
        KeyCode::Backspace => input.backspace(),
        KeyCode::Delete => input.delete(),
        KeyCode::Left => input.left(),
        KeyCode::Right => input.right(),
        KeyCode::Home => input.home(),
        KeyCode::End => input.end(),
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => input.insert(c),
        _ => return false,
    }
    true
}

fn handle_new_chat_modal(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.close_modal(),
        KeyCode::Enter if !is_newline(&key) => app.create_new_chat(),
        _ => {
            if edit(&mut app.new_chat_input, key) {
                app.new_chat_notice = None;
            }
        }
    }
}

fn handle_list_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('j') | KeyCode::Down => app.list_down(),
        KeyCode::Char('k') | KeyCode::Up => app.list_up(),
        KeyCode::Enter | KeyCode::Char('l') | KeyCode::Right => app.open_selected(),
        KeyCode::Char('n') | KeyCode::Char('+') => app.open_new_chat_modal(),
        KeyCode::Char('d') | KeyCode::Delete => app.request_delete_selected(),
        KeyCode::Char('r') => app.load_chats(),
        _ => {}
    }
}

fn handle_chat_key(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Esc => app.back_to_list(),
        KeyCode::Enter if !is_newline(&key) => app.send_message(),
        KeyCode::Char('x') if ctrl => app.stop_generation(),
        KeyCode::Char('s') if ctrl => app.open_settings(),
        KeyCode::Char('d') if ctrl => {
            if let Some(id) = app.view.current_chat_id.clone() {
                app.request_delete(&id);
            }
        }
        KeyCode::Char('b') if ctrl => app.transcript.scroll_to_bottom(),
        KeyCode::PageUp => app.transcript.scroll_up(PAGE),
        KeyCode::PageDown => app.transcript.scroll_down(PAGE),
        KeyCode::Up if ctrl => app.transcript.scroll_up(1),
        KeyCode::Down if ctrl => app.transcript.scroll_down(1),
        _ => {
            edit(&mut app.input, key);
        }
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let x = mouse.column;
    let y = mouse.row;

    if app.modal.is_some() {
        // A click on the backdrop dismisses the dialog
        if let MouseEventKind::Down(MouseButton::Left) = mouse.kind {
            let inside = app.modal_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);
            if !inside {
                app.close_modal();
            }
        }
        return;
    }

    match (app.screen, mouse.kind) {
        (Screen::ChatList, MouseEventKind::ScrollDown) => app.list_down(),
        (Screen::ChatList, MouseEventKind::ScrollUp) => app.list_up(),
        (Screen::ChatList, MouseEventKind::Down(MouseButton::Left)) => click_list(app, x, y),
        (Screen::Chat, MouseEventKind::ScrollDown) => app.transcript.scroll_down(WHEEL),
        (Screen::Chat, MouseEventKind::ScrollUp) => app.transcript.scroll_up(WHEEL),
        (Screen::Chat, MouseEventKind::Down(MouseButton::Left)) => {
            let on_button = app
                .scroll_button_area
                .map(|r| point_in_rect(x, y, r))
                .unwrap_or(false);
            if on_button {
                app.transcript.scroll_to_bottom();
            }
        }
        _ => {}
    }
}

/// Open the clicked chat, or ask to delete it when the ✕ column is hit.
fn click_list(app: &mut App, x: u16, y: u16) {
    let Some(area) = app.list_area else {
        return;
    };
    // Inside the border
    let inner = Rect::new(
        area.x + 1,
        area.y + 1,
        area.width.saturating_sub(2),
        area.height.saturating_sub(2),
    );
    if !point_in_rect(x, y, inner) {
        return;
    }

    let row = y - inner.y;
    let index = app.chats_state.offset() + (row / ITEM_HEIGHT) as usize;
    let Some(chat_id) = app.chats.get(index).map(|c| c.id.clone()) else {
        return;
    };

    app.chats_state.select(Some(index));
    let on_delete = row % ITEM_HEIGHT == 0 && x >= inner.right().saturating_sub(DELETE_HIT_WIDTH);
    if on_delete {
        app.request_delete(&chat_id);
    } else {
        app.open_chat(&chat_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::{chat, pump, setup};
    use crossterm::event::{KeyEventKind, KeyEventState};

    fn key(code: KeyCode, modifiers: KeyModifiers) -> AppEvent {
        AppEvent::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        })
    }

    fn click(column: u16, row: u16) -> AppEvent {
        AppEvent::Mouse(MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column,
            row,
            modifiers: KeyModifiers::NONE,
        })
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            handle_event(app, key(KeyCode::Char(c), KeyModifiers::NONE));
        }
    }

    #[tokio::test]
    async fn test_enter_sends_and_alt_enter_breaks_line() {
        let (mut app, backend, mut rx) = setup();
        app.screen = Screen::Chat;
        app.view.current_chat_id = Some("1".to_string());

        type_text(&mut app, "a");
        handle_event(&mut app, key(KeyCode::Enter, KeyModifiers::ALT));
        type_text(&mut app, "b");
        assert_eq!(app.input.text(), "a\nb");

        handle_event(&mut app, key(KeyCode::Enter, KeyModifiers::NONE));
        pump(&mut app, &mut rx).await;
        assert_eq!(backend.calls(), vec!["POST /api/chats/1/messages a\nb".to_string()]);
    }

    #[tokio::test]
    async fn test_backdrop_click_closes_modal() {
        let (mut app, _backend, _rx) = setup();
        app.open_new_chat_modal();
        app.modal_area = Some(Rect::new(10, 5, 20, 6));

        handle_event(&mut app, click(12, 7));
        assert_eq!(app.modal, Some(Modal::NewChat));

        handle_event(&mut app, click(1, 1));
        assert_eq!(app.modal, None);
    }

    #[tokio::test]
    async fn test_click_delete_column_asks_for_confirmation() {
        let (mut app, backend, mut rx) = setup();
        app.chats = vec![chat("1", "One...", ""), chat("2", "Two...", "")];
        app.list_area = Some(Rect::new(0, 1, 40, 20));

        // Second item's title row, last inner column
        handle_event(&mut app, click(38, 2 + ITEM_HEIGHT));
        assert_eq!(app.modal, Some(Modal::ConfirmDelete));
        assert_eq!(app.pending_delete.as_deref(), Some("2"));

        handle_event(&mut app, key(KeyCode::Char('n'), KeyModifiers::NONE));
        pump(&mut app, &mut rx).await;
        assert_eq!(app.modal, None);
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_click_item_opens_chat() {
        let (mut app, backend, mut rx) = setup();
        *backend.chats.lock().unwrap() = vec![chat("1", "One...", "")];
        app.chats = vec![chat("1", "One...", "")];
        app.list_area = Some(Rect::new(0, 1, 40, 20));

        handle_event(&mut app, click(5, 3));
        pump(&mut app, &mut rx).await;
        assert_eq!(app.screen, Screen::Chat);
        assert_eq!(app.chat_title, "One...");
    }

    #[tokio::test]
    async fn test_ctrl_x_with_nothing_pending() {
        let (mut app, _backend, _rx) = setup();
        app.screen = Screen::Chat;
        app.view.current_chat_id = Some("1".to_string());
        handle_event(&mut app, key(KeyCode::Char('x'), KeyModifiers::CONTROL));
        assert_eq!(app.transcript.messages().count(), 1);
        assert!(app.input.text().is_empty());
    }

    #[tokio::test]
    async fn test_empty_request_keeps_dialog_open() {
        let (mut app, backend, mut rx) = setup();
        handle_event(&mut app, key(KeyCode::Char('n'), KeyModifiers::NONE));
        assert_eq!(app.modal, Some(Modal::NewChat));

        handle_event(&mut app, key(KeyCode::Enter, KeyModifiers::NONE));
        pump(&mut app, &mut rx).await;
        assert_eq!(app.modal, Some(Modal::NewChat));
        assert!(app.new_chat_notice.is_some());
        assert!(backend.calls().is_empty());
    }
}
