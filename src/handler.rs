use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};

use crate::app::{App, ToggleMode};

/// Rows moved per mouse wheel step.
const WHEEL_STEP: isize = 3;

/// Handle a key event.
pub fn handle_key_event(app: &mut App, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.quit();
        return;
    }
    if app.filter.focused {
        handle_filter_key(app, key);
        return;
    }

    match key.code {
        KeyCode::Char('q') => app.quit(),
        KeyCode::Char('/') => app.focus_filter(),
        KeyCode::Esc if !app.filter.text.is_empty() => app.clear_filter(),
        KeyCode::Down | KeyCode::Char('j') => app.select_next(),
        KeyCode::Up | KeyCode::Char('k') => app.select_previous(),
        KeyCode::Char('g') | KeyCode::Home => app.select_first(),
        KeyCode::Char('G') | KeyCode::End => app.select_last(),
        KeyCode::PageDown => app.page_down(),
        KeyCode::PageUp => app.page_up(),
        KeyCode::Char(' ') => app.toggle_at_cursor(ToggleMode::Flip),
        KeyCode::Right | KeyCode::Char('l') => app.toggle_at_cursor(ToggleMode::Open),
        KeyCode::Left | KeyCode::Char('h') => app.toggle_at_cursor(ToggleMode::Close),
        KeyCode::Enter => app.activate_at_cursor(),
        _ => {}
    }
}

/// Keys while the filter input has focus.
fn handle_filter_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Enter | KeyCode::Down => app.unfocus_filter(),
        KeyCode::Backspace => {
            app.filter.delete_char();
            app.filter_edited();
        }
        KeyCode::Left => app.filter.move_left(),
        KeyCode::Right => app.filter.move_right(),
        KeyCode::Home => app.filter.home(),
        KeyCode::End => app.filter.end(),
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.filter.clear();
            app.filter_edited();
        }
        KeyCode::Char(c) => {
            app.filter.insert_char(c);
            app.filter_edited();
        }
        _ => {}
    }
}

/// Handle a mouse event.
pub fn handle_mouse_event(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            if app.filter.focused {
                app.unfocus_filter();
            }
            app.click_at(mouse.column, mouse.row);
        }
        MouseEventKind::ScrollDown => app.scroll_by(WHEEL_STEP),
        MouseEventKind::ScrollUp => app.scroll_by(-WHEEL_STEP),
        _ => {}
    }
}
