//! Keyboard input handling with vim-style bindings

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::{App, AppResult, InputMode, Screen, StatusLevel};
use crate::form::RecordKind;

/// Handle a key event
pub fn handle_key(app: &mut App, key: KeyEvent) -> AppResult {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return AppResult::Quit;
    }

    if app.screen == Screen::Auth {
        return handle_auth(app, key);
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Detail => handle_detail_mode(app, key),
        InputMode::Search(_) => handle_search_mode(app, key),
        InputMode::Form(_) => handle_form_mode(app, key),
        InputMode::Confirm { .. } => handle_confirm_mode(app, key),
    }
}

/// Login/registration screen: every printable key is text
fn handle_auth(app: &mut App, key: KeyEvent) -> AppResult {
    match key.code {
        KeyCode::Char('t') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.toggle_register();
        }
        KeyCode::Esc => return AppResult::Quit,
        KeyCode::Enter => app.submit_auth(),
        KeyCode::Tab | KeyCode::Down => app.auth_form.form.next(),
        KeyCode::BackTab | KeyCode::Up => app.auth_form.form.prev(),
        KeyCode::Backspace => app.auth_form.form.pop(),
        KeyCode::Char(c) => app.auth_form.form.push(c),
        _ => {}
    }

    AppResult::Continue
}

/// Handle keys in normal mode (main navigation)
fn handle_normal_mode(app: &mut App, key: KeyEvent) -> AppResult {
    match key.code {
        KeyCode::Char('q') => return AppResult::Quit,

        // Screens
        KeyCode::Tab => app.next_tab(),
        KeyCode::Char('1') => app.show(Screen::Home),
        KeyCode::Char('2') => app.show(Screen::Records(RecordKind::Product)),
        KeyCode::Char('3') => app.show(Screen::Records(RecordKind::Category)),
        KeyCode::Char('4') => app.show(Screen::Records(RecordKind::Brand)),

        // Navigation
        KeyCode::Char('j') | KeyCode::Down => app.cursor_down(),
        KeyCode::Char('k') | KeyCode::Up => app.cursor_up(),
        KeyCode::Char('l') | KeyCode::Right | KeyCode::Enter => app.open_detail(),
        KeyCode::Char(']') | KeyCode::PageDown => app.next_page(),
        KeyCode::Char('[') | KeyCode::PageUp => app.prev_page(),

        // Actions
        KeyCode::Char('n') => app.new_record(),
        KeyCode::Char('e') => app.edit_record(),
        KeyCode::Char('d') => app.request_delete(),
        KeyCode::Char('r') => app.refresh(),
        KeyCode::Char('L') => app.logout(),

        // Product search and filter
        KeyCode::Char('/') => app.start_search(),
        KeyCode::Char('f') => app.cycle_category_filter(),
        KeyCode::Char('x') => app.clear_filters(),

        KeyCode::Esc => app.clear_status(),

        KeyCode::Char('?') => {
            app.set_status(
                "tab/1-4:screen j/k:move l:open n:new e:edit d:del [/]:page /:search f:category x:clear r:reload L:logout q:quit",
                StatusLevel::Info,
            );
        }

        _ => {}
    }

    AppResult::Continue
}

fn handle_detail_mode(app: &mut App, key: KeyEvent) -> AppResult {
    match key.code {
        KeyCode::Esc | KeyCode::Char('h') | KeyCode::Left | KeyCode::Backspace => {
            app.close_detail();
        }
        KeyCode::Char('e') => app.edit_record(),
        KeyCode::Char('q') => return AppResult::Quit,
        _ => {}
    }

    AppResult::Continue
}

/// Typing the product name search
fn handle_search_mode(app: &mut App, key: KeyEvent) -> AppResult {
    match key.code {
        KeyCode::Esc => app.cancel_search(),
        KeyCode::Enter => app.apply_search(),
        KeyCode::Backspace => {
            if let InputMode::Search(text) = &mut app.input_mode {
                text.pop();
            }
        }
        KeyCode::Char(c) => {
            if let InputMode::Search(text) = &mut app.input_mode {
                text.push(c);
            }
        }
        _ => {}
    }

    AppResult::Continue
}

/// Handle keys in the create/edit form
fn handle_form_mode(app: &mut App, key: KeyEvent) -> AppResult {
    match key.code {
        KeyCode::Esc => app.cancel_form(),
        KeyCode::Enter => app.submit_form(),
        _ => {
            let InputMode::Form(record) = &mut app.input_mode else {
                return AppResult::Continue;
            };
            let form = &mut record.form;
            match key.code {
                KeyCode::Tab | KeyCode::Down => form.next(),
                KeyCode::BackTab | KeyCode::Up => form.prev(),
                KeyCode::Right => form.cycle(true),
                KeyCode::Left => form.cycle(false),
                KeyCode::Backspace => form.pop(),
                KeyCode::Char(c) => form.push(c),
                _ => {}
            }
        }
    }

    AppResult::Continue
}

/// Handle keys in confirmation mode
fn handle_confirm_mode(app: &mut App, key: KeyEvent) -> AppResult {
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => app.confirm_delete(),
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => app.cancel_confirm(),
        _ => {}
    }

    AppResult::Continue
}
