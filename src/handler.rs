use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};

use crate::app::App;
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string edits.
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub async fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize => {}
        AppEvent::Tick => {
            app.tick_animation();
            app.poll_turn().await;
            app.poll_health().await;
        }
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('c') | KeyCode::Char('q') => {
                app.should_quit = true;
            }
            KeyCode::Char('u') => {
                app.input.clear();
                app.input_cursor = 0;
            }
            _ => {}
        }
        return;
    }

    match key.code {
        KeyCode::Enter => app.submit_input(),

        KeyCode::Esc => {
            app.input.clear();
            app.input_cursor = 0;
        }

        KeyCode::Backspace => {
            if app.input_cursor > 0 {
                app.input_cursor -= 1;
                let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            if app.input_cursor < app.input.chars().count() {
                let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
            app.input.insert(byte_pos, c);
            app.input_cursor += 1;
        }

        KeyCode::Left => {
            app.input_cursor = app.input_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.input.chars().count();
            app.input_cursor = (app.input_cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.input_cursor = 0;
        }
        KeyCode::End => {
            app.input_cursor = app.input.chars().count();
        }

        KeyCode::Up | KeyCode::PageUp => app.scroll_up(),
        KeyCode::Down | KeyCode::PageDown => app.scroll_down(),

        _ => {}
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::ScrollDown => {
            app.scroll_down();
            app.scroll_down();
            app.scroll_down();
        }
        MouseEventKind::ScrollUp => {
            app.scroll_up();
            app.scroll_up();
            app.scroll_up();
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn chars_insert_at_the_cursor() {
        let mut app = App::new(&Config::default());
        handle_key(&mut app, key(KeyCode::Char('余')));
        handle_key(&mut app, key(KeyCode::Char('额')));
        handle_key(&mut app, key(KeyCode::Left));
        handle_key(&mut app, key(KeyCode::Char('量')));
        assert_eq!(app.input, "余量额");
        assert_eq!(app.input_cursor, 2);
    }

    #[test]
    fn backspace_removes_the_char_before_the_cursor() {
        let mut app = App::new(&Config::default());
        app.input = "查询".to_string();
        app.input_cursor = 2;
        handle_key(&mut app, key(KeyCode::Backspace));
        assert_eq!(app.input, "查");
        assert_eq!(app.input_cursor, 1);

        // Backspace at the start is a no-op.
        app.input_cursor = 0;
        handle_key(&mut app, key(KeyCode::Backspace));
        assert_eq!(app.input, "查");
    }

    #[test]
    fn esc_clears_the_input_line() {
        let mut app = App::new(&Config::default());
        app.input = "半句问题".to_string();
        app.input_cursor = 4;
        handle_key(&mut app, key(KeyCode::Esc));
        assert!(app.input.is_empty());
        assert_eq!(app.input_cursor, 0);
    }

    #[test]
    fn ctrl_c_quits() {
        let mut app = App::new(&Config::default());
        handle_key(
            &mut app,
            KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL),
        );
        assert!(app.should_quit);
    }
}
