use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Position;
use crate::app::{App, Focus};
use crate::controller::SubmitOutcome;
use crate::theme::Theme;
use crate::tui::AppEvent;

const WHEEL_ROWS: u16 = 3;

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        // Viewport is re-measured on the next draw
        AppEvent::Resize => {}
        AppEvent::Tick => app.tick_animation(),
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any focus
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.shutdown();
        return;
    }

    match app.focus {
        Focus::Input => handle_input_key(app, key),
        Focus::Themes => handle_theme_key(app, key),
    }
}

fn handle_input_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => match app.submit() {
            SubmitOutcome::Accepted => {}
            SubmitOutcome::Empty => tracing::trace!("Empty submission ignored"),
            SubmitOutcome::Busy => tracing::trace!("Submission ignored, reply pending"),
        },
        KeyCode::Esc => app.escape(),
        KeyCode::Tab => app.toggle_focus(),

        // Transcript scrolling
        KeyCode::Up => app.transcript_mut().scroll_up(1),
        KeyCode::Down => app.transcript_mut().scroll_down(1),
        KeyCode::PageUp => {
            let page = app.transcript().page_height();
            app.transcript_mut().scroll_up(page);
        }
        KeyCode::PageDown => {
            let page = app.transcript().page_height();
            app.transcript_mut().scroll_down(page);
        }

        // Editing
        KeyCode::Backspace => app.conversation.input_mut().backspace(),
        KeyCode::Delete => app.conversation.input_mut().delete(),
        KeyCode::Left => app.conversation.input_mut().move_left(),
        KeyCode::Right => app.conversation.input_mut().move_right(),
        KeyCode::Home => app.conversation.input_mut().move_home(),
        KeyCode::End => app.conversation.input_mut().move_end(),
        KeyCode::Char(c) => app.conversation.input_mut().insert(c),
        _ => {}
    }
}

fn handle_theme_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Tab | KeyCode::Esc => app.focus = Focus::Input,
        KeyCode::Char('h') | KeyCode::Left => app.theme_cursor_left(),
        KeyCode::Char('l') | KeyCode::Right => app.theme_cursor_right(),
        KeyCode::Enter | KeyCode::Char(' ') => app.select_theme_at_cursor(),
        KeyCode::Char(c @ '1'..='4') => {
            let index = c as usize - '1' as usize;
            if let Some(&theme) = Theme::all().get(index) {
                app.select_theme(theme);
            }
        }
        _ => {}
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let position = Position::new(mouse.column, mouse.row);

    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            let clicked = app
                .theme_button_areas
                .iter()
                .find(|(area, _)| area.contains(position))
                .map(|(_, theme)| *theme);
            if let Some(theme) = clicked {
                app.select_theme(theme);
            }
        }
        MouseEventKind::ScrollUp if over_transcript(app, position) => {
            app.transcript_mut().scroll_up(WHEEL_ROWS);
        }
        MouseEventKind::ScrollDown if over_transcript(app, position) => {
            app.transcript_mut().scroll_down(WHEEL_ROWS);
        }
        _ => {}
    }
}

fn over_transcript(app: &App, position: Position) -> bool {
    app.transcript_area.is_some_and(|area| area.contains(position))
}
