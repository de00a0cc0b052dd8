use std::sync::Arc;

use ratatui::layout::Rect;
use tokio::sync::mpsc;

use crate::config::Settings;
use crate::controller::{Controller, ReplyPolicy, ReplyReady, SubmitOutcome};
use crate::responder::Responder;
use crate::storage::KeyValueStore;
use crate::theme::{Palette, Theme, ThemeStore};
use crate::transcript::Transcript;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Input,
    Themes, // Header theme buttons
}

pub struct App {
    pub should_quit: bool,
    pub focus: Focus,

    pub conversation: Controller<Transcript>,
    pub themes: ThemeStore,
    pub show_theme_selector: bool,
    /// Theme button under the keyboard cursor while the theme bar is focused
    pub theme_cursor: usize,

    // Animation state
    pub animation_frame: u8, // index of the highlighted typing dot

    // Areas for mouse hit-testing (updated during render)
    pub transcript_area: Option<Rect>,
    pub theme_button_areas: Vec<(Rect, Theme)>,
}

impl App {
    pub fn new(
        settings: &Settings,
        store: Box<dyn KeyValueStore>,
        responder: Arc<dyn Responder>,
        replies: mpsc::UnboundedSender<ReplyReady>,
    ) -> Self {
        let themes = ThemeStore::new(store);
        let theme_cursor = Theme::all()
            .iter()
            .position(|t| *t == themes.active())
            .unwrap_or(0);

        Self {
            should_quit: false,
            focus: Focus::Input,
            conversation: Controller::new(
                Transcript::new(),
                responder,
                ReplyPolicy::from(settings),
                replies,
            ),
            themes,
            show_theme_selector: settings.show_theme_selector,
            theme_cursor,
            animation_frame: 0,
            transcript_area: None,
            theme_button_areas: Vec::new(),
        }
    }

    pub fn palette(&self) -> Palette {
        self.themes.active().palette()
    }

    pub fn transcript(&self) -> &Transcript {
        self.conversation.sink()
    }

    pub fn transcript_mut(&mut self) -> &mut Transcript {
        self.conversation.sink_mut()
    }

    pub fn submit(&mut self) -> SubmitOutcome {
        let outcome = self.conversation.submit();
        if outcome == SubmitOutcome::Accepted {
            self.animation_frame = 0;
        }
        outcome
    }

    pub fn handle_reply(&mut self, reply: ReplyReady) {
        self.conversation.handle_reply(reply);
    }

    /// Select and persist a theme, if the selector is enabled
    pub fn select_theme(&mut self, theme: Theme) {
        if !self.show_theme_selector {
            return;
        }
        self.themes.select_theme(theme);
        if let Some(i) = Theme::all().iter().position(|t| *t == theme) {
            self.theme_cursor = i;
        }
    }

    pub fn theme_cursor_left(&mut self) {
        self.theme_cursor = self.theme_cursor.saturating_sub(1);
    }

    pub fn theme_cursor_right(&mut self) {
        let last = Theme::all().len() - 1;
        self.theme_cursor = (self.theme_cursor + 1).min(last);
    }

    pub fn select_theme_at_cursor(&mut self) {
        if let Some(&theme) = Theme::all().get(self.theme_cursor) {
            self.select_theme(theme);
        }
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Input if self.show_theme_selector => Focus::Themes,
            _ => Focus::Input,
        };
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.conversation.is_awaiting() {
            self.animation_frame = (self.animation_frame + 1) % crate::transcript::TYPING_DOTS as u8;
        }
    }

    /// Esc: cancel a pending reply, or quit when there is nothing to cancel
    pub fn escape(&mut self) {
        if self.conversation.is_awaiting() {
            self.conversation.cancel();
        } else {
            self.should_quit = true;
        }
    }

    pub fn shutdown(&mut self) {
        self.conversation.cancel();
        self.should_quit = true;
    }
}
