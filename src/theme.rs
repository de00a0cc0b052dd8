//! Visual themes and the persisted theme preference.

use ratatui::style::Color;

use crate::storage::KeyValueStore;

/// Preference key the active theme is stored under
pub const THEME_KEY: &str = "chat-theme";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
    Gradient,
    HighContrast,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
            Theme::Gradient => "gradient",
            Theme::HighContrast => "high-contrast",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            "gradient" => Some(Theme::Gradient),
            "high-contrast" => Some(Theme::HighContrast),
            _ => None,
        }
    }

    pub fn all() -> Vec<Theme> {
        vec![Theme::Light, Theme::Dark, Theme::Gradient, Theme::HighContrast]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Theme::Light => "Light",
            Theme::Dark => "Dark",
            Theme::Gradient => "Gradient",
            Theme::HighContrast => "High Contrast",
        }
    }

    pub fn palette(&self) -> Palette {
        match self {
            Theme::Light => Palette {
                background: Color::Rgb(248, 249, 250),
                text: Color::Rgb(33, 37, 41),
                muted: Color::Rgb(108, 117, 125),
                header_bg: Color::Rgb(74, 111, 165),
                header_fg: Color::White,
                accent: Color::Rgb(74, 111, 165),
                border: Color::Rgb(206, 212, 218),
                user: Color::Rgb(74, 111, 165),
                bot: Color::Rgb(73, 80, 87),
            },
            Theme::Dark => Palette {
                background: Color::Rgb(18, 18, 18),
                text: Color::Rgb(224, 224, 224),
                muted: Color::Rgb(136, 136, 136),
                header_bg: Color::Rgb(31, 31, 31),
                header_fg: Color::Rgb(224, 224, 224),
                accent: Color::Rgb(100, 181, 246),
                border: Color::Rgb(66, 66, 66),
                user: Color::Rgb(100, 181, 246),
                bot: Color::Rgb(189, 189, 189),
            },
            Theme::Gradient => Palette {
                background: Color::Rgb(40, 30, 70),
                text: Color::Rgb(240, 236, 255),
                muted: Color::Rgb(170, 160, 210),
                header_bg: Color::Rgb(102, 126, 234),
                header_fg: Color::White,
                accent: Color::Rgb(240, 147, 251),
                border: Color::Rgb(118, 75, 162),
                user: Color::Rgb(240, 147, 251),
                bot: Color::Rgb(150, 200, 255),
            },
            Theme::HighContrast => Palette {
                background: Color::Black,
                text: Color::White,
                muted: Color::Gray,
                header_bg: Color::Black,
                header_fg: Color::Yellow,
                accent: Color::Yellow,
                border: Color::White,
                user: Color::Yellow,
                bot: Color::Cyan,
            },
        }
    }
}

/// Colors used by the renderer for one theme
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub background: Color,
    pub text: Color,
    pub muted: Color,
    pub header_bg: Color,
    pub header_fg: Color,
    pub accent: Color,
    pub border: Color,
    pub user: Color,
    pub bot: Color,
}

/// A selector button in the header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemeButton {
    pub theme: Theme,
    pub active: bool,
}

/// Owns the active theme, the selector buttons, and the preference store
pub struct ThemeStore {
    store: Box<dyn KeyValueStore>,
    active: Theme,
    buttons: Vec<ThemeButton>,
}

impl ThemeStore {
    /// Build the store and apply the persisted theme
    pub fn new(store: Box<dyn KeyValueStore>) -> Self {
        let buttons = Theme::all()
            .into_iter()
            .map(|theme| ThemeButton { theme, active: false })
            .collect();

        let mut themes = Self {
            store,
            active: Theme::default(),
            buttons,
        };
        let initial = themes.load_initial_theme();
        themes.apply_theme(initial);
        themes
    }

    /// The persisted theme, or `Light` when missing, invalid, or unreadable
    pub fn load_initial_theme(&self) -> Theme {
        match self.store.get(THEME_KEY) {
            Ok(Some(value)) => Theme::from_str(&value).unwrap_or_else(|| {
                tracing::warn!("Ignoring unknown theme preference {:?}", value);
                Theme::default()
            }),
            Ok(None) => Theme::default(),
            Err(e) => {
                tracing::warn!("Could not read theme preference: {}", e);
                Theme::default()
            }
        }
    }

    /// Make `theme` active and highlight exactly its button
    pub fn apply_theme(&mut self, theme: Theme) {
        self.active = theme;
        for button in &mut self.buttons {
            button.active = button.theme == theme;
        }
    }

    /// Apply and persist. A failed write keeps the theme for this session only.
    pub fn select_theme(&mut self, theme: Theme) {
        self.apply_theme(theme);
        match self.store.set(THEME_KEY, theme.as_str()) {
            Ok(()) => tracing::info!("Theme set to {}", theme.as_str()),
            Err(e) => tracing::warn!("Could not persist theme {}: {}", theme.as_str(), e),
        }
    }

    pub fn active(&self) -> Theme {
        self.active
    }

    pub fn buttons(&self) -> &[ThemeButton] {
        &self.buttons
    }
}
