//! Scrollable conversation transcript.
//!
//! The entry list is the store of record for the conversation. Layout wraps
//! every entry to the viewport width so the scroll extent is exact and the
//! newest entry can always be brought fully into view.

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::message::{Message, Sender};

/// Identifier of the single typing placeholder
pub const TYPING_INDICATOR_ID: &str = "typing-indicator";

/// Number of animated dots in the typing placeholder
pub const TYPING_DOTS: usize = 3;

/// Where the controller sends what it wants displayed
pub trait TranscriptSink {
    fn append_message(&mut self, content: &str, sender: Sender);
    fn show_typing_indicator(&mut self);
    fn remove_typing_indicator(&mut self);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Message(Message),
    /// Bot-attributed placeholder shown while a reply is pending
    Typing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Label(Sender),
    Body(Sender),
    Typing,
    Spacer,
}

/// One row of laid-out transcript text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptLine {
    pub kind: LineKind,
    pub text: String,
}

impl TranscriptLine {
    fn new(kind: LineKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

#[derive(Debug, Default)]
pub struct Transcript {
    entries: Vec<Entry>,
    scroll: u16,
    // Inner size of the transcript pane, updated by the render pass
    width: u16,
    height: u16,
    // Cleared when the user scrolls up, set again by scroll_to_bottom
    follow: bool,
}

impl Transcript {
    pub fn new() -> Self {
        Self {
            follow: true,
            ..Self::default()
        }
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.entries.iter().filter_map(|entry| match entry {
            Entry::Message(message) => Some(message),
            Entry::Typing => None,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has_typing_indicator(&self) -> bool {
        self.entries.iter().any(|entry| matches!(entry, Entry::Typing))
    }

    pub fn scroll(&self) -> u16 {
        self.scroll
    }

    pub fn is_following(&self) -> bool {
        self.follow
    }

    /// Record the inner size of the pane. Keeps the view pinned to the bottom
    /// unless the user has scrolled away.
    pub fn set_viewport(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
        if self.follow {
            self.scroll_to_bottom();
        } else {
            self.scroll = self.scroll.min(self.max_scroll());
        }
    }

    /// Total rows the transcript occupies at the current width
    pub fn content_height(&self) -> u16 {
        let rows = self.layout(self.width).len();
        u16::try_from(rows).unwrap_or(u16::MAX)
    }

    pub fn max_scroll(&self) -> u16 {
        self.content_height().saturating_sub(self.height)
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll = self.max_scroll();
        self.follow = true;
    }

    pub fn scroll_up(&mut self, rows: u16) {
        self.scroll = self.scroll.saturating_sub(rows);
        self.follow = self.scroll >= self.max_scroll();
    }

    pub fn scroll_down(&mut self, rows: u16) {
        let max = self.max_scroll();
        self.scroll = self.scroll.saturating_add(rows).min(max);
        self.follow = self.scroll >= max;
    }

    pub fn page_height(&self) -> u16 {
        self.height.max(1)
    }

    /// Lay out every entry at `width` columns. A width of zero disables wrapping.
    pub fn layout(&self, width: u16) -> Vec<TranscriptLine> {
        let width = width as usize;
        let mut lines = Vec::new();

        for entry in &self.entries {
            match entry {
                Entry::Message(message) => {
                    lines.push(TranscriptLine::new(
                        LineKind::Label(message.sender),
                        message.sender.label(),
                    ));
                    for raw in message.content.split('\n') {
                        for row in wrap_line(&plain_text(raw), width) {
                            lines.push(TranscriptLine::new(LineKind::Body(message.sender), row));
                        }
                    }
                }
                Entry::Typing => {
                    lines.push(TranscriptLine::new(
                        LineKind::Label(Sender::Bot),
                        Sender::Bot.label(),
                    ));
                    lines.push(TranscriptLine::new(
                        LineKind::Typing,
                        vec!["•"; TYPING_DOTS].join(" "),
                    ));
                }
            }
            lines.push(TranscriptLine::new(LineKind::Spacer, ""));
        }

        lines
    }
}

impl TranscriptSink for Transcript {
    fn append_message(&mut self, content: &str, sender: Sender) {
        self.entries.push(Entry::Message(Message::new(content, sender)));
        self.scroll_to_bottom();
    }

    fn show_typing_indicator(&mut self) {
        // The placeholder is unique; re-showing moves it to the end
        self.entries.retain(|entry| !matches!(entry, Entry::Typing));
        self.entries.push(Entry::Typing);
        self.scroll_to_bottom();
    }

    fn remove_typing_indicator(&mut self) {
        let before = self.entries.len();
        self.entries.retain(|entry| !matches!(entry, Entry::Typing));
        if self.entries.len() != before {
            tracing::trace!(id = TYPING_INDICATOR_ID, "Removed typing indicator");
            self.scroll = self.scroll.min(self.max_scroll());
        }
    }
}

/// Render text literally: tabs become spaces and other control characters
/// become replacement glyphs so they cannot drive the terminal.
fn plain_text(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\t' => ' ',
            c if c.is_control() => '\u{FFFD}',
            c => c,
        })
        .collect()
}

/// Greedy word wrap by display width. Words wider than `width` are broken.
pub fn wrap_line(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }

    let mut rows = Vec::new();
    let mut current = String::new();
    let mut current_width = 0;

    for word in text.split(' ') {
        let word_width = UnicodeWidthStr::width(word);
        let separator = usize::from(!current.is_empty());

        if current_width + separator + word_width <= width {
            if separator == 1 {
                current.push(' ');
            }
            current.push_str(word);
            current_width += separator + word_width;
            continue;
        }

        if !current.is_empty() {
            rows.push(std::mem::take(&mut current));
            current_width = 0;
        }

        for c in word.chars() {
            let char_width = c.width().unwrap_or(0);
            if current_width + char_width > width && !current.is_empty() {
                rows.push(std::mem::take(&mut current));
                current_width = 0;
            }
            current.push(c);
            current_width += char_width;
        }
    }

    rows.push(current);
    rows
}
