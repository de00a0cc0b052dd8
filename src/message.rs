//! Chat message types shared by the transcript and the controller.

/// A message in the conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub sender: Sender,
    pub content: String,
}

impl Message {
    pub fn new(content: impl Into<String>, sender: Sender) -> Self {
        Self {
            sender,
            content: content.into(),
        }
    }
}

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Bot,
}

impl Sender {
    /// Label shown above the message body
    pub fn label(&self) -> &'static str {
        match self {
            Sender::User => "You:",
            Sender::Bot => "Bot:",
        }
    }
}
