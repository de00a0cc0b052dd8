//! Reply generation.
//!
//! `generate_response` is the canned keyword matcher. `Responder` is the seam a
//! real backend would implement; `KeywordResponder` plugs the matcher into it
//! behind a fixed delay.

use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt};

use crate::error::ResponseError;

/// Delay before the simulated reply arrives
pub const DEFAULT_REPLY_DELAY: Duration = Duration::from_millis(1500);

pub const FALLBACK_REPLY: &str = "That's interesting. Can you tell me more about that?";

/// A keyword rule: fires when the lower-cased message contains any keyword
#[derive(Debug)]
pub struct Rule {
    pub name: &'static str,
    pub keywords: &'static [&'static str],
    pub reply: &'static str,
}

impl Rule {
    fn matches(&self, lowered: &str) -> bool {
        self.keywords.iter().any(|keyword| lowered.contains(keyword))
    }
}

/// Rules in priority order. Categories overlap ("hi" is inside "this"), so the
/// first match wins and the order must not change.
pub const RULES: &[Rule] = &[
    Rule {
        name: "greeting",
        keywords: &["hello", "hi"],
        reply: "Hello there! How can I assist you today?",
    },
    Rule {
        name: "help",
        keywords: &["help"],
        reply: "I'm here to help! What do you need assistance with?",
    },
    Rule {
        name: "theme",
        keywords: &["theme"],
        reply: "I see you're interested in themes! You can switch between Light, Dark, Gradient, and High Contrast themes using the buttons in the header.",
    },
    Rule {
        name: "thanks",
        keywords: &["thank"],
        reply: "You're welcome! Is there anything else you'd like to know?",
    },
    Rule {
        name: "depressed",
        keywords: &["depressed"],
        reply: "I'm really sorry you're feeling this way. You're not alone, and how you're feeling is valid. If you’d like to talk about what’s on your mind, I’m here to listen — no pressure, no judgment. Also, if things feel overwhelming, it might help to reach out to a mental health professional. You deserve support.",
    },
    Rule {
        name: "farewell",
        keywords: &["bye"],
        reply: "Goodbye! Feel free to return if you have more questions.",
    },
    Rule {
        name: "struggling",
        keywords: &["struggling"],
        reply: "I'm really sorry to hear that. It’s okay to struggle — it doesn’t make you weak, it makes you human. You don’t have to carry it all alone. If you want to talk about what’s going on, I’m here to listen. Just take your time",
    },
];

/// First rule that matches the message, if any
pub fn matching_rule(message: &str) -> Option<&'static Rule> {
    let lowered = message.to_lowercase();
    RULES.iter().find(|rule| rule.matches(&lowered))
}

/// Map a user message to a canned reply
pub fn generate_response(message: &str) -> &'static str {
    matching_rule(message)
        .map(|rule| rule.reply)
        .unwrap_or(FALLBACK_REPLY)
}

/// Produces one reply per request
pub trait Responder: Send + Sync {
    fn respond(&self, message: String) -> BoxFuture<'static, Result<String, ResponseError>>;
}

/// Replies from the keyword table after a fixed delay
#[derive(Debug, Clone)]
pub struct KeywordResponder {
    delay: Duration,
}

impl KeywordResponder {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for KeywordResponder {
    fn default() -> Self {
        Self::new(DEFAULT_REPLY_DELAY)
    }
}

impl Responder for KeywordResponder {
    fn respond(&self, message: String) -> BoxFuture<'static, Result<String, ResponseError>> {
        let delay = self.delay;
        async move {
            tokio::time::sleep(delay).await;
            let rule = matching_rule(&message).map(|rule| rule.name).unwrap_or("fallback");
            tracing::debug!(rule, "Generated keyword reply");
            Ok(generate_response(&message).to_string())
        }
        .boxed()
    }
}
