//! Conversation controller.
//!
//! Two states: `Idle` and `AwaitingResponse`. An accepted submission appends
//! the user message, shows the typing indicator and spawns a reply task. The
//! task reports back through a channel as a `ReplyReady`; the event loop hands
//! it to `handle_reply`, which swaps the indicator for the bot message.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::Settings;
use crate::error::ResponseError;
use crate::input::InputLine;
use crate::message::Sender;
use crate::responder::Responder;
use crate::transcript::TranscriptSink;

pub const APOLOGY_REPLY: &str = "Sorry, I couldn't come up with a reply just now. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationState {
    Idle,
    AwaitingResponse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Accepted,
    /// Input was empty after trimming
    Empty,
    /// A reply is still pending
    Busy,
}

/// Completion of a reply task
#[derive(Debug)]
pub struct ReplyReady {
    pub ticket: u64,
    pub result: Result<String, ResponseError>,
}

/// Timeout and retry budget for a single reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyPolicy {
    pub timeout: Duration,
    pub max_retries: u32,
}

impl From<&Settings> for ReplyPolicy {
    fn from(settings: &Settings) -> Self {
        Self {
            timeout: settings.reply_timeout,
            max_retries: settings.max_retries,
        }
    }
}

struct PendingReply {
    ticket: u64,
    task: JoinHandle<()>,
}

pub struct Controller<S> {
    sink: S,
    input: InputLine,
    state: ConversationState,
    responder: Arc<dyn Responder>,
    policy: ReplyPolicy,
    replies: mpsc::UnboundedSender<ReplyReady>,
    pending: Option<PendingReply>,
    next_ticket: u64,
}

impl<S: TranscriptSink> Controller<S> {
    pub fn new(
        sink: S,
        responder: Arc<dyn Responder>,
        policy: ReplyPolicy,
        replies: mpsc::UnboundedSender<ReplyReady>,
    ) -> Self {
        Self {
            sink,
            input: InputLine::new(),
            state: ConversationState::Idle,
            responder,
            policy,
            replies,
            pending: None,
            next_ticket: 0,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn input(&self) -> &InputLine {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut InputLine {
        &mut self.input
    }

    pub fn state(&self) -> ConversationState {
        self.state
    }

    pub fn is_awaiting(&self) -> bool {
        self.state == ConversationState::AwaitingResponse
    }

    /// Submit the current input. Must be called from within a tokio runtime.
    pub fn submit(&mut self) -> SubmitOutcome {
        let message = self.input.text().trim().to_string();
        if message.is_empty() {
            return SubmitOutcome::Empty;
        }
        if self.is_awaiting() {
            tracing::debug!("Ignoring submission while a reply is pending");
            return SubmitOutcome::Busy;
        }

        self.sink.append_message(&message, Sender::User);
        self.input.clear();
        self.sink.show_typing_indicator();

        self.next_ticket += 1;
        let ticket = self.next_ticket;
        let responder = Arc::clone(&self.responder);
        let policy = self.policy;
        let replies = self.replies.clone();

        let task = tokio::spawn(async move {
            let result = fetch_reply(responder.as_ref(), message, policy).await;
            // The receiver only goes away on shutdown
            let _ = replies.send(ReplyReady { ticket, result });
        });

        self.pending = Some(PendingReply { ticket, task });
        self.state = ConversationState::AwaitingResponse;
        tracing::debug!(ticket, "Accepted submission");
        SubmitOutcome::Accepted
    }

    /// Render a finished reply. Returns false for stale or unexpected replies.
    pub fn handle_reply(&mut self, reply: ReplyReady) -> bool {
        match &self.pending {
            Some(pending) if pending.ticket == reply.ticket => {}
            _ => {
                tracing::debug!(ticket = reply.ticket, "Dropping stale reply");
                return false;
            }
        }
        self.pending = None;

        self.sink.remove_typing_indicator();
        let content = match reply.result {
            Ok(content) => content,
            Err(e) => {
                tracing::error!("Reply failed: {}", e);
                APOLOGY_REPLY.to_string()
            }
        };
        self.sink.append_message(&content, Sender::Bot);
        self.state = ConversationState::Idle;
        true
    }

    /// Abort a pending reply and return to idle. No-op when idle.
    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.task.abort();
            tracing::info!(ticket = pending.ticket, "Cancelled pending reply");
        }
        if self.is_awaiting() {
            self.sink.remove_typing_indicator();
            self.state = ConversationState::Idle;
        }
    }
}

/// Ask the responder, bounding each attempt by the timeout and retrying failures
async fn fetch_reply(
    responder: &dyn Responder,
    message: String,
    policy: ReplyPolicy,
) -> Result<String, ResponseError> {
    let mut attempt = 0;
    loop {
        let outcome = match tokio::time::timeout(policy.timeout, responder.respond(message.clone())).await {
            Ok(result) => result,
            Err(_) => Err(ResponseError::Timeout(policy.timeout)),
        };

        match outcome {
            Ok(reply) => return Ok(reply),
            Err(e) if attempt < policy.max_retries => {
                attempt += 1;
                tracing::warn!(attempt, "Reply attempt failed, retrying: {}", e);
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;
    use crate::responder::KeywordResponder;
    use crate::transcript::{Entry, Transcript};
    use futures_util::future::{BoxFuture, FutureExt};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const DELAY: Duration = Duration::from_millis(1500);

    fn policy() -> ReplyPolicy {
        ReplyPolicy {
            timeout: Duration::from_secs(10),
            max_retries: 1,
        }
    }

    fn keyword_controller() -> (Controller<Transcript>, mpsc::UnboundedReceiver<ReplyReady>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let responder = Arc::new(KeywordResponder::new(DELAY));
        (Controller::new(Transcript::new(), responder, policy(), tx), rx)
    }

    fn messages(controller: &Controller<Transcript>) -> Vec<Message> {
        controller.sink().messages().cloned().collect()
    }

    /// Fails a fixed number of times, then answers
    struct FlakyResponder {
        failures: usize,
        calls: Arc<AtomicUsize>,
    }

    impl Responder for FlakyResponder {
        fn respond(&self, _message: String) -> BoxFuture<'static, Result<String, ResponseError>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            let failures = self.failures;
            async move {
                if call < failures {
                    Err(ResponseError::Unavailable("backend down".to_string()))
                } else {
                    Ok("recovered".to_string())
                }
            }
            .boxed()
        }
    }

    struct SilentResponder;

    impl Responder for SilentResponder {
        fn respond(&self, _message: String) -> BoxFuture<'static, Result<String, ResponseError>> {
            async {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok("too late".to_string())
            }
            .boxed()
        }
    }

    /// Records sink calls in order
    #[derive(Default)]
    struct RecordingSink {
        calls: Vec<String>,
    }

    impl TranscriptSink for RecordingSink {
        fn append_message(&mut self, content: &str, sender: Sender) {
            self.calls.push(format!("{:?}:{}", sender, content));
        }

        fn show_typing_indicator(&mut self) {
            self.calls.push("typing+".to_string());
        }

        fn remove_typing_indicator(&mut self) {
            self.calls.push("typing-".to_string());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_hello_end_to_end() {
        let (mut controller, mut rx) = keyword_controller();
        controller.input_mut().set_text("Hello");

        assert_eq!(controller.submit(), SubmitOutcome::Accepted);
        assert_eq!(controller.state(), ConversationState::AwaitingResponse);
        assert_eq!(controller.input().text(), "");
        assert_eq!(messages(&controller), vec![Message::new("Hello", Sender::User)]);
        assert!(controller.sink().has_typing_indicator());

        tokio::time::advance(Duration::from_millis(1000)).await;
        assert!(rx.try_recv().is_err());

        let reply = rx.recv().await.unwrap();
        assert!(controller.handle_reply(reply));

        assert_eq!(controller.state(), ConversationState::Idle);
        assert!(!controller.sink().has_typing_indicator());
        assert_eq!(
            messages(&controller),
            vec![
                Message::new("Hello", Sender::User),
                Message::new("Hello there! How can I assist you today?", Sender::Bot),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_long_delay_still_replies() {
        use crate::config::{Config, Overrides};

        let overrides = Overrides {
            reply_delay_ms: Some(12_000),
            ..Overrides::default()
        };
        let settings = Settings::resolve(&Config::new(), &overrides);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut controller = Controller::new(
            Transcript::new(),
            Arc::new(KeywordResponder::new(settings.reply_delay)),
            ReplyPolicy::from(&settings),
            tx,
        );

        controller.input_mut().set_text("Hello");
        let start = tokio::time::Instant::now();
        controller.submit();
        let reply = rx.recv().await.unwrap();
        assert!(reply.result.is_ok());
        controller.handle_reply(reply);

        assert!(start.elapsed() >= Duration::from_secs(12));
        assert_eq!(
            messages(&controller)[1],
            Message::new("Hello there! How can I assist you today?", Sender::Bot)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_whitespace_is_ignored() {
        let (mut controller, mut rx) = keyword_controller();
        controller.input_mut().set_text("   ");

        assert_eq!(controller.submit(), SubmitOutcome::Empty);
        assert_eq!(controller.state(), ConversationState::Idle);
        assert!(controller.sink().is_empty());

        tokio::time::sleep(DELAY * 2).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_submission_is_trimmed() {
        let (mut controller, _rx) = keyword_controller();
        controller.input_mut().set_text("  help me  ");
        controller.submit();
        assert_eq!(messages(&controller)[0].content, "help me");
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_submission_dropped_while_waiting() {
        let (mut controller, mut rx) = keyword_controller();

        controller.input_mut().set_text("first");
        assert_eq!(controller.submit(), SubmitOutcome::Accepted);

        controller.input_mut().set_text("second");
        assert_eq!(controller.submit(), SubmitOutcome::Busy);
        // Rejected input stays in the field
        assert_eq!(controller.input().text(), "second");

        let reply = rx.recv().await.unwrap();
        controller.handle_reply(reply);

        tokio::time::sleep(DELAY * 2).await;
        assert!(rx.try_recv().is_err());

        let users: Vec<String> = messages(&controller)
            .into_iter()
            .filter(|m| m.sender == Sender::User)
            .map(|m| m.content)
            .collect();
        assert_eq!(users, vec!["first"]);
        assert_eq!(messages(&controller).len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sink_call_order() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut controller = Controller::new(
            RecordingSink::default(),
            Arc::new(KeywordResponder::new(DELAY)),
            policy(),
            tx,
        );

        controller.input_mut().set_text("bye");
        controller.submit();
        let reply = rx.recv().await.unwrap();
        controller.handle_reply(reply);

        assert_eq!(
            controller.sink().calls,
            vec![
                "User:bye".to_string(),
                "typing+".to_string(),
                "typing-".to_string(),
                "Bot:Goodbye! Feel free to return if you have more questions.".to_string(),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_is_retried() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let calls = Arc::new(AtomicUsize::new(0));
        let responder = Arc::new(FlakyResponder {
            failures: 1,
            calls: Arc::clone(&calls),
        });
        let mut controller = Controller::new(Transcript::new(), responder, policy(), tx);

        controller.input_mut().set_text("anything");
        controller.submit();
        let reply = rx.recv().await.unwrap();
        controller.handle_reply(reply);

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(messages(&controller)[1].content, "recovered");
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_post_apology() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let calls = Arc::new(AtomicUsize::new(0));
        let responder = Arc::new(FlakyResponder {
            failures: usize::MAX,
            calls: Arc::clone(&calls),
        });
        let mut controller = Controller::new(Transcript::new(), responder, policy(), tx);

        controller.input_mut().set_text("anything");
        controller.submit();
        let reply = rx.recv().await.unwrap();
        assert!(reply.result.is_err());
        controller.handle_reply(reply);

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(messages(&controller)[1], Message::new(APOLOGY_REPLY, Sender::Bot));
        assert_eq!(controller.state(), ConversationState::Idle);
        assert!(!controller.sink().has_typing_indicator());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_posts_apology() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let policy = ReplyPolicy {
            timeout: Duration::from_secs(5),
            max_retries: 0,
        };
        let mut controller = Controller::new(Transcript::new(), Arc::new(SilentResponder), policy, tx);

        controller.input_mut().set_text("hello?");
        controller.submit();
        let reply = rx.recv().await.unwrap();
        assert!(matches!(reply.result, Err(ResponseError::Timeout(_))));
        controller.handle_reply(reply);

        assert_eq!(messages(&controller)[1].content, APOLOGY_REPLY);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_returns_to_idle() {
        let (mut controller, mut rx) = keyword_controller();
        controller.input_mut().set_text("Hello");
        controller.submit();

        controller.cancel();
        assert_eq!(controller.state(), ConversationState::Idle);
        assert_eq!(controller.sink().entries().len(), 1);
        assert!(!controller.sink().entries().contains(&Entry::Typing));

        tokio::time::sleep(DELAY * 2).await;
        assert!(rx.try_recv().is_err());

        // A late reply for the cancelled ticket is ignored
        let stale = ReplyReady {
            ticket: 1,
            result: Ok("late".to_string()),
        };
        assert!(!controller.handle_reply(stale));
        assert_eq!(controller.sink().entries().len(), 1);

        controller.input_mut().set_text("again");
        assert_eq!(controller.submit(), SubmitOutcome::Accepted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_when_idle_is_noop() {
        let (mut controller, _rx) = keyword_controller();
        controller.cancel();
        assert_eq!(controller.state(), ConversationState::Idle);
        assert!(controller.sink().is_empty());
    }
}
