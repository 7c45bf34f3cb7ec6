//! The conversation engine: message history and the send-message contract.
//!
//! The engine owns the append-only history and the loading flag. A send
//! composes the prompt from the user content plus the current conversation
//! context, calls the model backend, and appends exactly one assistant
//! message — the backend's response on success, a fixed fallback otherwise.
//! Backend errors never escape the engine; every failure path resolves to a
//! normal return with the loading flag cleared, leaving the session ready
//! for the next turn.
//!
//! An unconfigured backend is surfaced here and only here: the engine
//! appends the fixed unavailability reply immediately, without a call and
//! without an artificial delay.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::warn;

use crate::backend::ModelBackend;
use crate::context::ConversationContext;
use crate::models::Message;

/// Greeting seeded as the first assistant message of every session.
pub const GREETING: &str = "Hello! How can I assist you today?";

/// Fallback reply when no model backend is configured.
pub const UNCONFIGURED_REPLY: &str = "I apologize, but I can't process your request at the moment as the API key is not configured. Please contact the administrator.";

/// Fallback reply when the backend call fails.
pub const FAILURE_REPLY: &str =
    "I apologize, but I encountered an error processing your request. Please try again later.";

/// Character that surfaces the suggestion list while typing.
pub const SUGGESTION_TRIGGER: char = '@';

/// Fixed suggestion tokens for referencing attached content inline.
pub const SUGGESTIONS: [&str; 4] = ["@doc", "@yt", "@img", "@url"];

#[derive(Debug, Error, PartialEq)]
pub enum ChatError {
    #[error("message is empty")]
    EmptyMessage,
}

/// Returns `true` when the suggestion list should be shown for the current
/// input, i.e. the input ends with the trigger character.
pub fn suggestions_visible(input: &str) -> bool {
    input.ends_with(SUGGESTION_TRIGGER)
}

/// Replace the trailing trigger sequence of `input` with the chosen
/// suggestion token, leaving a trailing space for the next word.
pub fn apply_suggestion(input: &str, suggestion: &str) -> String {
    match input.rfind(SUGGESTION_TRIGGER) {
        Some(idx) => format!("{}{} ", &input[..idx], suggestion),
        None => format!("{}{} ", input, suggestion),
    }
}

/// Turn-based conversation engine over a model backend.
pub struct ChatEngine {
    backend: Arc<dyn ModelBackend>,
    context: Arc<Mutex<ConversationContext>>,
    messages: Mutex<Vec<Message>>,
    loading: AtomicBool,
}

impl ChatEngine {
    /// Create an engine seeded with the greeting message.
    pub fn new(backend: Arc<dyn ModelBackend>, context: Arc<Mutex<ConversationContext>>) -> Self {
        Self {
            backend,
            context,
            messages: Mutex::new(vec![Message::assistant(GREETING)]),
            loading: AtomicBool::new(false),
        }
    }

    /// Append a message to the history. No validation beyond what the
    /// type system enforces.
    pub fn add_message(&self, message: Message) {
        self.messages.lock().unwrap().push(message);
    }

    /// Snapshot of the history in chronological order.
    pub fn messages(&self) -> Vec<Message> {
        self.messages.lock().unwrap().clone()
    }

    /// `true` while a send is in flight.
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    pub fn suggestions(&self) -> &'static [&'static str] {
        &SUGGESTIONS
    }

    /// Send one user turn to the backend and append the assistant reply.
    ///
    /// The caller is responsible for having appended the user's own message
    /// (see `Session::send_chat`); this method appends exactly one
    /// assistant message on every completed path. Empty content (after
    /// trimming) is rejected without touching any state. The loading flag
    /// is set for the duration and cleared regardless of outcome.
    pub async fn send_message(&self, content: &str) -> Result<(), ChatError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        self.loading.store(true, Ordering::SeqCst);
        self.exchange(content).await;
        self.loading.store(false, Ordering::SeqCst);
        Ok(())
    }

    /// One exchange with the backend. Appends the assistant reply in every
    /// arm so the caller's history arithmetic holds.
    async fn exchange(&self, content: &str) {
        if !self.backend.is_configured() {
            self.push_assistant(UNCONFIGURED_REPLY);
            return;
        }

        // Snapshot the context before the await; the lock is not held
        // across the backend call.
        let prompt = self.context.lock().unwrap().assemble_prompt(content);

        match self.backend.generate(&prompt).await {
            Ok(text) => self.push_assistant(&text),
            Err(err) => {
                warn!(backend = %self.backend.name(), error = %err, "model call failed");
                self.push_assistant(FAILURE_REPLY);
            }
        }
    }

    fn push_assistant(&self, content: &str) {
        self.messages.lock().unwrap().push(Message::assistant(content));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DisabledBackend;
    use crate::models::Role;

    fn engine() -> ChatEngine {
        ChatEngine::new(
            Arc::new(DisabledBackend),
            Arc::new(Mutex::new(ConversationContext::new())),
        )
    }

    #[test]
    fn starts_with_greeting() {
        let engine = engine();
        let messages = engine.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::Assistant);
        assert_eq!(messages[0].content, GREETING);
    }

    #[tokio::test]
    async fn empty_message_is_rejected() {
        let engine = engine();
        assert_eq!(
            engine.send_message("   ").await.unwrap_err(),
            ChatError::EmptyMessage
        );
        assert_eq!(engine.messages().len(), 1);
        assert!(!engine.is_loading());
    }

    #[tokio::test]
    async fn unconfigured_backend_appends_fixed_reply() {
        let engine = engine();
        engine.send_message("hello").await.unwrap();

        let messages = engine.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages.last().unwrap().content, UNCONFIGURED_REPLY);
        assert!(!engine.is_loading());
    }

    #[test]
    fn suggestion_trigger_detection() {
        assert!(suggestions_visible("tell me about @"));
        assert!(!suggestions_visible("tell me about @doc"));
        assert!(!suggestions_visible(""));
    }

    #[test]
    fn suggestion_replaces_trailing_trigger() {
        assert_eq!(apply_suggestion("summarize @", "@doc"), "summarize @doc ");
        assert_eq!(apply_suggestion("@", "@yt"), "@yt ");
    }
}
