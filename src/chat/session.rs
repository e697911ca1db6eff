//! Core chat session management.
//!
//! This module provides the `ChatSession` struct which owns the conversation
//! history and drives one user turn at a time through the retry controller,
//! the transport, and the stream aggregator.

use std::fmt;
use std::sync::Arc;

use crate::accumulating_stream::StreamAggregator;
use crate::chat::config::ChatConfig;
use crate::context::ConversationContext;
use crate::error::{Error, Result};
use crate::interrupt::Interrupt;
use crate::observability::{SESSION_FAILURES, SESSION_INTERRUPTS, SESSION_TURNS};
use crate::render::Renderer;
use crate::retry::{RetryController, RetryPolicy};
use crate::transport::Transport;
use crate::types::{Model, Role, Turn};

/// Where a session is in its per-turn lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for input.
    Idle,
    /// Opening the response stream, including any backoff between attempts.
    Sending,
    /// Consuming the response stream.
    Streaming,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Sending => "sending",
            SessionState::Streaming => "streaming",
        };
        f.write_str(name)
    }
}

/// Aggregated stats for a chat session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStats {
    /// The model used for the session.
    pub model: Model,
    /// The number of turns in the conversation, seed included.
    pub turn_count: usize,
    /// Submissions that produced an assistant turn.
    pub completed_exchanges: u64,
    /// Attempts made by the most recent submission, if any.
    pub last_attempts: Option<u32>,
    /// Attempts made across the whole session.
    pub total_attempts: u64,
}

/// A chat session that manages conversation state and remote calls.
///
/// Submissions are strictly sequential: `submit` takes `&mut self`, so the
/// history is never mutated by two calls at once.
pub struct ChatSession<T: Transport> {
    transport: T,
    model: Model,
    context: ConversationContext,
    seed: Vec<Turn>,
    retry: RetryController,
    interrupt: Arc<Interrupt>,
    state: SessionState,
    echo_role: bool,
    completed_exchanges: u64,
    last_attempts: Option<u32>,
    total_attempts: u64,
}

impl<T: Transport> ChatSession<T> {
    /// Creates a session with an empty history.
    pub fn new(transport: T, model: Model, policy: RetryPolicy) -> Self {
        Self {
            transport,
            model,
            context: ConversationContext::new(),
            seed: Vec::new(),
            retry: RetryController::new(policy),
            interrupt: Arc::new(Interrupt::new()),
            state: SessionState::Idle,
            echo_role: true,
            completed_exchanges: 0,
            last_attempts: None,
            total_attempts: 0,
        }
    }

    /// Creates a session from resolved configuration and seed turns.
    pub fn from_config(transport: T, config: &ChatConfig, seed: Vec<Turn>) -> Result<Self> {
        Ok(Self::new(transport, config.model.clone(), config.retry_policy()?).with_seed(seed))
    }

    /// Seeds the conversation; [`ChatSession::restart`] returns to these turns.
    pub fn with_seed(mut self, seed: Vec<Turn>) -> Self {
        self.context = ConversationContext::with_seed(seed.clone());
        self.seed = seed;
        self
    }

    /// Shares `interrupt` with the session instead of a private one.
    pub fn with_interrupt(mut self, interrupt: Arc<Interrupt>) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// Sets whether the assistant's role is announced before its reply.
    pub fn with_echo_role(mut self, echo_role: bool) -> Self {
        self.echo_role = echo_role;
        self
    }

    /// Sends a user message and streams the response.
    ///
    /// The user turn is committed to history before the call.  On success
    /// the assistant turn is appended and returned.
    ///
    /// # Errors
    ///
    /// A failed call leaves the user turn in history, unanswered.  An
    /// interrupt restores the history as it was before this call and returns
    /// [`Error::Interrupted`].
    pub async fn submit(&mut self, user_input: &str, renderer: &mut dyn Renderer) -> Result<Turn> {
        let previous_len = self.context.len();
        self.context.append(Turn::user(user_input));

        self.interrupt.arm();
        let interrupt = Arc::clone(&self.interrupt);
        self.transition(SessionState::Sending);
        let outcome = tokio::select! {
            biased;
            _ = interrupt.triggered() => None,
            result = self.exchange(renderer) => Some(result),
        };
        interrupt.disarm();
        self.transition(SessionState::Idle);

        match outcome {
            Some(Ok(turn)) => {
                SESSION_TURNS.click();
                self.completed_exchanges += 1;
                self.context.append(turn.clone());
                Ok(turn)
            }
            Some(Err(err)) => {
                SESSION_FAILURES.click();
                tracing::debug!(
                    kind = %err.kind(),
                    status = ?err.status_code(),
                    "submission failed: {err}"
                );
                Err(err)
            }
            None => {
                SESSION_INTERRUPTS.click();
                self.context.truncate(previous_len);
                renderer.print_interrupted();
                Err(Error::interrupted("interrupted by user"))
            }
        }
    }

    async fn exchange(&mut self, renderer: &mut dyn Renderer) -> Result<Turn> {
        let history = self.context.snapshot();
        let outcome = {
            let transport = &self.transport;
            let model = &self.model;
            let history = history.as_slice();
            self.retry
                .invoke(move || transport.send_chat(history, model))
                .await
        };
        self.last_attempts = Some(outcome.attempts);
        self.total_attempts += u64::from(outcome.attempts);
        let stream = outcome.into_result()?;

        self.transition(SessionState::Streaming);
        let reconstruction = StreamAggregator::new(self.echo_role)
            .consume(stream, renderer)
            .await?;
        // A stream that never names a role still came from the assistant.
        Ok(Turn::new(
            reconstruction.role.unwrap_or(Role::Assistant),
            reconstruction.content,
        ))
    }

    fn transition(&mut self, next: SessionState) {
        tracing::debug!(from = %self.state, to = %next, "session state");
        self.state = next;
    }

    /// Replaces the history with `seed`, or empties it.
    pub fn reset(&mut self, seed: Option<Vec<Turn>>) {
        tracing::debug!(
            seeded = seed.as_ref().is_some_and(|s| !s.is_empty()),
            "resetting conversation"
        );
        self.context.reset(seed);
    }

    /// Returns the history to the seed turns the session started with.
    pub fn restart(&mut self) {
        self.reset(Some(self.seed.clone()));
    }

    /// The conversation so far.
    pub fn context(&self) -> &ConversationContext {
        &self.context
    }

    /// The seed turns [`ChatSession::restart`] returns to.
    pub fn seed(&self) -> &[Turn] {
        &self.seed
    }

    /// Returns the current model.
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Sets whether the assistant's role is announced before its reply.
    pub fn set_echo_role(&mut self, echo_role: bool) {
        self.echo_role = echo_role;
    }

    /// The current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The retry policy applied to every call.
    pub fn retry_policy(&self) -> &RetryPolicy {
        self.retry.policy()
    }

    /// A handle a signal handler can use to cancel the call in flight.
    pub fn interrupt_handle(&self) -> Arc<Interrupt> {
        Arc::clone(&self.interrupt)
    }

    /// Returns the current session statistics snapshot.
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            model: self.model.clone(),
            turn_count: self.context.len(),
            completed_exchanges: self.completed_exchanges,
            last_attempts: self.last_attempts,
            total_attempts: self.total_attempts,
        }
    }
}
