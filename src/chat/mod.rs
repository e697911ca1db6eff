//! Chat application module for interactive conversations.
//!
//! This module provides a streaming REPL chat interface built on top of the
//! griseo client library. It supports:
//!
//! - Streaming responses with real-time token display
//! - Rate-limit retries with jittered exponential backoff
//! - `:`-prefixed meta-commands for session control
//! - Seed prompts loaded from disk
//!
//! # Architecture
//!
//! - [`config`]: CLI argument parsing and configuration
//! - [`session`]: Core chat session management and remote calls
//! - [`commands`]: Meta-command parsing and dispatch

mod commands;
mod config;
mod session;

pub use crate::render::{PlainTextRenderer, Renderer};
pub use commands::{ChatCommand, Input, Outcome, dispatch, help_text, parse_command, parse_input};
pub use config::{ChatArgs, ChatConfig};
pub use session::{ChatSession, SessionState, SessionStats};
