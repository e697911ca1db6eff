//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg` and configuration
//! structures for controlling chat behavior.

use std::path::PathBuf;
use std::time::Duration;

use arrrg_derive::CommandLine;

use crate::client::DEFAULT_API_URL;
use crate::error::Result;
use crate::retry::{DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_WAIT_MS, DEFAULT_MIN_WAIT_MS, RetryPolicy};
use crate::types::Model;

/// Command-line arguments for the griseo tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Model to use for chat.
    #[arrrg(optional, "Model to use (default: gpt-3.5-turbo)", "MODEL")]
    pub model: Option<String>,

    /// File of turns that opens every conversation.
    #[arrrg(optional, "Seed prompt file (.yaml, .yml, or .json)", "FILE")]
    pub prompt: Option<String>,

    /// Attempts per message when rate limited.
    #[arrrg(optional, "Attempts per message when rate limited (default: 3)", "N")]
    pub max_attempts: Option<u32>,

    /// Lower bound on the backoff between attempts.
    #[arrrg(optional, "Minimum backoff in milliseconds (default: 1000)", "MS")]
    pub min_wait_ms: Option<u64>,

    /// Upper bound on the backoff between attempts.
    #[arrrg(optional, "Maximum backoff in milliseconds (default: 60000)", "MS")]
    pub max_wait_ms: Option<u64>,

    /// Base URL of the chat completions service.
    #[arrrg(optional, "Service base URL (default: https://api.openai.com/v1/)", "URL")]
    pub base_url: Option<String>,

    /// Seconds to wait for the service to start answering.
    #[arrrg(optional, "Seconds to wait for a response to begin (default: 60)", "SECS")]
    pub timeout: Option<u64>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,

    /// Print the version and exit.
    #[arrrg(flag, "Show version")]
    pub version: bool,
}

/// Configuration for a chat session.
///
/// This struct holds the resolved configuration values after processing
/// command-line arguments with appropriate defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    /// The model to use for generating responses.
    pub model: Model,

    /// Seed prompt file, if any.
    pub prompt_file: Option<PathBuf>,

    /// Attempts per message when rate limited.
    pub max_attempts: u32,

    /// Lower bound on the backoff between attempts.
    pub min_wait_ms: u64,

    /// Upper bound on the backoff between attempts.
    pub max_wait_ms: u64,

    /// Base URL of the chat completions service.
    pub base_url: String,

    /// How long to wait for a response to begin.  A response that has begun
    /// may stream for as long as it takes.
    pub timeout: Duration,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Model: gpt-3.5-turbo
    /// - Retry: 3 attempts, backoff between 1s and 60s
    /// - Color: enabled
    pub fn new() -> Self {
        Self {
            model: Model::default(),
            prompt_file: None,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            min_wait_ms: DEFAULT_MIN_WAIT_MS,
            max_wait_ms: DEFAULT_MAX_WAIT_MS,
            base_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(60),
            use_color: true,
        }
    }

    /// Sets the model to use.
    pub fn with_model(mut self, model: Model) -> Self {
        self.model = model;
        self
    }

    /// Sets the seed prompt file.
    pub fn with_prompt_file(mut self, path: Option<PathBuf>) -> Self {
        self.prompt_file = path;
        self
    }

    /// Sets the retry limits.  They are validated by [`ChatConfig::retry_policy`].
    pub fn with_retry(mut self, max_attempts: u32, min_wait_ms: u64, max_wait_ms: u64) -> Self {
        self.max_attempts = max_attempts;
        self.min_wait_ms = min_wait_ms;
        self.max_wait_ms = max_wait_ms;
        self
    }

    /// Sets the service base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets how long to wait for a response to begin.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    /// The retry policy these settings describe.
    ///
    /// # Errors
    ///
    /// Returns a validation error for zero attempts or a minimum wait above
    /// the maximum.
    pub fn retry_policy(&self) -> Result<RetryPolicy> {
        RetryPolicy::new(self.max_attempts, self.min_wait_ms, self.max_wait_ms)
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ChatArgs> for ChatConfig {
    fn from(args: ChatArgs) -> Self {
        let defaults = ChatConfig::new();
        let model = args
            .model
            .map(|s| s.parse::<Model>().unwrap_or(Model::Custom(s)))
            .unwrap_or_default();

        ChatConfig {
            model,
            prompt_file: args.prompt.map(PathBuf::from),
            max_attempts: args.max_attempts.unwrap_or(defaults.max_attempts),
            min_wait_ms: args.min_wait_ms.unwrap_or(defaults.min_wait_ms),
            max_wait_ms: args.max_wait_ms.unwrap_or(defaults.max_wait_ms),
            base_url: args.base_url.unwrap_or(defaults.base_url),
            timeout: args
                .timeout
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            use_color: !args.no_color,
        }
    }
}
