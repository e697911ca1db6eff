// Public modules
pub mod chat;
pub mod client;
pub mod context;
pub mod error;
pub mod interrupt;
pub mod observability;
pub mod prompts;
pub mod retry;
pub mod sse;
pub mod transport;
pub mod types;

mod accumulating_stream;
mod render;

// Re-exports
pub use accumulating_stream::{Reconstruction, StreamAggregator};
pub use client::OpenAi;
pub use context::ConversationContext;
pub use error::{Error, ErrorKind, Result};
pub use interrupt::Interrupt;
pub use observability::register_biometrics;
pub use render::{PlainTextRenderer, Renderer};
pub use retry::{RetryController, RetryOutcome, RetryPolicy};
pub use transport::{ChunkStream, Transport};
pub use types::*;
