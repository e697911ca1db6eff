//! The capability the session uses to reach the remote service.

use std::pin::Pin;
use std::sync::Arc;

use futures::Stream;

use crate::error::Result;
use crate::types::{Model, StreamChunk, Turn};

/// A response stream: finite, ordered, and consumed once.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<StreamChunk>> + Send>>;

/// Sends a conversation to a chat service and opens the response stream.
///
/// Implementations fail with a rate-limit error when the service throttles
/// the request, with a bad-request error when it rejects it, and with a
/// network-kind error when it cannot be reached.  Only the opening of the
/// stream is retried; items of an opened stream may still fail.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Sends `history` to `model` and returns the response stream.
    async fn send_chat(&self, history: &[Turn], model: &Model) -> Result<ChunkStream>;
}

#[async_trait::async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send_chat(&self, history: &[Turn], model: &Model) -> Result<ChunkStream> {
        self.as_ref().send_chat(history, model).await
    }
}
