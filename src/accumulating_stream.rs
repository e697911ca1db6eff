//! Reconstructs a complete message from a response stream while echoing it.

use std::time::Instant;

use futures::{Stream, StreamExt};

use crate::error::Result;
use crate::observability::{STREAM_BYTES, STREAM_CHUNKS, STREAM_DURATION};
use crate::render::Renderer;
use crate::types::{Role, StreamChunk};

/// The message rebuilt from one response stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconstruction {
    /// The first role announced by the stream; `None` if it never announced one.
    pub role: Option<Role>,
    /// Every content fragment, concatenated in arrival order.
    pub content: String,
    /// How many chunks the stream yielded.
    pub chunks: usize,
}

/// Consumes one response stream, echoing content as it arrives.
///
/// An aggregator holds state for exactly one stream; build a fresh one per
/// call.  [`StreamAggregator::consume`] takes `self` by value to enforce
/// that.
#[derive(Debug, Default)]
pub struct StreamAggregator {
    echo_role: bool,
    role: Option<Role>,
    content: String,
    chunks: usize,
}

impl StreamAggregator {
    /// Creates an aggregator.  With `echo_role` set, the role is announced
    /// through the renderer once, when it first arrives.
    pub fn new(echo_role: bool) -> Self {
        Self {
            echo_role,
            ..Self::default()
        }
    }

    /// Applies one chunk.
    pub fn accept(&mut self, chunk: StreamChunk, renderer: &mut dyn Renderer) {
        self.chunks += 1;
        STREAM_CHUNKS.click();
        if let Some(role) = chunk.delta_role {
            match self.role {
                None => {
                    self.role = Some(role);
                    if self.echo_role {
                        renderer.print_role(role);
                    }
                }
                Some(first) => {
                    tracing::debug!(%first, late = %role, "ignoring late role announcement");
                }
            }
        }
        if let Some(fragment) = chunk.delta_content {
            STREAM_BYTES.count(fragment.len() as u64);
            renderer.print_text(&fragment);
            self.content.push_str(&fragment);
        }
    }

    /// Finishes the response and hands back what was accumulated.
    pub fn finish(self, renderer: &mut dyn Renderer) -> Reconstruction {
        renderer.finish_response();
        Reconstruction {
            role: self.role,
            content: self.content,
            chunks: self.chunks,
        }
    }

    /// Drains `stream` in order, then terminates the displayed line.
    ///
    /// # Errors
    ///
    /// The first failed item ends consumption; whatever was accumulated so
    /// far is dropped along with the aggregator.
    pub async fn consume<S>(mut self, stream: S, renderer: &mut dyn Renderer) -> Result<Reconstruction>
    where
        S: Stream<Item = Result<StreamChunk>>,
    {
        let start = Instant::now();
        futures::pin_mut!(stream);
        while let Some(chunk) = stream.next().await {
            self.accept(chunk?, renderer);
        }
        let reconstruction = self.finish(renderer);
        STREAM_DURATION.add(start.elapsed().as_secs_f64());
        tracing::debug!(
            chunks = reconstruction.chunks,
            bytes = reconstruction.content.len(),
            "stream complete"
        );
        Ok(reconstruction)
    }
}
