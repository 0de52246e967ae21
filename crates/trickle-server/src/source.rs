//! Generation source port
//!
//! The seam where a model backend plugs in. The producer loop only needs an
//! ordered stream of text chunks; how those chunks are generated, which model
//! produces them, and how the backend authenticates is the caller's business.

use futures::stream::{self, BoxStream};

use trickle_core::{Result, StreamRequest};

/// An upstream producer of raw text chunks for one exchange
pub trait GenerationSource: Send + Sync {
    /// Open the chunk stream for one request.
    ///
    /// A `Err` item means the source failed hard mid-stream; the producer
    /// loop turns it into a terminal error event.
    fn stream(&self, request: &StreamRequest) -> BoxStream<'static, Result<String>>;
}

/// A source that replays a fixed chunk script, for tests and demos
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    chunks: Vec<Result<String>>,
}

impl ScriptedSource {
    /// Replay the given chunks in order
    pub fn new(chunks: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            chunks: chunks.into_iter().map(|c| Ok(c.into())).collect(),
        }
    }

    /// End the script with a hard source failure
    pub fn failing_after(
        chunks: impl IntoIterator<Item = impl Into<String>>,
        message: impl Into<String>,
    ) -> Self {
        let mut chunks: Vec<Result<String>> =
            chunks.into_iter().map(|c| Ok(c.into())).collect();
        chunks.push(Err(trickle_core::Error::source(message)));
        Self { chunks }
    }
}

impl GenerationSource for ScriptedSource {
    fn stream(&self, _request: &StreamRequest) -> BoxStream<'static, Result<String>> {
        Box::pin(stream::iter(self.chunks.clone()))
    }
}
