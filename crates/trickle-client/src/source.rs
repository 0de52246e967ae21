//! Event source port and its HTTP implementation
//!
//! The connection policy only needs something that can open an ordered event
//! stream for a request. [`HttpEventSource`] does it over the NDJSON
//! transport; tests swap in scripted sources.

use bytes::Bytes;
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use futures::StreamExt;

use trickle_core::{Error, Result, StreamEvent, StreamRequest};

/// Opens one exchange's worth of events
pub trait EventSource: Send + Sync {
    /// Connect and return the ordered event stream for `request`.
    ///
    /// Item-level `Err`s are transport or decode failures; the stream is
    /// unusable past the first one.
    fn connect(
        &self,
        request: &StreamRequest,
    ) -> BoxFuture<'static, Result<BoxStream<'static, Result<StreamEvent>>>>;
}

/// Reads events from the NDJSON streaming endpoint over HTTP
#[derive(Debug, Clone)]
pub struct HttpEventSource {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpEventSource {
    /// Point at a streaming endpoint, e.g. `http://host/v1/stream`
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    /// Use a preconfigured reqwest client (proxies, default headers)
    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

impl EventSource for HttpEventSource {
    fn connect(
        &self,
        request: &StreamRequest,
    ) -> BoxFuture<'static, Result<BoxStream<'static, Result<StreamEvent>>>> {
        let client = self.client.clone();
        let endpoint = self.endpoint.clone();
        let request = request.clone();
        Box::pin(async move {
            let response = client
                .post(&endpoint)
                .json(&request)
                .send()
                .await
                .map_err(|e| Error::transport(e.to_string()))?
                .error_for_status()
                .map_err(|e| Error::transport(e.to_string()))?;
            let bytes = response.bytes_stream();
            Ok(decode_lines(bytes.boxed()).boxed())
        })
    }
}

/// Split a byte stream on newlines and decode each line as one event
fn decode_lines(
    mut bytes: BoxStream<'static, reqwest::Result<Bytes>>,
) -> impl futures::Stream<Item = Result<StreamEvent>> {
    async_stream::stream! {
        let mut pending: Vec<u8> = Vec::new();
        while let Some(next) = bytes.next().await {
            let chunk = match next {
                Ok(chunk) => chunk,
                Err(err) => {
                    yield Err(Error::transport(err.to_string()));
                    return;
                }
            };
            pending.extend_from_slice(&chunk);
            while let Some(pos) = pending.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = pending.drain(..=pos).collect();
                let text = String::from_utf8_lossy(&line);
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    continue;
                }
                yield StreamEvent::decode(trimmed);
            }
        }
        // A final record without its newline is still a record
        let text = String::from_utf8_lossy(&pending);
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            yield StreamEvent::decode(trimmed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use trickle_core::StreamStats;

    fn byte_stream(parts: Vec<&'static [u8]>) -> BoxStream<'static, reqwest::Result<Bytes>> {
        futures::stream::iter(parts.into_iter().map(|p| Ok(Bytes::from_static(p)))).boxed()
    }

    #[tokio::test]
    async fn test_decodes_lines_split_across_chunks() {
        let first = StreamEvent::raw_chunk(0, "hello").encode().unwrap();
        let second = StreamEvent::complete(
            json!("hello"),
            StreamStats {
                chunks: 1,
                items_sent: 1,
                buffer_length: 5,
            },
        )
        .encode()
        .unwrap();
        let wire = format!("{first}{second}");
        let wire: &'static str = wire.leak();
        let (head, tail) = wire.as_bytes().split_at(wire.len() / 2);

        let events: Vec<_> = decode_lines(byte_stream(vec![head, tail])).collect().await;
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], Ok(StreamEvent::Item { .. })));
        assert!(matches!(events[1], Ok(StreamEvent::Complete { .. })));
    }

    #[tokio::test]
    async fn test_undecodable_line_is_an_item_error() {
        let events: Vec<_> = decode_lines(byte_stream(vec![b"definitely not json\n"]))
            .collect()
            .await;
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Err(Error::InvalidEvent(_))));
    }

    #[tokio::test]
    async fn test_blank_lines_are_skipped() {
        let line = StreamEvent::error("x").encode().unwrap();
        let wire = format!("\n\n{line}\n");
        let wire: &'static str = wire.leak();
        let events: Vec<_> = decode_lines(byte_stream(vec![wire.as_bytes()]))
            .collect()
            .await;
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Ok(StreamEvent::Error { .. })));
    }
}
