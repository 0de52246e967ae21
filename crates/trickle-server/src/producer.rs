//! Producer loop: buffer accumulation, periodic scans, event emission
//!
//! One loop instance owns one exchange: its raw buffer, emission state, and
//! the sending half of the event channel. Parse misses are the expected
//! steady state and never escape; transient scans that find nothing simply
//! wait for more text. Sends to a closed channel are silently dropped and end
//! the loop, so a producer racing a client-initiated cancel never faults.

use std::sync::Arc;

use futures::{Stream, StreamExt};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use trickle_core::{
    CompletenessRule, DeliveryMode, EmissionState, Error, JsonPath, Result, SchemaRegistry,
    StreamEvent, StreamRequest, StreamStats, parse_partial, scan_complete,
};

/// Tuning knobs for the producer loop
#[derive(Debug, Clone, Copy)]
pub struct ProducerConfig {
    /// Run the parse/detect/track cycle every this many chunks.
    ///
    /// Batching bounds parse cost; any positive value is correct.
    pub parse_every: usize,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self { parse_every: 3 }
    }
}

/// Drives one exchange from chunk intake to its terminal event
pub struct ProducerLoop {
    registry: Arc<SchemaRegistry>,
    config: ProducerConfig,
}

impl ProducerLoop {
    /// Create a loop with default tuning
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self::with_config(registry, ProducerConfig::default())
    }

    /// Create a loop with explicit tuning
    pub fn with_config(registry: Arc<SchemaRegistry>, config: ProducerConfig) -> Self {
        let config = ProducerConfig {
            parse_every: config.parse_every.max(1),
        };
        Self { registry, config }
    }

    /// Consume `chunks` for `request`, writing events to `tx`.
    ///
    /// Always ends with exactly one terminal event unless the receiving side
    /// has already gone away, in which case the loop stops without writing
    /// anything further.
    pub async fn run<S>(&self, request: StreamRequest, chunks: S, tx: mpsc::Sender<StreamEvent>)
    where
        S: Stream<Item = Result<String>> + Unpin,
    {
        match request.mode {
            DeliveryMode::Structured => self.run_structured(request, chunks, tx).await,
            DeliveryMode::RawText => self.run_raw(chunks, tx).await,
        }
    }

    async fn run_structured<S>(
        &self,
        request: StreamRequest,
        mut chunks: S,
        tx: mpsc::Sender<StreamEvent>,
    ) where
        S: Stream<Item = Result<String>> + Unpin,
    {
        let rule = match self.registry.rule(&request.item_type) {
            Ok(rule) => rule.clone(),
            Err(err) => {
                send(&tx, StreamEvent::error(err.to_string())).await;
                return;
            }
        };
        let path = match JsonPath::parse(&request.array_path) {
            Ok(path) => path,
            Err(err) => {
                send(&tx, StreamEvent::error(err.to_string())).await;
                return;
            }
        };

        let mut buffer = String::new();
        let mut state = EmissionState::new();
        let mut chunk_count: u64 = 0;
        let mut items_sent: u64 = 0;

        while let Some(next) = chunks.next().await {
            let chunk = match next {
                Ok(chunk) => chunk,
                Err(err) => {
                    warn!(%err, "generation source failed");
                    send(&tx, StreamEvent::error(err.to_string())).await;
                    return;
                }
            };
            buffer.push_str(&chunk);
            chunk_count += 1;
            if chunk_count % self.config.parse_every as u64 != 0 {
                continue;
            }
            if !self
                .scan_and_send(&buffer, &path, &rule, &request, &mut state, &mut items_sent, &tx)
                .await
            {
                return;
            }
        }

        // One final pass catches elements completed by the last chunks
        if !self
            .scan_and_send(&buffer, &path, &rule, &request, &mut state, &mut items_sent, &tx)
            .await
        {
            return;
        }

        let stats = StreamStats {
            chunks: chunk_count,
            items_sent,
            buffer_length: buffer.len() as u64,
        };
        // The authoritative result is a fresh parse of the full buffer, not a
        // reconstruction from what was delivered
        match parse_partial(&buffer) {
            Some(document) => {
                debug!(
                    chunks = stats.chunks,
                    items = stats.items_sent,
                    bytes = stats.buffer_length,
                    "exchange complete"
                );
                send(&tx, StreamEvent::complete(document, stats)).await;
            }
            None => {
                warn!(bytes = stats.buffer_length, "final buffer yielded no document");
                send(&tx, StreamEvent::error(Error::UnusableDocument.to_string())).await;
            }
        }
    }

    /// One parse/detect/track pass. Returns `false` once the channel closes.
    #[allow(clippy::too_many_arguments)]
    async fn scan_and_send(
        &self,
        buffer: &str,
        path: &JsonPath,
        rule: &CompletenessRule,
        request: &StreamRequest,
        state: &mut EmissionState,
        items_sent: &mut u64,
        tx: &mpsc::Sender<StreamEvent>,
    ) -> bool {
        // A buffer that does not parse yet is a transient miss, not an error
        let Some(snapshot) = parse_partial(buffer) else {
            return true;
        };
        let found = scan_complete(&snapshot, path, rule, state.watermark());
        if found.is_empty() {
            return true;
        }
        let records = state.admit(found, rule, &request.item_type, path);
        for record in records {
            debug!(index = record.index, path = %record.array_path, "delivering item");
            if tx.send(StreamEvent::item(record)).await.is_err() {
                debug!("event channel closed, stopping producer");
                return false;
            }
            *items_sent += 1;
        }
        true
    }

    async fn run_raw<S>(&self, mut chunks: S, tx: mpsc::Sender<StreamEvent>)
    where
        S: Stream<Item = Result<String>> + Unpin,
    {
        let mut buffer = String::new();
        let mut index: usize = 0;

        while let Some(next) = chunks.next().await {
            let chunk = match next {
                Ok(chunk) => chunk,
                Err(err) => {
                    warn!(%err, "generation source failed");
                    send(&tx, StreamEvent::error(err.to_string())).await;
                    return;
                }
            };
            buffer.push_str(&chunk);
            if tx.send(StreamEvent::raw_chunk(index, chunk)).await.is_err() {
                debug!("event channel closed, stopping producer");
                return;
            }
            index += 1;
        }

        let stats = StreamStats {
            chunks: index as u64,
            items_sent: index as u64,
            buffer_length: buffer.len() as u64,
        };
        send(&tx, StreamEvent::complete(Value::String(buffer), stats)).await;
    }
}

/// Closed-channel writes are a no-op, never a fault
async fn send(tx: &mpsc::Sender<StreamEvent>, event: StreamEvent) {
    let _ = tx.send(event).await;
}
