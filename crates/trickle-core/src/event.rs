//! Stream event wire format
//!
//! Events travel as newline-delimited JSON records, one object per line,
//! tagged by a `type` field. The transport guarantees in-order delivery;
//! content-level guarantees (no duplicates, contiguous indices) are the
//! emission tracker's job.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::emit::DeliveryRecord;
use crate::{Error, Result};

/// Counters reported with the terminal `complete` event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamStats {
    /// Text chunks consumed from the generation source
    pub chunks: u64,
    /// `item` events emitted
    #[serde(rename = "itemsSent")]
    pub items_sent: u64,
    /// Final raw buffer size in bytes
    #[serde(rename = "bufferLength")]
    pub buffer_length: u64,
}

/// One record on the event channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    /// A detected-complete array element, delivered exactly once
    Item {
        /// Dotted path of the source array
        field: String,
        /// Element index within that array
        index: usize,
        /// Cleaned element payload
        data: Map<String, Value>,
        /// Emission time, UTC epoch milliseconds
        timestamp: i64,
    },
    /// Terminal: the authoritative final document plus exchange statistics
    Complete {
        /// Final document parsed from the full buffer
        data: Value,
        /// Exchange counters
        stats: StreamStats,
        /// Emission time, UTC epoch milliseconds
        timestamp: i64,
    },
    /// Terminal: the exchange failed
    Error {
        /// Human-readable failure description
        message: String,
        /// Emission time, UTC epoch milliseconds
        timestamp: i64,
    },
}

impl StreamEvent {
    /// Wrap a delivery record as an `item` event
    pub fn item(record: DeliveryRecord) -> Self {
        Self::Item {
            field: record.array_path,
            index: record.index,
            data: record.payload,
            timestamp: now_millis(),
        }
    }

    /// Build an `item` event carrying one verbatim raw-text chunk
    pub fn raw_chunk(index: usize, text: impl Into<String>) -> Self {
        let mut data = Map::new();
        data.insert("text".to_owned(), Value::String(text.into()));
        Self::Item {
            field: "text".to_owned(),
            index,
            data,
            timestamp: now_millis(),
        }
    }

    /// Build the terminal `complete` event
    pub fn complete(data: Value, stats: StreamStats) -> Self {
        Self::Complete {
            data,
            stats,
            timestamp: now_millis(),
        }
    }

    /// Build the terminal `error` event
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
            timestamp: now_millis(),
        }
    }

    /// Whether this event ends the exchange
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete { .. } | Self::Error { .. })
    }

    /// Serialize to one newline-terminated wire record
    pub fn encode(&self) -> Result<String> {
        let mut line =
            serde_json::to_string(self).map_err(|e| Error::invalid_event(e.to_string()))?;
        line.push('\n');
        Ok(line)
    }

    /// Parse one wire record (with or without its trailing newline)
    pub fn decode(line: &str) -> Result<Self> {
        serde_json::from_str(line.trim()).map_err(|e| Error::invalid_event(e.to_string()))
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_item_round_trip() {
        let record = DeliveryRecord {
            type_name: "potential_cause".to_owned(),
            array_path: "data.causes".to_owned(),
            index: 3,
            payload: json!({"name": "a", "summary": "ok"})
                .as_object()
                .unwrap()
                .clone(),
        };
        let event = StreamEvent::item(record);
        assert!(!event.is_terminal());

        let line = event.encode().unwrap();
        assert!(line.ends_with('\n'));
        assert_eq!(StreamEvent::decode(&line).unwrap(), event);
    }

    #[test]
    fn test_wire_shape() {
        let event = StreamEvent::complete(
            json!({"data": {"causes": []}}),
            StreamStats {
                chunks: 12,
                items_sent: 4,
                buffer_length: 2048,
            },
        );
        let value: Value = serde_json::from_str(event.encode().unwrap().trim()).unwrap();
        assert_eq!(value["type"], "complete");
        assert_eq!(value["stats"]["chunks"], 12);
        assert_eq!(value["stats"]["itemsSent"], 4);
        assert_eq!(value["stats"]["bufferLength"], 2048);
        assert!(value["timestamp"].is_i64());
    }

    #[test]
    fn test_error_is_terminal() {
        let event = StreamEvent::error("source hung up");
        assert!(event.is_terminal());
        let line = event.encode().unwrap();
        match StreamEvent::decode(&line).unwrap() {
            StreamEvent::Error { message, .. } => assert_eq!(message, "source hung up"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(StreamEvent::decode("not json").is_err());
        assert!(StreamEvent::decode(r#"{"type": "unknown"}"#).is_err());
    }
}
