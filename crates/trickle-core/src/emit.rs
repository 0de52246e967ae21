//! Emission tracking: dedupe, ordering, and delivery-record assembly
//!
//! The tracker is the single gate between detection and the wire. It
//! remembers which `(index, identity)` pairs were already sent, cleans the
//! payloads it lets through, and advances the watermark so later scans skip
//! everything already delivered. One tracker instance belongs to exactly one
//! exchange and is never shared.

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::detect::CompleteItem;
use crate::path::JsonPath;
use crate::schema::CompletenessRule;

/// The cleaned, ready-to-send form of one detected-complete array element
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryRecord {
    /// Item-type name this element was validated against
    pub type_name: String,
    /// Dotted path of the array the element came from
    pub array_path: String,
    /// Position of the element in that array
    pub index: usize,
    /// Trimmed fields: required plus any present optional ones
    pub payload: Map<String, Value>,
}

/// Per-exchange delivery bookkeeping
///
/// `watermark` only increases and `seen` only grows; both start empty for
/// every new exchange.
#[derive(Debug, Default)]
pub struct EmissionState {
    watermark: usize,
    seen: HashSet<String>,
}

impl EmissionState {
    /// Fresh state for a new exchange
    pub fn new() -> Self {
        Self::default()
    }

    /// Index boundary up to which contiguous elements have been delivered
    pub fn watermark(&self) -> usize {
        self.watermark
    }

    /// Number of distinct elements delivered so far
    pub fn delivered(&self) -> usize {
        self.seen.len()
    }

    /// Filter newly-detected items against what was already sent and assemble
    /// delivery records for the rest.
    ///
    /// Items are expected in the detector's contiguous index order; the
    /// watermark advances only across that contiguous run. A key is never
    /// admitted twice, even across repeated scans of the same buffer.
    pub fn admit(
        &mut self,
        items: Vec<CompleteItem>,
        rule: &CompletenessRule,
        type_name: &str,
        array_path: &JsonPath,
    ) -> Vec<DeliveryRecord> {
        let mut records = Vec::new();
        for item in items {
            let identity = item
                .payload
                .get(rule.identity_field())
                .map(identity_key)
                .unwrap_or_default();
            let key = format!("{}:{identity}", item.index);
            if self.seen.contains(&key) {
                // Sent on an earlier scan; still counts toward contiguity
                if item.index == self.watermark {
                    self.watermark = item.index + 1;
                }
                continue;
            }
            self.seen.insert(key);
            if item.index == self.watermark {
                self.watermark = item.index + 1;
            }
            records.push(DeliveryRecord {
                type_name: type_name.to_owned(),
                array_path: array_path.to_string(),
                index: item.index,
                payload: clean_payload(&item.payload, rule),
            });
        }
        records
    }
}

/// Trim string fields and keep only fields the rule knows about
fn clean_payload(raw: &Map<String, Value>, rule: &CompletenessRule) -> Map<String, Value> {
    let mut payload = Map::new();
    for (field, value) in raw {
        if !rule.is_known_field(field) {
            continue;
        }
        let cleaned = match value {
            Value::String(s) => Value::String(s.trim().to_owned()),
            other => other.clone(),
        };
        payload.insert(field.clone(), cleaned);
    }
    payload
}

fn identity_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_owned(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rule() -> CompletenessRule {
        CompletenessRule::new("Potential cause", "name")
            .require("summary")
            .optional("severity")
    }

    fn path() -> JsonPath {
        JsonPath::parse("data.causes").unwrap()
    }

    fn item(index: usize, value: Value) -> CompleteItem {
        CompleteItem {
            index,
            payload: value.as_object().unwrap().clone(),
        }
    }

    #[test]
    fn test_admit_cleans_and_advances_watermark() {
        let mut state = EmissionState::new();
        let records = state.admit(
            vec![item(
                0,
                json!({"name": " Dehydration ", "summary": "ok", "severity": 2, "scratch": "x"}),
            )],
            &rule(),
            "potential_cause",
            &path(),
        );
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.index, 0);
        assert_eq!(record.type_name, "potential_cause");
        assert_eq!(record.array_path, "data.causes");
        assert_eq!(record.payload.get("name"), Some(&json!("Dehydration")));
        assert_eq!(record.payload.get("severity"), Some(&json!(2)));
        // Unknown fields never leave the producer
        assert!(!record.payload.contains_key("scratch"));
        assert_eq!(state.watermark(), 1);
    }

    #[test]
    fn test_never_reemits_a_seen_key() {
        let mut state = EmissionState::new();
        let element = json!({"name": "a", "summary": "ok"});
        let first = state.admit(vec![item(0, element.clone())], &rule(), "t", &path());
        assert_eq!(first.len(), 1);
        // Same buffer content rescanned from watermark 0
        let second = state.admit(vec![item(0, element)], &rule(), "t", &path());
        assert!(second.is_empty());
        assert_eq!(state.watermark(), 1);
        assert_eq!(state.delivered(), 1);
    }

    #[test]
    fn test_watermark_only_advances_across_contiguous_run() {
        let mut state = EmissionState::new();
        let records = state.admit(
            vec![
                item(0, json!({"name": "a", "summary": "ok"})),
                item(1, json!({"name": "b", "summary": "ok"})),
                // A gap: index 3 completed before index 2
                item(3, json!({"name": "d", "summary": "ok"})),
            ],
            &rule(),
            "t",
            &path(),
        );
        assert_eq!(records.len(), 3);
        assert_eq!(state.watermark(), 2);
    }

    #[test]
    fn test_two_chunk_watermark_scenario() {
        // Chunk 1: element 0 complete, element 1 still truncated
        let mut state = EmissionState::new();
        let first = state.admit(
            vec![item(0, json!({"name": "a", "summary": "ok"}))],
            &rule(),
            "t",
            &path(),
        );
        assert_eq!(first.len(), 1);
        assert_eq!(state.watermark(), 1);

        // Chunk 2 completes element 1; element 0 is not re-delivered
        let second = state.admit(
            vec![item(1, json!({"name": "b", "summary": "ok"}))],
            &rule(),
            "t",
            &path(),
        );
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].index, 1);
        assert_eq!(state.watermark(), 2);
    }
}
