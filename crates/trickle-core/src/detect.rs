//! Completeness detection over partial snapshots
//!
//! Given a snapshot from the tolerant parser, decide which elements of the
//! target array are semantically complete and safe to deliver. Delivery is
//! contiguous from the watermark: scanning stops at the first incomplete
//! element so items are always released in strict index order.

use serde_json::{Map, Value};

use crate::path::JsonPath;
use crate::schema::CompletenessRule;

/// Markers a generation model uses for text it has not finished writing
const TRUNCATION_MARKERS: [&str; 2] = ["...", "\u{2026}"];

/// One array element judged complete, annotated with its index
#[derive(Debug, Clone, PartialEq)]
pub struct CompleteItem {
    /// Position of the element in the target array
    pub index: usize,
    /// The element's raw (untrimmed) fields
    pub payload: Map<String, Value>,
}

/// Scan the target array for elements complete at index >= `watermark`.
///
/// Returns the contiguous run of complete elements starting at the watermark.
/// A missing array, or a path that does not resolve yet, yields no items -
/// the snapshot simply has not grown far enough.
pub fn scan_complete(
    snapshot: &Value,
    path: &JsonPath,
    rule: &CompletenessRule,
    watermark: usize,
) -> Vec<CompleteItem> {
    let Some(Value::Array(elements)) = path.resolve(snapshot) else {
        return Vec::new();
    };

    let mut complete = Vec::new();
    for (index, element) in elements.iter().enumerate().skip(watermark) {
        match element.as_object() {
            Some(fields) if is_complete(fields, rule) => complete.push(CompleteItem {
                index,
                payload: fields.clone(),
            }),
            // Contiguity: an incomplete element blocks everything after it
            _ => break,
        }
    }
    complete
}

/// Apply the rule to one element
fn is_complete(fields: &Map<String, Value>, rule: &CompletenessRule) -> bool {
    for field in rule.required_fields() {
        match fields.get(field) {
            None | Some(Value::Null) => return false,
            Some(Value::String(s)) if s.trim().is_empty() => return false,
            Some(_) => {}
        }
    }

    for (field, min) in rule.min_lengths() {
        if let Some(Value::String(s)) = fields.get(field)
            && s.trim().chars().count() < min
        {
            return false;
        }
    }

    for field in rule.checked_fields() {
        if let Some(Value::String(s)) = fields.get(field) {
            let trimmed = s.trim_end();
            if TRUNCATION_MARKERS.iter().any(|m| trimmed.ends_with(m)) {
                return false;
            }
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rule() -> CompletenessRule {
        CompletenessRule::new("Potential cause", "name")
            .require("summary")
            .min_length("summary", 10)
            .optional("severity")
    }

    fn path() -> JsonPath {
        JsonPath::parse("data.causes").unwrap()
    }

    #[test]
    fn test_contiguous_run_from_watermark() {
        let snapshot = json!({"data": {"causes": [
            {"name": "a", "summary": "complete summary one"},
            {"name": "b", "summary": "complete summary two"},
            {"name": "c", "summary": "still being wri"},
            {"name": "d", "summary": "already complete but blocked"},
        ]}});
        // Element 2 fails nothing structurally, check it blocks when incomplete
        let items = scan_complete(&snapshot, &path(), &rule(), 0);
        // "still being wri" passes min length 10 and has no marker, so it is
        // complete too; use a marker to make element 2 incomplete instead
        assert_eq!(items.len(), 4);

        let snapshot = json!({"data": {"causes": [
            {"name": "a", "summary": "complete summary one"},
            {"name": "b", "summary": "complete summary two"},
            {"name": "c", "summary": "trails off into the..."},
            {"name": "d", "summary": "already complete but blocked"},
        ]}});
        let items = scan_complete(&snapshot, &path(), &rule(), 0);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].index, 0);
        assert_eq!(items[1].index, 1);
    }

    #[test]
    fn test_watermark_skips_delivered_elements() {
        let snapshot = json!({"data": {"causes": [
            {"name": "a", "summary": "complete summary one"},
            {"name": "b", "summary": "complete summary two"},
        ]}});
        let items = scan_complete(&snapshot, &path(), &rule(), 1);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].index, 1);
    }

    #[test]
    fn test_missing_required_field_is_incomplete() {
        let snapshot = json!({"data": {"causes": [{"summary": "has no identity field"}]}});
        assert!(scan_complete(&snapshot, &path(), &rule(), 0).is_empty());
    }

    #[test]
    fn test_empty_after_trim_is_incomplete() {
        // Whitespace-only required value fails even when other fields satisfy
        // their length thresholds
        let snapshot = json!({"data": {"causes": [
            {"name": "   ", "summary": "a perfectly long summary"},
        ]}});
        assert!(scan_complete(&snapshot, &path(), &rule(), 0).is_empty());
    }

    #[test]
    fn test_min_length_counts_trimmed_chars() {
        let snapshot = json!({"data": {"causes": [
            {"name": "a", "summary": "  short  "},
        ]}});
        assert!(scan_complete(&snapshot, &path(), &rule(), 0).is_empty());
    }

    #[test]
    fn test_unicode_ellipsis_blocks() {
        let snapshot = json!({"data": {"causes": [
            {"name": "a", "summary": "keeps going and going\u{2026}"},
        ]}});
        assert!(scan_complete(&snapshot, &path(), &rule(), 0).is_empty());
    }

    #[test]
    fn test_null_required_field_is_incomplete() {
        let snapshot = json!({"data": {"causes": [
            {"name": "a", "summary": null},
        ]}});
        assert!(scan_complete(&snapshot, &path(), &rule(), 0).is_empty());
    }

    #[test]
    fn test_unresolved_path_or_non_array_yields_nothing() {
        assert!(scan_complete(&json!({}), &path(), &rule(), 0).is_empty());
        let snapshot = json!({"data": {"causes": "not an array"}});
        assert!(scan_complete(&snapshot, &path(), &rule(), 0).is_empty());
    }

    #[test]
    fn test_non_object_element_blocks() {
        let snapshot = json!({"data": {"causes": [
            "bare string",
            {"name": "a", "summary": "complete summary one"},
        ]}});
        assert!(scan_complete(&snapshot, &path(), &rule(), 0).is_empty());
    }
}
