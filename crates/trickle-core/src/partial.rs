//! Tolerant parsing of truncated JSON documents
//!
//! The producer's raw buffer is a prefix of one large JSON document and may
//! end mid-token, mid-string, or mid-structure. [`parse_partial`] extracts the
//! best available object graph from such a prefix: partially-built objects and
//! arrays are kept with their incomplete tail dropped, while truncated trailing
//! scalars are omitted entirely. A value that ends exactly at the buffer edge
//! without its closing delimiter is treated as still in flight.
//!
//! Parsing is stateless and idempotent: every call starts over from the full
//! buffer, and identical input yields structurally identical output.

use serde_json::{Map, Value};

/// Best-effort parse of a possibly-truncated JSON prefix.
///
/// Returns `None` when no usable snapshot exists yet (empty buffer, no
/// document start, or nothing decodable). Never panics on malformed input -
/// malformed input is the steady state until the stream ends.
///
/// Leading prose or markdown code fences before the document, as generation
/// models routinely emit, are skipped: parsing starts at the first `{` or `[`.
/// Anything after a completed top-level value is ignored.
pub fn parse_partial(input: &str) -> Option<Value> {
    let start = input.find(['{', '['])?;
    let mut cursor = Cursor::new(&input.as_bytes()[start..]);
    match cursor.parse_value() {
        Parsed::Done(value) | Parsed::Partial(value) => Some(value),
        Parsed::Incomplete => None,
    }
}

/// Outcome of one parse step
enum Parsed {
    /// The value is syntactically closed
    Done(Value),
    /// A container whose tail was truncated; what was recovered is usable
    Partial(Value),
    /// Nothing usable: truncated scalar or garbage
    Incomplete,
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn bump(&mut self) {
        self.pos += 1;
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.bump();
        }
    }

    fn parse_value(&mut self) -> Parsed {
        self.skip_ws();
        match self.peek() {
            None => Parsed::Incomplete,
            Some(b'{') => self.parse_object(),
            Some(b'[') => self.parse_array(),
            Some(b'"') => match self.parse_string() {
                Some(s) => Parsed::Done(Value::String(s)),
                None => Parsed::Incomplete,
            },
            Some(b't' | b'f' | b'n') => self.parse_literal(),
            Some(c) if c == b'-' || c.is_ascii_digit() => self.parse_number(),
            Some(_) => Parsed::Incomplete,
        }
    }

    fn parse_object(&mut self) -> Parsed {
        self.bump(); // consume '{'
        let mut map = Map::new();
        loop {
            self.skip_ws();
            match self.peek() {
                Some(b'}') => {
                    self.bump();
                    return Parsed::Done(Value::Object(map));
                }
                Some(b'"') => {}
                // Truncated before the next key, or garbage
                _ => return Parsed::Partial(Value::Object(map)),
            }
            let key = match self.parse_string() {
                Some(key) => key,
                None => return Parsed::Partial(Value::Object(map)),
            };
            self.skip_ws();
            match self.peek() {
                Some(b':') => self.bump(),
                _ => return Parsed::Partial(Value::Object(map)),
            }
            match self.parse_value() {
                Parsed::Done(value) => {
                    map.insert(key, value);
                }
                Parsed::Partial(value) => {
                    map.insert(key, value);
                    return Parsed::Partial(Value::Object(map));
                }
                Parsed::Incomplete => return Parsed::Partial(Value::Object(map)),
            }
            self.skip_ws();
            match self.peek() {
                Some(b',') => self.bump(),
                Some(b'}') => {
                    self.bump();
                    return Parsed::Done(Value::Object(map));
                }
                _ => return Parsed::Partial(Value::Object(map)),
            }
        }
    }

    fn parse_array(&mut self) -> Parsed {
        self.bump(); // consume '['
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            match self.peek() {
                None => return Parsed::Partial(Value::Array(items)),
                Some(b']') => {
                    self.bump();
                    return Parsed::Done(Value::Array(items));
                }
                Some(_) => {}
            }
            match self.parse_value() {
                Parsed::Done(value) => items.push(value),
                Parsed::Partial(value) => {
                    items.push(value);
                    return Parsed::Partial(Value::Array(items));
                }
                Parsed::Incomplete => return Parsed::Partial(Value::Array(items)),
            }
            self.skip_ws();
            match self.peek() {
                Some(b',') => self.bump(),
                Some(b']') => {
                    self.bump();
                    return Parsed::Done(Value::Array(items));
                }
                _ => return Parsed::Partial(Value::Array(items)),
            }
        }
    }

    /// Consume one string token. `None` means the closing quote never arrived
    /// or the token does not decode; either way the cursor is spent.
    fn parse_string(&mut self) -> Option<String> {
        let start = self.pos;
        self.bump(); // consume opening '"'
        loop {
            match self.peek() {
                None => return None,
                Some(b'"') => {
                    self.bump();
                    let token = std::str::from_utf8(&self.bytes[start..self.pos]).ok()?;
                    // serde_json handles escape decoding, including \u pairs
                    return serde_json::from_str::<String>(token).ok();
                }
                Some(b'\\') => {
                    self.bump();
                    self.peek()?;
                    self.bump();
                }
                Some(_) => self.bump(),
            }
        }
    }

    fn parse_number(&mut self) -> Parsed {
        let start = self.pos;
        while matches!(
            self.peek(),
            Some(c) if c.is_ascii_digit() || matches!(c, b'-' | b'+' | b'.' | b'e' | b'E')
        ) {
            self.bump();
        }
        // A number flush against the buffer edge may still be growing
        if self.at_end() {
            return Parsed::Incomplete;
        }
        let token = match std::str::from_utf8(&self.bytes[start..self.pos]) {
            Ok(token) => token,
            Err(_) => return Parsed::Incomplete,
        };
        match serde_json::from_str::<Value>(token) {
            Ok(value) => Parsed::Done(value),
            Err(_) => Parsed::Incomplete,
        }
    }

    fn parse_literal(&mut self) -> Parsed {
        let rest = &self.bytes[self.pos..];
        for (word, value) in [
            ("true", Value::Bool(true)),
            ("false", Value::Bool(false)),
            ("null", Value::Null),
        ] {
            if rest.starts_with(word.as_bytes()) {
                self.pos += word.len();
                return Parsed::Done(value);
            }
            // A strict prefix at the buffer edge is a literal still in flight
            if word.as_bytes().starts_with(rest) {
                self.pos = self.bytes.len();
                return Parsed::Incomplete;
            }
        }
        Parsed::Incomplete
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_complete_document_matches_strict_parse() {
        let text = r#"{"data": {"causes": [{"name": "a", "n": 1.5}, {"name": "b"}], "ok": true}}"#;
        let strict: Value = serde_json::from_str(text).unwrap();
        assert_eq!(parse_partial(text), Some(strict));
    }

    #[test]
    fn test_empty_and_preamble_only_input() {
        assert_eq!(parse_partial(""), None);
        assert_eq!(parse_partial("Sure, here is the JSON you asked for:"), None);
    }

    #[test]
    fn test_skips_markdown_fence() {
        let text = "```json\n{\"a\": 1}\n```";
        assert_eq!(parse_partial(text), Some(json!({"a": 1})));
    }

    #[test]
    fn test_truncated_string_value_is_omitted() {
        assert_eq!(
            parse_partial(r#"{"name": "Dehydra"#),
            Some(json!({}))
        );
        assert_eq!(
            parse_partial(r#"{"name": "Dehydration", "summary": "Low flu"#),
            Some(json!({"name": "Dehydration"}))
        );
    }

    #[test]
    fn test_truncated_escape_is_omitted() {
        assert_eq!(
            parse_partial(r#"{"name": "line\n second", "x": "a\"#),
            Some(json!({"name": "line\n second"}))
        );
        assert_eq!(parse_partial(r#"{"a": "\u00"#), Some(json!({})));
    }

    #[test]
    fn test_trailing_number_is_omitted() {
        assert_eq!(parse_partial(r#"{"a": 1, "b": 12"#), Some(json!({"a": 1})));
        // A closed number is kept
        assert_eq!(parse_partial(r#"{"a": 12}"#), Some(json!({"a": 12})));
        assert_eq!(parse_partial(r#"[1, 2, 3"#), Some(json!([1, 2])));
    }

    #[test]
    fn test_trailing_literal_prefix_is_omitted() {
        assert_eq!(parse_partial(r#"{"a": tru"#), Some(json!({})));
        assert_eq!(parse_partial(r#"{"a": true"#), Some(json!({"a": true})));
        assert_eq!(parse_partial(r#"[null, nul"#), Some(json!([null])));
    }

    #[test]
    fn test_nested_partial_containers_are_kept() {
        let text = r#"{"data": {"causes": [{"name": "a", "summary": "done"}, {"name": "b", "summ"#;
        assert_eq!(
            parse_partial(text),
            Some(json!({
                "data": {"causes": [{"name": "a", "summary": "done"}, {"name": "b"}]}
            }))
        );
    }

    #[test]
    fn test_key_without_value_is_omitted() {
        assert_eq!(parse_partial(r#"{"a": 1, "b""#), Some(json!({"a": 1})));
        assert_eq!(parse_partial(r#"{"a": 1, "b":"#), Some(json!({"a": 1})));
    }

    #[test]
    fn test_idempotent() {
        let text = r#"{"data": {"causes": [{"name": "a"}, {"name": "b", "x": [1, 2"#;
        assert_eq!(parse_partial(text), parse_partial(text));
    }

    #[test]
    fn test_every_truncation_point_is_safe() {
        let text = r#"{"data": {"potential_causes": [
            {"name": "Dehydration", "summary": "Fluid intake has been too low é", "severity": 2},
            {"name": "Fatigue", "summary": "Sleep debt accumulating...", "flag": true}
        ], "notes": null}}"#;
        let full: Value = serde_json::from_str(text).unwrap();
        for end in (0..=text.len()).filter(|&i| text.is_char_boundary(i)) {
            let snapshot = parse_partial(&text[..end]);
            if end == text.len() {
                assert_eq!(snapshot, Some(full.clone()));
            }
            // Any recovered snapshot must be a plain object or array root
            if let Some(value) = snapshot {
                assert!(value.is_object() || value.is_array());
            }
        }
    }
}
