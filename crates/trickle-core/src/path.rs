//! Typed dotted-path resolution into JSON documents
//!
//! Array paths arrive as dotted strings (`"data.potential_causes"`). Parsing
//! them once into an explicit key list keeps the contract type-checked instead
//! of re-splitting strings at every lookup site.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;
use smallvec::SmallVec;

use crate::{Error, Result};

/// An ordered list of object keys addressing a location in a JSON document
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JsonPath {
    segments: SmallVec<[String; 4]>,
}

impl JsonPath {
    /// Parse a dotted path string. Empty paths and empty segments are rejected.
    pub fn parse(path: &str) -> Result<Self> {
        if path.is_empty() {
            return Err(Error::invalid_path(path, "path is empty"));
        }
        let mut segments = SmallVec::new();
        for segment in path.split('.') {
            if segment.is_empty() {
                return Err(Error::invalid_path(path, "empty segment"));
            }
            segments.push(segment.to_owned());
        }
        Ok(Self { segments })
    }

    /// Path segments in resolution order
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Walk nested objects from `root`, returning the addressed value if the
    /// whole path exists
    pub fn resolve<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        let mut current = root;
        for segment in &self.segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

impl FromStr for JsonPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_and_display() {
        let path = JsonPath::parse("data.potential_causes").unwrap();
        assert_eq!(path.segments(), ["data", "potential_causes"]);
        assert_eq!(path.to_string(), "data.potential_causes");
    }

    #[test]
    fn test_rejects_empty_path_and_segments() {
        assert!(JsonPath::parse("").is_err());
        assert!(JsonPath::parse("data..causes").is_err());
        assert!(JsonPath::parse(".data").is_err());
    }

    #[test]
    fn test_resolve_nested() {
        let doc = json!({"data": {"potential_causes": [1, 2, 3]}});
        let path = JsonPath::parse("data.potential_causes").unwrap();
        assert_eq!(path.resolve(&doc), Some(&json!([1, 2, 3])));
    }

    #[test]
    fn test_resolve_missing_returns_none() {
        let doc = json!({"data": {}});
        let path = JsonPath::parse("data.potential_causes").unwrap();
        assert_eq!(path.resolve(&doc), None);

        // Intermediate segment that is not an object
        let doc = json!({"data": 42});
        assert_eq!(path.resolve(&doc), None);
    }
}
