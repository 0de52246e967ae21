//! Completeness rules and the per-item-type schema registry
//!
//! A [`CompletenessRule`] defines what "done" means for one item type: which
//! fields must be present, minimum lengths for string fields, and which extra
//! fields pass through when present. The [`SchemaRegistry`] is an explicitly
//! constructed, immutable lookup handed to the producer at startup - there is
//! no ambient global registry.

use std::collections::{BTreeMap, HashMap};

use crate::{Error, Result};

/// Per-item-type rules for deciding when an array element is ready to deliver
#[derive(Debug, Clone)]
pub struct CompletenessRule {
    display_name: String,
    identity_field: String,
    required_fields: Vec<String>,
    min_lengths: BTreeMap<String, usize>,
    optional_fields: Vec<String>,
}

impl CompletenessRule {
    /// Create a rule. The identity field is implicitly required.
    pub fn new(display_name: impl Into<String>, identity_field: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            identity_field: identity_field.into(),
            required_fields: Vec::new(),
            min_lengths: BTreeMap::new(),
            optional_fields: Vec::new(),
        }
    }

    /// Mark a field as required (present and non-empty after trimming)
    pub fn require(mut self, field: impl Into<String>) -> Self {
        self.required_fields.push(field.into());
        self
    }

    /// Set a minimum trimmed character count for a string field
    pub fn min_length(mut self, field: impl Into<String>, min: usize) -> Self {
        self.min_lengths.insert(field.into(), min);
        self
    }

    /// Mark a field as optional pass-through
    pub fn optional(mut self, field: impl Into<String>) -> Self {
        self.optional_fields.push(field.into());
        self
    }

    /// Human-readable name for this item type
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// The field whose value identifies an element for deduplication
    pub fn identity_field(&self) -> &str {
        &self.identity_field
    }

    /// Required fields, identity field first
    pub fn required_fields(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.identity_field.as_str())
            .chain(self.required_fields.iter().map(String::as_str))
    }

    /// Configured minimum lengths
    pub fn min_lengths(&self) -> impl Iterator<Item = (&str, usize)> {
        self.min_lengths.iter().map(|(field, min)| (field.as_str(), *min))
    }

    /// Fields inspected for truncation markers: required plus min-length ones
    pub fn checked_fields(&self) -> impl Iterator<Item = &str> {
        self.required_fields()
            .chain(self.min_lengths.keys().map(String::as_str))
    }

    /// Whether a field belongs to this rule (identity, required, or optional)
    pub fn is_known_field(&self, field: &str) -> bool {
        field == self.identity_field
            || self.required_fields.iter().any(|f| f == field)
            || self.optional_fields.iter().any(|f| f == field)
    }
}

/// Immutable lookup of completeness rules keyed by item-type name
///
/// Built once at process start and shared read-only with every producer loop.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    rules: HashMap<String, CompletenessRule>,
}

impl SchemaRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a rule under an item-type name, replacing any previous rule
    pub fn register(mut self, item_type: impl Into<String>, rule: CompletenessRule) -> Self {
        self.rules.insert(item_type.into(), rule);
        self
    }

    /// Look up the rule for an item type
    pub fn rule(&self, item_type: &str) -> Result<&CompletenessRule> {
        self.rules
            .get(item_type)
            .ok_or_else(|| Error::UnknownItemType(item_type.to_owned()))
    }

    /// Number of registered item types
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the registry has no rules
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
