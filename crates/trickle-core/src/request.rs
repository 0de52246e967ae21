//! Request types driving one exchange

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Whether completeness filtering applies to the stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeliveryMode {
    /// Parse the buffer and deliver detected-complete array elements
    #[default]
    Structured,
    /// Bypass detection and forward chunks verbatim, for free-text display
    RawText,
}

/// One structured-data request, the unit bound to a single exchange
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamRequest {
    /// Selects the completeness rule to validate elements against
    #[serde(rename = "itemType")]
    pub item_type: String,
    /// Dotted path of the target array in the eventual document
    #[serde(rename = "arrayPath")]
    pub array_path: String,
    /// Opaque payload forwarded to the generation source
    pub input: Value,
    /// Delivery mode, structured unless stated otherwise
    #[serde(default)]
    pub mode: DeliveryMode,
}

impl StreamRequest {
    /// A structured request for one item type
    pub fn structured(
        item_type: impl Into<String>,
        array_path: impl Into<String>,
        input: Value,
    ) -> Self {
        Self {
            item_type: item_type.into(),
            array_path: array_path.into(),
            input,
            mode: DeliveryMode::Structured,
        }
    }

    /// A raw-text request; item type and array path are not consulted
    pub fn raw_text(input: Value) -> Self {
        Self {
            item_type: "raw".to_owned(),
            array_path: "text".to_owned(),
            input,
            mode: DeliveryMode::RawText,
        }
    }
}
