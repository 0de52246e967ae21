//! # Trickle Core
//!
//! Core types for progressive delivery of AI-generated structured data.
//!
//! A generating model emits an unstructured token stream that is, semantically,
//! one large JSON document being built up incrementally. This crate provides
//! the pieces that turn that stream into individually deliverable array
//! elements: a tolerant parser that extracts the best available snapshot from
//! a truncated buffer, a completeness detector that decides which elements are
//! safe to show, an emission tracker that guarantees exactly-once in-order
//! delivery, and the newline-delimited event format both ends speak.

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod detect;
pub mod emit;
pub mod error;
pub mod event;
pub mod partial;
pub mod path;
pub mod request;
pub mod schema;

pub use detect::{CompleteItem, scan_complete};
pub use emit::{DeliveryRecord, EmissionState};
pub use error::{Error, Result};
pub use event::{StreamEvent, StreamStats};
pub use partial::parse_partial;
pub use path::JsonPath;
pub use request::{DeliveryMode, StreamRequest};
pub use schema::{CompletenessRule, SchemaRegistry};

/// Re-export commonly used types
pub mod prelude {
    pub use super::{
        CompletenessRule, DeliveryMode, DeliveryRecord, EmissionState, Error, JsonPath, Result,
        SchemaRegistry, StreamEvent, StreamRequest, StreamStats,
    };
}
