//! # Trickle Server
//!
//! Producer side of progressive structured-data streaming: the loop that
//! accumulates model output, runs the parse/detect/track cycle, and pushes
//! typed events to the client over a newline-delimited HTTP response.

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod http;
pub mod producer;
pub mod source;

pub use http::{AppState, router};
pub use producer::{ProducerConfig, ProducerLoop};
pub use source::{GenerationSource, ScriptedSource};

/// Re-export commonly used types
pub mod prelude {
    pub use super::{AppState, GenerationSource, ProducerConfig, ProducerLoop, router};
    pub use trickle_core::prelude::*;
}
