//! # Trickle Client
//!
//! Consumer side of progressive structured-data streaming: turns the event
//! stream back into a live, growing list plus a final authoritative result,
//! and supervises the exchange for liveness with timeout, bounded retry, and
//! cooperative cancellation.

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod consumer;
pub mod policy;
pub mod source;

pub use consumer::Reconstructor;
pub use policy::{CancelHandle, Exchange, ExchangeState, PolicyConfig, TaskComplexity};
pub use source::{EventSource, HttpEventSource};

/// Re-export commonly used types
pub mod prelude {
    pub use super::{
        CancelHandle, EventSource, Exchange, ExchangeState, HttpEventSource, PolicyConfig,
        Reconstructor, TaskComplexity,
    };
    pub use trickle_core::prelude::*;
}
