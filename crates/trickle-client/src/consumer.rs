//! Consumer-side reconstruction of a progressively delivered result
//!
//! The reconstructor folds stream events into observable state: a live,
//! monotonically-growing item list for progressive rendering, and the
//! authoritative final document once the stream completes. The payload
//! transform belongs to the caller; this type never interprets item fields
//! itself.

use serde_json::{Map, Value};

use trickle_core::StreamEvent;

/// Accumulates one exchange's events into caller-observable state
///
/// `T` is the caller's item type, produced by the transform from each
/// delivered payload. Transforms returning `None` skip the payload.
pub struct Reconstructor<T, F>
where
    F: Fn(&Map<String, Value>) -> Option<T>,
{
    transform: F,
    partial_items: Vec<T>,
    is_active: bool,
    is_done: bool,
    final_result: Option<Value>,
    last_error: Option<String>,
}

impl<T, F> Reconstructor<T, F>
where
    F: Fn(&Map<String, Value>) -> Option<T>,
{
    /// Create an idle reconstructor with the caller's payload transform
    pub fn new(transform: F) -> Self {
        Self {
            transform,
            partial_items: Vec::new(),
            is_active: false,
            is_done: false,
            final_result: None,
            last_error: None,
        }
    }

    /// Start a fresh exchange. Items from any previous exchange are
    /// discarded so a retry can never show duplicate or out-of-order items.
    pub fn begin(&mut self) {
        self.partial_items.clear();
        self.final_result = None;
        self.last_error = None;
        self.is_done = false;
        self.is_active = true;
    }

    /// Fold one event into the state. Events arriving while inactive
    /// (after cancellation or a terminal event) are discarded.
    pub fn apply(&mut self, event: StreamEvent) {
        if !self.is_active {
            return;
        }
        match event {
            StreamEvent::Item { data, .. } => {
                if let Some(item) = (self.transform)(&data) {
                    self.partial_items.push(item);
                }
            }
            StreamEvent::Complete { data, .. } => {
                self.final_result = Some(data);
                self.is_done = true;
                self.is_active = false;
            }
            StreamEvent::Error { message, .. } => {
                // Partial progress stays visible; only the flags change
                self.last_error = Some(message);
                self.is_active = false;
            }
        }
    }

    /// Record a failure that happened below the event layer (transport,
    /// timeout, retries exhausted). Partial items are kept.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.last_error = Some(message.into());
        self.is_active = false;
    }

    /// Stop observing without recording an error, used on cancellation
    pub fn halt(&mut self) {
        self.is_active = false;
    }

    /// Clear all state back to initial, ready for a fresh exchange
    pub fn reset(&mut self) {
        self.partial_items.clear();
        self.final_result = None;
        self.last_error = None;
        self.is_done = false;
        self.is_active = false;
    }

    /// The live, ordered view of items delivered so far
    pub fn partial_items(&self) -> &[T] {
        &self.partial_items
    }

    /// The authoritative final document, set once on completion
    pub fn final_result(&self) -> Option<&Value> {
        self.final_result.as_ref()
    }

    /// Whether an exchange is currently in flight
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Whether the exchange completed successfully
    pub fn is_done(&self) -> bool {
        self.is_done
    }

    /// The last recorded failure, if any
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}
