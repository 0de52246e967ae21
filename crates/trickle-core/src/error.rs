//! Error types for trickle operations

/// Result type alias for trickle operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for trickle operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// No completeness rule registered for the requested item type
    #[error("Unknown item type: {0}")]
    UnknownItemType(String),

    /// Malformed dotted array path in a request
    #[error("Invalid array path '{path}': {message}")]
    InvalidPath {
        /// The offending path string
        path: String,
        /// Error description
        message: String,
    },

    /// The upstream generation source failed mid-stream
    #[error("Generation source failed: {0}")]
    Source(String),

    /// Transport-level failure (connection drop, bad response, decode miss)
    #[error("Transport error: {0}")]
    Transport(String),

    /// The producer reported a terminal error event
    #[error("Stream error: {0}")]
    Stream(String),

    /// An event record could not be encoded or decoded
    #[error("Invalid event record: {0}")]
    InvalidEvent(String),

    /// The final buffer yielded no usable document at exhaustion
    #[error("No usable document in final buffer")]
    UnusableDocument,

    /// No event arrived within the configured window
    #[error("Timed out after {0}ms waiting for a stream event")]
    Timeout(u64),

    /// The exchange was cancelled by the caller
    #[error("Exchange cancelled")]
    Cancelled,

    /// All retry attempts were consumed without a completed exchange
    #[error("Retries exhausted after {attempts} attempts: {last}")]
    RetriesExhausted {
        /// Total attempts performed, including the first
        attempts: u32,
        /// Description of the last failure
        last: String,
    },
}

impl Error {
    /// Create an invalid path error
    pub fn invalid_path(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a generation source error
    pub fn source(message: impl Into<String>) -> Self {
        Self::Source(message.into())
    }

    /// Create a transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Create a stream error
    pub fn stream(message: impl Into<String>) -> Self {
        Self::Stream(message.into())
    }

    /// Create an invalid event error
    pub fn invalid_event(message: impl Into<String>) -> Self {
        Self::InvalidEvent(message.into())
    }

    /// Whether the error is eligible for automatic retry
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Source(_)
                | Self::Transport(_)
                | Self::Stream(_)
                | Self::Timeout(_)
                | Self::UnusableDocument
        )
    }
}
