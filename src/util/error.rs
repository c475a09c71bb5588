//! Error types for the motion sampler.

use thiserror::Error;

use super::Tick;

/// Main error type for sampling operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Sampling policy has out-of-range parameters
    #[error("Invalid sampling policy: {0}")]
    InvalidPolicy(String),

    /// Requested end time lies before the start time
    #[error("Invalid time range: end tick {end} is before start tick {start}")]
    InvalidTimeRange { start: Tick, end: Tick },

    /// First snapshot has no vertices
    #[error("Object '{object}' produced an empty mesh")]
    EmptyGeometry { object: String },

    /// No topologically consistent second sample could be found
    #[error(
        "Object '{object}' changes topology at every sampled time around tick {time}; \
         cannot compute velocity"
    )]
    TopologyInstability { object: String, time: Tick },

    /// Object not known to the snapshot source
    #[error("Object not found: {0}")]
    ObjectNotFound(String),

    /// Failure reported by a snapshot source
    #[error("Snapshot source failed: {0}")]
    Oracle(String),

    /// Invalid mesh or scene structure
    #[error("Invalid structure: {0}")]
    InvalidStructure(String),

    /// Channel length does not match its element count
    #[error("Channel '{name}' has {actual} elements, expected {expected}")]
    ChannelLength {
        name: String,
        expected: usize,
        actual: usize,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create an oracle error from a string.
    pub fn oracle(msg: impl Into<String>) -> Self {
        Self::Oracle(msg.into())
    }

    /// Create an invalid structure error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidStructure(msg.into())
    }

    /// True for errors caused by caller configuration rather than scene data.
    ///
    /// These are never retried; the caller has to fix the inputs.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::InvalidPolicy(_) | Self::InvalidTimeRange { .. })
    }
}

/// Result type alias for sampling operations.
pub type Result<T> = std::result::Result<T, Error>;
