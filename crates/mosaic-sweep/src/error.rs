//! Error types for the sweep binary.
//!
//! [`SweepError`] is the top-level error type that wraps all possible
//! failure modes during configuration, simulation, and output writing.

use mosaic_core::{ConfigError, ModelError};

/// Top-level error for the sweep binary.
#[derive(Debug, thiserror::Error)]
pub enum SweepError {
    /// Configuration loading or validation failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },

    /// A model engine rejected its input.
    #[error("model error: {source}")]
    Model {
        /// The underlying model error.
        #[from]
        source: ModelError,
    },

    /// An environment override could not be parsed.
    #[error("invalid {name}: {reason}")]
    Env {
        /// The environment variable name.
        name: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// Writing an output file failed.
    #[error("I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Serializing the run manifest failed.
    #[error("serde error: {source}")]
    Serde {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },

    /// A worker or writer task panicked or was cancelled.
    #[error("task failed: {source}")]
    Join {
        /// The underlying join error.
        #[from]
        source: tokio::task::JoinError,
    },

    /// A result channel closed before every parameter set was delivered.
    #[error("{channel} channel closed early")]
    ChannelClosed {
        /// Which channel closed.
        channel: &'static str,
    },
}
