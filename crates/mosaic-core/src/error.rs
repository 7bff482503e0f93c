//! Error types for the `mosaic-core` crate.
//!
//! Empty populations, empty seed pools, and zero denominators are valid model
//! states and never produce an error. Errors are reserved for caller contract
//! violations (invalid configuration) and counts that would overflow.

use crate::config::ConfigError;

/// Errors that can occur while constructing or running the model engines.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// The configuration failed validation.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },

    /// A count exceeded `u32::MAX` during a checked operation.
    #[error("arithmetic overflow in {context}")]
    ArithmeticOverflow {
        /// The operation that overflowed.
        context: &'static str,
    },
}
