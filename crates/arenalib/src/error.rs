//! Error types.

use thiserror::Error;

/// Invalid environment configuration.
///
/// Configuration is validated once when an environment is constructed.
/// Per-tick inputs are deliberately not validated beyond dimensionality:
/// out-of-range action components scale deltas proportionally instead of
/// being clamped or rejected.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// A parameter that must be strictly positive was zero or negative.
    #[error("`{name}` must be positive, got {value}")]
    NonPositive { name: &'static str, value: f32 },

    /// An entity count that must be non-zero was zero.
    #[error("`{name}` must be at least 1")]
    ZeroCount { name: &'static str },

    /// Spawn padding leaves no valid spawn area.
    #[error("padding {padding} leaves no spawn area in a half-size {half_size} arena")]
    PaddingTooLarge { padding: f32, half_size: f32 },
}
