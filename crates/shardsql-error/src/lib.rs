//! Error types shared across the shardsql planner core.
//!
//! Modeled after the upstream engine's error codes with Rust-idiomatic
//! structure: one variant per failure class, message text matching the
//! wording a client would see.

use thiserror::Error;

/// Convenience alias used throughout the planner core.
pub type ShardResult<T> = Result<T, ShardError>;

/// Primary error type for planner-core operations.
///
/// The index-condition path never catches or rewraps these: an error
/// raised by a collaborator (expression evaluation, subquery execution,
/// value coercion) propagates to the query boundary unchanged.
#[derive(Error, Debug)]
pub enum ShardError {
    // === Value coercion ===
    /// A value of one kind was handed to a slot that cannot accept it.
    ///
    /// Raised by column coercion when no conversion between the two
    /// kinds exists (e.g. BYTES into DATE). Programmer error surfaced
    /// at the boundary, never recovered internally.
    #[error("invalid value class: expected {expected}, got {actual}")]
    InvalidValueClass {
        expected: &'static str,
        actual: &'static str,
    },

    /// A numeric value does not fit the target type.
    #[error("numeric value out of range: {value} does not fit {target}")]
    ValueOutOfRange { value: String, target: &'static str },

    /// A value's text form could not be parsed as the target type.
    #[error("data conversion error converting {value} to {target}")]
    DataConversion { value: String, target: &'static str },

    // === Expression evaluation ===
    /// A bind parameter was evaluated before a value was set.
    #[error("parameter ?{index} is not set")]
    UnboundParameter { index: usize },

    /// Failure inside an expression or subquery collaborator.
    #[error("expression evaluation failed: {detail}")]
    Evaluation { detail: String },

    // === Session ===
    /// The session's cancel flag was observed set.
    #[error("statement was cancelled")]
    QueryCancelled,

    // === Bugs ===
    /// Invariant violation inside the planner; fatal to the query.
    #[error("internal error: {detail}")]
    Internal { detail: String },
}

impl ShardError {
    /// Build an [`ShardError::Internal`] from any displayable detail.
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::Internal {
            detail: detail.into(),
        }
    }

    /// Build an [`ShardError::Evaluation`] from any displayable detail.
    pub fn evaluation(detail: impl Into<String>) -> Self {
        Self::Evaluation {
            detail: detail.into(),
        }
    }
}
