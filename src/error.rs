//! Error types for the ludics engine.
//!
//! All hard failures are strongly typed using thiserror. Legality,
//! propagation, orthogonality and correspondence outcomes are *not* errors:
//! they are structured results returned on the `Ok` path regardless of
//! pass/fail, so callers can render negative outcomes without special-casing
//! exceptions. Only validation, missing references, unrecovered write races
//! and internal faults surface as `Err`.

use thiserror::Error;

use crate::design::DesignId;
use crate::locus::LocusPath;

/// Validation errors that occur while constructing or checking inputs.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Locus path '{path}' is malformed: {reason}")]
    MalformedLocusPath { path: String, reason: String },

    #[error("Child suffix must be a positive integer")]
    ZeroChildSuffix,

    #[error("Act at position {index} breaks polarity alternation (expected {expected}, got {actual})")]
    PolarityBreak {
        index: usize,
        expected: String,
        actual: String,
    },

    #[error("Act at position {index} has justifier {justifier} which does not precede it")]
    JustifierOutOfRange { index: usize, justifier: usize },

    #[error("Non-initial act at position {index} has no justifier")]
    MissingJustifier { index: usize },

    #[error("Design is closed by a daimon; no further acts may be appended")]
    DesignClosed,

    #[error("Design has no acts")]
    EmptyDesign,

    #[error("Additive pick at '{parent}' conflicts with recorded choice (recorded {recorded}, requested {requested})")]
    ConflictingAdditivePick {
        parent: LocusPath,
        recorded: u32,
        requested: u32,
    },

    #[error("Additive pick suffix {suffix} is not an open branch at '{parent}'")]
    AdditivePickNotABranch { parent: LocusPath, suffix: u32 },

    #[error("No additive choice is pending for the dispute between {pos} and {neg}")]
    NoPendingAdditiveChoice { pos: DesignId, neg: DesignId },

    #[error("Designs {pos} and {neg} have the same polarity; a dispute needs one of each")]
    SamePolarityPair { pos: DesignId, neg: DesignId },

    #[error("Arena is empty; at least the root locus is required")]
    EmptyArena,

    #[error("Move list is empty; compilation needs at least one canonical move")]
    EmptyMoveList,
}

/// Top-level error type for engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Race conflict: {context} was superseded mid-operation and the retry also failed")]
    RaceConflict { context: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl EngineError {
    /// Creates a not-found error for a design reference.
    #[must_use]
    pub fn design_not_found(id: DesignId) -> Self {
        Self::NotFound {
            kind: "Design",
            id: id.to_string(),
        }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is a not-found error.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true if the operation may succeed on retry.
    ///
    /// Race conflicts have already been retried once internally by the time
    /// they surface; the caller may still re-issue the whole operation.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::RaceConflict { .. })
    }
}

/// Result type alias for engine operations.
pub type LudicsResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_path_display() {
        let err = ValidationError::MalformedLocusPath {
            path: "0.x".to_string(),
            reason: "invalid digit".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("0.x"));
        assert!(msg.contains("invalid digit"));
    }

    #[test]
    fn test_engine_error_from_validation() {
        let err: EngineError = ValidationError::EmptyArena.into();
        assert!(err.is_validation());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_not_found_display() {
        let id = DesignId::new();
        let err = EngineError::design_not_found(id);
        assert!(err.is_not_found());
        assert!(format!("{err}").contains("Design not found"));
    }

    #[test]
    fn test_race_conflict_is_retryable() {
        let err = EngineError::RaceConflict {
            context: "trace".to_string(),
        };
        assert!(err.is_retryable());
        assert!(!err.is_validation());
    }
}
