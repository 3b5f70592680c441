//! Error taxonomy for the Lantern orchestration layer.
//!
//! One shared [`LanternError`] enum built on [`thiserror`] covers the five
//! failure domains the system distinguishes:
//!
//! - [`Validation`](LanternError::Validation): bad input — arguments, spans,
//!   names — with field-level detail
//! - [`NotFound`](LanternError::NotFound): a referenced entity is absent
//! - [`Conflict`](LanternError::Conflict): duplicate name, cycle, ordinal race
//! - [`Timeout`](LanternError::Timeout): a tool or agent exceeded its bound
//! - [`Upstream`](LanternError::Upstream): an external collaborator failed
//!
//! Validation and NotFound surface directly with actionable detail. Conflict
//! from a detected race is retried once internally before surfacing. Upstream
//! detail is logged with its correlation ID but never leaked verbatim to end
//! users.

use thiserror::Error;

/// Result alias for Lantern operations.
pub type Result<T, E = LanternError> = std::result::Result<T, E>;

/// Top-level error type for the orchestration and state layer.
#[derive(Debug, Error)]
pub enum LanternError {
    /// Bad input: arguments, spans, names.
    #[error("validation failed for {field}: {detail}")]
    Validation {
        /// Offending field or path (e.g. `"arguments.query"`, `"span"`).
        field: String,
        /// Actionable detail.
        detail: String,
    },

    /// A referenced entity is absent.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind (e.g. `"chat"`, `"message"`, `"tool"`).
        entity: String,
        /// The identifier that failed to resolve.
        id: String,
    },

    /// Duplicate name, detected cycle, or ordinal race.
    #[error("conflict: {detail}")]
    Conflict {
        /// What collided.
        detail: String,
    },

    /// A tool or agent exceeded its time bound.
    #[error("{what} timed out after {elapsed_ms}ms")]
    Timeout {
        /// What was being awaited.
        what: String,
        /// Elapsed time when the bound was hit.
        elapsed_ms: u64,
    },

    /// An external collaborator (tool execution, text generation) failed.
    #[error("upstream failure: {detail}")]
    Upstream {
        /// Internal detail — logged, never surfaced verbatim.
        detail: String,
        /// Correlation ID of the request that failed, if known.
        correlation_id: Option<String>,
    },
}

impl LanternError {
    /// Create a validation error.
    #[must_use]
    pub fn validation(field: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            detail: detail.into(),
        }
    }

    /// Create a not-found error.
    #[must_use]
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Create a conflict error.
    #[must_use]
    pub fn conflict(detail: impl Into<String>) -> Self {
        Self::Conflict {
            detail: detail.into(),
        }
    }

    /// Create a timeout error.
    #[must_use]
    pub fn timeout(what: impl Into<String>, elapsed_ms: u64) -> Self {
        Self::Timeout {
            what: what.into(),
            elapsed_ms,
        }
    }

    /// Create an upstream error without correlation context.
    #[must_use]
    pub fn upstream(detail: impl Into<String>) -> Self {
        Self::Upstream {
            detail: detail.into(),
            correlation_id: None,
        }
    }

    /// Create an upstream error tagged with its correlation ID.
    #[must_use]
    pub fn upstream_with_correlation(
        detail: impl Into<String>,
        correlation_id: impl Into<String>,
    ) -> Self {
        Self::Upstream {
            detail: detail.into(),
            correlation_id: Some(correlation_id.into()),
        }
    }

    /// Whether this error is a conflict (candidate for one internal retry).
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Stable machine-readable code for transport surfaces.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Conflict { .. } => "CONFLICT",
            Self::Timeout { .. } => "TIMEOUT",
            Self::Upstream { .. } => "UPSTREAM_ERROR",
        }
    }

    /// Message safe to show an end user.
    ///
    /// Validation, not-found, conflict, and timeout messages are actionable
    /// and surface as-is; upstream detail is replaced with a generic message.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Upstream { .. } => "an upstream dependency failed".to_owned(),
            other => other.to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn validation_display_includes_field_and_detail() {
        let err = LanternError::validation("arguments.query", "expected string, got number");
        let text = err.to_string();
        assert!(text.contains("arguments.query"));
        assert!(text.contains("expected string"));
    }

    #[test]
    fn not_found_display() {
        let err = LanternError::not_found("chat", "chat-1");
        assert_eq!(err.to_string(), "chat not found: chat-1");
    }

    #[test]
    fn conflict_is_conflict() {
        let err = LanternError::conflict("branch name \"Alt\" already exists");
        assert!(err.is_conflict());
        assert!(!LanternError::not_found("x", "y").is_conflict());
    }

    #[test]
    fn timeout_display() {
        let err = LanternError::timeout("tool trend-predict", 10_000);
        assert_eq!(err.to_string(), "tool trend-predict timed out after 10000ms");
    }

    #[test]
    fn upstream_with_correlation() {
        let err = LanternError::upstream_with_correlation("generator returned 503", "corr-9");
        assert_matches!(
            err,
            LanternError::Upstream { correlation_id: Some(ref c), .. } if c == "corr-9"
        );
    }

    #[test]
    fn codes_are_stable() {
        assert_eq!(LanternError::validation("f", "d").code(), "VALIDATION_ERROR");
        assert_eq!(LanternError::not_found("e", "i").code(), "NOT_FOUND");
        assert_eq!(LanternError::conflict("d").code(), "CONFLICT");
        assert_eq!(LanternError::timeout("w", 1).code(), "TIMEOUT");
        assert_eq!(LanternError::upstream("d").code(), "UPSTREAM_ERROR");
    }

    #[test]
    fn upstream_detail_never_leaks_in_public_message() {
        let err = LanternError::upstream("connection to 10.0.0.3:5432 refused");
        assert!(!err.public_message().contains("10.0.0.3"));
    }

    #[test]
    fn public_message_keeps_actionable_detail() {
        let err = LanternError::validation("name", "may not be empty");
        assert!(err.public_message().contains("may not be empty"));
    }

    #[test]
    fn lantern_error_is_std_error() {
        let err = LanternError::conflict("x");
        let _: &dyn std::error::Error = &err;
    }
}
