//! Unified error system for the trellis engine
//!
//! One error enum covers the whole taxonomy: validation, missing entities,
//! state-machine guard violations, authenticator outcomes, collaborator
//! failures, and storage faults. Partial failure is deliberately NOT an
//! error here; batch operations report itemized outcomes as data.

use serde::{Deserialize, Serialize};

/// Unified error type for trellis operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum TrellisError {
    /// Missing or malformed input, rejected before any side effect
    #[error("validation failed: {message}")]
    Validation {
        /// What was malformed
        message: String,
    },

    /// Referenced pool, rule, membership, or claim does not exist
    #[error("not found: {message}")]
    NotFound {
        /// What was looked up
        message: String,
    },

    /// A state-machine guard rejected the transition
    #[error("precondition failed: {message}")]
    Precondition {
        /// Which guard fired
        message: String,
    },

    /// Command issuer is not the configured administrator
    #[error("forbidden: {message}")]
    Forbidden {
        /// Who was rejected
        message: String,
    },

    /// Command signature did not verify
    #[error("bad signature: {message}")]
    BadSignature {
        /// Why verification failed
        message: String,
    },

    /// Command timestamp fell outside the freshness window
    #[error("expired: {message}")]
    Expired {
        /// Observed staleness
        message: String,
    },

    /// A collaborator call (holder index, escrow, ledger) failed
    #[error("external collaborator error: {message}")]
    External {
        /// Collaborator and cause
        message: String,
    },

    /// The persistent store failed
    #[error("storage error: {message}")]
    Storage {
        /// Cause
        message: String,
    },

    /// Internal invariant violation
    #[error("internal error: {message}")]
    Internal {
        /// Cause
        message: String,
    },
}

impl TrellisError {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a not-found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create a precondition-failed error
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition {
            message: message.into(),
        }
    }

    /// Create a forbidden error
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    /// Create a bad-signature error
    pub fn bad_signature(message: impl Into<String>) -> Self {
        Self::BadSignature {
            message: message.into(),
        }
    }

    /// Create an expired-command error
    pub fn expired(message: impl Into<String>) -> Self {
        Self::Expired {
            message: message.into(),
        }
    }

    /// Create an external-collaborator error
    pub fn external(message: impl Into<String>) -> Self {
        Self::External {
            message: message.into(),
        }
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Stable error code surfaced to callers alongside the human-readable
    /// message; transports map these 1:1 onto their own status vocabulary.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::NotFound { .. } => "not_found",
            Self::Precondition { .. } => "precondition_failed",
            Self::Forbidden { .. } => "forbidden",
            Self::BadSignature { .. } => "bad_signature",
            Self::Expired { .. } => "expired",
            Self::External { .. } => "external",
            Self::Storage { .. } => "storage",
            Self::Internal { .. } => "internal",
        }
    }
}

/// Standard Result type for trellis operations
pub type Result<T> = std::result::Result<T, TrellisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_and_display() {
        let err = TrellisError::precondition("pool is locked");
        assert!(matches!(err, TrellisError::Precondition { .. }));
        assert_eq!(err.to_string(), "precondition failed: pool is locked");
    }

    #[test]
    fn codes_are_stable() {
        assert_eq!(TrellisError::validation("x").code(), "validation");
        assert_eq!(TrellisError::expired("x").code(), "expired");
        assert_eq!(
            TrellisError::precondition("x").code(),
            "precondition_failed"
        );
    }
}
