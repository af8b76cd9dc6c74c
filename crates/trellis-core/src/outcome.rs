//! Fire-and-log outcome for best-effort external calls
//!
//! Some collaborator calls must never block a local state transition:
//! escrow cancellation during pool cancellation, escrow status lookups
//! during bulk stream actions. Those call sites produce a [`BestEffort`]
//! instead of propagating an error, hand it to [`BestEffort::log`], and
//! proceed unconditionally. Local state stays the source of truth.

/// Outcome of a best-effort external call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BestEffort {
    /// The call completed
    Completed,
    /// The call failed; the failure is recoverable out-of-band
    Failed {
        /// Collaborator-reported cause
        reason: String,
    },
}

impl BestEffort {
    /// Create a failed outcome
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }

    /// Whether the call failed
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Emit the outcome to the log; failures are warnings, never errors,
    /// since the caller's transition proceeds either way
    pub fn log(&self, context: &str) {
        match self {
            Self::Completed => tracing::debug!(context, "best-effort call completed"),
            Self::Failed { reason } => {
                tracing::warn!(context, %reason, "best-effort call failed, continuing")
            }
        }
    }
}

impl<E: std::fmt::Display> From<std::result::Result<(), E>> for BestEffort {
    fn from(res: std::result::Result<(), E>) -> Self {
        match res {
            Ok(()) => Self::Completed,
            Err(err) => Self::failed(err.to_string()),
        }
    }
}
