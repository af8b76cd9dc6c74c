//! Trellis Authentication
//!
//! Verification of signed, time-bounded admin commands. Privileged bulk
//! operations (pause-all, resume-all, emergency-stop) only act on an
//! envelope that passes all three checks, in order:
//!
//! 1. the issuing wallet IS the configured administrator (`Forbidden`),
//! 2. the ed25519 signature covers the command's canonical JSON bytes
//!    (`BadSignature`),
//! 3. the embedded timestamp is within the freshness window of the
//!    verification time (`Expired`) — replay protection.
//!
//! Each failure carries its specific error so callers can tell a
//! retryable staleness from a hard denial. Verification is stateless and
//! takes the verification time as an argument; envelopes are consumed
//! once and never persisted.

#![forbid(unsafe_code)]

use chrono::{DateTime, Duration, Utc};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};

use trellis_core::types::WalletId;
use trellis_core::{EngineConfig, Result, TrellisError};

/// Privileged bulk action requested of the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminAction {
    /// Pause every active pool
    PauseAll,
    /// Resume every paused pool
    ResumeAll,
    /// Cancel every non-cancelled pool
    EmergencyStop,
}

impl std::fmt::Display for AdminAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::PauseAll => "pause_all",
            Self::ResumeAll => "resume_all",
            Self::EmergencyStop => "emergency_stop",
        };
        f.write_str(name)
    }
}

/// The signed message payload: an action plus its issuance time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminCommand {
    /// Requested action
    pub action: AdminAction,
    /// Issuance time embedded by the signer
    pub issued_at: DateTime<Utc>,
}

impl AdminCommand {
    /// Create a command stamped with the given issuance time
    pub fn new(action: AdminAction, issued_at: DateTime<Utc>) -> Self {
        Self { action, issued_at }
    }

    /// Canonical byte encoding covered by the signature.
    ///
    /// Both signer and verifier derive the bytes from this one function;
    /// field order is the struct order, so the encoding is stable.
    pub fn signing_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| TrellisError::internal(format!("command encode: {e}")))
    }
}

/// A command as received from the operator channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminCommandEnvelope {
    /// Issuing wallet identity (hex-encoded verifying key)
    pub wallet: WalletId,
    /// Hex-encoded 64-byte ed25519 signature over the command bytes
    pub signature: String,
    /// The signed payload
    pub command: AdminCommand,
}

/// Stateless verifier for admin command envelopes
#[derive(Debug, Clone)]
pub struct Authenticator {
    admin_wallet: WalletId,
    admin_key: VerifyingKey,
    freshness: Duration,
}

impl Authenticator {
    /// Build from a validated engine config
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        Ok(Self::new(config.admin_key()?, config.command_freshness_secs))
    }

    /// Build from a verifying key directly; the admin wallet identity is
    /// the hex encoding of the key
    pub fn new(admin_key: VerifyingKey, freshness_secs: i64) -> Self {
        Self {
            admin_wallet: WalletId::new(hex::encode(admin_key.to_bytes())),
            admin_key,
            freshness: Duration::seconds(freshness_secs),
        }
    }

    /// The administrator identity this verifier accepts
    pub fn admin_wallet(&self) -> &WalletId {
        &self.admin_wallet
    }

    /// Verify an envelope at `now`, yielding the authenticated action
    pub fn verify(
        &self,
        envelope: &AdminCommandEnvelope,
        now: DateTime<Utc>,
    ) -> Result<AdminAction> {
        if envelope.wallet != self.admin_wallet {
            return Err(TrellisError::forbidden(format!(
                "wallet {} is not the administrator",
                envelope.wallet
            )));
        }

        let sig_bytes = hex::decode(&envelope.signature)
            .map_err(|e| TrellisError::bad_signature(format!("signature hex: {e}")))?;
        let sig_arr: [u8; 64] = sig_bytes
            .try_into()
            .map_err(|_| TrellisError::bad_signature("signature must be 64 bytes"))?;
        let signature = Signature::from_bytes(&sig_arr);

        let message = envelope.command.signing_bytes()?;
        self.admin_key
            .verify(&message, &signature)
            .map_err(|e| TrellisError::bad_signature(e.to_string()))?;

        let age = now.signed_duration_since(envelope.command.issued_at);
        if age > self.freshness || age < -self.freshness {
            return Err(TrellisError::expired(format!(
                "command issued {}s from verification time, window is {}s",
                age.num_seconds(),
                self.freshness.num_seconds()
            )));
        }

        tracing::debug!(action = %envelope.command.action, "admin command verified");
        Ok(envelope.command.action)
    }
}
