//! Deterministic admin keys and command signing for tests

use chrono::{DateTime, Utc};
use ed25519_dalek::{Signer, SigningKey};

use trellis_authentication::{AdminAction, AdminCommand, AdminCommandEnvelope};
use trellis_core::types::WalletId;

/// Seed of the test administrator key; `test_config` embeds the matching
/// verifying key
pub const TEST_ADMIN_SEED: [u8; 32] = [7u8; 32];

/// The test administrator's signing key
pub fn admin_signing_key() -> SigningKey {
    SigningKey::from_bytes(&TEST_ADMIN_SEED)
}

/// Build a correctly signed envelope for `action` issued at `issued_at`
pub fn signed_admin_envelope(
    key: &SigningKey,
    action: AdminAction,
    issued_at: DateTime<Utc>,
) -> AdminCommandEnvelope {
    let command = AdminCommand::new(action, issued_at);
    let signature = key.sign(&command.signing_bytes().unwrap());
    AdminCommandEnvelope {
        wallet: WalletId::new(hex::encode(key.verifying_key().to_bytes())),
        signature: hex::encode(signature.to_bytes()),
        command,
    }
}
