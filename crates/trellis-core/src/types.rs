//! Core identifier types used across the trellis workspace
//!
//! Uuid-backed newtypes for entities the store keys by id, and string
//! newtypes for ledger-native identities (wallet addresses, NFT collection
//! addresses) that arrive from outside and are treated as opaque.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident, $prefix:literal) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new random id
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Create from an existing UUID
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Get the inner UUID
            pub fn uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "-{}"), self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }
    };
}

uuid_id!(
    /// Identifier of a vesting pool
    PoolId,
    "pool"
);

uuid_id!(
    /// Identifier of an eligibility rule within a pool
    RuleId,
    "rule"
);

uuid_id!(
    /// Identifier of a membership (one wallet's allocation in one pool)
    MembershipId,
    "membership"
);

uuid_id!(
    /// Identifier of an immutable claim ledger entry
    ClaimId,
    "claim"
);

/// Ledger wallet identity
///
/// Opaque address string as supplied by the ledger. For the administrator
/// wallet this is the hex-encoded ed25519 verifying key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WalletId(pub String);

impl WalletId {
    /// Create from any string-like address
    pub fn new(addr: impl Into<String>) -> Self {
        Self(addr.into())
    }

    /// The address as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WalletId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WalletId {
    fn from(addr: &str) -> Self {
        Self(addr.to_string())
    }
}

impl FromStr for WalletId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

/// NFT collection identity targeted by an eligibility rule
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CollectionId(pub String);

impl CollectionId {
    /// Create from any string-like address
    pub fn new(addr: impl Into<String>) -> Self {
        Self(addr.into())
    }

    /// The address as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CollectionId {
    fn from(addr: &str) -> Self {
        Self(addr.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_ids_are_unique() {
        assert_ne!(PoolId::new(), PoolId::new());
    }

    #[test]
    fn display_carries_prefix() {
        let id = MembershipId::new();
        assert!(id.to_string().starts_with("membership-"));
    }

    #[test]
    fn wallet_id_round_trips_through_serde() {
        let wallet = WalletId::new("8f3b1c");
        let json = serde_json::to_string(&wallet).unwrap();
        let back: WalletId = serde_json::from_str(&json).unwrap();
        assert_eq!(wallet, back);
    }
}
