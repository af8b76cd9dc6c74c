//! Trellis Core
//!
//! Foundation crate for the trellis vesting engine: identifier newtypes,
//! the domain model (pools, rules, memberships, claims), the unified error
//! type, base/human unit conversion, and the collaborator effect traits
//! implemented by holder indexers, escrow providers, and ledger clients.
//!
//! This crate contains no I/O. Collaborator traits are pure interfaces;
//! their handlers live with the caller (production adapters) or in
//! `trellis-testkit` (deterministic mocks).

#![forbid(unsafe_code)]

/// Engine configuration loaded once at startup and injected
pub mod config;

/// Collaborator effect traits (holder index, escrow, ledger balance)
pub mod effects;

/// Unified error handling
pub mod errors;

/// Domain entities: pools, rules, memberships, claims, audit entries
pub mod model;

/// Fire-and-log outcome type for best-effort external calls
pub mod outcome;

/// Identifier newtypes
pub mod types;

/// Base-unit / human-unit conversion
pub mod units;

pub use config::{EngineConfig, MergePolicy, RuleFailurePolicy};
pub use errors::{Result, TrellisError};
pub use model::{
    AllocationKind, AuditEntry, CancelInfo, Claim, EligibilityRule, Membership, Pool, PoolMode,
    PoolStatus,
};
pub use outcome::BestEffort;
pub use types::{ClaimId, CollectionId, MembershipId, PoolId, RuleId, WalletId};
pub use units::{to_base, to_human, TOKEN_DECIMALS};
