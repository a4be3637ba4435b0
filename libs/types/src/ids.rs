//! Identifier types for escrow entities
//!
//! Wallet identities and bid keys are UUID newtypes. Escrow records are
//! addressed by a key derived from the owner identity, so an owner's escrow
//! can be found without any separate index.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use uuid::Uuid;

/// Default namespace tag mixed into every escrow key.
pub const ESCROW_NAMESPACE: &str = "escrow";

/// Identity of a wallet (escrow owner, bidder, or settlement recipient).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(Uuid);

impl AccountId {
    /// Create a new AccountId with current timestamp
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Create from existing UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get inner UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Storage key of a bid record.
///
/// Chosen by the caller at placement time and must be unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BidId(Uuid);

impl BidId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for BidId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BidId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Deterministic storage key of an escrow record.
///
/// `SHA-256(namespace || owner uuid bytes)`. The same owner under the same
/// namespace always maps to the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EscrowKey([u8; 32]);

impl EscrowKey {
    /// Derive the escrow key for `owner` under `namespace`.
    pub fn derive(namespace: &str, owner: &AccountId) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(namespace.as_bytes());
        hasher.update(owner.as_uuid().as_bytes());
        Self(hasher.finalize().into())
    }

    /// Derive the escrow key under the default namespace.
    pub fn for_owner(owner: &AccountId) -> Self {
        Self::derive(ESCROW_NAMESPACE, owner)
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for EscrowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// A balance the transfer primitive can move value between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Address {
    /// External wallet balance of an identity
    Wallet(AccountId),
    /// Custody balance held by an escrow
    Escrow(EscrowKey),
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Wallet(id) => write!(f, "wallet:{}", id),
            Address::Escrow(key) => write!(f, "escrow:{}", key),
        }
    }
}
