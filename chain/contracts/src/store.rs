//! Account store: keyed escrow and bid records with snapshots
//!
//! Records are read by key and written through a [`WriteBatch`] that is
//! applied all-or-nothing, so an operation touching an escrow and a bid never
//! leaves only one of them updated.
//!
//! Snapshot file format: `SHA-256(payload) || payload`, where the payload is
//! the bincode encoding of [`StoreSnapshot`]. `BTreeMap` keeps the encoding
//! deterministic for identical state. A snapshot whose records disagree with
//! each other is rejected on load, even when its digest matches.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info};
use types::account::{Bid, Escrow};
use types::ids::{BidId, EscrowKey};

use crate::errors::StoreError;

/// Current snapshot layout version.
pub const SNAPSHOT_VERSION: u32 = 1;

const DIGEST_LEN: usize = 32;

/// Records written by one operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    pub escrow: Option<(EscrowKey, Escrow)>,
    pub bid: Option<(BidId, Bid)>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_escrow(mut self, key: EscrowKey, escrow: Escrow) -> Self {
        self.escrow = Some((key, escrow));
        self
    }

    pub fn put_bid(mut self, id: BidId, bid: Bid) -> Self {
        self.bid = Some((id, bid));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.escrow.is_none() && self.bid.is_none()
    }
}

/// Durable keyed storage for escrow and bid records.
///
/// Implementations must serialize commits against the same key; the engine
/// assumes single-writer semantics per record.
pub trait AccountStore {
    fn escrow(&self, key: &EscrowKey) -> Option<Escrow>;

    fn bid(&self, id: &BidId) -> Option<Bid>;

    /// Every bid collateralized against `key`, in key order.
    fn bids_for_escrow(&self, key: &EscrowKey) -> Vec<(BidId, Bid)>;

    /// Apply every record in `batch`, or none of them.
    fn commit(&mut self, batch: WriteBatch) -> Result<(), StoreError>;
}

/// In-memory store backed by ordered maps.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MemoryStore {
    escrows: BTreeMap<EscrowKey, Escrow>,
    bids: BTreeMap<BidId, Bid>,
    reject_next_commit: Option<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next commit fail without writing anything.
    pub fn fail_next_commit(&mut self, reason: impl Into<String>) {
        self.reject_next_commit = Some(reason.into());
    }

    pub fn escrow_count(&self) -> usize {
        self.escrows.len()
    }

    pub fn bid_count(&self) -> usize {
        self.bids.len()
    }

    /// Iterate all escrows in key order.
    pub fn escrows(&self) -> impl Iterator<Item = (&EscrowKey, &Escrow)> {
        self.escrows.iter()
    }

    /// Capture the current records.
    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            version: SNAPSHOT_VERSION,
            escrows: self.escrows.clone(),
            bids: self.bids.clone(),
        }
    }

    /// Rebuild a store from a snapshot, rejecting inconsistent records.
    pub fn restore(snapshot: StoreSnapshot) -> Result<Self, StoreError> {
        snapshot.validate()?;
        Ok(Self {
            escrows: snapshot.escrows,
            bids: snapshot.bids,
            reject_next_commit: None,
        })
    }

    /// Write a snapshot file, replacing any existing one at `path`.
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let bytes = self.snapshot().to_bytes()?;
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, &bytes)?;
        fs::rename(&tmp, path)?;
        info!(
            path = %path.display(),
            escrows = self.escrows.len(),
            bids = self.bids.len(),
            "Store snapshot saved"
        );
        Ok(())
    }

    /// Load a store from a snapshot file written by [`MemoryStore::save`].
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let bytes = fs::read(path)?;
        let snapshot = StoreSnapshot::from_bytes(&bytes)?;
        info!(
            path = %path.display(),
            escrows = snapshot.escrows.len(),
            bids = snapshot.bids.len(),
            "Store snapshot loaded"
        );
        Self::restore(snapshot)
    }
}

impl AccountStore for MemoryStore {
    fn escrow(&self, key: &EscrowKey) -> Option<Escrow> {
        self.escrows.get(key).cloned()
    }

    fn bid(&self, id: &BidId) -> Option<Bid> {
        self.bids.get(id).cloned()
    }

    fn bids_for_escrow(&self, key: &EscrowKey) -> Vec<(BidId, Bid)> {
        self.bids
            .iter()
            .filter(|(_, bid)| bid.escrow == *key)
            .map(|(id, bid)| (*id, bid.clone()))
            .collect()
    }

    fn commit(&mut self, batch: WriteBatch) -> Result<(), StoreError> {
        if let Some(reason) = self.reject_next_commit.take() {
            return Err(StoreError::CommitRejected { reason });
        }
        if let Some((key, escrow)) = batch.escrow {
            debug!(escrow = %key, "Committing escrow record");
            self.escrows.insert(key, escrow);
        }
        if let Some((id, bid)) = batch.bid {
            debug!(bid = %id, "Committing bid record");
            self.bids.insert(id, bid);
        }
        Ok(())
    }
}

/// Serializable image of a [`MemoryStore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub version: u32,
    pub escrows: BTreeMap<EscrowKey, Escrow>,
    pub bids: BTreeMap<BidId, Bid>,
}

impl StoreSnapshot {
    /// Encode as `digest || payload`.
    pub fn to_bytes(&self) -> Result<Vec<u8>, StoreError> {
        let payload =
            bincode::serialize(self).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let digest = Sha256::digest(&payload);

        let mut bytes = Vec::with_capacity(DIGEST_LEN + payload.len());
        bytes.extend_from_slice(&digest);
        bytes.extend_from_slice(&payload);
        Ok(bytes)
    }

    /// Decode bytes produced by [`StoreSnapshot::to_bytes`], verifying the digest.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StoreError> {
        if bytes.len() < DIGEST_LEN {
            return Err(StoreError::Truncated { len: bytes.len() });
        }
        let (stored, payload) = bytes.split_at(DIGEST_LEN);
        let computed = Sha256::digest(payload);
        if computed.as_slice() != stored {
            return Err(StoreError::IntegrityFailure {
                expected: hex::encode(stored),
                actual: hex::encode(computed),
            });
        }

        let snapshot: StoreSnapshot = bincode::deserialize(payload)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(StoreError::UnsupportedVersion(snapshot.version));
        }
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Check the records against each other: every escrow holds
    /// `locked <= deposited`, every bid is non-zero and points at a stored
    /// escrow, and active bids add up to each escrow's locked amount.
    pub fn validate(&self) -> Result<(), StoreError> {
        let mut active: BTreeMap<EscrowKey, u128> = BTreeMap::new();
        for (id, bid) in &self.bids {
            if bid.amount == 0 {
                return Err(corrupt(format!("bid {} has zero amount", id)));
            }
            if !self.escrows.contains_key(&bid.escrow) {
                return Err(corrupt(format!(
                    "bid {} references missing escrow {}",
                    id, bid.escrow
                )));
            }
            if bid.is_active() {
                *active.entry(bid.escrow).or_default() += bid.amount as u128;
            }
        }

        for (key, escrow) in &self.escrows {
            escrow
                .check_invariant()
                .map_err(|e| corrupt(format!("escrow {}: {}", key, e)))?;
            let active_total = active.get(key).copied().unwrap_or(0);
            if active_total != escrow.locked_amount as u128 {
                return Err(corrupt(format!(
                    "escrow {} locks {} but active bids total {}",
                    key, escrow.locked_amount, active_total
                )));
            }
        }
        Ok(())
    }
}

fn corrupt(reason: String) -> StoreError {
    StoreError::CorruptState { reason }
}
