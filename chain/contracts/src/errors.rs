//! Contract-specific error types
//!
//! Error taxonomy for escrow operations, the transfer primitive, and the
//! account store. Every engine failure is detected before any record is
//! written.

use std::io;

use thiserror::Error;
use types::errors::BalanceError;

use crate::security::Role;

/// Escrow engine errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EscrowError {
    #[error("{record} already exists: {key}")]
    AlreadyExists { record: &'static str, key: String },

    #[error("{record} not found: {key}")]
    NotFound { record: &'static str, key: String },

    #[error("Amount must be greater than zero")]
    InvalidAmount,

    #[error("Unauthorized: {caller} is not the {role}")]
    Unauthorized { role: Role, caller: String },

    #[error("Insufficient available funds: required {required}, available {available}")]
    InsufficientFunds { required: u64, available: u64 },

    #[error("Bid {bid} is not active (status {status})")]
    InvalidState { bid: String, status: String },

    #[error("Arithmetic overflow in balance calculation")]
    Overflow,

    #[error("Arithmetic underflow in balance calculation")]
    Underflow,

    #[error("Invariant violated: {reason}")]
    InvariantViolation { reason: String },

    #[error("Transfer failed: {0}")]
    Transfer(#[from] TransferError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl From<BalanceError> for EscrowError {
    fn from(err: BalanceError) -> Self {
        match err {
            BalanceError::InsufficientFunds {
                required,
                available,
            } => EscrowError::InsufficientFunds {
                required,
                available,
            },
            BalanceError::Overflow => EscrowError::Overflow,
            BalanceError::Underflow => EscrowError::Underflow,
            BalanceError::InvariantViolation { .. } => EscrowError::InvariantViolation {
                reason: err.to_string(),
            },
        }
    }
}

/// Fund transfer primitive errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransferError {
    #[error("Insufficient balance at {address}: required {required}, available {available}")]
    InsufficientBalance {
        address: String,
        required: u64,
        available: u64,
    },

    #[error("Arithmetic overflow crediting {address}")]
    Overflow { address: String },

    #[error("Transfer rejected: {reason}")]
    Rejected { reason: String },
}

/// Account store and snapshot errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Integrity check failed: expected {expected}, got {actual}")]
    IntegrityFailure { expected: String, actual: String },

    #[error("Unsupported snapshot version: {0}")]
    UnsupportedVersion(u32),

    #[error("Snapshot truncated: {len} bytes")]
    Truncated { len: usize },

    #[error("Commit rejected: {reason}")]
    CommitRejected { reason: String },

    #[error("Snapshot records are inconsistent: {reason}")]
    CorruptState { reason: String },
}

impl From<io::Error> for StoreError {
    fn from(err: io::Error) -> Self {
        StoreError::Io(err.to_string())
    }
}
