//! Error types for escrow records
//!
//! Raised by the checked mutations on [`crate::account::Escrow`] and the
//! lifecycle transitions on [`crate::account::Bid`]. The engine maps these
//! onto its own operation-level error taxonomy.

use thiserror::Error;

/// Balance arithmetic errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BalanceError {
    #[error("Insufficient available funds: required {required}, available {available}")]
    InsufficientFunds { required: u64, available: u64 },

    #[error("Arithmetic overflow in balance calculation")]
    Overflow,

    #[error("Arithmetic underflow in balance calculation")]
    Underflow,

    #[error("Balance invariant violated: locked {locked} exceeds deposited {deposited}")]
    InvariantViolation { deposited: u64, locked: u64 },
}

/// Bid lifecycle errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BidError {
    #[error("Bid already in terminal state: {status}")]
    AlreadyTerminal { status: String },
}
