//! Escrow Custody & Bid Settlement
//!
//! This crate implements the escrow ledger engine: owners deposit funds into
//! custody, bidders lock part of those funds behind bids, and each bid is
//! either cancelled (refund to the bidder) or resolved (payout to a recipient).
//!
//! # Modules
//! - `engine`: The six escrow operations, queries and reconciliation
//! - `store`: Keyed record storage with all-or-nothing commits and snapshots
//! - `transfer`: The injected fund transfer primitive and an in-memory ledger
//! - `security`: Signer checks
//! - `events`: Events returned by successful operations
//! - `errors`: Contract-specific error types
//! - `config`: Engine configuration

pub mod config;
pub mod engine;
pub mod errors;
pub mod events;
pub mod security;
pub mod store;
pub mod transfer;

pub use config::EngineConfig;
pub use engine::{EscrowEngine, ReconcileReport};
pub use errors::{EscrowError, StoreError, TransferError};
pub use events::ContractEvent;
pub use store::{AccountStore, MemoryStore, WriteBatch};
pub use transfer::{FundTransfer, InMemoryLedger};

/// Contract ABI version, frozen after release
pub const CONTRACT_ABI_VERSION: &str = "1.0.0";
