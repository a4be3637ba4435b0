//! Types library for the escrow custody engine
//!
//! Core type definitions shared by the contract layer and tooling.
//!
//! # Modules
//! - `ids`: Identities and keys (AccountId, BidId, EscrowKey, Address)
//! - `numeric`: Lamport amounts and SOL conversion
//! - `account`: Escrow and Bid records
//! - `errors`: Record-level error taxonomy

pub mod ids;
pub mod numeric;
pub mod account;
pub mod errors;

pub const LIB_VERSION: &str = "1.0.0";

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::ids::*;
    pub use crate::numeric::*;
    pub use crate::account::*;
    pub use crate::errors::*;
}
