//! Authorization guard
//!
//! Stateless signer checks. Every owner-scoped operation requires the caller
//! to be the escrow owner; cancelling a bid requires the caller to be its
//! bidder. Checks run before any accounting validation.

use serde::{Deserialize, Serialize};
use std::fmt;
use types::ids::AccountId;

use crate::errors::EscrowError;

/// Identity an operation must be signed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Owner recorded on the escrow
    EscrowOwner,
    /// Bidder recorded on the bid
    Bidder,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::EscrowOwner => write!(f, "escrow owner"),
            Role::Bidder => write!(f, "bidder"),
        }
    }
}

/// Fail with `Unauthorized` unless `caller` is the identity recorded for `role`.
pub fn require_signer(
    role: Role,
    expected: &AccountId,
    caller: &AccountId,
) -> Result<(), EscrowError> {
    if expected != caller {
        return Err(EscrowError::Unauthorized {
            role,
            caller: caller.to_string(),
        });
    }
    Ok(())
}
