//! Escrow and bid records
//!
//! Escrow invariant: `locked_amount <= deposited_amount`. Every checked
//! mutation validates before writing, so a failed call leaves the record
//! exactly as it was.

use crate::errors::{BalanceError, BidError};
use crate::ids::{AccountId, EscrowKey};
use crate::numeric::Lamports;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Custodial account holding an owner's funds.
///
/// `available = deposited_amount - locked_amount` is derived on demand and
/// never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Escrow {
    pub owner: AccountId,
    /// Total funds currently custodied
    pub deposited_amount: Lamports,
    /// Portion of `deposited_amount` committed as bid collateral
    pub locked_amount: Lamports,
}

impl Escrow {
    /// Create a new escrow holding `initial_deposit` with nothing locked.
    pub fn new(owner: AccountId, initial_deposit: Lamports) -> Self {
        Self {
            owner,
            deposited_amount: initial_deposit,
            locked_amount: 0,
        }
    }

    /// Funds that are neither withdrawn nor committed to a bid.
    pub fn available(&self) -> Lamports {
        self.deposited_amount.saturating_sub(self.locked_amount)
    }

    /// Check balance invariant: locked <= deposited
    pub fn check_invariant(&self) -> Result<(), BalanceError> {
        if self.locked_amount > self.deposited_amount {
            return Err(BalanceError::InvariantViolation {
                deposited: self.deposited_amount,
                locked: self.locked_amount,
            });
        }
        Ok(())
    }

    /// Add newly custodied funds.
    pub fn credit(&mut self, amount: Lamports) -> Result<(), BalanceError> {
        let deposited = self
            .deposited_amount
            .checked_add(amount)
            .ok_or(BalanceError::Overflow)?;
        self.apply(deposited, self.locked_amount)
    }

    /// Remove uncommitted funds from custody.
    ///
    /// Gated by `available`, never by `deposited_amount`: committed collateral
    /// cannot be withdrawn.
    pub fn debit_available(&mut self, amount: Lamports) -> Result<(), BalanceError> {
        self.ensure_available(amount)?;
        let deposited = self
            .deposited_amount
            .checked_sub(amount)
            .ok_or(BalanceError::Underflow)?;
        self.apply(deposited, self.locked_amount)
    }

    /// Reserve `amount` of the available funds as collateral.
    pub fn lock(&mut self, amount: Lamports) -> Result<(), BalanceError> {
        self.ensure_available(amount)?;
        let locked = self
            .locked_amount
            .checked_add(amount)
            .ok_or(BalanceError::Overflow)?;
        self.apply(self.deposited_amount, locked)
    }

    /// Release a reservation and remove the same amount from custody.
    ///
    /// Used when a bid leaves the active state, whether by cancellation or
    /// resolution.
    pub fn settle_locked(&mut self, amount: Lamports) -> Result<(), BalanceError> {
        let locked = self
            .locked_amount
            .checked_sub(amount)
            .ok_or(BalanceError::Underflow)?;
        let deposited = self
            .deposited_amount
            .checked_sub(amount)
            .ok_or(BalanceError::Underflow)?;
        self.apply(deposited, locked)
    }

    fn ensure_available(&self, amount: Lamports) -> Result<(), BalanceError> {
        let available = self.available();
        if amount > available {
            return Err(BalanceError::InsufficientFunds {
                required: amount,
                available,
            });
        }
        Ok(())
    }

    fn apply(&mut self, deposited: Lamports, locked: Lamports) -> Result<(), BalanceError> {
        if locked > deposited {
            return Err(BalanceError::InvariantViolation { deposited, locked });
        }
        self.deposited_amount = deposited;
        self.locked_amount = locked;
        Ok(())
    }
}

/// Bid lifecycle state.
///
/// `Active` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BidStatus {
    Active,
    /// Withdrawn by the bidder; collateral refunded to the bidder
    Cancelled,
    /// Settled by the escrow owner; collateral paid to `recipient`
    Resolved { recipient: AccountId },
}

impl fmt::Display for BidStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BidStatus::Active => write!(f, "ACTIVE"),
            BidStatus::Cancelled => write!(f, "CANCELLED"),
            BidStatus::Resolved { recipient } => write!(f, "RESOLVED({})", recipient),
        }
    }
}

/// A bid collateralized against an escrow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bid {
    pub bidder: AccountId,
    pub escrow: EscrowKey,
    pub amount: Lamports,
    pub status: BidStatus,
}

impl Bid {
    /// Create an active bid.
    pub fn new(bidder: AccountId, escrow: EscrowKey, amount: Lamports) -> Self {
        Self {
            bidder,
            escrow,
            amount,
            status: BidStatus::Active,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.status, BidStatus::Active)
    }

    /// Transition `Active -> Cancelled`.
    pub fn cancel(&mut self) -> Result<(), BidError> {
        self.finish(BidStatus::Cancelled)
    }

    /// Transition `Active -> Resolved`.
    pub fn resolve(&mut self, recipient: AccountId) -> Result<(), BidError> {
        self.finish(BidStatus::Resolved { recipient })
    }

    fn finish(&mut self, status: BidStatus) -> Result<(), BidError> {
        if !self.is_active() {
            return Err(BidError::AlreadyTerminal {
                status: self.status.to_string(),
            });
        }
        self.status = status;
        Ok(())
    }
}
