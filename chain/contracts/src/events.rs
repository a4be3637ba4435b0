//! Contract events
//!
//! Every successful engine operation returns one event describing what was
//! applied. Balances carried in events are the escrow's values after the
//! operation.

use serde::{Deserialize, Serialize};
use types::ids::{AccountId, BidId, EscrowKey};
use types::numeric::Lamports;

/// Escrow created with its initial deposit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowInitialized {
    pub escrow: EscrowKey,
    pub owner: AccountId,
    pub amount: Lamports,
}

/// Additional funds moved into custody
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundsDeposited {
    pub escrow: EscrowKey,
    pub owner: AccountId,
    pub amount: Lamports,
    pub deposited_amount: Lamports,
}

/// Uncommitted funds returned to the owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundsWithdrawn {
    pub escrow: EscrowKey,
    pub owner: AccountId,
    pub amount: Lamports,
    pub deposited_amount: Lamports,
}

/// Collateral reserved behind a new bid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidPlaced {
    pub bid: BidId,
    pub escrow: EscrowKey,
    pub bidder: AccountId,
    pub amount: Lamports,
    pub locked_amount: Lamports,
}

/// Bid withdrawn by its bidder and collateral refunded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidCancelled {
    pub bid: BidId,
    pub escrow: EscrowKey,
    pub bidder: AccountId,
    pub amount: Lamports,
    pub deposited_amount: Lamports,
    pub locked_amount: Lamports,
}

/// Bid settled by the escrow owner and collateral paid out
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidResolved {
    pub bid: BidId,
    pub escrow: EscrowKey,
    pub recipient: AccountId,
    pub amount: Lamports,
    pub deposited_amount: Lamports,
    pub locked_amount: Lamports,
}

/// Enum wrapper for all contract events, enabling uniform handling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractEvent {
    EscrowInitialized(EscrowInitialized),
    FundsDeposited(FundsDeposited),
    FundsWithdrawn(FundsWithdrawn),
    BidPlaced(BidPlaced),
    BidCancelled(BidCancelled),
    BidResolved(BidResolved),
}

impl ContractEvent {
    /// Short label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            ContractEvent::EscrowInitialized(_) => "initialize",
            ContractEvent::FundsDeposited(_) => "deposit",
            ContractEvent::FundsWithdrawn(_) => "withdraw",
            ContractEvent::BidPlaced(_) => "place_bid",
            ContractEvent::BidCancelled(_) => "cancel_bid",
            ContractEvent::BidResolved(_) => "resolve_bid",
        }
    }

    /// Escrow the event applies to.
    pub fn escrow(&self) -> &EscrowKey {
        match self {
            ContractEvent::EscrowInitialized(e) => &e.escrow,
            ContractEvent::FundsDeposited(e) => &e.escrow,
            ContractEvent::FundsWithdrawn(e) => &e.escrow,
            ContractEvent::BidPlaced(e) => &e.escrow,
            ContractEvent::BidCancelled(e) => &e.escrow,
            ContractEvent::BidResolved(e) => &e.escrow,
        }
    }

    /// Lamports moved or reserved by the operation.
    pub fn amount(&self) -> Lamports {
        match self {
            ContractEvent::EscrowInitialized(e) => e.amount,
            ContractEvent::FundsDeposited(e) => e.amount,
            ContractEvent::FundsWithdrawn(e) => e.amount,
            ContractEvent::BidPlaced(e) => e.amount,
            ContractEvent::BidCancelled(e) => e.amount,
            ContractEvent::BidResolved(e) => e.amount,
        }
    }
}
