//! Simulation metrics
//!
//! Counts applied and rejected operations and accumulates the value that
//! moved through escrow. Maps are ordered so equal runs serialize identically.

use escrow_contracts::errors::EscrowError;
use escrow_contracts::events::ContractEvent;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use types::numeric::lamports_to_sol;

/// Aggregated simulation metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimMetrics {
    pub steps: u64,
    /// Applied operations per operation name
    pub applied: BTreeMap<String, u64>,
    /// Rejected operations per operation name
    pub rejected: BTreeMap<String, u64>,
    /// Rejections per error kind
    pub errors: BTreeMap<String, u64>,
    /// SOL moved into custody by initialize and deposit
    pub deposited_volume: Decimal,
    /// SOL returned to owners by withdraw
    pub withdrawn_volume: Decimal,
    /// SOL reserved behind placed bids
    pub locked_volume: Decimal,
    /// SOL refunded to bidders by cancel
    pub refunded_volume: Decimal,
    /// SOL paid to recipients by resolve
    pub settled_volume: Decimal,
    /// Invariant violations detected by reconciliation
    pub violations: u64,
}

impl SimMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an applied operation.
    pub fn record_event(&mut self, event: &ContractEvent) {
        self.steps += 1;
        *self.applied.entry(event.label().to_string()).or_default() += 1;

        let sol = lamports_to_sol(event.amount());
        match event {
            ContractEvent::EscrowInitialized(_) | ContractEvent::FundsDeposited(_) => {
                self.deposited_volume += sol
            }
            ContractEvent::FundsWithdrawn(_) => self.withdrawn_volume += sol,
            ContractEvent::BidPlaced(_) => self.locked_volume += sol,
            ContractEvent::BidCancelled(_) => self.refunded_volume += sol,
            ContractEvent::BidResolved(_) => self.settled_volume += sol,
        }
    }

    /// Record a rejected operation.
    pub fn record_rejection(&mut self, op: &str, err: &EscrowError) {
        self.steps += 1;
        *self.rejected.entry(op.to_string()).or_default() += 1;
        *self.errors.entry(error_kind(err).to_string()).or_default() += 1;
    }

    pub fn record_violation(&mut self) {
        self.violations += 1;
    }

    pub fn total_applied(&self) -> u64 {
        self.applied.values().sum()
    }

    pub fn total_rejected(&self) -> u64 {
        self.rejected.values().sum()
    }

    /// Fraction of operations that were rejected.
    pub fn rejection_rate(&self) -> f64 {
        if self.steps == 0 {
            return 0.0;
        }
        self.total_rejected() as f64 / self.steps as f64
    }

    /// SOL still held in custody according to the recorded flows.
    pub fn net_custody(&self) -> Decimal {
        self.deposited_volume - self.withdrawn_volume - self.refunded_volume - self.settled_volume
    }

    /// Human-readable summary line.
    pub fn summary(&self) -> String {
        format!(
            "steps={} applied={} rejected={} ({:.1}%) locked={} SOL settled={} SOL refunded={} SOL violations={}",
            self.steps,
            self.total_applied(),
            self.total_rejected(),
            self.rejection_rate() * 100.0,
            self.locked_volume,
            self.settled_volume,
            self.refunded_volume,
            self.violations,
        )
    }
}

/// Stable name for an error variant.
pub fn error_kind(err: &EscrowError) -> &'static str {
    match err {
        EscrowError::AlreadyExists { .. } => "already_exists",
        EscrowError::NotFound { .. } => "not_found",
        EscrowError::InvalidAmount => "invalid_amount",
        EscrowError::Unauthorized { .. } => "unauthorized",
        EscrowError::InsufficientFunds { .. } => "insufficient_funds",
        EscrowError::InvalidState { .. } => "invalid_state",
        EscrowError::Overflow => "overflow",
        EscrowError::Underflow => "underflow",
        EscrowError::InvariantViolation { .. } => "invariant_violation",
        EscrowError::Transfer(_) => "transfer",
        EscrowError::Store(_) => "store",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use escrow_contracts::events::{BidPlaced, BidResolved, FundsDeposited};
    use types::ids::{AccountId, BidId, EscrowKey};
    use types::numeric::LAMPORTS_PER_SOL;

    fn key() -> EscrowKey {
        EscrowKey::from_bytes([7; 32])
    }

    #[test]
    fn test_new_metrics_empty() {
        let m = SimMetrics::new();
        assert_eq!(m.steps, 0);
        assert_eq!(m.total_applied(), 0);
        assert_eq!(m.rejection_rate(), 0.0);
        assert_eq!(m.net_custody(), Decimal::ZERO);
    }

    #[test]
    fn test_record_events_accumulate_volume() {
        let mut m = SimMetrics::new();
        m.record_event(&ContractEvent::FundsDeposited(FundsDeposited {
            escrow: key(),
            owner: AccountId::new(),
            amount: 2 * LAMPORTS_PER_SOL,
            deposited_amount: 2 * LAMPORTS_PER_SOL,
        }));
        m.record_event(&ContractEvent::BidPlaced(BidPlaced {
            bid: BidId::new(),
            escrow: key(),
            bidder: AccountId::new(),
            amount: LAMPORTS_PER_SOL / 2,
            locked_amount: LAMPORTS_PER_SOL / 2,
        }));
        m.record_event(&ContractEvent::BidResolved(BidResolved {
            bid: BidId::new(),
            escrow: key(),
            recipient: AccountId::new(),
            amount: LAMPORTS_PER_SOL / 2,
            deposited_amount: 3 * LAMPORTS_PER_SOL / 2,
            locked_amount: 0,
        }));

        assert_eq!(m.steps, 3);
        assert_eq!(m.applied["deposit"], 1);
        assert_eq!(m.applied["place_bid"], 1);
        assert_eq!(m.applied["resolve_bid"], 1);
        assert_eq!(m.locked_volume, Decimal::new(5, 1));
        assert_eq!(m.settled_volume, Decimal::new(5, 1));
        assert_eq!(m.net_custody(), Decimal::new(15, 1));
    }

    #[test]
    fn test_record_rejection_by_kind() {
        let mut m = SimMetrics::new();
        m.record_rejection("withdraw", &EscrowError::InvalidAmount);
        m.record_rejection(
            "withdraw",
            &EscrowError::InsufficientFunds {
                required: 2,
                available: 1,
            },
        );
        m.record_rejection("deposit", &EscrowError::InvalidAmount);

        assert_eq!(m.rejected["withdraw"], 2);
        assert_eq!(m.rejected["deposit"], 1);
        assert_eq!(m.errors["invalid_amount"], 2);
        assert_eq!(m.errors["insufficient_funds"], 1);
        assert_eq!(m.rejection_rate(), 1.0);
    }

    #[test]
    fn test_summary_mentions_counts() {
        let mut m = SimMetrics::new();
        m.record_rejection("deposit", &EscrowError::Overflow);
        let s = m.summary();
        assert!(s.contains("steps=1"));
        assert!(s.contains("rejected=1"));
    }

    #[test]
    fn test_metrics_json_roundtrip() {
        let mut m = SimMetrics::new();
        m.record_rejection("cancel_bid", &EscrowError::Underflow);
        let json = serde_json::to_string(&m).unwrap();
        let parsed: SimMetrics = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, m);
    }
}
