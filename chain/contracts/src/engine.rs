//! Escrow ledger engine
//!
//! Validates and applies the six escrow operations against an
//! [`AccountStore`], moving value through a [`FundTransfer`] implementation.
//!
//! Each operation runs the same way:
//! 1. Load the records it touches
//! 2. Authorization (before any accounting check)
//! 3. Amount and state validation
//! 4. Build the next versions of the records with checked arithmetic
//! 5. Transfer, then commit both records in one batch
//!
//! A transfer failure leaves every record untouched. A commit failure after a
//! successful transfer is compensated with the reverse transfer before the
//! error is returned. The engine keeps no record state between calls.

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};
use types::account::{Bid, Escrow};
use types::ids::{AccountId, Address, BidId, EscrowKey};
use types::numeric::Lamports;

use crate::config::EngineConfig;
use crate::errors::EscrowError;
use crate::events::{
    BidCancelled, BidPlaced, BidResolved, ContractEvent, EscrowInitialized, FundsDeposited,
    FundsWithdrawn,
};
use crate::security::{require_signer, Role};
use crate::store::{AccountStore, WriteBatch};
use crate::transfer::FundTransfer;

const ESCROW_RECORD: &str = "Escrow";
const BID_RECORD: &str = "Bid";

/// A value movement staged alongside a record update.
#[derive(Debug, Clone, Copy)]
struct PendingTransfer {
    from: Address,
    to: Address,
    amount: Lamports,
}

/// Result of auditing one escrow against its bids and its custody balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub escrow: EscrowKey,
    pub deposited_amount: Lamports,
    pub locked_amount: Lamports,
    pub available: Lamports,
    /// Sum of the amounts of every active bid against the escrow
    pub active_bid_total: u128,
    pub active_bids: usize,
    /// Ledger balance held at the escrow's custody address
    pub custody_balance: Lamports,
}

/// Escrow fund-custody and bid lock/release engine.
pub struct EscrowEngine<S, L> {
    config: EngineConfig,
    store: S,
    ledger: L,
}

impl<S: AccountStore, L: FundTransfer> EscrowEngine<S, L> {
    /// Create an engine over `store`, moving funds through `ledger`.
    pub fn new(config: EngineConfig, store: S, ledger: L) -> Self {
        info!(namespace = %config.namespace, "EscrowEngine initialized");
        Self {
            config,
            store,
            ledger,
        }
    }

    /// Create an engine with the default configuration.
    pub fn with_defaults(store: S, ledger: L) -> Self {
        Self::new(EngineConfig::default(), store, ledger)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }

    /// Consume the engine, returning the store and ledger.
    pub fn into_parts(self) -> (S, L) {
        (self.store, self.ledger)
    }

    // ───────────────────────── Queries ─────────────────────────

    /// Deterministic key of `owner`'s escrow under the configured namespace.
    pub fn escrow_key(&self, owner: &AccountId) -> EscrowKey {
        EscrowKey::derive(&self.config.namespace, owner)
    }

    pub fn escrow(&self, key: &EscrowKey) -> Option<Escrow> {
        self.store.escrow(key)
    }

    pub fn bid(&self, id: &BidId) -> Option<Bid> {
        self.store.bid(id)
    }

    pub fn bids_for_escrow(&self, key: &EscrowKey) -> Vec<(BidId, Bid)> {
        self.store.bids_for_escrow(key)
    }

    /// Funds of the escrow that are neither withdrawn nor locked.
    pub fn available(&self, key: &EscrowKey) -> Result<Lamports, EscrowError> {
        Ok(self.load_escrow(key)?.available())
    }

    // ───────────────────────── Escrow lifecycle ─────────────────────────

    /// Create `owner`'s escrow, moving `initial_deposit` from the owner's wallet
    /// into custody.
    pub fn initialize(
        &mut self,
        owner: &AccountId,
        initial_deposit: Lamports,
    ) -> Result<ContractEvent, EscrowError> {
        let result = self.try_initialize(owner, initial_deposit);
        log_outcome("initialize", result)
    }

    /// Move `amount` from the owner's wallet into custody.
    pub fn deposit(
        &mut self,
        caller: &AccountId,
        key: &EscrowKey,
        amount: Lamports,
    ) -> Result<ContractEvent, EscrowError> {
        let result = self.try_deposit(caller, key, amount);
        log_outcome("deposit", result)
    }

    /// Return `amount` of uncommitted funds to the owner's wallet.
    pub fn withdraw(
        &mut self,
        caller: &AccountId,
        key: &EscrowKey,
        amount: Lamports,
    ) -> Result<ContractEvent, EscrowError> {
        let result = self.try_withdraw(caller, key, amount);
        log_outcome("withdraw", result)
    }

    // ───────────────────────── Bid lifecycle ─────────────────────────

    /// Reserve `amount` of the escrow's available funds behind a new bid.
    ///
    /// Locking is a logical reservation: no funds move.
    pub fn place_bid(
        &mut self,
        bidder: &AccountId,
        key: &EscrowKey,
        bid_id: BidId,
        amount: Lamports,
    ) -> Result<ContractEvent, EscrowError> {
        let result = self.try_place_bid(bidder, key, bid_id, amount);
        log_outcome("place_bid", result)
    }

    /// Cancel an active bid, refunding its collateral out of custody to the bidder.
    pub fn cancel_bid(
        &mut self,
        caller: &AccountId,
        bid_id: &BidId,
    ) -> Result<ContractEvent, EscrowError> {
        let result = self.try_cancel_bid(caller, bid_id);
        log_outcome("cancel_bid", result)
    }

    /// Settle an active bid, paying its collateral out of custody to `recipient`.
    ///
    /// Only the escrow owner may resolve. Which bid wins is the caller's decision.
    pub fn resolve_bid(
        &mut self,
        caller: &AccountId,
        bid_id: &BidId,
        recipient: &AccountId,
    ) -> Result<ContractEvent, EscrowError> {
        let result = self.try_resolve_bid(caller, bid_id, recipient);
        log_outcome("resolve_bid", result)
    }

    // ───────────────────────── Audit ─────────────────────────

    /// Check that the escrow's balances agree with its active bids and with
    /// the ledger's custody balance.
    pub fn reconcile(&self, key: &EscrowKey) -> Result<ReconcileReport, EscrowError> {
        let escrow = self.load_escrow(key)?;
        escrow.check_invariant()?;

        let active: Vec<Bid> = self
            .store
            .bids_for_escrow(key)
            .into_iter()
            .map(|(_, bid)| bid)
            .filter(Bid::is_active)
            .collect();
        let active_bid_total: u128 = active.iter().map(|b| b.amount as u128).sum();
        if active_bid_total != escrow.locked_amount as u128 {
            return Err(EscrowError::InvariantViolation {
                reason: format!(
                    "escrow {} locks {} but active bids total {}",
                    key, escrow.locked_amount, active_bid_total
                ),
            });
        }

        let custody_balance = self.ledger.balance_of(&Address::Escrow(*key));
        if custody_balance != escrow.deposited_amount {
            return Err(EscrowError::InvariantViolation {
                reason: format!(
                    "escrow {} records {} deposited but custody holds {}",
                    key, escrow.deposited_amount, custody_balance
                ),
            });
        }

        Ok(ReconcileReport {
            escrow: *key,
            deposited_amount: escrow.deposited_amount,
            locked_amount: escrow.locked_amount,
            available: escrow.available(),
            active_bid_total,
            active_bids: active.len(),
            custody_balance,
        })
    }

    // ───────────────────────── Operation bodies ─────────────────────────

    fn try_initialize(
        &mut self,
        owner: &AccountId,
        initial_deposit: Lamports,
    ) -> Result<ContractEvent, EscrowError> {
        let key = self.escrow_key(owner);
        if self.store.escrow(&key).is_some() {
            return Err(EscrowError::AlreadyExists {
                record: ESCROW_RECORD,
                key: key.to_string(),
            });
        }
        require_positive(initial_deposit)?;

        let escrow = Escrow::new(*owner, initial_deposit);
        let batch = stage_escrow(WriteBatch::new(), key, escrow)?;
        self.apply(
            Some(PendingTransfer {
                from: Address::Wallet(*owner),
                to: Address::Escrow(key),
                amount: initial_deposit,
            }),
            batch,
        )?;

        Ok(ContractEvent::EscrowInitialized(EscrowInitialized {
            escrow: key,
            owner: *owner,
            amount: initial_deposit,
        }))
    }

    fn try_deposit(
        &mut self,
        caller: &AccountId,
        key: &EscrowKey,
        amount: Lamports,
    ) -> Result<ContractEvent, EscrowError> {
        let mut escrow = self.load_escrow(key)?;
        require_signer(Role::EscrowOwner, &escrow.owner, caller)?;
        require_positive(amount)?;

        escrow.credit(amount)?;
        let owner = escrow.owner;
        let deposited_amount = escrow.deposited_amount;
        let batch = stage_escrow(WriteBatch::new(), *key, escrow)?;
        self.apply(
            Some(PendingTransfer {
                from: Address::Wallet(owner),
                to: Address::Escrow(*key),
                amount,
            }),
            batch,
        )?;

        Ok(ContractEvent::FundsDeposited(FundsDeposited {
            escrow: *key,
            owner,
            amount,
            deposited_amount,
        }))
    }

    fn try_withdraw(
        &mut self,
        caller: &AccountId,
        key: &EscrowKey,
        amount: Lamports,
    ) -> Result<ContractEvent, EscrowError> {
        let mut escrow = self.load_escrow(key)?;
        require_signer(Role::EscrowOwner, &escrow.owner, caller)?;
        require_positive(amount)?;

        escrow.debit_available(amount)?;
        let owner = escrow.owner;
        let deposited_amount = escrow.deposited_amount;
        let batch = stage_escrow(WriteBatch::new(), *key, escrow)?;
        self.apply(
            Some(PendingTransfer {
                from: Address::Escrow(*key),
                to: Address::Wallet(owner),
                amount,
            }),
            batch,
        )?;

        Ok(ContractEvent::FundsWithdrawn(FundsWithdrawn {
            escrow: *key,
            owner,
            amount,
            deposited_amount,
        }))
    }

    fn try_place_bid(
        &mut self,
        bidder: &AccountId,
        key: &EscrowKey,
        bid_id: BidId,
        amount: Lamports,
    ) -> Result<ContractEvent, EscrowError> {
        require_positive(amount)?;
        if self.store.bid(&bid_id).is_some() {
            return Err(EscrowError::AlreadyExists {
                record: BID_RECORD,
                key: bid_id.to_string(),
            });
        }
        let mut escrow = self.load_escrow(key)?;

        escrow.lock(amount)?;
        let locked_amount = escrow.locked_amount;
        let batch = stage_escrow(WriteBatch::new(), *key, escrow)?
            .put_bid(bid_id, Bid::new(*bidder, *key, amount));
        self.apply(None, batch)?;

        Ok(ContractEvent::BidPlaced(BidPlaced {
            bid: bid_id,
            escrow: *key,
            bidder: *bidder,
            amount,
            locked_amount,
        }))
    }

    fn try_cancel_bid(
        &mut self,
        caller: &AccountId,
        bid_id: &BidId,
    ) -> Result<ContractEvent, EscrowError> {
        let mut bid = self.load_bid(bid_id)?;
        require_signer(Role::Bidder, &bid.bidder, caller)?;
        require_active(bid_id, &bid)?;
        let key = bid.escrow;
        let mut escrow = self.load_escrow(&key)?;

        escrow.settle_locked(bid.amount)?;
        bid.cancel().map_err(|_| invalid_state(bid_id, &bid))?;

        let event = BidCancelled {
            bid: *bid_id,
            escrow: key,
            bidder: bid.bidder,
            amount: bid.amount,
            deposited_amount: escrow.deposited_amount,
            locked_amount: escrow.locked_amount,
        };
        let transfer = PendingTransfer {
            from: Address::Escrow(key),
            to: Address::Wallet(bid.bidder),
            amount: bid.amount,
        };
        let batch = stage_escrow(WriteBatch::new(), key, escrow)?.put_bid(*bid_id, bid);
        self.apply(Some(transfer), batch)?;

        Ok(ContractEvent::BidCancelled(event))
    }

    fn try_resolve_bid(
        &mut self,
        caller: &AccountId,
        bid_id: &BidId,
        recipient: &AccountId,
    ) -> Result<ContractEvent, EscrowError> {
        let mut bid = self.load_bid(bid_id)?;
        let key = bid.escrow;
        let mut escrow = self.load_escrow(&key)?;
        require_signer(Role::EscrowOwner, &escrow.owner, caller)?;
        require_active(bid_id, &bid)?;

        escrow.settle_locked(bid.amount)?;
        bid.resolve(*recipient)
            .map_err(|_| invalid_state(bid_id, &bid))?;

        let event = BidResolved {
            bid: *bid_id,
            escrow: key,
            recipient: *recipient,
            amount: bid.amount,
            deposited_amount: escrow.deposited_amount,
            locked_amount: escrow.locked_amount,
        };
        let transfer = PendingTransfer {
            from: Address::Escrow(key),
            to: Address::Wallet(*recipient),
            amount: bid.amount,
        };
        let batch = stage_escrow(WriteBatch::new(), key, escrow)?.put_bid(*bid_id, bid);
        self.apply(Some(transfer), batch)?;

        Ok(ContractEvent::BidResolved(event))
    }

    // ───────────────────────── Internals ─────────────────────────

    fn load_escrow(&self, key: &EscrowKey) -> Result<Escrow, EscrowError> {
        self.store.escrow(key).ok_or_else(|| EscrowError::NotFound {
            record: ESCROW_RECORD,
            key: key.to_string(),
        })
    }

    fn load_bid(&self, id: &BidId) -> Result<Bid, EscrowError> {
        self.store.bid(id).ok_or_else(|| EscrowError::NotFound {
            record: BID_RECORD,
            key: id.to_string(),
        })
    }

    /// Run the transfer, then commit. Transfer and bookkeeping succeed or fail together.
    fn apply(
        &mut self,
        transfer: Option<PendingTransfer>,
        batch: WriteBatch,
    ) -> Result<(), EscrowError> {
        if let Some(t) = transfer {
            self.ledger.transfer(&t.from, &t.to, t.amount)?;
        }

        let Err(store_err) = self.store.commit(batch) else {
            return Ok(());
        };

        if let Some(t) = transfer {
            error!(
                from = %t.from,
                to = %t.to,
                amount = t.amount,
                error = %store_err,
                "Commit failed after transfer, reversing"
            );
            if let Err(reversal_err) = self.ledger.transfer(&t.to, &t.from, t.amount) {
                error!(
                    from = %t.to,
                    to = %t.from,
                    amount = t.amount,
                    error = %reversal_err,
                    "Compensating transfer failed"
                );
            }
        }
        Err(store_err.into())
    }
}

fn require_positive(amount: Lamports) -> Result<(), EscrowError> {
    if amount == 0 {
        return Err(EscrowError::InvalidAmount);
    }
    Ok(())
}

fn require_active(id: &BidId, bid: &Bid) -> Result<(), EscrowError> {
    if !bid.is_active() {
        return Err(invalid_state(id, bid));
    }
    Ok(())
}

fn invalid_state(id: &BidId, bid: &Bid) -> EscrowError {
    EscrowError::InvalidState {
        bid: id.to_string(),
        status: bid.status.to_string(),
    }
}

/// Final invariant gate before a record is handed to the store.
fn stage_escrow(
    batch: WriteBatch,
    key: EscrowKey,
    escrow: Escrow,
) -> Result<WriteBatch, EscrowError> {
    escrow.check_invariant()?;
    Ok(batch.put_escrow(key, escrow))
}

fn log_outcome(
    op: &'static str,
    result: Result<ContractEvent, EscrowError>,
) -> Result<ContractEvent, EscrowError> {
    match &result {
        Ok(event) => info!(
            op,
            escrow = %event.escrow(),
            amount = event.amount(),
            "Escrow operation applied"
        ),
        Err(err) => debug!(op, error = %err, "Escrow operation rejected"),
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{StoreError, TransferError};
    use crate::store::MemoryStore;
    use crate::transfer::InMemoryLedger;
    use types::account::BidStatus;

    const AIRDROP: Lamports = 1_000_000_000;

    struct Fixture {
        engine: EscrowEngine<MemoryStore, InMemoryLedger>,
        owner: AccountId,
        bidder: AccountId,
        key: EscrowKey,
    }

    fn setup() -> Fixture {
        let owner = AccountId::new();
        let bidder = AccountId::new();
        let mut ledger = InMemoryLedger::new();
        ledger.airdrop(owner, AIRDROP).unwrap();
        ledger.airdrop(bidder, AIRDROP).unwrap();
        let engine = EscrowEngine::with_defaults(MemoryStore::new(), ledger);
        let key = engine.escrow_key(&owner);
        Fixture {
            engine,
            owner,
            bidder,
            key,
        }
    }

    fn setup_initialized(initial: Lamports) -> Fixture {
        let mut f = setup();
        f.engine.initialize(&f.owner, initial).unwrap();
        f
    }

    fn wallet(f: &Fixture, id: &AccountId) -> Lamports {
        f.engine.ledger().balance_of(&Address::Wallet(*id))
    }

    // ─── Initialize ───

    #[test]
    fn test_initialize_creates_escrow() {
        let mut f = setup();
        let event = f.engine.initialize(&f.owner, 2_000_000).unwrap();
        assert!(matches!(event, ContractEvent::EscrowInitialized(_)));

        let escrow = f.engine.escrow(&f.key).unwrap();
        assert_eq!(escrow.owner, f.owner);
        assert_eq!(escrow.deposited_amount, 2_000_000);
        assert_eq!(escrow.locked_amount, 0);
        assert_eq!(wallet(&f, &f.owner), AIRDROP - 2_000_000);
        assert_eq!(
            f.engine.ledger().balance_of(&Address::Escrow(f.key)),
            2_000_000
        );
    }

    #[test]
    fn test_initialize_twice_rejected() {
        let mut f = setup_initialized(2_000_000);
        let result = f.engine.initialize(&f.owner, 1);
        assert!(matches!(
            result,
            Err(EscrowError::AlreadyExists { record: "Escrow", .. })
        ));
        assert_eq!(f.engine.escrow(&f.key).unwrap().deposited_amount, 2_000_000);
    }

    #[test]
    fn test_initialize_zero_rejected() {
        let mut f = setup();
        assert_eq!(f.engine.initialize(&f.owner, 0), Err(EscrowError::InvalidAmount));
        assert!(f.engine.escrow(&f.key).is_none());
    }

    #[test]
    fn test_initialize_unfunded_owner_creates_nothing() {
        let mut f = setup();
        let pauper = AccountId::new();
        let result = f.engine.initialize(&pauper, 10);
        assert!(matches!(result, Err(EscrowError::Transfer(_))));
        assert!(f.engine.escrow(&f.engine.escrow_key(&pauper)).is_none());
    }

    #[test]
    fn test_namespace_changes_key() {
        let f = setup();
        let engine = EscrowEngine::new(
            EngineConfig {
                namespace: "auction".to_string(),
            },
            MemoryStore::new(),
            InMemoryLedger::new(),
        );
        assert_ne!(engine.escrow_key(&f.owner), f.key);
    }

    // ─── Deposit / withdraw ───

    #[test]
    fn test_deposit_accumulates() {
        let mut f = setup_initialized(2_000_000);
        f.engine.deposit(&f.owner, &f.key, 500_000).unwrap();
        assert_eq!(f.engine.escrow(&f.key).unwrap().deposited_amount, 2_500_000);
    }

    #[test]
    fn test_deposit_unauthorized_before_amount_check() {
        let mut f = setup_initialized(2_000_000);
        let result = f.engine.deposit(&f.bidder, &f.key, 0);
        assert!(matches!(result, Err(EscrowError::Unauthorized { role: Role::EscrowOwner, .. })));
    }

    #[test]
    fn test_deposit_zero_rejected() {
        let mut f = setup_initialized(2_000_000);
        assert_eq!(
            f.engine.deposit(&f.owner, &f.key, 0),
            Err(EscrowError::InvalidAmount)
        );
    }

    #[test]
    fn test_deposit_unknown_escrow() {
        let mut f = setup();
        assert!(matches!(
            f.engine.deposit(&f.owner, &f.key, 1),
            Err(EscrowError::NotFound { record: "Escrow", .. })
        ));
    }

    #[test]
    fn test_withdraw_limited_to_available() {
        let mut f = setup_initialized(1_000_000);
        f.engine
            .place_bid(&f.bidder, &f.key, BidId::new(), 600_000)
            .unwrap();

        let result = f.engine.withdraw(&f.owner, &f.key, 400_001);
        assert_eq!(
            result,
            Err(EscrowError::InsufficientFunds {
                required: 400_001,
                available: 400_000
            })
        );

        f.engine.withdraw(&f.owner, &f.key, 400_000).unwrap();
        let escrow = f.engine.escrow(&f.key).unwrap();
        assert_eq!(escrow.deposited_amount, 600_000);
        assert_eq!(escrow.locked_amount, 600_000);
        assert_eq!(wallet(&f, &f.owner), AIRDROP - 600_000);
    }

    #[test]
    fn test_withdraw_unauthorized() {
        let mut f = setup_initialized(1_000_000);
        assert!(matches!(
            f.engine.withdraw(&f.bidder, &f.key, 1),
            Err(EscrowError::Unauthorized { .. })
        ));
        assert_eq!(f.engine.escrow(&f.key).unwrap().deposited_amount, 1_000_000);
    }

    #[test]
    fn test_withdraw_to_zero_keeps_record() {
        let mut f = setup_initialized(1_000_000);
        f.engine.withdraw(&f.owner, &f.key, 1_000_000).unwrap();
        let escrow = f.engine.escrow(&f.key).unwrap();
        assert_eq!(escrow.deposited_amount, 0);
        assert_eq!(f.engine.available(&f.key).unwrap(), 0);
    }

    // ─── Bids ───

    #[test]
    fn test_place_bid_locks_without_transfer() {
        let mut f = setup_initialized(2_500_000);
        let transfers_before = f.engine.ledger().transfers().len();
        let bid_id = BidId::new();

        f.engine.place_bid(&f.bidder, &f.key, bid_id, 200_000).unwrap();

        let bid = f.engine.bid(&bid_id).unwrap();
        assert!(bid.is_active());
        assert_eq!(bid.amount, 200_000);
        assert_eq!(bid.bidder, f.bidder);
        let escrow = f.engine.escrow(&f.key).unwrap();
        assert_eq!(escrow.locked_amount, 200_000);
        assert_eq!(escrow.deposited_amount, 2_500_000);
        assert_eq!(f.engine.ledger().transfers().len(), transfers_before);
    }

    #[test]
    fn test_place_bid_exceeding_available() {
        let mut f = setup_initialized(1_000);
        let bid_id = BidId::new();
        assert!(matches!(
            f.engine.place_bid(&f.bidder, &f.key, bid_id, 1_001),
            Err(EscrowError::InsufficientFunds { .. })
        ));
        assert!(f.engine.bid(&bid_id).is_none());
    }

    #[test]
    fn test_place_bid_duplicate_key() {
        let mut f = setup_initialized(1_000);
        let bid_id = BidId::new();
        f.engine.place_bid(&f.bidder, &f.key, bid_id, 10).unwrap();
        assert!(matches!(
            f.engine.place_bid(&f.bidder, &f.key, bid_id, 10),
            Err(EscrowError::AlreadyExists { record: "Bid", .. })
        ));
        assert_eq!(f.engine.escrow(&f.key).unwrap().locked_amount, 10);
    }

    #[test]
    fn test_place_bid_zero() {
        let mut f = setup_initialized(1_000);
        assert_eq!(
            f.engine.place_bid(&f.bidder, &f.key, BidId::new(), 0),
            Err(EscrowError::InvalidAmount)
        );
    }

    #[test]
    fn test_cancel_bid_refunds_bidder() {
        let mut f = setup_initialized(2_500_000);
        let bid_id = BidId::new();
        f.engine.place_bid(&f.bidder, &f.key, bid_id, 200_000).unwrap();

        f.engine.cancel_bid(&f.bidder, &bid_id).unwrap();

        assert_eq!(f.engine.bid(&bid_id).unwrap().status, BidStatus::Cancelled);
        let escrow = f.engine.escrow(&f.key).unwrap();
        assert_eq!(escrow.locked_amount, 0);
        assert_eq!(escrow.deposited_amount, 2_300_000);
        assert_eq!(wallet(&f, &f.bidder), AIRDROP + 200_000);
    }

    #[test]
    fn test_cancel_bid_by_other_rejected() {
        let mut f = setup_initialized(2_500_000);
        let bid_id = BidId::new();
        f.engine.place_bid(&f.bidder, &f.key, bid_id, 200_000).unwrap();

        let result = f.engine.cancel_bid(&f.owner, &bid_id);
        assert!(matches!(
            result,
            Err(EscrowError::Unauthorized { role: Role::Bidder, .. })
        ));
        assert!(f.engine.bid(&bid_id).unwrap().is_active());
    }

    #[test]
    fn test_cancel_twice_rejected() {
        let mut f = setup_initialized(2_500_000);
        let bid_id = BidId::new();
        f.engine.place_bid(&f.bidder, &f.key, bid_id, 200_000).unwrap();
        f.engine.cancel_bid(&f.bidder, &bid_id).unwrap();

        assert!(matches!(
            f.engine.cancel_bid(&f.bidder, &bid_id),
            Err(EscrowError::InvalidState { .. })
        ));
        assert_eq!(f.engine.escrow(&f.key).unwrap().deposited_amount, 2_300_000);
    }

    #[test]
    fn test_cancel_unknown_bid() {
        let mut f = setup_initialized(1_000);
        assert!(matches!(
            f.engine.cancel_bid(&f.bidder, &BidId::new()),
            Err(EscrowError::NotFound { record: "Bid", .. })
        ));
    }

    #[test]
    fn test_resolve_bid_pays_recipient() {
        let mut f = setup_initialized(2_300_000);
        let bid_id = BidId::new();
        let seller = AccountId::new();
        f.engine.place_bid(&f.bidder, &f.key, bid_id, 300_000).unwrap();

        f.engine.resolve_bid(&f.owner, &bid_id, &seller).unwrap();

        assert_eq!(
            f.engine.bid(&bid_id).unwrap().status,
            BidStatus::Resolved { recipient: seller }
        );
        let escrow = f.engine.escrow(&f.key).unwrap();
        assert_eq!(escrow.locked_amount, 0);
        assert_eq!(escrow.deposited_amount, 2_000_000);
        assert_eq!(wallet(&f, &seller), 300_000);
    }

    #[test]
    fn test_resolve_by_bidder_rejected() {
        let mut f = setup_initialized(1_000);
        let bid_id = BidId::new();
        f.engine.place_bid(&f.bidder, &f.key, bid_id, 500).unwrap();
        assert!(matches!(
            f.engine.resolve_bid(&f.bidder, &bid_id, &f.bidder),
            Err(EscrowError::Unauthorized { role: Role::EscrowOwner, .. })
        ));
    }

    #[test]
    fn test_resolve_after_cancel_rejected() {
        let mut f = setup_initialized(1_000);
        let bid_id = BidId::new();
        f.engine.place_bid(&f.bidder, &f.key, bid_id, 500).unwrap();
        f.engine.cancel_bid(&f.bidder, &bid_id).unwrap();

        assert!(matches!(
            f.engine.resolve_bid(&f.owner, &bid_id, &f.owner),
            Err(EscrowError::InvalidState { .. })
        ));
        let escrow = f.engine.escrow(&f.key).unwrap();
        assert_eq!(escrow.deposited_amount, 500);
        assert_eq!(escrow.locked_amount, 0);
    }

    // ─── Failure atomicity ───

    #[test]
    fn test_transfer_failure_leaves_records() {
        let mut f = setup_initialized(2_500_000);
        let bid_id = BidId::new();
        f.engine.place_bid(&f.bidder, &f.key, bid_id, 200_000).unwrap();
        let escrow_before = f.engine.escrow(&f.key).unwrap();

        f.engine.ledger_mut().fail_next_transfer(TransferError::Rejected {
            reason: "ledger unavailable".to_string(),
        });
        let result = f.engine.cancel_bid(&f.bidder, &bid_id);

        assert!(matches!(result, Err(EscrowError::Transfer(_))));
        assert_eq!(f.engine.escrow(&f.key).unwrap(), escrow_before);
        assert!(f.engine.bid(&bid_id).unwrap().is_active());
    }

    #[test]
    fn test_commit_failure_reverses_transfer() {
        let owner = AccountId::new();
        let mut ledger = InMemoryLedger::new();
        ledger.airdrop(owner, 1_000).unwrap();
        let mut store = MemoryStore::new();
        store.fail_next_commit("disk full");
        let mut engine = EscrowEngine::with_defaults(store, ledger);
        let key = engine.escrow_key(&owner);

        let result = engine.initialize(&owner, 400);

        assert!(matches!(
            result,
            Err(EscrowError::Store(StoreError::CommitRejected { .. }))
        ));
        assert!(engine.escrow(&key).is_none());
        assert_eq!(engine.ledger().balance_of(&Address::Wallet(owner)), 1_000);
        assert_eq!(engine.ledger().balance_of(&Address::Escrow(key)), 0);
    }

    // ─── Reconcile ───

    #[test]
    fn test_reconcile_consistent_escrow() {
        let mut f = setup_initialized(2_000_000);
        f.engine
            .place_bid(&f.bidder, &f.key, BidId::new(), 300_000)
            .unwrap();
        f.engine
            .place_bid(&f.bidder, &f.key, BidId::new(), 200_000)
            .unwrap();

        let report = f.engine.reconcile(&f.key).unwrap();
        assert_eq!(report.deposited_amount, 2_000_000);
        assert_eq!(report.locked_amount, 500_000);
        assert_eq!(report.available, 1_500_000);
        assert_eq!(report.active_bid_total, 500_000);
        assert_eq!(report.active_bids, 2);
        assert_eq!(report.custody_balance, 2_000_000);
    }

    #[test]
    fn test_reconcile_detects_custody_drift() {
        let mut f = setup_initialized(2_000_000);
        // Custody drained behind the engine's back.
        let key = f.key;
        let owner = f.owner;
        f.engine
            .ledger_mut()
            .transfer(&Address::Escrow(key), &Address::Wallet(owner), 1)
            .unwrap();

        assert!(matches!(
            f.engine.reconcile(&f.key),
            Err(EscrowError::InvariantViolation { .. })
        ));
    }
}
