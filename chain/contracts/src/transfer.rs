//! Fund transfer primitive
//!
//! The engine never holds value itself. It asks a [`FundTransfer`]
//! implementation to move lamports atomically between two addresses; the
//! surrounding ledger owns the balances. [`InMemoryLedger`] is the
//! implementation used by tests and the simulation tool.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;
use types::ids::{AccountId, Address};
use types::numeric::Lamports;

use crate::errors::TransferError;

/// Atomic value movement between two balances.
pub trait FundTransfer {
    /// Move `amount` from `from` to `to`. Either both sides change or neither.
    fn transfer(
        &mut self,
        from: &Address,
        to: &Address,
        amount: Lamports,
    ) -> Result<(), TransferError>;

    /// Current balance held at `address`.
    fn balance_of(&self, address: &Address) -> Lamports;
}

/// One applied transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub from: Address,
    pub to: Address,
    pub amount: Lamports,
}

/// Ledger keeping balances in memory.
///
/// Wallets are funded through [`InMemoryLedger::airdrop`]. A single failure
/// can be queued with [`InMemoryLedger::fail_next_transfer`] to exercise
/// error paths.
#[derive(Debug, Default, Clone)]
pub struct InMemoryLedger {
    balances: BTreeMap<Address, Lamports>,
    log: Vec<TransferRecord>,
    pending_failure: Option<TransferError>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint `amount` into a wallet.
    pub fn airdrop(&mut self, account: AccountId, amount: Lamports) -> Result<(), TransferError> {
        let address = Address::Wallet(account);
        let current = self.balance_of(&address);
        let updated = current
            .checked_add(amount)
            .ok_or_else(|| TransferError::Overflow {
                address: address.to_string(),
            })?;
        self.balances.insert(address, updated);
        debug!(%account, amount, balance = updated, "Airdrop credited");
        Ok(())
    }

    /// Make the next `transfer` call fail with `err` without moving funds.
    pub fn fail_next_transfer(&mut self, err: TransferError) {
        self.pending_failure = Some(err);
    }

    /// Every transfer applied so far, oldest first.
    pub fn transfers(&self) -> &[TransferRecord] {
        &self.log
    }

    /// Sum of every balance in the ledger.
    pub fn total_supply(&self) -> u128 {
        self.balances.values().map(|b| *b as u128).sum()
    }
}

impl FundTransfer for InMemoryLedger {
    fn transfer(
        &mut self,
        from: &Address,
        to: &Address,
        amount: Lamports,
    ) -> Result<(), TransferError> {
        if let Some(err) = self.pending_failure.take() {
            return Err(err);
        }

        let from_balance = self.balance_of(from);
        if from_balance < amount {
            return Err(TransferError::InsufficientBalance {
                address: from.to_string(),
                required: amount,
                available: from_balance,
            });
        }

        if from != to {
            let to_balance = self
                .balance_of(to)
                .checked_add(amount)
                .ok_or_else(|| TransferError::Overflow {
                    address: to.to_string(),
                })?;
            self.balances.insert(*from, from_balance - amount);
            self.balances.insert(*to, to_balance);
        }

        self.log.push(TransferRecord {
            from: *from,
            to: *to,
            amount,
        });
        Ok(())
    }

    fn balance_of(&self, address: &Address) -> Lamports {
        self.balances.get(address).copied().unwrap_or(0)
    }
}
