//! Simulation runner
//!
//! Funds the cast, opens one escrow per owner, then feeds the workload into
//! an [`EscrowEngine`]. After every step each escrow is reconciled against its
//! bids and its custody balance, and the ledger's total supply is checked.
//! Anything that does not add up is kept as a [`Violation`].

use escrow_contracts::engine::{EscrowEngine, ReconcileReport};
use escrow_contracts::errors::EscrowError;
use escrow_contracts::events::ContractEvent;
use escrow_contracts::store::MemoryStore;
use escrow_contracts::transfer::InMemoryLedger;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use types::ids::{AccountId, EscrowKey};

use crate::metrics::SimMetrics;
use crate::workload::{Action, SimConfig, Workload};

/// An invariant that failed to hold after a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub step: usize,
    pub escrow: Option<EscrowKey>,
    pub reason: String,
}

/// Deterministic escrow simulation.
pub struct Simulation {
    config: SimConfig,
    engine: EscrowEngine<MemoryStore, InMemoryLedger>,
    workload: Workload,
    escrows: Vec<EscrowKey>,
    supply: u128,
    metrics: SimMetrics,
    violations: Vec<Violation>,
    step: usize,
}

impl Simulation {
    /// Airdrop every account and open one escrow per owner with a quarter
    /// of its airdrop.
    pub fn new(config: SimConfig) -> Result<Self, EscrowError> {
        let workload = Workload::new(&config);
        let mut ledger = InMemoryLedger::new();
        for account in workload.owners().iter().chain(workload.bidders()) {
            ledger.airdrop(*account, config.airdrop)?;
        }
        let supply = ledger.total_supply();

        let mut engine = EscrowEngine::with_defaults(MemoryStore::new(), ledger);
        let mut metrics = SimMetrics::new();
        let initial = (config.airdrop / 4).max(1);
        let mut escrows = Vec::with_capacity(workload.owners().len());
        for owner in workload.owners() {
            let event = engine.initialize(owner, initial)?;
            metrics.record_event(&event);
            escrows.push(engine.escrow_key(owner));
        }

        info!(
            seed = config.seed,
            owners = workload.owners().len(),
            bidders = workload.bidders().len(),
            steps = config.steps,
            "Simulation initialized"
        );

        Ok(Self {
            config,
            engine,
            workload,
            escrows,
            supply,
            metrics,
            violations: Vec::new(),
            step: 0,
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn engine(&self) -> &EscrowEngine<MemoryStore, InMemoryLedger> {
        &self.engine
    }

    pub fn metrics(&self) -> &SimMetrics {
        &self.metrics
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Keys of every escrow opened by the simulation, in owner order.
    pub fn escrows(&self) -> &[EscrowKey] {
        &self.escrows
    }

    /// Generate and apply one action, then audit.
    pub fn step(&mut self) -> Result<ContractEvent, EscrowError> {
        let action = self.workload.next_action();
        let result = self.apply(&action);
        match &result {
            Ok(event) => self.metrics.record_event(event),
            Err(err) => {
                debug!(step = self.step, op = action.label(), error = %err, "Action rejected");
                self.metrics.record_rejection(action.label(), err);
            }
        }
        self.audit();
        self.step += 1;
        result
    }

    /// Run the configured number of steps.
    pub fn run(&mut self) -> &SimMetrics {
        for _ in 0..self.config.steps {
            // Rejections are expected and already counted
            let _ = self.step();
        }
        info!(
            seed = self.config.seed,
            summary = %self.metrics.summary(),
            "Simulation complete"
        );
        &self.metrics
    }

    /// Reconcile every escrow.
    pub fn reconcile_all(&self) -> Vec<Result<ReconcileReport, EscrowError>> {
        self.escrows
            .iter()
            .map(|key| self.engine.reconcile(key))
            .collect()
    }

    fn apply(&mut self, action: &Action) -> Result<ContractEvent, EscrowError> {
        match action {
            Action::Deposit {
                caller,
                owner,
                amount,
            } => {
                let key = self.key_of(owner);
                self.engine.deposit(caller, &key, *amount)
            }
            Action::Withdraw {
                caller,
                owner,
                amount,
            } => {
                let key = self.key_of(owner);
                self.engine.withdraw(caller, &key, *amount)
            }
            Action::PlaceBid {
                bidder,
                owner,
                bid,
                amount,
            } => {
                let key = self.key_of(owner);
                self.engine.place_bid(bidder, &key, *bid, *amount)
            }
            Action::CancelBid { caller, bid } => self.engine.cancel_bid(caller, bid),
            Action::ResolveBid {
                caller,
                bid,
                recipient,
            } => self.engine.resolve_bid(caller, bid, recipient),
        }
    }

    fn key_of(&self, owner: &AccountId) -> EscrowKey {
        self.engine.escrow_key(owner)
    }

    fn audit(&mut self) {
        let mut found = Vec::new();
        for (key, result) in self.escrows.iter().zip(self.reconcile_all()) {
            if let Err(err) = result {
                found.push(Violation {
                    step: self.step,
                    escrow: Some(*key),
                    reason: err.to_string(),
                });
            }
        }

        let supply = self.engine.ledger().total_supply();
        if supply != self.supply {
            found.push(Violation {
                step: self.step,
                escrow: None,
                reason: format!("total supply drifted from {} to {}", self.supply, supply),
            });
        }

        for violation in found {
            warn!(
                step = violation.step,
                reason = %violation.reason,
                "Invariant violation"
            );
            self.metrics.record_violation();
            self.violations.push(violation);
        }
    }
}
