//! Seeded workload generator
//!
//! Produces a stream of escrow actions over a fixed cast of owners and
//! bidders. The stream depends only on the seed: identities and bid ids are
//! drawn from the same `ChaCha8Rng` that picks the actions.
//!
//! A share of the actions is deliberately invalid (wrong signer, zero or
//! oversized amount, replay of a settled bid) so rejection paths are
//! exercised alongside the happy path.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use types::ids::{AccountId, BidId};
use types::numeric::{Lamports, LAMPORTS_PER_SOL};
use uuid::Uuid;

/// Configuration for a simulation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// RNG seed; equal seeds produce identical runs
    pub seed: u64,
    /// Number of escrow owners
    pub owners: usize,
    /// Number of bidders
    pub bidders: usize,
    /// Actions to generate
    pub steps: usize,
    /// Lamports airdropped to every owner and bidder before the run
    pub airdrop: Lamports,
    /// Upper bound on a single generated amount
    pub max_amount: Lamports,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            owners: 4,
            bidders: 8,
            steps: 1_000,
            airdrop: 100 * LAMPORTS_PER_SOL,
            max_amount: 5 * LAMPORTS_PER_SOL,
        }
    }
}

/// One generated operation. Escrows are named by their owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Deposit {
        caller: AccountId,
        owner: AccountId,
        amount: Lamports,
    },
    Withdraw {
        caller: AccountId,
        owner: AccountId,
        amount: Lamports,
    },
    PlaceBid {
        bidder: AccountId,
        owner: AccountId,
        bid: BidId,
        amount: Lamports,
    },
    CancelBid {
        caller: AccountId,
        bid: BidId,
    },
    ResolveBid {
        caller: AccountId,
        bid: BidId,
        recipient: AccountId,
    },
}

impl Action {
    /// Operation name, matching the engine's event labels.
    pub fn label(&self) -> &'static str {
        match self {
            Action::Deposit { .. } => "deposit",
            Action::Withdraw { .. } => "withdraw",
            Action::PlaceBid { .. } => "place_bid",
            Action::CancelBid { .. } => "cancel_bid",
            Action::ResolveBid { .. } => "resolve_bid",
        }
    }
}

/// Bid issued by the generator, remembered for later cancel/resolve actions.
#[derive(Debug, Clone, Copy)]
struct IssuedBid {
    id: BidId,
    bidder: AccountId,
    owner: AccountId,
}

/// Probability that an action is signed by the wrong account.
const WRONG_SIGNER_RATIO: f64 = 0.05;
/// Probability that an amount is zero.
const ZERO_AMOUNT_RATIO: f64 = 0.03;

/// Deterministic action generator.
pub struct Workload {
    owners: Vec<AccountId>,
    bidders: Vec<AccountId>,
    issued: Vec<IssuedBid>,
    max_amount: Lamports,
    rng: ChaCha8Rng,
}

impl Workload {
    /// Create a generator and draw its cast from the seed.
    pub fn new(config: &SimConfig) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let owners = (0..config.owners.max(1))
            .map(|_| AccountId::from_uuid(Uuid::from_bytes(rng.gen())))
            .collect();
        let bidders = (0..config.bidders.max(1))
            .map(|_| AccountId::from_uuid(Uuid::from_bytes(rng.gen())))
            .collect();
        Self {
            owners,
            bidders,
            issued: Vec::new(),
            max_amount: config.max_amount.max(1),
            rng,
        }
    }

    pub fn owners(&self) -> &[AccountId] {
        &self.owners
    }

    pub fn bidders(&self) -> &[AccountId] {
        &self.bidders
    }

    /// Number of bid ids handed out so far.
    pub fn issued_bids(&self) -> usize {
        self.issued.len()
    }

    /// Generate the next action.
    pub fn next_action(&mut self) -> Action {
        // Without any bids yet, only escrow funding and new bids make sense
        let roll = if self.issued.is_empty() {
            self.rng.gen_range(0..50)
        } else {
            self.rng.gen_range(0..100)
        };

        match roll {
            0..=14 => {
                let owner = self.pick_owner();
                Action::Deposit {
                    caller: self.signer_for(owner),
                    owner,
                    amount: self.amount(),
                }
            }
            15..=24 => {
                let owner = self.pick_owner();
                Action::Withdraw {
                    caller: self.signer_for(owner),
                    owner,
                    amount: self.amount(),
                }
            }
            25..=59 => self.place_bid(),
            60..=79 => {
                let bid = self.pick_issued();
                Action::CancelBid {
                    caller: self.signer_for(bid.bidder),
                    bid: bid.id,
                }
            }
            _ => {
                let bid = self.pick_issued();
                let recipient = if self.rng.gen_bool(0.5) {
                    bid.bidder
                } else {
                    self.pick_bidder()
                };
                Action::ResolveBid {
                    caller: self.signer_for(bid.owner),
                    bid: bid.id,
                    recipient,
                }
            }
        }
    }

    fn place_bid(&mut self) -> Action {
        let owner = self.pick_owner();
        let bidder = self.pick_bidder();
        // Occasionally replay an existing id to exercise the duplicate check
        let replay = if !self.issued.is_empty() && self.rng.gen_bool(0.02) {
            Some(self.pick_issued().id)
        } else {
            None
        };
        let id = match replay {
            Some(id) => id,
            None => {
                let id = BidId::from_uuid(Uuid::from_bytes(self.rng.gen()));
                self.issued.push(IssuedBid { id, bidder, owner });
                id
            }
        };
        Action::PlaceBid {
            bidder,
            owner,
            bid: id,
            amount: self.amount(),
        }
    }

    fn pick_owner(&mut self) -> AccountId {
        let i = self.rng.gen_range(0..self.owners.len());
        self.owners[i]
    }

    fn pick_bidder(&mut self) -> AccountId {
        let i = self.rng.gen_range(0..self.bidders.len());
        self.bidders[i]
    }

    fn pick_issued(&mut self) -> IssuedBid {
        let i = self.rng.gen_range(0..self.issued.len());
        self.issued[i]
    }

    /// The rightful signer most of the time, someone else otherwise.
    fn signer_for(&mut self, rightful: AccountId) -> AccountId {
        if self.rng.gen_bool(WRONG_SIGNER_RATIO) {
            let other = self.pick_bidder();
            if other != rightful {
                return other;
            }
            return self.pick_owner();
        }
        rightful
    }

    fn amount(&mut self) -> Lamports {
        if self.rng.gen_bool(ZERO_AMOUNT_RATIO) {
            return 0;
        }
        self.rng.gen_range(1..=self.max_amount)
    }
}
