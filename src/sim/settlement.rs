//! Payout settlement
//!
//! Converts a resolved outcome (coin in the win zone, ball in a bucket) into a
//! wallet credit. The book remembers every body it has paid so an outcome is
//! credited exactly once even if removal logic runs twice.

use std::collections::HashSet;

use log::debug;
use serde::{Deserialize, Serialize};

use super::body::EntityId;
use crate::wallet::Wallet;

/// A resolved outcome and what it paid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    pub body_id: EntityId,
    pub stake: f64,
    pub multiplier: f64,
    pub payout: f64,
    pub reason: String,
}

/// Stake times multiplier, never negative
#[inline]
pub fn payout(stake: f64, multiplier: f64) -> f64 {
    (stake * multiplier).max(0.0)
}

/// Exactly-once settlement ledger
#[derive(Debug, Clone, Default)]
pub struct SettlementBook {
    settled: HashSet<EntityId>,
    total_paid: f64,
}

impl SettlementBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Settle `body_id` and credit the wallet.
    ///
    /// Returns `None` without touching the wallet if this body was settled
    /// before.
    pub fn settle(
        &mut self,
        wallet: &mut dyn Wallet,
        body_id: EntityId,
        stake: f64,
        multiplier: f64,
        reason: String,
    ) -> Option<Settlement> {
        if !self.settled.insert(body_id) {
            debug!("Body {body_id} already settled, ignoring");
            return None;
        }
        let amount = payout(stake, multiplier);
        if amount > 0.0 {
            wallet.credit(amount, &reason);
        }
        self.total_paid += amount;
        debug!("Settled body {body_id}: {stake} x {multiplier} = {amount}");
        Some(Settlement {
            body_id,
            stake,
            multiplier,
            payout: amount,
            reason,
        })
    }

    pub fn is_settled(&self, body_id: EntityId) -> bool {
        self.settled.contains(&body_id)
    }

    /// Sum of every payout so far
    pub fn total_paid(&self) -> f64 {
        self.total_paid
    }

    pub fn count(&self) -> usize {
        self.settled.len()
    }
}
