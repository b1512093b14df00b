//! Error taxonomy
//!
//! Funding, configuration and capacity errors are synchronous and block only the
//! action that raised them. Numeric anomalies and stale references are contained
//! inside the tick: the offending entity is dropped and the loop keeps running.

use thiserror::Error;

use crate::sim::EntityId;

/// Errors surfaced by the simulation core.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    /// The wallet cannot cover the requested stake. Nothing was debited.
    #[error("insufficient funds: stake of {needed} not covered")]
    InsufficientFunds { needed: f64 },

    /// A configuration value or bet amount outside its valid range.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A body holds a non-finite or runaway position.
    #[error("numeric anomaly on entity {id}: {detail}")]
    NumericAnomaly { id: EntityId, detail: &'static str },

    /// An entity was looked up after it left the simulation.
    #[error("entity {0} is no longer active")]
    StaleReference(EntityId),

    /// The active-body cap is reached; the drop was refused before any debit.
    #[error("active body cap of {cap} reached")]
    CapacityReached { cap: usize },
}

pub type SimResult<T> = Result<T, SimError>;

impl SimError {
    /// Short message suitable for an inline feedback line.
    pub fn feedback(&self) -> &'static str {
        match self {
            SimError::InsufficientFunds { .. } => "Insufficient Funds",
            SimError::InvalidConfiguration(_) => "Invalid Bet",
            SimError::CapacityReached { .. } => "Machine Full",
            SimError::NumericAnomaly { .. } | SimError::StaleReference(_) => "",
        }
    }
}
