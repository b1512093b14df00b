//! Events emitted by the simulations
//!
//! Everything here is advisory: the presentation layer drains the queue once
//! per frame to show feedback text, flash pegs and so on. Authoritative state
//! (balances, positions) never depends on whether events are consumed.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::agent::Role;
use super::body::EntityId;
use super::settlement::Settlement;

/// Why an agent died
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeathCause {
    /// Head left the arena
    Wall,
    /// Head ran into another agent's body
    Collision { other: EntityId },
    /// Head ran into its own tail
    SelfCollision,
    /// Removed for a non-finite position
    Anomaly,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// Status line text ("Nice! 3x", "Insufficient Funds")
    Feedback { text: String },

    /// Short-lived text anchored in world space ("+50", "CRASH!")
    FloatingText { pos: Vec2, text: String },

    /// A body was paid out
    Settled(Settlement),

    AgentDied {
        id: EntityId,
        cause: DeathCause,
        score: u32,
        food_dropped: usize,
    },

    AgentSpawned { id: EntityId, role: Role },

    /// An entity was dropped for a numeric anomaly, without payout
    Anomaly { id: EntityId, detail: String },

    /// A plinko ball touched a peg
    PegHit { row: u32, col: u32 },
}

impl GameEvent {
    pub fn feedback(text: impl Into<String>) -> Self {
        GameEvent::Feedback { text: text.into() }
    }
}
