//! Live arena scoreboard
//!
//! Rebuilt from the agent list every tick and handed out with each frame.

use serde::{Deserialize, Serialize};

use crate::sim::EntityId;
use crate::sim::agent::{Agent, Role};

/// Number of agents shown on the board
pub const MAX_STANDINGS: usize = 5;

/// A single scoreboard row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandingEntry {
    pub id: EntityId,
    pub name: String,
    pub score: u32,
    pub role: Role,
    pub alive: bool,
}

/// Top agents by score
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Standings {
    pub entries: Vec<StandingEntry>,
}

impl Standings {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Replace the board with the best of `agents`. Ties keep the older
    /// agent (lower id) ahead.
    pub fn refresh<'a, I>(&mut self, agents: I)
    where
        I: IntoIterator<Item = &'a Agent>,
    {
        self.entries.clear();
        self.entries.extend(agents.into_iter().map(|a| StandingEntry {
            id: a.id,
            name: a.name.clone(),
            score: a.score,
            role: a.role,
            alive: a.alive,
        }));
        self.entries
            .sort_by(|a, b| b.score.cmp(&a.score).then(a.id.cmp(&b.id)));
        self.entries.truncate(MAX_STANDINGS);
    }

    /// Rank of an agent currently on the board (1-indexed)
    pub fn rank_of(&self, id: EntityId) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id).map(|i| i + 1)
    }

    pub fn leader(&self) -> Option<&StandingEntry> {
        self.entries.first()
    }
}
