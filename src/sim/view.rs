//! Render snapshots
//!
//! Read-only copies of simulation state for a presentation layer. Built on
//! demand; the simulations never copy their buffers on their own.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::agent::{Agent, Food, Role};
use super::arena::{ArenaGame, GameMode, Outcome};
use super::body::{Body, EntityId};
use super::plinko::PlinkoGame;
use super::pusher::{CoinMeta, PusherGame, PusherPhase};
use crate::config::RiskTier;
use crate::standings::StandingEntry;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyView {
    pub id: EntityId,
    pub pos: Vec2,
    pub radius: f32,
    /// Visual rotation in degrees (coins only)
    pub angle: f32,
    /// Freshly inserted, drawn highlighted
    pub fresh: bool,
}

impl BodyView {
    fn plain(body: &Body) -> Self {
        Self {
            id: body.id,
            pos: body.pos,
            radius: body.radius,
            angle: 0.0,
            fresh: false,
        }
    }

    fn coin(body: &Body, meta: &CoinMeta) -> Self {
        Self {
            angle: meta.angle,
            fresh: meta.is_new(),
            ..Self::plain(body)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentView {
    pub id: EntityId,
    pub name: String,
    pub role: Role,
    pub palette: u8,
    /// Head first
    pub segments: Vec<Vec2>,
    pub width: f32,
    pub heading: f32,
    pub score: u32,
    pub boosting: bool,
    pub invulnerable: bool,
    pub alive: bool,
}

impl From<&Agent> for AgentView {
    fn from(agent: &Agent) -> Self {
        Self {
            id: agent.id,
            name: agent.name.clone(),
            role: agent.role,
            palette: agent.palette,
            segments: agent.segments().iter().copied().collect(),
            width: agent.width,
            heading: agent.heading,
            score: agent.score,
            boosting: agent.boosting,
            invulnerable: agent.is_invulnerable(),
            alive: agent.alive,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodView {
    pub pos: Vec2,
    pub size: f32,
    pub value: u32,
}

impl From<&Food> for FoodView {
    fn from(food: &Food) -> Self {
        Self {
            pos: food.pos,
            size: food.size,
            value: food.value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PusherFrame {
    pub tick: u64,
    pub running: bool,
    /// Current z of the pusher face
    pub pusher_z: f32,
    pub coins: Vec<BodyView>,
    pub total_paid: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlinkoFrame {
    pub rows: u32,
    pub risk: RiskTier,
    pub width: f32,
    pub height: f32,
    pub pegs: Vec<Vec2>,
    pub peg_radius: f32,
    pub bucket_y: f32,
    pub bucket_centers: Vec<f32>,
    pub multipliers: Vec<f64>,
    pub balls: Vec<BodyView>,
    pub bet: f64,
    pub auto_drop: bool,
    /// Newest first
    pub history: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArenaFrame {
    pub tick: u64,
    pub mode: GameMode,
    pub outcome: Outcome,
    pub world_size: f32,
    /// World position of the viewport's top-left corner
    pub camera: Vec2,
    pub lock_on: Option<Vec2>,
    pub agents: Vec<AgentView>,
    pub foods: Vec<FoodView>,
    pub standings: Vec<StandingEntry>,
    /// Top of the board, shown as the crown
    pub leader: Option<StandingEntry>,
    /// Board position of the primary human (1-indexed), None when off the board
    pub player_rank: Option<usize>,
}

impl PusherGame {
    pub fn frame(&self) -> PusherFrame {
        PusherFrame {
            tick: self.ticks(),
            running: self.phase() == PusherPhase::Running,
            pusher_z: self.pusher_z(),
            coins: self
                .coins()
                .iter()
                .zip(self.coin_meta())
                .map(|(body, meta)| BodyView::coin(body, meta))
                .collect(),
            total_paid: self.settlements().total_paid(),
        }
    }
}

impl PlinkoGame {
    pub fn frame(&self) -> PlinkoFrame {
        let geo = self.geometry();
        PlinkoFrame {
            rows: geo.rows,
            risk: self.risk(),
            width: geo.width,
            height: geo.height,
            pegs: geo.pegs().map(|(_, _, pos)| pos).collect(),
            peg_radius: geo.peg_radius,
            bucket_y: geo.bucket_y,
            bucket_centers: (0..geo.bucket_count()).map(|i| geo.bucket_center_x(i)).collect(),
            multipliers: self.multipliers().to_vec(),
            balls: self.balls().iter().map(BodyView::plain).collect(),
            bet: self.bet(),
            auto_drop: self.auto_drop(),
            history: self.history().collect(),
        }
    }
}

impl ArenaGame {
    pub fn frame(&self) -> ArenaFrame {
        ArenaFrame {
            tick: self.ticks(),
            mode: self.mode(),
            outcome: self.outcome(),
            world_size: self.world_size(),
            camera: self.camera().offset,
            lock_on: self.lock_on(),
            agents: self.agents().iter().map(AgentView::from).collect(),
            foods: self.foods().iter().map(FoodView::from).collect(),
            standings: self.standings().entries.clone(),
            leader: self.standings().leader().cloned(),
            player_rank: self
                .player_id()
                .and_then(|id| self.standings().rank_of(id)),
        }
    }
}
