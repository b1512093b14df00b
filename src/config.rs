//! Simulation configuration
//!
//! Every tunable knob the engines read lives here, with its default. The
//! presentation layer resolves things like viewport size and hands the whole
//! struct in at construction; nothing inside `sim` reads ambient state.

use std::str::FromStr;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

/// Plinko risk tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub enum RiskTier {
    Low,
    #[default]
    Medium,
    High,
}

impl RiskTier {
    /// All tiers, lowest risk first
    pub const ALL: [RiskTier; 3] = [RiskTier::Low, RiskTier::Medium, RiskTier::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTier::Low => "Low",
            RiskTier::Medium => "Medium",
            RiskTier::High => "High",
        }
    }
}

impl FromStr for RiskTier {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(RiskTier::Low),
            "medium" | "med" => Ok(RiskTier::Medium),
            "high" => Ok(RiskTier::High),
            other => Err(SimError::InvalidConfiguration(format!(
                "unknown risk tier: {other}"
            ))),
        }
    }
}

/// Smallest plinko board
pub const MIN_ROWS: u32 = 8;
/// Largest plinko board
pub const MAX_ROWS: u32 = 16;
/// Longest agent a config may spawn
pub const MAX_AGENT_LENGTH: u32 = 1000;
/// Largest food population the spawner keeps
pub const MAX_FOOD_TARGET: u32 = 5000;
/// Steepest gravity per tick
pub const MAX_GRAVITY: f32 = 50.0;
/// Most dropped bodies a machine holds at once
pub const MAX_ACTIVE_BODIES: usize = 5000;

/// All tunable simulation knobs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    // === Arena ===
    /// Side length of the square arena
    pub world_size: f32,
    /// Target bot population
    pub bot_count: u32,
    /// Segment count of a freshly spawned agent
    pub initial_agent_length: u32,
    /// Distance an agent head travels per tick
    pub base_speed: f32,
    /// Speed multiplier while boosting
    pub boost_speed_multiplier: f32,
    /// Maximum heading change per tick (radians)
    pub turn_rate_per_tick: f32,
    /// Food population the spawner tops up to
    pub food_target_count: u32,
    /// Visible viewport, resolved by the presentation layer
    pub viewport_width: f32,
    pub viewport_height: f32,

    // === Drop physics (plinko / pusher) ===
    /// Downward acceleration per tick
    pub gravity: f32,
    /// Fraction of speed kept after a peg bounce
    pub restitution: f32,
    /// Fraction of speed kept after a wall bounce
    pub wall_restitution: f32,
    /// Per-tick velocity damping factor
    pub air_resistance: f32,
    /// Cap on simultaneously active dropped bodies
    pub max_active_bodies: usize,
    /// Plinko board width (height follows from rows)
    pub plinko_board_width: f32,
    /// Let plinko balls collide with each other
    pub plinko_ball_collisions: bool,
    /// Number of peg rows
    pub rows: u32,
    pub risk_tier: RiskTier,
    /// Price of one pusher coin
    pub pusher_coin_value: f64,

    /// RNG seed for the session
    pub seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            world_size: 3000.0,
            bot_count: 15,
            initial_agent_length: 25,
            base_speed: 3.5,
            boost_speed_multiplier: 2.0,
            turn_rate_per_tick: 0.12,
            food_target_count: 300,
            viewport_width: 800.0,
            viewport_height: 600.0,

            gravity: 0.3,
            restitution: 0.6,
            wall_restitution: 0.5,
            air_resistance: 0.995,
            max_active_bodies: 400,
            plinko_board_width: 800.0,
            plinko_ball_collisions: true,
            rows: 16,
            risk_tier: RiskTier::Medium,
            pusher_coin_value: 10.0,

            seed: 0x5EED_CAFE,
        }
    }
}

/// A check on one field: its name and whether the current value is usable
type FieldCheck = (&'static str, bool);

impl SimConfig {
    /// Parse a JSON config; missing fields take their defaults
    pub fn from_json(json: &str) -> SimResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| SimError::InvalidConfiguration(format!("malformed config: {e}")))
    }

    pub fn to_json(&self) -> SimResult<String> {
        serde_json::to_string(self)
            .map_err(|e| SimError::InvalidConfiguration(format!("unserializable config: {e}")))
    }

    fn checks(&self) -> [FieldCheck; 17] {
        let positive = |v: f32| v.is_finite() && v > 0.0;
        let unit_open = |v: f32| v.is_finite() && v > 0.0 && v < 1.0;
        [
            ("world_size", positive(self.world_size) && self.world_size >= 400.0),
            ("initial_agent_length", (1..=MAX_AGENT_LENGTH).contains(&self.initial_agent_length)),
            ("base_speed", positive(self.base_speed)),
            ("boost_speed_multiplier", self.boost_speed_multiplier.is_finite() && self.boost_speed_multiplier >= 1.0),
            ("turn_rate_per_tick", positive(self.turn_rate_per_tick) && self.turn_rate_per_tick <= std::f32::consts::PI),
            ("viewport_width", positive(self.viewport_width)),
            ("viewport_height", positive(self.viewport_height)),
            ("gravity", self.gravity.is_finite() && (0.0..=MAX_GRAVITY).contains(&self.gravity)),
            ("restitution", unit_open(self.restitution)),
            ("wall_restitution", unit_open(self.wall_restitution)),
            ("air_resistance", self.air_resistance.is_finite() && self.air_resistance > 0.0 && self.air_resistance <= 1.0),
            ("max_active_bodies", (1..=MAX_ACTIVE_BODIES).contains(&self.max_active_bodies)),
            ("plinko_board_width", positive(self.plinko_board_width) && self.plinko_board_width >= 200.0),
            ("rows", (MIN_ROWS..=MAX_ROWS).contains(&self.rows)),
            ("pusher_coin_value", self.pusher_coin_value.is_finite() && self.pusher_coin_value > 0.0),
            ("bot_count", self.bot_count <= 200),
            ("food_target_count", self.food_target_count <= MAX_FOOD_TARGET),
        ]
    }

    /// Report the first invalid field, if any
    pub fn validate(&self) -> SimResult<()> {
        match self.checks().iter().find(|(_, ok)| !ok) {
            Some((field, _)) => Err(SimError::InvalidConfiguration(format!(
                "{field} is out of range"
            ))),
            None => Ok(()),
        }
    }

    /// Replace every invalid field with its default, logging each fallback
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        let bad: Vec<&'static str> = self
            .checks()
            .iter()
            .filter(|(_, ok)| !ok)
            .map(|(field, _)| *field)
            .collect();

        for field in bad {
            warn!("Config field {field} invalid, falling back to default");
            match field {
                "world_size" => self.world_size = defaults.world_size,
                "initial_agent_length" => self.initial_agent_length = defaults.initial_agent_length,
                "base_speed" => self.base_speed = defaults.base_speed,
                "boost_speed_multiplier" => self.boost_speed_multiplier = defaults.boost_speed_multiplier,
                "turn_rate_per_tick" => self.turn_rate_per_tick = defaults.turn_rate_per_tick,
                "viewport_width" => self.viewport_width = defaults.viewport_width,
                "viewport_height" => self.viewport_height = defaults.viewport_height,
                "gravity" => self.gravity = defaults.gravity,
                "restitution" => self.restitution = defaults.restitution,
                "wall_restitution" => self.wall_restitution = defaults.wall_restitution,
                "air_resistance" => self.air_resistance = defaults.air_resistance,
                "max_active_bodies" => self.max_active_bodies = defaults.max_active_bodies,
                "plinko_board_width" => self.plinko_board_width = defaults.plinko_board_width,
                "rows" => {
                    // An unknown board has no multiplier table: fall back to the
                    // default board and tier together
                    self.rows = defaults.rows;
                    self.risk_tier = defaults.risk_tier;
                }
                "pusher_coin_value" => self.pusher_coin_value = defaults.pusher_coin_value,
                "bot_count" => self.bot_count = defaults.bot_count,
                "food_target_count" => self.food_target_count = defaults.food_target_count,
                _ => {}
            }
        }
        self
    }
}
