//! Steering strategies
//!
//! Each agent carries one [`SteeringStrategy`], picked from its role at spawn.
//! A strategy turns the agent's view of the world into a [`Steer`]: the
//! heading it wants and whether it wants to boost. Bots use a priority list:
//! get away from walls, then dodge bodies ahead, then go for food.

use std::f32::consts::{FRAC_PI_2, PI};

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::agent::{Agent, Food, Role};
use super::grid::SpatialGrid;
use crate::{angle_delta, direction, heading_to, normalize_angle};

/// Distance from a wall at which bots turn away
pub const WALL_MARGIN: f32 = 100.0;
/// How far ahead bots look for bodies in their path
pub const FEELER_DISTANCE: f32 = 180.0;
/// A body segment this close to the feeler tip is a threat
pub const DANGER_RADIUS: f32 = 50.0;
/// Only every Nth segment of another agent is checked for threats
pub const THREAT_SAMPLE_STRIDE: usize = 4;
/// Agents whose head is farther than this (per axis) are ignored for threats
pub const THREAT_CULL_DISTANCE: f32 = 400.0;
/// Food sensing range (per axis)
pub const SENSE_RADIUS: f32 = 400.0;
/// Chance per tick of a random heading drift when no food is in range
pub const DRIFT_CHANCE: f64 = 0.05;
/// Largest random drift, either way (radians)
pub const DRIFT_AMPLITUDE: f32 = 0.5;
/// Turn-rate factor while boosting
pub const BOOST_TURN_FACTOR: f32 = 0.6;
/// Heading change used to escape a threat
pub const ESCAPE_TURN: f32 = PI / 1.5;

/// How an agent decides where to go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SteeringStrategy {
    /// Head toward the pointer (or lock-on target), world coordinates
    PointerFollow,
    /// Left/right keys rotate the heading directly
    KeyInput,
    /// Bot priority list
    AiForage,
}

impl SteeringStrategy {
    pub fn for_role(role: Role) -> Self {
        match role {
            Role::HumanPrimary => SteeringStrategy::PointerFollow,
            Role::HumanSecondary => SteeringStrategy::KeyInput,
            Role::Bot => SteeringStrategy::AiForage,
        }
    }
}

/// Which bot behavior produced a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    Manual,
    AvoidWall,
    AvoidThreat,
    Forage,
    Wander,
}

/// One tick's steering decision
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Steer {
    pub target_heading: f32,
    pub boost: bool,
    /// Set the heading outright instead of easing toward the target
    pub snap: bool,
    pub behavior: Behavior,
}

/// Human controls as seen by the steering layer
#[derive(Debug, Clone, Copy, Default)]
pub struct Controls {
    /// Pointer or lock-on target in world coordinates
    pub pointer_world: Option<Vec2>,
    pub pointer_boost: bool,
    pub turn_left: bool,
    pub turn_right: bool,
    pub key_boost: bool,
}

/// Read-only view of the arena used for sensing.
///
/// Built before any agent moves, so every decision in a tick sees the same
/// world regardless of update order.
pub struct Sensing<'a> {
    pub world_size: f32,
    pub agents: &'a [Agent],
    pub foods: &'a [Food],
    /// Grid over `foods`, same indices
    pub food_grid: &'a SpatialGrid,
}

impl Sensing<'_> {
    /// Smallest distance from `p` to any of the four walls
    pub fn wall_clearance(&self, p: Vec2) -> f32 {
        p.x.min(p.y)
            .min(self.world_size - p.x)
            .min(self.world_size - p.y)
    }

    /// True if the feeler tip is within the danger radius of another agent's
    /// body, sampling every few segments
    pub fn threat_ahead(&self, me: &Agent, feeler: Vec2) -> bool {
        let head = me.head();
        let danger_sq = DANGER_RADIUS * DANGER_RADIUS;
        self.agents
            .iter()
            .filter(|other| other.alive && other.id != me.id)
            .filter(|other| {
                let d = other.head() - head;
                d.x.abs() <= THREAT_CULL_DISTANCE && d.y.abs() <= THREAT_CULL_DISTANCE
            })
            .any(|other| {
                other
                    .segments()
                    .iter()
                    .step_by(THREAT_SAMPLE_STRIDE)
                    .any(|seg| seg.distance_squared(feeler) < danger_sq)
            })
    }

    /// Nearest food within the sensing box around `pos`
    pub fn nearest_food(&self, pos: Vec2) -> Option<Vec2> {
        let mut best: Option<(f32, Vec2)> = None;
        self.food_grid.for_each_within(pos, SENSE_RADIUS, |i| {
            let Some(food) = self.foods.get(i) else {
                return;
            };
            let d = food.pos - pos;
            if d.x.abs() > SENSE_RADIUS || d.y.abs() > SENSE_RADIUS {
                return;
            }
            let dist_sq = d.length_squared();
            if best.is_none_or(|(b, _)| dist_sq < b) {
                best = Some((dist_sq, food.pos));
            }
        });
        best.map(|(_, p)| p)
    }
}

/// Work out this tick's steering for `agent`
pub fn decide<R: Rng>(
    agent: &Agent,
    world: &Sensing<'_>,
    controls: &Controls,
    turn_rate: f32,
    rng: &mut R,
) -> Steer {
    match agent.steering {
        SteeringStrategy::PointerFollow => {
            let target_heading = controls
                .pointer_world
                .map(|p| heading_to(agent.head(), p))
                .unwrap_or(agent.target_heading);
            Steer {
                target_heading,
                boost: controls.pointer_boost,
                snap: false,
                behavior: Behavior::Manual,
            }
        }
        SteeringStrategy::KeyInput => {
            let mut heading = agent.heading;
            if controls.turn_left {
                heading -= turn_rate;
            }
            if controls.turn_right {
                heading += turn_rate;
            }
            Steer {
                target_heading: normalize_angle(heading),
                boost: controls.key_boost,
                snap: true,
                behavior: Behavior::Manual,
            }
        }
        SteeringStrategy::AiForage => ai_decide(agent, world, rng),
    }
}

fn ai_steer(target_heading: f32, boost: bool, behavior: Behavior) -> Steer {
    Steer {
        target_heading,
        boost,
        snap: false,
        behavior,
    }
}

/// Bot priority list; the first behavior that applies wins
fn ai_decide<R: Rng>(agent: &Agent, world: &Sensing<'_>, rng: &mut R) -> Steer {
    let head = agent.head();
    let far = world.world_size - WALL_MARGIN;

    if head.x < WALL_MARGIN {
        return ai_steer(0.0, false, Behavior::AvoidWall);
    } else if head.x > far {
        return ai_steer(PI, false, Behavior::AvoidWall);
    } else if head.y < WALL_MARGIN {
        return ai_steer(FRAC_PI_2, false, Behavior::AvoidWall);
    } else if head.y > far {
        return ai_steer(-FRAC_PI_2, false, Behavior::AvoidWall);
    }

    let feeler = head + direction(agent.heading) * FEELER_DISTANCE;
    if world.threat_ahead(agent, feeler) {
        // Of the two escape turns, take the one whose feeler lands farther
        // from the walls; ties go clockwise
        let cw = agent.heading + ESCAPE_TURN;
        let ccw = agent.heading - ESCAPE_TURN;
        let clearance = |h: f32| world.wall_clearance(head + direction(h) * FEELER_DISTANCE);
        let escape = if clearance(ccw) > clearance(cw) { ccw } else { cw };
        return ai_steer(normalize_angle(escape), true, Behavior::AvoidThreat);
    }

    if let Some(food) = world.nearest_food(head) {
        return ai_steer(heading_to(head, food), false, Behavior::Forage);
    }

    let mut target = agent.target_heading;
    if rng.random_bool(DRIFT_CHANCE) {
        target = normalize_angle(target + rng.random_range(-DRIFT_AMPLITUDE..=DRIFT_AMPLITUDE));
    }
    ai_steer(target, false, Behavior::Wander)
}

/// Rotate `heading` toward `target` the short way, by at most `max_turn`
#[inline]
pub fn turn_towards(heading: f32, target: f32, max_turn: f32) -> f32 {
    let diff = angle_delta(heading, target);
    normalize_angle(heading + diff.clamp(-max_turn, max_turn))
}

/// Apply a decision to an agent's heading
pub fn apply(agent: &mut Agent, steer: &Steer, turn_rate: f32) {
    agent.target_heading = steer.target_heading;
    agent.boosting = steer.boost;
    if steer.snap {
        agent.heading = steer.target_heading;
    } else {
        let rate = if agent.boosting {
            turn_rate * BOOST_TURN_FACTOR
        } else {
            turn_rate
        };
        agent.heading = turn_towards(agent.heading, steer.target_heading, rate);
    }
}
