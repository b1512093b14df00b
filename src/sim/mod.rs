//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must stay pure:
//! - Fixed ticks only, advanced by [`LoopDriver`]
//! - Seeded RNG only, one stream per game
//! - Stable iteration order (insertion order)
//! - No rendering or platform dependencies; the presentation layer reads
//!   [`view`] snapshots and drains [`GameEvent`]s

pub mod agent;
pub mod arena;
pub mod body;
pub mod camera;
pub mod collision;
pub mod driver;
pub mod events;
pub mod grid;
pub mod plinko;
pub mod pusher;
pub mod settlement;
pub mod steering;
pub mod view;

pub use agent::{Agent, Food, Role};
pub use arena::{ArenaGame, ArenaInput, GameMode, Outcome};
pub use body::{Body, EntityId};
pub use camera::Camera;
pub use collision::{CollisionPair, bounce_off_obstacle, resolve_body_collisions};
pub use driver::{DriverState, LoopDriver, Simulation};
pub use events::{DeathCause, GameEvent};
pub use grid::SpatialGrid;
pub use plinko::{BoardGeometry, PlinkoGame, PlinkoInput, multiplier_table};
pub use pusher::{PusherGame, PusherInput, PusherPhase};
pub use settlement::{Settlement, SettlementBook};
pub use steering::SteeringStrategy;
pub use view::{ArenaFrame, PlinkoFrame, PusherFrame};
