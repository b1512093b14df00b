//! Coin pusher
//!
//! Coins sit on a shelf seen from above: `pos.x` runs across the shelf and
//! `pos.y` is depth (z), growing toward the drop edge. A pusher wall sweeps
//! back and forth on a sine; anything it overlaps is shoved forward, the pile
//! relaxes, and coins pushed past the win line pay out.

use std::f32::consts::TAU;

use glam::Vec2;
use log::{info, warn};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::body::{Body, EntityId, IdAllocator};
use super::collision::{constrain_to_side_walls, resolve_body_collisions};
use super::driver::Simulation;
use super::events::GameEvent;
use super::grid::SpatialGrid;
use super::settlement::SettlementBook;
use crate::config::SimConfig;
use crate::error::{SimError, SimResult};
use crate::wallet::{Stake, Wallet, place_stake};

/// Shelf width
pub const SHELF_WIDTH: f32 = 320.0;
/// Shelf depth, back wall to drop edge
pub const SHELF_DEPTH: f32 = 400.0;
pub const COIN_DIAMETER: f32 = 26.0;
pub const COIN_RADIUS: f32 = COIN_DIAMETER / 2.0;
/// Depth of the pusher face at its most retracted
pub const PUSHER_BASE_Z: f32 = 40.0;
/// Pusher stroke length
pub const PUSH_AMPLITUDE: f32 = 70.0;
/// Oscillator phase advance per tick (radians)
pub const PUSHER_PHASE_STEP: f32 = 0.025;
/// Coins beyond this depth fall off the edge and pay out
pub const WIN_ZONE_Z: f32 = 380.0;
/// Dead band along each side wall
pub const SIDE_MARGIN: f32 = 16.0;
/// House coins loaded into a fresh machine
pub const PRELOAD_COINS: usize = 120;
/// Payout multiplier for a coin that drops off the edge
pub const WIN_MULTIPLIER: f64 = 1.8;

/// Depth where inserted coins land
const DROP_Z: f32 = 30.0;
/// Sideways wobble given to coins riding the pusher face
const PUSH_JITTER: f32 = 1.28;
/// Tangential wobble applied when resolving coin-coin contacts
const CONTACT_JITTER: f32 = 0.05;
const COLLISION_ITERATIONS: u32 = 4;
/// Ticks a freshly inserted coin is flagged as new
const NEW_COIN_TICKS: u32 = 90;
/// How far behind the back wall a coin may drift before it counts as runaway
const FAILSAFE_MARGIN: f32 = 200.0;

/// Lifecycle of a machine; it never terminates on its own
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PusherPhase {
    #[default]
    Idle,
    Running,
}

/// Per-tick input
#[derive(Debug, Clone, Copy, Default)]
pub struct PusherInput {
    /// Insert one coin this tick
    pub drop_coin: bool,
}

/// Render-only state riding alongside each coin body
#[derive(Debug, Clone, Copy)]
pub struct CoinMeta {
    /// Visual rotation in degrees
    pub angle: f32,
    /// Ticks since the coin was inserted; `u32::MAX` for house coins
    pub age: u32,
}

impl CoinMeta {
    pub fn is_new(&self) -> bool {
        self.age < NEW_COIN_TICKS
    }
}

/// A coin pusher machine
pub struct PusherGame {
    phase: PusherPhase,
    /// Oscillator phase in [0, 2π)
    pusher_phase: f32,
    coins: Vec<Body>,
    /// Kept index-aligned with `coins`
    meta: Vec<CoinMeta>,
    coin_value: f64,
    wall_restitution: f32,
    max_coins: usize,
    ids: IdAllocator,
    grid: SpatialGrid,
    book: SettlementBook,
    rng: Pcg32,
    events: Vec<GameEvent>,
    ticks: u64,
}

impl PusherGame {
    /// A machine pre-loaded with house coins
    pub fn new(config: &SimConfig) -> SimResult<Self> {
        let mut game = Self::empty(config)?;
        let preload = PRELOAD_COINS.min(game.max_coins);
        for _ in 0..preload {
            let x = game.rng.random_range(0.1..=0.9) * SHELF_WIDTH;
            let z = game.rng.random_range(50.0..=350.0);
            let angle = game.rng.random_range(0.0..360.0);
            game.spawn_coin(Vec2::new(x, z), angle, u32::MAX)?;
        }
        game.events.push(GameEvent::feedback("Insert Coin to Start!"));
        Ok(game)
    }

    /// A machine with no coins on the shelf
    pub fn empty(config: &SimConfig) -> SimResult<Self> {
        config.validate()?;
        Ok(Self {
            phase: PusherPhase::Idle,
            pusher_phase: 0.0,
            coins: Vec::new(),
            meta: Vec::new(),
            coin_value: config.pusher_coin_value,
            wall_restitution: config.wall_restitution,
            max_coins: config.max_active_bodies,
            ids: IdAllocator::default(),
            grid: SpatialGrid::new(COIN_DIAMETER)?,
            book: SettlementBook::new(),
            rng: Pcg32::seed_from_u64(config.seed),
            events: Vec::new(),
            ticks: 0,
        })
    }

    pub fn phase(&self) -> PusherPhase {
        self.phase
    }

    pub fn coins(&self) -> &[Body] {
        &self.coins
    }

    pub fn coin_meta(&self) -> &[CoinMeta] {
        &self.meta
    }

    /// Ticks advanced so far
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn coin_value(&self) -> f64 {
        self.coin_value
    }

    /// Current depth of the pusher face
    pub fn pusher_z(&self) -> f32 {
        let extension = (self.pusher_phase.sin() + 1.0) / 2.0;
        PUSHER_BASE_Z + extension * PUSH_AMPLITUDE
    }

    pub fn settlements(&self) -> &SettlementBook {
        &self.book
    }

    /// Drain pending events
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Place a coin by hand, bypassing the wallet (house coins, tests)
    pub fn place_coin(&mut self, pos: Vec2) -> SimResult<EntityId> {
        if self.coins.len() >= self.max_coins {
            return Err(SimError::CapacityReached {
                cap: self.max_coins,
            });
        }
        let angle = self.rng.random_range(0.0..360.0);
        self.spawn_coin(pos, angle, u32::MAX)
    }

    /// Pay for and insert one coin.
    ///
    /// Capacity and funds are both checked before anything is debited.
    pub fn drop_coin(&mut self, wallet: &mut dyn Wallet) -> SimResult<EntityId> {
        if self.coins.len() >= self.max_coins {
            return Err(SimError::CapacityReached {
                cap: self.max_coins,
            });
        }
        let stake = Stake::new(self.coin_value, wallet.currency())?;
        place_stake(wallet, &stake, "Coin Pusher")?;

        let x = self.rng.random_range(0.2..=0.8) * SHELF_WIDTH;
        let angle = self.rng.random_range(0.0..360.0);
        let id = self.spawn_coin(Vec2::new(x, DROP_Z), angle, 0)?;
        if self.phase == PusherPhase::Idle {
            info!("Coin pusher running");
            self.phase = PusherPhase::Running;
        }
        Ok(id)
    }

    fn spawn_coin(&mut self, pos: Vec2, angle: f32, age: u32) -> SimResult<EntityId> {
        let id = self.ids.next_id();
        let coin = Body::new(id, pos, COIN_RADIUS)?.with_value(self.coin_value);
        self.coins.push(coin);
        self.meta.push(CoinMeta { angle, age });
        Ok(id)
    }

    /// Advance one tick: oscillator, push, relax the pile, walls, payouts
    pub fn tick(&mut self, wallet: &mut dyn Wallet) {
        self.ticks += 1;

        self.pusher_phase = (self.pusher_phase + PUSHER_PHASE_STEP) % TAU;
        let face = self.pusher_z() + COIN_RADIUS;

        for coin in &mut self.coins {
            if coin.pos.y < face && coin.pos.y > 0.0 {
                coin.pos.y = face;
                coin.pos.x += self.rng.random_range(-PUSH_JITTER..=PUSH_JITTER);
            }
        }

        resolve_body_collisions(
            &mut self.coins,
            &mut self.grid,
            COLLISION_ITERATIONS,
            CONTACT_JITTER,
            &mut self.rng,
        );

        for coin in &mut self.coins {
            constrain_to_side_walls(
                coin,
                SIDE_MARGIN,
                SHELF_WIDTH - SIDE_MARGIN,
                self.wall_restitution,
            );
        }
        for meta in &mut self.meta {
            meta.age = meta.age.saturating_add(1);
        }

        self.collect_outcomes(wallet);
    }

    /// Remove coins past the win line (paying them) and runaway coins (not paying)
    fn collect_outcomes(&mut self, wallet: &mut dyn Wallet) {
        let mut won = 0.0;
        let mut i = 0;
        while i < self.coins.len() {
            let coin = &self.coins[i];
            if !coin.is_finite() || coin.pos.y < -FAILSAFE_MARGIN {
                let id = coin.id;
                warn!("Coin {id} escaped the shelf at {:?}, discarding", coin.pos);
                self.events.push(GameEvent::Anomaly {
                    id,
                    detail: "coin escaped the shelf".into(),
                });
                self.coins.remove(i);
                self.meta.remove(i);
                continue;
            }
            if coin.pos.y > WIN_ZONE_Z {
                let (id, value) = (coin.id, coin.value);
                self.coins.remove(i);
                self.meta.remove(i);
                let settled =
                    self.book
                        .settle(wallet, id, value, WIN_MULTIPLIER, "Pusher Win".to_string());
                if let Some(s) = settled {
                    won += s.payout;
                    self.events.push(GameEvent::Settled(s));
                }
                continue;
            }
            i += 1;
        }

        if won > 0.0 {
            let symbol = wallet.currency().symbol();
            self.events.push(GameEvent::feedback(format!(
                "WON {} {symbol}!",
                won.floor()
            )));
        }
    }
}

impl Simulation for PusherGame {
    type Input = PusherInput;

    fn step(&mut self, input: &PusherInput, wallet: &mut dyn Wallet) {
        if input.drop_coin {
            if let Err(e) = self.drop_coin(wallet) {
                self.events.push(GameEvent::feedback(e.feedback()));
            }
        }
        self.tick(wallet);
    }

    fn clear_one_shots(input: &mut PusherInput) {
        input.drop_coin = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::LedgerWallet;

    fn config() -> SimConfig {
        SimConfig::default()
    }

    #[test]
    fn test_preloaded_machine() {
        let game = PusherGame::new(&config()).unwrap();
        assert_eq!(game.coins().len(), PRELOAD_COINS);
        assert_eq!(game.phase(), PusherPhase::Idle);
        for c in game.coins() {
            assert!(c.pos.x >= 0.1 * SHELF_WIDTH && c.pos.x <= 0.9 * SHELF_WIDTH);
            assert!(c.pos.y >= 50.0 && c.pos.y <= 350.0);
        }
    }

    #[test]
    fn test_pusher_stays_in_stroke() {
        let mut game = PusherGame::empty(&config()).unwrap();
        let mut wallet = LedgerWallet::new();
        for _ in 0..600 {
            game.tick(&mut wallet);
            let z = game.pusher_z();
            assert!((PUSHER_BASE_Z..=PUSHER_BASE_Z + PUSH_AMPLITUDE).contains(&z));
        }
    }

    #[test]
    fn test_two_coins_same_depth_separate_in_one_tick() {
        let mut game = PusherGame::empty(&config()).unwrap();
        let mut wallet = LedgerWallet::new();
        game.place_coin(Vec2::new(150.0, 200.0)).unwrap();
        game.place_coin(Vec2::new(160.0, 200.0)).unwrap();

        game.tick(&mut wallet);

        let c = game.coins();
        let d = c[0].pos.distance(c[1].pos);
        assert!(d >= COIN_DIAMETER - 1e-3, "coins still overlap: {d}");
    }

    #[test]
    fn test_drop_coin_debits_and_runs() {
        let mut game = PusherGame::empty(&config()).unwrap();
        let mut wallet = LedgerWallet::new();
        game.drop_coin(&mut wallet).unwrap();
        assert_eq!(wallet.balance(), 990.0);
        assert_eq!(game.phase(), PusherPhase::Running);
        let coin = &game.coins()[0];
        assert_eq!(coin.pos.y, DROP_Z);
        assert!(game.coin_meta()[0].is_new());
    }

    #[test]
    fn test_drop_coin_insufficient_funds_creates_nothing() {
        let mut game = PusherGame::empty(&config()).unwrap();
        let mut wallet = LedgerWallet::with_balance(5.0);
        let err = game.drop_coin(&mut wallet).unwrap_err();
        assert!(matches!(err, SimError::InsufficientFunds { .. }));
        assert!(game.coins().is_empty());
        assert_eq!(wallet.balance(), 5.0);
    }

    #[test]
    fn test_drop_refused_at_capacity_before_debit() {
        let cfg = SimConfig {
            max_active_bodies: 1,
            ..config()
        };
        let mut game = PusherGame::empty(&cfg).unwrap();
        let mut wallet = LedgerWallet::new();
        game.drop_coin(&mut wallet).unwrap();
        let err = game.drop_coin(&mut wallet).unwrap_err();
        assert_eq!(err, SimError::CapacityReached { cap: 1 });
        assert_eq!(wallet.balance(), 990.0);
    }

    #[test]
    fn test_coin_past_win_line_pays_once() {
        let mut game = PusherGame::empty(&config()).unwrap();
        let mut wallet = LedgerWallet::with_balance(0.0);
        let id = game.place_coin(Vec2::new(160.0, WIN_ZONE_Z + 5.0)).unwrap();

        game.tick(&mut wallet);
        assert!(game.coins().is_empty());
        assert!((wallet.balance() - 18.0).abs() < 1e-9);
        assert!(game.settlements().is_settled(id));

        game.tick(&mut wallet);
        assert!((wallet.balance() - 18.0).abs() < 1e-9);

        let events = game.take_events();
        assert!(events.iter().any(|e| matches!(e, GameEvent::Settled(s) if s.body_id == id)));
        assert!(events.iter().any(|e| matches!(e, GameEvent::Feedback { text } if text == "WON 18 FC!")));
    }

    #[test]
    fn test_runaway_coin_discarded_without_payout() {
        let mut game = PusherGame::empty(&config()).unwrap();
        let mut wallet = LedgerWallet::with_balance(0.0);
        game.place_coin(Vec2::new(160.0, -500.0)).unwrap();
        game.tick(&mut wallet);
        assert!(game.coins().is_empty());
        assert_eq!(wallet.balance(), 0.0);
        assert!(game.take_events().iter().any(|e| matches!(e, GameEvent::Anomaly { .. })));
    }

    #[test]
    fn test_walls_keep_coins_on_shelf() {
        let mut game = PusherGame::empty(&config()).unwrap();
        let mut wallet = LedgerWallet::new();
        game.place_coin(Vec2::new(2.0, 200.0)).unwrap();
        game.tick(&mut wallet);
        assert!(game.coins()[0].pos.x - COIN_RADIUS >= SIDE_MARGIN - 1e-4);
    }

    #[test]
    fn test_same_seed_same_shelf() {
        let a = PusherGame::new(&config()).unwrap();
        let b = PusherGame::new(&config()).unwrap();
        for (ca, cb) in a.coins().iter().zip(b.coins()) {
            assert_eq!(ca.pos, cb.pos);
        }
    }
}
