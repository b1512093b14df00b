//! Plinko
//!
//! Balls fall through a triangle of pegs and land in one of `rows + 1`
//! buckets along the bottom. Physics is the same drop integration as the
//! pusher; the payout is decided by which bucket the ball's x falls into.

use std::collections::VecDeque;

use glam::Vec2;
use log::{debug, info, warn};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::body::{Body, EntityId, IdAllocator};
use super::collision::{bounce_off_obstacle, constrain_to_side_walls, resolve_body_collisions};
use super::driver::Simulation;
use super::events::GameEvent;
use super::grid::SpatialGrid;
use super::settlement::SettlementBook;
use crate::config::{MAX_ROWS, MIN_ROWS, RiskTier, SimConfig};
use crate::error::{SimError, SimResult};
use crate::wallet::{Stake, Wallet, place_stake};

/// Ticks between automatic drops (~300 ms at 60 Hz)
pub const AUTO_DROP_INTERVAL: u32 = 18;
/// Results kept in the history strip
pub const HISTORY_LEN: usize = 5;
/// Bet used until the player picks one
pub const DEFAULT_BET: f64 = 10.0;

/// Height the ball is released from
const DROP_Y: f32 = 20.0;
/// Random horizontal kick after a peg hit, so balls don't balance on pegs
const PEG_KICK: f32 = 0.25;
/// Distance above the board top where a ball is written off
const FAILSAFE_MARGIN: f32 = 50.0;

// Multiplier tables, one row per board size 8..=16, columns Low / Medium / High.
// Every table has rows + 1 entries and is symmetric about the middle.
#[rustfmt::skip]
static MULTIPLIERS: [[&[f64]; 3]; 9] = [
    // 8
    [
        &[5.6, 2.1, 1.1, 1.0, 0.5, 1.0, 1.1, 2.1, 5.6],
        &[13.0, 3.0, 1.3, 0.7, 0.4, 0.7, 1.3, 3.0, 13.0],
        &[29.0, 4.0, 1.5, 0.3, 0.2, 0.3, 1.5, 4.0, 29.0],
    ],
    // 9
    [
        &[5.6, 2.0, 1.6, 1.0, 0.7, 0.7, 1.0, 1.6, 2.0, 5.6],
        &[18.0, 4.0, 1.7, 0.9, 0.5, 0.5, 0.9, 1.7, 4.0, 18.0],
        &[43.0, 7.0, 2.0, 0.6, 0.2, 0.2, 0.6, 2.0, 7.0, 43.0],
    ],
    // 10
    [
        &[8.9, 3.0, 1.4, 1.1, 1.0, 0.5, 1.0, 1.1, 1.4, 3.0, 8.9],
        &[22.0, 5.0, 2.0, 1.4, 0.6, 0.4, 0.6, 1.4, 2.0, 5.0, 22.0],
        &[76.0, 10.0, 3.0, 0.9, 0.3, 0.2, 0.3, 0.9, 3.0, 10.0, 76.0],
    ],
    // 11
    [
        &[8.4, 3.0, 1.9, 1.3, 1.0, 0.7, 0.7, 1.0, 1.3, 1.9, 3.0, 8.4],
        &[24.0, 6.0, 3.0, 1.8, 0.7, 0.5, 0.5, 0.7, 1.8, 3.0, 6.0, 24.0],
        &[120.0, 14.0, 5.2, 1.4, 0.4, 0.2, 0.2, 0.4, 1.4, 5.2, 14.0, 120.0],
    ],
    // 12
    [
        &[10.0, 3.0, 1.6, 1.4, 1.1, 1.0, 0.5, 1.0, 1.1, 1.4, 1.6, 3.0, 10.0],
        &[33.0, 11.0, 4.0, 2.0, 1.1, 0.6, 0.3, 0.6, 1.1, 2.0, 4.0, 11.0, 33.0],
        &[170.0, 24.0, 8.1, 2.0, 0.7, 0.2, 0.2, 0.2, 0.7, 2.0, 8.1, 24.0, 170.0],
    ],
    // 13
    [
        &[8.1, 4.0, 3.0, 1.9, 1.2, 0.9, 0.7, 0.7, 0.9, 1.2, 1.9, 3.0, 4.0, 8.1],
        &[43.0, 13.0, 6.0, 3.0, 1.3, 0.7, 0.4, 0.4, 0.7, 1.3, 3.0, 6.0, 13.0, 43.0],
        &[260.0, 37.0, 11.0, 4.0, 1.0, 0.2, 0.2, 0.2, 0.2, 1.0, 4.0, 11.0, 37.0, 260.0],
    ],
    // 14
    [
        &[7.1, 4.0, 1.9, 1.4, 1.3, 1.1, 1.0, 0.5, 1.0, 1.1, 1.3, 1.4, 1.9, 4.0, 7.1],
        &[58.0, 15.0, 7.0, 4.0, 1.9, 1.0, 0.5, 0.2, 0.5, 1.0, 1.9, 4.0, 7.0, 15.0, 58.0],
        &[420.0, 56.0, 18.0, 5.0, 1.9, 0.3, 0.2, 0.2, 0.2, 0.3, 1.9, 5.0, 18.0, 56.0, 420.0],
    ],
    // 15
    [
        &[15.0, 8.0, 3.0, 2.0, 1.5, 1.1, 1.0, 0.7, 0.7, 1.0, 1.1, 1.5, 2.0, 3.0, 8.0, 15.0],
        &[88.0, 18.0, 11.0, 5.0, 3.0, 1.3, 0.5, 0.3, 0.3, 0.5, 1.3, 3.0, 5.0, 11.0, 18.0, 88.0],
        &[620.0, 83.0, 27.0, 8.0, 3.0, 0.5, 0.2, 0.2, 0.2, 0.2, 0.5, 3.0, 8.0, 27.0, 83.0, 620.0],
    ],
    // 16
    [
        &[16.0, 9.0, 2.0, 1.4, 1.4, 1.2, 1.1, 1.0, 0.5, 1.0, 1.1, 1.2, 1.4, 1.4, 2.0, 9.0, 16.0],
        &[110.0, 41.0, 10.0, 5.0, 3.0, 1.5, 1.0, 0.5, 0.3, 0.5, 1.0, 1.5, 3.0, 5.0, 10.0, 41.0, 110.0],
        &[1000.0, 130.0, 26.0, 9.0, 4.0, 2.0, 0.2, 0.2, 0.2, 0.2, 0.2, 2.0, 4.0, 9.0, 26.0, 130.0, 1000.0],
    ],
];

fn tier_index(risk: RiskTier) -> usize {
    match risk {
        RiskTier::Low => 0,
        RiskTier::Medium => 1,
        RiskTier::High => 2,
    }
}

/// Multiplier table for a board, or `None` if the board size is unsupported
pub fn multiplier_table(rows: u32, risk: RiskTier) -> Option<&'static [f64]> {
    if !(MIN_ROWS..=MAX_ROWS).contains(&rows) {
        return None;
    }
    Some(MULTIPLIERS[(rows - MIN_ROWS) as usize][tier_index(risk)])
}

/// Board layout derived from width and row count
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoardGeometry {
    pub width: f32,
    pub height: f32,
    pub rows: u32,
    /// Horizontal distance between neighboring pegs
    pub spacing_x: f32,
    /// Vertical distance between peg rows
    pub spacing_y: f32,
    pub peg_radius: f32,
    pub ball_radius: f32,
    /// y of the first peg row
    pub padding_top: f32,
    /// y of the bucket line
    pub bucket_y: f32,
    pub left_wall: f32,
    pub right_wall: f32,
}

impl BoardGeometry {
    pub fn new(width: f32, rows: u32) -> Self {
        let padding_x = width * 0.05;
        let usable = width - padding_x * 2.0;
        // The last row has rows + 2 pegs, so rows + 1 gaps
        let spacing_x = usable / (rows + 1) as f32;
        let spacing_y = spacing_x * 0.9;
        let padding_top = 50.0;
        Self {
            width,
            height: (width * 0.8 + rows as f32 * 10.0).min(650.0),
            rows,
            spacing_x,
            spacing_y,
            peg_radius: (spacing_x * 0.12).max(2.0),
            ball_radius: (spacing_x * 0.23).max(3.0),
            padding_top,
            bucket_y: padding_top + rows as f32 * spacing_y + spacing_y * 0.5,
            left_wall: padding_x - spacing_x * 0.5,
            right_wall: width - padding_x + spacing_x * 0.5,
        }
    }

    #[inline]
    pub fn pegs_in_row(&self, row: u32) -> u32 {
        3 + row
    }

    /// x of the first peg in `row` (rows are centered)
    #[inline]
    pub fn row_start_x(&self, row: u32) -> f32 {
        let row_width = (self.pegs_in_row(row) - 1) as f32 * self.spacing_x;
        (self.width - row_width) / 2.0
    }

    pub fn peg_position(&self, row: u32, col: u32) -> Vec2 {
        Vec2::new(
            self.row_start_x(row) + col as f32 * self.spacing_x,
            self.padding_top + row as f32 * self.spacing_y,
        )
    }

    pub fn bucket_count(&self) -> usize {
        self.rows as usize + 1
    }

    /// Left edge of bucket 0, i.e. the first peg of the last row
    #[inline]
    pub fn buckets_left(&self) -> f32 {
        self.row_start_x(self.rows - 1)
    }

    pub fn bucket_center_x(&self, index: usize) -> f32 {
        self.buckets_left() + (index as f32 + 0.5) * self.spacing_x
    }

    /// Bucket a landing x falls into, clamped to the outermost buckets
    pub fn bucket_index(&self, x: f32) -> usize {
        let raw = ((x - self.buckets_left()) / self.spacing_x).floor();
        let last = self.bucket_count() - 1;
        if raw.is_nan() || raw < 0.0 {
            0
        } else {
            (raw as usize).min(last)
        }
    }

    /// Every peg as (row, col, position)
    pub fn pegs(&self) -> impl Iterator<Item = (u32, u32, Vec2)> + '_ {
        (0..self.rows).flat_map(move |row| {
            (0..self.pegs_in_row(row)).map(move |col| (row, col, self.peg_position(row, col)))
        })
    }
}

/// Per-tick input
#[derive(Debug, Clone, Copy, Default)]
pub struct PlinkoInput {
    /// Drop one ball at the current bet this tick
    pub drop_ball: bool,
}

/// A plinko board
pub struct PlinkoGame {
    geometry: BoardGeometry,
    risk: RiskTier,
    multipliers: &'static [f64],
    balls: Vec<Body>,
    bet: f64,
    auto_drop: bool,
    ticks_since_drop: u32,
    history: VecDeque<f64>,
    gravity: f32,
    air_resistance: f32,
    restitution: f32,
    wall_restitution: f32,
    ball_collisions: bool,
    max_balls: usize,
    ids: IdAllocator,
    grid: SpatialGrid,
    book: SettlementBook,
    rng: Pcg32,
    events: Vec<GameEvent>,
}

impl PlinkoGame {
    pub fn new(config: &SimConfig) -> SimResult<Self> {
        config.validate()?;
        let geometry = BoardGeometry::new(config.plinko_board_width, config.rows);
        let multipliers = multiplier_table(config.rows, config.risk_tier).ok_or_else(|| {
            SimError::InvalidConfiguration(format!("no multiplier table for {} rows", config.rows))
        })?;
        Ok(Self {
            grid: SpatialGrid::new(geometry.ball_radius * 2.0)?,
            geometry,
            risk: config.risk_tier,
            multipliers,
            balls: Vec::new(),
            bet: DEFAULT_BET,
            auto_drop: false,
            ticks_since_drop: 0,
            history: VecDeque::with_capacity(HISTORY_LEN),
            gravity: config.gravity,
            air_resistance: config.air_resistance,
            restitution: config.restitution,
            wall_restitution: config.wall_restitution,
            ball_collisions: config.plinko_ball_collisions,
            max_balls: config.max_active_bodies,
            ids: IdAllocator::default(),
            book: SettlementBook::new(),
            rng: Pcg32::seed_from_u64(config.seed),
            events: Vec::new(),
        })
    }

    pub fn geometry(&self) -> &BoardGeometry {
        &self.geometry
    }

    pub fn risk(&self) -> RiskTier {
        self.risk
    }

    pub fn multipliers(&self) -> &'static [f64] {
        self.multipliers
    }

    pub fn balls(&self) -> &[Body] {
        &self.balls
    }

    pub fn bet(&self) -> f64 {
        self.bet
    }

    pub fn auto_drop(&self) -> bool {
        self.auto_drop
    }

    /// Recent results, newest first
    pub fn history(&self) -> impl Iterator<Item = f64> + '_ {
        self.history.iter().copied()
    }

    pub fn settlements(&self) -> &SettlementBook {
        &self.book
    }

    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Set the bet for subsequent drops
    pub fn set_bet(&mut self, bet: f64) -> SimResult<()> {
        if !bet.is_finite() || bet <= 0.0 {
            return Err(SimError::InvalidConfiguration(format!(
                "bet amount must be positive, got {bet}"
            )));
        }
        self.bet = bet;
        Ok(())
    }

    pub fn set_auto_drop(&mut self, enabled: bool) {
        self.auto_drop = enabled;
        self.ticks_since_drop = 0;
    }

    /// Switch board size and risk tier.
    ///
    /// An unsupported combination is reported as an error and the board falls
    /// back to 16 rows at Medium risk, so the game always has a usable table.
    pub fn configure(&mut self, rows: u32, risk: RiskTier) -> SimResult<()> {
        let result = match multiplier_table(rows, risk) {
            Some(table) => {
                self.apply_board(rows, risk, table);
                Ok(())
            }
            None => {
                let fallback = SimConfig::default();
                warn!(
                    "No plinko table for {rows} rows, falling back to {} rows {}",
                    fallback.rows,
                    fallback.risk_tier.as_str()
                );
                let table = multiplier_table(fallback.rows, fallback.risk_tier).unwrap_or(&[1.0]);
                self.apply_board(fallback.rows, fallback.risk_tier, table);
                Err(SimError::InvalidConfiguration(format!(
                    "no multiplier table for {rows} rows"
                )))
            }
        };
        // Ball size depends on row count
        if let Ok(grid) = SpatialGrid::new(self.geometry.ball_radius * 2.0) {
            self.grid = grid;
        }
        result
    }

    fn apply_board(&mut self, rows: u32, risk: RiskTier, table: &'static [f64]) {
        self.geometry = BoardGeometry::new(self.geometry.width, rows);
        self.risk = risk;
        self.multipliers = table;
        for ball in &mut self.balls {
            ball.radius = self.geometry.ball_radius;
        }
    }

    /// Put a ball on the board without taking a bet (tests, replays)
    pub fn place_ball(&mut self, pos: Vec2, value: f64) -> SimResult<EntityId> {
        if self.balls.len() >= self.max_balls {
            return Err(SimError::CapacityReached {
                cap: self.max_balls,
            });
        }
        let id = self.ids.next_id();
        let ball = Body::new(id, pos, self.geometry.ball_radius)?.with_value(value);
        self.balls.push(ball);
        Ok(id)
    }

    /// Pay the current bet and release a ball near the top center
    pub fn drop_ball(&mut self, wallet: &mut dyn Wallet) -> SimResult<EntityId> {
        if self.balls.len() >= self.max_balls {
            return Err(SimError::CapacityReached {
                cap: self.max_balls,
            });
        }
        let stake = Stake::new(self.bet, wallet.currency())?;
        place_stake(wallet, &stake, "Plinko Drop")?;

        let jitter = self.rng.random_range(-0.2..=0.2) * self.geometry.spacing_x;
        let pos = Vec2::new(self.geometry.width / 2.0 + jitter, DROP_Y);
        let id = self.place_ball(pos, stake.amount)?;
        self.ticks_since_drop = 0;
        debug!("Plinko ball {id} dropped for {}", stake.amount);
        Ok(id)
    }

    fn try_drop(&mut self, wallet: &mut dyn Wallet) {
        if let Err(e) = self.drop_ball(wallet) {
            if self.auto_drop {
                info!("Auto drop stopped: {e}");
                self.auto_drop = false;
            }
            self.events.push(GameEvent::feedback(e.feedback()));
        }
    }

    /// Advance one tick
    pub fn tick(&mut self, wallet: &mut dyn Wallet) {
        if self.auto_drop {
            self.ticks_since_drop += 1;
            if self.ticks_since_drop >= AUTO_DROP_INTERVAL {
                self.try_drop(wallet);
                self.ticks_since_drop = 0;
            }
        }

        let geo = self.geometry;
        for ball in &mut self.balls {
            ball.integrate(self.gravity, self.air_resistance);
            constrain_to_side_walls(ball, geo.left_wall, geo.right_wall, self.wall_restitution);

            // Only the rows and columns around the ball can touch it
            let approx_row = ((ball.pos.y - geo.padding_top) / geo.spacing_y).round() as i64;
            let row_lo = (approx_row - 1).max(0);
            let row_hi = (approx_row + 1).min(geo.rows as i64 - 1);
            for row in row_lo..=row_hi {
                let row = row as u32;
                let approx_col =
                    ((ball.pos.x - geo.row_start_x(row)) / geo.spacing_x).round() as i64;
                let col_lo = (approx_col - 1).max(0);
                let col_hi = (approx_col + 1).min(geo.pegs_in_row(row) as i64 - 1);
                for col in col_lo..=col_hi {
                    let col = col as u32;
                    let peg = geo.peg_position(row, col);
                    if bounce_off_obstacle(ball, peg, geo.peg_radius, self.restitution) {
                        ball.vel.x += self.rng.random_range(-PEG_KICK..=PEG_KICK);
                        self.events.push(GameEvent::PegHit { row, col });
                    }
                }
            }
        }

        if self.ball_collisions && self.balls.len() > 1 {
            resolve_body_collisions(&mut self.balls, &mut self.grid, 1, 0.0, &mut self.rng);
        }

        self.collect_outcomes(wallet);
    }

    /// Settle balls that reached the bucket line and discard broken ones.
    /// A finite ball below the line always lands, however far it fell this
    /// tick; only non-finite balls and balls thrown far above the board are
    /// written off.
    fn collect_outcomes(&mut self, wallet: &mut dyn Wallet) {
        let geo = self.geometry;
        let ceiling = -(geo.height.max(geo.bucket_y) + FAILSAFE_MARGIN);
        let mut i = 0;
        while i < self.balls.len() {
            let ball = &self.balls[i];
            if !ball.is_finite() || ball.pos.y < ceiling {
                let id = ball.id;
                warn!("Plinko ball {id} left the board at {:?}, discarding", ball.pos);
                self.events.push(GameEvent::Anomaly {
                    id,
                    detail: "ball left the board".into(),
                });
                self.balls.remove(i);
                continue;
            }
            if ball.pos.y > geo.bucket_y - ball.radius {
                let (id, value, x) = (ball.id, ball.value, ball.pos.x);
                self.balls.remove(i);
                self.land(wallet, id, value, x);
                continue;
            }
            i += 1;
        }
    }

    fn land(&mut self, wallet: &mut dyn Wallet, id: EntityId, value: f64, x: f32) {
        let index = self.geometry.bucket_index(x);
        let Some(&multiplier) = self.multipliers.get(index) else {
            return;
        };
        let Some(settlement) =
            self.book
                .settle(wallet, id, value, multiplier, format!("Plinko {multiplier}x"))
        else {
            return;
        };

        self.history.push_front(multiplier);
        self.history.truncate(HISTORY_LEN);
        if multiplier >= 10.0 {
            self.events.push(GameEvent::feedback(format!("HUGE WIN! {multiplier}x")));
        } else if multiplier > 1.0 {
            self.events.push(GameEvent::feedback(format!("Nice! {multiplier}x")));
        }
        self.events.push(GameEvent::Settled(settlement));
    }
}

impl Simulation for PlinkoGame {
    type Input = PlinkoInput;

    fn step(&mut self, input: &PlinkoInput, wallet: &mut dyn Wallet) {
        if input.drop_ball {
            self.try_drop(wallet);
        }
        self.tick(wallet);
    }

    fn clear_one_shots(input: &mut PlinkoInput) {
        input.drop_ball = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::LedgerWallet;

    fn game(rows: u32, risk: RiskTier) -> PlinkoGame {
        let cfg = SimConfig {
            rows,
            risk_tier: risk,
            ..Default::default()
        };
        PlinkoGame::new(&cfg).unwrap()
    }

    #[test]
    fn test_tables_have_rows_plus_one_and_are_symmetric() {
        for rows in MIN_ROWS..=MAX_ROWS {
            for risk in RiskTier::ALL {
                let t = multiplier_table(rows, risk).unwrap();
                assert_eq!(t.len(), rows as usize + 1, "{rows} rows {risk:?}");
                for i in 0..t.len() {
                    assert_eq!(t[i], t[t.len() - 1 - i], "{rows} rows {risk:?} bucket {i}");
                }
            }
        }
    }

    #[test]
    fn test_risk_trades_center_for_edges() {
        for rows in MIN_ROWS..=MAX_ROWS {
            let tables: Vec<&[f64]> = RiskTier::ALL
                .iter()
                .map(|&r| multiplier_table(rows, r).unwrap())
                .collect();
            let center = rows as usize / 2;
            for pair in tables.windows(2) {
                assert!(pair[1][center] <= pair[0][center], "{rows} rows center");
                assert!(pair[1][0] >= pair[0][0], "{rows} rows edge");
            }
        }
    }

    #[test]
    fn test_unsupported_board_has_no_table() {
        assert!(multiplier_table(7, RiskTier::Low).is_none());
        assert!(multiplier_table(17, RiskTier::High).is_none());
    }

    #[test]
    fn test_configure_falls_back_to_medium_sixteen() {
        let mut g = game(8, RiskTier::High);
        assert!(g.configure(20, RiskTier::Low).is_err());
        assert_eq!(g.geometry().rows, 16);
        assert_eq!(g.risk(), RiskTier::Medium);
        assert_eq!(g.multipliers().len(), 17);

        g.configure(10, RiskTier::Low).unwrap();
        assert_eq!(g.geometry().bucket_count(), 11);
    }

    #[test]
    fn test_bucket_index_clamps() {
        let geo = BoardGeometry::new(800.0, 16);
        assert_eq!(geo.bucket_index(-1000.0), 0);
        assert_eq!(geo.bucket_index(5000.0), 16);
        assert_eq!(geo.bucket_index(geo.bucket_center_x(3)), 3);
        assert_eq!(geo.bucket_index(f32::NAN), 0);
    }

    #[test]
    fn test_geometry_matches_layout() {
        let geo = BoardGeometry::new(800.0, 16);
        assert!((geo.spacing_x - 720.0 / 17.0).abs() < 1e-4);
        assert_eq!(geo.height, 650.0);
        assert_eq!(geo.pegs().count(), (0..16).map(|r| 3 + r).sum::<u32>() as usize);
        // Row 0 is centered on the board
        let mid = geo.peg_position(0, 1);
        assert!((mid.x - 400.0).abs() < 1e-3);
        // Buckets span the last row's pegs exactly
        let last_peg = geo.peg_position(15, geo.pegs_in_row(15) - 1);
        assert!((geo.bucket_center_x(16) + geo.spacing_x / 2.0 - last_peg.x).abs() < 1e-3);
    }

    #[test]
    fn test_center_bucket_scenario() {
        let mut g = game(16, RiskTier::Medium);
        let mut wallet = LedgerWallet::with_balance(0.0);
        let geo = *g.geometry();
        let x = geo.bucket_center_x(8);
        let y = geo.bucket_y - geo.ball_radius - 0.1;
        let id = g.place_ball(Vec2::new(x, y), 10.0).unwrap();

        g.tick(&mut wallet);

        assert!(g.balls().is_empty());
        assert!((wallet.balance() - 3.0).abs() < 1e-9);
        assert_eq!(wallet.transactions().len(), 1);
        assert_eq!(g.history().next(), Some(0.3));
        assert!(g.settlements().is_settled(id));

        g.tick(&mut wallet);
        assert!((wallet.balance() - 3.0).abs() < 1e-9);
        assert_eq!(wallet.transactions().len(), 1);
    }

    #[test]
    fn test_big_bucket_feedback() {
        let mut g = game(16, RiskTier::Medium);
        let mut wallet = LedgerWallet::with_balance(0.0);
        let geo = *g.geometry();
        let x = geo.bucket_center_x(0);
        g.place_ball(Vec2::new(x.max(geo.left_wall + geo.ball_radius + 1.0), geo.bucket_y), 1.0)
            .unwrap();
        g.tick(&mut wallet);
        let events = g.take_events();
        assert!(events.iter().any(|e| matches!(e, GameEvent::Feedback { text } if text == "HUGE WIN! 110x")));
        assert!((wallet.balance() - 110.0).abs() < 1e-9);
    }

    #[test]
    fn test_drop_debits_before_ball_exists() {
        let mut g = game(12, RiskTier::Low);
        let mut wallet = LedgerWallet::with_balance(15.0);
        g.drop_ball(&mut wallet).unwrap();
        assert_eq!(wallet.balance(), 5.0);
        assert_eq!(g.balls().len(), 1);
        assert_eq!(g.balls()[0].value, 10.0);

        let err = g.drop_ball(&mut wallet).unwrap_err();
        assert!(matches!(err, SimError::InsufficientFunds { .. }));
        assert_eq!(g.balls().len(), 1);
        assert_eq!(wallet.balance(), 5.0);
    }

    #[test]
    fn test_rejects_bad_bet() {
        let mut g = game(16, RiskTier::Medium);
        assert!(g.set_bet(0.0).is_err());
        assert!(g.set_bet(-5.0).is_err());
        assert_eq!(g.bet(), DEFAULT_BET);
    }

    #[test]
    fn test_auto_drop_turns_off_when_broke() {
        let mut g = game(16, RiskTier::Medium);
        let mut wallet = LedgerWallet::with_balance(10.0);
        g.set_auto_drop(true);
        for _ in 0..AUTO_DROP_INTERVAL {
            g.tick(&mut wallet);
        }
        assert_eq!(wallet.balance(), 0.0);
        assert!(g.auto_drop());

        for _ in 0..AUTO_DROP_INTERVAL {
            g.tick(&mut wallet);
        }
        assert!(!g.auto_drop());
        let events = g.take_events();
        assert!(events.iter().any(|e| matches!(e, GameEvent::Feedback { text } if text == "Insufficient Funds")));
    }

    #[test]
    fn test_every_ball_settles_or_is_discarded() {
        let mut g = game(8, RiskTier::High);
        let mut wallet = LedgerWallet::with_balance(1000.0);
        for _ in 0..20 {
            g.drop_ball(&mut wallet).unwrap();
        }
        for _ in 0..3000 {
            g.tick(&mut wallet);
            if g.balls().is_empty() {
                break;
            }
        }
        let events = g.take_events();
        let settled = events.iter().filter(|e| matches!(e, GameEvent::Settled(_))).count();
        let lost = events.iter().filter(|e| matches!(e, GameEvent::Anomaly { .. })).count();
        assert_eq!(settled + lost + g.balls().len(), 20);
        assert_eq!(g.settlements().count(), settled);
    }

    #[test]
    fn test_ball_falling_past_floor_in_one_tick_still_lands() {
        let mut g = game(16, RiskTier::Medium);
        let mut wallet = LedgerWallet::with_balance(0.0);
        let geo = *g.geometry();
        let x = geo.bucket_center_x(8);
        let id = g
            .place_ball(Vec2::new(x, geo.bucket_y - geo.ball_radius - 1.0), 10.0)
            .unwrap();
        g.balls[0].vel = Vec2::new(0.0, 120.0);

        g.tick(&mut wallet);

        assert!(g.balls().is_empty());
        assert!(g.settlements().is_settled(id));
        assert!((wallet.balance() - 3.0).abs() < 1e-9);
        let events = g.take_events();
        assert!(!events.iter().any(|e| matches!(e, GameEvent::Anomaly { .. })));
    }

    #[test]
    fn test_heavy_gravity_loses_no_stakes() {
        let cfg = SimConfig {
            rows: 8,
            gravity: 40.0,
            ..Default::default()
        };
        cfg.validate().unwrap();
        let mut g = PlinkoGame::new(&cfg).unwrap();
        let mut wallet = LedgerWallet::with_balance(1000.0);
        for _ in 0..20 {
            g.drop_ball(&mut wallet).unwrap();
        }
        for _ in 0..500 {
            g.tick(&mut wallet);
        }
        let events = g.take_events();
        let lost = events.iter().filter(|e| matches!(e, GameEvent::Anomaly { .. })).count();
        assert_eq!(lost, 0);
        assert_eq!(g.settlements().count() + g.balls().len(), 20);
    }

    #[test]
    fn test_non_finite_ball_is_discarded() {
        let mut g = game(8, RiskTier::Low);
        let mut wallet = LedgerWallet::with_balance(0.0);
        let id = g.place_ball(Vec2::new(400.0, 100.0), 10.0).unwrap();
        g.balls[0].vel = Vec2::new(f32::NAN, 0.0);

        g.tick(&mut wallet);

        assert!(g.balls().is_empty());
        assert!(!g.settlements().is_settled(id));
        assert_eq!(wallet.balance(), 0.0);
        assert!(g.take_events().iter().any(|e| matches!(e, GameEvent::Anomaly { id: a, .. } if *a == id)));
    }
}
