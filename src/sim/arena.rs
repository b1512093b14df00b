//! Arena simulation
//!
//! Multi-agent survival: every agent steers (pointer, keys or the bot priority
//! list), moves, eats, and dies on walls or on other bodies. Dead bodies turn
//! into food, bots are topped back up, and the game ends when the humans are
//! out.
//!
//! Tick order:
//! 1. Lock-on and pointer mapping, invulnerability countdown
//! 2. Steering decisions for every agent from one shared snapshot
//! 3. Turn, boost cost, move, wall check, eat
//! 4. Head-vs-body collisions
//! 5. Cleanup, respawn, food top-up
//! 6. Termination, camera, standings

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

use super::agent::{Agent, Food, Role};
use super::body::{EntityId, IdAllocator};
use super::camera::Camera;
use super::driver::Simulation;
use super::events::{DeathCause, GameEvent};
use super::grid::SpatialGrid;
use super::steering::{self, Controls, Sensing, Steer};
use crate::config::SimConfig;
use crate::direction;
use crate::error::{SimError, SimResult};
use crate::standings::Standings;
use crate::wallet::Wallet;

/// Agents may not boost below this many segments
pub const BOOST_MIN_LENGTH: usize = 10;
/// Chance per boosting tick to shed a tail segment
pub const BOOST_COST_CHANCE: f64 = 0.15;
/// Extra reach added to width + food size when eating
pub const PICKUP_MARGIN: f32 = 5.0;
/// Hit distance as a fraction of the two widths combined
pub const HIT_FACTOR: f32 = 0.45;
/// Every n-th body segment is tested against heads
pub const COLLISION_STRIDE: usize = 2;
/// Own segments near the head ignored by the self check
pub const SELF_SKIP: usize = 15;
/// One remains pellet per this many body segments
pub const DEATH_FOOD_INTERVAL: usize = 3;
/// Number of agent colour slots
pub const PALETTE_SIZE: u8 = 8;

const FOOD_GRID_CELL: f32 = 200.0;
const DEATH_FOOD_JITTER: f32 = 7.5;
const DEATH_FOOD_VALUE: u32 = 5;
const TRAIL_FOOD_SIZE: f32 = 4.0;
const FOOD_TOPUP_PER_TICK: usize = 5;
const BIG_FOOD_CHANCE: f64 = 0.05;
const RESPAWN_CHANCE: f64 = 0.05;
const SPAWN_ATTEMPTS: usize = 10;
/// Half-size of the box around live humans that respawns avoid
const RESPAWN_CLEARANCE: f32 = 500.0;
/// Half-size of the box around the centre that starting bots avoid
const START_CLEARANCE: f32 = 300.0;
/// Keep bot spawns this far from the walls
const SPAWN_MARGIN: f32 = 100.0;
const SECONDARY_OFFSET: f32 = 200.0;

const BOT_NAMES: [&str; 15] = [
    "Slippy", "Coily", "Noodle", "Fang", "Venom", "Python", "Viper", "Glitch", "Byte", "Bug",
    "Wiggle", "Slither", "Hydra", "Kaa", "Basilisk",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameMode {
    /// One pointer-controlled human against bots
    Solo,
    /// Pointer human and keyboard human against bots and each other
    Versus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Running,
    /// Solo human died
    GameOver,
    /// Last human standing in versus
    Winner(EntityId),
    /// Both humans died on the same tick
    Draw,
}

/// Per-tick arena input
#[derive(Debug, Clone, Copy, Default)]
pub struct ArenaInput {
    /// Pointer position in viewport coordinates
    pub pointer: Option<Vec2>,
    pub pointer_boost: bool,
    /// Click target in world coordinates; overrides the pointer until cleared
    pub lock_on: Option<Vec2>,
    pub clear_lock_on: bool,
    pub turn_left: bool,
    pub turn_right: bool,
    pub key_boost: bool,
}

pub struct ArenaGame {
    world_size: f32,
    base_speed: f32,
    boost_multiplier: f32,
    turn_rate: f32,
    initial_length: usize,
    food_target: usize,
    bot_target: usize,
    mode: GameMode,

    agents: Vec<Agent>,
    foods: Vec<Food>,
    food_grid: SpatialGrid,
    camera: Camera,
    ids: IdAllocator,
    rng: Pcg32,
    lock_on: Option<Vec2>,
    standings: Standings,
    events: Vec<GameEvent>,
    outcome: Outcome,
    ticks: u64,
}

impl ArenaGame {
    /// Arena with no agents or food yet
    pub fn empty(config: &SimConfig, mode: GameMode) -> SimResult<Self> {
        config.validate()?;
        let humans = match mode {
            GameMode::Solo => 1,
            GameMode::Versus => 2,
        };
        Ok(Self {
            world_size: config.world_size,
            base_speed: config.base_speed,
            boost_multiplier: config.boost_speed_multiplier,
            turn_rate: config.turn_rate_per_tick,
            initial_length: config.initial_agent_length as usize,
            food_target: config.food_target_count as usize,
            bot_target: (config.bot_count as usize).saturating_sub(humans),
            mode,
            agents: Vec::new(),
            foods: Vec::new(),
            food_grid: SpatialGrid::new(FOOD_GRID_CELL)?,
            camera: Camera::new(
                Vec2::new(config.viewport_width, config.viewport_height),
                config.world_size,
            ),
            ids: IdAllocator::default(),
            rng: Pcg32::seed_from_u64(config.seed),
            lock_on: None,
            standings: Standings::new(),
            events: Vec::new(),
            outcome: Outcome::Running,
            ticks: 0,
        })
    }

    /// Fully populated arena: humans at the centre, bots around them, food
    /// filled to target
    pub fn new(config: &SimConfig, mode: GameMode) -> SimResult<Self> {
        let mut game = Self::empty(config, mode)?;
        let center = Vec2::splat(game.world_size / 2.0);

        let heading = game.random_heading();
        let primary = game.spawn_agent(Role::HumanPrimary, "Player 1", center, heading)?;
        if mode == GameMode::Versus {
            let heading = game.random_heading();
            let pos = center + Vec2::new(SECONDARY_OFFSET, 0.0);
            game.spawn_agent(Role::HumanSecondary, "Player 2", pos, heading)?;
        }

        for i in 0..game.bot_target {
            let pos = game.sample_spawn_point(&[center], START_CLEARANCE);
            game.spawn_bot(BOT_NAMES[i % BOT_NAMES.len()], pos, (i % PALETTE_SIZE as usize) as u8)?;
        }

        game.spawn_food(game.food_target);
        game.camera.set_tracking(Some(primary));
        game.camera.snap_to(center);
        game.standings.refresh(&game.agents);
        log::info!(
            "Arena started: {:?}, {} bots, {} food, world {}",
            mode,
            game.bot_target,
            game.foods.len(),
            game.world_size
        );
        Ok(game)
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn foods(&self) -> &[Food] {
        &self.foods
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn standings(&self) -> &Standings {
        &self.standings
    }

    pub fn world_size(&self) -> f32 {
        self.world_size
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn lock_on(&self) -> Option<Vec2> {
        self.lock_on
    }

    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Find a live entity by id
    pub fn lookup(&self, id: EntityId) -> SimResult<&Agent> {
        self.agents
            .iter()
            .find(|a| a.id == id)
            .ok_or(SimError::StaleReference(id))
    }

    pub fn lookup_mut(&mut self, id: EntityId) -> SimResult<&mut Agent> {
        self.agents
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(SimError::StaleReference(id))
    }

    fn primary(&self) -> Option<&Agent> {
        self.agents.iter().find(|a| a.role == Role::HumanPrimary)
    }

    /// Add an agent with the configured length and speed. Humans get their
    /// own palette slot; bots start on the first.
    pub fn spawn_agent(
        &mut self,
        role: Role,
        name: &str,
        head: Vec2,
        heading: f32,
    ) -> SimResult<EntityId> {
        let palette = match role {
            Role::HumanSecondary => 1,
            Role::HumanPrimary | Role::Bot => 0,
        };
        self.insert_agent(role, name, head, heading, palette)
    }

    fn insert_agent(
        &mut self,
        role: Role,
        name: &str,
        head: Vec2,
        heading: f32,
        palette: u8,
    ) -> SimResult<EntityId> {
        let id = self.ids.next_id();
        let agent = Agent::spawn(id, name, role, head, heading, self.initial_length, self.base_speed)?
            .with_palette(palette);
        self.agents.push(agent);
        self.events.push(GameEvent::AgentSpawned { id, role });
        Ok(id)
    }

    /// Id of the pointer-controlled human, dead or alive
    pub fn player_id(&self) -> Option<EntityId> {
        self.primary().map(|a| a.id)
    }

    /// Drop a food pellet at `pos`
    pub fn place_food(&mut self, pos: Vec2, size: f32, value: u32) -> SimResult<EntityId> {
        let id = self.ids.next_id();
        self.foods.push(Food::new(id, pos, size, value)?);
        Ok(id)
    }

    fn random_heading(&mut self) -> f32 {
        self.rng.random_range(-PI..PI)
    }

    fn random_spawn_point(&mut self) -> Vec2 {
        let hi = (self.world_size - SPAWN_MARGIN).max(SPAWN_MARGIN + 1.0);
        Vec2::new(
            self.rng.random_range(SPAWN_MARGIN..hi),
            self.rng.random_range(SPAWN_MARGIN..hi),
        )
    }

    /// Random point away from the walls, retried a bounded number of times
    /// until it sits outside the `clearance` box of every point in `avoid`.
    /// Falls back to the last sample.
    fn sample_spawn_point(&mut self, avoid: &[Vec2], clearance: f32) -> Vec2 {
        let mut pos = self.random_spawn_point();
        for _ in 1..SPAWN_ATTEMPTS {
            let crowded = avoid.iter().any(|p| {
                let d = *p - pos;
                d.x.abs() < clearance && d.y.abs() < clearance
            });
            if !crowded {
                break;
            }
            pos = self.random_spawn_point();
        }
        pos
    }

    fn spawn_bot(&mut self, name: &str, pos: Vec2, palette: u8) -> SimResult<EntityId> {
        let heading = self.random_heading();
        self.insert_agent(Role::Bot, name, pos, heading, palette)
    }

    fn spawn_food(&mut self, count: usize) {
        for _ in 0..count {
            let pos = Vec2::new(
                self.rng.random_range(0.0..=self.world_size),
                self.rng.random_range(0.0..=self.world_size),
            );
            let (size, value) = if self.rng.random_bool(BIG_FOOD_CHANCE) {
                (self.rng.random_range(8.0..13.0), 5)
            } else {
                (self.rng.random_range(3.0..6.0), 1)
            };
            // Positions are drawn inside the world, so this can't fail
            let _ = self.place_food(pos, size, value);
        }
    }

    /// Mark an agent dead and scatter its body as food
    fn kill(&mut self, idx: usize, cause: DeathCause) {
        let Some(agent) = self.agents.get_mut(idx) else {
            return;
        };
        if !agent.alive {
            return;
        }
        agent.alive = false;
        agent.boosting = false;
        let (id, score) = (agent.id, agent.score);
        let samples = agent.segment_count() / DEATH_FOOD_INTERVAL;
        let remains: Vec<Vec2> = agent
            .segments()
            .iter()
            .step_by(DEATH_FOOD_INTERVAL)
            .take(samples)
            .copied()
            .collect();

        let mut dropped = 0;
        for seg in remains {
            let jitter = Vec2::new(
                self.rng.random_range(-DEATH_FOOD_JITTER..=DEATH_FOOD_JITTER),
                self.rng.random_range(-DEATH_FOOD_JITTER..=DEATH_FOOD_JITTER),
            );
            let size = self.rng.random_range(6.0..10.0);
            if self.place_food(seg + jitter, size, DEATH_FOOD_VALUE).is_ok() {
                dropped += 1;
            }
        }

        log::debug!("Agent {id} died ({cause:?}), score {score}, dropped {dropped} food");
        self.events.push(GameEvent::AgentDied {
            id,
            cause,
            score,
            food_dropped: dropped,
        });
    }

    /// Advance one tick
    pub fn tick(&mut self, input: &ArenaInput) {
        if self.outcome != Outcome::Running {
            return;
        }
        self.ticks += 1;

        if input.clear_lock_on {
            self.lock_on = None;
        }
        if let Some(target) = input.lock_on {
            self.lock_on = Some(target);
        }
        let controls = Controls {
            pointer_world: self
                .lock_on
                .or_else(|| input.pointer.map(|p| self.camera.to_world(p))),
            pointer_boost: input.pointer_boost,
            turn_left: input.turn_left,
            turn_right: input.turn_right,
            key_boost: input.key_boost,
        };

        for agent in self.agents.iter_mut().filter(|a| a.alive) {
            agent.invulnerable_ticks = agent.invulnerable_ticks.saturating_sub(1);
        }

        // Everyone decides from the same pre-move world
        self.food_grid.rebuild(self.foods.iter().map(|f| f.pos));
        let decisions: Vec<Option<Steer>> = {
            let sensing = Sensing {
                world_size: self.world_size,
                agents: &self.agents,
                foods: &self.foods,
                food_grid: &self.food_grid,
            };
            self.agents
                .iter()
                .map(|agent| {
                    agent.alive.then(|| {
                        steering::decide(agent, &sensing, &controls, self.turn_rate, &mut self.rng)
                    })
                })
                .collect()
        };

        for (idx, steer) in decisions.iter().enumerate() {
            if let Some(steer) = steer {
                self.move_agent(idx, steer);
            }
        }

        self.resolve_collisions();

        self.agents.retain(|a| a.alive || a.role.is_human());
        self.maintain_population();
        self.check_outcome();
        self.update_camera();
        self.standings.refresh(&self.agents);
    }

    fn move_agent(&mut self, idx: usize, steer: &Steer) {
        let base = self.base_speed;
        let boost_speed = base * self.boost_multiplier;
        let world = self.world_size;

        let trail = {
            let agent = &mut self.agents[idx];
            steering::apply(agent, steer, self.turn_rate);
            if agent.boosting && agent.segment_count() > BOOST_MIN_LENGTH {
                agent.speed = boost_speed;
                if self.rng.random_bool(BOOST_COST_CHANCE) {
                    agent.shed_tail(BOOST_MIN_LENGTH)
                } else {
                    None
                }
            } else {
                agent.speed = base;
                agent.boosting = false;
                None
            }
        };
        if let Some(tail) = trail {
            let _ = self.place_food(tail, TRAIL_FOOD_SIZE, 1);
        }

        let agent = &self.agents[idx];
        let next = agent.head() + direction(agent.heading) * agent.speed;
        if !next.is_finite() {
            let id = agent.id;
            log::warn!("Agent {id} produced a non-finite head, removing");
            self.events.push(GameEvent::Anomaly {
                id,
                detail: "non-finite head position".into(),
            });
            self.kill(idx, DeathCause::Anomaly);
            return;
        }
        if next.x < 0.0 || next.x > world || next.y < 0.0 || next.y > world {
            self.kill(idx, DeathCause::Wall);
            return;
        }

        let agent = &mut self.agents[idx];
        agent.advance_head(next);

        let reach = agent.width + PICKUP_MARGIN;
        let mut eaten = Vec::new();
        self.foods.retain(|f| {
            let r = reach + f.size;
            if next.distance_squared(f.pos) < r * r {
                eaten.push(f.value);
                false
            } else {
                true
            }
        });
        for value in eaten {
            agent.eat(value);
            if agent.role.is_human() && value > 1 {
                self.events.push(GameEvent::FloatingText {
                    pos: next - Vec2::new(0.0, 20.0),
                    text: format!("+{}", value * 10),
                });
            }
        }
    }

    /// Head-vs-body checks. A dead agent drops out of the checks at once, so
    /// of two heads meeting on the same tick only the first one processed dies.
    fn resolve_collisions(&mut self) {
        let bounds: Vec<Option<(Vec2, Vec2)>> = self.agents.iter().map(Agent::bounds).collect();

        for a in 0..self.agents.len() {
            let me = &self.agents[a];
            if !me.alive || me.is_invulnerable() {
                continue;
            }
            let head = me.head();

            let hit = self.agents.iter().enumerate().find_map(|(b, other)| {
                if !other.alive || other.is_invulnerable() {
                    return None;
                }
                let reach = HIT_FACTOR * (me.width + other.width);
                let (lo, hi) = bounds[b]?;
                if head.cmpge(hi + reach).any() || head.cmple(lo - reach).any() {
                    return None;
                }
                let skip = if a == b { SELF_SKIP } else { 0 };
                let reach_sq = reach * reach;
                other
                    .segments()
                    .iter()
                    .skip(skip)
                    .step_by(COLLISION_STRIDE)
                    .any(|seg| seg.distance_squared(head) < reach_sq)
                    .then_some(b)
            });

            if let Some(b) = hit {
                let cause = if a == b {
                    DeathCause::SelfCollision
                } else {
                    DeathCause::Collision {
                        other: self.agents[b].id,
                    }
                };
                self.events.push(GameEvent::FloatingText {
                    pos: head,
                    text: "CRASH!".into(),
                });
                self.kill(a, cause);
            }
        }
    }

    fn maintain_population(&mut self) {
        let alive_bots = self
            .agents
            .iter()
            .filter(|a| a.alive && a.role == Role::Bot)
            .count();
        if alive_bots < self.bot_target && self.rng.random_bool(RESPAWN_CHANCE) {
            let human_heads: Vec<Vec2> = self
                .agents
                .iter()
                .filter(|a| a.alive && a.role.is_human())
                .map(Agent::head)
                .collect();
            let pos = self.sample_spawn_point(&human_heads, RESPAWN_CLEARANCE);
            let palette = self.rng.random_range(0..PALETTE_SIZE);
            if let Err(e) = self.spawn_bot("Bot", pos, palette) {
                log::warn!("Bot respawn failed: {e}");
            }
        }

        if self.foods.len() < self.food_target {
            let deficit = self.food_target - self.foods.len();
            self.spawn_food(deficit.min(FOOD_TOPUP_PER_TICK));
        }
    }

    fn check_outcome(&mut self) {
        let outcome = match self.mode {
            GameMode::Solo => match self.primary() {
                Some(p) if !p.alive => Outcome::GameOver,
                _ => Outcome::Running,
            },
            GameMode::Versus => {
                let humans = self.agents.iter().filter(|a| a.role.is_human()).count();
                let mut alive = self.agents.iter().filter(|a| a.alive && a.role.is_human());
                match (humans > 1, alive.next(), alive.next()) {
                    (true, Some(survivor), None) => Outcome::Winner(survivor.id),
                    (true, None, _) => Outcome::Draw,
                    _ => Outcome::Running,
                }
            }
        };
        if outcome != Outcome::Running {
            log::info!("Arena finished after {} ticks: {:?}", self.ticks, outcome);
        }
        self.outcome = outcome;
    }

    /// Follow the primary human, else the other human, else the first live
    /// bot, else hold still
    fn update_camera(&mut self) {
        let pick = |role: fn(&Agent) -> bool| {
            self.agents
                .iter()
                .find(|a| a.alive && role(a))
                .map(|a| (a.id, a.head()))
        };
        let target = pick(|a: &Agent| a.role == Role::HumanPrimary)
            .or_else(|| pick(|a: &Agent| a.role == Role::HumanSecondary))
            .or_else(|| pick(|a: &Agent| a.role == Role::Bot));
        self.camera.set_tracking(target.map(|(id, _)| id));
        self.camera.follow(target.map(|(_, head)| head));
    }
}

impl Simulation for ArenaGame {
    type Input = ArenaInput;

    fn step(&mut self, input: &ArenaInput, _wallet: &mut dyn Wallet) {
        self.tick(input);
    }

    fn is_finished(&self) -> bool {
        self.outcome != Outcome::Running
    }

    fn clear_one_shots(input: &mut ArenaInput) {
        input.lock_on = None;
        input.clear_lock_on = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::steering::Behavior;
    use proptest::prelude::*;
    use std::f32::consts::FRAC_PI_2;

    fn quiet_config() -> SimConfig {
        SimConfig {
            bot_count: 0,
            food_target_count: 0,
            ..Default::default()
        }
    }

    #[test]
    fn test_new_game_population() {
        let cfg = SimConfig::default();
        let game = ArenaGame::new(&cfg, GameMode::Solo).unwrap();
        let humans = game.agents().iter().filter(|a| a.role.is_human()).count();
        let bots = game.agents().iter().filter(|a| a.role == Role::Bot).count();
        assert_eq!(humans, 1);
        assert_eq!(bots, cfg.bot_count as usize - 1);
        assert_eq!(game.foods().len(), cfg.food_target_count as usize);
        assert_eq!(game.agents()[1].name, "Slippy");

        let center = Vec2::splat(cfg.world_size / 2.0);
        for bot in game.agents().iter().filter(|a| a.role == Role::Bot) {
            let d = bot.head() - center;
            assert!(d.x.abs() >= START_CLEARANCE || d.y.abs() >= START_CLEARANCE);
        }

        let versus = ArenaGame::new(&cfg, GameMode::Versus).unwrap();
        assert_eq!(versus.agents().iter().filter(|a| a.role.is_human()).count(), 2);
        assert_eq!(versus.agents().len(), cfg.bot_count as usize);
    }

    #[test]
    fn test_spawned_agents_carry_palettes() {
        let cfg = SimConfig {
            bot_count: 12,
            food_target_count: 0,
            ..Default::default()
        };
        let game = ArenaGame::new(&cfg, GameMode::Versus).unwrap();
        let agents = game.agents();
        assert_eq!(agents[0].palette, 0);
        assert_eq!(agents[1].role, Role::HumanSecondary);
        assert_eq!(agents[1].palette, 1);
        // Initial bots cycle through the palette in spawn order
        let bot_palettes: Vec<u8> = agents[2..].iter().map(|a| a.palette).collect();
        assert_eq!(bot_palettes, vec![0, 1, 2, 3, 4, 5, 6, 7, 0, 1]);
        assert_eq!(game.player_id(), Some(agents[0].id));
    }

    #[test]
    fn test_left_wall_bot_steers_right() {
        let mut game = ArenaGame::empty(&quiet_config(), GameMode::Solo).unwrap();
        let id = game
            .spawn_agent(Role::Bot, "edge", Vec2::new(50.0, 1500.0), FRAC_PI_2)
            .unwrap();
        // Tempting food the other way must not win
        game.place_food(Vec2::new(60.0, 1400.0), 5.0, 1).unwrap();

        let snapshot = {
            let sensing_grid = {
                let mut g = SpatialGrid::new(FOOD_GRID_CELL).unwrap();
                g.rebuild(game.foods().iter().map(|f| f.pos));
                g
            };
            let sensing = Sensing {
                world_size: game.world_size(),
                agents: game.agents(),
                foods: game.foods(),
                food_grid: &sensing_grid,
            };
            let mut rng = Pcg32::seed_from_u64(1);
            steering::decide(&game.agents()[0], &sensing, &Controls::default(), 0.12, &mut rng)
        };
        assert_eq!(snapshot.behavior, Behavior::AvoidWall);

        game.tick(&ArenaInput::default());
        let bot = game.lookup(id).unwrap();
        assert!(bot.target_heading.abs() < 1e-6, "got {}", bot.target_heading);
    }

    #[test]
    fn test_wall_death_same_tick() {
        let mut game = ArenaGame::empty(&quiet_config(), GameMode::Solo).unwrap();
        let id = game
            .spawn_agent(Role::Bot, "edge", Vec2::new(1.0, 1500.0), PI)
            .unwrap();
        game.take_events();
        game.tick(&ArenaInput::default());

        let events = game.take_events();
        assert!(events.iter().any(|e| matches!(
            e,
            GameEvent::AgentDied { id: dead, cause: DeathCause::Wall, .. } if *dead == id
        )));
        // Dead bots leave the arena
        assert_eq!(game.lookup(id).err(), Some(SimError::StaleReference(id)));
        assert_eq!(game.foods().len(), game.initial_length / DEATH_FOOD_INTERVAL);
    }

    #[test]
    fn test_first_head_processed_dies_second_survives() {
        let mut game = ArenaGame::empty(&quiet_config(), GameMode::Versus).unwrap();
        let a = game
            .spawn_agent(Role::HumanPrimary, "A", Vec2::new(1000.0, 1000.0), 0.0)
            .unwrap();
        let b = game
            .spawn_agent(Role::HumanSecondary, "B", Vec2::new(1003.5, 1003.5), -FRAC_PI_2)
            .unwrap();
        for agent in game.agents.iter_mut() {
            agent.invulnerable_ticks = 0;
        }
        let length = game.lookup(a).unwrap().segment_count();

        game.tick(&ArenaInput::default());

        assert!(!game.lookup(a).unwrap().alive);
        assert!(game.lookup(b).unwrap().alive);
        assert_eq!(game.outcome(), Outcome::Winner(b));
        assert_eq!(game.foods().len(), length / DEATH_FOOD_INTERVAL);
        assert!(game.take_events().iter().any(|e| matches!(
            e,
            GameEvent::AgentDied { cause: DeathCause::Collision { other }, .. } if *other == b
        )));
        assert!(game.is_finished());
    }

    #[test]
    fn test_invulnerable_agents_pass_through() {
        let mut game = ArenaGame::empty(&quiet_config(), GameMode::Versus).unwrap();
        game.spawn_agent(Role::HumanPrimary, "A", Vec2::new(1000.0, 1000.0), 0.0)
            .unwrap();
        game.spawn_agent(Role::HumanSecondary, "B", Vec2::new(1003.5, 1003.5), -FRAC_PI_2)
            .unwrap();
        game.tick(&ArenaInput::default());
        assert!(game.agents().iter().all(|a| a.alive));
        assert_eq!(game.outcome(), Outcome::Running);
    }

    #[test]
    fn test_solo_game_over_and_camera_fallback() {
        let mut game = ArenaGame::empty(&quiet_config(), GameMode::Solo).unwrap();
        let p = game
            .spawn_agent(Role::HumanPrimary, "P", Vec2::new(2.0, 1500.0), PI)
            .unwrap();
        let bot = game
            .spawn_agent(Role::Bot, "B", Vec2::new(1500.0, 1500.0), 0.0)
            .unwrap();
        game.tick(&ArenaInput::default());

        assert_eq!(game.outcome(), Outcome::GameOver);
        assert!(!game.lookup(p).unwrap().alive);
        assert_eq!(game.camera().tracking(), Some(bot));

        // Finished games ignore further ticks
        let ticks = game.ticks();
        game.tick(&ArenaInput::default());
        assert_eq!(game.ticks(), ticks);
    }

    #[test]
    fn test_eating_grows_and_scores() {
        let mut game = ArenaGame::empty(&quiet_config(), GameMode::Solo).unwrap();
        let id = game
            .spawn_agent(Role::HumanPrimary, "P", Vec2::new(1500.0, 1500.0), 0.0)
            .unwrap();
        game.place_food(Vec2::new(1510.0, 1500.0), 10.0, 5).unwrap();
        game.take_events();
        game.tick(&ArenaInput::default());

        let agent = game.lookup(id).unwrap();
        assert_eq!(agent.score, 50);
        assert!(game.foods().is_empty());
        assert!(game.take_events().iter().any(
            |e| matches!(e, GameEvent::FloatingText { text, .. } if text == "+50")
        ));
    }

    #[test]
    fn test_pointer_is_mapped_through_camera() {
        let mut game = ArenaGame::empty(&quiet_config(), GameMode::Solo).unwrap();
        let id = game
            .spawn_agent(Role::HumanPrimary, "P", Vec2::new(1500.0, 1500.0), 0.0)
            .unwrap();
        game.camera.offset = Vec2::new(1100.0, 1200.0);
        // Viewport (400, 600) is world (1500, 1800): straight down from the head
        let input = ArenaInput {
            pointer: Some(Vec2::new(400.0, 600.0)),
            ..Default::default()
        };
        game.tick(&input);
        let agent = game.lookup(id).unwrap();
        assert!((agent.target_heading - FRAC_PI_2).abs() < 1e-4);
    }

    #[test]
    fn test_lock_on_overrides_pointer_until_cleared() {
        let mut game = ArenaGame::empty(&quiet_config(), GameMode::Solo).unwrap();
        let id = game
            .spawn_agent(Role::HumanPrimary, "P", Vec2::new(1500.0, 1500.0), 0.0)
            .unwrap();
        let mut input = ArenaInput {
            pointer: Some(Vec2::ZERO),
            lock_on: Some(Vec2::new(1500.0, 2500.0)),
            ..Default::default()
        };
        game.tick(&input);
        ArenaGame::clear_one_shots(&mut input);
        assert!(input.lock_on.is_none());
        assert!(game.lock_on().is_some());
        let locked = game.lookup(id).unwrap().target_heading;
        assert!((locked - FRAC_PI_2).abs() < 0.01);

        input.clear_lock_on = true;
        game.tick(&input);
        assert!(game.lock_on().is_none());
    }

    #[test]
    fn test_boost_sheds_tail_into_food() {
        let cfg = SimConfig {
            initial_agent_length: 40,
            ..quiet_config()
        };
        let mut game = ArenaGame::empty(&cfg, GameMode::Solo).unwrap();
        let id = game
            .spawn_agent(Role::HumanPrimary, "P", Vec2::new(1500.0, 1500.0), 0.0)
            .unwrap();
        let input = ArenaInput {
            pointer_boost: true,
            ..Default::default()
        };
        for _ in 0..100 {
            game.tick(&input);
        }
        let agent = game.lookup(id).unwrap();
        let shed = 40 - agent.length();
        assert!(shed > 0);
        assert!(agent.length() >= BOOST_MIN_LENGTH);
        // Trail pellets sit behind the head, out of reach
        assert_eq!(game.foods().len(), shed);
        assert!((agent.speed - cfg.base_speed * cfg.boost_speed_multiplier).abs() < 1e-6);
    }

    #[test]
    fn test_bots_respawn_and_food_tops_up() {
        let cfg = SimConfig {
            bot_count: 4,
            food_target_count: 40,
            ..Default::default()
        };
        let mut game = ArenaGame::empty(&cfg, GameMode::Solo).unwrap();
        let p = game
            .spawn_agent(Role::HumanPrimary, "P", Vec2::splat(1500.0), 0.0)
            .unwrap();
        game.lookup_mut(p).unwrap().invulnerable_ticks = u32::MAX;
        for _ in 0..300 {
            game.tick(&ArenaInput::default());
        }
        let bots = game.agents().iter().filter(|a| a.role == Role::Bot).count();
        assert!(bots > 0 && bots <= 3);
        assert!(game.foods().len() >= 35);
    }

    #[test]
    fn test_same_seed_same_game() {
        let cfg = SimConfig::default();
        let mut a = ArenaGame::new(&cfg, GameMode::Solo).unwrap();
        let mut b = ArenaGame::new(&cfg, GameMode::Solo).unwrap();
        for _ in 0..300 {
            a.tick(&ArenaInput::default());
            b.tick(&ArenaInput::default());
        }
        let heads_a: Vec<Vec2> = a.agents().iter().map(Agent::head).collect();
        let heads_b: Vec<Vec2> = b.agents().iter().map(Agent::head).collect();
        assert_eq!(heads_a, heads_b);
        assert_eq!(a.foods().len(), b.foods().len());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(8))]

        #[test]
        fn prop_segment_count_within_length(seed in any::<u64>(), boost in any::<bool>()) {
            let cfg = SimConfig { seed, bot_count: 10, food_target_count: 120, ..Default::default() };
            let mut game = ArenaGame::new(&cfg, GameMode::Solo).unwrap();
            let input = ArenaInput { pointer_boost: boost, ..Default::default() };
            for _ in 0..200 {
                game.tick(&input);
                for agent in game.agents() {
                    prop_assert!(agent.segment_count() <= agent.length());
                    prop_assert!(agent.segment_count() >= 1);
                }
            }
        }
    }
}
