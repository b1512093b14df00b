//! Fixed-timestep loop driver
//!
//! Accumulates real frame time and runs whole simulation ticks. Frame time
//! is clamped to [`MAX_FRAME_DT`], so one frame runs at most six ticks.
//! Every `start()` hands out a generation token; a frame callback scheduled
//! under an older token is ignored, so a stale callback can never touch a
//! stopped game or its wallet.

use crate::consts::{MAX_FRAME_DT, SIM_DT};
use crate::wallet::Wallet;

/// A game that advances in fixed ticks
pub trait Simulation {
    type Input: Default;

    /// Advance exactly one tick
    fn step(&mut self, input: &Self::Input, wallet: &mut dyn Wallet);

    /// Whether the game reached a terminal state
    fn is_finished(&self) -> bool {
        false
    }

    /// Reset inputs that must fire only once (drops, clicks)
    fn clear_one_shots(_input: &mut Self::Input) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DriverState {
    #[default]
    Idle,
    Running,
    Stopped,
}

pub struct LoopDriver<S: Simulation> {
    sim: S,
    state: DriverState,
    accumulator: f32,
    generation: u64,
    /// Total ticks run across all frames
    ticks: u64,
}

impl<S: Simulation> LoopDriver<S> {
    pub fn new(sim: S) -> Self {
        Self {
            sim,
            state: DriverState::Idle,
            accumulator: 0.0,
            generation: 0,
            ticks: 0,
        }
    }

    pub fn sim(&self) -> &S {
        &self.sim
    }

    pub fn sim_mut(&mut self) -> &mut S {
        &mut self.sim
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn into_sim(self) -> S {
        self.sim
    }

    /// Begin (or resume) running. Returns the token frame callbacks must carry.
    pub fn start(&mut self) -> u64 {
        self.generation += 1;
        self.accumulator = 0.0;
        self.state = DriverState::Running;
        log::info!("Loop started (generation {})", self.generation);
        self.generation
    }

    /// Stop running. Safe to call any number of times; returns `true` only
    /// when this call changed the state.
    pub fn stop(&mut self) -> bool {
        if self.state != DriverState::Running {
            return false;
        }
        self.state = DriverState::Stopped;
        self.generation += 1;
        self.accumulator = 0.0;
        log::info!("Loop stopped after {} ticks", self.ticks);
        true
    }

    #[inline]
    pub fn is_current(&self, token: u64) -> bool {
        self.state == DriverState::Running && token == self.generation
    }

    /// Feed one frame's elapsed time. Returns how many ticks ran.
    pub fn advance(&mut self, frame_dt: f32, input: &mut S::Input, wallet: &mut dyn Wallet) -> u32 {
        if self.state != DriverState::Running {
            return 0;
        }
        let dt = if frame_dt.is_nan() {
            0.0
        } else {
            frame_dt.clamp(0.0, MAX_FRAME_DT)
        };
        self.accumulator += dt;

        let mut substeps = 0;
        while self.accumulator >= SIM_DT {
            self.sim.step(input, wallet);
            self.accumulator -= SIM_DT;
            substeps += 1;
            self.ticks += 1;
            S::clear_one_shots(input);

            if self.sim.is_finished() {
                self.stop();
                break;
            }
        }
        substeps
    }

    /// [`advance`](Self::advance) on behalf of a scheduled callback
    pub fn advance_for(
        &mut self,
        token: u64,
        frame_dt: f32,
        input: &mut S::Input,
        wallet: &mut dyn Wallet,
    ) -> u32 {
        if !self.is_current(token) {
            log::debug!("Ignoring stale frame callback (token {token}, current {})", self.generation);
            return 0;
        }
        self.advance(frame_dt, input, wallet)
    }
}
