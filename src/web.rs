//! Browser facade
//!
//! One [`Hub`] per mounted game. The hub owns the loop driver behind
//! `Rc<RefCell<..>>` and drives it from `requestAnimationFrame`. Frames and
//! events cross into JS as JSON strings.

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::prelude::*;

use crate::config::{RiskTier, SimConfig};
use crate::consts::SIM_DT;
use crate::error::SimError;
use crate::sim::{
    ArenaGame, ArenaInput, GameEvent, GameMode, LoopDriver, PlinkoGame, PlinkoInput, PusherGame,
    PusherInput,
};
use crate::wallet::{Currency, LedgerWallet, Wallet};

#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);
    log::info!("arcade-sim loaded");
}

fn to_js(e: SimError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

enum Machine {
    Pusher(LoopDriver<PusherGame>, PusherInput),
    Plinko(LoopDriver<PlinkoGame>, PlinkoInput),
    Arena(LoopDriver<ArenaGame>, ArenaInput),
}

/// Run `$body` against whichever driver the machine holds
macro_rules! with_driver {
    ($machine:expr, $driver:ident, $input:ident => $body:expr) => {
        match $machine {
            Machine::Pusher($driver, $input) => $body,
            Machine::Plinko($driver, $input) => $body,
            Machine::Arena($driver, $input) => $body,
        }
    };
}

struct HubState {
    machine: Machine,
    wallet: LedgerWallet,
    /// Token of the running loop, 0 when stopped
    token: u64,
    raf_handle: Option<i32>,
    last_time: f64,
    events: Vec<GameEvent>,
}

impl HubState {
    fn drain_events(&mut self) {
        let events = match &mut self.machine {
            Machine::Pusher(d, _) => d.sim_mut().take_events(),
            Machine::Plinko(d, _) => d.sim_mut().take_events(),
            Machine::Arena(d, _) => d.sim_mut().take_events(),
        };
        self.events.extend(events);
    }

    fn frame_json(&self) -> Result<String, serde_json::Error> {
        match &self.machine {
            Machine::Pusher(d, _) => serde_json::to_string(&d.sim().frame()),
            Machine::Plinko(d, _) => serde_json::to_string(&d.sim().frame()),
            Machine::Arena(d, _) => serde_json::to_string(&d.sim().frame()),
        }
    }
}

#[wasm_bindgen]
pub struct Hub {
    state: Rc<RefCell<HubState>>,
}

#[wasm_bindgen]
impl Hub {
    /// `game` is one of `pusher`, `plinko`, `arena`, `arena-versus`.
    /// An empty config string means defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(game: &str, config_json: &str) -> Result<Hub, JsValue> {
        let config = if config_json.trim().is_empty() {
            SimConfig::default()
        } else {
            SimConfig::from_json(config_json).map_err(to_js)?.sanitized()
        };

        let machine = match game {
            "pusher" => Machine::Pusher(
                LoopDriver::new(PusherGame::new(&config).map_err(to_js)?),
                PusherInput::default(),
            ),
            "plinko" => Machine::Plinko(
                LoopDriver::new(PlinkoGame::new(&config).map_err(to_js)?),
                PlinkoInput::default(),
            ),
            "arena" | "arena-versus" => {
                let mode = if game == "arena" {
                    GameMode::Solo
                } else {
                    GameMode::Versus
                };
                Machine::Arena(
                    LoopDriver::new(ArenaGame::new(&config, mode).map_err(to_js)?),
                    ArenaInput::default(),
                )
            }
            other => return Err(JsValue::from_str(&format!("unknown game: {other}"))),
        };
        log::info!("Hub created for {game}");

        Ok(Hub {
            state: Rc::new(RefCell::new(HubState {
                machine,
                wallet: LedgerWallet::new(),
                token: 0,
                raf_handle: None,
                last_time: 0.0,
                events: Vec::new(),
            })),
        })
    }

    /// Start the frame loop
    pub fn start(&self) {
        let token = {
            let mut s = self.state.borrow_mut();
            if s.token != 0 {
                return;
            }
            s.last_time = 0.0;
            let token = with_driver!(&mut s.machine, driver, _input => driver.start());
            s.token = token;
            token
        };
        request_animation_frame(self.state.clone(), token);
    }

    /// Stop the frame loop. Cancels the pending frame; a callback already in
    /// flight finds its token stale and does nothing. Idempotent.
    pub fn stop(&self) -> bool {
        let mut s = self.state.borrow_mut();
        if let Some(handle) = s.raf_handle.take() {
            if let Some(window) = web_sys::window() {
                let _ = window.cancel_animation_frame(handle);
            }
        }
        s.token = 0;
        with_driver!(&mut s.machine, driver, _input => driver.stop())
    }

    pub fn is_running(&self) -> bool {
        self.state.borrow().token != 0
    }

    pub fn frame_json(&self) -> Result<String, JsValue> {
        self.state
            .borrow()
            .frame_json()
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Events since the last call, oldest first
    pub fn take_events_json(&self) -> Result<String, JsValue> {
        let events = std::mem::take(&mut self.state.borrow_mut().events);
        serde_json::to_string(&events).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    pub fn balance(&self) -> f64 {
        self.state.borrow().wallet.balance()
    }

    pub fn set_real_money(&self, real: bool) {
        let mode = if real { Currency::Real } else { Currency::Fun };
        self.state.borrow_mut().wallet.set_currency(mode);
    }

    /// Insert a coin or drop a ball on the next tick
    pub fn play(&self) {
        match &mut self.state.borrow_mut().machine {
            Machine::Pusher(_, input) => input.drop_coin = true,
            Machine::Plinko(_, input) => input.drop_ball = true,
            Machine::Arena(..) => {}
        }
    }

    pub fn set_bet(&self, bet: f64) -> Result<(), JsValue> {
        match &mut self.state.borrow_mut().machine {
            Machine::Plinko(d, _) => d.sim_mut().set_bet(bet).map_err(to_js),
            _ => Ok(()),
        }
    }

    pub fn set_auto_drop(&self, enabled: bool) {
        if let Machine::Plinko(d, _) = &mut self.state.borrow_mut().machine {
            d.sim_mut().set_auto_drop(enabled);
        }
    }

    /// Switch board; unknown combinations fall back to 16 rows, medium risk
    pub fn configure_plinko(&self, rows: u32, risk: &str) -> Result<(), JsValue> {
        let risk = risk.parse::<RiskTier>().unwrap_or_default();
        match &mut self.state.borrow_mut().machine {
            Machine::Plinko(d, _) => d.sim_mut().configure(rows, risk).map_err(to_js),
            _ => Ok(()),
        }
    }

    /// Pointer in canvas coordinates
    pub fn set_pointer(&self, x: f32, y: f32, boost: bool) {
        if let Machine::Arena(_, input) = &mut self.state.borrow_mut().machine {
            input.pointer = Some(glam::Vec2::new(x, y));
            input.pointer_boost = boost;
        }
    }

    pub fn set_keys(&self, left: bool, right: bool, boost: bool) {
        if let Machine::Arena(_, input) = &mut self.state.borrow_mut().machine {
            input.turn_left = left;
            input.turn_right = right;
            input.key_boost = boost;
        }
    }

    /// Lock steering onto a world point
    pub fn lock_on(&self, x: f32, y: f32) {
        if let Machine::Arena(_, input) = &mut self.state.borrow_mut().machine {
            input.lock_on = Some(glam::Vec2::new(x, y));
        }
    }

    pub fn clear_lock_on(&self) {
        if let Machine::Arena(_, input) = &mut self.state.borrow_mut().machine {
            input.clear_lock_on = true;
        }
    }
}

impl Drop for Hub {
    fn drop(&mut self) {
        self.stop();
    }
}

fn request_animation_frame(state: Rc<RefCell<HubState>>, token: u64) {
    let Some(window) = web_sys::window() else {
        log::warn!("No window, frame loop not scheduled");
        return;
    };
    let next = state.clone();
    let closure = Closure::once(move |time: f64| {
        game_loop(next, token, time);
    });
    match window.request_animation_frame(closure.as_ref().unchecked_ref()) {
        Ok(handle) => state.borrow_mut().raf_handle = Some(handle),
        Err(e) => log::warn!("requestAnimationFrame failed: {e:?}"),
    }
    closure.forget();
}

fn game_loop(state: Rc<RefCell<HubState>>, token: u64, time: f64) {
    {
        let mut guard = state.borrow_mut();
        let s = &mut *guard;
        s.raf_handle = None;
        if s.token != token {
            log::debug!("Dropping frame for stopped loop {token}");
            return;
        }

        let dt = if s.last_time > 0.0 {
            ((time - s.last_time) / 1000.0) as f32
        } else {
            SIM_DT
        };
        s.last_time = time;

        let wallet: &mut dyn Wallet = &mut s.wallet;
        let running = with_driver!(&mut s.machine, driver, input => {
            driver.advance_for(token, dt, input, wallet);
            driver.is_current(token)
        });
        s.drain_events();

        if !running {
            // The game finished on its own
            s.token = 0;
            return;
        }
    }

    request_animation_frame(state, token);
}
