//! Arcade Sim entry point
//!
//! The browser build is driven from JS through `arcade_sim::web::Hub`. The
//! native binary runs each game headless for a few simulated seconds and logs
//! what happened; `RUST_LOG=debug` shows settlements and deaths as they occur.

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Arcade Sim (native) starting...");

    let config = match std::env::args().nth(1) {
        Some(path) => match std::fs::read_to_string(&path) {
            Ok(json) => match arcade_sim::SimConfig::from_json(&json) {
                Ok(cfg) => cfg.sanitized(),
                Err(e) => {
                    log::error!("{path}: {e}");
                    std::process::exit(2);
                }
            },
            Err(e) => {
                log::error!("Cannot read {path}: {e}");
                std::process::exit(2);
            }
        },
        None => arcade_sim::SimConfig::default(),
    };

    if let Err(e) = demo::run(&config) {
        log::error!("Demo aborted: {e}");
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is web::init, this is just to satisfy the compiler
}

#[cfg(not(target_arch = "wasm32"))]
mod demo {
    use arcade_sim::consts::SIM_DT;
    use arcade_sim::sim::{
        ArenaGame, ArenaInput, GameEvent, GameMode, LoopDriver, PlinkoGame, PlinkoInput,
        PusherGame, PusherInput, Simulation,
    };
    use arcade_sim::{LedgerWallet, SimConfig, SimResult};

    /// Simulated seconds per game
    const DEMO_SECONDS: u32 = 20;
    /// Frames per simulated second, deliberately off the tick rate
    const FRAME_RATE: u32 = 50;

    pub fn run(config: &SimConfig) -> SimResult<()> {
        let mut wallet = LedgerWallet::new();
        log::info!("Wallet opens at {:.0}", wallet.balance());

        let pusher = PusherGame::new(config)?;
        let paid = drive(pusher, &mut wallet, |frame, input: &mut PusherInput| {
            // One coin every half second
            input.drop_coin = frame % (FRAME_RATE / 2) == 0;
        })
        .settlements()
        .total_paid();
        log::info!("Coin pusher paid {paid:.1}, wallet {:.1}", wallet.balance());

        let mut plinko = PlinkoGame::new(config)?;
        plinko.set_auto_drop(true);
        let plinko = drive(plinko, &mut wallet, |_, _: &mut PlinkoInput| {});
        let history: Vec<String> = plinko.history().map(|m| format!("{m}x")).collect();
        log::info!(
            "Plinko settled {} balls, last results [{}], wallet {:.1}",
            plinko.settlements().count(),
            history.join(", "),
            wallet.balance()
        );

        let arena = ArenaGame::new(config, GameMode::Solo)?;
        let arena = drive(arena, &mut wallet, |frame, input: &mut ArenaInput| {
            // Sweep the pointer around the viewport centre
            let t = frame as f32 / FRAME_RATE as f32;
            let center = glam::Vec2::new(config.viewport_width, config.viewport_height) / 2.0;
            input.pointer = Some(center + glam::Vec2::new(t.cos(), t.sin()) * 150.0);
            input.pointer_boost = frame % (FRAME_RATE * 3) < FRAME_RATE / 2;
        });
        let frame = arena.frame();
        log::info!(
            "Arena after {} ticks: {:?}, {} agents, {} food",
            frame.tick,
            frame.outcome,
            frame.agents.len(),
            frame.foods.len()
        );
        for (rank, entry) in frame.standings.iter().enumerate() {
            log::info!("  #{} {} ({:?}) {}", rank + 1, entry.name, entry.role, entry.score);
        }

        log::info!("Wallet closes at {:.1}", wallet.balance());
        Ok(())
    }

    /// Run a game through the loop driver for the demo duration
    fn drive<S, F>(sim: S, wallet: &mut LedgerWallet, mut feed: F) -> S
    where
        S: Simulation + Drainable,
        F: FnMut(u32, &mut S::Input),
    {
        let mut driver = LoopDriver::new(sim);
        let mut input = S::Input::default();
        let frame_dt = 1.0 / FRAME_RATE as f32;
        driver.start();

        for frame in 0..DEMO_SECONDS * FRAME_RATE {
            feed(frame, &mut input);
            driver.advance(frame_dt, &mut input, wallet);
            for event in driver.sim_mut().drain() {
                match event {
                    GameEvent::Feedback { text } => log::info!("{text}"),
                    GameEvent::Anomaly { id, detail } => log::warn!("Anomaly on {id}: {detail}"),
                    _ => {}
                }
            }
            if driver.state() != arcade_sim::sim::DriverState::Running {
                break;
            }
        }
        driver.stop();
        log::debug!("{} ticks in {:.1}s", driver.ticks(), driver.ticks() as f32 * SIM_DT);
        driver.into_sim()
    }

    /// Games whose event queue the demo prints
    trait Drainable {
        fn drain(&mut self) -> Vec<GameEvent>;
    }

    impl Drainable for PusherGame {
        fn drain(&mut self) -> Vec<GameEvent> {
            self.take_events()
        }
    }

    impl Drainable for PlinkoGame {
        fn drain(&mut self) -> Vec<GameEvent> {
            self.take_events()
        }
    }

    impl Drainable for ArenaGame {
        fn drain(&mut self) -> Vec<GameEvent> {
            self.take_events()
        }
    }
}
