//! Arcade Sim - real-time simulation core for the arcade hub
//!
//! Core modules:
//! - `sim`: Simulation engines (coin pusher, plinko, worm arena) and their shared
//!   body/collision/settlement plumbing
//! - `config`: Tunable knobs with documented defaults
//! - `wallet`: The coin-ledger interface the betting games settle against
//! - `standings`: Live arena scoreboard
//! - `error`: Error taxonomy
//! - `web`: Browser facade (wasm32 only)

pub mod config;
pub mod error;
pub mod sim;
pub mod standings;
pub mod wallet;

#[cfg(target_arch = "wasm32")]
pub mod web;

pub use config::{RiskTier, SimConfig};
pub use error::{SimError, SimResult};
pub use standings::Standings;
pub use wallet::{Currency, LedgerWallet, Stake, Wallet};

use glam::Vec2;

/// Loop timing constants
pub mod consts {
    /// Simulation ticks per second (display refresh rate the games were tuned at)
    pub const TICK_RATE: u32 = 60;
    /// Fixed simulation timestep in seconds
    pub const SIM_DT: f32 = 1.0 / TICK_RATE as f32;
    /// Longest frame delta the driver will accumulate (seconds); also bounds
    /// the ticks run per frame after a long hitch
    pub const MAX_FRAME_DT: f32 = 0.1;
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Signed shortest rotation that takes `from` onto `to`, in (-π, π]
#[inline]
pub fn angle_delta(from: f32, to: f32) -> f32 {
    use std::f32::consts::{PI, TAU};
    let mut diff = (to - from) % TAU;
    if diff <= -PI {
        diff += TAU;
    } else if diff > PI {
        diff -= TAU;
    }
    diff
}

/// Unit vector pointing along `angle`
#[inline]
pub fn direction(angle: f32) -> Vec2 {
    Vec2::new(angle.cos(), angle.sin())
}

/// Angle of the ray from `from` to `to`
#[inline]
pub fn heading_to(from: Vec2, to: Vec2) -> f32 {
    let d = to - from;
    d.y.atan2(d.x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_normalize_angle() {
        assert!((normalize_angle(3.0 * PI) - (-PI)).abs() < 1e-5);
        assert!((normalize_angle(-3.0 * PI) - (-PI)).abs() < 1e-5);
        assert!((normalize_angle(0.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_angle_delta_wraps_short_way() {
        // From just below +π to just above -π is a small positive turn
        let d = angle_delta(PI - 0.1, -PI + 0.1);
        assert!((d - 0.2).abs() < 1e-4, "got {d}");

        let d = angle_delta(-PI + 0.1, PI - 0.1);
        assert!((d + 0.2).abs() < 1e-4, "got {d}");

        // Unnormalized inputs still take the short way
        let d = angle_delta(10.0 * PI, 10.0 * PI + 0.3);
        assert!((d - 0.3).abs() < 1e-3, "got {d}");
    }

    #[test]
    fn test_heading_to() {
        let h = heading_to(Vec2::new(1.0, 1.0), Vec2::new(1.0, 5.0));
        assert!((h - PI / 2.0).abs() < 1e-6);
        let h = heading_to(Vec2::ZERO, Vec2::new(-2.0, 0.0));
        assert!((h.abs() - PI).abs() < 1e-6);
    }

    #[test]
    fn test_direction_is_unit() {
        let d = direction(1.2);
        assert!((d.length() - 1.0).abs() < 1e-6);
        assert!((heading_to(Vec2::ZERO, d) - 1.2).abs() < 1e-5);
    }
}
