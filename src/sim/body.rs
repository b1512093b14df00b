//! Physics-bearing circular bodies (coins, plinko balls)

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

/// Stable identity of a simulated entity
pub type EntityId = u32;

/// A simulated circular body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Body {
    pub id: EntityId,
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    /// Stake or payout weight carried to settlement
    pub value: f64,
}

impl Body {
    /// Create a body, guarding the finite-position / positive-radius invariant.
    pub fn new(id: EntityId, pos: Vec2, radius: f32) -> SimResult<Self> {
        if !pos.is_finite() {
            return Err(SimError::NumericAnomaly {
                id,
                detail: "non-finite spawn position",
            });
        }
        if !(radius.is_finite() && radius > 0.0) {
            return Err(SimError::InvalidConfiguration(format!(
                "body radius must be positive, got {radius}"
            )));
        }
        Ok(Self {
            id,
            pos,
            vel: Vec2::ZERO,
            radius,
            value: 0.0,
        })
    }

    pub fn with_velocity(mut self, vel: Vec2) -> Self {
        self.vel = vel;
        self
    }

    pub fn with_value(mut self, value: f64) -> Self {
        self.value = value;
        self
    }

    /// Both position and velocity are finite
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.pos.is_finite() && self.vel.is_finite()
    }

    /// Integrate one tick of drop physics: gravity, damping, then move
    pub fn integrate(&mut self, gravity: f32, air_resistance: f32) {
        self.vel.y += gravity;
        self.vel *= air_resistance;
        self.pos += self.vel;
    }
}

/// Hands out monotonically increasing entity IDs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdAllocator {
    next: EntityId,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl IdAllocator {
    pub fn next_id(&mut self) -> EntityId {
        let id = self.next;
        self.next = self.next.wrapping_add(1).max(1);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_nan() {
        let err = Body::new(7, Vec2::new(f32::NAN, 0.0), 3.0).unwrap_err();
        assert!(matches!(err, SimError::NumericAnomaly { id: 7, .. }));
    }

    #[test]
    fn test_new_rejects_zero_radius() {
        assert!(Body::new(1, Vec2::ZERO, 0.0).is_err());
        assert!(Body::new(1, Vec2::ZERO, -1.0).is_err());
    }

    #[test]
    fn test_integrate_gravity_then_damping() {
        let mut b = Body::new(1, Vec2::ZERO, 3.0).unwrap();
        b.integrate(0.3, 0.5);
        assert!((b.vel.y - 0.15).abs() < 1e-6);
        assert!((b.pos.y - 0.15).abs() < 1e-6);
    }

    #[test]
    fn test_ids_unique() {
        let mut ids = IdAllocator::default();
        let a = ids.next_id();
        let b = ids.next_id();
        assert_ne!(a, b);
        assert_eq!(a, 1);
    }
}
