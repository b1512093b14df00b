//! Follow camera
//!
//! The viewport chases a target head with exponential smoothing and stays
//! within a small margin of the world. Pointer input arrives in viewport
//! coordinates and goes through [`Camera::to_world`] before it steers anything.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::body::EntityId;

/// Fraction of the remaining distance covered each tick
pub const CAMERA_SMOOTHING: f32 = 0.1;
/// How far past the world edge the viewport may scroll
pub const CAMERA_MARGIN: f32 = 50.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Camera {
    /// World position of the viewport's top-left corner
    pub offset: Vec2,
    viewport: Vec2,
    world_size: f32,
    /// Agent currently followed, if any
    tracking: Option<EntityId>,
}

impl Camera {
    pub fn new(viewport: Vec2, world_size: f32) -> Self {
        Self {
            offset: Vec2::ZERO,
            viewport,
            world_size,
            tracking: None,
        }
    }

    pub fn viewport(&self) -> Vec2 {
        self.viewport
    }

    pub fn tracking(&self) -> Option<EntityId> {
        self.tracking
    }

    pub fn set_tracking(&mut self, id: Option<EntityId>) {
        self.tracking = id;
    }

    fn clamp(&self, offset: Vec2) -> Vec2 {
        let lo = Vec2::splat(-CAMERA_MARGIN);
        let hi = (Vec2::splat(self.world_size + CAMERA_MARGIN) - self.viewport).max(lo);
        offset.clamp(lo, hi)
    }

    /// Center on `target` immediately
    pub fn snap_to(&mut self, target: Vec2) {
        self.offset = self.clamp(target - self.viewport / 2.0);
    }

    /// Ease toward centering `target`; `None` holds the current position
    pub fn follow(&mut self, target: Option<Vec2>) {
        if let Some(target) = target {
            let desired = target - self.viewport / 2.0;
            self.offset += (desired - self.offset) * CAMERA_SMOOTHING;
        }
        self.offset = self.clamp(self.offset);
    }

    /// Viewport-local point to world coordinates
    #[inline]
    pub fn to_world(&self, viewport_pos: Vec2) -> Vec2 {
        viewport_pos + self.offset
    }
}
