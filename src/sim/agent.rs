//! Arena agents and food

use std::collections::VecDeque;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::body::EntityId;
use super::steering::SteeringStrategy;
use crate::direction;
use crate::error::{SimError, SimResult};

/// Body thickness of every agent
pub const AGENT_WIDTH: f32 = 18.0;
/// Gap between segments of a freshly spawned body
pub const SPAWN_SEGMENT_SPACING: f32 = 5.0;
/// Spawn protection, in ticks
pub const SPAWN_INVULNERABILITY: u32 = 120;

/// Who controls an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Pointer-controlled player
    HumanPrimary,
    /// Keyboard-controlled player (versus mode)
    HumanSecondary,
    Bot,
}

impl Role {
    #[inline]
    pub fn is_human(&self) -> bool {
        !matches!(self, Role::Bot)
    }
}

/// A multi-segment arena agent
#[derive(Debug, Clone)]
pub struct Agent {
    pub id: EntityId,
    pub name: String,
    pub role: Role,
    pub steering: SteeringStrategy,
    /// Palette slot for the renderer
    pub palette: u8,
    /// Head first
    segments: VecDeque<Vec2>,
    pub heading: f32,
    pub target_heading: f32,
    pub speed: f32,
    pub width: f32,
    /// Target segment count; the body never holds more
    length: usize,
    /// Segments still to be grown
    pub pending_growth: u32,
    pub boosting: bool,
    pub alive: bool,
    pub score: u32,
    pub invulnerable_ticks: u32,
}

impl Agent {
    /// Spawn an agent with its body laid out behind the head along `heading`,
    /// so a fresh agent can't overlap itself.
    pub fn spawn(
        id: EntityId,
        name: impl Into<String>,
        role: Role,
        head: Vec2,
        heading: f32,
        length: usize,
        speed: f32,
    ) -> SimResult<Self> {
        if !head.is_finite() || !heading.is_finite() {
            return Err(SimError::NumericAnomaly {
                id,
                detail: "non-finite spawn position",
            });
        }
        if length == 0 {
            return Err(SimError::InvalidConfiguration(
                "agent length must be at least 1".into(),
            ));
        }
        let back = -direction(heading) * SPAWN_SEGMENT_SPACING;
        let segments = (0..length).map(|i| head + back * i as f32).collect();
        Ok(Self {
            id,
            name: name.into(),
            role,
            steering: SteeringStrategy::for_role(role),
            palette: 0,
            segments,
            heading,
            target_heading: heading,
            speed,
            width: AGENT_WIDTH,
            length,
            pending_growth: 0,
            boosting: false,
            alive: true,
            score: 0,
            invulnerable_ticks: SPAWN_INVULNERABILITY,
        })
    }

    pub fn with_palette(mut self, palette: u8) -> Self {
        self.palette = palette;
        self
    }

    #[inline]
    pub fn head(&self) -> Vec2 {
        self.segments.front().copied().unwrap_or(Vec2::ZERO)
    }

    #[inline]
    pub fn tail(&self) -> Vec2 {
        self.segments.back().copied().unwrap_or(Vec2::ZERO)
    }

    pub fn segments(&self) -> &VecDeque<Vec2> {
        &self.segments
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn length(&self) -> usize {
        self.length
    }

    #[inline]
    pub fn is_invulnerable(&self) -> bool {
        self.invulnerable_ticks > 0
    }

    /// Push a new head and trim the tail down to `length`, growing by one
    /// if growth is pending
    pub fn advance_head(&mut self, head: Vec2) {
        self.segments.push_front(head);
        if self.pending_growth > 0 {
            self.length += 1;
            self.pending_growth -= 1;
        }
        self.segments.truncate(self.length);
    }

    /// Drop the last segment to pay for boosting. Length shrinks by one but
    /// never below `min_length`. Returns where the new tail sits.
    pub fn shed_tail(&mut self, min_length: usize) -> Option<Vec2> {
        if self.segments.len() <= 1 {
            return None;
        }
        self.segments.pop_back();
        self.length = self.length.saturating_sub(1).max(min_length.max(1));
        self.segments.truncate(self.length);
        self.segments.back().copied()
    }

    /// Credit an eaten food item
    pub fn eat(&mut self, value: u32) {
        self.pending_growth += value;
        self.score += value * 10;
    }

    /// Axis-aligned bounds of the body, or `None` if it has no segments
    pub fn bounds(&self) -> Option<(Vec2, Vec2)> {
        let mut it = self.segments.iter();
        let first = *it.next()?;
        Some(it.fold((first, first), |(lo, hi), &p| (lo.min(p), hi.max(p))))
    }
}

/// A collectible pellet
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Food {
    pub id: EntityId,
    pub pos: Vec2,
    pub size: f32,
    pub value: u32,
}

impl Food {
    pub fn new(id: EntityId, pos: Vec2, size: f32, value: u32) -> SimResult<Self> {
        if !pos.is_finite() {
            return Err(SimError::NumericAnomaly {
                id,
                detail: "non-finite food position",
            });
        }
        Ok(Self {
            id,
            pos,
            size,
            value,
        })
    }
}
