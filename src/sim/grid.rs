//! Uniform-grid broad phase
//!
//! Bodies are bucketed by `floor(pos / cell_size)` every tick. Neighbor queries
//! visit the 3×3 block of cells around a position, in a fixed cell order and
//! insertion order within each cell, so candidate order is reproducible.

use std::collections::HashMap;

use glam::Vec2;

use crate::error::{SimError, SimResult};

type CellKey = (i32, i32);

/// Spatial hash of item indices keyed by grid cell
#[derive(Debug, Clone)]
pub struct SpatialGrid {
    cell_size: f32,
    cells: HashMap<CellKey, Vec<usize>>,
    len: usize,
}

impl SpatialGrid {
    /// New grid; the cell size should be about the largest body diameter.
    pub fn new(cell_size: f32) -> SimResult<Self> {
        if !(cell_size.is_finite() && cell_size > 0.0) {
            return Err(SimError::InvalidConfiguration(format!(
                "grid cell size must be positive, got {cell_size}"
            )));
        }
        Ok(Self {
            cell_size,
            cells: HashMap::new(),
            len: 0,
        })
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn cell_of(&self, pos: Vec2) -> CellKey {
        (
            (pos.x / self.cell_size).floor() as i32,
            (pos.y / self.cell_size).floor() as i32,
        )
    }

    /// Re-bucket every position; index `i` in the iterator becomes item `i`.
    /// Cell vectors are kept between ticks to avoid reallocating.
    pub fn rebuild<I>(&mut self, positions: I)
    where
        I: IntoIterator<Item = Vec2>,
    {
        for bucket in self.cells.values_mut() {
            bucket.clear();
        }
        self.len = 0;
        for (idx, pos) in positions.into_iter().enumerate() {
            let key = self.cell_of(pos);
            self.cells.entry(key).or_default().push(idx);
            self.len += 1;
        }
        // Drop buckets that stayed empty so sparse worlds don't accumulate keys
        self.cells.retain(|_, bucket| !bucket.is_empty());
    }

    /// Visit every item in the cell containing `pos` and its 8 neighbors
    pub fn for_each_neighbor<F>(&self, pos: Vec2, mut visit: F)
    where
        F: FnMut(usize),
    {
        let (cx, cy) = self.cell_of(pos);
        for dy in -1..=1 {
            for dx in -1..=1 {
                if let Some(bucket) = self.cells.get(&(cx + dx, cy + dy)) {
                    for &idx in bucket {
                        visit(idx);
                    }
                }
            }
        }
    }

    /// Visit every item in cells overlapping the square of half-size `radius`
    /// around `pos`. Callers still filter by exact distance.
    pub fn for_each_within<F>(&self, pos: Vec2, radius: f32, mut visit: F)
    where
        F: FnMut(usize),
    {
        let (min_x, min_y) = self.cell_of(pos - Vec2::splat(radius));
        let (max_x, max_y) = self.cell_of(pos + Vec2::splat(radius));
        for cy in min_y..=max_y {
            for cx in min_x..=max_x {
                if let Some(bucket) = self.cells.get(&(cx, cy)) {
                    for &idx in bucket {
                        visit(idx);
                    }
                }
            }
        }
    }

    /// Candidate pairs `(i, j)` with `i < j` from neighboring cells, ordered by `i`
    pub fn candidate_pairs(&self, positions: &[Vec2]) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        for (i, &pos) in positions.iter().enumerate() {
            self.for_each_neighbor(pos, |j| {
                if j > i {
                    pairs.push((i, j));
                }
            });
        }
        pairs
    }
}
