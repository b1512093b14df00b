//! Collision detection and response for circular bodies
//!
//! Two kinds of contact: movable body against movable body (coins), which
//! splits the overlap evenly between both, and movable body against an
//! immovable obstacle (pegs), which reflects velocity and pushes the body out
//! by the whole overlap.

use glam::Vec2;
use rand::Rng;

use super::body::Body;
use super::grid::SpatialGrid;

/// Extra separation added on top of the exact overlap so resolved pairs
/// don't register as touching again from rounding error
pub const SEPARATION_SLOP: f32 = 1e-3;

/// A transient overlap between two bodies, by index into the body slice
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionPair {
    pub a: usize,
    pub b: usize,
    /// How far the circles interpenetrate
    pub depth: f32,
    /// Unit vector pointing from `a` toward `b`
    pub normal: Vec2,
}

/// Strict overlap test: touching circles don't collide
#[inline]
pub fn circles_overlap(pa: Vec2, ra: f32, pb: Vec2, rb: f32) -> bool {
    let min = ra + rb;
    pa.distance_squared(pb) < min * min
}

/// Narrow-phase test between `bodies[a]` and `bodies[b]`
pub fn detect_pair(bodies: &[Body], a: usize, b: usize) -> Option<CollisionPair> {
    let (ba, bb) = (&bodies[a], &bodies[b]);
    if !circles_overlap(ba.pos, ba.radius, bb.pos, bb.radius) {
        return None;
    }
    let delta = bb.pos - ba.pos;
    let dist = delta.length();
    // Coincident centers: any axis works, pick +X so the result is stable
    let normal = if dist > f32::EPSILON { delta / dist } else { Vec2::X };
    Some(CollisionPair {
        a,
        b,
        depth: ba.radius + bb.radius - dist,
        normal,
    })
}

fn pair_mut<T>(items: &mut [T], a: usize, b: usize) -> (&mut T, &mut T) {
    if a < b {
        let (lo, hi) = items.split_at_mut(b);
        (&mut lo[a], &mut hi[0])
    } else {
        let (lo, hi) = items.split_at_mut(a);
        (&mut hi[0], &mut lo[b])
    }
}

/// Push an overlapping pair apart, half the overlap each (equal masses).
///
/// `jitter` nudges the pair in opposite directions along the contact tangent.
/// Because the nudge is perpendicular to the separation it can only increase
/// the distance between the two centers.
pub fn separate_pair(bodies: &mut [Body], pair: &CollisionPair, jitter: f32) {
    if pair.a == pair.b {
        return;
    }
    let push = pair.normal * ((pair.depth + SEPARATION_SLOP) * 0.5);
    let tangent = pair.normal.perp() * jitter;
    let (a, b) = pair_mut(bodies, pair.a, pair.b);
    a.pos -= push + tangent;
    b.pos += push + tangent;
}

/// Resolve body-body overlaps with a few relaxation passes.
///
/// The grid is rebuilt once per pass; candidate pairs come out in insertion
/// order. Returns the number of contacts resolved.
pub fn resolve_body_collisions<R: Rng>(
    bodies: &mut [Body],
    grid: &mut SpatialGrid,
    iterations: u32,
    max_jitter: f32,
    rng: &mut R,
) -> usize {
    let mut resolved = 0;
    let mut positions: Vec<Vec2> = Vec::with_capacity(bodies.len());
    for _ in 0..iterations {
        positions.clear();
        positions.extend(bodies.iter().map(|b| b.pos));
        grid.rebuild(positions.iter().copied());

        let mut contacts = 0;
        for (a, b) in grid.candidate_pairs(&positions) {
            // Earlier pairs in this pass may already have moved these bodies
            if let Some(pair) = detect_pair(bodies, a, b) {
                let jitter = if max_jitter > 0.0 {
                    rng.random_range(-max_jitter..=max_jitter)
                } else {
                    0.0
                };
                separate_pair(bodies, &pair, jitter);
                contacts += 1;
            }
        }
        resolved += contacts;
        if contacts == 0 {
            break;
        }
    }
    resolved
}

/// Reflect a velocity about a surface normal: `v - 2(v·n)n`
#[inline]
pub fn reflect_velocity(velocity: Vec2, normal: Vec2) -> Vec2 {
    velocity - 2.0 * velocity.dot(normal) * normal
}

/// Bounce a body off an immovable circular obstacle.
///
/// Velocity is reflected and scaled by `restitution` only when the body is
/// moving into the obstacle; the body is always pushed clear by the full
/// overlap. Returns true on contact.
pub fn bounce_off_obstacle(
    body: &mut Body,
    center: Vec2,
    obstacle_radius: f32,
    restitution: f32,
) -> bool {
    let delta = body.pos - center;
    let min = body.radius + obstacle_radius;
    let dist_sq = delta.length_squared();
    if dist_sq >= min * min {
        return false;
    }

    let dist = dist_sq.sqrt();
    // Dead center: send it back up
    let normal = if dist > f32::EPSILON { delta / dist } else { Vec2::NEG_Y };

    if body.vel.dot(normal) < 0.0 {
        body.vel = reflect_velocity(body.vel, normal) * restitution;
    }
    body.pos += normal * (min - dist);
    true
}

/// Keep a body between two vertical walls.
///
/// On contact the body is clamped inside and its horizontal velocity is
/// pointed back inward at `wall_restitution` of its magnitude.
pub fn constrain_to_side_walls(body: &mut Body, left: f32, right: f32, wall_restitution: f32) -> bool {
    if body.pos.x - body.radius < left {
        body.pos.x = left + body.radius;
        body.vel.x = body.vel.x.abs() * wall_restitution;
        true
    } else if body.pos.x + body.radius > right {
        body.pos.x = right - body.radius;
        body.vel.x = -body.vel.x.abs() * wall_restitution;
        true
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn body(id: u32, x: f32, y: f32, r: f32) -> Body {
        Body::new(id, Vec2::new(x, y), r).unwrap()
    }

    #[test]
    fn test_touching_is_not_overlap() {
        assert!(!circles_overlap(Vec2::ZERO, 1.0, Vec2::new(2.0, 0.0), 1.0));
        assert!(circles_overlap(Vec2::ZERO, 1.0, Vec2::new(1.9, 0.0), 1.0));
    }

    #[test]
    fn test_detect_pair_coincident_centers() {
        let bodies = vec![body(1, 5.0, 5.0, 2.0), body(2, 5.0, 5.0, 2.0)];
        let pair = detect_pair(&bodies, 0, 1).unwrap();
        assert_eq!(pair.normal, Vec2::X);
        assert!((pair.depth - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_separate_pair_equal_split() {
        let mut bodies = vec![body(1, 0.0, 0.0, 5.0), body(2, 6.0, 0.0, 5.0)];
        let pair = detect_pair(&bodies, 0, 1).unwrap();
        separate_pair(&mut bodies, &pair, 0.0);
        assert!((bodies[0].pos.x + 2.0).abs() < 1e-2);
        assert!((bodies[1].pos.x - 8.0).abs() < 1e-2);
    }

    #[test]
    fn test_reflect_velocity_flat_surface() {
        let v = reflect_velocity(Vec2::new(1.0, -1.0), Vec2::Y);
        assert!((v - Vec2::new(1.0, 1.0)).length() < 1e-6);
    }

    #[test]
    fn test_bounce_ignores_receding_body() {
        // Overlapping but already moving away: only positional push-out
        let mut b = body(1, 0.0, -3.0, 2.0).with_velocity(Vec2::new(0.0, -4.0));
        assert!(bounce_off_obstacle(&mut b, Vec2::ZERO, 2.0, 0.5));
        assert_eq!(b.vel, Vec2::new(0.0, -4.0));
        assert!((b.pos.y + 4.0).abs() < 1e-5);
    }

    #[test]
    fn test_side_walls_point_inward() {
        let mut b = body(1, 1.0, 0.0, 3.0).with_velocity(Vec2::new(-4.0, 1.0));
        assert!(constrain_to_side_walls(&mut b, 0.0, 100.0, 0.5));
        assert_eq!(b.pos.x, 3.0);
        assert_eq!(b.vel.x, 2.0);

        let mut b = body(2, 99.0, 0.0, 3.0).with_velocity(Vec2::new(4.0, 0.0));
        assert!(constrain_to_side_walls(&mut b, 0.0, 100.0, 0.5));
        assert_eq!(b.pos.x, 97.0);
        assert_eq!(b.vel.x, -2.0);
    }

    #[test]
    fn test_resolve_clears_small_pile() {
        let mut bodies: Vec<Body> = (0..3)
            .map(|i| body(i, 50.0 + i as f32 * 3.0, 50.0, 5.0))
            .collect();
        let mut grid = SpatialGrid::new(10.0).unwrap();
        let mut rng = Pcg32::seed_from_u64(9);
        let n = resolve_body_collisions(&mut bodies, &mut grid, 64, 0.05, &mut rng);
        assert!(n > 0);
        for i in 0..bodies.len() {
            for j in (i + 1)..bodies.len() {
                let d = bodies[i].pos.distance(bodies[j].pos);
                assert!(d >= 10.0 - 1e-3, "bodies {i} and {j} still overlap: {d}");
            }
        }
    }

    proptest! {
        #[test]
        fn prop_separation_leaves_pair_apart(
            ax in -100.0f32..100.0, ay in -100.0f32..100.0,
            dx in -9.9f32..9.9, dy in -9.9f32..9.9,
            r in 5.0f32..20.0,
            jitter in -0.5f32..0.5,
        ) {
            let mut bodies = vec![body(1, ax, ay, r), body(2, ax + dx, ay + dy, r)];
            if let Some(pair) = detect_pair(&bodies, 0, 1) {
                separate_pair(&mut bodies, &pair, jitter);
                let d = bodies[0].pos.distance(bodies[1].pos);
                prop_assert!(d >= 2.0 * r - 1e-3);
            }
        }

        #[test]
        fn prop_obstacle_bounce_keeps_restitution_fraction(
            angle in 0.0f32..std::f32::consts::TAU,
            speed in 0.5f32..20.0,
            incoming in -1.2f32..1.2,
            restitution in 0.05f32..0.95,
        ) {
            // Place the ball just inside contact range, moving toward the peg
            let normal = Vec2::from_angle(angle);
            let mut b = body(1, normal.x * 7.5, normal.y * 7.5, 5.0);
            let dir = Vec2::from_angle(angle + std::f32::consts::PI + incoming);
            b.vel = dir * speed;
            let before = b.vel;

            prop_assert!(bounce_off_obstacle(&mut b, Vec2::ZERO, 3.0, restitution));

            let after = b.vel;
            prop_assert!((after.length() - restitution * before.length()).abs() < 1e-3 * speed.max(1.0));

            // Angle of incidence equals angle of reflection about the normal
            let incidence = (-before).angle_to(normal).abs();
            let reflection = after.angle_to(normal).abs();
            prop_assert!((incidence - reflection).abs() < 1e-3);

            // Never left overlapping the peg
            prop_assert!(b.pos.length() >= 8.0 - 1e-3);
        }
    }
}
