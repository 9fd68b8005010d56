//! Collision detection and response
//!
//! All of it is pure math over positions and velocities; the engine supplies
//! the locking. Wall tests work on the *proposed* position (current position
//! plus one full velocity), so a body reverses before it would cross a wall.
//! Body-body response is the textbook equal-mass elastic exchange: velocities
//! are projected onto the collision normal and the normal components swap,
//! tangential components untouched.

use glam::DVec2;

use crate::collision_normal;
use crate::config::ArenaConfig;

/// Which wall plane a proposed move would cross.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WallAxis {
    /// Left or right wall: reflect the x component.
    X,
    /// Top or bottom wall: reflect the y component.
    Y,
}

/// Test a proposed position against the arena walls.
///
/// The x planes are tested first; if one fires, the y planes are not
/// consulted at all. Callers rely on that precedence for reproducibility.
pub fn wall_hit(proposed: DVec2, config: &ArenaConfig) -> Option<WallAxis> {
    let low = -config.margin / 2.0;
    if proposed.x <= low || proposed.x + config.diameter >= config.width - 2.0 * config.margin {
        return Some(WallAxis::X);
    }
    if proposed.y <= low || proposed.y + config.diameter >= config.height - 2.0 * config.margin {
        return Some(WallAxis::Y);
    }
    None
}

/// Reflect a velocity off a wall plane: negate the crossed axis, leave the
/// other untouched.
#[inline]
pub fn reflect(velocity: DVec2, axis: WallAxis) -> DVec2 {
    match axis {
        WallAxis::X => DVec2::new(-velocity.x, velocity.y),
        WallAxis::Y => DVec2::new(velocity.x, -velocity.y),
    }
}

/// Scan `positions` (spawn order) for the first body within collision range
/// of `proposed`.
///
/// First match wins - deliberately not nearest match - so a fixed ordering
/// always selects the same partner. Entries whose position exactly equals
/// `caller` are skipped: the caller is in the list too, and the exact
/// comparison keeps it from colliding with itself.
pub fn find_partner(
    positions: &[DVec2],
    caller: DVec2,
    proposed: DVec2,
    diameter: f64,
) -> Option<usize> {
    positions
        .iter()
        .position(|&other| other != caller && proposed.distance(other) <= diameter)
}

/// Equal-mass elastic exchange along the collision normal.
///
/// Returns the new `(caller, partner)` velocities. The normal runs from the
/// partner's center to the caller's center; each velocity is projected onto
/// it and the projections swap. Momentum and kinetic energy are both
/// conserved exactly.
pub fn resolve_elastic(
    caller_pos: DVec2,
    caller_vel: DVec2,
    partner_pos: DVec2,
    partner_vel: DVec2,
) -> (DVec2, DVec2) {
    let normal = collision_normal(caller_pos - partner_pos);
    let impulse = caller_vel.dot(normal) - partner_vel.dot(normal);
    (caller_vel - impulse * normal, partner_vel + impulse * normal)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arena() -> ArenaConfig {
        ArenaConfig::default()
    }

    #[test]
    fn test_wall_hit_right() {
        // 372 + 20 = 392 >= 400 - 8
        assert_eq!(wall_hit(DVec2::new(372.0, 100.0), &arena()), Some(WallAxis::X));
        assert_eq!(wall_hit(DVec2::new(371.9, 100.0), &arena()), None);
    }

    #[test]
    fn test_wall_hit_left() {
        assert_eq!(wall_hit(DVec2::new(-2.0, 100.0), &arena()), Some(WallAxis::X));
        assert_eq!(wall_hit(DVec2::new(-1.9, 100.0), &arena()), None);
    }

    #[test]
    fn test_wall_hit_y() {
        assert_eq!(wall_hit(DVec2::new(100.0, -2.0), &arena()), Some(WallAxis::Y));
        assert_eq!(wall_hit(DVec2::new(100.0, 392.0), &arena()), Some(WallAxis::Y));
        assert_eq!(wall_hit(DVec2::new(100.0, 391.9), &arena()), None);
    }

    #[test]
    fn test_wall_hit_corner_prefers_x() {
        // Both planes violated; the x test is evaluated first.
        assert_eq!(wall_hit(DVec2::new(-5.0, -5.0), &arena()), Some(WallAxis::X));
    }

    #[test]
    fn test_reflect_flips_one_axis() {
        let v = DVec2::new(3.0, -2.0);
        assert_eq!(reflect(v, WallAxis::X), DVec2::new(-3.0, -2.0));
        assert_eq!(reflect(v, WallAxis::Y), DVec2::new(3.0, 2.0));
    }

    #[test]
    fn test_find_partner_first_match() {
        let caller = DVec2::new(0.0, 0.0);
        let positions = [
            caller,                  // the caller itself - skipped
            DVec2::new(100.0, 0.0),  // out of range
            DVec2::new(15.0, 0.0),   // in range, first match
            DVec2::new(12.0, 0.0),   // closer, but later in spawn order
        ];
        let proposed = DVec2::new(2.0, 0.0);
        assert_eq!(find_partner(&positions, caller, proposed, 20.0), Some(2));
    }

    #[test]
    fn test_find_partner_none_in_range() {
        let caller = DVec2::new(0.0, 0.0);
        let positions = [caller, DVec2::new(50.0, 50.0)];
        assert_eq!(find_partner(&positions, caller, DVec2::new(1.0, 1.0), 20.0), None);
    }

    #[test]
    fn test_find_partner_skips_exact_coincidence() {
        let caller = DVec2::new(10.0, 10.0);
        // Another body sitting exactly on the caller's position is skipped,
        // a body merely nearby is not.
        let positions = [caller, DVec2::new(10.0, 11.0)];
        assert_eq!(find_partner(&positions, caller, caller, 20.0), Some(1));
    }

    #[test]
    fn test_resolve_head_on_swaps_velocities() {
        let (a, b) = resolve_elastic(
            DVec2::new(100.0, 100.0),
            DVec2::new(2.0, 0.0),
            DVec2::new(110.0, 100.0),
            DVec2::new(-2.0, 0.0),
        );
        assert_eq!(a, DVec2::new(-2.0, 0.0));
        assert_eq!(b, DVec2::new(2.0, 0.0));
    }

    #[test]
    fn test_resolve_leaves_tangential_components() {
        // Collision normal along x; the y components must ride through.
        let (a, b) = resolve_elastic(
            DVec2::new(100.0, 100.0),
            DVec2::new(2.0, 1.5),
            DVec2::new(115.0, 100.0),
            DVec2::new(-2.0, -0.5),
        );
        assert!((a.y - 1.5).abs() < 1e-12);
        assert!((b.y - (-0.5)).abs() < 1e-12);
        assert!((a.x - (-2.0)).abs() < 1e-12);
        assert!((b.x - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_resolve_coincident_centers_is_a_noop() {
        // Zero separation degenerates to a zero normal and a zero impulse.
        let p = DVec2::new(50.0, 50.0);
        let (a, b) = resolve_elastic(p, DVec2::new(1.0, 2.0), p, DVec2::new(-3.0, 4.0));
        assert_eq!(a, DVec2::new(1.0, 2.0));
        assert_eq!(b, DVec2::new(-3.0, 4.0));
    }

    #[test]
    fn test_resolve_conserves_momentum() {
        let v1 = DVec2::new(3.1, -0.7);
        let v2 = DVec2::new(-1.2, 2.4);
        let (a, b) = resolve_elastic(
            DVec2::new(40.0, 60.0),
            v1,
            DVec2::new(55.0, 48.0),
            v2,
        );
        let before = v1 + v2;
        let after = a + b;
        assert!((after - before).length() < 1e-12);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn momentum_is_conserved(
                v1x in -10.0f64..10.0, v1y in -10.0f64..10.0,
                v2x in -10.0f64..10.0, v2y in -10.0f64..10.0,
                dx in -30.0f64..30.0, dy in -30.0f64..30.0,
            ) {
                let p1 = DVec2::new(100.0, 100.0);
                let p2 = p1 + DVec2::new(dx, dy);
                let v1 = DVec2::new(v1x, v1y);
                let v2 = DVec2::new(v2x, v2y);
                let (a, b) = resolve_elastic(p1, v1, p2, v2);
                prop_assert!(((a + b) - (v1 + v2)).length() < 1e-9);
            }

            #[test]
            fn kinetic_energy_is_conserved(
                v1x in -10.0f64..10.0, v1y in -10.0f64..10.0,
                v2x in -10.0f64..10.0, v2y in -10.0f64..10.0,
                dx in -30.0f64..30.0, dy in -30.0f64..30.0,
            ) {
                let p1 = DVec2::new(100.0, 100.0);
                let p2 = p1 + DVec2::new(dx, dy);
                let v1 = DVec2::new(v1x, v1y);
                let v2 = DVec2::new(v2x, v2y);
                let (a, b) = resolve_elastic(p1, v1, p2, v2);
                let before = v1.length_squared() + v2.length_squared();
                let after = a.length_squared() + b.length_squared();
                prop_assert!((after - before).abs() <= 1e-9 * before.max(1.0));
            }
        }
    }
}
