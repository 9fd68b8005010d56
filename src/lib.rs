//! Ballpit - a concurrent bouncing-body arena
//!
//! N disks bounce inside a rectangular arena. Each body advances on its own
//! thread at a cadence proportional to its speed; all collision detection and
//! resolution is serialized behind a single per-engine region.
//!
//! Core modules:
//! - `sim`: bodies, the engine, collision math, position-event channel
//! - `config`: arena geometry and tuning
//! - `error`: crate error type
//!
//! The windowing/UI layer is deliberately absent - consumers subscribe to the
//! engine's position events and draw however they like (see `src/main.rs` for
//! a headless consumer).

pub mod config;
pub mod error;
pub mod sim;

pub use config::ArenaConfig;
pub use error::SimError;
pub use sim::{Body, BodyId, Engine, PlacementValidator, PositionEvent, Subscription, WallAxis};

use glam::DVec2;

/// Simulation tuning constants
pub mod consts {
    /// Distance a body travels per committed step. Step *frequency* scales
    /// with speed; step *length* does not.
    pub const STEP_LENGTH: f64 = 1.0;
    /// A body with unit speed steps once per this many milliseconds.
    pub const BASE_STEP_MS: f64 = 20.0;
    /// Cadence clamp so extreme speeds neither busy-spin nor stall.
    pub const MIN_STEP_MS: f64 = 1.0;
    pub const MAX_STEP_MS: f64 = 250.0;
    /// Speeds below this count as stationary (no displacement that tick).
    pub const SPEED_EPSILON: f64 = 1e-9;
    /// Substitute separation when two centers coincide exactly.
    pub const MIN_COLLISION_DISTANCE: f64 = 0.01;
    /// Redraw cap for one body's spawn placement.
    pub const MAX_PLACEMENT_ATTEMPTS: u32 = 1000;
    /// Spawn velocity components are drawn uniformly from +/- this value.
    pub const SPAWN_SPEED: f64 = 3.0;
}

/// Unit vector along `delta`, the collision normal between two centers.
///
/// When the centers coincide exactly the separation is replaced by a fixed
/// minimum distance, which yields a zero normal and therefore a zero impulse.
#[inline]
pub fn collision_normal(delta: DVec2) -> DVec2 {
    let distance = delta.length();
    if distance == 0.0 {
        delta / consts::MIN_COLLISION_DISTANCE
    } else {
        delta / distance
    }
}

/// Unit direction of travel for `velocity`, or `None` for a stationary body.
#[inline]
pub fn step_direction(velocity: DVec2) -> Option<DVec2> {
    let speed = velocity.length();
    if speed <= consts::SPEED_EPSILON {
        None
    } else {
        Some(velocity / speed)
    }
}
