//! Concurrent simulation engine
//!
//! The moving parts, bottom up:
//! - `collision`: pure math - wall tests, first-match partner scan, the
//!   equal-mass elastic exchange
//! - `body`: one disk's kinematic state plus the thread that advances it
//! - `events`: typed position-change channel with cancellable subscriptions
//! - `engine`: owns the body list, serializes detection/resolution, validates
//!   placements
//!
//! Concurrency shape: one thread per body plus the caller's thread. Every
//! collision check goes through the engine's single mutex; a body's own step
//! takes only that body's state lock. Lock order is always engine list ->
//! one body at a time, so no cycle exists.

pub mod body;
pub mod collision;
pub mod engine;
pub mod events;

pub use body::{BeforeStep, Body, BodyId, OnMoved};
pub use collision::{WallAxis, find_partner, reflect, resolve_elastic, wall_hit};
pub use engine::{Engine, PlacementValidator};
pub use events::{PositionEvent, Subscription};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a mutex, continuing through poisoning - a panicked body thread must
/// not wedge the rest of the arena.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
