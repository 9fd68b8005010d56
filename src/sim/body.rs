//! One simulated disk and the thread that advances it
//!
//! A body owns its position and velocity and drives itself: its thread calls
//! the engine's collision hook before every step, then commits a fixed-length
//! move in its current direction of travel and publishes the new position.
//! Step *frequency* is proportional to speed, so fast and slow bodies cover
//! ground at visually proportional rates while every committed step has the
//! same length.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use glam::DVec2;

use super::lock;
use crate::consts::{BASE_STEP_MS, MAX_STEP_MS, MIN_STEP_MS, SPEED_EPSILON, STEP_LENGTH};
use crate::step_direction;

/// Opaque body identifier, unique within its engine and monotone in spawn
/// order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BodyId(pub(crate) u32);

impl fmt::Display for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Hook invoked with the body and its current position before each step;
/// this is where the engine detects and resolves collisions.
pub type BeforeStep = Arc<dyn Fn(&Body, DVec2) + Send + Sync>;

/// Callback fired after each committed move with the new position.
pub type OnMoved = Arc<dyn Fn(BodyId, DVec2) + Send + Sync>;

/// Position and velocity, swapped as one unit.
///
/// Keeping them under a single lock is what makes `set_velocity` atomic with
/// respect to the body's own read-velocity-then-move sequence.
struct Motion {
    position: DVec2,
    velocity: DVec2,
}

struct BodyCore {
    id: BodyId,
    motion: Mutex<Motion>,
    running: AtomicBool,
    worker: Mutex<Option<JoinHandle<()>>>,
}

/// Cheap-clone handle to one simulated disk.
#[derive(Clone)]
pub struct Body {
    core: Arc<BodyCore>,
}

impl Body {
    /// Create a body and start its advancement thread immediately.
    ///
    /// The thread runs until [`Body::stop`] (or the engine's shutdown) joins
    /// it. `before_step` must not call `stop` on this same body - joining a
    /// thread from itself deadlocks.
    pub fn launch(
        id: BodyId,
        position: DVec2,
        velocity: DVec2,
        before_step: BeforeStep,
        on_moved: OnMoved,
    ) -> Self {
        let core = Arc::new(BodyCore {
            id,
            motion: Mutex::new(Motion { position, velocity }),
            running: AtomicBool::new(true),
            worker: Mutex::new(None),
        });
        let worker = thread::spawn({
            let core = Arc::clone(&core);
            move || run(core, before_step, on_moved)
        });
        *lock(&core.worker) = Some(worker);
        Self { core }
    }

    pub fn id(&self) -> BodyId {
        self.core.id
    }

    pub fn position(&self) -> DVec2 {
        lock(&self.core.motion).position
    }

    pub fn velocity(&self) -> DVec2 {
        lock(&self.core.motion).velocity
    }

    /// Replace the velocity in one swap; the next step observes it.
    ///
    /// Called concurrently by the engine's resolution and never torn: the
    /// motion lock covers both components.
    pub fn set_velocity(&self, velocity: DVec2) {
        lock(&self.core.motion).velocity = velocity;
    }

    /// Stop the advancement thread and wait for any in-flight step.
    ///
    /// After this returns no further move is committed and no further
    /// notification fires. Stopping twice is a no-op.
    pub fn stop(&self) {
        self.signal_stop();
        self.join();
    }

    /// Flag the thread down and wake it if it is sleeping between steps.
    /// Does not wait; pair with [`Body::join`].
    pub(crate) fn signal_stop(&self) {
        self.core.running.store(false, Ordering::Release);
        if let Some(worker) = lock(&self.core.worker).as_ref() {
            worker.thread().unpark();
        }
    }

    /// Wait for the advancement thread to finish.
    pub(crate) fn join(&self) {
        let worker = lock(&self.core.worker).take();
        if let Some(worker) = worker {
            let _ = worker.join();
        }
    }
}

/// The advancement loop: collision hook, committed move, notification, sleep.
fn run(core: Arc<BodyCore>, before_step: BeforeStep, on_moved: OnMoved) {
    let handle = Body { core: Arc::clone(&core) };
    while core.running.load(Ordering::Acquire) {
        let position = handle.position();
        before_step(&handle, position);

        // The hook may have rewritten the velocity; re-read before moving.
        let velocity = handle.velocity();
        if let Some(direction) = step_direction(velocity) {
            let committed = {
                let mut motion = lock(&core.motion);
                motion.position += direction * STEP_LENGTH;
                motion.position
            };
            on_moved(core.id, committed);
        }
        // A stationary body skips the move but keeps polling at idle cadence.
        thread::park_timeout(step_interval(velocity.length()));
    }
}

/// Time to the next step: inversely proportional to speed, clamped so
/// runaway speeds neither busy-spin nor freeze the body.
fn step_interval(speed: f64) -> Duration {
    if speed <= SPEED_EPSILON {
        return Duration::from_secs_f64(BASE_STEP_MS / 1000.0);
    }
    let ms = (BASE_STEP_MS / speed).clamp(MIN_STEP_MS, MAX_STEP_MS);
    Duration::from_secs_f64(ms / 1000.0)
}
