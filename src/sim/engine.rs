//! The engine: world ownership, collision serialization, lifecycle
//!
//! The engine owns the body list (spawn order, stable), the placement RNG,
//! the optional placement validator, and the event hub. Every body's
//! pre-step hook funnels into [`Engine::check_collision`], which runs under
//! one mutex per engine - resolution reads and writes *two* bodies'
//! velocities and must be atomic with respect to every other concurrent
//! check, so a per-body lock would not do.
//!
//! Spawn, resize and shutdown are caller-thread operations and must not be
//! invoked concurrently with each other on the same engine.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use glam::DVec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::body::{BeforeStep, Body, BodyId, OnMoved};
use super::collision::{find_partner, reflect, resolve_elastic, wall_hit};
use super::events::{EventHub, PositionEvent, Subscription};
use super::lock;
use crate::config::ArenaConfig;
use crate::consts::{MAX_PLACEMENT_ATTEMPTS, SPAWN_SPEED};
use crate::error::SimError;

/// Predicate consulted before placing a body; `true` accepts the candidate.
/// Must be pure and must not call back into the engine's spawn paths.
pub type PlacementValidator = Arc<dyn Fn(DVec2) -> bool + Send + Sync>;

struct EngineInner {
    config: ArenaConfig,
    /// The world: bodies in spawn order. This mutex is the single
    /// serializing region for all collision detection and resolution.
    bodies: Mutex<Vec<Body>>,
    rng: Mutex<Pcg32>,
    validator: Mutex<Option<PlacementValidator>>,
    hub: Arc<EventHub>,
    next_id: AtomicU32,
    disposed: AtomicBool,
}

/// Owner of the arena. Dropping the engine stops every body; an explicit
/// [`Engine::shutdown`] does the same but makes a second call an error.
pub struct Engine {
    inner: Arc<EngineInner>,
}

impl Engine {
    /// Build an engine for `config`. No bodies exist until [`Engine::spawn`].
    pub fn new(config: ArenaConfig) -> Result<Self, SimError> {
        config.validate()?;
        log::info!(
            "arena {}x{} (margin {}, body diameter {}, seed {:#x})",
            config.width,
            config.height,
            config.margin,
            config.diameter,
            config.seed
        );
        let rng = Pcg32::seed_from_u64(config.seed);
        Ok(Self {
            inner: Arc::new(EngineInner {
                config,
                bodies: Mutex::new(Vec::new()),
                rng: Mutex::new(rng),
                validator: Mutex::new(None),
                hub: EventHub::new(),
                next_id: AtomicU32::new(0),
                disposed: AtomicBool::new(false),
            }),
        })
    }

    pub fn config(&self) -> &ArenaConfig {
        &self.inner.config
    }

    /// Number of live bodies.
    pub fn body_count(&self) -> usize {
        lock(&self.inner.bodies).len()
    }

    /// Install (or replace) the placement predicate used by spawn and
    /// resize. Replacing it under an in-flight spawn is a caller bug; the
    /// engine does not serialize the two.
    pub fn set_placement_validator(
        &self,
        validator: impl Fn(DVec2) -> bool + Send + Sync + 'static,
    ) {
        *lock(&self.inner.validator) = Some(Arc::new(validator));
    }

    /// This engine's own placement rule, packaged for installation into
    /// another engine (or any upstream layer) as *its* validator.
    pub fn as_validator(&self) -> PlacementValidator {
        let inner = Arc::downgrade(&self.inner);
        Arc::new(move |candidate| {
            inner
                .upgrade()
                .is_some_and(|inner| inner.is_valid_position(candidate))
        })
    }

    /// Whether `candidate` keeps clear of every live body and of the walls.
    pub fn is_valid_position(&self, candidate: DVec2) -> bool {
        self.inner.is_valid_position(candidate)
    }

    /// Subscribe to position-change events.
    pub fn subscribe(&self) -> Subscription {
        self.inner.hub.subscribe()
    }

    /// Create `count` bodies at randomized, validated, non-overlapping
    /// positions with bounded random velocities. `on_spawned` runs once per
    /// body, in creation order, on the calling thread.
    ///
    /// On error nothing is spawned: placements for the whole batch are drawn
    /// and validated before any body starts.
    pub fn spawn(
        &self,
        count: usize,
        mut on_spawned: impl FnMut(DVec2, &Body),
    ) -> Result<(), SimError> {
        self.ensure_live()?;
        let placements = self.inner.draw_placements(count)?;
        let mut spawned = Vec::with_capacity(count);
        {
            let mut bodies = lock(&self.inner.bodies);
            for (position, velocity) in placements {
                let body = self.launch_body(position, velocity);
                bodies.push(body.clone());
                spawned.push((position, body));
            }
        }
        log::info!("spawned {} bodies", spawned.len());
        for (position, body) in &spawned {
            on_spawned(*position, body);
        }
        Ok(())
    }

    /// Place one body deterministically. The position must pass the same
    /// checks random placement uses, including the installed validator.
    pub fn spawn_at(&self, position: DVec2, velocity: DVec2) -> Result<Body, SimError> {
        self.ensure_live()?;
        if !self.inner.is_valid_position(position) {
            return Err(SimError::InvalidArgument(
                "position overlaps a body or leaves the arena",
            ));
        }
        if let Some(validator) = lock(&self.inner.validator).clone() {
            if !validator(position) {
                return Err(SimError::InvalidArgument(
                    "position rejected by the placement validator",
                ));
            }
        }
        let body = self.launch_body(position, velocity);
        lock(&self.inner.bodies).push(body.clone());
        Ok(body)
    }

    /// Adjust the live body count to `target`.
    ///
    /// Shrinking removes the most-recently-spawned bodies first, stopping
    /// each schedule before its entry is unlinked. Growing follows the spawn
    /// placement rules. Afterwards `on_spawned` runs once per surviving and
    /// newly created body with its *current* position, in creation order, so
    /// a relay layer can rebuild its view.
    pub fn resize(
        &self,
        target: usize,
        mut on_spawned: impl FnMut(DVec2, &Body),
    ) -> Result<(), SimError> {
        self.ensure_live()?;
        let current = self.body_count();
        if target < current {
            let doomed: Vec<Body> = {
                let bodies = lock(&self.inner.bodies);
                let doomed = bodies[target..].to_vec();
                for body in &doomed {
                    body.signal_stop();
                }
                doomed
            };
            // Join outside the world lock: a doomed body may be blocked in
            // the collision hook waiting for that same lock.
            for body in &doomed {
                body.join();
            }
            lock(&self.inner.bodies).truncate(target);
        } else if target > current {
            let placements = self.inner.draw_placements(target - current)?;
            let mut bodies = lock(&self.inner.bodies);
            for (position, velocity) in placements {
                let body = self.launch_body(position, velocity);
                bodies.push(body);
            }
        }

        let roster: Vec<(DVec2, Body)> = lock(&self.inner.bodies)
            .iter()
            .map(|body| (body.position(), body.clone()))
            .collect();
        log::info!("resized population {current} -> {}", roster.len());
        for (position, body) in &roster {
            on_spawned(*position, body);
        }
        Ok(())
    }

    /// Stop every body, clear the world and make the engine terminal. All
    /// later operations - including a second shutdown - fail with
    /// [`SimError::InvalidState`].
    pub fn shutdown(&self) -> Result<(), SimError> {
        if self.inner.disposed.swap(true, Ordering::SeqCst) {
            return Err(SimError::InvalidState("engine already shut down"));
        }
        let stopped = self.inner.halt();
        log::info!("engine shut down, {stopped} bodies stopped");
        Ok(())
    }

    /// The pre-step hook: detect and resolve a collision for `body` at
    /// `position` before it commits its next move. Public so tests and
    /// alternative drivers can invoke exactly what body threads invoke.
    pub fn check_collision(&self, body: &Body, position: DVec2) {
        self.inner.check_collision(body, position);
    }

    fn ensure_live(&self) -> Result<(), SimError> {
        if self.inner.disposed.load(Ordering::SeqCst) {
            return Err(SimError::InvalidState("engine already shut down"));
        }
        Ok(())
    }

    /// Mint an id and start the body with hooks wired back into this engine.
    fn launch_body(&self, position: DVec2, velocity: DVec2) -> Body {
        let id = BodyId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let before_step: BeforeStep = Arc::new({
            let inner = Arc::downgrade(&self.inner);
            move |body: &Body, position: DVec2| {
                if let Some(inner) = inner.upgrade() {
                    inner.check_collision(body, position);
                }
            }
        });
        let on_moved: OnMoved = Arc::new({
            let hub = Arc::clone(&self.inner.hub);
            move |body: BodyId, position: DVec2| {
                hub.publish(PositionEvent { body, position });
            }
        });
        log::debug!("launching body {id} at ({:.1}, {:.1})", position.x, position.y);
        Body::launch(id, position, velocity, before_step, on_moved)
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        // Best-effort cleanup when the owner never called shutdown; the
        // explicit path keeps its double-call error semantics.
        if !self.inner.disposed.swap(true, Ordering::SeqCst) {
            self.inner.halt();
        }
    }
}

impl EngineInner {
    /// Detection and resolution for one body's proposed move, serialized
    /// with every other check on this engine.
    fn check_collision(&self, body: &Body, position: DVec2) {
        let bodies = lock(&self.bodies);
        let velocity = body.velocity();
        let proposed = position + velocity;

        // Wall first; a wall hit skips the body scan entirely.
        if let Some(axis) = wall_hit(proposed, &self.config) {
            body.set_velocity(reflect(velocity, axis));
            log::trace!("body {} reflected off {axis:?} wall", body.id());
            return;
        }

        let positions: Vec<DVec2> = bodies.iter().map(Body::position).collect();
        let Some(index) = find_partner(&positions, position, proposed, self.config.diameter)
        else {
            return;
        };
        let partner = &bodies[index];
        let (caller_vel, partner_vel) =
            resolve_elastic(position, velocity, positions[index], partner.velocity());
        body.set_velocity(caller_vel);
        partner.set_velocity(partner_vel);
        log::trace!("bodies {} and {} exchanged momentum", body.id(), partner.id());
    }

    fn is_valid_position(&self, candidate: DVec2) -> bool {
        let clear = lock(&self.bodies)
            .iter()
            .all(|body| body.position().distance(candidate) > self.config.diameter);
        clear && self.config.in_spawn_bounds(candidate)
    }

    /// Draw `count` placements against a snapshot of the world plus the
    /// batch so far. Runs without the world lock so an installed validator
    /// may freely read engine state.
    fn draw_placements(&self, count: usize) -> Result<Vec<(DVec2, DVec2)>, SimError> {
        let snapshot: Vec<DVec2> = lock(&self.bodies).iter().map(Body::position).collect();
        let validator = lock(&self.validator).clone();
        let mut rng = lock(&self.rng);
        let mut placements: Vec<(DVec2, DVec2)> = Vec::with_capacity(count);

        'bodies: for _ in 0..count {
            for _ in 0..MAX_PLACEMENT_ATTEMPTS {
                let candidate = DVec2::new(
                    rng.random_range(0.0..=self.config.max_spawn_x()),
                    rng.random_range(0.0..=self.config.max_spawn_y()),
                );
                let clear = snapshot
                    .iter()
                    .copied()
                    .chain(placements.iter().map(|&(position, _)| position))
                    .all(|placed| placed.distance(candidate) > self.config.diameter);
                if !clear {
                    continue;
                }
                if let Some(validator) = &validator {
                    if !validator(candidate) {
                        continue;
                    }
                }
                let velocity = DVec2::new(
                    rng.random_range(-SPAWN_SPEED..=SPAWN_SPEED),
                    rng.random_range(-SPAWN_SPEED..=SPAWN_SPEED),
                );
                placements.push((candidate, velocity));
                continue 'bodies;
            }
            return Err(SimError::PlacementUnsatisfiable {
                attempts: MAX_PLACEMENT_ATTEMPTS,
            });
        }
        Ok(placements)
    }

    /// Signal every body, unlink them all, then wait for each thread.
    fn halt(&self) -> usize {
        let doomed: Vec<Body> = {
            let mut bodies = lock(&self.bodies);
            for body in bodies.iter() {
                body.signal_stop();
            }
            bodies.drain(..).collect()
        };
        for body in &doomed {
            body.join();
        }
        doomed.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet_engine() -> Engine {
        Engine::new(ArenaConfig::default()).unwrap()
    }

    #[test]
    fn test_is_valid_position_bounds() {
        let engine = quiet_engine();
        assert!(engine.is_valid_position(DVec2::new(100.0, 100.0)));
        assert!(!engine.is_valid_position(DVec2::new(-5.0, 100.0)));
        assert!(!engine.is_valid_position(DVec2::new(390.0, 100.0)));
    }

    #[test]
    fn test_is_valid_position_respects_bodies() {
        let engine = quiet_engine();
        let body = engine.spawn_at(DVec2::new(100.0, 100.0), DVec2::ZERO).unwrap();
        // Exactly diameter away still counts as overlapping.
        assert!(!engine.is_valid_position(DVec2::new(120.0, 100.0)));
        assert!(engine.is_valid_position(DVec2::new(121.0, 100.0)));
        body.stop();
    }

    #[test]
    fn test_draw_placements_is_seeded() {
        let a = quiet_engine();
        let b = quiet_engine();
        let first = a.inner.draw_placements(4).unwrap();
        let second = b.inner.draw_placements(4).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_manual_hook_reflects_off_right_wall() {
        let engine = quiet_engine();
        let body = engine
            .spawn_at(DVec2::new(100.0, 100.0), DVec2::new(3.0, 3.0))
            .unwrap();
        // Drive the hook as if the body stood at the wall: 371 + 3 + 20
        // crosses 400 - 8, so x reflects and y rides through.
        engine.check_collision(&body, DVec2::new(371.0, 100.0));
        assert_eq!(body.velocity(), DVec2::new(-3.0, 3.0));
    }

    #[test]
    fn test_momentum_transfers_through_the_hook() {
        let engine = quiet_engine();
        // Two stationary bodies 21 apart; giving the first a push toward the
        // second makes its next check (proposed position 19 away) resolve.
        // Equal mass and a stationary partner means a full transfer.
        let caller = engine.spawn_at(DVec2::new(100.0, 100.0), DVec2::ZERO).unwrap();
        let partner = engine.spawn_at(DVec2::new(121.0, 100.0), DVec2::ZERO).unwrap();
        // Freeze the caller's schedule so the hook call below is the only actor.
        caller.stop();
        caller.set_velocity(DVec2::new(2.0, 0.0));
        engine.check_collision(&caller, caller.position());
        assert_eq!(caller.velocity(), DVec2::ZERO);
        assert_eq!(partner.velocity(), DVec2::new(2.0, 0.0));
    }
}
