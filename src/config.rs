//! Arena geometry and tuning
//!
//! A position is the top-left corner of a body's bounding square, so the
//! right/bottom wall tests are of the form `x + diameter >= ...`. All bodies
//! share one diameter for the engine's lifetime.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::error::SimError;

/// Arena dimensions and simulation seed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Arena width in simulation units.
    pub width: f64,
    /// Arena height in simulation units.
    pub height: f64,
    /// Wall margin kept clear of body edges.
    pub margin: f64,
    /// Shared diameter of every body.
    pub diameter: f64,
    /// Seed for the placement RNG; a fixed default keeps runs reproducible.
    pub seed: u64,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            width: 400.0,
            height: 420.0,
            margin: 4.0,
            diameter: 20.0,
            seed: 0xBA11_5EED,
        }
    }
}

impl ArenaConfig {
    /// Parse a config from JSON; absent fields fall back to the defaults.
    pub fn from_json(json: &str) -> Result<Self, SimError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject geometry the simulation cannot run in.
    pub fn validate(&self) -> Result<(), SimError> {
        let finite = self.width.is_finite()
            && self.height.is_finite()
            && self.margin.is_finite()
            && self.diameter.is_finite();
        if !finite {
            return Err(SimError::InvalidArgument("arena geometry must be finite"));
        }
        if self.width <= 0.0 || self.height <= 0.0 {
            return Err(SimError::InvalidArgument("arena dimensions must be positive"));
        }
        if self.diameter <= 0.0 {
            return Err(SimError::InvalidArgument("body diameter must be positive"));
        }
        if self.margin < 0.0 {
            return Err(SimError::InvalidArgument("wall margin cannot be negative"));
        }
        if self.max_spawn_x() <= 0.0 || self.max_spawn_y() <= 0.0 {
            return Err(SimError::InvalidArgument("arena too small to fit one body"));
        }
        Ok(())
    }

    /// Shared radius of every body.
    #[inline]
    pub fn radius(&self) -> f64 {
        self.diameter / 2.0
    }

    /// Largest x a body can spawn at and stay inside the margin.
    #[inline]
    pub fn max_spawn_x(&self) -> f64 {
        self.width - self.margin - self.diameter
    }

    /// Largest y a body can spawn at and stay inside the margin.
    #[inline]
    pub fn max_spawn_y(&self) -> f64 {
        self.height - self.margin - self.diameter
    }

    /// Whether `position` lies fully inside the arena minus the margin.
    pub fn in_spawn_bounds(&self, position: DVec2) -> bool {
        position.x >= 0.0
            && position.x + self.diameter <= self.width - self.margin
            && position.y >= 0.0
            && position.y + self.diameter <= self.height - self.margin
    }
}
