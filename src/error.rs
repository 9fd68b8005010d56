//! Crate error type
//!
//! Lifecycle errors are fatal to the call, never to the process: the
//! operation aborts and the engine is left as it was. Degenerate geometry
//! (coincident centers, zero speed) is recovered locally in the math and
//! never surfaces here.

use thiserror::Error;

/// Errors surfaced by engine lifecycle and placement operations.
#[derive(Debug, Error)]
pub enum SimError {
    /// Operation attempted on an engine that has been shut down. A second
    /// shutdown is itself an error, not a no-op.
    #[error("invalid engine state: {0}")]
    InvalidState(&'static str),

    /// Caller-supplied value the engine cannot work with.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// The placement retry loop ran out of attempts; the arena cannot fit
    /// the requested body count.
    #[error("no valid placement found after {attempts} attempts")]
    PlacementUnsatisfiable {
        /// Attempts spent on the body that failed to place.
        attempts: u32,
    },

    /// Malformed configuration JSON.
    #[error("bad config: {0}")]
    Config(#[from] serde_json::Error),
}
