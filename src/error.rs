//! Simulation error types
//!
//! Invalid references (lane/color out of range) are reported to the caller.
//! Invariant violations are internal consistency bugs: they are debug-asserted
//! and repaired so one faulty subsystem never stalls the rest of the frame.

use thiserror::Error;

/// Errors that can occur in the simulation core.
#[derive(Error, Debug)]
pub enum SimError {
    /// Lane index outside the configured lane count.
    #[error("invalid lane {lane}: field has {lanes} lanes")]
    InvalidLane {
        /// Requested lane.
        lane: usize,
        /// Configured lane count.
        lanes: usize,
    },

    /// Color string or palette index that does not name a crystal color.
    #[error("invalid color: {0}")]
    InvalidColor(String),

    /// Tuning or settings values that cannot drive a simulation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A simulated quantity left its domain (non-finite or negative).
    #[error("invariant violated: {what} = {value}")]
    InvariantViolation {
        /// Which quantity broke.
        what: &'static str,
        /// The offending value.
        value: f32,
    },

    /// Config file could not be read.
    #[error("config io: {0}")]
    Io(#[from] std::io::Error),

    /// Config file could not be parsed.
    #[error("config json: {0}")]
    Json(#[from] serde_json::Error),
}

impl SimError {
    /// True for internal consistency bugs (as opposed to bad caller input).
    pub fn is_invariant(&self) -> bool {
        matches!(self, SimError::InvariantViolation { .. })
    }
}

/// Result type for simulation operations.
pub type SimResult<T> = Result<T, SimError>;
