//! Crystal Resonance - lane-based crystal arcade core
//!
//! Core modules:
//! - `sim`: Frame-driven simulation (crystals, resonance, launcher, particles, modifiers)
//! - `renderer`: GPU-ready instance data built from a snapshot
//! - `settings`: Player preferences and quality presets
//! - `tuning`: Data-driven game balance
//! - `error`: Simulation error types

pub mod error;
pub mod renderer;
pub mod settings;
pub mod sim;
pub mod tuning;

pub use error::{SimError, SimResult};
pub use settings::{QualityPreset, Settings};
pub use sim::{FrameInput, GameEvent, GameState, Snapshot, tick};
pub use tuning::Tuning;

/// Game configuration constants
pub mod consts {
    /// Frame rate the per-frame smoothing factors are expressed at
    pub const REFERENCE_FPS: f32 = 60.0;
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_normalize_angle() {
        assert!((normalize_angle(0.0) - 0.0).abs() < 1e-6);
        assert!((normalize_angle(PI) - (-PI)).abs() < 1e-6);
        assert!((normalize_angle(3.0 * PI) - (-PI)).abs() < 1e-5);
        assert!((normalize_angle(-PI / 2.0) - (-PI / 2.0)).abs() < 1e-6);
    }
}
