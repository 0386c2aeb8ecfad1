//! Frame clock
//!
//! Converts wall-clock frame deltas into scaled simulation time. The clock
//! holds configuration only; the current time scale lives in the feedback
//! modifiers.

use serde::{Deserialize, Serialize};

/// Stateless raw-to-scaled delta converter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Clock {
    /// Largest raw delta accepted per frame (prevents spiral of death after a stall)
    pub max_frame_dt: f32,
}

impl Default for Clock {
    fn default() -> Self {
        Self { max_frame_dt: 0.1 }
    }
}

impl Clock {
    pub fn new(max_frame_dt: f32) -> Self {
        Self { max_frame_dt }
    }

    /// Clamp a raw delta into `[0, max_frame_dt]`; NaN and negatives become 0
    #[inline]
    pub fn sanitize(&self, raw_dt: f32) -> f32 {
        if raw_dt.is_finite() && raw_dt > 0.0 {
            raw_dt.min(self.max_frame_dt)
        } else {
            0.0
        }
    }

    /// `sanitize(raw_dt) * time_scale`
    #[inline]
    pub fn scaled_delta(&self, raw_dt: f32, time_scale: f32) -> f32 {
        self.sanitize(raw_dt) * time_scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_scaled_delta() {
        let clock = Clock::default();
        assert_eq!(clock.scaled_delta(0.016, 1.0), 0.016);
        assert!((clock.scaled_delta(0.02, 0.05) - 0.001).abs() < 1e-7);
    }

    #[test]
    fn test_stall_is_clamped() {
        let clock = Clock::new(0.1);
        assert_eq!(clock.sanitize(3.0), 0.1);
        assert_eq!(clock.sanitize(-1.0), 0.0);
        assert_eq!(clock.sanitize(f32::NAN), 0.0);
        assert_eq!(clock.sanitize(f32::INFINITY), 0.0);
    }

    proptest! {
        #[test]
        fn scaled_delta_stays_in_range(raw in proptest::num::f32::ANY, scale in 0.001f32..=1.0) {
            let clock = Clock::default();
            let dt = clock.scaled_delta(raw, scale);
            prop_assert!(dt.is_finite());
            prop_assert!(dt >= 0.0);
            prop_assert!(dt <= clock.max_frame_dt);
        }
    }
}
