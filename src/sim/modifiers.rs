//! Feedback modifiers
//!
//! Time dilation, camera recoil, critical vignette intensity and the
//! full-screen impact flash. Each one is
//! a [`TimingModifier`]: a value chasing a target under its own approach
//! rule, optionally snapping its target back to rest after a recovery window.
//! Modifiers run on wall-clock time so slow motion cannot slow its own
//! recovery.

use std::f32::consts::TAU;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::settings::Settings;
use crate::tuning::Tuning;

/// Below this recoil magnitude the camera is considered at rest
const RECOIL_EPSILON: f32 = 0.01;

/// How a modifier's value approaches its target
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Approach {
    /// `value += (target - value) * (1 - e^(-rate * dt))`
    Exponential { rate: f32 },
    /// Constant speed in units per second
    Linear { per_second: f32 },
}

/// Timer that restores the rest target when it runs out
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Recovery {
    pub duration: f32,
    pub elapsed: f32,
}

/// A clamped value chasing a target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingModifier {
    value: f32,
    target: f32,
    rest: f32,
    approach: Approach,
    min: f32,
    max: f32,
    recovery: Option<Recovery>,
}

impl TimingModifier {
    pub fn new(rest: f32, approach: Approach, min: f32, max: f32) -> Self {
        let rest = rest.clamp(min, max);
        Self {
            value: rest,
            target: rest,
            rest,
            approach,
            min,
            max,
            recovery: None,
        }
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn recovery(&self) -> Option<Recovery> {
        self.recovery
    }

    fn clamp(&self, v: f32) -> f32 {
        if v.is_nan() { self.rest } else { v.clamp(self.min, self.max) }
    }

    /// Jump straight to `value`
    pub fn set_value(&mut self, value: f32) {
        self.value = self.clamp(value);
    }

    pub fn set_target(&mut self, target: f32) {
        self.target = self.clamp(target);
    }

    /// Chase `target`, returning to rest after `recovery` seconds.
    /// Pre-empts any curve already in flight.
    pub fn trigger(&mut self, target: f32, recovery: Option<f32>) {
        self.set_target(target);
        self.recovery = recovery.map(|duration| Recovery {
            duration,
            elapsed: 0.0,
        });
    }

    /// Back to rest immediately
    pub fn reset(&mut self) {
        self.value = self.rest;
        self.target = self.rest;
        self.recovery = None;
    }

    pub fn step(&mut self, dt: f32) {
        if let Some(recovery) = &mut self.recovery {
            recovery.elapsed += dt;
            if recovery.elapsed >= recovery.duration {
                self.target = self.rest;
                self.recovery = None;
            }
        }

        let delta = self.target - self.value;
        let next = match self.approach {
            Approach::Exponential { rate } => self.value + delta * (1.0 - (-rate * dt).exp()),
            Approach::Linear { per_second } => {
                let step = per_second * dt;
                self.value + delta.clamp(-step, step)
            }
        };
        self.value = self.clamp(next);
    }
}

/// Which modifiers the player allows
#[derive(Debug, Clone, Copy, PartialEq)]
struct Enabled {
    time_dilation: bool,
    recoil: bool,
    vignette: bool,
}

impl From<&Settings> for Enabled {
    fn from(settings: &Settings) -> Self {
        Self {
            time_dilation: settings.effective_time_dilation(),
            recoil: settings.effective_screen_shake(),
            vignette: settings.critical_vignette,
        }
    }
}

/// Time dilation, recoil, critical intensity and impact flash
#[derive(Debug, Clone)]
pub struct FeedbackModifiers {
    pub time_scale: TimingModifier,
    pub recoil: TimingModifier,
    pub critical: TimingModifier,
    /// White overlay opacity, independent of recoil
    pub impact_flash: TimingModifier,
    /// Wall-clock seconds since the round started
    elapsed: f32,
    /// Wall-clock seconds since the last recoil kick
    since_kick: f32,
    slow_motion_scale: f32,
    slow_motion_recovery: f32,
    recoil_kick: f32,
    recoil_frequency: f32,
    pulse_period: f32,
    enabled: Enabled,
}

impl FeedbackModifiers {
    pub fn new(tuning: &Tuning, settings: &Settings) -> Self {
        Self {
            time_scale: TimingModifier::new(
                1.0,
                Approach::Exponential {
                    rate: tuning.time_scale_rate,
                },
                tuning.slow_motion_scale.min(1.0),
                1.0,
            ),
            recoil: TimingModifier::new(
                0.0,
                Approach::Exponential {
                    rate: tuning.recoil_decay,
                },
                0.0,
                tuning.recoil_kick.max(0.0),
            ),
            critical: TimingModifier::new(
                0.0,
                Approach::Linear {
                    per_second: tuning.critical_decay,
                },
                0.0,
                1.0,
            ),
            impact_flash: TimingModifier::new(
                0.0,
                Approach::Linear {
                    per_second: tuning.impact_flash_decay,
                },
                0.0,
                1.0,
            ),
            elapsed: 0.0,
            since_kick: 0.0,
            slow_motion_scale: tuning.slow_motion_scale,
            slow_motion_recovery: tuning.slow_motion_recovery,
            recoil_kick: tuning.recoil_kick,
            recoil_frequency: tuning.recoil_frequency,
            pulse_period: tuning.critical_pulse_period,
            enabled: Enabled::from(settings),
        }
    }

    /// Pick up changed preferences without disturbing running curves
    pub fn apply_settings(&mut self, settings: &Settings) {
        self.enabled = Enabled::from(settings);
        if !self.enabled.recoil {
            self.recoil.reset();
        }
    }

    pub fn reset(&mut self) {
        self.time_scale.reset();
        self.recoil.reset();
        self.critical.reset();
        self.impact_flash.reset();
        self.elapsed = 0.0;
        self.since_kick = 0.0;
    }

    /// Level-up slow motion. A second trigger restarts the recovery window.
    pub fn trigger_level_up(&mut self) {
        if self.enabled.time_dilation {
            self.time_scale
                .trigger(self.slow_motion_scale, Some(self.slow_motion_recovery));
        }
    }

    /// Camera recoil spike from a shot
    pub fn kick_recoil(&mut self) {
        if self.enabled.recoil {
            self.recoil.set_value(self.recoil_kick);
            self.recoil.set_target(0.0);
            self.since_kick = 0.0;
        }
    }

    /// Flash the whole screen. A weaker flash never dims a brighter one.
    pub fn flash(&mut self, intensity: f32) {
        if intensity > self.impact_flash.value() {
            self.impact_flash.set_value(intensity);
        }
        self.impact_flash.set_target(0.0);
    }

    pub fn set_critical_intensity(&mut self, intensity: f32) {
        self.critical.set_value(intensity);
    }

    /// Advance on the raw frame delta. `danger` in [0,1] holds the critical
    /// intensity up; once it drops, intensity decays linearly.
    pub fn step(&mut self, raw_dt: f32, danger: f32) {
        self.elapsed += raw_dt;
        self.since_kick += raw_dt;

        self.time_scale.step(raw_dt);

        self.recoil.step(raw_dt);
        if self.recoil.value() < RECOIL_EPSILON {
            self.recoil.set_value(0.0);
        }

        let danger = if danger.is_finite() { danger.clamp(0.0, 1.0) } else { 0.0 };
        if danger > self.critical.value() {
            self.critical.set_value(danger);
        }
        self.critical.set_target(danger);
        self.critical.step(raw_dt);

        self.impact_flash.step(raw_dt);
    }

    pub fn time_scale(&self) -> f32 {
        self.time_scale.value()
    }

    pub fn recoil_magnitude(&self) -> f32 {
        self.recoil.value()
    }

    /// Camera displacement for this frame
    pub fn recoil_offset(&self) -> Vec2 {
        let magnitude = self.recoil.value();
        if magnitude == 0.0 {
            return Vec2::ZERO;
        }
        Vec2::new(0.0, magnitude * (TAU * self.recoil_frequency * self.since_kick).sin())
    }

    pub fn impact_flash(&self) -> f32 {
        self.impact_flash.value()
    }

    pub fn critical_intensity(&self) -> f32 {
        self.critical.value()
    }

    /// 0..1 heartbeat while critical, 0 otherwise
    pub fn critical_pulse(&self) -> f32 {
        if self.critical.value() > 0.0 {
            0.5 + 0.5 * (TAU * self.elapsed / self.pulse_period).sin()
        } else {
            0.0
        }
    }

    /// Vignette opacity the renderer should draw
    pub fn vignette_strength(&self) -> f32 {
        if !self.enabled.vignette {
            return 0.0;
        }
        self.critical.value() * (0.6 + 0.4 * self.critical_pulse())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const DT: f32 = 1.0 / 60.0;

    fn modifiers() -> FeedbackModifiers {
        FeedbackModifiers::new(&Tuning::default(), &Settings::default())
    }

    fn run(m: &mut FeedbackModifiers, seconds: f32) {
        let frames = (seconds / DT).round() as usize;
        for _ in 0..frames {
            m.step(DT, 0.0);
        }
    }

    #[test]
    fn test_level_up_slow_motion_and_recovery() {
        let mut m = modifiers();
        assert!((m.time_scale() - 1.0).abs() < 0.01);

        m.trigger_level_up();
        m.step(DT, 0.0);
        assert!(m.time_scale() < 1.0, "no movement after one update");

        run(&mut m, 1.0);
        assert!(m.time_scale() < 0.5);

        // Trigger at t=0, recovery window 2.0s, check at 2.5s
        run(&mut m, 1.5 - DT);
        assert!((m.time_scale() - 1.0).abs() < 0.1, "got {}", m.time_scale());
    }

    #[test]
    fn test_second_level_up_restarts_window() {
        let mut m = modifiers();
        m.trigger_level_up();
        run(&mut m, 1.8);
        m.trigger_level_up();
        run(&mut m, 0.5);
        // Still inside the restarted window
        assert!(m.time_scale() < 0.5);
        assert!(m.time_scale.recovery().is_some());
        run(&mut m, 2.0);
        assert!((m.time_scale() - 1.0).abs() < 0.1);
    }

    #[test]
    fn test_time_scale_never_leaves_domain() {
        let mut m = modifiers();
        m.time_scale.set_value(5.0);
        assert_eq!(m.time_scale(), 1.0);
        m.time_scale.set_value(-1.0);
        assert!(m.time_scale() > 0.0);
    }

    #[test]
    fn test_recoil_displacement() {
        let mut m = modifiers();
        assert_eq!(m.recoil_offset(), Vec2::ZERO);
        m.kick_recoil();
        let mut max_y: f32 = 0.0;
        // Sample every 10ms for 200ms
        for _ in 0..20 {
            m.step(0.01, 0.0);
            max_y = max_y.max(m.recoil_offset().y.abs());
        }
        assert!(max_y > 5.0, "max displacement {max_y}");

        run(&mut m, 2.0);
        assert_eq!(m.recoil_magnitude(), 0.0);
        assert_eq!(m.recoil_offset(), Vec2::ZERO);
    }

    #[test]
    fn test_recoil_oscillates() {
        let mut m = modifiers();
        m.kick_recoil();
        let (mut pos, mut neg) = (false, false);
        for _ in 0..30 {
            m.step(0.005, 0.0);
            let y = m.recoil_offset().y;
            pos |= y > 0.5;
            neg |= y < -0.5;
        }
        assert!(pos && neg);
    }

    #[test]
    fn test_reduced_motion_suppresses_kick_and_slow_motion() {
        let settings = Settings {
            reduced_motion: true,
            ..Default::default()
        };
        let mut m = FeedbackModifiers::new(&Tuning::default(), &settings);
        m.kick_recoil();
        m.trigger_level_up();
        m.step(DT, 0.0);
        assert_eq!(m.recoil_magnitude(), 0.0);
        assert_eq!(m.time_scale(), 1.0);
    }

    #[test]
    fn test_critical_pulse_and_decay() {
        let mut m = modifiers();
        assert_eq!(m.critical_pulse(), 0.0);
        m.set_critical_intensity(1.0);

        let mut pulses = Vec::new();
        for _ in 0..72 {
            m.step(DT, 0.0);
            pulses.push(m.critical_pulse());
        }
        // One full 1.2s period visits both extremes
        assert!(pulses.iter().any(|p| *p > 0.9));
        assert!(pulses.iter().any(|p| *p < 0.1));
        // Linear decay at 0.25/s
        assert!((m.critical_intensity() - 0.7).abs() < 0.01);
        assert!(m.vignette_strength() > 0.0);

        run(&mut m, 3.0);
        assert_eq!(m.critical_intensity(), 0.0);
        assert_eq!(m.vignette_strength(), 0.0);
    }

    #[test]
    fn test_critical_half_second_after_injection() {
        let mut m = modifiers();
        m.set_critical_intensity(1.0);
        run(&mut m, 0.5);
        assert!(m.critical_intensity() > 0.8);
    }

    #[test]
    fn test_danger_holds_intensity() {
        let mut m = modifiers();
        for _ in 0..60 {
            m.step(DT, 0.6);
        }
        assert!((m.critical_intensity() - 0.6).abs() < 1e-5);
        m.step(DT, 0.0);
        assert!(m.critical_intensity() < 0.6);
        assert!(m.critical_intensity() > 0.59);
    }

    #[test]
    fn test_impact_flash_decays_linearly() {
        let mut m = modifiers();
        assert_eq!(m.impact_flash(), 0.0);
        m.flash(1.0);
        assert_eq!(m.impact_flash(), 1.0);

        // 3.0/s: gone after a third of a second, halfway at a sixth
        run(&mut m, 1.0 / 6.0);
        assert!((m.impact_flash() - 0.5).abs() < 0.01, "got {}", m.impact_flash());
        run(&mut m, 0.25);
        assert_eq!(m.impact_flash(), 0.0);
    }

    #[test]
    fn test_weak_flash_does_not_dim_strong_one() {
        let mut m = modifiers();
        m.flash(0.9);
        m.flash(0.25);
        assert_eq!(m.impact_flash(), 0.9);
        m.flash(3.0);
        assert_eq!(m.impact_flash(), 1.0);
        // Recoil is untouched
        assert_eq!(m.recoil_magnitude(), 0.0);
    }

    #[test]
    fn test_reset() {
        let mut m = modifiers();
        m.trigger_level_up();
        m.kick_recoil();
        m.set_critical_intensity(0.8);
        m.flash(1.0);
        run(&mut m, 0.1);
        m.reset();
        assert_eq!(m.time_scale(), 1.0);
        assert_eq!(m.recoil_magnitude(), 0.0);
        assert_eq!(m.critical_intensity(), 0.0);
        assert_eq!(m.impact_flash(), 0.0);
        assert!(m.time_scale.recovery().is_none());
    }

    proptest! {
        #[test]
        fn modifier_value_stays_clamped(
            start in -10.0f32..10.0,
            target in -10.0f32..10.0,
            dts in proptest::collection::vec(0.0f32..0.2, 1..50),
        ) {
            let mut m = TimingModifier::new(0.5, Approach::Exponential { rate: 7.0 }, 0.0, 1.0);
            m.set_value(start);
            m.trigger(target, Some(0.3));
            for dt in dts {
                m.step(dt);
                prop_assert!((0.0..=1.0).contains(&m.value()));
            }
        }

        #[test]
        fn linear_approach_never_overshoots(
            target in 0.0f32..1.0,
            dts in proptest::collection::vec(0.0f32..0.5, 1..50),
        ) {
            let mut m = TimingModifier::new(0.0, Approach::Linear { per_second: 0.8 }, 0.0, 1.0);
            m.set_value(1.0);
            m.set_target(target);
            for dt in dts {
                m.step(dt);
                prop_assert!(m.value() >= target - 1e-6);
            }
        }
    }
}
