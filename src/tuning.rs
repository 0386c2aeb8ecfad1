//! Data-driven game balance
//!
//! Every constant the simulation reads lives here so a host can ship a JSON
//! balance file instead of recompiling. Missing keys fall back to defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

/// Balance table for one simulation instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    // === Field geometry ===
    /// Number of lanes across the field
    pub lanes: usize,
    /// Field width in pixels
    pub field_width: f32,
    /// Field height in pixels (top crystals hang from y=0, bottom rise from y=height)
    pub field_height: f32,
    /// Largest raw frame delta accepted (seconds)
    pub max_frame_dt: f32,

    // === Crystals ===
    /// Starting height range for fresh crystals
    pub start_height_min: f32,
    pub start_height_max: f32,
    /// Base growth in pixels per second
    pub growth_rate: f32,
    /// Score per growth-multiplier step and per level
    pub level_score_step: u64,
    /// Breathing waveform
    pub breathing_amplitude: f32,
    pub breathing_period: f32,
    pub breathing_floor: f32,
    /// Flash decay per second
    pub flash_decay: f32,
    /// Lane fill ratio where the danger level starts rising
    pub danger_threshold: f32,

    // === Resonance ===
    /// velScaleY set on resonating crystals
    pub resonance_jump: f32,
    /// Exponential damping rate of velScaleY (1/s)
    pub resonance_damping: f32,
    /// How much scaleY stretches per unit velScaleY
    pub resonance_stretch: f32,

    // === Launcher ===
    /// Per-frame lerp factor at the 60 Hz reference rate
    pub launcher_smoothing: f32,
    /// Distance (px) above which the launcher leaves a trail
    pub trail_threshold: f32,
    /// Seconds between trail particles
    pub trail_interval: f32,

    // === Spores ===
    /// Spore radius at launch
    pub spore_start_radius: f32,
    /// Spore radius growth in pixels per second
    pub spore_expand_rate: f32,
    /// Height removed from a crystal on a color match
    pub match_shrink: f32,
    /// Height added to a crystal on a mismatch
    pub penalty_growth: f32,
    /// Crystals never shrink below this
    pub min_crystal_height: f32,
    /// Points per match
    pub match_score: u64,

    // === Particles ===
    pub debris_min_speed: f32,
    pub debris_max_speed: f32,
    /// Half-angle of the directional debris cone (radians)
    pub debris_cone_half_angle: f32,
    pub shard_speed: f32,
    pub particle_gravity: f32,
    pub shockwave_speed: f32,
    pub shockwave_life: f32,

    // === Feedback modifiers ===
    /// timeScale target during level-up slow motion
    pub slow_motion_scale: f32,
    /// Seconds before timeScale starts recovering
    pub slow_motion_recovery: f32,
    /// Exponential approach rate of timeScale (1/s)
    pub time_scale_rate: f32,
    /// Recoil spike in pixels
    pub recoil_kick: f32,
    pub recoil_decay: f32,
    /// Oscillation frequency of the recoil displacement (Hz)
    pub recoil_frequency: f32,
    /// Critical vignette pulse period (seconds)
    pub critical_pulse_period: f32,
    /// Linear decay of critical intensity per second once danger clears
    pub critical_decay: f32,
    /// Full-screen flash set on a match
    pub impact_flash_match: f32,
    /// Full-screen flash set at game over
    pub impact_flash_game_over: f32,
    /// Linear decay of the impact flash per second
    pub impact_flash_decay: f32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            lanes: 7,
            field_width: 1280.0,
            field_height: 800.0,
            max_frame_dt: 0.1,

            start_height_min: 20.0,
            start_height_max: 80.0,
            growth_rate: 7.8, // 0.13 px/frame at 60 fps
            level_score_step: 500,
            breathing_amplitude: 0.06,
            breathing_period: 1.6,
            breathing_floor: 0.1,
            flash_decay: 6.0,
            danger_threshold: 0.7,

            resonance_jump: 0.5,
            resonance_damping: 4.0,
            resonance_stretch: 0.5,

            launcher_smoothing: 0.2,
            trail_threshold: 2.0,
            trail_interval: 1.0 / 60.0,

            spore_start_radius: 10.0,
            spore_expand_rate: 480.0, // 8 px/frame at 60 fps
            match_shrink: 150.0,
            penalty_growth: 40.0,
            min_crystal_height: 10.0,
            match_score: 10,

            debris_min_speed: 60.0,
            debris_max_speed: 300.0,
            debris_cone_half_angle: 0.4,
            shard_speed: 260.0,
            particle_gravity: 420.0,
            shockwave_speed: 520.0,
            shockwave_life: 0.6,

            slow_motion_scale: 0.05,
            slow_motion_recovery: 2.0,
            time_scale_rate: 10.0,
            recoil_kick: 15.0,
            recoil_decay: 8.0,
            recoil_frequency: 12.0,
            critical_pulse_period: 1.2,
            critical_decay: 0.25,
            impact_flash_match: 0.25,
            impact_flash_game_over: 1.0,
            impact_flash_decay: 3.0, // 0.05 per frame at 60 fps
        }
    }
}

impl Tuning {
    /// Width of one lane in pixels
    #[inline]
    pub fn lane_width(&self) -> f32 {
        self.field_width / self.lanes as f32
    }

    /// Geometric center x of a lane
    #[inline]
    pub fn lane_center(&self, lane: usize) -> f32 {
        let w = self.lane_width();
        lane as f32 * w + w / 2.0
    }

    /// Parse a balance table from JSON and validate it
    pub fn from_json(json: &str) -> SimResult<Self> {
        let tuning: Tuning = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Load a balance table from a JSON file
    pub fn load(path: impl AsRef<Path>) -> SimResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let tuning = Self::from_json(&json)?;
        log::info!("Loaded tuning from {}", path.display());
        Ok(tuning)
    }

    /// Reject values the simulation cannot run with
    pub fn validate(&self) -> SimResult<()> {
        fn positive(name: &str, v: f32) -> SimResult<()> {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(SimError::InvalidConfig(format!("{name} must be positive, got {v}")))
            }
        }
        fn non_negative(name: &str, v: f32) -> SimResult<()> {
            if v.is_finite() && v >= 0.0 {
                Ok(())
            } else {
                Err(SimError::InvalidConfig(format!("{name} must be at least 0, got {v}")))
            }
        }

        if self.lanes == 0 {
            return Err(SimError::InvalidConfig("lanes must be at least 1".into()));
        }
        positive("field_width", self.field_width)?;
        positive("field_height", self.field_height)?;
        positive("max_frame_dt", self.max_frame_dt)?;
        positive("breathing_period", self.breathing_period)?;
        positive("breathing_floor", self.breathing_floor)?;
        positive("critical_pulse_period", self.critical_pulse_period)?;
        positive("spore_expand_rate", self.spore_expand_rate)?;
        positive("trail_interval", self.trail_interval)?;
        positive("resonance_damping", self.resonance_damping)?;
        positive("recoil_decay", self.recoil_decay)?;
        positive("time_scale_rate", self.time_scale_rate)?;
        positive("critical_decay", self.critical_decay)?;
        positive("impact_flash_decay", self.impact_flash_decay)?;

        non_negative("growth_rate", self.growth_rate)?;
        non_negative("flash_decay", self.flash_decay)?;
        non_negative("debris_cone_half_angle", self.debris_cone_half_angle)?;
        non_negative("shard_speed", self.shard_speed)?;
        non_negative("shockwave_life", self.shockwave_life)?;

        if self.start_height_min < 0.0 || self.start_height_max < self.start_height_min {
            return Err(SimError::InvalidConfig(format!(
                "start height range {}..{} is invalid",
                self.start_height_min, self.start_height_max
            )));
        }
        if !(self.launcher_smoothing > 0.0 && self.launcher_smoothing <= 1.0) {
            return Err(SimError::InvalidConfig(format!(
                "launcher_smoothing must be in (0, 1], got {}",
                self.launcher_smoothing
            )));
        }
        if !(self.slow_motion_scale > 0.0 && self.slow_motion_scale <= 1.0) {
            return Err(SimError::InvalidConfig(format!(
                "slow_motion_scale must be in (0, 1], got {}",
                self.slow_motion_scale
            )));
        }
        if !(0.0..1.0).contains(&self.danger_threshold) {
            return Err(SimError::InvalidConfig(format!(
                "danger_threshold must be in [0, 1), got {}",
                self.danger_threshold
            )));
        }
        if self.debris_min_speed < 0.0 || self.debris_max_speed < self.debris_min_speed {
            return Err(SimError::InvalidConfig(format!(
                "debris speed range {}..{} is invalid",
                self.debris_min_speed, self.debris_max_speed
            )));
        }
        if self.level_score_step == 0 {
            return Err(SimError::InvalidConfig("level_score_step must be nonzero".into()));
        }
        Ok(())
    }
}
