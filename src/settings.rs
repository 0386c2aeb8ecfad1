//! Player preferences
//!
//! Persisted separately from the balance table as a small JSON file.

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SimResult;

/// Quality preset levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum QualityPreset {
    Low,
    #[default]
    Medium,
    High,
}

impl QualityPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityPreset::Low => "Low",
            QualityPreset::Medium => "Medium",
            QualityPreset::High => "High",
        }
    }

    /// Maximum live particles for this preset (all archetypes combined)
    pub fn max_particles(&self) -> usize {
        match self {
            QualityPreset::Low => 250,
            QualityPreset::Medium => 1000,
            QualityPreset::High => 4000,
        }
    }

    /// Trail emission multiplier (1.0 = every interval)
    pub fn trail_density(&self) -> f32 {
        match self {
            QualityPreset::Low => 0.25,
            QualityPreset::Medium => 0.6,
            QualityPreset::High => 1.0,
        }
    }
}

impl FromStr for QualityPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(QualityPreset::Low),
            "medium" | "med" => Ok(QualityPreset::Medium),
            "high" => Ok(QualityPreset::High),
            other => Err(format!("unknown quality preset '{other}'")),
        }
    }
}

/// Game settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Graphics quality preset
    pub quality: QualityPreset,

    // === Visual Effects ===
    /// Camera recoil on shots
    pub screen_shake: bool,
    /// Particle effects (debris, shards, souls, shockwaves)
    pub particles: bool,
    /// Launcher trail
    pub trails: bool,
    /// Floating score/level text
    pub floating_text: bool,
    /// Slow motion on level up
    pub time_dilation: bool,
    /// Pulsing vignette while crystals are close to colliding
    pub critical_vignette: bool,

    // === Accessibility ===
    /// Reduced motion (no recoil, no slow motion)
    pub reduced_motion: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            quality: QualityPreset::Medium,

            // Visual effects - all on by default
            screen_shake: true,
            particles: true,
            trails: true,
            floating_text: true,
            time_dilation: true,
            critical_vignette: true,

            // Accessibility
            reduced_motion: false,
        }
    }
}

impl Settings {
    /// Create settings from a quality preset (applies preset defaults)
    pub fn from_preset(preset: QualityPreset) -> Self {
        let mut settings = Self::default();
        settings.apply_preset(preset);
        settings
    }

    /// Apply a quality preset (updates quality-dependent settings)
    pub fn apply_preset(&mut self, preset: QualityPreset) {
        self.quality = preset;

        // Low preset drops the purely decorative effects
        if preset == QualityPreset::Low {
            self.trails = false;
            self.critical_vignette = false;
        }
    }

    /// Effective recoil (respects reduced_motion)
    pub fn effective_screen_shake(&self) -> bool {
        self.screen_shake && !self.reduced_motion
    }

    /// Effective slow motion (respects reduced_motion)
    pub fn effective_time_dilation(&self) -> bool {
        self.time_dilation && !self.reduced_motion
    }

    /// Effective particle count cap
    pub fn max_particles(&self) -> usize {
        if !self.particles {
            0
        } else {
            self.quality.max_particles()
        }
    }

    /// Load settings from a JSON file, falling back to defaults if missing
    pub fn load(path: impl AsRef<Path>) -> SimResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::info!("Using default settings");
            return Ok(Self::default());
        }
        let json = std::fs::read_to_string(path)?;
        let settings = serde_json::from_str(&json)?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Save settings as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> SimResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        log::info!("Settings saved");
        Ok(())
    }
}
