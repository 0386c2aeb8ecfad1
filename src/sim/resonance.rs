//! Resonance chains
//!
//! A resonance event for a color makes every crystal of that color jump at
//! once. Triggers are collected between frames and applied during the
//! resonance phase of the step; the impulse then settles in the crystal
//! field's next pass.

use serde::{Deserialize, Serialize};

use super::color::CrystalColor;
use super::crystal::CrystalField;

/// Pending resonance triggers, one bit per palette color
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResonanceEngine {
    pending: u8,
    /// Impulse given to `vel_scale_y`
    jump: f32,
    /// Display stretch per unit impulse
    stretch: f32,
}

/// Result of one resonance wave
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResonanceWave {
    pub color: CrystalColor,
    /// Crystals that jumped
    pub crystals: usize,
}

impl ResonanceEngine {
    pub fn new(jump: f32, stretch: f32) -> Self {
        Self {
            pending: 0,
            jump,
            stretch,
        }
    }

    /// Queue a wave for `color`. Repeated triggers before the next step collapse into one.
    pub fn trigger(&mut self, color: CrystalColor) {
        self.pending |= 1 << color.index();
    }

    pub fn is_pending(&self, color: CrystalColor) -> bool {
        self.pending & (1 << color.index()) != 0
    }

    pub fn has_pending(&self) -> bool {
        self.pending != 0
    }

    /// Drop queued waves without applying them
    pub fn clear(&mut self) {
        self.pending = 0;
    }

    /// Apply every queued wave to the field. Colors with no crystals are silently skipped.
    pub fn step(&mut self, field: &mut CrystalField) -> Vec<ResonanceWave> {
        if self.pending == 0 {
            return Vec::new();
        }

        let mut waves = Vec::new();
        for color in CrystalColor::ALL {
            if !self.is_pending(color) {
                continue;
            }
            let mut crystals = 0;
            for c in field.crystals_mut().iter_mut().filter(|c| c.color == color) {
                c.apply_impulse(self.jump, self.stretch);
                c.flash = c.flash.max(0.5);
                crystals += 1;
            }
            if crystals > 0 {
                log::debug!("Resonance {}: {} crystals", color.name(), crystals);
                waves.push(ResonanceWave { color, crystals });
            }
        }
        self.pending = 0;
        waves
    }
}
