//! Crystal field
//!
//! Two crystals per lane: one hangs from the top edge, one rises from the
//! bottom edge. They grow every frame; when a lane's pair meets, the round is
//! over. Storage is lane-major: index `2 * lane` is the top crystal and
//! `2 * lane + 1` the bottom one.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::color::CrystalColor;
use crate::error::{SimError, SimResult};
use crate::tuning::Tuning;

/// Below this an impulse is considered settled
const IMPULSE_EPSILON: f32 = 1e-4;

/// Which edge a crystal grows from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Top,
    Bottom,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Top, Side::Bottom];

    /// Direction (radians) from this side's edge into the open field
    pub fn outward_angle(self) -> f32 {
        match self {
            Side::Top => std::f32::consts::FRAC_PI_2,
            Side::Bottom => -std::f32::consts::FRAC_PI_2,
        }
    }
}

/// A growing crystal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Crystal {
    pub lane: usize,
    pub side: Side,
    pub color: CrystalColor,
    /// Length from its edge, in pixels
    pub height: f32,
    /// Breathing factor (always >= breathing floor)
    pub scale_x: f32,
    /// Display stretch driven by `vel_scale_y`
    pub scale_y: f32,
    /// Resonance impulse, decays to 0
    pub vel_scale_y: f32,
    /// Highlight intensity, decays to 0
    pub flash: f32,
    /// Shape variation and breathing phase, in [0, 1)
    pub shape_seed: f32,
}

impl Crystal {
    pub fn new(lane: usize, side: Side, height: f32, color: CrystalColor, shape_seed: f32) -> Self {
        Self {
            lane,
            side,
            color,
            height,
            scale_x: 1.0,
            scale_y: 1.0,
            vel_scale_y: 0.0,
            flash: 0.0,
            shape_seed,
        }
    }

    /// y coordinate of the tip (screen space, y down)
    pub fn tip_y(&self, field_height: f32) -> f32 {
        match self.side {
            Side::Top => self.height,
            Side::Bottom => field_height - self.height,
        }
    }

    /// y coordinate of the edge it grows from
    pub fn base_y(&self, field_height: f32) -> f32 {
        match self.side {
            Side::Top => 0.0,
            Side::Bottom => field_height,
        }
    }

    /// Resonance jump: raise the impulse to at least `jump`
    pub fn apply_impulse(&mut self, jump: f32, stretch: f32) {
        self.vel_scale_y = self.vel_scale_y.max(jump);
        self.scale_y = 1.0 + self.vel_scale_y * stretch;
    }
}

/// Two crystals in a lane met
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Collision {
    pub lane: usize,
    /// Where the tips meet
    pub point: Vec2,
    /// Color of the top crystal
    pub color: CrystalColor,
}

/// Growth and breathing constants, copied out of [`Tuning`]
#[derive(Debug, Clone, Copy)]
struct FieldParams {
    lanes: usize,
    lane_width: f32,
    field_height: f32,
    start_height_min: f32,
    start_height_max: f32,
    growth_rate: f32,
    breathing_amplitude: f32,
    breathing_period: f32,
    breathing_floor: f32,
    flash_decay: f32,
    danger_threshold: f32,
    resonance_damping: f32,
    resonance_stretch: f32,
}

/// All crystals of the play field
#[derive(Debug, Clone)]
pub struct CrystalField {
    crystals: Vec<Crystal>,
    params: FieldParams,
    /// Accumulated scaled simulation time driving the breathing wave
    elapsed: f32,
}

impl CrystalField {
    pub fn new(tuning: &Tuning, rng: &mut impl Rng) -> Self {
        let params = FieldParams {
            lanes: tuning.lanes,
            lane_width: tuning.lane_width(),
            field_height: tuning.field_height,
            start_height_min: tuning.start_height_min,
            start_height_max: tuning.start_height_max,
            growth_rate: tuning.growth_rate,
            breathing_amplitude: tuning.breathing_amplitude,
            breathing_period: tuning.breathing_period,
            breathing_floor: tuning.breathing_floor,
            flash_decay: tuning.flash_decay,
            danger_threshold: tuning.danger_threshold,
            resonance_damping: tuning.resonance_damping,
            resonance_stretch: tuning.resonance_stretch,
        };
        let mut field = Self {
            crystals: Vec::with_capacity(tuning.lanes * 2),
            params,
            elapsed: 0.0,
        };
        field.reset(rng);
        field
    }

    /// Reinitialize every crystal with fresh heights and colors
    pub fn reset(&mut self, rng: &mut impl Rng) {
        let p = self.params;
        self.elapsed = 0.0;
        self.crystals.clear();
        for lane in 0..p.lanes {
            for side in Side::BOTH {
                let height = rng.random_range(p.start_height_min..=p.start_height_max);
                let color = CrystalColor::random(rng);
                let mut crystal = Crystal::new(lane, side, height, color, rng.random());
                crystal.scale_x = self.breathing(crystal.shape_seed);
                self.crystals.push(crystal);
            }
        }
    }

    pub fn lanes(&self) -> usize {
        self.params.lanes
    }

    pub fn field_height(&self) -> f32 {
        self.params.field_height
    }

    pub fn lane_width(&self) -> f32 {
        self.params.lane_width
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn crystals(&self) -> &[Crystal] {
        &self.crystals
    }

    /// Direct access for hosts and tools; invariants are re-checked every step
    pub fn crystals_mut(&mut self) -> &mut [Crystal] {
        &mut self.crystals
    }

    fn index(&self, lane: usize, side: Side) -> SimResult<usize> {
        if lane >= self.params.lanes {
            return Err(SimError::InvalidLane {
                lane,
                lanes: self.params.lanes,
            });
        }
        Ok(lane * 2 + side as usize)
    }

    pub fn get(&self, lane: usize, side: Side) -> SimResult<&Crystal> {
        let idx = self.index(lane, side)?;
        Ok(&self.crystals[idx])
    }

    pub fn get_mut(&mut self, lane: usize, side: Side) -> SimResult<&mut Crystal> {
        let idx = self.index(lane, side)?;
        Ok(&mut self.crystals[idx])
    }

    /// Breathing scale for a crystal at the current time
    fn breathing(&self, shape_seed: f32) -> f32 {
        let p = &self.params;
        let phase = TAU * (self.elapsed / p.breathing_period + shape_seed);
        (1.0 + p.breathing_amplitude * phase.sin()).max(p.breathing_floor)
    }

    /// Grow, breathe and settle impulses by `dt` seconds of scaled time.
    ///
    /// Any non-finite or negative quantity is repaired and reported.
    pub fn advance(&mut self, dt: f32, growth_multiplier: f32) -> SimResult<()> {
        let p = self.params;
        self.elapsed += dt;

        let growth = p.growth_rate * growth_multiplier * dt;
        let damping = (-p.resonance_damping * dt).exp();

        for i in 0..self.crystals.len() {
            let scale_x = self.breathing(self.crystals[i].shape_seed);
            let c = &mut self.crystals[i];
            c.height += growth;
            c.flash = (c.flash - p.flash_decay * dt).max(0.0);
            c.vel_scale_y *= damping;
            if c.vel_scale_y < IMPULSE_EPSILON {
                c.vel_scale_y = 0.0;
            }
            c.scale_y = 1.0 + c.vel_scale_y * p.resonance_stretch;
            c.scale_x = scale_x;
        }

        self.check_invariants()
    }

    /// Repair out-of-domain values, reporting the first one found
    pub fn check_invariants(&mut self) -> SimResult<()> {
        let floor = self.params.breathing_floor;
        // A lost height restarts as a fresh crystal rather than ending the round
        let fallback_height = self
            .params
            .start_height_max
            .min(self.params.field_height / 2.0);
        let mut fault = None;

        for c in &mut self.crystals {
            if !(c.height.is_finite() && c.height >= 0.0) {
                fault.get_or_insert(SimError::InvariantViolation {
                    what: "crystal height",
                    value: c.height,
                });
                c.height = if c.height.is_finite() { 0.0 } else { fallback_height };
            }
            if !(c.scale_x.is_finite() && c.scale_x >= floor) {
                fault.get_or_insert(SimError::InvariantViolation {
                    what: "crystal scale_x",
                    value: c.scale_x,
                });
                c.scale_x = floor.max(1.0);
            }
            if !c.vel_scale_y.is_finite() {
                fault.get_or_insert(SimError::InvariantViolation {
                    what: "crystal vel_scale_y",
                    value: c.vel_scale_y,
                });
                c.vel_scale_y = 0.0;
                c.scale_y = 1.0;
            }
        }

        match fault {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// First lane whose top and bottom crystals meet
    pub fn detect_collision(&self) -> Option<Collision> {
        let p = &self.params;
        self.crystals.chunks_exact(2).find_map(|pair| {
            let (top, bottom) = (&pair[0], &pair[1]);
            if top.height + bottom.height >= p.field_height {
                let x = top.lane as f32 * p.lane_width + p.lane_width / 2.0;
                let y = top.height.min(p.field_height);
                Some(Collision {
                    lane: top.lane,
                    point: Vec2::new(x, y),
                    color: top.color,
                })
            } else {
                None
            }
        })
    }

    /// Fullest lane as a fraction of the field height
    pub fn max_fill(&self) -> f32 {
        self.crystals
            .chunks_exact(2)
            .map(|pair| (pair[0].height + pair[1].height) / self.params.field_height)
            .fold(0.0, f32::max)
    }

    /// 0 while every lane is below the danger threshold, 1 at collision
    pub fn danger(&self) -> f32 {
        let t = self.params.danger_threshold;
        ((self.max_fill() - t) / (1.0 - t)).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    const DT: f32 = 1.0 / 60.0;

    fn field() -> (CrystalField, Pcg32) {
        let mut rng = Pcg32::seed_from_u64(1234);
        let field = CrystalField::new(&Tuning::default(), &mut rng);
        (field, rng)
    }

    #[test]
    fn test_layout_is_lane_major() {
        let (field, _) = field();
        assert_eq!(field.crystals().len(), 14);
        for (i, c) in field.crystals().iter().enumerate() {
            assert_eq!(c.lane, i / 2);
            assert_eq!(c.side, if i % 2 == 0 { Side::Top } else { Side::Bottom });
            assert!((20.0..=80.0).contains(&c.height));
        }
        assert!(field.get(7, Side::Top).is_err());
        assert_eq!(field.get(3, Side::Bottom).unwrap().lane, 3);
    }

    #[test]
    fn test_growth_is_monotonic() {
        let (mut field, _) = field();
        let before: Vec<f32> = field.crystals().iter().map(|c| c.height).collect();
        for _ in 0..60 {
            field.advance(DT, 1.0).unwrap();
        }
        for (c, h0) in field.crystals().iter().zip(before) {
            assert!((c.height - h0 - 7.8).abs() < 0.01, "grew {}", c.height - h0);
        }
    }

    #[test]
    fn test_breathing_varies_and_stays_above_floor() {
        let (mut field, _) = field();
        let mut samples = Vec::new();
        // 12 samples, 0.1s apart
        for _ in 0..12 {
            for _ in 0..6 {
                field.advance(DT, 1.0).unwrap();
            }
            samples.push(field.crystals()[0].scale_x);
        }
        let min = samples.iter().copied().fold(f32::MAX, f32::min);
        let max = samples.iter().copied().fold(f32::MIN, f32::max);
        assert!(max - min > 1e-4, "static scale: {samples:?}");
        assert!(max >= 0.1);
        assert!(samples.iter().all(|s| *s >= 0.1));
    }

    #[test]
    fn test_impulse_decays_monotonically() {
        let (mut field, _) = field();
        field.get_mut(2, Side::Top).unwrap().apply_impulse(0.5, 0.5);
        let mut last = 0.5;
        for _ in 0..300 {
            field.advance(DT, 1.0).unwrap();
            let v = field.get(2, Side::Top).unwrap().vel_scale_y;
            assert!(v >= 0.0);
            assert!(v < last || v == 0.0, "overshoot: {v} after {last}");
            last = v;
        }
        assert_eq!(last, 0.0);
        assert_eq!(field.get(2, Side::Top).unwrap().scale_y, 1.0);
    }

    #[test]
    fn test_flash_decays_to_zero() {
        let (mut field, _) = field();
        field.crystals_mut()[0].flash = 1.0;
        field.advance(0.1, 1.0).unwrap();
        assert!((field.crystals()[0].flash - 0.4).abs() < 1e-5);
        field.advance(0.1, 1.0).unwrap();
        assert_eq!(field.crystals()[0].flash, 0.0);
    }

    #[test]
    fn test_collision_detection() {
        let (mut field, _) = field();
        assert!(field.detect_collision().is_none());

        let h = field.field_height();
        field.get_mut(4, Side::Top).unwrap().height = h * 0.6;
        field.get_mut(4, Side::Bottom).unwrap().height = h * 0.4;
        let hit = field.detect_collision().unwrap();
        assert_eq!(hit.lane, 4);
        assert!((hit.point.y - h * 0.6).abs() < 1e-3);
        assert!((hit.point.x - Tuning::default().lane_center(4)).abs() < 1e-3);
    }

    #[test]
    fn test_danger_ramps_near_collision() {
        let (mut field, _) = field();
        assert_eq!(field.danger(), 0.0);
        let h = field.field_height();
        field.get_mut(0, Side::Top).unwrap().height = h * 0.5;
        field.get_mut(0, Side::Bottom).unwrap().height = h * 0.35;
        assert!((field.danger() - 0.5).abs() < 1e-3);
        field.get_mut(0, Side::Bottom).unwrap().height = h;
        assert_eq!(field.danger(), 1.0);
    }

    #[test]
    fn test_invariant_repair() {
        let (mut field, _) = field();
        field.crystals_mut()[3].height = f32::NAN;
        let err = field.check_invariants().unwrap_err();
        assert!(err.is_invariant());
        assert!(field.crystals()[3].height.is_finite());
        assert!(field.check_invariants().is_ok());

        // Repairs never force a collision
        for c in field.crystals_mut() {
            c.height = f32::INFINITY;
        }
        assert!(field.check_invariants().is_err());
        assert!(field.crystals().iter().all(|c| c.height == 80.0));
        assert!(field.detect_collision().is_none());

        field.crystals_mut()[0].height = -5.0;
        assert!(field.check_invariants().is_err());
        assert_eq!(field.crystals()[0].height, 0.0);
    }

    #[test]
    fn test_outward_angle_points_into_field() {
        // Screen y grows downward
        assert!(Vec2::from_angle(Side::Top.outward_angle()).y > 0.99);
        assert!(Vec2::from_angle(Side::Bottom.outward_angle()).y < -0.99);
    }

    #[test]
    fn test_reset_restores_start_state() {
        let (mut field, mut rng) = field();
        for _ in 0..600 {
            field.advance(DT, 3.0).unwrap();
        }
        field.reset(&mut rng);
        assert_eq!(field.elapsed(), 0.0);
        assert!(field.crystals().iter().all(|c| c.height <= 80.0 && c.vel_scale_y == 0.0));
    }
}
