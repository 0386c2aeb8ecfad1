//! Launcher and spores
//!
//! The launcher glides toward the selected lane and leaves a trail of soul
//! motes while it moves. Shooting fires a spore at mid-height: it expands
//! until it touches the lane's crystals, shrinking a crystal of the same
//! color or feeding one of a different color.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::color::CrystalColor;
use super::crystal::{CrystalField, Side};
use super::particles::ParticleSystem;
use crate::consts::REFERENCE_FPS;
use crate::error::{SimError, SimResult};
use crate::tuning::Tuning;

/// An expanding projectile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spore {
    pub lane: usize,
    pub pos: Vec2,
    pub radius: f32,
    pub color: CrystalColor,
    pub active: bool,
}

/// What a spore did when it reached a crystal
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SporeHit {
    /// Same color: crystal shrank
    Match {
        lane: usize,
        side: Side,
        color: CrystalColor,
        /// New tip position
        point: Vec2,
    },
    /// Different color: crystal grew
    Mismatch {
        lane: usize,
        side: Side,
        point: Vec2,
    },
}

/// Smoothed lane-tracking launcher
#[derive(Debug, Clone)]
pub struct Launcher {
    target_lane: usize,
    x: f32,
    y: f32,
    lanes: usize,
    lane_width: f32,
    field_height: f32,
    smoothing: f32,
    trail_threshold: f32,
    /// Seconds between trail motes; `None` disables the trail
    trail_interval: Option<f32>,
    trail_timer: f32,
    next_color: CrystalColor,
    spores: Vec<Spore>,
    spore_start_radius: f32,
    spore_expand_rate: f32,
    match_shrink: f32,
    penalty_growth: f32,
    min_crystal_height: f32,
}

impl Launcher {
    pub fn new(tuning: &Tuning, trail_interval: Option<f32>, next_color: CrystalColor) -> Self {
        let start_lane = tuning.lanes / 2;
        Self {
            target_lane: start_lane,
            x: tuning.lane_center(start_lane),
            y: tuning.field_height / 2.0,
            lanes: tuning.lanes,
            lane_width: tuning.lane_width(),
            field_height: tuning.field_height,
            smoothing: tuning.launcher_smoothing,
            trail_threshold: tuning.trail_threshold,
            trail_interval,
            trail_timer: 0.0,
            next_color,
            spores: Vec::new(),
            spore_start_radius: tuning.spore_start_radius,
            spore_expand_rate: tuning.spore_expand_rate,
            match_shrink: tuning.match_shrink,
            penalty_growth: tuning.penalty_growth,
            min_crystal_height: tuning.min_crystal_height,
        }
    }

    /// Back to the middle lane with no spores in flight
    pub fn reset(&mut self, next_color: CrystalColor) {
        self.target_lane = self.lanes / 2;
        self.x = self.lane_center(self.target_lane);
        self.trail_timer = 0.0;
        self.next_color = next_color;
        self.spores.clear();
    }

    pub fn x(&self) -> f32 {
        self.x
    }

    pub fn y(&self) -> f32 {
        self.y
    }

    pub fn pos(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn target_lane(&self) -> usize {
        self.target_lane
    }

    /// Center of the target lane
    pub fn target_x(&self) -> f32 {
        self.lane_center(self.target_lane)
    }

    /// Color of the next spore to be fired
    pub fn next_color(&self) -> CrystalColor {
        self.next_color
    }

    pub fn spores(&self) -> &[Spore] {
        &self.spores
    }

    pub fn clear_spores(&mut self) {
        self.spores.clear();
    }

    pub fn set_trail_interval(&mut self, interval: Option<f32>) {
        self.trail_interval = interval.filter(|i| i.is_finite() && *i > 0.0);
        self.trail_timer = 0.0;
    }

    /// Still far enough from the target to leave a trail
    pub fn is_moving(&self) -> bool {
        (self.target_x() - self.x).abs() > self.trail_threshold
    }

    fn lane_center(&self, lane: usize) -> f32 {
        lane as f32 * self.lane_width + self.lane_width / 2.0
    }

    fn check_lane(&self, lane: usize) -> SimResult<()> {
        if lane < self.lanes {
            Ok(())
        } else {
            Err(SimError::InvalidLane {
                lane,
                lanes: self.lanes,
            })
        }
    }

    pub fn set_target_lane(&mut self, lane: usize) -> SimResult<()> {
        self.check_lane(lane)?;
        self.target_lane = lane;
        Ok(())
    }

    /// Teleport, bypassing smoothing
    pub fn override_position(&mut self, x: f32) {
        if x.is_finite() {
            self.x = x;
            self.trail_timer = 0.0;
        }
    }

    /// Fire the queued color into `lane`. Returns the color fired.
    pub fn shoot(&mut self, lane: usize, rng: &mut impl Rng) -> SimResult<CrystalColor> {
        self.set_target_lane(lane)?;
        let color = self.next_color;
        self.spores.push(Spore {
            lane,
            pos: Vec2::new(self.lane_center(lane), self.y),
            radius: self.spore_start_radius,
            color,
            active: true,
        });
        self.next_color = CrystalColor::random(rng);
        Ok(color)
    }

    /// Glide toward the target lane and emit the trail. Returns motes emitted.
    pub fn step(&mut self, dt: f32, particles: &mut ParticleSystem) -> usize {
        let moving = self.is_moving();

        // Frame-rate independent form of `x += (target - x) * smoothing` at 60 Hz
        let k = 1.0 - (1.0 - self.smoothing).powf(dt * REFERENCE_FPS);
        self.x += (self.target_x() - self.x) * k;

        let Some(interval) = self.trail_interval.filter(|_| moving) else {
            self.trail_timer = 0.0;
            return 0;
        };

        self.trail_timer += dt;
        let mut emitted = 0;
        let color = self.next_color.color();
        while self.trail_timer >= interval {
            self.trail_timer -= interval;
            if particles.emit_soul(self.pos(), color) {
                emitted += 1;
            }
        }
        emitted
    }

    /// Expand spores and resolve the ones that reached a crystal
    pub fn step_spores(
        &mut self,
        dt: f32,
        field: &mut CrystalField,
        rng: &mut impl Rng,
    ) -> SimResult<Vec<SporeHit>> {
        let mut hits = Vec::new();

        for spore in &mut self.spores {
            if !spore.active {
                continue;
            }
            spore.radius += self.spore_expand_rate * dt;

            let top_reach = field.get(spore.lane, Side::Top)?.height;
            let bottom_reach = self.field_height - field.get(spore.lane, Side::Bottom)?.height;
            let touches = [
                (Side::Top, spore.pos.y - spore.radius < top_reach),
                (Side::Bottom, spore.pos.y + spore.radius > bottom_reach),
            ];

            for (side, touched) in touches {
                if !touched {
                    continue;
                }
                spore.active = false;

                let crystal = field.get_mut(spore.lane, side)?;
                let hit = if crystal.color == spore.color {
                    crystal.height = (crystal.height - self.match_shrink).max(self.min_crystal_height);
                    crystal.flash = 1.0;
                    crystal.color = CrystalColor::random(rng);
                    SporeHit::Match {
                        lane: spore.lane,
                        side,
                        color: spore.color,
                        point: Vec2::new(spore.pos.x, crystal.tip_y(self.field_height)),
                    }
                } else {
                    crystal.height += self.penalty_growth;
                    SporeHit::Mismatch {
                        lane: spore.lane,
                        side,
                        point: Vec2::new(spore.pos.x, crystal.tip_y(self.field_height)),
                    }
                };
                log::debug!("Spore hit: {hit:?}");
                hits.push(hit);
            }
        }

        self.spores.retain(|s| s.active);
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    const DT: f32 = 1.0 / 60.0;

    fn setup() -> (Launcher, ParticleSystem, Pcg32) {
        let tuning = Tuning::default();
        (
            Launcher::new(&tuning, Some(tuning.trail_interval), CrystalColor::Ruby),
            ParticleSystem::new(3, &tuning, 1000),
            Pcg32::seed_from_u64(3),
        )
    }

    #[test]
    fn test_starts_centered_on_middle_lane() {
        let (launcher, _, _) = setup();
        assert_eq!(launcher.target_lane(), 3);
        assert_eq!(launcher.x(), Tuning::default().lane_center(3));
        assert!(!launcher.is_moving());
    }

    #[test]
    fn test_smoothing_matches_reference_rate() {
        let (mut launcher, mut particles, _) = setup();
        launcher.override_position(0.0);
        launcher.set_target_lane(3).unwrap();
        let target = launcher.target_x();
        launcher.step(DT, &mut particles);
        // One 60 Hz frame moves exactly smoothing * distance
        assert!((launcher.x() - target * 0.2).abs() < 0.01);
    }

    #[test]
    fn test_converges_without_overshoot() {
        let (mut launcher, mut particles, _) = setup();
        launcher.set_target_lane(6).unwrap();
        let target = launcher.target_x();
        let mut last = launcher.x();
        for _ in 0..120 {
            launcher.step(DT, &mut particles);
            assert!(launcher.x() >= last);
            assert!(launcher.x() <= target + 1e-3);
            last = launcher.x();
        }
        assert!((launcher.x() - target).abs() < 0.1);
    }

    #[test]
    fn test_trail_while_moving() {
        let (mut launcher, mut particles, _) = setup();
        let tuning = Tuning::default();
        launcher.set_target_lane(0).unwrap();
        launcher.override_position(tuning.lane_center(0));
        launcher.set_target_lane(6).unwrap();

        let mut emitted = 0;
        for _ in 0..9 {
            emitted += launcher.step(DT, &mut particles);
        }
        assert!(emitted > 0);
        assert_eq!(particles.souls().len(), emitted);
    }

    #[test]
    fn test_no_trail_when_retargeting_current_lane() {
        let (mut launcher, mut particles, _) = setup();
        launcher.set_target_lane(3).unwrap();
        for _ in 0..30 {
            assert_eq!(launcher.step(DT, &mut particles), 0);
        }
        assert!(particles.is_empty());
    }

    #[test]
    fn test_disabled_trail() {
        let tuning = Tuning::default();
        let mut launcher = Launcher::new(&tuning, None, CrystalColor::Ruby);
        let mut particles = ParticleSystem::new(3, &tuning, 1000);
        launcher.set_target_lane(0).unwrap();
        for _ in 0..30 {
            launcher.step(DT, &mut particles);
        }
        assert!(particles.is_empty());
    }

    #[test]
    fn test_invalid_lane() {
        let (mut launcher, _, mut rng) = setup();
        assert!(matches!(
            launcher.set_target_lane(7),
            Err(SimError::InvalidLane { lane: 7, lanes: 7 })
        ));
        assert!(launcher.shoot(9, &mut rng).is_err());
        assert!(launcher.spores().is_empty());
        assert_eq!(launcher.target_lane(), 3);
    }

    #[test]
    fn test_shoot_queues_spore_and_rerolls() {
        let (mut launcher, _, mut rng) = setup();
        let fired = launcher.shoot(2, &mut rng).unwrap();
        assert_eq!(fired, CrystalColor::Ruby);
        assert_eq!(launcher.target_lane(), 2);
        let spore = &launcher.spores()[0];
        assert_eq!(spore.lane, 2);
        assert_eq!(spore.color, CrystalColor::Ruby);
        assert_eq!(spore.pos.y, 400.0);
    }

    fn field_with(lane_colors: (CrystalColor, CrystalColor)) -> (CrystalField, Pcg32) {
        let mut rng = Pcg32::seed_from_u64(11);
        let mut field = CrystalField::new(&Tuning::default(), &mut rng);
        let top = field.get_mut(2, Side::Top).unwrap();
        top.color = lane_colors.0;
        top.height = 200.0;
        let bottom = field.get_mut(2, Side::Bottom).unwrap();
        bottom.color = lane_colors.1;
        bottom.height = 50.0;
        (field, rng)
    }

    #[test]
    fn test_spore_match_shrinks_crystal() {
        let (mut launcher, _, _) = setup();
        let (mut field, mut rng) = field_with((CrystalColor::Ruby, CrystalColor::Amber));
        launcher.shoot(2, &mut rng).unwrap();

        let mut hits = Vec::new();
        for _ in 0..60 {
            hits.extend(launcher.step_spores(DT, &mut field, &mut rng).unwrap());
            if !hits.is_empty() {
                break;
            }
        }
        // Top tip at 200 is reached first (mid-height 400, radius 10 + 8/frame)
        assert_eq!(hits.len(), 1);
        assert!(matches!(
            hits[0],
            SporeHit::Match { lane: 2, side: Side::Top, color: CrystalColor::Ruby, .. }
        ));
        let top = field.get(2, Side::Top).unwrap();
        assert_eq!(top.height, 50.0);
        assert_eq!(top.flash, 1.0);
        assert!(launcher.spores().is_empty());
    }

    #[test]
    fn test_spore_mismatch_feeds_crystal() {
        let (mut launcher, _, _) = setup();
        let (mut field, mut rng) = field_with((CrystalColor::Emerald, CrystalColor::Amber));
        launcher.shoot(2, &mut rng).unwrap();
        let mut hits = Vec::new();
        while hits.is_empty() {
            hits = launcher.step_spores(DT, &mut field, &mut rng).unwrap();
        }
        assert!(matches!(hits[0], SporeHit::Mismatch { side: Side::Top, .. }));
        assert_eq!(field.get(2, Side::Top).unwrap().height, 240.0);
    }

    #[test]
    fn test_match_respects_min_height() {
        let (mut launcher, _, _) = setup();
        let (mut field, mut rng) = field_with((CrystalColor::Ruby, CrystalColor::Amber));
        field.get_mut(2, Side::Top).unwrap().height = 390.0;
        launcher.shoot(2, &mut rng).unwrap();
        let hits = launcher.step_spores(DT, &mut field, &mut rng).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(field.get(2, Side::Top).unwrap().height, 240.0);

        field.get_mut(2, Side::Top).unwrap().height = 100.0;
        field.get_mut(2, Side::Top).unwrap().color = CrystalColor::Ruby;
        launcher.spores.push(Spore {
            lane: 2,
            pos: Vec2::new(launcher.target_x(), 120.0),
            radius: 30.0,
            color: CrystalColor::Ruby,
            active: true,
        });
        launcher.step_spores(DT, &mut field, &mut rng).unwrap();
        assert_eq!(field.get(2, Side::Top).unwrap().height, 10.0);
    }
}
