//! Game state and inbound events
//!
//! `GameState` owns every subsystem. Hosts mutate it only through the entry
//! points below and [`GameState::step`]; rendering reads [`Snapshot`].

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::Serialize;

use super::clock::Clock;
use super::color::{Color, CrystalColor};
use super::crystal::{Crystal, CrystalField, Side};
use super::launcher::{Launcher, Spore};
use super::modifiers::FeedbackModifiers;
use super::particles::{Archetype, Particle, ParticleSystem};
use super::resonance::ResonanceEngine;
use crate::error::{SimError, SimResult};
use crate::settings::Settings;
use crate::tuning::Tuning;

/// Something the host may want to react to (sound, UI, analytics)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum GameEvent {
    Shot { lane: usize, color: CrystalColor },
    Match { lane: usize, side: Side, color: CrystalColor },
    Mismatch { lane: usize, side: Side },
    Resonance { color: CrystalColor, crystals: usize },
    LevelUp { level: u32 },
    GameOver { lane: usize, score: u64 },
}

/// Launcher fields a renderer needs
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LauncherView {
    pub x: f32,
    pub y: f32,
    pub target_lane: usize,
    pub next_color: CrystalColor,
}

/// Read-only view of one frame
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot<'a> {
    pub frame: u64,
    pub active: bool,
    pub score: u64,
    pub level: u32,
    pub lanes: usize,
    pub field_width: f32,
    pub field_height: f32,
    pub crystals: &'a [Crystal],
    pub spores: &'a [Spore],
    pub launcher: LauncherView,
    pub debris: &'a [Particle],
    pub shards: &'a [Particle],
    pub souls: &'a [Particle],
    pub shockwaves: &'a [Particle],
    pub texts: &'a [Particle],
    pub time_scale: f32,
    pub recoil_offset: Vec2,
    pub critical_intensity: f32,
    pub critical_pulse: f32,
    pub vignette_strength: f32,
    pub impact_flash: f32,
}

/// Complete simulation state for one play field
#[derive(Debug, Clone)]
pub struct GameState {
    /// Run seed for reproducibility
    pub seed: u64,
    pub(crate) tuning: Tuning,
    pub(crate) settings: Settings,
    pub(crate) clock: Clock,
    /// False once two crystals have met; cleared by `reset`
    pub(crate) active: bool,
    pub(crate) score: u64,
    pub(crate) level: u32,
    /// Steps since the round started
    pub(crate) frame: u64,
    pub(crate) field: CrystalField,
    pub(crate) resonance: ResonanceEngine,
    pub(crate) launcher: Launcher,
    /// Visual only, on its own RNG stream
    pub(crate) particles: ParticleSystem,
    pub(crate) modifiers: FeedbackModifiers,
    pub(crate) events: Vec<GameEvent>,
    /// Gameplay RNG: crystal heights and colors, spore colors
    pub(crate) rng: Pcg32,
}

/// Seconds between trail motes for the chosen quality, `None` when trails are off
fn trail_interval(tuning: &Tuning, settings: &Settings) -> Option<f32> {
    let density = settings.quality.trail_density();
    (settings.trails && density > 0.0).then(|| tuning.trail_interval / density)
}

impl GameState {
    /// Create a state with default tuning and settings
    pub fn new(seed: u64) -> Self {
        Self::build(seed, Tuning::default(), Settings::default())
    }

    /// Create a state from loaded configuration
    pub fn with_config(seed: u64, tuning: Tuning, settings: Settings) -> SimResult<Self> {
        tuning.validate()?;
        Ok(Self::build(seed, tuning, settings))
    }

    fn build(seed: u64, tuning: Tuning, settings: Settings) -> Self {
        let mut rng = Pcg32::seed_from_u64(seed);
        let field = CrystalField::new(&tuning, &mut rng);
        let next_color = CrystalColor::random(&mut rng);

        log::info!("Round started (seed {seed}, {} lanes)", tuning.lanes);

        Self {
            seed,
            clock: Clock::new(tuning.max_frame_dt),
            active: true,
            score: 0,
            level: 0,
            frame: 0,
            field,
            resonance: ResonanceEngine::new(tuning.resonance_jump, tuning.resonance_stretch),
            launcher: Launcher::new(&tuning, trail_interval(&tuning, &settings), next_color),
            particles: ParticleSystem::new(seed, &tuning, settings.max_particles()),
            modifiers: FeedbackModifiers::new(&tuning, &settings),
            events: Vec::new(),
            rng,
            tuning,
            settings,
        }
    }

    /// Start a new round on the continuing gameplay RNG stream
    pub fn reset(&mut self) {
        self.field.reset(&mut self.rng);
        let next_color = CrystalColor::random(&mut self.rng);
        self.launcher.reset(next_color);
        self.resonance.clear();
        self.particles.clear();
        self.modifiers.reset();
        self.events.clear();
        self.score = 0;
        self.level = 0;
        self.frame = 0;
        self.active = true;
        log::info!("Round started (seed {}, {} lanes)", self.seed, self.tuning.lanes);
    }

    // === Accessors ===

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn field(&self) -> &CrystalField {
        &self.field
    }

    pub fn launcher(&self) -> &Launcher {
        &self.launcher
    }

    pub fn particles(&self) -> &ParticleSystem {
        &self.particles
    }

    pub fn modifiers(&self) -> &FeedbackModifiers {
        &self.modifiers
    }

    /// Take every event queued since the last drain
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            frame: self.frame,
            active: self.active,
            score: self.score,
            level: self.level,
            lanes: self.tuning.lanes,
            field_width: self.tuning.field_width,
            field_height: self.tuning.field_height,
            crystals: self.field.crystals(),
            spores: self.launcher.spores(),
            launcher: LauncherView {
                x: self.launcher.x(),
                y: self.launcher.y(),
                target_lane: self.launcher.target_lane(),
                next_color: self.launcher.next_color(),
            },
            debris: self.particles.debris(),
            shards: self.particles.shards(),
            souls: self.particles.souls(),
            shockwaves: self.particles.shockwaves(),
            texts: self.particles.texts(),
            time_scale: self.modifiers.time_scale(),
            recoil_offset: self.modifiers.recoil_offset(),
            critical_intensity: self.modifiers.critical_intensity(),
            critical_pulse: self.modifiers.critical_pulse(),
            vignette_strength: self.modifiers.vignette_strength(),
            impact_flash: self.modifiers.impact_flash(),
        }
    }

    // === Inbound events ===

    fn check_lane(&self, lane: usize) -> SimResult<()> {
        if lane < self.tuning.lanes {
            Ok(())
        } else {
            Err(SimError::InvalidLane {
                lane,
                lanes: self.tuning.lanes,
            })
        }
    }

    /// Fire the queued color into `lane`
    pub fn shoot(&mut self, lane: usize) -> SimResult<()> {
        self.check_lane(lane)?;
        if !self.active {
            return Ok(());
        }
        let color = self.launcher.shoot(lane, &mut self.rng)?;
        self.modifiers.kick_recoil();
        self.events.push(GameEvent::Shot { lane, color });
        Ok(())
    }

    pub fn set_target_lane(&mut self, lane: usize) -> SimResult<()> {
        self.check_lane(lane)?;
        if !self.active {
            return Ok(());
        }
        self.launcher.set_target_lane(lane)
    }

    /// Queue a resonance wave for the next step
    pub fn trigger_resonance(&mut self, color: CrystalColor) {
        if self.active {
            self.resonance.trigger(color);
        }
    }

    /// Level-up celebration: slow motion and a banner
    pub fn trigger_level_up(&mut self) {
        if !self.active {
            return;
        }
        self.modifiers.trigger_level_up();
        let center = Vec2::new(self.tuning.field_width, self.tuning.field_height) / 2.0;
        let text = if self.level > 0 {
            format!("LEVEL {}", self.level)
        } else {
            "LEVEL UP".to_string()
        };
        self.create_floating_text(center, text, Color::WHITE, 1.5);
    }

    pub fn set_critical_intensity(&mut self, intensity: f32) {
        self.modifiers.set_critical_intensity(intensity);
    }

    pub fn override_launcher_position(&mut self, x: f32) {
        self.launcher.override_position(x);
    }

    /// Swap player preferences; takes effect on the next spawn or step
    pub fn apply_settings(&mut self, settings: Settings) {
        self.particles.set_cap(settings.max_particles());
        self.launcher
            .set_trail_interval(trail_interval(&self.tuning, &settings));
        self.modifiers.apply_settings(&settings);
        self.settings = settings;
    }

    // === Particle factories ===

    pub fn create_debris(&mut self, pos: Vec2, color: Color, count: usize, angle: Option<f32>) -> usize {
        self.particles.create_debris(pos, color, count, angle)
    }

    pub fn create_particles(
        &mut self,
        pos: Vec2,
        color: Color,
        count: usize,
        angle: Option<f32>,
        spread: f32,
        archetype: Archetype,
    ) -> usize {
        self.particles
            .create_particles(pos, color, count, angle, spread, archetype)
    }

    pub fn create_floating_text(
        &mut self,
        pos: Vec2,
        text: impl Into<String>,
        color: Color,
        duration: f32,
    ) -> bool {
        if !self.settings.floating_text {
            return false;
        }
        self.particles.create_floating_text(pos, text, color, duration)
    }

    pub fn create_shockwave(&mut self, pos: Vec2, color: Color) -> bool {
        self.particles.create_shockwave(pos, color)
    }
}

/// Log a failed subsystem step and carry on with the rest of the frame.
/// Invariant violations are bugs and stop debug builds.
pub(crate) fn guard<T>(subsystem: &'static str, result: SimResult<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            log::error!("{subsystem} step failed: {err}");
            debug_assert!(!err.is_invariant(), "{subsystem}: {err}");
            None
        }
    }
}
