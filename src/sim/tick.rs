//! Per-frame simulation step
//!
//! Advances every subsystem in a fixed order on the scaled delta: crystal
//! field, resonance, launcher and spores, particles. Modifiers run last on
//! the raw delta.

use glam::Vec2;

use super::color::{Color, CrystalColor};
use super::crystal::{Collision, Side};
use super::launcher::SporeHit;
use super::particles::Archetype;
use super::state::{GameEvent, GameState, guard};

/// Debris thrown off a matched crystal
const MATCH_DEBRIS: usize = 12;
/// Ash puffed off a mismatched crystal
const MISMATCH_DEBRIS: usize = 5;
/// Shards in the game-over burst
const TERMINAL_SHARDS: usize = 40;
const TERMINAL_SPREAD: f32 = 1.5;

/// Host input gathered for one frame
#[derive(Debug, Clone, Default)]
pub struct FrameInput {
    /// Lane under the pointer
    pub target_lane: Option<usize>,
    /// Fire into the target lane (or the current one)
    pub shoot: bool,
    /// Restart after game over
    pub restart: bool,
}

/// Apply one frame of input, then step the simulation
pub fn tick(state: &mut GameState, input: &FrameInput, raw_dt: f32) {
    if input.restart && !state.is_active() {
        state.reset();
    }
    if let Some(lane) = input.target_lane {
        if let Err(err) = state.set_target_lane(lane) {
            log::warn!("Ignoring input: {err}");
        }
    }
    if input.shoot {
        let lane = input
            .target_lane
            .unwrap_or_else(|| state.launcher().target_lane());
        if let Err(err) = state.shoot(lane) {
            log::warn!("Ignoring input: {err}");
        }
    }
    state.step(raw_dt);
}

impl GameState {
    /// Advance one animation frame by `raw_dt` wall-clock seconds
    pub fn step(&mut self, raw_dt: f32) {
        let raw = self.clock.sanitize(raw_dt);
        let dt = self.clock.scaled_delta(raw_dt, self.modifiers.time_scale());
        self.frame += 1;

        if self.active {
            self.step_field(dt);
        }
        if self.active {
            self.step_resonance();
            self.step_launcher(dt);
        } else {
            self.resonance.clear();
        }

        guard("particles", self.particles.step(dt));
        self.modifiers.step(raw, self.field.danger());
    }

    fn step_field(&mut self, dt: f32) {
        let multiplier = 1.0 + self.score as f32 / self.tuning.level_score_step as f32;
        guard("crystal field", self.field.advance(dt, multiplier));

        if let Some(collision) = self.field.detect_collision() {
            self.game_over(collision);
        }
    }

    fn step_resonance(&mut self) {
        for wave in self.resonance.step(&mut self.field) {
            self.events.push(GameEvent::Resonance {
                color: wave.color,
                crystals: wave.crystals,
            });
        }
    }

    fn step_launcher(&mut self, dt: f32) {
        self.launcher.step(dt, &mut self.particles);

        let hits = guard(
            "spores",
            self.launcher
                .step_spores(dt, &mut self.field, &mut self.rng),
        );
        for hit in hits.into_iter().flatten() {
            match hit {
                SporeHit::Match {
                    lane,
                    side,
                    color,
                    point,
                } => self.on_match(lane, side, color, point),
                SporeHit::Mismatch { lane, side, point } => {
                    self.particles.create_debris(
                        point,
                        Color::ASH,
                        MISMATCH_DEBRIS,
                        Some(side.outward_angle()),
                    );
                    self.events.push(GameEvent::Mismatch { lane, side });
                }
            }
        }
    }

    fn on_match(&mut self, lane: usize, side: Side, color: CrystalColor, point: Vec2) {
        self.particles
            .create_debris(point, color.color(), MATCH_DEBRIS, Some(side.outward_angle()));
        let points = self.tuning.match_score;
        self.create_floating_text(point, format!("+{points}"), color.color(), 0.8);
        self.score += points;
        self.resonance.trigger(color);
        self.modifiers.flash(self.tuning.impact_flash_match);
        self.events.push(GameEvent::Match { lane, side, color });

        let level = (self.score / self.tuning.level_score_step) as u32;
        if level > self.level {
            self.level = level;
            log::info!("Level {level} reached at score {}", self.score);
            self.events.push(GameEvent::LevelUp { level });
            self.trigger_level_up();
        }
    }

    /// Two crystals met: freeze the round and burst where they touched
    fn game_over(&mut self, collision: Collision) {
        self.active = false;
        self.resonance.clear();
        self.launcher.clear_spores();

        let Collision { lane, point, color } = collision;
        self.particles.create_particles(
            point,
            color.color(),
            TERMINAL_SHARDS,
            None,
            TERMINAL_SPREAD,
            Archetype::Shard,
        );
        self.particles.create_shockwave(point, Color::WHITE);
        self.modifiers.flash(self.tuning.impact_flash_game_over);
        self.create_floating_text(point, "GAME OVER", Color::WHITE, 2.5);

        log::info!("Game over in lane {lane} with score {}", self.score);
        self.events.push(GameEvent::GameOver {
            lane,
            score: self.score,
        });
    }
}
