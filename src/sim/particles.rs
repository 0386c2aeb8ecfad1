//! Particle system
//!
//! Ephemeral visual entities: debris, shards, soul motes, shockwaves and
//! floating text. Particles never affect gameplay. Each archetype lives in its
//! own compacting pool and is advanced by the update function registered for
//! it in [`UPDATERS`].

use std::f32::consts::TAU;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::color::Color;
use crate::error::{SimError, SimResult};
use crate::tuning::Tuning;

/// Particle archetype discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Archetype {
    Debris,
    Shard,
    Soul,
    Shockwave,
    FloatingText,
}

impl Archetype {
    pub const ALL: [Archetype; 5] = [
        Archetype::Debris,
        Archetype::Shard,
        Archetype::Soul,
        Archetype::Shockwave,
        Archetype::FloatingText,
    ];

    pub const COUNT: usize = Self::ALL.len();

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Archetype-specific particle data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParticleKind {
    Debris,
    Shard { angle: f32, spin: f32 },
    Soul { phase: f32 },
    Shockwave { radius: f32 },
    FloatingText { text: String },
}

impl ParticleKind {
    pub fn archetype(&self) -> Archetype {
        match self {
            ParticleKind::Debris => Archetype::Debris,
            ParticleKind::Shard { .. } => Archetype::Shard,
            ParticleKind::Soul { .. } => Archetype::Soul,
            ParticleKind::Shockwave { .. } => Archetype::Shockwave,
            ParticleKind::FloatingText { .. } => Archetype::FloatingText,
        }
    }
}

/// A particle for visual effects
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Particle {
    pub pos: Vec2,
    pub vel: Vec2,
    pub color: Color,
    /// Seconds remaining; pruned at 0
    pub life: f32,
    /// Seconds at spawn
    pub max_life: f32,
    pub size: f32,
    pub kind: ParticleKind,
}

impl Particle {
    /// Remaining life fraction, doubles as opacity
    #[inline]
    pub fn alpha(&self) -> f32 {
        if self.max_life > 0.0 {
            (self.life / self.max_life).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    #[inline]
    pub fn archetype(&self) -> Archetype {
        self.kind.archetype()
    }
}

/// Spawn and force constants, copied out of [`Tuning`]
#[derive(Debug, Clone, Copy)]
pub struct ParticleParams {
    pub min_speed: f32,
    pub max_speed: f32,
    pub cone_half_angle: f32,
    pub shard_speed: f32,
    pub gravity: f32,
    pub shockwave_speed: f32,
    pub shockwave_life: f32,
}

impl From<&Tuning> for ParticleParams {
    fn from(t: &Tuning) -> Self {
        Self {
            min_speed: t.debris_min_speed.min(t.debris_max_speed),
            max_speed: t.debris_max_speed.max(t.debris_min_speed),
            cone_half_angle: t.debris_cone_half_angle,
            shard_speed: t.shard_speed,
            gravity: t.particle_gravity,
            shockwave_speed: t.shockwave_speed,
            shockwave_life: t.shockwave_life,
        }
    }
}

type UpdateFn = fn(&mut Particle, f32, &ParticleParams);

/// Per-archetype update functions, indexed by [`Archetype::index`]
const UPDATERS: [UpdateFn; Archetype::COUNT] = [
    update_debris,
    update_shard,
    update_soul,
    update_shockwave,
    update_floating_text,
];

fn update_debris(p: &mut Particle, dt: f32, params: &ParticleParams) {
    p.vel.y += params.gravity * dt;
    p.vel *= (-1.2 * dt).exp();
}

fn update_shard(p: &mut Particle, dt: f32, params: &ParticleParams) {
    p.vel.y += params.gravity * dt;
    p.vel *= (-0.8 * dt).exp();
    if let ParticleKind::Shard { angle, spin } = &mut p.kind {
        *angle = crate::normalize_angle(*angle + *spin * dt);
        *spin *= (-0.5 * dt).exp();
    }
}

fn update_soul(p: &mut Particle, dt: f32, _params: &ParticleParams) {
    if let ParticleKind::Soul { phase } = &mut p.kind {
        *phase = (*phase + dt * 6.0) % TAU;
        p.vel.x += phase.cos() * 40.0 * dt;
    }
    // Buoyant: drifts up
    p.vel.y -= 20.0 * dt;
    p.size = (p.size * (-0.6 * dt).exp()).max(0.5);
}

fn update_shockwave(p: &mut Particle, dt: f32, params: &ParticleParams) {
    let alpha = p.alpha();
    if let ParticleKind::Shockwave { radius } = &mut p.kind {
        // Slows as it fades; never shrinks
        *radius += params.shockwave_speed * alpha * dt;
    }
}

fn update_floating_text(p: &mut Particle, dt: f32, _params: &ParticleParams) {
    p.vel *= (-1.5 * dt).exp();
}

/// Owns every live particle
#[derive(Debug, Clone)]
pub struct ParticleSystem {
    pools: [Vec<Particle>; Archetype::COUNT],
    params: ParticleParams,
    /// Maximum live particles across all pools (0 disables spawning)
    cap: usize,
    /// Visual RNG stream, separate from gameplay RNG
    rng: Pcg32,
}

impl ParticleSystem {
    pub fn new(seed: u64, tuning: &Tuning, cap: usize) -> Self {
        Self {
            pools: Default::default(),
            params: ParticleParams::from(tuning),
            cap,
            rng: Pcg32::seed_from_u64(seed ^ 0x9E37_79B9_7F4A_7C15),
        }
    }

    /// Change the cap, evicting oldest-first down to it
    pub fn set_cap(&mut self, cap: usize) {
        self.cap = cap;
        while self.len() > cap {
            if !self.evict(None) {
                break;
            }
        }
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    /// Live particles of one archetype, oldest first
    pub fn pool(&self, archetype: Archetype) -> &[Particle] {
        &self.pools[archetype.index()]
    }

    pub fn debris(&self) -> &[Particle] {
        self.pool(Archetype::Debris)
    }

    pub fn shards(&self) -> &[Particle] {
        self.pool(Archetype::Shard)
    }

    pub fn souls(&self) -> &[Particle] {
        self.pool(Archetype::Soul)
    }

    pub fn shockwaves(&self) -> &[Particle] {
        self.pool(Archetype::Shockwave)
    }

    pub fn texts(&self) -> &[Particle] {
        self.pool(Archetype::FloatingText)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Particle> {
        self.pools.iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.pools.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.iter().all(Vec::is_empty)
    }

    /// Drop every particle (round reset)
    pub fn clear(&mut self) {
        for pool in &mut self.pools {
            pool.clear();
        }
    }

    /// Drop the oldest particle of `preferred`, or of the largest pool when
    /// that one is empty. Returns false when there was nothing to drop.
    fn evict(&mut self, preferred: Option<usize>) -> bool {
        let victim = match preferred {
            Some(idx) if !self.pools[idx].is_empty() => Some(idx),
            _ => (0..Archetype::COUNT).max_by_key(|&i| self.pools[i].len()),
        };
        match victim {
            Some(v) if !self.pools[v].is_empty() => {
                self.pools[v].remove(0);
                true
            }
            _ => false,
        }
    }

    /// Insert respecting the cap, evicting oldest-first to make room
    fn push(&mut self, particle: Particle) -> bool {
        if self.cap == 0 {
            return false;
        }
        let idx = particle.archetype().index();
        while self.len() >= self.cap {
            if !self.evict(Some(idx)) {
                break;
            }
        }
        self.pools[idx].push(particle);
        true
    }

    /// Spray of debris. `angle: None` is omnidirectional, `Some(a)` a cone around `a`.
    pub fn create_debris(&mut self, pos: Vec2, color: Color, count: usize, angle: Option<f32>) -> usize {
        self.create_particles(pos, color, count, angle, 1.0, Archetype::Debris)
    }

    /// Generalized spawner.
    ///
    /// - `angle: Some(a)`: directional cone of half-width `spread * cone_half_angle` around `a`
    /// - `angle: None` with [`Archetype::Shard`]: shatter burst, `spread` scales burst force
    /// - `angle: None` otherwise: omnidirectional, `spread` scales speed
    ///
    /// Shockwaves ignore direction. Floating text needs a payload, so it is
    /// only created through [`Self::create_floating_text`]. Returns the
    /// number of particles spawned.
    pub fn create_particles(
        &mut self,
        pos: Vec2,
        color: Color,
        count: usize,
        angle: Option<f32>,
        spread: f32,
        archetype: Archetype,
    ) -> usize {
        let spread = if spread.is_finite() { spread.max(0.0) } else { 1.0 };
        let mut spawned = 0;

        for _ in 0..count {
            let particle = match archetype {
                Archetype::Debris => {
                    let vel = match angle {
                        Some(a) => self.cone_velocity(a, spread),
                        None => self.omni_velocity(spread),
                    };
                    Particle {
                        pos,
                        vel,
                        color,
                        life: self.rng.random_range(0.8..=1.2),
                        max_life: 0.0,
                        size: self.rng.random_range(1.0..=5.0),
                        kind: ParticleKind::Debris,
                    }
                }
                Archetype::Shard => {
                    let vel = match angle {
                        Some(a) => self.cone_velocity(a, spread),
                        None => self.shatter_velocity(spread),
                    };
                    Particle {
                        pos,
                        vel,
                        color,
                        life: self.rng.random_range(1.0..=1.6),
                        max_life: 0.0,
                        size: self.rng.random_range(3.0..=8.0),
                        kind: ParticleKind::Shard {
                            angle: self.rng.random::<f32>() * TAU,
                            spin: self.rng.random_range(-12.0..=12.0),
                        },
                    }
                }
                Archetype::Soul => {
                    let vel = match angle {
                        Some(a) => self.cone_velocity(a, spread) * 0.3,
                        None => self.omni_velocity(spread) * 0.3,
                    };
                    self.soul(pos, vel, color)
                }
                Archetype::Shockwave => self.shockwave(pos, color),
                Archetype::FloatingText => {
                    log::debug!("create_particles ignores floating text (no payload)");
                    return spawned;
                }
            };
            if self.push(finalize(particle)) {
                spawned += 1;
            }
        }
        spawned
    }

    /// Single text particle that rises and fades over `duration` seconds
    pub fn create_floating_text(
        &mut self,
        pos: Vec2,
        text: impl Into<String>,
        color: Color,
        duration: f32,
    ) -> bool {
        if !(duration.is_finite() && duration > 0.0) {
            return false;
        }
        self.push(finalize(Particle {
            pos,
            vel: Vec2::new(0.0, -60.0),
            color,
            life: duration,
            max_life: 0.0,
            size: 1.0,
            kind: ParticleKind::FloatingText { text: text.into() },
        }))
    }

    /// Expanding ring that fades as it grows
    pub fn create_shockwave(&mut self, pos: Vec2, color: Color) -> bool {
        let particle = self.shockwave(pos, color);
        self.push(finalize(particle))
    }

    /// Small buoyant mote (launcher trail, sparkles)
    pub fn emit_soul(&mut self, pos: Vec2, color: Color) -> bool {
        let vel = Vec2::new(
            self.rng.random_range(-20.0..=20.0),
            -self.rng.random_range(30.0f32..=70.0),
        );
        let particle = self.soul(pos, vel, color);
        self.push(finalize(particle))
    }

    /// Advance every particle and prune the dead
    pub fn step(&mut self, dt: f32) -> SimResult<()> {
        let params = self.params;
        let mut corrupt = None;

        for (archetype, pool) in Archetype::ALL.into_iter().zip(self.pools.iter_mut()) {
            let update = UPDATERS[archetype.index()];
            for p in pool.iter_mut() {
                update(p, dt, &params);
                p.pos += p.vel * dt;
                p.life -= dt;
            }
            pool.retain(|p| {
                let finite = p.pos.is_finite() && p.vel.is_finite();
                if !finite {
                    corrupt = Some(p.pos.x);
                }
                finite && p.life > 0.0
            });
        }

        match corrupt {
            Some(value) => Err(SimError::InvariantViolation {
                what: "particle position",
                value,
            }),
            None => Ok(()),
        }
    }

    fn omni_velocity(&mut self, spread: f32) -> Vec2 {
        let theta = self.rng.random::<f32>() * TAU;
        let speed = self.rng.random_range(self.params.min_speed..=self.params.max_speed);
        Vec2::from_angle(theta) * speed * spread
    }

    fn cone_velocity(&mut self, angle: f32, spread: f32) -> Vec2 {
        let half = (self.params.cone_half_angle * spread).abs();
        let theta = angle + self.rng.random_range(-half..=half);
        let speed = self.rng.random_range(self.params.min_speed..=self.params.max_speed);
        Vec2::from_angle(theta) * speed
    }

    /// Skewed toward slow fragments with a fast tail, plus an upward kick
    fn shatter_velocity(&mut self, spread: f32) -> Vec2 {
        let theta = self.rng.random::<f32>() * TAU;
        let u: f32 = self.rng.random();
        let speed = self.params.shard_speed * spread * (0.3 + 1.7 * u * u);
        let kick = Vec2::new(0.0, -0.25 * self.params.shard_speed * spread);
        Vec2::from_angle(theta) * speed + kick
    }

    fn soul(&mut self, pos: Vec2, vel: Vec2, color: Color) -> Particle {
        Particle {
            pos,
            vel,
            color,
            life: self.rng.random_range(0.6..=1.0),
            max_life: 0.0,
            size: self.rng.random_range(2.0..=4.0),
            kind: ParticleKind::Soul {
                phase: self.rng.random::<f32>() * TAU,
            },
        }
    }

    fn shockwave(&self, pos: Vec2, color: Color) -> Particle {
        Particle {
            pos,
            vel: Vec2::ZERO,
            color,
            life: self.params.shockwave_life,
            max_life: 0.0,
            size: 3.0,
            kind: ParticleKind::Shockwave { radius: 0.0 },
        }
    }
}

fn finalize(mut p: Particle) -> Particle {
    p.max_life = p.life;
    p
}
