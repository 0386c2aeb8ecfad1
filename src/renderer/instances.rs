//! GPU instance data built from a simulation snapshot
//!
//! Layouts are `#[repr(C)]` and padded to 16 bytes so they can be uploaded
//! as storage buffers unchanged. Floating text cannot be drawn by a shader
//! and is handed to the host as [`TextLabel`]s instead.

use bytemuck::{Pod, Zeroable};

use crate::sim::color::Color;
use crate::sim::crystal::Side;
use crate::sim::particles::{Particle, ParticleKind};
use crate::sim::state::Snapshot;

/// Maximum crystals uploaded per frame
pub const MAX_CRYSTALS: usize = 64;
/// Maximum particles uploaded per frame (High preset cap fits)
pub const MAX_PARTICLES: usize = 4096;
/// Maximum spores uploaded per frame
pub const MAX_SPORES: usize = 64;

/// Share of a lane a crystal occupies at rest
const CRYSTAL_WIDTH_RATIO: f32 = 0.6;

// ============================================================================
// GPU DATA STRUCTURES (must match shader)
// ============================================================================

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Globals {
    pub resolution: [f32; 2],    // offset 0
    pub time: f32,               // offset 8
    pub time_scale: f32,         // offset 12
    pub camera_offset: [f32; 2], // offset 16 - recoil
    pub vignette: f32,           // offset 24
    pub pulse: f32,              // offset 28
    pub crystal_count: u32,      // offset 32
    pub particle_count: u32,     // offset 36
    pub spore_count: u32,        // offset 40
    pub active: u32,             // offset 44 - 0 after game over
    pub impact_flash: f32,       // offset 48 - white overlay, drawn unshaken
    pub _pad: [u32; 3],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct CrystalInstance {
    /// Center of the edge the crystal grows from
    pub base: [f32; 2],
    pub height: f32,
    /// Breathing width in pixels
    pub width: f32,
    pub scale_y: f32,
    pub flash: f32,
    pub color: u32,
    /// 0 = hangs from the top, 1 = rises from the bottom
    pub side: u32,
    pub shape_seed: f32,
    pub _pad: [u32; 3],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct ParticleInstance {
    pub pos: [f32; 2],
    pub vel: [f32; 2], // For motion blur/stretching
    pub size: f32,
    pub alpha: f32,
    pub color: u32,
    /// Archetype index
    pub kind: u32,
    /// Shard angle or shockwave radius
    pub param: f32,
    pub _pad: [u32; 3],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct SporeInstance {
    pub pos: [f32; 2],
    pub radius: f32,
    pub color: u32,
}

/// Floating text for the host's text layer
#[derive(Debug, Clone, PartialEq)]
pub struct TextLabel {
    pub pos: [f32; 2],
    pub text: String,
    pub color: [f32; 4],
}

/// Pack a color as RGBA8, red in the low byte
pub fn pack_color(color: Color) -> u32 {
    let byte = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u32;
    byte(color.r) | byte(color.g) << 8 | byte(color.b) << 16 | byte(color.a) << 24
}

fn particle_instance(p: &Particle) -> Option<ParticleInstance> {
    let param = match &p.kind {
        ParticleKind::Shard { angle, .. } => *angle,
        ParticleKind::Shockwave { radius } => *radius,
        ParticleKind::Debris | ParticleKind::Soul { .. } => 0.0,
        ParticleKind::FloatingText { .. } => return None,
    };
    Some(ParticleInstance {
        pos: p.pos.to_array(),
        vel: p.vel.to_array(),
        size: p.size,
        alpha: p.alpha(),
        color: pack_color(p.color),
        kind: p.archetype().index() as u32,
        param,
        _pad: [0; 3],
    })
}

/// Everything a renderer uploads for one frame
#[derive(Debug, Clone, Default)]
pub struct RenderFrame {
    pub globals: Globals,
    pub crystals: Vec<CrystalInstance>,
    pub particles: Vec<ParticleInstance>,
    pub spores: Vec<SporeInstance>,
    pub labels: Vec<TextLabel>,
}

impl RenderFrame {
    /// Build instance arrays for a `resolution` sized surface at `time` seconds
    pub fn from_snapshot(snapshot: &Snapshot<'_>, resolution: [f32; 2], time: f32) -> Self {
        let lane_width = snapshot.field_width / snapshot.lanes.max(1) as f32;

        let crystals: Vec<CrystalInstance> = snapshot
            .crystals
            .iter()
            .take(MAX_CRYSTALS)
            .map(|c| {
                let x = c.lane as f32 * lane_width + lane_width / 2.0;
                CrystalInstance {
                    base: [x, c.base_y(snapshot.field_height)],
                    height: c.height,
                    width: lane_width * CRYSTAL_WIDTH_RATIO * c.scale_x,
                    scale_y: c.scale_y,
                    flash: c.flash,
                    color: pack_color(c.color.color()),
                    side: match c.side {
                        Side::Top => 0,
                        Side::Bottom => 1,
                    },
                    shape_seed: c.shape_seed,
                    _pad: [0; 3],
                }
            })
            .collect();

        // Shockwaves under debris under shards under souls
        let particles: Vec<ParticleInstance> = [
            snapshot.shockwaves,
            snapshot.debris,
            snapshot.shards,
            snapshot.souls,
        ]
        .into_iter()
        .flatten()
        .filter_map(particle_instance)
        .take(MAX_PARTICLES)
        .collect();

        let spores: Vec<SporeInstance> = snapshot
            .spores
            .iter()
            .filter(|s| s.active)
            .take(MAX_SPORES)
            .map(|s| SporeInstance {
                pos: s.pos.to_array(),
                radius: s.radius,
                color: pack_color(s.color.color()),
            })
            .collect();

        let labels = snapshot
            .texts
            .iter()
            .filter_map(|p| match &p.kind {
                ParticleKind::FloatingText { text } => Some(TextLabel {
                    pos: p.pos.to_array(),
                    text: text.clone(),
                    color: p.color.with_alpha(p.color.a * p.alpha()).to_array(),
                }),
                _ => None,
            })
            .collect();

        let globals = Globals {
            resolution,
            time,
            time_scale: snapshot.time_scale,
            camera_offset: snapshot.recoil_offset.to_array(),
            vignette: snapshot.vignette_strength,
            pulse: snapshot.critical_pulse,
            crystal_count: crystals.len() as u32,
            particle_count: particles.len() as u32,
            spore_count: spores.len() as u32,
            active: snapshot.active as u32,
            impact_flash: snapshot.impact_flash,
            _pad: [0; 3],
        };

        Self {
            globals,
            crystals,
            particles,
            spores,
            labels,
        }
    }

    pub fn globals_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(&self.globals)
    }

    pub fn crystal_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.crystals)
    }

    pub fn particle_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.particles)
    }

    pub fn spore_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.spores)
    }
}
