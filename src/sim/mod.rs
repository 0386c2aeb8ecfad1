//! Deterministic simulation module
//!
//! All gameplay and effects logic lives here. This module must stay pure:
//! - Frame-driven, one `step` per animation frame
//! - Seeded RNG only (gameplay and visuals on separate streams)
//! - Stable iteration order (lane-major crystals, insertion-ordered pools)
//! - No rendering or platform dependencies

pub mod clock;
pub mod color;
pub mod crystal;
pub mod launcher;
pub mod modifiers;
pub mod particles;
pub mod resonance;
pub mod state;
pub mod tick;

pub use clock::Clock;
pub use color::{Color, CrystalColor};
pub use crystal::{Collision, Crystal, CrystalField, Side};
pub use launcher::{Launcher, Spore, SporeHit};
pub use modifiers::{Approach, FeedbackModifiers, Recovery, TimingModifier};
pub use particles::{Archetype, Particle, ParticleKind, ParticleSystem};
pub use resonance::{ResonanceEngine, ResonanceWave};
pub use state::{GameEvent, GameState, LauncherView, Snapshot};
pub use tick::{FrameInput, tick};
