//! Rendering data module
//!
//! Turns a simulation snapshot into packed, GPU-ready instance buffers. No
//! graphics API lives here; hosts upload the bytes with whatever they use.

pub mod instances;

pub use instances::{
    CrystalInstance, Globals, ParticleInstance, RenderFrame, SporeInstance, TextLabel, pack_color,
};
