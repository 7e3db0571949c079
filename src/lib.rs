//! # curlflow
//!
//! A particle cloud advected through a curl-noise flow field, rendered as
//! glowing additive sprites with bloom and afterimage trails.
//!
//! ## Quick Start
//!
//! ```ignore
//! use curlflow::prelude::*;
//!
//! fn main() -> Result<(), SimulationError> {
//!     let config = SimulationConfig::default()
//!         .with_particle_count(4_000)
//!         .with_flow_strength(0.004);
//!     Simulation::new(config)?.run()
//! }
//! ```
//!
//! ## How it moves
//!
//! A seeded 3D simplex noise is sampled three times with cyclically permuted
//! coordinates to build a vector potential ([`NoiseField`]). Its curl,
//! estimated by central differences ([`CurlOperator`]), is a nearly
//! divergence-free flow. Every frame, [`advance`] moves each particle by
//! `curl(p * noise_scale) * flow_strength`. Particles that wander past the
//! boundary radius, or whose update turns non-finite, are reseeded inside
//! the spawn cube, so the particle count never changes.
//!
//! ## How it looks
//!
//! The [`RenderPipeline`] is a fixed stage list: additive soft-circle
//! sprites, then bloom, then afterimage. The windowed host draws it with
//! wgpu; [`SoftwareRenderer`] runs the same stages on the CPU for headless
//! snapshots and tests.
//!
//! ## Headless use
//!
//! ```ignore
//! let mut sim = Simulation::new(SimulationConfig::default())?;
//! for _ in 0..600 {
//!     sim.step();
//! }
//! sim.render_headless(1, 1280, 720).save_png("flow.png")?;
//! ```

pub mod advection;
pub mod camera;
pub mod config;
pub mod curl;
mod error;
pub mod field;
mod frame_loop;
mod gpu;
pub mod noise;
pub mod particles;
pub mod render;
mod simulation;
pub mod spawn;
pub mod time;

pub use advection::{advance, AdvanceReport, FlowParams};
pub use camera::OrbitCamera;
pub use config::{AfterimageConfig, BloomConfig, CameraConfig, SimulationConfig, SpriteConfig};
pub use curl::CurlOperator;
pub use error::{ConfigError, GpuError, SimulationError};
pub use field::{NoiseField, VectorField};
pub use glam::{DVec3, Vec3, Vec4};
pub use noise::SimplexNoise;
pub use particles::ParticleBuffer;
pub use render::{Frame, RenderPipeline, SoftwareRenderer, SpriteTexture, Stage};
pub use simulation::Simulation;

/// Convenient re-exports for common usage.
///
/// ```ignore
/// use curlflow::prelude::*;
/// ```
pub mod prelude {
    pub use crate::advection::{advance, AdvanceReport, FlowParams};
    pub use crate::camera::OrbitCamera;
    pub use crate::config::{
        AfterimageConfig, BloomConfig, CameraConfig, SimulationConfig, SpriteConfig,
    };
    pub use crate::curl::CurlOperator;
    pub use crate::error::{ConfigError, GpuError, SimulationError};
    pub use crate::field::{NoiseField, VectorField};
    pub use crate::particles::ParticleBuffer;
    pub use crate::render::{Frame, RenderPipeline, SoftwareRenderer};
    pub use crate::simulation::Simulation;
    pub use crate::time::Time;
    pub use crate::{DVec3, Vec3, Vec4};
}
