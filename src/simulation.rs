//! The simulation context.
//!
//! [`Simulation`] owns everything the visualization mutates or reads per
//! frame: the particle buffer, the curl operator over the seeded noise field,
//! the flow parameters and the render pipeline description. Nothing lives in
//! globals; the frame loop borrows the context for each callback.

use crate::advection::{advance, AdvanceReport, FlowParams};
use crate::camera::OrbitCamera;
use crate::config::SimulationConfig;
use crate::curl::CurlOperator;
use crate::error::{ConfigError, SimulationError};
use crate::frame_loop;
use crate::particles::ParticleBuffer;
use crate::render::{Frame, RenderPipeline, SoftwareRenderer};

/// A curl-noise particle simulation.
///
/// # Example
///
/// ```ignore
/// use curlflow::prelude::*;
///
/// let config = SimulationConfig::default().with_particle_count(5_000);
/// Simulation::new(config)?.run()?;
/// ```
#[derive(Debug, Clone)]
pub struct Simulation {
    config: SimulationConfig,
    particles: ParticleBuffer,
    curl: CurlOperator,
    flow: FlowParams,
    pipeline: RenderPipeline,
    frame: u64,
}

impl Simulation {
    /// Validate `config` and allocate the particle buffer.
    pub fn new(config: SimulationConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let particles = ParticleBuffer::new(
            config.particle_count as usize,
            config.spawn_half_width,
            config.seed,
        );
        let curl = CurlOperator::from_seed(config.seed);
        let flow = FlowParams {
            noise_scale: config.noise_scale,
            flow_strength: config.flow_strength,
            boundary_radius: config.boundary_radius,
        };
        let pipeline = RenderPipeline::from_config(&config);

        log::info!(
            "Simulation: {} particles, spawn half-width {}, boundary {}, seed {:#x}",
            config.particle_count,
            config.spawn_half_width,
            config.boundary_radius,
            config.seed
        );

        Ok(Self {
            config,
            particles,
            curl,
            flow,
            pipeline,
            frame: 0,
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Current particle positions.
    pub fn particles(&self) -> &ParticleBuffer {
        &self.particles
    }

    /// Mutable access to the particle slots, e.g. to place particles by hand.
    pub fn particles_mut(&mut self) -> &mut ParticleBuffer {
        &mut self.particles
    }

    pub fn curl(&self) -> &CurlOperator {
        &self.curl
    }

    pub fn flow_params(&self) -> FlowParams {
        self.flow
    }

    pub fn pipeline(&self) -> &RenderPipeline {
        &self.pipeline
    }

    /// Number of completed steps.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Advance every particle by one frame.
    pub fn step(&mut self) -> AdvanceReport {
        let report = advance(&mut self.particles, &self.curl, &self.flow);
        self.frame += 1;
        report
    }

    /// Step and render `frames` frames on the CPU, returning the last one.
    ///
    /// The camera auto-rotates exactly as it does in the window, so the
    /// result matches what the windowed run shows after the same number of
    /// frames.
    pub fn render_headless(&mut self, frames: u32, width: u32, height: u32) -> Frame {
        let mut renderer = SoftwareRenderer::new(self.pipeline, width, height);
        let mut camera = OrbitCamera::new(&self.config.camera);
        let aspect = width.max(1) as f32 / height.max(1) as f32;

        let mut frame = Frame::filled(width, height, self.pipeline.background.extend(1.0));
        for _ in 0..frames {
            self.step();
            camera.auto_rotate();
            frame = renderer.render(
                self.particles.positions(),
                camera.view_matrix(),
                camera.projection_matrix(aspect),
            );
        }
        frame
    }

    /// Open a window and run until it is closed.
    pub fn run(self) -> Result<(), SimulationError> {
        frame_loop::run(self)
    }
}
