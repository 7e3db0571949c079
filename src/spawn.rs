//! Spawn positions for particles.
//!
//! Particles are placed uniformly in an axis-aligned cube centred on the
//! origin. Each coordinate is an independent draw, so the corners are as
//! densely populated as the middle; this is the visual "spawn cube".

use glam::Vec3;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Seeded sampler for positions inside `[-half_width, half_width]^3`.
#[derive(Debug, Clone)]
pub struct SpawnCube {
    half_width: f32,
    rng: SmallRng,
}

impl SpawnCube {
    /// Create a sampler for the cube of the given half-width.
    ///
    /// The same `seed` always yields the same sequence of positions.
    pub fn new(half_width: f32, seed: u64) -> Self {
        Self {
            half_width,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Half-width of the cube.
    #[inline]
    pub fn half_width(&self) -> f32 {
        self.half_width
    }

    /// Draw one position, three independent uniform coordinates.
    pub fn sample(&mut self) -> Vec3 {
        let r = self.half_width;
        Vec3::new(
            self.rng.gen_range(-r..=r),
            self.rng.gen_range(-r..=r),
            self.rng.gen_range(-r..=r),
        )
    }

    /// Whether `p` lies inside the (closed) cube.
    #[inline]
    pub fn contains(&self, p: Vec3) -> bool {
        p.abs().max_element() <= self.half_width
    }
}
