//! The per-frame stage list that turns particle positions into an image.
//!
//! A [`RenderPipeline`] is a fixed, ordered description of three stages:
//!
//! 1. [`Stage::Base`]: every particle drawn as an additively blended,
//!    camera-facing soft circle, with no depth writes.
//! 2. [`Stage::Bloom`]: bright regions extracted, blurred across a mip
//!    chain and added back over the frame.
//! 3. [`Stage::Afterimage`]: the bloomed frame merged with a decayed copy of
//!    the previous output, leaving trails.
//!
//! The order is fixed for the lifetime of the process. Both the GPU renderer
//! and the [`SoftwareRenderer`] consume the same description, and the bloom
//! kernel math below is shared between them so their output agrees.
//!
//! No stage depends on the particle count; everything after the base pass
//! works on the rasterized image.

mod frame;
mod sprite;

pub use frame::{Frame, SoftwareRenderer};
pub use sprite::SpriteTexture;

use glam::Vec3;

use crate::config::{AfterimageConfig, BloomConfig, SimulationConfig, SpriteConfig};

/// Number of mip levels in the bloom blur chain.
pub const BLOOM_MIP_COUNT: usize = 5;

/// Gaussian kernel radius (and sigma) per bloom mip level.
pub const BLOOM_KERNEL_RADII: [usize; BLOOM_MIP_COUNT] = [3, 5, 7, 9, 11];

/// Base composite weight per bloom mip level, before radius mixing.
pub const BLOOM_FACTORS: [f32; BLOOM_MIP_COUNT] = [1.0, 0.8, 0.6, 0.4, 0.2];

/// Afterimage history values at or below this are dropped instead of decayed.
pub const AFTERIMAGE_CUTOFF: f32 = 0.1;

/// Width of the soft knee above the bloom threshold.
pub const BLOOM_KNEE: f32 = 0.01;

/// One stage of the frame pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Stage {
    /// Additive sprite pass over the background color.
    Base,
    /// Bright-pass, blur and additive composite.
    Bloom,
    /// Blend with decayed history.
    Afterimage,
}

/// The fixed order in which stages run every frame.
pub const STAGE_ORDER: [Stage; 3] = [Stage::Base, Stage::Bloom, Stage::Afterimage];

/// Parameters for every stage of the frame pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderPipeline {
    /// Sprite appearance for the base pass.
    pub sprite: SpriteConfig,
    /// Clear color under the base pass.
    pub background: Vec3,
    /// Bloom stage parameters.
    pub bloom: BloomConfig,
    /// Afterimage stage parameters.
    pub afterimage: AfterimageConfig,
}

impl RenderPipeline {
    /// Build the stage parameters from a startup configuration.
    pub fn from_config(config: &SimulationConfig) -> Self {
        Self {
            sprite: config.sprite,
            background: config.background,
            bloom: config.bloom,
            afterimage: config.afterimage,
        }
    }

    /// Stages in execution order.
    pub fn stages(&self) -> &'static [Stage] {
        &STAGE_ORDER
    }

    /// Whether the bloom stage changes the image at all.
    pub fn bloom_active(&self) -> bool {
        self.bloom.strength > 0.0
    }

    /// Whether the afterimage stage keeps any history.
    pub fn afterimage_active(&self) -> bool {
        self.afterimage.damping > 0.0
    }

    /// Composite weight of each bloom mip, already scaled by strength.
    pub fn bloom_weights(&self) -> [f32; BLOOM_MIP_COUNT] {
        let mut weights = [0.0; BLOOM_MIP_COUNT];
        for (level, w) in weights.iter_mut().enumerate() {
            *w = self.bloom.strength * bloom_factor(level, self.bloom.radius);
        }
        weights
    }
}

impl Default for RenderPipeline {
    fn default() -> Self {
        Self::from_config(&SimulationConfig::default())
    }
}

/// Composite factor for a mip level: the base factor pulled toward
/// `1.2 - factor` as `radius` goes from 0 to 1.
pub fn bloom_factor(level: usize, radius: f32) -> f32 {
    let f = BLOOM_FACTORS[level];
    f + (1.2 - f - f) * radius
}

/// One-sided Gaussian weights for a blur of the given kernel radius.
///
/// Entry `0` is the centre tap and entry `i` applies to both `+i` and `-i`.
/// The weights are normalized so the full symmetric kernel sums to one.
pub fn gaussian_kernel(radius: usize) -> Vec<f32> {
    let sigma = radius as f32;
    let mut weights: Vec<f32> = (0..radius)
        .map(|i| {
            let x = i as f32;
            0.39894 * (-0.5 * x * x / (sigma * sigma)).exp() / sigma
        })
        .collect();

    let total = weights[0] + 2.0 * weights[1..].iter().sum::<f32>();
    for w in &mut weights {
        *w /= total;
    }
    weights
}

/// On-screen sprite radius in pixels.
///
/// Point-size attenuation: a sprite of `size` world units at view depth
/// `depth` covers `size * (viewport_height / 2) / depth` pixels across,
/// whatever the field of view.
#[inline]
pub fn sprite_pixel_radius(size: f32, depth: f32, viewport_height: f32) -> f32 {
    0.5 * size * viewport_height * 0.5 / depth
}

/// Rec. 709 luminance of a linear RGB color.
#[inline]
pub fn luminance(rgb: Vec3) -> f32 {
    rgb.dot(Vec3::new(0.2126, 0.7152, 0.0722))
}

/// Hermite step between `edge0` and `edge1`, matching the WGSL builtin.
#[inline]
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}
