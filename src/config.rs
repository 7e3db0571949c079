//! Startup configuration.
//!
//! Every tunable of the visualization lives in [`SimulationConfig`]. It is
//! fixed once the frame loop starts; there is no live reconfiguration.
//!
//! # Example
//!
//! ```ignore
//! let config = SimulationConfig::default()
//!     .with_particle_count(5_000)
//!     .with_flow_strength(0.004);
//! config.validate()?;
//! ```
//!
//! A JSON file may override any subset of fields; missing fields keep their
//! defaults:
//!
//! ```json
//! { "particle_count": 8000, "bloom": { "strength": 1.2 } }
//! ```

use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Bloom stage parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BloomConfig {
    /// Multiplier on the blurred bright image added back over the frame.
    /// `0.0` disables the visible effect.
    pub strength: f32,
    /// Blur spread in `[0, 1]`. Higher values weight the wider mip levels.
    pub radius: f32,
    /// Luminance above which pixels contribute to the bloom.
    pub threshold: f32,
}

impl Default for BloomConfig {
    fn default() -> Self {
        Self {
            strength: 1.8,
            radius: 0.8,
            threshold: 0.0,
        }
    }
}

/// Afterimage (trail) stage parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AfterimageConfig {
    /// Per-frame decay of the accumulated history, in `[0, 1)`.
    /// `0.0` disables trails.
    pub damping: f32,
}

impl Default for AfterimageConfig {
    fn default() -> Self {
        Self { damping: 0.86 }
    }
}

/// Appearance of each particle sprite in the base pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpriteConfig {
    /// Point size in world units; covers `size * (h / 2) / depth` pixels.
    pub size: f32,
    /// Linear RGB tint.
    pub color: Vec3,
    /// Constant opacity applied on top of the soft-edge falloff.
    pub opacity: f32,
    /// Edge length in pixels of the generated soft-circle texture.
    pub texture_size: u32,
}

impl Default for SpriteConfig {
    fn default() -> Self {
        Self {
            size: 0.12,
            color: hex_color(0x66ccff),
            opacity: 0.85,
            texture_size: 64,
        }
    }
}

/// Initial camera placement and behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Vertical field of view in degrees.
    pub fov_degrees: f32,
    /// Starting distance from the origin.
    pub distance: f32,
    /// Auto-orbit speed; `1.0` is one revolution per minute at 60 fps.
    pub auto_rotate_speed: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 75.0,
            distance: 20.0,
            auto_rotate_speed: 0.8,
        }
    }
}

/// Complete configuration surface of the visualization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of particles. Constant for the process lifetime.
    pub particle_count: u32,
    /// Half-width of the spawn cube; particles (re)spawn in `[-R, R]^3`.
    pub spawn_half_width: f32,
    /// Maps world coordinates into noise-sample space.
    pub noise_scale: f32,
    /// Multiplier applied to the curl vector before it is added to a position.
    pub flow_strength: f32,
    /// Particles farther than this from the origin are respawned.
    pub boundary_radius: f32,
    /// Seed for the noise permutation and the spawn RNG.
    pub seed: u64,
    /// Bloom stage parameters.
    pub bloom: BloomConfig,
    /// Afterimage stage parameters.
    pub afterimage: AfterimageConfig,
    /// Particle sprite appearance.
    pub sprite: SpriteConfig,
    /// Camera defaults for the windowed host.
    pub camera: CameraConfig,
    /// Clear color behind the particles.
    pub background: Vec3,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        let spawn_half_width = 12.0;
        Self {
            particle_count: 2400,
            spawn_half_width,
            noise_scale: 0.1,
            flow_strength: 0.003,
            // Twice the full width of the spawn cube.
            boundary_radius: 4.0 * spawn_half_width,
            seed: 0x5EED,
            bloom: BloomConfig::default(),
            afterimage: AfterimageConfig::default(),
            sprite: SpriteConfig::default(),
            camera: CameraConfig::default(),
            background: Vec3::ZERO,
        }
    }
}

impl SimulationConfig {
    /// Parse a configuration from JSON. Missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Set the number of particles.
    pub fn with_particle_count(mut self, count: u32) -> Self {
        self.particle_count = count;
        self
    }

    /// Set the spawn cube half-width.
    pub fn with_spawn_half_width(mut self, half_width: f32) -> Self {
        self.spawn_half_width = half_width;
        self
    }

    /// Set the world-to-noise scale factor.
    pub fn with_noise_scale(mut self, scale: f32) -> Self {
        self.noise_scale = scale;
        self
    }

    /// Set the flow strength.
    pub fn with_flow_strength(mut self, strength: f32) -> Self {
        self.flow_strength = strength;
        self
    }

    /// Set the containment radius.
    pub fn with_boundary_radius(mut self, radius: f32) -> Self {
        self.boundary_radius = radius;
        self
    }

    /// Set the seed for noise and spawning.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the bloom parameters.
    pub fn with_bloom(mut self, bloom: BloomConfig) -> Self {
        self.bloom = bloom;
        self
    }

    /// Set the afterimage damping factor.
    pub fn with_afterimage_damping(mut self, damping: f32) -> Self {
        self.afterimage.damping = damping;
        self
    }

    /// Set the sprite appearance.
    pub fn with_sprite(mut self, sprite: SpriteConfig) -> Self {
        self.sprite = sprite;
        self
    }

    /// Check every parameter against its allowed range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn check(ok: bool, field: &'static str, reason: &'static str) -> Result<(), ConfigError> {
            if ok {
                Ok(())
            } else {
                Err(ConfigError::Invalid { field, reason })
            }
        }

        check(self.particle_count >= 1, "particle_count", "must be at least 1")?;
        check(
            self.spawn_half_width.is_finite() && self.spawn_half_width > 0.0,
            "spawn_half_width",
            "must be finite and positive",
        )?;
        // Spawn draws span 2R and the sampler scales that span up slightly.
        check(
            (4.0 * self.spawn_half_width).is_finite(),
            "spawn_half_width",
            "is too large",
        )?;
        check(self.noise_scale.is_finite(), "noise_scale", "must be finite")?;
        check(self.flow_strength.is_finite(), "flow_strength", "must be finite")?;
        check(
            self.boundary_radius.is_finite() && self.boundary_radius > 0.0,
            "boundary_radius",
            "must be finite and positive",
        )?;

        let bloom = &self.bloom;
        check(
            bloom.strength.is_finite() && bloom.strength >= 0.0,
            "bloom.strength",
            "must be finite and non-negative",
        )?;
        check(
            (0.0..=1.0).contains(&bloom.radius),
            "bloom.radius",
            "must be within [0, 1]",
        )?;
        check(
            bloom.threshold.is_finite() && bloom.threshold >= 0.0,
            "bloom.threshold",
            "must be finite and non-negative",
        )?;
        check(
            (0.0..1.0).contains(&self.afterimage.damping),
            "afterimage.damping",
            "must be within [0, 1)",
        )?;

        let sprite = &self.sprite;
        check(
            sprite.size.is_finite() && sprite.size > 0.0,
            "sprite.size",
            "must be finite and positive",
        )?;
        check(
            (0.0..=1.0).contains(&sprite.opacity),
            "sprite.opacity",
            "must be within [0, 1]",
        )?;
        check(sprite.color.is_finite(), "sprite.color", "must be finite")?;
        check(sprite.texture_size >= 2, "sprite.texture_size", "must be at least 2")?;

        let camera = &self.camera;
        check(
            camera.fov_degrees > 0.0 && camera.fov_degrees < 180.0,
            "camera.fov_degrees",
            "must be within (0, 180)",
        )?;
        check(
            camera.distance.is_finite() && camera.distance > 0.0,
            "camera.distance",
            "must be finite and positive",
        )?;
        check(
            camera.auto_rotate_speed.is_finite(),
            "camera.auto_rotate_speed",
            "must be finite",
        )?;
        check(self.background.is_finite(), "background", "must be finite")?;

        Ok(())
    }
}

/// Convert a `0xRRGGBB` literal to RGB components in `[0, 1]`.
pub fn hex_color(hex: u32) -> Vec3 {
    Vec3::new(
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = SimulationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.particle_count, 2400);
        assert_eq!(config.boundary_radius, 48.0);
        assert_eq!(config.afterimage.damping, 0.86);
    }

    #[test]
    fn test_hex_color() {
        let c = hex_color(0x66ccff);
        assert!((c.x - 0.4).abs() < 1e-6);
        assert!((c.y - 0.8).abs() < 1e-6);
        assert_eq!(c.z, 1.0);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config =
            SimulationConfig::from_json_str(r#"{ "particle_count": 10, "bloom": { "strength": 0.5 } }"#)
                .unwrap();
        assert_eq!(config.particle_count, 10);
        assert_eq!(config.bloom.strength, 0.5);
        assert_eq!(config.bloom.radius, 0.8);
        assert_eq!(config.noise_scale, 0.1);
    }

    #[test]
    fn test_json_round_trip() {
        let config = SimulationConfig::default().with_seed(7).with_particle_count(3);
        let json = serde_json::to_string(&config).unwrap();
        let back = SimulationConfig::from_json_str(&json).unwrap();
        assert_eq!(config, back);
    }

    #[test]
    fn test_rejects_zero_particles() {
        let err = SimulationConfig::default()
            .with_particle_count(0)
            .validate()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "particle_count", .. }));
    }

    #[test]
    fn test_rejects_damping_of_one() {
        let err = SimulationConfig::default()
            .with_afterimage_damping(1.0)
            .validate()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "afterimage.damping", .. }));
    }

    #[test]
    fn test_rejects_nan_flow_strength() {
        let err = SimulationConfig::default()
            .with_flow_strength(f32::NAN)
            .validate()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "flow_strength", .. }));
    }

    #[test]
    fn test_rejects_overflowing_spawn_half_width() {
        let err = SimulationConfig::default()
            .with_spawn_half_width(f32::MAX)
            .validate()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "spawn_half_width", .. }));

        let large = SimulationConfig::default().with_spawn_half_width(f32::MAX / 4.0);
        assert!(large.validate().is_ok());
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let err = SimulationConfig::from_json_str("{ particle_count: }").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
