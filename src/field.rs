//! Vector fields sampled by the curl operator.
//!
//! [`NoiseField`] is the field that drives the particles: three evaluations
//! of one scalar simplex noise, each with the input coordinates cyclically
//! permuted. The permutation decorrelates the components, which is what
//! gives the field a non-zero curl.

use glam::DVec3;

use crate::noise::SimplexNoise;

/// A deterministic 3D vector field.
///
/// Implementations must be pure: the same point always yields the same
/// vector, and sampling never mutates shared state.
pub trait VectorField {
    /// Sample the field at `p`.
    fn sample(&self, p: DVec3) -> DVec3;
}

impl<F> VectorField for F
where
    F: Fn(DVec3) -> DVec3,
{
    #[inline]
    fn sample(&self, p: DVec3) -> DVec3 {
        self(p)
    }
}

/// Pseudo-random vector field built from seeded simplex noise.
#[derive(Debug, Clone)]
pub struct NoiseField {
    noise: SimplexNoise,
}

impl NoiseField {
    /// Create a field whose noise permutation is derived from `seed`.
    pub fn new(seed: u64) -> Self {
        Self {
            noise: SimplexNoise::new(seed),
        }
    }

    /// Create a field around an existing noise generator.
    pub fn from_noise(noise: SimplexNoise) -> Self {
        Self { noise }
    }

    /// Sample the field at `(x, y, z)`.
    ///
    /// Components are `noise(y, z, x)`, `noise(z, x, y)` and `noise(x, y, z)`.
    /// Each lies in `[-1, 1]`.
    pub fn sample_xyz(&self, x: f64, y: f64, z: f64) -> DVec3 {
        DVec3::new(
            self.noise.noise3(y, z, x),
            self.noise.noise3(z, x, y),
            self.noise.noise3(x, y, z),
        )
    }
}

impl VectorField for NoiseField {
    #[inline]
    fn sample(&self, p: DVec3) -> DVec3 {
        self.sample_xyz(p.x, p.y, p.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_components_use_cyclic_permutation() {
        let noise = SimplexNoise::new(11);
        let field = NoiseField::from_noise(noise.clone());
        let (x, y, z) = (0.31, -1.7, 2.45);
        let v = field.sample_xyz(x, y, z);
        assert_eq!(v.x, noise.noise3(y, z, x));
        assert_eq!(v.y, noise.noise3(z, x, y));
        assert_eq!(v.z, noise.noise3(x, y, z));
    }

    #[test]
    fn test_components_are_not_copies() {
        let field = NoiseField::new(4);
        let distinct = (0..64).any(|i| {
            let t = i as f64 * 0.21 + 0.1;
            let v = field.sample_xyz(t, t * 0.5 - 1.0, 2.0 - t);
            v.x != v.y || v.y != v.z
        });
        assert!(distinct);
    }

    #[test]
    fn test_sample_is_bounded_and_finite() {
        let field = NoiseField::new(8);
        for i in 0..500 {
            let t = i as f64 * 0.137 - 30.0;
            let v = field.sample(DVec3::new(t, -t * 0.9, t * 0.4));
            assert!(v.is_finite());
            assert!(v.abs().max_element() <= 1.0);
        }
    }

    #[test]
    fn test_known_sample_for_seed_42() {
        let field = NoiseField::new(42);
        let v = field.sample_xyz(0.5, 0.25, 0.125);
        assert_eq!(v.x.to_bits(), 0x3fe1_88c2_f78d_794b);
        assert_eq!(v.y.to_bits(), 0x3fd7_2611_d3ad_5f3e);
        assert_eq!(v.z.to_bits(), 0x3fba_11c9_77e5_122a);
    }

    #[test]
    fn test_closure_field() {
        let field = |p: DVec3| p * 2.0;
        assert_eq!(field.sample(DVec3::ONE), DVec3::splat(2.0));
    }
}
