//! Finite-difference curl of a vector field.
//!
//! Taking the curl of a noise potential gives an (approximately)
//! divergence-free flow, so particles swirl instead of bunching up in sinks.
//! Each evaluation costs six field samples, one pair per axis:
//!
//! ```text
//! curl.x = (∂Fz/∂y − ∂Fy/∂z)
//! curl.y = (∂Fx/∂z − ∂Fz/∂x)
//! curl.z = (∂Fy/∂x − ∂Fx/∂y)
//! ```
//!
//! with every partial taken as a central difference `(F(p+ε) − F(p−ε)) / 2ε`.
//! Truncation error is O(ε²); the result is only approximately
//! divergence-free.

use glam::DVec3;

use crate::field::{NoiseField, VectorField};

/// Finite-difference step in noise-sample space.
pub const CURL_EPSILON: f64 = 1e-4;

/// Computes the curl of a [`VectorField`] with central differences.
///
/// Holds no mutable state, so a shared reference can be used from any
/// number of call sites.
#[derive(Debug, Clone)]
pub struct CurlOperator<F = NoiseField> {
    field: F,
    epsilon: f64,
}

impl CurlOperator<NoiseField> {
    /// Curl of a seeded [`NoiseField`].
    pub fn from_seed(seed: u64) -> Self {
        Self::new(NoiseField::new(seed))
    }
}

impl<F: VectorField> CurlOperator<F> {
    /// Wrap `field` with the default step [`CURL_EPSILON`].
    pub fn new(field: F) -> Self {
        Self {
            field,
            epsilon: CURL_EPSILON,
        }
    }

    /// Wrap `field` with a custom finite-difference step.
    pub fn with_epsilon(field: F, epsilon: f64) -> Self {
        Self { field, epsilon }
    }

    /// The underlying field.
    pub fn field(&self) -> &F {
        &self.field
    }

    /// The finite-difference step.
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Approximate `∇ × F` at `(x, y, z)`.
    pub fn curl(&self, x: f64, y: f64, z: f64) -> DVec3 {
        self.curl_at(DVec3::new(x, y, z))
    }

    /// Approximate `∇ × F` at `p`.
    pub fn curl_at(&self, p: DVec3) -> DVec3 {
        let e = self.epsilon;
        let dx = central_difference(&self.field, p, DVec3::X, e);
        let dy = central_difference(&self.field, p, DVec3::Y, e);
        let dz = central_difference(&self.field, p, DVec3::Z, e);

        DVec3::new(dy.z - dz.y, dz.x - dx.z, dx.y - dy.x) / (2.0 * e)
    }
}

/// `F(p + ε·axis) − F(p − ε·axis)`, not yet divided by `2ε`.
///
/// Negating `epsilon` negates the result exactly.
#[inline]
pub fn central_difference<F: VectorField>(field: &F, p: DVec3, axis: DVec3, epsilon: f64) -> DVec3 {
    let offset = axis * epsilon;
    field.sample(p + offset) - field.sample(p - offset)
}
