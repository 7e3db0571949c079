//! Per-frame particle advection.
//!
//! Every particle is pushed along the curl-noise flow sampled at its current
//! position. Particles that have drifted past the containment radius, or
//! whose update produced a non-finite coordinate, are reseeded in the spawn
//! cube instead. The particle count never changes.

use glam::DVec3;

use crate::curl::CurlOperator;
use crate::field::VectorField;
use crate::particles::ParticleBuffer;

/// Scalar parameters of one advection step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowParams {
    /// World-to-noise scale applied before sampling the curl.
    pub noise_scale: f32,
    /// Multiplier on the curl vector.
    pub flow_strength: f32,
    /// Containment radius around the origin.
    pub boundary_radius: f32,
}

/// What happened during one [`advance`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdvanceReport {
    /// Particles visited. Always equals the buffer length.
    pub updated: usize,
    /// Particles reseeded because they started outside the boundary.
    pub respawned: usize,
    /// Particles reseeded because their update was not finite.
    pub degenerate: usize,
}

/// Advance every particle by one step, in slot order.
///
/// The containment test uses the position *before* the update: a particle
/// outside `boundary_radius` is reseeded and does not move this frame. A
/// particle inside is moved by `curl(p * noise_scale) * flow_strength`; if
/// that result is not finite it is reseeded instead.
pub fn advance<F: VectorField>(
    buffer: &mut ParticleBuffer,
    curl: &CurlOperator<F>,
    params: &FlowParams,
) -> AdvanceReport {
    let scale = params.noise_scale as f64;
    let strength = params.flow_strength as f64;
    let radius_sq = params.boundary_radius * params.boundary_radius;

    let mut report = AdvanceReport::default();

    for index in 0..buffer.len() {
        let p = buffer.get(index);
        report.updated += 1;

        // Non-finite length_squared also fails this test.
        if !(p.length_squared() <= radius_sq) {
            if p.is_finite() {
                report.respawned += 1;
            } else {
                report.degenerate += 1;
            }
            buffer.respawn(index);
            continue;
        }

        let flow: DVec3 = curl.curl_at(p.as_dvec3() * scale) * strength;
        let next = p + flow.as_vec3();

        if next.is_finite() {
            buffer.set(index, next);
        } else {
            report.degenerate += 1;
            buffer.respawn(index);
        }
    }

    if report.degenerate > 0 {
        log::warn!(
            "{} particle(s) produced non-finite positions and were respawned",
            report.degenerate
        );
    }
    log::trace!(
        "advanced {} particles, {} respawned",
        report.updated,
        report.respawned
    );

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::NoiseField;
    use glam::Vec3;

    fn params() -> FlowParams {
        FlowParams {
            noise_scale: 0.1,
            flow_strength: 0.003,
            boundary_radius: 48.0,
        }
    }

    #[test]
    fn test_every_particle_updated_once() {
        let curl = CurlOperator::from_seed(1);
        let mut buffer = ParticleBuffer::new(100, 12.0, 1);
        let report = advance(&mut buffer, &curl, &params());
        assert_eq!(report.updated, 100);
        assert_eq!(buffer.len(), 100);
    }

    #[test]
    fn test_moves_along_curl() {
        let curl = CurlOperator::from_seed(2);
        let start = Vec3::new(1.5, -2.0, 3.25);
        let mut buffer = ParticleBuffer::from_positions(vec![start], 12.0, 0);
        advance(&mut buffer, &curl, &params());

        let flow = curl.curl_at(start.as_dvec3() * 0.1f32 as f64) * 0.003f32 as f64;
        let expected = start + flow.as_vec3();
        assert_eq!(buffer.get(0), expected);
    }

    #[test]
    fn test_outside_boundary_respawns_without_moving() {
        let curl = CurlOperator::from_seed(3);
        let mut buffer = ParticleBuffer::from_positions(vec![Vec3::new(60.0, 0.0, 0.0)], 12.0, 4);
        let report = advance(&mut buffer, &curl, &params());
        assert_eq!(report.respawned, 1);
        assert!(buffer.get(0).abs().max_element() <= 12.0);
    }

    #[test]
    fn test_nan_position_is_contained() {
        let curl = CurlOperator::from_seed(3);
        let mut buffer = ParticleBuffer::from_positions(
            vec![Vec3::new(f32::NAN, 0.0, 0.0), Vec3::new(0.0, f32::INFINITY, 0.0)],
            12.0,
            4,
        );
        let report = advance(&mut buffer, &curl, &params());
        assert_eq!(report.degenerate, 2);
        assert!(buffer.positions().iter().all(|p| p.is_finite()));
    }

    #[test]
    fn test_non_finite_flow_respawns() {
        let blowup = CurlOperator::new(|_p: DVec3| DVec3::splat(f64::NAN));
        let mut buffer = ParticleBuffer::from_positions(vec![Vec3::new(1.0, 1.0, 1.0)], 2.0, 8);
        let report = advance(
            &mut buffer,
            &blowup,
            &FlowParams {
                noise_scale: 1.0,
                flow_strength: 1.0,
                boundary_radius: 10.0,
            },
        );
        assert_eq!(report.degenerate, 1);
        assert!(buffer.get(0).is_finite());
        assert!(buffer.get(0).abs().max_element() <= 2.0);
    }

    #[test]
    fn test_zero_strength_is_identity() {
        let curl = CurlOperator::new(NoiseField::new(6));
        let mut buffer = ParticleBuffer::new(50, 12.0, 6);
        let before = buffer.positions().to_vec();
        advance(
            &mut buffer,
            &curl,
            &FlowParams {
                flow_strength: 0.0,
                ..params()
            },
        );
        assert_eq!(buffer.positions(), &before[..]);
    }
}
