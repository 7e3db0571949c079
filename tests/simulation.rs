//! Integration tests for the headless simulation and the CPU pipeline.
//!
//! Nothing here needs a window or a GPU.

use curlflow::prelude::*;
use curlflow::render::Stage;

fn config(count: u32) -> SimulationConfig {
    SimulationConfig::default()
        .with_particle_count(count)
        .with_seed(42)
}

// ============================================================================
// Buffer invariants
// ============================================================================

#[test]
fn test_count_is_constant() {
    let mut sim = Simulation::new(config(500)).unwrap();
    for _ in 0..200 {
        sim.step();
        assert_eq!(sim.particles().len(), 500);
    }
}

#[test]
fn test_positions_stay_finite() {
    // Strong flow pushes many particles through the boundary.
    let mut sim = Simulation::new(config(300).with_flow_strength(20.0)).unwrap();
    let mut respawned = 0;
    for _ in 0..100 {
        respawned += sim.step().respawned;
        assert!(sim.particles().positions().iter().all(|p| p.is_finite()));
    }
    assert!(respawned > 0);
}

#[test]
fn test_outside_particles_land_in_spawn_cube() {
    let mut sim = Simulation::new(config(200).with_boundary_radius(6.0)).unwrap();
    for _ in 0..20 {
        let before = sim.particles().positions().to_vec();
        sim.step();
        let r = sim.config().spawn_half_width;
        for (i, p) in before.iter().enumerate() {
            if p.length() > 6.0 {
                let after = sim.particles().get(i);
                assert!(after.abs().max_element() <= r, "slot {} at {:?}", i, after);
            }
        }
    }
}

#[test]
fn test_same_seed_is_deterministic() {
    let mut a = Simulation::new(config(128)).unwrap();
    let mut b = Simulation::new(config(128)).unwrap();
    for _ in 0..50 {
        assert_eq!(a.step(), b.step());
    }
    assert_eq!(a.particles().positions(), b.particles().positions());
}

#[test]
fn test_different_seeds_diverge() {
    let a = Simulation::new(config(16)).unwrap();
    let b = Simulation::new(config(16).with_seed(43)).unwrap();
    assert_ne!(a.particles().positions(), b.particles().positions());
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_single_particle_at_origin() {
    let mut sim = Simulation::new(config(1)).unwrap();
    sim.particles_mut().set(0, Vec3::ZERO);
    sim.step();

    // curl(0, 0, 0) for seed 42 is 4.1471997235 on every axis; times the
    // default strength 0.003 that is 0.0124416 once rounded to f32.
    let expected = f32::from_bits(0x3c4b_d7da);
    assert_eq!(sim.particles().get(0), Vec3::splat(expected));
}

#[test]
fn test_particle_beyond_boundary_respawns() {
    let mut sim = Simulation::new(config(1).with_boundary_radius(5.0)).unwrap();
    sim.particles_mut().set(0, Vec3::new(10.0, 0.0, 0.0));
    let report = sim.step();

    assert_eq!(report.respawned, 1);
    let r = sim.config().spawn_half_width;
    assert!(sim.particles().get(0).abs().max_element() <= r);
}

#[test]
fn test_flow_is_curl_of_noise_field() {
    // The operator wraps the same field the context was seeded with.
    let sim = Simulation::new(config(1)).unwrap();
    let standalone = CurlOperator::from_seed(42);
    let p = DVec3::new(0.3, -1.7, 2.2);
    assert_eq!(sim.curl().curl_at(p), standalone.curl_at(p));
}

// ============================================================================
// Render pipeline
// ============================================================================

fn camera_matrices(width: u32, height: u32) -> (glam::Mat4, glam::Mat4) {
    let camera = OrbitCamera::default();
    (
        camera.view_matrix(),
        camera.projection_matrix(width as f32 / height as f32),
    )
}

fn visible_pipeline() -> RenderPipeline {
    let mut pipeline = RenderPipeline::default();
    pipeline.sprite.size = 2.0;
    pipeline
}

#[test]
fn test_stage_order() {
    assert_eq!(
        RenderPipeline::default().stages(),
        &[Stage::Base, Stage::Bloom, Stage::Afterimage]
    );
}

#[test]
fn test_zero_bloom_equals_base_pass() {
    let mut pipeline = visible_pipeline();
    pipeline.bloom.strength = 0.0;
    pipeline.afterimage.damping = 0.0;

    let sim = Simulation::new(config(400)).unwrap();
    let (view, proj) = camera_matrices(96, 64);
    let mut renderer = SoftwareRenderer::new(pipeline, 96, 64);

    let base = renderer.base_pass(sim.particles().positions(), view, proj);
    let full = renderer.render(sim.particles().positions(), view, proj);
    assert!(base.max_difference(&full) < 1e-6);
}

#[test]
fn test_zero_damping_has_no_trail() {
    let mut pipeline = visible_pipeline();
    pipeline.afterimage.damping = 0.0;
    let (view, proj) = camera_matrices(96, 64);

    let mut sim = Simulation::new(config(400).with_flow_strength(0.5)).unwrap();
    let first = sim.particles().positions().to_vec();
    sim.step();
    let second = sim.particles().positions().to_vec();

    let mut trailed = SoftwareRenderer::new(pipeline, 96, 64);
    trailed.render(&first, view, proj);
    let with_history = trailed.render(&second, view, proj);

    let without_history = SoftwareRenderer::new(pipeline, 96, 64).render(&second, view, proj);
    assert!(with_history.max_difference(&without_history) < 1e-6);
}

#[test]
fn test_damping_keeps_previous_frame() {
    let mut pipeline = visible_pipeline();
    pipeline.bloom.strength = 0.0;
    pipeline.sprite.opacity = 1.0;
    let (view, proj) = camera_matrices(64, 64);

    let mut renderer = SoftwareRenderer::new(pipeline, 64, 64);
    let lit = renderer.render(&[Vec3::ZERO], view, proj);
    let after = renderer.render(&[], view, proj);

    let centre_lit = lit.get(32, 32).z;
    let centre_after = after.get(32, 32).z;
    assert!(centre_after > 0.0);
    assert!((centre_after - centre_lit * 0.86).abs() < 1e-4);
}

#[test]
fn test_headless_snapshot_is_not_black() {
    let sprite = SpriteConfig {
        size: 1.0,
        ..SpriteConfig::default()
    };
    let mut sim = Simulation::new(config(2000).with_sprite(sprite)).unwrap();
    let frame = sim.render_headless(3, 160, 90);
    let image = frame.to_rgba8();
    assert_eq!(image.dimensions(), (160, 90));
    assert!(image.pixels().any(|p| p[2] > 0));
}

#[test]
fn test_config_file_round_trip() {
    let dir = std::env::temp_dir().join(format!("curlflow-test-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("config.json");
    std::fs::write(&path, r#"{ "particle_count": 12, "afterimage": { "damping": 0.5 } }"#).unwrap();

    let config = SimulationConfig::from_file(&path).unwrap();
    assert_eq!(config.particle_count, 12);
    assert_eq!(config.afterimage.damping, 0.5);

    let sim = Simulation::new(config).unwrap();
    assert_eq!(sim.pipeline().afterimage.damping, 0.5);
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_huge_spawn_cube_fails_startup_without_panicking() {
    let result = Simulation::new(config(4).with_spawn_half_width(f32::MAX));
    assert!(matches!(
        result,
        Err(ConfigError::Invalid { field: "spawn_half_width", .. })
    ));
}

#[test]
fn test_missing_config_file_is_io_error() {
    let err = SimulationConfig::from_file("/definitely/not/here.json").unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}
