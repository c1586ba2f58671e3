//! GPU simulation tests
//!
//! Each test requests a headless adapter and returns early when none is
//! available, so the suite still passes on machines without a GPU.
//!
//! Run with: cargo test -p fluid-simulation --test gpu_simulation -- --nocapture

use fluid_physics::kernels;
use fluid_physics::{
    seed_lattice, CanvasRect, CursorInput, LayoutError, ParamSchema, Particle, ParticleStats,
    SeedBox, SeedError, SimParams, CURSOR_OFFSET_FLOATS,
};
use fluid_simulation::{
    CancellationToken, ComputeSchedule, FluidSimulation, FrameLoop, GpuContext, ParameterBlock,
    ParticleStore, SimulationConfig, SimulationError,
};
use glam::Vec2;

fn test_gpu() -> Option<GpuContext> {
    let _ = env_logger::builder().is_test(true).try_init();
    match GpuContext::new_blocking(wgpu::Backends::all()) {
        Ok(gpu) => Some(gpu),
        Err(err) => {
            eprintln!("Skipping GPU test: {err}");
            None
        }
    }
}

fn test_sim(gpu: GpuContext, particle_count: u32) -> FluidSimulation {
    let config = SimulationConfig::default().with_particle_count(particle_count);
    pollster::block_on(FluidSimulation::new(gpu, config, SimParams::default()))
        .expect("simulation should start")
}

fn canvas() -> CanvasRect {
    CanvasRect::new(0.0, 0.0, 800.0, 600.0)
}

#[test]
fn test_store_rejects_zero_particles() {
    let Some(gpu) = test_gpu() else { return };
    let result = ParticleStore::allocate(&gpu, 0);
    assert!(matches!(
        result,
        Err(SimulationError::Seed(SeedError::EmptyParticleCount))
    ));
}

#[test]
fn test_simulation_rejects_zero_particles() {
    let Some(gpu) = test_gpu() else { return };
    let config = SimulationConfig::default().with_particle_count(0);
    let result = pollster::block_on(FluidSimulation::new(gpu, config, SimParams::default()));
    assert!(matches!(
        result,
        Err(SimulationError::Seed(SeedError::EmptyParticleCount))
    ));
}

#[test]
fn test_seeded_store_reads_back_lattice() {
    let Some(gpu) = test_gpu() else { return };
    let store = ParticleStore::allocate(&gpu, 1000).unwrap();
    assert_eq!(store.float_count(), 8000);
    assert_eq!(store.byte_size(), 32_000);

    store.seed(&gpu.queue, &SeedBox::default()).unwrap();
    let particles = pollster::block_on(store.read_back(&gpu)).unwrap();
    assert_eq!(particles, seed_lattice(1000, &SeedBox::default()).unwrap());
}

#[test]
fn test_store_write_checks_count() {
    let Some(gpu) = test_gpu() else { return };
    let store = ParticleStore::allocate(&gpu, 16).unwrap();
    let result = store.write(&gpu.queue, &[Particle::default(); 15]);
    assert!(matches!(
        result,
        Err(SimulationError::ParticleCountMismatch {
            expected: 16,
            actual: 15
        })
    ));
}

#[test]
fn test_block_upload_checks_layout() {
    let Some(gpu) = test_gpu() else { return };
    let block = ParameterBlock::allocate(&gpu, ParamSchema::WithCursor);
    assert_eq!(block.byte_size(), 112);

    // Core-sized data into a cursor-sized block
    let core = SimParams::default().encode(ParamSchema::Core);
    assert!(matches!(
        block.upload(&gpu.queue, &core, 0),
        Err(SimulationError::Layout(LayoutError::SizeMismatch { .. }))
    ));

    // Misaligned and overflowing partial writes
    assert!(matches!(
        block.upload(&gpu.queue, &[1.0], 2),
        Err(SimulationError::Layout(LayoutError::OutOfRange { .. }))
    ));
    assert!(matches!(
        block.upload(&gpu.queue, &[1.0; 8], 96),
        Err(SimulationError::Layout(LayoutError::OutOfRange { .. }))
    ));

    let core_block = ParameterBlock::allocate(&gpu, ParamSchema::Core);
    let cursor = fluid_physics::CursorState::inactive(0.8);
    assert!(matches!(
        core_block.upload_cursor(&gpu.queue, &cursor),
        Err(SimulationError::Layout(LayoutError::NoCursorExtension(
            ParamSchema::Core
        )))
    ));
}

#[test]
fn test_block_upload_round_trips() {
    let Some(gpu) = test_gpu() else { return };
    let block = ParameterBlock::allocate(&gpu, ParamSchema::WithCursor);
    let params = SimParams {
        gravity: 3.5,
        viscosity: 42.0,
        ..SimParams::default()
    };
    block.upload_params(&gpu.queue, &params).unwrap();

    let floats = pollster::block_on(block.read_back(&gpu)).unwrap();
    let (decoded, schema) = SimParams::decode(&floats).unwrap();
    assert_eq!(schema, ParamSchema::WithCursor);
    assert_eq!(decoded, params);
}

#[test]
fn test_bind_rejects_core_schema() {
    let Some(gpu) = test_gpu() else { return };
    let schedule = ComputeSchedule::create_pipelines(&gpu.device, 64).unwrap();
    let store = ParticleStore::allocate(&gpu, 64).unwrap();
    let block = ParameterBlock::allocate(&gpu, ParamSchema::Core);

    let result = schedule.bind(&gpu.device, &store, &block);
    assert!(matches!(
        result,
        Err(SimulationError::SchemaMismatch {
            expected: ParamSchema::WithCursor,
            actual: ParamSchema::Core,
        })
    ));
}

#[test]
fn test_zero_workgroup_size_rejected() {
    let Some(gpu) = test_gpu() else { return };
    let mut config = SimulationConfig::default().with_particle_count(64);
    config.workgroup_size = 0;
    let result = pollster::block_on(FluidSimulation::new(gpu, config, SimParams::default()));
    assert!(matches!(result, Err(SimulationError::ZeroWorkgroupSize)));
}

#[test]
fn test_oversized_workgroup_rejected() {
    let Some(gpu) = test_gpu() else { return };
    let mut config = SimulationConfig::default().with_particle_count(64);
    config.workgroup_size = 4096;
    let result = pollster::block_on(FluidSimulation::new(gpu, config, SimParams::default()));
    assert!(matches!(
        result,
        Err(SimulationError::WorkgroupTooLarge { size: 4096, .. })
    ));
}

#[test]
fn test_dispatch_over_limit_rejected() {
    let Some(gpu) = test_gpu() else { return };
    let limit = gpu.device.limits().max_compute_workgroups_per_dimension;
    let mut config = SimulationConfig::default().with_particle_count(limit + 1);
    config.workgroup_size = 1;
    let result = pollster::block_on(FluidSimulation::new(gpu, config, SimParams::default()));
    assert!(matches!(
        result,
        Err(SimulationError::DispatchTooLarge { workgroups, .. }) if workgroups == limit + 1
    ));
}

/// Every particle sees at least its own contribution, and the forces pass
/// acts on the density it was just given.
#[test]
fn test_step_produces_density_and_motion() {
    let Some(gpu) = test_gpu() else { return };
    let mut sim = test_sim(gpu, 4096);

    sim.step();
    let particles = pollster::block_on(sim.read_particles()).unwrap();
    assert_eq!(particles.len(), 4096);

    let self_density = SimParams::default().particle_mass
        * kernels::poly6(0.0, SimParams::default().smoothing_radius);
    for (i, p) in particles.iter().enumerate() {
        assert!(
            p.density() >= self_density * 0.999,
            "particle {i} density {} below self term {self_density}",
            p.density()
        );
    }

    let stats = ParticleStats::from_particles(&particles).unwrap();
    assert!(stats.max_speed > 0.0, "no particle moved after one step");
    assert_eq!(sim.tick(), 1);
}

#[test]
fn test_step_matches_cpu_reference() {
    let Some(gpu) = test_gpu() else { return };
    let mut sim = test_sim(gpu, 125);

    let mut cpu = pollster::block_on(sim.read_particles()).unwrap();
    let params = *sim.params();

    sim.step();
    kernels::step(&mut cpu, &params);
    let gpu_particles = pollster::block_on(sim.read_particles()).unwrap();

    let speed_scale = cpu.iter().map(|p| p.vel().length()).fold(1.0f32, f32::max);
    for (i, (g, c)) in gpu_particles.iter().zip(&cpu).enumerate() {
        let density_tol = c.density().abs() * 1e-3;
        assert!(
            (g.density() - c.density()).abs() <= density_tol,
            "particle {i}: density gpu {} cpu {}",
            g.density(),
            c.density()
        );

        let vel_tol = speed_scale * 1e-3;
        assert!(
            (g.vel() - c.vel()).length() <= vel_tol,
            "particle {i}: velocity gpu {} cpu {}",
            g.vel(),
            c.vel()
        );
        assert!(
            (g.pos() - c.pos()).length() <= vel_tol * params.time_step + 1e-4,
            "particle {i}: position gpu {} cpu {}",
            g.pos(),
            c.pos()
        );
    }
}

#[test]
fn test_non_multiple_workgroup_covers_every_particle() {
    let Some(gpu) = test_gpu() else { return };
    let mut config = SimulationConfig::default().with_particle_count(1000);
    config.workgroup_size = 256;
    let mut sim =
        pollster::block_on(FluidSimulation::new(gpu, config, SimParams::default())).unwrap();

    sim.step();
    let particles = pollster::block_on(sim.read_particles()).unwrap();
    assert!(particles.iter().all(|p| p.density() > 0.0));
}

#[test]
fn test_particles_stay_in_domain() {
    let Some(gpu) = test_gpu() else { return };
    let mut sim = test_sim(gpu, 512);
    for _ in 0..20 {
        sim.step();
    }

    let particles = pollster::block_on(sim.read_particles()).unwrap();
    let (lo, hi) = (sim.params().domain_min(), sim.params().domain_max());
    for p in &particles {
        let pos = p.pos();
        assert!(pos.is_finite());
        assert!(pos.cmpge(lo).all() && pos.cmple(hi).all(), "{pos} escaped");
    }
}

#[test]
fn test_cursor_press_and_release_upload() {
    let Some(gpu) = test_gpu() else { return };
    let mut sim = test_sim(gpu, 64);
    let c = CURSOR_OFFSET_FLOATS;

    let state = sim
        .update_cursor(&CursorInput::pressed(canvas().center(), canvas()))
        .unwrap();
    assert!(state.is_active());

    let floats = pollster::block_on(sim.read_uploaded_params()).unwrap();
    assert!(floats[c].abs() < 1e-4 && floats[c + 1].abs() < 1e-4);
    assert_eq!(floats[c + 3], sim.cursor().config().radius);
    assert_eq!(floats[c + 7], sim.cursor().config().strength);

    let released = sim
        .update_cursor(&CursorInput::released(Vec2::new(100.0, 100.0), canvas()))
        .unwrap();
    assert_eq!(released.strength, 0.0);

    let floats = pollster::block_on(sim.read_uploaded_params()).unwrap();
    assert_eq!(floats[c + 7], 0.0);
    assert_eq!(sim.params().cursor_strength(), 0.0);
}

#[test]
fn test_rejected_cursor_leaves_upload_untouched() {
    let Some(gpu) = test_gpu() else { return };
    let mut sim = test_sim(gpu, 64);
    let before = pollster::block_on(sim.read_uploaded_params()).unwrap();

    let malformed = CursorInput {
        screen: Vec2::new(10.0, 10.0),
        active: true,
        canvas: None,
    };
    assert!(sim.update_cursor(&malformed).is_err());

    let after = pollster::block_on(sim.read_uploaded_params()).unwrap();
    assert_eq!(before, after);
}

#[test]
fn test_update_params_keeps_cursor_groups() {
    let Some(gpu) = test_gpu() else { return };
    let mut sim = test_sim(gpu, 64);

    let mut tuned = SimParams {
        gravity: 2.0,
        ..SimParams::default()
    };
    tuned.cursor_force = [0.0, 0.0, 0.0, 99.0];
    sim.update_params(&tuned).unwrap();

    let floats = pollster::block_on(sim.read_uploaded_params()).unwrap();
    let (uploaded, _) = SimParams::decode(&floats).unwrap();
    assert_eq!(uploaded.gravity, 2.0);
    assert_eq!(uploaded.cursor_strength(), 0.0);
    assert_eq!(uploaded, *sim.params());
}

#[test]
fn test_update_params_rejects_non_finite() {
    let Some(gpu) = test_gpu() else { return };
    let mut sim = test_sim(gpu, 64);
    let before = *sim.params();

    let bad = SimParams {
        viscosity: f32::NAN,
        ..SimParams::default()
    };
    assert!(matches!(
        sim.update_params(&bad),
        Err(SimulationError::Params(_))
    ));
    assert_eq!(*sim.params(), before);

    let floats = pollster::block_on(sim.read_uploaded_params()).unwrap();
    assert_eq!(floats, before.encode(ParamSchema::WithCursor));
}

#[test]
fn test_reset_restores_defaults_and_reseeds() {
    let Some(gpu) = test_gpu() else { return };
    let mut sim = test_sim(gpu, 343);

    sim.update_params(&SimParams {
        gravity: 1.0,
        ..SimParams::default()
    })
    .unwrap();
    sim.update_cursor(&CursorInput::pressed(canvas().center(), canvas()))
        .unwrap();
    for _ in 0..5 {
        sim.step();
    }

    pollster::block_on(sim.reset()).unwrap();
    pollster::block_on(sim.reset()).unwrap();

    assert_eq!(sim.particle_count(), 343);
    assert_eq!(sim.tick(), 0);
    assert_eq!(*sim.params(), SimParams::default());
    assert!(!sim.cursor().state().is_active());

    let particles = pollster::block_on(sim.read_particles()).unwrap();
    assert_eq!(particles, seed_lattice(343, &SeedBox::default()).unwrap());

    // Still steps after the rebuild
    sim.step();
    pollster::block_on(sim.drain()).unwrap();
}

#[test]
fn test_reinitialize_keeps_tuned_params() {
    let Some(gpu) = test_gpu() else { return };
    let mut sim = test_sim(gpu, 216);

    let tuned = SimParams {
        gravity: 4.0,
        smoothing_radius: 0.25,
        ..SimParams::default()
    };
    sim.update_params(&tuned).unwrap();
    sim.update_cursor(&CursorInput::pressed(canvas().center(), canvas()))
        .unwrap();
    sim.step();

    pollster::block_on(sim.reinitialize()).unwrap();

    assert_eq!(sim.tick(), 0);
    assert_eq!(sim.params().gravity, 4.0);
    assert_eq!(sim.params().smoothing_radius, 0.25);
    assert_eq!(sim.params().cursor_strength(), 0.0);

    let floats = pollster::block_on(sim.read_uploaded_params()).unwrap();
    assert_eq!(floats, sim.params().encode(ParamSchema::WithCursor));

    let particles = pollster::block_on(sim.read_particles()).unwrap();
    assert_eq!(particles, seed_lattice(216, &SeedBox::default()).unwrap());
}

#[test]
fn test_frame_loop_stops_at_max_ticks() {
    let Some(gpu) = test_gpu() else { return };
    let mut sim = test_sim(gpu, 64);

    let frame_loop = FrameLoop::new(CancellationToken::new()).with_max_ticks(5);
    let mut seen = Vec::new();
    let frames = frame_loop.run(&mut sim, |_, frame| seen.push(frame));

    assert_eq!(frames, 5);
    assert_eq!(seen, [0, 1, 2, 3, 4]);
    assert_eq!(sim.tick(), 5);
}

#[test]
fn test_frame_loop_cancels_between_ticks() {
    let Some(gpu) = test_gpu() else { return };
    let mut sim = test_sim(gpu, 64);

    let token = CancellationToken::new();
    let frame_loop = FrameLoop::new(token.clone()).with_max_ticks(100);
    let frames = frame_loop.run(&mut sim, |_, frame| {
        if frame == 2 {
            token.cancel();
        }
    });

    assert_eq!(frames, 3);
    assert_eq!(sim.tick(), 3);
    pollster::block_on(sim.drain()).unwrap();
}
