use std::collections::VecDeque;
use std::time::Instant;

use fluid_physics::{CanvasRect, CursorInput, ParticleStats};
use fluid_simulation::{CancellationToken, FluidSimulation, FrameLoop, SimulationConfig};
use glam::Vec2;

const DEFAULT_TICKS: u64 = 600;
const STATS_INTERVAL: u64 = 100;

// Scripted pointer: pressed during [SWEEP_START, SWEEP_END), then released
const SWEEP_START: u64 = 150;
const SWEEP_END: u64 = 300;
const REINITIALIZE_AT: u64 = 400;
const RESET_AT: u64 = 500;

// Virtual canvas the scripted pointer moves over
const CANVAS_WIDTH: f32 = 1280.0;
const CANVAS_HEIGHT: f32 = 720.0;

/// Rolling average over the last 100 frames
struct FrameTimer {
    frame_times: VecDeque<f32>,
    last_frame_time: Instant,
    last_report: Instant,
}

impl FrameTimer {
    fn new() -> Self {
        let now = Instant::now();
        Self {
            frame_times: VecDeque::with_capacity(100),
            last_frame_time: now,
            last_report: now,
        }
    }

    /// Record a frame; returns `(fps, avg_ms)` about once per second
    fn tick(&mut self) -> Option<(f32, f32)> {
        let now = Instant::now();
        let frame_time = now.duration_since(self.last_frame_time).as_secs_f32() * 1000.0;
        self.last_frame_time = now;

        self.frame_times.push_back(frame_time);
        if self.frame_times.len() > 100 {
            self.frame_times.pop_front();
        }

        if now.duration_since(self.last_report).as_secs_f32() < 1.0 {
            return None;
        }
        self.last_report = now;

        let avg_frame_time = self.frame_times.iter().sum::<f32>() / self.frame_times.len() as f32;
        Some((1000.0 / avg_frame_time, avg_frame_time))
    }
}

/// Pointer position for `frame`: a circle around the canvas center
fn scripted_pointer(canvas: &CanvasRect, frame: u64) -> Vec2 {
    let angle = (frame - SWEEP_START) as f32 * 0.05;
    let radius = canvas.height * 0.25;
    canvas.center() + Vec2::new(angle.cos(), angle.sin()) * radius
}

fn log_stats(sim: &FluidSimulation) {
    match pollster::block_on(sim.read_particles()) {
        Ok(particles) => match ParticleStats::from_particles(&particles) {
            Some(stats) => log::info!(
                "tick {}: density {:.2}..{:.2} (mean {:.2}), max speed {:.3}, centroid ({:.3}, {:.3}, {:.3})",
                sim.tick(),
                stats.min_density,
                stats.max_density,
                stats.mean_density,
                stats.max_speed,
                stats.centroid.x,
                stats.centroid.y,
                stats.centroid.z,
            ),
            None => log::warn!("tick {}: empty particle readback", sim.tick()),
        },
        Err(err) => log::error!("Particle readback failed: {err}"),
    }
}

fn main() {
    // Initialize logger (RUST_LOG=debug for verbose output)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting SPH fluid simulation...");

    let config = SimulationConfig::from_env();
    let max_ticks = std::env::var("SPH_TICKS")
        .ok()
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(DEFAULT_TICKS);

    let mut sim = match pollster::block_on(FluidSimulation::with_config(config)) {
        Ok(sim) => sim,
        Err(err) => {
            log::error!("Failed to start simulation: {err}");
            std::process::exit(1);
        }
    };

    log::info!(
        "Running {} particles for {} ticks",
        sim.particle_count(),
        max_ticks
    );

    let canvas = CanvasRect::new(0.0, 0.0, CANVAS_WIDTH, CANVAS_HEIGHT);
    let token = CancellationToken::new();
    let frame_loop = FrameLoop::new(token.clone()).with_max_ticks(max_ticks);
    let mut timer = FrameTimer::new();

    let frames = frame_loop.run(&mut sim, |sim, frame| {
        // Pace the loop on the GPU so frame times are meaningful
        if let Err(err) = pollster::block_on(sim.drain()) {
            log::error!("Drain failed: {err}");
            token.cancel();
            return;
        }

        if let Some((fps, frame_time)) = timer.tick() {
            log::info!("{fps:.0} FPS ({frame_time:.2}ms)");
        }

        if (SWEEP_START..SWEEP_END).contains(&frame) {
            let input = CursorInput::pressed(scripted_pointer(&canvas, frame), canvas);
            if let Err(err) = sim.update_cursor(&input) {
                log::warn!("Cursor update rejected: {err}");
            }
        } else if frame == SWEEP_END {
            let input = CursorInput::released(scripted_pointer(&canvas, frame), canvas);
            if let Err(err) = sim.update_cursor(&input) {
                log::warn!("Cursor release rejected: {err}");
            }
        }

        if frame % STATS_INTERVAL == 0 {
            log_stats(sim);
        }

        let rebuilt = if frame == REINITIALIZE_AT {
            Some(pollster::block_on(sim.reinitialize()))
        } else if frame == RESET_AT {
            Some(pollster::block_on(sim.reset()))
        } else {
            None
        };
        if let Some(Err(err)) = rebuilt {
            log::error!("Rebuild failed: {err}");
            token.cancel();
        }
    });

    log_stats(&sim);
    log::info!("Finished after {frames} frames");
}
