//! Simulation configuration

use fluid_physics::{CameraContract, CursorConfig, SeedBox, DEFAULT_PARTICLE_COUNT, WORKGROUP_SIZE};

/// Everything needed to build a simulation besides the physical parameters
#[derive(Clone, Debug)]
pub struct SimulationConfig {
    pub particle_count: u32,
    pub workgroup_size: u32,
    pub seed_box: SeedBox,
    pub cursor: CursorConfig,
    pub camera: CameraContract,
    pub backends: wgpu::Backends,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            particle_count: DEFAULT_PARTICLE_COUNT,
            workgroup_size: WORKGROUP_SIZE,
            seed_box: SeedBox::default(),
            cursor: CursorConfig::default(),
            camera: CameraContract::default(),
            backends: wgpu::Backends::all(),
        }
    }
}

impl SimulationConfig {
    /// Defaults overridden by `SPH_PARTICLE_COUNT`, `SPH_WORKGROUP_SIZE` and `WGPU_BACKEND`
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(count) = env_u32("SPH_PARTICLE_COUNT") {
            config.particle_count = count;
        }
        if let Some(size) = env_u32("SPH_WORKGROUP_SIZE") {
            config.workgroup_size = size;
        }
        if let Some(backends) = wgpu::Backends::from_env() {
            config.backends = backends;
        }
        config
    }

    pub fn with_particle_count(mut self, particle_count: u32) -> Self {
        self.particle_count = particle_count;
        self
    }
}

fn env_u32(name: &str) -> Option<u32> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(err) => {
            log::warn!("Ignoring {name}={raw:?}: {err}");
            None
        }
    }
}
