//! Simulation lifecycle: start, step, reset and reinitialize

use fluid_physics::{CursorForceField, CursorInput, CursorState, Particle, SimParams};

use crate::block::ParameterBlock;
use crate::config::SimulationConfig;
use crate::error::Result;
use crate::gpu::GpuContext;
use crate::schedule::{ComputeSchedule, StepBindings, KERNEL_SCHEMA};
use crate::store::ParticleStore;

/// Buffers created together and replaced together
struct SimulationResources {
    store: ParticleStore,
    block: ParameterBlock,
    bindings: StepBindings,
}

impl SimulationResources {
    /// Allocate, bind, seed and upload `params`
    fn build(
        gpu: &GpuContext,
        schedule: &ComputeSchedule,
        config: &SimulationConfig,
        params: &SimParams,
    ) -> Result<Self> {
        let store = ParticleStore::allocate(gpu, config.particle_count)?;
        let block = ParameterBlock::allocate(gpu, KERNEL_SCHEMA);
        let bindings = schedule.bind(&gpu.device, &store, &block)?;

        store.seed(&gpu.queue, &config.seed_box)?;
        block.upload_params(&gpu.queue, params)?;

        log::info!("Buffers created ({} particles)", store.particle_count());
        Ok(Self {
            store,
            block,
            bindings,
        })
    }

    fn destroy(self) {
        self.store.destroy();
        self.block.destroy();
    }
}

/// GPU SPH simulation
///
/// Holds the compute pipelines for its whole life; the particle store and
/// parameter block are rebuilt wholesale on [`reset`](Self::reset) and
/// [`reinitialize`](Self::reinitialize). Both take `&mut self`, so no step
/// can be issued while a rebuild is in progress.
pub struct FluidSimulation {
    gpu: GpuContext,
    config: SimulationConfig,
    schedule: ComputeSchedule,
    resources: SimulationResources,
    params: SimParams,
    cursor: CursorForceField,
    tick: u64,
}

impl FluidSimulation {
    pub async fn new(gpu: GpuContext, config: SimulationConfig, params: SimParams) -> Result<Self> {
        log::info!("Initializing FluidSimulation...");
        params.validate()?;

        let schedule = ComputeSchedule::create_pipelines(&gpu.device, config.workgroup_size)?;
        let cursor = CursorForceField::new(config.cursor, config.camera);

        let mut params = params;
        params.apply_cursor(cursor.state());

        let resources = SimulationResources::build(&gpu, &schedule, &config, &params)?;

        Ok(Self {
            gpu,
            config,
            schedule,
            resources,
            params,
            cursor,
            tick: 0,
        })
    }

    /// Create the device from `config.backends` and build a simulation with
    /// default parameters.
    pub async fn with_config(config: SimulationConfig) -> Result<Self> {
        let gpu = GpuContext::new(config.backends).await?;
        Self::new(gpu, config, SimParams::default()).await
    }

    /// Queue one density + forces step
    pub fn step(&mut self) -> wgpu::SubmissionIndex {
        self.tick += 1;
        log::trace!("Step {}", self.tick);
        self.schedule
            .step(&self.gpu.device, &self.gpu.queue, &self.resources.bindings)
    }

    /// Replace the physical parameters.
    ///
    /// The cursor groups are owned by the cursor field, so whatever the record
    /// carries there is replaced by the current cursor state. Nothing is
    /// uploaded if the record is rejected.
    pub fn update_params(&mut self, params: &SimParams) -> Result<()> {
        params.validate()?;
        let mut next = *params;
        next.apply_cursor(self.cursor.state());
        self.resources.block.upload_params(&self.gpu.queue, &next)?;
        self.params = next;
        Ok(())
    }

    /// Apply a pointer update and upload the cursor groups only
    pub fn update_cursor(&mut self, input: &CursorInput) -> Result<CursorState> {
        let state = self.cursor.update(input)?;
        self.push_cursor(state)?;
        Ok(state)
    }

    pub fn set_cursor_radius(&mut self, radius: f32) -> Result<()> {
        self.cursor.set_radius(radius);
        self.push_cursor(*self.cursor.state())
    }

    pub fn set_cursor_strength(&mut self, strength: f32) {
        self.cursor.set_strength(strength);
    }

    fn push_cursor(&mut self, state: CursorState) -> Result<()> {
        self.resources.block.upload_cursor(&self.gpu.queue, &state)?;
        self.params.apply_cursor(&state);
        Ok(())
    }

    /// Restore default parameters and reseed
    pub async fn reset(&mut self) -> Result<()> {
        log::info!("Resetting simulation to defaults");
        self.cursor = CursorForceField::new(self.config.cursor, self.config.camera);
        let mut params = SimParams::default();
        params.apply_cursor(self.cursor.state());
        self.rebuild(params).await
    }

    /// Keep the current tuned parameters and reseed
    pub async fn reinitialize(&mut self) -> Result<()> {
        log::info!("Reinitializing simulation with current parameters");
        let state = self.cursor.release();
        let mut params = self.params;
        params.apply_cursor(&state);
        self.rebuild(params).await
    }

    /// Drain, recreate, then destroy the old resources.
    ///
    /// The new set is built before the old one is destroyed so a failed
    /// rebuild leaves the previous state usable. Destruction happens only
    /// after the drain confirms no submitted work references it.
    async fn rebuild(&mut self, params: SimParams) -> Result<()> {
        self.gpu.drain().await?;

        let fresh = SimulationResources::build(&self.gpu, &self.schedule, &self.config, &params)?;
        let stale = std::mem::replace(&mut self.resources, fresh);
        stale.destroy();

        self.params = params;
        self.tick = 0;
        Ok(())
    }

    /// Wait for every queued step to finish
    pub async fn drain(&self) -> Result<()> {
        self.gpu.drain().await
    }

    /// Copy the particle field back to the host
    pub async fn read_particles(&self) -> Result<Vec<Particle>> {
        self.resources.store.read_back(&self.gpu).await
    }

    /// Read the parameter block as the kernel currently sees it
    pub async fn read_uploaded_params(&self) -> Result<Vec<f32>> {
        self.resources.block.read_back(&self.gpu).await
    }

    /// Particle buffer for the renderer (8 floats per particle)
    pub fn particle_buffer(&self) -> &wgpu::Buffer {
        self.resources.store.particle_buffer()
    }

    pub fn particle_count(&self) -> u32 {
        self.resources.store.particle_count()
    }

    pub fn params(&self) -> &SimParams {
        &self.params
    }

    pub fn cursor(&self) -> &CursorForceField {
        &self.cursor
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn gpu(&self) -> &GpuContext {
        &self.gpu
    }

    /// Steps issued since the last rebuild
    pub fn tick(&self) -> u64 {
        self.tick
    }
}
