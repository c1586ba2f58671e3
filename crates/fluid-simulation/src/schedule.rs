//! Two-phase compute dispatch: density, then forces

use fluid_physics::ParamSchema;

use crate::block::ParameterBlock;
use crate::error::{Result, SimulationError};
use crate::store::ParticleStore;

/// Parameter schema the bundled kernel is compiled against
pub const KERNEL_SCHEMA: ParamSchema = ParamSchema::WithCursor;

/// A compute pass of one simulation step
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pass {
    /// Accumulates density per particle and snapshots the particle set
    Density,
    /// Pressure, viscosity and external forces; integration and boundary reflection
    Forces,
}

impl Pass {
    pub fn entry_point(self) -> &'static str {
        match self {
            Pass::Density => "compute_density",
            Pass::Forces => "compute_forces",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Pass::Density => "SPH Density Pass",
            Pass::Forces => "SPH Forces Pass",
        }
    }
}

/// Pass order within one step. Each entry is its own compute pass, so the
/// forces pass starts only after every density invocation has finished.
pub const STEP_PASSES: [Pass; 2] = [Pass::Density, Pass::Forces];

/// Workgroups needed to cover `particle_count` invocations
pub fn workgroup_count(particle_count: u32, workgroup_size: u32) -> u32 {
    particle_count.div_ceil(workgroup_size)
}

/// Fails unless `workgroup_size` is positive and within the per-workgroup
/// invocation limit.
pub fn check_workgroup_size(workgroup_size: u32, limits: &wgpu::Limits) -> Result<()> {
    if workgroup_size == 0 {
        return Err(SimulationError::ZeroWorkgroupSize);
    }
    let limit = limits.max_compute_invocations_per_workgroup;
    if workgroup_size > limit || workgroup_size > limits.max_compute_workgroup_size_x {
        return Err(SimulationError::WorkgroupTooLarge {
            size: workgroup_size,
            limit: limit.min(limits.max_compute_workgroup_size_x),
        });
    }
    Ok(())
}

/// Fails when covering `particle_count` needs more workgroups than one
/// dispatch dimension allows.
pub fn check_dispatch(particle_count: u32, workgroup_size: u32, limits: &wgpu::Limits) -> Result<()> {
    let workgroups = workgroup_count(particle_count, workgroup_size);
    let limit = limits.max_compute_workgroups_per_dimension;
    if workgroups > limit {
        return Err(SimulationError::DispatchTooLarge {
            count: particle_count,
            workgroups,
            limit,
        });
    }
    Ok(())
}

/// Bind group tying one store and one parameter block to the kernel.
///
/// Rebuilt whenever either resource is replaced.
pub struct StepBindings {
    bind_group: wgpu::BindGroup,
    particle_count: u32,
}

impl StepBindings {
    pub fn particle_count(&self) -> u32 {
        self.particle_count
    }
}

/// Compute pipelines for the density and forces passes
pub struct ComputeSchedule {
    bind_group_layout: wgpu::BindGroupLayout,
    density_pipeline: wgpu::ComputePipeline,
    forces_pipeline: wgpu::ComputePipeline,
    workgroup_size: u32,
}

impl ComputeSchedule {
    /// Compile the kernel with `workgroup_size` threads per workgroup
    pub fn create_pipelines(device: &wgpu::Device, workgroup_size: u32) -> Result<Self> {
        check_workgroup_size(workgroup_size, &device.limits())?;

        let source = include_str!("shaders/sph.wgsl").replace(
            "@workgroup_size(64)",
            &format!("@workgroup_size({workgroup_size})"),
        );
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("SPH Compute Shader"),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        log::info!("Shaders loaded");

        // 0: params (uniform)
        // 1: particles (storage, read/write)
        // 2: snapshot (storage, read/write)
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("SPH Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(KERNEL_SCHEMA.byte_size()),
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: false },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: false },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("SPH Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let create = |pass: Pass| {
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(pass.label()),
                layout: Some(&pipeline_layout),
                module: &shader,
                entry_point: Some(pass.entry_point()),
                compilation_options: Default::default(),
                cache: None,
            })
        };
        let density_pipeline = create(Pass::Density);
        let forces_pipeline = create(Pass::Forces);

        log::info!("Pipelines created (workgroup size {workgroup_size})");

        Ok(Self {
            bind_group_layout,
            density_pipeline,
            forces_pipeline,
            workgroup_size,
        })
    }

    pub fn workgroup_size(&self) -> u32 {
        self.workgroup_size
    }

    pub fn pipeline(&self, pass: Pass) -> &wgpu::ComputePipeline {
        match pass {
            Pass::Density => &self.density_pipeline,
            Pass::Forces => &self.forces_pipeline,
        }
    }

    /// Bind a store and parameter block. Fails if the block's schema is not
    /// the one the kernel was compiled against, or if the store is too large
    /// for a single dispatch.
    pub fn bind(
        &self,
        device: &wgpu::Device,
        store: &ParticleStore,
        block: &ParameterBlock,
    ) -> Result<StepBindings> {
        if block.schema() != KERNEL_SCHEMA {
            return Err(SimulationError::SchemaMismatch {
                expected: KERNEL_SCHEMA,
                actual: block.schema(),
            });
        }
        KERNEL_SCHEMA.check_size(block.byte_size())?;
        check_dispatch(store.particle_count(), self.workgroup_size, &device.limits())?;

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("SPH Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: block.buffer().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: store.particle_buffer().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: store.snapshot_buffer().as_entire_binding(),
                },
            ],
        });

        Ok(StepBindings {
            bind_group,
            particle_count: store.particle_count(),
        })
    }

    /// Record one step into `encoder`
    pub fn encode_step(&self, encoder: &mut wgpu::CommandEncoder, bindings: &StepBindings) {
        let workgroups = workgroup_count(bindings.particle_count, self.workgroup_size);

        for pass in STEP_PASSES {
            let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(pass.label()),
                timestamp_writes: None,
            });
            compute_pass.set_pipeline(self.pipeline(pass));
            compute_pass.set_bind_group(0, &bindings.bind_group, &[]);
            compute_pass.dispatch_workgroups(workgroups, 1, 1);
        }
    }

    /// Encode and submit one step. Returns as soon as the batch is queued.
    pub fn step(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        bindings: &StepBindings,
    ) -> wgpu::SubmissionIndex {
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Simulation Encoder"),
        });
        self.encode_step(&mut encoder, bindings);
        queue.submit(std::iter::once(encoder.finish()))
    }
}
