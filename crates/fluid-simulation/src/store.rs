//! GPU-resident particle state

use fluid_physics::{particle_buffer_size, seed_lattice, Particle, SeedBox, SeedError};

use crate::error::{Result, SimulationError};
use crate::gpu::GpuContext;

/// Particle buffer plus the density-pass snapshot the forces pass reads from.
///
/// The particle count is fixed for the lifetime of the store. Changing it
/// means allocating a new store.
pub struct ParticleStore {
    particle_buffer: wgpu::Buffer,
    snapshot_buffer: wgpu::Buffer,
    particle_count: u32,
}

impl ParticleStore {
    /// Reserve storage for `particle_count` records (8 floats each).
    ///
    /// Zero particles, or more than the device can bind, is rejected before
    /// any buffer is created.
    pub fn allocate(gpu: &GpuContext, particle_count: u32) -> Result<Self> {
        if particle_count == 0 {
            return Err(SeedError::EmptyParticleCount.into());
        }

        let size = particle_buffer_size(particle_count);
        let limit = gpu.max_storage_binding();
        if size > limit {
            return Err(SimulationError::BufferTooLarge {
                count: particle_count,
                bytes: size,
                limit,
            });
        }

        // Read/write from compute, instanced vertex input for the renderer,
        // copy source for diagnostic readback.
        let particle_buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Particle Buffer"),
            size,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::VERTEX
                | wgpu::BufferUsages::COPY_DST
                | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        let snapshot_buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Particle Snapshot Buffer"),
            size,
            usage: wgpu::BufferUsages::STORAGE,
            mapped_at_creation: false,
        });

        log::debug!("Allocated particle store: {particle_count} particles, {size} bytes");

        Ok(Self {
            particle_buffer,
            snapshot_buffer,
            particle_count,
        })
    }

    /// Write a fresh lattice into the particle buffer
    pub fn seed(&self, queue: &wgpu::Queue, seed_box: &SeedBox) -> Result<()> {
        let particles = seed_lattice(self.particle_count, seed_box)?;
        self.write(queue, &particles)
    }

    /// Overwrite the particle buffer with `particles`, one record per slot
    pub fn write(&self, queue: &wgpu::Queue, particles: &[Particle]) -> Result<()> {
        if particles.len() != self.particle_count as usize {
            return Err(SimulationError::ParticleCountMismatch {
                expected: self.particle_count,
                actual: particles.len(),
            });
        }
        queue.write_buffer(&self.particle_buffer, 0, bytemuck::cast_slice(particles));
        Ok(())
    }

    /// Copy the particle buffer back to the host.
    ///
    /// Blocks on the GPU; meant for diagnostics and tests.
    pub async fn read_back(&self, gpu: &GpuContext) -> Result<Vec<Particle>> {
        let size = self.byte_size();
        let staging = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Particle Readback Staging Buffer"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Particle Readback Encoder"),
            });
        encoder.copy_buffer_to_buffer(&self.particle_buffer, 0, &staging, 0, size);
        gpu.queue.submit(std::iter::once(encoder.finish()));

        let bytes = gpu.read_buffer(&staging).await?;
        staging.destroy();
        Ok(bytemuck::pod_collect_to_vec(&bytes))
    }

    /// Buffer handed to the renderer
    pub fn particle_buffer(&self) -> &wgpu::Buffer {
        &self.particle_buffer
    }

    pub(crate) fn snapshot_buffer(&self) -> &wgpu::Buffer {
        &self.snapshot_buffer
    }

    pub fn particle_count(&self) -> u32 {
        self.particle_count
    }

    /// Always `particle_count * 8` floats
    pub fn float_count(&self) -> u64 {
        self.particle_count as u64 * fluid_physics::FLOATS_PER_PARTICLE as u64
    }

    pub fn byte_size(&self) -> u64 {
        particle_buffer_size(self.particle_count)
    }

    /// Release GPU memory now instead of on drop. Only call once no
    /// submitted work references the store.
    pub(crate) fn destroy(self) {
        self.particle_buffer.destroy();
        self.snapshot_buffer.destroy();
    }
}
