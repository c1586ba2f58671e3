//! GPU-visible parameter block

use fluid_physics::{CursorState, LayoutError, ParamSchema, SimParams, CURSOR_FLOATS, CURSOR_OFFSET_BYTES};

use crate::error::Result;
use crate::gpu::GpuContext;

/// Uniform buffer holding exactly one encoded [`SimParams`] for `schema`
pub struct ParameterBlock {
    buffer: wgpu::Buffer,
    schema: ParamSchema,
}

impl ParameterBlock {
    pub fn allocate(gpu: &GpuContext, schema: ParamSchema) -> Self {
        let buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("SPH Params Buffer"),
            size: schema.byte_size(),
            usage: wgpu::BufferUsages::UNIFORM
                | wgpu::BufferUsages::COPY_DST
                | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        Self { buffer, schema }
    }

    pub fn schema(&self) -> ParamSchema {
        self.schema
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    pub fn byte_size(&self) -> u64 {
        self.buffer.size()
    }

    /// Write raw floats at `offset` bytes.
    ///
    /// A write at offset 0 must cover the whole block; anything else must fall
    /// inside it. Both checks run before the queue sees any data.
    pub fn upload(&self, queue: &wgpu::Queue, floats: &[f32], offset: u64) -> Result<()> {
        let len = (floats.len() * 4) as u64;
        if offset == 0 {
            self.schema.check_size(self.byte_size())?;
            self.schema.check_size(len)?;
        } else if offset % 4 != 0 || offset + len > self.byte_size() {
            return Err(LayoutError::OutOfRange {
                offset,
                len,
                size: self.byte_size(),
            }
            .into());
        }
        queue.write_buffer(&self.buffer, offset, bytemuck::cast_slice(floats));
        Ok(())
    }

    /// Encode and upload a full record
    pub fn upload_params(&self, queue: &wgpu::Queue, params: &SimParams) -> Result<()> {
        self.upload(queue, &params.encode(self.schema), 0)
    }

    /// Upload only groups 6-7, leaving the physical parameters untouched
    pub fn upload_cursor(&self, queue: &wgpu::Queue, cursor: &CursorState) -> Result<()> {
        if !self.schema.has_cursor() {
            return Err(LayoutError::NoCursorExtension(self.schema).into());
        }
        let flat: [f32; CURSOR_FLOATS] = cursor.encode_flat();
        self.upload(queue, &flat, CURSOR_OFFSET_BYTES)
    }

    /// Read the live block back as floats (diagnostics)
    pub async fn read_back(&self, gpu: &GpuContext) -> Result<Vec<f32>> {
        let size = self.byte_size();
        let staging = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("SPH Params Staging Buffer"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("SPH Params Readback Encoder"),
            });
        encoder.copy_buffer_to_buffer(&self.buffer, 0, &staging, 0, size);
        gpu.queue.submit(std::iter::once(encoder.finish()));

        let bytes = gpu.read_buffer(&staging).await?;
        staging.destroy();
        Ok(bytemuck::pod_collect_to_vec(&bytes))
    }

    pub(crate) fn destroy(self) {
        self.buffer.destroy();
    }
}
