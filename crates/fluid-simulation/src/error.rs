//! Error type for GPU setup, uploads and lifecycle operations

use fluid_physics::{CursorError, LayoutError, ParamSchema, ParamsError, SeedError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("no compatible GPU adapter: {0}")]
    NoAdapter(#[from] wgpu::RequestAdapterError),
    #[error("failed to create GPU device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
    #[error("invalid particle count: {0}")]
    Seed(#[from] SeedError),
    #[error("{count} particles need {bytes} bytes, device allows {limit}")]
    BufferTooLarge { count: u32, bytes: u64, limit: u64 },
    #[error("store holds {expected} particles, got {actual}")]
    ParticleCountMismatch { expected: u32, actual: usize },
    #[error("parameter layout: {0}")]
    Layout(#[from] LayoutError),
    #[error("kernel expects the {expected:?} parameter schema, block uses {actual:?}")]
    SchemaMismatch {
        expected: ParamSchema,
        actual: ParamSchema,
    },
    #[error("invalid parameters: {0}")]
    Params(#[from] ParamsError),
    #[error("invalid cursor update: {0}")]
    Cursor(#[from] CursorError),
    #[error("device poll failed: {0}")]
    Poll(#[from] wgpu::PollError),
    #[error("buffer map failed: {0}")]
    BufferMap(#[from] wgpu::BufferAsyncError),
    #[error("GPU callback channel disconnected")]
    ChannelDisconnected,
    #[error("workgroup size must be positive")]
    ZeroWorkgroupSize,
    #[error("workgroup size {size} exceeds the device limit of {limit} invocations")]
    WorkgroupTooLarge { size: u32, limit: u32 },
    #[error("{count} particles need {workgroups} workgroups, device allows {limit} per dimension")]
    DispatchTooLarge {
        count: u32,
        workgroups: u32,
        limit: u32,
    },
}

pub type Result<T, E = SimulationError> = std::result::Result<T, E>;
