//! # Fluid Simulation Engine
//!
//! GPU-based SPH simulation: a density pass followed by a forces pass over a
//! shared particle buffer, driven through wgpu compute shaders.

pub mod block;
pub mod config;
pub mod error;
pub mod frame_loop;
pub mod gpu;
pub mod schedule;
pub mod simulation;
pub mod store;

pub use block::*;
pub use config::*;
pub use error::*;
pub use frame_loop::*;
pub use gpu::*;
pub use schedule::*;
pub use simulation::*;
pub use store::*;
