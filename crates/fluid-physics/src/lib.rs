//! # Fluid Physics
//!
//! Host-side data model for the SPH fluid kernel: particle records, the
//! fixed-layout parameter block, lattice seeding, the shared camera contract
//! and cursor projection. A CPU reference of the two compute passes lives in
//! [`kernels`].

pub mod camera;
pub mod constants;
pub mod cursor;
pub mod kernels;
pub mod layout;
pub mod params;
pub mod particle;
pub mod seed;

pub use camera::*;
pub use constants::*;
pub use cursor::*;
pub use layout::*;
pub use params::*;
pub use particle::*;
pub use seed::*;
