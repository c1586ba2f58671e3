//! Tuned defaults for the fluid simulation
//!
//! Physical parameter defaults live in [`crate::SimParams::default`]; the
//! values here cover everything around the kernel.

/// Threads per compute workgroup (must match `@workgroup_size` in the kernel)
pub const WORKGROUP_SIZE: u32 = 64;

/// Default particle count
pub const DEFAULT_PARTICLE_COUNT: u32 = 8 * 1024;

/// Half extent of the seeding box
pub const SEED_BOX_SIZE: f32 = 0.3;

/// Height of the top of the seeded block
pub const SEED_INITIAL_HEIGHT: f32 = 0.8;

/// Half extent of the default reflecting domain
pub const DOMAIN_HALF_EXTENT: f32 = 0.8;

/// Cursor influence radius
pub const CURSOR_RADIUS: f32 = 0.8;

/// Cursor attraction strength while a press is active
pub const CURSOR_STRENGTH: f32 = 40.0;

/// Allowed cursor radius range (control panel slider)
pub const CURSOR_RADIUS_RANGE: (f32, f32) = (0.1, 2.0);

/// Allowed cursor strength range (control panel slider)
pub const CURSOR_STRENGTH_RANGE: (f32, f32) = (0.0, 100.0);

/// Camera eye distance from the origin, shared by renderer and cursor projection
pub const CAMERA_EYE_DISTANCE: f32 = 5.0;

/// Vertical field of view in radians (45°)
pub const CAMERA_FOV_Y: f32 = std::f32::consts::FRAC_PI_4;

pub const CAMERA_Z_NEAR: f32 = 0.1;
pub const CAMERA_Z_FAR: f32 = 100.0;
