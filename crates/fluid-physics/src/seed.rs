//! Deterministic lattice seeding

use glam::Vec3;
use thiserror::Error;

use crate::constants::{SEED_BOX_SIZE, SEED_INITIAL_HEIGHT};
use crate::particle::Particle;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SeedError {
    #[error("particle count must be positive")]
    EmptyParticleCount,
}

/// Axis-aligned box the initial block of fluid is placed in
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SeedBox {
    /// Half extent on every axis
    pub box_size: f32,
    /// Vertical offset of the box center, so the block starts above rest
    pub vertical_offset: f32,
}

impl Default for SeedBox {
    fn default() -> Self {
        Self {
            box_size: SEED_BOX_SIZE,
            // Top face sits at the initial height
            vertical_offset: SEED_INITIAL_HEIGHT - SEED_BOX_SIZE,
        }
    }
}

impl SeedBox {
    pub fn min(&self) -> Vec3 {
        Vec3::new(-self.box_size, self.vertical_offset - self.box_size, -self.box_size)
    }

    pub fn max(&self) -> Vec3 {
        Vec3::new(self.box_size, self.vertical_offset + self.box_size, self.box_size)
    }
}

/// Lattice geometry for a given particle count
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Lattice {
    /// Points per axis, ceil(cbrt(count))
    pub resolution: u32,
    pub spacing: f32,
}

impl Lattice {
    pub fn new(particle_count: u32, seed_box: &SeedBox) -> Result<Self, SeedError> {
        if particle_count == 0 {
            return Err(SeedError::EmptyParticleCount);
        }
        let resolution = lattice_resolution(particle_count);
        Ok(Self {
            resolution,
            spacing: seed_box.box_size * 2.0 / resolution as f32,
        })
    }
}

/// Smallest `r` with `r³ >= count`
fn lattice_resolution(count: u32) -> u32 {
    let mut r = (count as f64).cbrt().ceil() as u32;
    // cbrt rounding can land one off near perfect cubes
    while r > 1 && (r as u64 - 1).pow(3) >= count as u64 {
        r -= 1;
    }
    while (r as u64).pow(3) < count as u64 {
        r += 1;
    }
    r.max(1)
}

/// Place `particle_count` particles on a near-cubic lattice inside `seed_box`.
///
/// X varies fastest, then Z, then Y, so an incomplete final layer is the top
/// one. Velocity, density and pressure start at zero.
pub fn seed_lattice(particle_count: u32, seed_box: &SeedBox) -> Result<Vec<Particle>, SeedError> {
    let lattice = Lattice::new(particle_count, seed_box)?;
    let r = lattice.resolution;
    let s = lattice.spacing;
    let origin = seed_box.min() + Vec3::splat(s * 0.5);

    let mut particles = Vec::with_capacity(particle_count as usize);
    'fill: for y in 0..r {
        for z in 0..r {
            for x in 0..r {
                if particles.len() == particle_count as usize {
                    break 'fill;
                }
                let offset = Vec3::new(x as f32, y as f32, z as f32) * s;
                particles.push(Particle::at_rest(origin + offset));
            }
        }
    }

    log::debug!(
        "Seeded {} particles on a {}³ lattice (spacing {:.4})",
        particles.len(),
        r,
        s
    );
    Ok(particles)
}
