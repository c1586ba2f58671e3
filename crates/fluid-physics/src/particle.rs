//! Particle record shared with the compute kernel and the renderer

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// Number of f32 values per particle record
pub const FLOATS_PER_PARTICLE: usize = 8;

/// GPU-compatible particle structure
///
/// Two `vec4<f32>` on the WGSL side:
/// - `position`: xyz = position, w = density
/// - `velocity`: xyz = velocity, w = pressure
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Particle {
    pub position: [f32; 4],
    pub velocity: [f32; 4],
}

const _: () = assert!(std::mem::size_of::<Particle>() == FLOATS_PER_PARTICLE * 4);

impl Particle {
    /// Particle at rest with density and pressure not yet computed
    pub fn at_rest(position: Vec3) -> Self {
        Self {
            position: position.extend(0.0).to_array(),
            velocity: [0.0; 4],
        }
    }

    pub fn pos(&self) -> Vec3 {
        Vec3::new(self.position[0], self.position[1], self.position[2])
    }

    pub fn vel(&self) -> Vec3 {
        Vec3::new(self.velocity[0], self.velocity[1], self.velocity[2])
    }

    pub fn density(&self) -> f32 {
        self.position[3]
    }

    pub fn pressure(&self) -> f32 {
        self.velocity[3]
    }

    pub fn set_pos(&mut self, pos: Vec3) {
        self.position[..3].copy_from_slice(&pos.to_array());
    }

    pub fn set_vel(&mut self, vel: Vec3) {
        self.velocity[..3].copy_from_slice(&vel.to_array());
    }

    pub fn set_density(&mut self, density: f32) {
        self.position[3] = density;
    }

    pub fn set_pressure(&mut self, pressure: f32) {
        self.velocity[3] = pressure;
    }
}

/// Byte size of a particle array holding `count` records
pub fn particle_buffer_size(count: u32) -> u64 {
    count as u64 * std::mem::size_of::<Particle>() as u64
}

/// Summary of a particle field, used for logging and diagnostics
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParticleStats {
    pub count: usize,
    pub min_density: f32,
    pub max_density: f32,
    pub mean_density: f32,
    pub max_speed: f32,
    pub centroid: Vec3,
}

impl ParticleStats {
    /// Returns `None` for an empty slice.
    pub fn from_particles(particles: &[Particle]) -> Option<Self> {
        if particles.is_empty() {
            return None;
        }

        let mut min_density = f32::INFINITY;
        let mut max_density = f32::NEG_INFINITY;
        let mut density_sum = 0.0f64;
        let mut max_speed = 0.0f32;
        let mut centroid = Vec3::ZERO;

        for p in particles {
            let density = p.density();
            min_density = min_density.min(density);
            max_density = max_density.max(density);
            density_sum += density as f64;
            max_speed = max_speed.max(p.vel().length());
            centroid += p.pos();
        }

        let count = particles.len();
        Some(Self {
            count,
            min_density,
            max_density,
            mean_density: (density_sum / count as f64) as f32,
            max_speed,
            centroid: centroid / count as f32,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_layout() {
        let mut p = Particle::at_rest(Vec3::new(1.0, 2.0, 3.0));
        p.set_density(4.0);
        p.set_vel(Vec3::new(5.0, 6.0, 7.0));
        p.set_pressure(8.0);

        let floats: &[f32] = bytemuck::cast_slice(std::slice::from_ref(&p));
        assert_eq!(floats, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
    }

    #[test]
    fn test_buffer_size() {
        assert_eq!(particle_buffer_size(4096), 4096 * 32);
    }

    #[test]
    fn test_stats() {
        let mut a = Particle::at_rest(Vec3::new(-1.0, 0.0, 0.0));
        a.set_density(2.0);
        let mut b = Particle::at_rest(Vec3::new(1.0, 0.0, 0.0));
        b.set_density(4.0);
        b.set_vel(Vec3::new(0.0, 3.0, 4.0));

        let stats = ParticleStats::from_particles(&[a, b]).unwrap();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.min_density, 2.0);
        assert_eq!(stats.max_density, 4.0);
        assert_eq!(stats.mean_density, 3.0);
        assert_eq!(stats.max_speed, 5.0);
        assert_eq!(stats.centroid, Vec3::ZERO);

        assert!(ParticleStats::from_particles(&[]).is_none());
    }
}
