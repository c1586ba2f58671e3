//! SPH smoothing kernels and the two simulation passes
//!
//! NOTE: These are reference implementations for documentation and testing.
//! The actual simulation runs `sph.wgsl` on the GPU; both follow the same
//! formulas so results agree up to float summation order.

use std::f32::consts::PI;

use glam::Vec3;

use crate::params::SimParams;
use crate::particle::Particle;

/// Poly6 kernel, used for density
/// W(r) = 315 / (64 π h⁹) · (h² − r²)³
pub fn poly6(r2: f32, h: f32) -> f32 {
    let h2 = h * h;
    if r2 >= h2 {
        return 0.0;
    }
    let diff = h2 - r2;
    315.0 / (64.0 * PI * h.powi(9)) * diff * diff * diff
}

/// Gradient of the spiky kernel, used for pressure
/// ∇W(r) = −45 / (π h⁶) · (h − |r|)² · r̂
pub fn spiky_gradient(r: Vec3, h: f32) -> Vec3 {
    let len = r.length();
    if len >= h || len <= 0.0 {
        return Vec3::ZERO;
    }
    let diff = h - len;
    -45.0 / (PI * h.powi(6)) * diff * diff * (r / len)
}

/// Laplacian of the viscosity kernel
/// ∇²W(r) = 45 / (π h⁶) · (h − |r|)
pub fn viscosity_laplacian(len: f32, h: f32) -> f32 {
    if len >= h {
        return 0.0;
    }
    45.0 / (PI * h.powi(6)) * (h - len)
}

/// Equation of state
pub fn pressure(density: f32, params: &SimParams) -> f32 {
    params.gas_constant * (density - params.rest_density)
}

/// Density pass: accumulate density for every particle, self included.
///
/// Returns the snapshot the forces pass reads neighbours from.
pub fn density_pass(particles: &mut [Particle], params: &SimParams) -> Vec<Particle> {
    let h = params.smoothing_radius;
    let densities: Vec<f32> = particles
        .iter()
        .map(|pi| {
            let xi = pi.pos();
            particles
                .iter()
                .map(|pj| params.particle_mass * poly6((xi - pj.pos()).length_squared(), h))
                .sum()
        })
        .collect();

    for (p, density) in particles.iter_mut().zip(densities) {
        p.set_density(density);
    }
    particles.to_vec()
}

/// Forces pass: pressure, viscosity, gravity and cursor, then integrate and
/// reflect off the domain bounds.
///
/// Neighbour state comes from `snapshot`; results are written to `particles`.
///
/// # Panics
///
/// If `snapshot` and `particles` differ in length.
pub fn forces_pass(particles: &mut [Particle], snapshot: &[Particle], params: &SimParams) {
    assert_eq!(
        particles.len(),
        snapshot.len(),
        "snapshot must hold one record per particle"
    );
    let h = params.smoothing_radius;
    let m = params.particle_mass;
    let dt = params.time_step;

    for (i, (out, me)) in particles.iter_mut().zip(snapshot).enumerate() {
        let xi = me.pos();
        let vi = me.vel();
        let rho_i = me.density().max(params.eps);
        let p_i = pressure(me.density(), params);

        let mut f_pressure = Vec3::ZERO;
        let mut f_viscosity = Vec3::ZERO;

        for (j, other) in snapshot.iter().enumerate() {
            if i == j {
                continue;
            }
            let r = xi - other.pos();
            let len = r.length();
            if len >= h {
                continue;
            }
            let rho_j = other.density().max(params.eps);
            let p_j = pressure(other.density(), params);

            f_pressure -= m * (p_i + p_j) / (2.0 * rho_j) * spiky_gradient(r, h);
            f_viscosity += m * (other.vel() - vi) / rho_j * viscosity_laplacian(len, h);
        }

        let mut accel = (f_pressure * params.scale_pressure
            + f_viscosity * params.viscosity * params.scale_viscosity)
            / rho_i;
        accel.y -= params.gravity * params.scale_gravity;
        accel += cursor_acceleration(xi, params);

        let mut v = vi + accel * dt;
        let mut x = xi + v * dt;
        reflect(&mut x, &mut v, params);

        out.set_pos(x);
        out.set_vel(v);
        out.set_density(me.density());
        out.set_pressure(p_i);
    }
}

/// Attraction toward the cursor with linear falloff inside its radius
pub fn cursor_acceleration(position: Vec3, params: &SimParams) -> Vec3 {
    let strength = params.cursor_strength();
    let radius = params.cursor_radius();
    if strength == 0.0 || radius <= 0.0 {
        return Vec3::ZERO;
    }
    let to_cursor = params.cursor_position() - position;
    let dist = to_cursor.length();
    if dist >= radius || dist <= params.eps {
        return Vec3::ZERO;
    }
    to_cursor / dist * strength * (1.0 - dist / radius)
}

/// Clamp to the domain and flip the outgoing velocity component, scaled by
/// the bounce damping.
pub fn reflect(position: &mut Vec3, velocity: &mut Vec3, params: &SimParams) {
    let lo = params.domain_min();
    let hi = params.domain_max();
    for axis in 0..3 {
        if position[axis] < lo[axis] {
            position[axis] = lo[axis];
            velocity[axis] = -velocity[axis] * params.bounce_damping;
        } else if position[axis] > hi[axis] {
            position[axis] = hi[axis];
            velocity[axis] = -velocity[axis] * params.bounce_damping;
        }
    }
}

/// One full step: density, then forces
pub fn step(particles: &mut [Particle], params: &SimParams) {
    let snapshot = density_pass(particles, params);
    forces_pass(particles, &snapshot, params);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::CursorState;
    use crate::seed::{seed_lattice, Lattice, SeedBox};

    #[test]
    fn test_kernels_vanish_outside_support() {
        let h = 0.3;
        assert_eq!(poly6(h * h, h), 0.0);
        assert!(poly6(0.0, h) > 0.0);
        assert_eq!(spiky_gradient(Vec3::new(h, 0.0, 0.0), h), Vec3::ZERO);
        assert_eq!(spiky_gradient(Vec3::ZERO, h), Vec3::ZERO);
        assert_eq!(viscosity_laplacian(h, h), 0.0);
    }

    #[test]
    fn test_spiky_gradient_points_toward_neighbour() {
        // r = x_i - x_j along +X: gradient is along -X, so the pressure term pushes i away
        let g = spiky_gradient(Vec3::new(0.1, 0.0, 0.0), 0.3);
        assert!(g.x < 0.0);
        assert_eq!(g.y, 0.0);
    }

    #[test]
    fn test_density_positive_after_step() {
        let params = SimParams::default();
        let seed_box = SeedBox::default();
        let mut particles = seed_lattice(4096, &seed_box).unwrap();
        assert!(Lattice::new(4096, &seed_box).unwrap().spacing < params.smoothing_radius);

        step(&mut particles, &params);

        let self_density = params.particle_mass * poly6(0.0, params.smoothing_radius);
        for p in &particles {
            // Strictly more than the self term: every particle has lattice neighbours
            assert!(p.density() > self_density);
        }
    }

    #[test]
    fn test_forces_observe_fresh_density() {
        let params = SimParams::default();
        let seeded = seed_lattice(512, &SeedBox::default()).unwrap();

        let mut ordered = seeded.clone();
        step(&mut ordered, &params);

        // Forces reading stale (zero) density, as if the density pass never ran
        let mut stale = seeded.clone();
        forces_pass(&mut stale, &seeded, &params);

        let diff: f32 = ordered
            .iter()
            .zip(&stale)
            .map(|(a, b)| (a.vel() - b.vel()).length())
            .sum();
        assert!(diff > 1e-3, "velocity difference {diff}");
    }

    #[test]
    fn test_density_twice_never_moves_particles() {
        let params = SimParams::default();
        let mut particles = seed_lattice(216, &SeedBox::default()).unwrap();
        let before: Vec<Vec3> = particles.iter().map(|p| p.pos()).collect();

        density_pass(&mut particles, &params);
        density_pass(&mut particles, &params);

        for (p, x) in particles.iter().zip(before) {
            assert_eq!(p.pos(), x);
            assert_eq!(p.vel(), Vec3::ZERO);
        }

        let mut stepped = seed_lattice(216, &SeedBox::default()).unwrap();
        step(&mut stepped, &params);
        assert!(stepped.iter().any(|p| p.vel() != Vec3::ZERO));
    }

    #[test]
    #[should_panic(expected = "one record per particle")]
    fn test_forces_pass_rejects_short_snapshot() {
        let params = SimParams::default();
        let mut particles = seed_lattice(27, &SeedBox::default()).unwrap();
        let snapshot = density_pass(&mut particles, &params);
        forces_pass(&mut particles, &snapshot[..26], &params);
    }

    #[test]
    fn test_reflection_clamps_and_damps() {
        let params = SimParams::default();
        let mut x = Vec3::new(0.0, -2.0, 0.9);
        let mut v = Vec3::new(0.0, -1.0, 2.0);
        reflect(&mut x, &mut v, &params);

        assert_eq!(x, Vec3::new(0.0, -0.8, 0.8));
        assert!((v.y - params.bounce_damping).abs() < 1e-7);
        assert!((v.z + 2.0 * params.bounce_damping).abs() < 1e-7);
    }

    #[test]
    fn test_cursor_attracts_only_when_active() {
        let mut params = SimParams::default();
        let p = Vec3::new(0.2, 0.0, 0.0);
        assert_eq!(cursor_acceleration(p, &params), Vec3::ZERO);

        params.apply_cursor(&CursorState {
            position: Vec3::ZERO,
            radius: 0.8,
            strength: 40.0,
        });
        let a = cursor_acceleration(p, &params);
        assert!(a.x < 0.0);
        assert!((a.length() - 40.0 * (1.0 - 0.2 / 0.8)).abs() < 1e-4);

        // Outside the radius
        assert_eq!(cursor_acceleration(Vec3::new(1.0, 0.0, 0.0), &params), Vec3::ZERO);
    }
}
