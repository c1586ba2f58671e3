//! SPH parameters for runtime tuning

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use thiserror::Error;

use crate::constants::{CURSOR_RADIUS, DOMAIN_HALF_EXTENT};

#[derive(Debug, Error, PartialEq)]
pub enum ParamsError {
    #[error("parameter `{field}` is not finite ({value})")]
    NonFinite { field: &'static str, value: f32 },
}

/// Parameter block shared with the compute kernel.
///
/// Field order and grouping match the WGSL `SimParams` uniform exactly. Every
/// group is 16 bytes so the vec4 members land on 16-byte boundaries.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct SimParams {
    // Group 1: Force scales & equation of state
    pub scale_pressure: f32,
    pub scale_viscosity: f32,
    pub scale_gravity: f32,
    pub gas_constant: f32,

    // Group 2: Fluid & integration
    pub rest_density: f32,
    pub time_step: f32,
    pub smoothing_radius: f32,
    pub viscosity: f32,

    // Group 3: External & numerical
    pub gravity: f32,
    pub particle_mass: f32,
    pub eps: f32,
    pub bounce_damping: f32,

    // Group 4: xyz = min corner, w = padding
    pub min_domain_bound: [f32; 4],

    // Group 5: xyz = max corner, w = padding
    pub max_domain_bound: [f32; 4],

    // Group 6 (cursor extension): xyz = world position, w = radius
    pub cursor_data: [f32; 4],

    // Group 7 (cursor extension): xyz = padding, w = strength (0 = inactive)
    pub cursor_force: [f32; 4],
}

impl Default for SimParams {
    fn default() -> Self {
        let x = DOMAIN_HALF_EXTENT;
        Self {
            scale_pressure: 3.0,
            scale_viscosity: 2.0,
            scale_gravity: 1.0,
            gas_constant: 1.5,

            rest_density: 15.0,
            time_step: 0.05,
            smoothing_radius: 0.3,
            viscosity: 100.0,

            gravity: 9.8,
            particle_mass: 0.1,
            eps: 0.01,
            bounce_damping: 0.002,

            min_domain_bound: [-x, -x, -x, 0.0],
            max_domain_bound: [x, x, x, 0.0],

            cursor_data: [0.0, 0.0, 0.0, CURSOR_RADIUS],
            cursor_force: [0.0; 4],
        }
    }
}

impl SimParams {
    pub fn domain_min(&self) -> Vec3 {
        Vec3::from_slice(&self.min_domain_bound[..3])
    }

    pub fn domain_max(&self) -> Vec3 {
        Vec3::from_slice(&self.max_domain_bound[..3])
    }

    pub fn cursor_position(&self) -> Vec3 {
        Vec3::from_slice(&self.cursor_data[..3])
    }

    pub fn cursor_radius(&self) -> f32 {
        self.cursor_data[3]
    }

    pub fn cursor_strength(&self) -> f32 {
        self.cursor_force[3]
    }

    /// Nonzero strength means the cursor field is active
    pub fn cursor_active(&self) -> bool {
        self.cursor_force[3] != 0.0
    }

    /// Reject records the kernel cannot consume.
    ///
    /// Only non-finite values are rejected. Unstable but finite combinations
    /// are accepted as-is, and out-of-order domain bounds are logged but kept.
    pub fn validate(&self) -> Result<(), ParamsError> {
        let scalars = [
            ("scale_pressure", self.scale_pressure),
            ("scale_viscosity", self.scale_viscosity),
            ("scale_gravity", self.scale_gravity),
            ("gas_constant", self.gas_constant),
            ("rest_density", self.rest_density),
            ("time_step", self.time_step),
            ("smoothing_radius", self.smoothing_radius),
            ("viscosity", self.viscosity),
            ("gravity", self.gravity),
            ("particle_mass", self.particle_mass),
            ("eps", self.eps),
            ("bounce_damping", self.bounce_damping),
        ];
        let vectors = [
            ("min_domain_bound", self.min_domain_bound),
            ("max_domain_bound", self.max_domain_bound),
            ("cursor_data", self.cursor_data),
            ("cursor_force", self.cursor_force),
        ];

        for (field, value) in scalars
            .into_iter()
            .chain(vectors.into_iter().flat_map(|(f, v)| v.map(|x| (f, x))))
        {
            if !value.is_finite() {
                return Err(ParamsError::NonFinite { field, value });
            }
        }

        if !self.bounds_ordered() {
            log::warn!(
                "Domain bounds are not ordered (min {:?}, max {:?}); passing through unchanged",
                self.domain_min(),
                self.domain_max()
            );
        }

        Ok(())
    }

    /// True when min < max on every axis
    pub fn bounds_ordered(&self) -> bool {
        self.domain_min().cmplt(self.domain_max()).all()
    }
}
