//! Pointer-driven force field
//!
//! Screen coordinates arrive already captured by the input layer. They are
//! unprojected through the shared [`CameraContract`] onto the z = 0 plane and
//! stored, with the configured radius and strength, into [`CursorState`].

use glam::{Vec2, Vec3};
use thiserror::Error;

use crate::camera::CameraContract;
use crate::constants::{CURSOR_RADIUS, CURSOR_RADIUS_RANGE, CURSOR_STRENGTH, CURSOR_STRENGTH_RANGE};

#[derive(Debug, Error, PartialEq)]
pub enum CursorError {
    #[error("cursor update is missing the canvas rectangle")]
    MissingCanvas,
    #[error("canvas rectangle has no area ({width}x{height})")]
    DegenerateCanvas { width: f32, height: f32 },
    #[error("screen coordinates ({x}, {y}) are not finite")]
    NonFiniteScreen { x: f32, y: f32 },
    #[error("camera ray does not cross the z = 0 plane")]
    RayParallel,
}

/// Canvas bounding rectangle in screen pixels
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CanvasRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl CanvasRect {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(
            self.left + self.width * 0.5,
            self.top + self.height * 0.5,
        )
    }

    pub fn aspect(&self) -> f32 {
        self.width / self.height
    }

    fn check(&self) -> Result<(), CursorError> {
        let finite = [self.left, self.top, self.width, self.height]
            .iter()
            .all(|v| v.is_finite());
        if !finite || self.width <= 0.0 || self.height <= 0.0 {
            return Err(CursorError::DegenerateCanvas {
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }

    /// Map screen pixels to [-1, 1] with +Y up
    pub fn to_ndc(&self, screen: Vec2) -> Vec2 {
        Vec2::new(
            (screen.x - self.left) / self.width * 2.0 - 1.0,
            1.0 - (screen.y - self.top) / self.height * 2.0,
        )
    }
}

/// One pointer/touch update from the input layer
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CursorInput {
    pub screen: Vec2,
    /// True while a press or touch is held
    pub active: bool,
    pub canvas: Option<CanvasRect>,
}

impl CursorInput {
    pub fn pressed(screen: Vec2, canvas: CanvasRect) -> Self {
        Self {
            screen,
            active: true,
            canvas: Some(canvas),
        }
    }

    pub fn released(screen: Vec2, canvas: CanvasRect) -> Self {
        Self {
            screen,
            active: false,
            canvas: Some(canvas),
        }
    }
}

/// Host-side mirror of parameter groups 6-7
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CursorState {
    pub position: Vec3,
    pub radius: f32,
    /// 0 disables the field in the forces pass
    pub strength: f32,
}

impl CursorState {
    pub fn inactive(radius: f32) -> Self {
        Self {
            position: Vec3::ZERO,
            radius,
            strength: 0.0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.strength != 0.0
    }
}

/// Radius and strength applied while a press is active
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CursorConfig {
    pub radius: f32,
    pub strength: f32,
}

impl Default for CursorConfig {
    fn default() -> Self {
        Self {
            radius: CURSOR_RADIUS,
            strength: CURSOR_STRENGTH,
        }
    }
}

/// Project a screen point onto the z = 0 plane of the simulation domain
pub fn screen_to_world(
    screen: Vec2,
    canvas: &CanvasRect,
    camera: &CameraContract,
) -> Result<Vec3, CursorError> {
    if !screen.is_finite() {
        return Err(CursorError::NonFiniteScreen {
            x: screen.x,
            y: screen.y,
        });
    }
    canvas.check()?;

    let ndc = canvas.to_ndc(screen);
    let (origin, dir) = camera.ndc_ray(ndc.x, ndc.y, canvas.aspect());
    if dir.z.abs() < f32::EPSILON {
        return Err(CursorError::RayParallel);
    }

    let t = -origin.z / dir.z;
    let hit = origin + dir * t;
    Ok(Vec3::new(hit.x, hit.y, 0.0))
}

/// Turns pointer input into cursor state for the parameter block
#[derive(Clone, Debug)]
pub struct CursorForceField {
    config: CursorConfig,
    camera: CameraContract,
    state: CursorState,
}

impl CursorForceField {
    /// Out-of-range settings are clamped the same way the setters clamp them
    pub fn new(config: CursorConfig, camera: CameraContract) -> Self {
        let config = CursorConfig {
            radius: clamp_logged("cursor radius", config.radius, CURSOR_RADIUS_RANGE),
            strength: clamp_logged("cursor strength", config.strength, CURSOR_STRENGTH_RANGE),
        };
        Self {
            state: CursorState::inactive(config.radius),
            config,
            camera,
        }
    }

    pub fn state(&self) -> &CursorState {
        &self.state
    }

    pub fn config(&self) -> &CursorConfig {
        &self.config
    }

    pub fn camera(&self) -> &CameraContract {
        &self.camera
    }

    pub fn screen_to_world(&self, screen: Vec2, canvas: &CanvasRect) -> Result<Vec3, CursorError> {
        screen_to_world(screen, canvas, &self.camera)
    }

    /// Apply one pointer update and return the new state.
    ///
    /// A release always writes strength 0. A release without a canvas keeps
    /// the last position; a press without one is rejected and leaves the
    /// state untouched.
    pub fn update(&mut self, input: &CursorInput) -> Result<CursorState, CursorError> {
        let position = match (input.canvas, input.active) {
            (Some(canvas), _) => match self.screen_to_world(input.screen, &canvas) {
                Ok(position) => position,
                Err(err) if input.active => return Err(err),
                Err(_) => self.state.position,
            },
            (None, true) => return Err(CursorError::MissingCanvas),
            (None, false) => self.state.position,
        };

        self.state = CursorState {
            position,
            radius: self.config.radius,
            strength: if input.active { self.config.strength } else { 0.0 },
        };
        log::trace!("Cursor update: {:?}", self.state);
        Ok(self.state)
    }

    /// Drop any active press
    pub fn release(&mut self) -> CursorState {
        self.state.strength = 0.0;
        self.state
    }

    pub fn set_radius(&mut self, radius: f32) {
        self.config.radius = clamp_logged("cursor radius", radius, CURSOR_RADIUS_RANGE);
        self.state.radius = self.config.radius;
    }

    /// Takes effect on the next press
    pub fn set_strength(&mut self, strength: f32) {
        self.config.strength = clamp_logged("cursor strength", strength, CURSOR_STRENGTH_RANGE);
    }
}

fn clamp_logged(name: &str, value: f32, (min, max): (f32, f32)) -> f32 {
    let clamped = if value.is_nan() { min } else { value.clamp(min, max) };
    if clamped != value {
        log::warn!("{name} {value} outside [{min}, {max}], using {clamped}");
    }
    clamped
}
