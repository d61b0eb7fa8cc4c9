//! Perspective look-at camera.
//!
//! Derived matrices are recomputed eagerly by every mutator, so the accessors
//! never observe stale state. `update` and `update_projection_matrix` are kept
//! for callers that want to force a recompute; both are idempotent.

use glam::{Mat4, Vec3};

pub const DEFAULT_FOV_Y_DEG: f32 = 45.0;
pub const DEFAULT_NEAR: f32 = 0.1;
pub const DEFAULT_FAR: f32 = 1000.0;

/// Keeps the eye off the poles so the view basis stays well-defined.
const MAX_PITCH: f32 = 1.55;
const MIN_DISTANCE: f32 = 1.2;
const MAX_DISTANCE: f32 = 50.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    eye: Vec3,
    target: Vec3,
    up: Vec3,
    aspect: f32,
    fov_y: f32,
    near: f32,
    far: f32,

    view: Mat4,
    projection: Mat4,
    view_proj: Mat4,
    inv_view_proj: Mat4,
}

impl Camera {
    pub fn new(eye: Vec3, target: Vec3) -> Self {
        let mut camera = Self {
            eye,
            target,
            up: Vec3::Y,
            aspect: 1.0,
            fov_y: DEFAULT_FOV_Y_DEG.to_radians(),
            near: DEFAULT_NEAR,
            far: DEFAULT_FAR,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            view_proj: Mat4::IDENTITY,
            inv_view_proj: Mat4::IDENTITY,
        };
        camera.update_projection_matrix();
        camera
    }

    /// Recomputes the view matrix (and the combined forms) from eye, target and up.
    pub fn update(&mut self) {
        self.view = Mat4::look_at_rh(self.eye, self.target, self.up);
        self.combine();
    }

    /// Recomputes the projection from fov, aspect, near and far.
    pub fn update_projection_matrix(&mut self) {
        self.projection = Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far);
        self.update();
    }

    fn combine(&mut self) {
        self.view_proj = self.projection * self.view;
        self.inv_view_proj = self.view_proj.inverse();
    }

    /// Sets width / height. Non-positive or non-finite ratios are ignored.
    pub fn set_aspect_ratio(&mut self, ratio: f32) {
        if !(ratio.is_finite() && ratio > 0.0) {
            log::warn!("ignoring invalid aspect ratio {ratio}");
            return;
        }
        self.aspect = ratio;
        self.update_projection_matrix();
    }

    pub fn set_eye(&mut self, eye: Vec3) {
        self.eye = eye;
        self.update();
    }

    /// Rotates the eye around the target by yaw (about +Y) and pitch, in radians.
    pub fn orbit(&mut self, d_yaw: f32, d_pitch: f32) {
        let offset = self.eye - self.target;
        let distance = offset.length();
        if distance <= f32::EPSILON {
            return;
        }

        let yaw = offset.x.atan2(offset.z) + d_yaw;
        let pitch = ((offset.y / distance).asin() + d_pitch).clamp(-MAX_PITCH, MAX_PITCH);

        let dir = Vec3::new(pitch.cos() * yaw.sin(), pitch.sin(), pitch.cos() * yaw.cos());
        self.set_eye(self.target + dir * distance);
    }

    /// Scales the eye-target distance by `factor`, clamped to a sane range.
    pub fn zoom(&mut self, factor: f32) {
        if !(factor.is_finite() && factor > 0.0) {
            return;
        }
        let offset = self.eye - self.target;
        let distance = (offset.length() * factor).clamp(MIN_DISTANCE, MAX_DISTANCE);
        self.set_eye(self.target + offset.normalize_or(Vec3::Z) * distance);
    }

    pub fn position(&self) -> Vec3 {
        self.eye
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.aspect
    }

    pub fn view(&self) -> Mat4 {
        self.view
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    pub fn view_proj(&self) -> Mat4 {
        self.view_proj
    }

    pub fn inv_view_proj(&self) -> Mat4 {
        self.inv_view_proj
    }
}
