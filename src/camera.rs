//! Orbit camera driven by pointer drags

use glam::{Mat4, Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::settings::CameraSettings;
use crate::wrap_angle;

/// Camera orbiting a fixed center at constant distance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrbitCamera {
    /// Rotation around Y (radians, (-π, π])
    pub yaw: f32,
    /// Elevation (radians, (-π, π])
    pub pitch: f32,
    pub distance: f32,
    /// Look-at point
    pub center: Vec3,
    /// Radians per pixel of drag
    pub sensitivity: f32,
    pub dragging: bool,
    pub last_pointer: Vec2,
}

impl OrbitCamera {
    pub fn new(settings: &CameraSettings, center: Vec3) -> Self {
        Self {
            yaw: wrap_angle(settings.yaw),
            pitch: wrap_angle(settings.pitch),
            distance: settings.distance,
            center,
            sensitivity: settings.sensitivity,
            dragging: false,
            last_pointer: Vec2::ZERO,
        }
    }

    pub fn pointer_down(&mut self, x: f32, y: f32) {
        self.dragging = true;
        self.last_pointer = Vec2::new(x, y);
    }

    /// Rotate by the movement since the last pointer event, if dragging
    pub fn pointer_move(&mut self, x: f32, y: f32) {
        if !self.dragging {
            return;
        }
        let pointer = Vec2::new(x, y);
        let delta = pointer - self.last_pointer;
        self.on_drag(delta.x, delta.y);
        self.last_pointer = pointer;
    }

    pub fn pointer_up(&mut self) {
        self.dragging = false;
    }

    pub fn on_drag(&mut self, delta_x: f32, delta_y: f32) {
        self.yaw = wrap_angle(self.yaw + delta_x * self.sensitivity);
        self.pitch = wrap_angle(self.pitch + delta_y * self.sensitivity);
    }

    pub fn eye(&self) -> Vec3 {
        self.center + orbit_offset(self.yaw, self.pitch, self.distance)
    }

    pub fn view_matrix(&self) -> Mat4 {
        view_matrix(self.yaw, self.pitch, self.distance, self.center)
    }
}

fn orbit_offset(yaw: f32, pitch: f32, distance: f32) -> Vec3 {
    let (sin_yaw, cos_yaw) = yaw.sin_cos();
    let (sin_pitch, cos_pitch) = pitch.sin_cos();
    Vec3::new(
        sin_yaw * cos_pitch * distance,
        sin_pitch * distance,
        cos_yaw * cos_pitch * distance,
    )
}

/// Right-handed look-at from the orbit position toward `center`, +Y up
///
/// Straight above or below the center the yaw heading stands in for up.
pub fn view_matrix(yaw: f32, pitch: f32, distance: f32, center: Vec3) -> Mat4 {
    let eye = center + orbit_offset(yaw, pitch, distance);
    let up = if pitch.cos().abs() < 1e-4 {
        let heading = -Vec3::new(yaw.sin(), 0.0, yaw.cos());
        if pitch.sin() > 0.0 { heading } else { -heading }
    } else {
        Vec3::Y
    };
    Mat4::look_at_rh(eye, center, up)
}

/// Perspective projection with a vertical field of view in degrees
pub fn projection_matrix(settings: &CameraSettings, aspect: f32) -> Mat4 {
    Mat4::perspective_rh(
        settings.fov_y_degrees.to_radians(),
        aspect.max(1e-3),
        settings.z_near,
        settings.z_far,
    )
}
