//! Shatter Wall - a ball, a floor and a wall that breaks apart
//!
//! Core modules:
//! - `sim`: Frame-stepped simulation (ball, wall collision, fracture, fragments)
//! - `geometry`: Mesh generation (cube, plane, sphere, irregular shard)
//! - `camera`: Drag-driven orbit camera
//! - `scene`: Start/stop/restart lifecycle and per-frame orchestration
//! - `renderer`: Renderer collaborator (WebGPU and headless)
//! - `settings`: Data-driven scene configuration

pub mod camera;
pub mod clock;
pub mod error;
pub mod geometry;
pub mod renderer;
pub mod scene;
pub mod settings;
pub mod sim;

pub use camera::OrbitCamera;
pub use error::{ConfigError, RenderError, SceneError};
pub use scene::{RunState, Scene};
pub use settings::Settings;

/// Scene configuration constants
pub mod consts {
    /// Wall half-extents (width, height, depth)
    pub const WALL_HALF_WIDTH: f32 = 0.2;
    pub const WALL_HALF_HEIGHT: f32 = 2.5;
    pub const WALL_HALF_DEPTH: f32 = 5.0;
    /// Wall center
    pub const WALL_POSITION: [f32; 3] = [3.0, 2.5, 0.0];
    /// Lift applied to the wall meshes when drawn, keeps them off the floor plane
    pub const WALL_DRAW_LIFT: f32 = 0.01;

    /// Floor plane
    pub const FLOOR_POSITION: [f32; 3] = [0.0, 0.0, 0.0];
    pub const FLOOR_WIDTH: f32 = 25.0;
    pub const FLOOR_DEPTH: f32 = 25.0;

    /// Ball defaults
    pub const BALL_RADIUS: f32 = 0.5;
    /// Sphere tessellation (latitude and longitude bands)
    pub const SPHERE_BANDS: u32 = 50;

    /// Per-frame gravity (units/frame²)
    pub const GRAVITY: f32 = -0.002;
    /// Restitution for the ball against floor and wall
    pub const DAMPING: f32 = 0.6;
    /// Restitution for fragments against the floor
    pub const FRAGMENT_DAMPING: f32 = 0.25;
    /// Horizontal velocity kept per frame
    pub const FRICTION: f32 = 0.98;
    /// Below this |vy| after a bounce the ball snaps to rest
    pub const REST_THRESHOLD: f32 = 0.01;
    /// Horizontal speeds below this are zeroed
    pub const SLIDE_EPSILON: f32 = 0.001;
    /// Gap between a resting fragment and the floor
    pub const FRAGMENT_REST_OFFSET: f32 = 0.01;

    /// At or below this speed the wall only bounces the ball
    pub const V_BOUNCE: f32 = 0.15;
    /// At or above this speed the wall breaks outright
    pub const V_BREAK: f32 = 0.25;

    /// Fragment batch cap
    pub const MAX_FRAGMENTS: usize = 30;
    pub const FRAGMENT_MIN_HEIGHT: f32 = 0.01;
    pub const FRAGMENT_MAX_HEIGHT: f32 = 0.15;
    /// Share of the impacting velocity handed to fragments
    pub const FRAGMENT_SPEED_FACTOR: f32 = 0.65;
    /// Half-range of the symmetric velocity jitter
    pub const FRAGMENT_JITTER: f32 = 0.1;

    /// Orbit camera
    pub const CAMERA_DISTANCE: f32 = 30.0;
    pub const CAMERA_YAW: f32 = 0.0;
    pub const CAMERA_PITCH: f32 = 0.2;
    pub const CAMERA_SENSITIVITY: f32 = 0.01;

    /// Projection
    pub const FOV_Y_DEGREES: f32 = 45.0;
    pub const Z_NEAR: f32 = 0.1;
    pub const Z_FAR: f32 = 100.0;

    /// Background plane sits this far behind the origin, untouched by the view
    pub const BACKGROUND_DISTANCE: f32 = 100.0;
}

/// Wrap an angle into (-π, π]
#[inline]
pub fn wrap_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    while angle > PI {
        angle -= 2.0 * PI;
    }
    while angle <= -PI {
        angle += 2.0 * PI;
    }
    angle
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_wrap_angle_bounds() {
        assert_eq!(wrap_angle(0.5), 0.5);
        assert!((wrap_angle(PI + 0.5) - (-PI + 0.5)).abs() < 1e-5);
        assert!((wrap_angle(-PI - 0.5) - (PI - 0.5)).abs() < 1e-5);
        assert_eq!(wrap_angle(PI), PI);
        assert_eq!(wrap_angle(-PI), PI);
    }
}
