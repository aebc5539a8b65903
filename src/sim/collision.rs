//! Ball-vs-wall collision
//!
//! Two parts: an analytic projectile solve that predicts where the ball's
//! initial trajectory meets the wall, and the per-frame overlap test that
//! decides between bouncing the ball and breaking the wall.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::state::{Ball, RigidVolume};
use crate::settings::FractureSettings;

/// Horizontal speeds below this never reach the wall
const MIN_APPROACH_SPEED: f32 = 1e-6;

/// Predict where a projectile launched from `position` meets the wall
///
/// `gravity` is the downward acceleration magnitude (units/frame²). Time is
/// solved against the near face on X; the reported x and z snap to the face
/// on the side the ball starts from. Returns `None` for a (near) zero
/// horizontal speed or a negative discriminant.
pub fn impact_point(
    position: Vec3,
    velocity: Vec3,
    wall: &RigidVolume,
    gravity: f32,
) -> Option<Vec3> {
    if velocity.x.abs() < MIN_APPROACH_SPEED {
        return None;
    }

    let near_x = wall.position.x - wall.half_extents.x;
    let t = (near_x - position.x) / velocity.x;

    let discriminant = velocity.y * velocity.y + 2.0 * gravity * position.y;
    if discriminant < 0.0 {
        log::warn!("No valid impact: negative discriminant {discriminant}");
        return None;
    }
    let y = position.y + velocity.y * t - 0.5 * gravity * t * t;

    let x = if position.x < near_x {
        near_x
    } else {
        wall.position.x + wall.half_extents.x
    };
    let near_z = wall.position.z - wall.half_extents.z;
    let z = if position.z < near_z {
        near_z
    } else {
        wall.position.z + wall.half_extents.z
    };

    Some(Vec3::new(x, y, z))
}

/// Outcome of a wall contact along one horizontal axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AxisImpact {
    /// `|v| <= v_bounce`: reflected with full damping
    Bounce,
    /// Between the thresholds: wall breaks, ball reflected with half damping
    PartialBreak,
    /// `|v| >= v_break`: wall breaks, ball keeps going
    Break,
}

impl AxisImpact {
    pub fn classify(speed: f32, thresholds: &FractureSettings) -> Self {
        let speed = speed.abs();
        if speed <= thresholds.v_bounce {
            Self::Bounce
        } else if speed >= thresholds.v_break {
            Self::Break
        } else {
            Self::PartialBreak
        }
    }

    pub fn breaks(self) -> bool {
        !matches!(self, Self::Bounce)
    }
}

/// A wall contact, classified per axis from the pre-contact velocity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WallHit {
    pub x: AxisImpact,
    pub z: AxisImpact,
}

impl WallHit {
    pub fn breaks(&self) -> bool {
        self.x.breaks() || self.z.breaks()
    }
}

/// Overlap test for an intact wall
///
/// Requires a predicted impact below the wall's top plus the ball radius and
/// a three-axis box overlap between the ball and the wall.
pub fn ball_hits_wall(
    ball: &Ball,
    wall: &RigidVolume,
    impact: Option<Vec3>,
    broken: bool,
) -> bool {
    let Some(impact) = impact else {
        return false;
    };
    !broken
        && impact.y < wall.top() + ball.radius
        && wall.intersects_ball(ball.position, ball.radius)
}

/// Full-damping reflection of every `Bounce` axis
pub fn apply_bounce(velocity: &mut Vec3, hit: &WallHit, damping: f32) {
    if hit.x == AxisImpact::Bounce {
        velocity.x = -velocity.x * damping;
    }
    if hit.z == AxisImpact::Bounce {
        velocity.z = -velocity.z * damping;
    }
}

/// Half-damping reflection of every `PartialBreak` axis
pub fn apply_partial_break(velocity: &mut Vec3, hit: &WallHit, damping: f32) {
    if hit.x == AxisImpact::PartialBreak {
        velocity.x = -velocity.x * damping / 2.0;
    }
    if hit.z == AxisImpact::PartialBreak {
        velocity.z = -velocity.z * damping / 2.0;
    }
}
