//! Ball integration and floor response

use super::state::{Ball, Floor};
use crate::settings::PhysicsSettings;

/// Advance the ball by one frame
///
/// Gravity is skipped only while the ball rests exactly on the floor. After
/// the Euler step, horizontal creep is zeroed and the floor response runs if
/// the next step would cross the floor plane.
#[allow(clippy::float_cmp)]
pub fn step_ball(ball: &mut Ball, floor: &Floor, physics: &PhysicsSettings) {
    let rest_y = floor.surface_y() + ball.radius;

    if ball.position.y != rest_y {
        ball.velocity.y += physics.gravity;
    }

    ball.position += ball.velocity;
    ball.roll();

    if ball.velocity.x.abs() < physics.slide_epsilon {
        ball.velocity.x = 0.0;
    }
    if ball.velocity.z.abs() < physics.slide_epsilon {
        ball.velocity.z = 0.0;
    }

    if ball.position.y + ball.velocity.y <= rest_y {
        bounce_on_floor(ball, floor, physics);
    }
}

/// Restitution and friction, only above the floor's footprint
///
/// Off the floor nothing happens and the ball keeps falling.
pub fn bounce_on_floor(ball: &mut Ball, floor: &Floor, physics: &PhysicsSettings) {
    if !floor.contains_xz(ball.position) {
        return;
    }

    ball.velocity.x *= physics.friction;
    ball.velocity.y = -ball.velocity.y * physics.damping;
    ball.velocity.z *= physics.friction;

    if ball.velocity.y.abs() < physics.rest_threshold {
        ball.position.y = floor.surface_y() + ball.radius;
        ball.roll();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::BallStart;
    use glam::Vec3;
    use proptest::prelude::*;

    fn floor() -> Floor {
        Floor {
            position: Vec3::ZERO,
            width: 25.0,
            depth: 25.0,
        }
    }

    fn ball(position: Vec3, velocity: Vec3) -> Ball {
        Ball::new(BallStart { position, velocity }, 0.5)
    }

    #[test]
    fn test_free_fall_adds_gravity() {
        let physics = PhysicsSettings::default();
        let mut b = ball(Vec3::new(0.0, 3.0, 0.0), Vec3::ZERO);
        step_ball(&mut b, &floor(), &physics);
        assert_eq!(b.velocity.y, -0.002);
        assert_eq!(b.position.y, 3.0 - 0.002);
    }

    #[test]
    fn test_resting_ball_skips_gravity() {
        let physics = PhysicsSettings::default();
        let mut b = ball(Vec3::new(0.0, 0.5, 0.0), Vec3::ZERO);
        step_ball(&mut b, &floor(), &physics);
        assert_eq!(b.position.y, 0.5);
        assert_eq!(b.velocity.y, 0.0);
    }

    #[test]
    fn test_rolling_rotation() {
        let physics = PhysicsSettings::default();
        let mut b = ball(Vec3::new(0.0, 3.0, 0.0), Vec3::new(0.1, 0.0, 0.05));
        step_ball(&mut b, &floor(), &physics);
        assert!((b.rotation_x - 0.1).abs() < 1e-6);
        assert!((b.rotation_z + 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_creep_is_zeroed() {
        let physics = PhysicsSettings::default();
        let mut b = ball(Vec3::new(0.0, 3.0, 0.0), Vec3::new(0.0005, 0.0, -0.0009));
        step_ball(&mut b, &floor(), &physics);
        assert_eq!(b.velocity.x, 0.0);
        assert_eq!(b.velocity.z, 0.0);
    }

    #[test]
    fn test_floor_bounce_damps_and_reflects() {
        let physics = PhysicsSettings::default();
        let mut b = ball(Vec3::new(0.0, 0.6, 0.0), Vec3::new(0.1, -0.1, 0.0));
        step_ball(&mut b, &floor(), &physics);
        // vy after gravity is -0.102, reflected with damping 0.6
        assert!((b.velocity.y - 0.102 * 0.6).abs() < 1e-6);
        assert!((b.velocity.x - 0.1 * 0.98).abs() < 1e-6);
    }

    #[test]
    fn test_slow_bounce_snaps_to_rest() {
        let physics = PhysicsSettings::default();
        let mut b = ball(Vec3::new(0.0, 0.504, 0.0), Vec3::new(0.0, -0.004, 0.0));
        step_ball(&mut b, &floor(), &physics);
        assert_eq!(b.position.y, 0.5);
        assert!(b.velocity.y > 0.0 && b.velocity.y < 0.01);
    }

    #[test]
    fn test_off_floor_keeps_falling() {
        let physics = PhysicsSettings::default();
        let mut b = ball(Vec3::new(20.0, 0.6, 0.0), Vec3::new(0.0, -0.2, 0.0));
        for _ in 0..10 {
            step_ball(&mut b, &floor(), &physics);
        }
        assert!(b.position.y < 0.0);
        assert!(b.velocity.y < -0.2);
    }

    proptest! {
        #[test]
        fn prop_ball_never_tunnels_through_floor(
            x in -9.0f32..9.0,
            y in 1.0f32..6.0,
            z in -9.0f32..9.0,
            vx in -0.05f32..0.05,
            vy in -0.3f32..0.3,
            vz in -0.05f32..0.05,
        ) {
            let physics = PhysicsSettings::default();
            let floor = floor();
            let mut b = ball(Vec3::new(x, y, z), Vec3::new(vx, vy, vz));
            for _ in 0..2000 {
                step_ball(&mut b, &floor, &physics);
                if floor.contains_xz(b.position) {
                    prop_assert!(b.position.y >= floor.surface_y() + b.radius - 0.01);
                }
            }
        }
    }
}
