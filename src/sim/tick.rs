//! Per-frame simulation step
//!
//! One step per rendered frame: wall collision, then fragments, then the ball.

use serde::{Deserialize, Serialize};

use super::ball::step_ball;
use super::collision::{
    AxisImpact, WallHit, apply_bounce, apply_partial_break, ball_hits_wall,
};
use super::fragments::step_fragments;
use super::state::SceneState;

/// What happened during a step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    /// The ball touched the intact wall
    pub wall_hit: Option<WallHit>,
    /// This step broke the wall
    pub wall_broken: bool,
}

/// Resolve a ball contact with the intact wall
///
/// Each horizontal axis is classified from the velocity before any response.
/// Bounce axes reflect first, the wall then breaks at most once using the
/// velocity at that moment, and partial-break axes reflect with half damping
/// last.
pub fn resolve_wall_collision(state: &mut SceneState, report: &mut TickReport) {
    if !ball_hits_wall(
        &state.ball,
        &state.wall,
        state.wall_state.impact_point,
        state.wall_state.broken,
    ) {
        return;
    }

    let fracture = &state.settings.fracture;
    let hit = WallHit {
        x: AxisImpact::classify(state.ball.velocity.x, fracture),
        z: AxisImpact::classify(state.ball.velocity.z, fracture),
    };
    let damping = state.settings.physics.damping;
    report.wall_hit = Some(hit);

    apply_bounce(&mut state.ball.velocity, &hit, damping);
    if hit.breaks() {
        log::info!("Collision detected ({hit:?}), breaking wall");
        report.wall_broken = state.break_wall();
    }
    apply_partial_break(&mut state.ball.velocity, &hit, damping);
}

/// Advance the scene by one frame
pub fn tick(state: &mut SceneState) -> TickReport {
    let mut report = TickReport::default();

    resolve_wall_collision(state, &mut report);

    let physics = &state.settings.physics;
    step_fragments(&mut state.wall_state.fragments, &state.floor, physics);
    step_ball(&mut state.ball, &state.floor, physics);

    state.frame += 1;
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::*;
    use crate::settings::{Settings, Span};
    use glam::Vec3;

    /// Scene with a deterministic ball start
    fn scene(position: Vec3, velocity: Vec3) -> SceneState {
        let mut settings = Settings::default();
        settings.ball.start_x = Span::fixed(position.x);
        settings.ball.start_y = Span::fixed(position.y);
        settings.ball.start_z = Span::fixed(position.z);
        settings.ball.velocity_x = Span::fixed(velocity.x);
        settings.ball.velocity_y = Span::fixed(velocity.y);
        settings.ball.velocity_z = Span::fixed(velocity.z);
        SceneState::new(settings, 7).unwrap()
    }

    #[test]
    fn test_fast_ball_breaks_wall() {
        let mut state = scene(Vec3::new(-5.0, 3.0, 0.0), Vec3::new(0.3, 0.06, 0.0));
        assert!(state.wall_state.impact_point.is_some());

        let near_face = state.wall.min().x;
        let mut reached_at = None;
        let mut broken_at = None;
        for frame in 0..200u32 {
            let report = tick(&mut state);
            if report.wall_broken {
                broken_at = Some(frame);
                break;
            }
            if reached_at.is_none() && state.ball.position.x + state.ball.radius >= near_face {
                reached_at = Some(frame);
            }
        }

        let reached_at = reached_at.unwrap();
        let broken_at = broken_at.unwrap();
        // Collision runs before the ball moves, so the break lands on the next step
        assert_eq!(broken_at, reached_at + 1);
        assert!(state.wall_state.broken);
        assert!(!state.wall_state.fragments.is_empty());
    }

    #[test]
    fn test_partial_break_half_damps() {
        let mut state = scene(Vec3::new(2.4, 3.0, 0.0), Vec3::new(0.2, 0.0, 0.0));
        let before = state.ball.velocity.x;
        let report = tick(&mut state);
        assert!(report.wall_broken);
        assert_eq!(
            report.wall_hit.map(|h| h.x),
            Some(AxisImpact::PartialBreak)
        );
        // Collision response happens before the ball step, which only applies
        // gravity to y and leaves x alone
        assert!((state.ball.velocity.x - (-before * DAMPING / 2.0)).abs() < 1e-6);
        assert!(!state.wall_state.fragments.is_empty());
    }

    #[test]
    fn test_slow_ball_bounces_off_intact_wall() {
        let mut state = scene(Vec3::new(2.4, 3.0, 0.0), Vec3::new(0.1, 0.0, 0.0));
        let report = tick(&mut state);
        assert_eq!(report.wall_hit.map(|h| h.x), Some(AxisImpact::Bounce));
        assert!(!report.wall_broken);
        assert!(!state.wall_state.broken);
        assert!((state.ball.velocity.x + 0.1 * DAMPING).abs() < 1e-6);
    }

    #[test]
    fn test_fracture_happens_once() {
        let mut state = scene(Vec3::new(2.4, 3.0, 0.0), Vec3::new(0.3, 0.0, 0.0));
        assert!(tick(&mut state).wall_broken);
        let meshes = state.meshes.len();
        let handles: Vec<_> = state.wall_state.fragments.iter().map(|f| f.mesh).collect();

        // Park the ball inside the wall volume again
        state.ball.position = Vec3::new(2.9, 3.0, 0.0);
        state.ball.velocity = Vec3::new(0.3, 0.0, 0.3);
        for _ in 0..5 {
            let report = tick(&mut state);
            assert!(!report.wall_broken);
            assert!(report.wall_hit.is_none());
        }
        assert_eq!(state.meshes.len(), meshes);
        let after: Vec<_> = state.wall_state.fragments.iter().map(|f| f.mesh).collect();
        assert_eq!(handles, after);
    }

    #[test]
    fn test_no_impact_never_breaks() {
        let mut state = scene(Vec3::new(2.4, 3.0, 0.0), Vec3::new(0.3, 0.0, 0.0));
        state.wall_state.impact_point = None;
        for _ in 0..10 {
            assert!(!tick(&mut state).wall_broken);
        }
        assert!(!state.wall_state.broken);
    }

    #[test]
    fn test_z_axis_alone_breaks() {
        let mut state = scene(Vec3::new(2.4, 3.0, 0.0), Vec3::new(0.05, 0.0, 0.3));
        let report = tick(&mut state);
        let hit = report.wall_hit.unwrap();
        assert_eq!(hit.x, AxisImpact::Bounce);
        assert_eq!(hit.z, AxisImpact::Break);
        assert!(report.wall_broken);
    }

    #[test]
    fn test_determinism() {
        let mut a = SceneState::new(Settings::default(), 99).unwrap();
        let mut b = SceneState::new(Settings::default(), 99).unwrap();
        for _ in 0..400 {
            assert_eq!(tick(&mut a), tick(&mut b));
        }
        assert_eq!(a.ball, b.ball);
        assert_eq!(a.wall_state, b.wall_state);
    }
}
