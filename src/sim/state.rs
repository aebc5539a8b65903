//! Scene state and core simulation types
//!
//! Everything a frame step mutates lives in [`SceneState`], which is passed
//! explicitly to each step function.

use glam::Vec3;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::collision::impact_point;
use super::fracture::{FragmentShape, ShapeTable};
use crate::consts::SPHERE_BANDS;
use crate::error::SceneError;
use crate::geometry::{self, CubeFaces, MeshHandle, MeshLibrary};
use crate::settings::Settings;

/// Axis-aligned box: center plus half-extents
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RigidVolume {
    pub position: Vec3,
    pub half_extents: Vec3,
}

impl RigidVolume {
    pub fn new(position: Vec3, half_extents: Vec3) -> Self {
        Self {
            position,
            half_extents,
        }
    }

    pub fn min(&self) -> Vec3 {
        self.position - self.half_extents
    }

    pub fn max(&self) -> Vec3 {
        self.position + self.half_extents
    }

    /// Height of the top face
    pub fn top(&self) -> f32 {
        self.position.y + self.half_extents.y
    }

    /// Whether the cube `center ± radius` touches this box on all three axes
    pub fn intersects_ball(&self, center: Vec3, radius: f32) -> bool {
        let (lo, hi) = (self.min(), self.max());
        (center + radius).cmpge(lo).all() && (center - radius).cmple(hi).all()
    }
}

/// Horizontal floor rectangle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Floor {
    pub position: Vec3,
    /// Full extent along X
    pub width: f32,
    /// Full extent along Z
    pub depth: f32,
}

impl Floor {
    pub fn surface_y(&self) -> f32 {
        self.position.y
    }

    /// Closed test of the (x, z) footprint; y is ignored
    pub fn contains_xz(&self, p: Vec3) -> bool {
        (p.x - self.position.x).abs() <= self.width / 2.0
            && (p.z - self.position.z).abs() <= self.depth / 2.0
    }
}

/// Start state captured at scene creation, restored on restart
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BallStart {
    pub position: Vec3,
    pub velocity: Vec3,
}

/// The ball
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ball {
    pub position: Vec3,
    pub velocity: Vec3,
    pub radius: f32,
    /// Accumulated roll about X (radians, unbounded)
    pub rotation_x: f32,
    /// Accumulated roll about Z (radians, unbounded)
    pub rotation_z: f32,
}

impl Ball {
    pub fn new(start: BallStart, radius: f32) -> Self {
        Self {
            position: start.position,
            velocity: start.velocity,
            radius,
            rotation_x: 0.0,
            rotation_z: 0.0,
        }
    }

    /// Rolling without slipping over one frame of horizontal travel
    pub fn roll(&mut self) {
        self.rotation_x += self.velocity.z / self.radius;
        self.rotation_z += -self.velocity.x / self.radius;
    }
}

/// A piece of broken wall
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    pub mesh: MeshHandle,
    pub shape: FragmentShape,
    pub position: Vec3,
    pub velocity: Vec3,
    pub gravity: f32,
    /// Rest height above the floor
    pub height: f32,
}

/// Wall lifecycle: intact until broken, broken until restart
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WallState {
    pub broken: bool,
    /// Where the ball's initial trajectory meets the wall, if anywhere
    pub impact_point: Option<Vec3>,
    pub fragments: Vec<Fragment>,
}

/// Static meshes shared for the lifetime of a scene
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneMeshes {
    pub ball: MeshHandle,
    pub floor: MeshHandle,
    pub wall: MeshHandle,
    /// Remainder left standing below the impact point
    pub broken_wall: MeshHandle,
}

/// Complete simulation state
#[derive(Debug)]
pub struct SceneState {
    pub settings: Settings,
    pub seed: u64,
    pub rng: Pcg32,
    pub ball: Ball,
    pub ball_start: BallStart,
    pub wall: RigidVolume,
    pub floor: Floor,
    pub wall_state: WallState,
    pub meshes: MeshLibrary,
    pub scene_meshes: SceneMeshes,
    pub shape_table: ShapeTable,
    /// Frames stepped since the last restart
    pub frame: u64,
}

impl SceneState {
    /// Build a fresh scene; the ball start is drawn from `seed`
    pub fn new(settings: Settings, seed: u64) -> Result<Self, SceneError> {
        settings.validate()?;
        let mut rng = Pcg32::seed_from_u64(seed);

        let b = &settings.ball;
        let ball_start = BallStart {
            position: Vec3::new(
                b.start_x.sample(&mut rng),
                b.start_y.sample(&mut rng),
                b.start_z.sample(&mut rng),
            ),
            velocity: Vec3::new(
                b.velocity_x.sample(&mut rng),
                b.velocity_y.sample(&mut rng),
                b.velocity_z.sample(&mut rng),
            ),
        };
        let ball = Ball::new(ball_start, b.radius);

        let wall = RigidVolume::new(settings.wall.position, settings.wall.half_extents);
        let floor = Floor {
            position: settings.floor.position,
            width: settings.floor.width,
            depth: settings.floor.depth,
        };

        let impact = impact_point(
            ball_start.position,
            ball_start.velocity,
            &wall,
            -settings.physics.gravity,
        );
        match impact {
            Some(p) => log::info!("Predicted wall impact at {p}"),
            None => log::info!("Ball trajectory never reaches the wall"),
        }

        let mut meshes = MeshLibrary::new();
        let scene_meshes = SceneMeshes {
            ball: meshes.insert(geometry::sphere(b.radius, SPHERE_BANDS, SPHERE_BANDS)),
            floor: meshes.insert(geometry::plane(floor.width, floor.depth)),
            wall: meshes.insert(geometry::cube(wall.half_extents, CubeFaces::Closed)),
            broken_wall: meshes.insert(geometry::cube(
                Vec3::new(
                    wall.half_extents.x,
                    stub_half_height(impact, b.radius, settings.fracture.min_height),
                    wall.half_extents.z,
                ),
                CubeFaces::Closed,
            )),
        };
        let shape_table = ShapeTable::new(settings.fracture.shape_weights)?;

        log::info!(
            "Scene ready (seed {seed}): ball at {} moving {}",
            ball_start.position,
            ball_start.velocity
        );

        Ok(Self {
            settings,
            seed,
            rng,
            ball,
            ball_start,
            wall,
            floor,
            wall_state: WallState {
                broken: false,
                impact_point: impact,
                fragments: Vec::new(),
            },
            meshes,
            scene_meshes,
            shape_table,
            frame: 0,
        })
    }

    /// Put the ball back at its captured start and rebuild the wall
    ///
    /// Returns the fragment meshes dropped from the library so a renderer can
    /// release its copies. The impact point is kept: it belongs to the start
    /// state, which does not change.
    pub fn restart(&mut self) -> Vec<MeshHandle> {
        self.ball = Ball::new(self.ball_start, self.ball.radius);
        self.wall_state.broken = false;
        self.frame = 0;
        self.wall_state
            .fragments
            .drain(..)
            .map(|fragment| {
                self.meshes.remove(fragment.mesh);
                fragment.mesh
            })
            .collect()
    }

    /// Where the stub is drawn once the wall is broken
    pub fn broken_wall_position(&self) -> Vec3 {
        let half = stub_half_height(
            self.wall_state.impact_point,
            self.ball.radius,
            self.settings.fracture.min_height,
        );
        Vec3::new(self.wall.position.x, half, self.wall.position.z)
    }
}

/// Half-height of the stub left standing below the impact
fn stub_half_height(impact: Option<Vec3>, radius: f32, min_height: f32) -> f32 {
    impact
        .map(|p| ((p.y - radius) / 2.0).abs())
        .unwrap_or(0.0)
        .max(min_height)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_scene_samples_configured_ranges() {
        for seed in 0..50 {
            let state = SceneState::new(Settings::default(), seed).unwrap();
            let s = state.ball_start;
            assert!((-9.0..-5.0).contains(&s.position.x));
            assert!((1.0..5.0).contains(&s.position.y));
            assert_eq!(s.position.z, 0.0);
            assert!((0.0..0.35).contains(&s.velocity.x));
            assert_eq!(s.velocity.y, 0.06);
            assert!(!state.wall_state.broken);
            assert!(state.wall_state.fragments.is_empty());
            assert_eq!(state.meshes.len(), 4);
        }
    }

    #[test]
    fn test_same_seed_same_start() {
        let a = SceneState::new(Settings::default(), 42).unwrap();
        let b = SceneState::new(Settings::default(), 42).unwrap();
        assert_eq!(a.ball_start, b.ball_start);
        assert_eq!(a.wall_state.impact_point, b.wall_state.impact_point);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let mut settings = Settings::default();
        settings.ball.radius = -1.0;
        assert!(matches!(
            SceneState::new(settings, 1),
            Err(SceneError::Config(_))
        ));
    }

    #[test]
    fn test_wall_box() {
        let wall = RigidVolume::new(Vec3::new(3.0, 2.5, 0.0), Vec3::new(0.2, 2.5, 5.0));
        assert_eq!(wall.top(), 5.0);
        assert!(wall.intersects_ball(Vec3::new(2.35, 2.0, 0.0), 0.5));
        assert!(!wall.intersects_ball(Vec3::new(2.2, 2.0, 0.0), 0.5));
        assert!(!wall.intersects_ball(Vec3::new(3.0, 6.0, 0.0), 0.5));
        assert!(!wall.intersects_ball(Vec3::new(3.0, 2.0, 5.6), 0.5));
    }

    #[test]
    fn test_floor_footprint() {
        let floor = Floor {
            position: Vec3::ZERO,
            width: 25.0,
            depth: 25.0,
        };
        assert!(floor.contains_xz(Vec3::new(12.5, -3.0, -12.5)));
        assert!(!floor.contains_xz(Vec3::new(12.6, 0.0, 0.0)));
    }

    #[test]
    fn test_stub_height() {
        let impact = Some(Vec3::new(2.8, 3.5, 5.0));
        assert_eq!(stub_half_height(impact, 0.5, 0.01), 1.5);
        assert_eq!(stub_half_height(None, 0.5, 0.01), 0.01);
    }
}
