//! Frame-stepped simulation
//!
//! All scene logic lives here. This module stays free of rendering and
//! platform dependencies:
//! - One explicit Euler step per rendered frame
//! - Seeded RNG only, so a seed reproduces a run
//! - State passed explicitly, no globals

pub mod ball;
pub mod collision;
pub mod fracture;
pub mod fragments;
pub mod state;
pub mod tick;

pub use ball::{bounce_on_floor, step_ball};
pub use collision::{AxisImpact, WallHit, ball_hits_wall, impact_point};
pub use fracture::{FragmentShape, ShapeTable, fragment_velocity};
pub use fragments::step_fragments;
pub use state::{
    Ball, BallStart, Floor, Fragment, RigidVolume, SceneMeshes, SceneState, WallState,
};
pub use tick::{TickReport, resolve_wall_collision, tick};
