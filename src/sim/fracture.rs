//! Wall fracture
//!
//! Breaking the wall replaces it with a stub and a batch of fragments stacked
//! from the impact height toward the top of the wall. Each fragment gets a
//! shape drawn from a weighted table, a random spot on the wall's face and a
//! share of the ball's velocity.

use glam::Vec3;
use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use serde::{Deserialize, Serialize};

use super::state::{Fragment, RigidVolume, SceneState};
use crate::consts::MAX_FRAGMENTS;
use crate::error::SceneError;
use crate::geometry::{self, CubeFaces, MeshData};
use crate::settings::FractureSettings;

/// Fragment mesh variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FragmentShape {
    /// Wall-thick slab of random depth
    ThinSlab,
    /// Irregular 8-corner shard
    Shard,
    /// Wall-thick slab a quarter of the wall deep
    Slab,
}

impl FragmentShape {
    pub const ALL: [Self; 3] = [Self::ThinSlab, Self::Shard, Self::Slab];

    /// Build the mesh for this shape
    pub fn build<R: Rng + ?Sized>(
        self,
        wall: &RigidVolume,
        height: f32,
        min_height: f32,
        faces: CubeFaces,
        rng: &mut R,
    ) -> MeshData {
        let quarter_depth = wall.half_extents.z / 4.0;
        match self {
            Self::ThinSlab => {
                let depth = (quarter_depth * rng.random::<f32>()).max(min_height);
                geometry::cube(Vec3::new(wall.half_extents.x, height, depth), faces)
            }
            Self::Shard => geometry::irregular_polygon(rng),
            Self::Slab => geometry::cube(
                Vec3::new(wall.half_extents.x, height, quarter_depth),
                faces,
            ),
        }
    }
}

/// Discrete distribution over [`FragmentShape`]
#[derive(Debug, Clone)]
pub struct ShapeTable {
    index: WeightedIndex<u32>,
}

impl ShapeTable {
    /// Weights in [`FragmentShape::ALL`] order
    pub fn new(weights: [u32; 3]) -> Result<Self, SceneError> {
        let index = WeightedIndex::new(weights).map_err(|e| SceneError::ShapeTable(e.to_string()))?;
        Ok(Self { index })
    }
}

impl Distribution<FragmentShape> for ShapeTable {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> FragmentShape {
        FragmentShape::ALL[self.index.sample(rng)]
    }
}

/// Symmetric jitter in `[-half_range, half_range)`
fn jitter<R: Rng + ?Sized>(rng: &mut R, half_range: f32) -> f32 {
    (rng.random::<f32>() - 0.5) * 2.0 * half_range
}

/// Uniform sample between two bounds given in either order
fn sample_between<R: Rng + ?Sized>(rng: &mut R, a: f32, b: f32) -> f32 {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    if hi > lo { rng.random_range(lo..=hi) } else { lo }
}

/// Initial velocity of one fragment from the impacting ball velocity
///
/// Inside the partial-break band the x sign is kept; otherwise the result
/// always moves toward +x.
#[allow(clippy::if_same_then_else)]
pub fn fragment_velocity<R: Rng + ?Sized>(
    impact_velocity: Vec3,
    fracture: &FractureSettings,
    rng: &mut R,
) -> Vec3 {
    let k = fracture.speed_factor;
    let v = impact_velocity;
    let vy = v.y * k + jitter(rng, fracture.jitter);
    let vz = v.z * k + jitter(rng, fracture.jitter);

    let speed_x = v.x.abs();
    let vx = if speed_x >= fracture.v_bounce && speed_x < fracture.v_break {
        // Both signs take the same path here
        if v.x < 0.0 {
            v.x * k + jitter(rng, fracture.jitter)
        } else {
            v.x * k + jitter(rng, fracture.jitter)
        }
    } else if v.x < 0.0 {
        -v.x * k + jitter(rng, fracture.jitter)
    } else {
        v.x * k + jitter(rng, fracture.jitter)
    };

    Vec3::new(vx, vy, vz)
}

impl SceneState {
    /// Mark the wall broken and scatter fragments
    ///
    /// Returns `false` without touching anything if the wall is already
    /// broken. No fragments are made when there is no predicted impact.
    pub fn break_wall(&mut self) -> bool {
        if self.wall_state.broken {
            return false;
        }
        self.wall_state.broken = true;

        match self.wall_state.impact_point {
            Some(impact) => {
                let fragments = self.create_wall_fragments(impact, self.ball.velocity);
                log::info!(
                    "Wall broken at {impact}: {} fragments (ball velocity {})",
                    fragments.len(),
                    self.ball.velocity
                );
                self.wall_state.fragments = fragments;
            }
            None => log::info!("Wall broken without a predicted impact, no fragments"),
        }
        true
    }

    /// Generate the fragment batch for an impact
    ///
    /// Stops early once the stacking cursor passes the wall top plus the ball
    /// radius, so fewer than the configured count is normal. Meshes go into
    /// the scene's library.
    pub fn create_wall_fragments(&mut self, impact: Vec3, velocity: Vec3) -> Vec<Fragment> {
        let fracture = self.settings.fracture.clone();
        let gravity = self.settings.physics.gravity;
        let top = self.wall.top();
        let limit = top + self.ball.radius;
        let faces = if velocity.x.abs() >= fracture.v_bounce || velocity.z.abs() >= fracture.v_bounce
        {
            CubeFaces::OpenTop
        } else {
            CubeFaces::Closed
        };
        let (z_min, z_max) = (self.wall.min().z, self.wall.max().z);

        let count = fracture.fragment_count.min(MAX_FRAGMENTS);
        let mut fragments = Vec::with_capacity(count);
        let mut cursor = impact.y;

        for i in 0..count {
            let height = (fracture.max_height * self.rng.random::<f32>()).max(fracture.min_height);
            if cursor > limit {
                break;
            }

            let shape = self.shape_table.sample(&mut self.rng);
            let mesh = shape.build(&self.wall, height, fracture.min_height, faces, &mut self.rng);
            let handle = self.meshes.insert(mesh);

            let position = Vec3::new(
                impact.x,
                sample_between(&mut self.rng, cursor.min(top), top),
                sample_between(&mut self.rng, z_min, z_max),
            );
            let launch = fragment_velocity(velocity, &fracture, &mut self.rng);
            log::debug!("Fragment {i}: {shape:?} h={height:.3} at {position} moving {launch}");

            fragments.push(Fragment {
                mesh: handle,
                shape,
                position,
                velocity: launch,
                gravity,
                height,
            });
            cursor += height;
        }
        fragments
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::*;
    use crate::settings::Settings;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn state(seed: u64) -> SceneState {
        SceneState::new(Settings::default(), seed).unwrap()
    }

    fn still_fracture() -> FractureSettings {
        FractureSettings {
            jitter: 0.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_batch_bounds() {
        for seed in 0..40 {
            let mut s = state(seed);
            let impact = Vec3::new(2.8, 1.0, 5.0);
            let fragments = s.create_wall_fragments(impact, Vec3::new(0.3, 0.0, 0.0));
            assert!(!fragments.is_empty());
            assert!(fragments.len() <= MAX_FRAGMENTS);
            for f in &fragments {
                assert!((FRAGMENT_MIN_HEIGHT..=FRAGMENT_MAX_HEIGHT).contains(&f.height));
                assert_eq!(f.position.x, impact.x);
                assert!(f.position.y >= impact.y && f.position.y <= s.wall.top());
                assert!(f.position.z >= -5.0 && f.position.z <= 5.0);
                assert_eq!(f.gravity, GRAVITY);
                assert!(s.meshes.contains(f.mesh));
            }
        }
    }

    #[test]
    fn test_high_impact_stops_early() {
        let mut s = state(1);
        let above_limit = Vec3::new(2.8, s.wall.top() + s.ball.radius + 0.1, 5.0);
        let fragments = s.create_wall_fragments(above_limit, Vec3::new(0.3, 0.0, 0.0));
        assert!(fragments.is_empty());

        // Near the top only a handful fit before the cursor passes the limit
        let near_top = Vec3::new(2.8, s.wall.top() + 0.2, 5.0);
        let fragments = s.create_wall_fragments(near_top, Vec3::new(0.3, 0.0, 0.0));
        assert!(!fragments.is_empty());
        assert!(fragments.len() < MAX_FRAGMENTS);
    }

    #[test]
    fn test_break_wall_once() {
        let mut s = state(5);
        s.wall_state.impact_point = Some(Vec3::new(2.8, 2.0, 5.0));
        s.ball.velocity = Vec3::new(0.3, 0.0, 0.0);
        assert!(s.break_wall());
        let first: Vec<_> = s.wall_state.fragments.iter().map(|f| f.mesh).collect();
        assert!(!first.is_empty());
        let meshes = s.meshes.len();

        assert!(!s.break_wall());
        let second: Vec<_> = s.wall_state.fragments.iter().map(|f| f.mesh).collect();
        assert_eq!(first, second);
        assert_eq!(s.meshes.len(), meshes);
    }

    #[test]
    fn test_no_impact_no_fragments() {
        let mut s = state(5);
        s.wall_state.impact_point = None;
        assert!(s.break_wall());
        assert!(s.wall_state.broken);
        assert!(s.wall_state.fragments.is_empty());
    }

    #[test]
    fn test_fragment_velocity_sign_branches() {
        let mut rng = Pcg32::seed_from_u64(0);
        let f = still_fracture();
        let k = FRAGMENT_SPEED_FACTOR;

        // Partial band keeps the sign
        let v = fragment_velocity(Vec3::new(-0.2, 0.1, 0.05), &f, &mut rng);
        assert!((v.x - (-0.2 * k)).abs() < 1e-6);
        assert!((v.y - 0.1 * k).abs() < 1e-6);
        assert!((v.z - 0.05 * k).abs() < 1e-6);
        let v = fragment_velocity(Vec3::new(0.2, 0.0, 0.0), &f, &mut rng);
        assert!((v.x - 0.2 * k).abs() < 1e-6);

        // Outside the band the result heads toward +x
        let v = fragment_velocity(Vec3::new(-0.3, 0.0, 0.0), &f, &mut rng);
        assert!((v.x - 0.3 * k).abs() < 1e-6);
        let v = fragment_velocity(Vec3::new(0.3, 0.0, 0.0), &f, &mut rng);
        assert!((v.x - 0.3 * k).abs() < 1e-6);
        let v = fragment_velocity(Vec3::new(-0.1, 0.0, 0.0), &f, &mut rng);
        assert!((v.x - 0.1 * k).abs() < 1e-6);
    }

    #[test]
    fn test_jitter_is_bounded() {
        let mut rng = Pcg32::seed_from_u64(9);
        let f = FractureSettings::default();
        for _ in 0..500 {
            let v = fragment_velocity(Vec3::new(0.3, 0.1, 0.0), &f, &mut rng);
            assert!((v.y - 0.1 * f.speed_factor).abs() <= f.jitter + 1e-6);
            assert!(v.z.abs() <= f.jitter + 1e-6);
        }
    }

    #[test]
    fn test_shape_table_covers_all_shapes() {
        let table = ShapeTable::new([33, 33, 34]).unwrap();
        let mut rng = Pcg32::seed_from_u64(11);
        let mut seen = [0usize; 3];
        for _ in 0..3000 {
            let shape = table.sample(&mut rng);
            let idx = FragmentShape::ALL.iter().position(|s| *s == shape).unwrap();
            seen[idx] += 1;
        }
        for count in seen {
            assert!(count > 800 && count < 1200, "skewed shape counts {seen:?}");
        }
    }

    #[test]
    fn test_shape_table_rejects_zero_weights() {
        assert!(matches!(
            ShapeTable::new([0, 0, 0]),
            Err(SceneError::ShapeTable(_))
        ));
        let table = ShapeTable::new([0, 1, 0]).unwrap();
        let mut rng = Pcg32::seed_from_u64(2);
        assert_eq!(table.sample(&mut rng), FragmentShape::Shard);
    }

    #[test]
    fn test_fast_impact_opens_slabs() {
        let wall = RigidVolume::new(Vec3::new(3.0, 2.5, 0.0), Vec3::new(0.2, 2.5, 5.0));
        let mut rng = Pcg32::seed_from_u64(4);
        let slab = FragmentShape::Slab.build(&wall, 0.1, 0.01, CubeFaces::OpenTop, &mut rng);
        assert_eq!(slab.triangle_count(), 10);
        assert_eq!(slab.bounds().1, Vec3::new(0.2, 0.1, 1.25));

        let thin = FragmentShape::ThinSlab.build(&wall, 0.1, 0.01, CubeFaces::Closed, &mut rng);
        assert_eq!(thin.triangle_count(), 12);
        let depth = thin.bounds().1.z;
        assert!((0.01..=1.25).contains(&depth));
    }

    proptest! {
        #[test]
        fn prop_fragments_stay_in_bounds(
            seed in any::<u64>(),
            impact_y in 0.5f32..6.0,
            vx in -0.5f32..0.5,
            vz in -0.5f32..0.5,
        ) {
            let mut s = state(seed);
            let impact = Vec3::new(2.8, impact_y, 5.0);
            let velocity = Vec3::new(vx, 0.06, vz);
            let top = s.wall.top();
            let fragments = s.create_wall_fragments(impact, velocity);

            prop_assert!(fragments.len() <= MAX_FRAGMENTS);
            for f in &fragments {
                prop_assert!((FRAGMENT_MIN_HEIGHT..=FRAGMENT_MAX_HEIGHT).contains(&f.height));
                prop_assert!(f.position.y >= impact_y.min(top) - 1e-5);
                prop_assert!(f.position.y <= top + 1e-5);
                prop_assert!(f.position.z.abs() <= 5.0 + 1e-5);
                prop_assert!((f.velocity.y - velocity.y * FRAGMENT_SPEED_FACTOR).abs() <= FRAGMENT_JITTER + 1e-5);
                prop_assert!((f.velocity.z - velocity.z * FRAGMENT_SPEED_FACTOR).abs() <= FRAGMENT_JITTER + 1e-5);
            }
        }
    }
}
