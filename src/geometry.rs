//! Mesh generation
//!
//! Pure data: every builder returns a [`MeshData`] with positions, normals,
//! UVs and `u16` triangle indices wound counter-clockwise when seen from
//! outside. Meshes never change after creation; the [`MeshLibrary`] hands out
//! handles so the same data can be drawn many times.

use std::collections::BTreeMap;
use std::f32::consts::PI;

use glam::{Vec2, Vec3};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Triangle mesh in object space
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub indices: Vec<u16>,
}

impl MeshData {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Axis-aligned bounds as (min, max)
    pub fn bounds(&self) -> (Vec3, Vec3) {
        self.positions.iter().fold(
            (Vec3::splat(f32::INFINITY), Vec3::splat(f32::NEG_INFINITY)),
            |(lo, hi), &p| (lo.min(p), hi.max(p)),
        )
    }
}

/// Opaque reference to a mesh stored in a [`MeshLibrary`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MeshHandle(pub u32);

/// Owns every mesh of the scene
///
/// Handles are allocated monotonically and never reused, so a renderer can
/// key GPU buffers by handle without worrying about stale entries.
#[derive(Debug, Default)]
pub struct MeshLibrary {
    meshes: BTreeMap<MeshHandle, MeshData>,
    next_id: u32,
}

impl MeshLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, mesh: MeshData) -> MeshHandle {
        let handle = MeshHandle(self.next_id);
        self.next_id += 1;
        self.meshes.insert(handle, mesh);
        handle
    }

    pub fn get(&self, handle: MeshHandle) -> Option<&MeshData> {
        self.meshes.get(&handle)
    }

    pub fn remove(&mut self, handle: MeshHandle) -> Option<MeshData> {
        self.meshes.remove(&handle)
    }

    pub fn contains(&self, handle: MeshHandle) -> bool {
        self.meshes.contains_key(&handle)
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    pub fn handles(&self) -> impl Iterator<Item = MeshHandle> + '_ {
        self.meshes.keys().copied()
    }
}

/// Which faces a box keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CubeFaces {
    Closed,
    /// Top face dropped, leaves a cracked-open slab
    OpenTop,
}

const CUBE_FACES: [(Vec3, [Vec3; 4], [Vec2; 4]); 6] = [
    // front
    (
        Vec3::Z,
        [
            Vec3::new(-1.0, -1.0, 1.0),
            Vec3::new(1.0, -1.0, 1.0),
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(-1.0, 1.0, 1.0),
        ],
        [
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 1.0),
        ],
    ),
    // back
    (
        Vec3::NEG_Z,
        [
            Vec3::new(-1.0, -1.0, -1.0),
            Vec3::new(-1.0, 1.0, -1.0),
            Vec3::new(1.0, 1.0, -1.0),
            Vec3::new(1.0, -1.0, -1.0),
        ],
        [
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 1.0),
            Vec2::new(0.0, 0.0),
        ],
    ),
    // top
    (
        Vec3::Y,
        [
            Vec3::new(-1.0, 1.0, -1.0),
            Vec3::new(-1.0, 1.0, 1.0),
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(1.0, 1.0, -1.0),
        ],
        [
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 1.0),
        ],
    ),
    // bottom
    (
        Vec3::NEG_Y,
        [
            Vec3::new(-1.0, -1.0, -1.0),
            Vec3::new(1.0, -1.0, -1.0),
            Vec3::new(1.0, -1.0, 1.0),
            Vec3::new(-1.0, -1.0, 1.0),
        ],
        [
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 1.0),
        ],
    ),
    // right
    (
        Vec3::X,
        [
            Vec3::new(1.0, -1.0, -1.0),
            Vec3::new(1.0, 1.0, -1.0),
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(1.0, -1.0, 1.0),
        ],
        [
            Vec2::new(0.0, 0.0),
            Vec2::new(0.0, 1.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(1.0, 0.0),
        ],
    ),
    // left
    (
        Vec3::NEG_X,
        [
            Vec3::new(-1.0, -1.0, -1.0),
            Vec3::new(-1.0, -1.0, 1.0),
            Vec3::new(-1.0, 1.0, 1.0),
            Vec3::new(-1.0, 1.0, -1.0),
        ],
        [
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 1.0),
        ],
    ),
];

const TOP_FACE: usize = 2;

/// Box centered on the origin with the given half-extents
///
/// All 24 vertices are always emitted; `OpenTop` only drops the top face's
/// indices.
pub fn cube(half_extents: Vec3, faces: CubeFaces) -> MeshData {
    let mut mesh = MeshData::default();
    for (face, (normal, corners, uvs)) in CUBE_FACES.iter().enumerate() {
        let base = mesh.positions.len() as u16;
        for (corner, uv) in corners.iter().zip(uvs) {
            mesh.positions.push(*corner * half_extents);
            mesh.normals.push(*normal);
            mesh.uvs.push(*uv);
        }
        if face == TOP_FACE && faces == CubeFaces::OpenTop {
            continue;
        }
        mesh.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    mesh
}

/// Horizontal quad of full size `width` x `depth`, facing +Y
pub fn plane(width: f32, depth: f32) -> MeshData {
    let (hw, hd) = (width / 2.0, depth / 2.0);
    MeshData {
        positions: vec![
            Vec3::new(-hw, 0.0, hd),
            Vec3::new(hw, 0.0, hd),
            Vec3::new(hw, 0.0, -hd),
            Vec3::new(-hw, 0.0, -hd),
        ],
        normals: vec![Vec3::Y; 4],
        uvs: quad_uvs(),
        indices: vec![0, 1, 2, 0, 2, 3],
    }
}

/// Vertical quad of full size `width` x `height`, facing +Z
pub fn background_plane(width: f32, height: f32) -> MeshData {
    let (hw, hh) = (width / 2.0, height / 2.0);
    MeshData {
        positions: vec![
            Vec3::new(-hw, -hh, 0.0),
            Vec3::new(hw, -hh, 0.0),
            Vec3::new(hw, hh, 0.0),
            Vec3::new(-hw, hh, 0.0),
        ],
        normals: vec![Vec3::Z; 4],
        uvs: quad_uvs(),
        indices: vec![0, 1, 2, 0, 2, 3],
    }
}

fn quad_uvs() -> Vec<Vec2> {
    vec![
        Vec2::new(0.0, 0.0),
        Vec2::new(1.0, 0.0),
        Vec2::new(1.0, 1.0),
        Vec2::new(0.0, 1.0),
    ]
}

/// UV sphere with `(lat + 1) * (lon + 1)` vertices
pub fn sphere(radius: f32, latitude_bands: u32, longitude_bands: u32) -> MeshData {
    let lat_bands = latitude_bands.max(2);
    let lon_bands = longitude_bands.max(3);
    let mut mesh = MeshData::default();

    for lat in 0..=lat_bands {
        let theta = lat as f32 * PI / lat_bands as f32;
        let (sin_theta, cos_theta) = theta.sin_cos();
        for lon in 0..=lon_bands {
            let phi = lon as f32 * 2.0 * PI / lon_bands as f32;
            let (sin_phi, cos_phi) = phi.sin_cos();
            let n = Vec3::new(cos_phi * sin_theta, cos_theta, sin_phi * sin_theta);
            mesh.positions.push(n * radius);
            mesh.normals.push(n);
            mesh.uvs.push(Vec2::new(
                1.0 - lon as f32 / lon_bands as f32,
                1.0 - lat as f32 / lat_bands as f32,
            ));
        }
    }

    for lat in 0..lat_bands {
        for lon in 0..lon_bands {
            let first = (lat * (lon_bands + 1) + lon) as u16;
            let second = first + lon_bands as u16 + 1;
            mesh.indices
                .extend_from_slice(&[first, first + 1, second, second, first + 1, second + 1]);
        }
    }
    mesh
}

/// Corner topology of the shard: 12 triangles over 8 corners
const SHARD_TRIANGLES: [[usize; 3]; 12] = [
    [0, 1, 2],
    [0, 2, 3],
    [4, 5, 6],
    [4, 6, 7],
    [0, 3, 7],
    [0, 7, 4],
    [1, 5, 6],
    [1, 6, 2],
    [0, 1, 5],
    [0, 5, 4],
    [3, 2, 6],
    [3, 6, 7],
];

/// Irregular shard: 8 random corners in x, z ∈ [-1, 1), y ∈ [0, 1)
///
/// Every triangle gets its own three vertices so normals stay flat. The
/// normal is the edge cross product, flipped (with the winding) to point away
/// from the corner centroid.
pub fn irregular_polygon<R: Rng + ?Sized>(rng: &mut R) -> MeshData {
    let corners: Vec<Vec3> = (0..8)
        .map(|_| {
            Vec3::new(
                rng.random_range(-1.0..1.0),
                rng.random::<f32>(),
                rng.random_range(-1.0..1.0),
            )
        })
        .collect();
    let centroid = corners.iter().copied().sum::<Vec3>() / corners.len() as f32;

    let mut mesh = MeshData::default();
    for tri in SHARD_TRIANGLES {
        let [mut a, b, mut c] = tri.map(|i| corners[i]);
        let mut normal = (b - a).cross(c - a);
        let face_center = (a + b + c) / 3.0;
        if normal.dot(face_center - centroid) < 0.0 {
            std::mem::swap(&mut a, &mut c);
            normal = -normal;
        }
        let normal = normal.try_normalize().unwrap_or(Vec3::Y);

        let base = mesh.positions.len() as u16;
        for p in [a, b, c] {
            mesh.positions.push(p);
            mesh.normals.push(normal);
            mesh.uvs.push(Vec2::new((p.x + 1.0) / 2.0, (p.y + 1.0) / 2.0));
        }
        mesh.indices.extend_from_slice(&[base, base + 1, base + 2]);
    }
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn assert_outward(mesh: &MeshData) {
        for tri in mesh.indices.chunks(3) {
            let [a, b, c] = [0, 1, 2].map(|i| mesh.positions[tri[i] as usize]);
            let winding = (b - a).cross(c - a);
            let normal = mesh.normals[tri[0] as usize];
            if winding.length_squared() > 1e-12 {
                assert!(winding.dot(normal) > 0.0, "triangle {tri:?} winds inward");
            }
        }
    }

    #[test]
    fn test_cube_counts() {
        let closed = cube(Vec3::new(0.2, 2.5, 5.0), CubeFaces::Closed);
        assert_eq!(closed.vertex_count(), 24);
        assert_eq!(closed.triangle_count(), 12);
        let (lo, hi) = closed.bounds();
        assert_eq!(lo, Vec3::new(-0.2, -2.5, -5.0));
        assert_eq!(hi, Vec3::new(0.2, 2.5, 5.0));
        assert_outward(&closed);

        let open = cube(Vec3::ONE, CubeFaces::OpenTop);
        assert_eq!(open.vertex_count(), 24);
        assert_eq!(open.triangle_count(), 10);
        assert!(open.indices.iter().all(|&i| !(8..12).contains(&i)));
    }

    #[test]
    fn test_planes() {
        let floor = plane(25.0, 25.0);
        assert_eq!(floor.triangle_count(), 2);
        assert_eq!(floor.bounds().1, Vec3::new(12.5, 0.0, 12.5));
        assert_outward(&floor);

        let bg = background_plane(800.0, 600.0);
        assert_eq!(bg.bounds().0, Vec3::new(-400.0, -300.0, 0.0));
        assert_outward(&bg);
    }

    #[test]
    fn test_sphere() {
        let mesh = sphere(0.5, 50, 50);
        assert_eq!(mesh.vertex_count(), 51 * 51);
        assert_eq!(mesh.indices.len(), 50 * 50 * 6);
        for (p, n) in mesh.positions.iter().zip(&mesh.normals) {
            assert!((p.length() - 0.5).abs() < 1e-4);
            assert!((n.length() - 1.0).abs() < 1e-4);
        }
        assert_outward(&mesh);
    }

    #[test]
    fn test_irregular_polygon() {
        let mut rng = Pcg32::seed_from_u64(3);
        let mesh = irregular_polygon(&mut rng);
        assert_eq!(mesh.triangle_count(), 12);
        assert_eq!(mesh.vertex_count(), 36);
        let (lo, hi) = mesh.bounds();
        assert!(lo.cmpge(Vec3::new(-1.0, 0.0, -1.0)).all());
        assert!(hi.cmplt(Vec3::ONE).all());
        for n in &mesh.normals {
            assert!((n.length() - 1.0).abs() < 1e-4);
        }
        assert_outward(&mesh);
    }

    #[test]
    fn test_library_handles_not_reused() {
        let mut lib = MeshLibrary::new();
        let a = lib.insert(plane(1.0, 1.0));
        let b = lib.insert(plane(2.0, 2.0));
        assert_ne!(a, b);
        assert!(lib.remove(a).is_some());
        let c = lib.insert(plane(3.0, 3.0));
        assert_ne!(a, c);
        assert_eq!(lib.len(), 2);
        assert!(!lib.contains(a));
    }
}
