//! Renderer that only records what it was asked to draw

use std::collections::BTreeSet;

use glam::Mat4;
use serde::{Deserialize, Serialize};

use super::{Renderer, TextureHandle};
use crate::error::RenderError;
use crate::geometry::{MeshData, MeshHandle};

/// One recorded draw
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrawCall {
    pub mesh: MeshHandle,
    pub texture: TextureHandle,
    pub model_view: Mat4,
    pub triangles: usize,
}

/// Display-less renderer for tests and the native binary
#[derive(Debug, Clone, Default)]
pub struct HeadlessRenderer {
    pub size: (u32, u32),
    /// Texture sources in load order, indexed by handle
    pub textures: Vec<String>,
    /// Meshes that would currently hold GPU buffers
    pub uploaded: BTreeSet<MeshHandle>,
    pub released: Vec<MeshHandle>,
    pub projection: Mat4,
    /// Draws of the frame in progress
    pub draws: Vec<DrawCall>,
    /// Draws of the last completed frame
    pub last_frame: Vec<DrawCall>,
    pub frames: u64,
}

impl HeadlessRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: (width, height),
            ..Self::default()
        }
    }

    /// Handle of a texture by source name
    pub fn texture(&self, source: &str) -> Option<TextureHandle> {
        self.textures
            .iter()
            .position(|s| s == source)
            .map(|i| TextureHandle(i as u32))
    }
}

impl Renderer for HeadlessRenderer {
    fn viewport(&self) -> (u32, u32) {
        self.size
    }

    fn load_texture(&mut self, source: &str) -> TextureHandle {
        self.textures.push(source.to_string());
        TextureHandle(self.textures.len() as u32 - 1)
    }

    fn begin_frame(&mut self, projection: Mat4) {
        self.projection = projection;
        self.draws.clear();
    }

    fn draw(&mut self, handle: MeshHandle, mesh: &MeshData, texture: TextureHandle, model_view: Mat4) {
        self.uploaded.insert(handle);
        self.draws.push(DrawCall {
            mesh: handle,
            texture,
            model_view,
            triangles: mesh.triangle_count(),
        });
    }

    fn release_mesh(&mut self, handle: MeshHandle) {
        self.uploaded.remove(&handle);
        self.released.push(handle);
    }

    fn end_frame(&mut self) -> Result<(), RenderError> {
        self.last_frame = std::mem::take(&mut self.draws);
        self.frames += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::plane;

    #[test]
    fn test_records_frame() {
        let mut renderer = HeadlessRenderer::new(800, 600);
        let floor = renderer.load_texture("floor.png");
        assert_eq!(renderer.texture("floor.png"), Some(floor));
        assert_eq!(renderer.viewport(), (800, 600));

        let mesh = plane(2.0, 2.0);
        renderer.begin_frame(Mat4::IDENTITY);
        renderer.draw(MeshHandle(3), &mesh, floor, Mat4::IDENTITY);
        renderer.end_frame().unwrap();

        assert_eq!(renderer.frames, 1);
        assert_eq!(renderer.last_frame.len(), 1);
        assert_eq!(renderer.last_frame[0].triangles, 2);
        assert!(renderer.draws.is_empty());
        assert!(renderer.uploaded.contains(&MeshHandle(3)));
    }

    #[test]
    fn test_release_forgets_upload() {
        let mut renderer = HeadlessRenderer::new(1, 1);
        let texture = renderer.load_texture("wall.png");
        renderer.draw(MeshHandle(1), &plane(1.0, 1.0), texture, Mat4::IDENTITY);
        renderer.release_mesh(MeshHandle(1));
        assert!(renderer.uploaded.is_empty());
        assert_eq!(renderer.released, vec![MeshHandle(1)]);
    }
}
