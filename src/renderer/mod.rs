//! Rendering collaborator
//!
//! The scene hands meshes and transforms to a [`Renderer`] and never looks at
//! GPU state. `MeshRenderState` draws through WebGPU, `HeadlessRenderer`
//! records calls for tests and the native binary.

pub mod headless;
pub mod pipeline;
pub mod vertex;

pub use headless::{DrawCall, HeadlessRenderer};
pub use pipeline::MeshRenderState;
pub use vertex::Vertex;

use glam::Mat4;
use serde::{Deserialize, Serialize};

use crate::error::RenderError;
use crate::geometry::{MeshData, MeshHandle};

/// Opaque texture reference owned by a renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextureHandle(pub u32);

/// Something that can draw textured meshes
pub trait Renderer {
    /// Drawable size in pixels
    fn viewport(&self) -> (u32, u32);

    /// Register a texture by source name
    ///
    /// Returns immediately with a placeholder; the contents may be swapped in
    /// later without the caller noticing.
    fn load_texture(&mut self, source: &str) -> TextureHandle;

    fn begin_frame(&mut self, projection: Mat4);

    /// Queue one mesh for this frame
    ///
    /// `mesh` is only read when the renderer has not seen `handle` before.
    fn draw(&mut self, handle: MeshHandle, mesh: &MeshData, texture: TextureHandle, model_view: Mat4);

    /// Forget any cached buffers for a mesh
    fn release_mesh(&mut self, handle: MeshHandle);

    fn end_frame(&mut self) -> Result<(), RenderError>;
}
