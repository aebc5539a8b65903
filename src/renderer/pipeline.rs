//! WebGPU mesh renderer
//!
//! One pipeline draws every mesh: textured, lit by an ambient plus a single
//! directional light. There is no depth attachment. Draws are sorted far to
//! near by their farthest view-space corner and back faces are culled, which
//! is enough for a scene of one ball, one wall, a floor and a few dozen
//! fragments.

use std::collections::HashMap;

use glam::{Mat4, Vec3};
use wgpu::util::DeviceExt;

use super::vertex::{DrawUniforms, Vertex};
use super::{Renderer, TextureHandle};
use crate::error::{RenderError, RenderResult};
use crate::geometry::{MeshData, MeshHandle};

/// Upper bound on draws per frame (ball, floor, wall, background and fragments)
pub const MAX_DRAWS: usize = 64;

/// Shown until an image has been decoded
const PLACEHOLDER_PIXEL: [u8; 4] = [0, 0, 255, 255];

const TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

/// Vertex and index buffers for one uploaded mesh
struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    bounds: (Vec3, Vec3),
}

struct GpuTexture {
    source: String,
    texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
}

struct QueuedDraw {
    mesh: MeshHandle,
    texture: TextureHandle,
    uniforms: DrawUniforms,
    depth: f32,
}

/// Main render state
pub struct MeshRenderState {
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub pipeline: wgpu::RenderPipeline,
    /// Viewport size in pixels
    pub size: (u32, u32),
    uniform_buffer: wgpu::Buffer,
    uniform_stride: wgpu::BufferAddress,
    uniform_bind_group: wgpu::BindGroup,
    texture_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    textures: Vec<GpuTexture>,
    meshes: HashMap<MeshHandle, GpuMesh>,
    projection: Mat4,
    queued: Vec<QueuedDraw>,
}

impl MeshRenderState {
    pub async fn new(
        surface: wgpu::Surface<'static>,
        adapter: &wgpu::Adapter,
        width: u32,
        height: u32,
    ) -> RenderResult<Self> {
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("shatter-wall-device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_webgl2_defaults(),
                memory_hints: Default::default(),
                trace: Default::default(),
                experimental_features: Default::default(),
            })
            .await?;

        let surface_caps = surface.get_capabilities(adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or(RenderError::SurfaceUnsupported)?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("mesh_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shader.wgsl").into()),
        });

        // Per-draw transforms live side by side in one buffer, selected with a
        // dynamic offset
        let uniform_size = std::mem::size_of::<DrawUniforms>() as wgpu::BufferAddress;
        let alignment = wgpu::BufferAddress::from(device.limits().min_uniform_buffer_offset_alignment);
        let uniform_stride = uniform_size.div_ceil(alignment) * alignment;

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("draw_uniforms"),
            size: uniform_stride * MAX_DRAWS as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("draw_uniform_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(uniform_size),
                },
                count: None,
            }],
        });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("draw_uniform_bind_group"),
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &uniform_buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(uniform_size),
                }),
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("texture_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("texture_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("mesh_pipeline_layout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("mesh_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[Vertex::desc()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        log::info!(
            "Mesh renderer ready: {}x{} {:?}, uniform stride {}",
            width,
            height,
            surface_format,
            uniform_stride
        );

        Ok(Self {
            surface,
            device,
            queue,
            config,
            pipeline,
            size: (width, height),
            uniform_buffer,
            uniform_stride,
            uniform_bind_group,
            texture_layout,
            sampler,
            textures: Vec::new(),
            meshes: HashMap::new(),
            projection: Mat4::IDENTITY,
            queued: Vec::new(),
        })
    }

    pub fn resize(&mut self, new_width: u32, new_height: u32) {
        if new_width > 0 && new_height > 0 {
            self.size = (new_width, new_height);
            self.config.width = new_width;
            self.config.height = new_height;
            self.surface.configure(&self.device, &self.config);
        }
    }

    /// Replace a texture's pixels with decoded RGBA8 data
    ///
    /// Same-sized images are written in place; otherwise the texture and its
    /// bind group are rebuilt under the same handle.
    pub fn update_texture(&mut self, handle: TextureHandle, width: u32, height: u32, rgba: &[u8]) {
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 || rgba.len() != expected {
            log::warn!(
                "Ignoring texture update for {:?}: {}x{} with {} bytes",
                handle,
                width,
                height,
                rgba.len()
            );
            return;
        }
        let Some(slot) = self.textures.get(handle.0 as usize) else {
            log::warn!("Ignoring texture update for unknown {:?}", handle);
            return;
        };

        let size = slot.texture.size();
        if size.width != width || size.height != height {
            let (texture, bind_group) = self.create_texture(&slot.source, width, height);
            let slot = &mut self.textures[handle.0 as usize];
            slot.texture = texture;
            slot.bind_group = bind_group;
        }

        let slot = &self.textures[handle.0 as usize];
        self.write_texture(&slot.texture, width, height, rgba);
        log::debug!("Texture '{}' loaded ({}x{})", slot.source, width, height);
    }

    /// Names of the registered textures, indexed by handle
    pub fn texture_sources(&self) -> impl Iterator<Item = &str> {
        self.textures.iter().map(|t| t.source.as_str())
    }

    fn create_texture(&self, label: &str, width: u32, height: u32) -> (wgpu::Texture, wgpu::BindGroup) {
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TEXTURE_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &self.texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });
        (texture, bind_group)
    }

    fn write_texture(&self, texture: &wgpu::Texture, width: u32, height: u32, rgba: &[u8]) {
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
    }

    fn upload(&self, mesh: &MeshData) -> Option<GpuMesh> {
        if mesh.indices.is_empty() {
            return None;
        }
        let vertices = Vertex::interleave(mesh);
        let vertex_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("mesh_vertices"),
                contents: bytemuck::cast_slice(&vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let index_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("mesh_indices"),
                contents: bytemuck::cast_slice(&mesh.indices),
                usage: wgpu::BufferUsages::INDEX,
            });
        Some(GpuMesh {
            vertex_buffer,
            index_buffer,
            index_count: mesh.indices.len() as u32,
            bounds: mesh.bounds(),
        })
    }
}

impl Renderer for MeshRenderState {
    fn viewport(&self) -> (u32, u32) {
        self.size
    }

    fn load_texture(&mut self, source: &str) -> TextureHandle {
        let (texture, bind_group) = self.create_texture(source, 1, 1);
        self.write_texture(&texture, 1, 1, &PLACEHOLDER_PIXEL);
        self.textures.push(GpuTexture {
            source: source.to_string(),
            texture,
            bind_group,
        });
        TextureHandle(self.textures.len() as u32 - 1)
    }

    fn begin_frame(&mut self, projection: Mat4) {
        self.projection = projection;
        self.queued.clear();
    }

    fn draw(&mut self, handle: MeshHandle, mesh: &MeshData, texture: TextureHandle, model_view: Mat4) {
        if !self.meshes.contains_key(&handle) {
            match self.upload(mesh) {
                Some(gpu) => {
                    self.meshes.insert(handle, gpu);
                }
                None => return,
            }
        }
        let Some(gpu) = self.meshes.get(&handle) else {
            return;
        };
        self.queued.push(QueuedDraw {
            mesh: handle,
            texture,
            uniforms: DrawUniforms::new(self.projection, model_view),
            depth: farthest_depth(gpu.bounds, model_view),
        });
    }

    fn release_mesh(&mut self, handle: MeshHandle) {
        self.meshes.remove(&handle);
    }

    fn end_frame(&mut self) -> Result<(), RenderError> {
        let mut queued = std::mem::take(&mut self.queued);
        if queued.len() > MAX_DRAWS {
            log::warn!("Dropping {} draws over the per-frame limit", queued.len() - MAX_DRAWS);
            queued.truncate(MAX_DRAWS);
        }
        queued.sort_by(|a, b| a.depth.total_cmp(&b.depth));

        let stride = self.uniform_stride as usize;
        let mut staging = vec![0u8; stride * queued.len().max(1)];
        for (slot, draw) in queued.iter().enumerate() {
            let bytes = bytemuck::bytes_of(&draw.uniforms);
            staging[slot * stride..slot * stride + bytes.len()].copy_from_slice(bytes);
        }
        self.queue.write_buffer(&self.uniform_buffer, 0, &staging);

        let output = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::debug!("Surface lost or outdated, reconfiguring");
                self.surface.configure(&self.device, &self.config);
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("render_encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("mesh_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            render_pass.set_pipeline(&self.pipeline);
            for (slot, draw) in queued.iter().enumerate() {
                let (Some(mesh), Some(texture)) = (
                    self.meshes.get(&draw.mesh),
                    self.textures.get(draw.texture.0 as usize),
                ) else {
                    continue;
                };
                let offset = (slot * stride) as wgpu::DynamicOffset;
                render_pass.set_bind_group(0, &self.uniform_bind_group, &[offset]);
                render_pass.set_bind_group(1, &texture.bind_group, &[]);
                render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                render_pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
                render_pass.draw_indexed(0..mesh.index_count, 0, 0..1);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}

/// View-space z of the mesh corner farthest from the eye
///
/// More negative is farther away, so sorting ascending paints back to front.
pub fn farthest_depth(bounds: (Vec3, Vec3), model_view: Mat4) -> f32 {
    let (lo, hi) = bounds;
    (0..8)
        .map(|corner: u32| {
            let p = Vec3::new(
                if corner & 1 == 0 { lo.x } else { hi.x },
                if corner & 2 == 0 { lo.y } else { hi.y },
                if corner & 4 == 0 { lo.z } else { hi.z },
            );
            model_view.transform_point3(p).z
        })
        .fold(f32::INFINITY, f32::min)
}
