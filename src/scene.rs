//! Scene orchestration
//!
//! Owns the simulation, the camera and the renderer and drives them once per
//! frame handed out by the injected [`Clock`]:
//! view matrix, wall collision, fragments, ball, then draw.

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

use crate::camera::{OrbitCamera, projection_matrix};
use crate::clock::{Clock, FrameRequest, FrameTimer};
use crate::consts::{BACKGROUND_DISTANCE, WALL_DRAW_LIFT};
use crate::error::SceneError;
use crate::geometry::{self, MeshHandle};
use crate::renderer::{Renderer, TextureHandle};
use crate::settings::{Settings, TextureSettings};
use crate::sim::{SceneState, TickReport, tick};

/// Whether frames are being stepped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RunState {
    #[default]
    Stopped,
    Running,
}

/// Texture handles used by the draw pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneTextures {
    pub ball: TextureHandle,
    pub floor: TextureHandle,
    /// Intact wall and every fragment
    pub wall: TextureHandle,
    pub broken_wall: TextureHandle,
    pub background: TextureHandle,
}

impl SceneTextures {
    fn load<R: Renderer>(renderer: &mut R, sources: &TextureSettings) -> Self {
        Self {
            ball: renderer.load_texture(&sources.ball),
            floor: renderer.load_texture(&sources.floor),
            wall: renderer.load_texture(&sources.wall),
            broken_wall: renderer.load_texture(&sources.broken_wall),
            background: renderer.load_texture(&sources.background),
        }
    }
}

/// The running demo
pub struct Scene<R: Renderer, C: Clock> {
    state: SceneState,
    camera: OrbitCamera,
    renderer: R,
    clock: C,
    run_state: RunState,
    pending: Option<FrameRequest>,
    timer: FrameTimer,
    textures: SceneTextures,
    /// Screen-filling plane behind everything
    background: MeshHandle,
}

impl<R: Renderer, C: Clock> Scene<R, C> {
    /// Build a stopped scene
    pub fn new(settings: Settings, seed: u64, mut renderer: R, clock: C) -> Result<Self, SceneError> {
        let mut state = SceneState::new(settings, seed)?;
        let camera = OrbitCamera::new(&state.settings.camera, Vec3::ZERO);
        let textures = SceneTextures::load(&mut renderer, &state.settings.textures);
        let background = insert_background(&mut state, &renderer);

        Ok(Self {
            state,
            camera,
            renderer,
            clock,
            run_state: RunState::Stopped,
            pending: None,
            timer: FrameTimer::default(),
            textures,
            background,
        })
    }

    /// Begin stepping frames; no-op while running
    pub fn start(&mut self) {
        if self.run_state == RunState::Running {
            return;
        }
        self.run_state = RunState::Running;
        self.pending = self.clock.request_frame();
        if self.pending.is_none() {
            log::warn!("Clock refused a frame request");
        }
        log::info!("Animation started");
    }

    /// Cancel the pending frame; the scene is left as is
    pub fn stop(&mut self) {
        if let Some(request) = self.pending.take() {
            self.clock.cancel_frame(request);
        }
        if self.run_state == RunState::Running {
            log::info!("Animation stopped at frame {}", self.state.frame);
        }
        self.run_state = RunState::Stopped;
    }

    /// Ball back to its start, wall intact, fragments gone
    ///
    /// The run state is left alone.
    pub fn restart(&mut self) {
        let released = self.state.restart();
        for handle in &released {
            self.renderer.release_mesh(*handle);
        }
        log::info!("Scene restarted, {} fragments released", released.len());
    }

    /// Start over with a freshly randomized scene
    ///
    /// Camera and frame timing go back to their defaults. On error the
    /// current scene is kept.
    pub fn reload(&mut self, seed: u64) -> Result<(), SceneError> {
        let mut state = SceneState::new(self.state.settings.clone(), seed)?;
        for handle in self.state.meshes.handles() {
            self.renderer.release_mesh(handle);
        }
        self.background = insert_background(&mut state, &self.renderer);
        self.camera = OrbitCamera::new(&state.settings.camera, Vec3::ZERO);
        self.state = state;
        self.timer.reset();
        log::info!("Scene reloaded with seed {seed}");
        Ok(())
    }

    /// Host frame callback (`time` in ms)
    ///
    /// Does nothing unless running with a frame pending. Returns what the
    /// simulation step reported.
    pub fn on_frame(&mut self, time: f64) -> Option<TickReport> {
        if self.run_state != RunState::Running || self.pending.take().is_none() {
            return None;
        }
        self.timer.record(time);

        let view = self.camera.view_matrix();
        let report = tick(&mut self.state);
        self.draw(view);

        self.pending = self.clock.request_frame();
        Some(report)
    }

    fn draw(&mut self, view: Mat4) {
        let (width, height) = self.renderer.viewport();
        let aspect = if height == 0 {
            1.0
        } else {
            width as f32 / height as f32
        };
        self.renderer
            .begin_frame(projection_matrix(&self.state.settings.camera, aspect));

        let lift = Vec3::new(0.0, WALL_DRAW_LIFT, 0.0);
        let meshes = self.state.scene_meshes;
        let textures = self.textures;

        // Background ignores the camera
        self.submit(
            self.background,
            textures.background,
            Mat4::from_translation(Vec3::new(0.0, 0.0, -BACKGROUND_DISTANCE)),
        );

        let ball = &self.state.ball;
        let ball_model = Mat4::from_translation(ball.position)
            * Mat4::from_rotation_x(ball.rotation_x)
            * Mat4::from_rotation_z(ball.rotation_z);
        self.submit(meshes.ball, textures.ball, view * ball_model);

        self.submit(
            meshes.floor,
            textures.floor,
            view * Mat4::from_translation(self.state.floor.position),
        );

        if self.state.wall_state.broken {
            let stub = self.state.broken_wall_position() + lift;
            self.submit(
                meshes.broken_wall,
                textures.broken_wall,
                view * Mat4::from_translation(stub),
            );
            for fragment in &self.state.wall_state.fragments {
                if let Some(mesh) = self.state.meshes.get(fragment.mesh) {
                    self.renderer.draw(
                        fragment.mesh,
                        mesh,
                        textures.wall,
                        view * Mat4::from_translation(fragment.position),
                    );
                }
            }
        } else {
            self.submit(
                meshes.wall,
                textures.wall,
                view * Mat4::from_translation(self.state.wall.position + lift),
            );
        }

        if let Err(e) = self.renderer.end_frame() {
            log::warn!("Frame {} not presented: {}", self.state.frame, e);
        }
    }

    fn submit(&mut self, handle: MeshHandle, texture: TextureHandle, model_view: Mat4) {
        if let Some(mesh) = self.state.meshes.get(handle) {
            self.renderer.draw(handle, mesh, texture, model_view);
        }
    }

    pub fn pointer_down(&mut self, x: f32, y: f32) {
        self.camera.pointer_down(x, y);
    }

    pub fn pointer_move(&mut self, x: f32, y: f32) {
        self.camera.pointer_move(x, y);
    }

    pub fn pointer_up(&mut self) {
        self.camera.pointer_up();
    }

    pub fn run_state(&self) -> RunState {
        self.run_state
    }

    pub fn is_running(&self) -> bool {
        self.run_state == RunState::Running
    }

    pub fn state(&self) -> &SceneState {
        &self.state
    }

    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    pub fn textures(&self) -> SceneTextures {
        self.textures
    }

    pub fn timer(&self) -> &FrameTimer {
        &self.timer
    }
}

fn insert_background<R: Renderer>(state: &mut SceneState, renderer: &R) -> MeshHandle {
    let (width, height) = renderer.viewport();
    state
        .meshes
        .insert(geometry::background_plane(width.max(1) as f32, height.max(1) as f32))
}
