//! Shatter Wall entry point
//!
//! Browser: WebGPU canvas, mouse orbit and the control buttons.
//! Native: a headless run that logs what happened.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_scene {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;
    use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlImageElement, MouseEvent};

    use shatter_wall::clock::{Clock, FrameRequest};
    use shatter_wall::renderer::{MeshRenderState, TextureHandle};
    use shatter_wall::{RenderError, Scene, Settings};

    type SharedScene = Rc<RefCell<Scene<MeshRenderState, RafClock>>>;
    type FrameCallback = Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>;

    /// `requestAnimationFrame` behind the scene's clock
    ///
    /// Every request reuses the one frame callback, so a request id can be
    /// cancelled.
    struct RafClock {
        callback: FrameCallback,
    }

    impl Clock for RafClock {
        fn request_frame(&mut self) -> Option<FrameRequest> {
            let window = web_sys::window()?;
            let callback = self.callback.borrow();
            let closure = callback.as_ref()?;
            window
                .request_animation_frame(closure.as_ref().unchecked_ref())
                .ok()
                .map(FrameRequest)
        }

        fn cancel_frame(&mut self, request: FrameRequest) {
            if let Some(window) = web_sys::window() {
                let _ = window.cancel_animation_frame(request.0);
            }
        }
    }

    async fn init_renderer(
        canvas: &HtmlCanvasElement,
        width: u32,
        height: u32,
    ) -> Result<MeshRenderState, RenderError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::BROWSER_WEBGPU,
            ..Default::default()
        });

        let surface = instance.create_surface(wgpu::SurfaceTarget::Canvas(canvas.clone()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;

        log::info!("Using adapter: {:?}", adapter.get_info().name);

        MeshRenderState::new(surface, &adapter, width, height).await
    }

    pub async fn run() {
        console_error_panic_hook::set_once();
        if console_log::init_with_level(log::Level::Info).is_err() {
            return;
        }

        log::info!("Shatter Wall starting...");

        let Some(window) = web_sys::window() else {
            return;
        };
        let Some(document) = window.document() else {
            return;
        };

        let Some(canvas) = document
            .get_element_by_id("webgl-canvas")
            .and_then(|el| el.dyn_into::<HtmlCanvasElement>().ok())
        else {
            log::error!("No #webgl-canvas element on the page");
            return;
        };

        let dpr = window.device_pixel_ratio();
        let client_w = window
            .inner_width()
            .ok()
            .and_then(|v| v.as_f64())
            .unwrap_or(canvas.client_width() as f64);
        let client_h = window
            .inner_height()
            .ok()
            .and_then(|v| v.as_f64())
            .unwrap_or(canvas.client_height() as f64);
        let width = (client_w * dpr) as u32;
        let height = (client_h * dpr) as u32;
        canvas.set_width(width);
        canvas.set_height(height);

        if !js_sys::Reflect::has(&window.navigator(), &JsValue::from_str("gpu")).unwrap_or(false) {
            log::error!("WebGPU is not supported by this browser");
            return;
        }

        let renderer = match init_renderer(&canvas, width, height).await {
            Ok(renderer) => renderer,
            Err(e) => {
                log::error!("Rendering context unavailable: {e}");
                return;
            }
        };

        let settings = Settings::load();
        settings.save();

        let seed = js_sys::Date::now() as u64;
        let callback: FrameCallback = Rc::new(RefCell::new(None));
        let clock = RafClock {
            callback: callback.clone(),
        };
        let scene: SharedScene = match Scene::new(settings, seed, renderer, clock) {
            Ok(scene) => Rc::new(RefCell::new(scene)),
            Err(e) => {
                log::error!("Scene setup failed: {e}");
                return;
            }
        };
        log::info!("Scene initialized with seed: {}", seed);

        {
            let scene = scene.clone();
            *callback.borrow_mut() = Some(Closure::new(move |time: f64| {
                let mut s = scene.borrow_mut();
                s.on_frame(time);
                update_hud(s.timer().fps());
            }));
        }

        load_textures(&scene);
        setup_input_handlers(&canvas, scene.clone());
        setup_buttons(scene.clone());

        scene.borrow_mut().start();

        log::info!("Shatter Wall running!");
    }

    fn update_hud(fps: u32) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };
        if let Some(el) = document.get_element_by_id("fps") {
            el.set_text_content(Some(&format!("{fps} FPS")));
        }
    }

    /// Decode every scene image in the background and swap it in when ready
    fn load_textures(scene: &SharedScene) {
        let (handles, sources) = {
            let s = scene.borrow();
            (s.textures(), s.state().settings.textures.clone())
        };
        let pending = [
            (handles.ball, sources.ball),
            (handles.floor, sources.floor),
            (handles.wall, sources.wall),
            (handles.broken_wall, sources.broken_wall),
            (handles.background, sources.background),
        ];
        for (handle, source) in pending {
            if let Err(e) = load_texture(scene.clone(), handle, &source) {
                log::warn!("Could not load '{source}': {e:?}");
            }
        }
    }

    fn load_texture(scene: SharedScene, handle: TextureHandle, source: &str) -> Result<(), JsValue> {
        let image = HtmlImageElement::new()?;
        let loaded = image.clone();
        let name = source.to_string();
        let closure = Closure::<dyn FnMut()>::new(move || match decode_image(&loaded) {
            Ok((width, height, rgba)) => {
                scene
                    .borrow_mut()
                    .renderer_mut()
                    .update_texture(handle, width, height, &rgba);
            }
            Err(e) => log::warn!("Could not decode '{name}': {e:?}"),
        });
        image.set_onload(Some(closure.as_ref().unchecked_ref()));
        closure.forget();
        image.set_src(source);
        Ok(())
    }

    /// Read an image's pixels back through a scratch 2D canvas
    fn decode_image(image: &HtmlImageElement) -> Result<(u32, u32, Vec<u8>), JsValue> {
        let (width, height) = (image.natural_width(), image.natural_height());
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| JsValue::from_str("no document"))?;
        let scratch: HtmlCanvasElement = document.create_element("canvas")?.dyn_into()?;
        scratch.set_width(width);
        scratch.set_height(height);
        let ctx: CanvasRenderingContext2d = scratch
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("no 2d context"))?
            .dyn_into()?;
        ctx.draw_image_with_html_image_element(image, 0.0, 0.0)?;
        let data = ctx.get_image_data(0.0, 0.0, width as f64, height as f64)?;
        Ok((width, height, data.data().0))
    }

    fn setup_input_handlers(canvas: &HtmlCanvasElement, scene: SharedScene) {
        // Mouse down starts a drag
        {
            let scene = scene.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: MouseEvent| {
                scene
                    .borrow_mut()
                    .pointer_down(event.client_x() as f32, event.client_y() as f32);
            });
            let _ = canvas
                .add_event_listener_with_callback("mousedown", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Mouse move orbits while dragging
        {
            let scene = scene.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: MouseEvent| {
                scene
                    .borrow_mut()
                    .pointer_move(event.client_x() as f32, event.client_y() as f32);
            });
            let _ = canvas
                .add_event_listener_with_callback("mousemove", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
                scene.borrow_mut().pointer_up();
            });
            let _ = canvas
                .add_event_listener_with_callback("mouseup", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn setup_buttons(scene: SharedScene) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };

        let actions: [(&str, fn(&SharedScene)); 3] = [
            ("restart-button", |s| s.borrow_mut().restart()),
            ("start-button", |s| s.borrow_mut().start()),
            ("stop-button", |s| s.borrow_mut().stop()),
        ];
        for (id, action) in actions {
            let Some(btn) = document.get_element_by_id(id) else {
                continue;
            };
            let scene = scene.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
                action(&scene);
            });
            let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Reload is a full page reload
        if let Some(btn) = document.get_element_by_id("reload-button") {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
                if let Some(window) = web_sys::window() {
                    log::info!("Reloading page");
                    let _ = window.location().reload();
                }
            });
            let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn wasm_main() {
    wasm_scene::run().await;
}

#[cfg(not(target_arch = "wasm32"))]
mod native_scene {
    use shatter_wall::clock::ManualClock;
    use shatter_wall::renderer::HeadlessRenderer;
    use shatter_wall::{Scene, SceneError, Settings};

    /// Ten seconds at 60 Hz
    const FRAMES: u32 = 600;
    const FRAME_MS: f64 = 1000.0 / 60.0;

    /// Step a headless scene and log a summary
    ///
    /// Arguments: `[settings.json] [seed]`.
    pub fn run() -> Result<(), SceneError> {
        let mut args = std::env::args().skip(1);
        let settings = match args.next() {
            Some(path) => {
                log::info!("Loading settings from {path}");
                Settings::from_file(&path)?
            }
            None => Settings::load(),
        };
        let seed = args
            .next()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or_else(|| {
                std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .map(|d| d.as_millis() as u64)
                    .unwrap_or(0)
            });

        let mut scene = Scene::new(settings, seed, HeadlessRenderer::new(1280, 720), ManualClock::new())?;
        scene.start();

        let mut broken_at = None;
        for frame in 0..FRAMES {
            if scene.clock_mut().take_pending().is_none() {
                break;
            }
            let report = scene.on_frame(frame as f64 * FRAME_MS);
            if report.is_some_and(|r| r.wall_broken) {
                broken_at = Some(frame);
            }
        }
        scene.stop();

        let state = scene.state();
        match broken_at {
            Some(frame) => log::info!(
                "Wall broke at frame {frame} into {} fragments",
                state.wall_state.fragments.len()
            ),
            None => log::info!("Wall stayed intact"),
        }
        log::info!(
            "After {} frames (seed {}): ball at {} moving {}, {} draws in the last frame",
            state.frame,
            state.seed,
            state.ball.position,
            state.ball.velocity,
            scene.renderer().last_frame.len()
        );
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Shatter Wall (native, headless) starting...");

    if let Err(e) = native_scene::run() {
        log::error!("{e}");
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}
