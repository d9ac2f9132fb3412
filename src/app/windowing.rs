//! Window lifecycle and the frame loop (winit `ApplicationHandler` style).
//!
//! The event loop owns everything: view state, renderer, uploaded scene
//! resources. Requesting a redraw at the end of each frame keeps the loop
//! running, which is what animates the orbiting light.

use std::sync::Arc;
use std::time::Instant;

use winit::application::ApplicationHandler;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowAttributes, WindowId};

use crate::app::AppResult;
use crate::app::input::{self, KeyOutcome};
use crate::app::state::ViewState;
use crate::render::{FrameGraph, Renderer, TextureHandle, texture};
use crate::scene::{self, SceneMeshes, SceneTextures};

const WINDOW_TITLE: &str = "Future City";
const WINDOW_SIZE: f64 = 600.0;

const BLOCK_TEXTURE_PATH: &str = "textures/central_block.bmp";
const GRASS_TEXTURE_PATH: &str = "textures/outide_grass.bmp";

/// Degrees per second of light orbit.
const LIGHT_DEG_PER_SEC: f64 = 90.0;

pub struct Windowing;

impl Windowing {
    pub fn run_app(state: ViewState, renderer: Renderer) -> AppResult<()> {
        let event_loop = EventLoop::new()?;
        event_loop.set_control_flow(ControlFlow::Wait);

        let mut app = App {
            window: None,
            state,
            renderer,
            meshes: None,
            textures: None,
            graph: FrameGraph::new(),
            start: Instant::now(),
            title: String::new(),
        };

        event_loop.run_app(&mut app)?;
        Ok(())
    }
}

struct App {
    window: Option<Arc<Window>>,
    state: ViewState,
    renderer: Renderer,
    meshes: Option<SceneMeshes>,
    textures: Option<SceneTextures>,
    graph: FrameGraph,
    start: Instant,
    title: String,
}

impl App {
    /// Loads a texture, falling back to the built-in white texture if the
    /// file is missing or unreadable. The demo keeps running either way.
    fn load_texture(&mut self, path: &str) -> TextureHandle {
        match texture::load_rgba8(path) {
            Ok(pixels) => {
                match self
                    .renderer
                    .upload_texture_rgba8(&pixels.pixels, pixels.width, pixels.height)
                {
                    Ok(handle) => handle,
                    Err(e) => {
                        log::warn!("texture upload failed for {path}: {e}");
                        self.renderer.white_texture()
                    }
                }
            }
            Err(e) => {
                log::warn!("{e}");
                self.renderer.white_texture()
            }
        }
    }

    /// The on-screen readout rides the window title.
    fn refresh_title(&mut self) {
        let title = format!("{WINDOW_TITLE}  |  {}", self.state.status_line());
        if title != self.title {
            if let Some(window) = &self.window {
                window.set_title(&title);
            }
            self.title = title;
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attrs: WindowAttributes = Window::default_attributes()
            .with_title(WINDOW_TITLE)
            .with_inner_size(winit::dpi::LogicalSize::new(WINDOW_SIZE, WINDOW_SIZE));

        let window = event_loop
            .create_window(attrs)
            .expect("failed to create window");
        let window = Arc::new(window);

        self.renderer
            .init_for_window(&window)
            .expect("renderer init failed");

        let meshes = SceneMeshes::upload(&mut self.renderer).expect("mesh upload failed");
        self.meshes = Some(meshes);
        self.textures = Some(SceneTextures {
            block: self.load_texture(BLOCK_TEXTURE_PATH),
            grass: self.load_texture(GRASS_TEXTURE_PATH),
        });
        log::info!("scene resources uploaded");

        let size = window.inner_size();
        if size.height > 0 {
            self.state.aspect = size.width as f32 / size.height as f32;
        }

        self.window = Some(window);
        self.start = Instant::now();

        if let Some(w) = &self.window {
            w.request_redraw();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),

            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key,
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => match input::apply_key(&mut self.state, &logical_key) {
                KeyOutcome::Exit => event_loop.exit(),
                KeyOutcome::Handled => {
                    self.refresh_title();
                    if let Some(w) = &self.window {
                        w.request_redraw();
                    }
                }
                KeyOutcome::Ignored => {}
            },

            WindowEvent::Resized(size) => {
                if size.height > 0 {
                    self.state.aspect = size.width as f32 / size.height as f32;
                }
                self.renderer.resize(size);
                if let Some(w) = &self.window {
                    w.request_redraw();
                }
            }

            WindowEvent::RedrawRequested => {
                // The sole autonomous state change: the light circles the
                // city on wall-clock time.
                let t = self.start.elapsed().as_secs_f64();
                self.state.lighting.azimuth = ((LIGHT_DEG_PER_SEC * t) % 360.0) as f32;

                if let (Some(meshes), Some(textures)) = (&self.meshes, &self.textures) {
                    let params = scene::compose(&self.state, meshes, textures, &mut self.graph);
                    self.renderer
                        .draw_frame(&params, &mut self.graph)
                        .expect("draw failed");
                }

                self.refresh_title();

                if let Some(w) = &self.window {
                    w.pre_present_notify();
                    w.request_redraw();
                }
            }

            _ => {}
        }
    }
}
