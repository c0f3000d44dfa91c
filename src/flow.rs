//! A minimal native host loop around the renderer.
//!
//! [`run`] opens a window, acquires a surface-backed [`Gpu`], creates a
//! [`Renderer`] with one [`Viewport`] covering the window and hands both to a
//! setup closure. Afterwards every redraw drives the viewport's frame
//! callbacks into the renderer, targeting the window surface.

use std::sync::Arc;

use anyhow::Context as _;
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::{Window, WindowId},
};

use crate::{
    context::Gpu,
    renderer::Renderer,
    viewport::{FrameClock, Viewport},
};

type Setup = Box<dyn FnOnce(&mut Renderer, &mut Viewport)>;

struct AppState {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    gpu: Gpu,
    viewport: Viewport,
}

impl AppState {
    fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.config.width = width;
            self.config.height = height;
            self.surface.configure(&self.gpu.device, &self.config);
            // The framebuffer follows on the next render.
            self.viewport.set_size(width, height);
        }
    }
}

struct App {
    setup: Option<Setup>,
    renderer: Renderer,
    clock: FrameClock,
    state: Option<AppState>,
    error: Option<anyhow::Error>,
}

impl App {
    fn init(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<AppState> {
        let window = Arc::new(
            event_loop
                .create_window(Window::default_attributes().with_title("brush-ngin"))
                .context("failed to create the window")?,
        );
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        let surface = instance
            .create_surface(window.clone())
            .context("failed to create the window surface")?;
        let size = window.inner_size();
        let (gpu, config) = futures::executor::block_on(Gpu::for_surface(&instance, &surface, size))?;

        let mut viewport = self.renderer.create_viewport(size.width, size.height);
        if let Some(setup) = self.setup.take() {
            setup(&mut self.renderer, &mut viewport);
        }
        Ok(AppState {
            window,
            surface,
            config,
            gpu,
            viewport,
        })
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        match self.init(event_loop) {
            Ok(state) => {
                state.window.request_redraw();
                self.state = Some(state);
            }
            Err(e) => {
                log::error!("initialisation failed: {e:#}");
                self.error = Some(e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let Some(state) = &mut self.state else {
            return;
        };
        match event {
            WindowEvent::CloseRequested => {
                self.renderer.destroy_viewport(&mut state.viewport);
                event_loop.exit();
            }
            WindowEvent::Resized(size) => state.resize(size.width, size.height),
            WindowEvent::RedrawRequested => {
                let frame = match state.surface.get_current_texture() {
                    Ok(frame) => frame,
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        let size = state.window.inner_size();
                        state.resize(size.width, size.height);
                        state.window.request_redraw();
                        return;
                    }
                    Err(e) => {
                        log::error!("unable to acquire the next surface texture: {e}");
                        return;
                    }
                };
                let view = frame.texture.create_view(&wgpu::TextureViewDescriptor::default());
                let time = self.clock.tick();
                state.viewport.frame(&mut self.renderer, &state.gpu, &time, &view);
                state.window.pre_present_notify();
                frame.present();
                state.window.request_redraw();
            }
            _ => (),
        }
    }
}

/// Open a window and render until it is closed.
///
/// `setup` runs once, after the GPU is available and before the first frame;
/// it typically creates and activates a scene and registers texture providers.
pub fn run(setup: impl FnOnce(&mut Renderer, &mut Viewport) + 'static) -> anyhow::Result<()> {
    if let Err(e) = env_logger::try_init() {
        println!("Warning: Could not initialize logger: {}", e);
    };

    let event_loop = EventLoop::new()?;
    let mut app = App {
        setup: Some(Box::new(setup)),
        renderer: Renderer::new(),
        clock: FrameClock::new(),
        state: None,
        error: None,
    };
    event_loop.run_app(&mut app)?;
    match app.error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
