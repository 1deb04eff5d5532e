//! Ember renderer - demo application.
//!
//! Drives the deferred pipeline against a procedural scene: depth prepass,
//! G-buffer generation, lighting with a baked environment, blit to the
//! swapchain.

use anyhow::{Result, anyhow};
use glam::{Mat4, Vec3};
use tracing::{error, info};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::WindowId;

use ember_core::FrameTimer;
use ember_platform::Window;
use ember_renderer::{Renderer, RendererConfig};

struct App {
    window: Option<Window>,
    renderer: Option<Renderer>,
    timer: FrameTimer,
    /// First fatal error; makes the process exit non-zero.
    fatal: Option<anyhow::Error>,
}

impl App {
    fn new() -> Self {
        Self {
            window: None,
            renderer: None,
            timer: FrameTimer::new(),
            fatal: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        error!("Fatal: {:?}", error);
        self.fatal = Some(error);
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window = match Window::new(event_loop, 1280, 720, "Ember") {
            Ok(window) => window,
            Err(e) => return self.fail(event_loop, anyhow!(e)),
        };

        match Renderer::new(&window, &RendererConfig::default()) {
            Ok(renderer) => {
                info!("Initialization complete, entering main loop");
                self.renderer = Some(renderer);
                self.window = Some(window);
            }
            Err(e) => self.fail(event_loop, anyhow!(e)),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested, shutting down");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(ref mut window) = self.window {
                    window.resize(size.width, size.height);
                }
                if let Some(ref mut renderer) = self.renderer {
                    renderer.resize(size.width, size.height);
                }
            }
            WindowEvent::RedrawRequested => {
                let Some(ref mut renderer) = self.renderer else {
                    return;
                };

                // Slow orbit so the deferred pipeline has something to show
                let angle = self.timer.elapsed_secs() * 0.3;
                let eye = Vec3::new(3.0 * angle.cos(), 2.0, 3.0 * angle.sin());
                let view = Mat4::look_at_rh(eye, Vec3::ZERO, Vec3::Y);
                let aspect = self
                    .window
                    .as_ref()
                    .map(|w| w.aspect_ratio())
                    .unwrap_or(16.0 / 9.0);
                let projection = Mat4::perspective_rh(60f32.to_radians(), aspect, 0.1, 100.0);
                renderer.set_view_projection(view, projection);

                if let Err(e) = renderer.render_frame() {
                    self.fail(event_loop, anyhow!(e));
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(ref window) = self.window {
            window.request_redraw();
        }
    }
}

fn main() -> Result<()> {
    ember_core::init_logging();
    info!("Starting Ember");

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new();
    event_loop.run_app(&mut app)?;

    // Renderer teardown has run by now; report fatal errors as a non-zero
    // exit
    match app.fatal.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
