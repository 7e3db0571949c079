//! Windowed host: one advance and one render per display refresh.
//!
//! Input and resize events are handled between redraws, so they never land
//! in the middle of a step. The loop has no state of its own beyond the
//! camera and the GPU handles; the simulation is owned by the caller's
//! [`Simulation`] and moved in for the lifetime of the window.

use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

use crate::camera::OrbitCamera;
use crate::error::SimulationError;
use crate::gpu::GpuRenderer;
use crate::simulation::Simulation;
use crate::time::Time;

const TITLE: &str = "curlflow";

/// Run `simulation` in a new window until the window is closed.
pub fn run(simulation: Simulation) -> Result<(), SimulationError> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = FrameLoop::new(simulation);
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

struct FrameLoop {
    simulation: Simulation,
    camera: OrbitCamera,
    time: Time,
    window: Option<Arc<Window>>,
    renderer: Option<GpuRenderer>,
    mouse_pressed: bool,
    last_mouse_pos: Option<(f64, f64)>,
    /// Startup failure raised inside a callback, returned from [`run`].
    error: Option<SimulationError>,
}

impl FrameLoop {
    fn new(simulation: Simulation) -> Self {
        let camera = OrbitCamera::new(&simulation.config().camera);
        Self {
            simulation,
            camera,
            time: Time::new(),
            window: None,
            renderer: None,
            mouse_pressed: false,
            last_mouse_pos: None,
            error: None,
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<(), SimulationError> {
        let window_attrs = Window::default_attributes()
            .with_title(TITLE)
            .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));

        let window = Arc::new(event_loop.create_window(window_attrs)?);
        let renderer = pollster::block_on(GpuRenderer::new(
            window.clone(),
            *self.simulation.pipeline(),
            self.simulation.particles().len(),
        ))?;

        self.window = Some(window.clone());
        self.renderer = Some(renderer);
        window.request_redraw();
        Ok(())
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(renderer) = &mut self.renderer else {
            return;
        };

        self.simulation.step();
        self.camera.auto_rotate();

        match renderer.render(self.simulation.particles().positions(), &self.camera) {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                renderer.resize(winit::dpi::PhysicalSize {
                    width: renderer.config.width,
                    height: renderer.config.height,
                })
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("Surface out of memory, exiting");
                event_loop.exit();
            }
            Err(e) => log::warn!("Skipped frame: {:?}", e),
        }

        if self.time.tick() {
            if let Some(window) = &self.window {
                window.set_title(&format!("{} - {}", TITLE, self.time.readout()));
            }
        }
    }
}

impl ApplicationHandler for FrameLoop {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.init(event_loop) {
                self.error = Some(e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(physical_size) => {
                if let Some(renderer) = &mut self.renderer {
                    renderer.resize(physical_size);
                }
            }
            WindowEvent::MouseInput { state, button, .. } => {
                if button == MouseButton::Left {
                    self.mouse_pressed = state == ElementState::Pressed;
                    if !self.mouse_pressed {
                        self.last_mouse_pos = None;
                    }
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                if self.mouse_pressed {
                    if let Some((last_x, last_y)) = self.last_mouse_pos {
                        let dx = position.x - last_x;
                        let dy = position.y - last_y;
                        self.camera.drag(dx as f32, dy as f32);
                    }
                    self.last_mouse_pos = Some((position.x, position.y));
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let scroll = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 * 0.1,
                };
                self.camera.zoom(scroll);
            }
            WindowEvent::RedrawRequested => {
                self.redraw(event_loop);
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }
}
