//! Vesper viewer.
//!
//! Loads `vesper.toml`, opens a window and renders a small demo scene until
//! the window closes or Escape is pressed.

use std::sync::Arc;

use anyhow::Result;
use glam::{Vec2, Vec3};
use tracing::{error, info, warn};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::WindowId;

use vesper_core::Config;
use vesper_platform::{InputState, KeyCode, Window};
use vesper_renderer::{FrameStatus, Renderer};
use vesper_resources::{Material, ModelStatic, RenderUnit, Vertex};
use vesper_scene::{Actors, Light, Scene, SpotLight, StaticModel, Transform};

const CONFIG_PATH: &str = "vesper.toml";

struct App {
    config: Config,
    scene: Scene,
    window: Option<Window<InputState>>,
    renderer: Option<Renderer>,
}

impl App {
    fn new(config: Config, scene: Scene) -> Self {
        Self {
            config,
            scene,
            window: None,
            renderer: None,
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let (Some(window), Some(renderer)) = (self.window.as_mut(), self.renderer.as_mut()) else {
            return;
        };

        if window.sink().is_key_just_pressed(KeyCode::Escape) {
            info!("Escape pressed, shutting down");
            event_loop.exit();
            return;
        }

        self.scene.update();
        let list = self.scene.make_render_list();

        match renderer.render_frame(&list) {
            Ok(FrameStatus::Presented) => {}
            Ok(FrameStatus::Skipped) => tracing::trace!("Frame skipped"),
            Err(e) => {
                error!("Render error: {:?}", e);
                event_loop.exit();
            }
        }
        window.sink_mut().begin_frame();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window = match Window::new(event_loop, &self.config.window, InputState::new()) {
            Ok(window) => window,
            Err(e) => {
                error!("Failed to create window: {}", e);
                event_loop.exit();
                return;
            }
        };

        match Renderer::new(&window, &self.config.graphics) {
            Ok(renderer) => {
                info!("Initialization complete, entering main loop");
                self.renderer = Some(renderer);
                self.window = Some(window);
            }
            Err(e) => {
                error!("Failed to create renderer: {:?}", e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested, shutting down");
                event_loop.exit();
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            other => {
                let Some(window) = self.window.as_mut() else {
                    return;
                };
                window.dispatch(&other);
                if window.take_resized()
                    && let Some(renderer) = self.renderer.as_mut()
                {
                    let (width, height) = window.size();
                    renderer.resize(width, height);
                }
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = self.window.as_ref()
            && !window.is_minimized()
        {
            window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        // The renderer holds the surface, which must go before the window.
        self.renderer = None;
        self.window = None;
    }
}

/// Unit quad in the XZ plane, facing +Y.
fn ground_quad() -> Result<ModelStatic> {
    let normal = Vec3::Y;
    let vertices = vec![
        Vertex::new(Vec3::new(-0.5, 0.0, -0.5), normal, Vec2::new(0.0, 0.0)),
        Vertex::new(Vec3::new(0.5, 0.0, -0.5), normal, Vec2::new(1.0, 0.0)),
        Vertex::new(Vec3::new(0.5, 0.0, 0.5), normal, Vec2::new(1.0, 1.0)),
        Vertex::new(Vec3::new(-0.5, 0.0, 0.5), normal, Vec2::new(0.0, 1.0)),
    ];
    let material = Material {
        roughness: 0.8,
        ..Material::default()
    };
    let unit = RenderUnit::new(vertices, vec![0, 1, 2, 2, 3, 0], material);
    Ok(ModelStatic::new(vec![unit])?)
}

fn populate_demo_scene(scene: &mut Scene) -> Result<()> {
    let ground = Arc::new(ground_quad()?);
    let floor = scene.spawn_with(StaticModel(ground));
    let tiles = (-2..=2)
        .flat_map(|x| (-2..=2).map(move |z| (x, z)))
        .map(|(x, z)| Transform::new().with_position(Vec3::new(x as f32, 0.0, z as f32)))
        .collect();
    scene.registry_mut().insert(floor, Actors(tiles));

    let mut spot = SpotLight::default();
    spot.common.position = Vec3::new(0.0, 4.0, 0.0);
    spot.common.color = Vec3::new(1.0, 0.9, 0.7);
    spot.set_direction_to_light(Vec3::Y);
    scene.spawn_with(Light::from(spot));

    info!("Demo scene: {} entities", scene.registry().len());
    Ok(())
}

fn main() -> Result<()> {
    vesper_core::init_logging();
    info!("Starting Vesper");

    let config = Config::load(CONFIG_PATH)?;
    if !config.scene.demo_lights {
        warn!("Demo lights disabled; only light entities will be visible");
    }

    let mut scene = Scene::new(&config.scene);
    populate_demo_scene(&mut scene)?;

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config, scene);
    event_loop.run_app(&mut app)?;

    Ok(())
}
