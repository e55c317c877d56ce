//! The scene: entity registry, clock and per-frame operations.

use tracing::debug;
use vesper_core::{SceneConfig, Timer};

use crate::registry::{Component, Entity, Registry};
use crate::render_list::RenderList;

/// Entities plus the clock that drives animation and the demo lights.
pub struct Scene {
    registry: Registry,
    timer: Timer,
    demo_lights: bool,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(&SceneConfig::default())
    }
}

impl Scene {
    pub fn new(config: &SceneConfig) -> Self {
        debug!("Scene created (demo lights: {})", config.demo_lights);
        Self {
            registry: Registry::new(),
            timer: Timer::new(),
            demo_lights: config.demo_lights,
        }
    }

    #[inline]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    #[inline]
    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    /// Seconds since the scene was created.
    #[inline]
    pub fn elapsed_secs(&self) -> f64 {
        self.timer.elapsed_secs()
    }

    pub fn set_demo_lights(&mut self, enabled: bool) {
        self.demo_lights = enabled;
    }

    /// Spawns an entity carrying `component`.
    pub fn spawn_with<C: Component>(&mut self, component: C) -> Entity {
        let entity = self.registry.spawn();
        self.registry.insert(entity, component);
        entity
    }

    /// Advances every animated actor to the current scene time.
    pub fn update(&mut self) {
        self.update_at(self.timer.elapsed_secs());
    }

    /// Advances every animated actor to `secs`.
    ///
    /// Touches only animation state.
    pub fn update_at(&mut self, secs: f64) {
        for (_, model, actors) in self.registry.skinned_actors_mut() {
            let model = &model.0;
            for actor in &mut actors.0 {
                actor
                    .animation
                    .update(model.animations(), model.skeleton(), secs);
            }
        }
    }

    /// Snapshot of the scene at the current time.
    pub fn make_render_list(&self) -> RenderList {
        self.make_render_list_at(self.timer.elapsed_secs())
    }

    /// Snapshot of the scene with time-dependent demo data evaluated at `secs`.
    pub fn make_render_list_at(&self, secs: f64) -> RenderList {
        RenderList::build(&self.registry, secs, self.demo_lights)
    }
}
