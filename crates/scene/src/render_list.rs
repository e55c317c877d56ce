//! Per-frame draw snapshot.
//!
//! A [`RenderList`] is built fresh every frame from the scene and handed to
//! the drawing stage. Models are shared through `Arc`; actor placements and
//! poses are copied, so the list never aliases mutable scene state and can
//! cross a thread boundary without locking.

use std::sync::Arc;

use glam::{Mat4, Vec3};
use tracing::warn;
use vesper_resources::{ModelSkinned, ModelStatic};

use crate::component::{Actors, AnimatedActors, SkinnedModel, StaticModel};
use crate::light::{DirectionalLight, Light, PointLight, SpotLight};
use crate::registry::Registry;
use crate::transform::Transform;

/// Ambient light term applied to every frame.
pub const AMBIENT_COLOR: Vec3 = Vec3::splat(0.01);

/// A static model and every place it is drawn.
#[derive(Debug, Clone)]
pub struct StaticModelEntry {
    pub model: Arc<ModelStatic>,
    pub actors: Vec<Transform>,
}

/// Placement and pose of one skinned actor at snapshot time.
#[derive(Debug, Clone, PartialEq)]
pub struct SkinnedActorSnapshot {
    pub transform: Transform,
    pub skinning: Vec<Mat4>,
}

/// A skinned model and every place it is drawn.
#[derive(Debug, Clone)]
pub struct SkinnedModelEntry {
    pub model: Arc<ModelSkinned>,
    pub actors: Vec<SkinnedActorSnapshot>,
}

#[derive(Debug, Clone, Default)]
pub struct RenderList {
    pub static_models: Vec<StaticModelEntry>,
    pub skinned_models: Vec<SkinnedModelEntry>,
    pub directional_lights: Vec<DirectionalLight>,
    pub point_lights: Vec<PointLight>,
    pub spot_lights: Vec<SpotLight>,
    pub ambient_color: Vec3,
}

impl RenderList {
    /// Single read-only pass over `registry`.
    ///
    /// With `demo_lights`, a fixed directional light and a point light
    /// orbiting the origin (driven by `secs`) are appended after the
    /// light entities.
    pub fn build(registry: &Registry, secs: f64, demo_lights: bool) -> Self {
        let mut list = Self {
            ambient_color: AMBIENT_COLOR,
            ..Default::default()
        };

        for (_, model, actors) in registry.query2::<StaticModel, Actors>() {
            list.static_models.push(StaticModelEntry {
                model: Arc::clone(&model.0),
                actors: actors.0.clone(),
            });
        }

        for (_, model, actors) in registry.query2::<SkinnedModel, AnimatedActors>() {
            list.skinned_models.push(SkinnedModelEntry {
                model: Arc::clone(&model.0),
                actors: actors
                    .0
                    .iter()
                    .map(|a| SkinnedActorSnapshot {
                        transform: a.transform,
                        skinning: a.animation.skinning_matrices().to_vec(),
                    })
                    .collect(),
            });
        }

        for (entity, light) in registry.query::<Light>() {
            match light {
                Light::Directional(l) => list.directional_lights.push(*l),
                Light::Point(l) => list.point_lights.push(*l),
                Light::Spot(l) => {
                    if l.has_inverted_fade() {
                        warn!(
                            "Spot light {:?} fades out before it starts fading (start cos {}, end cos {})",
                            entity,
                            l.fade_start(),
                            l.fade_end()
                        );
                    }
                    list.spot_lights.push(*l);
                }
            }
        }

        if demo_lights {
            list.directional_lights.push(demo_directional_light());
            list.point_lights.push(demo_point_light(secs));
        }

        list
    }

    /// Number of draws: one per actor across all models.
    pub fn actor_count(&self) -> usize {
        self.static_models.iter().map(|e| e.actors.len()).sum::<usize>()
            + self.skinned_models.iter().map(|e| e.actors.len()).sum::<usize>()
    }

    pub fn light_count(&self) -> usize {
        self.directional_lights.len() + self.point_lights.len() + self.spot_lights.len()
    }
}

fn demo_directional_light() -> DirectionalLight {
    DirectionalLight::new(Vec3::new(5.0, 0.0, 0.0), Vec3::new(1.0, 5.0, 1.0), Vec3::ONE)
}

fn demo_point_light(secs: f64) -> PointLight {
    let position = Vec3::new((secs.sin() * 3.0) as f32, 1.0, (secs.cos() * 2.0) as f32);
    PointLight::new(position, Vec3::splat(0.5))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_registry_without_demo_lights() {
        let list = RenderList::build(&Registry::new(), 0.0, false);
        assert!(list.static_models.is_empty());
        assert!(list.skinned_models.is_empty());
        assert_eq!(list.light_count(), 0);
        assert_eq!(list.ambient_color, AMBIENT_COLOR);
    }

    #[test]
    fn test_demo_lights() {
        let list = RenderList::build(&Registry::new(), 0.0, true);

        assert_eq!(list.directional_lights.len(), 1);
        let sun = &list.directional_lights[0];
        assert_eq!(sun.common.position, Vec3::new(5.0, 0.0, 0.0));
        assert!(sun
            .direction_to_light()
            .abs_diff_eq(Vec3::new(1.0, 5.0, 1.0).normalize(), 1e-6));

        assert_eq!(list.point_lights.len(), 1);
        assert!(list.point_lights[0]
            .common
            .position
            .abs_diff_eq(Vec3::new(0.0, 1.0, 2.0), 1e-6));
        assert_eq!(list.point_lights[0].common.color, Vec3::splat(0.5));
    }

    #[test]
    fn test_demo_point_light_orbits() {
        let t = std::f64::consts::FRAC_PI_2;
        let list = RenderList::build(&Registry::new(), t, true);
        assert!(list.point_lights[0]
            .common
            .position
            .abs_diff_eq(Vec3::new(3.0, 1.0, 0.0), 1e-5));
    }

    #[test]
    fn test_entity_lights_sorted_by_variant() {
        let mut registry = Registry::new();
        for light in [
            Light::from(PointLight::default()),
            Light::from(SpotLight::default()),
            Light::from(PointLight::default()),
        ] {
            let e = registry.spawn();
            registry.insert(e, light);
        }

        let list = RenderList::build(&registry, 0.0, false);
        assert_eq!(list.point_lights.len(), 2);
        assert_eq!(list.spot_lights.len(), 1);
        assert!(list.directional_lights.is_empty());
    }

    #[test]
    fn test_inverted_spot_light_is_kept() {
        let mut spot = SpotLight::default();
        spot.set_fade_start_degrees(50.0);
        spot.set_fade_end_degrees(10.0);

        let mut registry = Registry::new();
        let e = registry.spawn();
        registry.insert::<Light>(e, spot.into());

        let list = RenderList::build(&registry, 0.0, false);
        assert_eq!(list.spot_lights, vec![spot]);
    }
}
