//! Scene graph and render-list extraction.
//!
//! This crate provides:
//! - A sparse component registry over generational entity handles
//! - Actor transforms and per-actor animation playback
//! - Light sources as one tagged union
//! - [`Scene::update`] and [`Scene::make_render_list`], the per-frame entry points

pub mod animation;
pub mod component;
pub mod light;
pub mod registry;
pub mod render_list;
pub mod scene;
pub mod transform;

pub use animation::AnimationState;
pub use component::{Actors, AnimatedActor, AnimatedActors, SkinnedModel, StaticModel};
pub use light::{DirectionalLight, Light, LightCommon, PointLight, SpotLight, UnitDirection};
pub use registry::{Component, Entity, Registry};
pub use render_list::{
    AMBIENT_COLOR, RenderList, SkinnedActorSnapshot, SkinnedModelEntry, StaticModelEntry,
};
pub use scene::Scene;
pub use transform::Transform;
