//! Capabilities an entity can carry.
//!
//! A renderable entity pairs a model component with the matching actor
//! component: [`StaticModel`] + [`Actors`], or [`SkinnedModel`] +
//! [`AnimatedActors`]. One model can be drawn at several places, one per actor.

use std::sync::Arc;

use vesper_resources::{ModelSkinned, ModelStatic};

use crate::animation::AnimationState;
use crate::transform::Transform;

/// Shared static mesh.
#[derive(Debug, Clone)]
pub struct StaticModel(pub Arc<ModelStatic>);

/// Shared skinned mesh with its skeleton and clips.
#[derive(Debug, Clone)]
pub struct SkinnedModel(pub Arc<ModelSkinned>);

/// Placements of a static model.
#[derive(Debug, Clone, Default)]
pub struct Actors(pub Vec<Transform>);

/// One placement of a skinned model with its own playback state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnimatedActor {
    pub transform: Transform,
    pub animation: AnimationState,
}

impl AnimatedActor {
    pub fn new(transform: Transform) -> Self {
        Self {
            transform,
            animation: AnimationState::new(),
        }
    }
}

/// Placements of a skinned model.
#[derive(Debug, Clone, Default)]
pub struct AnimatedActors(pub Vec<AnimatedActor>);
