//! Sparse component storage keyed by entity.
//!
//! Entities are generational [`slotmap`] keys. Each component type lives in
//! its own [`SecondaryMap`]; a query over several capabilities walks one
//! map and keeps the entities present in all of the others.

use slotmap::{SecondaryMap, SlotMap, new_key_type};

use crate::component::{Actors, AnimatedActors, SkinnedModel, StaticModel};
use crate::light::Light;

new_key_type! {
    /// Handle to an entity in a [`Registry`].
    pub struct Entity;
}

/// A type that can be attached to an entity.
pub trait Component: Sized + 'static {
    fn storage(registry: &Registry) -> &SecondaryMap<Entity, Self>;
    fn storage_mut(registry: &mut Registry) -> &mut SecondaryMap<Entity, Self>;
}

macro_rules! impl_component {
    ($ty:ty, $field:ident) => {
        impl Component for $ty {
            fn storage(registry: &Registry) -> &SecondaryMap<Entity, Self> {
                &registry.$field
            }

            fn storage_mut(registry: &mut Registry) -> &mut SecondaryMap<Entity, Self> {
                &mut registry.$field
            }
        }
    };
}

#[derive(Default)]
pub struct Registry {
    entities: SlotMap<Entity, ()>,
    static_models: SecondaryMap<Entity, StaticModel>,
    actors: SecondaryMap<Entity, Actors>,
    skinned_models: SecondaryMap<Entity, SkinnedModel>,
    animated_actors: SecondaryMap<Entity, AnimatedActors>,
    lights: SecondaryMap<Entity, Light>,
}

impl_component!(StaticModel, static_models);
impl_component!(Actors, actors);
impl_component!(SkinnedModel, skinned_models);
impl_component!(AnimatedActors, animated_actors);
impl_component!(Light, lights);

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self) -> Entity {
        self.entities.insert(())
    }

    /// Removes `entity` and every component attached to it.
    ///
    /// Returns false if the entity was already gone.
    pub fn despawn(&mut self, entity: Entity) -> bool {
        if self.entities.remove(entity).is_none() {
            return false;
        }
        self.static_models.remove(entity);
        self.actors.remove(entity);
        self.skinned_models.remove(entity);
        self.animated_actors.remove(entity);
        self.lights.remove(entity);
        true
    }

    #[inline]
    pub fn contains(&self, entity: Entity) -> bool {
        self.entities.contains_key(entity)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Attaches `component`, replacing and returning any previous one.
    ///
    /// # Panics
    ///
    /// Panics if `entity` has been despawned.
    pub fn insert<C: Component>(&mut self, entity: Entity, component: C) -> Option<C> {
        assert!(self.contains(entity), "insert on a despawned entity");
        C::storage_mut(self).insert(entity, component)
    }

    pub fn remove<C: Component>(&mut self, entity: Entity) -> Option<C> {
        C::storage_mut(self).remove(entity)
    }

    pub fn get<C: Component>(&self, entity: Entity) -> Option<&C> {
        C::storage(self).get(entity)
    }

    pub fn get_mut<C: Component>(&mut self, entity: Entity) -> Option<&mut C> {
        C::storage_mut(self).get_mut(entity)
    }

    pub fn has<C: Component>(&self, entity: Entity) -> bool {
        C::storage(self).contains_key(entity)
    }

    /// Every entity with a `C`.
    pub fn query<C: Component>(&self) -> impl Iterator<Item = (Entity, &C)> {
        C::storage(self).iter()
    }

    /// Every entity with both an `A` and a `B`, in `A`'s storage order.
    pub fn query2<A: Component, B: Component>(&self) -> impl Iterator<Item = (Entity, &A, &B)> {
        let other = B::storage(self);
        A::storage(self)
            .iter()
            .filter_map(move |(entity, a)| other.get(entity).map(|b| (entity, a, b)))
    }

    /// Every entity with a [`SkinnedModel`] and [`AnimatedActors`], with the
    /// actors borrowed mutably.
    pub fn skinned_actors_mut(
        &mut self,
    ) -> impl Iterator<Item = (Entity, &SkinnedModel, &mut AnimatedActors)> {
        let models = &self.skinned_models;
        self.animated_actors
            .iter_mut()
            .filter_map(move |(entity, actors)| models.get(entity).map(|m| (entity, m, actors)))
    }
}
