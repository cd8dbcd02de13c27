//! The World is the entity repository tying the storage core together.
//!
//! A `World` owns the shared [`ChunkedPool`] of entity records, the
//! [`ClassIndex`] numbering component and state types, and the
//! [`Compositions`] registry grouping entities by component type-set. It is
//! the primary API surface for creating, deleting and querying entities.
//!
//! # Example
//!
//! ```ignore
//! use hive_engine::components;
//! use hive_engine::ecs::world::World;
//! use hive_macros::Component;
//!
//! #[derive(Component)]
//! struct Position { x: f32, y: f32 }
//!
//! let world = World::new();
//! let entity = world.create_entity(components![Position { x: 0.0, y: 0.0 }])?;
//!
//! for found in world.find::<(Position,)>() {
//!     println!("{:?} at {:?}", found.entity(), found.comp().x);
//! }
//!
//! world.delete_entity(&entity);
//! ```
//!
//! # Concurrency
//!
//! A `World` is `Send + Sync`; creation, deletion, state transitions and
//! queries may run from parallel threads. Queries are weakly consistent
//! with concurrent structural edits.

use std::sync::Arc;

use crate::ecs::Config;
use crate::ecs::archetype::{Composition, Compositions};
use crate::ecs::component::{ClassIndex, Component, Spec};
use crate::ecs::entity::Entity;
use crate::ecs::error::Error;
use crate::ecs::query::{Find, Select};
use crate::ecs::state::State;
use crate::ecs::storage::{ChunkedPool, IdSchema};

/// The entity repository: pool, class index and composition registry.
pub struct World {
    /// The pool of entity records shared by every composition's tenant.
    pool: Arc<ChunkedPool<Entity>>,

    /// The class index shared across the repository.
    classes: Arc<ClassIndex>,

    /// The registry of compositions by component type-set.
    compositions: Compositions,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    /// Create a world with the default configuration.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Create a world laid out according to `config`.
    ///
    /// # Panics
    /// Panics if the configured handle fields exceed 63 bits.
    pub fn with_config(config: Config) -> Self {
        let schema = IdSchema::new(config.num_of_pages_bit_size, config.page_capacity_bit_size);
        let pool = Arc::new(ChunkedPool::new(schema));
        let classes = Arc::new(ClassIndex::new(config.class_index_capacity));
        let compositions = Compositions::new(
            Arc::clone(&pool),
            Arc::clone(&classes),
            config.free_stack_capacity,
        );
        Self {
            pool,
            classes,
            compositions,
        }
    }

    /// Get the pool of entity records.
    #[inline]
    pub fn pool(&self) -> &Arc<ChunkedPool<Entity>> {
        &self.pool
    }

    /// Get the class index.
    #[inline]
    pub fn classes(&self) -> &Arc<ClassIndex> {
        &self.classes
    }

    /// Get the composition registry.
    #[inline]
    pub fn compositions(&self) -> &Compositions {
        &self.compositions
    }

    /// Create an entity holding the given components, in any order.
    ///
    /// The entity lands in the unique composition for its component type-set,
    /// creating the composition on first use.
    pub fn create_entity(
        &self,
        components: Vec<Arc<dyn Component>>,
    ) -> Result<Arc<Entity>, Error> {
        self.create(None, components)
    }

    /// Create a named entity holding the given components.
    pub fn create_named_entity(
        &self,
        name: impl Into<String>,
        components: Vec<Arc<dyn Component>>,
    ) -> Result<Arc<Entity>, Error> {
        self.create(Some(name.into()), components)
    }

    fn create(
        &self,
        name: Option<String>,
        components: Vec<Arc<dyn Component>>,
    ) -> Result<Arc<Entity>, Error> {
        let mut ids = Vec::with_capacity(components.len());
        for component in &components {
            ids.push(self.classes.index_or_register(component.class_type())?);
        }
        let spec = Spec::new(ids);
        debug_assert_eq!(
            spec.len(),
            components.len(),
            "duplicate component types on one entity"
        );

        let composition = self.compositions.get_or_create(spec)?;
        composition.create_entity(name, false, components)
    }

    /// Look up the entity a handle addresses.
    ///
    /// Detached and never-issued handles miss with `None`.
    #[inline]
    pub fn entity(&self, handle: u64) -> Option<Arc<Entity>> {
        self.pool.get_entry(handle)
    }

    /// Get the composition currently holding an entity, if any.
    pub fn composition_of(&self, entity: &Arc<Entity>) -> Option<Arc<Composition>> {
        self.compositions.get(entity.composition_id()?)
    }

    /// Delete an entity: detach it from its state chain and composition and
    /// drop its component data.
    ///
    /// Returns false when the entity is already detached.
    pub fn delete_entity(&self, entity: &Arc<Entity>) -> bool {
        let Some(composition) = self.composition_of(entity) else {
            return false;
        };
        composition.detach_entity_and_state(entity);
        entity.clear_data();
        true
    }

    /// Move an entity to the chain for `state`, or out of any chain when
    /// `state` is `None`. A detached entity is left untouched.
    pub fn set_state<S: State>(
        &self,
        entity: &Arc<Entity>,
        state: Option<S>,
    ) -> Result<(), Error> {
        match self.composition_of(entity) {
            Some(composition) => composition.set_entity_state(entity, state),
            None => Ok(()),
        }
    }

    /// Query for every live entity holding all of the selected component
    /// types, e.g. `world.find::<(Position, Velocity)>()`.
    ///
    /// Yields one result tuple per entity, components at their canonical
    /// positions, walking matching compositions in creation order. Selected
    /// types that were never attached to any entity match nothing.
    pub fn find<S: Select>(&self) -> Find<S> {
        match S::classes(&self.classes) {
            Some(classes) => Find::new(self.compositions.with_classes(&classes)),
            None => Find::none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use hive_macros::{Component, State};

    use crate::components;

    use super::*;

    #[derive(Component, Debug, PartialEq)]
    struct Comp1(i64);

    #[derive(Component, Debug, PartialEq)]
    struct Comp2(i64);

    #[derive(Component, Debug, PartialEq)]
    struct Comp3(i64);

    #[derive(State, Debug)]
    enum Phase {
        Idle,
        Running,
    }

    #[test]
    fn create_and_look_up_empty_entity() {
        // Given
        let world = World::new();

        // When
        let entity = world.create_entity(components![]).unwrap();

        // Then
        assert!(Arc::ptr_eq(&world.entity(entity.handle()).unwrap(), &entity));
        let composition = world.composition_of(&entity).unwrap();
        assert_eq!(composition.arity(), 0);
        assert!(composition.spec().is_empty());
    }

    #[test]
    fn create_single_component_entity() {
        // Given
        let world = World::new();

        // When
        let entity = world.create_entity(components![Comp1(0)]).unwrap();

        // Then
        assert!(Arc::ptr_eq(&world.entity(entity.handle()).unwrap(), &entity));
        let data = entity.components().unwrap();
        assert_eq!(data.len(), 1);
        let sole = data[0].clone().as_any_arc();
        assert_eq!(sole.downcast_ref::<Comp1>(), Some(&Comp1(0)));
    }

    #[test]
    fn component_order_does_not_matter() {
        // Given
        let world = World::new();

        // When - the same pair in both orders
        let e1 = world.create_entity(components![Comp1(0), Comp2(0)]).unwrap();
        let e2 = world.create_entity(components![Comp2(0), Comp1(0)]).unwrap();

        // Then - one composition, canonical storage order for both
        assert_eq!(world.compositions().len(), 1);
        assert_eq!(e1.composition_id(), e2.composition_id());
        for entity in [&e1, &e2] {
            let data = entity.components().unwrap();
            assert!(data[0].clone().as_any_arc().downcast_ref::<Comp1>().is_some());
            assert!(data[1].clone().as_any_arc().downcast_ref::<Comp2>().is_some());
        }
    }

    #[test]
    fn named_entity() {
        // Given
        let world = World::new();

        // When
        let entity = world
            .create_named_entity("player", components![Comp1(1)])
            .unwrap();

        // Then
        assert_eq!(entity.name(), Some("player"));
    }

    #[test]
    fn delete_and_reuse() {
        // Given
        let world = World::new();
        let e1 = world.create_entity(components![Comp1(1)]).unwrap();
        let e2 = world.create_entity(components![Comp1(2)]).unwrap();
        let e1_handle = e1.handle();
        let e2_handle = e2.handle();

        // When
        assert!(world.delete_entity(&e1));

        // Then
        assert_eq!(e1.composition_id(), None);
        assert!(world.entity(e1.handle()).is_none());
        assert!(e1.components().is_none());

        // Then - the survivor keeps its handle and record
        assert_eq!(e2.handle(), e2_handle);
        assert!(Arc::ptr_eq(&world.entity(e2_handle).unwrap(), &e2));

        // Then - deleting again is a no-op
        assert!(!world.delete_entity(&e1));

        // When - the freed slot is re-issued to a new entity
        let e3 = world.create_entity(components![Comp1(3)]).unwrap();

        // Then
        assert_eq!(e3.handle(), e1_handle);
        assert!(Arc::ptr_eq(&world.entity(e1_handle).unwrap(), &e3));
    }

    #[test]
    fn find_single_component() {
        // Given
        let world = World::new();
        let e1 = world.create_entity(components![Comp1(0)]).unwrap();
        let e2 = world.create_entity(components![Comp1(1), Comp2(2)]).unwrap();

        // When / Then - every entity holding Comp1, across compositions
        let found: Vec<_> = world.find::<(Comp1,)>().collect();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].comp(), &Comp1(0));
        assert!(Arc::ptr_eq(found[0].entity(), &e1));
        assert_eq!(found[1].comp(), &Comp1(1));
        assert!(Arc::ptr_eq(found[1].entity(), &e2));

        // When / Then - only the second entity holds Comp2
        let found: Vec<_> = world.find::<(Comp2,)>().collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].comp(), &Comp2(2));
        assert!(Arc::ptr_eq(found[0].entity(), &e2));

        // When / Then - Comp3 was never attached anywhere
        assert_eq!(world.find::<(Comp3,)>().count(), 0);
    }

    #[test]
    fn find_two_components() {
        // Given
        let world = World::new();
        let e1 = world.create_entity(components![Comp1(1), Comp2(2)]).unwrap();
        let e2 = world
            .create_entity(components![Comp1(3), Comp2(4), Comp3(5)])
            .unwrap();

        // When / Then
        let found: Vec<_> = world.find::<(Comp1, Comp2)>().collect();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].comp1(), &Comp1(1));
        assert_eq!(found[0].comp2(), &Comp2(2));
        assert!(Arc::ptr_eq(found[0].entity(), &e1));
        assert_eq!(found[1].comp1(), &Comp1(3));
        assert_eq!(found[1].comp2(), &Comp2(4));
        assert!(Arc::ptr_eq(found[1].entity(), &e2));

        // When / Then - positions are canonical regardless of query order
        let found: Vec<_> = world.find::<(Comp2, Comp3)>().collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].comp1(), &Comp2(4));
        assert_eq!(found[0].comp2(), &Comp3(5));
        assert!(Arc::ptr_eq(found[0].entity(), &e2));
    }

    #[test]
    fn find_skips_deleted_entities() {
        // Given
        let world = World::new();
        let _e1 = world.create_entity(components![Comp1(1)]).unwrap();
        let e2 = world.create_entity(components![Comp1(2)]).unwrap();
        let _e3 = world.create_entity(components![Comp1(3)]).unwrap();

        // When
        world.delete_entity(&e2);

        // Then
        let values: Vec<i64> = world.find::<(Comp1,)>().map(|w| w.comp().0).collect();
        assert_eq!(values, vec![1, 3]);
    }

    #[test]
    fn find_crosses_page_boundaries() {
        // Given - four-slot pages force the tenant to grow
        let config = Config {
            num_of_pages_bit_size: 6,
            page_capacity_bit_size: 2,
            ..Config::default()
        };
        let world = World::with_config(config);
        for value in 0..10 {
            world.create_entity(components![Comp1(value)]).unwrap();
        }

        // When
        let mut values: Vec<i64> = world.find::<(Comp1,)>().map(|w| w.comp().0).collect();

        // Then - one tuple per live entity, no page skipped or repeated
        values.sort();
        assert_eq!(values, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn states_through_the_world() {
        // Given
        let world = World::new();
        let e1 = world.create_entity(components![Comp1(1)]).unwrap();
        let e2 = world.create_entity(components![Comp1(2)]).unwrap();

        // When
        world.set_state(&e1, Some(Phase::Idle)).unwrap();
        world.set_state(&e2, Some(Phase::Running)).unwrap();

        // Then
        let composition = world.composition_of(&e1).unwrap();
        let idle: Vec<_> = composition.entities_in_state(&Phase::Idle).collect();
        assert_eq!(idle.len(), 1);
        assert!(Arc::ptr_eq(&idle[0], &e1));

        // When - clearing the state empties the chain
        world.set_state(&e1, None::<Phase>).unwrap();

        // Then
        assert_eq!(composition.entities_in_state(&Phase::Idle).count(), 0);
        assert_eq!(composition.entities_in_state(&Phase::Running).count(), 1);
    }

    #[test]
    fn worlds_are_independent() {
        // Given
        let w1 = World::new();
        let w2 = World::new();

        // When
        let entity = w1.create_entity(components![Comp1(1)]).unwrap();

        // Then - the other world cannot resolve the handle
        assert!(w2.entity(entity.handle()).is_none());
        assert_eq!(w2.find::<(Comp1,)>().count(), 0);
    }

    #[test]
    fn parallel_create_and_find() {
        // Given
        use std::thread;
        let world = Arc::new(World::new());

        // When - four threads create entities while others query
        let creators: Vec<_> = (0..4)
            .map(|thread_index| {
                let world = Arc::clone(&world);
                thread::spawn(move || {
                    for value in 0..50 {
                        world
                            .create_entity(components![Comp1(thread_index * 50 + value)])
                            .unwrap();
                    }
                })
            })
            .collect();
        for creator in creators {
            creator.join().unwrap();
        }

        // Then - every created entity is found exactly once
        let mut values: Vec<i64> = world.find::<(Comp1,)>().map(|w| w.comp().0).collect();
        values.sort();
        assert_eq!(values, (0..200).collect::<Vec<_>>());
    }
}
