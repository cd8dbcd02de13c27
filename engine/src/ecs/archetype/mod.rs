//! Archetypes: compositions of entities sharing one component type-set.
//!
//! A [`Composition`] is the unique home of every entity whose component
//! classes match its [`Spec`]. It owns a [`Tenant`] over the shared pool (so
//! its entities live on its own page chain), a dense reverse index from class
//! id to tuple position (so queries project components with fixed offsets),
//! and a [`StateIndex`] linking its entities into per-state chains.
//!
//! Component tuples are stored in canonical order: ascending class index.
//! Callers may pass components in any order; the composition sorts the tuple
//! in place before storing it, unless the caller marks it `prepared`.

mod registry;

pub use registry::Compositions;

use std::sync::Arc;

use crate::ecs::component::{ClassId, ClassIndex, Component, Spec};
use crate::ecs::entity::{ComponentData, Entity};
use crate::ecs::error::Error;
use crate::ecs::query::{Select, SelectIter};
use crate::ecs::state::{State, StateIndex, StateIter, StateKey};
use crate::ecs::storage::{ChunkedPool, Tenant};

/// Sentinel position for a class this composition does not store.
pub const NO_POSITION: i32 = -1;

/// A unique identifier for a composition in the ECS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Id(u32);

impl Id {
    /// Create a new Id with the given unique identifier.
    #[inline]
    pub const fn new(id: u32) -> Self {
        Id(id)
    }

    /// Get the unique identifier of the Id.
    #[inline]
    pub fn id(&self) -> u32 {
        self.0
    }

    /// Get the index of the Id as a usize to be used in collections.
    #[inline]
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// A composition: the archetype grouping entities with one component
/// type-set, together with their storage.
pub struct Composition {
    /// The composition's unique identifier.
    id: Id,

    /// The component classes stored here, canonical ascending order.
    spec: Spec,

    /// Reverse index: `positions[class.index()]` is the tuple position of
    /// that class, or [`NO_POSITION`]. Sized to the class-index capacity.
    positions: Box<[i32]>,

    /// The composition's private allocator over the shared pool.
    tenant: Tenant<Entity>,

    /// The class index shared across the repository.
    classes: Arc<ClassIndex>,

    /// Per-state chains over this composition's entities.
    states: StateIndex,
}

impl Composition {
    /// Create a composition for the given spec, drawing storage from `pool`.
    pub(crate) fn new(
        id: Id,
        spec: Spec,
        classes: Arc<ClassIndex>,
        pool: Arc<ChunkedPool<Entity>>,
        free_capacity: usize,
    ) -> Result<Self, Error> {
        let tenant = Tenant::new(pool, free_capacity)?;

        let mut positions = vec![NO_POSITION; classes.capacity() + 1].into_boxed_slice();
        for (position, class) in spec.ids().iter().enumerate() {
            positions[class.index()] = position as i32;
        }

        Ok(Self {
            id,
            spec,
            positions,
            tenant,
            classes,
            states: StateIndex::new(),
        })
    }

    /// Get the composition's unique identifier.
    #[inline]
    pub fn id(&self) -> Id {
        self.id
    }

    /// Get the component specification of this composition.
    #[inline]
    pub fn spec(&self) -> &Spec {
        &self.spec
    }

    /// Get the number of component classes stored per entity.
    #[inline]
    pub fn arity(&self) -> usize {
        self.spec.len()
    }

    /// Get the canonical tuple position of a class, or [`NO_POSITION`] when
    /// this composition does not store it.
    #[inline]
    pub fn position_of(&self, class: ClassId) -> i32 {
        self.positions
            .get(class.index())
            .copied()
            .unwrap_or(NO_POSITION)
    }

    /// Get this composition's tenant.
    #[inline]
    pub(crate) fn tenant(&self) -> &Tenant<Entity> {
        &self.tenant
    }

    /// Get this composition's state index.
    #[inline]
    pub fn states(&self) -> &StateIndex {
        &self.states
    }

    /// Create a new entity holding the given components.
    ///
    /// The components may arrive in any order unless `prepared` is set, in
    /// which case they are trusted to already be in canonical order. Fails
    /// only when the pool is out of pages.
    pub fn create_entity(
        &self,
        name: Option<String>,
        prepared: bool,
        mut components: Vec<Arc<dyn Component>>,
    ) -> Result<Arc<Entity>, Error> {
        debug_assert_eq!(
            components.len(),
            self.arity(),
            "component count does not match the composition"
        );

        let handle = self.tenant.next_id()?;
        if !prepared && components.len() > 1 {
            self.canonicalize(&mut components);
        }

        let entity = Arc::new(Entity::new(handle, self.id, name));
        entity.set_data(ComponentData::from(components));
        Ok(self.tenant.register(handle, entity))
    }

    /// Move an existing entity into this composition.
    ///
    /// Issues a fresh handle here, rebinds the entity's back-pointer and
    /// installs the new component tuple. The entity must already have been
    /// detached from its previous composition.
    pub fn attach_entity(
        &self,
        entity: &Arc<Entity>,
        prepared: bool,
        mut components: Vec<Arc<dyn Component>>,
    ) -> Result<(), Error> {
        debug_assert_eq!(
            components.len(),
            self.arity(),
            "component count does not match the composition"
        );

        let handle = self.tenant.next_id()?;
        if !prepared && components.len() > 1 {
            self.canonicalize(&mut components);
        }

        entity.set_handle(handle);
        entity.set_composition(self.id);
        entity.set_data(ComponentData::from(components));
        self.tenant.register(handle, Arc::clone(entity));
        Ok(())
    }

    /// Detach an entity from this composition.
    ///
    /// The stored handle is flagged detached before it is freed, so stale
    /// lookups miss while the slot awaits re-issue.
    pub fn detach_entity(&self, entity: &Arc<Entity>) {
        let handle = entity.handle();
        entity.mark_detached();
        entity.clear_composition();
        self.tenant.free_id(handle);
    }

    /// Detach an entity from its state chain (if any), then from this
    /// composition.
    pub fn detach_entity_and_state(&self, entity: &Arc<Entity>) {
        self.states.transition(entity, None);
        self.detach_entity(entity);
    }

    /// Move an entity to the chain for `state`, or out of any chain when
    /// `state` is `None`.
    ///
    /// The state's class is allocated lazily on first use; this is the only
    /// failure mode.
    pub fn set_entity_state<S: State>(
        &self,
        entity: &Arc<Entity>,
        state: Option<S>,
    ) -> Result<(), Error> {
        let key = match &state {
            None => None,
            Some(value) => Some(self.state_key(value)?),
        };
        self.states.transition(entity, key);
        Ok(())
    }

    /// Iterate the entities currently in `state`, most recently attached
    /// first. Unknown state types yield an empty iterator.
    pub fn entities_in_state<S: State>(&self, state: &S) -> StateIter {
        match self.classes.get(std::any::TypeId::of::<S>()) {
            Some(class) => self.states.iter(StateKey::new(class, state.ordinal())),
            None => StateIter::empty(),
        }
    }

    /// Iterate this composition's live entities, projecting the selected
    /// component types. A type this composition does not store yields an
    /// empty iterator.
    pub fn select<S: Select>(self: &Arc<Self>) -> SelectIter<S> {
        match S::classes(&self.classes) {
            Some(classes) => SelectIter::new(Arc::clone(self), &classes),
            None => SelectIter::empty(Arc::clone(self)),
        }
    }

    /// Resolve the chain key for a state value, registering its class.
    fn state_key<S: State>(&self, state: &S) -> Result<StateKey, Error> {
        let class = self.classes.index_or_register(std::any::TypeId::of::<S>())?;
        Ok(StateKey::new(class, state.ordinal()))
    }

    /// Sort a component tuple into canonical positions, in place.
    ///
    /// Repeatedly swaps the component under the cursor to its target
    /// position; each swap finalizes one element, so a tuple of n components
    /// settles in at most n - 1 swaps. The swap budget caps the loop when a
    /// caller breaks the contract (duplicate or foreign component types),
    /// leaving the tuple unsorted rather than spinning.
    fn canonicalize(&self, components: &mut [Arc<dyn Component>]) {
        let mut cursor = 0;
        let mut budget = components.len();
        while cursor < components.len() {
            let class = self.classes.get(components[cursor].class_type());
            let target = class.map_or(NO_POSITION, |class| self.position_of(class));
            debug_assert!(
                target >= 0 && (target as usize) < components.len(),
                "component class not stored by this composition"
            );
            if target < 0 || target as usize == cursor || budget == 0 {
                cursor += 1;
            } else {
                components.swap(cursor, target as usize);
                budget -= 1;
            }
        }
    }
}
