use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use log::debug;
use parking_lot::RwLock;

use crate::ecs::archetype::{Composition, Id};
use crate::ecs::component::{ClassId, ClassIndex, Spec};
use crate::ecs::entity::Entity;
use crate::ecs::error::Error;
use crate::ecs::storage::ChunkedPool;

/// Central registry of compositions.
///
/// Guarantees at most one composition per component type-set: lookups by
/// spec hit a concurrent map, and creation runs under that map's entry lock
/// so two racing callers always agree on the winner.
pub struct Compositions {
    /// The pool shared by every composition's tenant.
    pool: Arc<ChunkedPool<Entity>>,

    /// The class index shared across the repository.
    classes: Arc<ClassIndex>,

    /// Free-queue bound handed to each new tenant.
    free_capacity: usize,

    /// The compositions indexed by their component specifications.
    by_spec: DashMap<Spec, Arc<Composition>>,

    /// The compositions stored by their unique identifier.
    by_id: RwLock<Vec<Arc<Composition>>>,
}

impl Compositions {
    /// Create an empty composition registry.
    pub fn new(
        pool: Arc<ChunkedPool<Entity>>,
        classes: Arc<ClassIndex>,
        free_capacity: usize,
    ) -> Self {
        Self {
            pool,
            classes,
            free_capacity,
            by_spec: DashMap::new(),
            by_id: RwLock::new(Vec::new()),
        }
    }

    /// Get the number of registered compositions.
    #[inline]
    pub fn len(&self) -> usize {
        self.by_id.read().len()
    }

    /// Check whether no composition has been created yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.by_id.read().is_empty()
    }

    /// Get the unique composition for a spec, creating it if missing.
    ///
    /// Creation allocates the composition's first pool page, so this can
    /// fail on pool exhaustion.
    pub fn get_or_create(&self, spec: Spec) -> Result<Arc<Composition>, Error> {
        // Fast path: the composition already exists (lock-free read)
        if let Some(existing) = self.by_spec.get(&spec) {
            return Ok(Arc::clone(&existing));
        }

        // Slow path: the entry lock makes creation unique per spec.
        match self.by_spec.entry(spec) {
            Entry::Occupied(entry) => Ok(Arc::clone(entry.get())),
            Entry::Vacant(entry) => {
                let mut by_id = self.by_id.write();
                let id = Id::new(by_id.len() as u32);
                let composition = Arc::new(Composition::new(
                    id,
                    entry.key().clone(),
                    Arc::clone(&self.classes),
                    Arc::clone(&self.pool),
                    self.free_capacity,
                )?);
                by_id.push(Arc::clone(&composition));
                entry.insert(Arc::clone(&composition));
                debug!(
                    "created composition {} over {} classes",
                    id.id(),
                    composition.arity()
                );
                Ok(composition)
            }
        }
    }

    /// Get a composition by its unique identifier.
    #[inline]
    pub fn get(&self, id: Id) -> Option<Arc<Composition>> {
        self.by_id.read().get(id.index()).cloned()
    }

    /// Get a composition by its component specification, if it exists.
    #[inline]
    pub fn get_by_spec(&self, spec: &Spec) -> Option<Arc<Composition>> {
        self.by_spec.get(spec).map(|entry| Arc::clone(&entry))
    }

    /// Get the compositions that store all of the given classes, in creation
    /// order.
    ///
    /// This does not have to be an exact match; any composition whose spec
    /// is a superset can serve a query over these classes.
    pub fn with_classes(&self, classes: &[ClassId]) -> Vec<Arc<Composition>> {
        self.by_id
            .read()
            .iter()
            .filter(|composition| composition.spec().contains_classes(classes))
            .cloned()
            .collect()
    }
}
