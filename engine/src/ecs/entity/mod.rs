//! Entity records for the ECS.
//!
//! An [`Entity`] is the pool-resident record tying a storage handle to its
//! archetype and component tuple. Records are shared as `Arc<Entity>`: the
//! pool slot holds one reference, and callers hold others. The record's
//! fields are individually synchronized so structural edits from parallel
//! threads stay safe:
//!
//! - the packed handle is an atomic word; detaching sets a flag bit in place,
//!   instantly invalidating the stored handle for pool lookups;
//! - the archetype back-pointer is an atomic composition id;
//! - the state-chain fields (`state key`, `prev`, `next`) are written only
//!   under the owning archetype's state lock;
//! - the component tuple is swapped wholesale behind a lock, so readers see
//!   either the old tuple or the new one, never a mix.
//!
//! Lifecycle: an entity is created by an archetype (handle issued, record
//! registered), may be detached (handle freed, detached flag set) and
//! re-attached under a new handle, possibly in a different archetype. Deletion
//! is state-chain detachment, then pool detachment, then the data drop.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::ecs::archetype;
use crate::ecs::component::Component;
use crate::ecs::storage::schema;

/// Marker for "no composition" in the archetype back-pointer.
const NO_COMPOSITION: u32 = u32::MAX;

/// A shared component tuple, stored in canonical class order.
pub type ComponentData = Arc<[Arc<dyn Component>]>;

/// An entity record stored in the pool.
pub struct Entity {
    /// The packed storage handle. Carries the detached flag after detach.
    id: AtomicU64,

    /// The id of the composition currently holding this entity.
    composition: AtomicU32,

    /// Optional diagnostic name, fixed at creation.
    name: Option<String>,

    /// Packed state key when this entity is the root of a state chain,
    /// otherwise [`schema::NIL`].
    state_key: AtomicU64,

    /// Chain link toward the tail (away from the root).
    prev: RwLock<Option<Arc<Entity>>>,

    /// Chain link toward the root.
    next: RwLock<Option<Arc<Entity>>>,

    /// The component tuple, canonical order. `None` while transient.
    data: RwLock<Option<ComponentData>>,
}

impl Entity {
    /// Construct a record for a freshly issued handle.
    pub(crate) fn new(handle: u64, composition: archetype::Id, name: Option<String>) -> Self {
        Self {
            id: AtomicU64::new(handle),
            composition: AtomicU32::new(composition.id()),
            name,
            state_key: AtomicU64::new(schema::NIL),
            prev: RwLock::new(None),
            next: RwLock::new(None),
            data: RwLock::new(None),
        }
    }

    /// Get the entity's stored handle.
    ///
    /// After detachment the returned handle carries the detached flag, so
    /// pool lookups through it miss.
    #[inline]
    pub fn handle(&self) -> u64 {
        self.id.load(Ordering::Acquire)
    }

    /// Check whether this entity has been detached from the pool.
    #[inline]
    pub fn is_detached(&self) -> bool {
        schema::is_detached(self.handle())
    }

    /// Get the id of the composition currently holding this entity, if any.
    #[inline]
    pub fn composition_id(&self) -> Option<archetype::Id> {
        match self.composition.load(Ordering::Acquire) {
            NO_COMPOSITION => None,
            raw => Some(archetype::Id::new(raw)),
        }
    }

    /// Get the entity's name, if one was given at creation.
    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Get the entity's component tuple, canonical order.
    #[inline]
    pub fn components(&self) -> Option<ComponentData> {
        self.data.read().clone()
    }

    /// Get the component stored at a canonical tuple position.
    pub fn component_at(&self, position: usize) -> Option<Arc<dyn Component>> {
        self.data.read().as_ref()?.get(position).cloned()
    }

    /// Check whether this entity is the root of a state chain.
    #[inline]
    pub fn is_state_root(&self) -> bool {
        self.state_key.load(Ordering::Acquire) != schema::NIL
    }

    // ---- crate-internal mutation, driven by the owning archetype ----

    /// Rebind the record to a freshly issued handle.
    pub(crate) fn set_handle(&self, handle: u64) {
        self.id.store(handle, Ordering::Release);
    }

    /// Set the detached flag on the stored handle, in place.
    pub(crate) fn mark_detached(&self) {
        self.id.fetch_or(schema::DETACHED_BIT, Ordering::AcqRel);
    }

    /// Point the record at the composition that now holds it.
    pub(crate) fn set_composition(&self, composition: archetype::Id) {
        self.composition.store(composition.id(), Ordering::Release);
    }

    /// Clear the composition back-pointer.
    pub(crate) fn clear_composition(&self) {
        self.composition.store(NO_COMPOSITION, Ordering::Release);
    }

    /// Get the raw composition word, for iterator membership checks.
    #[inline]
    pub(crate) fn composition_raw(&self) -> u32 {
        self.composition.load(Ordering::Acquire)
    }

    /// Install a component tuple.
    pub(crate) fn set_data(&self, data: ComponentData) {
        *self.data.write() = Some(data);
    }

    /// Drop the component tuple.
    pub(crate) fn clear_data(&self) {
        *self.data.write() = None;
    }

    /// Get the raw packed state key ([`schema::NIL`] when not a root).
    #[inline]
    pub(crate) fn state_key_raw(&self) -> u64 {
        self.state_key.load(Ordering::Acquire)
    }

    /// Mark this entity as the root of the chain for `key`.
    pub(crate) fn set_state_key(&self, key: u64) {
        self.state_key.store(key, Ordering::Release);
    }

    /// Clear the root marker.
    pub(crate) fn clear_state_key(&self) {
        self.state_key.store(schema::NIL, Ordering::Release);
    }

    /// Access the tail-ward chain link.
    #[inline]
    pub(crate) fn prev_link(&self) -> &RwLock<Option<Arc<Entity>>> {
        &self.prev
    }

    /// Access the root-ward chain link.
    #[inline]
    pub(crate) fn next_link(&self) -> &RwLock<Option<Arc<Entity>>> {
        &self.next
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("handle", &format_args!("{:#018x}", self.handle()))
            .field("composition", &self.composition_id())
            .field("name", &self.name)
            .field("detached", &self.is_detached())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(handle: u64) -> Entity {
        Entity::new(handle, archetype::Id::new(3), None)
    }

    #[test]
    fn fresh_record() {
        // Given
        let entity = record(42);

        // Then
        assert_eq!(entity.handle(), 42);
        assert!(!entity.is_detached());
        assert_eq!(entity.composition_id(), Some(archetype::Id::new(3)));
        assert!(entity.components().is_none());
        assert!(!entity.is_state_root());
        assert!(entity.name().is_none());
    }

    #[test]
    fn named_record() {
        // Given
        let entity = Entity::new(1, archetype::Id::new(0), Some("player".into()));

        // Then
        assert_eq!(entity.name(), Some("player"));
    }

    #[test]
    fn detach_flags_handle_in_place() {
        // Given
        let entity = record(42);

        // When
        entity.mark_detached();
        entity.clear_composition();

        // Then - the location bits survive, only the flag is added
        assert!(entity.is_detached());
        assert_eq!(schema::without_flags(entity.handle()), 42);
        assert_eq!(entity.composition_id(), None);
    }

    #[test]
    fn rebind_clears_detached() {
        // Given
        let entity = record(42);
        entity.mark_detached();

        // When - re-attached under a fresh handle
        entity.set_handle(99);
        entity.set_composition(archetype::Id::new(7));

        // Then
        assert!(!entity.is_detached());
        assert_eq!(entity.handle(), 99);
        assert_eq!(entity.composition_id(), Some(archetype::Id::new(7)));
    }
}
