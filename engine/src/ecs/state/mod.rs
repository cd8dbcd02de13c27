//! State indexing for archetypes.
//!
//! A state is a value of a user enum attached to entities, e.g. a phase in a
//! lifecycle. Entities of one archetype that share the same state value are
//! linked into an intrusive doubly linked chain, keyed by
//! `(state class index, ordinal)`, so "all entities in state X" is an O(1)
//! lookup plus a pointer walk — no scan of the archetype.
//!
//! # Chain shape
//!
//! The map holds the chain's *root*: the most recently attached entity. The
//! root is the only member carrying the state key and the only member whose
//! `next` link is empty; `prev` links lead from the root toward the tail.
//! Attaching replaces the root; detaching splices in O(1).
//!
//! # Concurrency
//!
//! Root lookups read the concurrent map lock-free. Every chain *transition*
//! (attach, root detach, interior splice) serializes on the index's lock and
//! re-reads the entity's root marker under it, so a transition racing a
//! promotion can never operate on a stale dispatch decision. The iterator is
//! single-threaded, not reentrant, and weakly consistent with concurrent
//! transitions.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;

use crate::ecs::component::ClassId;
use crate::ecs::entity::Entity;
use crate::ecs::storage::schema;

/// A trait representing an enum state value attachable to entities.
///
/// Implementations are normally generated with `#[derive(State)]` for
/// fieldless enums; the ordinal is the variant's declaration position.
pub trait State: Send + Sync + 'static {
    /// Get the ordinal of this state value within its enum.
    fn ordinal(&self) -> u32;
}

/// A packed state-chain key: the state class index and the value ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateKey(u64);

impl StateKey {
    /// Pack a key from a registered state class and a value ordinal.
    #[inline]
    pub(crate) fn new(class: ClassId, ordinal: u32) -> Self {
        Self(((class.raw() as u64) << 32) | ordinal as u64)
    }

    /// Get the class index of the state's enum type.
    #[inline]
    pub fn class_index(&self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Get the ordinal of the state value.
    #[inline]
    pub fn ordinal(&self) -> u32 {
        self.0 as u32
    }

    /// Get the packed word stored in entity records.
    #[inline]
    pub(crate) fn raw(&self) -> u64 {
        self.0
    }
}

/// The per-archetype mapping from state keys to chain roots.
pub struct StateIndex {
    /// Chain roots by packed key. Read lock-free by iterators.
    roots: DashMap<u64, Arc<Entity>>,

    /// Serializes every chain transition for this archetype.
    lock: Mutex<()>,
}

impl Default for StateIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl StateIndex {
    /// Create an empty state index.
    pub fn new() -> Self {
        Self {
            roots: DashMap::new(),
            lock: Mutex::new(()),
        }
    }

    /// Get the number of state keys with at least one attached entity.
    #[inline]
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    /// Check whether no entity is attached to any state.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Get the root entity of the chain for `key`, if any entity holds that
    /// state.
    #[inline]
    pub fn root(&self, key: StateKey) -> Option<Arc<Entity>> {
        self.roots.get(&key.raw()).map(|root| Arc::clone(&root))
    }

    /// Iterate the chain for `key`, root first, then tail-ward.
    pub fn iter(&self, key: StateKey) -> StateIter {
        StateIter {
            cursor: self.root(key),
        }
    }

    /// Move an entity out of its current chain (if any) and into the chain
    /// for `to` (if given). Both halves run under one hold of the lock.
    pub(crate) fn transition(&self, entity: &Arc<Entity>, to: Option<StateKey>) {
        let _guard = self.lock.lock();
        self.detach_locked(entity);
        if let Some(key) = to {
            self.attach_locked(key.raw(), entity);
        }
    }

    /// Attach `entity` as the new root of the chain for `key`.
    fn attach_locked(&self, key: u64, entity: &Arc<Entity>) {
        match self.roots.entry(key) {
            Entry::Vacant(slot) => {
                entity.set_state_key(key);
                slot.insert(Arc::clone(entity));
            }
            Entry::Occupied(mut slot) => {
                // The old root becomes interior: it hands the key to the new
                // root and gains a root-ward link.
                let old = Arc::clone(slot.get());
                *entity.prev_link().write() = Some(Arc::clone(&old));
                entity.set_state_key(key);
                *old.next_link().write() = Some(Arc::clone(entity));
                old.clear_state_key();
                slot.insert(Arc::clone(entity));
            }
        }
    }

    /// Remove `entity` from whatever chain it is part of.
    ///
    /// Dispatches on the root marker re-read under the lock: a racing attach
    /// that promoted this entity to root is therefore always observed.
    fn detach_locked(&self, entity: &Arc<Entity>) {
        let key = entity.state_key_raw();
        if key != schema::NIL {
            // Entity is the root of its chain.
            let prev = entity.prev_link().write().take();
            match prev {
                None => {
                    // Alone in the chain: the key disappears entirely.
                    self.roots.remove_if(&key, |_, root| Arc::ptr_eq(root, entity));
                }
                Some(promoted) => {
                    // Promote the next-most-recent member to root, but only
                    // while the mapping still names this entity.
                    if let Some(mut root) = self.roots.get_mut(&key) {
                        if Arc::ptr_eq(&root, entity) {
                            *root = Arc::clone(&promoted);
                        }
                    }
                    *promoted.next_link().write() = None;
                    promoted.set_state_key(key);
                }
            }
            entity.clear_state_key();
        } else {
            // Interior or tail member; splice the neighbors together. An
            // entity with no root-ward link is not chained at all.
            let next = entity.next_link().write().take();
            if let Some(next) = next {
                let prev = entity.prev_link().write().take();
                if let Some(prev) = &prev {
                    *prev.next_link().write() = Some(Arc::clone(&next));
                }
                *next.prev_link().write() = prev;
            }
        }
    }
}

/// An iterator over one state chain, from the root toward the tail.
///
/// Single-threaded and not reentrant; concurrent chain transitions may or
/// may not be observed. Obtain a fresh iterator to restart.
pub struct StateIter {
    cursor: Option<Arc<Entity>>,
}

impl StateIter {
    /// An iterator over no entities, for unregistered state types.
    pub(crate) fn empty() -> Self {
        Self { cursor: None }
    }
}

impl Iterator for StateIter {
    type Item = Arc<Entity>;

    fn next(&mut self) -> Option<Self::Item> {
        let entity = self.cursor.take()?;
        self.cursor = entity.prev_link().read().clone();
        Some(entity)
    }
}
