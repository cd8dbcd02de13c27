use std::any::TypeId;
use std::sync::atomic::{AtomicU32, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::ecs::component::{ClassId, Component};
use crate::ecs::error::Error;

/// A thread-safe class index. Assigns dense positive integers to component
/// and state types so that tuple positions and state keys can be indexed by
/// small numbers instead of `TypeId`s.
///
/// Lookups are lock-free reads on a sharded concurrent map; registration
/// locks a single shard. Index 0 is reserved to mean "unknown type", so the
/// first registered class receives index 1.
///
/// Why thread-safe?
/// - Archetypes are created lazily from any thread, and all archetypes of a
///   repository must agree on class numbering.
pub struct ClassIndex {
    /// Map from TypeId to class id. Lock-free reads via sharded concurrent hashmap.
    classes: DashMap<TypeId, ClassId>,

    /// Next class index to assign. Starts at 1; 0 means unknown.
    next: AtomicU32,

    /// Hard cap on distinct classes. Positions arrays are sized from this.
    capacity: usize,
}

impl ClassIndex {
    /// Create a class index that can hold up to `capacity` distinct classes.
    pub fn new(capacity: usize) -> Self {
        Self {
            classes: DashMap::new(),
            next: AtomicU32::new(1),
            capacity: capacity.max(1),
        }
    }

    /// Get the capacity of this index.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get the number of classes registered so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Check whether no classes have been registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Get the class id assigned to a type, if registered.
    #[inline]
    pub fn get(&self, type_id: TypeId) -> Option<ClassId> {
        self.classes.get(&type_id).map(|entry| *entry.value())
    }

    /// Get the raw index assigned to a type; 0 when the type is unknown.
    #[inline]
    pub fn index_of(&self, type_id: TypeId) -> u32 {
        self.get(type_id).map_or(0, |class| class.raw())
    }

    /// Get the class id for a type, assigning the next dense index when the
    /// type is new.
    ///
    /// Thread-safe and idempotent: concurrent callers racing on the same new
    /// type all observe the single assigned id. Fails once the configured
    /// capacity is reached.
    pub fn index_or_register(&self, type_id: TypeId) -> Result<ClassId, Error> {
        // Fast path: already registered (lock-free read)
        if let Some(class) = self.get(type_id) {
            return Ok(class);
        }

        // Slow path: the entry API closes the race where two threads both
        // miss the fast path for the same type.
        match self.classes.entry(type_id) {
            Entry::Occupied(entry) => Ok(*entry.get()),
            Entry::Vacant(entry) => {
                let raw = self.next.fetch_add(1, Ordering::Relaxed);
                if raw as usize > self.capacity {
                    return Err(Error::ClassCapacity {
                        capacity: self.capacity,
                    });
                }
                let class = ClassId::new(raw);
                entry.insert(class);
                Ok(class)
            }
        }
    }

    /// Register a component type by its compile-time type.
    #[inline]
    pub fn register<C: Component>(&self) -> Result<ClassId, Error> {
        self.index_or_register(TypeId::of::<C>())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use hive_macros::Component;

    use super::*;

    #[test]
    fn class_registration() {
        // Given
        #[derive(Component, Debug)]
        struct Position();

        #[derive(Component, Debug)]
        struct Velocity();

        let index = ClassIndex::new(1024);

        // When
        let pos = index.register::<Position>().unwrap();
        let vel = index.register::<Velocity>().unwrap();

        // Then - dense positive indices, assigned in registration order
        assert_eq!(pos.raw(), 1);
        assert_eq!(vel.raw(), 2);
        assert_eq!(index.len(), 2);

        // Then - registering the same type again yields the same id
        assert_eq!(index.register::<Position>().unwrap(), pos);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn unknown_type_is_index_zero() {
        // Given
        #[derive(Component, Debug)]
        struct Health();

        let index = ClassIndex::new(1024);

        // Then
        assert_eq!(index.index_of(TypeId::of::<Health>()), 0);
        assert!(index.get(TypeId::of::<Health>()).is_none());

        // When
        let id = index.register::<Health>().unwrap();

        // Then
        assert_eq!(index.index_of(TypeId::of::<Health>()), id.raw());
    }

    #[test]
    fn capacity_exhaustion() {
        // Given - room for two classes
        #[derive(Component, Debug)]
        struct Comp1();
        #[derive(Component, Debug)]
        struct Comp2();
        #[derive(Component, Debug)]
        struct Comp3();

        let index = ClassIndex::new(2);
        index.register::<Comp1>().unwrap();
        index.register::<Comp2>().unwrap();

        // When
        let result = index.register::<Comp3>();

        // Then
        assert_eq!(result.err(), Some(Error::ClassCapacity { capacity: 2 }));

        // Then - existing registrations are unaffected
        assert_eq!(index.register::<Comp1>().unwrap().raw(), 1);
    }

    #[test]
    fn concurrent_registration() {
        // Given
        #[derive(Component, Debug)]
        struct Position();

        #[derive(Component, Debug)]
        struct Velocity();

        #[derive(Component, Debug)]
        struct Health();

        let index = Arc::new(ClassIndex::new(1024));

        // When - multiple threads register the same types concurrently
        let handles: Vec<_> = (0..10)
            .map(|i| {
                let index = Arc::clone(&index);
                thread::spawn(move || {
                    if i % 3 == 0 {
                        index.register::<Position>().unwrap()
                    } else if i % 3 == 1 {
                        index.register::<Velocity>().unwrap()
                    } else {
                        index.register::<Health>().unwrap()
                    }
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        // Then - all threads registering the same type agree on its id
        let pos_ids: Vec<_> = results.iter().step_by(3).copied().collect();
        let vel_ids: Vec<_> = results.iter().skip(1).step_by(3).copied().collect();
        let health_ids: Vec<_> = results.iter().skip(2).step_by(3).copied().collect();

        assert!(pos_ids.iter().all(|&id| id == pos_ids[0]));
        assert!(vel_ids.iter().all(|&id| id == vel_ids[0]));
        assert!(health_ids.iter().all(|&id| id == health_ids[0]));

        // And the three types have three distinct ids
        assert_ne!(pos_ids[0], vel_ids[0]);
        assert_ne!(pos_ids[0], health_ids[0]);
        assert_ne!(vel_ids[0], health_ids[0]);
    }
}
