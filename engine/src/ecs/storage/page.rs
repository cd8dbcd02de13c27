use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::RwLock;

/// A fixed-capacity chunk of pool slots.
///
/// Slots never move: once a slot index has been handed out it stays valid for
/// the lifetime of the pool, though its contents may be rewritten when a
/// freed handle is re-issued. The page tracks how many slots have been
/// reserved with an atomic counter; reservation is speculative and a failed
/// reservation compensates the counter back down.
///
/// Pages of one tenant form a chain through `previous`, newest first, so the
/// tenant's iterators can walk every slot it ever issued.
pub struct Page<T> {
    /// The page's position in the pool's page table.
    id: u32,

    /// The page that was the tenant's current page when this one was created.
    previous: Option<Arc<Page<T>>>,

    /// Number of reserved slots. Monotonic except for compensating decrements.
    size: AtomicU32,

    /// The slot array. A write-lock release on a slot publishes its contents.
    slots: Box<[RwLock<Option<Arc<T>>>]>,
}

impl<T> Page<T> {
    /// Create an empty page with the given id and capacity.
    pub(crate) fn new(id: u32, capacity: u32, previous: Option<Arc<Page<T>>>) -> Self {
        let slots = (0..capacity)
            .map(|_| RwLock::new(None))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            id,
            previous,
            size: AtomicU32::new(0),
            slots,
        }
    }

    /// Get the page's position in the pool's page table.
    #[inline]
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Get the number of slots this page can hold.
    #[inline]
    pub fn capacity(&self) -> u32 {
        self.slots.len() as u32
    }

    /// Get the number of reserved slots, clamped to the capacity.
    ///
    /// Concurrent speculative reservations can briefly push the raw counter
    /// past the capacity before they compensate; readers only ever see the
    /// clamped value.
    #[inline]
    pub fn len(&self) -> u32 {
        self.size.load(Ordering::Acquire).min(self.capacity())
    }

    /// Check whether no slots have been reserved yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the previous page in this tenant's chain, if any.
    #[inline]
    pub fn previous(&self) -> Option<&Arc<Page<T>>> {
        self.previous.as_ref()
    }

    /// Speculatively reserve the next slot.
    ///
    /// Returns the reserved slot index, or `None` when the page is full. On a
    /// full page the speculative increment is compensated so the counter
    /// settles back at the capacity.
    pub(crate) fn reserve(&self) -> Option<u32> {
        let slot = self.size.fetch_add(1, Ordering::AcqRel);
        if slot >= self.capacity() {
            self.size.fetch_sub(1, Ordering::AcqRel);
            return None;
        }
        Some(slot)
    }

    /// Read the entry stored at a slot.
    pub(crate) fn get(&self, slot: u32) -> Option<Arc<T>> {
        self.slots.get(slot as usize)?.read().clone()
    }

    /// Store an entry at a slot, replacing any prior occupant.
    pub(crate) fn set(&self, slot: u32, entry: Arc<T>) {
        if let Some(cell) = self.slots.get(slot as usize) {
            *cell.write() = Some(entry);
        } else {
            debug_assert!(false, "slot {} out of bounds for page {}", slot, self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserve_until_full() {
        // Given
        let page: Page<u32> = Page::new(0, 4, None);

        // When - reserve every slot
        let slots: Vec<_> = (0..4).map(|_| page.reserve()).collect();

        // Then - distinct ascending slots, then exhaustion
        assert_eq!(slots, vec![Some(0), Some(1), Some(2), Some(3)]);
        assert_eq!(page.reserve(), None);
        assert_eq!(page.len(), 4);
    }

    #[test]
    fn failed_reserve_compensates() {
        // Given
        let page: Page<u32> = Page::new(0, 1, None);
        page.reserve();

        // When - repeated failures must not wedge the counter
        for _ in 0..100 {
            assert_eq!(page.reserve(), None);
        }

        // Then
        assert_eq!(page.len(), 1);
    }

    #[test]
    fn slots_hold_entries() {
        // Given
        let page: Page<&str> = Page::new(3, 8, None);
        let slot = page.reserve().unwrap();

        // When
        page.set(slot, Arc::new("entry"));

        // Then
        assert_eq!(page.get(slot).as_deref(), Some(&"entry"));
        assert_eq!(page.get(slot + 1), None);
    }

    #[test]
    fn rewrite_replaces_entry() {
        // Given
        let page: Page<u32> = Page::new(0, 2, None);
        let slot = page.reserve().unwrap();
        page.set(slot, Arc::new(1));

        // When
        page.set(slot, Arc::new(2));

        // Then
        assert_eq!(page.get(slot).as_deref(), Some(&2));
    }

    #[test]
    fn chain_links_to_previous() {
        // Given
        let first: Arc<Page<u32>> = Arc::new(Page::new(0, 2, None));

        // When
        let second = Page::new(1, 2, Some(Arc::clone(&first)));

        // Then
        assert_eq!(second.previous().unwrap().id(), 0);
        assert!(first.previous().is_none());
    }
}
