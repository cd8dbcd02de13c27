use std::sync::{Arc, OnceLock};
use std::sync::atomic::{AtomicU32, Ordering};

use log::debug;

use crate::ecs::error::Error;
use crate::ecs::storage::{page::Page, schema, schema::IdSchema};

/// A paged, handle-addressable pool of shared records.
///
/// The pool owns the page table; tenants draw pages from it and issue the
/// handles that address individual slots. Page ids are assigned from a
/// monotonic counter and never recycled, and a page, once installed, is never
/// moved or freed for the pool's lifetime. Entries stay where they were
/// written until a re-issued handle overwrites the slot.
///
/// The page table uses write-once cells: a page is fully constructed before
/// its cell is set, so readers that observe the cell observe the page.
pub struct ChunkedPool<T> {
    /// The handle bit schema shared by every tenant of this pool.
    schema: IdSchema,

    /// Write-once page table, sized to the schema's page-index range.
    pages: Box<[OnceLock<Arc<Page<T>>>]>,

    /// The next page id to assign.
    page_index: AtomicU32,
}

impl<T> ChunkedPool<T> {
    /// Create an empty pool laid out according to the given schema.
    pub fn new(schema: IdSchema) -> Self {
        let pages = (0..schema.max_pages())
            .map(|_| OnceLock::new())
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            schema,
            pages,
            page_index: AtomicU32::new(0),
        }
    }

    /// Get the handle schema for this pool.
    #[inline]
    pub fn schema(&self) -> IdSchema {
        self.schema
    }

    /// Get the number of pages allocated so far.
    #[inline]
    pub fn pages_allocated(&self) -> u32 {
        self.page_index.load(Ordering::Acquire).min(self.schema.max_pages())
    }

    /// Allocate the next page and chain it to the caller's current page.
    ///
    /// Fails only on exhaustion, once every page id the schema can express
    /// has been assigned.
    pub(crate) fn new_page(&self, previous: Option<Arc<Page<T>>>) -> Result<Arc<Page<T>>, Error> {
        let id = self.page_index.fetch_add(1, Ordering::AcqRel);
        if id >= self.schema.max_pages() {
            return Err(Error::PagesExhausted {
                capacity: self.schema.max_pages(),
            });
        }

        let page = Arc::new(Page::new(id, self.schema.page_capacity(), previous));
        let _installed = self.pages[id as usize].set(Arc::clone(&page));
        debug_assert!(_installed.is_ok(), "page id {} assigned twice", id);

        debug!("pool allocated page {id} ({} slots)", self.schema.page_capacity());
        Ok(page)
    }

    /// Get the installed page with the given id.
    #[inline]
    pub fn page(&self, id: u32) -> Option<&Arc<Page<T>>> {
        self.pages.get(id as usize)?.get()
    }

    /// Look up the entry a handle addresses.
    ///
    /// Returns `None` when the handle carries the detached flag, names a page
    /// that was never allocated, or addresses an empty slot.
    pub fn get_entry(&self, handle: u64) -> Option<Arc<T>> {
        if schema::is_detached(handle) {
            return None;
        }
        self.page(self.schema.page_of(handle))?
            .get(self.schema.slot_of(handle))
    }

    /// Write an entry into the slot a handle addresses.
    pub(crate) fn install(&self, handle: u64, entry: Arc<T>) {
        if let Some(page) = self.page(self.schema.page_of(handle)) {
            page.set(self.schema.slot_of(handle), entry);
        } else {
            debug_assert!(false, "install on unallocated page {}", self.schema.page_of(handle));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_ids_are_monotonic() {
        // Given
        let pool: ChunkedPool<u32> = ChunkedPool::new(IdSchema::new(4, 2));

        // When
        let first = pool.new_page(None).unwrap();
        let second = pool.new_page(Some(Arc::clone(&first))).unwrap();
        let third = pool.new_page(Some(Arc::clone(&second))).unwrap();

        // Then
        assert_eq!(first.id(), 0);
        assert_eq!(second.id(), 1);
        assert_eq!(third.id(), 2);
        assert_eq!(pool.pages_allocated(), 3);
    }

    #[test]
    fn pool_exhaustion() {
        // Given - room for exactly two pages
        let pool: ChunkedPool<u32> = ChunkedPool::new(IdSchema::new(1, 2));
        pool.new_page(None).unwrap();
        pool.new_page(None).unwrap();

        // When
        let result = pool.new_page(None);

        // Then
        assert_eq!(result.err(), Some(Error::PagesExhausted { capacity: 2 }));
    }

    #[test]
    fn entry_round_trip() {
        // Given
        let pool: ChunkedPool<&str> = ChunkedPool::new(IdSchema::new(4, 4));
        let page = pool.new_page(None).unwrap();
        let slot = page.reserve().unwrap();
        let handle = pool.schema().encode(page.id(), slot, 0);

        // When
        pool.install(handle, Arc::new("stored"));

        // Then
        assert_eq!(pool.get_entry(handle).as_deref(), Some(&"stored"));
    }

    #[test]
    fn get_entry_misses_are_none() {
        // Given
        let pool: ChunkedPool<u32> = ChunkedPool::new(IdSchema::new(4, 4));
        let page = pool.new_page(None).unwrap();
        let slot = page.reserve().unwrap();
        let handle = pool.schema().encode(page.id(), slot, 0);
        pool.install(handle, Arc::new(9));

        // Then - empty slot on an allocated page
        let empty = pool.schema().encode(page.id(), slot + 1, 0);
        assert_eq!(pool.get_entry(empty), None);

        // Then - page never allocated
        let unallocated = pool.schema().encode(7, 0, 0);
        assert_eq!(pool.get_entry(unallocated), None);

        // Then - detached flag masks an occupied slot
        assert_eq!(pool.get_entry(schema::with_detached(handle)), None);
    }
}
