use std::sync::Arc;

use crossbeam::queue::ArrayQueue;
use log::warn;
use parking_lot::RwLock;

use crate::ecs::error::Error;
use crate::ecs::storage::{page::Page, pool::ChunkedPool, schema};

/// A per-archetype view over the shared pool that issues and recycles
/// handles.
///
/// Every archetype owns exactly one tenant. The tenant draws whole pages from
/// the pool, so every handle it issues addresses a page of its own chain, and
/// recycles freed handles through a bounded queue before growing onto fresh
/// slots.
///
/// # Concurrency
///
/// `next_id`, `free_id` and `register` may be called concurrently. Slot
/// reservation is a speculative atomic increment on the current page; when a
/// page fills up, the loser threads escalate to the page lock, and exactly
/// one of them installs a replacement page. A failed speculative increment is
/// compensated on the page counter.
pub struct Tenant<T> {
    /// The pool this tenant draws pages from.
    pool: Arc<ChunkedPool<T>>,

    /// The newest page. Guarded so page growth is a single transition.
    current: RwLock<Arc<Page<T>>>,

    /// Recycled handles, bounded. Overflow leaks the handle into the pool.
    free: ArrayQueue<u64>,
}

impl<T> Tenant<T> {
    /// Create a tenant over the pool, allocating its first page.
    ///
    /// `free_capacity` bounds how many freed handles can await re-issue at
    /// once; handles freed beyond the bound are leaked.
    pub fn new(pool: Arc<ChunkedPool<T>>, free_capacity: usize) -> Result<Self, Error> {
        let first = pool.new_page(None)?;
        Ok(Self {
            pool,
            current: RwLock::new(first),
            free: ArrayQueue::new(free_capacity.max(1)),
        })
    }

    /// Get the pool this tenant draws from.
    #[inline]
    pub fn pool(&self) -> &Arc<ChunkedPool<T>> {
        &self.pool
    }

    /// Get the tenant's newest page.
    #[inline]
    pub(crate) fn current_page(&self) -> Arc<Page<T>> {
        Arc::clone(&self.current.read())
    }

    /// Issue a handle addressing a slot uniquely assigned to the caller.
    ///
    /// Freed handles are re-issued first, with their flag bits cleared.
    /// Otherwise a slot is reserved on the current page; when the page is
    /// full, the tenant grows onto a new pool page. Fails only when the pool
    /// itself is out of pages.
    pub fn next_id(&self) -> Result<u64, Error> {
        if let Some(handle) = self.free.pop() {
            return Ok(schema::without_flags(handle));
        }

        loop {
            let page = self.current_page();
            if let Some(slot) = page.reserve() {
                return Ok(self.pool.schema().encode(page.id(), slot, 0));
            }

            // Page full: escalate. Only the thread that still sees the full
            // page as current installs the replacement; everyone else retries
            // against whatever page won.
            let mut current = self.current.write();
            if Arc::ptr_eq(&current, &page) {
                *current = self.pool.new_page(Some(page))?;
            }
        }
    }

    /// Return a handle to the free queue for later re-issue.
    ///
    /// The slot stays valid in the pool; the owning record must be marked
    /// detached before the handle is freed. When the queue is full the handle
    /// is leaked into the pool — its slot will never be re-issued — which is
    /// an accepted, bounded degradation.
    pub fn free_id(&self, handle: u64) {
        if self.free.push(schema::without_flags(handle)).is_err() {
            warn!(
                "tenant free queue full ({} entries); leaking handle {handle:#018x}",
                self.free.capacity()
            );
        }
    }

    /// Write a record into the slot a handle addresses.
    ///
    /// Publication: the slot is guarded by a lock, and the write-lock release
    /// in the pool happens-before any later read of that slot. Once
    /// `register` returns, `get_entry` on the same handle observes `record`.
    pub fn register(&self, handle: u64, record: Arc<T>) -> Arc<T> {
        self.pool.install(handle, Arc::clone(&record));
        record
    }
}
