use thiserror::Error;

/// Errors surfaced by the storage core.
///
/// Only capacity exhaustion is reported through `Result`; hot-path misses
/// (stale handles, unknown component types) are expressed as `None` returns
/// or sentinel positions instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    /// The pool's page table is full; no further pages can be allocated.
    #[error("chunked pool exhausted: all {capacity} pages are allocated")]
    PagesExhausted {
        /// The maximum number of pages the pool can hold.
        capacity: u32,
    },

    /// The class index cannot assign another component or state class.
    #[error("class index exhausted: all {capacity} class slots are assigned")]
    ClassCapacity {
        /// The maximum number of distinct classes the index can hold.
        capacity: usize,
    },
}
