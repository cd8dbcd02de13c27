//! Paged handle-addressed storage for entity records.
//!
//! This module is the allocation substrate of the ECS. Records live in
//! [`ChunkedPool`] pages and are addressed by 64-bit handles whose bit layout
//! is defined by [`IdSchema`]. Each archetype owns a [`Tenant`], its private
//! view over the pool, which issues handles, recycles freed ones and
//! registers records into slots.
//!
//! # Guarantees
//!
//! - Handles are unique while live; a freed handle may be re-issued later
//!   with its flag bits cleared.
//! - Pages are never moved or freed for the pool's lifetime; a stored record
//!   stays put until its slot is overwritten by a re-issued handle.
//! - `register` publishes through the slot lock: once it returns, any
//!   `get_entry` on the same handle observes the record.
//!
//! # Concurrency
//!
//! All operations are safe under parallel callers. Slot reservation is a
//! speculative atomic increment with a compensating decrement; page growth is
//! a short write-lock transition; the page table publishes through
//! write-once cells.

pub mod schema;

mod page;
mod pool;
mod tenant;

pub use page::Page;
pub use pool::ChunkedPool;
pub use schema::IdSchema;
pub use tenant::Tenant;
