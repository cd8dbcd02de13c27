//! An entity-component-system storage core built around a paged object pool.
//!
//! The crate provides three tightly coupled pieces:
//!
//! - a lock-lean, paged pool handing out dense 64-bit handles with slot
//!   reuse ([`ecs::storage`]);
//! - archetype-grouped entity storage with canonically ordered component
//!   tuples and fixed-offset queries ([`ecs::archetype`], [`ecs::query`]);
//! - intrusive per-state entity chains with O(1) attach and detach
//!   ([`ecs::state`]).
//!
//! Start at [`ecs::world::World`].

// Allow the derive macros to resolve ::hive_engine paths inside this crate.
extern crate self as hive_engine;

pub mod ecs;

pub use ecs::Config;
pub use ecs::world::World;
