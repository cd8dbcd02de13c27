//! Component typing for the ECS.
//!
//! Components are the runtime-typed values attached to entities. Their
//! identity is their Rust type: the [`ClassIndex`] assigns each component (or
//! state) type a dense positive integer, and archetypes use that integer to
//! index component tuples in O(1).
//!
//! ## Architecture
//!
//! - [`Component`]: the trait all component types implement, normally via
//!   `#[derive(Component)]`
//! - [`ClassId`]: a dense positive identifier for a registered class
//! - [`ClassIndex`]: thread-safe class registration and lookup
//! - [`Spec`]: a canonical, ordered set of class ids identifying an archetype
//!
//! ## Usage
//!
//! ```ignore
//! use hive_engine::components;
//! use hive_macros::Component;
//!
//! #[derive(Component)]
//! struct Position { x: f32, y: f32 }
//!
//! let entity = world.create_entity(components![Position { x: 0.0, y: 0.0 }])?;
//! ```

use std::any::{Any, TypeId};
use std::sync::Arc;

mod registry;
mod spec;

pub use registry::ClassIndex;
pub use spec::Spec;

/// A class identifier. A dense positive integer naming one registered
/// component or state type; 0 is reserved for "unknown".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClassId(u32);

impl ClassId {
    /// Construct a class id from its raw value.
    ///
    /// Only the [`ClassIndex`] mints new ids; this stays crate-private.
    #[inline]
    pub(crate) const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw positive index value.
    #[inline]
    pub fn raw(&self) -> u32 {
        self.0
    }

    /// Get the index of this class if it were to live in indexable storage (e.g. Vec)
    #[inline]
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// A trait representing a component in the ECS.
///
/// Implementations are normally generated with `#[derive(Component)]`. The
/// two methods expose what the storage core needs at runtime: the concrete
/// type for class lookup, and an `Any` view for typed query projection.
pub trait Component: Send + Sync + 'static {
    /// Get the `TypeId` of the concrete component type.
    fn class_type(&self) -> TypeId;

    /// View the component as a shared `Any` for downcasting.
    fn as_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// Box a list of component values into the shared, type-erased form the
/// entity factories accept.
///
/// ```ignore
/// let entity = world.create_entity(components![Position::default(), Velocity::default()])?;
/// ```
#[macro_export]
macro_rules! components {
    ($($component:expr),* $(,)?) => {
        vec![$(
            ::std::sync::Arc::new($component)
                as ::std::sync::Arc<dyn $crate::ecs::component::Component>
        ),*]
    };
}
