//! Query result tuples.
//!
//! A query over n component types yields one `With`n value per matching
//! entity, carrying a shared reference to each requested component at its
//! canonical position plus the owning entity. The family covers arities one
//! through six.

use std::sync::Arc;

use crate::ecs::component::Component;
use crate::ecs::entity::Entity;

/// A single-component query result: one component and its owning entity.
pub struct With1<T1: Component> {
    comp: Arc<T1>,
    entity: Arc<Entity>,
}

impl<T1: Component> With1<T1> {
    #[inline]
    pub(crate) fn new(comp: Arc<T1>, entity: Arc<Entity>) -> Self {
        Self { comp, entity }
    }

    /// Get the matched component.
    #[inline]
    pub fn comp(&self) -> &T1 {
        &self.comp
    }

    /// Get the entity owning the component.
    #[inline]
    pub fn entity(&self) -> &Arc<Entity> {
        &self.entity
    }
}

macro_rules! with_tuple {
    ($(#[$doc:meta])* $with:ident, $(($T:ident, $field:ident, $comp:ident)),+) => {
        $(#[$doc])*
        pub struct $with<$($T: Component),+> {
            $($field: Arc<$T>,)+
            entity: Arc<Entity>,
        }

        impl<$($T: Component),+> $with<$($T),+> {
            #[inline]
            pub(crate) fn new($($field: Arc<$T>,)+ entity: Arc<Entity>) -> Self {
                Self { $($field,)+ entity }
            }

            $(
                /// Get the matched component at this position.
                #[inline]
                pub fn $comp(&self) -> &$T {
                    &self.$field
                }
            )+

            /// Get the entity owning the components.
            #[inline]
            pub fn entity(&self) -> &Arc<Entity> {
                &self.entity
            }
        }
    };
}

with_tuple!(
    /// A two-component query result.
    With2, (T1, c1, comp1), (T2, c2, comp2)
);
with_tuple!(
    /// A three-component query result.
    With3, (T1, c1, comp1), (T2, c2, comp2), (T3, c3, comp3)
);
with_tuple!(
    /// A four-component query result.
    With4, (T1, c1, comp1), (T2, c2, comp2), (T3, c3, comp3), (T4, c4, comp4)
);
with_tuple!(
    /// A five-component query result.
    With5, (T1, c1, comp1), (T2, c2, comp2), (T3, c3, comp3), (T4, c4, comp4), (T5, c5, comp5)
);
with_tuple!(
    /// A six-component query result.
    With6, (T1, c1, comp1), (T2, c2, comp2), (T3, c3, comp3), (T4, c4, comp4), (T5, c5, comp5),
    (T6, c6, comp6)
);
