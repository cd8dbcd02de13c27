//! Typed queries over compositions.
//!
//! A query names one to six component types and yields a [`result`] tuple
//! (`With1..With6`) for every live entity whose composition stores all of
//! them. Queries are driven by two iterators:
//!
//! - [`SelectIter`]: walks a single composition's page chain. The canonical
//!   tuple positions of the requested types are captured once, at
//!   construction, so projecting each entity is a fixed-offset read.
//! - [`Find`]: chains a `SelectIter` over every composition whose spec
//!   contains the requested classes, in composition creation order.
//!
//! # Weak consistency
//!
//! Iteration tolerates concurrent structural edits by skipping: slots that
//! are empty, records whose stored handle is flagged detached, records whose
//! composition back-pointer says they have moved elsewhere, and records
//! whose component tuple is absent are all passed over silently. A query for
//! a type that was never registered yields nothing.

mod result;

pub use result::{With1, With2, With3, With4, With5, With6};

use std::any::TypeId;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::ecs::archetype::Composition;
use crate::ecs::component::{ClassId, ClassIndex, Component};
use crate::ecs::entity::Entity;
use crate::ecs::storage::Page;

/// Downcast a stored component to its concrete type.
fn downcast<T: Component>(component: &Arc<dyn Component>) -> Option<Arc<T>> {
    Arc::clone(component).as_any_arc().downcast::<T>().ok()
}

/// A selection of component types to query for.
///
/// Implemented for tuples of one to six [`Component`] types; the associated
/// output is the matching `With`n result carrying the components in tuple
/// order.
pub trait Select: 'static {
    /// The result tuple yielded per matching entity.
    type Out;

    /// Resolve the class ids of the selected types, in tuple order.
    ///
    /// `None` when any selected type was never registered — such a query
    /// matches nothing.
    fn classes(index: &ClassIndex) -> Option<Vec<ClassId>>;

    /// Project a result tuple out of an entity's component data.
    ///
    /// `positions` are the canonical tuple positions captured per
    /// composition, in tuple order.
    fn project(
        positions: &[usize],
        data: &[Arc<dyn Component>],
        entity: &Arc<Entity>,
    ) -> Option<Self::Out>;
}

macro_rules! impl_select {
    ($with:ident, $(($T:ident, $index:expr)),+) => {
        impl<$($T: Component),+> Select for ($($T,)+) {
            type Out = $with<$($T),+>;

            fn classes(index: &ClassIndex) -> Option<Vec<ClassId>> {
                Some(vec![$(index.get(TypeId::of::<$T>())?),+])
            }

            fn project(
                positions: &[usize],
                data: &[Arc<dyn Component>],
                entity: &Arc<Entity>,
            ) -> Option<Self::Out> {
                Some($with::new(
                    $(downcast::<$T>(data.get(positions[$index])?)?,)+
                    Arc::clone(entity),
                ))
            }
        }
    };
}

impl_select!(With1, (T1, 0));
impl_select!(With2, (T1, 0), (T2, 1));
impl_select!(With3, (T1, 0), (T2, 1), (T3, 2));
impl_select!(With4, (T1, 0), (T2, 1), (T3, 2), (T4, 3));
impl_select!(With5, (T1, 0), (T2, 1), (T3, 2), (T4, 3), (T5, 4));
impl_select!(With6, (T1, 0), (T2, 1), (T3, 2), (T4, 3), (T5, 4), (T6, 5));

/// An iterator over one composition's live entities, projecting the selected
/// component types.
pub struct SelectIter<S: Select> {
    /// The composition being walked.
    composition: Arc<Composition>,

    /// Canonical tuple positions of the selected classes, in tuple order.
    positions: Vec<usize>,

    /// Unvisited pages, newest first; pages are visited oldest first.
    pages: Vec<Arc<Page<Entity>>>,

    /// The page under the cursor and its slot count at entry.
    page: Option<(Arc<Page<Entity>>, u32)>,

    /// The next slot to visit on the current page.
    slot: u32,

    _marker: PhantomData<S>,
}

impl<S: Select> SelectIter<S> {
    /// Create an iterator over `composition` for the given classes.
    ///
    /// When any class has no position in this composition the iterator is
    /// empty, per the mis-typed access rule.
    pub(crate) fn new(composition: Arc<Composition>, classes: &[ClassId]) -> Self {
        let mut positions = Vec::with_capacity(classes.len());
        for class in classes {
            let position = composition.position_of(*class);
            if position < 0 {
                return Self::empty(composition);
            }
            positions.push(position as usize);
        }

        // Collect the page chain so iteration runs oldest page first.
        let mut pages = Vec::new();
        let mut page = Some(composition.tenant().current_page());
        while let Some(current) = page {
            page = current.previous().cloned();
            pages.push(current);
        }

        Self {
            composition,
            positions,
            pages,
            page: None,
            slot: 0,
            _marker: PhantomData,
        }
    }

    /// Create an iterator that yields nothing.
    pub(crate) fn empty(composition: Arc<Composition>) -> Self {
        Self {
            composition,
            positions: Vec::new(),
            pages: Vec::new(),
            page: None,
            slot: 0,
            _marker: PhantomData,
        }
    }
}

impl<S: Select> Iterator for SelectIter<S> {
    type Item = S::Out;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (page, len) = match self.page.clone() {
                Some(current) => current,
                None => {
                    let page = self.pages.pop()?;
                    let len = page.len();
                    self.page = Some((Arc::clone(&page), len));
                    self.slot = 0;
                    (page, len)
                }
            };

            if self.slot >= len {
                self.page = None;
                continue;
            }
            let slot = self.slot;
            self.slot += 1;

            // Skip transient records: empty slots, detached records, records
            // that have moved to another composition, and records whose data
            // is not installed yet.
            let Some(entity) = page.get(slot) else {
                continue;
            };
            if entity.is_detached() {
                continue;
            }
            if entity.composition_raw() != self.composition.id().id() {
                continue;
            }
            let Some(data) = entity.components() else {
                continue;
            };

            if let Some(out) = S::project(&self.positions, &data, &entity) {
                return Some(out);
            }
        }
    }
}

/// An iterator over every composition that can serve a selection.
///
/// Drives each matching composition's [`select`] in turn, compositions in
/// creation order. Obtained from the world's `find`.
///
/// [`select`]: Composition::select
pub struct Find<S: Select> {
    /// Compositions still to visit.
    compositions: std::vec::IntoIter<Arc<Composition>>,

    /// The composition currently being walked.
    current: Option<SelectIter<S>>,
}

impl<S: Select> Find<S> {
    /// Create a find iterator over the given compositions.
    pub(crate) fn new(compositions: Vec<Arc<Composition>>) -> Self {
        Self {
            compositions: compositions.into_iter(),
            current: None,
        }
    }

    /// Create a find iterator that yields nothing.
    pub(crate) fn none() -> Self {
        Self::new(Vec::new())
    }
}

impl<S: Select> Iterator for Find<S> {
    type Item = S::Out;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(current) = &mut self.current {
                if let Some(out) = current.next() {
                    return Some(out);
                }
            }
            let composition = self.compositions.next()?;
            self.current = Some(composition.select::<S>());
        }
    }
}
