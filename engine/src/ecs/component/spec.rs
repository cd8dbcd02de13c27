use std::hash::{Hash, Hasher};

use fixedbitset::FixedBitSet;

use crate::ecs::component::ClassId;

/// A specification of the component classes an archetype stores.
///
/// The class ids are held sorted ascending and deduplicated, so a `Spec` is a
/// canonical hash key: any ordering of the same classes produces an equal
/// spec. A bitset over the class ids answers membership and superset queries
/// without walking the list.
#[derive(Debug, Clone)]
pub struct Spec {
    /// The class ids, ascending.
    ids: Vec<ClassId>,

    /// One bit per class id in `ids`.
    mask: FixedBitSet,
}

impl Spec {
    /// Construct a spec from class ids in any order. Duplicates are removed.
    pub fn new(ids: impl Into<Vec<ClassId>>) -> Self {
        let mut ids = ids.into();
        ids.sort();
        ids.dedup();
        ids.shrink_to_fit();

        let bits = ids.last().map_or(0, |id| id.index() + 1);
        let mut mask = FixedBitSet::with_capacity(bits);
        for id in &ids {
            mask.insert(id.index());
        }

        Self { ids, mask }
    }

    /// The spec with no classes (the empty archetype).
    #[inline]
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Get the class ids in this specification, ascending.
    #[inline]
    pub fn ids(&self) -> &[ClassId] {
        &self.ids
    }

    /// Get the number of classes in this specification.
    #[inline]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Check whether this specification has no classes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Determine whether this specification contains the given class.
    #[inline]
    pub fn contains(&self, id: ClassId) -> bool {
        self.mask.contains(id.index())
    }

    /// Determine whether this specification contains every class of `other`.
    #[inline]
    pub fn contains_all(&self, other: &Spec) -> bool {
        other.mask.is_subset(&self.mask)
    }

    /// Determine whether this specification contains every listed class.
    #[inline]
    pub fn contains_classes(&self, classes: &[ClassId]) -> bool {
        classes.iter().all(|id| self.contains(*id))
    }
}

impl PartialEq for Spec {
    fn eq(&self, other: &Self) -> bool {
        self.ids == other.ids
    }
}

impl Eq for Spec {}

impl Hash for Spec {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ids.hash(state);
    }
}

impl From<Vec<ClassId>> for Spec {
    #[inline]
    fn from(value: Vec<ClassId>) -> Self {
        Spec::new(value)
    }
}

#[cfg(test)]
mod tests {
    use std::hash::DefaultHasher;

    use super::*;

    fn class(raw: u32) -> ClassId {
        ClassId::new(raw)
    }

    #[test]
    fn class_id_order() {
        // Given
        let (id1, id2, id3) = (class(1), class(2), class(3));

        // When
        let spec1 = Spec::new(vec![id2, id1, id3]);
        let spec2 = Spec::new(vec![id1, id2, id3]);

        // Then
        assert_eq!(spec1, spec2);
        let mut hasher1 = DefaultHasher::new();
        spec1.hash(&mut hasher1);
        let mut hasher2 = DefaultHasher::new();
        spec2.hash(&mut hasher2);
        assert_eq!(hasher1.finish(), hasher2.finish());
    }

    #[test]
    fn class_id_dedupe() {
        // Given
        let (id1, id2, id3) = (class(1), class(2), class(3));

        // When
        let spec = Spec::new(vec![id2, id1, id3, id2, id1]);

        // Then
        assert_eq!(spec.ids(), &[id1, id2, id3]);
    }

    #[test]
    fn contains() {
        // Given
        let spec = Spec::new(vec![class(2), class(1)]);

        // Then
        assert!(spec.contains(class(1)));
        assert!(spec.contains(class(2)));
        assert!(!spec.contains(class(3)));
    }

    #[test]
    fn contains_all() {
        // Given
        let spec1 = Spec::new(vec![class(1), class(2), class(3)]);
        let spec2 = Spec::new(vec![class(1), class(2)]);
        let spec3 = Spec::new(vec![class(1), class(4)]);

        // Then
        assert!(spec1.contains_all(&spec2));
        assert!(spec1.contains_all(&spec1));
        assert!(!spec1.contains_all(&spec3));
        assert!(!spec2.contains_all(&spec1));
    }

    #[test]
    fn empty_spec() {
        // Given
        let empty = Spec::empty();
        let spec = Spec::new(vec![class(5)]);

        // Then - the empty spec is a subset of everything
        assert!(empty.is_empty());
        assert!(spec.contains_all(&empty));
        assert!(empty.contains_all(&empty));
        assert!(!empty.contains_all(&spec));
    }

    #[test]
    fn contains_classes() {
        // Given
        let spec = Spec::new(vec![class(1), class(3), class(7)]);

        // Then
        assert!(spec.contains_classes(&[class(1), class(7)]));
        assert!(spec.contains_classes(&[]));
        assert!(!spec.contains_classes(&[class(1), class(2)]));
    }
}
