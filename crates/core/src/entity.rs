//! Entities: things with identity that are mutated in place.

use std::collections::HashMap;

/// Products, customers and cart lines are entities: two with equal fields but
/// different ids are different things.
pub trait Entity {
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> &Self::Id;
}

/// Index a batch of loaded entities by id (later duplicates win).
pub fn index_by_id<E: Entity>(items: impl IntoIterator<Item = E>) -> HashMap<E::Id, E> {
    items.into_iter().map(|e| (e.id().clone(), e)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Row {
        id: u32,
        label: &'static str,
    }

    impl Entity for Row {
        type Id = u32;

        fn id(&self) -> &u32 {
            &self.id
        }
    }

    #[test]
    fn index_keeps_last_duplicate() {
        let idx = index_by_id(vec![
            Row { id: 1, label: "a" },
            Row { id: 2, label: "b" },
            Row { id: 1, label: "c" },
        ]);
        assert_eq!(idx.len(), 2);
        assert_eq!(idx[&1].label, "c");
    }
}
