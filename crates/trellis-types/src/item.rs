use std::fmt::Debug;
use std::hash::Hash;

/// An element that can live in an outline.
///
/// Every item exposes a stable identity that stays constant across edits to
/// the same logical entity, and full-value equality (`PartialEq`) used to
/// detect "same position, changed content". Two items with equal identity are
/// the same node even when their other fields differ.
pub trait OutlineItem: Clone + PartialEq {
    /// The identity type. Must be cheap to clone and hashable.
    type Id: Clone + Eq + Hash + Debug;

    /// The stable identity of this item.
    fn id(&self) -> &Self::Id;

    /// Returns `true` if `other` denotes the same logical node.
    fn same_identity(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

/// A string is its own identity.
impl OutlineItem for String {
    type Id = String;

    fn id(&self) -> &String {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Row {
        id: u32,
        label: &'static str,
    }

    impl OutlineItem for Row {
        type Id = u32;

        fn id(&self) -> &u32 {
            &self.id
        }
    }

    #[test]
    fn identity_ignores_content() {
        let a = Row { id: 1, label: "old" };
        let b = Row { id: 1, label: "new" };
        assert!(a.same_identity(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn different_identity() {
        let a = Row { id: 1, label: "x" };
        let b = Row { id: 2, label: "x" };
        assert!(!a.same_identity(&b));
    }

    #[test]
    fn string_is_its_own_identity() {
        let s = String::from("leaf");
        assert_eq!(s.id(), "leaf");
    }
}
