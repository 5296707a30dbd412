use serde::{Deserialize, Serialize};

/// Where items land when inserted into, or moved within, a snapshot.
///
/// A `parent` of `None` addresses the root level.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Placement<Id> {
    /// After the last child of `parent`.
    End { parent: Option<Id> },
    /// Before the first child of `parent`.
    Start { parent: Option<Id> },
    /// At `index` among the children of `parent`.
    Index { parent: Option<Id>, index: usize },
    /// Immediately before the sibling `anchor`, under the same parent.
    Before(Id),
    /// Immediately after the sibling `anchor`, under the same parent.
    After(Id),
}

impl<Id> Placement<Id> {
    /// Append at the root level.
    pub fn root_end() -> Self {
        Placement::End { parent: None }
    }

    /// Append under `parent`.
    pub fn end_of(parent: Id) -> Self {
        Placement::End {
            parent: Some(parent),
        }
    }

    /// The sibling this placement is relative to, if any.
    pub fn anchor(&self) -> Option<&Id> {
        match self {
            Placement::Before(id) | Placement::After(id) => Some(id),
            _ => None,
        }
    }

    /// The explicitly named parent, if this placement is parent-relative.
    ///
    /// Returns `None` for sibling-relative placements; the outer `Option`
    /// distinguishes "not parent-relative" from "root level".
    pub fn explicit_parent(&self) -> Option<Option<&Id>> {
        match self {
            Placement::End { parent }
            | Placement::Start { parent }
            | Placement::Index { parent, .. } => Some(parent.as_ref()),
            Placement::Before(_) | Placement::After(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchor_only_for_sibling_placements() {
        assert_eq!(Placement::Before("a").anchor(), Some(&"a"));
        assert_eq!(Placement::After("b").anchor(), Some(&"b"));
        assert_eq!(Placement::<&str>::root_end().anchor(), None);
    }

    #[test]
    fn explicit_parent_distinguishes_root() {
        assert_eq!(Placement::<&str>::root_end().explicit_parent(), Some(None));
        assert_eq!(Placement::end_of("p").explicit_parent(), Some(Some(&"p")));
        assert_eq!(Placement::Before("x").explicit_parent(), None);
    }

    #[test]
    fn serde_roundtrip() {
        let p = Placement::Index {
            parent: Some("folder".to_string()),
            index: 2,
        };
        let json = serde_json::to_string(&p).unwrap();
        let back: Placement<String> = serde_json::from_str(&json).unwrap();
        assert_eq!(p, back);
    }
}
