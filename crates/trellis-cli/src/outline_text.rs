//! Plain-text outlines.
//!
//! One entry per line, either `Group` or `Parent / Child`. Identities are the
//! lower-cased title with spaces turned into `-`. A parent that is already
//! present anywhere in the outline is reused; a missing one is appended as a
//! root. Blank segments are ignored and lines that leave zero or more than two
//! segments are skipped.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use trellis_snapshot::{Snapshot, SnapshotResult};
use trellis_types::{OutlineItem, Presentable};

pub const SAMPLE: &str = "\
Parent 1 / Child 11
Parent 1 / Child 12
Parent 1 / Child 13
Parent 2
Parent 2 / Child 21
Child 21 / Leaf 211
Child 21 / Leaf 212
Parent 3 / Child 31
Parent 3 / Child 32
Parent 3 / Child 33
";

/// A titled outline entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: String,
    pub title: String,
}

impl Entry {
    pub fn new(title: &str) -> Self {
        Self {
            id: identity(title),
            title: title.to_string(),
        }
    }
}

impl OutlineItem for Entry {
    type Id = String;

    fn id(&self) -> &String {
        &self.id
    }
}

impl Presentable for Entry {
    const ALLOWS_DRAGGING: bool = true;

    fn title(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.title)
    }
}

/// The identity derived from a title.
pub fn identity(title: &str) -> String {
    title.to_lowercase().replace(' ', "-")
}

pub fn parse(input: &str) -> SnapshotResult<Snapshot<Entry>, String> {
    let mut snapshot = Snapshot::new();
    for line in input.lines() {
        let titles: Vec<&str> = line
            .split('/')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect();
        match titles.as_slice() {
            [group] => {
                let group = Entry::new(group);
                if !snapshot.contains(&group.id) {
                    snapshot.append_items([group], None)?;
                }
            }
            [parent, child] => {
                let parent = Entry::new(parent);
                let parent_id = parent.id.clone();
                if !snapshot.contains(&parent_id) {
                    snapshot.append_items([parent], None)?;
                }
                let child = Entry::new(child);
                if !snapshot.contains(&child.id) {
                    snapshot.append_items([child], Some(&parent_id))?;
                }
            }
            _ => continue,
        }
    }
    Ok(snapshot)
}

/// One line per entry in linearization order: `title` for roots and
/// `parent title / title` otherwise.
pub fn render<T: OutlineItem + Presentable>(snapshot: &Snapshot<T>) -> String {
    let mut out = String::new();
    snapshot.enumerate_items(|item, parent| {
        if let Some(parent) = parent {
            out.push_str(&parent.title());
            out.push_str(" / ");
        }
        out.push_str(&item.title());
        out.push('\n');
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(snapshot: &Snapshot<Entry>) -> Vec<(Option<String>, String)> {
        let mut out = Vec::new();
        snapshot.enumerate_items(|item, parent| out.push((parent.map(|p| p.id.clone()), item.id.clone())));
        out
    }

    #[test]
    fn identity_from_title() {
        assert_eq!(identity("Parent 1"), "parent-1");
        assert_eq!(Entry::new("Leaf 211").id, "leaf-211");
        assert!(Entry::new("x").allows_dragging());
    }

    #[test]
    fn sample_builds_three_levels() {
        let snapshot = parse(SAMPLE).unwrap();
        assert_eq!(snapshot.len(), 12);
        assert_eq!(snapshot.child_count(None), 3);
        assert_eq!(snapshot.parent_id(&"leaf-212".to_string()), Some(&"child-21".to_string()));
        assert_eq!(snapshot.depth_of(&"leaf-211".to_string()), Some(2));
    }

    #[test]
    fn missing_parent_becomes_root() {
        let snapshot = parse("Child / Leaf\nGroup\n").unwrap();
        assert_eq!(
            ids(&snapshot),
            vec![
                (None, "child".to_string()),
                (Some("child".to_string()), "leaf".to_string()),
                (None, "group".to_string()),
            ]
        );
    }

    #[test]
    fn repeated_and_malformed_lines_are_skipped() {
        let input = "A\nA\nA / B\nC / B\n\n  /  \nX / Y / Z\n";
        let snapshot = parse(input).unwrap();
        assert_eq!(
            ids(&snapshot),
            vec![
                (None, "a".to_string()),
                (Some("a".to_string()), "b".to_string()),
                (None, "c".to_string()),
            ]
        );
    }

    #[test]
    fn render_then_parse_is_stable() {
        let snapshot = parse(SAMPLE).unwrap();
        let text = render(&snapshot);
        assert!(text.starts_with("Parent 1\nParent 1 / Child 11\n"));
        assert_eq!(parse(&text).unwrap(), snapshot);
    }
}
