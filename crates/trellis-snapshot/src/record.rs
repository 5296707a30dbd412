//! Serialization of snapshots as their linearization.
//!
//! A snapshot is written as a sequence of `{ item, parent }` records in
//! [`Snapshot::enumerate_items`] order. Reading rebuilds the forest through
//! the builder, so duplicate identities or dangling parents are rejected
//! instead of producing a malformed snapshot.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use trellis_types::OutlineItem;

use crate::error::{SnapshotError, SnapshotResult};
use crate::snapshot::Snapshot;

/// One entry of a serialized snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record<I, P> {
    /// The item value.
    pub item: I,
    /// Identity of the parent, `None` for roots.
    pub parent: Option<P>,
}

impl<T: OutlineItem> Snapshot<T> {
    /// The linearization as borrowed records.
    pub fn records(&self) -> Vec<Record<&T, &T::Id>> {
        let mut out = Vec::with_capacity(self.len());
        self.enumerate_items(|item, parent| {
            out.push(Record {
                item,
                parent: parent.map(OutlineItem::id),
            })
        });
        out
    }

    /// Rebuild a snapshot from records in linearization order.
    ///
    /// Each parent must appear before its children.
    pub fn from_records<I>(records: I) -> SnapshotResult<Self, T::Id>
    where
        I: IntoIterator<Item = Record<T, T::Id>>,
    {
        let mut snapshot = Snapshot::new();
        for record in records {
            snapshot.append_items([record.item], record.parent.as_ref())?;
        }
        Ok(snapshot)
    }
}

impl<T> Snapshot<T>
where
    T: OutlineItem + Serialize + for<'de> Deserialize<'de>,
    T::Id: Serialize + for<'de> Deserialize<'de>,
{
    /// Serialize the snapshot to bincode bytes.
    pub fn to_bytes(&self) -> SnapshotResult<Vec<u8>, T::Id> {
        bincode::serialize(self).map_err(|e| SnapshotError::Serialization(e.to_string()))
    }

    /// Deserialize a snapshot from bincode bytes.
    pub fn from_bytes(data: &[u8]) -> SnapshotResult<Self, T::Id> {
        bincode::deserialize(data).map_err(|e| SnapshotError::Serialization(e.to_string()))
    }
}

impl<T> Serialize for Snapshot<T>
where
    T: OutlineItem + Serialize,
    T::Id: Serialize,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.records().serialize(serializer)
    }
}

impl<'de, T> Deserialize<'de> for Snapshot<T>
where
    T: OutlineItem + Deserialize<'de>,
    T::Id: Deserialize<'de>,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let records: Vec<Record<T, T::Id>> = Vec::deserialize(deserializer)?;
        Snapshot::from_records(records).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct Entry {
        id: String,
        title: String,
    }

    impl OutlineItem for Entry {
        type Id = String;

        fn id(&self) -> &String {
            &self.id
        }
    }

    fn entry(id: &str) -> Entry {
        Entry {
            id: id.into(),
            title: id.to_uppercase(),
        }
    }

    fn sample() -> Snapshot<Entry> {
        let mut s = Snapshot::new();
        s.append_items([entry("p1"), entry("p2")], None).unwrap();
        s.append_items([entry("c11"), entry("c12")], Some(&"p1".to_string()))
            .unwrap();
        s.append_items([entry("l121")], Some(&"c12".to_string())).unwrap();
        s
    }

    #[test]
    fn records_follow_linearization() {
        let s = sample();
        let records = s.records();
        let flat: Vec<(&str, Option<&str>)> = records
            .iter()
            .map(|r| (r.item.id.as_str(), r.parent.map(String::as_str)))
            .collect();
        assert_eq!(
            flat,
            vec![
                ("p1", None),
                ("c11", Some("p1")),
                ("c12", Some("p1")),
                ("l121", Some("c12")),
                ("p2", None),
            ]
        );
    }

    #[test]
    fn json_roundtrip() {
        let s = sample();
        let json = serde_json::to_string(&s).unwrap();
        let back: Snapshot<Entry> = serde_json::from_str(&json).unwrap();
        assert_eq!(s, back);
        back.validate().unwrap();
    }

    #[test]
    fn bincode_roundtrip() {
        let s = sample();
        let bytes = s.to_bytes().unwrap();
        let back = Snapshot::<Entry>::from_bytes(&bytes).unwrap();
        assert_eq!(s, back);
    }

    #[test]
    fn duplicate_records_rejected() {
        let json = r#"[
            {"item": {"id": "a", "title": "A"}, "parent": null},
            {"item": {"id": "a", "title": "A again"}, "parent": null}
        ]"#;
        let err = serde_json::from_str::<Snapshot<Entry>>(json).unwrap_err();
        assert!(err.to_string().contains("duplicate item"));
    }

    #[test]
    fn dangling_parent_rejected() {
        let records = vec![Record {
            item: entry("orphan"),
            parent: Some("missing".to_string()),
        }];
        let err = Snapshot::from_records(records).unwrap_err();
        assert_eq!(err, SnapshotError::UnknownParent("missing".to_string()));
    }

    #[test]
    fn garbage_bytes_rejected() {
        let err = Snapshot::<Entry>::from_bytes(&[0xff, 0x01]).unwrap_err();
        assert!(matches!(err, SnapshotError::Serialization(_)));
    }
}
