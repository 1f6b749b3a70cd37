//! Portable dataset snapshot.
//!
//! On the wire a snapshot is a single JSON array, one `[label, values, shape]`
//! triple per label in registration order. `values` is the row-major
//! flattening of a `shape[0] x shape[1]` matrix (`[count, dim]`).

use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use crate::{Error, Label, Result};

type EntryTuple = (Label, Vec<f32>, [usize; 2]);

/// All examples of one label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "EntryTuple", into = "EntryTuple")]
pub struct SnapshotEntry {
    pub label: Label,
    pub values: Vec<f32>,
    /// `[count, dim]`
    pub shape: [usize; 2],
}

impl SnapshotEntry {
    pub fn new(label: Label, values: Vec<f32>, shape: [usize; 2]) -> Self {
        Self { label, values, shape }
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.shape[0]
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.shape[1]
    }
}

impl From<EntryTuple> for SnapshotEntry {
    fn from((label, values, shape): EntryTuple) -> Self {
        Self { label, values, shape }
    }
}

impl From<SnapshotEntry> for EntryTuple {
    fn from(entry: SnapshotEntry) -> Self {
        (entry.label, entry.values, entry.shape)
    }
}

/// Exported state of an example store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    entries: Vec<SnapshotEntry>,
}

impl Snapshot {
    pub fn new(entries: Vec<SnapshotEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[SnapshotEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<SnapshotEntry> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse the text form. Anything that is not a well-formed array of
    /// `[label, values, [count, dim]]` triples is a `MalformedSnapshot`.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::MalformedSnapshot(e.to_string()))
    }

    /// Compact JSON text. Non-finite values have no JSON representation and
    /// are refused rather than silently written as `null`.
    pub fn to_json(&self) -> Result<String> {
        for entry in &self.entries {
            if entry.values.iter().any(|v| !v.is_finite()) {
                return Err(Error::Serialization(format!(
                    "label {} holds a non-finite value",
                    entry.label
                )));
            }
        }
        serde_json::to_string(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Check every structural invariant and return the shared dimension
    /// (`None` when no entry holds examples).
    pub fn validate(&self) -> Result<Option<usize>> {
        let mut dim: Option<usize> = None;
        let mut seen = AHashSet::with_capacity(self.entries.len());

        for entry in &self.entries {
            if !seen.insert(&entry.label) {
                return Err(Error::MalformedSnapshot(format!(
                    "label {} appears more than once",
                    entry.label
                )));
            }

            let [count, entry_dim] = entry.shape;
            let expected_len = count.checked_mul(entry_dim).ok_or_else(|| {
                Error::MalformedSnapshot(format!(
                    "label {}: shape [{}, {}] overflows",
                    entry.label, count, entry_dim
                ))
            })?;
            if entry.values.len() != expected_len {
                return Err(Error::MalformedSnapshot(format!(
                    "label {}: {} values do not fill shape [{}, {}]",
                    entry.label,
                    entry.values.len(),
                    count,
                    entry_dim
                )));
            }

            if entry.values.iter().any(|v| !v.is_finite()) {
                return Err(Error::MalformedSnapshot(format!(
                    "label {} holds a non-finite value",
                    entry.label
                )));
            }

            if count == 0 {
                continue;
            }
            if entry_dim == 0 {
                return Err(Error::MalformedSnapshot(format!(
                    "label {}: examples must have at least one dimension",
                    entry.label
                )));
            }
            match dim {
                None => dim = Some(entry_dim),
                Some(d) if d != entry_dim => {
                    return Err(Error::MalformedSnapshot(format!(
                        "label {}: dimension {} disagrees with {}",
                        entry.label, entry_dim, d
                    )));
                }
                Some(_) => {}
            }
        }

        Ok(dim)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_is_a_json_triple() {
        let snapshot = Snapshot::new(vec![SnapshotEntry::new(
            Label::from("A"),
            vec![1.0, 0.5, 0.0],
            [1, 3],
        )]);
        assert_eq!(snapshot.to_json().unwrap(), r#"[["A",[1.0,0.5,0.0],[1,3]]]"#);
    }

    #[test]
    fn test_parses_browser_export() {
        // Object.entries() turns numeric class ids into strings
        let text = r#"[["0",[0.1,0.2,0.30000001192092896,0.4],[2,2]],["1",[1,2],[1,2]]]"#;
        let snapshot = Snapshot::from_json(text).unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.entries()[0].label, Label::from("0"));
        assert_eq!(snapshot.entries()[1].values, vec![1.0, 2.0]);
        assert_eq!(snapshot.validate().unwrap(), Some(2));
    }

    #[test]
    fn test_rejects_wrong_shape_arity() {
        let err = Snapshot::from_json(r#"[["A",[1,2,3],[1,3,1]]]"#).unwrap_err();
        assert!(matches!(err, Error::MalformedSnapshot(_)));
    }

    #[test]
    fn test_validate_value_count() {
        let snapshot = Snapshot::new(vec![SnapshotEntry::new(
            Label::from("A"),
            vec![1.0, 2.0],
            [1, 3],
        )]);
        assert!(matches!(snapshot.validate(), Err(Error::MalformedSnapshot(_))));
    }

    #[test]
    fn test_validate_inconsistent_dimension() {
        let snapshot = Snapshot::new(vec![
            SnapshotEntry::new(Label::from("A"), vec![1.0, 2.0, 3.0], [1, 3]),
            SnapshotEntry::new(Label::from("B"), vec![1.0, 2.0], [1, 2]),
        ]);
        assert!(matches!(snapshot.validate(), Err(Error::MalformedSnapshot(_))));
    }

    #[test]
    fn test_validate_duplicate_label() {
        let snapshot = Snapshot::new(vec![
            SnapshotEntry::new(Label::Integer(1), vec![1.0], [1, 1]),
            SnapshotEntry::new(Label::Integer(1), vec![2.0], [1, 1]),
        ]);
        assert!(matches!(snapshot.validate(), Err(Error::MalformedSnapshot(_))));
    }

    #[test]
    fn test_validate_overflowing_shape() {
        let snapshot = Snapshot::new(vec![SnapshotEntry::new(
            Label::Integer(1),
            vec![],
            [usize::MAX, 2],
        )]);
        assert!(matches!(snapshot.validate(), Err(Error::MalformedSnapshot(_))));
    }

    #[test]
    fn test_empty_entries_do_not_fix_dimension() {
        let snapshot = Snapshot::new(vec![
            SnapshotEntry::new(Label::from("empty"), vec![], [0, 5]),
            SnapshotEntry::new(Label::from("A"), vec![1.0, 2.0], [1, 2]),
        ]);
        assert_eq!(snapshot.validate().unwrap(), Some(2));
    }

    #[test]
    fn test_to_json_refuses_nan() {
        let snapshot = Snapshot::new(vec![SnapshotEntry::new(
            Label::from("A"),
            vec![f32::NAN],
            [1, 1],
        )]);
        assert!(matches!(snapshot.to_json(), Err(Error::Serialization(_))));
    }

    #[test]
    fn test_validate_rejects_out_of_range_numbers() {
        // 1e39 does not fit an f32 and parses as infinity
        let snapshot = Snapshot::from_json(r#"[["A",[1e39,0.5],[1,2]]]"#).unwrap();
        assert!(matches!(snapshot.validate(), Err(Error::MalformedSnapshot(_))));
    }
}
