//! Labeled example store with nearest-neighbor classification.
//!
//! Examples of one label live in a single row-major buffer, so export is a
//! copy and a distance scan walks contiguous memory.

use ahash::AHashMap;
use ordered_float::OrderedFloat;
use rayon::prelude::*;
use serde::Serialize;
use crate::dataset::{Snapshot, SnapshotEntry};
use crate::simd::squared_l2_simd;
use crate::{Error, Label, Result, Vector};

/// Stores at least this large scan distances on the rayon pool
const PARALLEL_SCAN_THRESHOLD: usize = 2048;

/// Voting parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifierConfig {
    /// Vote with the `k` nearest examples only. `None` votes with all of them.
    pub k: Option<usize>,
    /// Added to every distance before inverting it into a weight
    pub epsilon: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            k: None,
            epsilon: 1e-6,
        }
    }
}

impl ClassifierConfig {
    pub fn validate(&self) -> Result<()> {
        if self.k == Some(0) {
            return Err(Error::InvalidConfig("k must be at least 1".to_string()));
        }
        if !(self.epsilon.is_finite() && self.epsilon > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "epsilon must be a positive finite number, got {}",
                self.epsilon
            )));
        }
        Ok(())
    }
}

/// Outcome of classifying one query vector
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    /// Label with the highest confidence
    pub label: Label,
    /// One entry per stored label, in registration order, summing to 1
    pub confidences: Vec<(Label, f32)>,
}

impl Prediction {
    /// Confidence of the top label
    pub fn confidence(&self) -> f32 {
        self.confidence_of(&self.label).unwrap_or(0.0)
    }

    pub fn confidence_of(&self, label: &Label) -> Option<f32> {
        self.confidences
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, c)| *c)
    }

    /// Whether every vote went to the top label
    pub fn is_certain(&self) -> bool {
        self.confidence() >= 1.0
    }
}

#[derive(Debug, Clone)]
struct ClassExamples {
    label: Label,
    values: Vec<f32>,
    count: usize,
}

#[derive(Debug, Clone, Copy)]
struct Neighbor {
    class: usize,
    distance: f32,
}

/// Labeled feature vectors grouped per label, in label registration order.
///
/// All vectors share the dimension of the first example added. The store only
/// grows through [`add_example`](Self::add_example) or is replaced wholesale
/// through [`import_dataset`](Self::import_dataset).
#[derive(Debug, Clone)]
pub struct ExampleStore {
    config: ClassifierConfig,
    dim: Option<usize>,
    classes: Vec<ClassExamples>,
    index: AHashMap<Label, usize>,
    total: usize,
}

impl Default for ExampleStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ExampleStore {
    pub fn new() -> Self {
        Self {
            config: ClassifierConfig::default(),
            dim: None,
            classes: Vec::new(),
            index: AHashMap::new(),
            total: 0,
        }
    }

    pub fn with_config(config: ClassifierConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::new()
        })
    }

    /// Build a store from a snapshot, validating it first
    pub fn from_snapshot(snapshot: Snapshot, config: ClassifierConfig) -> Result<Self> {
        config.validate()?;
        let dim = snapshot.validate()?;

        let mut store = Self {
            config,
            dim,
            ..Self::new()
        };
        for entry in snapshot.into_entries() {
            let count = entry.count();
            if count == 0 {
                continue;
            }
            store.index.insert(entry.label.clone(), store.classes.len());
            store.classes.push(ClassExamples {
                label: entry.label,
                values: entry.values,
                count,
            });
            store.total += count;
        }
        Ok(store)
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Dimension shared by every example, once one exists
    pub fn dim(&self) -> Option<usize> {
        self.dim
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    pub fn total_examples(&self) -> usize {
        self.total
    }

    /// Number of distinct labels holding at least one example
    pub fn num_classes(&self) -> usize {
        self.classes.len()
    }

    /// Labels in registration order
    pub fn labels(&self) -> impl Iterator<Item = &Label> + '_ {
        self.classes.iter().map(|c| &c.label)
    }

    pub fn class_example_counts(&self) -> Vec<(Label, usize)> {
        self.classes
            .iter()
            .map(|c| (c.label.clone(), c.count))
            .collect()
    }

    pub fn example_count(&self, label: &Label) -> usize {
        self.index
            .get(label)
            .map(|&i| self.classes[i].count)
            .unwrap_or(0)
    }

    /// Stored vectors of `label`, in insertion order
    pub fn examples(&self, label: &Label) -> Option<std::slice::ChunksExact<'_, f32>> {
        let dim = self.dim?;
        self.index
            .get(label)
            .map(|&i| self.classes[i].values.chunks_exact(dim))
    }

    /// Append one example. The first example fixes the store's dimension.
    pub fn add_example(&mut self, vector: &Vector, label: impl Into<Label>) -> Result<()> {
        if vector.is_empty() {
            return Err(Error::InvalidInput(
                "examples must have at least one dimension".to_string(),
            ));
        }
        if vector.as_slice().iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidInput(
                "example values must be finite".to_string(),
            ));
        }
        if let Some(dim) = self.dim {
            if vector.dim() != dim {
                return Err(Error::DimensionMismatch {
                    expected: dim,
                    actual: vector.dim(),
                });
            }
        }

        let label = label.into();
        let class = match self.index.get(&label) {
            Some(&i) => i,
            None => {
                self.index.insert(label.clone(), self.classes.len());
                self.classes.push(ClassExamples {
                    label,
                    values: Vec::new(),
                    count: 0,
                });
                self.classes.len() - 1
            }
        };

        let examples = &mut self.classes[class];
        examples.values.extend_from_slice(vector.as_slice());
        examples.count += 1;
        self.dim = Some(vector.dim());
        self.total += 1;
        Ok(())
    }

    /// Classify `query` by inverse-distance weighted vote.
    ///
    /// Distances are squared Euclidean. Each considered example votes for its
    /// label with weight `1 / (distance + epsilon)`; when any considered
    /// example matches the query exactly, only exact matches vote. Ties on the
    /// top weight go to the label registered first.
    pub fn predict_class(&self, query: &Vector) -> Result<Prediction> {
        let dim = match self.dim {
            Some(dim) if !self.is_empty() => dim,
            _ => return Err(Error::EmptyStore),
        };
        if query.dim() != dim {
            return Err(Error::DimensionMismatch {
                expected: dim,
                actual: query.dim(),
            });
        }

        let neighbors = self.scan(query.as_slice(), dim);
        Ok(self.vote(neighbors))
    }

    fn scan(&self, query: &[f32], dim: usize) -> Vec<Neighbor> {
        if self.total >= PARALLEL_SCAN_THRESHOLD {
            self.classes
                .par_iter()
                .enumerate()
                .flat_map_iter(|(class, examples)| class_neighbors(class, examples, query, dim))
                .collect()
        } else {
            self.classes
                .iter()
                .enumerate()
                .flat_map(|(class, examples)| class_neighbors(class, examples, query, dim))
                .collect()
        }
    }

    fn vote(&self, mut neighbors: Vec<Neighbor>) -> Prediction {
        if let Some(k) = self.config.k {
            if k < neighbors.len() {
                // Stable: equidistant examples keep scan order
                neighbors.sort_by_key(|n| OrderedFloat(n.distance));
                neighbors.truncate(k);
            }
        }

        let exact = neighbors.iter().any(|n| n.distance == 0.0);
        let mut weights = vec![0.0f64; self.classes.len()];
        for n in &neighbors {
            weights[n.class] += if exact {
                if n.distance == 0.0 { 1.0 } else { 0.0 }
            } else {
                1.0 / (f64::from(n.distance) + self.config.epsilon)
            };
        }

        let mut total: f64 = weights.iter().sum();
        if !(total.is_finite() && total > 0.0) {
            // Degenerate distances: the nearest example takes the vote
            let nearest = neighbors
                .iter()
                .min_by_key(|n| OrderedFloat(n.distance))
                .map(|n| n.class)
                .unwrap_or(0);
            weights.iter_mut().for_each(|w| *w = 0.0);
            weights[nearest] = 1.0;
            total = 1.0;
        }

        let mut top = 0;
        for (i, w) in weights.iter().enumerate().skip(1) {
            if *w > weights[top] {
                top = i;
            }
        }

        Prediction {
            label: self.classes[top].label.clone(),
            confidences: self
                .classes
                .iter()
                .zip(weights)
                .map(|(c, w)| (c.label.clone(), (w / total) as f32))
                .collect(),
        }
    }

    /// Every label with its examples as `[label, values, [count, dim]]`
    pub fn export_dataset(&self) -> Snapshot {
        let dim = self.dim.unwrap_or(0);
        Snapshot::new(
            self.classes
                .iter()
                .map(|c| SnapshotEntry::new(c.label.clone(), c.values.clone(), [c.count, dim]))
                .collect(),
        )
    }

    /// Replace the whole store with `snapshot`. On error nothing changes.
    pub fn import_dataset(&mut self, snapshot: Snapshot) -> Result<()> {
        *self = Self::from_snapshot(snapshot, self.config)?;
        Ok(())
    }
}

fn class_neighbors<'a>(
    class: usize,
    examples: &'a ClassExamples,
    query: &'a [f32],
    dim: usize,
) -> impl Iterator<Item = Neighbor> + 'a {
    examples.values.chunks_exact(dim).map(move |row| Neighbor {
        class,
        distance: squared_l2_simd(row, query),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(data: &[f32]) -> Vector {
        Vector::from_slice(data)
    }

    fn sum(prediction: &Prediction) -> f32 {
        prediction.confidences.iter().map(|(_, c)| c).sum()
    }

    #[test]
    fn test_first_example_fixes_dimension() {
        let mut store = ExampleStore::new();
        assert_eq!(store.dim(), None);
        store.add_example(&v(&[1.0, 2.0, 3.0]), "A").unwrap();
        assert_eq!(store.dim(), Some(3));

        let err = store.add_example(&v(&[1.0, 2.0]), "A").unwrap_err();
        assert!(matches!(
            err,
            Error::DimensionMismatch { expected: 3, actual: 2 }
        ));
        assert_eq!(store.total_examples(), 1);
        assert_eq!(store.example_count(&Label::from("A")), 1);
    }

    #[test]
    fn test_rejected_example_does_not_register_label() {
        let mut store = ExampleStore::new();
        store.add_example(&v(&[1.0, 2.0]), "A").unwrap();
        assert!(store.add_example(&v(&[1.0]), "B").is_err());
        assert_eq!(store.num_classes(), 1);
        assert_eq!(store.labels().collect::<Vec<_>>(), vec![&Label::from("A")]);
    }

    #[test]
    fn test_empty_vector_is_invalid() {
        let mut store = ExampleStore::new();
        assert!(matches!(
            store.add_example(&v(&[]), "A"),
            Err(Error::InvalidInput(_))
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn test_non_finite_example_is_invalid() {
        let mut store = ExampleStore::new();
        store.add_example(&v(&[1.0, 2.0]), "A").unwrap();

        for bad in [[f32::NAN, 0.0], [0.0, f32::INFINITY], [f32::NEG_INFINITY, 1.0]] {
            assert!(matches!(
                store.add_example(&v(&bad), "B"),
                Err(Error::InvalidInput(_))
            ));
        }
        assert_eq!(store.num_classes(), 1);
        assert!(store.export_dataset().to_json().is_ok());
    }

    #[test]
    fn test_num_classes_tracks_distinct_labels() {
        let mut store = ExampleStore::new();
        assert_eq!(store.num_classes(), 0);
        store.add_example(&v(&[0.0]), 0u64).unwrap();
        assert_eq!(store.num_classes(), 1);
        store.add_example(&v(&[1.0]), 0u64).unwrap();
        assert_eq!(store.num_classes(), 1);
        store.add_example(&v(&[2.0]), 2u64).unwrap();
        assert_eq!(store.num_classes(), 2);
        assert_eq!(
            store.class_example_counts(),
            vec![(Label::Integer(0), 2), (Label::Integer(2), 1)]
        );
    }

    #[test]
    fn test_predict_empty_store() {
        let store = ExampleStore::new();
        assert!(matches!(
            store.predict_class(&v(&[1.0])),
            Err(Error::EmptyStore)
        ));
    }

    #[test]
    fn test_predict_dimension_mismatch() {
        let mut store = ExampleStore::new();
        store.add_example(&v(&[1.0, 0.0]), "A").unwrap();
        assert!(matches!(
            store.predict_class(&v(&[1.0])),
            Err(Error::DimensionMismatch { expected: 2, actual: 1 })
        ));
    }

    #[test]
    fn test_single_label_is_certain() {
        let mut store = ExampleStore::new();
        store.add_example(&v(&[0.0, 0.0]), "A").unwrap();
        store.add_example(&v(&[1.0, 1.0]), "A").unwrap();

        let prediction = store.predict_class(&v(&[5.0, -3.0])).unwrap();
        assert_eq!(prediction.label, Label::from("A"));
        assert_eq!(prediction.confidence(), 1.0);
        assert!(prediction.is_certain());
    }

    #[test]
    fn test_exact_match_takes_all_weight() {
        let mut store = ExampleStore::new();
        store.add_example(&v(&[0.0, 0.0, 0.0]), "A").unwrap();
        store.add_example(&v(&[0.001, 0.0, 0.0]), "B").unwrap();
        store.add_example(&v(&[5.0, 5.0, 5.0]), "B").unwrap();

        let prediction = store.predict_class(&v(&[0.0, 0.0, 0.0])).unwrap();
        assert_eq!(prediction.label, Label::from("A"));
        assert_eq!(prediction.confidence(), 1.0);
        assert_eq!(prediction.confidence_of(&Label::from("B")), Some(0.0));
    }

    #[test]
    fn test_inverse_distance_weights() {
        let mut store = ExampleStore::with_config(ClassifierConfig {
            k: None,
            epsilon: 1e-9,
        })
        .unwrap();
        store.add_example(&v(&[1.0]), "near").unwrap();
        store.add_example(&v(&[-2.0]), "far").unwrap();

        // squared distances 1 and 4: weights 1 and 0.25
        let prediction = store.predict_class(&v(&[0.0])).unwrap();
        assert_eq!(prediction.label, Label::from("near"));
        assert!((prediction.confidence() - 0.8).abs() < 1e-6);
        assert!((prediction.confidence_of(&Label::from("far")).unwrap() - 0.2).abs() < 1e-6);
        assert!((sum(&prediction) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_tie_goes_to_first_registered_label() {
        let mut store = ExampleStore::new();
        store.add_example(&v(&[1.0]), "second-alphabetically").unwrap();
        store.add_example(&v(&[-1.0]), "a-first-alphabetically").unwrap();

        let prediction = store.predict_class(&v(&[0.0])).unwrap();
        assert_eq!(prediction.label, Label::from("second-alphabetically"));
        assert!((prediction.confidence() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_exact_matches_in_two_labels_split() {
        let mut store = ExampleStore::new();
        store.add_example(&v(&[1.0, 1.0]), "A").unwrap();
        store.add_example(&v(&[1.0, 1.0]), "B").unwrap();
        store.add_example(&v(&[1.0, 1.0]), "B").unwrap();

        let prediction = store.predict_class(&v(&[1.0, 1.0])).unwrap();
        assert_eq!(prediction.label, Label::from("B"));
        assert!((prediction.confidence() - 2.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_k_limits_the_vote() {
        let mut store = ExampleStore::with_config(ClassifierConfig {
            k: Some(1),
            ..ClassifierConfig::default()
        })
        .unwrap();
        store.add_example(&v(&[0.0]), "A").unwrap();
        store.add_example(&v(&[3.0]), "B").unwrap();
        store.add_example(&v(&[3.5]), "B").unwrap();

        let prediction = store.predict_class(&v(&[1.0])).unwrap();
        assert_eq!(prediction.label, Label::from("A"));
        assert_eq!(prediction.confidence(), 1.0);
        assert_eq!(prediction.confidences.len(), 2);
    }

    #[test]
    fn test_invalid_config() {
        assert!(ExampleStore::with_config(ClassifierConfig {
            k: Some(0),
            ..ClassifierConfig::default()
        })
        .is_err());
        assert!(ExampleStore::with_config(ClassifierConfig {
            k: None,
            epsilon: 0.0,
        })
        .is_err());
    }

    #[test]
    fn test_nan_query_falls_back_to_nearest() {
        let mut store = ExampleStore::new();
        store.add_example(&v(&[0.0]), "A").unwrap();
        store.add_example(&v(&[1.0]), "B").unwrap();

        let prediction = store.predict_class(&v(&[f32::NAN])).unwrap();
        assert!((sum(&prediction) - 1.0).abs() < 1e-6);
        assert_eq!(prediction.confidence(), 1.0);
    }

    #[test]
    fn test_parallel_scan_matches_sequential() {
        let mut large = ExampleStore::new();
        for i in 0..PARALLEL_SCAN_THRESHOLD + 10 {
            let x = i as f32 * 0.01;
            let label = if i % 3 == 0 { "A" } else { "B" };
            large.add_example(&v(&[x, -x, x * 0.5]), label).unwrap();
        }
        let query = v(&[1.234, -1.2, 0.6]);
        let parallel = large.predict_class(&query).unwrap();

        let neighbors: Vec<Neighbor> = large
            .classes
            .iter()
            .enumerate()
            .flat_map(|(class, examples)| class_neighbors(class, examples, query.as_slice(), 3))
            .collect();
        let sequential = large.vote(neighbors);
        assert_eq!(parallel, sequential);
    }

    #[test]
    fn test_export_in_registration_order() {
        let mut store = ExampleStore::new();
        store.add_example(&v(&[1.0, 2.0, 3.0]), "A").unwrap();
        store.add_example(&v(&[4.0, 5.0, 6.0]), "B").unwrap();
        store.add_example(&v(&[7.0, 8.0, 9.0]), "A").unwrap();

        let snapshot = store.export_dataset();
        let entries = snapshot.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].label, Label::from("A"));
        assert_eq!(entries[0].values, vec![1.0, 2.0, 3.0, 7.0, 8.0, 9.0]);
        assert_eq!(entries[0].shape, [2, 3]);
        assert_eq!(entries[1].shape, [1, 3]);
    }

    #[test]
    fn test_import_replaces_contents() {
        let mut source = ExampleStore::new();
        source.add_example(&v(&[1.0, 2.0]), "X").unwrap();

        let mut store = ExampleStore::new();
        store.add_example(&v(&[1.0, 2.0, 3.0]), "A").unwrap();
        store.import_dataset(source.export_dataset()).unwrap();

        assert_eq!(store.dim(), Some(2));
        assert_eq!(store.num_classes(), 1);
        assert_eq!(store.example_count(&Label::from("A")), 0);
        assert_eq!(
            store.examples(&Label::from("X")).unwrap().collect::<Vec<_>>(),
            vec![&[1.0, 2.0][..]]
        );
    }

    #[test]
    fn test_failed_import_leaves_store_untouched() {
        let mut store = ExampleStore::new();
        store.add_example(&v(&[1.0, 2.0, 3.0]), "A").unwrap();

        let bad = Snapshot::new(vec![
            SnapshotEntry::new(Label::from("B"), vec![1.0, 2.0, 3.0], [1, 3]),
            SnapshotEntry::new(Label::from("C"), vec![1.0, 2.0], [1, 3]),
        ]);
        assert!(matches!(
            store.import_dataset(bad),
            Err(Error::MalformedSnapshot(_))
        ));
        assert_eq!(store.num_classes(), 1);
        assert_eq!(store.example_count(&Label::from("A")), 1);
    }

    #[test]
    fn test_import_rejects_out_of_range_values() {
        let mut store = ExampleStore::new();
        store.add_example(&v(&[1.0, 2.0]), "A").unwrap();

        let snapshot = Snapshot::from_json(r#"[["B",[1e39,0.5],[1,2]]]"#).unwrap();
        assert!(matches!(
            store.import_dataset(snapshot),
            Err(Error::MalformedSnapshot(_))
        ));
        assert_eq!(store.labels().collect::<Vec<_>>(), vec![&Label::from("A")]);
        assert_eq!(
            store.export_dataset().to_json().unwrap(),
            r#"[["A",[1.0,2.0],[1,2]]]"#
        );
    }

    #[test]
    fn test_import_skips_empty_entries() {
        let snapshot = Snapshot::new(vec![
            SnapshotEntry::new(Label::from("ghost"), vec![], [0, 3]),
            SnapshotEntry::new(Label::from("A"), vec![1.0, 2.0, 3.0], [1, 3]),
        ]);
        let store = ExampleStore::from_snapshot(snapshot, ClassifierConfig::default()).unwrap();
        assert_eq!(store.num_classes(), 1);
        assert_eq!(store.example_count(&Label::from("ghost")), 0);
    }

    #[test]
    fn test_import_empty_snapshot_clears() {
        let mut store = ExampleStore::new();
        store.add_example(&v(&[1.0]), "A").unwrap();
        store.import_dataset(Snapshot::default()).unwrap();
        assert!(store.is_empty());
        assert_eq!(store.dim(), None);
        store.add_example(&v(&[1.0, 2.0]), "B").unwrap();
        assert_eq!(store.dim(), Some(2));
    }
}
