//! # handknn Core
//!
//! Core library for the handknn pose classifier.
//!
//! This crate provides the fundamental data structures and algorithms:
//!
//! - [`Vector`] - Dense feature vector with SIMD distance kernels
//! - [`Hand`] / [`vectorize`] - Detector keypoints and their flattening into features
//! - [`Label`] - Opaque class identifier
//! - [`ExampleStore`] - Labeled examples with nearest-neighbor classification
//! - [`Snapshot`] - Portable `[label, values, shape]` dataset format
//!
//! ## Example
//!
//! ```rust
//! use handknn_core::{ExampleStore, Label, Vector};
//!
//! let mut store = ExampleStore::new();
//! store.add_example(&Vector::new(vec![1.0, 0.0, 0.0]), "peace").unwrap();
//! store.add_example(&Vector::new(vec![0.0, 1.0, 0.0]), "heart").unwrap();
//!
//! let prediction = store.predict_class(&Vector::new(vec![1.0, 0.0, 0.0])).unwrap();
//! assert_eq!(prediction.label, Label::from("peace"));
//! assert!(prediction.is_certain());
//!
//! let json = store.export_dataset().to_json().unwrap();
//! assert!(json.starts_with(r#"[["peace",[1.0,0.0,0.0],[1,3]]"#));
//! ```

pub mod dataset;
pub mod error;
pub mod keypoint;
pub mod label;
pub mod store;
pub mod vector;

/// SIMD-optimized distance kernels
///
/// - AVX2/FMA on x86_64
/// - NEON on ARM64/Apple Silicon
/// - Scalar fallback elsewhere
pub mod simd;

pub use dataset::{Snapshot, SnapshotEntry};
pub use error::{Error, Result};
pub use keypoint::{
    vectorize, Hand, Handedness, NamedPoint2D, Point3D, HAND_KEYPOINT_COUNT, HAND_VECTOR_DIM,
};
pub use label::Label;
pub use store::{ClassifierConfig, ExampleStore, Prediction};
pub use vector::Vector;
