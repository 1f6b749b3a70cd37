//! # handknn
//!
//! Hand-pose classification by k-nearest-neighbor voting over labeled
//! keypoint vectors.
//!
//! A hand detector reports 21 3D keypoints per hand. handknn flattens them
//! into a 63-dimensional vector, stores labeled examples, predicts the label
//! of new hands by inverse-distance weighted vote, and saves or loads the
//! example set as a JSON text file compatible with the browser tool.
//!
//! ## Quick Start
//!
//! ```rust
//! use handknn::prelude::*;
//!
//! let mut store = ExampleStore::new();
//! let peace = vectorize(&[Point3D::new(0.1, 0.2, 0.0), Point3D::new(0.3, 0.1, 0.0)]).unwrap();
//! store.add_example(&peace, "peace").unwrap();
//!
//! let prediction = store.predict_class(&peace).unwrap();
//! assert_eq!(prediction.label, Label::from("peace"));
//! assert_eq!(prediction.confidence(), 1.0);
//! ```
//!
//! ## Crate Structure
//!
//! - `handknn-core` - Vector, keypoints, example store and classifier, snapshot format
//! - `handknn-storage` - Model files, atomic writes, archives
//! - `handknn-session` - Frame loop, detector/presenter seams, replay

// Re-export core types
pub use handknn_core::{
    vectorize, ClassifierConfig, Error, ExampleStore, Hand, Handedness, Label, NamedPoint2D,
    Point3D, Prediction, Result, Snapshot, SnapshotEntry, Vector, HAND_KEYPOINT_COUNT,
    HAND_VECTOR_DIM,
};

// Re-export storage
pub use handknn_storage::{ArchiveDescription, ModelStorage, DEFAULT_MODEL_FILE};

// Re-export session
pub use handknn_session::{
    ClassNames, EstimationConfig, FrameOutcome, FrameSource, HandDetector, HandPrediction,
    Presenter, Session, SessionConfig, SessionContext, SessionHandle, SessionSummary,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        vectorize, ClassifierConfig, Error, ExampleStore, Hand, Handedness, Label, Point3D,
        Prediction, Result, Snapshot, Vector,
        ModelStorage,
        Session, SessionConfig, SessionContext, SessionHandle,
    };
}

/// Model file helpers
pub mod storage {
    pub use handknn_storage::{load_store, read_snapshot, save_store, write_snapshot};
}

/// Offline replay collaborators
pub mod replay {
    pub use handknn_session::replay::{
        LogPresenter, Recording, RecordedDetector, RecordedFrame, RecordedSource,
    };
}
