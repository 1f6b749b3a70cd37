//! # handknn Session
//!
//! Orchestrates one classification session: pull a frame, detect hands,
//! classify each hand against the example store, hand the outcome to the
//! presentation layer. UI operations (add, capture, export, import) arrive
//! through a [`SessionHandle`] and run between frames.
//!
//! The media source, detector and presenter are external collaborators
//! behind the traits in [`collaborator`]. [`replay`] provides file-backed
//! implementations for offline runs.

pub mod collaborator;
pub mod config;
pub mod context;
pub mod replay;
pub mod session;

pub use collaborator::{EstimationConfig, FrameSource, HandDetector, Presenter};
pub use config::{ClassNames, SessionConfig};
pub use context::{FrameOutcome, HandPrediction, SessionContext};
pub use replay::{LogPresenter, Recording, RecordedDetector, RecordedFrame, RecordedSource};
pub use session::{Session, SessionHandle, SessionSummary};
