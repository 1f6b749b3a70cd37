//! Seams to the external collaborators: the media source, the hand
//! detector, and the presentation layer.
//!
//! Source and detector calls are suspension points. The session never runs
//! two of them at once and never applies a command while one is pending.

use handknn_core::{Hand, Result};
use serde::{Deserialize, Serialize};
use std::future::Future;
use crate::context::FrameOutcome;

/// Options forwarded to the detector on every call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimationConfig {
    /// Mirror image-space keypoints horizontally
    pub flip_horizontal: bool,
}

/// Produces frames on demand
pub trait FrameSource {
    type Frame;

    /// Acquire the device. A refused permission is `MediaAccessDenied`,
    /// which ends the session.
    fn start(&mut self) -> impl Future<Output = Result<()>>;

    /// Next frame, or `None` once the host stops producing frames
    fn next_frame(&mut self) -> impl Future<Output = Result<Option<Self::Frame>>>;
}

/// Hand landmark detector
pub trait HandDetector<F> {
    fn estimate_hands(
        &mut self,
        frame: &F,
        config: &EstimationConfig,
    ) -> impl Future<Output = Result<Vec<Hand>>>;
}

/// Consumes one outcome per frame
pub trait Presenter<F> {
    fn present(&mut self, frame: &F, outcome: &FrameOutcome) -> Result<()>;
}
