//! Collaborators that replay recorded detector output: a frame source over a
//! recording file, a detector that returns the recorded hands, and a
//! presenter that logs each outcome.

use handknn_core::{Error, Hand, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;
use crate::collaborator::{EstimationConfig, FrameSource, HandDetector, Presenter};
use crate::context::FrameOutcome;

/// Detector output captured frame by frame
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Recording {
    /// Frame width in pixels, the mirror axis for `flip_horizontal`
    #[serde(default)]
    pub width: f32,
    #[serde(default)]
    pub height: f32,
    pub frames: Vec<Vec<Hand>>,
}

impl Recording {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::Serialization(e.to_string()))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct RecordedFrame {
    pub number: u64,
    pub width: f32,
    pub height: f32,
    pub hands: Vec<Hand>,
}

pub struct RecordedSource {
    frames: std::vec::IntoIter<Vec<Hand>>,
    width: f32,
    height: f32,
    next_number: u64,
}

impl RecordedSource {
    pub fn new(recording: Recording) -> Self {
        Self {
            frames: recording.frames.into_iter(),
            width: recording.width,
            height: recording.height,
            next_number: 0,
        }
    }
}

impl FrameSource for RecordedSource {
    type Frame = RecordedFrame;

    async fn start(&mut self) -> Result<()> {
        Ok(())
    }

    async fn next_frame(&mut self) -> Result<Option<RecordedFrame>> {
        Ok(self.frames.next().map(|hands| {
            let number = self.next_number;
            self.next_number += 1;
            RecordedFrame {
                number,
                width: self.width,
                height: self.height,
                hands,
            }
        }))
    }
}

/// Returns the hands stored in each recorded frame
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordedDetector;

impl HandDetector<RecordedFrame> for RecordedDetector {
    /// `flip_horizontal` mirrors image-space keypoints across the frame
    /// width. 3D keypoints are passed through untouched.
    async fn estimate_hands(
        &mut self,
        frame: &RecordedFrame,
        config: &EstimationConfig,
    ) -> Result<Vec<Hand>> {
        let mut hands = frame.hands.clone();
        if config.flip_horizontal {
            for point in hands.iter_mut().flat_map(|h| h.keypoints.iter_mut()) {
                point.x = frame.width - point.x;
            }
        }
        Ok(hands)
    }
}

/// Logs one line per predicted hand
#[derive(Debug, Clone, Copy, Default)]
pub struct LogPresenter;

impl<F> Presenter<F> for LogPresenter {
    fn present(&mut self, _frame: &F, outcome: &FrameOutcome) -> Result<()> {
        for p in &outcome.predictions {
            let hand = p
                .handedness
                .map(|h| format!("{:?}", h))
                .unwrap_or_else(|| "-".to_string());
            info!(
                frame = outcome.frame_number,
                hand = %hand,
                certain = p.is_certain(),
                "{} ({:.2})",
                p.label,
                p.confidence
            );
        }
        Ok(())
    }
}
