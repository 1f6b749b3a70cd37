//! Hand keypoints as delivered by the landmark detector, and the vectorizer
//! that turns them into classifier input.

use serde::{Deserialize, Serialize};
use crate::{Error, Result, Vector};

/// Landmarks per hand reported by MediaPipe-style detectors
pub const HAND_KEYPOINT_COUNT: usize = 21;

/// Feature dimension of a fully vectorized hand
pub const HAND_VECTOR_DIM: usize = HAND_KEYPOINT_COUNT * 3;

/// 3D landmark coordinates
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point3D {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Point3D {
    #[inline]
    #[must_use]
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// 2D landmark in image space, optionally named (`wrist`, `thumb_tip`, ...)
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NamedPoint2D {
    pub x: f32,
    pub y: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Handedness {
    Left,
    Right,
}

/// A detected hand
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Hand {
    /// Ordered 3D landmarks, the classifier's raw features
    #[serde(rename = "keypoints3D")]
    pub keypoints_3d: Vec<Point3D>,
    pub handedness: Handedness,
    /// Image-space landmarks, used by the presentation layer only
    #[serde(default)]
    pub keypoints: Vec<NamedPoint2D>,
    /// Detector confidence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

impl Hand {
    pub fn new(keypoints_3d: Vec<Point3D>, handedness: Handedness) -> Self {
        Self {
            keypoints_3d,
            handedness,
            keypoints: Vec::new(),
            score: None,
        }
    }

    /// Flatten the 3D landmarks into a feature vector
    pub fn to_vector(&self) -> Result<Vector> {
        vectorize(&self.keypoints_3d)
    }
}

/// Concatenate `x, y, z` of every point in input order.
///
/// The output has `3 * points.len()` elements. An empty input is rejected:
/// "no hand detected" has to be handled before vectorizing.
pub fn vectorize(points: &[Point3D]) -> Result<Vector> {
    if points.is_empty() {
        return Err(Error::InvalidInput(
            "cannot vectorize an empty keypoint sequence".to_string(),
        ));
    }

    let mut data = Vec::with_capacity(points.len() * 3);
    for p in points {
        data.extend_from_slice(&[p.x, p.y, p.z]);
    }
    Ok(Vector::new(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vectorize_preserves_order() {
        let points = vec![Point3D::new(1.0, 2.0, 3.0), Point3D::new(4.0, 5.0, 6.0)];
        let v = vectorize(&points).unwrap();
        assert_eq!(v.as_slice(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_vectorize_full_hand_dimension() {
        let points = vec![Point3D::default(); HAND_KEYPOINT_COUNT];
        assert_eq!(vectorize(&points).unwrap().dim(), HAND_VECTOR_DIM);
    }

    #[test]
    fn test_vectorize_empty_is_invalid() {
        assert!(matches!(vectorize(&[]), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_hand_detector_json_shape() {
        let json = r#"{
            "keypoints3D": [{"x": 0.1, "y": 0.2, "z": 0.3}],
            "handedness": "Left",
            "keypoints": [{"x": 320.0, "y": 240.0, "name": "wrist"}],
            "score": 0.98
        }"#;
        let hand: Hand = serde_json::from_str(json).unwrap();
        assert_eq!(hand.handedness, Handedness::Left);
        assert_eq!(hand.keypoints[0].name.as_deref(), Some("wrist"));
        assert_eq!(hand.to_vector().unwrap().as_slice(), &[0.1, 0.2, 0.3]);
    }
}
