//! Per-marker exponential pose smoothing.

use std::collections::HashMap;

use crate::{MarkerId, MarkerPose, Pose};

/// Smoothing factor validation errors.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum SmoothingError {
    #[error("smoothing factor must be in [0, 1), got {0}")]
    InvalidFactor(f32),
}

/// Exponential blend of each new pose against the previous smoothed pose of the same id.
///
/// `factor` is the weight of the previous pose: `0.0` passes detections through,
/// values close to `1.0` favour stability over responsiveness.
///
/// History presence is tracked explicitly, so a marker that is legitimately
/// at the world origin is still blended.
#[derive(Clone, Debug)]
pub struct PoseSmoother {
    factor: f32,
    previous: HashMap<MarkerId, Pose>,
}

impl PoseSmoother {
    pub fn new(factor: f32) -> Result<Self, SmoothingError> {
        if !factor.is_finite() || !(0.0..1.0).contains(&factor) {
            return Err(SmoothingError::InvalidFactor(factor));
        }
        Ok(Self {
            factor,
            previous: HashMap::new(),
        })
    }

    #[inline]
    pub fn factor(&self) -> f32 {
        self.factor
    }

    /// Blend `current` with the stored history and store the result.
    ///
    /// The first pose seen for an id passes through unchanged.
    pub fn smooth(&mut self, current: MarkerPose) -> MarkerPose {
        let raw = current.pose();
        let smoothed = match self.previous.get(&current.id) {
            Some(prev) => blend(&raw, prev, self.factor),
            None => raw,
        };
        self.previous.insert(current.id, smoothed);
        MarkerPose::with_pose(current.id, smoothed)
    }

    /// Overwrite the history for `pose.id` without blending.
    pub fn record_raw(&mut self, pose: MarkerPose) {
        self.previous.insert(pose.id, pose.pose());
    }

    pub fn last(&self, id: MarkerId) -> Option<MarkerPose> {
        self.previous
            .get(&id)
            .map(|pose| MarkerPose::with_pose(id, *pose))
    }

    pub fn len(&self) -> usize {
        self.previous.len()
    }

    pub fn is_empty(&self) -> bool {
        self.previous.is_empty()
    }

    pub fn clear(&mut self) {
        self.previous.clear();
    }
}

/// `lerp(current, previous, t)` / `slerp(current, previous, t)`.
fn blend(current: &Pose, previous: &Pose, t: f32) -> Pose {
    let position = current.position.lerp(&previous.position, t);
    // Antipodal rotations have no unique slerp path.
    let orientation = current
        .orientation
        .try_slerp(&previous.orientation, t, 1.0e-6)
        .unwrap_or_else(|| current.orientation.nlerp(&previous.orientation, t));
    Pose::new(position, orientation)
}
