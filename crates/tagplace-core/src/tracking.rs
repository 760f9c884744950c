use std::collections::HashMap;

use crate::{
    to_world, CameraAnchorPose, MarkerDetection, MarkerId, MarkerPose, PoseSmoother,
    SmoothingError, VisibilityTable,
};

/// Per-marker tracking state owned by one pipeline instance.
///
/// Holds the smoothing history and the visibility set; both accumulate until
/// [`TrackingState::clear`] is called.
#[derive(Clone, Debug)]
pub struct TrackingState {
    smoother: PoseSmoother,
    visibility: VisibilityTable,
}

impl TrackingState {
    pub fn new(smoothing_factor: f32) -> Result<Self, SmoothingError> {
        Ok(Self {
            smoother: PoseSmoother::new(smoothing_factor)?,
            visibility: VisibilityTable::new(),
        })
    }

    /// Run transform, smoothing and visibility bookkeeping for one detection set.
    ///
    /// With `apply_smoothing == false` the raw world poses are returned and
    /// overwrite the history, so later queries reflect the latest cycle.
    pub fn ingest(
        &mut self,
        anchor: &CameraAnchorPose,
        detections: &[MarkerDetection],
        apply_smoothing: bool,
    ) -> HashMap<MarkerId, MarkerPose> {
        let mut poses = HashMap::with_capacity(detections.len());
        for det in detections {
            let world = to_world(anchor, det);
            let pose = if apply_smoothing {
                self.smoother.smooth(world)
            } else {
                self.smoother.record_raw(world);
                world
            };
            // Duplicate ids within one frame: the last one wins.
            poses.insert(det.id, pose);
        }
        self.visibility.record_cycle(poses.keys().copied());
        poses
    }

    /// Last stored pose of `id`, only while `id` is visible in the latest cycle.
    pub fn last_pose(&self, id: MarkerId) -> Option<MarkerPose> {
        if !self.visibility.is_visible(id) {
            return None;
        }
        self.smoother.last(id)
    }

    /// Last stored pose of `id` regardless of current visibility.
    pub fn history(&self, id: MarkerId) -> Option<MarkerPose> {
        self.smoother.last(id)
    }

    #[inline]
    pub fn is_visible(&self, id: MarkerId) -> bool {
        self.visibility.is_visible(id)
    }

    #[inline]
    pub fn visibility(&self) -> &VisibilityTable {
        &self.visibility
    }

    #[inline]
    pub fn smoothing_factor(&self) -> f32 {
        self.smoother.factor()
    }

    pub fn clear(&mut self) {
        self.smoother.clear();
        self.visibility.clear();
    }
}
