//! Camera-local to world-space composition.

use crate::{CameraAnchorPose, MarkerDetection, MarkerPose, Pose};

/// Compose a child pose expressed in `parent`'s frame into the parent's frame of reference.
///
/// Rotate-then-translate for the position, parent-then-child for the orientation.
#[inline]
pub fn compose(parent: &Pose, child: &Pose) -> Pose {
    Pose {
        position: parent.orientation * child.position + parent.position,
        orientation: parent.orientation * child.orientation,
    }
}

/// Express one detection in world space using the anchor pose sampled this cycle.
#[inline]
pub fn to_world(anchor: &CameraAnchorPose, detection: &MarkerDetection) -> MarkerPose {
    let local = Pose::new(detection.position_camera, detection.orientation_camera);
    MarkerPose::with_pose(detection.id, compose(&anchor.as_pose(), &local))
}
