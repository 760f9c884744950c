//! Collaborator interfaces consumed by the pipeline.

use crate::{CameraAnchorPose, FrameView, MarkerDetection};

/// Camera frames and intrinsics.
///
/// Implementations return `None` from [`FrameSource::current_image`] while the
/// camera is still starting up or permissions are pending.
pub trait FrameSource {
    fn current_image(&self) -> Option<FrameView<'_>>;

    /// Vertical field of view of the current image, in degrees.
    fn vertical_fov_deg(&self) -> f32;

    /// World pose of the camera anchor at this instant.
    fn camera_anchor_pose(&self) -> CameraAnchorPose;
}

/// Opaque fiducial detector.
pub trait MarkerDetector {
    /// Detect all markers visible in `image`.
    ///
    /// `marker_size_m` is the physical side length of the printed markers and
    /// sets the scale of the returned camera-space positions.
    fn detect(
        &mut self,
        image: &FrameView<'_>,
        vertical_fov_deg: f32,
        marker_size_m: f32,
    ) -> Vec<MarkerDetection>;
}
