use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Integer id of a fiducial marker in its dictionary.
pub type MarkerId = u32;

/// Rigid pose: position plus unit orientation.
///
/// Orientations serialize as `[x, y, z, w]` quaternion coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vector3<f32>,
    pub orientation: UnitQuaternion<f32>,
}

impl Pose {
    pub fn identity() -> Self {
        Self {
            position: Vector3::zeros(),
            orientation: UnitQuaternion::identity(),
        }
    }

    pub fn new(position: Vector3<f32>, orientation: UnitQuaternion<f32>) -> Self {
        Self {
            position,
            orientation,
        }
    }

    pub fn from_position(position: Vector3<f32>) -> Self {
        Self {
            position,
            orientation: UnitQuaternion::identity(),
        }
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

/// World pose of the tracking-space anchor the camera is parented to.
///
/// Sampled fresh on every query because the headset moves continuously.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraAnchorPose {
    pub position_world: Vector3<f32>,
    pub orientation_world: UnitQuaternion<f32>,
}

impl CameraAnchorPose {
    pub fn identity() -> Self {
        Self {
            position_world: Vector3::zeros(),
            orientation_world: UnitQuaternion::identity(),
        }
    }

    #[inline]
    pub fn as_pose(&self) -> Pose {
        Pose::new(self.position_world, self.orientation_world)
    }
}

impl Default for CameraAnchorPose {
    fn default() -> Self {
        Self::identity()
    }
}

/// Raw per-frame detector output, expressed in camera-local space.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkerDetection {
    pub id: MarkerId,
    pub position_camera: Vector3<f32>,
    pub orientation_camera: UnitQuaternion<f32>,
}

/// World-space pose of one marker.
///
/// Produced fresh by every query; the pipeline never hands out references
/// into its own state.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkerPose {
    pub id: MarkerId,
    pub position_world: Vector3<f32>,
    pub orientation_world: UnitQuaternion<f32>,
}

impl MarkerPose {
    #[inline]
    pub fn pose(&self) -> Pose {
        Pose::new(self.position_world, self.orientation_world)
    }

    #[inline]
    pub fn with_pose(id: MarkerId, pose: Pose) -> Self {
        Self {
            id,
            position_world: pose.position,
            orientation_world: pose.orientation,
        }
    }
}
