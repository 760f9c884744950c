//! Core types and per-marker state for world-space marker tracking.
//!
//! This crate is intentionally small and purely geometric. It does *not*
//! run a marker detector or own any entities; those are collaborators
//! described by the [`FrameSource`] and [`MarkerDetector`] traits.
//!
//! Per-cycle flow:
//! 1. Sample the camera anchor pose from the frame source.
//! 2. Run the detector on the current image buffer.
//! 3. Compose each camera-local detection with the anchor pose ([`to_world`]).
//! 4. Blend against the previous pose of the same id ([`PoseSmoother`]).
//! 5. Replace the visible-id set ([`VisibilityTable`]).

mod frame;
mod logger;
mod pose;
mod smoothing;
mod source;
mod tracking;
mod transform;
mod visibility;

pub use frame::{FrameBuffer, FrameView, FrameViewError};
pub use pose::{CameraAnchorPose, MarkerDetection, MarkerId, MarkerPose, Pose};
pub use smoothing::{PoseSmoother, SmoothingError};
pub use source::{FrameSource, MarkerDetector};
pub use tracking::TrackingState;
pub use transform::{compose, to_world};
pub use visibility::VisibilityTable;

#[cfg(feature = "tracing")]
pub use logger::{init_tracing, init_tracing_with_level};

pub use logger::init_with_level;
