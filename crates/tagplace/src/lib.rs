//! High-level facade crate for the `tagplace-*` workspace.
//!
//! This crate provides:
//! - [`TagPipeline`], the query surface every other subsystem talks to,
//! - JSON configuration ([`PipelineConfig`]) with validation,
//! - deterministic replay of recorded detection sessions ([`replay`]),
//! - the `tagplace` command line tool (feature `cli`).
//!
//! ## Quickstart
//!
//! ```no_run
//! use std::time::Duration;
//! use tagplace::replay::{replay_collaborators, RecordedSession};
//! use tagplace::{PipelineConfig, TagPipeline};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PipelineConfig::load_json("pipeline.json")?;
//! let session = RecordedSession::load_json("session.json")?;
//! let (frames, detector, cursor) = replay_collaborators(session);
//!
//! let mut pipeline = TagPipeline::builder(config)
//!     .frame_source(frames)
//!     .detector(detector)
//!     .build()?;
//!
//! cursor.seek(0);
//! let poses = pipeline.detect_markers(true);
//! println!("visible: {:?}", poses.map(|p| p.len()));
//! pipeline.update(Duration::from_millis(16));
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `tagplace::core`: pose types, frame composition, smoothing, visibility.
//! - `tagplace::placement`: bindings, entity store, modes, slow placing.
//! - `tagplace::replay`: recorded sessions and replay collaborators.

pub use tagplace_core as core;
pub use tagplace_placement as placement;

mod config;
mod error;
mod pipeline;
pub mod replay;

pub use config::{PipelineConfig, SlowPlacingConfig, Zone, ZoneLists};
pub use error::{ConfigError, PipelineError, TagplaceIoError};
pub use pipeline::{FrameUpdate, TagPipeline, TagPipelineBuilder};

pub use tagplace_core::{CameraAnchorPose, MarkerDetection, MarkerId, MarkerPose, Pose};
pub use tagplace_placement::{
    BaseMode, Binding, EntityHandle, EntityStore, PlacementMode, SceneEntities, TaskHandle,
};
