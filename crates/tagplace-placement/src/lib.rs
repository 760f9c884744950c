//! Placement of bound entities at tracked marker poses.
//!
//! This crate owns the static marker → entity bindings and the three
//! mutually exclusive driving strategies:
//! - auto placement: snap every bound entity to this cycle's pose,
//! - on demand: no entity writes at all,
//! - slow placing: a periodic sampler fills a target cache that a per-frame
//!   interpolator glides entities toward.
//!
//! It does **not** run detection. Poses come from `tagplace-core`.

mod auto;
mod binding;
mod entity;
mod mode;
mod schedule;
mod slow;

pub use auto::{place_entities, PlacementOutcome};
pub use binding::{Binding, BindingError, BindingTable, EntityHandle};
pub use entity::{EntityState, EntityStore, SceneEntities};
pub use mode::{BaseMode, ModeArbitrator, PlacementMode};
pub use schedule::{PeriodicTask, TaskHandle};
pub use slow::{step_towards, InterpolationSpeed, SlowPlacer, SlowTarget, SpeedError};
