//! Slow placing: low-frequency sampling, per-frame interpolation.
//!
//! The sampling side is a [`PeriodicTask`]; each tick the caller runs one
//! detection cycle and hands the poses to [`SlowPlacer::record_sample`].
//! The frame side calls [`SlowPlacer::interpolate`] every frame and glides
//! bound entities toward the cached targets at a bounded speed. The two
//! sides share nothing but the target cache.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tagplace_core::{MarkerId, MarkerPose, Pose};

use crate::{BindingTable, EntityStore, PeriodicTask, TaskHandle};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Speed validation errors.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum SpeedError {
    #[error("linear speed must be finite and > 0, got {0}")]
    InvalidLinear(f32),
    #[error("angular speed must be finite and > 0, got {0}")]
    InvalidAngular(f32),
    #[error("sample interval must be > 0")]
    InvalidInterval,
}

/// Upper bounds on how fast an entity may move toward its target.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct InterpolationSpeed {
    /// Meters per second.
    pub linear_mps: f32,
    /// Degrees per second.
    pub angular_deg_s: f32,
}

impl InterpolationSpeed {
    pub fn new(linear_mps: f32, angular_deg_s: f32) -> Result<Self, SpeedError> {
        if !linear_mps.is_finite() || linear_mps <= 0.0 {
            return Err(SpeedError::InvalidLinear(linear_mps));
        }
        if !angular_deg_s.is_finite() || angular_deg_s <= 0.0 {
            return Err(SpeedError::InvalidAngular(angular_deg_s));
        }
        Ok(Self {
            linear_mps,
            angular_deg_s,
        })
    }
}

/// Cached target written by the sampler.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SlowTarget {
    pub pose: Pose,
    /// Timestamp of the sampling tick that produced this target.
    pub sampled_at: Duration,
}

/// Move `current` toward `target` by at most `speed * dt`.
///
/// Position and orientation are limited independently; each arrives exactly
/// once its remaining distance fits in one step.
pub fn step_towards(
    current: &Pose,
    target: &Pose,
    speed: &InterpolationSpeed,
    dt: Duration,
) -> Pose {
    let dt = dt.as_secs_f32();

    let delta = target.position - current.position;
    let dist = delta.norm();
    let max_dist = speed.linear_mps * dt;
    let position = if dist <= max_dist || dist <= f32::EPSILON {
        target.position
    } else {
        current.position + delta * (max_dist / dist)
    };

    let angle = current.orientation.angle_to(&target.orientation);
    let max_angle = speed.angular_deg_s.to_radians() * dt;
    let orientation = if angle <= max_angle || angle <= f32::EPSILON {
        target.orientation
    } else {
        let frac = max_angle / angle;
        current
            .orientation
            .try_slerp(&target.orientation, frac, 1.0e-6)
            .unwrap_or_else(|| current.orientation.nlerp(&target.orientation, frac))
    };

    Pose::new(position, orientation)
}

/// Owner of the sampling task handle and the target cache.
#[derive(Clone, Debug)]
pub struct SlowPlacer {
    interval: Duration,
    speed: InterpolationSpeed,
    task: Option<PeriodicTask>,
    generation: u64,
    targets: BTreeMap<MarkerId, SlowTarget>,
    /// Set once the current task has written a sample.
    sampled: bool,
    last_frame: Option<Duration>,
}

impl SlowPlacer {
    pub fn new(interval: Duration, speed: InterpolationSpeed) -> Result<Self, SpeedError> {
        if interval.is_zero() {
            return Err(SpeedError::InvalidInterval);
        }
        Ok(Self {
            interval,
            speed,
            task: None,
            generation: 0,
            targets: BTreeMap::new(),
            sampled: false,
            last_frame: None,
        })
    }

    #[inline]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    #[inline]
    pub fn speed(&self) -> InterpolationSpeed {
        self.speed
    }

    /// Start the sampling task, or return the running one.
    ///
    /// A fresh task starts with an empty cache and samples on its first poll.
    pub fn start(&mut self, now: Duration) -> TaskHandle {
        if let Some(task) = &self.task {
            log::debug!("slow placing sampler {:?} already running", task.handle());
            return task.handle();
        }
        self.generation += 1;
        let handle = TaskHandle(self.generation);
        self.task = Some(PeriodicTask::start(handle, self.interval, now));
        self.targets.clear();
        self.sampled = false;
        self.last_frame = None;
        log::info!(
            "slow placing sampler {:?} started (interval {:?})",
            handle,
            self.interval
        );
        handle
    }

    /// Stop the sampling task. Nothing is written to the cache afterwards.
    pub fn stop(&mut self) -> Option<TaskHandle> {
        let task = self.task.take()?;
        self.last_frame = None;
        log::info!(
            "slow placing sampler {:?} stopped after {} ticks",
            task.handle(),
            task.ticks()
        );
        Some(task.handle())
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    pub fn handle(&self) -> Option<TaskHandle> {
        self.task.as_ref().map(PeriodicTask::handle)
    }

    /// Sampling ticks run by the current task.
    pub fn ticks(&self) -> u64 {
        self.task.as_ref().map_or(0, PeriodicTask::ticks)
    }

    /// Whether a sampling tick is due at `now`. Always `false` when stopped.
    pub fn poll_sample(&mut self, now: Duration) -> bool {
        self.task.as_mut().is_some_and(|task| task.poll(now))
    }

    /// Write one sampling tick into the target cache.
    ///
    /// With `drop_missing`, ids absent from this sample lose their target.
    /// Ignored while the task is stopped.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, poses), fields(detected = poses.len()))
    )]
    pub fn record_sample(
        &mut self,
        poses: &HashMap<MarkerId, MarkerPose>,
        drop_missing: bool,
        now: Duration,
    ) {
        if self.task.is_none() {
            log::debug!("slow placing sample dropped: sampler stopped");
            return;
        }
        self.sampled = true;
        if drop_missing {
            self.targets.retain(|id, _| poses.contains_key(id));
        }
        for (id, pose) in poses {
            self.targets.insert(
                *id,
                SlowTarget {
                    pose: pose.pose(),
                    sampled_at: now,
                },
            );
        }
    }

    pub fn target(&self, id: MarkerId) -> Option<&SlowTarget> {
        self.targets.get(&id)
    }

    pub fn targets(&self) -> impl Iterator<Item = (MarkerId, &SlowTarget)> {
        self.targets.iter().map(|(id, t)| (*id, t))
    }

    /// Forget every cached target; the task keeps running.
    pub fn clear_targets(&mut self) {
        self.targets.clear();
        self.sampled = false;
    }

    /// Whether the current task has written at least one sample.
    #[inline]
    pub fn has_sampled(&self) -> bool {
        self.sampled
    }

    /// Per-frame step: move every bound entity toward its cached target.
    ///
    /// An inactive entity with a target is activated and snapped rather than
    /// glided from a stale pose. Bound entities without a target are
    /// deactivated when `deactivate_missing` is set, but only once the task
    /// has sampled since it started or its targets were cleared.
    pub fn interpolate<S>(
        &mut self,
        now: Duration,
        bindings: &BindingTable,
        deactivate_missing: bool,
        store: &mut S,
    ) where
        S: EntityStore + ?Sized,
    {
        if self.task.is_none() {
            return;
        }
        let dt = self
            .last_frame
            .map_or(Duration::ZERO, |prev| now.saturating_sub(prev));
        self.last_frame = Some(now);

        for (id, entity) in bindings.iter() {
            let Some(target) = self.targets.get(&id) else {
                if deactivate_missing && self.sampled {
                    store.set_active(entity, false);
                }
                continue;
            };
            let next = match store.pose(entity) {
                Some(current) if store.is_active(entity) => {
                    step_towards(&current, &target.pose, &self.speed, dt)
                }
                _ => {
                    store.set_active(entity, true);
                    target.pose
                }
            };
            store.set_pose(entity, next);
        }
    }
}
