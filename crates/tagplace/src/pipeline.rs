//! The query facade: detection cycles, pose queries and mode toggles.

use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use tagplace_core::{FrameSource, MarkerDetector, MarkerId, MarkerPose, TrackingState};
use tagplace_placement::{
    place_entities, BaseMode, BindingTable, EntityStore, ModeArbitrator, PlacementMode,
    PlacementOutcome, SceneEntities, SlowPlacer, SlowTarget, TaskHandle,
};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{PipelineConfig, PipelineError, Zone};

/// What one [`TagPipeline::update`] call did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameUpdate {
    /// Mode that drove this frame.
    pub mode: PlacementMode,
    /// A detection cycle completed this frame.
    pub detected: bool,
    /// Result of the auto-placement pass, in auto-place mode.
    pub placement: Option<PlacementOutcome>,
}

/// Builder that wires collaborators into a [`TagPipeline`].
///
/// Both the frame source and the detector are mandatory; [`build`](Self::build)
/// fails fast instead of producing a pipeline that checks for them on every call.
pub struct TagPipelineBuilder<E> {
    config: PipelineConfig,
    frames: Option<Box<dyn FrameSource>>,
    detector: Option<Box<dyn MarkerDetector>>,
    entities: E,
}

impl<E: EntityStore> TagPipelineBuilder<E> {
    pub fn frame_source(mut self, frames: impl FrameSource + 'static) -> Self {
        self.frames = Some(Box::new(frames));
        self
    }

    pub fn detector(mut self, detector: impl MarkerDetector + 'static) -> Self {
        self.detector = Some(Box::new(detector));
        self
    }

    /// Use a host entity store instead of the in-memory scene.
    pub fn entities<E2: EntityStore>(self, entities: E2) -> TagPipelineBuilder<E2> {
        TagPipelineBuilder {
            config: self.config,
            frames: self.frames,
            detector: self.detector,
            entities,
        }
    }

    pub fn build(self) -> Result<TagPipeline<E>, PipelineError> {
        let frames = self.frames.ok_or_else(|| {
            log::warn!("pipeline disabled: no frame source assigned");
            PipelineError::MissingFrameSource
        })?;
        let detector = self.detector.ok_or_else(|| {
            log::warn!("pipeline disabled: no marker detector assigned");
            PipelineError::MissingDetector
        })?;
        let parts = self.config.build_parts().inspect_err(|err| {
            log::warn!("pipeline disabled: {err}");
        })?;

        let mut pipeline = TagPipeline {
            arbitrator: ModeArbitrator::new(self.config.initial_mode),
            config: self.config,
            frames,
            detector,
            tracking: parts.tracking,
            bindings: parts.bindings,
            slow: parts.slow,
            entities: self.entities,
        };
        if pipeline.arbitrator.is_slow_placing() {
            pipeline.slow.start(Duration::ZERO);
        }
        log::info!(
            "pipeline ready: {} bindings, mode {:?}, marker size {} m, smoothing {}",
            pipeline.bindings.len(),
            pipeline.mode(),
            pipeline.config.marker_size_m,
            pipeline.tracking.smoothing_factor()
        );
        Ok(pipeline)
    }
}

/// Marker pose pipeline and placement mode arbitrator.
///
/// Owns all per-marker state. Every entry point is non-blocking; while the
/// frame source has no image, queries report "no detections" instead of
/// failing.
pub struct TagPipeline<E = SceneEntities> {
    config: PipelineConfig,
    frames: Box<dyn FrameSource>,
    detector: Box<dyn MarkerDetector>,
    tracking: TrackingState,
    bindings: BindingTable,
    arbitrator: ModeArbitrator,
    slow: SlowPlacer,
    entities: E,
}

impl TagPipeline<SceneEntities> {
    pub fn builder(config: PipelineConfig) -> TagPipelineBuilder<SceneEntities> {
        TagPipelineBuilder {
            config,
            frames: None,
            detector: None,
            entities: SceneEntities::new(),
        }
    }
}

impl<E: EntityStore> TagPipeline<E> {
    /// Run one full detection cycle and return world poses keyed by id.
    ///
    /// Returns `None` when the frame source has no image ready. Never
    /// touches entities.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self)))]
    pub fn detect_markers(
        &mut self,
        apply_smoothing: bool,
    ) -> Option<HashMap<MarkerId, MarkerPose>> {
        let Some(image) = self.frames.current_image() else {
            log::debug!("detection skipped: no frame ready");
            return None;
        };
        let vfov = self.frames.vertical_fov_deg();
        // Sampled every cycle: the headset never holds still.
        let anchor = self.frames.camera_anchor_pose();
        let detections = self.detector.detect(&image, vfov, self.config.marker_size_m);

        let poses = self.tracking.ingest(&anchor, &detections, apply_smoothing);
        for id in poses.keys() {
            if self.bindings.bound_entity(*id).is_none() {
                log::trace!("marker {id} detected without a binding");
            }
        }
        log::debug!("detection cycle: {} markers", poses.len());
        Some(poses)
    }

    /// Last pose of `id`, only if `id` was visible in the latest cycle.
    pub fn try_get_last_pose(&self, id: MarkerId) -> Option<MarkerPose> {
        self.tracking.last_pose(id)
    }

    #[inline]
    pub fn is_visible(&self, id: MarkerId) -> bool {
        self.tracking.is_visible(id)
    }

    /// Run one auto-placement cycle.
    ///
    /// Returns whether every requested marker was detected; `false` when no
    /// frame is ready. While slow placing is enabled the cycle still detects
    /// but leaves entities to the interpolator.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self)))]
    pub fn place_at_markers(
        &mut self,
        included: Option<&BTreeSet<MarkerId>>,
        deactivate_unfound: bool,
    ) -> bool {
        if self.arbitrator.is_slow_placing() {
            log::debug!("place_at_markers during slow placing: entity writes skipped");
            let Some(poses) = self.detect_markers(self.config.auto_place_smoothing) else {
                return false;
            };
            return match included {
                Some(set) => set.iter().all(|id| poses.contains_key(id)),
                None => self.bindings.marker_ids().all(|id| poses.contains_key(&id)),
            };
        }
        self.run_auto_place(included, deactivate_unfound)
            .is_some_and(|outcome| outcome.all_found)
    }

    fn run_auto_place(
        &mut self,
        included: Option<&BTreeSet<MarkerId>>,
        deactivate_unfound: bool,
    ) -> Option<PlacementOutcome> {
        let poses = self.detect_markers(self.config.auto_place_smoothing)?;
        Some(place_entities(
            &poses,
            &self.bindings,
            included,
            deactivate_unfound,
            &mut self.entities,
        ))
    }

    /// Deactivate every bound entity and forget all tracking state.
    pub fn clear_all_bindings(&mut self) {
        for (_, entity) in self.bindings.iter() {
            self.entities.set_active(entity, false);
        }
        self.tracking.clear();
        self.slow.clear_targets();
        log::info!("tracking cleared, {} entities deactivated", self.bindings.len());
    }

    /// Per-frame step driven by the host loop.
    ///
    /// `now` is a monotonic timestamp; the slow-placing sampler fires when
    /// `now` reaches its next due time and the interpolator advances by the
    /// time since the previous call.
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn update(&mut self, now: Duration) -> FrameUpdate {
        let mode = self.arbitrator.mode();
        let mut update = FrameUpdate {
            mode,
            detected: false,
            placement: None,
        };
        match mode {
            PlacementMode::AutoPlace => {
                let included = self.config.auto_place_included.clone();
                update.placement =
                    self.run_auto_place(included.as_ref(), self.config.deactivate_unfound);
                update.detected = update.placement.is_some();
            }
            PlacementMode::OnDemand => {}
            PlacementMode::SlowPlacing => {
                if self.slow.poll_sample(now) {
                    let smoothing = self.config.slow_placing.apply_smoothing;
                    if let Some(poses) = self.detect_markers(smoothing) {
                        self.slow
                            .record_sample(&poses, self.config.deactivate_unfound, now);
                        update.detected = true;
                    }
                }
                self.slow.interpolate(
                    now,
                    &self.bindings,
                    self.config.deactivate_unfound,
                    &mut self.entities,
                );
            }
        }
        update
    }

    /// Enable slow placing, forcing auto placement off.
    ///
    /// Starting is idempotent: the running sampler's handle is returned.
    pub fn enable_slow_placing(&mut self, now: Duration) -> TaskHandle {
        if self.arbitrator.enable_slow_placing() {
            log::info!("placement mode -> {:?}", PlacementMode::SlowPlacing);
        }
        self.slow.start(now)
    }

    /// Disable slow placing and stop its sampler before returning.
    pub fn disable_slow_placing(&mut self) -> Option<TaskHandle> {
        if self.arbitrator.disable_slow_placing() {
            log::info!("placement mode -> {:?}", self.arbitrator.mode());
        }
        self.slow.stop()
    }

    pub fn select_mode(&mut self, base: BaseMode) {
        self.arbitrator.select(base);
    }

    #[inline]
    pub fn mode(&self) -> PlacementMode {
        self.arbitrator.mode()
    }

    #[inline]
    pub fn is_auto_place_enabled(&self) -> bool {
        self.arbitrator.is_auto_place_enabled()
    }

    /// Handle of the running slow-placing sampler.
    pub fn sampler_handle(&self) -> Option<TaskHandle> {
        self.slow.handle()
    }

    pub fn sampler_ticks(&self) -> u64 {
        self.slow.ticks()
    }

    pub fn slow_target(&self, id: MarkerId) -> Option<SlowTarget> {
        self.slow.target(id).copied()
    }

    pub fn zone_ids(&self, zone: Zone) -> &BTreeSet<MarkerId> {
        self.config.zones.ids(zone)
    }

    /// Replace the allowlist used by auto-place updates. `None` places every
    /// bound marker.
    pub fn set_auto_place_included(&mut self, included: Option<BTreeSet<MarkerId>>) {
        log::debug!(
            "auto place allowlist -> {:?}",
            included.as_ref().map(BTreeSet::len)
        );
        self.config.auto_place_included = included;
    }

    /// Ids visible in the latest cycle, ascending.
    pub fn visible_ids(&self) -> Vec<MarkerId> {
        self.tracking.visibility().visible_ids()
    }

    #[inline]
    pub fn bindings(&self) -> &BindingTable {
        &self.bindings
    }

    #[inline]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    #[inline]
    pub fn entities(&self) -> &E {
        &self.entities
    }

    #[inline]
    pub fn entities_mut(&mut self) -> &mut E {
        &mut self.entities
    }

    pub fn into_entities(self) -> E {
        self.entities
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replay::{replay_collaborators, RecordedFrame, RecordedSession};
    use tagplace_core::{CameraAnchorPose, FrameView, MarkerDetection};

    struct NoFrames;

    impl FrameSource for NoFrames {
        fn current_image(&self) -> Option<FrameView<'_>> {
            None
        }

        fn vertical_fov_deg(&self) -> f32 {
            60.0
        }

        fn camera_anchor_pose(&self) -> CameraAnchorPose {
            CameraAnchorPose::identity()
        }
    }

    struct PanicDetector;

    impl MarkerDetector for PanicDetector {
        fn detect(&mut self, _: &FrameView<'_>, _: f32, _: f32) -> Vec<MarkerDetection> {
            panic!("detector must not run without a frame");
        }
    }

    fn config_with_binding() -> PipelineConfig {
        PipelineConfig {
            bindings: vec![tagplace_placement::Binding {
                marker_id: 5,
                entity: "entityA".into(),
            }],
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn build_fails_without_collaborators() {
        let err = TagPipeline::builder(PipelineConfig::default())
            .detector(PanicDetector)
            .build()
            .err()
            .expect("missing frame source");
        assert!(matches!(err, PipelineError::MissingFrameSource));

        let err = TagPipeline::builder(PipelineConfig::default())
            .frame_source(NoFrames)
            .build()
            .err()
            .expect("missing detector");
        assert!(matches!(err, PipelineError::MissingDetector));
    }

    #[test]
    fn build_rejects_invalid_config() {
        let cfg = PipelineConfig {
            smoothing_factor: 2.0,
            ..PipelineConfig::default()
        };
        let err = TagPipeline::builder(cfg)
            .frame_source(NoFrames)
            .detector(PanicDetector)
            .build()
            .err()
            .expect("invalid config");
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn not_ready_is_a_silent_no_op() {
        let mut pipeline = TagPipeline::builder(config_with_binding())
            .frame_source(NoFrames)
            .detector(PanicDetector)
            .build()
            .expect("pipeline");
        pipeline.entities_mut().set_active(&"entityA".into(), true);

        assert!(pipeline.detect_markers(true).is_none());
        assert!(!pipeline.place_at_markers(None, true));
        // No-op: entity untouched.
        assert!(pipeline.entities().is_active(&"entityA".into()));

        pipeline.select_mode(BaseMode::AutoPlace);
        let update = pipeline.update(Duration::from_millis(16));
        assert!(!update.detected);
        assert!(update.placement.is_none());
    }

    #[test]
    fn initial_slow_placing_starts_sampler() {
        let cfg = PipelineConfig {
            initial_mode: PlacementMode::SlowPlacing,
            ..config_with_binding()
        };
        let session = RecordedSession {
            vertical_fov_deg: 64.0,
            frames: vec![RecordedFrame::ready(0, Vec::new())],
        };
        let (frames, detector, _cursor) = replay_collaborators(session);
        let pipeline = TagPipeline::builder(cfg)
            .frame_source(frames)
            .detector(detector)
            .build()
            .expect("pipeline");
        assert_eq!(pipeline.mode(), PlacementMode::SlowPlacing);
        assert!(pipeline.sampler_handle().is_some());
    }
}
