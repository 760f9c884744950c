//! Recorded detection sessions and deterministic replay.
//!
//! A session is a JSON list of frames, each with a timestamp, the camera
//! anchor pose and the detector output for that frame. The replay
//! collaborators implement [`FrameSource`] and [`MarkerDetector`] over a
//! shared cursor, so a recorded session can drive a real [`TagPipeline`].

use std::cell::Cell;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tagplace_core::{
    CameraAnchorPose, FrameBuffer, FrameSource, FrameView, MarkerDetection, MarkerDetector,
    MarkerId, MarkerPose,
};
use tagplace_placement::{EntityState, PlacementMode, SceneEntities};

use crate::{PipelineConfig, PipelineError, TagPipeline, TagplaceIoError, Zone};

/// Replay failures: unreadable inputs or a pipeline that cannot be built.
#[derive(thiserror::Error, Debug)]
pub enum ReplayError {
    #[error("failed to read {path}: {source}")]
    Input {
        path: String,
        #[source]
        source: TagplaceIoError,
    },
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

fn default_true() -> bool {
    true
}

fn default_vertical_fov_deg() -> f32 {
    64.0
}

/// One recorded frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordedFrame {
    pub t_ms: u64,
    /// `false` simulates a camera that has not produced an image yet.
    #[serde(default = "default_true")]
    pub image_ready: bool,
    #[serde(default)]
    pub anchor: CameraAnchorPose,
    #[serde(default)]
    pub detections: Vec<MarkerDetection>,
}

impl RecordedFrame {
    /// A ready frame at `t_ms` with an identity anchor.
    pub fn ready(t_ms: u64, detections: Vec<MarkerDetection>) -> Self {
        Self {
            t_ms,
            image_ready: true,
            anchor: CameraAnchorPose::identity(),
            detections,
        }
    }
}

/// A recorded session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordedSession {
    #[serde(default = "default_vertical_fov_deg")]
    pub vertical_fov_deg: f32,
    pub frames: Vec<RecordedFrame>,
}

impl RecordedSession {
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, TagplaceIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), TagplaceIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

struct Shared {
    session: RecordedSession,
    cursor: Cell<usize>,
    image: FrameBuffer,
}

impl Shared {
    fn frame(&self) -> Option<&RecordedFrame> {
        self.session.frames.get(self.cursor.get())
    }
}

/// Selects which recorded frame the replay collaborators expose.
#[derive(Clone)]
pub struct ReplayCursor(Rc<Shared>);

impl ReplayCursor {
    /// Point the collaborators at frame `index`. Out-of-range indices read as "no frame".
    pub fn seek(&self, index: usize) {
        self.0.cursor.set(index);
    }

    pub fn position(&self) -> usize {
        self.0.cursor.get()
    }

    pub fn len(&self) -> usize {
        self.0.session.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.session.frames.is_empty()
    }
}

/// [`FrameSource`] over a recorded session.
pub struct ReplayFrameSource(Rc<Shared>);

impl FrameSource for ReplayFrameSource {
    fn current_image(&self) -> Option<FrameView<'_>> {
        let frame = self.0.frame()?;
        frame.image_ready.then(|| self.0.image.view())
    }

    fn vertical_fov_deg(&self) -> f32 {
        self.0.session.vertical_fov_deg
    }

    fn camera_anchor_pose(&self) -> CameraAnchorPose {
        self.0
            .frame()
            .map(|f| f.anchor)
            .unwrap_or_else(CameraAnchorPose::identity)
    }
}

/// [`MarkerDetector`] returning the recorded detections of the current frame.
pub struct ReplayDetector(Rc<Shared>);

impl MarkerDetector for ReplayDetector {
    fn detect(
        &mut self,
        _image: &FrameView<'_>,
        _vertical_fov_deg: f32,
        _marker_size_m: f32,
    ) -> Vec<MarkerDetection> {
        self.0
            .frame()
            .map(|f| f.detections.clone())
            .unwrap_or_default()
    }
}

/// Split a session into collaborators sharing one cursor (initially frame 0).
pub fn replay_collaborators(
    session: RecordedSession,
) -> (ReplayFrameSource, ReplayDetector, ReplayCursor) {
    let shared = Rc::new(Shared {
        session,
        cursor: Cell::new(0),
        image: FrameBuffer::blank(1, 1),
    });
    (
        ReplayFrameSource(Rc::clone(&shared)),
        ReplayDetector(Rc::clone(&shared)),
        ReplayCursor(shared),
    )
}

/// Replay options layered over the config.
#[derive(Clone, Debug, Default)]
pub struct ReplayOptions {
    /// Override `initial_mode`.
    pub mode: Option<PlacementMode>,
    /// Override `auto_place_included`.
    pub included: Option<BTreeSet<MarkerId>>,
    /// Use a configured zone list as the auto-place allowlist. Ignored when
    /// `included` is set.
    pub zone: Option<Zone>,
}

/// Per-frame replay record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    pub t_ms: u64,
    pub mode: PlacementMode,
    pub detected: bool,
    #[serde(default)]
    pub all_found: Option<bool>,
    pub visible: Vec<MarkerId>,
    /// Last poses of the visible markers.
    pub poses: Vec<MarkerPose>,
}

/// Replay output: per-frame records plus the final entity scene.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReplayReport {
    pub frames: Vec<FrameRecord>,
    pub scene: SceneEntities,
}

impl ReplayReport {
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, TagplaceIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), TagplaceIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

/// Drive a pipeline through every frame of `session`.
///
/// Bound entities start inactive at the origin. In on-demand mode each frame
/// runs one smoothed detection query, the way a calibration routine would.
#[cfg_attr(feature = "tracing", tracing::instrument(level = "info", skip_all))]
pub fn run_replay(
    mut config: PipelineConfig,
    session: RecordedSession,
    options: &ReplayOptions,
) -> Result<ReplayReport, ReplayError> {
    if let Some(included) = &options.included {
        config.auto_place_included = Some(included.clone());
    }
    let start_slow = options.mode == Some(PlacementMode::SlowPlacing);
    match options.mode {
        Some(PlacementMode::SlowPlacing) | None => {}
        Some(mode) => config.initial_mode = mode,
    }

    let mut scene = SceneEntities::new();
    for binding in &config.bindings {
        scene.spawn(
            binding.entity.clone(),
            EntityState {
                active: false,
                ..EntityState::default()
            },
        );
    }

    let (frames, detector, cursor) = replay_collaborators(session);
    let times: Vec<u64> = frames.0.session.frames.iter().map(|f| f.t_ms).collect();
    let mut pipeline = TagPipeline::builder(config)
        .frame_source(frames)
        .detector(detector)
        .entities(scene)
        .build()?;
    if let (None, Some(zone)) = (&options.included, options.zone) {
        let ids = pipeline.zone_ids(zone).clone();
        log::info!("auto place restricted to {zone:?} zone: {ids:?}");
        pipeline.set_auto_place_included(Some(ids));
    }

    let mut records = Vec::with_capacity(times.len());
    for (index, t_ms) in times.into_iter().enumerate() {
        cursor.seek(index);
        let now = Duration::from_millis(t_ms);
        if start_slow && index == 0 {
            pipeline.enable_slow_placing(now);
        }

        let mut detected = false;
        if pipeline.mode() == PlacementMode::OnDemand {
            detected = pipeline.detect_markers(true).is_some();
        }
        let update = pipeline.update(now);
        let visible = pipeline.visible_ids();
        let poses = visible
            .iter()
            .filter_map(|id| pipeline.try_get_last_pose(*id))
            .collect();

        records.push(FrameRecord {
            t_ms,
            mode: update.mode,
            detected: detected || update.detected,
            all_found: update.placement.map(|p| p.all_found),
            visible,
            poses,
        });
    }

    log::info!("replayed {} frames", records.len());
    Ok(ReplayReport {
        frames: records,
        scene: pipeline.into_entities(),
    })
}

/// Load a config and a session from disk and replay them.
pub fn run_replay_files(
    config_path: impl AsRef<Path>,
    session_path: impl AsRef<Path>,
    options: &ReplayOptions,
) -> Result<ReplayReport, ReplayError> {
    let read_err = |path: &Path| {
        let path = path.display().to_string();
        move |source| ReplayError::Input { path, source }
    };
    let config_path = config_path.as_ref();
    let session_path = session_path.as_ref();
    let config = PipelineConfig::load_json(config_path).map_err(read_err(config_path))?;
    let session = RecordedSession::load_json(session_path).map_err(read_err(session_path))?;
    log::info!(
        "replaying {} frames from {}",
        session.frames.len(),
        session_path.display()
    );
    run_replay(config, session, options)
}
