use approx::assert_relative_eq;
use nalgebra::{UnitQuaternion, Vector3};
use std::collections::BTreeSet;
use std::time::Duration;
use tagplace::placement::EntityState;
use tagplace::replay::{replay_collaborators, RecordedFrame, RecordedSession, ReplayCursor};
use tagplace::{
    BaseMode, Binding, CameraAnchorPose, EntityHandle, EntityStore, MarkerDetection, MarkerId,
    PipelineConfig, PlacementMode, SceneEntities, TagPipeline, Zone, ZoneLists,
};

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

fn det(id: MarkerId, position: [f32; 3]) -> MarkerDetection {
    MarkerDetection {
        id,
        position_camera: Vector3::from(position),
        orientation_camera: UnitQuaternion::identity(),
    }
}

fn bind(pairs: &[(MarkerId, &str)]) -> Vec<Binding> {
    pairs
        .iter()
        .map(|&(marker_id, entity)| Binding {
            marker_id,
            entity: entity.into(),
        })
        .collect()
}

fn pipeline_with(
    config: PipelineConfig,
    frames: Vec<RecordedFrame>,
    scene: SceneEntities,
) -> (TagPipeline, ReplayCursor) {
    let (source, detector, cursor) = replay_collaborators(RecordedSession {
        vertical_fov_deg: 64.0,
        frames,
    });
    let pipeline = TagPipeline::builder(config)
        .frame_source(source)
        .detector(detector)
        .entities(scene)
        .build()
        .expect("pipeline");
    (pipeline, cursor)
}

fn entity(name: &str) -> EntityHandle {
    EntityHandle::new(name)
}

#[test]
fn bound_marker_not_detected_deactivates_its_entity() {
    let config = PipelineConfig {
        marker_size_m: 0.05,
        smoothing_factor: 0.8,
        bindings: bind(&[(5, "entityA")]),
        ..PipelineConfig::default()
    };
    let mut scene = SceneEntities::new();
    scene.spawn(entity("entityA"), EntityState::default());
    let frames = vec![RecordedFrame::ready(0, vec![])];
    let (mut pipeline, _cursor) = pipeline_with(config, frames, scene);

    let included = BTreeSet::from([5]);
    assert!(!pipeline.place_at_markers(Some(&included), true));
    assert!(!pipeline.entities().is_active(&entity("entityA")));
    assert!(pipeline.try_get_last_pose(5).is_none());
}

#[test]
fn allowlist_and_deactivation_policy() {
    let config = PipelineConfig {
        bindings: bind(&[(1, "a"), (2, "b"), (3, "c")]),
        ..PipelineConfig::default()
    };
    let frames = vec![RecordedFrame::ready(0, vec![det(1, [0.1, 0.0, 1.0])])];
    let (mut pipeline, _cursor) = pipeline_with(config, frames, SceneEntities::new());

    // Allowlist {1, 3}: marker 3 missing, marker 2 not requested.
    let included = BTreeSet::from([1, 3]);
    assert!(!pipeline.place_at_markers(Some(&included), true));
    let scene = pipeline.entities();
    assert!(scene.is_active(&entity("a")));
    assert_relative_eq!(
        scene.pose(&entity("a")).expect("pose a").position,
        Vector3::new(0.1, 0.0, 1.0),
        epsilon = 1e-6
    );
    assert!(!scene.is_active(&entity("b")));
    assert!(!scene.is_active(&entity("c")));

    // Without deactivation, entities of missing markers keep their state.
    pipeline.entities_mut().set_active(&entity("c"), true);
    assert!(!pipeline.place_at_markers(None, false));
    assert!(pipeline.entities().is_active(&entity("a")));
    assert!(pipeline.entities().is_active(&entity("c")));

    let found = BTreeSet::from([1]);
    assert!(pipeline.place_at_markers(Some(&found), true));
}

#[test]
fn world_pose_follows_the_camera_anchor() {
    let anchor = CameraAnchorPose {
        position_world: Vector3::new(0.0, 1.6, 0.0),
        orientation_world: UnitQuaternion::from_axis_angle(
            &Vector3::y_axis(),
            std::f32::consts::FRAC_PI_2,
        ),
    };
    let frame = RecordedFrame {
        anchor,
        ..RecordedFrame::ready(0, vec![det(7, [0.0, 0.0, 1.0])])
    };
    let (mut pipeline, _cursor) =
        pipeline_with(PipelineConfig::default(), vec![frame], SceneEntities::new());

    let poses = pipeline.detect_markers(false).expect("frame ready");
    assert_relative_eq!(
        poses[&7].position_world,
        Vector3::new(1.0, 1.6, 0.0),
        epsilon = 1e-5
    );
    assert_relative_eq!(
        poses[&7].orientation_world.quaternion().coords,
        anchor.orientation_world.quaternion().coords,
        epsilon = 1e-6
    );
}

#[test]
fn visibility_is_replaced_every_cycle() {
    let frames = vec![
        RecordedFrame::ready(0, vec![det(1, [0.0, 0.0, 1.0]), det(2, [0.5, 0.0, 1.0])]),
        RecordedFrame::ready(16, vec![det(2, [0.5, 0.0, 1.0])]),
        RecordedFrame {
            image_ready: false,
            ..RecordedFrame::ready(33, vec![])
        },
    ];
    let (mut pipeline, cursor) =
        pipeline_with(PipelineConfig::default(), frames, SceneEntities::new());

    pipeline.detect_markers(true).expect("frame 0");
    assert_eq!(pipeline.visible_ids(), vec![1, 2]);

    cursor.seek(1);
    pipeline.detect_markers(true).expect("frame 1");
    assert!(pipeline.try_get_last_pose(1).is_none());
    assert!(!pipeline.is_visible(1));
    assert!(pipeline.try_get_last_pose(2).is_some());

    // Not ready: nothing changes.
    cursor.seek(2);
    assert!(pipeline.detect_markers(true).is_none());
    assert_eq!(pipeline.visible_ids(), vec![2]);
}

#[test]
fn smoothing_blends_consecutive_cycles() {
    let frames = vec![
        RecordedFrame::ready(0, vec![det(4, [0.0, 0.0, 0.0])]),
        RecordedFrame::ready(16, vec![det(4, [1.0, 0.0, 0.0])]),
        RecordedFrame::ready(33, vec![det(4, [1.0, 0.0, 0.0])]),
    ];
    let config = PipelineConfig {
        smoothing_factor: 0.8,
        ..PipelineConfig::default()
    };
    let (mut pipeline, cursor) = pipeline_with(config, frames, SceneEntities::new());

    pipeline.detect_markers(true).expect("frame 0");
    cursor.seek(1);
    let poses = pipeline.detect_markers(true).expect("frame 1");
    assert_relative_eq!(poses[&4].position_world.x, 0.2, epsilon = 1e-6);

    // An unsmoothed cycle returns the raw pose and resets the history to it.
    cursor.seek(2);
    let poses = pipeline.detect_markers(false).expect("frame 2");
    assert_relative_eq!(poses[&4].position_world.x, 1.0, epsilon = 1e-6);
    let last = pipeline.try_get_last_pose(4).expect("visible");
    assert_relative_eq!(last.position_world.x, 1.0, epsilon = 1e-6);
}

#[test]
fn auto_place_mode_runs_every_update() {
    let config = PipelineConfig {
        initial_mode: PlacementMode::AutoPlace,
        bindings: bind(&[(1, "a"), (2, "b")]),
        ..PipelineConfig::default()
    };
    let frames = vec![RecordedFrame::ready(0, vec![det(1, [0.0, 0.0, 2.0])])];
    let (mut pipeline, _cursor) = pipeline_with(config, frames, SceneEntities::new());

    let update = pipeline.update(ms(16));
    assert_eq!(update.mode, PlacementMode::AutoPlace);
    let outcome = update.placement.expect("placement ran");
    assert!(!outcome.all_found);
    assert_eq!(outcome.placed, vec![1]);
    assert_eq!(outcome.deactivated, vec![2]);
    assert!(pipeline.entities().is_active(&entity("a")));
}

#[test]
fn slow_placing_and_auto_place_are_exclusive() {
    let config = PipelineConfig {
        initial_mode: PlacementMode::AutoPlace,
        ..PipelineConfig::default()
    };
    let frames = vec![RecordedFrame::ready(0, vec![])];
    let (mut pipeline, _cursor) = pipeline_with(config, frames, SceneEntities::new());
    assert!(pipeline.is_auto_place_enabled());

    pipeline.enable_slow_placing(ms(0));
    assert_eq!(pipeline.mode(), PlacementMode::SlowPlacing);
    assert!(!pipeline.is_auto_place_enabled());

    // Enabling slow placing turned auto place off for good.
    pipeline.disable_slow_placing();
    assert_eq!(pipeline.mode(), PlacementMode::OnDemand);

    // A selection made during slow placing waits for it to end.
    pipeline.enable_slow_placing(ms(10));
    pipeline.select_mode(BaseMode::AutoPlace);
    assert_eq!(pipeline.mode(), PlacementMode::SlowPlacing);
    assert!(!pipeline.is_auto_place_enabled());
    pipeline.disable_slow_placing();
    assert_eq!(pipeline.mode(), PlacementMode::AutoPlace);
}

#[test]
fn sampler_start_is_idempotent_and_stop_ends_cache_writes() {
    let frames = vec![
        RecordedFrame::ready(0, vec![det(1, [0.0, 0.0, 1.0])]),
        RecordedFrame::ready(300, vec![det(2, [0.0, 0.0, 1.0])]),
    ];
    let (mut pipeline, cursor) =
        pipeline_with(PipelineConfig::default(), frames, SceneEntities::new());

    let first = pipeline.enable_slow_placing(ms(0));
    assert_eq!(pipeline.enable_slow_placing(ms(50)), first);
    assert_eq!(pipeline.sampler_handle(), Some(first));

    pipeline.update(ms(0));
    assert_eq!(pipeline.sampler_ticks(), 1);
    assert!(pipeline.slow_target(1).is_some());

    assert_eq!(pipeline.disable_slow_placing(), Some(first));
    assert_eq!(pipeline.sampler_handle(), None);
    cursor.seek(1);
    let update = pipeline.update(ms(300));
    assert!(!update.detected);
    assert!(pipeline.slow_target(2).is_none());

    let second = pipeline.enable_slow_placing(ms(400));
    assert_ne!(second, first);
    assert!(pipeline.slow_target(1).is_none());
}

#[test]
fn sampler_does_not_replay_missed_ticks() {
    let frames = vec![RecordedFrame::ready(0, vec![det(1, [0.0, 0.0, 1.0])])];
    let (mut pipeline, _cursor) =
        pipeline_with(PipelineConfig::default(), frames, SceneEntities::new());

    pipeline.enable_slow_placing(ms(0));
    pipeline.update(ms(0));
    pipeline.update(ms(100));
    assert_eq!(pipeline.sampler_ticks(), 1);

    // Three intervals late: one tick, not three.
    pipeline.update(ms(1000));
    assert_eq!(pipeline.sampler_ticks(), 2);
}

#[test]
fn slow_placing_glides_at_bounded_speed() {
    let mut config = PipelineConfig {
        bindings: bind(&[(1, "cube")]),
        ..PipelineConfig::default()
    };
    config.slow_placing.linear_speed_mps = 0.5;
    config.slow_placing.sample_interval_ms = 300;

    let mut scene = SceneEntities::new();
    scene.spawn(entity("cube"), EntityState::default());
    let frames = vec![RecordedFrame::ready(0, vec![det(1, [1.0, 0.0, 0.0])])];
    let (mut pipeline, _cursor) = pipeline_with(config, frames, scene);

    pipeline.enable_slow_placing(ms(0));
    pipeline.update(ms(0));
    let target = pipeline.slow_target(1).expect("target cached");
    assert_relative_eq!(target.pose.position, Vector3::new(1.0, 0.0, 0.0));

    pipeline.update(ms(100));
    pipeline.update(ms(200));
    let pose = pipeline.entities().pose(&entity("cube")).expect("pose");
    assert_relative_eq!(pose.position, Vector3::new(0.1, 0.0, 0.0), epsilon = 1e-5);
    assert!(pipeline.entities().is_active(&entity("cube")));
}

#[test]
fn slow_placing_snaps_inactive_entities() {
    let config = PipelineConfig {
        bindings: bind(&[(1, "cube"), (2, "lamp")]),
        ..PipelineConfig::default()
    };
    let mut scene = SceneEntities::new();
    for name in ["cube", "lamp"] {
        scene.spawn(
            entity(name),
            EntityState {
                active: false,
                ..EntityState::default()
            },
        );
    }
    let frames = vec![RecordedFrame::ready(0, vec![det(1, [1.0, 0.0, 0.0])])];
    let (mut pipeline, _cursor) = pipeline_with(config, frames, scene);

    pipeline.enable_slow_placing(ms(0));
    pipeline.update(ms(0));
    let scene = pipeline.entities();
    assert!(scene.is_active(&entity("cube")));
    assert_relative_eq!(
        scene.pose(&entity("cube")).expect("pose").position,
        Vector3::new(1.0, 0.0, 0.0)
    );
    assert!(!scene.is_active(&entity("lamp")));
}

#[test]
fn slow_placing_waits_for_a_ready_frame() {
    let config = PipelineConfig {
        bindings: bind(&[(1, "cube")]),
        ..PipelineConfig::default()
    };
    let mut scene = SceneEntities::new();
    scene.spawn(entity("cube"), EntityState::default());
    let frames = vec![
        RecordedFrame {
            image_ready: false,
            ..RecordedFrame::ready(0, vec![])
        },
        RecordedFrame::ready(300, vec![det(1, [1.0, 0.0, 0.0])]),
        RecordedFrame {
            image_ready: false,
            ..RecordedFrame::ready(600, vec![])
        },
    ];
    let (mut pipeline, cursor) = pipeline_with(config, frames, scene);

    pipeline.enable_slow_placing(ms(0));
    let update = pipeline.update(ms(0));
    assert!(!update.detected);
    assert_eq!(pipeline.sampler_ticks(), 1);
    assert!(pipeline.entities().is_active(&entity("cube")));

    cursor.seek(1);
    assert!(pipeline.update(ms(300)).detected);
    assert!(pipeline.slow_target(1).is_some());

    pipeline.clear_all_bindings();
    pipeline.entities_mut().set_active(&entity("cube"), true);
    cursor.seek(2);
    assert!(!pipeline.update(ms(600)).detected);
    assert!(pipeline.entities().is_active(&entity("cube")));
}

#[test]
fn place_at_markers_during_slow_placing_leaves_entities_alone() {
    let config = PipelineConfig {
        bindings: bind(&[(1, "cube")]),
        ..PipelineConfig::default()
    };
    let mut scene = SceneEntities::new();
    scene.spawn(entity("cube"), EntityState::default());
    let frames = vec![RecordedFrame::ready(0, vec![det(1, [1.0, 0.0, 0.0])])];
    let (mut pipeline, _cursor) = pipeline_with(config, frames, scene);

    pipeline.enable_slow_placing(ms(0));
    assert!(pipeline.place_at_markers(None, true));
    let pose = pipeline.entities().pose(&entity("cube")).expect("pose");
    assert_eq!(pose.position, Vector3::zeros());
}

#[test]
fn clear_all_bindings_resets_tracking() {
    let config = PipelineConfig {
        bindings: bind(&[(1, "a")]),
        ..PipelineConfig::default()
    };
    let frames = vec![RecordedFrame::ready(0, vec![det(1, [0.0, 0.0, 1.0])])];
    let (mut pipeline, _cursor) = pipeline_with(config, frames, SceneEntities::new());

    assert!(pipeline.place_at_markers(None, true));
    assert!(pipeline.entities().is_active(&entity("a")));

    pipeline.clear_all_bindings();
    assert!(!pipeline.entities().is_active(&entity("a")));
    assert!(pipeline.try_get_last_pose(1).is_none());
    assert!(pipeline.visible_ids().is_empty());
    assert_eq!(pipeline.bindings().len(), 1);
}

#[test]
fn red_zone_drives_place_at_markers() {
    let config = PipelineConfig {
        bindings: bind(&[(1, "a"), (2, "b")]),
        zones: ZoneLists {
            red: BTreeSet::from([1]),
            green: BTreeSet::from([2]),
        },
        ..PipelineConfig::default()
    };
    let frames = vec![RecordedFrame::ready(
        0,
        vec![det(1, [0.0, 0.0, 1.0]), det(2, [0.5, 0.0, 1.0])],
    )];
    let (mut pipeline, _cursor) = pipeline_with(config, frames, SceneEntities::new());

    let red = pipeline.zone_ids(Zone::Red).clone();
    assert!(pipeline.place_at_markers(Some(&red), true));
    assert!(pipeline.entities().is_active(&entity("a")));
    assert!(!pipeline.entities().is_active(&entity("b")));

    let green = pipeline.zone_ids(Zone::Green).clone();
    pipeline.set_auto_place_included(Some(green));
    pipeline.select_mode(BaseMode::AutoPlace);
    pipeline.update(ms(16));
    assert!(!pipeline.entities().is_active(&entity("a")));
    assert!(pipeline.entities().is_active(&entity("b")));
}
