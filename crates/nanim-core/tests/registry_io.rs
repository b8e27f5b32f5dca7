use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use glam::Vec3;
use nanim_format::{save_animation_set, AnimationSet, RawAnimation, RawKeyframe, RawTimeline,
    MAX_VERSION};
use nanim_core::{Animation, Config, GraphRegistry, GraphState, LocalRig, RuntimeError,
    SkeletonRig, Transform};

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn rig() -> LocalRig {
    let mut rig = LocalRig::new();
    let a = rig.add_node("a", None, Transform::IDENTITY);
    rig.add_node("b", Some(a), Transform::IDENTITY);
    rig
}

/// Constant one-second clip pinning node "a" at y == 1.
fn raw_clip() -> RawAnimation {
    raw_clip_lasting(1.0)
}

fn raw_clip_lasting(duration: f32) -> RawAnimation {
    RawAnimation {
        duration,
        timelines: vec![(
            "a".to_string(),
            RawTimeline {
                keys: vec![RawKeyframe {
                    time: 0.0,
                    translation: [0.0, 1.0, 0.0],
                    rotation: [1.0, 0.0, 0.0, 0.0],
                }],
            },
        )],
        metadata: Vec::new(),
    }
}

fn temp_file(tag: &str) -> PathBuf {
    let mut p = std::env::temp_dir();
    p.push(format!("nanim-registry-{}-{tag}.nanim", std::process::id()));
    p
}

fn write_clip_file(tag: &str) -> PathBuf {
    write_clip_file_lasting(tag, 1.0)
}

fn write_clip_file_lasting(tag: &str, duration: f32) -> PathBuf {
    let path = temp_file(tag);
    let set = AnimationSet {
        version: MAX_VERSION,
        animations: vec![("walk".to_string(), raw_clip_lasting(duration))],
    };
    save_animation_set(&path, &set, None).expect("save");
    path
}

/// it should sweep an idle temporary graph away on update
#[test]
fn idle_temporary_graph_is_swept() {
    let mut rig = rig();
    let registry = GraphRegistry::new(Config::default());
    registry.visit(1, Some(&rig), false, |_| ());
    assert!(registry.contains(1));

    registry.update(1, 0.016, &mut rig);
    assert!(!registry.contains(1));
}

/// it should keep a playing graph alive and remove it after a stop completes
#[test]
fn start_then_stop_lifecycle() {
    let mut rig = rig();
    let registry = GraphRegistry::new(Config::default());

    registry.start_animation(7, &rig, &raw_clip(), 0.0);
    assert_eq!(
        registry.visit(7, None, false, |g| g.state()),
        Some(GraphState::Generator)
    );

    registry.update(7, 0.1, &mut rig);
    assert!(registry.contains(7));
    assert!((rig.local_transform(0).translation.y - 1.0).abs() < 1e-5);

    registry.stop_animation(7, 0.0);
    registry.update(7, 0.016, &mut rig);
    assert!(!registry.contains(7));
}

/// it should skip idle graphs when visiting with only_if_animating
#[test]
fn visit_only_if_animating_skips_idle() {
    let rig = rig();
    let registry = GraphRegistry::new(Config::default());
    registry.visit(3, Some(&rig), false, |g| g.set_temporary(false));
    assert_eq!(registry.visit(3, None, true, |_| ()), None);

    registry.start_animation(3, &rig, &raw_clip(), 0.0);
    assert_eq!(registry.visit(3, None, true, |_| ()), Some(()));
}

/// it should load a named animation from a file and report missing ids
#[test]
fn load_animation_by_id() {
    let path = write_clip_file("load");

    let raw = GraphRegistry::load_animation(&path, "walk").expect("load");
    assert_eq!(raw, raw_clip());

    let err = GraphRegistry::load_animation(&path, "run").unwrap_err();
    assert!(matches!(err, RuntimeError::AnimationNotFound { .. }));

    let _ = std::fs::remove_file(&path);
}

/// it should start a background-loaded animation once the worker finishes
#[test]
fn background_load_starts_animation() {
    init_logs();
    let path = write_clip_file("background");
    let rig = rig();
    let registry = Arc::new(GraphRegistry::new(Config::default()));
    registry.visit(9, Some(&rig), false, |g| g.set_temporary(false));

    registry.request_animation(9, path.clone(), "walk".to_string(), 0.0);

    let deadline = Instant::now() + Duration::from_secs(5);
    let mut animating = false;
    while Instant::now() < deadline {
        if registry.visit(9, None, false, |g| g.is_animating()) == Some(true) {
            animating = true;
            break;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    assert!(animating, "background load never applied");

    let _ = std::fs::remove_file(&path);
}

/// it should apply only the newest of two overlapping load requests
#[test]
fn newer_request_supersedes_older() {
    init_logs();
    // The clips are told apart by duration.
    let stale = write_clip_file_lasting("stale", 1.0);
    let fresh = write_clip_file_lasting("fresh", 2.0);
    let rig = rig();
    let registry = Arc::new(GraphRegistry::new(Config::default()));
    registry.visit(11, Some(&rig), false, |g| g.set_temporary(false));

    registry.request_animation(11, stale.clone(), "walk".to_string(), 0.0);
    registry.request_animation(11, fresh.clone(), "walk".to_string(), 0.0);

    let playing = |registry: &GraphRegistry| {
        registry
            .visit(11, None, false, |g| {
                g.generator().animation().map(Animation::duration)
            })
            .flatten()
    };

    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline && playing(&registry) != Some(2.0) {
        std::thread::sleep(Duration::from_millis(10));
    }
    assert_eq!(playing(&registry), Some(2.0), "newest request never applied");

    // Give the superseded worker time to finish; its result must have been
    // discarded, never applied over the newer one.
    std::thread::sleep(Duration::from_millis(200));
    assert_eq!(playing(&registry), Some(2.0));

    let _ = std::fs::remove_file(&stale);
    let _ = std::fs::remove_file(&fresh);
}

/// it should write a detached capture that loads back intact
#[test]
fn save_capture_round_trips() {
    init_logs();
    let mut rig = rig();
    rig.set_local_transform(0, Transform::from_translation(Vec3::new(0.0, 4.0, 0.0)));
    let registry = GraphRegistry::new(Config::default());
    registry.visit(5, Some(&rig), false, |g| {
        g.set_temporary(false);
        g.start_recording(&rig);
    });
    for _ in 0..8 {
        registry.update(5, 1.0 / 30.0, &mut rig);
    }

    let path = temp_file("capture");
    assert!(registry.save_capture(5, path.clone(), "take1".to_string()));
    // Nothing left to save a second time.
    assert!(!registry.save_capture(5, path.clone(), "take1".to_string()));

    // The write happens on a worker thread; poll for the result.
    let deadline = Instant::now() + Duration::from_secs(5);
    let mut loaded = None;
    while Instant::now() < deadline {
        if let Ok(raw) = GraphRegistry::load_animation(&path, "take1") {
            loaded = Some(raw);
            break;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    let raw = loaded.expect("capture file never appeared");
    let (name, tl) = &raw.timelines[0];
    assert_eq!(name, "a");
    assert!(tl.keys.len() >= 2);
    assert!((tl.keys[0].translation[1] - 4.0).abs() < 1e-5);

    let _ = std::fs::remove_file(&path);
}
