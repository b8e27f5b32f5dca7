use glam::Vec3;
use nanim_core::{
    Animation, AnimationGraph, Config, FrameAnimation, GraphState, LocalRig, SkeletonRig,
    Transform,
};

fn tf(y: f32) -> Transform {
    Transform::from_translation(Vec3::new(0.0, y, 0.0))
}

fn rig() -> LocalRig {
    let mut rig = LocalRig::new();
    let a = rig.add_node("a", None, Transform::IDENTITY);
    rig.add_node("b", Some(a), Transform::IDENTITY);
    rig
}

/// Constant clip: node 0 pinned at `y` for one second.
fn constant_clip(y: f32) -> Animation {
    let mut anim = Animation::new(1.0, 2);
    anim.timeline_mut(0).unwrap().insert(0.0, tf(y));
    anim
}

fn graph_for(rig: &LocalRig) -> AnimationGraph {
    let mut g = AnimationGraph::new(rig.node_names().to_vec(), Config::default());
    g.rebind(rig);
    g
}

/// it should run the full stop sequence: generator, fade to the host pose,
/// then idle with the animation released
#[test]
fn generator_fades_back_to_scene() {
    let mut rig = rig();
    rig.set_procedural(0, Some(Transform::IDENTITY));
    let mut graph = graph_for(&rig);

    // Zero-length transition lands directly in Generator.
    graph.transition_to_animation(Some(constant_clip(1.0)), 0.0);
    assert_eq!(graph.state(), GraphState::Generator);
    graph.update(0.1, &mut rig);
    assert!((rig.local_transform(0).translation.y - 1.0).abs() < 1e-5);

    graph.transition_to_animation(None, 1.0);
    assert_eq!(graph.state(), GraphState::Transition);

    // Halfway through the fade the pose is halfway home.
    graph.update(0.25, &mut rig);
    graph.update(0.25, &mut rig);
    assert_eq!(graph.state(), GraphState::Transition);
    assert!((rig.local_transform(0).translation.y - 0.5).abs() < 1e-3);

    graph.update(0.25, &mut rig);
    graph.update(0.25, &mut rig);
    assert_eq!(graph.state(), GraphState::Idle);
    assert!(!graph.generator().has_animation());
    assert!(!graph.is_animating());
}

/// it should blend straight between clips when a new animation replaces a
/// playing one
#[test]
fn generator_to_generator_crossfade() {
    let mut rig = rig();
    let mut graph = graph_for(&rig);

    graph.transition_to_animation(Some(constant_clip(1.0)), 0.0);
    graph.update(0.1, &mut rig);

    graph.transition_to_animation(Some(constant_clip(3.0)), 0.5);
    assert_eq!(graph.state(), GraphState::Transition);
    // Midway: eased halfway between the frozen outgoing pose and the new clip.
    graph.update(0.25, &mut rig);
    assert!((rig.local_transform(0).translation.y - 2.0).abs() < 1e-3);

    graph.update(0.3, &mut rig);
    assert_eq!(graph.state(), GraphState::Generator);
    assert!((rig.local_transform(0).translation.y - 3.0).abs() < 1e-4);
}

/// it should ignore a stop request when nothing is playing
#[test]
fn stop_while_idle_is_a_no_op() {
    let mut rig = rig();
    let mut graph = graph_for(&rig);
    graph.transition_to_animation(None, 1.0);
    assert_eq!(graph.state(), GraphState::Idle);
}

/// it should leave nodes without animation data untouched
#[test]
fn absent_nodes_are_not_written() {
    let mut rig = rig();
    let marker = Transform::from_translation(Vec3::new(7.0, 7.0, 7.0));
    rig.set_local_transform(1, marker);
    let mut graph = graph_for(&rig);

    // Clip only covers node 0; node 1's timeline is empty.
    graph.transition_to_animation(Some(constant_clip(1.0)), 0.0);
    graph.update(0.1, &mut rig);
    assert_eq!(rig.local_transform(1), marker);
}

/// it should capture while recording and return to idle on take
#[test]
fn recording_captures_and_detaches() {
    let mut rig = rig();
    rig.set_local_transform(0, tf(4.0));
    let mut graph = graph_for(&rig);

    graph.start_recording(&rig);
    assert_eq!(graph.state(), GraphState::Recording);
    assert!(graph.is_animating());
    for _ in 0..4 {
        graph.update(1.0 / 60.0, &mut rig);
    }

    let captured = graph.take_recording().expect("capture present");
    assert_eq!(graph.state(), GraphState::Idle);
    assert!(captured.timeline(0).unwrap().len() >= 2);
    assert!(
        (captured.timeline(0).unwrap().keys()[0].value.translation.y - 4.0).abs() < 1e-5
    );
}

/// it should bake round(duration / rate) samples and trim one step from the
/// baked duration
#[test]
fn bake_sample_count_and_duration() {
    let mut rig = rig();
    let config = Config {
        bake_sample_rate: 0.1,
        ..Config::default()
    };
    let mut graph = AnimationGraph::new(rig.node_names().to_vec(), config);
    graph.rebind(&rig);

    {
        let session = graph.open_session(FrameAnimation::new(20, 0.1, 2));
        session.begin_history_action("pin");
        session.set_key(0, 0, tf(2.0));
        session.end_history_action();
    }

    let mut baked = graph.bake_session(&mut rig).expect("session open");
    assert!((baked.duration() - 1.9).abs() < 1e-4);
    assert_eq!(baked.timeline(0).unwrap().len(), 20);
    // The single authored key pins the whole clip.
    let y = baked.timeline_mut(0).unwrap().sample(1.3).unwrap().translation.y;
    assert!((y - 2.0).abs() < 1e-4);
}
