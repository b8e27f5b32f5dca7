use glam::Vec3;
use nanim_core::{AdjustMode, EditSession, FrameAnimation, Transform};

fn tf(y: f32) -> Transform {
    Transform::from_translation(Vec3::new(0.0, y, 0.0))
}

fn session() -> EditSession {
    EditSession::new(FrameAnimation::new(10, 0.1, 2), 64)
}

/// it should restore edited values exactly across undo and redo
#[test]
fn undo_then_redo_restores_values() {
    let mut s = session();
    s.begin_history_action("first");
    s.set_key(0, 2, tf(1.0));
    s.end_history_action();
    s.begin_history_action("second");
    s.set_key(0, 2, tf(2.0));
    s.end_history_action();

    assert_eq!(s.frames().key_at(0, 2), Some(tf(2.0)));
    assert!(s.undo());
    assert_eq!(s.frames().key_at(0, 2), Some(tf(1.0)));
    assert!(s.redo());
    assert_eq!(s.frames().key_at(0, 2), Some(tf(2.0)));

    // Undoing the creating edit removes the key entirely.
    assert!(s.undo());
    assert!(s.undo());
    assert_eq!(s.frames().key_at(0, 2), None);
    assert!(!s.undo());
}

/// it should invalidate the redo history on a fresh forward edit
#[test]
fn fresh_edit_clears_redo() {
    let mut s = session();
    s.begin_history_action("edit");
    s.set_key(0, 1, tf(1.0));
    s.end_history_action();
    assert!(s.undo());
    assert!(s.can_redo());

    s.begin_history_action("other");
    s.set_key(1, 0, tf(5.0));
    s.end_history_action();
    assert!(!s.can_redo());
    assert!(!s.redo());
}

/// it should merge repeated edits of one slot so a single undo reverts the
/// whole logical action
#[test]
fn merged_deltas_undo_as_a_unit() {
    let mut s = session();
    s.begin_history_action("drag");
    s.set_key(0, 3, tf(0.1));
    s.set_key(0, 3, tf(0.2));
    s.set_key(0, 3, tf(0.3));
    s.end_history_action();

    assert_eq!(s.frames().key_at(0, 3), Some(tf(0.3)));
    assert!(s.undo());
    // The original pre-drag state (no key) comes back in one step.
    assert_eq!(s.frames().key_at(0, 3), None);
}

/// it should materialize a key at the composed pose when a drag starts on an
/// empty slot
#[test]
fn adjust_materializes_missing_key() {
    let mut s = session();
    // Constant pose: the spline preview evaluates to 0.5 everywhere.
    s.begin_history_action("setup");
    s.set_key(0, 0, tf(0.5));
    s.set_key(0, 8, tf(0.5));
    s.end_history_action();

    s.begin_incremental_adjust(0, 4, AdjustMode::Position);
    let made = s.frames().key_at(0, 4).expect("key materialized");
    assert!((made.translation.y - 0.5).abs() < 1e-3);
    s.end_incremental_adjust();

    // The materialization itself is undoable.
    assert!(s.undo());
    assert_eq!(s.frames().key_at(0, 4), None);
}

/// it should accumulate scaled position drags onto the current value
#[test]
fn position_drag_accumulates() {
    let mut s = session();
    s.begin_history_action("setup");
    s.set_key(0, 2, Transform::IDENTITY);
    s.end_history_action();

    s.begin_incremental_adjust(0, 2, AdjustMode::Position);
    s.incremental_adjust(1.0, 0.0, 0.0, false);
    s.incremental_adjust(1.0, 0.0, 0.0, false);
    s.end_incremental_adjust();

    let v = s.frames().key_at(0, 2).unwrap();
    assert!((v.translation.x - 0.4).abs() < 1e-5);

    // One undo reverts the entire drag.
    assert!(s.undo());
    assert_eq!(s.frames().key_at(0, 2), Some(Transform::IDENTITY));
}

/// it should apply rotation drags as per-axis angle-axis deltas
#[test]
fn rotation_drag_rotates_key() {
    let mut s = session();
    s.begin_history_action("setup");
    s.set_key(0, 1, Transform::IDENTITY);
    s.end_history_action();

    s.begin_incremental_adjust(0, 1, AdjustMode::Rotation);
    s.incremental_adjust(0.3, 0.0, 0.0, true);
    s.end_incremental_adjust();

    let got = s.frames().key_at(0, 1).unwrap().rotation;
    let want = glam::Quat::from_rotation_x(0.3);
    assert!(got.dot(want).abs() > 1.0 - 1e-5);
}

/// it should seek the preview and return the composed pose when scrubbing
#[test]
fn scrub_resamples_the_preview() {
    let mut s = session();
    s.begin_history_action("setup");
    s.set_key(0, 0, tf(0.0));
    s.set_key(0, 8, tf(0.8));
    s.end_history_action();

    // Authored keys come back exactly at their frame times.
    let pose = s.scrub(0.8);
    let at_key = pose[0].expect("keyed node has a value");
    assert!((at_key.translation.y - 0.8).abs() < 1e-3);
    assert!(pose[1].is_none(), "unkeyed node stays absent");

    let pose = s.scrub(0.0);
    assert!(pose[0].unwrap().translation.y.abs() < 1e-3);
}

/// it should drop the oldest entries past the history cap
#[test]
fn history_is_bounded() {
    let mut s = EditSession::new(FrameAnimation::new(10, 0.1, 1), 2);
    for i in 0..5 {
        s.begin_history_action("edit");
        s.set_key(0, i, tf(i as f32));
        s.end_history_action();
    }
    assert!(s.undo());
    assert!(s.undo());
    assert!(!s.undo());
    // Only the last two edits were revertable.
    assert_eq!(s.frames().key_at(0, 2), Some(tf(2.0)));
    assert_eq!(s.frames().key_at(0, 3), None);
    assert_eq!(s.frames().key_at(0, 4), None);
}
