//! Authoring-time editing session: undo/redo history, incremental
//! gizmo-driven adjustment, scrubbing, and baking, layered on top of the
//! frame-quantized representation.

use std::collections::VecDeque;

use glam::{Quat, Vec3};
use log::debug;

use crate::animation::Animation;
use crate::frames::FrameAnimation;
use crate::generator::Generator;
use crate::ik::IkSettings;
use crate::ik_manager::ChainManager;
use crate::skeleton::SkeletonRig;
use crate::transform::{Pose, Transform};

/// Scale applied to raw drag input in position mode, units per unit input.
const POSITION_DRAG_SCALE: f32 = 0.2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdjustMode {
    Rotation,
    Position,
}

/// One edited (node, frame) slot. `None` before-value means the edit created
/// the key; `None` after-value means the edit deleted it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KeyDelta {
    pub node: usize,
    pub frame: u32,
    pub before: Option<Transform>,
    pub after: Option<Transform>,
}

/// A named logical edit: every delta it produced, replayed as a unit.
#[derive(Clone, Debug)]
pub struct HistoryEntry {
    pub name: String,
    pub deltas: Vec<KeyDelta>,
}

#[derive(Clone, Copy, Debug)]
struct AdjustState {
    node: usize,
    frame: u32,
    mode: AdjustMode,
}

/// Editing controller over a frame-quantized animation, previewed through an
/// owned (paused, scrubbed) generator.
#[derive(Debug)]
pub struct EditSession {
    frames: FrameAnimation,
    preview: Generator,
    undo: VecDeque<HistoryEntry>,
    redo: VecDeque<HistoryEntry>,
    open: Option<HistoryEntry>,
    adjust: Option<AdjustState>,
    max_history: usize,
}

impl EditSession {
    pub fn new(frames: FrameAnimation, max_history: usize) -> Self {
        let mut preview = Generator::new(frames.node_count());
        preview.set_animation(Some(frames.to_runtime_spline_sampled()));
        preview.set_paused(true);
        Self {
            frames,
            preview,
            undo: VecDeque::new(),
            redo: VecDeque::new(),
            open: None,
            adjust: None,
            max_history: max_history.max(1),
        }
    }

    pub fn frames(&self) -> &FrameAnimation {
        &self.frames
    }

    pub fn preview(&mut self) -> &mut Generator {
        &mut self.preview
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty() || self.open.as_ref().is_some_and(|e| !e.deltas.is_empty())
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Open a named history entry; a still-open prior entry is auto-closed.
    pub fn begin_history_action(&mut self, name: &str) {
        self.close_open_entry();
        self.open = Some(HistoryEntry {
            name: name.to_string(),
            deltas: Vec::new(),
        });
    }

    /// Close the current entry and push a full spline-sampled preview, since
    /// per-node exact pushes are only valid mid-edit.
    pub fn end_history_action(&mut self) {
        self.close_open_entry();
        self.refresh_preview();
    }

    fn close_open_entry(&mut self) {
        if let Some(entry) = self.open.take() {
            if !entry.deltas.is_empty() {
                debug!("history: '{}' with {} delta(s)", entry.name, entry.deltas.len());
                self.undo.push_back(entry);
                while self.undo.len() > self.max_history {
                    self.undo.pop_front();
                }
            }
        }
    }

    /// Record an edit's delta, merging repeated edits of the same (node,
    /// frame) within one entry so the original before-value survives. Any
    /// forward edit invalidates the redo history.
    fn record_edit(
        &mut self,
        node: usize,
        frame: u32,
        before: Option<Transform>,
        after: Option<Transform>,
    ) {
        self.redo.clear();
        let entry = self.open.get_or_insert_with(|| HistoryEntry {
            name: "edit".to_string(),
            deltas: Vec::new(),
        });
        if let Some(delta) = entry
            .deltas
            .iter_mut()
            .find(|d| d.node == node && d.frame == frame)
        {
            delta.after = after;
        } else {
            entry.deltas.push(KeyDelta {
                node,
                frame,
                before,
                after,
            });
        }
    }

    /// Set a keyframe through the history, with a cheap exact (unsplined)
    /// preview push for this node.
    pub fn set_key(&mut self, node: usize, frame: u32, value: Transform) {
        let before = self.frames.key_at(node, frame);
        self.frames.set_key(node, frame, value);
        self.record_edit(node, frame, before, Some(value));
        self.push_node_preview(node);
    }

    pub fn remove_key(&mut self, node: usize, frame: u32) {
        let Some(before) = self.frames.remove_key(node, frame) else {
            return;
        };
        self.record_edit(node, frame, Some(before), None);
        self.push_node_preview(node);
    }

    /// Replay the most recent entry backwards. Redo stays intact: only
    /// forward edits invalidate it.
    pub fn undo(&mut self) -> bool {
        self.close_open_entry();
        let Some(entry) = self.undo.pop_back() else {
            return false;
        };
        for delta in entry.deltas.iter().rev() {
            self.apply_value(delta.node, delta.frame, delta.before);
        }
        self.redo.push_back(entry);
        self.refresh_preview();
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(entry) = self.redo.pop_back() else {
            return false;
        };
        for delta in &entry.deltas {
            self.apply_value(delta.node, delta.frame, delta.after);
        }
        self.undo.push_back(entry);
        self.refresh_preview();
        true
    }

    fn apply_value(&mut self, node: usize, frame: u32, value: Option<Transform>) {
        match value {
            Some(v) => {
                self.frames.set_key(node, frame, v);
            }
            None => {
                self.frames.remove_key(node, frame);
            }
        }
    }

    /// Start a drag on one (node, frame). Materializes a keyframe at the
    /// currently composed pose when none exists yet.
    pub fn begin_incremental_adjust(&mut self, node: usize, frame: u32, mode: AdjustMode) {
        self.begin_history_action("incremental adjust");
        if self.frames.key_at(node, frame).is_none() {
            let t = frame as f32 * self.frames.sample_rate();
            let saved_time = self.preview.time();
            self.preview.seek(t);
            let pose_value = self
                .preview
                .resample()
                .get(node)
                .copied()
                .flatten()
                .unwrap_or(Transform::IDENTITY);
            self.preview.seek(saved_time);
            self.preview.resample();
            self.frames.set_key(node, frame, pose_value);
            self.record_edit(node, frame, None, Some(pose_value));
        }
        self.adjust = Some(AdjustState { node, frame, mode });
    }

    /// Compose one drag step onto the *current* stored value (not the value
    /// at drag start). Rotation mode applies per-axis angle-axis rotations in
    /// x, y, z order; position mode applies a scaled translation offset.
    /// `local` selects the node's local frame over the world frame.
    pub fn incremental_adjust(&mut self, dx: f32, dy: f32, dz: f32, local: bool) {
        let Some(adjust) = self.adjust else {
            return;
        };
        let Some(current) = self.frames.key_at(adjust.node, adjust.frame) else {
            return;
        };
        let next = match adjust.mode {
            AdjustMode::Rotation => {
                let delta =
                    Quat::from_rotation_z(dz) * Quat::from_rotation_y(dy) * Quat::from_rotation_x(dx);
                let rotation = if local {
                    current.rotation * delta
                } else {
                    delta * current.rotation
                };
                Transform::new(rotation.normalize(), current.translation)
            }
            AdjustMode::Position => {
                let offset = Vec3::new(dx, dy, dz) * POSITION_DRAG_SCALE;
                let offset = if local {
                    current.rotation * offset
                } else {
                    offset
                };
                Transform::new(current.rotation, current.translation + offset)
            }
        };
        self.frames.set_key(adjust.node, adjust.frame, next);
        self.record_edit(adjust.node, adjust.frame, Some(current), Some(next));
        // Mid-drag: cheap exact push of just this node.
        self.push_node_preview(adjust.node);
    }

    /// Finish the drag: close the history entry and force a full
    /// spline-sampled re-push.
    pub fn end_incremental_adjust(&mut self) {
        self.adjust = None;
        self.end_history_action();
    }

    /// Seek the preview to `t` and resample the composed pose.
    pub fn scrub(&mut self, t: f32) -> &Pose {
        self.preview.seek(t);
        self.preview.resample()
    }

    fn push_node_preview(&mut self, node: usize) {
        let timeline = self.frames.timeline_to_runtime(node);
        self.preview.push_timeline(node, timeline);
    }

    fn refresh_preview(&mut self) {
        let time = self.preview.time();
        self.preview
            .set_animation(Some(self.frames.to_runtime_spline_sampled()));
        self.preview.seek(time);
    }

    /// Bake the composed result into a plain continuous animation: step the
    /// spline-sampled pose across the full duration at `bake_rate`, apply IK
    /// on top of each stepped pose, and capture the resulting live locals.
    /// All three stages complete for a sample before the next one starts; the
    /// IK output at a step depends on that same step's sampled pose.
    ///
    /// The baked duration is one step short of `steps * bake_rate`, which
    /// avoids a duplicated end/start frame on looping clips.
    pub fn bake(
        &mut self,
        rig: &mut dyn SkeletonRig,
        ik: &mut ChainManager,
        ik_settings: &IkSettings,
        bake_rate: f32,
    ) -> Animation {
        let duration = self.frames.runtime_duration();
        let steps = (duration / bake_rate).round().max(1.0) as u32;
        let baked_duration = ((steps as f32) * bake_rate - bake_rate).max(bake_rate);
        let mut baked = Animation::new(baked_duration, rig.node_count());

        let mut spline = self.frames.to_runtime_spline_sampled();
        let mut pose: Pose = Vec::new();
        for step in 0..steps {
            let t = step as f32 * bake_rate;
            spline.sample_into(t, &mut pose);
            for (node, value) in pose.iter().enumerate() {
                if let Some(v) = value {
                    if !ik.is_mapped(node) {
                        rig.set_local_transform(node, *v);
                    }
                }
            }
            ik.update(&pose, true, rig, ik_settings);
            for node in 0..rig.node_count() {
                if let Some(tl) = baked.timeline_mut(node) {
                    tl.insert(t, rig.local_transform(node));
                }
            }
        }
        baked
    }
}
