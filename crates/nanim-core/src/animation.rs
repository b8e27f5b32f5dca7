//! Continuous animation: a duration plus one timeline per skeleton node slot.

use nanim_format::{RawAnimation, RawKeyframe, RawTimeline};

use crate::timeline::{Keyframe, Timeline};
use crate::transform::{Pose, Transform};

/// One timeline per node slot, parallel to the skeleton's node-name list.
/// Nodes the source file did not cover have empty timelines and sample to
/// `None`.
#[derive(Clone, Debug)]
pub struct Animation {
    duration: f32,
    timelines: Vec<Timeline>,
}

impl Animation {
    /// `duration` is in seconds and must be positive.
    pub fn new(duration: f32, node_count: usize) -> Self {
        debug_assert!(duration > 0.0);
        Self {
            duration,
            timelines: vec![Timeline::new(); node_count],
        }
    }

    /// Resolve a raw (file) animation against a node-name list. Timelines for
    /// names absent from the list are dropped: node sets legitimately vary
    /// per skeleton variant, so this is not an error.
    pub fn from_raw(raw: &RawAnimation, node_names: &[String]) -> Self {
        let mut anim = Self::new(raw.duration.max(f32::EPSILON), node_names.len());
        for (name, raw_tl) in &raw.timelines {
            let Some(slot) = node_names.iter().position(|n| n == name) else {
                continue;
            };
            let keys = raw_tl
                .keys
                .iter()
                .map(|k| Keyframe {
                    time: k.time,
                    value: Transform::from_wire(k.rotation, k.translation),
                })
                .collect();
            anim.timelines[slot] = Timeline::from_keys(keys);
        }
        anim
    }

    /// Serialize back to the wire shape. Empty timelines are omitted.
    pub fn to_raw(&self, node_names: &[String]) -> RawAnimation {
        let mut timelines = Vec::new();
        for (slot, tl) in self.timelines.iter().enumerate() {
            if tl.is_empty() {
                continue;
            }
            let keys = tl
                .keys()
                .iter()
                .map(|k| {
                    let (rotation, translation) = k.value.to_wire();
                    RawKeyframe {
                        time: k.time,
                        translation,
                        rotation,
                    }
                })
                .collect();
            timelines.push((node_names[slot].clone(), RawTimeline { keys }));
        }
        RawAnimation {
            duration: self.duration,
            timelines,
            metadata: Vec::new(),
        }
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    pub fn set_duration(&mut self, duration: f32) {
        debug_assert!(duration > 0.0);
        self.duration = duration;
    }

    pub fn node_count(&self) -> usize {
        self.timelines.len()
    }

    pub fn timeline(&self, node: usize) -> Option<&Timeline> {
        self.timelines.get(node)
    }

    pub fn timeline_mut(&mut self, node: usize) -> Option<&mut Timeline> {
        self.timelines.get_mut(node)
    }

    /// Swap in a single node's timeline (selective re-push during editing).
    pub fn set_timeline(&mut self, node: usize, timeline: Timeline) {
        if let Some(slot) = self.timelines.get_mut(node) {
            *slot = timeline;
        }
    }

    /// Drop every cached sampling cursor, as done when an animation is
    /// (re)assigned to a generator.
    pub fn reset_cursors(&mut self) {
        for tl in &mut self.timelines {
            tl.reset_cursor();
        }
    }

    /// Sample every node timeline at `t` into `pose` (resized to match).
    pub fn sample_into(&mut self, t: f32, pose: &mut Pose) {
        pose.clear();
        pose.reserve(self.timelines.len());
        for tl in &mut self.timelines {
            pose.push(tl.sample(t));
        }
    }
}
