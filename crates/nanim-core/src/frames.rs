//! Frame-quantized animation: the editable, integer-frame-indexed
//! representation, with conversions to and from the continuous form.
//!
//! `to_runtime` is the exact conversion (frame * sample_rate). The
//! spline-sampled variant fits clamped cubic splines per translation axis and
//! a Catmull-Rom-style quaternion Hermite for rotation, then resamples
//! densely at the sample rate, so sparse authored keys play back smoothly.

use glam::Quat;

use crate::animation::Animation;
use crate::interp::{quat_hermite, rotation_velocities, CubicSpline};
use crate::timeline::{Keyframe, Timeline};
use crate::transform::Transform;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameKey {
    pub frame: u32,
    pub value: Transform,
}

/// Ordered mapping frame -> keyframe, at most one key per frame.
#[derive(Clone, Debug, Default)]
pub struct FrameTimeline {
    keys: Vec<FrameKey>,
}

impl FrameTimeline {
    pub fn keys(&self) -> &[FrameKey] {
        &self.keys
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn value_at(&self, frame: u32) -> Option<Transform> {
        self.keys
            .binary_search_by_key(&frame, |k| k.frame)
            .ok()
            .map(|i| self.keys[i].value)
    }

    /// Insert or replace; returns the replaced value.
    pub fn set(&mut self, frame: u32, value: Transform) -> Option<Transform> {
        match self.keys.binary_search_by_key(&frame, |k| k.frame) {
            Ok(i) => Some(std::mem::replace(&mut self.keys[i], FrameKey { frame, value }).value),
            Err(i) => {
                self.keys.insert(i, FrameKey { frame, value });
                None
            }
        }
    }

    pub fn remove(&mut self, frame: u32) -> Option<Transform> {
        match self.keys.binary_search_by_key(&frame, |k| k.frame) {
            Ok(i) => Some(self.keys.remove(i).value),
            Err(_) => None,
        }
    }
}

/// Frame count (>= 2), seconds per frame, one frame timeline per node slot.
#[derive(Clone, Debug)]
pub struct FrameAnimation {
    frame_count: u32,
    sample_rate: f32,
    timelines: Vec<FrameTimeline>,
}

impl FrameAnimation {
    pub fn new(frame_count: u32, sample_rate: f32, node_count: usize) -> Self {
        debug_assert!(frame_count >= 2 && sample_rate > 0.0);
        Self {
            frame_count: frame_count.max(2),
            sample_rate,
            timelines: vec![FrameTimeline::default(); node_count],
        }
    }

    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn node_count(&self) -> usize {
        self.timelines.len()
    }

    pub fn runtime_duration(&self) -> f32 {
        self.frame_count as f32 * self.sample_rate
    }

    pub fn timeline(&self, node: usize) -> Option<&FrameTimeline> {
        self.timelines.get(node)
    }

    pub fn set_key(&mut self, node: usize, frame: u32, value: Transform) -> Option<Transform> {
        let tl = self.timelines.get_mut(node)?;
        self.frame_count = self.frame_count.max(frame + 1);
        tl.set(frame, value)
    }

    pub fn remove_key(&mut self, node: usize, frame: u32) -> Option<Transform> {
        self.timelines.get_mut(node)?.remove(frame)
    }

    pub fn key_at(&self, node: usize, frame: u32) -> Option<Transform> {
        self.timelines.get(node)?.value_at(frame)
    }

    /// Exact conversion: each frame key becomes a continuous key at
    /// `frame * sample_rate`.
    pub fn to_runtime(&self) -> Animation {
        let mut anim = Animation::new(self.runtime_duration(), self.timelines.len());
        for node in 0..self.timelines.len() {
            anim.set_timeline(node, self.timeline_to_runtime(node));
        }
        anim
    }

    /// One node's exact continuous timeline. Cheap enough to call per edit,
    /// avoiding O(all-nodes) work while dragging.
    pub fn timeline_to_runtime(&self, node: usize) -> Timeline {
        let Some(tl) = self.timelines.get(node) else {
            return Timeline::new();
        };
        Timeline::from_keys(
            tl.keys
                .iter()
                .map(|k| Keyframe {
                    time: k.frame as f32 * self.sample_rate,
                    value: k.value,
                })
                .collect(),
        )
    }

    /// Smooth conversion for preview and baking: spline-fit each node with
    /// two or more keys and resample densely at the sample rate. Nodes with
    /// zero or one key pass through unsplined.
    pub fn to_runtime_spline_sampled(&self) -> Animation {
        let mut anim = Animation::new(self.runtime_duration(), self.timelines.len());
        for node in 0..self.timelines.len() {
            anim.set_timeline(node, self.spline_timeline(node));
        }
        anim
    }

    fn spline_timeline(&self, node: usize) -> Timeline {
        let Some(tl) = self.timelines.get(node) else {
            return Timeline::new();
        };
        if tl.len() < 2 {
            return self.timeline_to_runtime(node);
        }

        let times: Vec<f32> = tl
            .keys
            .iter()
            .map(|k| k.frame as f32 * self.sample_rate)
            .collect();

        // Per-axis clamped splines for translation.
        let axis_spline = |axis: usize| {
            let ys = tl
                .keys
                .iter()
                .map(|k| k.value.translation[axis])
                .collect::<Vec<_>>();
            CubicSpline::fit_clamped(times.clone(), ys)
        };
        let sx = axis_spline(0);
        let sy = axis_spline(1);
        let sz = axis_spline(2);

        // Hemisphere-align rotations so neighboring relative rotations are
        // short-arc, then take Catmull-Rom angular velocities at each key.
        let mut rotations: Vec<Quat> = tl.keys.iter().map(|k| k.value.rotation).collect();
        for i in 1..rotations.len() {
            if rotations[i - 1].dot(rotations[i]) < 0.0 {
                rotations[i] = -rotations[i];
            }
        }
        let velocities = rotation_velocities(&times, &rotations);

        let t0 = times[0];
        let t_end = *times.last().unwrap_or(&t0);
        let steps = ((t_end - t0) / self.sample_rate).ceil() as u32;

        let mut keys = Vec::with_capacity(steps as usize + 1);
        for step in 0..steps {
            let t = t0 + step as f32 * self.sample_rate;
            if t >= t_end {
                break;
            }
            let seg = times.partition_point(|&k| k <= t).saturating_sub(1);
            let seg = seg.min(times.len() - 2);
            let dt = (times[seg + 1] - times[seg]).max(f32::EPSILON);
            let u = ((t - times[seg]) / dt).clamp(0.0, 1.0);
            let rotation = quat_hermite(
                rotations[seg],
                rotations[seg + 1],
                velocities[seg] * dt,
                velocities[seg + 1] * dt,
                u,
            );
            keys.push(Keyframe {
                time: t,
                value: Transform {
                    rotation,
                    translation: glam::Vec3::new(sx.eval(t), sy.eval(t), sz.eval(t)),
                },
            });
        }
        // Final authored key passes through exactly.
        keys.push(Keyframe {
            time: t_end,
            value: tl.keys[tl.keys.len() - 1].value,
        });

        Timeline::from_keys(keys)
    }

    /// Quantize a continuous animation. Frame index is `round(time /
    /// sample_rate)`; when two source keys round to the same frame, the first
    /// survives and the returned flag reports the data loss. Loss is
    /// non-fatal: the converted animation is still usable.
    pub fn from_runtime(anim: &Animation, sample_rate: f32) -> (Self, bool) {
        debug_assert!(sample_rate > 0.0);
        let frame_count = ((anim.duration() / sample_rate).round() as u32).max(2);
        let mut frames = Self::new(frame_count, sample_rate, anim.node_count());
        let mut lossy = false;
        for node in 0..anim.node_count() {
            let Some(tl) = anim.timeline(node) else {
                continue;
            };
            for key in tl.keys() {
                let frame = (key.time / sample_rate).round().max(0.0) as u32;
                let slot = &mut frames.timelines[node];
                if slot.value_at(frame).is_some() {
                    lossy = true;
                } else {
                    slot.set(frame, key.value);
                    frames.frame_count = frames.frame_count.max(frame + 1);
                }
            }
        }
        (frames, lossy)
    }
}
