//! Fixed-interval capture of live node transforms into a growing animation.

use crate::animation::Animation;
use crate::skeleton::SkeletonRig;

/// Samples every node's local transform at a fixed wall-clock interval
/// (default ~30 Hz). A sub-interval accumulator decouples the capture rate
/// from the per-frame update rate: nothing is recorded until a full interval
/// has elapsed, and the accumulator resets after each captured sample.
#[derive(Debug)]
pub struct Recorder {
    anim: Option<Animation>,
    sample_rate: f32,
    accum: f32,
    elapsed: f32,
}

impl Recorder {
    pub fn new(sample_rate: f32) -> Self {
        debug_assert!(sample_rate > 0.0);
        Self {
            anim: None,
            sample_rate,
            accum: 0.0,
            elapsed: 0.0,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.anim.is_some()
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Begin a fresh capture, recording the starting pose as frame zero.
    pub fn start(&mut self, rig: &dyn SkeletonRig) {
        let mut anim = Animation::new(self.sample_rate, rig.node_count());
        capture_pose(&mut anim, 0.0, rig);
        self.anim = Some(anim);
        self.accum = 0.0;
        self.elapsed = 0.0;
    }

    /// Advance the capture clock and record a sample when a full interval has
    /// elapsed. No-op when not recording.
    pub fn update(&mut self, dt: f32, rig: &dyn SkeletonRig) {
        let Some(anim) = &mut self.anim else {
            return;
        };
        self.accum += dt;
        self.elapsed += dt;
        if self.accum >= self.sample_rate {
            self.accum = 0.0;
            capture_pose(anim, self.elapsed, rig);
            anim.set_duration(self.elapsed.max(self.sample_rate));
        }
    }

    /// Detach the captured animation; the recorder is immediately ready for a
    /// new capture (or a file save handed off to a worker thread).
    pub fn take(&mut self) -> Option<Animation> {
        self.accum = 0.0;
        self.elapsed = 0.0;
        self.anim.take()
    }
}

fn capture_pose(anim: &mut Animation, t: f32, rig: &dyn SkeletonRig) {
    for node in 0..rig.node_count() {
        if let Some(tl) = anim.timeline_mut(node) {
            tl.insert(t, rig.local_transform(node));
        }
    }
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new(1.0 / 30.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skeleton::LocalRig;
    use crate::transform::Transform;
    use glam::Vec3;

    #[test]
    fn records_only_on_full_intervals() {
        let mut rig = LocalRig::new();
        rig.add_node("Root", None, Transform::IDENTITY);
        let mut recorder = Recorder::new(0.1);
        recorder.start(&rig);

        // Nine small ticks: not enough for a second sample yet.
        for _ in 0..9 {
            recorder.update(0.01, &rig);
        }
        assert_eq!(recorder.anim.as_ref().unwrap().timeline(0).unwrap().len(), 1);

        rig.set_local_transform(0, Transform::from_translation(Vec3::Y));
        recorder.update(0.02, &rig);
        let anim = recorder.take().unwrap();
        assert_eq!(anim.timeline(0).unwrap().len(), 2);
        assert!(!recorder.is_recording());
    }
}
