//! Looping playback of a continuous animation into a pose buffer.

use crate::animation::Animation;
use crate::timeline::Timeline;
use crate::transform::{clear_pose, Pose};

/// Owns the animation it plays. `has_animation` gates every other operation;
/// with no animation loaded, `update` leaves the pose empty (all `None`).
#[derive(Debug, Default)]
pub struct Generator {
    anim: Option<Animation>,
    time: f32,
    paused: bool,
    pose: Pose,
}

impl Generator {
    pub fn new(node_count: usize) -> Self {
        Self {
            anim: None,
            time: 0.0,
            paused: false,
            pose: vec![None; node_count],
        }
    }

    pub fn has_animation(&self) -> bool {
        self.anim.is_some()
    }

    pub fn animation(&self) -> Option<&Animation> {
        self.anim.as_ref()
    }

    /// Assign (or clear) the animation; resets local time and re-seeds every
    /// timeline's sampling cursor.
    pub fn set_animation(&mut self, anim: Option<Animation>) {
        self.time = 0.0;
        self.anim = anim.map(|mut a| {
            a.reset_cursors();
            a
        });
        let node_count = self.node_count();
        clear_pose(&mut self.pose, node_count);
    }

    /// Detach the current animation, leaving the generator empty.
    pub fn take_animation(&mut self) -> Option<Animation> {
        self.time = 0.0;
        let node_count = self.pose.len();
        clear_pose(&mut self.pose, node_count);
        self.anim.take()
    }

    fn node_count(&self) -> usize {
        self.anim
            .as_ref()
            .map(Animation::node_count)
            .unwrap_or(self.pose.len())
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    /// Seek to an absolute local time, wrapped into the clip.
    pub fn seek(&mut self, t: f32) {
        if let Some(anim) = &self.anim {
            self.time = t.rem_euclid(anim.duration());
        }
    }

    /// Replace one node's timeline without touching playback time. Used for
    /// cheap per-node re-pushes during interactive editing.
    pub fn push_timeline(&mut self, node: usize, timeline: Timeline) {
        if let Some(anim) = &mut self.anim {
            anim.set_timeline(node, timeline);
        }
    }

    /// Advance local time (wrapping modulo duration, multi-wrap safe for
    /// large `dt`) unless paused, then resample every node at the new time.
    pub fn update(&mut self, dt: f32) -> &Pose {
        let Some(anim) = &mut self.anim else {
            let node_count = self.pose.len();
            clear_pose(&mut self.pose, node_count);
            return &self.pose;
        };
        if !self.paused {
            self.time = (self.time + dt).rem_euclid(anim.duration());
        }
        anim.sample_into(self.time, &mut self.pose);
        &self.pose
    }

    /// Resample at the current time without advancing (scrub refresh).
    pub fn resample(&mut self) -> &Pose {
        if let Some(anim) = &mut self.anim {
            anim.sample_into(self.time, &mut self.pose);
        }
        &self.pose
    }

    pub fn pose(&self) -> &Pose {
        &self.pose
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::Transform;
    use glam::Vec3;

    fn ramp_animation() -> Animation {
        // y == t over [0, 2].
        let mut anim = Animation::new(2.0, 1);
        let tl = anim.timeline_mut(0).unwrap();
        tl.insert(0.0, Transform::from_translation(Vec3::ZERO));
        tl.insert(2.0, Transform::from_translation(Vec3::new(0.0, 2.0, 0.0)));
        anim
    }

    #[test]
    fn wraps_large_steps() {
        let mut generator = Generator::new(1);
        generator.set_animation(Some(ramp_animation()));
        generator.update(5.25); // 2.5 wraps
        assert!((generator.time() - 1.25).abs() < 1e-5);
        let y = generator.pose()[0].unwrap().translation.y;
        assert!((y - 1.25).abs() < 1e-4);
    }

    #[test]
    fn paused_holds_time() {
        let mut generator = Generator::new(1);
        generator.set_animation(Some(ramp_animation()));
        generator.update(0.5);
        generator.set_paused(true);
        generator.update(0.5);
        assert!((generator.time() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn take_animation_detaches_and_clears() {
        let mut generator = Generator::new(1);
        generator.set_animation(Some(ramp_animation()));
        generator.update(0.5);

        let anim = generator.take_animation().unwrap();
        assert!((anim.duration() - 2.0).abs() < 1e-6);
        assert!(!generator.has_animation());
        assert_eq!(generator.time(), 0.0);
        assert!(generator.pose().iter().all(Option::is_none));
        assert!(generator.take_animation().is_none());
    }

    #[test]
    fn no_animation_yields_empty_pose() {
        let mut generator = Generator::new(3);
        let pose = generator.update(0.1);
        assert_eq!(pose.len(), 3);
        assert!(pose.iter().all(Option::is_none));
    }
}
