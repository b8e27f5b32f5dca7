//! Time-keyed keyframe timeline with a cached bracketing cursor.
//!
//! Keys are kept strictly ordered by time with at most one key per time
//! value. Sampling remembers the segment that bracketed the previous query
//! and only falls back to a binary search when that bracket no longer holds,
//! so monotonic-ish scrubbing is O(1) amortized and random seeks are O(log n).

use crate::transform::Transform;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Keyframe {
    pub time: f32,
    pub value: Transform,
}

/// Last-sampled segment: `keys[lo].time <= t < keys[hi].time`.
/// Not live indices into anything mutable; any key mutation resets it.
#[derive(Clone, Copy, Debug, Default)]
struct SampleCursor {
    lo: usize,
    hi: usize,
    seeded: bool,
}

impl SampleCursor {
    fn brackets(&self, keys: &[Keyframe], t: f32) -> bool {
        self.seeded
            && self.hi < keys.len()
            && keys[self.lo].time <= t
            && t < keys[self.hi].time
    }
}

#[derive(Clone, Debug, Default)]
pub struct Timeline {
    keys: Vec<Keyframe>,
    cursor: SampleCursor,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from keys that may be unsorted; duplicate times keep the first.
    pub fn from_keys(mut keys: Vec<Keyframe>) -> Self {
        keys.sort_by(|a, b| a.time.total_cmp(&b.time));
        keys.dedup_by(|later, earlier| later.time == earlier.time);
        Self {
            keys,
            cursor: SampleCursor::default(),
        }
    }

    pub fn keys(&self) -> &[Keyframe] {
        &self.keys
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Drop the cached bracket, forcing a re-seek on the next sample. Called
    /// on (re)assignment to a generator and after any mutation.
    pub fn reset_cursor(&mut self) {
        self.cursor = SampleCursor::default();
    }

    /// Insert a key, replacing any existing key at exactly `time`.
    /// Returns the replaced value, if any.
    pub fn insert(&mut self, time: f32, value: Transform) -> Option<Transform> {
        self.reset_cursor();
        match self.keys.binary_search_by(|k| k.time.total_cmp(&time)) {
            Ok(i) => Some(std::mem::replace(&mut self.keys[i], Keyframe { time, value }).value),
            Err(i) => {
                self.keys.insert(i, Keyframe { time, value });
                None
            }
        }
    }

    pub fn remove(&mut self, time: f32) -> Option<Transform> {
        self.reset_cursor();
        match self.keys.binary_search_by(|k| k.time.total_cmp(&time)) {
            Ok(i) => Some(self.keys.remove(i).value),
            Err(_) => None,
        }
    }

    pub fn value_at(&self, time: f32) -> Option<Transform> {
        self.keys
            .binary_search_by(|k| k.time.total_cmp(&time))
            .ok()
            .map(|i| self.keys[i].value)
    }

    /// Sample at `t`. `None` when the timeline has no keys; before the first
    /// key (or with a single key) the nearest key's value is returned exactly;
    /// between keys, shortest-path slerp plus translation lerp. A query equal
    /// to a key time returns that key's stored value with no interpolation.
    pub fn sample(&mut self, t: f32) -> Option<Transform> {
        let n = self.keys.len();
        if n == 0 {
            return None;
        }
        if n == 1 || t <= self.keys[0].time {
            return Some(self.keys[0].value);
        }
        if t >= self.keys[n - 1].time {
            return Some(self.keys[n - 1].value);
        }

        if !self.cursor.brackets(&self.keys, t) {
            // Lower bound: last key with time <= t.
            let lo = self
                .keys
                .partition_point(|k| k.time <= t)
                .saturating_sub(1);
            self.cursor = SampleCursor {
                lo,
                hi: lo + 1,
                seeded: true,
            };
        }

        let left = &self.keys[self.cursor.lo];
        let right = &self.keys[self.cursor.hi];
        if t == left.time {
            return Some(left.value);
        }
        let u = (t - left.time) / (right.time - left.time);
        Some(left.value.lerp(&right.value, u))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Quat, Vec3};

    fn key(time: f32, y: f32) -> Keyframe {
        Keyframe {
            time,
            value: Transform::from_translation(Vec3::new(0.0, y, 0.0)),
        }
    }

    #[test]
    fn insert_replaces_equal_time() {
        let mut tl = Timeline::new();
        tl.insert(1.0, Transform::from_translation(Vec3::X));
        let prev = tl.insert(1.0, Transform::from_translation(Vec3::Y));
        assert_eq!(tl.len(), 1);
        assert_eq!(prev.unwrap().translation, Vec3::X);
    }

    #[test]
    fn cursor_survives_monotonic_scrub() {
        let mut tl = Timeline::from_keys((0..10).map(|i| key(i as f32, i as f32)).collect());
        let mut t = 0.0;
        while t < 9.0 {
            let v = tl.sample(t).unwrap();
            assert!((v.translation.y - t).abs() < 1e-4);
            t += 0.05;
        }
        // Random seek still correct after the cache goes stale.
        let v = tl.sample(2.5).unwrap();
        assert!((v.translation.y - 2.5).abs() < 1e-4);
    }

    #[test]
    fn exact_key_hit_is_bit_exact() {
        let rot = Quat::from_rotation_z(0.7);
        let mut tl = Timeline::new();
        tl.insert(0.0, Transform::IDENTITY);
        tl.insert(1.0, Transform::from_rotation(rot));
        assert_eq!(tl.sample(1.0).unwrap().rotation, rot);
        assert_eq!(tl.sample(0.0).unwrap(), Transform::IDENTITY);
    }
}
