//! Rigid transform value type and pose buffers.
//!
//! A pose is a per-node-slot vector of `Option<Transform>`. `None` means "no
//! value for this node": empty timelines sample to it, transition blending
//! short-circuits past it, and the IK manager treats it as "no override".
//! `Transform::IDENTITY` is an ordinary, legitimate value and blends normally.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::interp::shortest_slerp;

/// Unit-quaternion rotation plus translation. No scale; the runtime animates
/// rigid node transforms only.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub rotation: Quat,
    pub translation: Vec3,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        rotation: Quat::IDENTITY,
        translation: Vec3::ZERO,
    };

    pub fn new(rotation: Quat, translation: Vec3) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    pub fn from_rotation(rotation: Quat) -> Self {
        Self::new(rotation, Vec3::ZERO)
    }

    pub fn from_translation(translation: Vec3) -> Self {
        Self::new(Quat::IDENTITY, translation)
    }

    /// Build from wire parts: rotation as `[w, x, y, z]`, translation `[x, y, z]`.
    pub fn from_wire(rotation: [f32; 4], translation: [f32; 3]) -> Self {
        Self {
            rotation: Quat::from_xyzw(rotation[1], rotation[2], rotation[3], rotation[0]),
            translation: Vec3::from_array(translation),
        }
    }

    /// Wire parts: (`[w, x, y, z]`, `[x, y, z]`).
    pub fn to_wire(&self) -> ([f32; 4], [f32; 3]) {
        (
            [
                self.rotation.w,
                self.rotation.x,
                self.rotation.y,
                self.rotation.z,
            ],
            self.translation.to_array(),
        )
    }

    /// Compose: apply `child` in this transform's space (`self` is the parent).
    pub fn mul_transform(&self, child: &Transform) -> Transform {
        Transform {
            rotation: self.rotation * child.rotation,
            translation: self.rotation * child.translation + self.translation,
        }
    }

    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        self.rotation * p + self.translation
    }

    pub fn inverse(&self) -> Transform {
        let inv_rot = self.rotation.inverse();
        Transform {
            rotation: inv_rot,
            translation: inv_rot * -self.translation,
        }
    }

    /// Shortest-path slerp on rotation, component lerp on translation.
    pub fn lerp(&self, other: &Transform, t: f32) -> Transform {
        Transform {
            rotation: shortest_slerp(self.rotation, other.rotation, t),
            translation: self.translation.lerp(other.translation, t),
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Per-node-slot pose buffer, parallel to the skeleton's node-name list.
pub type Pose = Vec<Option<Transform>>;

/// Reset every slot of a pose buffer to "no value", resizing to `len`.
pub fn clear_pose(pose: &mut Pose, len: usize) {
    pose.clear();
    pose.resize(len, None);
}
