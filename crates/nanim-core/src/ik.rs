//! Two-bone IK chain and its iterative positional solver.
//!
//! A chain names three nodes (root, mid, tip). The solve runs in the chain
//! root's parent space: the parent's world transform is computed once per
//! solve by walking the hierarchy, the three nodes are converted into that
//! space, and a bounded FABRIK iteration moves the tip toward the target.
//! Several outer passes re-derive the node inputs from the previous pass's
//! written-back locals, damping artifacts from the space round-trip. FABRIK
//! only guarantees position, so the tip's orientation is forced to the
//! requested target orientation after the final pass.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::skeleton::SkeletonRig;
use crate::transform::Transform;

/// Solver iteration bounds and tolerance.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct IkSettings {
    /// Outer passes; each re-derives node inputs from the prior pass.
    pub outer_passes: u32,
    /// FABRIK iterations per pass.
    pub max_iterations: u32,
    /// Tip-to-target distance considered converged, in rig units.
    pub tolerance: f32,
}

impl Default for IkSettings {
    fn default() -> Self {
        Self {
            outer_passes: 10,
            max_iterations: 50,
            tolerance: 1e-7,
        }
    }
}

/// Effector target. `ParentRelative` is expressed in the chain root's parent
/// space (the solve space); `World` targets are converted into it per solve.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ChainTarget {
    World(Transform),
    ParentRelative(Transform),
}

/// Pole-vector anchor: a node plus a local offset; the world-space hint point
/// is recomputed from them on every solve.
#[derive(Clone, Debug)]
pub struct PoleAnchor {
    pub node: String,
    pub offset: Vec3,
    resolved: Option<usize>,
}

impl PoleAnchor {
    pub fn new(node: &str, offset: Vec3) -> Self {
        Self {
            node: node.to_string(),
            offset,
            resolved: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct TwoBoneChain {
    names: [String; 3],
    /// Resolved node slots; `None` leaves the chain silently inert, since
    /// node availability varies by skeleton variant.
    nodes: Option<[usize; 3]>,
    pub target: Option<ChainTarget>,
    pub pole: Option<PoleAnchor>,
    pub enabled: bool,
}

impl TwoBoneChain {
    pub fn new(root: &str, mid: &str, tip: &str) -> Self {
        Self {
            names: [root.to_string(), mid.to_string(), tip.to_string()],
            nodes: None,
            target: None,
            pole: None,
            enabled: true,
        }
    }

    pub fn node_names(&self) -> &[String; 3] {
        &self.names
    }

    pub fn is_resolved(&self) -> bool {
        self.nodes.is_some()
    }

    /// Re-resolve node names against the live rig. Called whenever the
    /// skeleton's 3D representation is rebuilt.
    pub fn resolve(&mut self, rig: &dyn SkeletonRig) {
        let lookup = |name: &String| rig.node_index(name);
        self.nodes = match (
            lookup(&self.names[0]),
            lookup(&self.names[1]),
            lookup(&self.names[2]),
        ) {
            (Some(r), Some(m), Some(t)) => Some([r, m, t]),
            _ => None,
        };
        if let Some(pole) = &mut self.pole {
            pole.resolved = rig.node_index(&pole.node);
        }
    }

    /// Solve toward the current target, writing results back to the rig's
    /// local transforms. Inert when unresolved or targetless.
    pub fn solve(&self, rig: &mut dyn SkeletonRig, settings: &IkSettings) {
        let (Some([root, mid, tip]), Some(target)) = (self.nodes, self.target) else {
            return;
        };

        // Root-parent world transform, computed once per solve.
        let parent_world = match rig.parent(root) {
            Some(p) => rig.world_transform(p),
            None => Transform::IDENTITY,
        };
        let target_chain = match target {
            ChainTarget::World(t) => parent_world.inverse().mul_transform(&t),
            ChainTarget::ParentRelative(t) => t,
        };
        let pole_chain = self.pole.as_ref().and_then(|pole| {
            let anchor = pole.resolved?;
            let world = rig.world_transform(anchor).transform_point(pole.offset);
            Some(parent_world.inverse().transform_point(world))
        });

        for _ in 0..settings.outer_passes.max(1) {
            // Chain-space transforms re-derived from the current locals.
            let t_root = rig.local_transform(root);
            let t_mid = t_root.mul_transform(&rig.local_transform(mid));
            let t_tip = t_mid.mul_transform(&rig.local_transform(tip));

            let p0 = t_root.translation;
            let p1 = t_mid.translation;
            let p2 = t_tip.translation;
            let l1 = (p1 - p0).length();
            let l2 = (p2 - p1).length();
            if l1 <= f32::EPSILON || l2 <= f32::EPSILON {
                return;
            }

            let (mut q1, q2) = fabrik_pass(
                p0,
                p1,
                p2,
                target_chain.translation,
                l1,
                l2,
                settings.max_iterations,
                settings.tolerance,
            );
            if let Some(pole) = pole_chain {
                q1 = bend_toward_pole(p0, q1, q2, pole);
            }

            // Root: aim the old bone direction at the new one.
            let d0 = (p1 - p0).normalize();
            let d0_new = (q1 - p0).normalize_or_zero();
            if d0_new.length_squared() == 0.0 {
                return;
            }
            let delta0 = Quat::from_rotation_arc(d0, d0_new);
            let new_root = Transform::new(delta0 * t_root.rotation, t_root.translation);
            rig.set_local_transform(root, new_root);

            // Mid, after the root rotation has moved it.
            let t_mid_new = new_root.mul_transform(&rig.local_transform(mid));
            let tip_now = t_mid_new
                .mul_transform(&rig.local_transform(tip))
                .translation;
            let d1 = (tip_now - t_mid_new.translation).normalize_or_zero();
            let d1_new = (q2 - t_mid_new.translation).normalize_or_zero();
            if d1.length_squared() > 0.0 && d1_new.length_squared() > 0.0 {
                let delta1 = Quat::from_rotation_arc(d1, d1_new);
                let mid_chain_rot = delta1 * t_mid_new.rotation;
                let mid_local = Transform::new(
                    new_root.rotation.inverse() * mid_chain_rot,
                    rig.local_transform(mid).translation,
                );
                rig.set_local_transform(mid, mid_local);
            }
        }

        // Force the tip's orientation to exactly the requested target
        // orientation (FABRIK only places positions).
        let t_root = rig.local_transform(root);
        let mid_chain = t_root.mul_transform(&rig.local_transform(mid));
        let tip_local_rot = mid_chain.rotation.inverse() * target_chain.rotation;
        let tip_translation = rig.local_transform(tip).translation;
        rig.set_local_transform(tip, Transform::new(tip_local_rot, tip_translation));
    }
}

/// One bounded FABRIK iteration block on a 3-point chain with a fixed base.
/// Returns the new mid and tip positions.
#[allow(clippy::too_many_arguments)]
fn fabrik_pass(
    p0: Vec3,
    mut p1: Vec3,
    mut p2: Vec3,
    target: Vec3,
    l1: f32,
    l2: f32,
    max_iterations: u32,
    tolerance: f32,
) -> (Vec3, Vec3) {
    for _ in 0..max_iterations {
        if (p2 - target).length() <= tolerance {
            break;
        }
        // Backward reach: pin the tip to the target.
        p2 = target;
        p1 = p2 + (p1 - p2).normalize_or_zero() * l2;
        // Forward reach: pin the base.
        p1 = p0 + (p1 - p0).normalize_or_zero() * l1;
        p2 = p1 + (p2 - p1).normalize_or_zero() * l2;
    }
    (p1, p2)
}

/// Rotate the mid joint around the root-tip axis so the bend plane contains
/// the pole point.
fn bend_toward_pole(p0: Vec3, p1: Vec3, p2: Vec3, pole: Vec3) -> Vec3 {
    let axis = p2 - p0;
    let len = axis.length();
    if len <= 1e-6 {
        return p1;
    }
    let axis = axis / len;
    let flatten = |p: Vec3| {
        let v = p - p0;
        v - axis * v.dot(axis)
    };
    let mid_flat = flatten(p1);
    let pole_flat = flatten(pole);
    if mid_flat.length_squared() <= 1e-10 || pole_flat.length_squared() <= 1e-10 {
        return p1;
    }
    let swing = Quat::from_rotation_arc(mid_flat.normalize(), pole_flat.normalize());
    p0 + swing * (p1 - p0)
}

/// Closed set of chain topologies. Two-bone is the only kind today; the enum
/// keeps call sites total when more are added.
#[derive(Clone, Debug)]
pub enum ChainKind {
    TwoBone(TwoBoneChain),
}

impl ChainKind {
    pub fn resolve(&mut self, rig: &dyn SkeletonRig) {
        match self {
            ChainKind::TwoBone(c) => c.resolve(rig),
        }
    }

    pub fn is_resolved(&self) -> bool {
        match self {
            ChainKind::TwoBone(c) => c.is_resolved(),
        }
    }

    pub fn enabled(&self) -> bool {
        match self {
            ChainKind::TwoBone(c) => c.enabled,
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        match self {
            ChainKind::TwoBone(c) => c.enabled = enabled,
        }
    }

    pub fn set_target(&mut self, target: ChainTarget) {
        match self {
            ChainKind::TwoBone(c) => c.target = Some(target),
        }
    }

    pub fn set_pole_offset(&mut self, offset: Vec3) {
        match self {
            ChainKind::TwoBone(c) => {
                if let Some(pole) = &mut c.pole {
                    pole.offset = offset;
                }
            }
        }
    }

    pub fn solve(&self, rig: &mut dyn SkeletonRig, settings: &IkSettings) {
        match self {
            ChainKind::TwoBone(c) => c.solve(rig, settings),
        }
    }
}
