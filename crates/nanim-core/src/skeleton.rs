//! Host skeleton contract.
//!
//! The runtime never owns scene nodes; it reads and writes them through this
//! trait. The host supplies the named node list, parent links, live local
//! transforms, and its own procedural-animation pose for the current tick.

use crate::transform::{Pose, Transform};

/// Opaque per-skeleton-instance id used to key graph instances.
pub type SkeletonId = u64;

pub trait SkeletonRig {
    fn node_count(&self) -> usize;

    /// Ordered node-name list; animation timelines are parallel to it.
    fn node_names(&self) -> &[String];

    /// Parent slot, `None` for hierarchy roots.
    fn parent(&self, node: usize) -> Option<usize>;

    fn local_transform(&self, node: usize) -> Transform;

    fn set_local_transform(&mut self, node: usize, transform: Transform);

    /// The host's own procedural pose for this tick, written per node slot.
    /// Slots the host does not drive stay `None`.
    fn procedural_pose(&self, out: &mut Pose);

    fn node_index(&self, name: &str) -> Option<usize> {
        self.node_names().iter().position(|n| n == name)
    }

    /// World transform derived by walking the parent chain once.
    fn world_transform(&self, node: usize) -> Transform {
        let mut acc = self.local_transform(node);
        let mut cursor = self.parent(node);
        while let Some(p) = cursor {
            acc = self.local_transform(p).mul_transform(&acc);
            cursor = self.parent(p);
        }
        acc
    }
}

/// Simple owned rig: a flat node array with parent links. Useful for hosts
/// that mirror their scene into the runtime, and for tests.
#[derive(Clone, Debug, Default)]
pub struct LocalRig {
    names: Vec<String>,
    parents: Vec<Option<usize>>,
    locals: Vec<Transform>,
    procedural: Pose,
}

impl LocalRig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node; `parent` must index an already-added node.
    pub fn add_node(&mut self, name: &str, parent: Option<usize>, local: Transform) -> usize {
        debug_assert!(parent.map_or(true, |p| p < self.names.len()));
        self.names.push(name.to_string());
        self.parents.push(parent);
        self.locals.push(local);
        self.procedural.push(None);
        self.names.len() - 1
    }

    /// Set the procedural pose the host side would produce this tick.
    pub fn set_procedural(&mut self, node: usize, transform: Option<Transform>) {
        if let Some(slot) = self.procedural.get_mut(node) {
            *slot = transform;
        }
    }
}

impl SkeletonRig for LocalRig {
    fn node_count(&self) -> usize {
        self.names.len()
    }

    fn node_names(&self) -> &[String] {
        &self.names
    }

    fn parent(&self, node: usize) -> Option<usize> {
        self.parents.get(node).copied().flatten()
    }

    fn local_transform(&self, node: usize) -> Transform {
        self.locals.get(node).copied().unwrap_or_default()
    }

    fn set_local_transform(&mut self, node: usize, transform: Transform) {
        if let Some(slot) = self.locals.get_mut(node) {
            *slot = transform;
        }
    }

    fn procedural_pose(&self, out: &mut Pose) {
        out.clear();
        out.extend(self.procedural.iter().copied());
    }
}
