//! IK chain manager: maps logical chain ids to chain holders and routes
//! per-node pose overrides into chain targets.
//!
//! Two parallel indices are maintained: the ordered mapping list (node name ->
//! chain + role) that routes externally supplied poses, and a node-slot ->
//! mapping lookup rebuilt whenever the rig's node list changes. Any node
//! carrying a mapping is intercepted before its animation value would be
//! written to the skeleton, so the same pose vector drives both ordinary bone
//! animation and IK targets.

use hashbrown::HashMap;

use crate::ik::{ChainKind, ChainTarget, IkSettings, PoleAnchor, TwoBoneChain};
use crate::skeleton::SkeletonRig;
use crate::transform::Pose;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChainRole {
    Effector,
    Pole,
}

#[derive(Clone, Debug)]
pub struct ChainMapping {
    pub node: String,
    pub chain: String,
    pub role: ChainRole,
}

#[derive(Debug, Default)]
pub struct ChainManager {
    chains: Vec<(String, ChainKind)>,
    mappings: Vec<ChainMapping>,
    /// node slot -> index into `mappings`; rebuilt on `rebind`.
    node_lookup: HashMap<usize, usize>,
}

impl ChainManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a two-bone chain under `id`, replacing any previous chain
    /// with that id. Call `rebind` before the next update.
    pub fn add_two_bone(&mut self, id: &str, root: &str, mid: &str, tip: &str) {
        let chain = ChainKind::TwoBone(TwoBoneChain::new(root, mid, tip));
        if let Some(slot) = self.chains.iter_mut().find(|(k, _)| k == id) {
            slot.1 = chain;
        } else {
            self.chains.push((id.to_string(), chain));
        }
    }

    pub fn remove_chain(&mut self, id: &str) {
        self.chains.retain(|(k, _)| k != id);
        self.mappings.retain(|m| m.chain != id);
        self.node_lookup.clear();
    }

    pub fn chain(&self, id: &str) -> Option<&ChainKind> {
        self.chains
            .iter()
            .find_map(|(k, c)| if k == id { Some(c) } else { None })
    }

    pub fn chain_mut(&mut self, id: &str) -> Option<&mut ChainKind> {
        self.chains
            .iter_mut()
            .find_map(|(k, c)| if k == id { Some(c) } else { None })
    }

    pub fn set_enabled(&mut self, id: &str, enabled: bool) {
        if let Some(chain) = self.chain_mut(id) {
            chain.set_enabled(enabled);
        }
    }

    /// Attach a pole anchor to a two-bone chain.
    pub fn set_pole(&mut self, id: &str, anchor: PoleAnchor) {
        if let Some(ChainKind::TwoBone(c)) = self.chain_mut(id) {
            c.pole = Some(anchor);
        }
    }

    /// Route `node`'s per-tick pose value into `chain` as its target or pole.
    pub fn add_mapping(&mut self, node: &str, chain: &str, role: ChainRole) {
        self.mappings.push(ChainMapping {
            node: node.to_string(),
            chain: chain.to_string(),
            role,
        });
        self.node_lookup.clear();
    }

    /// Any enabled, resolved chain counts as active; graphs with active
    /// chains are kept alive even when idle.
    pub fn has_active_chains(&self) -> bool {
        self.chains
            .iter()
            .any(|(_, c)| c.enabled() && c.is_resolved())
    }

    pub fn is_mapped(&self, node: usize) -> bool {
        self.node_lookup.contains_key(&node)
    }

    /// Re-resolve every chain and rebuild the node-slot lookup against the
    /// live rig. Called on creation and whenever the skeleton's 3D
    /// representation is rebuilt.
    pub fn rebind(&mut self, rig: &dyn SkeletonRig) {
        for (_, chain) in &mut self.chains {
            chain.resolve(rig);
        }
        self.node_lookup.clear();
        for (idx, mapping) in self.mappings.iter().enumerate() {
            if let Some(slot) = rig.node_index(&mapping.node) {
                self.node_lookup.insert(slot, idx);
            }
        }
    }

    /// Push every mapped, non-`None` override into its chain, then solve all
    /// enabled chains if requested.
    pub fn update(
        &mut self,
        overrides: &Pose,
        solve: bool,
        rig: &mut dyn SkeletonRig,
        settings: &IkSettings,
    ) {
        for (&slot, &mapping_idx) in &self.node_lookup {
            let Some(value) = overrides.get(slot).copied().flatten() else {
                continue;
            };
            let mapping = &self.mappings[mapping_idx];
            let Some(chain) = self
                .chains
                .iter_mut()
                .find_map(|(k, c)| if *k == mapping.chain { Some(c) } else { None })
            else {
                continue;
            };
            match mapping.role {
                ChainRole::Effector => chain.set_target(ChainTarget::ParentRelative(value)),
                ChainRole::Pole => chain.set_pole_offset(value.translation),
            }
        }
        if solve {
            for (_, chain) in &mut self.chains {
                if chain.enabled() {
                    chain.solve(rig, settings);
                }
            }
        }
    }
}
