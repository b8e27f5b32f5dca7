//! Registry of live animation graph instances.
//!
//! Two-tier locking: a reader/writer lock guards the membership map (read
//! side for visiting a graph, write side only for creating or destroying an
//! entry), and each graph carries its own mutex held for the duration of its
//! update or any externally initiated mutation. Different skeletons' graphs
//! therefore update and mutate concurrently without contention.
//!
//! File I/O detaches to worker threads. Load requests carry a per-skeleton
//! generation counter: when a load completes, the counter is compared and a
//! superseded result is discarded instead of applied.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use hashbrown::HashMap;
use log::{error, warn};
use nanim_format::{load_animation_set, save_animation_set, AnimationSet, RawAnimation, MAX_VERSION};

use crate::animation::Animation;
use crate::config::Config;
use crate::error::{Result, RuntimeError};
use crate::graph::AnimationGraph;
use crate::skeleton::{SkeletonId, SkeletonRig};

fn lock_ignore_poison<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[derive(Debug, Default)]
pub struct GraphRegistry {
    config: Config,
    graphs: RwLock<HashMap<SkeletonId, Arc<Mutex<AnimationGraph>>>>,
    /// Per-skeleton load generation; bumped on each request, checked on
    /// completion. An O(1) stale test, no path/id comparison.
    load_generations: Mutex<HashMap<SkeletonId, u64>>,
}

impl GraphRegistry {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            graphs: RwLock::new(HashMap::new()),
            load_generations: Mutex::new(HashMap::new()),
        }
    }

    pub fn contains(&self, skeleton: SkeletonId) -> bool {
        self.graphs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(&skeleton)
    }

    /// Lock-protected access to one skeleton's graph. Takes the shared read
    /// lock to find the entry, then the per-instance lock to run `f`.
    /// `create_with` supplies the node-name list for on-demand creation;
    /// `only_if_animating` skips idle graphs without running `f`.
    pub fn visit<R>(
        &self,
        skeleton: SkeletonId,
        create_with: Option<&dyn SkeletonRig>,
        only_if_animating: bool,
        f: impl FnOnce(&mut AnimationGraph) -> R,
    ) -> Option<R> {
        let existing = self
            .graphs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&skeleton)
            .cloned();

        let entry = match (existing, create_with) {
            (Some(entry), _) => entry,
            (None, Some(rig)) => {
                let mut graphs = self.graphs.write().unwrap_or_else(|e| e.into_inner());
                Arc::clone(graphs.entry(skeleton).or_insert_with(|| {
                    let mut graph =
                        AnimationGraph::new(rig.node_names().to_vec(), self.config);
                    graph.rebind(rig);
                    Arc::new(Mutex::new(graph))
                }))
            }
            (None, None) => return None,
        };

        let mut graph = lock_ignore_poison(&entry);
        if only_if_animating && !graph.is_animating() {
            return None;
        }
        Some(f(&mut graph))
    }

    /// Per-tick driver for one skeleton, called after the host's own
    /// procedural update. Sweeps the entry away afterwards when the graph has
    /// become removable (idle, temporary, no active IK chains).
    pub fn update(&self, skeleton: SkeletonId, dt: f32, rig: &mut dyn SkeletonRig) {
        let removable = self.visit(skeleton, None, false, |graph| {
            graph.update(dt, rig);
            graph.is_removable()
        });
        if removable == Some(true) {
            self.remove(skeleton);
        }
    }

    /// Hook for the host's "3D representation rebuilt" event: re-resolve
    /// live node references.
    pub fn rebind(&self, skeleton: SkeletonId, rig: &dyn SkeletonRig) {
        self.visit(skeleton, None, false, |graph| graph.rebind(rig));
    }

    pub fn remove(&self, skeleton: SkeletonId) {
        self.graphs
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&skeleton);
    }

    /// Synchronously load one animation out of a NANIM file.
    pub fn load_animation(path: &Path, id: &str) -> Result<RawAnimation> {
        let set = load_animation_set(path)?;
        set.get(id)
            .cloned()
            .ok_or_else(|| RuntimeError::AnimationNotFound { id: id.to_string() })
    }

    /// Start playing a loaded animation on a skeleton with a crossfade,
    /// creating its graph on demand.
    pub fn start_animation(
        &self,
        skeleton: SkeletonId,
        rig: &dyn SkeletonRig,
        raw: &RawAnimation,
        transition_seconds: f32,
    ) {
        self.visit(skeleton, Some(rig), false, |graph| {
            let anim = Animation::from_raw(raw, graph.node_names());
            graph.transition_to_animation(Some(anim), transition_seconds);
        });
    }

    /// Fade a skeleton back to the host's procedural animation.
    pub fn stop_animation(&self, skeleton: SkeletonId, transition_seconds: f32) {
        self.visit(skeleton, None, false, |graph| {
            graph.transition_to_animation(None, transition_seconds);
        });
    }

    /// Load a file on a detached worker thread, then start the animation
    /// unless a newer request for the same skeleton superseded this one.
    /// The graph must already exist (or be created by a prior visit); stale
    /// and failed loads degrade to "no animation applied".
    pub fn request_animation(
        self: &Arc<Self>,
        skeleton: SkeletonId,
        path: PathBuf,
        id: String,
        transition_seconds: f32,
    ) {
        let generation = {
            let mut generations = lock_ignore_poison(&self.load_generations);
            let slot = generations.entry(skeleton).or_insert(0);
            *slot += 1;
            *slot
        };
        let registry = Arc::clone(self);
        std::thread::spawn(move || {
            let raw = match Self::load_animation(&path, &id) {
                Ok(raw) => raw,
                Err(e) => {
                    error!("animation load '{}' from {} failed: {e}", id, path.display());
                    return;
                }
            };
            // Stale check and apply run under one guard: a newer request
            // bumps the counter before its worker can apply, so an older
            // result can never land after a newer one.
            let generations = lock_ignore_poison(&registry.load_generations);
            if generations.get(&skeleton).copied().unwrap_or(0) != generation {
                warn!("discarding superseded animation load '{id}'");
                return;
            }
            registry.visit(skeleton, None, false, |graph| {
                let anim = Animation::from_raw(&raw, graph.node_names());
                graph.transition_to_animation(Some(anim), transition_seconds);
            });
            drop(generations);
        });
    }

    /// Detach a finished capture and write it out on a worker thread
    /// (fire-and-forget); the graph can immediately accept new input.
    /// Returns false when there was nothing recorded.
    pub fn save_capture(&self, skeleton: SkeletonId, path: PathBuf, id: String) -> bool {
        let raw = self
            .visit(skeleton, None, false, |graph| {
                graph
                    .take_recording()
                    .map(|anim| anim.to_raw(graph.node_names()))
            })
            .flatten();
        let Some(raw) = raw else {
            return false;
        };
        std::thread::spawn(move || {
            let set = AnimationSet {
                version: MAX_VERSION,
                animations: vec![(id.clone(), raw)],
            };
            if let Err(e) = save_animation_set(&path, &set, None) {
                error!("saving capture '{}' to {} failed: {e}", id, path.display());
            }
        });
        true
    }
}
