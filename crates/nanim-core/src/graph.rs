//! Per-skeleton animation graph: the state machine that blends between the
//! host's procedural animation and this runtime's generated poses.
//!
//! One instance exists per animated skeleton. It owns the generator,
//! recorder, optional editing session, and IK chain manager, plus the
//! transition bookkeeping for crossfades.

use log::debug;

use crate::animation::Animation;
use crate::config::Config;
use crate::frames::FrameAnimation;
use crate::generator::Generator;
use crate::ik_manager::ChainManager;
use crate::interp::ease_in_out_cubic;
use crate::recorder::Recorder;
use crate::session::EditSession;
use crate::skeleton::SkeletonRig;
use crate::transform::{clear_pose, Pose};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GraphState {
    /// No animation driving this skeleton; the host's procedural system is
    /// authoritative. IK still updates so chains track external targets.
    Idle,
    /// The generator's animation fully drives the pose.
    Generator,
    /// Crossfading between two pose sources.
    Transition,
    /// Capturing the host-driven pose; the host remains authoritative.
    Recording,
}

/// What a transition fades between, and where it lands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransitionKind {
    /// Host procedural pose -> generator animation; ends in `Generator`.
    SceneToGenerator,
    /// Generator animation -> host procedural pose; ends in `Idle`.
    GeneratorToScene,
    /// A frozen snapshot of the last blended pose -> host pose. Used when a
    /// transition is interrupted without a replacement animation.
    SnapshotToScene,
    /// One animation -> another, via a frozen snapshot of the outgoing pose.
    GeneratorToGenerator,
}

impl TransitionKind {
    fn ends_idle(self) -> bool {
        matches!(
            self,
            TransitionKind::GeneratorToScene | TransitionKind::SnapshotToScene
        )
    }
}

#[derive(Debug)]
struct Transition {
    kind: TransitionKind,
    elapsed: f32,
    duration: f32,
    /// Pre-transition pose snapshot; only read by the snapshot kinds.
    snapshot: Pose,
}

#[derive(Debug)]
pub struct AnimationGraph {
    state: GraphState,
    node_names: Vec<String>,
    generator: Generator,
    recorder: Recorder,
    session: Option<EditSession>,
    ik: ChainManager,
    transition: Option<Transition>,
    /// Auto-created instances are temporary: removable once idle with no
    /// active IK chains.
    temporary: bool,
    config: Config,
    pose: Pose,
    scene_pose: Pose,
}

impl AnimationGraph {
    pub fn new(node_names: Vec<String>, config: Config) -> Self {
        let n = node_names.len();
        Self {
            state: GraphState::Idle,
            node_names,
            generator: Generator::new(n),
            recorder: Recorder::new(config.record_sample_rate),
            session: None,
            ik: ChainManager::new(),
            transition: None,
            temporary: true,
            config,
            pose: vec![None; n],
            scene_pose: vec![None; n],
        }
    }

    pub fn state(&self) -> GraphState {
        self.state
    }

    pub fn node_names(&self) -> &[String] {
        &self.node_names
    }

    pub fn is_animating(&self) -> bool {
        self.state != GraphState::Idle
    }

    pub fn generator(&self) -> &Generator {
        &self.generator
    }

    pub fn generator_mut(&mut self) -> &mut Generator {
        &mut self.generator
    }

    pub fn ik(&self) -> &ChainManager {
        &self.ik
    }

    pub fn ik_mut(&mut self) -> &mut ChainManager {
        &mut self.ik
    }

    pub fn set_temporary(&mut self, temporary: bool) {
        self.temporary = temporary;
    }

    /// Eligible for removal: idle, no active IK chains, and temporary.
    pub fn is_removable(&self) -> bool {
        self.temporary && self.state == GraphState::Idle && !self.ik.has_active_chains()
    }

    /// Re-resolve IK chains against the live rig; called on creation and
    /// whenever the skeleton's 3D representation is rebuilt.
    pub fn rebind(&mut self, rig: &dyn SkeletonRig) {
        self.ik.rebind(rig);
    }

    /// Begin capturing the host-driven pose.
    pub fn start_recording(&mut self, rig: &dyn SkeletonRig) {
        self.recorder.start(rig);
        self.state = GraphState::Recording;
        debug!("graph: recording started");
    }

    /// Detach the captured animation (ready for a background save).
    pub fn take_recording(&mut self) -> Option<Animation> {
        if self.state == GraphState::Recording {
            self.state = GraphState::Idle;
        }
        self.recorder.take()
    }

    /// Open an editing session over a frame-quantized animation.
    pub fn open_session(&mut self, frames: FrameAnimation) -> &mut EditSession {
        self.session
            .insert(EditSession::new(frames, self.config.max_history_entries))
    }

    pub fn session_mut(&mut self) -> Option<&mut EditSession> {
        self.session.as_mut()
    }

    pub fn close_session(&mut self) -> Option<EditSession> {
        self.session.take()
    }

    /// Bake the open session's composed result (spline pose + IK) into a
    /// plain animation, using this graph's chain manager and bake rate.
    pub fn bake_session(&mut self, rig: &mut dyn SkeletonRig) -> Option<Animation> {
        let session = self.session.as_mut()?;
        Some(session.bake(
            rig,
            &mut self.ik,
            &self.config.ik,
            self.config.bake_sample_rate,
        ))
    }

    /// Start (or stop, with `None`) an animation with a crossfade. The
    /// transition kind follows from the current state and whether a new
    /// animation is present.
    pub fn transition_to_animation(&mut self, anim: Option<Animation>, duration: f32) {
        let kind = match (self.state, anim.is_some()) {
            (GraphState::Idle | GraphState::Recording, true) => TransitionKind::SceneToGenerator,
            (GraphState::Idle | GraphState::Recording, false) => return,
            (GraphState::Generator, true) => TransitionKind::GeneratorToGenerator,
            (GraphState::Generator, false) => TransitionKind::GeneratorToScene,
            (GraphState::Transition, true) => TransitionKind::GeneratorToGenerator,
            (GraphState::Transition, false) => TransitionKind::SnapshotToScene,
        };

        // Snapshot kinds freeze the outgoing pose before the generator is
        // retargeted.
        let snapshot = match kind {
            TransitionKind::GeneratorToGenerator => {
                if self.state == GraphState::Transition {
                    self.pose.clone()
                } else {
                    self.generator.pose().clone()
                }
            }
            TransitionKind::SnapshotToScene => self.pose.clone(),
            _ => Vec::new(),
        };

        if let Some(anim) = anim {
            self.generator.set_animation(Some(anim));
        }

        debug!("graph: transition {kind:?} over {duration}s");
        if duration <= 0.0 {
            self.finish_transition(kind);
            return;
        }
        self.transition = Some(Transition {
            kind,
            elapsed: 0.0,
            duration,
            snapshot,
        });
        self.state = GraphState::Transition;
    }

    fn finish_transition(&mut self, kind: TransitionKind) {
        self.transition = None;
        if kind.ends_idle() {
            self.generator.set_animation(None);
            self.state = GraphState::Idle;
            debug!("graph: transition complete, idle");
        } else {
            self.state = GraphState::Generator;
            debug!("graph: transition complete, generator");
        }
    }

    /// Per-tick update, called from the host's single simulation thread after
    /// the host's own procedural system has run. Produces the frame's pose,
    /// writes it to the rig (IK-mapped nodes are intercepted), then updates
    /// IK strictly afterwards so the solve observes this frame's output.
    pub fn update(&mut self, dt: f32, rig: &mut dyn SkeletonRig) {
        let n = self.node_names.len();
        match self.state {
            GraphState::Idle => clear_pose(&mut self.pose, n),
            GraphState::Generator => {
                self.generator.update(dt);
                self.pose.clear();
                self.pose.extend(self.generator.pose().iter().copied());
            }
            GraphState::Recording => {
                self.recorder.update(dt, rig);
                clear_pose(&mut self.pose, n);
            }
            GraphState::Transition => self.update_transition(dt, rig),
        }

        for (node, value) in self.pose.iter().enumerate() {
            if let Some(v) = value {
                if !self.ik.is_mapped(node) {
                    rig.set_local_transform(node, *v);
                }
            }
        }
        self.ik
            .update(&self.pose, true, rig, &self.config.ik);
    }

    fn update_transition(&mut self, dt: f32, rig: &mut dyn SkeletonRig) {
        let Some(tr) = self.transition.as_mut() else {
            self.state = GraphState::Idle;
            return;
        };
        tr.elapsed += dt;
        let kind = tr.kind;
        let finished = tr.elapsed >= tr.duration;
        let weight = ease_in_out_cubic((tr.elapsed / tr.duration).clamp(0.0, 1.0));

        rig.procedural_pose(&mut self.scene_pose);
        if matches!(
            kind,
            TransitionKind::SceneToGenerator
                | TransitionKind::GeneratorToScene
                | TransitionKind::GeneratorToGenerator
        ) {
            self.generator.update(dt);
        }

        let n = self.node_names.len();
        let Self {
            pose,
            scene_pose,
            generator,
            transition,
            ..
        } = self;
        let snapshot = transition
            .as_ref()
            .map_or(&[][..], |t| t.snapshot.as_slice());
        let gen_pose = generator.pose();

        pose.clear();
        for node in 0..n {
            let scene = scene_pose.get(node).copied().flatten();
            let generated = gen_pose.get(node).copied().flatten();
            let frozen = snapshot.get(node).copied().flatten();
            let (from, to) = match kind {
                TransitionKind::SceneToGenerator => (scene, generated),
                TransitionKind::GeneratorToScene => (generated, scene),
                TransitionKind::SnapshotToScene => (frozen, scene),
                TransitionKind::GeneratorToGenerator => (frozen, generated),
            };
            // A missing endpoint means "don't touch this node": use the other
            // endpoint directly instead of blending toward anything.
            pose.push(match (from, to) {
                (Some(a), Some(b)) => Some(a.lerp(&b, weight)),
                (Some(a), None) => Some(a),
                (None, Some(b)) => Some(b),
                (None, None) => None,
            });
        }

        if finished {
            self.finish_transition(kind);
        }
    }
}
