//! Skeletal animation and IK runtime (engine-agnostic).
//!
//! The host owns the scene; this crate owns the animation data model and the
//! per-skeleton state machines that drive it: keyframe timelines with cached
//! bracketing cursors, continuous and frame-quantized animation forms,
//! playback (generator) and capture (recorder), an undo/redo editing session
//! with spline-sampled preview and baking, a two-bone IK solver behind a
//! chain manager, and the locked registry of per-skeleton animation graphs.

pub mod animation;
pub mod config;
pub mod error;
pub mod frames;
pub mod generator;
pub mod graph;
pub mod ik;
pub mod ik_manager;
pub mod interp;
pub mod recorder;
pub mod registry;
pub mod session;
pub mod skeleton;
pub mod timeline;
pub mod transform;

// Re-exports for hosts (adapters)
pub use animation::Animation;
pub use config::Config;
pub use error::{Result, RuntimeError};
pub use frames::{FrameAnimation, FrameKey, FrameTimeline};
pub use generator::Generator;
pub use graph::{AnimationGraph, GraphState, TransitionKind};
pub use ik::{ChainKind, ChainTarget, IkSettings, PoleAnchor, TwoBoneChain};
pub use ik_manager::{ChainManager, ChainMapping, ChainRole};
pub use recorder::Recorder;
pub use registry::GraphRegistry;
pub use session::{AdjustMode, EditSession, HistoryEntry, KeyDelta};
pub use skeleton::{LocalRig, SkeletonId, SkeletonRig};
pub use timeline::{Keyframe, Timeline};
pub use transform::{Pose, Transform};
