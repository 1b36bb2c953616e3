//! DAG-validated animation sequencing: stages with dependencies, delays,
//! staggered fan-out, and nested groups, played forward by a
//! [`SequenceController`].
//!
//! A [`Sequence`] is constructed once and validated up front — duplicate
//! ids, unknown dependencies, and cycles are all rejected by
//! [`Sequence::new`], never discovered mid-playback. Everything after that
//! point is the controller's job: per-tick interpolation, batched style
//! writes through a [`StyleSink`], and the lifecycle events
//! (`Started`/`StageChanged`/`Completed`/`Error`) the rest of the runtime
//! listens for.

pub mod controller;
pub mod easing;
pub mod sequence;
pub mod stage;
pub mod stagger;

pub use controller::{
    OrchestratorEvent, PlayToken, PlaybackState, RecordingStyleSink, SequenceController, StyleSink,
};
pub use easing::Easing;
pub use sequence::{LoopMode, Sequence, SequenceError};
pub use stage::{Stage, StageId, StageKind, StyleMap};
pub use stagger::StaggerPattern;
