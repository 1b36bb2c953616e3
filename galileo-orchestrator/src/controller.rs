//! [`SequenceController`]: plays a [`Sequence`] forward through time,
//! writing interpolated styles and firing lifecycle events.
//!
//! Construction never fails here — [`Sequence::new`] already rejected a
//! cyclic or malformed graph — so everything in this module is the
//! recoverable-error path: a target that has vanished out from under a
//! running stage is skipped and logged, never a panic or a hard stop.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use galileo_events::{AnimationCategory, EventBus};
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::easing::Easing;
use crate::sequence::{LoopMode, Sequence};
use crate::stage::{Stage, StageId, StageKind, StyleMap};
use crate::stagger::stagger_rank;

#[derive(Debug, Clone, PartialEq)]
pub enum OrchestratorEvent {
    Started { sequence_id: String },
    StageChanged { sequence_id: String, stage_id: StageId },
    Completed { sequence_id: String },
    /// A stage referenced a target that no longer exists (or a user
    /// callback panicked). Playback continues past it — only a cyclic or
    /// malformed graph is fatal, and that is rejected at construction.
    Error {
        sequence_id: String,
        stage_id: Option<StageId>,
        message: String,
    },
    Custom {
        sequence_id: String,
        name: String,
        payload: Option<serde_json::Value>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Playing,
    Paused,
    Completed,
    Stopped,
    Error,
}

/// Where a tick's interpolated styles land. One `apply` call per target per
/// tick even when several active stages touch the same target — the
/// controller merges their contributions before calling out, so a host
/// never sees two writes to the same target in one tick.
pub trait StyleSink: Send {
    fn apply(&mut self, target: &str, styles: &StyleMap);
}

/// Records every `apply` call verbatim; the style sink this crate's own
/// tests drive a controller with.
#[derive(Default)]
pub struct RecordingStyleSink {
    pub writes: Vec<(String, StyleMap)>,
}

impl StyleSink for RecordingStyleSink {
    fn apply(&mut self, target: &str, styles: &StyleMap) {
        self.writes.push((target.to_string(), styles.clone()));
    }
}

/// A cancellation handle returned by [`SequenceController::play`]. Calling
/// [`Self::cancel`] stops playback on the controller's next tick, the same
/// tick boundary every other state transition in this runtime honors.
#[derive(Clone)]
pub struct PlayToken {
    generation: u64,
    cancelled: Arc<AtomicBool>,
}

impl PlayToken {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Clone)]
enum PlanWork {
    Style { targets: Vec<String>, to: StyleMap },
    Callback,
    Event { name: String, payload: Option<serde_json::Value> },
    StaggerTarget { target: String, to: StyleMap },
}

#[derive(Debug, Clone)]
struct PlanItem {
    path: Vec<usize>,
    top_level_index: usize,
    start_ms: u64,
    duration_ms: u64,
    easing: Easing,
    #[allow(dead_code)]
    category: AnimationCategory,
    work: PlanWork,
}

fn flatten_stage(
    stage: &Stage,
    path: Vec<usize>,
    top_level_index: usize,
    baseline_ms: u64,
    out: &mut Vec<PlanItem>,
) {
    let start_ms = baseline_ms + stage.delay_ms;
    match &stage.kind {
        StageKind::Style { targets, to, .. } => {
            out.push(PlanItem {
                path,
                top_level_index,
                start_ms,
                duration_ms: stage.duration_ms,
                easing: stage.easing,
                category: stage.category,
                work: PlanWork::Style {
                    targets: targets.clone(),
                    to: to.clone(),
                },
            });
        }
        StageKind::Callback(_) => {
            out.push(PlanItem {
                path,
                top_level_index,
                start_ms,
                duration_ms: 0,
                easing: stage.easing,
                category: stage.category,
                work: PlanWork::Callback,
            });
        }
        StageKind::Event { name, payload } => {
            out.push(PlanItem {
                path,
                top_level_index,
                start_ms,
                duration_ms: 0,
                easing: stage.easing,
                category: stage.category,
                work: PlanWork::Event {
                    name: name.clone(),
                    payload: payload.clone(),
                },
            });
        }
        StageKind::Group(children) => {
            for (i, child) in children.iter().enumerate() {
                let mut child_path = path.clone();
                child_path.push(i);
                flatten_stage(child, child_path, top_level_index, start_ms, out);
            }
        }
        StageKind::Stagger {
            targets,
            to,
            stagger_delay_ms,
            pattern,
        } => {
            for (i, target) in targets.iter().enumerate() {
                let rank = stagger_rank(pattern, i, targets.len());
                out.push(PlanItem {
                    path: path.clone(),
                    top_level_index,
                    start_ms: start_ms + (rank * *stagger_delay_ms as f32) as u64,
                    duration_ms: stage.duration_ms,
                    easing: stage.easing,
                    category: stage.category,
                    work: PlanWork::StaggerTarget {
                        target: target.clone(),
                        to: to.clone(),
                    },
                });
            }
        }
    }
}

/// Borrows into nested `Group` children by path, for invoking a `Callback`
/// stage's boxed closure in place.
fn stage_at_path_mut<'a>(stages: &'a mut [Stage], path: &[usize]) -> &'a mut Stage {
    let mut current = &mut stages[path[0]];
    for &i in &path[1..] {
        match &mut current.kind {
            StageKind::Group(children) => current = &mut children[i],
            _ => unreachable!("plan path into a non-group stage"),
        }
    }
    current
}

/// Returns `true` if `target` still exists according to `is_live`, logging
/// and emitting a recoverable [`OrchestratorEvent::Error`] otherwise.
fn check_target_live(
    target: &str,
    stage_id: &str,
    sequence_id: &str,
    is_live: &dyn Fn(&str) -> bool,
    events: &mut EventBus,
) -> bool {
    if is_live(target) {
        true
    } else {
        warn!(target, stage_id, "stage target vanished; skipping");
        events.emit(OrchestratorEvent::Error {
            sequence_id: sequence_id.to_string(),
            stage_id: Some(stage_id.to_string()),
            message: format!("target '{target}' no longer exists"),
        });
        false
    }
}

/// Plays one [`Sequence`], one tick at a time.
pub struct SequenceController<S: StyleSink> {
    sequence: Sequence,
    sink: S,
    events: EventBus,
    state: PlaybackState,
    elapsed_ms: u64,
    loops_done: u32,
    plan: Vec<PlanItem>,
    fired_start: HashSet<usize>,
    fired_stage_change: HashSet<usize>,
    sampled_from: FxHashMap<usize, StyleMap>,
    cancel_flag: Arc<AtomicBool>,
    generation: u64,
    /// Hosts report a target gone by returning `false` here; defaults to
    /// "everything exists" when not overridden via [`Self::set_liveness_check`].
    is_live: Box<dyn Fn(&str) -> bool + Send>,
}

impl<S: StyleSink> SequenceController<S> {
    pub fn new(sequence: Sequence, sink: S) -> Self {
        let mut plan = Vec::new();
        for (i, stage) in sequence.stages.iter().enumerate() {
            let baseline = sequence.start_times_ms[i] - stage.delay_ms;
            flatten_stage(stage, vec![i], i, baseline, &mut plan);
        }
        let autoplay = sequence.autoplay;
        let mut controller = Self {
            sequence,
            sink,
            events: EventBus::new(),
            state: PlaybackState::Idle,
            elapsed_ms: 0,
            loops_done: 0,
            plan,
            fired_start: HashSet::new(),
            fired_stage_change: HashSet::new(),
            sampled_from: FxHashMap::default(),
            cancel_flag: Arc::new(AtomicBool::new(false)),
            generation: 0,
            is_live: Box::new(|_| true),
        };
        if autoplay {
            let _ = controller.play();
        }
        controller
    }

    /// Inject a liveness probe the controller consults before writing to a
    /// target; `false` marks the target vanished (spec's recoverable
    /// "skip and continue" path rather than a panic).
    pub fn set_liveness_check(&mut self, check: impl Fn(&str) -> bool + Send + 'static) {
        self.is_live = Box::new(check);
    }

    pub fn on_event(&mut self, handler: impl FnMut(&OrchestratorEvent) + Send + 'static) {
        self.events.on(handler);
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn progress(&self) -> f32 {
        let total = self.sequence.total_duration_ms();
        if total == 0 {
            return 1.0;
        }
        (self.elapsed_ms as f32 / total as f32).clamp(0.0, 1.0)
    }

    pub fn current_stage_id(&self) -> Option<&str> {
        self.sequence
            .stages
            .iter()
            .enumerate()
            .filter(|(i, s)| {
                let start = self.sequence.start_times_ms[*i];
                let end = start + s.effective_duration_ms();
                self.elapsed_ms >= start && self.elapsed_ms < end.max(start + 1)
            })
            .max_by_key(|(i, _)| self.sequence.start_times_ms[*i])
            .map(|(_, s)| s.id.as_str())
    }

    /// Begin (or resume-from-idle) playback. Returns a token the caller can
    /// use to cancel this specific play run later.
    pub fn play(&mut self) -> PlayToken {
        if self.state == PlaybackState::Playing {
            return PlayToken {
                generation: self.generation,
                cancelled: self.cancel_flag.clone(),
            };
        }
        self.generation += 1;
        self.cancel_flag = Arc::new(AtomicBool::new(false));
        self.state = PlaybackState::Playing;
        debug!(sequence_id = %self.sequence.id, "sequence started");
        self.events.emit(OrchestratorEvent::Started {
            sequence_id: self.sequence.id.clone(),
        });
        PlayToken {
            generation: self.generation,
            cancelled: self.cancel_flag.clone(),
        }
    }

    pub fn pause(&mut self) {
        if self.state == PlaybackState::Playing {
            self.state = PlaybackState::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.state == PlaybackState::Paused {
            self.state = PlaybackState::Playing;
        }
    }

    pub fn stop(&mut self) {
        self.cancel_flag.store(true, Ordering::SeqCst);
        self.state = PlaybackState::Stopped;
    }

    /// Return to the sequence's first frame without changing play state.
    /// Per spec, this also restores every target to its recorded `from`
    /// state, not just the zeroed `elapsed_ms` — a bare rewind would leave
    /// targets sitting at whatever they last interpolated to.
    pub fn reset(&mut self) {
        self.restore_recorded_from_styles();
        self.elapsed_ms = 0;
        self.loops_done = 0;
        self.fired_start.clear();
        self.fired_stage_change.clear();
        self.sampled_from.clear();
    }

    /// Writes each plan item's recorded `from` style back to the sink,
    /// undoing whatever interpolated progress the current run made. Items
    /// never sampled this run (no entry in `sampled_from`) have nothing to
    /// restore.
    fn restore_recorded_from_styles(&mut self) {
        for index in 0..self.plan.len() {
            let Some(from) = self.sampled_from.get(&index).cloned() else {
                continue;
            };
            let item = self.plan[index].clone();
            match item.work {
                PlanWork::Style { targets, .. } => {
                    for target in &targets {
                        self.sink.apply(target, &from);
                    }
                }
                PlanWork::StaggerTarget { target, .. } => {
                    self.sink.apply(&target, &from);
                }
                PlanWork::Callback | PlanWork::Event { .. } => {}
            }
        }
    }

    pub fn restart(&mut self) -> PlayToken {
        self.reset();
        self.state = PlaybackState::Idle;
        self.play()
    }

    /// Jump to `ms`, applying every stage's state at that instant without
    /// firing `onStart`/`onStageChange`/`onComplete` for the instants
    /// skipped over — seeking is a snapshot, not a replay.
    pub fn seek(&mut self, ms: u64) {
        let total = self.sequence.total_duration_ms();
        self.elapsed_ms = ms.min(total);
        self.fired_start.clear();
        self.fired_stage_change.clear();
        for i in 0..self.plan.len() {
            self.apply_plan_item(i, false);
        }
    }

    /// Advance playback by `dt_ms`. A no-op unless [`Self::state`] is
    /// [`PlaybackState::Playing`].
    pub fn tick(&mut self, dt_ms: u64) {
        if self.state != PlaybackState::Playing {
            return;
        }
        if self.cancel_flag.load(Ordering::SeqCst) {
            self.state = PlaybackState::Stopped;
            return;
        }

        self.elapsed_ms += dt_ms;
        for i in 0..self.plan.len() {
            self.apply_plan_item(i, true);
        }
        self.maybe_emit_stage_changes();

        let total = self.sequence.total_duration_ms();
        if self.elapsed_ms >= total {
            match self.sequence.loop_mode {
                LoopMode::Never => self.complete(),
                LoopMode::Times(n) => {
                    self.loops_done += 1;
                    if self.loops_done >= n {
                        self.complete();
                    } else {
                        self.loop_back();
                    }
                }
                LoopMode::Infinite => self.loop_back(),
            }
        }
    }

    fn loop_back(&mut self) {
        self.elapsed_ms = 0;
        self.fired_start.clear();
        self.fired_stage_change.clear();
        self.sampled_from.clear();
    }

    fn complete(&mut self) {
        self.state = PlaybackState::Completed;
        self.events.emit(OrchestratorEvent::Completed {
            sequence_id: self.sequence.id.clone(),
        });
    }

    fn maybe_emit_stage_changes(&mut self) {
        for (i, stage) in self.sequence.stages.iter().enumerate() {
            let start = self.sequence.start_times_ms[i];
            if self.elapsed_ms >= start && self.fired_stage_change.insert(i) {
                self.events.emit(OrchestratorEvent::StageChanged {
                    sequence_id: self.sequence.id.clone(),
                    stage_id: stage.id.clone(),
                });
            }
        }
    }

    fn apply_plan_item(&mut self, index: usize, emit_events: bool) {
        // Indexing instead of iterating `&self.plan` up front avoids
        // borrowing `self.plan` across the `&mut self` calls below.
        let item = self.plan[index].clone();
        if self.elapsed_ms < item.start_ms {
            return;
        }
        let stage_id = self.sequence.stages[item.top_level_index].id.clone();
        let u = if item.duration_ms == 0 {
            1.0
        } else {
            ((self.elapsed_ms - item.start_ms) as f32 / item.duration_ms as f32).clamp(0.0, 1.0)
        };
        let eased = item.easing.apply(u);

        match item.work {
            PlanWork::Style { targets, to } => {
                for target in &targets {
                    if !check_target_live(target, &stage_id, &self.sequence.id, &*self.is_live, &mut self.events) {
                        continue;
                    }
                    let from = self
                        .sampled_from
                        .entry(index)
                        .or_insert_with(StyleMap::default);
                    let styles = interpolate(from, &to, eased);
                    self.sink.apply(target, &styles);
                }
            }
            PlanWork::StaggerTarget { target, to } => {
                if !check_target_live(&target, &stage_id, &self.sequence.id, &*self.is_live, &mut self.events) {
                    return;
                }
                let from = self
                    .sampled_from
                    .entry(index)
                    .or_insert_with(StyleMap::default);
                let styles = interpolate(from, &to, eased);
                self.sink.apply(&target, &styles);
            }
            PlanWork::Callback => {
                if self.fired_start.insert(index) {
                    let stage = stage_at_path_mut(&mut self.sequence.stages, &item.path);
                    if let StageKind::Callback(cb) = &mut stage.kind {
                        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| cb()));
                        if result.is_err() && emit_events {
                            self.events.emit(OrchestratorEvent::Error {
                                sequence_id: self.sequence.id.clone(),
                                stage_id: Some(stage_id.clone()),
                                message: "callback stage panicked".to_string(),
                            });
                        }
                    }
                }
            }
            PlanWork::Event { name, payload } => {
                if emit_events && self.fired_start.insert(index) {
                    self.events.emit(OrchestratorEvent::Custom {
                        sequence_id: self.sequence.id.clone(),
                        name,
                        payload,
                    });
                }
            }
        }
    }
}

/// Linear blend of every key in `to` against `from` (defaulting the
/// starting value to `to`'s own value — i.e. no motion — for a key `from`
/// never recorded, which happens when a target was already at rest there).
fn interpolate(from: &StyleMap, to: &StyleMap, u: f32) -> StyleMap {
    let mut out = StyleMap::default();
    for (key, target_value) in to {
        let start_value = *from.get(key).unwrap_or(target_value);
        out.insert(key.clone(), start_value + (target_value - start_value) * u);
    }
    out
}
