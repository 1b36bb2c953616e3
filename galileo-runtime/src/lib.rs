//! Public hook surface (C9): the facade a host bootstraps exactly once per
//! process.
//!
//! [`GalileoRuntime`] owns the single [`Ticker`], [`MotionPolicy`], and
//! [`QualityDetector`] the rest of this workspace's design notes call for —
//! "process-wide but injected at runtime bootstrap; no module-scope mutable
//! state" — and hands out scoped [`ElementHandle`]s for everything a UI
//! element creates: a physics engine, a spring, an interaction controller, or
//! a sequence controller. `unmount ⇒ stop() ⇒ dispose()` is the handle's job
//! (see [`handle`]); this module's job is gating and construction.
//!
//! Every stage/interaction creation call that carries an
//! [`AnimationCategory`] is rewritten by the motion policy before the
//! physics engine, spring, or orchestrator ever sees it, per spec's "C7
//! intercepts every creation request from C5/C6/C4" rule. `createSpring`
//! itself carries no category in the external interface, so bare spring
//! creation is never gated directly — whatever drives it with a category
//! (an interaction mode, an orchestrated stage) is.

pub mod handle;

use galileo_a11y::{
    AnimationRequest, CategoryDefault, EffectFlags, MotionPolicy, MotionPolicyConfig,
    MotionPolicyError, MotionSensitivity, RewriteOutcome,
};
use galileo_events::AnimationCategory;
use galileo_interaction::{InteractionConfig, InteractionController, ModeConfig};
use galileo_orchestrator::{LoopMode, Sequence, SequenceController, SequenceError, Stage, StageKind, StyleSink};
use galileo_physics::{EngineConfig, PhysicsEngine};
use galileo_quality::{
    CapabilityFlags, EnvironmentProbe, InMemoryKvStore, KvStore, QualityDetector, QualityTier,
    StaticEnvironmentProbe,
};
use galileo_springs::{ScalarSpring, SpringConfig, VectorSpring};
use galileo_timing::{
    FrameSource, ManualFrameSource, MonotonicClock, SubscriptionHandle, TestClock, Ticker,
};

pub use handle::{ElementHandle, Lifecycle};

/// The facade. `C`/`F` are the injected clock and frame source (spec's
/// `nowProvider`/`frameSource`); `P`/`KV` are the injected quality probe and
/// override store (`batteryInfo`/`networkInfo`/`storage`). None of the four
/// is ever sniffed globally — a host supplies all of them at construction.
pub struct GalileoRuntime<C: MonotonicClock, F: FrameSource, P: EnvironmentProbe, KV: KvStore> {
    ticker: Ticker<C, F>,
    motion_policy: MotionPolicy,
    quality: QualityDetector<P, KV>,
}

impl<C: MonotonicClock, F: FrameSource, P: EnvironmentProbe, KV: KvStore> GalileoRuntime<C, F, P, KV> {
    pub fn new(
        clock: C,
        frame_source: F,
        probe: P,
        store: KV,
        motion_config: MotionPolicyConfig,
    ) -> Result<Self, MotionPolicyError> {
        Ok(Self {
            ticker: Ticker::new(clock, frame_source),
            motion_policy: MotionPolicy::new(motion_config)?,
            quality: QualityDetector::new(probe, store),
        })
    }

    // -- C1: timing -------------------------------------------------------

    pub fn now(&self) -> u64 {
        self.ticker.now()
    }

    /// Advance the shared ticker. Every subscriber registered through
    /// [`Self::subscribe`] — or held privately by a component that wires
    /// itself up the same way — sees this tick.
    pub fn tick(&mut self, now_ms: u64) {
        self.ticker.tick(now_ms);
    }

    pub fn subscribe(&mut self, cb: impl FnMut(u64, u64) + Send + 'static) -> SubscriptionHandle {
        self.ticker.subscribe(cb)
    }

    pub fn unsubscribe(&mut self, handle: SubscriptionHandle) {
        self.ticker.unsubscribe(handle);
    }

    // -- C3: physics --------------------------------------------------------

    /// Physics bodies carry no `AnimationCategory` — the gate only
    /// intercepts C4/C5/C6 per spec, so engine creation is never rewritten.
    pub fn create_engine(&self, config: EngineConfig) -> ElementHandle<PhysicsEngine> {
        ElementHandle::new(PhysicsEngine::new(config))
    }

    // -- C4: springs ----------------------------------------------------

    pub fn create_spring(&self, config: SpringConfig) -> ElementHandle<ScalarSpring> {
        ElementHandle::new(ScalarSpring::new(config))
    }

    pub fn create_vector_spring<const N: usize>(
        &self,
        config: SpringConfig,
    ) -> ElementHandle<VectorSpring<N>> {
        ElementHandle::new(VectorSpring::new(config))
    }

    // -- C5: interaction ----------------------------------------------------

    /// Rewrites `config.mode`'s tilt/parallax amplitudes through the motion
    /// policy before constructing the controller. `None` means the gate
    /// omitted the request entirely (`high` sensitivity, non-essential
    /// category, no registered alternative) — there is nothing to attach to
    /// the element.
    pub fn create_interaction(
        &self,
        category: AnimationCategory,
        config: InteractionConfig,
    ) -> Option<ElementHandle<InteractionController>> {
        let request =
            AnimationRequest::new(category, 0).with_effects(EffectFlags::TILT | EffectFlags::PARALLAX);
        let mode = match self.motion_policy.rewrite(&request) {
            RewriteOutcome::Omitted => return None,
            RewriteOutcome::Collapsed { .. } => strip_all_motion(config.mode),
            RewriteOutcome::Full { effects, .. } => gate_mode_effects(config.mode, effects),
        };
        Some(ElementHandle::new(InteractionController::new(InteractionConfig {
            mode,
            bounds: config.bounds,
        })))
    }

    // -- C6: orchestrator -----------------------------------------------

    /// Rewrites every stage's duration (recursively through `Group`
    /// children) through the motion policy, then hands the result to
    /// [`Sequence::new`]. An `Omitted` stage becomes a zero-duration no-op
    /// callback rather than disappearing outright, so dependents that name
    /// it by id still resolve — the DAG stays exactly as the caller declared
    /// it, just with some nodes defanged.
    pub fn create_sequence<S: StyleSink>(
        &self,
        id: impl Into<String>,
        stages: Vec<Stage>,
        autoplay: bool,
        loop_mode: LoopMode,
        category: AnimationCategory,
        sink: S,
    ) -> Result<ElementHandle<SequenceController<S>>, SequenceError> {
        let gated = stages.into_iter().map(|s| self.gate_stage(s)).collect();
        let sequence = Sequence::new(id, gated, autoplay, loop_mode, category)?;
        Ok(ElementHandle::new(SequenceController::new(sequence, sink)))
    }

    fn gate_stage(&self, mut stage: Stage) -> Stage {
        stage.kind = match stage.kind {
            StageKind::Group(children) => {
                let gated = children.into_iter().map(|c| self.gate_stage(c)).collect();
                StageKind::Group(gated)
            }
            other => other,
        };
        let request = AnimationRequest::new(stage.category, stage.duration_ms);
        match self.motion_policy.rewrite(&request) {
            RewriteOutcome::Full { duration_ms, .. } => stage.duration_ms = duration_ms,
            RewriteOutcome::Collapsed { .. } => stage.duration_ms = 0,
            RewriteOutcome::Omitted => {
                stage.duration_ms = 0;
                stage.kind = StageKind::Callback(Box::new(|| {}));
            }
        }
        stage
    }

    // -- C7: accessibility gate -------------------------------------------

    pub fn set_motion_policy(&mut self, sensitivity: MotionSensitivity) {
        self.motion_policy.set_sensitivity(sensitivity);
    }

    pub fn get_motion_policy(&self) -> MotionSensitivity {
        self.motion_policy.sensitivity()
    }

    pub fn register_animation_category_default(
        &mut self,
        category: AnimationCategory,
        default: CategoryDefault,
    ) {
        self.motion_policy.register_category_default(category, default);
    }

    // -- C8: quality ------------------------------------------------------

    pub fn get_quality_tier(&self) -> QualityTier {
        self.quality.tier()
    }

    /// `None` restores automatic detection.
    pub fn force_quality_tier(&mut self, tier: Option<QualityTier>) {
        self.quality.force_tier(tier);
    }

    pub fn on_quality_change(&mut self, cb: impl FnMut(QualityTier) + Send + 'static) {
        self.quality.on_quality_change(cb);
    }

    pub fn resample_quality(&mut self) {
        self.quality.resample();
    }

    pub fn quality_capabilities(&self) -> CapabilityFlags {
        self.quality.capabilities()
    }
}

fn gate_mode_effects(mode: ModeConfig, effects: EffectFlags) -> ModeConfig {
    match mode {
        ModeConfig::Spring(mut s) => {
            if !effects.contains(EffectFlags::TILT) {
                s.rotate_amplitude = 0.0;
            }
            if !effects.contains(EffectFlags::PARALLAX) {
                s.translate_amplitude = 0.0;
            }
            ModeConfig::Spring(s)
        }
        ModeConfig::Magnetic(mut m) => {
            if !effects.contains(EffectFlags::PARALLAX) {
                m.strength = 0.0;
            }
            ModeConfig::Magnetic(m)
        }
        other @ ModeConfig::Gesture(_) => other,
    }
}

fn strip_all_motion(mode: ModeConfig) -> ModeConfig {
    match mode {
        ModeConfig::Spring(mut s) => {
            s.translate_amplitude = 0.0;
            s.scale_amplitude = 0.0;
            s.rotate_amplitude = 0.0;
            ModeConfig::Spring(s)
        }
        ModeConfig::Magnetic(mut m) => {
            m.strength = 0.0;
            ModeConfig::Magnetic(m)
        }
        ModeConfig::Gesture(mut g) => {
            g.momentum_decay = 0.0;
            ModeConfig::Gesture(g)
        }
    }
}

/// Convenience bootstrap for tests: a manually-driven ticker, a generous
/// static quality probe, and an in-memory override store, matching the
/// `test_ticker()` idiom this workspace's other crates already use.
pub fn test_runtime() -> (
    GalileoRuntime<TestClock, ManualFrameSource, StaticEnvironmentProbe, InMemoryKvStore>,
    TestClock,
) {
    let clock = TestClock::new();
    let runtime = GalileoRuntime::new(
        clock.clone(),
        ManualFrameSource,
        StaticEnvironmentProbe::default(),
        InMemoryKvStore::default(),
        MotionPolicyConfig::default(),
    )
    .expect("default motion policy config is valid");
    (runtime, clock)
}

#[cfg(test)]
mod tests {
    use super::*;
    use galileo_interaction::{Rect, SpringModeConfig};
    use galileo_orchestrator::{PlaybackState, RecordingStyleSink};
    use galileo_physics::{BodyOptions, Shape};
    use glam::Vec2;

    #[test]
    fn create_engine_round_trips_a_body() {
        let (runtime, _clock) = test_runtime();
        let mut handle = runtime.create_engine(EngineConfig::default());
        let engine = handle.get_mut().unwrap();
        let id = engine
            .add_body(BodyOptions {
                shape: Shape::Circle { radius: 10.0 },
                ..Default::default()
            })
            .unwrap();
        assert!(engine.get_body(&id).is_some());
    }

    #[test]
    fn unmount_stops_and_disposes_an_engine_handle() {
        let (runtime, _clock) = test_runtime();
        let mut handle = runtime.create_engine(EngineConfig::default());
        handle.unmount();
        assert!(handle.is_disposed());
    }

    #[test]
    fn create_spring_is_never_gated_by_motion_policy() {
        let (mut runtime, _clock) = test_runtime();
        runtime.set_motion_policy(MotionSensitivity::High);
        let mut handle = runtime.create_spring(SpringConfig::gentle());
        let spring = handle.get_mut().unwrap();
        spring.update(100.0, Default::default());
        // A gated orchestrator stage at `high` sensitivity would collapse
        // straight to its target; a bare spring never does — `update` only
        // ever sets up a target for `step` to chase.
        assert_eq!(spring.current(), 0.0);
        assert!(!spring.is_settled());
    }

    #[test]
    fn high_sensitivity_omits_decorative_interaction() {
        let (mut runtime, _clock) = test_runtime();
        runtime.set_motion_policy(MotionSensitivity::High);
        let config = InteractionConfig {
            mode: ModeConfig::Spring(SpringModeConfig {
                spring: SpringConfig::default(),
                translate_amplitude: 20.0,
                scale_amplitude: 0.1,
                rotate_amplitude: 10.0,
            }),
            bounds: Rect::new(Vec2::ZERO, Vec2::new(100.0, 100.0)),
        };
        let handle = runtime.create_interaction(AnimationCategory::Decorative, config);
        assert!(handle.is_none());
    }

    #[test]
    fn essential_interaction_survives_high_sensitivity_untouched() {
        let (mut runtime, _clock) = test_runtime();
        runtime.set_motion_policy(MotionSensitivity::High);
        let config = InteractionConfig {
            mode: ModeConfig::Spring(SpringModeConfig {
                spring: SpringConfig::default(),
                translate_amplitude: 20.0,
                scale_amplitude: 0.1,
                rotate_amplitude: 10.0,
            }),
            bounds: Rect::new(Vec2::ZERO, Vec2::new(100.0, 100.0)),
        };
        let handle = runtime
            .create_interaction(AnimationCategory::Essential, config)
            .expect("essential category always plays");
        assert!(!handle.is_disposed());
    }

    #[test]
    fn low_sensitivity_strips_tilt_and_parallax_but_keeps_the_interaction() {
        let (mut runtime, _clock) = test_runtime();
        runtime.set_motion_policy(MotionSensitivity::Low);
        let config = InteractionConfig {
            mode: ModeConfig::Spring(SpringModeConfig {
                spring: SpringConfig::default(),
                translate_amplitude: 20.0,
                scale_amplitude: 0.1,
                rotate_amplitude: 10.0,
            }),
            bounds: Rect::new(Vec2::ZERO, Vec2::new(100.0, 100.0)),
        };
        let handle = runtime
            .create_interaction(AnimationCategory::Decorative, config)
            .expect("low sensitivity collapses effects, not the whole interaction");
        assert!(!handle.is_disposed());
    }

    #[test]
    fn decorative_stage_collapses_to_a_zero_duration_write_at_high_sensitivity() {
        let (mut runtime, _clock) = test_runtime();
        runtime.set_motion_policy(MotionSensitivity::High);
        let mut to = galileo_orchestrator::StyleMap::default();
        to.insert("y".into(), 0.0);
        let stage = Stage::style("slide-in", vec!["#toast".into()], to)
            .with_category(AnimationCategory::Decorative)
            .with_duration_ms(500);

        let mut handle = runtime
            .create_sequence(
                "toast",
                vec![stage],
                false,
                LoopMode::Never,
                AnimationCategory::Decorative,
                RecordingStyleSink::default(),
            )
            .expect("single stage, no cycle");
        let controller = handle.get_mut().unwrap();
        controller.play();
        // The stage's rewritten duration is 0, so a single 1ms tick both
        // writes its final style and completes the sequence — the original
        // 500ms stage would still be mid-flight here.
        controller.tick(1);
        assert_eq!(controller.state(), PlaybackState::Completed);
        assert_eq!(controller.progress(), 1.0);
    }

    #[test]
    fn quality_tier_can_be_forced_and_restored() {
        let (mut runtime, _clock) = test_runtime();
        let detected = runtime.get_quality_tier();
        runtime.force_quality_tier(Some(QualityTier::Minimal));
        assert_eq!(runtime.get_quality_tier(), QualityTier::Minimal);
        runtime.force_quality_tier(None);
        assert_eq!(runtime.get_quality_tier(), detected);
    }

    #[test]
    fn subscribe_and_tick_drive_a_listener() {
        use std::sync::{Arc, Mutex};
        let (mut runtime, _clock) = test_runtime();
        let calls = Arc::new(Mutex::new(0));
        let c = calls.clone();
        runtime.subscribe(move |_dt, _now| *c.lock().unwrap() += 1);
        runtime.tick(16);
        runtime.tick(32);
        assert_eq!(*calls.lock().unwrap(), 2);
    }
}
