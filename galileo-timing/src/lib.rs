//! A single monotonic clock and frame ticker shared by the whole runtime.
//!
//! Every subsystem that needs "time" — the physics stepper, spring updates,
//! the orchestrator's per-stage progress — reads it through one [`Ticker`]
//! rather than sampling a platform clock directly, so tests can swap in a
//! [`TestClock`] and drive the whole runtime with manual `tick()` calls, the
//! same way the physics benchmarks in this workspace manually call `step()`
//! in a loop instead of running a real frame loop.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error};

/// Lower/upper clamp applied to every computed `dt`, in milliseconds.
pub const MIN_DT_MS: u64 = 1;
pub const MAX_DT_MS: u64 = 50;

/// Source of monotonic time. Implementations must never go backwards.
pub trait MonotonicClock: Send {
    fn now_ms(&self) -> u64;
}

/// Wall-clock implementation backed by [`Instant`].
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

/// Manually advanced clock for tests, matching the manual `step()` idiom
/// used throughout this workspace's test suites.
#[derive(Clone, Default)]
pub struct TestClock {
    now: Arc<AtomicU64>,
}

impl TestClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn set(&self, ms: u64) {
        self.now.store(ms, Ordering::SeqCst);
    }
}

impl MonotonicClock for TestClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// An injectable frame-loop driver. The ticker calls [`resume`] when the
/// subscriber count transitions 0→1 and [`pause`] on the 1→0 transition;
/// the implementation decides what "pause" means for its host environment
/// (stop a `requestAnimationFrame` loop, stop a timer, etc). A host with no
/// real frame loop — e.g. an embedding that drives `Ticker::tick` manually —
/// can use [`ManualFrameSource`], whose pause/resume are no-ops.
pub trait FrameSource: Send {
    fn resume(&mut self);
    fn pause(&mut self);
}

/// No-op frame source for hosts (and all of this workspace's tests) that
/// drive the ticker by calling [`Ticker::tick`] directly.
#[derive(Default)]
pub struct ManualFrameSource;

impl FrameSource for ManualFrameSource {
    fn resume(&mut self) {}
    fn pause(&mut self) {}
}

/// Handle returned by [`Ticker::subscribe`]; pass to [`Ticker::unsubscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionHandle(usize);

type Listener = Box<dyn FnMut(u64, u64) + Send>;

/// One ticker per process. Dispatches `(dt_ms, now_ms)` to subscribers in
/// registration order on every [`tick`](Ticker::tick).
pub struct Ticker<C: MonotonicClock, F: FrameSource> {
    clock: C,
    frame_source: F,
    listeners: Vec<Option<Listener>>,
    active_count: usize,
    last_tick_ms: Option<u64>,
}

impl<C: MonotonicClock, F: FrameSource> Ticker<C, F> {
    pub fn new(clock: C, frame_source: F) -> Self {
        Self {
            clock,
            frame_source,
            listeners: Vec::new(),
            active_count: 0,
            last_tick_ms: None,
        }
    }

    pub fn now(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Register a frame listener, called as `cb(dt_ms, now_ms)`.
    ///
    /// Resumes the underlying frame source if this is the first subscriber.
    pub fn subscribe(&mut self, cb: impl FnMut(u64, u64) + Send + 'static) -> SubscriptionHandle {
        let slot = self.listeners.iter().position(|l| l.is_none());
        let index = match slot {
            Some(i) => {
                self.listeners[i] = Some(Box::new(cb));
                i
            }
            None => {
                self.listeners.push(Some(Box::new(cb)));
                self.listeners.len() - 1
            }
        };
        self.active_count += 1;
        if self.active_count == 1 {
            self.frame_source.resume();
        }
        SubscriptionHandle(index)
    }

    /// Unsubscribe. Guaranteed the callback is not invoked after this
    /// returns, even if called from inside another listener during a tick.
    pub fn unsubscribe(&mut self, handle: SubscriptionHandle) {
        if let Some(slot) = self.listeners.get_mut(handle.0) {
            if slot.take().is_some() {
                self.active_count = self.active_count.saturating_sub(1);
                if self.active_count == 0 {
                    self.frame_source.pause();
                }
            }
        }
    }

    /// Advance the ticker to `now_ms`, dispatching a clamped `dt` to every
    /// subscriber in registration order. A listener that panics is caught
    /// and logged; later listeners still run.
    pub fn tick(&mut self, now_ms: u64) {
        let dt = match self.last_tick_ms {
            Some(last) => now_ms.saturating_sub(last).clamp(MIN_DT_MS, MAX_DT_MS),
            None => MIN_DT_MS,
        };
        self.last_tick_ms = Some(now_ms);

        // Snapshot-by-index: listeners registered during this tick (from
        // inside another listener) run on the *next* tick, not this one.
        let len = self.listeners.len();
        for i in 0..len {
            let Some(listener) = self.listeners[i].as_mut() else {
                continue;
            };
            let result = catch_unwind(AssertUnwindSafe(|| listener(dt, now_ms)));
            if let Err(payload) = result {
                error!("timing listener panicked: {:?}", panic_message(&payload));
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.active_count
    }
}

fn panic_message(payload: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}

/// Convenience for hosts without a real frame source: wires a [`TestClock`]
/// to a [`ManualFrameSource`], matching the `pw.step()`-in-a-loop idiom.
pub fn test_ticker() -> (Ticker<TestClock, ManualFrameSource>, TestClock) {
    let clock = TestClock::new();
    let ticker = Ticker::new(clock.clone(), ManualFrameSource);
    debug!("constructed test ticker");
    (ticker, clock)
}
