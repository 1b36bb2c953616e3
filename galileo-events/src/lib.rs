//! Typed publish/subscribe event bus.
//!
//! Every consumer in this workspace (the physics world's collision events,
//! the orchestrator's stage lifecycle events, the interaction controller's
//! gesture events) needs to hand typed payloads to listeners without those
//! listeners knowing about each other. `EventBus` gives them one mechanism
//! with two dispatch modes:
//!
//! - [`EventBus::emit`] dispatches synchronously. The listener list for the
//!   event type is snapshotted before any handler runs, so a handler that
//!   subscribes or unsubscribes mid-dispatch cannot change who sees *this*
//!   emission — the classic "listener mutates listener list during dispatch"
//!   bug stays out of reach.
//! - [`EventBus::enqueue`] / [`EventBus::drain_queue`] defer dispatch to a
//!   caller-chosen point (typically once per tick), so producers upstream of
//!   a frame boundary never re-enter downstream systems mid-step.

use rustc_hash::FxHashMap;
use std::any::{Any, TypeId};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

/// Marker for anything that can travel through the bus.
pub trait Event: 'static + Send + Sync {}
impl<T: 'static + Send + Sync> Event for T {}

/// Intent tag carried by every animation request (springs, interactions,
/// orchestrator stages). Shared here rather than in any one of those crates
/// because the accessibility gate has to classify requests regardless of
/// which component originated them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnimationCategory {
    Essential,
    Transition,
    Feedback,
    Decorative,
    Entrance,
    Exit,
}

/// Opaque handle returned by [`EventBus::on`]; pass it to [`EventBus::off`]
/// to remove the subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler<E> = Box<dyn FnMut(&E) + Send>;

struct Listeners<E> {
    next_id: u64,
    handlers: Vec<(u64, Handler<E>)>,
}

impl<E> Default for Listeners<E> {
    fn default() -> Self {
        Self {
            next_id: 0,
            handlers: Vec::new(),
        }
    }
}

trait AnyListeners: Any + Send {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<E: Event> AnyListeners for Listeners<E> {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A typed, type-erased pub/sub bus with synchronous and queued dispatch.
#[derive(Default)]
pub struct EventBus {
    listeners: FxHashMap<TypeId, Box<dyn AnyListeners>>,
    queues: FxHashMap<TypeId, Box<dyn Any + Send>>,
    id_counter: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> u64 {
        self.id_counter.fetch_add(1, Ordering::Relaxed)
    }

    /// Subscribe a handler for `E`. Returns a token usable with [`Self::off`].
    pub fn on<E: Event>(&mut self, handler: impl FnMut(&E) + Send + 'static) -> SubscriptionId {
        let id = self.next_id();
        let slot = self
            .listeners
            .entry(TypeId::of::<E>())
            .or_insert_with(|| Box::new(Listeners::<E>::default()));
        let list = slot
            .as_any_mut()
            .downcast_mut::<Listeners<E>>()
            .expect("listener type tag matches TypeId key");
        list.handlers.push((id, Box::new(handler)));
        SubscriptionId(id)
    }

    /// Remove a previously registered subscription for `E`.
    ///
    /// No-op (and logged) if the subscription is already gone — callers may
    /// race an `off` against teardown without checking first.
    pub fn off<E: Event>(&mut self, id: SubscriptionId) {
        if let Some(slot) = self.listeners.get_mut(&TypeId::of::<E>()) {
            let list = slot
                .as_any_mut()
                .downcast_mut::<Listeners<E>>()
                .expect("listener type tag matches TypeId key");
            let before = list.handlers.len();
            list.handlers.retain(|(h, _)| *h != id.0);
            if list.handlers.len() == before {
                warn!("off() called with an unknown subscription id");
            }
        }
    }

    /// Dispatch `event` to every current subscriber of `E` synchronously.
    ///
    /// The handler list is snapshotted by index range before dispatch
    /// begins; handlers added during this call run on the *next* emission,
    /// not this one.
    pub fn emit<E: Event>(&mut self, event: E) {
        let Some(slot) = self.listeners.get_mut(&TypeId::of::<E>()) else {
            return;
        };
        let list = slot
            .as_any_mut()
            .downcast_mut::<Listeners<E>>()
            .expect("listener type tag matches TypeId key");
        let snapshot_len = list.handlers.len();
        for (_, handler) in list.handlers.iter_mut().take(snapshot_len) {
            handler(&event);
        }
    }

    /// Push `event` onto its type's queue without dispatching it.
    pub fn enqueue<E: Event>(&mut self, event: E) {
        let slot = self
            .queues
            .entry(TypeId::of::<E>())
            .or_insert_with(|| Box::new(VecDeque::<E>::new()));
        let queue = slot
            .downcast_mut::<VecDeque<E>>()
            .expect("queue type tag matches TypeId key");
        queue.push_back(event);
    }

    /// Dispatch every queued `E`, oldest first, then clear the queue.
    ///
    /// Events enqueued by a handler during this call are dispatched on the
    /// *next* `drain_queue::<E>()`, never the current one — draining takes
    /// ownership of the queue's contents up front.
    pub fn drain_queue<E: Event>(&mut self) {
        let Some(slot) = self.queues.get_mut(&TypeId::of::<E>()) else {
            return;
        };
        let queue = slot
            .downcast_mut::<VecDeque<E>>()
            .expect("queue type tag matches TypeId key");
        let drained: Vec<E> = queue.drain(..).collect();
        for event in drained {
            self.emit(event);
        }
    }

    /// Number of queued-but-undispatched `E` events.
    pub fn queued_len<E: Event>(&self) -> usize {
        self.queues
            .get(&TypeId::of::<E>())
            .and_then(|slot| slot.downcast_ref::<VecDeque<E>>())
            .map(|q| q.len())
            .unwrap_or(0)
    }

    /// Number of active subscribers for `E`.
    pub fn listener_count<E: Event>(&self) -> usize {
        self.listeners
            .get(&TypeId::of::<E>())
            .and_then(|slot| slot.as_any().downcast_ref::<Listeners<E>>())
            .map(|l| l.handlers.len())
            .unwrap_or(0)
    }
}
