//! Per-element adapters: one handle per UI element, each memoizing a single
//! engine/spring/interaction/sequence instance for that element's lifetime.
//!
//! The contract is the one the facade promises the rest of this workspace:
//! `unmount ⇒ stop() ⇒ dispose()`, `dispose` is idempotent, and once disposed
//! a handle never touches the thing it wrapped again — later calls just see
//! `None` rather than resurrecting or panicking.

use galileo_interaction::InteractionController;
use galileo_orchestrator::{SequenceController, StyleSink};
use galileo_physics::PhysicsEngine;
use galileo_springs::{ScalarSpring, VectorSpring};

/// Things an [`ElementHandle`] knows how to stop before it drops them.
/// Implemented here rather than on the wrapped types themselves, since
/// "stop" means something different for each: halting a physics loop,
/// freezing a spring in place, releasing an active pointer, halting
/// playback.
pub trait Lifecycle: Send {
    fn stop(&mut self);
}

impl Lifecycle for PhysicsEngine {
    fn stop(&mut self) {
        PhysicsEngine::stop(self)
    }
}

impl Lifecycle for ScalarSpring {
    fn stop(&mut self) {
        ScalarSpring::stop(self)
    }
}

impl<const N: usize> Lifecycle for VectorSpring<N> {
    fn stop(&mut self) {
        VectorSpring::<N>::stop(self)
    }
}

impl Lifecycle for InteractionController {
    fn stop(&mut self) {
        // No dedicated "stop" on the controller itself; detaching releases
        // whatever pointer it's tracking and freezes its springs in place,
        // which is the interaction-mode equivalent of halting playback.
        self.detach()
    }
}

impl<S: StyleSink> Lifecycle for SequenceController<S> {
    fn stop(&mut self) {
        SequenceController::stop(self)
    }
}

/// A scoped handle to one engine/spring/interaction/sequence, owned by
/// whatever UI element created it. `None` once disposed; every accessor
/// reflects that instead of panicking, so a host that races a late frame
/// callback against an unmount sees a no-op rather than a crash.
pub struct ElementHandle<T: Lifecycle> {
    inner: Option<T>,
}

impl<T: Lifecycle> ElementHandle<T> {
    pub(crate) fn new(inner: T) -> Self {
        Self { inner: Some(inner) }
    }

    pub fn get(&self) -> Option<&T> {
        self.inner.as_ref()
    }

    pub fn get_mut(&mut self) -> Option<&mut T> {
        self.inner.as_mut()
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.is_none()
    }

    /// Halts whatever this handle wraps without releasing it — a paused
    /// element can still be inspected, just not driven further.
    pub fn stop(&mut self) {
        if let Some(inner) = self.inner.as_mut() {
            inner.stop();
        }
    }

    /// Releases the wrapped value. Idempotent: disposing an already-disposed
    /// handle is a no-op, never a double-stop or a panic.
    pub fn dispose(&mut self) {
        self.inner = None;
    }

    /// The full `unmount` contract: stop, then dispose.
    pub fn unmount(&mut self) {
        self.stop();
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use galileo_springs::{ScalarSpring, SpringConfig, UpdateOpts};

    #[test]
    fn unmount_stops_then_disposes() {
        let mut spring = ScalarSpring::new(SpringConfig::default());
        spring.update(10.0, UpdateOpts::default());
        let mut handle = ElementHandle::new(spring);

        assert!(handle.get().is_some());
        handle.unmount();
        assert!(handle.is_disposed());
        assert!(handle.get().is_none());
        assert!(handle.get_mut().is_none());
    }

    #[test]
    fn double_dispose_is_idempotent() {
        let mut handle = ElementHandle::new(ScalarSpring::new(SpringConfig::default()));
        handle.dispose();
        handle.dispose();
        assert!(handle.is_disposed());
    }

    #[test]
    fn stop_without_dispose_leaves_handle_inspectable() {
        let mut handle = ElementHandle::new(ScalarSpring::new(SpringConfig::default()));
        handle.stop();
        assert!(!handle.is_disposed());
        assert!(handle.get().is_some());
    }
}
