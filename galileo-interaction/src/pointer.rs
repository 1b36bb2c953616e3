//! Device-agnostic pointer/touch/stylus normalization.
//!
//! Every input device this crate cares about — mouse, a single touch point,
//! a stylus — collapses to the same [`PointerEvent`] shape before it ever
//! reaches [`crate::controller::InteractionController`]. The controller
//! itself never branches on device kind; `kind` is carried through purely
//! for callers that want to distinguish a tap from a click.

use glam::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerKind {
    Mouse,
    Touch,
    Pen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerPhase {
    Down,
    Move,
    Up,
    Cancel,
}

/// A single normalized pointer sample, in the host's element-local
/// coordinate space (not normalized to `[-1,1]` — that conversion is
/// [`crate::controller::InteractionController`]'s job, since it depends on
/// the element's bounding rect).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    /// Distinguishes concurrent pointers (multi-touch); mouse/pen are id 0.
    pub id: u64,
    pub kind: PointerKind,
    pub phase: PointerPhase,
    pub position: Vec2,
}

/// An axis-aligned element bounding rect, the `point?`-adjacent measurement
/// the runtime is allowed to consume (bounding rectangles only — no layout
/// engine).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    pub fn half_extents(&self) -> Vec2 {
        (self.max - self.min) * 0.5
    }

    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.y >= self.min.y && point.y <= self.max.y
    }

    /// `point` mapped into `[-1, 1]^2` relative to this rect's center,
    /// clamped — the `relativePointer` contract in the crate docs.
    pub fn relative(&self, point: Vec2) -> Vec2 {
        let half = self.half_extents();
        let rel = point - self.center();
        Vec2::new(
            if half.x > 0.0 { (rel.x / half.x).clamp(-1.0, 1.0) } else { 0.0 },
            if half.y > 0.0 { (rel.y / half.y).clamp(-1.0, 1.0) } else { 0.0 },
        )
    }
}

/// Injection seam for a platform's raw event stream — "must be injected,
/// not sniffed globally" (spec §6). A host pushes normalized events through
/// this trait rather than the controller reaching for a platform API
/// itself. The `winit` feature provides [`crate::winit_adapter`] as one
/// concrete implementation; hosts without winit implement this directly.
pub trait PointerSource {
    fn poll(&mut self) -> Vec<PointerEvent>;
}

/// A source fed manually — the shape every test in this crate drives the
/// controller with, and a reasonable choice for hosts with their own event
/// loop that would rather call [`crate::controller::InteractionController::handle_pointer`]
/// directly instead of going through a `PointerSource`.
#[derive(Default)]
pub struct ManualPointerSource {
    pending: Vec<PointerEvent>,
}

impl ManualPointerSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: PointerEvent) {
        self.pending.push(event);
    }
}

impl PointerSource for ManualPointerSource {
    fn poll(&mut self) -> Vec<PointerEvent> {
        std::mem::take(&mut self.pending)
    }
}
