//! [`InteractionController`]: maps a normalized pointer stream onto a
//! transform, per [`ModeConfig`].
//!
//! The controller owns no rendering state — it produces an
//! [`InteractionState`] snapshot each tick that the host writes to whatever
//! it renders. It never reads a platform API directly; pointer samples
//! arrive through [`crate::pointer::PointerSource::poll`] or
//! [`InteractionController::handle_pointer`] called straight by the host.

use std::collections::HashMap;

use galileo_springs::{ScalarSpring, SpringConfig, UpdateOpts, VectorSpring};
use glam::{Vec2, Vec3};

use crate::modes::{GestureModeConfig, MagneticModeConfig, ModeConfig, SpringModeConfig};
use crate::pointer::{PointerEvent, PointerPhase, Rect};

/// Per-tick transform snapshot. `relative_pointer` is always populated —
/// even while nothing is pressed and even for a controller with no active
/// pointer inside its bounds, it just reports the last-known sample mapped
/// into `[-1,1]^2`, matching spec's "computed for every body, including
/// static ones" contract.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InteractionState {
    pub translate: Vec3,
    pub scale: f32,
    pub rotate: Vec3,
    pub is_hovered: bool,
    pub is_pressed: bool,
    pub relative_pointer: Vec2,
}

impl Default for InteractionState {
    fn default() -> Self {
        Self {
            translate: Vec3::ZERO,
            scale: 1.0,
            rotate: Vec3::ZERO,
            is_hovered: false,
            is_pressed: false,
            relative_pointer: Vec2::ZERO,
        }
    }
}

pub struct InteractionConfig {
    pub mode: ModeConfig,
    pub bounds: Rect,
}

struct ActivePointer {
    position: Vec2,
}

pub struct InteractionController {
    mode: ModeConfig,
    bounds: Rect,

    translate_spring: VectorSpring<3>,
    scale_spring: ScalarSpring,
    rotate_spring: VectorSpring<3>,

    body_position: Vec2,
    gesture_velocity: Vec2,
    gesture_scale: f32,
    gesture_rotate_z: f32,

    active_pointers: HashMap<u64, ActivePointer>,
    pinch_baseline: Option<(f32, f32)>, // (distance, angle) at gesture start

    is_hovered: bool,
    is_pressed: bool,
    relative_pointer: Vec2,
    detached: bool,
}

impl InteractionController {
    pub fn new(config: InteractionConfig) -> Self {
        let spring_config = match &config.mode {
            ModeConfig::Spring(s) => s.spring,
            ModeConfig::Magnetic(m) => m.spring,
            ModeConfig::Gesture(_) => SpringConfig::new(170.0, 1.0),
        };
        let mut translate_spring = VectorSpring::new(spring_config);
        let mut scale_spring = ScalarSpring::new(spring_config);
        let mut rotate_spring = VectorSpring::new(spring_config);
        translate_spring.set([0.0, 0.0, 0.0]);
        scale_spring.set(1.0);
        rotate_spring.set([0.0, 0.0, 0.0]);

        Self {
            mode: config.mode,
            bounds: config.bounds,
            translate_spring,
            scale_spring,
            rotate_spring,
            body_position: Vec2::ZERO,
            gesture_velocity: Vec2::ZERO,
            gesture_scale: 1.0,
            gesture_rotate_z: 0.0,
            active_pointers: HashMap::new(),
            pinch_baseline: None,
            is_hovered: false,
            is_pressed: false,
            relative_pointer: Vec2::ZERO,
            detached: false,
        }
    }

    /// Feed one normalized pointer sample. Ignored once [`Self::detach`]
    /// has been called — a detached controller is inert, matching the
    /// unmount ⇒ stop ⇒ dispose lifecycle the facade crate enforces on
    /// every per-element adapter.
    pub fn handle_pointer(&mut self, event: PointerEvent) {
        if self.detached {
            return;
        }
        self.relative_pointer = self.bounds.relative(event.position);
        self.is_hovered = self.bounds.contains(event.position);

        match event.phase {
            PointerPhase::Down => {
                self.active_pointers.insert(event.id, ActivePointer { position: event.position });
                if self.is_hovered {
                    self.is_pressed = true;
                }
                self.on_down();
            }
            PointerPhase::Move => {
                let prev = self.active_pointers.get(&event.id).map(|p| p.position);
                if let Some(p) = self.active_pointers.get_mut(&event.id) {
                    p.position = event.position;
                }
                if self.is_pressed || self.active_pointers.len() > 1 {
                    self.on_move(event.position, prev.unwrap_or(event.position));
                }
            }
            PointerPhase::Up | PointerPhase::Cancel => {
                self.active_pointers.remove(&event.id);
                self.pinch_baseline = None;
                if self.active_pointers.is_empty() {
                    self.is_pressed = false;
                    self.on_release();
                }
            }
        }
    }

    /// Advance all mode-internal motion — springs for `spring`/`magnetic`,
    /// momentum decay for `gesture`. Call once per frame tick, same
    /// cooperative-scheduling contract as the rest of this workspace.
    pub fn tick(&mut self, dt_ms: u64) {
        if self.detached {
            return;
        }
        match &self.mode {
            ModeConfig::Spring(_) | ModeConfig::Magnetic(_) => {
                self.translate_spring.step(dt_ms);
                self.rotate_spring.step(dt_ms);
                self.scale_spring.step(dt_ms);
            }
            ModeConfig::Gesture(cfg) => {
                if !self.is_pressed {
                    self.body_position += self.gesture_velocity * (dt_ms as f32 / 1000.0);
                    self.gesture_velocity *= cfg.momentum_decay;
                    if let Some(bounds) = cfg.bounds {
                        self.clamp_to_bounds(bounds);
                    }
                }
            }
        }
    }

    pub fn state(&self) -> InteractionState {
        let (translate, scale, rotate) = match &self.mode {
            ModeConfig::Spring(_) | ModeConfig::Magnetic(_) => {
                let t = self.translate_spring.current();
                let r = self.rotate_spring.current();
                (
                    Vec3::new(t[0] as f32, t[1] as f32, t[2] as f32),
                    self.scale_spring.current() as f32,
                    Vec3::new(r[0] as f32, r[1] as f32, r[2] as f32),
                )
            }
            ModeConfig::Gesture(_) => (
                Vec3::new(self.body_position.x, self.body_position.y, 0.0),
                self.gesture_scale,
                Vec3::new(0.0, 0.0, self.gesture_rotate_z),
            ),
        };
        InteractionState {
            translate,
            scale,
            rotate,
            is_hovered: self.is_hovered,
            is_pressed: self.is_pressed,
            relative_pointer: self.relative_pointer,
        }
    }

    /// Stop reacting to input and halt all motion in place. Idempotent —
    /// a second call is a no-op, matching the double-dispose guarantee the
    /// facade crate requires of every per-element adapter.
    pub fn detach(&mut self) {
        if self.detached {
            return;
        }
        self.translate_spring.stop();
        self.rotate_spring.stop();
        self.scale_spring.stop();
        self.gesture_velocity = Vec2::ZERO;
        self.active_pointers.clear();
        self.detached = true;
    }

    fn on_down(&mut self) {
        if let ModeConfig::Spring(cfg) = &self.mode {
            self.drive_spring_targets(*cfg);
        }
        if let ModeConfig::Gesture(_) = &self.mode {
            self.gesture_velocity = Vec2::ZERO;
        }
    }

    fn on_move(&mut self, position: Vec2, prev: Vec2) {
        match &self.mode {
            ModeConfig::Spring(cfg) => self.drive_spring_targets(*cfg),
            ModeConfig::Magnetic(cfg) => self.drive_magnetic_target(*cfg, position),
            ModeConfig::Gesture(cfg) => self.drive_gesture(*cfg, position, prev),
        }
    }

    fn on_release(&mut self) {
        match &self.mode {
            ModeConfig::Spring(_) => {
                self.translate_spring.update([0.0, 0.0, 0.0], UpdateOpts::default());
                self.rotate_spring.update([0.0, 0.0, 0.0], UpdateOpts::default());
                self.scale_spring.update(1.0, UpdateOpts::default());
            }
            ModeConfig::Magnetic(_) => {
                self.translate_spring.update([0.0, 0.0, 0.0], UpdateOpts::default());
            }
            ModeConfig::Gesture(_) => {}
        }
    }

    fn drive_spring_targets(&mut self, cfg: SpringModeConfig) {
        let rel = self.relative_pointer;
        self.translate_spring.update(
            [
                (rel.x * cfg.translate_amplitude) as f64,
                (rel.y * cfg.translate_amplitude) as f64,
                0.0,
            ],
            UpdateOpts::default(),
        );
        self.rotate_spring.update(
            [
                (rel.y * cfg.rotate_amplitude) as f64,
                (-rel.x * cfg.rotate_amplitude) as f64,
                0.0,
            ],
            UpdateOpts::default(),
        );
        self.scale_spring.update(1.0 + cfg.scale_amplitude as f64, UpdateOpts::default());
    }

    fn drive_magnetic_target(&mut self, cfg: MagneticModeConfig, pointer: Vec2) {
        let center = self.bounds.center();
        let offset = pointer - center;
        let dist = offset.length();
        if dist < cfg.radius && dist > f32::EPSILON {
            let influence = 1.0 - dist / cfg.radius;
            let target = offset * (influence * cfg.strength / dist);
            self.translate_spring.update(
                [target.x as f64, target.y as f64, 0.0],
                UpdateOpts::default(),
            );
        } else {
            self.translate_spring.update([0.0, 0.0, 0.0], UpdateOpts::default());
        }
    }

    fn drive_gesture(&mut self, cfg: GestureModeConfig, position: Vec2, prev: Vec2) {
        if self.active_pointers.len() >= 2 {
            self.apply_pinch_rotate();
            return;
        }
        let delta = position - prev;
        self.body_position += delta;
        self.gesture_velocity = delta;
        if let Some(bounds) = cfg.bounds {
            self.clamp_to_bounds(bounds);
        }
    }

    fn apply_pinch_rotate(&mut self) {
        let mut positions: Vec<Vec2> = self.active_pointers.values().map(|p| p.position).collect();
        if positions.len() < 2 {
            return;
        }
        positions.truncate(2);
        let a = positions[0];
        let b = positions[1];
        let dist = a.distance(b);
        let angle = (b - a).y.atan2((b - a).x);

        match self.pinch_baseline {
            None => self.pinch_baseline = Some((dist, angle)),
            Some((base_dist, base_angle)) => {
                if base_dist > f32::EPSILON {
                    self.gesture_scale = dist / base_dist;
                }
                self.gesture_rotate_z = angle - base_angle;
            }
        }
    }

    fn clamp_to_bounds(&mut self, bounds: Rect) {
        let half = bounds.half_extents();
        let clamped = Vec2::new(
            self.body_position.x.clamp(-half.x, half.x),
            self.body_position.y.clamp(-half.y, half.y),
        );
        if clamped.x != self.body_position.x {
            self.gesture_velocity.x = 0.0;
        }
        if clamped.y != self.body_position.y {
            self.gesture_velocity.y = 0.0;
        }
        self.body_position = clamped;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use galileo_springs::presets;

    fn bounds() -> Rect {
        Rect::new(Vec2::new(0.0, 0.0), Vec2::new(100.0, 100.0))
    }

    fn event(id: u64, phase: PointerPhase, x: f32, y: f32) -> PointerEvent {
        PointerEvent {
            id,
            kind: crate::pointer::PointerKind::Mouse,
            phase,
            position: Vec2::new(x, y),
        }
    }

    #[test]
    fn spring_mode_presses_toward_pointer_and_returns_on_release() {
        let mut ctrl = InteractionController::new(InteractionConfig {
            mode: ModeConfig::Spring(SpringModeConfig {
                spring: presets::stiff(),
                translate_amplitude: 10.0,
                scale_amplitude: 0.1,
                rotate_amplitude: 5.0,
            }),
            bounds: bounds(),
        });

        ctrl.handle_pointer(event(0, PointerPhase::Down, 100.0, 50.0));
        for _ in 0..200 {
            ctrl.tick(8);
        }
        let pressed_state = ctrl.state();
        assert!(pressed_state.is_pressed);
        assert!(pressed_state.translate.x > 0.0, "should drift toward the pointer");

        ctrl.handle_pointer(event(0, PointerPhase::Up, 100.0, 50.0));
        for _ in 0..400 {
            ctrl.tick(8);
        }
        let released_state = ctrl.state();
        assert!(!released_state.is_pressed);
        assert!(released_state.translate.x.abs() < 0.5, "should spring back toward origin");
    }

    #[test]
    fn magnetic_mode_pulls_within_radius_and_releases_outside() {
        let mut ctrl = InteractionController::new(InteractionConfig {
            mode: ModeConfig::Magnetic(MagneticModeConfig {
                spring: presets::default(),
                radius: 50.0,
                strength: 20.0,
            }),
            bounds: bounds(),
        });

        ctrl.handle_pointer(event(0, PointerPhase::Down, 60.0, 50.0));
        ctrl.handle_pointer(event(0, PointerPhase::Move, 60.0, 50.0));
        for _ in 0..200 {
            ctrl.tick(8);
        }
        assert!(ctrl.state().translate.length() > 0.0);

        ctrl.handle_pointer(event(0, PointerPhase::Move, 500.0, 500.0));
        for _ in 0..200 {
            ctrl.tick(8);
        }
        assert!(ctrl.state().translate.length() < 1.0);
    }

    #[test]
    fn gesture_mode_pans_by_drag_delta_and_coasts_on_release() {
        let mut ctrl = InteractionController::new(InteractionConfig {
            mode: ModeConfig::Gesture(GestureModeConfig {
                momentum_decay: 0.95,
                bounds: None,
            }),
            bounds: bounds(),
        });

        ctrl.handle_pointer(event(0, PointerPhase::Down, 10.0, 10.0));
        ctrl.handle_pointer(event(0, PointerPhase::Move, 20.0, 10.0));
        assert_eq!(ctrl.state().translate.x, 10.0);

        ctrl.handle_pointer(event(0, PointerPhase::Up, 20.0, 10.0));
        let before_coast = ctrl.state().translate.x;
        ctrl.tick(16);
        assert!(ctrl.state().translate.x > before_coast, "should coast forward on release");
    }

    #[test]
    fn gesture_mode_clamps_to_bounds_and_zeroes_velocity_at_edge() {
        let mut ctrl = InteractionController::new(InteractionConfig {
            mode: ModeConfig::Gesture(GestureModeConfig {
                momentum_decay: 0.95,
                bounds: Some(Rect::new(Vec2::new(-5.0, -5.0), Vec2::new(5.0, 5.0))),
            }),
            bounds: bounds(),
        });

        ctrl.handle_pointer(event(0, PointerPhase::Down, 0.0, 0.0));
        ctrl.handle_pointer(event(0, PointerPhase::Move, 1000.0, 0.0));
        assert!(ctrl.state().translate.x <= 5.0);
    }

    #[test]
    fn detach_is_idempotent_and_halts_motion() {
        let mut ctrl = InteractionController::new(InteractionConfig {
            mode: ModeConfig::Spring(SpringModeConfig {
                spring: presets::stiff(),
                translate_amplitude: 10.0,
                scale_amplitude: 0.1,
                rotate_amplitude: 5.0,
            }),
            bounds: bounds(),
        });
        ctrl.handle_pointer(event(0, PointerPhase::Down, 100.0, 50.0));
        ctrl.tick(16);

        ctrl.detach();
        let state_after_first_detach = ctrl.state();
        ctrl.detach();
        ctrl.handle_pointer(event(0, PointerPhase::Move, 0.0, 0.0));
        ctrl.tick(16);
        assert_eq!(ctrl.state(), state_after_first_detach);
    }

    #[test]
    fn relative_pointer_is_reported_even_without_a_press() {
        let mut ctrl = InteractionController::new(InteractionConfig {
            mode: ModeConfig::Spring(SpringModeConfig {
                spring: presets::default(),
                translate_amplitude: 10.0,
                scale_amplitude: 0.1,
                rotate_amplitude: 5.0,
            }),
            bounds: bounds(),
        });
        ctrl.handle_pointer(event(0, PointerPhase::Move, 75.0, 50.0));
        assert_eq!(ctrl.state().relative_pointer, Vec2::new(0.5, 0.0));
        assert!(!ctrl.state().is_pressed);
    }
}
