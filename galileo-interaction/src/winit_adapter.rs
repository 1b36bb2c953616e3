//! Converts `winit` window events into this crate's normalized
//! [`PointerEvent`] stream. Gated behind the `winit` feature so a host with
//! its own windowing stack never pulls `winit` in transitively.

use glam::Vec2;
use winit::event::{ElementState, MouseButton, Touch, TouchPhase, WindowEvent};

use crate::pointer::{PointerEvent, PointerKind, PointerPhase, PointerSource};

/// Feeds [`WindowEvent`]s in through [`Self::handle_window_event`] as the
/// host's event loop receives them, then drains the normalized queue via
/// [`PointerSource::poll`] the same tick.
#[derive(Default)]
pub struct WinitPointerSource {
    last_cursor_position: Vec2,
    mouse_down: bool,
    pending: Vec<PointerEvent>,
}

impl WinitPointerSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle_window_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::CursorMoved { position, .. } => {
                self.last_cursor_position = Vec2::new(position.x as f32, position.y as f32);
                if self.mouse_down {
                    self.push(0, PointerKind::Mouse, PointerPhase::Move, self.last_cursor_position);
                }
            }
            WindowEvent::MouseInput { state, button: MouseButton::Left, .. } => {
                let phase = match state {
                    ElementState::Pressed => {
                        self.mouse_down = true;
                        PointerPhase::Down
                    }
                    ElementState::Released => {
                        self.mouse_down = false;
                        PointerPhase::Up
                    }
                };
                self.push(0, PointerKind::Mouse, phase, self.last_cursor_position);
            }
            WindowEvent::Touch(Touch { id, phase, location, .. }) => {
                let position = Vec2::new(location.x as f32, location.y as f32);
                let mapped = match phase {
                    TouchPhase::Started => PointerPhase::Down,
                    TouchPhase::Moved => PointerPhase::Move,
                    TouchPhase::Ended => PointerPhase::Up,
                    TouchPhase::Cancelled => PointerPhase::Cancel,
                };
                // Touch ids start at 1 so they never collide with the
                // reserved mouse/pen id 0.
                self.push(id.wrapping_add(1), PointerKind::Touch, mapped, position);
            }
            _ => {}
        }
    }

    fn push(&mut self, id: u64, kind: PointerKind, phase: PointerPhase, position: Vec2) {
        self.pending.push(PointerEvent { id, kind, phase, position });
    }
}

impl PointerSource for WinitPointerSource {
    fn poll(&mut self) -> Vec<PointerEvent> {
        std::mem::take(&mut self.pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::dpi::PhysicalPosition;
    use winit::event::DeviceId;

    #[test]
    fn mouse_drag_emits_down_move_up() {
        let mut source = WinitPointerSource::new();
        source.handle_window_event(&WindowEvent::CursorMoved {
            device_id: unsafe { DeviceId::dummy() },
            position: PhysicalPosition::new(10.0, 10.0),
        });
        source.handle_window_event(&WindowEvent::MouseInput {
            device_id: unsafe { DeviceId::dummy() },
            state: ElementState::Pressed,
            button: MouseButton::Left,
        });
        source.handle_window_event(&WindowEvent::CursorMoved {
            device_id: unsafe { DeviceId::dummy() },
            position: PhysicalPosition::new(20.0, 10.0),
        });
        source.handle_window_event(&WindowEvent::MouseInput {
            device_id: unsafe { DeviceId::dummy() },
            state: ElementState::Released,
            button: MouseButton::Left,
        });

        let events = source.poll();
        let phases: Vec<PointerPhase> = events.iter().map(|e| e.phase).collect();
        assert_eq!(phases, vec![PointerPhase::Down, PointerPhase::Move, PointerPhase::Up]);
        assert!(events.iter().all(|e| e.id == 0));
    }
}
