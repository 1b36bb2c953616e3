//! The three interaction modes a controller can be configured with.
//!
//! A mode is pure configuration — the behavior lives in
//! [`crate::controller::InteractionController`], which narrows on the tag
//! the same way [`galileo_physics::Shape`] and an orchestrator
//! [`galileo_orchestrator::stage::StageKind`] are narrowed, never matched
//! structurally.

use galileo_springs::SpringConfig;

use crate::pointer::Rect;

/// `spring`: return-to-origin. Pressing offsets translate/scale/rotate
/// toward the pointer by the configured amplitudes; releasing springs back
/// to the rest pose.
#[derive(Debug, Clone, Copy)]
pub struct SpringModeConfig {
    pub spring: SpringConfig,
    pub translate_amplitude: f32,
    pub scale_amplitude: f32,
    pub rotate_amplitude: f32,
}

/// `magnetic`: attract (`strength > 0`) or repel (`strength < 0`) within
/// `radius` of the element's center, falling off linearly to zero at the
/// radius boundary.
#[derive(Debug, Clone, Copy)]
pub struct MagneticModeConfig {
    pub spring: SpringConfig,
    pub radius: f32,
    pub strength: f32,
}

/// `gesture`: pan/swipe with momentum decay after release, optional
/// two-pointer pinch (scale) and rotate, and an optional bounding rect that
/// clamps the body's translated position.
#[derive(Debug, Clone, Copy)]
pub struct GestureModeConfig {
    /// Per-tick velocity multiplier applied after release, in `(0, 1]`.
    /// `1.0` means no decay (coasts forever); values near `0` stop almost
    /// immediately.
    pub momentum_decay: f32,
    pub bounds: Option<Rect>,
}

impl Default for GestureModeConfig {
    fn default() -> Self {
        Self {
            momentum_decay: 0.9,
            bounds: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum ModeConfig {
    Spring(SpringModeConfig),
    Magnetic(MagneticModeConfig),
    Gesture(GestureModeConfig),
}
