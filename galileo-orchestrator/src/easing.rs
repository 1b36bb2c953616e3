//! Normalized-progress easing curves. `apply` always receives `u` clamped to
//! `[0, 1]` by the caller.

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Easing {
    Linear,
    EaseInQuad,
    EaseOutQuad,
    EaseInOutQuad,
    EaseInCubic,
    EaseOutCubic,
    EaseInOutCubic,
}

impl Default for Easing {
    fn default() -> Self {
        Easing::Linear
    }
}

impl Easing {
    pub fn apply(&self, u: f32) -> f32 {
        let u = u.clamp(0.0, 1.0);
        match self {
            Easing::Linear => u,
            Easing::EaseInQuad => u * u,
            Easing::EaseOutQuad => 1.0 - (1.0 - u) * (1.0 - u),
            Easing::EaseInOutQuad => {
                if u < 0.5 {
                    2.0 * u * u
                } else {
                    1.0 - (-2.0 * u + 2.0).powi(2) / 2.0
                }
            }
            Easing::EaseInCubic => u * u * u,
            Easing::EaseOutCubic => 1.0 - (1.0 - u).powi(3),
            Easing::EaseInOutCubic => {
                if u < 0.5 {
                    4.0 * u * u * u
                } else {
                    1.0 - (-2.0 * u + 2.0).powi(3) / 2.0
                }
            }
        }
    }
}
