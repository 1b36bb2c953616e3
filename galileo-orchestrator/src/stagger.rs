//! Fan-out patterns for [`crate::stage::StageKind::Stagger`]. Each pattern
//! maps a target's index to a real-valued rank; the stage's per-target delay
//! is `rank * stagger_delay_ms`.

/// Angular frequency used by the `Wave` pattern. Chosen so a 5-target fan-out
/// produces a visibly non-monotonic rank ordering without wrapping past a
/// full cycle for sequences under ~12 targets.
const WAVE_OMEGA: f32 = 0.6;

#[derive(Clone, Copy)]
pub enum StaggerPattern {
    Sequential,
    Reverse,
    FromCenter,
    FromEdges,
    Wave,
    Custom(fn(usize, usize) -> f32),
}

impl std::fmt::Debug for StaggerPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StaggerPattern::Sequential => write!(f, "Sequential"),
            StaggerPattern::Reverse => write!(f, "Reverse"),
            StaggerPattern::FromCenter => write!(f, "FromCenter"),
            StaggerPattern::FromEdges => write!(f, "FromEdges"),
            StaggerPattern::Wave => write!(f, "Wave"),
            StaggerPattern::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// Rank of target `index` out of `count` total targets, for `pattern`.
pub fn stagger_rank(pattern: &StaggerPattern, index: usize, count: usize) -> f32 {
    if count <= 1 {
        return 0.0;
    }
    let mid = (count - 1) as f32 / 2.0;
    match pattern {
        StaggerPattern::Sequential => index as f32,
        StaggerPattern::Reverse => (count - 1 - index) as f32,
        StaggerPattern::FromCenter => (index as f32 - mid).abs(),
        StaggerPattern::FromEdges => mid - (index as f32 - mid).abs(),
        StaggerPattern::Wave => (index as f32 * (index as f32 * WAVE_OMEGA).sin()).abs().round(),
        StaggerPattern::Custom(f) => f(index, count),
    }
}
