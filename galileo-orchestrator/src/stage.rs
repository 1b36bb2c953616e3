//! [`Stage`] and its tagged [`StageKind`] variants — the node type of an
//! orchestrated [`crate::sequence::Sequence`].

use crate::easing::Easing;
use crate::stagger::StaggerPattern;
use galileo_events::AnimationCategory;
use rustc_hash::FxHashMap;

pub type StageId = String;

/// Numeric style properties keyed by name (`"x"`, `"opacity"`, `"scale"`,
/// ...). Non-numeric properties are out of scope, per crate docs.
pub type StyleMap = FxHashMap<String, f32>;

/// Tagged variant, narrowed on the tag by the controller's tick loop —
/// never matched structurally.
pub enum StageKind {
    /// Interpolates `targets` from `from` (sampled live at the stage's first
    /// tick when omitted) to `to` over the stage's duration.
    Style {
        targets: Vec<String>,
        from: Option<StyleMap>,
        to: StyleMap,
    },
    /// Invoked once, at the stage's `startTime`. `duration_ms` is ignored
    /// for callback stages (treated as zero).
    Callback(Box<dyn FnMut() + Send>),
    /// Emitted once, at the stage's `startTime`, as an
    /// [`crate::OrchestratorEvent::Custom`].
    Event {
        name: String,
        payload: Option<serde_json::Value>,
    },
    /// Nested stages sharing this stage's `startTime` as their baseline.
    /// The group's own duration is the longest path through its children.
    Group(Vec<Stage>),
    /// Fans `targets` out across `stagger_delay_ms * rank(target)`, per
    /// [`crate::stagger::stagger_rank`].
    Stagger {
        targets: Vec<String>,
        to: StyleMap,
        stagger_delay_ms: u64,
        pattern: StaggerPattern,
    },
}

impl std::fmt::Debug for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StageKind::Style { targets, .. } => f.debug_struct("Style").field("targets", targets).finish(),
            StageKind::Callback(_) => write!(f, "Callback(..)"),
            StageKind::Event { name, .. } => f.debug_struct("Event").field("name", name).finish(),
            StageKind::Group(children) => f.debug_tuple("Group").field(&children.len()).finish(),
            StageKind::Stagger { targets, .. } => f.debug_struct("Stagger").field("targets", targets).finish(),
        }
    }
}

/// A node of work inside an orchestrated sequence.
#[derive(Debug)]
pub struct Stage {
    pub id: StageId,
    pub depends_on: Vec<StageId>,
    pub delay_ms: u64,
    pub duration_ms: u64,
    pub easing: Easing,
    pub category: AnimationCategory,
    pub kind: StageKind,
}

impl Stage {
    pub fn style(id: impl Into<String>, targets: Vec<String>, to: StyleMap) -> Self {
        Self {
            id: id.into(),
            depends_on: Vec::new(),
            delay_ms: 0,
            duration_ms: 300,
            easing: Easing::Linear,
            category: AnimationCategory::Transition,
            kind: StageKind::Style {
                targets,
                from: None,
                to,
            },
        }
    }

    pub fn depends_on(mut self, ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.depends_on = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_delay_ms(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    pub fn with_category(mut self, category: AnimationCategory) -> Self {
        self.category = category;
        self
    }

    /// Own duration, including children for a `Group` stage (the longest
    /// path through its nested stages' `delay + duration`).
    pub(crate) fn effective_duration_ms(&self) -> u64 {
        match &self.kind {
            StageKind::Group(children) => children
                .iter()
                .map(|c| c.delay_ms + c.effective_duration_ms())
                .max()
                .unwrap_or(0),
            StageKind::Callback(_) | StageKind::Event { .. } => 0,
            StageKind::Style { .. } => self.duration_ms,
            StageKind::Stagger {
                targets,
                stagger_delay_ms,
                pattern,
                ..
            } => {
                let max_rank = (0..targets.len())
                    .map(|i| crate::stagger::stagger_rank(pattern, i, targets.len()))
                    .fold(0.0_f32, f32::max);
                self.duration_ms + (max_rank * *stagger_delay_ms as f32) as u64
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn style_stage_builder_sets_sane_defaults() {
        let stage = Stage::style("fade", vec!["#card".into()], StyleMap::default());
        assert_eq!(stage.id, "fade");
        assert!(stage.depends_on.is_empty());
        assert_eq!(stage.duration_ms, 300);
    }

    #[test]
    fn callback_and_event_stages_have_zero_duration() {
        let cb = Stage {
            id: "cb".into(),
            depends_on: vec![],
            delay_ms: 0,
            duration_ms: 500,
            easing: Easing::Linear,
            category: AnimationCategory::Feedback,
            kind: StageKind::Callback(Box::new(|| {})),
        };
        assert_eq!(cb.effective_duration_ms(), 0);
    }

    #[test]
    fn stagger_duration_accounts_for_the_slowest_target() {
        let mut to = StyleMap::default();
        to.insert("opacity".into(), 1.0);
        let stage = Stage {
            id: "fan".into(),
            depends_on: vec![],
            delay_ms: 0,
            duration_ms: 200,
            easing: Easing::Linear,
            category: AnimationCategory::Entrance,
            kind: StageKind::Stagger {
                targets: vec!["a".into(), "b".into(), "c".into(), "d".into(), "e".into()],
                to,
                stagger_delay_ms: 80,
                pattern: StaggerPattern::FromCenter,
            },
        };
        assert_eq!(stage.effective_duration_ms(), 200 + 160);
    }
}
