//! Accessibility gate (C7): every animation creation call is rewritten by a
//! [`MotionPolicy`] before C3 (physics), C4 (springs), or C6 (orchestrator)
//! ever see the request. Downstream components never branch on sensitivity
//! themselves — they only ever see the *outcome* of a rewrite.
//!
//! Config construction mirrors `galileo-observability`'s
//! `ObservabilityConfig`: a `serde`-deserializable struct validated in a
//! constructor that returns `Result`, never a panic.

use std::collections::HashMap;

use bitflags::bitflags;
use galileo_events::AnimationCategory;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MotionSensitivity {
    None,
    Low,
    Medium,
    High,
}

bitflags! {
    /// Effects a rewrite may strip at `low`/`medium` sensitivity. Opacity
    /// and color are never gated — spec explicitly keeps them.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct EffectFlags: u8 {
        const PARALLAX  = 0b001;
        const TILT      = 0b010;
        const PARTICLES = 0b100;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alternative {
    Fade,
    Static,
}

/// A request as it arrives from C4/C5/C6, before the gate has acted on it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationRequest {
    pub category: AnimationCategory,
    pub duration_ms: u64,
    pub effects: EffectFlags,
    /// A caller-provided fallback to use if this request collapses at
    /// `high` sensitivity. `None` means the request is omitted entirely
    /// unless [`MotionPolicy::register_category_default`] supplies one.
    pub alternative: Option<Alternative>,
}

impl AnimationRequest {
    pub fn new(category: AnimationCategory, duration_ms: u64) -> Self {
        Self {
            category,
            duration_ms,
            effects: EffectFlags::empty(),
            alternative: None,
        }
    }

    pub fn with_effects(mut self, effects: EffectFlags) -> Self {
        self.effects = effects;
        self
    }

    pub fn with_alternative(mut self, alternative: Alternative) -> Self {
        self.alternative = Some(alternative);
        self
    }
}

/// What downstream components should actually do with a request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RewriteOutcome {
    /// Play as requested (possibly with a shortened duration / stripped
    /// effects at `low`/`medium` sensitivity).
    Full { duration_ms: u64, effects: EffectFlags },
    /// Jump straight to the alternative instead of animating.
    Collapsed { alternative: Alternative },
    /// Don't run this request at all.
    Omitted,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CategoryDefault {
    pub alternative: Option<Alternative>,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MotionPolicyError {
    #[error("duration multiplier {0} out of range (0, 1]")]
    InvalidDurationMultiplier(f32),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MotionPolicyConfig {
    pub sensitivity: MotionSensitivity,
    /// Per-category sensitivity overrides; an app can e.g. treat its own
    /// `decorative` category as `high` regardless of the global setting.
    #[serde(default)]
    pub overrides: HashMap<AnimationCategory, MotionSensitivity>,
    #[serde(default = "default_low_multiplier")]
    pub low_duration_multiplier: f32,
    #[serde(default = "default_medium_multiplier")]
    pub medium_duration_multiplier: f32,
}

fn default_low_multiplier() -> f32 {
    0.7
}

fn default_medium_multiplier() -> f32 {
    0.5
}

impl Default for MotionPolicyConfig {
    fn default() -> Self {
        Self {
            sensitivity: MotionSensitivity::None,
            overrides: HashMap::new(),
            low_duration_multiplier: default_low_multiplier(),
            medium_duration_multiplier: default_medium_multiplier(),
        }
    }
}

/// Sensitivity × category → rewrite rule table. Process-wide, but owned and
/// injected by `galileo-runtime`'s facade rather than a module-scope static.
pub struct MotionPolicy {
    config: MotionPolicyConfig,
    category_defaults: HashMap<AnimationCategory, CategoryDefault>,
}

impl MotionPolicy {
    pub fn new(config: MotionPolicyConfig) -> Result<Self, MotionPolicyError> {
        if config.low_duration_multiplier <= 0.0 || config.low_duration_multiplier > 1.0 {
            return Err(MotionPolicyError::InvalidDurationMultiplier(config.low_duration_multiplier));
        }
        if config.medium_duration_multiplier <= 0.0 || config.medium_duration_multiplier > 1.0 {
            return Err(MotionPolicyError::InvalidDurationMultiplier(config.medium_duration_multiplier));
        }
        Ok(Self {
            config,
            category_defaults: HashMap::new(),
        })
    }

    pub fn sensitivity(&self) -> MotionSensitivity {
        self.config.sensitivity
    }

    pub fn set_sensitivity(&mut self, sensitivity: MotionSensitivity) {
        self.config.sensitivity = sensitivity;
    }

    pub fn register_category_default(&mut self, category: AnimationCategory, default: CategoryDefault) {
        self.category_defaults.insert(category, default);
    }

    fn effective_sensitivity(&self, category: AnimationCategory) -> MotionSensitivity {
        self.config
            .overrides
            .get(&category)
            .copied()
            .unwrap_or(self.config.sensitivity)
    }

    /// Rewrite `request` according to the current policy. Called by every
    /// animation-creation entry point before C3/C4/C6 see the request.
    pub fn rewrite(&self, request: &AnimationRequest) -> RewriteOutcome {
        let sensitivity = self.effective_sensitivity(request.category);
        let outcome = match sensitivity {
            MotionSensitivity::None => self.rewrite_none(request),
            MotionSensitivity::Low => self.rewrite_reduced(request, self.config.low_duration_multiplier),
            MotionSensitivity::Medium => self.rewrite_reduced(request, self.config.medium_duration_multiplier),
            MotionSensitivity::High => self.rewrite_high(request),
        };
        debug!(?sensitivity, category = ?request.category, ?outcome, "motion policy rewrite");
        outcome
    }

    fn rewrite_none(&self, request: &AnimationRequest) -> RewriteOutcome {
        match request.category {
            AnimationCategory::Decorative | AnimationCategory::Feedback => {
                RewriteOutcome::Collapsed { alternative: Alternative::Static }
            }
            _ => RewriteOutcome::Full {
                duration_ms: request.duration_ms,
                effects: request.effects,
            },
        }
    }

    fn rewrite_reduced(&self, request: &AnimationRequest, multiplier: f32) -> RewriteOutcome {
        let duration_ms = (request.duration_ms as f32 * multiplier) as u64;
        let effects = request.effects
            & !(EffectFlags::PARALLAX | EffectFlags::TILT | EffectFlags::PARTICLES);
        RewriteOutcome::Full { duration_ms, effects }
    }

    fn rewrite_high(&self, request: &AnimationRequest) -> RewriteOutcome {
        if request.category == AnimationCategory::Essential {
            return RewriteOutcome::Full {
                duration_ms: request.duration_ms,
                effects: request.effects,
            };
        }
        let alternative = request.alternative.or_else(|| {
            self.category_defaults
                .get(&request.category)
                .and_then(|d| d.alternative)
        });
        match alternative {
            Some(alternative) => RewriteOutcome::Collapsed { alternative },
            None => RewriteOutcome::Omitted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(sensitivity: MotionSensitivity) -> MotionPolicy {
        MotionPolicy::new(MotionPolicyConfig {
            sensitivity,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn none_sensitivity_collapses_decorative_and_feedback_but_plays_essential_full() {
        let policy = policy(MotionSensitivity::None);

        let decorative = AnimationRequest::new(AnimationCategory::Decorative, 300);
        assert_eq!(
            policy.rewrite(&decorative),
            RewriteOutcome::Collapsed { alternative: Alternative::Static }
        );

        let essential = AnimationRequest::new(AnimationCategory::Essential, 300);
        assert_eq!(
            policy.rewrite(&essential),
            RewriteOutcome::Full { duration_ms: 300, effects: EffectFlags::empty() }
        );
    }

    #[test]
    fn low_sensitivity_shortens_duration_and_strips_parallax_tilt_particles() {
        let policy = policy(MotionSensitivity::Low);
        let request = AnimationRequest::new(AnimationCategory::Transition, 200)
            .with_effects(EffectFlags::PARALLAX | EffectFlags::TILT);

        match policy.rewrite(&request) {
            RewriteOutcome::Full { duration_ms, effects } => {
                assert_eq!(duration_ms, 140);
                assert!(effects.is_empty());
            }
            other => panic!("expected Full, got {other:?}"),
        }
    }

    #[test]
    fn medium_sensitivity_uses_a_steeper_multiplier_than_low() {
        let low = policy(MotionSensitivity::Low);
        let medium = policy(MotionSensitivity::Medium);
        let request = AnimationRequest::new(AnimationCategory::Transition, 200);

        let RewriteOutcome::Full { duration_ms: low_duration, .. } = low.rewrite(&request) else {
            panic!("expected Full")
        };
        let RewriteOutcome::Full { duration_ms: medium_duration, .. } = medium.rewrite(&request) else {
            panic!("expected Full")
        };
        assert!(medium_duration < low_duration);
    }

    #[test]
    fn high_sensitivity_collapses_non_essential_to_its_alternative() {
        let policy = policy(MotionSensitivity::High);
        let request = AnimationRequest::new(AnimationCategory::Decorative, 300)
            .with_alternative(Alternative::Fade);
        assert_eq!(
            policy.rewrite(&request),
            RewriteOutcome::Collapsed { alternative: Alternative::Fade }
        );
    }

    #[test]
    fn high_sensitivity_omits_non_essential_with_no_alternative() {
        let policy = policy(MotionSensitivity::High);
        let request = AnimationRequest::new(AnimationCategory::Decorative, 300);
        assert_eq!(policy.rewrite(&request), RewriteOutcome::Omitted);
    }

    #[test]
    fn high_sensitivity_still_plays_essential_full() {
        let policy = policy(MotionSensitivity::High);
        let request = AnimationRequest::new(AnimationCategory::Essential, 300);
        assert_eq!(
            policy.rewrite(&request),
            RewriteOutcome::Full { duration_ms: 300, effects: EffectFlags::empty() }
        );
    }

    #[test]
    fn category_default_alternative_is_used_when_request_has_none() {
        let mut policy = policy(MotionSensitivity::High);
        policy.register_category_default(
            AnimationCategory::Feedback,
            CategoryDefault { alternative: Some(Alternative::Static) },
        );
        let request = AnimationRequest::new(AnimationCategory::Feedback, 150);
        assert_eq!(
            policy.rewrite(&request),
            RewriteOutcome::Collapsed { alternative: Alternative::Static }
        );
    }

    #[test]
    fn per_category_override_takes_precedence_over_global_sensitivity() {
        let mut config = MotionPolicyConfig {
            sensitivity: MotionSensitivity::None,
            ..Default::default()
        };
        config.overrides.insert(AnimationCategory::Decorative, MotionSensitivity::High);
        let policy = MotionPolicy::new(config).unwrap();

        let request = AnimationRequest::new(AnimationCategory::Decorative, 300);
        assert_eq!(policy.rewrite(&request), RewriteOutcome::Omitted);
    }

    #[test]
    fn invalid_duration_multiplier_is_rejected_at_construction() {
        let config = MotionPolicyConfig {
            low_duration_multiplier: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            MotionPolicy::new(config),
            Err(MotionPolicyError::InvalidDurationMultiplier(_))
        ));
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = MotionPolicyConfig {
            sensitivity: MotionSensitivity::Medium,
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let parsed: MotionPolicyConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.sensitivity, MotionSensitivity::Medium);
    }
}
