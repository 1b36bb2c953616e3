//! The unit of simulation: [`PhysicsBody`], its construction options, and
//! the per-step [`Force`] requests attached to it.

use crate::shape::Shape;
use glam::Vec2;

pub type BodyId = String;

/// `(a.category & b.mask) == 0 || (b.category & a.mask) == 0` skips the pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollisionFilter {
    pub category: u32,
    pub mask: u32,
}

impl Default for CollisionFilter {
    fn default() -> Self {
        Self {
            category: 0x0001,
            mask: u32::MAX,
        }
    }
}

impl CollisionFilter {
    pub fn excludes(&self, other: &CollisionFilter) -> bool {
        (self.category & other.mask) == 0 || (other.category & self.mask) == 0
    }
}

/// A per-step force or impulse request. Cleared after the step that
/// consumes it (`one_shot` impulses additionally mutate velocity directly
/// before integration; standing forces accumulate into acceleration).
#[derive(Debug, Clone, Copy)]
pub struct Force {
    pub force: Vec2,
    /// Reserved for torque support. Accepted and stored, never applied to
    /// angular velocity in this version — see crate docs.
    pub point: Option<Vec2>,
    pub one_shot: bool,
}

/// Construction arguments for [`crate::PhysicsEngine::add_body`]. Mirrors
/// `PhysicsBody`'s public fields; `id` is optional (the engine mints one).
#[derive(Debug, Clone)]
pub struct BodyOptions {
    pub id: Option<BodyId>,
    pub shape: Shape,
    pub position: Vec2,
    pub velocity: Vec2,
    pub angle: f32,
    pub angular_velocity: f32,
    pub mass: f32,
    pub friction: f32,
    pub restitution: f32,
    pub is_static: bool,
    pub collision_filter: CollisionFilter,
    pub user_data: Option<serde_json::Value>,
}

impl Default for BodyOptions {
    fn default() -> Self {
        Self {
            id: None,
            shape: Shape::Circle { radius: 1.0 },
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            angle: 0.0,
            angular_velocity: 0.0,
            mass: 1.0,
            friction: 0.1,
            restitution: 0.0,
            is_static: false,
            collision_filter: CollisionFilter::default(),
            user_data: None,
        }
    }
}

/// Validation failure for body/constraint construction. See `galileo-physics`
/// crate docs for the full error taxonomy.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum BodyValidationError {
    #[error("body mass must be > 0 (got {0})")]
    NonPositiveMass(f32),
    #[error("friction must be in [0,1] (got {0})")]
    FrictionOutOfRange(f32),
    #[error("restitution must be in [0,1] (got {0})")]
    RestitutionOutOfRange(f32),
    #[error("duplicate body id: {0}")]
    DuplicateId(BodyId),
}

impl BodyOptions {
    pub(crate) fn validate(&self) -> Result<(), BodyValidationError> {
        if !self.is_static && !(self.mass > 0.0) {
            return Err(BodyValidationError::NonPositiveMass(self.mass));
        }
        if !(0.0..=1.0).contains(&self.friction) {
            return Err(BodyValidationError::FrictionOutOfRange(self.friction));
        }
        if !(0.0..=1.0).contains(&self.restitution) {
            return Err(BodyValidationError::RestitutionOutOfRange(self.restitution));
        }
        Ok(())
    }
}

/// A simulated rigid body. Static bodies have zero velocity forever;
/// sleeping bodies accumulate no integration cost until woken.
#[derive(Debug, Clone)]
pub struct PhysicsBody {
    pub id: BodyId,
    pub shape: Shape,
    pub position: Vec2,
    pub velocity: Vec2,
    pub angle: f32,
    pub angular_velocity: f32,
    pub mass: f32,
    pub friction: f32,
    pub restitution: f32,
    pub is_static: bool,
    pub is_sleeping: bool,
    pub collision_filter: CollisionFilter,
    pub user_data: Option<serde_json::Value>,
    pub(crate) pending_forces: Vec<Force>,
    pub(crate) sleep_timer_ms: u64,
}

impl PhysicsBody {
    pub(crate) fn from_options(id: BodyId, opts: BodyOptions) -> Self {
        Self {
            id,
            shape: opts.shape,
            position: opts.position,
            velocity: if opts.is_static { Vec2::ZERO } else { opts.velocity },
            angle: opts.angle,
            angular_velocity: if opts.is_static { 0.0 } else { opts.angular_velocity },
            mass: opts.mass,
            friction: opts.friction,
            restitution: opts.restitution,
            is_static: opts.is_static,
            is_sleeping: false,
            collision_filter: opts.collision_filter,
            user_data: opts.user_data,
            pending_forces: Vec::new(),
            sleep_timer_ms: 0,
        }
    }

    pub fn inv_mass(&self) -> f32 {
        if self.is_static || self.mass <= 0.0 {
            0.0
        } else {
            1.0 / self.mass
        }
    }

    pub(crate) fn wake(&mut self) {
        self.is_sleeping = false;
        self.sleep_timer_ms = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_collides_with_everything_in_its_own_category() {
        let a = CollisionFilter::default();
        let b = CollisionFilter::default();
        assert!(!a.excludes(&b));
    }

    #[test]
    fn disjoint_masks_exclude() {
        let a = CollisionFilter {
            category: 0b01,
            mask: 0b01,
        };
        let b = CollisionFilter {
            category: 0b10,
            mask: 0b10,
        };
        assert!(a.excludes(&b));
    }

    #[test]
    fn negative_mass_fails_validation() {
        let opts = BodyOptions {
            mass: -1.0,
            ..Default::default()
        };
        assert_eq!(
            opts.validate(),
            Err(BodyValidationError::NonPositiveMass(-1.0))
        );
    }

    #[test]
    fn static_body_allows_zero_mass_semantics() {
        let opts = BodyOptions {
            mass: 0.0,
            is_static: true,
            ..Default::default()
        };
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn static_body_has_zero_inverse_mass() {
        let body = PhysicsBody::from_options(
            "s".into(),
            BodyOptions {
                is_static: true,
                mass: 0.0,
                ..Default::default()
            },
        );
        assert_eq!(body.inv_mass(), 0.0);
    }

    #[test]
    fn static_body_ignores_initial_velocity() {
        let body = PhysicsBody::from_options(
            "s".into(),
            BodyOptions {
                is_static: true,
                mass: 0.0,
                velocity: Vec2::new(5.0, 5.0),
                ..Default::default()
            },
        );
        assert_eq!(body.velocity, Vec2::ZERO);
    }
}
