//! Relations between two bodies, referenced by opaque id — never a direct
//! back-reference — so the engine alone owns both the body and constraint
//! tables (see crate docs, "cyclic ownership" design note).

use crate::body::{BodyId, PhysicsBody};
use glam::Vec2;

pub type ConstraintId = String;

#[derive(Debug, Clone)]
pub enum Constraint {
    Distance {
        body_a: BodyId,
        body_b: BodyId,
        target_distance: f32,
        stiffness: f32,
        damping: f32,
        anchor_a: Option<Vec2>,
        anchor_b: Option<Vec2>,
    },
    Hinge {
        body_a: BodyId,
        body_b: BodyId,
        anchor_a: Vec2,
        anchor_b: Vec2,
        motor_torque: Option<f32>,
        limits: Option<(f32, f32)>,
    },
}

impl Constraint {
    pub fn body_ids(&self) -> (&BodyId, &BodyId) {
        match self {
            Constraint::Distance { body_a, body_b, .. } => (body_a, body_b),
            Constraint::Hinge { body_a, body_b, .. } => (body_a, body_b),
        }
    }
}

/// Reference error: a constraint names a body that isn't in the engine.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConstraintValidationError {
    #[error("constraint references unknown body: {0}")]
    UnknownBody(BodyId),
}

fn world_anchor(body: &PhysicsBody, local: Vec2) -> Vec2 {
    let (sin, cos) = body.angle.sin_cos();
    let rotated = Vec2::new(
        local.x * cos - local.y * sin,
        local.x * sin + local.y * cos,
    );
    body.position + rotated
}

/// Position-based distance solve: pull both anchors toward `target_distance`,
/// weighted by inverse mass, then damp the separating velocity. Mirrors the
/// particle-pair Verlet-constraint idiom generalized to rigid body pairs.
pub(crate) fn solve_distance(
    a: &mut PhysicsBody,
    b: &mut PhysicsBody,
    target_distance: f32,
    stiffness: f32,
    damping: f32,
    anchor_a: Option<Vec2>,
    anchor_b: Option<Vec2>,
) {
    let pa = anchor_a.map(|l| world_anchor(a, l)).unwrap_or(a.position);
    let pb = anchor_b.map(|l| world_anchor(b, l)).unwrap_or(b.position);

    let delta = pb - pa;
    let current = delta.length();
    if current < 1e-6 {
        return;
    }
    let dir = delta / current;
    let diff = current - target_distance;

    let wa = a.inv_mass();
    let wb = b.inv_mass();
    let total = wa + wb;
    if total <= 0.0 {
        return;
    }

    let correction = dir * diff * stiffness / total;
    if !a.is_static {
        a.position += correction * wa;
    }
    if !b.is_static {
        b.position -= correction * wb;
    }

    let rel_vel = b.velocity - a.velocity;
    let sep_speed = rel_vel.dot(dir);
    let damp_impulse = dir * sep_speed * damping / total;
    if !a.is_static {
        a.velocity += damp_impulse * wa;
    }
    if !b.is_static {
        b.velocity -= damp_impulse * wb;
    }
}

/// Enforces anchor coincidence (a ball-and-socket pin) and, when present,
/// a motor torque and/or angular limits on the relative angle between the
/// two bodies' frames.
pub(crate) fn solve_hinge(
    a: &mut PhysicsBody,
    b: &mut PhysicsBody,
    anchor_a: Vec2,
    anchor_b: Vec2,
    motor_torque: Option<f32>,
    limits: Option<(f32, f32)>,
) {
    let pa = world_anchor(a, anchor_a);
    let pb = world_anchor(b, anchor_b);
    let delta = pb - pa;

    let wa = a.inv_mass();
    let wb = b.inv_mass();
    let total = wa + wb;
    if total > 0.0 {
        let correction = delta / total;
        if !a.is_static {
            a.position += correction * wa;
        }
        if !b.is_static {
            b.position -= correction * wb;
        }
    }

    if let Some(torque) = motor_torque {
        if !a.is_static {
            a.angular_velocity -= torque * wa;
        }
        if !b.is_static {
            b.angular_velocity += torque * wb;
        }
    }

    if let Some((min, max)) = limits {
        let relative = b.angle - a.angle;
        if relative < min {
            let correction = min - relative;
            if !b.is_static {
                b.angle += correction;
                b.angular_velocity = 0.0;
            }
        } else if relative > max {
            let correction = max - relative;
            if !b.is_static {
                b.angle += correction;
                b.angular_velocity = 0.0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::BodyOptions;
    use crate::shape::Shape;

    fn circle(id: &str, pos: Vec2) -> PhysicsBody {
        PhysicsBody::from_options(
            id.into(),
            BodyOptions {
                shape: Shape::Circle { radius: 1.0 },
                position: pos,
                ..Default::default()
            },
        )
    }

    #[test]
    fn distance_constraint_pulls_bodies_toward_target() {
        let mut a = circle("a", Vec2::new(0.0, 0.0));
        let mut b = circle("b", Vec2::new(10.0, 0.0));
        for _ in 0..50 {
            solve_distance(&mut a, &mut b, 5.0, 1.0, 0.1, None, None);
        }
        let dist = (b.position - a.position).length();
        assert!((dist - 5.0).abs() < 0.05, "distance settled at {dist}");
    }

    #[test]
    fn distance_constraint_respects_static_anchor() {
        let mut a = circle("a", Vec2::ZERO);
        a.is_static = true;
        let anchor = a.position;
        let mut b = circle("b", Vec2::new(10.0, 0.0));
        for _ in 0..50 {
            solve_distance(&mut a, &mut b, 5.0, 1.0, 0.1, None, None);
        }
        assert_eq!(a.position, anchor, "static body must not move");
    }

    #[test]
    fn hinge_pulls_anchors_to_coincidence() {
        let mut a = circle("a", Vec2::new(0.0, 0.0));
        let mut b = circle("b", Vec2::new(3.0, 0.0));
        for _ in 0..20 {
            solve_hinge(&mut a, &mut b, Vec2::ZERO, Vec2::ZERO, None, None);
        }
        assert!((b.position - a.position).length() < 0.1);
    }
}
