//! Narrow-phase contact generation and collision response.
//!
//! Analytic circle-circle, SAT for rectangle-rectangle and polygon-polygon
//! (a rectangle is just a 4-vertex polygon to the SAT routine), and a
//! circle-vs-polygon SAT variant for the mixed case spec.md's narrow-phase
//! list doesn't name but any body table containing both shapes inevitably
//! produces (a floor rectangle under a bouncing circle, e.g.).

use crate::body::{BodyId, CollisionFilter, PhysicsBody};
use crate::shape::Shape;
use glam::Vec2;

/// A resolved contact between two bodies this tick.
#[derive(Debug, Clone, Copy)]
pub struct Contact {
    /// Points from body A toward body B.
    pub normal: Vec2,
    pub point: Vec2,
    pub depth: f32,
}

/// Emitted on contact start/active/end, queued and flushed after the
/// integration step completes.
#[derive(Debug, Clone)]
pub struct CollisionEvent {
    pub body_a_id: BodyId,
    pub body_b_id: BodyId,
    pub point: Vec2,
    pub normal: Vec2,
    pub depth: f32,
    pub relative_velocity: Vec2,
    pub impulse: f32,
    pub body_a_user_data: Option<serde_json::Value>,
    pub body_b_user_data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionPhase {
    Start,
    Active,
    End,
}

fn world_vertices(body: &PhysicsBody) -> Vec<Vec2> {
    let local = body
        .shape
        .local_vertices()
        .expect("world_vertices called on a shape without a vertex representation");
    let (sin, cos) = body.angle.sin_cos();
    local
        .iter()
        .map(|v| {
            let rotated = Vec2::new(v.x * cos - v.y * sin, v.x * sin + v.y * cos);
            body.position + rotated
        })
        .collect()
}

fn edge_normals(vertices: &[Vec2]) -> Vec<Vec2> {
    let n = vertices.len();
    (0..n)
        .map(|i| {
            let edge = vertices[(i + 1) % n] - vertices[i];
            Vec2::new(edge.y, -edge.x).normalize_or_zero()
        })
        .collect()
}

fn project(vertices: &[Vec2], axis: Vec2) -> (f32, f32) {
    let mut min = f32::MAX;
    let mut max = f32::MIN;
    for v in vertices {
        let p = v.dot(axis);
        min = min.min(p);
        max = max.max(p);
    }
    (min, max)
}

/// Separating Axis Theorem test between two convex polygons. Returns the
/// minimum-translation normal (pointing from `a` to `b`) and penetration
/// depth, or `None` if a separating axis exists.
fn sat_polygon_polygon(verts_a: &[Vec2], verts_b: &[Vec2]) -> Option<(Vec2, f32)> {
    let mut best_depth = f32::MAX;
    let mut best_axis = Vec2::X;

    for axis in edge_normals(verts_a).into_iter().chain(edge_normals(verts_b)) {
        let (min_a, max_a) = project(verts_a, axis);
        let (min_b, max_b) = project(verts_b, axis);
        let overlap = (max_a.min(max_b)) - (min_a.max(min_b));
        if overlap <= 0.0 {
            return None;
        }
        if overlap < best_depth {
            best_depth = overlap;
            best_axis = axis;
        }
    }

    let center_a = verts_a.iter().fold(Vec2::ZERO, |acc, v| acc + *v) / verts_a.len() as f32;
    let center_b = verts_b.iter().fold(Vec2::ZERO, |acc, v| acc + *v) / verts_b.len() as f32;
    if (center_b - center_a).dot(best_axis) < 0.0 {
        best_axis = -best_axis;
    }

    Some((best_axis, best_depth))
}

fn closest_point_on_polygon(vertices: &[Vec2], point: Vec2) -> Vec2 {
    let n = vertices.len();
    let mut best = vertices[0];
    let mut best_dist = f32::MAX;
    for i in 0..n {
        let a = vertices[i];
        let b = vertices[(i + 1) % n];
        let ab = b - a;
        let t = ((point - a).dot(ab) / ab.length_squared()).clamp(0.0, 1.0);
        let candidate = a + ab * t;
        let dist = (candidate - point).length_squared();
        if dist < best_dist {
            best_dist = dist;
            best = candidate;
        }
    }
    best
}

fn point_in_polygon(vertices: &[Vec2], point: Vec2) -> bool {
    let normals = edge_normals(vertices);
    vertices
        .iter()
        .zip(normals.iter())
        .all(|(v, n)| (point - *v).dot(*n) <= 0.0)
}

/// Normal points from the circle's center toward the polygon (i.e. "from
/// circle into polygon"), matching this module's "normal points from A
/// toward B" contract when the circle is the first operand.
fn circle_vs_polygon(center: Vec2, radius: f32, verts: &[Vec2]) -> Option<(Vec2, f32)> {
    let inside = point_in_polygon(verts, center);
    let closest = closest_point_on_polygon(verts, center);
    let delta = closest - center;
    let dist = delta.length();

    if inside {
        // Center is inside the polygon: treat the nearest edge as the
        // contact surface, same direction convention as the outside case.
        let depth = radius + dist;
        let normal = if dist > 1e-6 { delta / dist } else { Vec2::Y };
        return Some((normal, depth));
    }
    if dist >= radius {
        return None;
    }
    let normal = if dist > 1e-6 { delta / dist } else { Vec2::Y };
    Some((normal, radius - dist))
}

/// Dispatches on the tag pair, per the crate's "narrow on the tag" rule.
/// Returns a contact whose normal points from `a` toward `b`.
pub fn narrow_phase(a: &PhysicsBody, b: &PhysicsBody) -> Option<Contact> {
    match (&a.shape, &b.shape) {
        (Shape::Circle { radius: ra }, Shape::Circle { radius: rb }) => {
            let delta = b.position - a.position;
            let dist = delta.length();
            let sum = ra + rb;
            if dist >= sum || dist < 1e-9 {
                return None;
            }
            let normal = delta / dist;
            let depth = sum - dist;
            Some(Contact {
                normal,
                point: a.position + normal * (*ra - depth / 2.0),
                depth,
            })
        }
        (Shape::Circle { radius }, _) => {
            let verts = world_vertices(b);
            let (normal, depth) = circle_vs_polygon(a.position, *radius, &verts)?;
            Some(Contact {
                normal,
                point: a.position + normal * *radius,
                depth,
            })
        }
        (_, Shape::Circle { radius }) => {
            let verts = world_vertices(a);
            // circle_vs_polygon normal points from circle (b) toward polygon
            // (a); flip so the contract (a -> b, polygon into circle) holds.
            let (normal_b_to_a, depth) = circle_vs_polygon(b.position, *radius, &verts)?;
            let normal = -normal_b_to_a;
            Some(Contact {
                normal,
                point: b.position + normal_b_to_a * *radius,
                depth,
            })
        }
        _ => {
            let verts_a = world_vertices(a);
            let verts_b = world_vertices(b);
            let (normal, depth) = sat_polygon_polygon(&verts_a, &verts_b)?;
            Some(Contact {
                normal,
                point: a.position + normal * depth / 2.0,
                depth,
            })
        }
    }
}

pub fn filters_collide(a: &CollisionFilter, b: &CollisionFilter) -> bool {
    !a.excludes(b)
}
