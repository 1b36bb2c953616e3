//! Tagged shape variants. Narrowing happens on the tag, never on structural
//! duck-typing — a body's collider is exactly one of these at a time.

use glam::Vec2;

/// A body's collision shape, in local (unrotated, origin-centered) space.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Circle { radius: f32 },
    Rectangle { width: f32, height: f32 },
    Polygon { vertices: Vec<Vec2> },
}

impl Shape {
    /// Radius of the smallest circle centered on the body's origin that
    /// fully contains the shape. Used to size spatial-hash cells.
    pub fn bounding_radius(&self) -> f32 {
        match self {
            Shape::Circle { radius } => *radius,
            Shape::Rectangle { width, height } => {
                0.5 * (width * width + height * height).sqrt()
            }
            Shape::Polygon { vertices } => vertices
                .iter()
                .map(|v| v.length())
                .fold(0.0_f32, f32::max),
        }
    }

    /// Local-space vertices of the shape's convex hull, for `Rectangle` and
    /// `Polygon` only. `Circle` has no vertex representation — narrow phase
    /// treats circles specially.
    pub fn local_vertices(&self) -> Option<Vec<Vec2>> {
        match self {
            Shape::Circle { .. } => None,
            Shape::Rectangle { width, height } => {
                let hw = width / 2.0;
                let hh = height / 2.0;
                Some(vec![
                    Vec2::new(-hw, -hh),
                    Vec2::new(hw, -hh),
                    Vec2::new(hw, hh),
                    Vec2::new(-hw, hh),
                ])
            }
            Shape::Polygon { vertices } => Some(vertices.clone()),
        }
    }
}
