/*!
# Spatial Hash Grid for Broad-Phase Collision Detection

Grid-based spatial partitioning that reduces collision detection from O(n²)
to O(n log n) by only testing objects that share a grid cell.

## Usage

```rust
use galileo_physics::spatial_hash::{SpatialHash, AABB};
use glam::Vec2;

let mut grid = SpatialHash::new(10.0);
grid.insert(1u32, AABB::from_sphere(Vec2::new(5.0, 5.0), 1.0));

let candidates = grid.query(AABB::from_sphere(Vec2::new(5.0, 5.0), 1.0));
assert!(candidates.contains(&1));

grid.clear();
```

## Cell Size Selection

Cell size should be roughly 2x the average body's bounding radius: too small
and a body spans many cells (redundant queries); too large and a cell holds
most of the world (back to O(n²)).
*/

use glam::Vec2;

/// Axis-aligned bounding box in world space.
#[derive(Debug, Clone, Copy)]
pub struct AABB {
    pub min: Vec2,
    pub max: Vec2,
}

impl AABB {
    pub fn from_center_extents(center: Vec2, half_extents: Vec2) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    pub fn from_sphere(center: Vec2, radius: f32) -> Self {
        Self::from_center_extents(center, Vec2::splat(radius))
    }

    pub fn intersects(&self, other: &AABB) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    pub fn half_extents(&self) -> Vec2 {
        (self.max - self.min) * 0.5
    }
}

/// 2D grid cell coordinates.
type GridCell = (i32, i32);

/// Uniform grid for broad-phase collision queries, keyed by an opaque,
/// caller-chosen `T` (this crate uses `BodyId`).
#[derive(Debug)]
pub struct SpatialHash<T> {
    cell_size: f32,
    inv_cell_size: f32,
    grid: rustc_hash::FxHashMap<GridCell, Vec<T>>,
    object_count: usize,
}

impl<T: Copy + Eq + Ord> SpatialHash<T> {
    /// `cell_size` is in world units; see module docs for sizing advice.
    pub fn new(cell_size: f32) -> Self {
        assert!(cell_size > 0.0, "cell size must be positive");
        Self {
            cell_size,
            inv_cell_size: 1.0 / cell_size,
            grid: rustc_hash::FxHashMap::default(),
            object_count: 0,
        }
    }

    #[inline]
    fn world_to_cell(&self, pos: Vec2) -> GridCell {
        (
            (pos.x * self.inv_cell_size).floor() as i32,
            (pos.y * self.inv_cell_size).floor() as i32,
        )
    }

    fn get_overlapping_cells(&self, aabb: &AABB) -> Vec<GridCell> {
        let min_cell = self.world_to_cell(aabb.min);
        let max_cell = self.world_to_cell(aabb.max);

        let mut cells = Vec::new();
        for x in min_cell.0..=max_cell.0 {
            for y in min_cell.1..=max_cell.1 {
                cells.push((x, y));
            }
        }
        cells
    }

    /// Insert `id` into every cell its `aabb` overlaps.
    pub fn insert(&mut self, id: T, aabb: AABB) {
        for cell in self.get_overlapping_cells(&aabb) {
            self.grid.entry(cell).or_default().push(id);
        }
        self.object_count += 1;
    }

    /// Candidates overlapping `aabb`'s cells. May contain duplicates if a
    /// candidate spans more than one of those cells.
    pub fn query(&self, aabb: AABB) -> Vec<T> {
        let mut results = Vec::new();
        for cell in self.get_overlapping_cells(&aabb) {
            if let Some(objects) = self.grid.get(&cell) {
                results.extend_from_slice(objects);
            }
        }
        results
    }

    /// Same as [`query`](Self::query) but deduplicated.
    pub fn query_unique(&self, aabb: AABB) -> Vec<T> {
        let mut results = self.query(aabb);
        results.sort_unstable();
        results.dedup();
        results
    }

    /// Reset the grid; call once per tick before re-inserting dynamic bodies.
    pub fn clear(&mut self) {
        self.grid.clear();
        self.object_count = 0;
    }

    pub fn object_count(&self) -> usize {
        self.object_count
    }

    pub fn cell_count(&self) -> usize {
        self.grid.len()
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn average_cell_density(&self) -> f32 {
        if self.grid.is_empty() {
            0.0
        } else {
            self.object_count as f32 / self.grid.len() as f32
        }
    }

    pub fn stats(&self) -> SpatialHashStats {
        let mut max_objects_per_cell = 0;
        let mut total_objects_in_cells = 0;
        for objects in self.grid.values() {
            max_objects_per_cell = max_objects_per_cell.max(objects.len());
            total_objects_in_cells += objects.len();
        }
        SpatialHashStats {
            object_count: self.object_count,
            cell_count: self.grid.len(),
            max_objects_per_cell,
            average_objects_per_cell: if self.grid.is_empty() {
                0.0
            } else {
                total_objects_in_cells as f32 / self.grid.len() as f32
            },
            cell_size: self.cell_size,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SpatialHashStats {
    pub object_count: usize,
    pub cell_count: usize,
    pub max_objects_per_cell: usize,
    pub average_objects_per_cell: f32,
    pub cell_size: f32,
}
