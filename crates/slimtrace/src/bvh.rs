//! Bounding Volume Hierarchy over the masked geometry.
//!
//! Built top-down with a binned Surface Area Heuristic directly into a flat
//! node array sized for the configured depth. The tree is rebuilt whenever
//! the scene changes; it is never refit. Beauty shading walks it to answer
//! shadow queries.

use slimtrace_math::{Aabb3, Vec3};

use crate::error::{try_alloc, RenderError, Result};
use crate::intersect::intersect_geometry;
use crate::masks::GeometryMasks;
use crate::ray::Ray;
use crate::scene::{GeometryKind, Scene, MAX_GEOMETRY_PER_TYPE};

/// Leaves stop splitting at this many objects.
pub const MAX_LEAF_SIZE: usize = 2;

const NUM_BUCKETS: usize = 12;
const TRAVERSAL_STACK: usize = 32;

/// Reference from a leaf to one geometry instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometryRef {
    /// Geometry type.
    pub kind: GeometryKind,
    /// Index within the type's array.
    pub index: usize,
}

/// A flat BVH node.
///
/// For internal nodes `left_or_first` and `right_or_count` are child node
/// indices; for leaves they are the start and length of a range in the
/// reference array.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BvhNode {
    /// Bounds of everything below this node.
    pub aabb: Aabb3,
    /// Whether this node is a leaf.
    pub is_leaf: bool,
    /// Left child, or first reference of a leaf.
    pub left_or_first: u32,
    /// Right child, or reference count of a leaf.
    pub right_or_count: u32,
}

impl Default for BvhNode {
    fn default() -> Self {
        Self {
            aabb: Aabb3::empty(),
            is_leaf: true,
            left_or_first: 0,
            right_or_count: 0,
        }
    }
}

#[derive(Clone, Copy)]
struct BuildItem {
    geometry: GeometryRef,
    aabb: Aabb3,
    centroid: Vec3,
}

/// Bounding Volume Hierarchy with preallocated storage.
#[derive(Debug, Clone)]
pub struct Bvh {
    max_depth: u8,
    nodes: Vec<BvhNode>,
    node_count: usize,
    refs: Vec<GeometryRef>,
    depth: u8,
}

impl Bvh {
    /// Allocate storage for a tree of at most `max_depth` levels below the
    /// root, i.e. `2^(max_depth + 1) - 1` nodes.
    pub fn new(max_depth: u8) -> Result<Self> {
        let capacity = (1usize << (u32::from(max_depth) + 1)) - 1;
        let nodes = try_alloc("bvh nodes", capacity, BvhNode::default())?;
        let mut refs = Vec::new();
        refs.try_reserve_exact(3 * MAX_GEOMETRY_PER_TYPE)
            .map_err(|_| RenderError::Allocation {
                what: "bvh references",
                bytes: 3 * MAX_GEOMETRY_PER_TYPE * std::mem::size_of::<GeometryRef>(),
            })?;
        Ok(Self {
            max_depth,
            nodes,
            node_count: 0,
            refs,
            depth: 0,
        })
    }

    /// Rebuild the tree over every cube, sphere and tetrahedron in `scene`.
    pub fn update(&mut self, scene: &Scene) {
        let mut items = Vec::with_capacity(3 * MAX_GEOMETRY_PER_TYPE);
        for kind in GeometryKind::ALL {
            for index in 0..scene.count(kind).min(MAX_GEOMETRY_PER_TYPE) {
                let aabb = scene.aabb(kind, index);
                items.push(BuildItem {
                    geometry: GeometryRef { kind, index },
                    aabb,
                    centroid: aabb.centroid(),
                });
            }
        }

        self.node_count = 0;
        self.refs.clear();
        self.depth = 0;
        if !items.is_empty() {
            self.build_node(&mut items, 0);
        }

        tracing::debug!(
            objects = items.len(),
            nodes = self.node_count,
            depth = self.depth,
            "bvh rebuilt"
        );
    }

    /// Whether anything opaque that casts shadows lies along `ray` closer
    /// than `max_distance`.
    ///
    /// Instances outside `shadowing` or inside `transparency` never block.
    pub fn occluded(
        &self,
        ray: &Ray,
        max_distance: f32,
        scene: &Scene,
        shadowing: &GeometryMasks,
        transparency: &GeometryMasks,
    ) -> bool {
        if self.node_count == 0 {
            return false;
        }
        let blockers = shadowing.without(transparency);
        if !blockers.any() {
            return false;
        }

        let mut stack = [0u32; TRAVERSAL_STACK];
        let mut top = 1;
        while top > 0 {
            top -= 1;
            let node = &self.nodes[stack[top] as usize];
            match ray.intersect_aabb(&node.aabb) {
                Some((t_min, _)) if t_min < max_distance => {}
                _ => continue,
            }

            if node.is_leaf {
                let first = node.left_or_first as usize;
                let count = node.right_or_count as usize;
                for geometry in &self.refs[first..first + count] {
                    if !blockers.contains(geometry.kind, geometry.index) {
                        continue;
                    }
                    let hit = intersect_geometry(ray, scene, geometry.kind, geometry.index);
                    if hit.is_some_and(|h| h.t < max_distance) {
                        return true;
                    }
                }
            } else {
                stack[top] = node.left_or_first;
                stack[top + 1] = node.right_or_count;
                top += 2;
            }
        }
        false
    }

    /// Nodes and leaf references in upload order.
    pub fn flatten(&self) -> (&[BvhNode], &[GeometryRef]) {
        (self.nodes(), self.refs())
    }

    /// Nodes of the current tree; the root is at index 0.
    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes[..self.node_count]
    }

    /// Leaf references.
    pub fn refs(&self) -> &[GeometryRef] {
        &self.refs
    }

    /// Allocated node capacity.
    pub fn capacity(&self) -> usize {
        self.nodes.len()
    }

    /// Configured depth limit.
    pub fn max_depth(&self) -> u8 {
        self.max_depth
    }

    /// Depth of the deepest leaf of the current tree.
    pub fn depth(&self) -> u8 {
        self.depth
    }

    /// Number of leaves of the current tree.
    pub fn leaf_count(&self) -> usize {
        self.nodes().iter().filter(|n| n.is_leaf).count()
    }

    fn build_node(&mut self, items: &mut [BuildItem], depth: u8) -> u32 {
        let idx = self.node_count;
        self.node_count += 1;
        self.depth = self.depth.max(depth);

        let mut bounds = Aabb3::empty();
        for item in items.iter() {
            bounds.include_aabb(&item.aabb);
        }

        if items.len() <= MAX_LEAF_SIZE || depth >= self.max_depth {
            self.nodes[idx] = BvhNode {
                aabb: bounds,
                is_leaf: true,
                left_or_first: self.refs.len() as u32,
                right_or_count: items.len() as u32,
            };
            self.refs.extend(items.iter().map(|item| item.geometry));
            return idx as u32;
        }

        let mid = match find_best_split(items, &bounds) {
            Some((axis, pos)) => partition(items, axis, pos),
            None => 0,
        };
        let mid = if mid == 0 || mid == items.len() {
            median_split(items, &bounds)
        } else {
            mid
        };

        let (left_items, right_items) = items.split_at_mut(mid);
        let left = self.build_node(left_items, depth + 1);
        let right = self.build_node(right_items, depth + 1);
        self.nodes[idx] = BvhNode {
            aabb: bounds,
            is_leaf: false,
            left_or_first: left,
            right_or_count: right,
        };
        idx as u32
    }
}

/// Find the best split axis and position using binned SAH.
fn find_best_split(items: &[BuildItem], bounds: &Aabb3) -> Option<(usize, f32)> {
    let mut centroid_bounds = Aabb3::empty();
    for item in items {
        centroid_bounds.include_point(&item.centroid);
    }
    let extent = centroid_bounds.extent();
    let total_area = bounds.surface_area();
    if total_area <= 0.0 {
        return None;
    }

    let mut best: Option<(usize, f32)> = None;
    let mut best_cost = f32::INFINITY;

    for axis in 0..3 {
        let axis_extent = extent[axis];
        if axis_extent < 1e-6 {
            continue;
        }
        let axis_min = centroid_bounds.min[axis];

        let mut bucket_counts = [0usize; NUM_BUCKETS];
        let mut bucket_bounds = [Aabb3::empty(); NUM_BUCKETS];
        for item in items {
            let b = ((item.centroid[axis] - axis_min) / axis_extent * NUM_BUCKETS as f32) as usize;
            let b = b.min(NUM_BUCKETS - 1);
            bucket_counts[b] += 1;
            bucket_bounds[b].include_aabb(&item.aabb);
        }

        for split in 1..NUM_BUCKETS {
            let mut left_count = 0;
            let mut left_bounds = Aabb3::empty();
            for i in 0..split {
                left_count += bucket_counts[i];
                left_bounds.include_aabb(&bucket_bounds[i]);
            }
            let mut right_count = 0;
            let mut right_bounds = Aabb3::empty();
            for i in split..NUM_BUCKETS {
                right_count += bucket_counts[i];
                right_bounds.include_aabb(&bucket_bounds[i]);
            }
            if left_count == 0 || right_count == 0 {
                continue;
            }

            let cost = 0.125
                + left_bounds.surface_area() / total_area * left_count as f32
                + right_bounds.surface_area() / total_area * right_count as f32;
            if cost < best_cost {
                best_cost = cost;
                best = Some((axis, axis_min + split as f32 / NUM_BUCKETS as f32 * axis_extent));
            }
        }
    }

    best
}

/// Partition items by centroid along an axis; returns the split index.
fn partition(items: &mut [BuildItem], axis: usize, pos: f32) -> usize {
    let mut left = 0;
    let mut right = items.len();
    while left < right {
        if items[left].centroid[axis] < pos {
            left += 1;
        } else {
            right -= 1;
            items.swap(left, right);
        }
    }
    left
}

/// Split at the median centroid along the longest axis.
fn median_split(items: &mut [BuildItem], bounds: &Aabb3) -> usize {
    let axis = bounds.extent().imax();
    let mid = items.len() / 2;
    items.select_nth_unstable_by(mid, |a, b| a.centroid[axis].total_cmp(&b.centroid[axis]));
    mid
}
