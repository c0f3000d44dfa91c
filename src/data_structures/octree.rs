//! Loose spatial partition of keys by bounding box.
//!
//! Nodes live in an arena and subdivide lazily into eight children as long as
//! a child would not be smaller than the configured cell size. A key is stored
//! in the deepest node that fully contains its bounds; keys outside the world
//! bounds live in the root so nothing is ever lost.

use std::collections::{BTreeSet, HashMap};
use std::hash::Hash;

use crate::data_structures::bounds::Aabb;

/// Index of a node in the octree arena. Stable for the octree's lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellId(usize);

impl CellId {
    pub const ROOT: CellId = CellId(0);

    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Debug)]
struct Node<K> {
    bounds: Aabb,
    children: Option<[usize; 8]>,
    keys: BTreeSet<K>,
}

#[derive(Debug)]
pub struct Octree<K> {
    nodes: Vec<Node<K>>,
    locations: HashMap<K, CellId>,
    cell_size: f32,
}

impl<K> Octree<K>
where
    K: Copy + Ord + Hash,
{
    pub fn new(bounds: Aabb, cell_size: f32) -> Self {
        Self {
            nodes: vec![Node {
                bounds,
                children: None,
                keys: BTreeSet::new(),
            }],
            locations: HashMap::new(),
            cell_size: cell_size.max(f32::EPSILON),
        }
    }

    pub fn bounds(&self) -> Aabb {
        self.nodes[0].bounds
    }

    /// Insert (or re-insert) `key`. Returns the cell it now lives in.
    pub fn insert(&mut self, key: K, bounds: &Aabb) -> CellId {
        self.remove(key);
        let mut current = 0;
        if self.nodes[0].bounds.contains(bounds) {
            loop {
                let Some(children) = self.children_of(current) else {
                    break;
                };
                match children
                    .iter()
                    .copied()
                    .find(|&child| self.nodes[child].bounds.contains(bounds))
                {
                    Some(child) => current = child,
                    None => break,
                }
            }
        }
        self.nodes[current].keys.insert(key);
        let cell = CellId(current);
        self.locations.insert(key, cell);
        cell
    }

    /// Remove `key`. Returns the cell it was stored in, `None` if unknown.
    pub fn remove(&mut self, key: K) -> Option<CellId> {
        let cell = self.locations.remove(&key)?;
        self.nodes[cell.0].keys.remove(&key);
        Some(cell)
    }

    pub fn cell_of(&self, key: K) -> Option<CellId> {
        self.locations.get(&key).copied()
    }

    pub fn cell_bounds(&self, cell: CellId) -> Option<Aabb> {
        self.nodes.get(cell.0).map(|node| node.bounds)
    }

    pub fn keys_in(&self, cell: CellId) -> impl Iterator<Item = K> + '_ {
        self.nodes
            .get(cell.0)
            .into_iter()
            .flat_map(|node| node.keys.iter().copied())
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Drop every key. Allocated nodes are kept for reuse.
    pub fn clear(&mut self) {
        self.locations.clear();
        self.nodes.iter_mut().for_each(|node| node.keys.clear());
    }

    /// Children of `node`, subdividing on demand. `None` once the node is a leaf.
    fn children_of(&mut self, node: usize) -> Option<[usize; 8]> {
        if let Some(children) = self.nodes[node].children {
            return Some(children);
        }
        let bounds = self.nodes[node].bounds;
        let extent = bounds.extent();
        if extent.x.min(extent.y).min(extent.z) * 0.5 < self.cell_size {
            return None;
        }
        let first = self.nodes.len();
        for octant in bounds.octants() {
            self.nodes.push(Node {
                bounds: octant,
                children: None,
                keys: BTreeSet::new(),
            });
        }
        let children = std::array::from_fn(|i| first + i);
        self.nodes[node].children = Some(children);
        Some(children)
    }
}

#[cfg(test)]
mod tests {
    use cgmath::Point3;

    use super::*;

    fn small_box(x: f32, y: f32, z: f32) -> Aabb {
        Aabb::new(Point3::new(x, y, z), Point3::new(x + 1.0, y + 1.0, z + 1.0))
    }

    #[test]
    fn small_objects_sink_to_leaf_cells() {
        let mut tree = Octree::new(Aabb::cube(64.0), 16.0);
        let cell = tree.insert(1u32, &small_box(40.0, 40.0, 40.0));
        assert_ne!(cell, CellId::ROOT);
        let bounds = tree.cell_bounds(cell).unwrap();
        assert!(bounds.extent().x <= 32.0);
    }

    #[test]
    fn straddling_objects_stay_high() {
        let mut tree = Octree::new(Aabb::cube(64.0), 16.0);
        let cell = tree.insert(1u32, &small_box(-0.5, -0.5, -0.5));
        assert_eq!(cell, CellId::ROOT);
    }

    #[test]
    fn out_of_bounds_objects_live_in_the_root() {
        let mut tree = Octree::new(Aabb::cube(64.0), 16.0);
        assert_eq!(tree.insert(7u32, &small_box(500.0, 0.0, 0.0)), CellId::ROOT);
        assert_eq!(tree.keys_in(CellId::ROOT).collect::<Vec<_>>(), vec![7]);
    }

    #[test]
    fn reinsert_moves_the_key() {
        let mut tree = Octree::new(Aabb::cube(64.0), 16.0);
        let first = tree.insert(1u32, &small_box(40.0, 40.0, 40.0));
        let second = tree.insert(1u32, &small_box(-40.0, -40.0, -40.0));
        assert_ne!(first, second);
        assert_eq!(tree.keys_in(first).count(), 0);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.remove(1), Some(second));
        assert_eq!(tree.remove(1), None);
    }
}
