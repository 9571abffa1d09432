//! Octree color quantizer.
//!
//! Colors are inserted along a depth-8 path whose child index at depth `d`
//! comes from bit `7 - d` of each channel. Leaves are then merged bottom-up,
//! least-populated first, until at most `max_colors` leaves remain.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use rgb::RGB;

use crate::histogram::Histogram;
use crate::palette::Palette;

const NONE: u32 = u32::MAX;
const MAX_DEPTH: usize = 8;

/// Child slot for `color` below a node at `depth` (0 = root).
#[inline]
pub(crate) fn child_index(color: RGB<u8>, depth: usize) -> usize {
    let shift = 7 - depth;
    (((color.r >> shift) & 1) << 2 | ((color.g >> shift) & 1) << 1 | ((color.b >> shift) & 1))
        as usize
}

/// Bit-interleaved key matching the order in which a full-depth octree
/// visits its leaves.
#[inline]
pub(crate) fn morton_key(color: RGB<u8>) -> u32 {
    (0..MAX_DEPTH).fold(0u32, |key, depth| key << 3 | child_index(color, depth) as u32)
}

#[derive(Debug, Clone)]
struct Node {
    /// Channel sums, valid once the node is a leaf.
    sums: [u64; 3],
    /// Pixel count folded into `sums`.
    count: u64,
    /// Pixels routed through this node, fixed after insertion.
    population: u64,
    children: [u32; 8],
    is_leaf: bool,
}

impl Node {
    fn new(is_leaf: bool) -> Self {
        Self {
            sums: [0; 3],
            count: 0,
            population: 0,
            children: [NONE; 8],
            is_leaf,
        }
    }
}

/// Arena-backed octree.
#[derive(Debug, Clone)]
pub struct Octree {
    nodes: Vec<Node>,
    /// Non-leaf nodes per depth, registered at creation.
    reducible: [Vec<u32>; MAX_DEPTH],
    queues: Option<[BinaryHeap<Reverse<(u64, u32)>>; MAX_DEPTH]>,
    leaf_count: usize,
}

impl Default for Octree {
    fn default() -> Self {
        Self::new()
    }
}

impl Octree {
    pub fn new() -> Self {
        let mut reducible: [Vec<u32>; MAX_DEPTH] = Default::default();
        reducible[0].push(0);
        Self {
            nodes: vec![Node::new(false)],
            reducible,
            queues: None,
            leaf_count: 0,
        }
    }

    pub fn from_histogram(hist: &Histogram) -> Self {
        let mut tree = Self::new();
        for (color, count) in hist.iter() {
            tree.insert(color, count);
        }
        tree
    }

    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    /// Add `weight` occurrences of `color`.
    pub fn insert(&mut self, color: RGB<u8>, weight: u64) {
        if weight == 0 {
            return;
        }
        // Priorities depend on final populations.
        self.queues = None;

        let mut node = 0usize;
        self.nodes[0].population += weight;
        for depth in 0..MAX_DEPTH {
            if self.nodes[node].is_leaf {
                break;
            }
            let slot = child_index(color, depth);
            let mut child = self.nodes[node].children[slot];
            if child == NONE {
                child = self.nodes.len() as u32;
                let is_leaf = depth + 1 == MAX_DEPTH;
                self.nodes.push(Node::new(is_leaf));
                if is_leaf {
                    self.leaf_count += 1;
                } else {
                    self.reducible[depth + 1].push(child);
                }
                self.nodes[node].children[slot] = child;
            }
            node = child as usize;
            self.nodes[node].population += weight;
        }

        let leaf = &mut self.nodes[node];
        leaf.sums[0] += color.r as u64 * weight;
        leaf.sums[1] += color.g as u64 * weight;
        leaf.sums[2] += color.b as u64 * weight;
        leaf.count += weight;
    }

    fn build_queues(&mut self) -> &mut [BinaryHeap<Reverse<(u64, u32)>>; MAX_DEPTH] {
        let nodes = &self.nodes;
        let reducible = &self.reducible;
        self.queues.get_or_insert_with(|| {
            let mut queues: [BinaryHeap<Reverse<(u64, u32)>>; MAX_DEPTH] = Default::default();
            for (depth, list) in reducible.iter().enumerate() {
                queues[depth] = list
                    .iter()
                    .copied()
                    .filter(|&i| !nodes[i as usize].is_leaf)
                    .map(|i| Reverse((nodes[i as usize].population, i)))
                    .collect();
            }
            queues
        })
    }

    /// Fold all children of `idx` into it. Returns how many leaves it removed.
    fn merge(&mut self, idx: usize) -> usize {
        let children = std::mem::replace(&mut self.nodes[idx].children, [NONE; 8]);
        let mut sums = [0u64; 3];
        let mut count = 0u64;
        let mut merged = 0usize;
        for child in children.into_iter().filter(|&c| c != NONE) {
            let child = &self.nodes[child as usize];
            debug_assert!(child.is_leaf);
            for (s, c) in sums.iter_mut().zip(child.sums) {
                *s += c;
            }
            count += child.count;
            merged += 1;
        }
        let node = &mut self.nodes[idx];
        for (s, c) in node.sums.iter_mut().zip(sums) {
            *s += c;
        }
        node.count += count;
        node.is_leaf = true;
        self.leaf_count = self.leaf_count + 1 - merged;
        merged.saturating_sub(1)
    }

    /// Merge reducible nodes, deepest level first and least-populated first,
    /// until the leaf count drops. Returns the number of leaves removed, or 0
    /// when nothing is left to merge.
    pub fn reduce_once(&mut self) -> usize {
        loop {
            let queues = self.build_queues();
            let Some(Reverse((_, idx))) = queues.iter_mut().rev().find_map(|q| q.pop()) else {
                return 0;
            };
            let removed = self.merge(idx as usize);
            if removed > 0 {
                return removed;
            }
        }
    }

    /// Reduce until at most `max_colors` leaves remain.
    pub fn reduce_to(&mut self, max_colors: usize) {
        while self.leaf_count > max_colors {
            if self.reduce_once() == 0 {
                break;
            }
        }
    }

    /// Leaf averages in depth-first child order.
    pub fn leaf_colors(&self) -> Vec<[u8; 3]> {
        let mut out = Vec::with_capacity(self.leaf_count);
        let mut stack = vec![0u32];
        while let Some(idx) = stack.pop() {
            let node = &self.nodes[idx as usize];
            if node.is_leaf {
                if node.count > 0 {
                    out.push(node.sums.map(|s| (s / node.count) as u8));
                }
                continue;
            }
            stack.extend(node.children.iter().rev().filter(|&&c| c != NONE));
        }
        out
    }
}

/// Build a palette of exactly `max_colors` entries from a histogram,
/// padding with black when fewer leaves survive.
pub fn build_palette(hist: &Histogram, max_colors: usize) -> Palette {
    let mut tree = Octree::from_histogram(hist);
    tree.reduce_to(max_colors);
    let mut colors = tree.leaf_colors();
    log::debug!(
        "octree: {} distinct colors reduced to {} leaves",
        hist.len(),
        colors.len()
    );
    if colors.is_empty() {
        colors.push([0, 0, 0]);
    }
    Palette::padded(colors, max_colors)
}
