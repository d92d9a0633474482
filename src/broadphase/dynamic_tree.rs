//! Dynamic AABB Tree (Incremental BVH)
//!
//! A self-balancing binary tree of fat AABBs. Leaves are body proxies,
//! internal nodes enclose their children. Supports O(log n) insert, remove
//! and move without a full rebuild.
//!
//! # Features
//!
//! - **Perimeter heuristic**: insertion descends toward the cheapest sibling
//! - **Fat AABBs**: moving bodies only re-insert when they leave their proxy
//! - **Tree rotations**: AVL-style balancing keeps queries O(log n)
//! - **Node pool**: freed nodes are recycled through a free list

use rustc_hash::FxHashMap;

use super::Broadphase;
use crate::aabb::Aabb;
use crate::body::{BodyHandle, RigidBody};
use crate::body_set::BodySet;
use crate::debug_draw::{DebugColor, DebugDrawer};
use crate::manifold::PairKey;
use crate::math::Vec2;
use crate::ray::{nearer, raycast_body, Ray, RaycastResult};

/// Null node sentinel
pub const NULL_NODE: u32 = u32::MAX;

/// A node in the tree
#[derive(Clone, Debug)]
struct TreeNode {
    /// Fat AABB for leaves, union of children for internal nodes
    aabb: Aabb,
    parent: u32,
    left: u32,
    right: u32,
    /// 0 for leaves, -1 for pooled (free) nodes
    height: i32,
    /// Owning body, `BodyHandle::INVALID` for internal nodes
    body: BodyHandle,
}

impl TreeNode {
    const FREE: Self = Self {
        aabb: Aabb::new(Vec2::ZERO, Vec2::ZERO),
        parent: NULL_NODE,
        left: NULL_NODE,
        right: NULL_NODE,
        height: -1,
        body: BodyHandle::INVALID,
    };

    #[inline]
    fn is_leaf(&self) -> bool {
        self.left == NULL_NODE
    }
}

/// Dynamic AABB tree broadphase.
#[derive(Clone, Debug)]
pub struct DynamicTree {
    nodes: Vec<TreeNode>,
    free_list: Vec<u32>,
    root: u32,
    /// Body -> leaf node
    proxies: FxHashMap<BodyHandle, u32>,
    margin: f32,
}

impl DynamicTree {
    /// Create an empty tree.
    #[must_use]
    pub fn new(margin: f32) -> Self {
        Self {
            nodes: Vec::new(),
            free_list: Vec::new(),
            root: NULL_NODE,
            proxies: FxHashMap::default(),
            margin,
        }
    }

    /// Tree height (0 for an empty tree or a single leaf).
    #[must_use]
    pub fn height(&self) -> i32 {
        if self.root == NULL_NODE {
            0
        } else {
            self.nodes[self.root as usize].height
        }
    }

    /// Nodes in use, leaves and internal.
    #[inline]
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len() - self.free_list.len()
    }

    /// Fat AABB stored for a body.
    #[must_use]
    pub fn fat_aabb(&self, handle: BodyHandle) -> Option<Aabb> {
        self.proxies
            .get(&handle)
            .map(|&leaf| self.nodes[leaf as usize].aabb)
    }

    /// Visit every registered body whose fat AABB overlaps `aabb`.
    pub fn query<F: FnMut(BodyHandle)>(&self, aabb: &Aabb, mut callback: F) {
        if self.root == NULL_NODE {
            return;
        }

        let mut stack = Vec::with_capacity(64);
        stack.push(self.root);

        while let Some(id) = stack.pop() {
            let node = &self.nodes[id as usize];
            if !node.aabb.overlaps(aabb) {
                continue;
            }
            if node.is_leaf() {
                callback(node.body);
            } else {
                stack.push(node.left);
                stack.push(node.right);
            }
        }
    }

    /// Check parent links, heights and enclosing boxes. Test helper.
    #[cfg(test)]
    fn validate_structure(&self) {
        if self.root == NULL_NODE {
            return;
        }
        assert_eq!(self.nodes[self.root as usize].parent, NULL_NODE);
        let mut stack = vec![self.root];
        let mut leaves = 0;
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id as usize];
            if node.is_leaf() {
                assert_eq!(node.height, 0);
                leaves += 1;
                continue;
            }
            let (l, r) = (&self.nodes[node.left as usize], &self.nodes[node.right as usize]);
            assert_eq!(l.parent, id);
            assert_eq!(r.parent, id);
            assert_eq!(node.height, 1 + l.height.max(r.height));
            assert!(node.aabb.contains(&l.aabb) && node.aabb.contains(&r.aabb));
            stack.push(node.left);
            stack.push(node.right);
        }
        assert_eq!(leaves, self.proxies.len());
    }

    // =========== Internal methods ===========

    #[inline]
    fn node_height(&self, id: u32) -> i32 {
        if id == NULL_NODE {
            -1
        } else {
            self.nodes[id as usize].height
        }
    }

    fn alloc_node(&mut self) -> u32 {
        if let Some(id) = self.free_list.pop() {
            id
        } else {
            self.nodes.push(TreeNode::FREE);
            (self.nodes.len() - 1) as u32
        }
    }

    fn free_node(&mut self, id: u32) {
        self.nodes[id as usize] = TreeNode::FREE;
        self.free_list.push(id);
    }

    /// Recompute an internal node's height and box from its children.
    fn refresh(&mut self, id: u32) {
        let (l, r) = {
            let n = &self.nodes[id as usize];
            (n.left, n.right)
        };
        let height = 1 + self.node_height(l).max(self.node_height(r));
        let aabb = self.nodes[l as usize]
            .aabb
            .union(&self.nodes[r as usize].aabb);
        let n = &mut self.nodes[id as usize];
        n.height = height;
        n.aabb = aabb;
    }

    fn replace_child(&mut self, parent: u32, old: u32, new: u32) {
        if parent == NULL_NODE {
            self.root = new;
        } else if self.nodes[parent as usize].left == old {
            self.nodes[parent as usize].left = new;
        } else {
            self.nodes[parent as usize].right = new;
        }
    }

    fn child_insertion_cost(&self, child: u32, leaf_aabb: &Aabb, inheritance: f32) -> f32 {
        let node = &self.nodes[child as usize];
        let combined = leaf_aabb.union(&node.aabb).perimeter();
        if node.is_leaf() {
            combined + inheritance
        } else {
            (combined - node.aabb.perimeter()) + inheritance
        }
    }

    fn insert_leaf(&mut self, leaf: u32) {
        if self.root == NULL_NODE {
            self.root = leaf;
            self.nodes[leaf as usize].parent = NULL_NODE;
            return;
        }

        // Descend toward the cheapest sibling
        let leaf_aabb = self.nodes[leaf as usize].aabb;
        let mut sibling = self.root;
        while !self.nodes[sibling as usize].is_leaf() {
            let node = &self.nodes[sibling as usize];
            let (left, right) = (node.left, node.right);

            let area = node.aabb.perimeter();
            let combined_area = leaf_aabb.union(&node.aabb).perimeter();
            let cost = 2.0 * combined_area;
            let inheritance = 2.0 * (combined_area - area);

            let cost_left = self.child_insertion_cost(left, &leaf_aabb, inheritance);
            let cost_right = self.child_insertion_cost(right, &leaf_aabb, inheritance);

            if cost < cost_left && cost < cost_right {
                break;
            }
            sibling = if cost_left < cost_right { left } else { right };
        }

        let old_parent = self.nodes[sibling as usize].parent;
        let new_parent = self.alloc_node();
        self.nodes[new_parent as usize] = TreeNode {
            aabb: leaf_aabb.union(&self.nodes[sibling as usize].aabb),
            parent: old_parent,
            left: sibling,
            right: leaf,
            height: self.nodes[sibling as usize].height + 1,
            body: BodyHandle::INVALID,
        };
        self.replace_child(old_parent, sibling, new_parent);
        self.nodes[sibling as usize].parent = new_parent;
        self.nodes[leaf as usize].parent = new_parent;

        self.fix_upwards(new_parent);
    }

    fn remove_leaf(&mut self, leaf: u32) {
        if leaf == self.root {
            self.root = NULL_NODE;
            return;
        }

        let parent = self.nodes[leaf as usize].parent;
        let grand_parent = self.nodes[parent as usize].parent;
        let sibling = if self.nodes[parent as usize].left == leaf {
            self.nodes[parent as usize].right
        } else {
            self.nodes[parent as usize].left
        };

        self.replace_child(grand_parent, parent, sibling);
        self.nodes[sibling as usize].parent = grand_parent;
        self.free_node(parent);
        self.nodes[leaf as usize].parent = NULL_NODE;

        if grand_parent != NULL_NODE {
            self.fix_upwards(grand_parent);
        }
    }

    /// Walk to the root rebalancing and refreshing boxes and heights.
    fn fix_upwards(&mut self, start: u32) {
        let mut id = start;
        while id != NULL_NODE {
            id = self.balance(id);
            self.refresh(id);
            id = self.nodes[id as usize].parent;
        }
    }

    /// Rotate the taller child up if the subtree is out of balance. Returns
    /// the subtree's new root.
    fn balance(&mut self, id: u32) -> u32 {
        let node = &self.nodes[id as usize];
        if node.is_leaf() || node.height < 2 {
            return id;
        }
        let balance = self.node_height(node.right) - self.node_height(node.left);
        if balance > 1 {
            self.rotate(id, true)
        } else if balance < -1 {
            self.rotate(id, false)
        } else {
            id
        }
    }

    /// Promote the right (`up_right`) or left child of `a`. The promoted
    /// child keeps its taller grandchild; the shorter one moves under `a`.
    fn rotate(&mut self, a: u32, up_right: bool) -> u32 {
        let c = if up_right {
            self.nodes[a as usize].right
        } else {
            self.nodes[a as usize].left
        };
        let (f, g) = {
            let n = &self.nodes[c as usize];
            (n.left, n.right)
        };
        let parent = self.nodes[a as usize].parent;

        self.nodes[c as usize].parent = parent;
        self.nodes[a as usize].parent = c;
        self.replace_child(parent, a, c);

        let (keep, give) = if self.node_height(f) > self.node_height(g) {
            (f, g)
        } else {
            (g, f)
        };
        if up_right {
            self.nodes[c as usize].left = a;
            self.nodes[c as usize].right = keep;
            self.nodes[a as usize].right = give;
        } else {
            self.nodes[c as usize].right = a;
            self.nodes[c as usize].left = keep;
            self.nodes[a as usize].left = give;
        }
        self.nodes[keep as usize].parent = c;
        self.nodes[give as usize].parent = a;

        self.refresh(a);
        self.refresh(c);
        c
    }

    fn insert_proxy(&mut self, handle: BodyHandle, tight: Aabb) {
        let leaf = self.alloc_node();
        self.nodes[leaf as usize] = TreeNode {
            aabb: tight.inflate(self.margin),
            parent: NULL_NODE,
            left: NULL_NODE,
            right: NULL_NODE,
            height: 0,
            body: handle,
        };
        self.insert_leaf(leaf);
        self.proxies.insert(handle, leaf);
    }

    /// Re-insert a leaf if its tight box left the fat box. Returns `true` if
    /// the tree changed.
    fn move_proxy(&mut self, leaf: u32, tight: Aabb) -> bool {
        if self.nodes[leaf as usize].aabb.contains(&tight) {
            return false;
        }
        self.remove_leaf(leaf);
        self.nodes[leaf as usize].aabb = tight.inflate(self.margin);
        self.insert_leaf(leaf);
        true
    }
}

impl Default for DynamicTree {
    fn default() -> Self {
        Self::new(0.2)
    }
}

impl Broadphase for DynamicTree {
    fn name(&self) -> &'static str {
        "dynamic-tree"
    }

    fn add(&mut self, body: &RigidBody) {
        debug_assert!(
            !self.contains(body.handle()),
            "body {} registered twice",
            body.handle()
        );
        if let Some(&leaf) = self.proxies.get(&body.handle()) {
            self.move_proxy(leaf, body.aabb());
            return;
        }
        self.insert_proxy(body.handle(), body.aabb());
    }

    fn remove(&mut self, handle: BodyHandle) -> bool {
        let Some(leaf) = self.proxies.remove(&handle) else {
            return false;
        };
        self.remove_leaf(leaf);
        self.free_node(leaf);
        true
    }

    fn contains(&self, handle: BodyHandle) -> bool {
        self.proxies.contains_key(&handle)
    }

    fn len(&self) -> usize {
        self.proxies.len()
    }

    fn update(&mut self, bodies: &BodySet) {
        for body in bodies {
            if let Some(&leaf) = self.proxies.get(&body.handle()) {
                self.move_proxy(leaf, body.aabb());
            }
        }
    }

    fn candidate_pairs(&self) -> Vec<PairKey> {
        let mut pairs = Vec::new();
        for (&handle, &leaf) in &self.proxies {
            let fat = self.nodes[leaf as usize].aabb;
            self.query(&fat, |other| {
                if handle < other {
                    pairs.push(PairKey::new(handle, other));
                }
            });
        }
        pairs.sort_unstable();
        pairs.dedup();
        pairs
    }

    fn raycast(&self, bodies: &BodySet, ray: &Ray, max_distance: f32) -> Option<RaycastResult> {
        if self.root == NULL_NODE {
            return None;
        }

        let mut best: Option<RaycastResult> = None;
        let mut max_t = max_distance;
        let mut stack = Vec::with_capacity(64);
        stack.push(self.root);

        while let Some(id) = stack.pop() {
            let node = &self.nodes[id as usize];
            if node.aabb.ray_entry(ray.origin, ray.direction, max_t).is_none() {
                continue;
            }
            if !node.is_leaf() {
                stack.push(node.left);
                stack.push(node.right);
                continue;
            }
            let Some(body) = bodies.get(node.body) else {
                continue;
            };
            if let Some(hit) = raycast_body(body, ray, max_t) {
                best = nearer(best, hit);
                max_t = max_t.min(hit.distance);
            }
        }
        best
    }

    fn clear(&mut self) {
        self.nodes.clear();
        self.free_list.clear();
        self.proxies.clear();
        self.root = NULL_NODE;
    }

    fn debug_draw(&self, drawer: &mut dyn DebugDrawer) {
        for node in self.nodes.iter().filter(|n| n.height >= 0) {
            let color = if node.is_leaf() {
                DebugColor::CYAN
            } else {
                DebugColor::GRAY
            };
            drawer.draw_aabb(&node.aabb, color);
        }
    }
}
