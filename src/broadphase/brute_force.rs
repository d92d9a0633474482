//! Brute Force
//!
//! Insertion-ordered proxy list tested all-against-all. O(n²) per query, kept
//! as the reference the other strategies are checked against and for small
//! scenes where an index does not pay off.

use super::Broadphase;
use crate::aabb::Aabb;
use crate::body::{BodyHandle, RigidBody};
use crate::body_set::BodySet;
use crate::debug_draw::{DebugColor, DebugDrawer};
use crate::manifold::PairKey;
use crate::ray::{nearer, raycast_body, Ray, RaycastResult};

/// All-pairs broadphase.
#[derive(Clone, Debug)]
pub struct BruteForce {
    proxies: Vec<(BodyHandle, Aabb)>,
    margin: f32,
}

impl BruteForce {
    /// Create an empty list.
    #[must_use]
    pub fn new(margin: f32) -> Self {
        Self {
            proxies: Vec::new(),
            margin,
        }
    }
}

impl Default for BruteForce {
    fn default() -> Self {
        Self::new(0.2)
    }
}

impl Broadphase for BruteForce {
    fn name(&self) -> &'static str {
        "brute-force"
    }

    fn add(&mut self, body: &RigidBody) {
        let handle = body.handle();
        debug_assert!(!self.contains(handle), "body {handle} registered twice");
        if self.contains(handle) {
            return;
        }
        self.proxies.push((handle, body.aabb().inflate(self.margin)));
    }

    fn remove(&mut self, handle: BodyHandle) -> bool {
        let before = self.proxies.len();
        self.proxies.retain(|(h, _)| *h != handle);
        self.proxies.len() != before
    }

    fn contains(&self, handle: BodyHandle) -> bool {
        self.proxies.iter().any(|(h, _)| *h == handle)
    }

    fn len(&self) -> usize {
        self.proxies.len()
    }

    fn update(&mut self, bodies: &BodySet) {
        for (handle, fat) in &mut self.proxies {
            if let Some(body) = bodies.get(*handle) {
                let tight = body.aabb();
                if !fat.contains(&tight) {
                    *fat = tight.inflate(self.margin);
                }
            }
        }
    }

    fn candidate_pairs(&self) -> Vec<PairKey> {
        let mut pairs = Vec::new();
        for (i, (ha, a)) in self.proxies.iter().enumerate() {
            for (hb, b) in &self.proxies[i + 1..] {
                if a.overlaps(b) {
                    pairs.push(PairKey::new(*ha, *hb));
                }
            }
        }
        pairs.sort_unstable();
        pairs
    }

    fn raycast(&self, bodies: &BodySet, ray: &Ray, max_distance: f32) -> Option<RaycastResult> {
        self.proxies
            .iter()
            .filter_map(|(handle, _)| bodies.get(*handle))
            .filter_map(|body| raycast_body(body, ray, max_distance))
            .fold(None, nearer)
    }

    fn clear(&mut self) {
        self.proxies.clear();
    }

    fn debug_draw(&self, drawer: &mut dyn DebugDrawer) {
        for (_, fat) in &self.proxies {
            drawer.draw_aabb(fat, DebugColor::CYAN);
        }
    }
}
