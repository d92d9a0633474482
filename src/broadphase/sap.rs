//! Sweep and Prune
//!
//! Proxies kept sorted by the lower x bound of their fat AABB. A pair query
//! walks the list once, stopping each inner sweep as soon as the next proxy
//! starts past the current one's upper x bound, and filters the survivors on
//! y. Frame-to-frame coherence keeps the list nearly sorted, so the re-sort
//! after `update` is close to linear.

use rustc_hash::FxHashSet;

use super::Broadphase;
use crate::aabb::Aabb;
use crate::body::{BodyHandle, RigidBody};
use crate::body_set::BodySet;
use crate::debug_draw::{DebugColor, DebugDrawer};
use crate::manifold::PairKey;
use crate::ray::{nearer, raycast_body, Ray, RaycastResult};

#[derive(Clone, Copy, Debug)]
struct SapProxy {
    handle: BodyHandle,
    fat: Aabb,
}

/// Single-axis sweep-and-prune broadphase.
#[derive(Clone, Debug)]
pub struct SweepAndPrune {
    /// Sorted by `(fat.min.x, handle)`
    proxies: Vec<SapProxy>,
    members: FxHashSet<BodyHandle>,
    margin: f32,
}

impl SweepAndPrune {
    /// Create an empty index.
    #[must_use]
    pub fn new(margin: f32) -> Self {
        Self {
            proxies: Vec::new(),
            members: FxHashSet::default(),
            margin,
        }
    }

    fn sort(&mut self) {
        self.proxies.sort_by(|a, b| {
            a.fat
                .min
                .x
                .total_cmp(&b.fat.min.x)
                .then(a.handle.cmp(&b.handle))
        });
    }
}

impl Default for SweepAndPrune {
    fn default() -> Self {
        Self::new(0.2)
    }
}

impl Broadphase for SweepAndPrune {
    fn name(&self) -> &'static str {
        "sweep-and-prune"
    }

    fn add(&mut self, body: &RigidBody) {
        let handle = body.handle();
        debug_assert!(!self.contains(handle), "body {handle} registered twice");
        if !self.members.insert(handle) {
            return;
        }
        let proxy = SapProxy {
            handle,
            fat: body.aabb().inflate(self.margin),
        };
        let at = self.proxies.partition_point(|p| {
            p.fat
                .min
                .x
                .total_cmp(&proxy.fat.min.x)
                .then(p.handle.cmp(&handle))
                .is_lt()
        });
        self.proxies.insert(at, proxy);
    }

    fn remove(&mut self, handle: BodyHandle) -> bool {
        if !self.members.remove(&handle) {
            return false;
        }
        self.proxies.retain(|p| p.handle != handle);
        true
    }

    fn contains(&self, handle: BodyHandle) -> bool {
        self.members.contains(&handle)
    }

    fn len(&self) -> usize {
        self.proxies.len()
    }

    fn update(&mut self, bodies: &BodySet) {
        let margin = self.margin;
        let mut moved = false;
        for proxy in &mut self.proxies {
            let Some(body) = bodies.get(proxy.handle) else {
                continue;
            };
            let tight = body.aabb();
            if !proxy.fat.contains(&tight) {
                proxy.fat = tight.inflate(margin);
                moved = true;
            }
        }
        if moved {
            self.sort();
        }
    }

    fn candidate_pairs(&self) -> Vec<PairKey> {
        let mut pairs = Vec::new();
        for (i, a) in self.proxies.iter().enumerate() {
            for b in &self.proxies[i + 1..] {
                if b.fat.min.x > a.fat.max.x {
                    break;
                }
                if a.fat.overlaps(&b.fat) {
                    pairs.push(PairKey::new(a.handle, b.handle));
                }
            }
        }
        pairs.sort_unstable();
        pairs
    }

    fn raycast(&self, bodies: &BodySet, ray: &Ray, max_distance: f32) -> Option<RaycastResult> {
        let mut best = None;
        let mut max_t = max_distance;
        for proxy in &self.proxies {
            if proxy.fat.ray_entry(ray.origin, ray.direction, max_t).is_none() {
                continue;
            }
            let Some(body) = bodies.get(proxy.handle) else {
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
        self.proxies.clear();
        self.members.clear();
    }

    fn debug_draw(&self, drawer: &mut dyn DebugDrawer) {
        for proxy in &self.proxies {
            drawer.draw_aabb(&proxy.fat, DebugColor::CYAN);
        }
    }
}
