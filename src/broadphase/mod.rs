//! Broadphase
//!
//! Spatial indexes that turn the body set into a short, canonical list of
//! candidate pairs and answer ray queries. Every strategy implements the same
//! [`Broadphase`] trait so the world can hold any of them.
//!
//! # Strategies
//!
//! - [`DynamicTree`]: incremental AABB tree, O(log n) insert/remove/query.
//! - [`SweepAndPrune`]: proxies sorted along x, swept once per query.
//! - [`BruteForce`]: O(n²) reference implementation.
//!
//! All three store *fat* proxies (tight bounds inflated by a margin) and only
//! refresh a proxy when the body's tight bounds leave it.

mod brute_force;
mod dynamic_tree;
mod sap;

pub use brute_force::BruteForce;
pub use dynamic_tree::{DynamicTree, NULL_NODE};
pub use sap::SweepAndPrune;

use crate::body::{BodyHandle, RigidBody};
use crate::body_set::BodySet;
use crate::debug_draw::DebugDrawer;
use crate::manifold::{ManifoldSet, PairKey};
use crate::ray::{Ray, RaycastResult};

/// Contract shared by all broadphase strategies.
pub trait Broadphase: Send {
    /// Short strategy name for logs.
    fn name(&self) -> &'static str;

    /// Register a body using its cached bounds.
    fn add(&mut self, body: &RigidBody);

    /// Deregister a body. Returns `false` if it was not registered.
    fn remove(&mut self, handle: BodyHandle) -> bool;

    /// `true` if the body is registered.
    fn contains(&self, handle: BodyHandle) -> bool;

    /// Number of registered bodies.
    fn len(&self) -> usize;

    /// `true` if nothing is registered.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resynchronise proxies with the bodies' cached bounds.
    fn update(&mut self, bodies: &BodySet);

    /// Sorted, duplicate-free pairs whose fat proxies overlap.
    fn candidate_pairs(&self) -> Vec<PairKey>;

    /// Nearest hit within `max_distance`, ties going to the lower handle.
    fn raycast(&self, bodies: &BodySet, ray: &Ray, max_distance: f32) -> Option<RaycastResult>;

    /// Deregister everything.
    fn clear(&mut self);

    /// Draw the proxies.
    fn debug_draw(&self, drawer: &mut dyn DebugDrawer);

    /// Bring `manifolds` in line with the current candidate pairs: new pairs
    /// get a fresh manifold, existing ones keep their warm-start state, pairs
    /// that stopped overlapping are pruned. Returns `(inserted, removed)`.
    fn compute_pairs(&self, bodies: &BodySet, manifolds: &mut ManifoldSet) -> (usize, usize) {
        let pairs = self.candidate_pairs();
        manifolds.sync(&pairs, bodies)
    }
}

/// Selects the strategy built by `PhysicsWorld::new`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BroadphaseKind {
    /// [`DynamicTree`]
    #[default]
    DynamicTree,
    /// [`SweepAndPrune`]
    SweepAndPrune,
    /// [`BruteForce`]
    BruteForce,
}

impl BroadphaseKind {
    /// Build an empty broadphase with the given fat margin.
    #[must_use]
    pub fn build(self, fat_margin: f32) -> Box<dyn Broadphase> {
        match self {
            Self::DynamicTree => Box::new(DynamicTree::new(fat_margin)),
            Self::SweepAndPrune => Box::new(SweepAndPrune::new(fat_margin)),
            Self::BruteForce => Box::new(BruteForce::new(fat_margin)),
        }
    }
}

/// All-pairs pairing straight from the body set, bypassing any index.
///
/// Uses freshly fattened bounds for every body, so on a freshly indexed scene
/// it yields the same pairs as every [`Broadphase`].
#[must_use]
pub fn brute_force_pairs(bodies: &BodySet, fat_margin: f32) -> Vec<PairKey> {
    let fat: Vec<_> = bodies
        .iter()
        .map(|b| (b.handle(), b.aabb().inflate(fat_margin)))
        .collect();

    let mut pairs = Vec::new();
    for (i, (ha, a)) in fat.iter().enumerate() {
        for (hb, b) in &fat[i + 1..] {
            if a.overlaps(b) {
                pairs.push(PairKey::new(*ha, *hb));
            }
        }
    }
    pairs.sort_unstable();
    pairs
}

// ============================================================================
// Tests
// ============================================================================
