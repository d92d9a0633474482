//! Persistent Contact Manifolds
//!
//! One [`Manifold`] per broadphase candidate pair. A manifold survives as long
//! as its pair stays a candidate, carrying accumulated impulses from one step
//! to the next for warm starting.
//!
//! # Lifecycle per step
//!
//! 1. `solve_contacts`: narrow phase; new points inherit impulses from old
//!    points with the same feature id.
//! 2. `pre_step`: effective masses and bias velocities (`prepare`), then
//!    warm-start impulses (`warm_start`). The world runs `prepare` over every
//!    manifold before any warm start is applied.
//! 3. `apply_impulse` (repeated): one sequential-impulse pass with clamped
//!    accumulated normal and friction impulses.

use std::collections::BTreeMap;

use crate::body::{BodyHandle, RigidBody};
use crate::body_set::BodySet;
use crate::collision::{collide, ContactPoint, FeatureId, MAX_CONTACT_POINTS};
use crate::config::WorldConfig;
use crate::math::{cross_sv, cross_vs, Vec2};

// ============================================================================
// PairKey
// ============================================================================

/// Canonical unordered body pair: `a` is always the smaller handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PairKey {
    a: BodyHandle,
    b: BodyHandle,
}

impl PairKey {
    /// Create a canonical key (ensures a < b).
    #[inline]
    #[must_use]
    pub fn new(x: BodyHandle, y: BodyHandle) -> Self {
        debug_assert_ne!(x, y, "a body cannot pair with itself");
        if x < y {
            Self { a: x, b: y }
        } else {
            Self { a: y, b: x }
        }
    }

    /// Smaller handle.
    #[inline]
    #[must_use]
    pub fn a(self) -> BodyHandle {
        self.a
    }

    /// Larger handle.
    #[inline]
    #[must_use]
    pub fn b(self) -> BodyHandle {
        self.b
    }

    /// `true` if either side is `handle`.
    #[inline]
    #[must_use]
    pub fn involves(self, handle: BodyHandle) -> bool {
        self.a == handle || self.b == handle
    }
}

// ============================================================================
// Contact
// ============================================================================

/// Solver state for one contact point.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Contact {
    /// World-space contact point
    pub position: Vec2,
    /// Unit normal from A to B
    pub normal: Vec2,
    /// Contact point relative to A's center of mass
    pub r1: Vec2,
    /// Contact point relative to B's center of mass
    pub r2: Vec2,
    /// Signed surface distance (negative = penetrating)
    pub separation: f32,
    /// Accumulated normal impulse
    pub pn: f32,
    /// Accumulated tangent impulse
    pub pt: f32,
    /// Effective mass along the normal
    pub mass_normal: f32,
    /// Effective mass along the tangent
    pub mass_tangent: f32,
    /// Target normal velocity (penetration recovery or restitution)
    pub bias: f32,
    /// Generating features, used for warm-start matching
    pub feature: FeatureId,
}

impl From<&ContactPoint> for Contact {
    fn from(p: &ContactPoint) -> Self {
        Self {
            position: p.position,
            normal: p.normal,
            separation: p.separation,
            feature: p.feature,
            ..Self::default()
        }
    }
}

#[inline]
fn relative_velocity(a: &RigidBody, b: &RigidBody, c: &Contact) -> Vec2 {
    b.velocity + cross_sv(b.angular_velocity, c.r2) - a.velocity - cross_sv(a.angular_velocity, c.r1)
}

#[inline]
fn apply_pair_impulse(a: &mut RigidBody, b: &mut RigidBody, c: &Contact, p: Vec2) {
    a.velocity -= p * a.inv_mass();
    a.angular_velocity -= a.inv_inertia() * c.r1.cross(p);
    b.velocity += p * b.inv_mass();
    b.angular_velocity += b.inv_inertia() * c.r2.cross(p);
}

// ============================================================================
// Manifold
// ============================================================================

/// Contact state for one candidate pair.
#[derive(Clone, Debug)]
pub struct Manifold {
    key: PairKey,
    contacts: [Contact; MAX_CONTACT_POINTS],
    count: usize,
    friction: f32,
    restitution: f32,
    colliding: bool,
}

impl Manifold {
    /// Fresh manifold for a pair. `a` and `b` must be the bodies of `key` in order.
    #[must_use]
    pub fn new(key: PairKey, a: &RigidBody, b: &RigidBody) -> Self {
        let mut m = Self {
            key,
            contacts: [Contact::default(); MAX_CONTACT_POINTS],
            count: 0,
            friction: 0.0,
            restitution: 0.0,
            colliding: false,
        };
        m.mix_materials(a, b);
        m
    }

    fn mix_materials(&mut self, a: &RigidBody, b: &RigidBody) {
        self.friction = (a.material.friction * b.material.friction).sqrt();
        self.restitution = a.material.restitution.max(b.material.restitution);
    }

    /// Pair identity.
    #[inline]
    #[must_use]
    pub fn key(&self) -> PairKey {
        self.key
    }

    /// Contacts found by the last `solve_contacts`.
    #[inline]
    #[must_use]
    pub fn contacts(&self) -> &[Contact] {
        &self.contacts[..self.count]
    }

    /// `true` if the last narrow phase found contacts.
    #[inline]
    #[must_use]
    pub fn is_colliding(&self) -> bool {
        self.colliding
    }

    /// Mixed friction coefficient.
    #[inline]
    #[must_use]
    pub fn friction(&self) -> f32 {
        self.friction
    }

    /// Mixed restitution coefficient.
    #[inline]
    #[must_use]
    pub fn restitution(&self) -> f32 {
        self.restitution
    }

    /// Narrow phase. Replaces the contact list; with `warm_starting`, new
    /// contacts keep the accumulated impulses of old contacts with the same
    /// feature id.
    pub fn solve_contacts(&mut self, a: &RigidBody, b: &RigidBody, warm_starting: bool) {
        debug_assert_eq!(a.handle(), self.key.a);
        debug_assert_eq!(b.handle(), self.key.b);

        let points = collide(a, b);
        let mut merged = [Contact::default(); MAX_CONTACT_POINTS];
        for (slot, p) in merged.iter_mut().zip(points.as_slice()) {
            *slot = Contact::from(p);
            if warm_starting {
                if let Some(old) = self.contacts().iter().find(|c| c.feature == p.feature) {
                    slot.pn = old.pn;
                    slot.pt = old.pt;
                }
            }
        }

        self.contacts = merged;
        self.count = points.len();
        self.colliding = !points.is_empty();
        self.mix_materials(a, b);
    }

    /// Prepare the contacts for iteration and apply warm-start impulses.
    ///
    /// Equivalent to [`Manifold::prepare`] followed by [`Manifold::warm_start`].
    /// The world runs the two halves as separate passes over the whole set.
    pub fn pre_step(&mut self, a: &mut RigidBody, b: &mut RigidBody, inv_dt: f32, config: &WorldConfig) {
        self.prepare(a, b, inv_dt, config);
        if config.warm_starting {
            self.warm_start(a, b);
        }
    }

    /// Effective masses and velocity bias for every contact.
    ///
    /// Reads velocities only, so approach speeds are those before any warm
    /// start of this step. Accumulated impulses are zeroed when warm starting
    /// is off.
    pub fn prepare(&mut self, a: &RigidBody, b: &RigidBody, inv_dt: f32, config: &WorldConfig) {
        if !self.colliding {
            return;
        }
        let restitution = self.restitution;

        for c in &mut self.contacts[..self.count] {
            c.r1 = c.position - a.position;
            c.r2 = c.position - b.position;

            let rn1 = c.r1.dot(c.normal);
            let rn2 = c.r2.dot(c.normal);
            let k_normal = a.inv_mass()
                + b.inv_mass()
                + a.inv_inertia() * (c.r1.length_squared() - rn1 * rn1)
                + b.inv_inertia() * (c.r2.length_squared() - rn2 * rn2);
            c.mass_normal = if k_normal > 0.0 { 1.0 / k_normal } else { 0.0 };

            let tangent = cross_vs(c.normal, 1.0);
            let rt1 = c.r1.dot(tangent);
            let rt2 = c.r2.dot(tangent);
            let k_tangent = a.inv_mass()
                + b.inv_mass()
                + a.inv_inertia() * (c.r1.length_squared() - rt1 * rt1)
                + b.inv_inertia() * (c.r2.length_squared() - rt2 * rt2);
            c.mass_tangent = if k_tangent > 0.0 { 1.0 / k_tangent } else { 0.0 };

            let vn = relative_velocity(a, b, c).dot(c.normal);
            let penetration_bias =
                config.baumgarte * inv_dt * (-c.separation - config.allowed_penetration).max(0.0);
            let restitution_bias = if vn < -config.restitution_threshold {
                -restitution * vn
            } else {
                0.0
            };
            c.bias = penetration_bias.max(restitution_bias);

            if !config.warm_starting {
                c.pn = 0.0;
                c.pt = 0.0;
            }
        }
    }

    /// Apply the accumulated impulses carried over from the previous step.
    pub fn warm_start(&mut self, a: &mut RigidBody, b: &mut RigidBody) {
        if !self.colliding {
            return;
        }
        for c in &self.contacts[..self.count] {
            let p = c.normal * c.pn + cross_vs(c.normal, 1.0) * c.pt;
            apply_pair_impulse(a, b, c, p);
        }
    }

    /// One sequential-impulse iteration over this manifold's contacts.
    pub fn apply_impulse(&mut self, a: &mut RigidBody, b: &mut RigidBody) {
        if !self.colliding {
            return;
        }
        let friction = self.friction;

        for c in &mut self.contacts[..self.count] {
            // Normal: accumulated impulse stays non-negative
            let vn = relative_velocity(a, b, c).dot(c.normal);
            let d_pn = c.mass_normal * (-vn + c.bias);
            let pn0 = c.pn;
            c.pn = (pn0 + d_pn).max(0.0);
            let d_pn = c.pn - pn0;
            apply_pair_impulse(a, b, c, c.normal * d_pn);

            // Friction: box clamp against the accumulated normal impulse
            let tangent = cross_vs(c.normal, 1.0);
            let vt = relative_velocity(a, b, c).dot(tangent);
            let d_pt = c.mass_tangent * -vt;
            let max_pt = friction * c.pn;
            let pt0 = c.pt;
            c.pt = (pt0 + d_pt).max(-max_pt).min(max_pt);
            let d_pt = c.pt - pt0;
            apply_pair_impulse(a, b, c, tangent * d_pt);
        }
    }
}

// ============================================================================
// ManifoldSet
// ============================================================================

/// All live manifolds, keyed and iterated in ascending [`PairKey`] order.
#[derive(Clone, Debug, Default)]
pub struct ManifoldSet {
    manifolds: BTreeMap<PairKey, Manifold>,
}

impl ManifoldSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live manifolds.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.manifolds.len()
    }

    /// `true` if there are no manifolds.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.manifolds.is_empty()
    }

    /// `true` if a manifold exists for the pair.
    #[inline]
    #[must_use]
    pub fn contains(&self, key: PairKey) -> bool {
        self.manifolds.contains_key(&key)
    }

    /// Manifold for a pair.
    #[inline]
    #[must_use]
    pub fn get(&self, key: PairKey) -> Option<&Manifold> {
        self.manifolds.get(&key)
    }

    /// Manifolds in key order.
    pub fn iter(&self) -> impl Iterator<Item = &Manifold> {
        self.manifolds.values()
    }

    /// Mutable manifolds in key order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Manifold> {
        self.manifolds.values_mut()
    }

    /// Make the set match `pairs` (sorted, duplicate-free): insert manifolds
    /// for new pairs, keep existing ones untouched, drop the rest. Pairs with
    /// two zero-inverse-mass bodies, or with a body not in `bodies`, are
    /// skipped. Returns `(inserted, removed)`.
    pub fn sync(&mut self, pairs: &[PairKey], bodies: &BodySet) -> (usize, usize) {
        debug_assert!(pairs.windows(2).all(|w| w[0] < w[1]), "pairs must be sorted and unique");

        let before = self.manifolds.len();
        self.manifolds.retain(|key, _| pairs.binary_search(key).is_ok());
        let removed = before - self.manifolds.len();

        let mut inserted = 0;
        for &key in pairs {
            if self.manifolds.contains_key(&key) {
                continue;
            }
            let Some((a, b)) = bodies.pair(key.a, key.b) else {
                continue;
            };
            if a.inv_mass() == 0.0 && b.inv_mass() == 0.0 {
                continue;
            }
            self.manifolds.insert(key, Manifold::new(key, a, b));
            inserted += 1;
        }
        (inserted, removed)
    }

    /// Drop every manifold that references `handle`.
    pub fn remove_involving(&mut self, handle: BodyHandle) -> usize {
        let before = self.manifolds.len();
        self.manifolds.retain(|key, _| !key.involves(handle));
        before - self.manifolds.len()
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.manifolds.clear();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::Material;
    use crate::shape::Shape;

    fn h(raw: u32) -> BodyHandle {
        BodyHandle::from_raw(raw)
    }

    fn with_handle(mut body: RigidBody, raw: u32) -> RigidBody {
        body.set_handle(h(raw));
        body.update();
        body
    }

    fn zero_g() -> WorldConfig {
        WorldConfig::default().with_gravity(Vec2::ZERO)
    }

    #[test]
    fn test_pair_key_canonical() {
        assert_eq!(PairKey::new(h(5), h(2)), PairKey::new(h(2), h(5)));
        let k = PairKey::new(h(9), h(3));
        assert_eq!((k.a(), k.b()), (h(3), h(9)));
        assert!(k.involves(h(9)));
        assert!(!k.involves(h(4)));
        assert!(PairKey::new(h(0), h(7)) < PairKey::new(h(1), h(2)));
    }

    #[test]
    fn test_material_mixing() {
        let a = with_handle(
            RigidBody::new_dynamic(Vec2::ZERO, 1.0, Shape::circle(0.5))
                .with_material(Material::new(0.2, 0.4)),
            0,
        );
        let b = with_handle(
            RigidBody::new_dynamic(Vec2::UNIT_X, 1.0, Shape::circle(0.5))
                .with_material(Material::new(0.8, 0.9)),
            1,
        );
        let m = Manifold::new(PairKey::new(h(0), h(1)), &a, &b);
        assert!((m.friction() - 0.6).abs() < 1e-6);
        assert_eq!(m.restitution(), 0.8);
    }

    #[test]
    fn test_non_colliding_stays_in_set() {
        let a = with_handle(RigidBody::new_dynamic(Vec2::ZERO, 1.0, Shape::circle(0.5)), 0);
        let b = with_handle(RigidBody::new_dynamic(Vec2::new(1.1, 0.0), 1.0, Shape::circle(0.5)), 1);
        let mut m = Manifold::new(PairKey::new(h(0), h(1)), &a, &b);
        m.solve_contacts(&a, &b, true);
        assert!(!m.is_colliding());
        assert!(m.contacts().is_empty());
    }

    #[test]
    fn test_head_on_exchange_single_manifold() {
        let mut a = with_handle(
            RigidBody::new_dynamic(Vec2::ZERO, 1.0, Shape::circle(0.5))
                .with_velocity(Vec2::new(4.0, 0.0))
                .with_restitution(1.0),
            0,
        );
        let mut b = with_handle(
            RigidBody::new_dynamic(Vec2::new(0.995, 0.0), 1.0, Shape::circle(0.5)).with_restitution(1.0),
            1,
        );
        let config = zero_g();
        let mut m = Manifold::new(PairKey::new(h(0), h(1)), &a, &b);
        m.solve_contacts(&a, &b, config.warm_starting);
        assert!(m.is_colliding());
        m.pre_step(&mut a, &mut b, 60.0, &config);
        for _ in 0..config.iterations {
            m.apply_impulse(&mut a, &mut b);
        }
        assert!(a.velocity.x.abs() < 1e-4, "a = {:?}", a.velocity);
        assert!((b.velocity.x - 4.0).abs() < 1e-4, "b = {:?}", b.velocity);
        assert!(m.contacts()[0].pn > 0.0);
    }

    #[test]
    fn test_warm_start_carries_impulse() {
        let ground = with_handle(RigidBody::new_static(Vec2::ZERO, Shape::rectangle(5.0, 0.5)), 0);
        let mut box_ = with_handle(
            RigidBody::new_dynamic(Vec2::new(0.0, 0.99), 1.0, Shape::rectangle(0.5, 0.5))
                .with_velocity(Vec2::new(0.0, -1.0)),
            1,
        );
        let mut ground = ground;
        let config = zero_g();
        let mut m = Manifold::new(PairKey::new(h(0), h(1)), &ground, &box_);
        m.solve_contacts(&ground, &box_, true);
        assert_eq!(m.contacts().len(), 2);
        m.pre_step(&mut ground, &mut box_, 60.0, &config);
        for _ in 0..config.iterations {
            m.apply_impulse(&mut ground, &mut box_);
        }
        let accumulated: Vec<f32> = m.contacts().iter().map(|c| c.pn).collect();
        assert!(accumulated.iter().all(|&pn| pn > 0.0));

        // Same features next step: impulses carried over
        m.solve_contacts(&ground, &box_, true);
        let carried: Vec<f32> = m.contacts().iter().map(|c| c.pn).collect();
        assert_eq!(accumulated, carried);

        // Without warm starting nothing is carried
        m.solve_contacts(&ground, &box_, false);
        assert!(m.contacts().iter().all(|c| c.pn == 0.0));
    }

    #[test]
    fn test_restitution_bias_read_before_warm_start() {
        let mut ground = with_handle(RigidBody::new_static(Vec2::ZERO, Shape::rectangle(5.0, 0.5)), 0);
        let mut box_ = with_handle(
            RigidBody::new_dynamic(Vec2::new(0.0, 0.995), 1.0, Shape::rectangle(0.5, 0.5))
                .with_velocity(Vec2::new(0.0, -5.0))
                .with_restitution(1.0),
            1,
        );
        let config = zero_g();
        let mut m = Manifold::new(PairKey::new(h(0), h(1)), &ground, &box_);
        m.solve_contacts(&ground, &box_, true);
        assert_eq!(m.contacts().len(), 2);
        let count = m.count;
        for c in &mut m.contacts[..count] {
            c.pn = 1.0;
        }

        m.pre_step(&mut ground, &mut box_, 60.0, &config);

        // Both contacts target the pre-warm-start approach speed
        for c in m.contacts() {
            assert!((c.bias - 5.0).abs() < 1e-4, "bias = {}", c.bias);
        }
        assert!(box_.velocity.y > -5.0);
    }

    #[test]
    fn test_friction_clamped_by_normal_impulse() {
        let mut ground = with_handle(RigidBody::new_static(Vec2::ZERO, Shape::rectangle(5.0, 0.5)), 0);
        let mut slider = with_handle(
            RigidBody::new_dynamic(Vec2::new(0.0, 0.99), 1.0, Shape::rectangle(0.5, 0.5))
                .with_velocity(Vec2::new(10.0, -1.0))
                .with_friction(0.5),
            1,
        );
        let config = zero_g();
        let mut m = Manifold::new(PairKey::new(h(0), h(1)), &ground, &slider);
        m.solve_contacts(&ground, &slider, true);
        m.pre_step(&mut ground, &mut slider, 60.0, &config);
        for _ in 0..config.iterations {
            m.apply_impulse(&mut ground, &mut slider);
        }
        for c in m.contacts() {
            assert!(c.pt.abs() <= m.friction() * c.pn + 1e-6);
        }
        assert!(slider.velocity.x < 10.0 && slider.velocity.x > 0.0);
        assert!(slider.velocity.y > -0.05, "approach mostly removed: {:?}", slider.velocity);
    }

    #[test]
    fn test_set_sync_inserts_and_prunes() {
        let mut bodies = BodySet::new();
        bodies.insert(with_handle(RigidBody::new_static(Vec2::ZERO, Shape::circle(1.0)), 0));
        bodies.insert(with_handle(RigidBody::new_static(Vec2::UNIT_X, Shape::circle(1.0)), 1));
        bodies.insert(with_handle(RigidBody::new_dynamic(Vec2::UNIT_Y, 1.0, Shape::circle(1.0)), 2));

        let mut set = ManifoldSet::new();
        let all = [PairKey::new(h(0), h(1)), PairKey::new(h(0), h(2)), PairKey::new(h(1), h(2))];
        let (inserted, removed) = set.sync(&all, &bodies);
        assert_eq!((inserted, removed), (2, 0), "static-static pair skipped");
        assert!(!set.contains(all[0]));

        let (inserted, removed) = set.sync(&all[2..], &bodies);
        assert_eq!((inserted, removed), (0, 1));
        assert_eq!(set.len(), 1);

        assert_eq!(set.remove_involving(h(2)), 1);
        assert!(set.is_empty());
    }
}
