//! Body Storage
//!
//! Insertion-ordered body storage with O(1) handle lookup. Iteration order is
//! insertion order, which keeps every per-body pass of the step deterministic.

use rustc_hash::FxHashMap;

use crate::body::{BodyHandle, RigidBody};

/// Owner of all bodies in a world.
#[derive(Clone, Debug, Default)]
pub struct BodySet {
    bodies: Vec<RigidBody>,
    index: FxHashMap<BodyHandle, usize>,
}

impl BodySet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bodies.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    /// `true` if there are no bodies.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// `true` if a body with this handle is stored.
    #[inline]
    #[must_use]
    pub fn contains(&self, handle: BodyHandle) -> bool {
        self.index.contains_key(&handle)
    }

    /// Store a body under its (already assigned) handle.
    pub(crate) fn insert(&mut self, body: RigidBody) {
        let handle = body.handle();
        debug_assert!(!self.index.contains_key(&handle), "duplicate handle {handle}");
        self.index.insert(handle, self.bodies.len());
        self.bodies.push(body);
    }

    /// Remove and return a body, preserving the order of the others.
    pub(crate) fn remove(&mut self, handle: BodyHandle) -> Option<RigidBody> {
        let slot = self.index.remove(&handle)?;
        let body = self.bodies.remove(slot);
        for i in self.index.values_mut() {
            if *i > slot {
                *i -= 1;
            }
        }
        Some(body)
    }

    /// Drop every body.
    pub(crate) fn clear(&mut self) {
        self.bodies.clear();
        self.index.clear();
    }

    /// Look up a body.
    #[inline]
    #[must_use]
    pub fn get(&self, handle: BodyHandle) -> Option<&RigidBody> {
        self.index.get(&handle).map(|&i| &self.bodies[i])
    }

    /// Look up a body mutably.
    #[inline]
    pub fn get_mut(&mut self, handle: BodyHandle) -> Option<&mut RigidBody> {
        let i = *self.index.get(&handle)?;
        self.bodies.get_mut(i)
    }

    /// Shared access to two bodies.
    #[must_use]
    pub fn pair(&self, a: BodyHandle, b: BodyHandle) -> Option<(&RigidBody, &RigidBody)> {
        Some((self.get(a)?, self.get(b)?))
    }

    /// Disjoint mutable access to two distinct bodies.
    pub fn pair_mut(
        &mut self,
        a: BodyHandle,
        b: BodyHandle,
    ) -> Option<(&mut RigidBody, &mut RigidBody)> {
        let ia = *self.index.get(&a)?;
        let ib = *self.index.get(&b)?;
        if ia == ib {
            return None;
        }
        if ia < ib {
            let (lo, hi) = self.bodies.split_at_mut(ib);
            Some((&mut lo[ia], &mut hi[0]))
        } else {
            let (lo, hi) = self.bodies.split_at_mut(ia);
            Some((&mut hi[0], &mut lo[ib]))
        }
    }

    /// Bodies in insertion order.
    #[inline]
    pub fn iter(&self) -> core::slice::Iter<'_, RigidBody> {
        self.bodies.iter()
    }

    /// Mutable bodies in insertion order.
    #[inline]
    pub fn iter_mut(&mut self) -> core::slice::IterMut<'_, RigidBody> {
        self.bodies.iter_mut()
    }

    /// Bodies as a slice, in insertion order.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[RigidBody] {
        &self.bodies
    }
}

impl<'a> IntoIterator for &'a BodySet {
    type Item = &'a RigidBody;
    type IntoIter = core::slice::Iter<'a, RigidBody>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec2;
    use crate::shape::Shape;

    fn body(raw: u32, x: f32) -> RigidBody {
        let mut b = RigidBody::new_dynamic(Vec2::new(x, 0.0), 1.0, Shape::circle(0.5));
        b.set_handle(BodyHandle::from_raw(raw));
        b
    }

    #[test]
    fn test_insert_get_remove() {
        let mut set = BodySet::new();
        set.insert(body(0, 0.0));
        set.insert(body(1, 1.0));
        set.insert(body(2, 2.0));
        assert_eq!(set.len(), 3);

        let removed = set.remove(BodyHandle::from_raw(1)).expect("present");
        assert_eq!(removed.position.x, 1.0);
        assert!(set.remove(BodyHandle::from_raw(1)).is_none());

        // Remaining lookups still resolve after the shift
        assert_eq!(set.get(BodyHandle::from_raw(2)).map(|b| b.position.x), Some(2.0));
        let order: Vec<u32> = set.iter().map(|b| b.handle().raw()).collect();
        assert_eq!(order, vec![0, 2]);
    }

    #[test]
    fn test_pair_mut_both_orders() {
        let mut set = BodySet::new();
        set.insert(body(0, 0.0));
        set.insert(body(1, 1.0));
        let (a, b) = set
            .pair_mut(BodyHandle::from_raw(1), BodyHandle::from_raw(0))
            .expect("distinct bodies");
        assert_eq!(a.position.x, 1.0);
        assert_eq!(b.position.x, 0.0);
        a.velocity = Vec2::UNIT_X;
        b.velocity = Vec2::UNIT_Y;
        assert_eq!(set.get(BodyHandle::from_raw(1)).map(|b| b.velocity), Some(Vec2::UNIT_X));
        assert!(set
            .pair_mut(BodyHandle::from_raw(0), BodyHandle::from_raw(0))
            .is_none());
    }
}
