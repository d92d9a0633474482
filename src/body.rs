//! Rigid Bodies
//!
//! Dynamic, static and kinematic bodies with a force/torque accumulator and
//! semi-implicit Euler integration. Bodies are owned by the world; other
//! subsystems refer to them through a [`BodyHandle`].

use core::fmt;

use crate::aabb::Aabb;
use crate::error::{PhysicsError, PhysicsResult};
use crate::math::{cross_sv, Transform, Vec2};
use crate::shape::Shape;

// ============================================================================
// BodyHandle
// ============================================================================

/// Stable identifier of a body inside a world.
///
/// Handles are assigned by `PhysicsWorld::add_body` in increasing order and
/// are never reused, so ordering by handle is ordering by insertion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BodyHandle(u32);

impl BodyHandle {
    /// Placeholder carried by bodies that are not in a world yet.
    pub const INVALID: Self = Self(u32::MAX);

    /// Wrap a raw index.
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw index.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for BodyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ============================================================================
// BodyType / Material
// ============================================================================

/// How a body participates in the simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BodyType {
    /// Fully simulated body affected by forces and collisions.
    Dynamic,
    /// Immovable body (infinite mass, zero velocity).
    Static,
    /// User-driven body: moves by its velocity, unaffected by forces and contacts.
    Kinematic,
}

/// Surface response coefficients.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Material {
    /// Coefficient of restitution (bounciness, 0..1).
    pub restitution: f32,
    /// Coulomb friction coefficient.
    pub friction: f32,
}

impl Material {
    /// Create a material.
    #[inline]
    #[must_use]
    pub const fn new(restitution: f32, friction: f32) -> Self {
        Self {
            restitution,
            friction,
        }
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::new(0.0, 0.3)
    }
}

// ============================================================================
// RigidBody
// ============================================================================

/// 2D rigid body with position, orientation, velocity and shape.
#[derive(Clone, Debug)]
pub struct RigidBody {
    handle: BodyHandle,
    /// World-space position of the center of mass.
    pub position: Vec2,
    /// Orientation angle in radians (counter-clockwise from +X).
    pub angle: f32,
    /// Linear velocity.
    pub velocity: Vec2,
    /// Angular velocity (radians per second, positive = CCW).
    pub angular_velocity: f32,
    mass: f32,
    inv_mass: f32,
    inertia: f32,
    inv_inertia: f32,
    shape: Shape,
    /// Surface response.
    pub material: Material,
    body_type: BodyType,
    /// Multiplier on world gravity.
    pub gravity_scale: f32,
    /// Linear velocity damping per second.
    pub linear_damping: f32,
    /// Angular velocity damping per second.
    pub angular_damping: f32,
    force: Vec2,
    torque: f32,
    aabb: Aabb,
}

impl RigidBody {
    fn with_type(position: Vec2, shape: Shape, body_type: BodyType) -> Self {
        let aabb = shape.compute_aabb(&Transform::new(position, 0.0));
        Self {
            handle: BodyHandle::INVALID,
            position,
            angle: 0.0,
            velocity: Vec2::ZERO,
            angular_velocity: 0.0,
            mass: 0.0,
            inv_mass: 0.0,
            inertia: 0.0,
            inv_inertia: 0.0,
            shape,
            material: Material::default(),
            body_type,
            gravity_scale: 1.0,
            linear_damping: 0.0,
            angular_damping: 0.0,
            force: Vec2::ZERO,
            torque: 0.0,
            aabb,
        }
    }

    /// Create a dynamic body. Inertia is derived from the shape.
    #[must_use]
    pub fn new_dynamic(position: Vec2, mass: f32, shape: Shape) -> Self {
        let mut body = Self::with_type(position, shape, BodyType::Dynamic);
        body.mass = mass;
        body.inv_mass = if mass > 0.0 { 1.0 / mass } else { 0.0 };
        body.inertia = body.shape.inertia(mass);
        body.inv_inertia = if body.inertia > 0.0 {
            1.0 / body.inertia
        } else {
            0.0
        };
        body
    }

    /// Create a static (immovable) body.
    #[must_use]
    pub fn new_static(position: Vec2, shape: Shape) -> Self {
        Self::with_type(position, shape, BodyType::Static)
    }

    /// Create a kinematic body.
    #[must_use]
    pub fn new_kinematic(position: Vec2, shape: Shape) -> Self {
        Self::with_type(position, shape, BodyType::Kinematic)
    }

    /// Set the initial linear velocity.
    #[must_use]
    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.velocity = velocity;
        self
    }

    /// Set the initial angular velocity.
    #[must_use]
    pub fn with_angular_velocity(mut self, angular_velocity: f32) -> Self {
        self.angular_velocity = angular_velocity;
        self
    }

    /// Set the initial orientation.
    #[must_use]
    pub fn with_angle(mut self, angle: f32) -> Self {
        self.angle = angle;
        self
    }

    /// Set the restitution coefficient.
    #[must_use]
    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.material.restitution = restitution;
        self
    }

    /// Set the friction coefficient.
    #[must_use]
    pub fn with_friction(mut self, friction: f32) -> Self {
        self.material.friction = friction;
        self
    }

    /// Replace the material.
    #[must_use]
    pub fn with_material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }

    /// Set the gravity multiplier.
    #[must_use]
    pub fn with_gravity_scale(mut self, gravity_scale: f32) -> Self {
        self.gravity_scale = gravity_scale;
        self
    }

    /// Set linear and angular damping.
    #[must_use]
    pub fn with_damping(mut self, linear: f32, angular: f32) -> Self {
        self.linear_damping = linear;
        self.angular_damping = angular;
        self
    }

    // ---- accessors ----

    /// Handle assigned by the world, `BodyHandle::INVALID` before insertion.
    #[inline]
    #[must_use]
    pub fn handle(&self) -> BodyHandle {
        self.handle
    }

    pub(crate) fn set_handle(&mut self, handle: BodyHandle) {
        self.handle = handle;
    }

    /// Mass (0 for static and kinematic bodies).
    #[inline]
    #[must_use]
    pub fn mass(&self) -> f32 {
        self.mass
    }

    /// Inverse mass (0 for static and kinematic bodies).
    #[inline]
    #[must_use]
    pub fn inv_mass(&self) -> f32 {
        self.inv_mass
    }

    /// Moment of inertia about the center of mass.
    #[inline]
    #[must_use]
    pub fn inertia(&self) -> f32 {
        self.inertia
    }

    /// Inverse moment of inertia.
    #[inline]
    #[must_use]
    pub fn inv_inertia(&self) -> f32 {
        self.inv_inertia
    }

    /// Collision shape.
    #[inline]
    #[must_use]
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Body type.
    #[inline]
    #[must_use]
    pub fn body_type(&self) -> BodyType {
        self.body_type
    }

    /// `true` for static bodies.
    #[inline]
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.body_type == BodyType::Static
    }

    /// `true` for dynamic bodies.
    #[inline]
    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        self.body_type == BodyType::Dynamic
    }

    /// World bounds cached by the last [`update`](Self::update).
    #[inline]
    #[must_use]
    pub fn aabb(&self) -> Aabb {
        self.aabb
    }

    /// Pending force.
    #[inline]
    #[must_use]
    pub fn force(&self) -> Vec2 {
        self.force
    }

    /// Pending torque.
    #[inline]
    #[must_use]
    pub fn torque(&self) -> f32 {
        self.torque
    }

    /// Current pose.
    #[inline]
    #[must_use]
    pub fn transform(&self) -> Transform {
        Transform::new(self.position, self.angle)
    }

    /// Transform a local-space point to world space.
    #[inline]
    #[must_use]
    pub fn world_point(&self, local: Vec2) -> Vec2 {
        self.transform().apply(local)
    }

    /// Velocity of the material point at `world_point`.
    #[inline]
    #[must_use]
    pub fn velocity_at_point(&self, world_point: Vec2) -> Vec2 {
        self.velocity + cross_sv(self.angular_velocity, world_point - self.position)
    }

    // ---- forces and impulses ----

    /// Accumulate a force through the center of mass (consumed by the next step).
    #[inline]
    pub fn apply_force(&mut self, force: Vec2) {
        if self.body_type != BodyType::Dynamic {
            return;
        }
        self.force += force;
    }

    /// Accumulate a force at a world-space point, generating torque.
    pub fn apply_force_at_point(&mut self, force: Vec2, world_point: Vec2) {
        if self.body_type != BodyType::Dynamic {
            return;
        }
        self.force += force;
        self.torque += (world_point - self.position).cross(force);
    }

    /// Accumulate a torque.
    #[inline]
    pub fn apply_torque(&mut self, torque: f32) {
        if self.body_type != BodyType::Dynamic {
            return;
        }
        self.torque += torque;
    }

    /// Apply a linear impulse at the center of mass.
    #[inline]
    pub fn apply_impulse(&mut self, impulse: Vec2) {
        self.velocity += impulse * self.inv_mass;
    }

    /// Apply an impulse at a world-space point, changing both linear and
    /// angular velocity.
    #[inline]
    pub fn apply_impulse_at_point(&mut self, impulse: Vec2, world_point: Vec2) {
        self.velocity += impulse * self.inv_mass;
        self.angular_velocity += self.inv_inertia * (world_point - self.position).cross(impulse);
    }

    // ---- per-step ----

    /// Reset per-step transient state: refresh the cached world bounds from
    /// the current pose.
    pub fn update(&mut self) {
        self.aabb = self.shape.compute_aabb(&self.transform());
    }

    /// Semi-implicit Euler velocity update from gravity and accumulated
    /// forces, then clear the accumulators. Bodies with zero inverse mass are
    /// skipped.
    pub fn integrate_forces(&mut self, dt: f32, gravity: Vec2) {
        if self.inv_mass == 0.0 {
            return;
        }

        self.velocity += (gravity * self.gravity_scale + self.force * self.inv_mass) * dt;
        self.angular_velocity += self.torque * self.inv_inertia * dt;

        self.velocity *= 1.0 / (1.0 + dt * self.linear_damping);
        self.angular_velocity *= 1.0 / (1.0 + dt * self.angular_damping);

        self.force = Vec2::ZERO;
        self.torque = 0.0;
    }

    /// Advance the pose by the current velocity. Static bodies never move.
    pub fn integrate_velocity(&mut self, dt: f32) {
        if self.body_type == BodyType::Static {
            return;
        }
        self.position += self.velocity * dt;
        self.angle += self.angular_velocity * dt;
    }

    /// Check the body is fit for insertion into a world.
    pub fn validate(&self) -> PhysicsResult<()> {
        self.shape.validate()?;

        if !self.position.is_finite() || !self.angle.is_finite() {
            return Err(PhysicsError::InvalidBody {
                reason: "pose must be finite",
            });
        }
        if !self.velocity.is_finite() || !self.angular_velocity.is_finite() {
            return Err(PhysicsError::InvalidBody {
                reason: "velocity must be finite",
            });
        }
        if self.body_type == BodyType::Dynamic && !(self.mass.is_finite() && self.mass > 0.0) {
            return Err(PhysicsError::InvalidBody {
                reason: "dynamic body mass must be finite and > 0",
            });
        }
        if self.body_type == BodyType::Static
            && (self.velocity != Vec2::ZERO || self.angular_velocity != 0.0)
        {
            return Err(PhysicsError::InvalidBody {
                reason: "static body must have zero velocity",
            });
        }
        let Material {
            restitution,
            friction,
        } = self.material;
        if !(restitution.is_finite() && restitution >= 0.0) {
            return Err(PhysicsError::InvalidBody {
                reason: "restitution must be finite and >= 0",
            });
        }
        if !(friction.is_finite() && friction >= 0.0) {
            return Err(PhysicsError::InvalidBody {
                reason: "friction must be finite and >= 0",
            });
        }
        if !self.gravity_scale.is_finite() {
            return Err(PhysicsError::InvalidBody {
                reason: "gravity scale must be finite",
            });
        }
        if !(self.linear_damping >= 0.0 && self.angular_damping >= 0.0)
            || !self.linear_damping.is_finite()
            || !self.angular_damping.is_finite()
        {
            return Err(PhysicsError::InvalidBody {
                reason: "damping must be finite and >= 0",
            });
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;
    const GRAVITY: Vec2 = Vec2::new(0.0, -9.8);

    #[test]
    fn test_dynamic_mass_properties() {
        let body = RigidBody::new_dynamic(Vec2::ZERO, 2.0, Shape::circle(1.0));
        assert_eq!(body.inv_mass(), 0.5);
        assert!((body.inertia() - 1.0).abs() < EPS);
        assert!((body.inv_inertia() - 1.0).abs() < EPS);
        assert_eq!(body.handle(), BodyHandle::INVALID);
    }

    #[test]
    fn test_static_has_zero_inverse_mass() {
        let body = RigidBody::new_static(Vec2::ZERO, Shape::rectangle(5.0, 1.0));
        assert_eq!(body.inv_mass(), 0.0);
        assert_eq!(body.inv_inertia(), 0.0);
        assert!(body.is_static());
    }

    #[test]
    fn test_integrate_forces_gravity() {
        let mut body = RigidBody::new_dynamic(Vec2::ZERO, 1.0, Shape::circle(0.5));
        body.integrate_forces(0.5, GRAVITY);
        assert!((body.velocity.y + 4.9).abs() < EPS);
        body.integrate_velocity(0.5);
        assert!((body.position.y + 2.45).abs() < EPS);
    }

    #[test]
    fn test_force_accumulator_consumed() {
        let mut body = RigidBody::new_dynamic(Vec2::ZERO, 2.0, Shape::circle(0.5));
        body.apply_force(Vec2::new(4.0, 0.0));
        body.apply_torque(1.0);
        body.integrate_forces(1.0, Vec2::ZERO);
        assert_eq!(body.velocity, Vec2::new(2.0, 0.0));
        assert!(body.angular_velocity > 0.0);
        assert_eq!(body.force(), Vec2::ZERO);
        assert_eq!(body.torque(), 0.0);

        // No lingering force on the next step
        body.integrate_forces(1.0, Vec2::ZERO);
        assert_eq!(body.velocity, Vec2::new(2.0, 0.0));
    }

    #[test]
    fn test_static_ignores_forces() {
        let mut body = RigidBody::new_static(Vec2::new(1.0, 2.0), Shape::circle(1.0));
        body.apply_force(Vec2::new(100.0, 100.0));
        body.integrate_forces(1.0, GRAVITY);
        body.integrate_velocity(1.0);
        assert_eq!(body.position, Vec2::new(1.0, 2.0));
        assert_eq!(body.velocity, Vec2::ZERO);
    }

    #[test]
    fn test_kinematic_moves_but_ignores_gravity() {
        let mut body = RigidBody::new_kinematic(Vec2::ZERO, Shape::circle(1.0))
            .with_velocity(Vec2::new(1.0, 0.0));
        body.integrate_forces(1.0, GRAVITY);
        body.integrate_velocity(1.0);
        assert_eq!(body.position, Vec2::new(1.0, 0.0));
        assert_eq!(body.velocity, Vec2::new(1.0, 0.0));
    }

    #[test]
    fn test_impulse_at_point_spins() {
        let mut body = RigidBody::new_dynamic(Vec2::ZERO, 1.0, Shape::rectangle(1.0, 1.0));
        body.apply_impulse_at_point(Vec2::new(0.0, 1.0), Vec2::new(1.0, 0.0));
        assert!(body.angular_velocity > 0.0, "CCW spin expected");
        let v = body.velocity_at_point(Vec2::new(1.0, 0.0));
        assert!(v.y > body.velocity.y);
    }

    #[test]
    fn test_update_refreshes_aabb() {
        let mut body = RigidBody::new_dynamic(Vec2::ZERO, 1.0, Shape::circle(1.0));
        body.position = Vec2::new(10.0, 0.0);
        assert_eq!(body.aabb().center(), Vec2::ZERO);
        body.update();
        assert_eq!(body.aabb().center(), Vec2::new(10.0, 0.0));
    }

    #[test]
    fn test_validate() {
        assert!(RigidBody::new_dynamic(Vec2::ZERO, 1.0, Shape::circle(1.0))
            .validate()
            .is_ok());
        assert!(RigidBody::new_dynamic(Vec2::ZERO, 0.0, Shape::circle(1.0))
            .validate()
            .is_err());
        assert!(RigidBody::new_dynamic(Vec2::new(f32::NAN, 0.0), 1.0, Shape::circle(1.0))
            .validate()
            .is_err());
        assert!(RigidBody::new_static(Vec2::ZERO, Shape::circle(1.0))
            .with_velocity(Vec2::UNIT_X)
            .validate()
            .is_err());
        assert!(RigidBody::new_dynamic(Vec2::ZERO, 1.0, Shape::circle(1.0))
            .with_friction(-1.0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_damping_slows() {
        let mut body = RigidBody::new_dynamic(Vec2::ZERO, 1.0, Shape::circle(1.0))
            .with_velocity(Vec2::new(10.0, 0.0))
            .with_damping(1.0, 0.0);
        body.integrate_forces(0.1, Vec2::ZERO);
        assert!(body.velocity.x < 10.0);
    }

    #[test]
    fn test_handle_display() {
        assert_eq!(BodyHandle::from_raw(7).to_string(), "#7");
        assert!(BodyHandle::from_raw(1) < BodyHandle::from_raw(2));
    }
}
