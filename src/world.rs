//! Physics World
//!
//! Owns the bodies, the manifold set and one broadphase, and advances them
//! with a fixed pipeline per call to [`PhysicsWorld::update`]:
//!
//! 1. scale `dt` by the configured time scale
//! 2. refresh every body's per-step state
//! 3. resynchronise the broadphase
//! 4. refresh the manifold set from candidate pairs (brute force or broadphase)
//! 5. narrow phase on every manifold
//! 6. integrate forces
//! 7. pre-step every colliding manifold
//! 8. `iterations` sequential impulse passes
//! 9. integrate velocities
//!
//! After step 9 the cached bounds and the broadphase are brought up to date
//! with the new poses so ray queries between updates see where bodies are.

use tracing::{debug, trace, warn};

use crate::body::{BodyHandle, BodyType, RigidBody};
use crate::body_set::BodySet;
use crate::broadphase::{brute_force_pairs, Broadphase};
use crate::config::WorldConfig;
use crate::debug_draw::{DebugColor, DebugDrawer};
use crate::error::{PhysicsError, PhysicsResult};
use crate::manifold::ManifoldSet;
use crate::math::Vec2;
use crate::ray::{Ray, RaycastResult};
use crate::shape::Shape;

/// 2D physics world.
pub struct PhysicsWorld {
    config: WorldConfig,
    bodies: BodySet,
    manifolds: ManifoldSet,
    broadphase: Box<dyn Broadphase>,
    next_handle: u32,
    step_count: u64,
}

impl PhysicsWorld {
    /// Create a world using the broadphase selected by `config.broadphase`.
    pub fn new(config: WorldConfig) -> PhysicsResult<Self> {
        config.validate()?;
        let broadphase = config.broadphase.build(config.fat_margin);
        Ok(Self::from_parts(config, broadphase))
    }

    /// Create a world around a caller-supplied broadphase. Anything already
    /// registered in it is cleared.
    pub fn with_broadphase(config: WorldConfig, mut broadphase: Box<dyn Broadphase>) -> PhysicsResult<Self> {
        config.validate()?;
        broadphase.clear();
        Ok(Self::from_parts(config, broadphase))
    }

    fn from_parts(config: WorldConfig, broadphase: Box<dyn Broadphase>) -> Self {
        debug!(
            broadphase = broadphase.name(),
            iterations = config.iterations,
            brute_force = config.brute_force,
            "physics world created"
        );
        Self {
            config,
            bodies: BodySet::new(),
            manifolds: ManifoldSet::new(),
            broadphase,
            next_handle: 0,
            step_count: 0,
        }
    }

    // ---- configuration ----

    /// Current configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Change gravity. Non-finite components are rejected.
    pub fn set_gravity(&mut self, gravity: Vec2) -> PhysicsResult<()> {
        if !gravity.is_finite() {
            return Err(PhysicsError::InvalidConfiguration {
                reason: "gravity must be finite",
            });
        }
        self.config.gravity = gravity;
        Ok(())
    }

    /// Change the time scale. Zero pauses the world.
    pub fn set_time_scale(&mut self, time_scale: f32) -> PhysicsResult<()> {
        if !(time_scale.is_finite() && time_scale >= 0.0) {
            return Err(PhysicsError::InvalidConfiguration {
                reason: "time_scale must be finite and >= 0",
            });
        }
        self.config.time_scale = time_scale;
        Ok(())
    }

    /// Switch between brute-force pairing and broadphase pairing.
    pub fn set_brute_force(&mut self, brute_force: bool) {
        self.config.brute_force = brute_force;
    }

    /// Name of the broadphase in use.
    #[must_use]
    pub fn broadphase_name(&self) -> &'static str {
        self.broadphase.name()
    }

    /// Number of completed steps.
    #[inline]
    #[must_use]
    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    // ---- bodies ----

    /// Insert a body. It is validated, given a fresh handle and registered
    /// with the broadphase.
    pub fn add_body(&mut self, mut body: RigidBody) -> PhysicsResult<BodyHandle> {
        body.validate()?;
        if self.next_handle == BodyHandle::INVALID.raw() {
            return Err(PhysicsError::InvalidBody {
                reason: "body handle space exhausted",
            });
        }

        let handle = BodyHandle::from_raw(self.next_handle);
        self.next_handle += 1;

        body.set_handle(handle);
        body.update();
        self.broadphase.add(&body);
        debug!(handle = %handle, body_type = ?body.body_type(), "body added");
        self.bodies.insert(body);
        Ok(handle)
    }

    /// Remove a body, its broadphase proxy and every manifold that refers to
    /// it. Returns `None` (and changes nothing) if the handle is unknown.
    pub fn remove_body(&mut self, handle: BodyHandle) -> Option<RigidBody> {
        let body = self.bodies.remove(handle)?;
        let indexed = self.broadphase.remove(handle);
        debug_assert!(indexed, "body {handle} was not indexed");
        let dropped = self.manifolds.remove_involving(handle);
        debug!(handle = %handle, manifolds = dropped, "body removed");
        Some(body)
    }

    /// Remove every body and manifold.
    pub fn clear(&mut self) {
        self.bodies.clear();
        self.manifolds.clear();
        self.broadphase.clear();
        debug!("physics world cleared");
    }

    /// Look up a body.
    #[inline]
    #[must_use]
    pub fn body(&self, handle: BodyHandle) -> Option<&RigidBody> {
        self.bodies.get(handle)
    }

    /// Look up a body mutably (apply forces, set velocities, teleport).
    #[inline]
    pub fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut RigidBody> {
        self.bodies.get_mut(handle)
    }

    /// Accumulate a force on a body's center of mass for the next step.
    pub fn apply_force(&mut self, handle: BodyHandle, force: Vec2) -> PhysicsResult<()> {
        let body = self
            .bodies
            .get_mut(handle)
            .ok_or(PhysicsError::BodyNotFound { handle })?;
        body.apply_force(force);
        Ok(())
    }

    /// Apply an impulse at a world point of a body, immediately.
    pub fn apply_impulse(&mut self, handle: BodyHandle, impulse: Vec2, world_point: Vec2) -> PhysicsResult<()> {
        let body = self
            .bodies
            .get_mut(handle)
            .ok_or(PhysicsError::BodyNotFound { handle })?;
        body.apply_impulse_at_point(impulse, world_point);
        Ok(())
    }

    /// All bodies, in insertion order.
    #[inline]
    #[must_use]
    pub fn bodies(&self) -> &BodySet {
        &self.bodies
    }

    /// Number of bodies.
    #[inline]
    #[must_use]
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// `true` if the body is a member of this world.
    #[inline]
    #[must_use]
    pub fn contains_body(&self, handle: BodyHandle) -> bool {
        self.bodies.contains(handle)
    }

    /// `true` if the broadphase has a proxy for the body.
    #[inline]
    #[must_use]
    pub fn is_indexed(&self, handle: BodyHandle) -> bool {
        self.broadphase.contains(handle)
    }

    // ---- manifolds ----

    /// Number of live manifolds.
    #[inline]
    #[must_use]
    pub fn manifold_count(&self) -> usize {
        self.manifolds.len()
    }

    /// Live manifolds.
    #[inline]
    #[must_use]
    pub fn manifolds(&self) -> &ManifoldSet {
        &self.manifolds
    }

    // ---- stepping ----

    /// Advance the simulation by `dt` seconds (scaled by the time scale).
    ///
    /// A non-finite or non-positive `dt` is rejected without touching any
    /// state, as is one whose scaled value is subnormal or has no finite
    /// reciprocal. A time scale of zero makes this a no-op.
    pub fn update(&mut self, dt: f32) -> PhysicsResult<()> {
        if !(dt.is_finite() && dt > 0.0) {
            warn!(dt, "rejected time step");
            return Err(PhysicsError::InvalidTimeStep { dt });
        }
        if self.config.time_scale == 0.0 {
            trace!("world paused, step skipped");
            return Ok(());
        }
        let dt = dt * self.config.time_scale;
        let inv_dt = 1.0 / dt;
        if !dt.is_normal() || !inv_dt.is_finite() {
            warn!(dt, "rejected scaled time step");
            return Err(PhysicsError::InvalidTimeStep { dt });
        }

        for body in self.bodies.iter_mut() {
            body.update();
        }

        self.broadphase.update(&self.bodies);

        let (inserted, removed) = if self.config.brute_force {
            let pairs = brute_force_pairs(&self.bodies, self.config.fat_margin);
            self.manifolds.sync(&pairs, &self.bodies)
        } else {
            self.broadphase.compute_pairs(&self.bodies, &mut self.manifolds)
        };

        let warm_starting = self.config.warm_starting;
        for m in self.manifolds.iter_mut() {
            let key = m.key();
            if let Some((a, b)) = self.bodies.pair(key.a(), key.b()) {
                m.solve_contacts(a, b, warm_starting);
            }
        }

        let gravity = self.config.gravity;
        for body in self.bodies.iter_mut() {
            body.integrate_forces(dt, gravity);
        }

        // Every restitution target is read before any warm start lands
        for m in self.manifolds.iter_mut().filter(|m| m.is_colliding()) {
            let key = m.key();
            if let Some((a, b)) = self.bodies.pair(key.a(), key.b()) {
                m.prepare(a, b, inv_dt, &self.config);
            }
        }
        if warm_starting {
            for m in self.manifolds.iter_mut().filter(|m| m.is_colliding()) {
                let key = m.key();
                if let Some((a, b)) = self.bodies.pair_mut(key.a(), key.b()) {
                    m.warm_start(a, b);
                }
            }
        }

        for _ in 0..self.config.iterations {
            for m in self.manifolds.iter_mut().filter(|m| m.is_colliding()) {
                let key = m.key();
                if let Some((a, b)) = self.bodies.pair_mut(key.a(), key.b()) {
                    m.apply_impulse(a, b);
                }
            }
        }

        for body in self.bodies.iter_mut() {
            body.integrate_velocity(dt);
            body.update();
        }
        self.broadphase.update(&self.bodies);

        self.step_count += 1;
        trace!(
            step = self.step_count,
            dt,
            bodies = self.bodies.len(),
            manifolds = self.manifolds.len(),
            inserted,
            removed,
            "step complete"
        );
        Ok(())
    }

    // ---- queries ----

    /// Nearest body hit by a ray from `origin` along `direction`.
    #[must_use]
    pub fn raycast(&self, origin: Vec2, direction: Vec2) -> Option<RaycastResult> {
        self.raycast_within(origin, direction, Ray::T_MAX)
    }

    /// Nearest body hit within `max_distance`.
    #[must_use]
    pub fn raycast_within(&self, origin: Vec2, direction: Vec2, max_distance: f32) -> Option<RaycastResult> {
        let ray = Ray::new(origin, direction)?;
        self.raycast_ray_within(&ray, max_distance)
    }

    /// Nearest body hit by a prepared ray.
    #[must_use]
    pub fn raycast_ray(&self, ray: &Ray) -> Option<RaycastResult> {
        self.raycast_ray_within(ray, Ray::T_MAX)
    }

    /// Nearest body hit by a prepared ray within `max_distance`.
    #[must_use]
    pub fn raycast_ray_within(&self, ray: &Ray, max_distance: f32) -> Option<RaycastResult> {
        if max_distance.is_nan() || max_distance < 0.0 {
            return None;
        }
        self.broadphase.raycast(&self.bodies, ray, max_distance)
    }

    // ---- debug ----

    /// Draw bodies, broadphase proxies and contacts.
    pub fn debug_draw(&self, drawer: &mut dyn DebugDrawer) {
        for body in &self.bodies {
            let color = match body.body_type() {
                BodyType::Dynamic => DebugColor::GREEN,
                BodyType::Static => DebugColor::GRAY,
                BodyType::Kinematic => DebugColor::BLUE,
            };
            match body.shape() {
                Shape::Circle { radius } => {
                    drawer.draw_circle(body.position, *radius, color);
                    // Orientation marker
                    let tip = body.world_point(Vec2::new(*radius, 0.0));
                    drawer.draw_line(body.position, tip, color);
                }
                Shape::Polygon(poly) => {
                    let verts = poly.vertices();
                    for (i, v) in verts.iter().enumerate() {
                        let next = verts[(i + 1) % verts.len()];
                        drawer.draw_line(body.world_point(*v), body.world_point(next), color);
                    }
                }
            }
        }

        self.broadphase.debug_draw(drawer);

        for m in self.manifolds.iter().filter(|m| m.is_colliding()) {
            for c in m.contacts() {
                drawer.draw_point(c.position, 0.05, DebugColor::RED);
                drawer.draw_line(c.position, c.position + c.normal * 0.2, DebugColor::YELLOW);
            }
        }
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        let config = WorldConfig::default();
        let broadphase = config.broadphase.build(config.fat_margin);
        Self::from_parts(config, broadphase)
    }
}

impl core::fmt::Debug for PhysicsWorld {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PhysicsWorld")
            .field("config", &self.config)
            .field("broadphase", &self.broadphase.name())
            .field("bodies", &self.bodies.len())
            .field("manifolds", &self.manifolds.len())
            .field("step_count", &self.step_count)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
