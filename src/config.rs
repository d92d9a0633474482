//! World Configuration
//!
//! All tunables of a world live in one value owned by that world. There is
//! no process-wide state: two worlds with different gravity or pairing mode
//! can coexist.

use crate::broadphase::BroadphaseKind;
use crate::error::{PhysicsError, PhysicsResult};
use crate::math::Vec2;

/// Configuration for a [`PhysicsWorld`](crate::world::PhysicsWorld).
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct WorldConfig {
    /// Gravity acceleration.
    pub gravity: Vec2,
    /// Multiplier applied to every `dt` passed to `update`. Zero pauses.
    pub time_scale: f32,
    /// Sequential impulse iterations per step.
    pub iterations: usize,
    /// Pair every body against every other body instead of asking the broadphase.
    pub brute_force: bool,
    /// Broadphase built by `PhysicsWorld::new`.
    pub broadphase: BroadphaseKind,
    /// Margin added around tight bounds to form broadphase proxies.
    pub fat_margin: f32,
    /// Fraction of penetration corrected per step (Baumgarte factor).
    pub baumgarte: f32,
    /// Penetration depth tolerated without positional correction (slop).
    pub allowed_penetration: f32,
    /// Approach speed below which restitution is ignored.
    pub restitution_threshold: f32,
    /// Seed each step's impulses with the previous step's results.
    pub warm_starting: bool,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            gravity: Vec2::new(0.0, -9.8),
            time_scale: 1.0,
            iterations: 7,
            brute_force: false,
            broadphase: BroadphaseKind::DynamicTree,
            fat_margin: 0.2,
            baumgarte: 0.2,
            allowed_penetration: 0.01,
            restitution_threshold: 0.5,
            warm_starting: true,
        }
    }
}

impl WorldConfig {
    /// Set gravity.
    #[must_use]
    pub fn with_gravity(mut self, gravity: Vec2) -> Self {
        self.gravity = gravity;
        self
    }

    /// Set the time scale.
    #[must_use]
    pub fn with_time_scale(mut self, time_scale: f32) -> Self {
        self.time_scale = time_scale;
        self
    }

    /// Set the solver iteration count.
    #[must_use]
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// Enable or disable brute-force pairing.
    #[must_use]
    pub fn with_brute_force(mut self, brute_force: bool) -> Self {
        self.brute_force = brute_force;
        self
    }

    /// Select the broadphase strategy.
    #[must_use]
    pub fn with_broadphase(mut self, broadphase: BroadphaseKind) -> Self {
        self.broadphase = broadphase;
        self
    }

    /// Set the proxy fat margin.
    #[must_use]
    pub fn with_fat_margin(mut self, fat_margin: f32) -> Self {
        self.fat_margin = fat_margin;
        self
    }

    /// Enable or disable warm starting.
    #[must_use]
    pub fn with_warm_starting(mut self, warm_starting: bool) -> Self {
        self.warm_starting = warm_starting;
        self
    }

    /// Check every parameter is in range.
    pub fn validate(&self) -> PhysicsResult<()> {
        let invalid = |reason| Err(PhysicsError::InvalidConfiguration { reason });

        if !self.gravity.is_finite() {
            return invalid("gravity must be finite");
        }
        if !(self.time_scale.is_finite() && self.time_scale >= 0.0) {
            return invalid("time_scale must be finite and >= 0");
        }
        if self.iterations == 0 {
            return invalid("iterations must be > 0");
        }
        if !(self.fat_margin.is_finite() && self.fat_margin >= 0.0) {
            return invalid("fat_margin must be finite and >= 0");
        }
        if !(0.0..=1.0).contains(&self.baumgarte) {
            return invalid("baumgarte must be in [0, 1]");
        }
        if !(self.allowed_penetration.is_finite() && self.allowed_penetration >= 0.0) {
            return invalid("allowed_penetration must be finite and >= 0");
        }
        if !(self.restitution_threshold.is_finite() && self.restitution_threshold >= 0.0) {
            return invalid("restitution_threshold must be finite and >= 0");
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
