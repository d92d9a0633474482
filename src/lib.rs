//! # impulse2d
//!
//! **2D Rigid-Body Physics Core**
//!
//! A small, deterministic 2D physics engine: rigid bodies with circle and
//! convex polygon shapes, a pluggable broadphase, persistent contact
//! manifolds and a sequential impulse solver with warm starting.
//!
//! ## Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | **Dynamic AABB Tree** | Incremental broadphase, O(log n) insert/remove/query |
//! | **Sweep and Prune** | Sorted-axis broadphase for coherent scenes |
//! | **Brute Force** | All-pairs reference, also selectable at runtime |
//! | **SAT + Clipping** | Polygon contacts with stable feature ids |
//! | **Sequential Impulses** | Accumulated impulses, warm starting, friction |
//! | **Raycasts** | Nearest-hit queries through any broadphase |
//! | **Debug Draw** | Wireframe output to any [`DebugDrawer`] |
//!
//! ## Design Principles
//!
//! - **Deterministic**: same inputs, same call sequence, bit-identical state
//! - **Handles, not pointers**: bodies are addressed by stable [`BodyHandle`]s
//! - **Per-world configuration**: no global state, worlds are independent
//!
//! ## Quick Start
//!
//! ```rust
//! use impulse2d::prelude::*;
//!
//! let mut world = PhysicsWorld::new(WorldConfig::default()).unwrap();
//!
//! let ground = RigidBody::new_static(Vec2::new(0.0, -0.5), Shape::rectangle(10.0, 0.5));
//! world.add_body(ground).unwrap();
//!
//! let ball = world
//!     .add_body(RigidBody::new_dynamic(Vec2::new(0.0, 5.0), 1.0, Shape::circle(0.5)))
//!     .unwrap();
//!
//! for _ in 0..240 {
//!     world.update(1.0 / 60.0).unwrap();
//! }
//!
//! // Came to rest on the ground
//! let y = world.body(ball).unwrap().position.y;
//! assert!((y - 0.5).abs() < 0.05);
//! ```
//!
//! ## Raycasts
//!
//! ```rust
//! use impulse2d::prelude::*;
//!
//! let mut world = PhysicsWorld::default();
//! let target = world
//!     .add_body(RigidBody::new_static(Vec2::new(5.0, 0.0), Shape::rectangle(1.0, 1.0)))
//!     .unwrap();
//!
//! let hit = world.raycast(Vec2::ZERO, Vec2::UNIT_X).unwrap();
//! assert_eq!(hit.body, target);
//! assert!((hit.distance - 4.0).abs() < 1e-5);
//! ```

#![warn(missing_docs)]

pub mod aabb;
pub mod body;
pub mod body_set;
pub mod broadphase;
pub mod collision;
pub mod config;
pub mod debug_draw;
pub mod error;
pub mod manifold;
pub mod math;
pub mod ray;
pub mod shape;
pub mod world;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::aabb::Aabb;
    pub use crate::body::{BodyHandle, BodyType, Material, RigidBody};
    pub use crate::body_set::BodySet;
    pub use crate::broadphase::{
        Broadphase, BroadphaseKind, BruteForce, DynamicTree, SweepAndPrune,
    };
    pub use crate::collision::{collide, ContactPoint, ContactPoints, FeatureId};
    pub use crate::config::WorldConfig;
    pub use crate::debug_draw::{DebugColor, DebugDrawData, DebugDrawer};
    pub use crate::error::{PhysicsError, PhysicsResult};
    pub use crate::manifold::{Contact, Manifold, ManifoldSet, PairKey};
    pub use crate::math::{Rot, Transform, Vec2};
    pub use crate::ray::{Ray, RaycastResult};
    pub use crate::shape::{Polygon, Shape};
    pub use crate::world::PhysicsWorld;
}

// Re-export main types at crate root
pub use prelude::*;

// ============================================================================
// Integration Tests
// ============================================================================
