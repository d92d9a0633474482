//! Physics Error Types
//!
//! Unified error type for the simulation core. Every fallible boundary
//! (world construction, body insertion, stepping, shape construction)
//! returns `Result<T, PhysicsError>` instead of panicking.

use crate::body::BodyHandle;

/// Unified error type for physics operations.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum PhysicsError {
    /// The time step passed to `update` was non-finite or not positive.
    #[error("invalid time step {dt}: must be finite and > 0")]
    InvalidTimeStep {
        /// The rejected time step
        dt: f32,
    },
    /// A `WorldConfig` parameter is out of range.
    #[error("invalid configuration: {reason}")]
    InvalidConfiguration {
        /// Description of the invalid parameter
        reason: &'static str,
    },
    /// A shape could not be built from the given geometry.
    #[error("invalid shape: {reason}")]
    InvalidShape {
        /// Description of the geometric problem
        reason: &'static str,
    },
    /// A body failed validation on insertion.
    #[error("invalid body: {reason}")]
    InvalidBody {
        /// Description of the invalid body state
        reason: &'static str,
    },
    /// No body with this handle is a member of the world.
    #[error("body {handle} not found")]
    BodyNotFound {
        /// The unknown handle
        handle: BodyHandle,
    },
}

/// Convenience alias used across the crate.
pub type PhysicsResult<T> = Result<T, PhysicsError>;

// ============================================================================
// Tests
// ============================================================================
