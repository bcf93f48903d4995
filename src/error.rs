//! Error types for the shared cache
//!
//! Provides unified error handling using thiserror. Cache misses are never
//! errors; they are `None` results on the individual operations.

use thiserror::Error;

use crate::role::Role;

// == Cache Error Enum ==
/// Unified error type for the shared cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Operation invoked from a role that is not allowed to run it
    #[error("{operation} cannot be called from the {role} role")]
    RoleViolation {
        operation: &'static str,
        role: Role,
    },

    /// The coordinator mailbox is gone
    #[error("Coordinator channel closed")]
    ChannelClosed,

    /// The request was accepted but its response never arrived
    #[error("Response lost before it could be delivered")]
    ResponseLost,

    /// Envelope could not be encoded or decoded
    #[error("Envelope codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

// == Result Type Alias ==
/// Convenience Result type for the shared cache.
pub type Result<T> = std::result::Result<T, CacheError>;
