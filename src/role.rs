//! Process role
//!
//! Decides whether a handle executes against the local store or forwards
//! its operations to the coordinator.

use std::fmt;

/// Role of a cache handle, fixed when the handle is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Owns the authoritative store
    Coordinator,
    /// Routes every operation through the coordinator
    Participant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Coordinator => f.write_str("coordinator"),
            Role::Participant => f.write_str("participant"),
        }
    }
}
