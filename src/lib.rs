//! Memored - a cache shared through a single coordinator
//!
//! One coordinator task owns the store; participants reach it only through
//! envelopes on a channel, with TTL expiration and a scheduled purge.

pub mod cache;
pub mod config;
pub mod coordinator;
pub mod diagnostics;
pub mod dispatch;
pub mod error;
pub mod fanout;
pub mod participant;
pub mod protocol;
pub mod role;
mod tasks;

pub use config::Config;
pub use coordinator::{Coordinator, SeedEntry, SetupOptions};
pub use diagnostics::DiagnosticSink;
pub use dispatch::{Hit, SharedCache};
pub use error::{CacheError, Result};
pub use participant::Participant;
pub use role::Role;
