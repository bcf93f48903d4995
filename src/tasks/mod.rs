//! Background Tasks Module
//!
//! Contains background tasks that run periodically inside the coordinator.
//!
//! # Tasks
//! - Purge: Asks the coordinator to sweep expired entries at a fixed interval

mod purge;

pub(crate) use purge::spawn_purge_task;
