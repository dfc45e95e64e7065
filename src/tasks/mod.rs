//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Maintenance: sweeps expired entries, enforces capacity and drops stale
//!   rate windows at the configured interval

mod cleanup;

pub use cleanup::spawn_cleanup_task;
