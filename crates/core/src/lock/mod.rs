//! Filesystem-marker resource locks.
//!
//! A lock is "held" while `<lock_dir>/<key>.lock` exists. Markers are created
//! with `create_new`, so the existence test and the claim are one atomic step.
//! A marker older than the configured threshold is treated as abandoned (the
//! holder crashed) and reclaimed with a warning. Live holders refresh their
//! marker's mtime, so only markers whose holder went away can age out.

mod config;
mod marker;

pub use config::LockConfig;
pub use marker::{LockError, LockGuard, ResourceLock};
