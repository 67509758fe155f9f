//! Taskbot Directory - Admin registry
//!
//! An injected service (no module-level globals) holding two layers:
//! - the immutable root-admin set, loaded once at startup from configuration;
//!   root admins are always Full and cannot be removed or downgraded
//! - a SQLite-backed mutable registry of further admins
//!
//! All mutations require the acting admin to hold Full permission.

mod directory;
mod error;

pub use directory::{Admin, AdminDirectory};
pub use error::DirectoryError;
