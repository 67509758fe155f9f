//! Directory errors

use taskbot_core::{PermissionLevel, UserId};
use thiserror::Error;

/// Errors from admin directory operations
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Permission denied: {actor} is not a full admin")]
    PermissionDenied { actor: UserId },

    #[error("Root admin {0} is immutable")]
    RootAdminImmutable(UserId),

    #[error("User {0} is already an admin")]
    AlreadyAdmin(UserId),

    #[error("Admin not found: {0}")]
    NotFound(UserId),

    #[error("Cannot assign level {0} to an admin")]
    InvalidLevel(PermissionLevel),
}
