//! Wizard errors

use taskbot_catalog::CatalogError;
use taskbot_core::{ButtonError, NodeId, UserId};
use thiserror::Error;

/// Recoverable input validation failures.
///
/// The session stays on the same step; the actor is re-prompted.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Name cannot be empty")]
    EmptyName,

    #[error("Parent id must be a number: {0}")]
    MalformedParentId(String),

    #[error("Parent node not found: {0}")]
    UnknownParent(NodeId),

    #[error("Body cannot be empty")]
    EmptyBody,

    #[error("Price must be a non-negative decimal: {0}")]
    InvalidPrice(String),

    #[error("Invalid button list: {0}")]
    BadButtons(#[from] ButtonError),
}

/// Errors from wizard operations
#[derive(Debug, Error)]
pub enum WizardError {
    #[error("Actor {0} is not authorized to author nodes")]
    NotAuthorized(UserId),

    #[error("No authoring session in progress for {0}")]
    NoSession(UserId),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Commit failed: {0}")]
    Catalog(#[from] CatalogError),
}
