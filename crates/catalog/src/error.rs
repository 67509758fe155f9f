//! Catalog errors

use taskbot_core::{ButtonError, NodeId};
use thiserror::Error;

/// Errors from catalog operations
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Stored button list is invalid: {0}")]
    Buttons(#[from] ButtonError),

    #[error("Stored price is not a valid decimal: {0}")]
    InvalidPrice(String),

    #[error("Parent node not found: {0}")]
    ParentNotFound(NodeId),
}
