//! Console errors

use taskbot_catalog::CatalogError;
use taskbot_core::{NodeId, PermissionLevel, UserId};
use taskbot_directory::DirectoryError;
use taskbot_ledger::LedgerError;
use taskbot_wizard::WizardError;
use thiserror::Error;

/// Errors from console operations
#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("Actor {actor} needs {required} permission")]
    PermissionDenied {
        actor: UserId,
        required: PermissionLevel,
    },

    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Wizard(#[from] WizardError),
}
