//! Taskbot Wizard - multi-step node authoring
//!
//! An authoring session walks an admin through the fields of one new content
//! node, one input per step, in a fixed order:
//!
//! `AwaitName -> AwaitParent -> AwaitBody -> AwaitImage -> AwaitPrice ->
//! AwaitButtons -> commit`
//!
//! Invalid input re-enters the same step with a typed validation error and
//! never advances. Nothing is persisted before the final step; the commit
//! creates exactly one node through the catalog and clears the session.
//! Starting a new session for an actor silently discards any session already
//! in progress.

mod error;
mod state;
mod wizard;

pub use error::{ValidationError, WizardError};
pub use state::{Draft, WizardStep};
pub use wizard::{AuthoringWizard, WizardReply};
