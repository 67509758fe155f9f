//! Wizard session state

use strum_macros::Display;
use taskbot_core::{Amount, InlineButton, NodeId};

/// The step a session is waiting on.
///
/// Each step consumes exactly one input event for its field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum WizardStep {
    /// Node display name
    AwaitName,
    /// Parent node id (0 for the root level)
    AwaitParent,
    /// Message body
    AwaitBody,
    /// Image reference, or `none`
    AwaitImage,
    /// Price as a non-negative decimal (0 for a free node)
    AwaitPrice,
    /// Inline button JSON array, or `none`. Consuming this commits.
    AwaitButtons,
}

impl WizardStep {
    /// Prompt text shown to the authoring admin for this step
    pub fn prompt(&self) -> &'static str {
        match self {
            WizardStep::AwaitName => "Enter a name for the new node:",
            WizardStep::AwaitParent => "Enter the parent node id (0 for the root level):",
            WizardStep::AwaitBody => "Enter the message body for this node:",
            WizardStep::AwaitImage => "Enter an image reference, or 'none':",
            WizardStep::AwaitPrice => "Enter the task price (0 for a free node):",
            WizardStep::AwaitButtons => {
                "Enter a JSON button array, or 'none'.\n\
                 Example: [{\"label\": \"Website\", \"url\": \"https://example.com\"}]"
            }
        }
    }
}

/// Accumulated partial node fields.
///
/// Only fields for already-consumed steps are set.
#[derive(Debug, Clone, Default)]
pub struct Draft {
    pub name: Option<String>,
    pub parent_id: Option<NodeId>,
    pub body: Option<String>,
    pub image: Option<String>,
    pub price: Option<Amount>,
    pub buttons: Vec<InlineButton>,
}

/// One in-progress session: current step plus the draft
#[derive(Debug, Clone)]
pub(crate) struct Session {
    pub step: WizardStep,
    pub draft: Draft,
}

impl Session {
    pub fn new() -> Self {
        Self {
            step: WizardStep::AwaitName,
            draft: Draft::default(),
        }
    }
}
