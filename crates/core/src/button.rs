//! Inline button variants attached to content nodes
//!
//! A node carries an ordered list of inline buttons. Each button is either
//! an external URL link or an internal action id. The two shapes are
//! distinguished at parse time and rejected with a typed error when
//! malformed, rather than probed for keys at render time.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from parsing or validating an inline button list
#[derive(Debug, Error)]
pub enum ButtonError {
    #[error("Malformed button list: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Button label cannot be empty")]
    EmptyLabel,

    #[error("Button URL must start with http:// or https://: {0}")]
    InvalidUrl(String),

    #[error("Button action id cannot be empty")]
    EmptyAction,
}

/// One inline button: an external link or an internal action.
///
/// Wire shape is a JSON object with `label` plus exactly one of `url` or
/// `action`:
///
/// ```json
/// [{"label": "Website", "url": "https://example.com"},
///  {"label": "Claim", "action": "claim_bonus"}]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InlineButton {
    /// External URL link
    Url { label: String, url: String },
    /// Internal action id, dispatched by the router
    Action { label: String, action: String },
}

impl InlineButton {
    /// The display label, regardless of variant
    pub fn label(&self) -> &str {
        match self {
            InlineButton::Url { label, .. } => label,
            InlineButton::Action { label, .. } => label,
        }
    }

    /// Validate label and target
    fn validate(&self) -> Result<(), ButtonError> {
        if self.label().trim().is_empty() {
            return Err(ButtonError::EmptyLabel);
        }
        match self {
            InlineButton::Url { url, .. } => {
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return Err(ButtonError::InvalidUrl(url.clone()));
                }
            }
            InlineButton::Action { action, .. } => {
                if action.trim().is_empty() {
                    return Err(ButtonError::EmptyAction);
                }
            }
        }
        Ok(())
    }
}

/// Parse and validate a JSON button list.
///
/// Returns the validated buttons or the first violation found.
pub fn parse_buttons(json: &str) -> Result<Vec<InlineButton>, ButtonError> {
    let buttons: Vec<InlineButton> = serde_json::from_str(json)?;
    for button in &buttons {
        button.validate()?;
    }
    Ok(buttons)
}
