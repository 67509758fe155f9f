//! Core gate types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use taskbot_core::UserId;

use crate::OracleError;

/// Profile attribute the oracle may still need
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileField {
    Gender,
    Age,
}

impl std::fmt::Display for ProfileField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProfileField::Gender => write!(f, "gender"),
            ProfileField::Age => write!(f, "age"),
        }
    }
}

/// Profile attributes collected from the user across gate turns.
///
/// Attributes accumulate: a later update never erases a field the user
/// already supplied, it only fills gaps or replaces values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileAttrs {
    pub gender: Option<String>,
    pub age: Option<u32>,
}

impl ProfileAttrs {
    /// Merge newly supplied values into this set
    pub fn merge(&mut self, gender: Option<String>, age: Option<u32>) {
        if gender.is_some() {
            self.gender = gender;
        }
        if age.is_some() {
            self.age = age;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.gender.is_none() && self.age.is_none()
    }
}

/// One classification verdict from the oracle.
///
/// Every outcome except `Passed` names the input the user must supply
/// before a recheck can succeed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GateOutcome {
    /// The user may proceed
    Passed,
    /// The user must subscribe to these targets first
    NeedsSubscription { targets: Vec<String> },
    /// The user must complete an external profile form
    NeedsProfileForm { url: String },
    /// The user must supply one profile attribute
    NeedsAttribute { field: ProfileField },
}

impl GateOutcome {
    pub fn is_passed(&self) -> bool {
        matches!(self, GateOutcome::Passed)
    }
}

/// Subscription oracle trait - the external classification service.
///
/// Implementations can be:
/// - MockOracle: scripted outcomes for testing
/// - a real client over the gating service's request/response protocol
#[async_trait]
pub trait SubscriptionOracle: Send + Sync {
    /// Classify a user given everything known about their profile
    async fn classify(&self, user: UserId, attrs: &ProfileAttrs) -> Result<GateOutcome, OracleError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_fills_and_replaces() {
        let mut attrs = ProfileAttrs::default();
        assert!(attrs.is_empty());

        attrs.merge(Some("f".to_string()), None);
        assert_eq!(attrs.gender.as_deref(), Some("f"));
        assert!(attrs.age.is_none());

        attrs.merge(None, Some(30));
        assert_eq!(attrs.gender.as_deref(), Some("f"));
        assert_eq!(attrs.age, Some(30));

        // None never erases a supplied value
        attrs.merge(None, None);
        assert_eq!(attrs.gender.as_deref(), Some("f"));
        assert_eq!(attrs.age, Some(30));
    }

    #[test]
    fn test_profile_field_display() {
        assert_eq!(ProfileField::Gender.to_string(), "gender");
        assert_eq!(ProfileField::Age.to_string(), "age");
    }
}
