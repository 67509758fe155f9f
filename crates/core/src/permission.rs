//! Admin permission levels with a total order
//!
//! Ordering: `None < Limited < Full`. Permission checks compare with `>=`,
//! so a Full admin can do everything a Limited admin can.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Permission level of an administrator
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PermissionLevel {
    /// Not an admin
    None,
    /// May manage the content tree
    Limited,
    /// May additionally broadcast, manage admins, and manage gating
    Full,
}

impl PermissionLevel {
    /// Stable string form used in storage columns
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionLevel::None => "none",
            PermissionLevel::Limited => "limited",
            PermissionLevel::Full => "full",
        }
    }

    /// Check whether this level grants at least `required`
    #[inline]
    pub fn grants(&self, required: PermissionLevel) -> bool {
        *self >= required
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_ordering() {
        assert!(PermissionLevel::Full > PermissionLevel::Limited);
        assert!(PermissionLevel::Limited > PermissionLevel::None);
    }

    #[test]
    fn test_grants() {
        assert!(PermissionLevel::Full.grants(PermissionLevel::Limited));
        assert!(PermissionLevel::Limited.grants(PermissionLevel::Limited));
        assert!(!PermissionLevel::None.grants(PermissionLevel::Limited));
    }

    #[test]
    fn test_strum_roundtrip() {
        for level in [
            PermissionLevel::None,
            PermissionLevel::Limited,
            PermissionLevel::Full,
        ] {
            let parsed = PermissionLevel::from_str(level.as_str()).unwrap();
            assert_eq!(parsed, level);
        }
    }
}
