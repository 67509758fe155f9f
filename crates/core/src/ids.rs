//! Typed identifiers for users and content nodes

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a chat user (the numeric id assigned by the chat channel)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl UserId {
    #[inline]
    pub const fn value(&self) -> i64 {
        self.0
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a content node in the tree.
///
/// `NodeId::ROOT` (= 0) is the virtual root: it never exists as a stored
/// node, but every top-level node uses it as parent.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct NodeId(pub i64);

impl NodeId {
    /// The virtual tree root
    pub const ROOT: Self = Self(0);

    #[inline]
    pub const fn value(&self) -> i64 {
        self.0
    }

    /// Check whether this id is the virtual root
    #[inline]
    pub fn is_root(&self) -> bool {
        self.0 == 0
    }
}

impl From<i64> for NodeId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_is_zero() {
        assert!(NodeId::ROOT.is_root());
        assert!(!NodeId(1).is_root());
    }

    #[test]
    fn test_display() {
        assert_eq!(UserId(42).to_string(), "42");
        assert_eq!(NodeId(7).to_string(), "7");
    }
}
