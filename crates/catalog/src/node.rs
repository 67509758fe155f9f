//! Content node types

use chrono::{DateTime, Utc};
use taskbot_core::{Amount, InlineButton, NodeId};

/// One node of the content tree
#[derive(Debug, Clone, PartialEq)]
pub struct ContentNode {
    /// Unique node id (assigned by the store)
    pub id: NodeId,
    /// Display name used for the menu button opening this node
    pub name: String,
    /// Parent node id, `NodeId::ROOT` for top-level nodes
    pub parent_id: NodeId,
    /// Message body shown when the node is opened
    pub body: String,
    /// Optional image reference (a channel file id or URL)
    pub image: Option<String>,
    /// Optional price. Priced nodes are completable tasks.
    pub price: Option<Amount>,
    /// Ordered inline buttons appended below the children menu
    pub buttons: Vec<InlineButton>,
    /// When the node was created
    pub created_at: DateTime<Utc>,
}

impl ContentNode {
    /// A node is a task when it carries a price
    pub fn is_task(&self) -> bool {
        self.price.is_some()
    }
}

/// Fields for creating a new node
#[derive(Debug, Clone, Default)]
pub struct NewNode {
    pub name: String,
    pub parent_id: NodeId,
    pub body: String,
    pub image: Option<String>,
    pub price: Option<Amount>,
    pub buttons: Vec<InlineButton>,
}
