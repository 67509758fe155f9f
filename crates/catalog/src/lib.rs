//! Taskbot Catalog - Hierarchical content tree store
//!
//! Content nodes form a tree rooted at the virtual `NodeId::ROOT`. Each node
//! carries the message body shown when the node is opened, an optional image
//! reference, an optional price (priced nodes are completable tasks), and an
//! ordered list of inline buttons.
//!
//! Deletion is non-cascading: children of a deleted node keep their stored
//! parent_id pointing at the now-absent id.

mod error;
mod node;
mod store;

pub use error::CatalogError;
pub use node::{ContentNode, NewNode};
pub use store::CatalogStore;
