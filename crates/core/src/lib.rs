//! Taskbot Core - Domain types
//!
//! This crate contains the fundamental types used across Taskbot:
//! - `Amount`: Non-negative decimal wrapper for balances and prices
//! - `UserId` / `NodeId`: Typed identifiers
//! - `PermissionLevel`: Ordered admin permission levels
//! - `InlineButton`: Validated inline button variants (URL vs. action)

pub mod amount;
pub mod button;
pub mod ids;
pub mod permission;

pub use amount::{Amount, AmountError};
pub use button::{parse_buttons, ButtonError, InlineButton};
pub use ids::{NodeId, UserId};
pub use permission::PermissionLevel;
