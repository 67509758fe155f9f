//! Taskbot Ledger - balances, task lifecycle, referrals
//!
//! This is the HEART of Taskbot. All balance state changes go through this
//! crate as audited, signed credit operations.
//!
//! # Key Types
//! - `Ledger`: SQLite-backed store owning balances, tasks, and referrals
//! - `TaskRecord` / `TaskState`: per-(user, node) completion lifecycle
//! - `ReferralLink`: one-shot referrer linkage with the first-bonus flag
//! - `ApproveOutcome`: result of the idempotent approval operation
//!
//! # Atomicity
//! `approve` and `register_referral` apply their state transition and every
//! balance credit inside one SQLite transaction; there is no observable
//! state where one happened without the other. Idempotency under concurrent
//! approvals is enforced with a state-guarded UPDATE.

mod error;
mod ledger;
mod referral;
mod task;

pub use error::LedgerError;
pub use ledger::{ApproveOutcome, Commission, CreditEntry, CreditReason, Ledger, LedgerConfig};
pub use referral::ReferralLink;
pub use task::{TaskRecord, TaskState};
