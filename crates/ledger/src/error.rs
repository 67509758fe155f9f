//! Ledger errors

use crate::task::TaskState;
use rust_decimal::Decimal;
use taskbot_core::{AmountError, NodeId, UserId};
use thiserror::Error;

/// Errors that can occur in ledger operations
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Amount(#[from] AmountError),

    #[error("Node {0} carries no price and is not a task")]
    NotATask(NodeId),

    #[error("Task for user {user} on node {node} already exists")]
    AlreadyCompleted { user: UserId, node: NodeId },

    #[error("No task for user {user} on node {node}")]
    TaskNotFound { user: UserId, node: NodeId },

    #[error("Invalid task transition: {from} -> {to}")]
    InvalidTransition { from: TaskState, to: TaskState },

    #[error("Credit of {delta} would drive balance of {user} below zero (current {balance})")]
    WouldGoNegative {
        user: UserId,
        balance: Decimal,
        delta: Decimal,
    },
}
