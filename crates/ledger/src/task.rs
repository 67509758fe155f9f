//! Task lifecycle types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use taskbot_core::{NodeId, UserId};

/// State of a task record.
///
/// Strictly forward: `Started -> ProofSubmitted -> Approved`. Approval is
/// additionally accepted straight from `Started` (trusted-approver design).
/// `Approved` is terminal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TaskState {
    /// User started the task
    Started,
    /// User submitted completion proof, awaiting review
    ProofSubmitted,
    /// Admin approved; reward credited. Terminal.
    Approved,
}

impl TaskState {
    /// Stable string form used in storage columns
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Started => "started",
            TaskState::ProofSubmitted => "proof_submitted",
            TaskState::Approved => "approved",
        }
    }
}

/// One task record, unique per (user, node)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub user: UserId,
    pub node: NodeId,
    pub state: TaskState,
    /// Proof reference (a channel file id or free text), set on submission
    pub proof: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
