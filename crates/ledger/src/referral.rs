//! Referral linkage types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use taskbot_core::UserId;

/// A referral link: who referred whom.
///
/// # Invariants
/// - `referred` is the unique key; a user can be referred at most once
/// - the link is immutable once created
/// - `first_bonus_paid` flips false -> true exactly once, on the referred
///   user's first approved task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralLink {
    pub referred: UserId,
    pub referrer: UserId,
    pub first_bonus_paid: bool,
    pub created_at: DateTime<Utc>,
}
