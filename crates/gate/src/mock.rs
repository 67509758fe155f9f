//! Mock oracle for testing
//!
//! Scripted per-user outcomes plus failure injection for the fail-open path.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use taskbot_core::UserId;

use crate::error::OracleError;
use crate::types::{GateOutcome, ProfileAttrs, SubscriptionOracle};

/// Mock subscription oracle.
///
/// Each user has a queue of scripted outcomes consumed front to back;
/// when the queue is empty the oracle answers `Passed`. Individual users
/// can be set to fail instead, and every call is counted.
pub struct MockOracle {
    scripts: RwLock<HashMap<UserId, Vec<GateOutcome>>>,
    failing: RwLock<HashMap<UserId, String>>,
    calls: RwLock<HashMap<UserId, usize>>,
}

impl MockOracle {
    /// Create a mock oracle that answers `Passed` for everyone
    pub fn new() -> Self {
        Self {
            scripts: RwLock::new(HashMap::new()),
            failing: RwLock::new(HashMap::new()),
            calls: RwLock::new(HashMap::new()),
        }
    }

    /// Queue an outcome for a user; queued outcomes are consumed in order
    pub fn script(&self, user: UserId, outcome: GateOutcome) {
        let mut scripts = self.scripts.write().unwrap();
        scripts.entry(user).or_default().push(outcome);
    }

    /// Make every call for this user fail with a protocol error
    pub fn fail_for(&self, user: UserId, reason: impl Into<String>) {
        let mut failing = self.failing.write().unwrap();
        failing.insert(user, reason.into());
    }

    /// Stop failing for this user
    pub fn recover(&self, user: UserId) {
        let mut failing = self.failing.write().unwrap();
        failing.remove(&user);
    }

    /// Number of classify calls made for this user
    pub fn call_count(&self, user: UserId) -> usize {
        self.calls.read().unwrap().get(&user).copied().unwrap_or(0)
    }
}

impl Default for MockOracle {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SubscriptionOracle for MockOracle {
    async fn classify(&self, user: UserId, _attrs: &ProfileAttrs) -> Result<GateOutcome, OracleError> {
        {
            let mut calls = self.calls.write().unwrap();
            *calls.entry(user).or_insert(0) += 1;
        }

        if let Some(reason) = self.failing.read().unwrap().get(&user) {
            return Err(OracleError::Protocol {
                reason: reason.clone(),
            });
        }

        let mut scripts = self.scripts.write().unwrap();
        let outcome = match scripts.get_mut(&user) {
            Some(queue) if !queue.is_empty() => queue.remove(0),
            _ => GateOutcome::Passed,
        };
        Ok(outcome)
    }
}
