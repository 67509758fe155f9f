//! The access gate service

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use taskbot_core::UserId;

use crate::types::{GateOutcome, ProfileAttrs, SubscriptionOracle};

/// Gates user access behind the subscription oracle.
///
/// The last verdict per user is cached so a multi-turn flow (prompt,
/// user acts, prompt again) never consults the oracle outside an explicit
/// `recheck`. Locks are released before the oracle call, so one user's
/// slow oracle round trip never blocks another user.
pub struct AccessGate {
    oracle: Arc<dyn SubscriptionOracle>,
    profiles: RwLock<HashMap<UserId, ProfileAttrs>>,
    verdicts: RwLock<HashMap<UserId, GateOutcome>>,
}

impl AccessGate {
    pub fn new(oracle: Arc<dyn SubscriptionOracle>) -> Self {
        Self {
            oracle,
            profiles: RwLock::new(HashMap::new()),
            verdicts: RwLock::new(HashMap::new()),
        }
    }

    /// Last known verdict for a user without consulting the oracle.
    ///
    /// A user never checked is treated as needing a recheck; callers route
    /// first-contact users through `recheck` once.
    pub fn current_verdict(&self, user: UserId) -> Option<GateOutcome> {
        let verdicts = self.verdicts.read().unwrap();
        verdicts.get(&user).cloned()
    }

    /// Whether the user's cached verdict allows them through
    pub fn is_passed(&self, user: UserId) -> bool {
        self.current_verdict(user)
            .map(|v| v.is_passed())
            .unwrap_or(false)
    }

    /// Merge newly supplied profile attributes for a user.
    ///
    /// Does not call the oracle; the new values take effect on the next
    /// `recheck`.
    pub fn update_profile_attrs(&self, user: UserId, gender: Option<String>, age: Option<u32>) {
        let mut profiles = self.profiles.write().unwrap();
        profiles.entry(user).or_default().merge(gender, age);
    }

    /// Stored profile attributes for a user
    pub fn profile_of(&self, user: UserId) -> ProfileAttrs {
        let profiles = self.profiles.read().unwrap();
        profiles.get(&user).cloned().unwrap_or_default()
    }

    /// Consult the oracle exactly once and cache the verdict.
    ///
    /// Oracle failures fail OPEN: the user is let through and the failure
    /// is logged. Never returns an error to the caller.
    pub async fn recheck(&self, user: UserId) -> GateOutcome {
        let attrs = self.profile_of(user);

        let outcome = match self.oracle.classify(user, &attrs).await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::warn!(%user, error = %err, "oracle unavailable, failing open");
                GateOutcome::Passed
            }
        };

        let mut verdicts = self.verdicts.write().unwrap();
        verdicts.insert(user, outcome.clone());
        outcome
    }
}
