//! The authoring wizard service

use crate::error::{ValidationError, WizardError};
use crate::state::{Session, WizardStep};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, RwLock};
use taskbot_catalog::{CatalogStore, NewNode};
use taskbot_core::{parse_buttons, Amount, NodeId, PermissionLevel, UserId};

/// Sentinel accepted by the optional steps (`AwaitImage`, `AwaitButtons`)
const NONE_SENTINEL: &str = "none";

/// Reply after consuming one wizard input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardReply {
    /// The session advanced; prompt for this step next
    Prompt(WizardStep),
    /// The final step committed this node and the session is gone
    Committed(NodeId),
}

/// Per-actor authoring sessions.
///
/// Sessions are transient and in-memory only; the lock is never held across
/// an await point (sessions are read out, mutated, and written back).
pub struct AuthoringWizard {
    catalog: Arc<CatalogStore>,
    sessions: RwLock<HashMap<UserId, Session>>,
}

impl AuthoringWizard {
    /// Create a wizard committing through the given catalog
    pub fn new(catalog: Arc<CatalogStore>) -> Self {
        Self {
            catalog,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Start a session for an actor.
    ///
    /// Requires at least Limited permission. An existing session for the
    /// same actor is silently discarded (documented behavior, not an error).
    pub fn begin(&self, actor: UserId, level: PermissionLevel) -> Result<WizardStep, WizardError> {
        if !level.grants(PermissionLevel::Limited) {
            return Err(WizardError::NotAuthorized(actor));
        }

        let mut sessions = self.sessions.write().unwrap();
        if sessions.insert(actor, Session::new()).is_some() {
            tracing::debug!(%actor, "discarded in-progress authoring session");
        }
        Ok(WizardStep::AwaitName)
    }

    /// Cancel a session. Returns false when none was in progress.
    ///
    /// No side effects: nothing was persisted before commit.
    pub fn cancel(&self, actor: UserId) -> bool {
        let mut sessions = self.sessions.write().unwrap();
        sessions.remove(&actor).is_some()
    }

    /// Current step of an actor's session, if any
    pub fn step_of(&self, actor: UserId) -> Option<WizardStep> {
        let sessions = self.sessions.read().unwrap();
        sessions.get(&actor).map(|s| s.step)
    }

    /// Consume one input for the actor's current step.
    ///
    /// On validation failure the session is left unchanged and the caller
    /// re-prompts the same step.
    pub async fn feed(&self, actor: UserId, input: &str) -> Result<WizardReply, WizardError> {
        let mut session = {
            let sessions = self.sessions.read().unwrap();
            sessions
                .get(&actor)
                .cloned()
                .ok_or(WizardError::NoSession(actor))?
        };

        let input = input.trim();

        match session.step {
            WizardStep::AwaitName => {
                if input.is_empty() {
                    return Err(ValidationError::EmptyName.into());
                }
                session.draft.name = Some(input.to_string());
                session.step = WizardStep::AwaitParent;
            }
            WizardStep::AwaitParent => {
                let parent = i64::from_str(input)
                    .map(NodeId)
                    .map_err(|_| ValidationError::MalformedParentId(input.to_string()))?;
                if !parent.is_root() && self.catalog.get(parent).await?.is_none() {
                    return Err(ValidationError::UnknownParent(parent).into());
                }
                session.draft.parent_id = Some(parent);
                session.step = WizardStep::AwaitBody;
            }
            WizardStep::AwaitBody => {
                if input.is_empty() {
                    return Err(ValidationError::EmptyBody.into());
                }
                session.draft.body = Some(input.to_string());
                session.step = WizardStep::AwaitImage;
            }
            WizardStep::AwaitImage => {
                session.draft.image = if input.eq_ignore_ascii_case(NONE_SENTINEL) {
                    None
                } else {
                    Some(input.to_string())
                };
                session.step = WizardStep::AwaitPrice;
            }
            WizardStep::AwaitPrice => {
                let price = Decimal::from_str(input)
                    .ok()
                    .and_then(|d| Amount::new(d).ok())
                    .ok_or_else(|| ValidationError::InvalidPrice(input.to_string()))?;
                session.draft.price = Some(price);
                session.step = WizardStep::AwaitButtons;
            }
            WizardStep::AwaitButtons => {
                let buttons = if input.eq_ignore_ascii_case(NONE_SENTINEL) {
                    Vec::new()
                } else {
                    parse_buttons(input).map_err(ValidationError::BadButtons)?
                };
                session.draft.buttons = buttons;
                return self.commit(actor, session).await;
            }
        }

        let step = session.step;
        self.store(actor, session);
        Ok(WizardReply::Prompt(step))
    }

    /// Commit the completed draft as one node and clear the session.
    ///
    /// If the catalog rejects the draft (e.g. the parent vanished mid
    /// session) the session is kept so the error can be reported; nothing
    /// partial was persisted.
    async fn commit(&self, actor: UserId, session: Session) -> Result<WizardReply, WizardError> {
        let draft = session.draft.clone();
        let node = NewNode {
            // All fields are set by construction when AwaitButtons is reached
            name: draft.name.unwrap_or_default(),
            parent_id: draft.parent_id.unwrap_or(NodeId::ROOT),
            body: draft.body.unwrap_or_default(),
            image: draft.image,
            price: draft.price,
            buttons: draft.buttons,
        };

        match self.catalog.create(node).await {
            Ok(id) => {
                let mut sessions = self.sessions.write().unwrap();
                sessions.remove(&actor);
                tracing::info!(%actor, node = %id, "wizard committed node");
                Ok(WizardReply::Committed(id))
            }
            Err(err) => {
                self.store(actor, session);
                Err(err.into())
            }
        }
    }

    fn store(&self, actor: UserId, session: Session) {
        let mut sessions = self.sessions.write().unwrap();
        sessions.insert(actor, session);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const ADMIN: UserId = UserId(1);

    async fn wizard() -> (AuthoringWizard, Arc<CatalogStore>) {
        let catalog = Arc::new(CatalogStore::in_memory().await.unwrap());
        (AuthoringWizard::new(Arc::clone(&catalog)), catalog)
    }

    async fn run(wizard: &AuthoringWizard, inputs: &[&str]) -> WizardReply {
        let mut reply = WizardReply::Prompt(WizardStep::AwaitName);
        for input in inputs {
            reply = wizard.feed(ADMIN, input).await.unwrap();
        }
        reply
    }

    #[tokio::test]
    async fn test_begin_requires_limited() {
        let (wizard, _) = wizard().await;
        let denied = wizard.begin(ADMIN, PermissionLevel::None);
        assert!(matches!(denied, Err(WizardError::NotAuthorized(ADMIN))));
        assert!(wizard.begin(ADMIN, PermissionLevel::Limited).is_ok());
    }

    #[tokio::test]
    async fn test_full_walk_commits_one_node() {
        let (wizard, catalog) = wizard().await;
        wizard.begin(ADMIN, PermissionLevel::Limited).unwrap();

        let reply = run(
            &wizard,
            &[
                "Task A",
                "0",
                "Complete this task to earn",
                "none",
                "5.00",
                r#"[{"label": "Details", "url": "https://example.com"}]"#,
            ],
        )
        .await;

        let id = match reply {
            WizardReply::Committed(id) => id,
            other => panic!("expected commit, got {other:?}"),
        };

        let node = catalog.get(id).await.unwrap().unwrap();
        assert_eq!(node.name, "Task A");
        assert_eq!(node.parent_id, NodeId::ROOT);
        assert!(node.image.is_none());
        assert_eq!(node.price.unwrap().value(), dec!(5.00));
        assert_eq!(node.buttons.len(), 1);

        // Session is gone after commit
        assert!(wizard.step_of(ADMIN).is_none());
        // Exactly one node was persisted
        assert_eq!(catalog.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_price_reenters_same_step() {
        let (wizard, _) = wizard().await;
        wizard.begin(ADMIN, PermissionLevel::Limited).unwrap();
        run(&wizard, &["Task", "0", "body", "none"]).await;

        let err = wizard.feed(ADMIN, "five dollars").await;
        assert!(matches!(
            err,
            Err(WizardError::Validation(ValidationError::InvalidPrice(_)))
        ));
        assert_eq!(wizard.step_of(ADMIN), Some(WizardStep::AwaitPrice));

        let err = wizard.feed(ADMIN, "-1").await;
        assert!(matches!(
            err,
            Err(WizardError::Validation(ValidationError::InvalidPrice(_)))
        ));

        // A valid retry advances
        let reply = wizard.feed(ADMIN, "2.50").await.unwrap();
        assert_eq!(reply, WizardReply::Prompt(WizardStep::AwaitButtons));
    }

    #[tokio::test]
    async fn test_malformed_buttons_reenter_same_step() {
        let (wizard, _) = wizard().await;
        wizard.begin(ADMIN, PermissionLevel::Limited).unwrap();
        run(&wizard, &["Task", "0", "body", "none", "0"]).await;

        let err = wizard.feed(ADMIN, "{not a list}").await;
        assert!(matches!(
            err,
            Err(WizardError::Validation(ValidationError::BadButtons(_)))
        ));
        assert_eq!(wizard.step_of(ADMIN), Some(WizardStep::AwaitButtons));
    }

    #[tokio::test]
    async fn test_unknown_parent_rejected() {
        let (wizard, _) = wizard().await;
        wizard.begin(ADMIN, PermissionLevel::Limited).unwrap();
        wizard.feed(ADMIN, "Task").await.unwrap();

        let err = wizard.feed(ADMIN, "999").await;
        assert!(matches!(
            err,
            Err(WizardError::Validation(ValidationError::UnknownParent(NodeId(999))))
        ));
        assert_eq!(wizard.step_of(ADMIN), Some(WizardStep::AwaitParent));
    }

    #[tokio::test]
    async fn test_restart_discards_previous_draft() {
        let (wizard, catalog) = wizard().await;
        wizard.begin(ADMIN, PermissionLevel::Limited).unwrap();
        run(&wizard, &["Old Name", "0", "old body", "old.png"]).await;

        // Begin again: the old draft must leave no trace in the committed node
        wizard.begin(ADMIN, PermissionLevel::Limited).unwrap();
        let reply = run(&wizard, &["New Name", "0", "new body", "none", "0", "none"]).await;

        let id = match reply {
            WizardReply::Committed(id) => id,
            other => panic!("expected commit, got {other:?}"),
        };
        let node = catalog.get(id).await.unwrap().unwrap();
        assert_eq!(node.name, "New Name");
        assert_eq!(node.body, "new body");
        assert!(node.image.is_none());
        assert_eq!(catalog.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_has_no_side_effects() {
        let (wizard, catalog) = wizard().await;
        wizard.begin(ADMIN, PermissionLevel::Limited).unwrap();
        run(&wizard, &["Task", "0", "body"]).await;

        assert!(wizard.cancel(ADMIN));
        assert!(!wizard.cancel(ADMIN));
        assert!(wizard.step_of(ADMIN).is_none());
        assert!(catalog.list_all().await.unwrap().is_empty());

        let err = wizard.feed(ADMIN, "anything").await;
        assert!(matches!(err, Err(WizardError::NoSession(ADMIN))));
    }
}
