//! Admin console orchestration
//!
//! Composes the catalog, directory, ledger, and wizard behind permission
//! checks. Node CRUD needs Limited; broadcast, admin management, and task
//! approval need Full.

use std::sync::Arc;
use taskbot_catalog::{CatalogStore, ContentNode, NewNode};
use taskbot_core::{Amount, NodeId, PermissionLevel, UserId};
use taskbot_directory::{Admin, AdminDirectory};
use taskbot_ledger::{ApproveOutcome, Ledger, LedgerError, TaskRecord};
use taskbot_wizard::{AuthoringWizard, WizardReply, WizardStep};

use crate::broadcast::BroadcastReport;
use crate::error::ConsoleError;
use crate::messenger::{Messenger, OutboundMessage};

/// The operator-facing service surface
pub struct AdminConsole {
    catalog: Arc<CatalogStore>,
    directory: Arc<AdminDirectory>,
    ledger: Arc<Ledger>,
    wizard: Arc<AuthoringWizard>,
    messenger: Arc<dyn Messenger>,
}

impl AdminConsole {
    pub fn new(
        catalog: Arc<CatalogStore>,
        directory: Arc<AdminDirectory>,
        ledger: Arc<Ledger>,
        wizard: Arc<AuthoringWizard>,
        messenger: Arc<dyn Messenger>,
    ) -> Self {
        Self {
            catalog,
            directory,
            ledger,
            wizard,
            messenger,
        }
    }

    pub fn catalog(&self) -> &CatalogStore {
        &self.catalog
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn directory(&self) -> &AdminDirectory {
        &self.directory
    }

    pub fn wizard(&self) -> &AuthoringWizard {
        &self.wizard
    }

    async fn require(
        &self,
        actor: UserId,
        required: PermissionLevel,
    ) -> Result<PermissionLevel, ConsoleError> {
        let level = self.directory.permission_of(actor).await?;
        if !level.grants(required) {
            return Err(ConsoleError::PermissionDenied { actor, required });
        }
        Ok(level)
    }

    // === Content tree ===

    /// Create a node directly, outside the wizard. Requires Limited.
    pub async fn create_node(&self, actor: UserId, node: NewNode) -> Result<NodeId, ConsoleError> {
        self.require(actor, PermissionLevel::Limited).await?;
        Ok(self.catalog.create(node).await?)
    }

    /// Delete a node. Requires Limited. Children are not cascaded.
    pub async fn delete_node(&self, actor: UserId, id: NodeId) -> Result<(), ConsoleError> {
        self.require(actor, PermissionLevel::Limited).await?;
        if !self.catalog.delete(id).await? {
            return Err(ConsoleError::NodeNotFound(id));
        }
        Ok(())
    }

    pub async fn list_nodes(&self, actor: UserId) -> Result<Vec<ContentNode>, ConsoleError> {
        self.require(actor, PermissionLevel::Limited).await?;
        Ok(self.catalog.list_all().await?)
    }

    // === Authoring wizard ===

    /// Open an authoring session for the actor. Requires Limited.
    pub async fn begin_authoring(&self, actor: UserId) -> Result<WizardStep, ConsoleError> {
        let level = self.require(actor, PermissionLevel::Limited).await?;
        Ok(self.wizard.begin(actor, level)?)
    }

    /// Feed one input into the actor's authoring session
    pub async fn author_input(&self, actor: UserId, input: &str) -> Result<WizardReply, ConsoleError> {
        Ok(self.wizard.feed(actor, input).await?)
    }

    // === Tasks ===

    /// Start a task for a user on a node. Not permission-gated: any user
    /// can take a task. Priceless nodes fail with `NotATask`.
    pub async fn start_task(&self, user: UserId, node: NodeId) -> Result<TaskRecord, ConsoleError> {
        let price = self.node_price(node).await?;
        Ok(self.ledger.start_task(user, node, price).await?)
    }

    /// Record a user's completion proof and notify every admin.
    ///
    /// Per-admin notification failures are logged and counted; the ledger
    /// transition never depends on delivery.
    pub async fn submit_proof(
        &self,
        user: UserId,
        node: NodeId,
        proof: &str,
    ) -> Result<TaskRecord, ConsoleError> {
        let record = self.ledger.submit_proof(user, node, proof).await?;

        let text = format!("User {user} submitted proof for task {node}: {proof}");
        let mut failed = 0usize;
        for admin in self.directory.admins().await? {
            let message = OutboundMessage::text(admin.user_id, text.clone());
            if let Err(err) = self.messenger.send(message).await {
                tracing::warn!(admin = %admin.user_id, error = %err, "admin notification failed");
                failed += 1;
            }
        }
        if failed > 0 {
            tracing::warn!(%user, %node, failed, "some admin notifications were not delivered");
        }

        Ok(record)
    }

    /// Approve a task and release its credit. Requires Full.
    ///
    /// Idempotent through the ledger: a second approval reports
    /// `AlreadyApproved` and moves no money.
    pub async fn approve(
        &self,
        actor: UserId,
        user: UserId,
        node: NodeId,
    ) -> Result<ApproveOutcome, ConsoleError> {
        self.require(actor, PermissionLevel::Full).await?;

        let price = self
            .node_price(node)
            .await?
            .ok_or(LedgerError::NotATask(node))?;
        let outcome = self.ledger.approve(user, node, price).await?;

        if let ApproveOutcome::Approved { reward, .. } = &outcome {
            let note = OutboundMessage::text(user, format!("Task {node} approved, {reward} credited"));
            if let Err(err) = self.messenger.send(note).await {
                tracing::warn!(%user, error = %err, "approval notification failed");
            }
        }
        Ok(outcome)
    }

    async fn node_price(&self, node: NodeId) -> Result<Option<Amount>, ConsoleError> {
        let node = self
            .catalog
            .get(node)
            .await?
            .ok_or(ConsoleError::NodeNotFound(node))?;
        Ok(node.price)
    }

    // === Admin management (directory enforces Full + root immunity) ===

    pub async fn add_admin(
        &self,
        acting: UserId,
        new_admin: UserId,
        level: PermissionLevel,
    ) -> Result<(), ConsoleError> {
        Ok(self.directory.add_admin(acting, new_admin, level).await?)
    }

    pub async fn remove_admin(&self, acting: UserId, target: UserId) -> Result<(), ConsoleError> {
        Ok(self.directory.remove_admin(acting, target).await?)
    }

    pub async fn set_admin_level(
        &self,
        acting: UserId,
        target: UserId,
        level: PermissionLevel,
    ) -> Result<(), ConsoleError> {
        Ok(self.directory.set_permission(acting, target, level).await?)
    }

    pub async fn admins(&self, actor: UserId) -> Result<Vec<Admin>, ConsoleError> {
        self.require(actor, PermissionLevel::Full).await?;
        Ok(self.directory.admins().await?)
    }

    // === Broadcast ===

    /// Send a text to every known user. Requires Full.
    ///
    /// Runs the whole batch regardless of individual failures and returns
    /// the tally.
    pub async fn broadcast(&self, actor: UserId, text: &str) -> Result<BroadcastReport, ConsoleError> {
        self.require(actor, PermissionLevel::Full).await?;

        let recipients = self.ledger.known_users().await?;
        let mut report = BroadcastReport::default();
        for user in recipients {
            let message = OutboundMessage::text(user, text);
            match self.messenger.send(message).await {
                Ok(()) => report.sent += 1,
                Err(err) => {
                    tracing::warn!(%user, error = %err, "broadcast delivery failed");
                    report.failed += 1;
                }
            }
        }

        tracing::info!(by = %actor, %report, "broadcast finished");
        Ok(report)
    }
}
