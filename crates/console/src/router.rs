//! Inbound event routing
//!
//! Classifies each inbound event, gates non-admin traffic through the
//! access gate, then dispatches to menu navigation, the task flow, the
//! authoring wizard, or nothing. The router produces the user-facing
//! replies; delivery is the caller's job.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use taskbot_catalog::ContentNode;
use taskbot_core::{InlineButton, NodeId, PermissionLevel, UserId};
use taskbot_gate::{AccessGate, GateOutcome, ProfileField};
use taskbot_ledger::LedgerError;
use taskbot_wizard::WizardReply;

use crate::console::AdminConsole;
use crate::error::ConsoleError;
use crate::messenger::OutboundMessage;

// Internal action ids carried by menu buttons
const ACTION_MAIN: &str = "main";
const ACTION_MENU: &str = "menu:";
const ACTION_BACK: &str = "back:";
const ACTION_TASK_START: &str = "task:start:";
const ACTION_RECHECK: &str = "gate:recheck";

/// One typed event from the messaging channel
#[derive(Debug, Clone)]
pub enum InboundEvent {
    /// Free text
    Text { from: UserId, text: String },
    /// Selection of an attached action button
    Action { from: UserId, action: String },
    /// Media upload, by reference
    Media { from: UserId, reference: String },
}

impl InboundEvent {
    pub fn from(&self) -> UserId {
        match self {
            InboundEvent::Text { from, .. }
            | InboundEvent::Action { from, .. }
            | InboundEvent::Media { from, .. } => *from,
        }
    }
}

/// Routes inbound events to the right service.
///
/// Tracks which node each user owes proof for, so a media upload can be
/// attributed to the task it belongs to.
pub struct Router {
    console: Arc<AdminConsole>,
    gate: Arc<AccessGate>,
    contact: String,
    awaiting_proof: RwLock<HashMap<UserId, NodeId>>,
}

impl Router {
    pub fn new(console: Arc<AdminConsole>, gate: Arc<AccessGate>, contact: impl Into<String>) -> Self {
        Self {
            console,
            gate,
            contact: contact.into(),
            awaiting_proof: RwLock::new(HashMap::new()),
        }
    }

    /// Process one event to completion and return the replies to deliver
    pub async fn handle(&self, event: InboundEvent) -> Result<Vec<OutboundMessage>, ConsoleError> {
        let from = event.from();
        let level = self.console.directory().permission_of(from).await?;

        // Admins are never gated
        if level == PermissionLevel::None {
            if let Some(reply) = self.gate_check(&event).await? {
                return Ok(reply);
            }
        }

        match event {
            InboundEvent::Text { from, text } => self.handle_text(from, level, &text).await,
            InboundEvent::Action { from, action } => self.handle_action(from, &action).await,
            InboundEvent::Media { from, reference } => self.handle_media(from, &reference).await,
        }
    }

    // === Gate flow ===

    /// Returns Some(reply) when the gate intercepts the event.
    ///
    /// The cached verdict decides: a user never checked gets exactly one
    /// oracle call, a pending non-Passed verdict is resumed without one,
    /// and only the recheck action consults the oracle again.
    async fn gate_check(&self, event: &InboundEvent) -> Result<Option<Vec<OutboundMessage>>, ConsoleError> {
        let from = event.from();

        if let InboundEvent::Action { action, .. } = event {
            if action == ACTION_RECHECK {
                let outcome = self.gate.recheck(from).await;
                return match outcome {
                    GateOutcome::Passed => Ok(Some(self.render_root(from).await?)),
                    other => Ok(Some(vec![self.gate_prompt(from, &other)])),
                };
            }
        }

        match self.gate.current_verdict(from) {
            Some(GateOutcome::Passed) => Ok(None),
            None => {
                // First contact
                match self.gate.recheck(from).await {
                    GateOutcome::Passed => Ok(None),
                    other => Ok(Some(vec![self.gate_prompt(from, &other)])),
                }
            }
            Some(GateOutcome::NeedsAttribute { field }) => {
                if let InboundEvent::Text { text, .. } = event {
                    if let Some(reply) = self.consume_attribute(from, field, text) {
                        return Ok(Some(vec![reply]));
                    }
                }
                Ok(Some(vec![self.gate_prompt(
                    from,
                    &GateOutcome::NeedsAttribute { field },
                )]))
            }
            Some(pending) => Ok(Some(vec![self.gate_prompt(from, &pending)])),
        }
    }

    /// Store a supplied attribute; the user confirms with a recheck
    fn consume_attribute(
        &self,
        from: UserId,
        field: ProfileField,
        text: &str,
    ) -> Option<OutboundMessage> {
        let text = text.trim();
        match field {
            ProfileField::Age => {
                let age: u32 = text.parse().ok()?;
                self.gate.update_profile_attrs(from, None, Some(age));
            }
            ProfileField::Gender => {
                if text.is_empty() {
                    return None;
                }
                self.gate.update_profile_attrs(from, Some(text.to_string()), None);
            }
        }
        Some(OutboundMessage {
            to: from,
            text: "Saved. Press the button to check your access.".to_string(),
            image: None,
            buttons: vec![recheck_button()],
        })
    }

    fn gate_prompt(&self, to: UserId, outcome: &GateOutcome) -> OutboundMessage {
        match outcome {
            GateOutcome::Passed => self.not_found_hint(to),
            GateOutcome::NeedsSubscription { targets } => OutboundMessage {
                to,
                text: format!("Please subscribe first: {}", targets.join(", ")),
                image: None,
                buttons: vec![recheck_button()],
            },
            GateOutcome::NeedsProfileForm { url } => OutboundMessage {
                to,
                text: "Please fill in your profile first.".to_string(),
                image: None,
                buttons: vec![
                    InlineButton::Url {
                        label: "Open form".to_string(),
                        url: url.clone(),
                    },
                    recheck_button(),
                ],
            },
            GateOutcome::NeedsAttribute { field } => OutboundMessage::text(
                to,
                format!("Please send your {field} as a message."),
            ),
        }
    }

    // === Dispatch ===

    async fn handle_text(
        &self,
        from: UserId,
        level: PermissionLevel,
        text: &str,
    ) -> Result<Vec<OutboundMessage>, ConsoleError> {
        let text = text.trim();

        // Only a bare "/start" or "/start <payload>", not e.g. "/startref_5"
        if let Some(payload) = text.strip_prefix("/start") {
            if payload.is_empty() || payload.starts_with(char::is_whitespace) {
                self.register_referral(from, payload).await?;
                return self.render_root(from).await;
            }
        }

        // An admin mid-authoring owns the text stream
        if level.grants(PermissionLevel::Limited) && self.console.wizard().step_of(from).is_some() {
            return self.wizard_turn(from, text).await;
        }

        self.render_root(from).await
    }

    async fn handle_action(&self, from: UserId, action: &str) -> Result<Vec<OutboundMessage>, ConsoleError> {
        if action == ACTION_MAIN {
            return self.render_root(from).await;
        }
        if let Some(id) = parse_node_action(action, ACTION_MENU).or_else(|| parse_node_action(action, ACTION_BACK)) {
            if id.is_root() {
                return self.render_root(from).await;
            }
            return self.render_node(from, id).await;
        }
        if let Some(id) = parse_node_action(action, ACTION_TASK_START) {
            return self.start_task(from, id).await;
        }
        if action == ACTION_RECHECK {
            // Admins land here; the gate path handled everyone else
            return self.render_root(from).await;
        }

        tracing::debug!(%from, action, "unknown action ignored");
        Ok(vec![self.not_found_hint(from)])
    }

    async fn handle_media(&self, from: UserId, reference: &str) -> Result<Vec<OutboundMessage>, ConsoleError> {
        let pending = {
            let awaiting = self.awaiting_proof.read().unwrap();
            awaiting.get(&from).copied()
        };

        let Some(node) = pending else {
            return Ok(vec![OutboundMessage::text(
                from,
                "Start a task first, then send your proof.",
            )]);
        };

        self.console.submit_proof(from, node, reference).await?;
        self.awaiting_proof.write().unwrap().remove(&from);

        Ok(vec![OutboundMessage::text(
            from,
            "Proof received. You will be credited once an admin approves it.",
        )])
    }

    // === Task flow ===

    async fn start_task(&self, from: UserId, node: NodeId) -> Result<Vec<OutboundMessage>, ConsoleError> {
        match self.console.start_task(from, node).await {
            Ok(_) => {
                self.awaiting_proof.write().unwrap().insert(from, node);
                Ok(vec![OutboundMessage::text(
                    from,
                    "Task started. Send a screenshot or file as proof when you are done.",
                )])
            }
            Err(ConsoleError::Ledger(LedgerError::AlreadyCompleted { .. })) => Ok(vec![
                OutboundMessage::text(from, "You have already taken this task."),
            ]),
            Err(ConsoleError::Ledger(LedgerError::NotATask(_))) => Ok(vec![
                OutboundMessage::text(from, "This item is not a task."),
            ]),
            Err(other) => Err(other),
        }
    }

    // === Referrals ===

    async fn register_referral(&self, from: UserId, payload: &str) -> Result<(), ConsoleError> {
        let Some(id) = payload.trim().strip_prefix("ref_") else {
            return Ok(());
        };
        let Ok(referrer) = id.parse::<i64>() else {
            tracing::debug!(%from, payload, "malformed referral payload ignored");
            return Ok(());
        };

        let registered = self
            .console
            .ledger()
            .register_referral(UserId(referrer), from)
            .await?;
        if registered {
            tracing::debug!(%from, referrer, "referral link created");
        }
        Ok(())
    }

    // === Wizard ===

    async fn wizard_turn(&self, from: UserId, text: &str) -> Result<Vec<OutboundMessage>, ConsoleError> {
        match self.console.author_input(from, text).await {
            Ok(WizardReply::Prompt(step)) => Ok(vec![OutboundMessage::text(from, step.prompt())]),
            Ok(WizardReply::Committed(id)) => Ok(vec![OutboundMessage::text(
                from,
                format!("Node {id} created."),
            )]),
            Err(ConsoleError::Wizard(taskbot_wizard::WizardError::Validation(err))) => {
                // Recoverable: re-prompt the same step
                let step = self.console.wizard().step_of(from);
                let mut text = err.to_string();
                if let Some(step) = step {
                    text.push('\n');
                    text.push_str(step.prompt());
                }
                Ok(vec![OutboundMessage::text(from, text)])
            }
            Err(other) => Err(other),
        }
    }

    // === Menu rendering ===

    /// The root-level menu: every top-level node as a button.
    ///
    /// An empty tree falls back to pointing the user at the contact handle.
    async fn render_root(&self, to: UserId) -> Result<Vec<OutboundMessage>, ConsoleError> {
        let children = self.console.catalog().children(NodeId::ROOT).await?;
        if children.is_empty() {
            return Ok(vec![OutboundMessage::text(
                to,
                format!("Nothing here yet. Contact {} for help.", self.contact),
            )]);
        }

        Ok(vec![OutboundMessage {
            to,
            text: "Choose a section:".to_string(),
            image: None,
            buttons: children.iter().map(menu_button).collect(),
        }])
    }

    /// One node's view: body, image, children, its own inline buttons,
    /// task entry when priced, back and main-menu navigation.
    async fn render_node(&self, to: UserId, id: NodeId) -> Result<Vec<OutboundMessage>, ConsoleError> {
        let Some(node) = self.console.catalog().get(id).await? else {
            return Ok(vec![self.not_found_hint(to)]);
        };
        let children = self.console.catalog().children(id).await?;

        let mut buttons: Vec<InlineButton> = children.iter().map(menu_button).collect();
        buttons.extend(node.buttons.iter().cloned());
        if node.is_task() {
            buttons.push(InlineButton::Action {
                label: "Start task".to_string(),
                action: format!("{ACTION_TASK_START}{}", node.id),
            });
        }
        if !node.parent_id.is_root() {
            buttons.push(InlineButton::Action {
                label: "Back".to_string(),
                action: format!("{ACTION_BACK}{}", node.parent_id),
            });
        }
        buttons.push(InlineButton::Action {
            label: "Main menu".to_string(),
            action: ACTION_MAIN.to_string(),
        });

        Ok(vec![OutboundMessage {
            to,
            text: node.body.clone(),
            image: node.image.clone(),
            buttons,
        }])
    }

    fn not_found_hint(&self, to: UserId) -> OutboundMessage {
        OutboundMessage::text(
            to,
            format!("That is gone. Contact {} if you think this is wrong.", self.contact),
        )
    }
}

fn menu_button(node: &ContentNode) -> InlineButton {
    InlineButton::Action {
        label: node.name.clone(),
        action: format!("{ACTION_MENU}{}", node.id),
    }
}

fn recheck_button() -> InlineButton {
    InlineButton::Action {
        label: "Check again".to_string(),
        action: ACTION_RECHECK.to_string(),
    }
}

fn parse_node_action(action: &str, prefix: &str) -> Option<NodeId> {
    action.strip_prefix(prefix)?.parse::<i64>().ok().map(NodeId)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messenger::MockMessenger;
    use rust_decimal_macros::dec;
    use sqlx::sqlite::SqlitePoolOptions;
    use taskbot_catalog::{CatalogStore, NewNode};
    use taskbot_core::Amount;
    use taskbot_directory::AdminDirectory;
    use taskbot_gate::MockOracle;
    use taskbot_ledger::{Ledger, LedgerConfig};
    use taskbot_wizard::AuthoringWizard;

    const ROOT_ADMIN: UserId = UserId(1);
    const USER: UserId = UserId(100);

    struct Fixture {
        router: Router,
        console: Arc<AdminConsole>,
        oracle: Arc<MockOracle>,
        messenger: Arc<MockMessenger>,
    }

    async fn fixture() -> Fixture {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        let catalog = Arc::new(CatalogStore::new(pool.clone()).await.unwrap());
        let directory = Arc::new(
            AdminDirectory::new(pool.clone(), vec![ROOT_ADMIN])
                .await
                .unwrap(),
        );
        let ledger = Arc::new(Ledger::new(pool, LedgerConfig::default()).await.unwrap());
        let wizard = Arc::new(AuthoringWizard::new(Arc::clone(&catalog)));
        let messenger = Arc::new(MockMessenger::new());
        let oracle = Arc::new(MockOracle::new());

        let console = Arc::new(AdminConsole::new(
            catalog,
            directory,
            ledger,
            wizard,
            Arc::clone(&messenger) as _,
        ));
        let gate = Arc::new(AccessGate::new(Arc::clone(&oracle) as _));
        let router = Router::new(Arc::clone(&console), gate, "@support");

        Fixture {
            router,
            console,
            oracle,
            messenger,
        }
    }

    async fn seed_section(console: &AdminConsole, name: &str) -> NodeId {
        console
            .create_node(
                ROOT_ADMIN,
                NewNode {
                    name: name.to_string(),
                    parent_id: NodeId::ROOT,
                    body: format!("{name} body"),
                    image: None,
                    price: None,
                    buttons: Vec::new(),
                },
            )
            .await
            .unwrap()
    }

    async fn seed_task(console: &AdminConsole, parent: NodeId, price: &str) -> NodeId {
        console
            .create_node(
                ROOT_ADMIN,
                NewNode {
                    name: "Task".to_string(),
                    parent_id: parent,
                    body: "earn by completing".to_string(),
                    image: None,
                    price: Some(Amount::new(price.parse().unwrap()).unwrap()),
                    buttons: Vec::new(),
                },
            )
            .await
            .unwrap()
    }

    fn text(from: UserId, s: &str) -> InboundEvent {
        InboundEvent::Text {
            from,
            text: s.to_string(),
        }
    }

    fn action(from: UserId, s: &str) -> InboundEvent {
        InboundEvent::Action {
            from,
            action: s.to_string(),
        }
    }

    #[tokio::test]
    async fn test_empty_tree_falls_back_to_contact() {
        let f = fixture().await;
        let replies = f.router.handle(text(USER, "/start")).await.unwrap();
        assert_eq!(replies.len(), 1);
        assert!(replies[0].text.contains("@support"));
        assert!(replies[0].buttons.is_empty());
    }

    #[tokio::test]
    async fn test_menu_navigation_with_back_and_main() {
        let f = fixture().await;
        let section = seed_section(&f.console, "Offers").await;
        let task = seed_task(&f.console, section, "5.00").await;

        let replies = f.router.handle(text(USER, "/start")).await.unwrap();
        assert!(matches!(
            &replies[0].buttons[0],
            InlineButton::Action { label, .. } if label == "Offers"
        ));

        // Top-level node: no back button, main menu present
        let replies = f
            .router
            .handle(action(USER, &format!("menu:{section}")))
            .await
            .unwrap();
        let labels: Vec<&str> = replies[0].buttons.iter().map(|b| b.label()).collect();
        assert!(labels.contains(&"Task"));
        assert!(labels.contains(&"Main menu"));
        assert!(!labels.contains(&"Back"));

        // Nested task node: back to its parent plus a start button
        let replies = f
            .router
            .handle(action(USER, &format!("menu:{task}")))
            .await
            .unwrap();
        let labels: Vec<&str> = replies[0].buttons.iter().map(|b| b.label()).collect();
        assert!(labels.contains(&"Start task"));
        assert!(labels.contains(&"Back"));
        assert!(labels.contains(&"Main menu"));
    }

    #[tokio::test]
    async fn test_task_flow_start_proof_approve() {
        let f = fixture().await;
        let section = seed_section(&f.console, "Offers").await;
        let task = seed_task(&f.console, section, "5.00").await;

        f.router
            .handle(action(USER, &format!("task:start:{task}")))
            .await
            .unwrap();

        // Second start is reported, not an error
        let replies = f
            .router
            .handle(action(USER, &format!("task:start:{task}")))
            .await
            .unwrap();
        assert!(replies[0].text.contains("already"));

        let replies = f
            .router
            .handle(InboundEvent::Media {
                from: USER,
                reference: "proof.png".to_string(),
            })
            .await
            .unwrap();
        assert!(replies[0].text.contains("Proof received"));

        // Admin got notified
        let admin_mail = f.messenger.sent_to(ROOT_ADMIN);
        assert_eq!(admin_mail.len(), 1);
        assert!(admin_mail[0].text.contains("proof.png"));

        f.console.approve(ROOT_ADMIN, USER, task).await.unwrap();
        assert_eq!(
            f.console.ledger().balance_of(USER).await.unwrap().value(),
            dec!(5.00)
        );
    }

    #[tokio::test]
    async fn test_media_without_pending_task_is_hinted() {
        let f = fixture().await;
        let replies = f
            .router
            .handle(InboundEvent::Media {
                from: USER,
                reference: "stray.png".to_string(),
            })
            .await
            .unwrap();
        assert!(replies[0].text.contains("Start a task first"));
    }

    #[tokio::test]
    async fn test_gate_blocks_until_recheck_passes() {
        let f = fixture().await;
        seed_section(&f.console, "Offers").await;
        f.oracle.script(
            USER,
            GateOutcome::NeedsSubscription {
                targets: vec!["@channel".to_string()],
            },
        );

        // First contact: one oracle call, blocked with a recheck button
        let replies = f.router.handle(text(USER, "/start")).await.unwrap();
        assert!(replies[0].text.contains("@channel"));
        assert_eq!(f.oracle.call_count(USER), 1);

        // Plain traffic resumes the cached verdict without an oracle call
        let replies = f.router.handle(text(USER, "hello")).await.unwrap();
        assert!(replies[0].text.contains("@channel"));
        assert_eq!(f.oracle.call_count(USER), 1);

        // Recheck consults the oracle once and lets the user through
        let replies = f.router.handle(action(USER, "gate:recheck")).await.unwrap();
        assert!(replies[0].text.contains("Choose a section"));
        assert_eq!(f.oracle.call_count(USER), 2);
    }

    #[tokio::test]
    async fn test_gate_attribute_turns() {
        let f = fixture().await;
        seed_section(&f.console, "Offers").await;
        f.oracle.script(
            USER,
            GateOutcome::NeedsAttribute {
                field: ProfileField::Age,
            },
        );

        let replies = f.router.handle(text(USER, "/start")).await.unwrap();
        assert!(replies[0].text.contains("age"));

        // Non-numeric input re-prompts
        let replies = f.router.handle(text(USER, "young")).await.unwrap();
        assert!(replies[0].text.contains("age"));

        // Valid input is stored and confirmed with a recheck button
        let replies = f.router.handle(text(USER, "27")).await.unwrap();
        assert!(replies[0].text.contains("Saved"));
        assert_eq!(f.router.gate.profile_of(USER).age, Some(27));

        let replies = f.router.handle(action(USER, "gate:recheck")).await.unwrap();
        assert!(replies[0].text.contains("Choose a section"));
    }

    #[tokio::test]
    async fn test_oracle_outage_fails_open() {
        let f = fixture().await;
        seed_section(&f.console, "Offers").await;
        f.oracle.fail_for(USER, "down for maintenance");

        let replies = f.router.handle(text(USER, "/start")).await.unwrap();
        assert!(replies[0].text.contains("Choose a section"));
    }

    #[tokio::test]
    async fn test_admins_bypass_gate() {
        let f = fixture().await;
        seed_section(&f.console, "Offers").await;
        f.oracle.fail_for(ROOT_ADMIN, "never called anyway");

        let replies = f.router.handle(text(ROOT_ADMIN, "/start")).await.unwrap();
        assert!(replies[0].text.contains("Choose a section"));
        assert_eq!(f.oracle.call_count(ROOT_ADMIN), 0);
    }

    #[tokio::test]
    async fn test_referral_deep_link_credits_signup_bonus() {
        let f = fixture().await;
        seed_section(&f.console, "Offers").await;
        let referrer = UserId(55);

        f.router
            .handle(text(USER, &format!("/start ref_{}", referrer.value())))
            .await
            .unwrap();

        assert_eq!(
            f.console.ledger().referrer_of(USER).await.unwrap(),
            Some(referrer)
        );
        assert_eq!(
            f.console.ledger().balance_of(USER).await.unwrap().value(),
            dec!(1)
        );

        // Malformed payloads are ignored, not fatal
        let replies = f.router.handle(text(UserId(200), "/start ref_abc")).await.unwrap();
        assert!(!replies.is_empty());
    }

    #[tokio::test]
    async fn test_start_command_requires_word_boundary() {
        let f = fixture().await;
        seed_section(&f.console, "Offers").await;

        // A glued-on payload is not a start command and registers nothing
        let replies = f
            .router
            .handle(text(USER, &format!("/startref_{}", UserId(55).value())))
            .await
            .unwrap();
        assert!(!replies.is_empty());
        assert_eq!(f.console.ledger().referrer_of(USER).await.unwrap(), None);

        // The spaced form still does
        f.router
            .handle(text(USER, "/start ref_55"))
            .await
            .unwrap();
        assert_eq!(
            f.console.ledger().referrer_of(USER).await.unwrap(),
            Some(UserId(55))
        );
    }

    #[tokio::test]
    async fn test_admin_wizard_owns_text_stream() {
        let f = fixture().await;
        f.console.begin_authoring(ROOT_ADMIN).await.unwrap();

        let replies = f.router.handle(text(ROOT_ADMIN, "New Section")).await.unwrap();
        assert!(replies[0].text.contains("parent"));

        // A validation slip re-prompts the same step
        let replies = f.router.handle(text(ROOT_ADMIN, "not-a-number")).await.unwrap();
        assert!(replies[0].text.contains("number"));

        for input in ["0", "welcome text", "none", "0"] {
            f.router.handle(text(ROOT_ADMIN, input)).await.unwrap();
        }
        let replies = f.router.handle(text(ROOT_ADMIN, "none")).await.unwrap();
        assert!(replies[0].text.contains("created"));
        assert_eq!(f.console.catalog().list_all().await.unwrap().len(), 1);
    }
}
