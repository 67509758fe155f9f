//! Application wiring

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::SqlitePool;
use std::sync::Arc;
use taskbot_catalog::CatalogStore;
use taskbot_console::{AdminConsole, BotConfig, Messenger, MessengerError, OutboundMessage, Router};
use taskbot_core::UserId;
use taskbot_directory::AdminDirectory;
use taskbot_gate::{AccessGate, MockOracle};
use taskbot_ledger::Ledger;
use taskbot_wizard::AuthoringWizard;

use crate::{db, Cli};

/// Messenger printing deliveries to stdout.
///
/// The CLI has no chat platform behind it; operator commands that fan out
/// (broadcast, proof notifications) show their traffic here instead.
pub struct StdoutMessenger;

#[async_trait]
impl Messenger for StdoutMessenger {
    async fn send(&self, message: OutboundMessage) -> Result<(), MessengerError> {
        println!("-> {}: {}", message.to, message.text);
        for button in &message.buttons {
            println!("   [{}]", button.label());
        }
        Ok(())
    }
}

/// Everything a command needs, wired once per invocation
pub struct AppContext {
    pub pool: SqlitePool,
    pub console: Arc<AdminConsole>,
    pub router: Router,
}

impl AppContext {
    pub async fn build(cli: &Cli) -> Result<Self> {
        let config = match &cli.config {
            Some(path) => BotConfig::from_file(path)
                .with_context(|| format!("Failed to load config from {path:?}"))?,
            None => BotConfig::default(),
        };

        let pool = db::connect(&cli.db).await?;

        let catalog = Arc::new(CatalogStore::new(pool.clone()).await?);
        let directory =
            Arc::new(AdminDirectory::new(pool.clone(), config.root_admin_ids()).await?);
        let ledger = Arc::new(Ledger::new(pool.clone(), config.ledger_config()).await?);
        let wizard = Arc::new(AuthoringWizard::new(Arc::clone(&catalog)));

        let console = Arc::new(AdminConsole::new(
            catalog,
            directory,
            ledger,
            wizard,
            Arc::new(StdoutMessenger),
        ));

        // The CLI simulator has no real gating service behind it
        let gate = Arc::new(AccessGate::new(Arc::new(MockOracle::new())));
        let router = Router::new(Arc::clone(&console), gate, config.contact.clone());

        Ok(Self {
            pool,
            console,
            router,
        })
    }

    /// Acting admin id, required by permission-checked commands
    pub fn acting(&self, cli: &Cli) -> Result<UserId> {
        cli.admin
            .map(UserId)
            .context("This command needs --admin <id>")
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}
