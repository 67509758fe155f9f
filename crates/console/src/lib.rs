//! Taskbot Admin Console
//!
//! Orchestrates the catalog, admin directory, ledger, wizard, and access
//! gate behind permission checks, and routes inbound channel events to the
//! right service. The messaging channel itself stays behind the `Messenger`
//! trait.

mod broadcast;
mod config;
mod console;
mod error;
mod messenger;
mod router;

pub use broadcast::BroadcastReport;
pub use config::BotConfig;
pub use console::AdminConsole;
pub use error::ConsoleError;
pub use messenger::{Messenger, MessengerError, MockMessenger, OutboundMessage};
pub use router::{InboundEvent, Router};
