//! Taskbot CLI - operator console from the command line
//!
//! Usage:
//! ```bash
//! taskbot init
//! taskbot --admin 1 node create --name "Offers" --parent 0 --body "Pick a task"
//! taskbot --admin 1 node author
//! taskbot balance 100
//! taskbot --admin 1 approve 100 3
//! taskbot --admin 1 broadcast "New tasks are up"
//! taskbot simulate --user 100
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use std::path::PathBuf;
use taskbot_core::PermissionLevel;

mod commands;
mod context;
mod db;

use commands::{admin, ledger, node, simulate};

/// Taskbot - content tree, task ledger, and admin console
#[derive(Parser)]
#[command(name = "taskbot")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Database file path
    #[arg(long, default_value = "data/taskbot.db", global = true)]
    pub db: PathBuf,

    /// Configuration file (JSON); defaults apply when absent
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Acting admin user id for permission-checked commands
    #[arg(long, global = true)]
    pub admin: Option<i64>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init {
        /// Drop existing data first
        #[arg(long)]
        force: bool,
    },

    /// Show database status
    Status,

    /// Content tree management
    Node {
        #[command(subcommand)]
        action: NodeAction,
    },

    /// Show a user's balance and audit trail
    Balance {
        /// User id
        user_id: i64,
    },

    /// Apply a signed balance adjustment
    Credit {
        /// User id
        user_id: i64,
        /// Signed amount (negative debits)
        amount: Decimal,
    },

    /// Approve a user's task and release its credit
    Approve {
        /// User id
        user_id: i64,
        /// Task node id
        node_id: i64,
    },

    /// Admin registry management
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },

    /// Broadcast a text to every known user
    Broadcast {
        /// Message text
        text: String,
    },

    /// Drive the inbound router interactively from stdin
    Simulate {
        /// User id the events come from
        #[arg(long)]
        user: i64,
    },
}

#[derive(Subcommand)]
pub enum NodeAction {
    /// Create a node in one shot
    Create {
        #[arg(long)]
        name: String,
        /// Parent node id (0 for the root level)
        #[arg(long, default_value_t = 0)]
        parent: i64,
        #[arg(long)]
        body: String,
        /// Image reference
        #[arg(long)]
        image: Option<String>,
        /// Task price; omit for a plain content node
        #[arg(long)]
        price: Option<Decimal>,
        /// Inline buttons as a JSON array
        #[arg(long)]
        buttons: Option<String>,
    },
    /// Walk the authoring wizard over stdin
    Author,
    /// List all nodes
    List,
    /// Show one node
    Show {
        /// Node id
        node_id: i64,
    },
    /// Delete a node (children are kept)
    Delete {
        /// Node id
        node_id: i64,
    },
}

#[derive(Subcommand)]
pub enum AdminAction {
    /// Register a new admin
    Add {
        /// User id
        user_id: i64,
        /// Permission level
        #[arg(long, default_value = "limited")]
        level: LevelArg,
    },
    /// Remove an admin
    Remove {
        /// User id
        user_id: i64,
    },
    /// Change an admin's level
    SetLevel {
        /// User id
        user_id: i64,
        #[arg(long)]
        level: LevelArg,
    },
    /// List all admins
    List,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LevelArg {
    Limited,
    Full,
}

impl LevelArg {
    pub fn to_level(self) -> PermissionLevel {
        match self {
            LevelArg::Limited => PermissionLevel::Limited,
            LevelArg::Full => PermissionLevel::Full,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Some(parent) = cli.db.parent() {
        std::fs::create_dir_all(parent).ok();
    }

    match &cli.command {
        Commands::Init { force } => {
            db::init_database(&cli, *force).await?;
            println!("Database initialized at {:?}", cli.db);
        }

        Commands::Status => {
            db::show_status(&cli.db).await?;
        }

        Commands::Node { action } => {
            node::handle(&cli, action).await?;
        }

        Commands::Balance { user_id } => {
            ledger::show_balance(&cli, *user_id).await?;
        }

        Commands::Credit { user_id, amount } => {
            ledger::credit(&cli, *user_id, *amount).await?;
        }

        Commands::Approve { user_id, node_id } => {
            ledger::approve(&cli, *user_id, *node_id).await?;
        }

        Commands::Admin { action } => {
            admin::handle(&cli, action).await?;
        }

        Commands::Broadcast { text } => {
            admin::broadcast(&cli, text).await?;
        }

        Commands::Simulate { user } => {
            simulate::run(&cli, *user).await?;
        }
    }

    Ok(())
}
