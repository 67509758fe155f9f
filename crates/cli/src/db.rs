//! Database connection and status

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;

use crate::context::AppContext;
use crate::Cli;

/// Connect, creating the file when missing
pub async fn connect(db_path: &Path) -> Result<SqlitePool> {
    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());
    let options = SqliteConnectOptions::from_str(&db_url)?.create_if_missing(true);

    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .context("Failed to connect to database")
}

/// Create the schema. Every store creates its own tables on construction,
/// so initialization is wiring the full context once.
pub async fn init_database(cli: &Cli, force: bool) -> Result<()> {
    if force && cli.db.exists() {
        std::fs::remove_file(&cli.db).context("Failed to remove existing database")?;
        println!("Removed existing database");
    }

    let ctx = AppContext::build(cli).await?;
    ctx.close().await;
    Ok(())
}

/// Show row counts per table
pub async fn show_status(db_path: &Path) -> Result<()> {
    if !db_path.exists() {
        println!("Database not found at {:?}", db_path);
        println!("Run 'taskbot init' to create it");
        return Ok(());
    }

    let db_url = format!("sqlite:{}", db_path.display());
    let pool = SqlitePool::connect(&db_url).await?;

    println!("Database status");
    println!("  Path: {:?}", db_path);

    for table in ["nodes", "admins", "balances", "tasks", "referrals", "credits"] {
        let count: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&pool)
            .await
            .unwrap_or((0,));
        println!("  {:10} {}", table, count.0);
    }

    pool.close().await;
    Ok(())
}
