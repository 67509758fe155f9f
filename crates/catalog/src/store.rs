//! SQLite-backed content tree store

use crate::error::CatalogError;
use crate::node::{ContentNode, NewNode};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use taskbot_core::{parse_buttons, Amount, NodeId};

/// Content tree store
///
/// All operations are read-after-write consistent within one call; the pool
/// serializes writers at the SQLite level.
pub struct CatalogStore {
    pool: SqlitePool,
}

impl CatalogStore {
    /// Create a store on an existing pool and initialize the schema
    pub async fn new(pool: SqlitePool) -> Result<Self, CatalogError> {
        let store = Self { pool };
        store.init().await?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub async fn in_memory() -> Result<Self, CatalogError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Self::new(pool).await
    }

    /// Initialize the schema
    async fn init(&self) -> Result<(), CatalogError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS nodes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                parent_id INTEGER NOT NULL DEFAULT 0,
                body TEXT NOT NULL,
                image TEXT,
                price TEXT,
                buttons TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_nodes_parent ON nodes(parent_id)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Create a node and return its id.
    ///
    /// The parent must exist or be the virtual root.
    pub async fn create(&self, node: NewNode) -> Result<NodeId, CatalogError> {
        if !node.parent_id.is_root() && self.get(node.parent_id).await?.is_none() {
            return Err(CatalogError::ParentNotFound(node.parent_id));
        }

        let buttons_json = serde_json::to_string(&node.buttons)
            .map_err(taskbot_core::ButtonError::Malformed)?;

        let result = sqlx::query(
            r#"
            INSERT INTO nodes (name, parent_id, body, image, price, buttons, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&node.name)
        .bind(node.parent_id.value())
        .bind(&node.body)
        .bind(&node.image)
        .bind(node.price.map(|p| p.value().to_string()))
        .bind(&buttons_json)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        let id = NodeId(result.last_insert_rowid());
        tracing::debug!(node = %id, name = %node.name, "created content node");
        Ok(id)
    }

    /// Get a node by id. The virtual root is never stored.
    pub async fn get(&self, id: NodeId) -> Result<Option<ContentNode>, CatalogError> {
        let row = sqlx::query("SELECT * FROM nodes WHERE id = ?")
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await?;

        row.map(row_to_node).transpose()
    }

    /// Children of a parent, ordered by id.
    ///
    /// Answers for absent parents too: children of a deleted node keep
    /// referencing the dangling id and are still returned here.
    pub async fn children(&self, parent: NodeId) -> Result<Vec<ContentNode>, CatalogError> {
        let rows = sqlx::query("SELECT * FROM nodes WHERE parent_id = ? ORDER BY id")
            .bind(parent.value())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(row_to_node).collect()
    }

    /// All nodes, ordered by id
    pub async fn list_all(&self) -> Result<Vec<ContentNode>, CatalogError> {
        let rows = sqlx::query("SELECT * FROM nodes ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(row_to_node).collect()
    }

    /// Delete a node. Returns false when the node did not exist.
    ///
    /// Non-cascading: exactly one row is touched, children keep their
    /// parent_id.
    pub async fn delete(&self, id: NodeId) -> Result<bool, CatalogError> {
        let result = sqlx::query("DELETE FROM nodes WHERE id = ?")
            .bind(id.value())
            .execute(&self.pool)
            .await?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            tracing::debug!(node = %id, "deleted content node");
        }
        Ok(deleted)
    }
}

fn row_to_node(row: SqliteRow) -> Result<ContentNode, CatalogError> {
    let price: Option<String> = row.get("price");
    let price = price
        .map(|s| {
            Decimal::from_str(&s)
                .map_err(|_| CatalogError::InvalidPrice(s.clone()))
                .map(Amount::new_unchecked)
        })
        .transpose()?;

    let buttons_json: String = row.get("buttons");
    let buttons = parse_buttons(&buttons_json)?;

    let created_at: String = row.get("created_at");
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());

    Ok(ContentNode {
        id: NodeId(row.get::<i64, _>("id")),
        name: row.get("name"),
        parent_id: NodeId(row.get::<i64, _>("parent_id")),
        body: row.get("body"),
        image: row.get("image"),
        price,
        buttons,
        created_at,
    })
}
