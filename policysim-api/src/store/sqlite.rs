//! SQLite store backend
//!
//! Local persistence for development and self-hosting. Creates the `users`
//! and `chat_history` tables on open.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use policysim_common::models::{Exchange, NewExchange};
use policysim_common::Tier;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::Path;
use tracing::{debug, info};

use super::{HistoryStore, StoreError, StoreResult, UserStore};

/// SQLite-backed [`UserStore`] and [`HistoryStore`]
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the database file and its tables
    pub async fn open(db_path: &Path) -> StoreResult<Self> {
        let newly_created = !db_path.exists();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // mode=rwc: read, write, create
        let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
        debug!("Connecting to database: {}", db_url);

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect(&db_url)
            .await?;

        if newly_created {
            info!("Initialized new database: {}", db_path.display());
        } else {
            info!("Opened existing database: {}", db_path.display());
        }

        sqlx::query("PRAGMA journal_mode = WAL")
            .execute(&pool)
            .await?;
        sqlx::query("PRAGMA busy_timeout = 5000")
            .execute(&pool)
            .await?;

        Self::from_pool(pool).await
    }

    /// Wrap an existing pool, creating tables if needed
    pub async fn from_pool(pool: SqlitePool) -> StoreResult<Self> {
        init_tables(&pool).await?;
        Ok(Self { pool })
    }
}

/// Create `users` and `chat_history` (idempotent)
async fn init_tables(pool: &SqlitePool) -> StoreResult<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            tier INTEGER NOT NULL DEFAULT 1 CHECK (tier BETWEEN 1 AND 4)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chat_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL,
            policy_description TEXT NOT NULL,
            response TEXT NOT NULL,
            tier INTEGER NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_chat_history_user_created
         ON chat_history (user_id, created_at)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

// Fixed-width RFC 3339 so that TEXT ordering matches time ordering.
fn encode_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_timestamp(raw: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("created_at '{}': {}", raw, e)))
}

#[async_trait]
impl UserStore for SqliteStore {
    async fn fetch_tier(&self, user_id: &str) -> StoreResult<Option<i64>> {
        let tier = sqlx::query_scalar::<_, i64>("SELECT tier FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(tier)
    }

    async fn insert_default(&self, user_id: &str, tier: Tier) -> StoreResult<()> {
        sqlx::query("INSERT OR IGNORE INTO users (id, tier) VALUES (?, ?)")
            .bind(user_id)
            .bind(i64::from(tier))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_tier(&self, user_id: &str, tier: Tier) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO users (id, tier) VALUES (?, ?)
             ON CONFLICT(id) DO UPDATE SET tier = excluded.tier",
        )
        .bind(user_id)
        .bind(i64::from(tier))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl HistoryStore for SqliteStore {
    async fn insert_exchange(&self, exchange: &NewExchange) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO chat_history (user_id, policy_description, response, tier, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&exchange.user_id)
        .bind(&exchange.policy_description)
        .bind(&exchange.response)
        .bind(i64::from(exchange.tier))
        .bind(encode_timestamp(&exchange.created_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_exchanges(&self, user_id: &str) -> StoreResult<Vec<Exchange>> {
        let rows = sqlx::query_as::<_, (i64, String, String, String, i64, String)>(
            "SELECT id, user_id, policy_description, response, tier, created_at
             FROM chat_history
             WHERE user_id = ?
             ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(id, user_id, policy_description, response, tier, created_at)| {
                let tier = Tier::new(tier)
                    .ok_or_else(|| StoreError::Corrupt(format!("exchange {} tier {}", id, tier)))?;
                Ok(Exchange {
                    id,
                    user_id,
                    policy_description,
                    response,
                    tier,
                    created_at: decode_timestamp(&created_at)?,
                })
            })
            .collect()
    }
}
