//! Persistence for users and exchanges
//!
//! Two backends implement the same traits: the hosted row store reached
//! over PostgREST ([`RestStore`]) and a local SQLite file
//! ([`SqliteStore`]).

use async_trait::async_trait;
use policysim_common::models::{Exchange, NewExchange};
use policysim_common::Tier;
use thiserror::Error;

pub mod rest;
pub mod sqlite;

pub use rest::RestStore;
pub use sqlite::SqliteStore;

/// Store failure
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Transport or decode failure talking to the hosted store
    #[error("Store request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Hosted store answered with a non-success status
    #[error("Store returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Row content that cannot be represented (bad tier, bad timestamp)
    #[error("Corrupt row: {0}")]
    Corrupt(String),

    /// I/O error preparing the database location
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// `users` table: one row per user holding the subscription tier
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Raw stored tier, `None` when the user has no row
    async fn fetch_tier(&self, user_id: &str) -> StoreResult<Option<i64>>;

    /// Create the row with `tier`; an existing row is left untouched
    async fn insert_default(&self, user_id: &str, tier: Tier) -> StoreResult<()>;

    /// Create or overwrite the user's tier
    async fn set_tier(&self, user_id: &str, tier: Tier) -> StoreResult<()>;
}

/// `chat_history` table: append-only exchanges
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn insert_exchange(&self, exchange: &NewExchange) -> StoreResult<()>;

    /// All exchanges of a user; callers must not rely on the order
    async fn list_exchanges(&self, user_id: &str) -> StoreResult<Vec<Exchange>>;
}
