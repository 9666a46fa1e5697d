//! Domain models shared between the HTTP layer and the store backends

use crate::Tier;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity resolved from a verified bearer credential
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    /// Identity-service-issued user id (opaque)
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Session issued by the identity service on sign-in
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub token_type: Option<String>,
    pub user: UserIdentity,
}

/// Result of a sign-up request
///
/// `session` is `None` while the identity service waits for email
/// confirmation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignUpOutcome {
    pub user: UserIdentity,
    pub session: Option<Session>,
}

/// One persisted analysis exchange (a `chat_history` row)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exchange {
    pub id: i64,
    pub user_id: String,
    pub policy_description: String,
    pub response: String,
    pub tier: Tier,
    pub created_at: DateTime<Utc>,
}

/// Exchange as handed to a store; the store assigns `id`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewExchange {
    pub user_id: String,
    pub policy_description: String,
    pub response: String,
    pub tier: Tier,
    pub created_at: DateTime<Utc>,
}

/// Order exchanges newest first, ties broken by descending id
pub fn sort_newest_first(exchanges: &mut [Exchange]) {
    exchanges.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}
