//! Hosted row store backend (PostgREST)
//!
//! Talks to `{supabase_url}/rest/v1`. Every request carries the service key
//! both as `apikey` and as bearer credential.

use async_trait::async_trait;
use policysim_common::models::{Exchange, NewExchange};
use policysim_common::Tier;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{HistoryStore, StoreError, StoreResult, UserStore};

const USERS_TABLE: &str = "users";
const HISTORY_TABLE: &str = "chat_history";

/// PostgREST-backed [`UserStore`] and [`HistoryStore`]
#[derive(Clone)]
pub struct RestStore {
    http_client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct TierRow {
    /// NULL in rows written before the column had a default
    #[serde(default)]
    tier: Option<i64>,
}

#[derive(Debug, Serialize)]
struct UserRow<'a> {
    id: &'a str,
    tier: Tier,
}

impl RestStore {
    /// `service_url` is the project root, e.g. `https://xyz.supabase.co`
    pub fn new(http_client: Client, service_url: &str, api_key: &str) -> Self {
        Self {
            http_client,
            base_url: format!("{}/rest/v1", service_url.trim_end_matches('/')),
            api_key: api_key.to_string(),
        }
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        self.http_client
            .request(method, format!("{}/{}", self.base_url, table))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn upsert_user(&self, user_id: &str, tier: Tier, resolution: &str) -> StoreResult<()> {
        let response = self
            .request(Method::POST, USERS_TABLE)
            .query(&[("on_conflict", "id")])
            .header("Prefer", format!("resolution={},return=minimal", resolution))
            .json(&[UserRow { id: user_id, tier }])
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}

/// Turn a non-success response into [`StoreError::Status`]
async fn check_status(response: Response) -> StoreResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(StoreError::Status {
        status: status.as_u16(),
        body,
    })
}

fn eq_filter(value: &str) -> String {
    format!("eq.{}", value)
}

#[async_trait]
impl UserStore for RestStore {
    async fn fetch_tier(&self, user_id: &str) -> StoreResult<Option<i64>> {
        debug!(user_id = %user_id, "Fetching tier from hosted store");

        let response = self
            .request(Method::GET, USERS_TABLE)
            .query(&[("id", eq_filter(user_id).as_str()), ("select", "tier")])
            .send()
            .await?;

        let rows: Vec<TierRow> = check_status(response).await?.json().await?;
        Ok(rows.into_iter().next().map(|row| {
            row.tier.unwrap_or_else(|| {
                warn!(user_id = %user_id, "Stored tier is NULL; using default tier");
                i64::from(Tier::DEFAULT)
            })
        }))
    }

    async fn insert_default(&self, user_id: &str, tier: Tier) -> StoreResult<()> {
        self.upsert_user(user_id, tier, "ignore-duplicates").await
    }

    async fn set_tier(&self, user_id: &str, tier: Tier) -> StoreResult<()> {
        self.upsert_user(user_id, tier, "merge-duplicates").await
    }
}

#[async_trait]
impl HistoryStore for RestStore {
    async fn insert_exchange(&self, exchange: &NewExchange) -> StoreResult<()> {
        let response = self
            .request(Method::POST, HISTORY_TABLE)
            .header("Prefer", "return=minimal")
            .json(&[exchange])
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    async fn list_exchanges(&self, user_id: &str) -> StoreResult<Vec<Exchange>> {
        let response = self
            .request(Method::GET, HISTORY_TABLE)
            .query(&[
                ("user_id", eq_filter(user_id).as_str()),
                ("select", "*"),
                ("order", "created_at.desc"),
            ])
            .send()
            .await?;

        Ok(check_status(response).await?.json().await?)
    }
}
