//! History recording and listing
//!
//! Recording is best-effort: a failed write is logged and never turns an
//! already generated analysis into an error.

use policysim_common::models::{sort_newest_first, Exchange, NewExchange};
use policysim_common::{time, Tier};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::store::{HistoryStore, StoreResult};

#[derive(Clone)]
pub struct HistoryRecorder {
    store: Arc<dyn HistoryStore>,
}

impl HistoryRecorder {
    pub fn new(store: Arc<dyn HistoryStore>) -> Self {
        Self { store }
    }

    /// Append one exchange stamped with the current time
    pub async fn record(
        &self,
        user_id: &str,
        policy_description: &str,
        response: &str,
        tier: Tier,
    ) -> StoreResult<()> {
        let exchange = NewExchange {
            user_id: user_id.to_string(),
            policy_description: policy_description.to_string(),
            response: response.to_string(),
            tier,
            created_at: time::now(),
        };
        self.store.insert_exchange(&exchange).await?;
        debug!(user_id = %user_id, tier = %tier, "Exchange recorded");
        Ok(())
    }

    /// [`record`](Self::record), logging instead of returning failures
    pub async fn record_best_effort(
        &self,
        user_id: &str,
        policy_description: &str,
        response: &str,
        tier: Tier,
    ) {
        if let Err(e) = self.record(user_id, policy_description, response, tier).await {
            warn!(user_id = %user_id, tier = %tier, error = %e, "Failed to record exchange");
        }
    }

    /// All exchanges of `user_id`, newest first
    pub async fn list(&self, user_id: &str) -> StoreResult<Vec<Exchange>> {
        let mut exchanges = self.store.list_exchanges(user_id).await?;
        sort_newest_first(&mut exchanges);
        Ok(exchanges)
    }
}
