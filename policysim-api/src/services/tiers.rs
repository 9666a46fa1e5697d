//! Tier resolution and tier changes
//!
//! The stored tier is authoritative. A user without a row is created with
//! the default tier on first resolution.

use policysim_common::Tier;
use std::sync::Arc;
use tracing::{error, info};

use crate::error::{ApiError, TIER_LOOKUP_FAILED, TIER_UPDATE_FAILED};
use crate::store::UserStore;

#[derive(Clone)]
pub struct TierResolver {
    users: Arc<dyn UserStore>,
}

impl TierResolver {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    /// Current tier of `user_id`, creating the default row if missing
    ///
    /// # Errors
    /// `ApiError::Lookup` when the store fails or holds a tier outside 1-4.
    pub async fn resolve(&self, user_id: &str) -> Result<Tier, ApiError> {
        let stored = self.users.fetch_tier(user_id).await.map_err(|e| {
            error!(user_id = %user_id, error = %e, "Tier lookup failed");
            ApiError::Lookup(TIER_LOOKUP_FAILED.to_string())
        })?;

        match stored {
            Some(raw) => Tier::new(raw).ok_or_else(|| {
                error!(user_id = %user_id, stored_tier = raw, "Stored tier out of range");
                ApiError::Lookup(TIER_LOOKUP_FAILED.to_string())
            }),
            None => {
                self.users
                    .insert_default(user_id, Tier::DEFAULT)
                    .await
                    .map_err(|e| {
                        error!(user_id = %user_id, error = %e, "Creating default user record failed");
                        ApiError::Lookup(TIER_LOOKUP_FAILED.to_string())
                    })?;
                info!(user_id = %user_id, tier = %Tier::DEFAULT, "Created user record with default tier");
                Ok(Tier::DEFAULT)
            }
        }
    }

    /// Explicit tier change requested by the user
    pub async fn change(&self, user_id: &str, tier: Tier) -> Result<(), ApiError> {
        self.users.set_tier(user_id, tier).await.map_err(|e| {
            error!(user_id = %user_id, tier = %tier, error = %e, "Tier update failed");
            ApiError::Lookup(TIER_UPDATE_FAILED.to_string())
        })?;
        info!(user_id = %user_id, tier = %tier, "User tier changed");
        Ok(())
    }
}
