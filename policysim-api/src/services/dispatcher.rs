//! Prompt dispatch
//!
//! Selects the template and model for a tier, composes the prompt and
//! submits it to the text generator. One attempt per call; failures are
//! terminal.

use policysim_common::tier::{profile_for, DISPATCH_TEMPERATURE};
use policysim_common::Tier;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

use super::generation::{ChatMessage, CompletionRequest, GenerationError, TextGenerator};
use crate::error::{ApiError, INVALID_USER_TIER};

#[derive(Debug, Error)]
pub enum DispatchError {
    /// Tier table has no entry for the tier
    #[error("No prompt profile for tier {0}")]
    UnknownTier(Tier),

    #[error(transparent)]
    Generation(#[from] GenerationError),
}

impl From<DispatchError> for ApiError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::UnknownTier(_) => ApiError::InvalidRequest(INVALID_USER_TIER.to_string()),
            DispatchError::Generation(_) => ApiError::Dispatch,
        }
    }
}

/// Composes prompts and forwards them to a [`TextGenerator`]
#[derive(Clone)]
pub struct PromptDispatcher {
    generator: Arc<dyn TextGenerator>,
}

impl PromptDispatcher {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Completion request for `tier`: single user message, fixed temperature
    pub fn build_request(tier: Tier, policy_description: &str) -> Result<CompletionRequest, DispatchError> {
        let profile = profile_for(tier).ok_or(DispatchError::UnknownTier(tier))?;
        Ok(CompletionRequest {
            model: profile.model.to_string(),
            messages: vec![ChatMessage::user(profile.compose_prompt(policy_description))],
            temperature: DISPATCH_TEMPERATURE,
        })
    }

    /// Generate the analysis text for `policy_description` at `tier`
    pub async fn dispatch(&self, tier: Tier, policy_description: &str) -> Result<String, DispatchError> {
        let request = Self::build_request(tier, policy_description)?;

        match self.generator.complete(&request).await {
            Ok(text) => {
                info!(tier = %tier, model = %request.model, "Policy analysis generated");
                Ok(text)
            }
            Err(e) => {
                error!(tier = %tier, model = %request.model, error = %e, "Text generation failed");
                Err(e.into())
            }
        }
    }
}
