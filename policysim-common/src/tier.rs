//! Subscription tiers and the static prompt/model table
//!
//! A tier (1-4) gates which analysis depth a user may request. Every tier
//! maps to exactly one prompt template and one model identifier; the table
//! is fixed at build time.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Substitution point for the policy description in every template
pub const POLICY_PLACEHOLDER: &str = "{policy}";

/// Model used for tiers 1 and 2
pub const LOW_COST_MODEL: &str = "gpt-3.5-turbo";

/// Model used for tiers 3 and 4
pub const HIGH_COST_MODEL: &str = "gpt-4";

/// Sampling temperature sent with every completion request
pub const DISPATCH_TEMPERATURE: f32 = 0.7;

/// Subscription tier, always within `Tier::MIN..=Tier::MAX`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Tier(u8);

impl Tier {
    pub const MIN: Tier = Tier(1);
    pub const MAX: Tier = Tier(4);

    /// Tier assigned to a user on first observed login
    pub const DEFAULT: Tier = Tier(1);

    /// Build a tier from an untrusted integer, `None` when out of range
    pub fn new(value: i64) -> Option<Self> {
        if (Self::MIN.0 as i64..=Self::MAX.0 as i64).contains(&value) {
            Some(Tier(value as u8))
        } else {
            None
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// All tiers in ascending order
    pub fn all() -> impl Iterator<Item = Tier> {
        (Self::MIN.0..=Self::MAX.0).map(Tier)
    }

    /// Whether a holder of `self` may request analysis at `requested`
    pub fn permits(self, requested: Tier) -> bool {
        requested <= self
    }
}

impl TryFrom<i64> for Tier {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        Tier::new(value).ok_or_else(|| {
            Error::InvalidInput(format!(
                "tier {} outside {}..={}",
                value,
                Tier::MIN,
                Tier::MAX
            ))
        })
    }
}

impl From<Tier> for i64 {
    fn from(tier: Tier) -> Self {
        tier.0 as i64
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Prompt template and model bound to a tier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierProfile {
    pub tier: Tier,
    pub template: &'static str,
    pub model: &'static str,
}

impl TierProfile {
    /// Substitute the policy description verbatim into the template
    pub fn compose_prompt(&self, policy_description: &str) -> String {
        self.template.replacen(POLICY_PLACEHOLDER, policy_description, 1)
    }
}

/// Static tier table, one entry per tier
pub static TIER_PROFILES: [TierProfile; 4] = [
    TierProfile {
        tier: Tier(1),
        template: "Analyze the impact of this policy: {policy}. Provide a basic analysis focusing on immediate effects.",
        model: LOW_COST_MODEL,
    },
    TierProfile {
        tier: Tier(2),
        template: "Analyze the impact of this policy: {policy}. Provide a graduate-level analysis including short-term and medium-term effects, and potential challenges.",
        model: LOW_COST_MODEL,
    },
    TierProfile {
        tier: Tier(3),
        template: "Analyze the impact of this policy: {policy}. Provide a master's level analysis including comprehensive short-term, medium-term, and long-term effects, potential challenges, and implementation strategies.",
        model: HIGH_COST_MODEL,
    },
    TierProfile {
        tier: Tier(4),
        template: "Analyze the impact of this policy: {policy}. Provide a professional/PhD-level analysis including comprehensive short-term, medium-term, and long-term effects, potential challenges, implementation strategies, and policy recommendations. Include relevant data and case studies if possible. ",
        model: HIGH_COST_MODEL,
    },
];

/// Look up the profile for `tier`
///
/// Returns `None` if the table has no entry, which only happens if the
/// table and the `Tier` range drift apart.
pub fn profile_for(tier: Tier) -> Option<&'static TierProfile> {
    TIER_PROFILES.iter().find(|profile| profile.tier == tier)
}
