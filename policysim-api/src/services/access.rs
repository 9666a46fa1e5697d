//! Access policy: the only gate between the public endpoint and dispatch

use policysim_common::Tier;
use serde_json::Value;
use thiserror::Error;

use crate::error::{ApiError, INSUFFICIENT_TIER, INVALID_TIER};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AccessDenied {
    /// Requested tier missing, not an integer, or outside 1-4
    #[error("{}", INVALID_TIER)]
    InvalidRequest,

    /// Requested tier above the caller's tier
    #[error("{}", INSUFFICIENT_TIER)]
    Forbidden,
}

impl From<AccessDenied> for ApiError {
    fn from(denied: AccessDenied) -> Self {
        match denied {
            AccessDenied::InvalidRequest => ApiError::InvalidRequest(denied.to_string()),
            AccessDenied::Forbidden => ApiError::Forbidden(denied.to_string()),
        }
    }
}

/// Validate the `tier` field of a request body
///
/// Accepts JSON integers and integral floats (`2.0`); rejects strings,
/// fractions and anything outside 1-4.
pub fn requested_tier(value: Option<&Value>) -> Result<Tier, AccessDenied> {
    let number = match value {
        Some(Value::Number(number)) => number,
        _ => return Err(AccessDenied::InvalidRequest),
    };
    let raw = match number.as_i64() {
        Some(n) => n,
        None => match number.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() <= i64::MAX as f64 => f as i64,
            _ => return Err(AccessDenied::InvalidRequest),
        },
    };
    Tier::new(raw).ok_or(AccessDenied::InvalidRequest)
}

/// Allow `requested` only when it does not exceed `actual`
pub fn authorize(actual: Tier, requested: Tier) -> Result<(), AccessDenied> {
    if actual.permits(requested) {
        Ok(())
    } else {
        Err(AccessDenied::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tier(n: i64) -> Tier {
        Tier::new(n).unwrap()
    }

    #[test]
    fn test_requested_tier_accepts_range() {
        for n in 1..=4 {
            assert_eq!(requested_tier(Some(&json!(n))), Ok(tier(n)));
        }
        assert_eq!(requested_tier(Some(&json!(3.0))), Ok(tier(3)));
    }

    #[test]
    fn test_requested_tier_rejects_invalid() {
        for value in [json!(0), json!(5), json!(-1), json!(2.5), json!("2"), json!(null), json!([1])] {
            assert_eq!(
                requested_tier(Some(&value)),
                Err(AccessDenied::InvalidRequest),
                "value {}",
                value
            );
        }
        assert_eq!(requested_tier(None), Err(AccessDenied::InvalidRequest));
    }

    #[test]
    fn test_authorize() {
        assert_eq!(authorize(tier(2), tier(1)), Ok(()));
        assert_eq!(authorize(tier(2), tier(2)), Ok(()));
        assert_eq!(authorize(tier(2), tier(3)), Err(AccessDenied::Forbidden));
        assert_eq!(authorize(tier(1), tier(4)), Err(AccessDenied::Forbidden));
    }

    #[test]
    fn test_denial_messages() {
        match ApiError::from(AccessDenied::Forbidden) {
            ApiError::Forbidden(msg) => assert_eq!(
                msg,
                "Insufficient tier to use this analysis level. Please upgrade your account."
            ),
            other => panic!("unexpected: {:?}", other),
        }
        assert!(matches!(
            ApiError::from(AccessDenied::InvalidRequest),
            ApiError::InvalidRequest(_)
        ));
    }
}
