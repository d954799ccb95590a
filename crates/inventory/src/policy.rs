use core::str::FromStr;

use serde::{Deserialize, Serialize};

use aurum_core::{DomainError, DomainResult};

use crate::movement::StockMovement;

/// What to do when a movement would drive on-hand stock below zero.
///
/// `Reject` is the default. `AllowNegative` reproduces the legacy storefront
/// behavior, where oversell silently produced negative stock; it exists so
/// the old behavior stays reachable and testable, not because it is a good
/// idea.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OversellPolicy {
    #[default]
    Reject,
    AllowNegative,
}

impl OversellPolicy {
    /// Check a movement against the currently available stock.
    pub fn check(&self, available: i64, movement: &StockMovement) -> DomainResult<()> {
        let delta = movement.signed_delta();
        if delta < 0 && available + delta < 0 && *self == OversellPolicy::Reject {
            return Err(DomainError::insufficient_stock(-delta, available));
        }
        Ok(())
    }
}

impl FromStr for OversellPolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reject" => Ok(OversellPolicy::Reject),
            "allow_negative" => Ok(OversellPolicy::AllowNegative),
            other => Err(DomainError::validation(format!(
                "unknown oversell policy: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reject_refuses_overdraw() {
        let movement = StockMovement::outbound(5).unwrap();
        let err = OversellPolicy::Reject.check(2, &movement).unwrap_err();
        assert_eq!(
            err,
            DomainError::InsufficientStock {
                requested: 5,
                available: 2
            }
        );
    }

    #[test]
    fn reject_allows_exact_drain_to_zero() {
        let movement = StockMovement::outbound(2).unwrap();
        assert!(OversellPolicy::Reject.check(2, &movement).is_ok());
    }

    #[test]
    fn allow_negative_lets_overdraw_through() {
        let movement = StockMovement::outbound(5).unwrap();
        assert!(OversellPolicy::AllowNegative.check(2, &movement).is_ok());
    }

    #[test]
    fn positive_movements_are_never_blocked() {
        let movement = StockMovement::inbound(50).unwrap();
        assert!(OversellPolicy::Reject.check(-10, &movement).is_ok());
    }
}
