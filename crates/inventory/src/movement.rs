use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use aurum_core::{DomainError, DomainResult, MovementId, ProductId, ValueObject};

/// Movement categories as persisted in the ledger.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementKind {
    In,
    Out,
    Adjustment,
    Reserved,
    Released,
}

impl MovementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::In => "in",
            MovementKind::Out => "out",
            MovementKind::Adjustment => "adjustment",
            MovementKind::Reserved => "reserved",
            MovementKind::Released => "released",
        }
    }
}

impl FromStr for MovementKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in" => Ok(MovementKind::In),
            "out" => Ok(MovementKind::Out),
            "adjustment" => Ok(MovementKind::Adjustment),
            "reserved" => Ok(MovementKind::Reserved),
            "released" => Ok(MovementKind::Released),
            other => Err(DomainError::validation(format!(
                "unknown movement kind: {other}"
            ))),
        }
    }
}

impl core::fmt::Display for MovementKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single stock-changing event with sign correctness fixed at construction.
///
/// `In` and `Released` add to on-hand stock, `Out` and `Reserved` remove from
/// it, `Adjustment` carries an arbitrary non-zero signed delta. The fields are
/// private so a movement whose sign contradicts its kind cannot exist.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    kind: MovementKind,
    /// Signed effect on on-hand stock.
    delta: i64,
}

impl ValueObject for StockMovement {}

impl StockMovement {
    pub fn inbound(quantity: i64) -> DomainResult<Self> {
        ensure_positive(quantity)?;
        Ok(Self {
            kind: MovementKind::In,
            delta: quantity,
        })
    }

    pub fn outbound(quantity: i64) -> DomainResult<Self> {
        ensure_positive(quantity)?;
        Ok(Self {
            kind: MovementKind::Out,
            delta: -quantity,
        })
    }

    pub fn adjustment(delta: i64) -> DomainResult<Self> {
        if delta == 0 {
            return Err(DomainError::validation("adjustment delta cannot be zero"));
        }
        Ok(Self {
            kind: MovementKind::Adjustment,
            delta,
        })
    }

    pub fn reserved(quantity: i64) -> DomainResult<Self> {
        ensure_positive(quantity)?;
        Ok(Self {
            kind: MovementKind::Reserved,
            delta: -quantity,
        })
    }

    pub fn released(quantity: i64) -> DomainResult<Self> {
        ensure_positive(quantity)?;
        Ok(Self {
            kind: MovementKind::Released,
            delta: quantity,
        })
    }

    pub fn kind(&self) -> MovementKind {
        self.kind
    }

    pub fn signed_delta(&self) -> i64 {
        self.delta
    }
}

fn ensure_positive(quantity: i64) -> DomainResult<()> {
    if quantity <= 0 {
        return Err(DomainError::validation("quantity must be positive"));
    }
    Ok(())
}

/// Persisted ledger row. Rows are append-only: never updated, never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementRecord {
    pub id: MovementId,
    pub product_id: ProductId,
    pub kind: MovementKind,
    /// Signed delta as applied to on-hand stock.
    pub quantity: i64,
    pub reason: Option<String>,
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Ledger sum for one product: the stock level implied by its full history.
///
/// Used by the rebuild repair operation to realign the materialized `stock`
/// projection with the ledger.
pub fn stock_from_ledger<'a>(movements: impl IntoIterator<Item = &'a MovementRecord>) -> i64 {
    movements.into_iter().map(|m| m.quantity).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn inbound_and_released_are_positive_deltas() {
        assert_eq!(StockMovement::inbound(4).unwrap().signed_delta(), 4);
        assert_eq!(StockMovement::released(2).unwrap().signed_delta(), 2);
    }

    #[test]
    fn outbound_and_reserved_are_negative_deltas() {
        assert_eq!(StockMovement::outbound(4).unwrap().signed_delta(), -4);
        assert_eq!(StockMovement::reserved(2).unwrap().signed_delta(), -2);
    }

    #[test]
    fn non_positive_quantities_are_rejected() {
        assert!(StockMovement::inbound(0).is_err());
        assert!(StockMovement::outbound(-3).is_err());
        assert!(StockMovement::reserved(0).is_err());
        assert!(StockMovement::released(-1).is_err());
    }

    #[test]
    fn adjustment_accepts_both_signs_but_not_zero() {
        assert_eq!(StockMovement::adjustment(-7).unwrap().signed_delta(), -7);
        assert_eq!(StockMovement::adjustment(7).unwrap().signed_delta(), 7);
        assert!(StockMovement::adjustment(0).is_err());
    }

    #[test]
    fn kind_round_trips_through_str() {
        for kind in [
            MovementKind::In,
            MovementKind::Out,
            MovementKind::Adjustment,
            MovementKind::Reserved,
            MovementKind::Released,
        ] {
            assert_eq!(kind.as_str().parse::<MovementKind>().unwrap(), kind);
        }
    }

    fn record(quantity: i64) -> MovementRecord {
        MovementRecord {
            id: MovementId::new(),
            product_id: ProductId::new(),
            kind: if quantity >= 0 {
                MovementKind::Adjustment
            } else {
                MovementKind::Out
            },
            quantity,
            reason: None,
            reference: None,
            created_at: Utc::now(),
        }
    }

    proptest! {
        #[test]
        fn ledger_sum_equals_sum_of_signed_deltas(deltas in proptest::collection::vec(-1000i64..1000, 0..50)) {
            let records: Vec<_> = deltas.iter().map(|d| record(*d)).collect();
            let expected: i64 = deltas.iter().sum();
            prop_assert_eq!(stock_from_ledger(&records), expected);
        }
    }
}
