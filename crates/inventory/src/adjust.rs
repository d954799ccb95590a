use serde::{Deserialize, Serialize};

use aurum_core::{DomainError, DomainResult, ProductId};

use crate::movement::StockMovement;

/// Manual stock correction requested by an admin.
///
/// The reason is mandatory: an adjustment without an explanation is not
/// auditable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustInventory {
    pub product_id: ProductId,
    pub delta: i64,
    pub reason: String,
}

impl AdjustInventory {
    pub fn validate(&self) -> DomainResult<()> {
        if self.reason.trim().is_empty() {
            return Err(DomainError::validation("reason cannot be empty"));
        }
        if self.delta == 0 {
            return Err(DomainError::validation("adjustment delta cannot be zero"));
        }
        Ok(())
    }

    /// The ledger movement this adjustment records.
    pub fn movement(&self) -> DomainResult<StockMovement> {
        self.validate()?;
        StockMovement::adjustment(self.delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::movement::MovementKind;

    #[test]
    fn requires_a_reason() {
        let adjust = AdjustInventory {
            product_id: ProductId::new(),
            delta: 5,
            reason: "   ".to_string(),
        };
        assert!(matches!(
            adjust.validate(),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn produces_an_adjustment_movement() {
        let adjust = AdjustInventory {
            product_id: ProductId::new(),
            delta: -3,
            reason: "damaged in storage".to_string(),
        };
        let movement = adjust.movement().unwrap();
        assert_eq!(movement.kind(), MovementKind::Adjustment);
        assert_eq!(movement.signed_delta(), -3);
    }
}
