use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use aurum_core::{CartItemId, DomainError, DomainResult, Entity, ProductId, UserId};

/// One cart row: a (user, product) pair with a quantity.
///
/// Adding a product that is already in the cart increments the existing row's
/// quantity instead of inserting a second row (upsert semantics, enforced by
/// the storage layer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for CartItem {
    type Id = CartItemId;

    fn id(&self) -> &CartItemId {
        &self.id
    }
}

/// Validated add-to-cart request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCartItem {
    pub user_id: UserId,
    pub product_id: ProductId,
    pub quantity: i64,
}

impl NewCartItem {
    pub fn validate(&self) -> DomainResult<()> {
        ensure_quantity(self.quantity)
    }
}

/// Quantities are positive everywhere in the cart, including updates.
pub fn ensure_quantity(quantity: i64) -> DomainResult<()> {
    if quantity <= 0 {
        return Err(DomainError::validation("quantity must be positive"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_positive_quantity() {
        let item = NewCartItem {
            user_id: UserId::new(),
            product_id: ProductId::new(),
            quantity: 0,
        };
        assert!(matches!(item.validate(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn accepts_positive_quantity() {
        let item = NewCartItem {
            user_id: UserId::new(),
            product_id: ProductId::new(),
            quantity: 3,
        };
        assert_eq!(item.validate(), Ok(()));
    }
}
