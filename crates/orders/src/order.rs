use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use aurum_core::{DomainError, DomainResult, Entity, OrderId, OrderItemId, ProductId, UserId, ValueObject};

use crate::status::{OrderStatus, PaymentStatus};

/// Shipping destination snapshot.
///
/// Captured verbatim at order creation and immutable afterwards; later edits
/// to the customer profile must not rewrite historical orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
}

impl ValueObject for ShippingAddress {}

impl ShippingAddress {
    pub fn validate(&self) -> DomainResult<()> {
        for (field, value) in [
            ("name", &self.name),
            ("address", &self.address),
            ("city", &self.city),
            ("zip_code", &self.zip_code),
            ("country", &self.country),
        ] {
            if value.trim().is_empty() {
                return Err(DomainError::validation(format!(
                    "shipping address {field} cannot be empty"
                )));
            }
        }
        Ok(())
    }
}

/// Order header.
///
/// Monetary fields are fixed at creation; status is the only field that
/// changes afterwards, and only along the legal transitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: Option<String>,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub shipping_cost: Decimal,
    pub discount: Decimal,
    pub total_amount: Decimal,
    pub shipping_address: ShippingAddress,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Order {
    type Id = OrderId;

    fn id(&self) -> &OrderId {
        &self.id
    }
}

/// Order line item. `price` is the unit price at time of purchase and is
/// never re-read from the live product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub price: Decimal,
    pub created_at: DateTime<Utc>,
}

impl Entity for OrderItem {
    type Id = OrderItemId;

    fn id(&self) -> &OrderItemId {
        &self.id
    }
}

/// One requested line of a new order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub quantity: i64,
    pub price: Decimal,
}

/// Validated checkout request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub user_id: UserId,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub shipping_cost: Decimal,
    pub discount: Decimal,
    pub total_amount: Decimal,
    pub shipping_address: ShippingAddress,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
    pub items: Vec<NewOrderItem>,
}

impl NewOrder {
    /// Validate the request, including the caller-supplied totals.
    ///
    /// The subtotal must equal the sum of `price * quantity` over the items
    /// and the grand total must equal `subtotal + tax + shipping - discount`;
    /// callers do not get to invent their own arithmetic.
    pub fn validate(&self) -> DomainResult<()> {
        if self.items.is_empty() {
            return Err(DomainError::validation("order must contain items"));
        }
        for item in &self.items {
            if item.quantity <= 0 {
                return Err(DomainError::validation("item quantity must be positive"));
            }
            if item.price < Decimal::ZERO {
                return Err(DomainError::validation("item price cannot be negative"));
            }
        }
        for (field, value) in [
            ("tax", self.tax),
            ("shipping_cost", self.shipping_cost),
            ("discount", self.discount),
        ] {
            if value < Decimal::ZERO {
                return Err(DomainError::validation(format!(
                    "{field} cannot be negative"
                )));
            }
        }
        self.shipping_address.validate()?;

        let computed_subtotal: Decimal = self
            .items
            .iter()
            .map(|item| item.price * Decimal::from(item.quantity))
            .sum();
        if computed_subtotal != self.subtotal {
            return Err(DomainError::validation(format!(
                "subtotal {} does not match item total {computed_subtotal}",
                self.subtotal
            )));
        }

        let computed_total = self.subtotal + self.tax + self.shipping_cost - self.discount;
        if computed_total != self.total_amount {
            return Err(DomainError::validation(format!(
                "total_amount {} does not match computed total {computed_total}",
                self.total_amount
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> ShippingAddress {
        ShippingAddress {
            name: "Ada Lovelace".to_string(),
            address: "12 Gem Street".to_string(),
            city: "London".to_string(),
            state: "".to_string(),
            zip_code: "N1 9GU".to_string(),
            country: "GB".to_string(),
        }
    }

    fn order(items: Vec<NewOrderItem>) -> NewOrder {
        let subtotal: Decimal = items
            .iter()
            .map(|i| i.price * Decimal::from(i.quantity))
            .sum();
        NewOrder {
            user_id: UserId::new(),
            subtotal,
            tax: "2.50".parse().unwrap(),
            shipping_cost: "5.00".parse().unwrap(),
            discount: Decimal::ZERO,
            total_amount: subtotal + "7.50".parse::<Decimal>().unwrap(),
            shipping_address: address(),
            payment_method: Some("card".to_string()),
            notes: None,
            items,
        }
    }

    fn item(quantity: i64, price: &str) -> NewOrderItem {
        NewOrderItem {
            product_id: ProductId::new(),
            quantity,
            price: price.parse().unwrap(),
        }
    }

    #[test]
    fn accepts_consistent_totals() {
        let order = order(vec![item(2, "40.00"), item(1, "19.99")]);
        assert_eq!(order.validate(), Ok(()));
    }

    #[test]
    fn state_may_be_empty_but_city_may_not() {
        let mut order = order(vec![item(1, "10.00")]);
        order.shipping_address.city = " ".to_string();
        assert!(order.validate().is_err());
    }

    #[test]
    fn rejects_empty_orders() {
        let order = order(vec![]);
        assert!(matches!(
            order.validate(),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn rejects_non_positive_quantities() {
        let order = order(vec![item(0, "10.00")]);
        assert!(order.validate().is_err());
    }

    #[test]
    fn rejects_subtotal_mismatch() {
        let mut order = order(vec![item(2, "40.00")]);
        order.subtotal = "79.99".parse().unwrap();
        let err = order.validate().unwrap_err();
        assert!(matches!(err, DomainError::Validation(msg) if msg.contains("subtotal")));
    }

    #[test]
    fn rejects_total_mismatch() {
        let mut order = order(vec![item(2, "40.00")]);
        order.total_amount = "1.00".parse().unwrap();
        let err = order.validate().unwrap_err();
        assert!(matches!(err, DomainError::Validation(msg) if msg.contains("total_amount")));
    }

    #[test]
    fn rejects_negative_discount() {
        let mut order = order(vec![item(1, "10.00")]);
        order.discount = "-1".parse().unwrap();
        assert!(order.validate().is_err());
    }
}
