use std::sync::Arc;

use aurum_core::{DomainError, OrderId};
use aurum_orders::{NewOrder, Order, OrderStatus};

use crate::notify::Mailer;
use crate::storage::{OrderWithItems, Storage, StoreError, StoreResult};

/// Order placement and lifecycle management.
///
/// Placement is all-or-nothing inside the storage backend; this service owns
/// the surrounding choreography: request validation up front, cart clearing
/// and the confirmation email after the order has committed.
pub struct OrderService {
    storage: Arc<dyn Storage>,
    mailer: Arc<dyn Mailer>,
}

impl OrderService {
    pub fn new(storage: Arc<dyn Storage>, mailer: Arc<dyn Mailer>) -> Self {
        Self { storage, mailer }
    }

    pub async fn place_order(&self, new: NewOrder) -> StoreResult<OrderWithItems> {
        new.validate()?;
        let placed = self.storage.create_order(new).await?;

        tracing::info!(
            order_number = %placed.order.order_number,
            user_id = %placed.order.user_id,
            items = placed.items.len(),
            "order placed"
        );

        // The order stands even if cart cleanup fails; the customer can
        // always empty a stale cart, but a committed order must not unwind.
        if let Err(e) = self.storage.clear_cart(placed.order.user_id).await {
            tracing::warn!(
                order_number = %placed.order.order_number,
                error = %e,
                "failed to clear cart after checkout"
            );
        }

        match self.storage.get_user(placed.order.user_id).await {
            Ok(Some(user)) => {
                self.mailer
                    .order_confirmation(&placed.order, &placed.items, &user);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, "could not load user for order confirmation");
            }
        }

        Ok(placed)
    }

    /// Transition an order's status, validating the move against the
    /// lifecycle state machine. Announces the change only when the status
    /// actually changed.
    pub async fn update_status(&self, id: OrderId, next: OrderStatus) -> StoreResult<Order> {
        let current = self
            .storage
            .get_order(id)
            .await?
            .ok_or_else(|| StoreError::Domain(DomainError::NotFound))?;
        let from = current.order.status;

        if from == next {
            return Ok(current.order);
        }
        from.ensure_transition(next)?;

        let updated = self.storage.update_order_status(id, from, next).await?;
        tracing::info!(order_number = %updated.order_number, %from, to = %next, "order status updated");

        match self.storage.get_user(updated.user_id).await {
            Ok(Some(user)) => {
                self.mailer.order_status_update(&updated, &user, from, next);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, "could not load user for status update email");
            }
        }

        Ok(updated)
    }
}
