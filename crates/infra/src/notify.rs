//! Notification seam.
//!
//! Actual delivery belongs to an external transactional-email provider; the
//! core only knows the two events worth telling customers about. Delivery
//! failures must never fail the operation that triggered them, so the trait
//! is fire-and-forget.

use aurum_auth::User;
use aurum_orders::{Order, OrderItem, OrderStatus};

pub trait Mailer: Send + Sync {
    /// A new order was placed.
    fn order_confirmation(&self, order: &Order, items: &[OrderItem], user: &User);

    /// An order's status actually changed (no-op updates are not announced).
    fn order_status_update(&self, order: &Order, user: &User, from: OrderStatus, to: OrderStatus);
}

/// Default mailer: writes structured log lines instead of sending anything.
#[derive(Debug, Default)]
pub struct LogMailer;

impl Mailer for LogMailer {
    fn order_confirmation(&self, order: &Order, items: &[OrderItem], user: &User) {
        tracing::info!(
            order_number = %order.order_number,
            user_id = %user.id,
            item_count = items.len(),
            total = %order.total_amount,
            "order confirmation email queued"
        );
    }

    fn order_status_update(&self, order: &Order, user: &User, from: OrderStatus, to: OrderStatus) {
        tracing::info!(
            order_number = %order.order_number,
            user_id = %user.id,
            %from,
            %to,
            "order status update email queued"
        );
    }
}
