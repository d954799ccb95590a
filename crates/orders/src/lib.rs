//! `aurum-orders` — order headers, line items, and the order lifecycle.

pub mod number;
pub mod order;
pub mod status;

pub use number::generate_order_number;
pub use order::{NewOrder, NewOrderItem, Order, OrderItem, ShippingAddress};
pub use status::{OrderStatus, PaymentStatus};
