//! The persistence seam.
//!
//! [`Storage`] is the single interface the services and the HTTP layer talk
//! to. Two backends implement it: [`MemoryStorage`] (dev/test) and
//! [`PgStorage`] (Postgres). Multi-step operations — order placement, stock
//! adjustment — are atomic inside each backend: either every write lands or
//! none do.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use aurum_auth::User;
use aurum_cart::{CartItem, NewCartItem, NewWishlistItem, WishlistItem};
use aurum_catalog::{
    Category, CategoryPatch, NewCategory, NewProduct, Product, ProductFilter, ProductPage,
    ProductPatch,
};
use aurum_core::{
    CartItemId, CategoryId, DomainError, OrderId, ProductId, UserId, WishlistItemId,
};
use aurum_inventory::{MovementRecord, StockMovement};
use aurum_orders::{NewOrder, Order, OrderItem, OrderStatus};

mod memory;
mod postgres;

pub use memory::MemoryStorage;
pub use postgres::PgStorage;

pub type StoreResult<T> = Result<T, StoreError>;

/// Storage operation error.
///
/// Domain rejections (validation, not-found, insufficient stock, conflicts)
/// pass through unchanged; everything else is a backend failure.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("storage backend failure: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    pub fn not_found() -> Self {
        Self::Domain(DomainError::NotFound)
    }
}

/// Order listing filter. Conditions are ANDed; pagination via limit/offset
/// with the total computed over the same predicate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderFilter {
    pub user_id: Option<UserId>,
    pub status: Option<OrderStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// An order header together with its line items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// One page of orders plus the unpaginated total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderPage {
    pub items: Vec<OrderWithItems>,
    pub total: i64,
}

/// A cart row joined with its product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub item: CartItem,
    pub product: Product,
}

/// A wishlist row joined with its product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WishlistLine {
    pub item: WishlistItem,
    pub product: Product,
}

/// Back-office dashboard counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminStats {
    pub total_products: i64,
    pub total_orders: i64,
    pub total_users: i64,
    /// Sum of `total_amount` over orders with payment status `paid`.
    pub total_revenue: Decimal,
    pub recent_orders: Vec<OrderWithItems>,
}

#[async_trait]
pub trait Storage: Send + Sync {
    // Users (mirrored from the external identity provider).
    async fn get_user(&self, id: UserId) -> StoreResult<Option<User>>;
    async fn upsert_user(&self, user: User) -> StoreResult<User>;

    // Categories.
    async fn list_categories(&self) -> StoreResult<Vec<Category>>;
    async fn get_category(&self, id: CategoryId) -> StoreResult<Option<Category>>;
    async fn create_category(&self, new: NewCategory) -> StoreResult<Category>;
    async fn update_category(&self, id: CategoryId, patch: CategoryPatch) -> StoreResult<Category>;
    async fn delete_category(&self, id: CategoryId) -> StoreResult<()>;

    // Products.
    async fn list_products(&self, filter: &ProductFilter) -> StoreResult<ProductPage>;
    async fn get_product(&self, id: ProductId) -> StoreResult<Option<Product>>;
    async fn get_product_by_slug(&self, slug: &str) -> StoreResult<Option<Product>>;
    async fn create_product(&self, new: NewProduct) -> StoreResult<Product>;
    async fn update_product(&self, id: ProductId, patch: ProductPatch) -> StoreResult<Product>;
    async fn delete_product(&self, id: ProductId) -> StoreResult<()>;

    // Orders.
    async fn list_orders(&self, filter: &OrderFilter) -> StoreResult<OrderPage>;
    async fn get_order(&self, id: OrderId) -> StoreResult<Option<OrderWithItems>>;

    /// Place an order: header, line items, one stock decrement and one `out`
    /// ledger row per item — all in one atomic unit. The order number is
    /// generated here and regenerated on uniqueness conflicts.
    async fn create_order(&self, new: NewOrder) -> StoreResult<OrderWithItems>;

    /// Compare-and-swap status update: fails with a conflict if the stored
    /// status no longer equals `from`.
    async fn update_order_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> StoreResult<Order>;

    // Cart.
    async fn cart_items(&self, user_id: UserId) -> StoreResult<Vec<CartLine>>;

    /// Upsert: adding a product already in the cart increments the existing
    /// row's quantity.
    async fn add_to_cart(&self, new: NewCartItem) -> StoreResult<CartItem>;
    async fn set_cart_quantity(&self, id: CartItemId, quantity: i64) -> StoreResult<CartItem>;
    async fn remove_cart_item(&self, id: CartItemId) -> StoreResult<()>;
    async fn clear_cart(&self, user_id: UserId) -> StoreResult<()>;

    // Wishlist.
    async fn wishlist_items(&self, user_id: UserId) -> StoreResult<Vec<WishlistLine>>;
    async fn add_to_wishlist(&self, new: NewWishlistItem) -> StoreResult<WishlistItem>;
    async fn remove_wishlist_item(&self, id: WishlistItemId) -> StoreResult<()>;

    // Inventory.

    /// Apply a movement to a product: stock update and ledger append in one
    /// atomic unit. Returns the new stock level.
    async fn adjust_stock(
        &self,
        product_id: ProductId,
        movement: StockMovement,
        reason: Option<String>,
        reference: Option<String>,
    ) -> StoreResult<i64>;

    /// Ledger rows for a product, newest first.
    async fn movements(&self, product_id: ProductId) -> StoreResult<Vec<MovementRecord>>;

    /// Active products with `stock <= low_stock_threshold`, most urgent first.
    async fn low_stock_products(&self) -> StoreResult<Vec<Product>>;

    /// Repair operation: rewrite the materialized `stock` to the ledger sum.
    /// Returns the rebuilt level. Records no movement — repair realigns the
    /// projection, it does not change history.
    async fn rebuild_stock(&self, product_id: ProductId) -> StoreResult<i64>;

    // Back-office stats.
    async fn admin_stats(&self) -> StoreResult<AdminStats>;
}
