//! In-memory storage backend (dev/test).
//!
//! All state lives behind one `RwLock`; multi-step operations validate first
//! and only then mutate, so order placement and stock+ledger writes are
//! atomic with respect to every other call.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;

use aurum_auth::User;
use aurum_cart::{CartItem, NewCartItem, NewWishlistItem, WishlistItem, ensure_quantity};
use aurum_catalog::{
    Category, CategoryPatch, NewCategory, NewProduct, Product, ProductFilter, ProductPage,
    ProductPatch,
};
use aurum_core::{
    CartItemId, CategoryId, DomainError, MovementId, OrderId, OrderItemId, ProductId, UserId,
    WishlistItemId,
};
use aurum_inventory::{MovementRecord, OversellPolicy, StockMovement, stock_from_ledger};
use aurum_orders::{NewOrder, Order, OrderItem, OrderStatus, PaymentStatus, generate_order_number};

use super::{
    AdminStats, CartLine, OrderFilter, OrderPage, OrderWithItems, Storage, StoreError, StoreResult,
    WishlistLine,
};

const ORDER_NUMBER_ATTEMPTS: usize = 5;

#[derive(Debug, Default)]
struct State {
    users: HashMap<UserId, User>,
    categories: HashMap<CategoryId, Category>,
    products: HashMap<ProductId, Product>,
    orders: HashMap<OrderId, Order>,
    order_items: Vec<OrderItem>,
    movements: Vec<MovementRecord>,
    cart: Vec<CartItem>,
    wishlist: Vec<WishlistItem>,
}

pub struct MemoryStorage {
    state: RwLock<State>,
    policy: OversellPolicy,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::with_policy(OversellPolicy::default())
    }

    pub fn with_policy(policy: OversellPolicy) -> Self {
        Self {
            state: RwLock::new(State::default()),
            policy,
        }
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| StoreError::backend("state lock poisoned"))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| StoreError::backend("state lock poisoned"))
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
impl MemoryStorage {
    /// Test hook: desynchronize the stock projection from the ledger.
    pub(crate) fn corrupt_stock(&self, product_id: ProductId, stock: i64) {
        let mut state = self.state.write().expect("state lock poisoned");
        if let Some(product) = state.products.get_mut(&product_id) {
            product.stock = stock;
        }
    }
}

fn items_for(state: &State, order_id: OrderId) -> Vec<OrderItem> {
    state
        .order_items
        .iter()
        .filter(|item| item.order_id == order_id)
        .cloned()
        .collect()
}

/// Newest first; UUIDv7 ids break created-at ties in insertion order.
fn sorted_orders_desc<'a>(state: &'a State, filter: &OrderFilter) -> Vec<&'a Order> {
    let mut orders: Vec<&Order> = state
        .orders
        .values()
        .filter(|order| {
            filter.user_id.is_none_or(|user_id| order.user_id == user_id)
                && filter.status.is_none_or(|status| order.status == status)
        })
        .collect();
    orders.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.as_uuid().cmp(a.id.as_uuid()))
    });
    orders
}

fn unique_order_number(state: &State) -> StoreResult<String> {
    for _ in 0..ORDER_NUMBER_ATTEMPTS {
        let candidate = generate_order_number(Utc::now());
        if !state
            .orders
            .values()
            .any(|order| order.order_number == candidate)
        {
            return Ok(candidate);
        }
    }
    Err(DomainError::conflict("could not generate a unique order number").into())
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get_user(&self, id: UserId) -> StoreResult<Option<User>> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn upsert_user(&self, user: User) -> StoreResult<User> {
        let now = Utc::now();
        let mut state = self.write()?;
        let mut stored = user;
        if let Some(existing) = state.users.get(&stored.id) {
            stored.created_at = existing.created_at;
        } else {
            stored.created_at = now;
        }
        stored.updated_at = now;
        state.users.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        let state = self.read()?;
        let mut categories: Vec<Category> = state.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn get_category(&self, id: CategoryId) -> StoreResult<Option<Category>> {
        Ok(self.read()?.categories.get(&id).cloned())
    }

    async fn create_category(&self, new: NewCategory) -> StoreResult<Category> {
        let category = new.into_category(CategoryId::new(), Utc::now())?;
        let mut state = self.write()?;
        if state.categories.values().any(|c| c.slug == category.slug) {
            return Err(DomainError::conflict("category slug already exists").into());
        }
        state.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn update_category(&self, id: CategoryId, patch: CategoryPatch) -> StoreResult<Category> {
        let mut state = self.write()?;
        if let Some(slug) = &patch.slug {
            if state
                .categories
                .values()
                .any(|c| c.id != id && &c.slug == slug)
            {
                return Err(DomainError::conflict("category slug already exists").into());
            }
        }
        let category = state
            .categories
            .get_mut(&id)
            .ok_or_else(StoreError::not_found)?;
        patch.apply_to(category)?;
        Ok(category.clone())
    }

    async fn delete_category(&self, id: CategoryId) -> StoreResult<()> {
        let mut state = self.write()?;
        state
            .categories
            .remove(&id)
            .ok_or_else(StoreError::not_found)?;
        // Products keep their dangling category reference cleared.
        for product in state.products.values_mut() {
            if product.category_id == Some(id) {
                product.category_id = None;
            }
        }
        Ok(())
    }

    async fn list_products(&self, filter: &ProductFilter) -> StoreResult<ProductPage> {
        let state = self.read()?;
        let mut matched: Vec<&Product> = state
            .products
            .values()
            .filter(|p| filter.matches(p))
            .collect();
        matched.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.as_uuid().cmp(a.id.as_uuid()))
        });

        let total = matched.len() as i64;
        let offset = filter.offset.unwrap_or(0).max(0) as usize;
        let items: Vec<Product> = match filter.limit {
            Some(limit) => matched
                .into_iter()
                .skip(offset)
                .take(limit.max(0) as usize)
                .cloned()
                .collect(),
            None => matched.into_iter().skip(offset).cloned().collect(),
        };

        Ok(ProductPage { items, total })
    }

    async fn get_product(&self, id: ProductId) -> StoreResult<Option<Product>> {
        Ok(self.read()?.products.get(&id).cloned())
    }

    async fn get_product_by_slug(&self, slug: &str) -> StoreResult<Option<Product>> {
        Ok(self
            .read()?
            .products
            .values()
            .find(|p| p.slug == slug)
            .cloned())
    }

    async fn create_product(&self, new: NewProduct) -> StoreResult<Product> {
        let product = new.into_product(ProductId::new(), Utc::now())?;
        let mut state = self.write()?;
        if state.products.values().any(|p| p.slug == product.slug) {
            return Err(DomainError::conflict("product slug already exists").into());
        }
        state.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn update_product(&self, id: ProductId, patch: ProductPatch) -> StoreResult<Product> {
        let mut state = self.write()?;
        if let Some(slug) = &patch.slug {
            if state.products.values().any(|p| p.id != id && &p.slug == slug) {
                return Err(DomainError::conflict("product slug already exists").into());
            }
        }
        let product = state
            .products
            .get_mut(&id)
            .ok_or_else(StoreError::not_found)?;
        patch.apply_to(product, Utc::now())?;
        Ok(product.clone())
    }

    async fn delete_product(&self, id: ProductId) -> StoreResult<()> {
        let mut state = self.write()?;
        if !state.products.contains_key(&id) {
            return Err(StoreError::not_found());
        }
        let referenced = state.order_items.iter().any(|item| item.product_id == id)
            || state.movements.iter().any(|m| m.product_id == id);
        if referenced {
            return Err(DomainError::conflict(
                "product is referenced by orders or inventory history",
            )
            .into());
        }
        state.products.remove(&id);
        state.cart.retain(|c| c.product_id != id);
        state.wishlist.retain(|w| w.product_id != id);
        Ok(())
    }

    async fn list_orders(&self, filter: &OrderFilter) -> StoreResult<OrderPage> {
        let state = self.read()?;
        let matched = sorted_orders_desc(&state, filter);
        let total = matched.len() as i64;

        let offset = filter.offset.unwrap_or(0).max(0) as usize;
        let page: Vec<&Order> = match filter.limit {
            Some(limit) => matched
                .into_iter()
                .skip(offset)
                .take(limit.max(0) as usize)
                .collect(),
            None => matched.into_iter().skip(offset).collect(),
        };

        let items = page
            .into_iter()
            .map(|order| OrderWithItems {
                order: order.clone(),
                items: items_for(&state, order.id),
            })
            .collect();

        Ok(OrderPage { items, total })
    }

    async fn get_order(&self, id: OrderId) -> StoreResult<Option<OrderWithItems>> {
        let state = self.read()?;
        Ok(state.orders.get(&id).map(|order| OrderWithItems {
            order: order.clone(),
            items: items_for(&state, id),
        }))
    }

    async fn create_order(&self, new: NewOrder) -> StoreResult<OrderWithItems> {
        let now = Utc::now();
        let mut state = self.write()?;

        // Validate every line against current stock before touching anything;
        // a rejection here leaves no partial state behind.
        let mut planned: Vec<(ProductId, StockMovement)> = Vec::with_capacity(new.items.len());
        for item in &new.items {
            let product = state
                .products
                .get(&item.product_id)
                .ok_or_else(StoreError::not_found)?;
            let movement = StockMovement::outbound(item.quantity)?;
            self.policy.check(product.stock, &movement)?;
            planned.push((item.product_id, movement));
        }

        let order_number = unique_order_number(&state)?;
        let order_id = OrderId::new();
        let order = Order {
            id: order_id,
            order_number: order_number.clone(),
            user_id: new.user_id,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            payment_method: new.payment_method.clone(),
            subtotal: new.subtotal,
            tax: new.tax,
            shipping_cost: new.shipping_cost,
            discount: new.discount,
            total_amount: new.total_amount,
            shipping_address: new.shipping_address.clone(),
            notes: new.notes.clone(),
            created_at: now,
            updated_at: now,
        };
        let items: Vec<OrderItem> = new
            .items
            .iter()
            .map(|item| OrderItem {
                id: OrderItemId::new(),
                order_id,
                product_id: item.product_id,
                quantity: item.quantity,
                price: item.price,
                created_at: now,
            })
            .collect();

        state.orders.insert(order_id, order.clone());
        state.order_items.extend(items.iter().cloned());
        for (product_id, movement) in planned {
            let product = state
                .products
                .get_mut(&product_id)
                .ok_or_else(StoreError::not_found)?;
            product.stock += movement.signed_delta();
            product.updated_at = now;
            state.movements.push(MovementRecord {
                id: MovementId::new(),
                product_id,
                kind: movement.kind(),
                quantity: movement.signed_delta(),
                reason: Some(format!("Order {order_number}")),
                reference: Some(order_number.clone()),
                created_at: now,
            });
        }

        Ok(OrderWithItems { order, items })
    }

    async fn update_order_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> StoreResult<Order> {
        let mut state = self.write()?;
        let order = state.orders.get_mut(&id).ok_or_else(StoreError::not_found)?;
        if order.status != from {
            return Err(DomainError::conflict("order status changed concurrently").into());
        }
        order.status = to;
        order.updated_at = Utc::now();
        Ok(order.clone())
    }

    async fn cart_items(&self, user_id: UserId) -> StoreResult<Vec<CartLine>> {
        let state = self.read()?;
        Ok(state
            .cart
            .iter()
            .filter(|item| item.user_id == user_id)
            .filter_map(|item| {
                state.products.get(&item.product_id).map(|product| CartLine {
                    item: item.clone(),
                    product: product.clone(),
                })
            })
            .collect())
    }

    async fn add_to_cart(&self, new: NewCartItem) -> StoreResult<CartItem> {
        new.validate()?;
        let now = Utc::now();
        let mut state = self.write()?;
        if !state.products.contains_key(&new.product_id) {
            return Err(StoreError::not_found());
        }
        if let Some(existing) = state
            .cart
            .iter_mut()
            .find(|item| item.user_id == new.user_id && item.product_id == new.product_id)
        {
            existing.quantity += new.quantity;
            existing.updated_at = now;
            return Ok(existing.clone());
        }
        let item = CartItem {
            id: CartItemId::new(),
            user_id: new.user_id,
            product_id: new.product_id,
            quantity: new.quantity,
            created_at: now,
            updated_at: now,
        };
        state.cart.push(item.clone());
        Ok(item)
    }

    async fn set_cart_quantity(&self, id: CartItemId, quantity: i64) -> StoreResult<CartItem> {
        ensure_quantity(quantity)?;
        let mut state = self.write()?;
        let item = state
            .cart
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or_else(StoreError::not_found)?;
        item.quantity = quantity;
        item.updated_at = Utc::now();
        Ok(item.clone())
    }

    async fn remove_cart_item(&self, id: CartItemId) -> StoreResult<()> {
        let mut state = self.write()?;
        let before = state.cart.len();
        state.cart.retain(|item| item.id != id);
        if state.cart.len() == before {
            return Err(StoreError::not_found());
        }
        Ok(())
    }

    async fn clear_cart(&self, user_id: UserId) -> StoreResult<()> {
        let mut state = self.write()?;
        state.cart.retain(|item| item.user_id != user_id);
        Ok(())
    }

    async fn wishlist_items(&self, user_id: UserId) -> StoreResult<Vec<WishlistLine>> {
        let state = self.read()?;
        Ok(state
            .wishlist
            .iter()
            .filter(|item| item.user_id == user_id)
            .filter_map(|item| {
                state
                    .products
                    .get(&item.product_id)
                    .map(|product| WishlistLine {
                        item: item.clone(),
                        product: product.clone(),
                    })
            })
            .collect())
    }

    async fn add_to_wishlist(&self, new: NewWishlistItem) -> StoreResult<WishlistItem> {
        let mut state = self.write()?;
        if !state.products.contains_key(&new.product_id) {
            return Err(StoreError::not_found());
        }
        if let Some(existing) = state
            .wishlist
            .iter()
            .find(|item| item.user_id == new.user_id && item.product_id == new.product_id)
        {
            return Ok(existing.clone());
        }
        let item = WishlistItem {
            id: WishlistItemId::new(),
            user_id: new.user_id,
            product_id: new.product_id,
            created_at: Utc::now(),
        };
        state.wishlist.push(item.clone());
        Ok(item)
    }

    async fn remove_wishlist_item(&self, id: WishlistItemId) -> StoreResult<()> {
        let mut state = self.write()?;
        let before = state.wishlist.len();
        state.wishlist.retain(|item| item.id != id);
        if state.wishlist.len() == before {
            return Err(StoreError::not_found());
        }
        Ok(())
    }

    async fn adjust_stock(
        &self,
        product_id: ProductId,
        movement: StockMovement,
        reason: Option<String>,
        reference: Option<String>,
    ) -> StoreResult<i64> {
        let now = Utc::now();
        let mut state = self.write()?;
        let product = state
            .products
            .get_mut(&product_id)
            .ok_or_else(StoreError::not_found)?;
        self.policy.check(product.stock, &movement)?;
        product.stock += movement.signed_delta();
        product.updated_at = now;
        let new_level = product.stock;
        state.movements.push(MovementRecord {
            id: MovementId::new(),
            product_id,
            kind: movement.kind(),
            quantity: movement.signed_delta(),
            reason,
            reference,
            created_at: now,
        });
        Ok(new_level)
    }

    async fn movements(&self, product_id: ProductId) -> StoreResult<Vec<MovementRecord>> {
        let state = self.read()?;
        Ok(state
            .movements
            .iter()
            .rev()
            .filter(|m| m.product_id == product_id)
            .cloned()
            .collect())
    }

    async fn low_stock_products(&self) -> StoreResult<Vec<Product>> {
        let state = self.read()?;
        let mut low: Vec<Product> = state
            .products
            .values()
            .filter(|p| p.is_active && p.is_low_stock())
            .cloned()
            .collect();
        low.sort_by(|a, b| a.stock.cmp(&b.stock).then_with(|| a.name.cmp(&b.name)));
        Ok(low)
    }

    async fn rebuild_stock(&self, product_id: ProductId) -> StoreResult<i64> {
        let mut state = self.write()?;
        if !state.products.contains_key(&product_id) {
            return Err(StoreError::not_found());
        }
        let rebuilt = stock_from_ledger(
            state
                .movements
                .iter()
                .filter(|m| m.product_id == product_id),
        );
        let product = state
            .products
            .get_mut(&product_id)
            .ok_or_else(StoreError::not_found)?;
        product.stock = rebuilt;
        product.updated_at = Utc::now();
        Ok(rebuilt)
    }

    async fn admin_stats(&self) -> StoreResult<AdminStats> {
        let state = self.read()?;
        let total_revenue: Decimal = state
            .orders
            .values()
            .filter(|order| order.payment_status == PaymentStatus::Paid)
            .map(|order| order.total_amount)
            .sum();

        let recent_orders = sorted_orders_desc(&state, &OrderFilter::default())
            .into_iter()
            .take(5)
            .map(|order| OrderWithItems {
                order: order.clone(),
                items: items_for(&state, order.id),
            })
            .collect();

        Ok(AdminStats {
            total_products: state.products.len() as i64,
            total_orders: state.orders.len() as i64,
            total_users: state.users.len() as i64,
            total_revenue,
            recent_orders,
        })
    }
}
