//! Postgres storage backend.
//!
//! Every multi-step operation runs inside one transaction. Stock decrements
//! use a conditional `UPDATE ... WHERE stock + delta >= 0` so two concurrent
//! checkouts cannot both win the last unit, and the ledger insert rides in
//! the same transaction as the stock write.
//!
//! ## Error mapping
//!
//! | Postgres error code | Mapped to |
//! |---------------------|-----------|
//! | `23505` (unique violation) | `Conflict` (order-number conflicts trigger a regenerate+retry instead) |
//! | `23503` (foreign-key violation) | `Conflict`, or `NotFound` where the missing parent is the request target |
//! | anything else | `StoreError::Backend` |

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, QueryBuilder, Row, Transaction};
use uuid::Uuid;

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
use aurum_inventory::{MovementRecord, OversellPolicy, StockMovement};
use aurum_orders::{NewOrder, Order, OrderItem, OrderStatus, generate_order_number};

use super::{
    AdminStats, CartLine, OrderFilter, OrderPage, OrderWithItems, Storage, StoreError, StoreResult,
    WishlistLine,
};

const ORDER_NUMBER_ATTEMPTS: usize = 5;

const USER_COLUMNS: &str = "id, email, first_name, last_name, is_admin, created_at, updated_at";
const CATEGORY_COLUMNS: &str = "id, name, slug, description, created_at";
const PRODUCT_COLUMNS: &str = "id, name, slug, description, short_description, price, \
     compare_price, sku, stock, low_stock_threshold, images, category_id, material, weight, \
     dimensions, is_active, is_featured, created_at, updated_at";
const ORDER_COLUMNS: &str = "id, order_number, user_id, status, payment_status, payment_method, \
     subtotal, tax, shipping_cost, discount, total_amount, shipping_address, notes, created_at, \
     updated_at";
const ORDER_ITEM_COLUMNS: &str = "id, order_id, product_id, quantity, price, created_at";
const MOVEMENT_COLUMNS: &str = "id, product_id, movement_type, quantity, reason, reference, \
     created_at";
const CART_COLUMNS: &str = "id, user_id, product_id, quantity, created_at, updated_at";
const WISHLIST_COLUMNS: &str = "id, user_id, product_id, created_at";

/// Postgres-backed [`Storage`] implementation.
#[derive(Debug, Clone)]
pub struct PgStorage {
    pool: PgPool,
    policy: OversellPolicy,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        Self::with_policy(pool, OversellPolicy::default())
    }

    pub fn with_policy(pool: PgPool, policy: OversellPolicy) -> Self {
        Self { pool, policy }
    }

    /// Connect and bring the schema up to date.
    pub async fn connect(database_url: &str, policy: OversellPolicy) -> StoreResult<Self> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        sqlx::migrate!()
            .run(&pool)
            .await
            .map_err(|e| StoreError::backend(format!("migrations failed: {e}")))?;
        Ok(Self::with_policy(pool, policy))
    }

    async fn order_items(&self, order_id: OrderId) -> StoreResult<Vec<OrderItem>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_ITEM_COLUMNS} FROM order_items WHERE order_id = $1 ORDER BY created_at ASC, id ASC"
        ))
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("order_items", e))?;
        rows.iter().map(order_item_from_row).collect()
    }

    async fn products_by_ids(&self, ids: Vec<Uuid>) -> StoreResult<Vec<Product>> {
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("products_by_ids", e))?;
        rows.iter().map(product_from_row).collect()
    }

    async fn try_create_order(
        &self,
        new: &NewOrder,
        order_number: &str,
    ) -> Result<OrderWithItems, TryCreateOrder> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| TryCreateOrder::Store(map_sqlx_error("begin", e)))?;

        let order_id = OrderId::new();
        let address = serde_json::to_value(&new.shipping_address)
            .map_err(|e| TryCreateOrder::Store(StoreError::backend(e.to_string())))?;

        let header = sqlx::query(&format!(
            r#"
            INSERT INTO orders (
                id, order_number, user_id, status, payment_status, payment_method,
                subtotal, tax, shipping_cost, discount, total_amount,
                shipping_address, notes, created_at, updated_at
            )
            VALUES ($1, $2, $3, 'pending', 'pending', $4, $5, $6, $7, $8, $9, $10, $11, NOW(), NOW())
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(order_id.as_uuid())
        .bind(order_number)
        .bind(new.user_id.as_uuid())
        .bind(&new.payment_method)
        .bind(new.subtotal)
        .bind(new.tax)
        .bind(new.shipping_cost)
        .bind(new.discount)
        .bind(new.total_amount)
        .bind(address)
        .bind(&new.notes)
        .fetch_one(&mut *tx)
        .await;

        let header = match header {
            Ok(row) => row,
            Err(e) if is_unique_violation_on(&e, "order_number") => {
                return Err(TryCreateOrder::DuplicateNumber);
            }
            Err(e) => return Err(TryCreateOrder::Store(map_sqlx_error("insert order", e))),
        };
        let order = order_from_row(&header).map_err(TryCreateOrder::Store)?;

        let mut items = Vec::with_capacity(new.items.len());
        for item in &new.items {
            let row = sqlx::query(&format!(
                r#"
                INSERT INTO order_items (id, order_id, product_id, quantity, price, created_at)
                VALUES ($1, $2, $3, $4, $5, NOW())
                RETURNING {ORDER_ITEM_COLUMNS}
                "#
            ))
            .bind(OrderItemId::new().as_uuid())
            .bind(order_id.as_uuid())
            .bind(item.product_id.as_uuid())
            .bind(item.quantity)
            .bind(item.price)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| TryCreateOrder::Store(map_insert_item_error(e)))?;
            items.push(order_item_from_row(&row).map_err(TryCreateOrder::Store)?);
        }

        for item in &new.items {
            let movement =
                StockMovement::outbound(item.quantity).map_err(|e| TryCreateOrder::Store(e.into()))?;
            apply_movement_tx(
                &mut tx,
                self.policy,
                item.product_id,
                &movement,
                Some(&format!("Order {order_number}")),
                Some(order_number),
            )
            .await
            .map_err(TryCreateOrder::Store)?;
        }

        tx.commit()
            .await
            .map_err(|e| TryCreateOrder::Store(map_sqlx_error("commit", e)))?;

        Ok(OrderWithItems { order, items })
    }
}

enum TryCreateOrder {
    DuplicateNumber,
    Store(StoreError),
}

#[async_trait]
impl Storage for PgStorage {
    async fn get_user(&self, id: UserId) -> StoreResult<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_user", e))?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn upsert_user(&self, user: User) -> StoreResult<User> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO users (id, email, first_name, last_name, is_admin, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, NOW(), NOW())
            ON CONFLICT (id) DO UPDATE SET
                email = EXCLUDED.email,
                first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                is_admin = EXCLUDED.is_admin,
                updated_at = NOW()
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.id.as_uuid())
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.is_admin)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("upsert_user", e))?;
        user_from_row(&row)
    }

    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        let rows = sqlx::query(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY name ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_categories", e))?;
        rows.iter().map(category_from_row).collect()
    }

    async fn get_category(&self, id: CategoryId) -> StoreResult<Option<Category>> {
        let row = sqlx::query(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_category", e))?;
        row.as_ref().map(category_from_row).transpose()
    }

    async fn create_category(&self, new: NewCategory) -> StoreResult<Category> {
        let category = new.into_category(CategoryId::new(), Utc::now())?;
        sqlx::query(
            r#"
            INSERT INTO categories (id, name, slug, description, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(category.id.as_uuid())
        .bind(&category.name)
        .bind(&category.slug)
        .bind(&category.description)
        .bind(category.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                DomainError::conflict("category slug already exists").into()
            } else {
                map_sqlx_error("create_category", e)
            }
        })?;
        Ok(category)
    }

    async fn update_category(&self, id: CategoryId, patch: CategoryPatch) -> StoreResult<Category> {
        let mut category = self
            .get_category(id)
            .await?
            .ok_or_else(StoreError::not_found)?;
        patch.apply_to(&mut category)?;
        sqlx::query("UPDATE categories SET name = $2, slug = $3, description = $4 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(&category.name)
            .bind(&category.slug)
            .bind(&category.description)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    DomainError::conflict("category slug already exists").into()
                } else {
                    map_sqlx_error("update_category", e)
                }
            })?;
        Ok(category)
    }

    async fn delete_category(&self, id: CategoryId) -> StoreResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin", e))?;
        sqlx::query("UPDATE products SET category_id = NULL WHERE category_id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_category", e))?;
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_category", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found());
        }
        tx.commit().await.map_err(|e| map_sqlx_error("commit", e))?;
        Ok(())
    }

    async fn list_products(&self, filter: &ProductFilter) -> StoreResult<ProductPage> {
        // The COUNT runs over the same predicate as the page so the total is
        // accurate regardless of limit/offset.
        let mut count_query: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) AS count FROM products");
        apply_product_filter(&mut count_query, filter);
        let count_row = count_query
            .build()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_products", e))?;
        let total: i64 = count_row.try_get("count").map_err(row_err)?;

        let mut page_query: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {PRODUCT_COLUMNS} FROM products"));
        apply_product_filter(&mut page_query, filter);
        page_query.push(" ORDER BY created_at DESC, id DESC");
        if let Some(limit) = filter.limit {
            page_query.push(" LIMIT ").push_bind(limit.max(0));
        }
        if let Some(offset) = filter.offset {
            page_query.push(" OFFSET ").push_bind(offset.max(0));
        }
        let rows = page_query
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_products", e))?;
        let items = rows
            .iter()
            .map(product_from_row)
            .collect::<StoreResult<Vec<_>>>()?;

        Ok(ProductPage { items, total })
    }

    async fn get_product(&self, id: ProductId) -> StoreResult<Option<Product>> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_product", e))?;
        row.as_ref().map(product_from_row).transpose()
    }

    async fn get_product_by_slug(&self, slug: &str) -> StoreResult<Option<Product>> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_product_by_slug", e))?;
        row.as_ref().map(product_from_row).transpose()
    }

    async fn create_product(&self, new: NewProduct) -> StoreResult<Product> {
        let product = new.into_product(ProductId::new(), Utc::now())?;
        let images = serde_json::to_value(&product.images)
            .map_err(|e| StoreError::backend(e.to_string()))?;
        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, slug, description, short_description, price, compare_price, sku,
                stock, low_stock_threshold, images, category_id, material, weight, dimensions,
                is_active, is_featured, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(&product.name)
        .bind(&product.slug)
        .bind(&product.description)
        .bind(&product.short_description)
        .bind(product.price)
        .bind(product.compare_price)
        .bind(&product.sku)
        .bind(product.stock)
        .bind(product.low_stock_threshold)
        .bind(images)
        .bind(product.category_id.map(|id| *id.as_uuid()))
        .bind(&product.material)
        .bind(product.weight)
        .bind(&product.dimensions)
        .bind(product.is_active)
        .bind(product.is_featured)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                DomainError::conflict("product slug already exists").into()
            } else {
                map_sqlx_error("create_product", e)
            }
        })?;
        Ok(product)
    }

    async fn update_product(&self, id: ProductId, patch: ProductPatch) -> StoreResult<Product> {
        let mut product = self
            .get_product(id)
            .await?
            .ok_or_else(StoreError::not_found)?;
        patch.apply_to(&mut product, Utc::now())?;
        let images = serde_json::to_value(&product.images)
            .map_err(|e| StoreError::backend(e.to_string()))?;
        sqlx::query(
            r#"
            UPDATE products SET
                name = $2, slug = $3, description = $4, short_description = $5, price = $6,
                compare_price = $7, sku = $8, low_stock_threshold = $9, images = $10,
                category_id = $11, material = $12, weight = $13, dimensions = $14,
                is_active = $15, is_featured = $16, updated_at = $17
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(&product.name)
        .bind(&product.slug)
        .bind(&product.description)
        .bind(&product.short_description)
        .bind(product.price)
        .bind(product.compare_price)
        .bind(&product.sku)
        .bind(product.low_stock_threshold)
        .bind(images)
        .bind(product.category_id.map(|id| *id.as_uuid()))
        .bind(&product.material)
        .bind(product.weight)
        .bind(&product.dimensions)
        .bind(product.is_active)
        .bind(product.is_featured)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                DomainError::conflict("product slug already exists").into()
            } else {
                map_sqlx_error("update_product", e)
            }
        })?;
        Ok(product)
    }

    async fn delete_product(&self, id: ProductId) -> StoreResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin", e))?;
        sqlx::query("DELETE FROM cart_items WHERE product_id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_product", e))?;
        sqlx::query("DELETE FROM wishlist_items WHERE product_id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_product", e))?;
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if is_fk_violation(&e) {
                    DomainError::conflict("product is referenced by orders or inventory history")
                        .into()
                } else {
                    map_sqlx_error("delete_product", e)
                }
            })?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found());
        }
        tx.commit().await.map_err(|e| map_sqlx_error("commit", e))?;
        Ok(())
    }

    async fn list_orders(&self, filter: &OrderFilter) -> StoreResult<OrderPage> {
        let mut count_query: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) AS count FROM orders");
        apply_order_filter(&mut count_query, filter);
        let count_row = count_query
            .build()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_orders", e))?;
        let total: i64 = count_row.try_get("count").map_err(row_err)?;

        let mut page_query: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {ORDER_COLUMNS} FROM orders"));
        apply_order_filter(&mut page_query, filter);
        page_query.push(" ORDER BY created_at DESC, id DESC");
        if let Some(limit) = filter.limit {
            page_query.push(" LIMIT ").push_bind(limit.max(0));
        }
        if let Some(offset) = filter.offset {
            page_query.push(" OFFSET ").push_bind(offset.max(0));
        }
        let rows = page_query
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_orders", e))?;

        let mut items = Vec::with_capacity(rows.len());
        for row in &rows {
            let order = order_from_row(row)?;
            let order_items = self.order_items(order.id).await?;
            items.push(OrderWithItems {
                order,
                items: order_items,
            });
        }

        Ok(OrderPage { items, total })
    }

    async fn get_order(&self, id: OrderId) -> StoreResult<Option<OrderWithItems>> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_order", e))?;
        let Some(row) = row else {
            return Ok(None);
        };
        let order = order_from_row(&row)?;
        let items = self.order_items(order.id).await?;
        Ok(Some(OrderWithItems { order, items }))
    }

    async fn create_order(&self, new: NewOrder) -> StoreResult<OrderWithItems> {
        for _ in 0..ORDER_NUMBER_ATTEMPTS {
            let order_number = generate_order_number(Utc::now());
            match self.try_create_order(&new, &order_number).await {
                Ok(placed) => return Ok(placed),
                Err(TryCreateOrder::DuplicateNumber) => continue,
                Err(TryCreateOrder::Store(e)) => return Err(e),
            }
        }
        Err(DomainError::conflict("could not generate a unique order number").into())
    }

    async fn update_order_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> StoreResult<Order> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE orders SET status = $3, updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(id.as_uuid())
        .bind(from.as_str())
        .bind(to.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_order_status", e))?;

        match row {
            Some(row) => order_from_row(&row),
            None => {
                let exists = sqlx::query("SELECT 1 FROM orders WHERE id = $1")
                    .bind(id.as_uuid())
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(|e| map_sqlx_error("update_order_status", e))?;
                if exists.is_some() {
                    Err(DomainError::conflict("order status changed concurrently").into())
                } else {
                    Err(StoreError::not_found())
                }
            }
        }
    }

    async fn cart_items(&self, user_id: UserId) -> StoreResult<Vec<CartLine>> {
        let rows = sqlx::query(&format!(
            "SELECT {CART_COLUMNS} FROM cart_items WHERE user_id = $1 ORDER BY created_at ASC"
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("cart_items", e))?;
        let items = rows
            .iter()
            .map(cart_item_from_row)
            .collect::<StoreResult<Vec<_>>>()?;

        let products = self
            .products_by_ids(items.iter().map(|i| *i.product_id.as_uuid()).collect())
            .await?;
        Ok(join_products(items, products, |item| item.product_id)
            .map(|(item, product)| CartLine { item, product })
            .collect())
    }

    async fn add_to_cart(&self, new: NewCartItem) -> StoreResult<CartItem> {
        new.validate()?;
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO cart_items (id, user_id, product_id, quantity, created_at, updated_at)
            VALUES ($1, $2, $3, $4, NOW(), NOW())
            ON CONFLICT (user_id, product_id)
            DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity, updated_at = NOW()
            RETURNING {CART_COLUMNS}
            "#
        ))
        .bind(CartItemId::new().as_uuid())
        .bind(new.user_id.as_uuid())
        .bind(new.product_id.as_uuid())
        .bind(new.quantity)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_fk_violation(&e) {
                StoreError::not_found()
            } else {
                map_sqlx_error("add_to_cart", e)
            }
        })?;
        cart_item_from_row(&row)
    }

    async fn set_cart_quantity(&self, id: CartItemId, quantity: i64) -> StoreResult<CartItem> {
        ensure_quantity(quantity)?;
        let row = sqlx::query(&format!(
            r#"
            UPDATE cart_items SET quantity = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {CART_COLUMNS}
            "#
        ))
        .bind(id.as_uuid())
        .bind(quantity)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("set_cart_quantity", e))?;
        row.as_ref()
            .map(cart_item_from_row)
            .transpose()?
            .ok_or_else(StoreError::not_found)
    }

    async fn remove_cart_item(&self, id: CartItemId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM cart_items WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("remove_cart_item", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found());
        }
        Ok(())
    }

    async fn clear_cart(&self, user_id: UserId) -> StoreResult<()> {
        sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("clear_cart", e))?;
        Ok(())
    }

    async fn wishlist_items(&self, user_id: UserId) -> StoreResult<Vec<WishlistLine>> {
        let rows = sqlx::query(&format!(
            "SELECT {WISHLIST_COLUMNS} FROM wishlist_items WHERE user_id = $1 ORDER BY created_at ASC"
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("wishlist_items", e))?;
        let items = rows
            .iter()
            .map(wishlist_item_from_row)
            .collect::<StoreResult<Vec<_>>>()?;

        let products = self
            .products_by_ids(items.iter().map(|i| *i.product_id.as_uuid()).collect())
            .await?;
        Ok(join_products(items, products, |item| item.product_id)
            .map(|(item, product)| WishlistLine { item, product })
            .collect())
    }

    async fn add_to_wishlist(&self, new: NewWishlistItem) -> StoreResult<WishlistItem> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO wishlist_items (id, user_id, product_id, created_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (user_id, product_id) DO NOTHING
            RETURNING {WISHLIST_COLUMNS}
            "#
        ))
        .bind(WishlistItemId::new().as_uuid())
        .bind(new.user_id.as_uuid())
        .bind(new.product_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            if is_fk_violation(&e) {
                StoreError::not_found()
            } else {
                map_sqlx_error("add_to_wishlist", e)
            }
        })?;

        if let Some(row) = row {
            return wishlist_item_from_row(&row);
        }
        // Conflict path: the row already exists, return it.
        let row = sqlx::query(&format!(
            "SELECT {WISHLIST_COLUMNS} FROM wishlist_items WHERE user_id = $1 AND product_id = $2"
        ))
        .bind(new.user_id.as_uuid())
        .bind(new.product_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("add_to_wishlist", e))?;
        wishlist_item_from_row(&row)
    }

    async fn remove_wishlist_item(&self, id: WishlistItemId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM wishlist_items WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("remove_wishlist_item", e))?;
        if result.rows_affected() == 0 {
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
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin", e))?;
        let new_level = apply_movement_tx(
            &mut tx,
            self.policy,
            product_id,
            &movement,
            reason.as_deref(),
            reference.as_deref(),
        )
        .await?;
        tx.commit().await.map_err(|e| map_sqlx_error("commit", e))?;
        Ok(new_level)
    }

    async fn movements(&self, product_id: ProductId) -> StoreResult<Vec<MovementRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {MOVEMENT_COLUMNS} FROM inventory_movements WHERE product_id = $1 \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(product_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("movements", e))?;
        rows.iter().map(movement_from_row).collect()
    }

    async fn low_stock_products(&self) -> StoreResult<Vec<Product>> {
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE is_active = TRUE AND stock <= low_stock_threshold \
             ORDER BY stock ASC, name ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("low_stock_products", e))?;
        rows.iter().map(product_from_row).collect()
    }

    async fn rebuild_stock(&self, product_id: ProductId) -> StoreResult<i64> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin", e))?;
        let row = sqlx::query(
            "SELECT COALESCE(SUM(quantity), 0)::BIGINT AS ledger_sum \
             FROM inventory_movements WHERE product_id = $1",
        )
        .bind(product_id.as_uuid())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("rebuild_stock", e))?;
        let rebuilt: i64 = row.try_get("ledger_sum").map_err(row_err)?;

        let result = sqlx::query("UPDATE products SET stock = $2, updated_at = NOW() WHERE id = $1")
            .bind(product_id.as_uuid())
            .bind(rebuilt)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("rebuild_stock", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found());
        }
        tx.commit().await.map_err(|e| map_sqlx_error("commit", e))?;
        Ok(rebuilt)
    }

    async fn admin_stats(&self) -> StoreResult<AdminStats> {
        let counts = sqlx::query(
            "SELECT \
                 (SELECT COUNT(*) FROM products) AS total_products, \
                 (SELECT COUNT(*) FROM orders) AS total_orders, \
                 (SELECT COUNT(*) FROM users) AS total_users, \
                 (SELECT COALESCE(SUM(total_amount), 0) FROM orders WHERE payment_status = 'paid') \
                     AS total_revenue",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("admin_stats", e))?;

        let recent = self
            .list_orders(&OrderFilter {
                limit: Some(5),
                ..Default::default()
            })
            .await?;

        Ok(AdminStats {
            total_products: counts.try_get("total_products").map_err(row_err)?,
            total_orders: counts.try_get("total_orders").map_err(row_err)?,
            total_users: counts.try_get("total_users").map_err(row_err)?,
            total_revenue: counts.try_get::<Decimal, _>("total_revenue").map_err(row_err)?,
            recent_orders: recent.items,
        })
    }
}

/// Apply a movement inside an open transaction: conditional stock update plus
/// the matching ledger row. Returns the new stock level.
async fn apply_movement_tx(
    tx: &mut Transaction<'_, Postgres>,
    policy: OversellPolicy,
    product_id: ProductId,
    movement: &StockMovement,
    reason: Option<&str>,
    reference: Option<&str>,
) -> StoreResult<i64> {
    let delta = movement.signed_delta();
    let update = match policy {
        OversellPolicy::Reject => {
            sqlx::query(
                "UPDATE products SET stock = stock + $2, updated_at = NOW() \
                 WHERE id = $1 AND stock + $2 >= 0 RETURNING stock",
            )
        }
        OversellPolicy::AllowNegative => {
            sqlx::query(
                "UPDATE products SET stock = stock + $2, updated_at = NOW() \
                 WHERE id = $1 RETURNING stock",
            )
        }
    };
    let row = update
        .bind(product_id.as_uuid())
        .bind(delta)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("apply_movement", e))?;

    let new_level = match row {
        Some(row) => row.try_get::<i64, _>("stock").map_err(row_err)?,
        None => {
            // Distinguish a missing product from a failed conditional update.
            let available = sqlx::query("SELECT stock FROM products WHERE id = $1")
                .bind(product_id.as_uuid())
                .fetch_optional(&mut **tx)
                .await
                .map_err(|e| map_sqlx_error("apply_movement", e))?;
            return Err(match available {
                Some(row) => {
                    let available: i64 = row.try_get("stock").map_err(row_err)?;
                    DomainError::insufficient_stock(-delta, available).into()
                }
                None => StoreError::not_found(),
            });
        }
    };

    sqlx::query(
        "INSERT INTO inventory_movements \
             (id, product_id, movement_type, quantity, reason, reference, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, NOW())",
    )
    .bind(MovementId::new().as_uuid())
    .bind(product_id.as_uuid())
    .bind(movement.kind().as_str())
    .bind(delta)
    .bind(reason)
    .bind(reference)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("record_movement", e))?;

    Ok(new_level)
}

fn apply_product_filter(query: &mut QueryBuilder<'_, Postgres>, filter: &ProductFilter) {
    query.push(" WHERE TRUE");
    if let Some(category_id) = filter.category_id {
        query.push(" AND category_id = ").push_bind(*category_id.as_uuid());
    }
    if let Some(is_active) = filter.is_active {
        query.push(" AND is_active = ").push_bind(is_active);
    }
    if let Some(is_featured) = filter.is_featured {
        query.push(" AND is_featured = ").push_bind(is_featured);
    }
    if let Some(search) = &filter.search {
        let pattern = format!("%{search}%");
        query
            .push(" AND (name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

fn apply_order_filter(query: &mut QueryBuilder<'_, Postgres>, filter: &OrderFilter) {
    query.push(" WHERE TRUE");
    if let Some(user_id) = filter.user_id {
        query.push(" AND user_id = ").push_bind(*user_id.as_uuid());
    }
    if let Some(status) = filter.status {
        query.push(" AND status = ").push_bind(status.as_str());
    }
}

fn join_products<T, F>(items: Vec<T>, products: Vec<Product>, key: F) -> impl Iterator<Item = (T, Product)>
where
    F: Fn(&T) -> ProductId,
{
    let by_id: std::collections::HashMap<ProductId, Product> =
        products.into_iter().map(|p| (p.id, p)).collect();
    items.into_iter().filter_map(move |item| {
        let product = by_id.get(&key(&item)).cloned()?;
        Some((item, product))
    })
}

fn map_sqlx_error(operation: &str, e: sqlx::Error) -> StoreError {
    StoreError::backend(format!("{operation} failed: {e}"))
}

fn map_insert_item_error(e: sqlx::Error) -> StoreError {
    // A missing product surfaces as a foreign-key violation on order_items.
    if is_fk_violation(&e) {
        StoreError::not_found()
    } else {
        map_sqlx_error("insert order item", e)
    }
}

fn row_err(e: sqlx::Error) -> StoreError {
    StoreError::backend(format!("row decode failed: {e}"))
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| code == "23505")
}

fn is_unique_violation_on(e: &sqlx::Error, column: &str) -> bool {
    is_unique_violation(e)
        && e.as_database_error()
            .and_then(|db| db.constraint())
            .is_some_and(|constraint| constraint.contains(column))
}

fn is_fk_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| code == "23503")
}

fn user_from_row(row: &PgRow) -> StoreResult<User> {
    Ok(User {
        id: UserId::from_uuid(row.try_get("id").map_err(row_err)?),
        email: row.try_get("email").map_err(row_err)?,
        first_name: row.try_get("first_name").map_err(row_err)?,
        last_name: row.try_get("last_name").map_err(row_err)?,
        is_admin: row.try_get("is_admin").map_err(row_err)?,
        created_at: row.try_get("created_at").map_err(row_err)?,
        updated_at: row.try_get("updated_at").map_err(row_err)?,
    })
}

fn category_from_row(row: &PgRow) -> StoreResult<Category> {
    Ok(Category {
        id: CategoryId::from_uuid(row.try_get("id").map_err(row_err)?),
        name: row.try_get("name").map_err(row_err)?,
        slug: row.try_get("slug").map_err(row_err)?,
        description: row.try_get("description").map_err(row_err)?,
        created_at: row.try_get("created_at").map_err(row_err)?,
    })
}

fn product_from_row(row: &PgRow) -> StoreResult<Product> {
    let images: serde_json::Value = row.try_get("images").map_err(row_err)?;
    let images: Vec<String> = serde_json::from_value(images)
        .map_err(|e| StoreError::backend(format!("corrupt images column: {e}")))?;
    let category_id: Option<Uuid> = row.try_get("category_id").map_err(row_err)?;
    Ok(Product {
        id: ProductId::from_uuid(row.try_get("id").map_err(row_err)?),
        name: row.try_get("name").map_err(row_err)?,
        slug: row.try_get("slug").map_err(row_err)?,
        description: row.try_get("description").map_err(row_err)?,
        short_description: row.try_get("short_description").map_err(row_err)?,
        price: row.try_get("price").map_err(row_err)?,
        compare_price: row.try_get("compare_price").map_err(row_err)?,
        sku: row.try_get("sku").map_err(row_err)?,
        stock: row.try_get("stock").map_err(row_err)?,
        low_stock_threshold: row.try_get("low_stock_threshold").map_err(row_err)?,
        images,
        category_id: category_id.map(CategoryId::from_uuid),
        material: row.try_get("material").map_err(row_err)?,
        weight: row.try_get("weight").map_err(row_err)?,
        dimensions: row.try_get("dimensions").map_err(row_err)?,
        is_active: row.try_get("is_active").map_err(row_err)?,
        is_featured: row.try_get("is_featured").map_err(row_err)?,
        created_at: row.try_get("created_at").map_err(row_err)?,
        updated_at: row.try_get("updated_at").map_err(row_err)?,
    })
}

fn order_from_row(row: &PgRow) -> StoreResult<Order> {
    let status: String = row.try_get("status").map_err(row_err)?;
    let payment_status: String = row.try_get("payment_status").map_err(row_err)?;
    let address: serde_json::Value = row.try_get("shipping_address").map_err(row_err)?;
    Ok(Order {
        id: OrderId::from_uuid(row.try_get("id").map_err(row_err)?),
        order_number: row.try_get("order_number").map_err(row_err)?,
        user_id: UserId::from_uuid(row.try_get("user_id").map_err(row_err)?),
        status: status
            .parse()
            .map_err(|e| StoreError::backend(format!("corrupt status column: {e}")))?,
        payment_status: payment_status
            .parse()
            .map_err(|e| StoreError::backend(format!("corrupt payment_status column: {e}")))?,
        payment_method: row.try_get("payment_method").map_err(row_err)?,
        subtotal: row.try_get("subtotal").map_err(row_err)?,
        tax: row.try_get("tax").map_err(row_err)?,
        shipping_cost: row.try_get("shipping_cost").map_err(row_err)?,
        discount: row.try_get("discount").map_err(row_err)?,
        total_amount: row.try_get("total_amount").map_err(row_err)?,
        shipping_address: serde_json::from_value(address)
            .map_err(|e| StoreError::backend(format!("corrupt shipping_address column: {e}")))?,
        notes: row.try_get("notes").map_err(row_err)?,
        created_at: row.try_get("created_at").map_err(row_err)?,
        updated_at: row.try_get("updated_at").map_err(row_err)?,
    })
}

fn order_item_from_row(row: &PgRow) -> StoreResult<OrderItem> {
    Ok(OrderItem {
        id: OrderItemId::from_uuid(row.try_get("id").map_err(row_err)?),
        order_id: OrderId::from_uuid(row.try_get("order_id").map_err(row_err)?),
        product_id: ProductId::from_uuid(row.try_get("product_id").map_err(row_err)?),
        quantity: row.try_get("quantity").map_err(row_err)?,
        price: row.try_get("price").map_err(row_err)?,
        created_at: row.try_get("created_at").map_err(row_err)?,
    })
}

fn movement_from_row(row: &PgRow) -> StoreResult<MovementRecord> {
    let kind: String = row.try_get("movement_type").map_err(row_err)?;
    Ok(MovementRecord {
        id: MovementId::from_uuid(row.try_get("id").map_err(row_err)?),
        product_id: ProductId::from_uuid(row.try_get("product_id").map_err(row_err)?),
        kind: kind
            .parse()
            .map_err(|e| StoreError::backend(format!("corrupt movement_type column: {e}")))?,
        quantity: row.try_get("quantity").map_err(row_err)?,
        reason: row.try_get("reason").map_err(row_err)?,
        reference: row.try_get("reference").map_err(row_err)?,
        created_at: row.try_get("created_at").map_err(row_err)?,
    })
}

fn cart_item_from_row(row: &PgRow) -> StoreResult<CartItem> {
    Ok(CartItem {
        id: CartItemId::from_uuid(row.try_get("id").map_err(row_err)?),
        user_id: UserId::from_uuid(row.try_get("user_id").map_err(row_err)?),
        product_id: ProductId::from_uuid(row.try_get("product_id").map_err(row_err)?),
        quantity: row.try_get("quantity").map_err(row_err)?,
        created_at: row.try_get("created_at").map_err(row_err)?,
        updated_at: row.try_get("updated_at").map_err(row_err)?,
    })
}

fn wishlist_item_from_row(row: &PgRow) -> StoreResult<WishlistItem> {
    Ok(WishlistItem {
        id: WishlistItemId::from_uuid(row.try_get("id").map_err(row_err)?),
        user_id: UserId::from_uuid(row.try_get("user_id").map_err(row_err)?),
        product_id: ProductId::from_uuid(row.try_get("product_id").map_err(row_err)?),
        created_at: row.try_get("created_at").map_err(row_err)?,
    })
}
