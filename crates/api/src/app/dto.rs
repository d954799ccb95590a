use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Value as JsonValue, json};

use aurum_auth::User;
use aurum_catalog::{
    Category, CategoryPatch, NewCategory, NewProduct, Product, ProductPatch,
    DEFAULT_LOW_STOCK_THRESHOLD,
};
use aurum_cart::{CartItem, WishlistItem};
use aurum_core::{CategoryId, ProductId, UserId};
use aurum_inventory::MovementRecord;
use aurum_infra::{AdminStats, CartLine, OrderWithItems, WishlistLine};
use aurum_orders::{NewOrder, NewOrderItem, Order, OrderItem, OrderStatus, ShippingAddress};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductListQuery {
    pub category_id: Option<CategoryId>,
    pub search: Option<String>,
    pub is_active: Option<bool>,
    pub is_featured: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderListQuery {
    pub status: Option<OrderStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub short_description: Option<String>,
    pub price: Decimal,
    pub compare_price: Option<Decimal>,
    pub sku: Option<String>,
    pub low_stock_threshold: Option<i64>,
    #[serde(default)]
    pub images: Vec<String>,
    pub category_id: Option<CategoryId>,
    pub material: Option<String>,
    pub weight: Option<Decimal>,
    pub dimensions: Option<String>,
    pub is_active: Option<bool>,
    pub is_featured: Option<bool>,
}

impl CreateProductRequest {
    pub fn into_new_product(self) -> NewProduct {
        NewProduct {
            name: self.name,
            slug: self.slug,
            description: self.description,
            short_description: self.short_description,
            price: self.price,
            compare_price: self.compare_price,
            sku: self.sku,
            low_stock_threshold: self
                .low_stock_threshold
                .unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD),
            images: self.images,
            category_id: self.category_id,
            material: self.material,
            weight: self.weight,
            dimensions: self.dimensions,
            is_active: self.is_active.unwrap_or(true),
            is_featured: self.is_featured.unwrap_or(false),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub short_description: Option<String>,
    pub price: Option<Decimal>,
    pub compare_price: Option<Decimal>,
    pub sku: Option<String>,
    pub low_stock_threshold: Option<i64>,
    pub images: Option<Vec<String>>,
    pub category_id: Option<CategoryId>,
    pub material: Option<String>,
    pub weight: Option<Decimal>,
    pub dimensions: Option<String>,
    pub is_active: Option<bool>,
    pub is_featured: Option<bool>,
}

impl UpdateProductRequest {
    pub fn into_patch(self) -> ProductPatch {
        ProductPatch {
            name: self.name,
            slug: self.slug,
            description: self.description,
            short_description: self.short_description,
            price: self.price,
            compare_price: self.compare_price,
            sku: self.sku,
            low_stock_threshold: self.low_stock_threshold,
            images: self.images,
            category_id: self.category_id,
            material: self.material,
            weight: self.weight,
            dimensions: self.dimensions,
            is_active: self.is_active,
            is_featured: self.is_featured,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
}

impl CreateCategoryRequest {
    pub fn into_new_category(self) -> NewCategory {
        NewCategory {
            name: self.name,
            slug: self.slug,
            description: self.description,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
}

impl UpdateCategoryRequest {
    pub fn into_patch(self) -> CategoryPatch {
        CategoryPatch {
            name: self.name,
            slug: self.slug,
            description: self.description,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddressRequest {
    pub name: String,
    pub address: String,
    pub city: String,
    #[serde(default)]
    pub state: String,
    pub zip_code: String,
    pub country: String,
}

impl ShippingAddressRequest {
    pub fn into_address(self) -> ShippingAddress {
        ShippingAddress {
            name: self.name,
            address: self.address,
            city: self.city,
            state: self.state,
            zip_code: self.zip_code,
            country: self.country,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRequest {
    pub product_id: ProductId,
    pub quantity: i64,
    pub price: Decimal,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub total_amount: Decimal,
    pub subtotal: Decimal,
    #[serde(default)]
    pub tax: Decimal,
    #[serde(default)]
    pub shipping_cost: Decimal,
    #[serde(default)]
    pub discount: Decimal,
    pub shipping_address: ShippingAddressRequest,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
    pub items: Vec<OrderItemRequest>,
}

impl CreateOrderRequest {
    pub fn into_new_order(self, user_id: UserId) -> NewOrder {
        NewOrder {
            user_id,
            subtotal: self.subtotal,
            tax: self.tax,
            shipping_cost: self.shipping_cost,
            discount: self.discount,
            total_amount: self.total_amount,
            shipping_address: self.shipping_address.into_address(),
            payment_method: self.payment_method,
            notes: self.notes,
            items: self
                .items
                .into_iter()
                .map(|item| NewOrderItem {
                    product_id: item.product_id,
                    quantity: item.quantity,
                    price: item.price,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    pub product_id: ProductId,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCartItemRequest {
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToWishlistRequest {
    pub product_id: ProductId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustInventoryRequest {
    pub product_id: ProductId,
    pub quantity: i64,
    pub reason: String,
}

// -------------------------
// JSON mapping helpers
// -------------------------

pub fn user_to_json(user: &User) -> JsonValue {
    json!({
        "id": user.id.to_string(),
        "email": user.email,
        "firstName": user.first_name,
        "lastName": user.last_name,
        "isAdmin": user.is_admin,
        "createdAt": user.created_at.to_rfc3339(),
        "updatedAt": user.updated_at.to_rfc3339(),
    })
}

pub fn category_to_json(category: &Category) -> JsonValue {
    json!({
        "id": category.id.to_string(),
        "name": category.name,
        "slug": category.slug,
        "description": category.description,
        "createdAt": category.created_at.to_rfc3339(),
    })
}

pub fn product_to_json(product: &Product) -> JsonValue {
    json!({
        "id": product.id.to_string(),
        "name": product.name,
        "slug": product.slug,
        "description": product.description,
        "shortDescription": product.short_description,
        "price": product.price.to_string(),
        "comparePrice": product.compare_price.map(|d| d.to_string()),
        "sku": product.sku,
        "stock": product.stock,
        "lowStockThreshold": product.low_stock_threshold,
        "images": product.images,
        "categoryId": product.category_id.map(|id| id.to_string()),
        "material": product.material,
        "weight": product.weight.map(|d| d.to_string()),
        "dimensions": product.dimensions,
        "isActive": product.is_active,
        "isFeatured": product.is_featured,
        "createdAt": product.created_at.to_rfc3339(),
        "updatedAt": product.updated_at.to_rfc3339(),
    })
}

pub fn order_header_to_json(order: &Order) -> JsonValue {
    json!({
        "id": order.id.to_string(),
        "orderNumber": order.order_number,
        "userId": order.user_id.to_string(),
        "status": order.status.as_str(),
        "paymentStatus": order.payment_status.as_str(),
        "paymentMethod": order.payment_method,
        "subtotal": order.subtotal.to_string(),
        "tax": order.tax.to_string(),
        "shippingCost": order.shipping_cost.to_string(),
        "discount": order.discount.to_string(),
        "totalAmount": order.total_amount.to_string(),
        "shippingAddress": {
            "name": order.shipping_address.name,
            "address": order.shipping_address.address,
            "city": order.shipping_address.city,
            "state": order.shipping_address.state,
            "zipCode": order.shipping_address.zip_code,
            "country": order.shipping_address.country,
        },
        "notes": order.notes,
        "createdAt": order.created_at.to_rfc3339(),
        "updatedAt": order.updated_at.to_rfc3339(),
    })
}

pub fn order_item_to_json(item: &OrderItem) -> JsonValue {
    json!({
        "id": item.id.to_string(),
        "orderId": item.order_id.to_string(),
        "productId": item.product_id.to_string(),
        "quantity": item.quantity,
        "price": item.price.to_string(),
        "createdAt": item.created_at.to_rfc3339(),
    })
}

pub fn order_to_json(order: &OrderWithItems) -> JsonValue {
    let mut value = order_header_to_json(&order.order);
    value["items"] = JsonValue::Array(order.items.iter().map(order_item_to_json).collect());
    value
}

pub fn cart_item_to_json(item: &CartItem) -> JsonValue {
    json!({
        "id": item.id.to_string(),
        "userId": item.user_id.to_string(),
        "productId": item.product_id.to_string(),
        "quantity": item.quantity,
        "createdAt": item.created_at.to_rfc3339(),
        "updatedAt": item.updated_at.to_rfc3339(),
    })
}

pub fn cart_line_to_json(line: &CartLine) -> JsonValue {
    let mut value = cart_item_to_json(&line.item);
    value["product"] = product_to_json(&line.product);
    value
}

pub fn wishlist_item_to_json(item: &WishlistItem) -> JsonValue {
    json!({
        "id": item.id.to_string(),
        "userId": item.user_id.to_string(),
        "productId": item.product_id.to_string(),
        "createdAt": item.created_at.to_rfc3339(),
    })
}

pub fn wishlist_line_to_json(line: &WishlistLine) -> JsonValue {
    let mut value = wishlist_item_to_json(&line.item);
    value["product"] = product_to_json(&line.product);
    value
}

pub fn movement_to_json(movement: &MovementRecord) -> JsonValue {
    json!({
        "id": movement.id.to_string(),
        "productId": movement.product_id.to_string(),
        "type": movement.kind.as_str(),
        "quantity": movement.quantity,
        "reason": movement.reason,
        "reference": movement.reference,
        "createdAt": movement.created_at.to_rfc3339(),
    })
}

pub fn stats_to_json(stats: &AdminStats) -> JsonValue {
    json!({
        "totalProducts": stats.total_products,
        "totalOrders": stats.total_orders,
        "totalUsers": stats.total_users,
        "totalRevenue": stats.total_revenue.to_string(),
        "recentOrders": stats.recent_orders.iter().map(order_to_json).collect::<Vec<_>>(),
    })
}
