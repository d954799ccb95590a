//! Integration tests for the inventory/order consistency core.
//!
//! Exercised against the in-memory backend: checkout atomicity, the audit
//! invariant (one ledger row per stock change, matching signed quantity),
//! low-stock detection, oversell policies, and cart upsert semantics.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use rust_decimal::Decimal;

use aurum_auth::User;
use aurum_cart::NewCartItem;
use aurum_catalog::{NewProduct, Product};
use aurum_core::{DomainError, ProductId, UserId};
use aurum_inventory::{AdjustInventory, MovementKind, OversellPolicy, StockMovement};
use aurum_orders::{NewOrder, NewOrderItem, Order, OrderItem, OrderStatus, ShippingAddress};

use crate::notify::Mailer;
use crate::services::{InventoryService, OrderService};
use crate::storage::{MemoryStorage, Storage, StoreError};

#[derive(Default)]
struct RecordingMailer {
    confirmations: Mutex<Vec<String>>,
    status_updates: Mutex<Vec<(String, OrderStatus, OrderStatus)>>,
}

impl Mailer for RecordingMailer {
    fn order_confirmation(&self, order: &Order, _items: &[OrderItem], _user: &User) {
        self.confirmations
            .lock()
            .unwrap()
            .push(order.order_number.clone());
    }

    fn order_status_update(&self, order: &Order, _user: &User, from: OrderStatus, to: OrderStatus) {
        self.status_updates
            .lock()
            .unwrap()
            .push((order.order_number.clone(), from, to));
    }
}

struct Harness {
    storage: Arc<MemoryStorage>,
    orders: OrderService,
    inventory: InventoryService,
    mailer: Arc<RecordingMailer>,
}

fn harness() -> Harness {
    harness_with_policy(OversellPolicy::Reject)
}

fn harness_with_policy(policy: OversellPolicy) -> Harness {
    let storage = Arc::new(MemoryStorage::with_policy(policy));
    let mailer = Arc::new(RecordingMailer::default());
    Harness {
        orders: OrderService::new(storage.clone(), mailer.clone()),
        inventory: InventoryService::new(storage.clone()),
        storage,
        mailer,
    }
}

async fn seed_user(storage: &MemoryStorage) -> User {
    let user = User::new(
        UserId::new(),
        Some("customer@example.com".to_string()),
        Utc::now(),
    );
    storage.upsert_user(user).await.unwrap()
}

async fn seed_product(
    storage: &MemoryStorage,
    slug: &str,
    stock: i64,
    threshold: i64,
) -> Product {
    let mut new = NewProduct::new(format!("Product {slug}"), slug, "25.00".parse().unwrap());
    new.low_stock_threshold = threshold;
    let product = storage.create_product(new).await.unwrap();
    if stock > 0 {
        storage
            .adjust_stock(
                product.id,
                StockMovement::inbound(stock).unwrap(),
                Some("initial stock".to_string()),
                None,
            )
            .await
            .unwrap();
    }
    storage.get_product(product.id).await.unwrap().unwrap()
}

fn address() -> ShippingAddress {
    ShippingAddress {
        name: "Grace Hopper".to_string(),
        address: "1 Harbor Way".to_string(),
        city: "Arlington".to_string(),
        state: "VA".to_string(),
        zip_code: "22201".to_string(),
        country: "US".to_string(),
    }
}

/// A checkout request with internally consistent totals.
fn checkout(user_id: UserId, items: Vec<(ProductId, i64, &str)>) -> NewOrder {
    let items: Vec<NewOrderItem> = items
        .into_iter()
        .map(|(product_id, quantity, price)| NewOrderItem {
            product_id,
            quantity,
            price: price.parse().unwrap(),
        })
        .collect();
    let subtotal: Decimal = items
        .iter()
        .map(|i| i.price * Decimal::from(i.quantity))
        .sum();
    NewOrder {
        user_id,
        subtotal,
        tax: Decimal::ZERO,
        shipping_cost: Decimal::ZERO,
        discount: Decimal::ZERO,
        total_amount: subtotal,
        shipping_address: address(),
        payment_method: Some("card".to_string()),
        notes: None,
        items,
    }
}

#[tokio::test]
async fn adjustments_keep_stock_equal_to_sum_of_deltas_with_one_ledger_row_each() {
    let h = harness();
    let product = seed_product(&h.storage, "gold-band", 10, 5).await;

    let deltas = [4i64, -3, 7, -6];
    for delta in deltas {
        h.inventory
            .adjust(AdjustInventory {
                product_id: product.id,
                delta,
                reason: "cycle count".to_string(),
            })
            .await
            .unwrap();
    }

    let final_stock = h
        .storage
        .get_product(product.id)
        .await
        .unwrap()
        .unwrap()
        .stock;
    assert_eq!(final_stock, 10 + deltas.iter().sum::<i64>());

    // One row per call (plus the initial inbound), matching signed deltas.
    let movements = h.inventory.movements(product.id).await.unwrap();
    assert_eq!(movements.len(), deltas.len() + 1);
    let recorded: Vec<i64> = movements.iter().rev().skip(1).map(|m| m.quantity).collect();
    assert_eq!(recorded, deltas);
    assert!(
        movements
            .iter()
            .rev()
            .skip(1)
            .all(|m| m.kind == MovementKind::Adjustment)
    );
}

#[tokio::test]
async fn checkout_decrements_stock_and_records_out_movements() {
    let h = harness();
    let user = seed_user(&h.storage).await;
    let product = seed_product(&h.storage, "pearl-strand", 5, 5).await;

    // stock == threshold: the product is already low.
    let low = h.inventory.low_stock().await.unwrap();
    assert!(low.iter().any(|p| p.id == product.id));

    h.storage
        .add_to_cart(NewCartItem {
            user_id: user.id,
            product_id: product.id,
            quantity: 3,
        })
        .await
        .unwrap();

    let placed = h
        .orders
        .place_order(checkout(user.id, vec![(product.id, 3, "25.00")]))
        .await
        .unwrap();

    let stock = h
        .storage
        .get_product(product.id)
        .await
        .unwrap()
        .unwrap()
        .stock;
    assert_eq!(stock, 2);

    let movements = h.inventory.movements(product.id).await.unwrap();
    let out: Vec<_> = movements
        .iter()
        .filter(|m| m.kind == MovementKind::Out)
        .collect();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].quantity, -3);
    assert_eq!(
        out[0].reason.as_deref(),
        Some(format!("Order {}", placed.order.order_number).as_str())
    );
    assert_eq!(
        out[0].reference.as_deref(),
        Some(placed.order.order_number.as_str())
    );

    // Cart was cleared and the confirmation fired.
    assert!(h.storage.cart_items(user.id).await.unwrap().is_empty());
    assert_eq!(
        *h.mailer.confirmations.lock().unwrap(),
        vec![placed.order.order_number.clone()]
    );
}

#[tokio::test]
async fn checkout_is_all_or_nothing_when_one_line_lacks_stock() {
    let h = harness();
    let user = seed_user(&h.storage).await;
    let plentiful = seed_product(&h.storage, "silver-hoops", 10, 5).await;
    let scarce = seed_product(&h.storage, "emerald-ring", 2, 5).await;

    let err = h
        .orders
        .place_order(checkout(
            user.id,
            vec![(plentiful.id, 1, "25.00"), (scarce.id, 5, "25.00")],
        ))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::Domain(DomainError::InsufficientStock {
            requested: 5,
            available: 2
        })
    ));

    // Nothing persisted: no order, no decrement, no out movement.
    let page = h
        .storage
        .list_orders(&crate::storage::OrderFilter::default())
        .await
        .unwrap();
    assert_eq!(page.total, 0);
    let plentiful_now = h.storage.get_product(plentiful.id).await.unwrap().unwrap();
    assert_eq!(plentiful_now.stock, 10);
    let movements = h.inventory.movements(plentiful.id).await.unwrap();
    assert!(movements.iter().all(|m| m.kind != MovementKind::Out));
}

#[tokio::test]
async fn allow_negative_policy_reproduces_legacy_oversell() {
    // Legacy storefront behavior: oversell silently drives stock negative.
    let h = harness_with_policy(OversellPolicy::AllowNegative);
    let user = seed_user(&h.storage).await;
    let product = seed_product(&h.storage, "opal-pendant", 2, 5).await;

    h.orders
        .place_order(checkout(user.id, vec![(product.id, 5, "25.00")]))
        .await
        .unwrap();

    let stock = h
        .storage
        .get_product(product.id)
        .await
        .unwrap()
        .unwrap()
        .stock;
    assert_eq!(stock, -3);

    // The ledger still records the full decrement.
    let movements = h.inventory.movements(product.id).await.unwrap();
    assert_eq!(movements[0].quantity, -5);
}

#[tokio::test]
async fn spec_scenario_low_stock_then_order_then_rejected_oversell() {
    let h = harness();
    let user = seed_user(&h.storage).await;
    let product = seed_product(&h.storage, "ruby-stud", 5, 5).await;

    assert!(
        h.inventory
            .low_stock()
            .await
            .unwrap()
            .iter()
            .any(|p| p.id == product.id)
    );

    h.orders
        .place_order(checkout(user.id, vec![(product.id, 3, "25.00")]))
        .await
        .unwrap();
    let after_first = h.storage.get_product(product.id).await.unwrap().unwrap();
    assert_eq!(after_first.stock, 2);

    let err = h
        .orders
        .place_order(checkout(user.id, vec![(product.id, 5, "25.00")]))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::Domain(DomainError::InsufficientStock { .. })
    ));
    let after_second = h.storage.get_product(product.id).await.unwrap().unwrap();
    assert_eq!(after_second.stock, 2, "rejected order must not touch stock");
}

#[tokio::test]
async fn order_totals_are_immutable_after_creation() {
    let h = harness();
    let user = seed_user(&h.storage).await;
    let product = seed_product(&h.storage, "jade-bracelet", 8, 5).await;

    let placed = h
        .orders
        .place_order(checkout(user.id, vec![(product.id, 2, "42.50")]))
        .await
        .unwrap();

    let first_read = h.storage.get_order(placed.order.id).await.unwrap().unwrap();
    h.orders
        .update_status(placed.order.id, OrderStatus::Processing)
        .await
        .unwrap();
    let second_read = h.storage.get_order(placed.order.id).await.unwrap().unwrap();

    assert_eq!(first_read.order.total_amount, second_read.order.total_amount);
    assert_eq!(first_read.order.subtotal, second_read.order.subtotal);
    assert_eq!(
        first_read.order.shipping_address,
        second_read.order.shipping_address
    );
    assert_eq!(
        first_read.order.order_number,
        second_read.order.order_number
    );
}

#[tokio::test]
async fn status_transitions_are_validated_and_announced_once() {
    let h = harness();
    let user = seed_user(&h.storage).await;
    let product = seed_product(&h.storage, "topaz-ring", 4, 2).await;

    let placed = h
        .orders
        .place_order(checkout(user.id, vec![(product.id, 1, "25.00")]))
        .await
        .unwrap();

    // Illegal jump straight to delivered.
    let err = h
        .orders
        .update_status(placed.order.id, OrderStatus::Delivered)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Domain(DomainError::Conflict(_))));

    // Legal move fires exactly one announcement.
    h.orders
        .update_status(placed.order.id, OrderStatus::Processing)
        .await
        .unwrap();
    // Same-status update is a silent no-op.
    h.orders
        .update_status(placed.order.id, OrderStatus::Processing)
        .await
        .unwrap();

    let updates = h.mailer.status_updates.lock().unwrap();
    assert_eq!(
        *updates,
        vec![(
            placed.order.order_number.clone(),
            OrderStatus::Pending,
            OrderStatus::Processing
        )]
    );
}

#[tokio::test]
async fn cart_upsert_increments_quantity_instead_of_duplicating() {
    let h = harness();
    let user = seed_user(&h.storage).await;
    let product = seed_product(&h.storage, "amber-brooch", 10, 5).await;

    h.storage
        .add_to_cart(NewCartItem {
            user_id: user.id,
            product_id: product.id,
            quantity: 2,
        })
        .await
        .unwrap();
    let merged = h
        .storage
        .add_to_cart(NewCartItem {
            user_id: user.id,
            product_id: product.id,
            quantity: 3,
        })
        .await
        .unwrap();

    assert_eq!(merged.quantity, 5);
    let lines = h.storage.cart_items(user.id).await.unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].item.quantity, 5);
}

#[tokio::test]
async fn rebuild_realigns_the_stock_projection_with_the_ledger() {
    let h = harness();
    let product = seed_product(&h.storage, "onyx-cufflinks", 6, 5).await;
    h.inventory
        .adjust(AdjustInventory {
            product_id: product.id,
            delta: -2,
            reason: "display samples".to_string(),
        })
        .await
        .unwrap();

    // Simulate projection drift, then repair from the ledger.
    h.storage.corrupt_stock(product.id, 999);
    let rebuilt = h.inventory.rebuild(product.id).await.unwrap();
    assert_eq!(rebuilt, 4);
    let product_now = h.storage.get_product(product.id).await.unwrap().unwrap();
    assert_eq!(product_now.stock, 4);

    // Repair records no movement: history is untouched.
    assert_eq!(h.inventory.movements(product.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn low_stock_is_ordered_most_urgent_first() {
    let h = harness();
    let empty = seed_product(&h.storage, "citrine-charm", 0, 5).await;
    let at_threshold = seed_product(&h.storage, "garnet-band", 5, 5).await;
    let healthy = seed_product(&h.storage, "quartz-necklace", 6, 5).await;
    let inactive = seed_product(&h.storage, "retired-piece", 1, 5).await;
    h.storage
        .update_product(
            inactive.id,
            aurum_catalog::ProductPatch {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let low = h.inventory.low_stock().await.unwrap();
    let ids: Vec<ProductId> = low.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![empty.id, at_threshold.id]);
    assert!(!ids.contains(&healthy.id));
    assert!(!ids.contains(&inactive.id));
}

#[tokio::test]
async fn movements_list_newest_first() {
    let h = harness();
    let product = seed_product(&h.storage, "lapis-ring", 3, 5).await;
    h.inventory
        .adjust(AdjustInventory {
            product_id: product.id,
            delta: 2,
            reason: "restock".to_string(),
        })
        .await
        .unwrap();

    let movements = h.inventory.movements(product.id).await.unwrap();
    assert_eq!(movements.len(), 2);
    assert_eq!(movements[0].kind, MovementKind::Adjustment);
    assert_eq!(movements[1].kind, MovementKind::In);
}

#[tokio::test]
async fn adjusting_a_missing_product_is_not_found() {
    let h = harness();
    let err = h
        .inventory
        .adjust(AdjustInventory {
            product_id: ProductId::new(),
            delta: 1,
            reason: "ghost".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Domain(DomainError::NotFound)));
}
