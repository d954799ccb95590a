//! Checkout-path benchmarks against the in-memory backend.

use std::sync::Arc;

use criterion::{Criterion, criterion_group, criterion_main};
use rust_decimal::Decimal;
use tokio::runtime::Runtime;

use aurum_catalog::NewProduct;
use aurum_core::UserId;
use aurum_infra::{LogMailer, MemoryStorage, OrderService, Storage};
use aurum_inventory::StockMovement;
use aurum_orders::{NewOrder, NewOrderItem, ShippingAddress};

fn place_order_benchmark(c: &mut Criterion) {
    let rt = Runtime::new().expect("tokio runtime");
    let storage = Arc::new(MemoryStorage::new());
    let service = OrderService::new(storage.clone(), Arc::new(LogMailer));
    let user_id = UserId::new();

    let product = rt.block_on(async {
        let product = storage
            .create_product(NewProduct::new(
                "Bench Ring",
                "bench-ring",
                "25.00".parse().unwrap(),
            ))
            .await
            .unwrap();
        storage
            .adjust_stock(
                product.id,
                StockMovement::inbound(10_000_000).unwrap(),
                Some("bench seed".to_string()),
                None,
            )
            .await
            .unwrap();
        product
    });

    let price: Decimal = "25.00".parse().unwrap();
    let address = ShippingAddress {
        name: "Bench".to_string(),
        address: "1 Bench Way".to_string(),
        city: "Benchville".to_string(),
        state: "BN".to_string(),
        zip_code: "00000".to_string(),
        country: "US".to_string(),
    };

    c.bench_function("place_order_single_line", |b| {
        b.iter(|| {
            rt.block_on(service.place_order(NewOrder {
                user_id,
                subtotal: price,
                tax: Decimal::ZERO,
                shipping_cost: Decimal::ZERO,
                discount: Decimal::ZERO,
                total_amount: price,
                shipping_address: address.clone(),
                payment_method: None,
                notes: None,
                items: vec![NewOrderItem {
                    product_id: product.id,
                    quantity: 1,
                    price,
                }],
            }))
            .unwrap()
        })
    });
}

criterion_group!(benches, place_order_benchmark);
criterion_main!(benches);
