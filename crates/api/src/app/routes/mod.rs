use axum::{Router, routing::get};

pub mod admin;
pub mod auth;
pub mod cart;
pub mod categories;
pub mod common;
pub mod orders;
pub mod products;
pub mod system;
pub mod wishlist;

/// Routes reachable without a bearer token.
pub fn public_router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .nest("/api/products", products::public_router())
        .nest("/api/categories", categories::public_router())
}

/// Routes behind the auth middleware. Admin-only handlers additionally check
/// the stored user record.
pub fn protected_router() -> Router {
    Router::new()
        .nest("/api/auth", auth::router())
        .nest("/api/orders", orders::router())
        .nest("/api/cart", cart::router())
        .nest("/api/wishlist", wishlist::router())
        .nest("/api/admin", admin::router())
        .nest("/api/products", products::admin_router())
        .nest("/api/categories", categories::admin_router())
}
