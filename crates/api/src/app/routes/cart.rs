use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
};

use aurum_cart::NewCartItem;
use aurum_core::CartItemId;

use crate::app::routes::common;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::AuthContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(get_cart).post(add_to_cart).delete(clear_cart))
        .route("/:id", put(update_cart_item).delete(remove_cart_item))
}

pub async fn get_cart(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(auth): Extension<AuthContext>,
) -> axum::response::Response {
    match services.storage().cart_items(auth.user_id()).await {
        Ok(lines) => (
            StatusCode::OK,
            Json(lines.iter().map(dto::cart_line_to_json).collect::<Vec<_>>()),
        )
            .into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn add_to_cart(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(auth): Extension<AuthContext>,
    Json(body): Json<dto::AddToCartRequest>,
) -> axum::response::Response {
    let new = NewCartItem {
        user_id: auth.user_id(),
        product_id: body.product_id,
        quantity: body.quantity,
    };

    match services.storage().add_to_cart(new).await {
        Ok(item) => (StatusCode::OK, Json(dto::cart_item_to_json(&item))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn update_cart_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateCartItemRequest>,
) -> axum::response::Response {
    let id: CartItemId = match common::parse_id(&id, "cart item") {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.storage().set_cart_quantity(id, body.quantity).await {
        Ok(item) => (StatusCode::OK, Json(dto::cart_item_to_json(&item))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn remove_cart_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: CartItemId = match common::parse_id(&id, "cart item") {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.storage().remove_cart_item(id).await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({ "message": "item removed from cart" })),
        )
            .into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn clear_cart(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(auth): Extension<AuthContext>,
) -> axum::response::Response {
    match services.storage().clear_cart(auth.user_id()).await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({ "message": "cart cleared" })),
        )
            .into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
