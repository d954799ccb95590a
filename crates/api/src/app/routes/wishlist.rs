use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get},
};

use aurum_cart::NewWishlistItem;
use aurum_core::WishlistItemId;

use crate::app::routes::common;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::AuthContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(get_wishlist).post(add_to_wishlist))
        .route("/:id", delete(remove_wishlist_item))
}

pub async fn get_wishlist(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(auth): Extension<AuthContext>,
) -> axum::response::Response {
    match services.storage().wishlist_items(auth.user_id()).await {
        Ok(lines) => (
            StatusCode::OK,
            Json(
                lines
                    .iter()
                    .map(dto::wishlist_line_to_json)
                    .collect::<Vec<_>>(),
            ),
        )
            .into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn add_to_wishlist(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(auth): Extension<AuthContext>,
    Json(body): Json<dto::AddToWishlistRequest>,
) -> axum::response::Response {
    let new = NewWishlistItem {
        user_id: auth.user_id(),
        product_id: body.product_id,
    };

    match services.storage().add_to_wishlist(new).await {
        Ok(item) => (StatusCode::OK, Json(dto::wishlist_item_to_json(&item))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn remove_wishlist_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: WishlistItemId = match common::parse_id(&id, "wishlist item") {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.storage().remove_wishlist_item(id).await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({ "message": "item removed from wishlist" })),
        )
            .into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
