use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use aurum_core::ProductId;
use aurum_inventory::AdjustInventory;

use crate::app::routes::common;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::AuthContext;

pub fn router() -> Router {
    Router::new()
        .route("/stats", get(get_stats))
        .route("/inventory/low-stock", get(get_low_stock))
        .route("/inventory/movements/:product_id", get(get_movements))
        .route("/inventory/adjust", post(adjust_inventory))
        .route("/inventory/rebuild/:product_id", post(rebuild_stock))
}

pub async fn get_stats(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(auth): Extension<AuthContext>,
) -> axum::response::Response {
    if let Err(resp) = common::require_admin_user(&services, &auth).await {
        return resp;
    }

    match services.storage().admin_stats().await {
        Ok(stats) => (StatusCode::OK, Json(dto::stats_to_json(&stats))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_low_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(auth): Extension<AuthContext>,
) -> axum::response::Response {
    if let Err(resp) = common::require_admin_user(&services, &auth).await {
        return resp;
    }

    match services.inventory().low_stock().await {
        Ok(products) => (
            StatusCode::OK,
            Json(products.iter().map(dto::product_to_json).collect::<Vec<_>>()),
        )
            .into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_movements(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(auth): Extension<AuthContext>,
    Path(product_id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = common::require_admin_user(&services, &auth).await {
        return resp;
    }
    let product_id: ProductId = match common::parse_id(&product_id, "product") {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.inventory().movements(product_id).await {
        Ok(movements) => (
            StatusCode::OK,
            Json(
                movements
                    .iter()
                    .map(dto::movement_to_json)
                    .collect::<Vec<_>>(),
            ),
        )
            .into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn adjust_inventory(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(auth): Extension<AuthContext>,
    Json(body): Json<dto::AdjustInventoryRequest>,
) -> axum::response::Response {
    if let Err(resp) = common::require_admin_user(&services, &auth).await {
        return resp;
    }

    let request = AdjustInventory {
        product_id: body.product_id,
        delta: body.quantity,
        reason: body.reason,
    };

    match services.inventory().adjust(request).await {
        Ok(new_level) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "message": "inventory adjusted",
                "stock": new_level,
            })),
        )
            .into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn rebuild_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(auth): Extension<AuthContext>,
    Path(product_id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = common::require_admin_user(&services, &auth).await {
        return resp;
    }
    let product_id: ProductId = match common::parse_id(&product_id, "product") {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.inventory().rebuild(product_id).await {
        Ok(stock) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "message": "stock rebuilt from ledger",
                "stock": stock,
            })),
        )
            .into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
