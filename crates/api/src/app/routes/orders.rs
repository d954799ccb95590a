use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
};

use aurum_core::OrderId;
use aurum_infra::OrderFilter;

use crate::app::routes::common;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::AuthContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_orders).post(create_order))
        .route("/:id", get(get_order))
        .route("/:id/status", put(update_order_status))
}

pub async fn list_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<dto::OrderListQuery>,
) -> axum::response::Response {
    let user = match common::current_user(&services, &auth).await {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    // Admins see every order; everyone else only their own.
    let filter = OrderFilter {
        user_id: if user.is_admin { None } else { Some(user.id) },
        status: query.status,
        limit: Some(query.limit.unwrap_or(20)),
        offset: Some(query.offset.unwrap_or(0)),
    };

    match services.storage().list_orders(&filter).await {
        Ok(page) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "orders": page.items.iter().map(dto::order_to_json).collect::<Vec<_>>(),
                "total": page.total,
            })),
        )
            .into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let user = match common::current_user(&services, &auth).await {
        Ok(user) => user,
        Err(resp) => return resp,
    };
    let id: OrderId = match common::parse_id(&id, "order") {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.storage().get_order(id).await {
        Ok(Some(order)) => {
            if order.order.user_id != user.id && !user.is_admin {
                return errors::json_error(StatusCode::FORBIDDEN, "forbidden", "access denied");
            }
            (StatusCode::OK, Json(dto::order_to_json(&order))).into_response()
        }
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "order not found"),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn create_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(auth): Extension<AuthContext>,
    Json(body): Json<dto::CreateOrderRequest>,
) -> axum::response::Response {
    let user = match common::current_user(&services, &auth).await {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    match services.orders().place_order(body.into_new_order(user.id)).await {
        Ok(placed) => (StatusCode::CREATED, Json(dto::order_to_json(&placed))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn update_order_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateOrderStatusRequest>,
) -> axum::response::Response {
    if let Err(resp) = common::require_admin_user(&services, &auth).await {
        return resp;
    }
    let id: OrderId = match common::parse_id(&id, "order") {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.orders().update_status(id, body.status).await {
        Ok(order) => (StatusCode::OK, Json(dto::order_header_to_json(&order))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
