use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};

use aurum_catalog::ProductFilter;
use aurum_core::ProductId;

use crate::app::routes::common;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::AuthContext;

pub fn public_router() -> Router {
    Router::new()
        .route("/", get(list_products))
        .route("/slug/:slug", get(get_product_by_slug))
        .route("/:id", get(get_product))
}

pub fn admin_router() -> Router {
    Router::new()
        .route("/", post(create_product))
        .route("/:id", put(update_product).delete(delete_product))
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::ProductListQuery>,
) -> axum::response::Response {
    let filter = ProductFilter {
        category_id: query.category_id,
        search: query.search,
        is_active: query.is_active,
        is_featured: query.is_featured,
        limit: Some(query.limit.unwrap_or(20)),
        offset: Some(query.offset.unwrap_or(0)),
    };

    match services.storage().list_products(&filter).await {
        Ok(page) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "products": page.items.iter().map(dto::product_to_json).collect::<Vec<_>>(),
                "total": page.total,
            })),
        )
            .into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: ProductId = match common::parse_id(&id, "product") {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.storage().get_product(id).await {
        Ok(Some(product)) => (StatusCode::OK, Json(dto::product_to_json(&product))).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "product not found"),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_product_by_slug(
    Extension(services): Extension<Arc<AppServices>>,
    Path(slug): Path<String>,
) -> axum::response::Response {
    match services.storage().get_product_by_slug(&slug).await {
        Ok(Some(product)) => (StatusCode::OK, Json(dto::product_to_json(&product))).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "product not found"),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(auth): Extension<AuthContext>,
    Json(body): Json<dto::CreateProductRequest>,
) -> axum::response::Response {
    if let Err(resp) = common::require_admin_user(&services, &auth).await {
        return resp;
    }

    match services.storage().create_product(body.into_new_product()).await {
        Ok(product) => (StatusCode::CREATED, Json(dto::product_to_json(&product))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateProductRequest>,
) -> axum::response::Response {
    if let Err(resp) = common::require_admin_user(&services, &auth).await {
        return resp;
    }
    let id: ProductId = match common::parse_id(&id, "product") {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.storage().update_product(id, body.into_patch()).await {
        Ok(product) => (StatusCode::OK, Json(dto::product_to_json(&product))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn delete_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = common::require_admin_user(&services, &auth).await {
        return resp;
    }
    let id: ProductId = match common::parse_id(&id, "product") {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.storage().delete_product(id).await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({ "message": "product deleted" })),
        )
            .into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
