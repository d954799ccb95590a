use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};

use aurum_core::CategoryId;

use crate::app::routes::common;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::AuthContext;

pub fn public_router() -> Router {
    Router::new().route("/", get(list_categories))
}

pub fn admin_router() -> Router {
    Router::new()
        .route("/", post(create_category))
        .route("/:id", put(update_category).delete(delete_category))
}

pub async fn list_categories(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.storage().list_categories().await {
        Ok(categories) => (
            StatusCode::OK,
            Json(
                categories
                    .iter()
                    .map(dto::category_to_json)
                    .collect::<Vec<_>>(),
            ),
        )
            .into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn create_category(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(auth): Extension<AuthContext>,
    Json(body): Json<dto::CreateCategoryRequest>,
) -> axum::response::Response {
    if let Err(resp) = common::require_admin_user(&services, &auth).await {
        return resp;
    }

    match services
        .storage()
        .create_category(body.into_new_category())
        .await
    {
        Ok(category) => (StatusCode::CREATED, Json(dto::category_to_json(&category))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn update_category(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateCategoryRequest>,
) -> axum::response::Response {
    if let Err(resp) = common::require_admin_user(&services, &auth).await {
        return resp;
    }
    let id: CategoryId = match common::parse_id(&id, "category") {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.storage().update_category(id, body.into_patch()).await {
        Ok(category) => (StatusCode::OK, Json(dto::category_to_json(&category))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn delete_category(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = common::require_admin_user(&services, &auth).await {
        return resp;
    }
    let id: CategoryId = match common::parse_id(&id, "category") {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.storage().delete_category(id).await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({ "message": "category deleted" })),
        )
            .into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
