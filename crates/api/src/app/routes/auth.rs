use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use crate::app::dto;
use crate::app::routes::common;
use crate::app::services::AppServices;
use crate::context::AuthContext;

pub fn router() -> Router {
    Router::new().route("/user", get(get_current_user))
}

pub async fn get_current_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(auth): Extension<AuthContext>,
) -> axum::response::Response {
    let user = match common::current_user(&services, &auth).await {
        Ok(user) => user,
        Err(resp) => return resp,
    };
    (StatusCode::OK, Json(dto::user_to_json(&user))).into_response()
}
