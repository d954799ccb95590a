use core::str::FromStr;
use std::sync::Arc;

use axum::http::StatusCode;

use aurum_auth::{User, require_admin};

use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::AuthContext;

/// Load the caller's stored user record.
pub async fn current_user(
    services: &Arc<AppServices>,
    auth: &AuthContext,
) -> Result<User, axum::response::Response> {
    match services.storage().get_user(auth.user_id()).await {
        Ok(Some(user)) => Ok(user),
        Ok(None) => Err(errors::json_error(
            StatusCode::UNAUTHORIZED,
            "unknown_user",
            "user record not found",
        )),
        Err(e) => Err(errors::store_error_to_response(e)),
    }
}

/// Load the caller and reject non-admins with 403.
pub async fn require_admin_user(
    services: &Arc<AppServices>,
    auth: &AuthContext,
) -> Result<User, axum::response::Response> {
    let user = current_user(services, auth).await?;
    if require_admin(&user).is_err() {
        return Err(errors::json_error(
            StatusCode::FORBIDDEN,
            "forbidden",
            "Admin access required",
        ));
    }
    Ok(user)
}

/// Parse a path segment into a typed id.
pub fn parse_id<T>(raw: &str, what: &'static str) -> Result<T, axum::response::Response>
where
    T: FromStr,
{
    raw.parse().map_err(|_| {
        errors::json_error(
            StatusCode::BAD_REQUEST,
            "invalid_id",
            format!("invalid {what} id"),
        )
    })
}
