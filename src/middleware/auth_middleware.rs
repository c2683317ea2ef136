// Authentication middleware for protected routes
// Validates JWT tokens and injects AuthenticatedUser into request extensions

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{header, request::Parts, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;

use crate::{app::AppState, middleware::auth::AuthenticatedUser};

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "success": false,
            "message": message
        })),
    )
        .into_response()
}

fn forbidden(message: &str) -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(json!({
            "success": false,
            "message": message
        })),
    )
        .into_response()
}

/// Validate the bearer token and stash the AuthenticatedUser in the
/// request extensions for downstream handlers.
pub async fn auth_middleware(
    State(app_state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match auth_header {
        Some(header) if header.starts_with("Bearer ") => &header[7..],
        _ => return unauthorized("Missing or invalid authorization header"),
    };

    let claims = match app_state.jwt_service.validate_access_token(token) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::warn!("JWT validation failed: {}", e);
            return unauthorized("Invalid or expired token");
        },
    };

    // Logged-out tokens are blacklisted until natural expiry
    match app_state.jwt_service.is_token_blacklisted(&claims.jti).await {
        Ok(true) => return unauthorized("Invalid or expired token"),
        Ok(false) => {},
        Err(e) => {
            tracing::warn!("Token blacklist check failed: {}", e);
        },
    }

    let auth_user = AuthenticatedUser {
        user_id: claims.sub,
        token_id: claims.jti,
        email: claims.email,
        role: claims.role,
        permissions: claims.scope,
        exp: claims.exp,
    };

    request.extensions_mut().insert(auth_user);
    next.run(request).await
}

/// Route layer for admin-only route trees. Runs after auth_middleware.
pub async fn require_admin(request: Request<Body>, next: Next) -> Response {
    match request.extensions().get::<AuthenticatedUser>() {
        Some(user) if user.is_admin() => next.run(request).await,
        Some(_) => forbidden("Administrator access required"),
        None => unauthorized("Authentication required"),
    }
}

/// Route layer for restaurant-owner route trees. Runs after auth_middleware.
pub async fn require_restaurant_owner(request: Request<Body>, next: Next) -> Response {
    match request.extensions().get::<AuthenticatedUser>() {
        Some(user) if user.is_restaurant_owner() => next.run(request).await,
        Some(_) => forbidden("Restaurant owner access required"),
        None => unauthorized("Authentication required"),
    }
}

/// Extractor so handlers can take AuthenticatedUser directly
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = (StatusCode, Json<serde_json::Value>);

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({
                        "success": false,
                        "message": "Authentication required"
                    })),
                )
            })
    }
}
