// HTTP handlers and route builders

pub mod admin;
pub mod auth;
pub mod contact;
pub mod docs;
pub mod onboarding;
pub mod pages;
pub mod restaurants;
pub mod tables;
pub mod uploads;

use crate::app::AppState;
use crate::middleware::{auth_middleware, require_admin, require_restaurant_owner};
use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

/// Public authentication routes
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh_token))
        .route("/verify-email", post(auth::verify_email))
        .route("/resend-verification", post(auth::resend_verification))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/reset-password", post(auth::reset_password))
}

/// Authenticated session routes (logout, current user)
pub fn session_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::get_current_user))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Public discovery routes
pub fn discovery_routes() -> Router<AppState> {
    Router::new()
        .route("/restaurants", get(restaurants::list_restaurants))
        .route("/restaurants/{slug}", get(restaurants::get_restaurant_by_slug))
        .route("/tables", get(tables::list_open_tables))
        .route("/tables/{id}", get(tables::get_table))
        .route("/contact", post(contact::submit_contact_form))
}

/// Customer routes (join/leave tables)
pub fn customer_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/tables/{id}/join", post(tables::join_table))
        .route("/tables/{id}/leave", post(tables::leave_table))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Restaurant-owner routes (profile, tables, images, onboarding)
pub fn restaurant_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/restaurant/profile",
            get(restaurants::get_own_profile).put(restaurants::update_own_profile),
        )
        .route(
            "/restaurant/tables",
            post(tables::create_table).get(tables::list_own_tables),
        )
        .route(
            "/restaurant/tables/{id}",
            put(tables::update_table).delete(tables::cancel_table),
        )
        .route(
            "/restaurant/tables/{id}/participants",
            get(tables::list_participants),
        )
        .route("/restaurant/images", post(uploads::upload_images))
        .route("/restaurant/images/{id}", axum::routing::delete(uploads::delete_image))
        .route(
            "/restaurant/images/{id}/primary",
            post(uploads::set_primary_image),
        )
        .route("/onboarding/status", get(onboarding::get_status))
        .route("/onboarding/plans", get(onboarding::list_plans))
        .route("/onboarding/select-plan", post(onboarding::select_plan))
        .route("/onboarding/accept-contract", post(onboarding::accept_contract))
        .route("/onboarding/complete-payment", post(onboarding::complete_payment))
        .route_layer(middleware::from_fn(require_restaurant_owner))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Admin routes (review queue, stats, inbox)
pub fn admin_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/restaurants", get(admin::list_restaurants))
        .route("/admin/restaurants/{id}/approve", post(admin::approve_restaurant))
        .route("/admin/restaurants/{id}/reject", post(admin::reject_restaurant))
        .route("/admin/stats", get(admin::get_stats))
        .route("/admin/messages", get(admin::list_messages))
        .route("/admin/messages/{id}/status", put(admin::set_message_status))
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Legal pages (server-rendered HTML, outside /api)
pub fn page_routes() -> Router<AppState> {
    Router::new()
        .route("/pages/imprint", get(pages::imprint))
        .route("/pages/privacy", get(pages::privacy))
}

/// API documentation routes
pub fn docs_routes() -> Router<AppState> {
    Router::new()
        .route("/docs", get(docs::redirect_to_docs))
        .route("/docs/", get(docs::serve_swagger_ui))
        .route("/docs/openapi.json", get(docs::serve_openapi_spec))
}
