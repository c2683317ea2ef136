// Role-based access control tests: 401 without a token, 403 with the
// wrong role

use axum::http::StatusCode;
use serde_json::json;

mod common;
use common::{create_admin_and_login, register_and_login, setup_test_app, unique_email};

#[tokio::test]
async fn test_owner_routes_reject_unauthenticated() {
    let app = setup_test_app().await;

    let response = app.get("/api/v1/restaurant/profile").send().await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_owner_routes_reject_customers() {
    let app = setup_test_app().await;
    let token = register_and_login(&app, &unique_email("guard_c"), "customer", None).await;

    let response = app
        .get("/api/v1/restaurant/profile")
        .bearer(&token)
        .send()
        .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_routes_reject_unauthenticated() {
    let app = setup_test_app().await;

    let response = app.get("/api/v1/admin/stats").send().await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_routes_reject_owners() {
    let app = setup_test_app().await;
    let token = register_and_login(
        &app,
        &unique_email("guard_o"),
        "restaurant",
        Some("Guard Test Kitchen"),
    )
    .await;

    let response = app.get("/api/v1/admin/stats").bearer(&token).send().await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_routes_accept_admins() {
    let app = setup_test_app().await;
    let token = create_admin_and_login(&app).await;

    let response = app.get("/api/v1/admin/stats").bearer(&token).send().await;

    let status = response.status();
    let body = response.json().await;
    assert_eq!(status, StatusCode::OK, "body: {}", body);
    assert!(body["data"]["users"]["total"].is_number());
}

#[tokio::test]
async fn test_join_requires_authentication() {
    let app = setup_test_app().await;

    let response = app
        .post(&format!("/api/v1/tables/{}/join", uuid::Uuid::new_v4()))
        .json(&json!({ "seats": 1 }))
        .send()
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_public_discovery_needs_no_token() {
    let app = setup_test_app().await;

    let restaurants = app.get("/api/v1/restaurants").send().await;
    assert_eq!(restaurants.status(), StatusCode::OK);

    let tables = app.get("/api/v1/tables").send().await;
    assert_eq!(tables.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_legal_pages_are_public() {
    let app = setup_test_app().await;

    let imprint = app.get("/pages/imprint").send().await;
    assert_eq!(imprint.status(), StatusCode::OK);
    assert!(imprint.text().await.contains("Imprint"));

    let privacy = app.get("/pages/privacy").send().await;
    assert_eq!(privacy.status(), StatusCode::OK);
    assert!(privacy.text().await.contains("Privacy Policy"));
}
