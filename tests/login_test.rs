// Integration tests for login and session endpoints

use axum::http::StatusCode;
use serde_json::json;

mod common;
use common::{
    register_account, register_and_login, setup_test_app, unique_email, verify_email,
    TEST_PASSWORD,
};

#[tokio::test]
async fn test_successful_login_returns_tokens_and_role() {
    let app = setup_test_app().await;
    let email = unique_email("login");

    register_account(&app, &email, "customer", None).await;
    verify_email(&app, &email).await;

    let response = app
        .post("/api/v1/auth/login")
        .json(&json!({
            "email": email,
            "password": TEST_PASSWORD
        }))
        .send()
        .await;

    let status = response.status();
    let body = response.json().await;
    assert_eq!(status, StatusCode::OK, "body: {}", body);

    assert!(body["data"]["access_token"].is_string());
    assert!(body["data"]["refresh_token"].is_string());
    assert_eq!(body["data"]["token_type"].as_str().unwrap(), "Bearer");
    assert_eq!(body["data"]["user"]["role"].as_str().unwrap(), "customer");
}

#[tokio::test]
async fn test_login_with_wrong_password() {
    let app = setup_test_app().await;
    let email = unique_email("wrongpass");

    register_account(&app, &email, "customer", None).await;
    verify_email(&app, &email).await;

    let response = app
        .post("/api/v1/auth/login")
        .json(&json!({
            "email": email,
            "password": "WrongP@ssw0rd!"
        }))
        .send()
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_with_unknown_email() {
    let app = setup_test_app().await;

    let response = app
        .post("/api/v1/auth/login")
        .json(&json!({
            "email": unique_email("ghost"),
            "password": TEST_PASSWORD
        }))
        .send()
        .await;

    // Same response as a wrong password; account existence stays hidden
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_requires_verified_email() {
    let app = setup_test_app().await;
    let email = unique_email("unverified");

    register_account(&app, &email, "customer", None).await;
    // No verification step

    let response = app
        .post("/api/v1/auth/login")
        .json(&json!({
            "email": email,
            "password": TEST_PASSWORD
        }))
        .send()
        .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let body = response.json().await;
    assert_eq!(body["error"]["code"].as_str().unwrap(), "EMAIL_NOT_VERIFIED");
}

#[tokio::test]
async fn test_me_returns_profile() {
    let app = setup_test_app().await;
    let email = unique_email("me");
    let token = register_and_login(&app, &email, "customer", None).await;

    let response = app.get("/api/v1/auth/me").bearer(&token).send().await;

    let status = response.status();
    let body = response.json().await;
    assert_eq!(status, StatusCode::OK, "body: {}", body);
    assert_eq!(body["data"]["email"].as_str().unwrap(), email);
    assert!(body["data"]["email_verified"].as_bool().unwrap());
}

#[tokio::test]
async fn test_me_without_token() {
    let app = setup_test_app().await;

    let response = app.get("/api/v1/auth/me").send().await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_rejects_malformed_token() {
    let app = setup_test_app().await;

    let response = app
        .post("/api/v1/auth/refresh")
        .json(&json!({ "refresh_token": "not-a-jwt" }))
        .send()
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_refresh_rotates_tokens() {
    let app = setup_test_app().await;
    let email = unique_email("rotate");

    register_account(&app, &email, "customer", None).await;
    verify_email(&app, &email).await;

    let login_body = app
        .post("/api/v1/auth/login")
        .json(&json!({ "email": email, "password": TEST_PASSWORD }))
        .send()
        .await
        .json()
        .await;
    let refresh_token = login_body["data"]["refresh_token"].as_str().unwrap();

    // First refresh succeeds and returns a new pair
    let first = app
        .post("/api/v1/auth/refresh")
        .json(&json!({ "refresh_token": refresh_token }))
        .send()
        .await;
    let first_status = first.status();
    let first_body = first.json().await;
    assert_eq!(first_status, StatusCode::OK, "body: {}", first_body);

    let new_refresh = first_body["data"]["refresh_token"].as_str().unwrap();
    assert_ne!(new_refresh, refresh_token);

    // Replaying the rotated-out token is rejected
    let replay = app
        .post("/api/v1/auth/refresh")
        .json(&json!({ "refresh_token": refresh_token }))
        .send()
        .await;
    assert_eq!(replay.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_blacklists_access_token() {
    let app = setup_test_app().await;
    let email = unique_email("logout");
    let token = register_and_login(&app, &email, "customer", None).await;

    let logout = app.post("/api/v1/auth/logout").bearer(&token).send().await;
    assert_eq!(logout.status(), StatusCode::OK);

    // Blacklisted token no longer works
    let me = app.get("/api/v1/auth/me").bearer(&token).send().await;
    assert_eq!(me.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_forgot_password_is_uniform_for_unknown_emails() {
    let app = setup_test_app().await;

    let response = app
        .post("/api/v1/auth/forgot-password")
        .json(&json!({ "email": unique_email("nobody") }))
        .send()
        .await;

    assert_eq!(response.status(), StatusCode::OK);
}
