// Integration tests for account registration

use axum::http::StatusCode;
use serde_json::json;

mod common;
use common::{register_account, setup_test_app, unique_email, TEST_PASSWORD};

#[tokio::test]
async fn test_successful_customer_registration() {
    let app = setup_test_app().await;
    let email = unique_email("customer");

    let response = app
        .post("/api/v1/auth/register")
        .json(&json!({
            "email": email,
            "password": TEST_PASSWORD,
            "password_confirmation": TEST_PASSWORD,
            "full_name": "New Guest",
            "role": "customer",
            "accept_terms": true
        }))
        .send()
        .await;

    let status = response.status();
    let body = response.json().await;
    assert_eq!(status, StatusCode::CREATED, "body: {}", body);
    assert!(body["success"].as_bool().unwrap());
    assert!(body["data"]["user_id"].is_string());
    assert_eq!(body["data"]["role"].as_str().unwrap(), "customer");
    assert!(body["data"]["restaurant_slug"].is_null());
}

#[tokio::test]
async fn test_restaurant_registration_creates_profile_with_slug() {
    let app = setup_test_app().await;
    let email = unique_email("owner");

    let response = app
        .post("/api/v1/auth/register")
        .json(&json!({
            "email": email,
            "password": TEST_PASSWORD,
            "password_confirmation": TEST_PASSWORD,
            "full_name": "New Owner",
            "role": "restaurant",
            "restaurant_name": "Gasthaus Müller",
            "accept_terms": true
        }))
        .send()
        .await;

    let status = response.status();
    let body = response.json().await;
    assert_eq!(status, StatusCode::CREATED, "body: {}", body);

    let slug = body["data"]["restaurant_slug"].as_str().unwrap();
    assert!(slug.starts_with("gasthaus-mueller"));
    assert!(slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
}

#[tokio::test]
async fn test_same_restaurant_name_gets_distinct_slugs() {
    let app = setup_test_app().await;

    // Unique name per run so repeated test runs don't skew the suffix
    let name = format!("Trattoria {}", uuid::Uuid::new_v4().simple());

    let first = app
        .post("/api/v1/auth/register")
        .json(&json!({
            "email": unique_email("owner_a"),
            "password": TEST_PASSWORD,
            "password_confirmation": TEST_PASSWORD,
            "full_name": "Owner A",
            "role": "restaurant",
            "restaurant_name": name,
            "accept_terms": true
        }))
        .send()
        .await
        .json()
        .await;

    let second = app
        .post("/api/v1/auth/register")
        .json(&json!({
            "email": unique_email("owner_b"),
            "password": TEST_PASSWORD,
            "password_confirmation": TEST_PASSWORD,
            "full_name": "Owner B",
            "role": "restaurant",
            "restaurant_name": name,
            "accept_terms": true
        }))
        .send()
        .await
        .json()
        .await;

    let slug_a = first["data"]["restaurant_slug"].as_str().unwrap();
    let slug_b = second["data"]["restaurant_slug"].as_str().unwrap();

    assert_ne!(slug_a, slug_b);
    assert!(slug_b.starts_with(slug_a));
}

#[tokio::test]
async fn test_registration_with_existing_email() {
    let app = setup_test_app().await;
    let email = unique_email("duplicate");

    register_account(&app, &email, "customer", None).await;

    let response = app
        .post("/api/v1/auth/register")
        .json(&json!({
            "email": email,
            "password": TEST_PASSWORD,
            "password_confirmation": TEST_PASSWORD,
            "full_name": "Duplicate User",
            "role": "customer",
            "accept_terms": true
        }))
        .send()
        .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);

    let body = response.json().await;
    assert!(!body["success"].as_bool().unwrap());
    assert!(body["message"].as_str().unwrap().contains("already exists"));
}

#[tokio::test]
async fn test_registration_with_weak_password() {
    let app = setup_test_app().await;

    let response = app
        .post("/api/v1/auth/register")
        .json(&json!({
            "email": unique_email("weakpass"),
            "password": "weak",
            "password_confirmation": "weak",
            "full_name": "Weak Password User",
            "role": "customer",
            "accept_terms": true
        }))
        .send()
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = response.json().await;
    assert!(!body["success"].as_bool().unwrap());
    assert!(body["message"].as_str().unwrap().contains("password"));
}

#[tokio::test]
async fn test_registration_password_mismatch() {
    let app = setup_test_app().await;

    let response = app
        .post("/api/v1/auth/register")
        .json(&json!({
            "email": unique_email("mismatch"),
            "password": TEST_PASSWORD,
            "password_confirmation": "DifferentP@ssw0rd456!",
            "full_name": "Mismatch User",
            "role": "customer",
            "accept_terms": true
        }))
        .send()
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = response.json().await;
    assert_eq!(body["message"].as_str().unwrap(), "Passwords do not match");
}

#[tokio::test]
async fn test_registration_invalid_email() {
    let app = setup_test_app().await;

    let response = app
        .post("/api/v1/auth/register")
        .json(&json!({
            "email": "not-an-email",
            "password": TEST_PASSWORD,
            "password_confirmation": TEST_PASSWORD,
            "full_name": "Invalid Email User",
            "role": "customer",
            "accept_terms": true
        }))
        .send()
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_registration_rejects_admin_role() {
    let app = setup_test_app().await;

    let response = app
        .post("/api/v1/auth/register")
        .json(&json!({
            "email": unique_email("sneaky"),
            "password": TEST_PASSWORD,
            "password_confirmation": TEST_PASSWORD,
            "full_name": "Sneaky User",
            "role": "admin",
            "accept_terms": true
        }))
        .send()
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = response.json().await;
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("'customer' or 'restaurant'"));
}

#[tokio::test]
async fn test_restaurant_registration_requires_name() {
    let app = setup_test_app().await;

    let response = app
        .post("/api/v1/auth/register")
        .json(&json!({
            "email": unique_email("nameless"),
            "password": TEST_PASSWORD,
            "password_confirmation": TEST_PASSWORD,
            "full_name": "Nameless Owner",
            "role": "restaurant",
            "accept_terms": true
        }))
        .send()
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = response.json().await;
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("Restaurant name is required"));
}

#[tokio::test]
async fn test_registration_requires_terms_acceptance() {
    let app = setup_test_app().await;

    let response = app
        .post("/api/v1/auth/register")
        .json(&json!({
            "email": unique_email("noterms"),
            "password": TEST_PASSWORD,
            "password_confirmation": TEST_PASSWORD,
            "full_name": "No Terms User",
            "role": "customer",
            "accept_terms": false
        }))
        .send()
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
