// End-to-end onboarding: registration -> verification -> admin review
// -> plan selection -> contract acceptance -> (payment) -> activation

use axum::http::StatusCode;
use serde_json::json;

mod common;
use common::{create_admin_and_login, setup_test_app, unique_email, TestApp};

/// Register + verify + login a restaurant owner; returns (owner token,
/// restaurant slug)
async fn onboard_owner(app: &TestApp, name: &str) -> (String, String) {
    let email = unique_email("flow_owner");

    let body = app
        .post("/api/v1/auth/register")
        .json(&json!({
            "email": email,
            "password": common::TEST_PASSWORD,
            "password_confirmation": common::TEST_PASSWORD,
            "full_name": "Flow Owner",
            "role": "restaurant",
            "restaurant_name": name,
            "accept_terms": true
        }))
        .send()
        .await
        .json()
        .await;
    let slug = body["data"]["restaurant_slug"].as_str().unwrap().to_string();

    common::verify_email(app, &email).await;
    let token = common::login(app, &email).await;
    (token, slug)
}

/// Admin looks up the restaurant id in the pending review queue
async fn find_restaurant_id(app: &TestApp, admin_token: &str, slug: &str) -> String {
    let body = app
        .get("/api/v1/admin/restaurants?status=pending")
        .bearer(admin_token)
        .send()
        .await
        .json()
        .await;

    body["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["slug"].as_str() == Some(slug))
        .unwrap_or_else(|| panic!("restaurant {} not in review queue", slug))["id"]
        .as_str()
        .unwrap()
        .to_string()
}

async fn onboarding_status(app: &TestApp, owner_token: &str) -> serde_json::Value {
    app.get("/api/v1/onboarding/status")
        .bearer(owner_token)
        .send()
        .await
        .json()
        .await["data"]
        .clone()
}

#[tokio::test]
async fn test_basic_plan_flow_activates_on_acceptance() {
    let app = setup_test_app().await;
    let (owner_token, slug) = onboard_owner(&app, "Basic Flow Bistro").await;
    let admin_token = create_admin_and_login(&app).await;

    // Fresh registrations wait for review
    let status = onboarding_status(&app, &owner_token).await;
    assert_eq!(status["contract_status"].as_str().unwrap(), "pending");
    assert_eq!(status["next_step"].as_str().unwrap(), "await_review");

    // Admin approves
    let restaurant_id = find_restaurant_id(&app, &admin_token, &slug).await;
    let approve = app
        .post(&format!("/api/v1/admin/restaurants/{}/approve", restaurant_id))
        .bearer(&admin_token)
        .send()
        .await;
    assert_eq!(approve.status(), StatusCode::OK);

    let status = onboarding_status(&app, &owner_token).await;
    assert_eq!(status["contract_status"].as_str().unwrap(), "approved");
    assert_eq!(status["next_step"].as_str().unwrap(), "select_plan");

    // Owner selects the free plan
    let select = app
        .post("/api/v1/onboarding/select-plan")
        .bearer(&owner_token)
        .json(&json!({ "plan": "basic" }))
        .send()
        .await;
    let select_status = select.status();
    let select_body = select.json().await;
    assert_eq!(select_status, StatusCode::OK, "body: {}", select_body);
    let terms_version = select_body["data"]["terms_version"].as_str().unwrap().to_string();

    // Accepting the contract activates a free plan immediately
    let accept = app
        .post("/api/v1/onboarding/accept-contract")
        .bearer(&owner_token)
        .json(&json!({ "terms_version": terms_version, "accept_terms": true }))
        .send()
        .await;
    let accept_status = accept.status();
    let accept_body = accept.json().await;
    assert_eq!(accept_status, StatusCode::OK, "body: {}", accept_body);
    assert_eq!(
        accept_body["data"]["contract_status"].as_str().unwrap(),
        "active"
    );
    assert_eq!(accept_body["data"]["next_step"].as_str().unwrap(), "dashboard");

    // The restaurant is now publicly visible
    let public = app.get(&format!("/api/v1/restaurants/{}", slug)).send().await;
    assert_eq!(public.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_premium_plan_flow_requires_payment() {
    let app = setup_test_app().await;
    let (owner_token, slug) = onboard_owner(&app, "Premium Flow Osteria").await;
    let admin_token = create_admin_and_login(&app).await;

    let restaurant_id = find_restaurant_id(&app, &admin_token, &slug).await;
    app.post(&format!("/api/v1/admin/restaurants/{}/approve", restaurant_id))
        .bearer(&admin_token)
        .send()
        .await;

    let select_body = app
        .post("/api/v1/onboarding/select-plan")
        .bearer(&owner_token)
        .json(&json!({ "plan": "premium" }))
        .send()
        .await
        .json()
        .await;
    let terms_version = select_body["data"]["terms_version"].as_str().unwrap().to_string();
    assert_eq!(select_body["data"]["monthly_fee_cents"].as_i64().unwrap(), 2900);

    // Acceptance alone does not activate a paid plan
    let accept_body = app
        .post("/api/v1/onboarding/accept-contract")
        .bearer(&owner_token)
        .json(&json!({ "terms_version": terms_version, "accept_terms": true }))
        .send()
        .await
        .json()
        .await;
    assert_eq!(
        accept_body["data"]["contract_status"].as_str().unwrap(),
        "approved"
    );
    assert_eq!(
        accept_body["data"]["next_step"].as_str().unwrap(),
        "complete_payment"
    );

    // Not visible to the public yet
    let public = app.get(&format!("/api/v1/restaurants/{}", slug)).send().await;
    assert_eq!(public.status(), StatusCode::NOT_FOUND);

    // Payment completion activates
    let idempotency_key = uuid::Uuid::new_v4().to_string();
    let pay = app
        .post("/api/v1/onboarding/complete-payment")
        .bearer(&owner_token)
        .json(&json!({
            "idempotency_key": idempotency_key,
            "provider": "stripe",
            "provider_payment_id": "pi_test_123"
        }))
        .send()
        .await;
    let pay_status = pay.status();
    let pay_body = pay.json().await;
    assert_eq!(pay_status, StatusCode::OK, "body: {}", pay_body);
    assert_eq!(pay_body["data"]["contract_status"].as_str().unwrap(), "active");

    // Replaying the same payment callback is a no-op, not an error
    let replay = app
        .post("/api/v1/onboarding/complete-payment")
        .bearer(&owner_token)
        .json(&json!({
            "idempotency_key": idempotency_key,
            "provider": "stripe",
            "provider_payment_id": "pi_test_123"
        }))
        .send()
        .await;
    let replay_status = replay.status();
    let replay_body = replay.json().await;
    assert_eq!(replay_status, StatusCode::OK, "body: {}", replay_body);
    assert_eq!(
        replay_body["data"]["contract_status"].as_str().unwrap(),
        "active"
    );
}

#[tokio::test]
async fn test_rejection_records_reason_and_allows_resubmission() {
    let app = setup_test_app().await;
    let (owner_token, slug) = onboard_owner(&app, "Rejected Ramen").await;
    let admin_token = create_admin_and_login(&app).await;

    let restaurant_id = find_restaurant_id(&app, &admin_token, &slug).await;
    let reject = app
        .post(&format!("/api/v1/admin/restaurants/{}/reject", restaurant_id))
        .bearer(&admin_token)
        .json(&json!({ "reason": "Address is incomplete" }))
        .send()
        .await;
    assert_eq!(reject.status(), StatusCode::OK);

    let status = onboarding_status(&app, &owner_token).await;
    assert_eq!(status["contract_status"].as_str().unwrap(), "rejected");
    assert_eq!(
        status["rejected_reason"].as_str().unwrap(),
        "Address is incomplete"
    );
    assert_eq!(status["next_step"].as_str().unwrap(), "edit_and_resubmit");

    // Editing the profile resubmits for review
    let update = app
        .put("/api/v1/restaurant/profile")
        .bearer(&owner_token)
        .json(&json!({
            "address_street": "Hauptstr. 1",
            "address_city": "Berlin",
            "postal_code": "10115",
            "country": "Germany"
        }))
        .send()
        .await;
    assert_eq!(update.status(), StatusCode::OK);

    let status = onboarding_status(&app, &owner_token).await;
    assert_eq!(status["contract_status"].as_str().unwrap(), "pending");
    assert!(status["rejected_reason"].is_null());
}

#[tokio::test]
async fn test_illegal_transitions_are_refused() {
    let app = setup_test_app().await;
    let (owner_token, slug) = onboard_owner(&app, "Illegal Transition Tavern").await;
    let admin_token = create_admin_and_login(&app).await;

    // Plan selection before approval is refused
    let select = app
        .post("/api/v1/onboarding/select-plan")
        .bearer(&owner_token)
        .json(&json!({ "plan": "basic" }))
        .send()
        .await;
    assert_eq!(select.status(), StatusCode::CONFLICT);

    // Double approval is refused (approved -> approved is not legal)
    let restaurant_id = find_restaurant_id(&app, &admin_token, &slug).await;
    let first = app
        .post(&format!("/api/v1/admin/restaurants/{}/approve", restaurant_id))
        .bearer(&admin_token)
        .send()
        .await;
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .post(&format!("/api/v1/admin/restaurants/{}/approve", restaurant_id))
        .bearer(&admin_token)
        .send()
        .await;
    assert_eq!(second.status(), StatusCode::CONFLICT);

    let body = second.json().await;
    assert_eq!(body["code"].as_str().unwrap(), "ILLEGAL_TRANSITION");
}
