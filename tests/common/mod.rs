// Shared test harness: in-process router driven via tower::oneshot

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{Request, Response, StatusCode},
    Router,
};
use contact_tables_backend::{
    app::AppState,
    db::{create_diesel_pool, DieselDatabaseConfig, DieselPool, RedisConfig, RedisPool},
    services::{
        EmailService, JwtService, PasswordResetService, RateLimitService, StorageService,
        VerificationService,
    },
    utils::hash_password,
};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::util::ServiceExt;
use uuid::Uuid;

/// Test application wrapper
pub struct TestApp {
    pub app: Router,
    pub diesel_pool: DieselPool,
    pub redis_pool: RedisPool,
    pub jwt_service: Arc<JwtService>,
}

impl TestApp {
    pub fn post(&self, uri: &str) -> TestRequest {
        TestRequest::new(self, "POST", uri)
    }

    pub fn get(&self, uri: &str) -> TestRequest {
        TestRequest::new(self, "GET", uri)
    }

    pub fn put(&self, uri: &str) -> TestRequest {
        TestRequest::new(self, "PUT", uri)
    }

    pub fn delete(&self, uri: &str) -> TestRequest {
        TestRequest::new(self, "DELETE", uri)
    }
}

/// Request builder for tests
pub struct TestRequest<'a> {
    app: &'a TestApp,
    method: String,
    uri: String,
    body: Body,
    content_type: Option<&'static str>,
    bearer: Option<String>,
    custom_ip: Option<String>,
}

impl<'a> TestRequest<'a> {
    fn new(app: &'a TestApp, method: &str, uri: &str) -> Self {
        Self {
            app,
            method: method.to_string(),
            uri: uri.to_string(),
            body: Body::empty(),
            content_type: None,
            bearer: None,
            custom_ip: None,
        }
    }

    pub fn json<T: Serialize>(mut self, body: &T) -> Self {
        self.body = Body::from(serde_json::to_vec(body).unwrap());
        self.content_type = Some("application/json");
        self
    }

    pub fn bearer(mut self, token: &str) -> Self {
        self.bearer = Some(token.to_string());
        self
    }

    /// Pin the client IP (rate limiting tests)
    pub fn with_ip(mut self, ip: &str) -> Self {
        self.custom_ip = Some(ip.to_string());
        self
    }

    pub async fn send(self) -> TestResponse {
        let mut builder = Request::builder().method(self.method.as_str()).uri(&self.uri);

        if let Some(ct) = self.content_type {
            builder = builder.header("content-type", ct);
        }
        if let Some(token) = &self.bearer {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }

        let mut request = builder.body(self.body).unwrap();

        // Random loopback IP unless pinned, so tests don't trip shared
        // rate limit buckets
        let ip_address = self.custom_ip.unwrap_or_else(|| {
            format!("127.0.0.{}:12345", rand::random::<u8>().saturating_add(1))
        });

        request
            .extensions_mut()
            .insert(ConnectInfo(ip_address.parse::<SocketAddr>().unwrap()));

        let response = self.app.app.clone().oneshot(request).await.unwrap();
        TestResponse { response }
    }
}

/// Response wrapper for tests
pub struct TestResponse {
    response: Response<Body>,
}

impl TestResponse {
    pub fn status(&self) -> StatusCode {
        self.response.status()
    }

    pub async fn json(self) -> serde_json::Value {
        let body = axum::body::to_bytes(self.response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    pub async fn text(self) -> String {
        let body = axum::body::to_bytes(self.response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(body.to_vec()).unwrap()
    }
}

/// Build the full application against the test environment
pub async fn setup_test_app() -> TestApp {
    dotenv::from_filename(".env.test").ok();
    dotenv::dotenv().ok();

    let db_config = DieselDatabaseConfig::default();
    let diesel_pool = create_diesel_pool(db_config).await.unwrap();

    let redis_config = RedisConfig::from_env();
    let redis_pool = RedisPool::new(redis_config).await.unwrap();

    let jwt_service = Arc::new(
        JwtService::from_env_with_diesel(diesel_pool.clone(), redis_pool.clone()).unwrap(),
    );

    let config = contact_tables_backend::app_config::config();

    let app_state = AppState {
        config: Arc::new(config.clone()),
        diesel_pool: diesel_pool.clone(),
        redis_pool: redis_pool.clone(),
        jwt_service: jwt_service.clone(),
        rate_limit_service: Arc::new(RateLimitService::new(redis_pool.clone())),
        verification_service: Arc::new(VerificationService::new(redis_pool.clone())),
        password_reset_service: Arc::new(PasswordResetService::new(diesel_pool.clone())),
        email_service: Arc::new(
            EmailService::new(config.email.clone(), config.frontend_url.clone())
                .expect("Failed to create email service"),
        ),
        storage_service: Arc::new(StorageService::new(&config.storage)),
        max_connections: config.database.max_connections,
    };

    let app = contact_tables_backend::build_router(app_state);

    TestApp {
        app,
        diesel_pool,
        redis_pool,
        jwt_service,
    }
}

/// Unique email for test isolation
pub fn unique_email(prefix: &str) -> String {
    format!("{}_{}@example.com", prefix, Uuid::new_v4().simple())
}

pub const TEST_PASSWORD: &str = "Sup3r$ecret123";

/// Register an account through the API. Returns the user id.
pub async fn register_account(
    app: &TestApp,
    email: &str,
    role: &str,
    restaurant_name: Option<&str>,
) -> String {
    let response = app
        .post("/api/v1/auth/register")
        .json(&serde_json::json!({
            "email": email,
            "password": TEST_PASSWORD,
            "password_confirmation": TEST_PASSWORD,
            "full_name": "Test User",
            "role": role,
            "restaurant_name": restaurant_name,
            "accept_terms": true
        }))
        .send()
        .await;

    let status = response.status();
    let body = response.json().await;
    assert_eq!(
        status,
        StatusCode::CREATED,
        "registration failed: {}",
        body
    );
    body["data"]["user_id"].as_str().unwrap().to_string()
}

/// Read the pending verification code straight out of Redis
pub async fn fetch_verification_code(app: &TestApp, email: &str) -> String {
    let key = format!("verify:email:{}:code", email.to_lowercase());
    let raw: String = app
        .redis_pool
        .get(&key)
        .await
        .unwrap()
        .expect("no verification code stored");
    let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
    parsed["code"].as_str().unwrap().to_string()
}

/// Verify an account's email through the API
pub async fn verify_email(app: &TestApp, email: &str) {
    let code = fetch_verification_code(app, email).await;
    let response = app
        .post("/api/v1/auth/verify-email")
        .json(&serde_json::json!({ "email": email, "code": code }))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

/// Log in and return the access token
pub async fn login(app: &TestApp, email: &str) -> String {
    let response = app
        .post("/api/v1/auth/login")
        .json(&serde_json::json!({
            "email": email,
            "password": TEST_PASSWORD
        }))
        .send()
        .await;

    let status = response.status();
    let body = response.json().await;
    assert_eq!(status, StatusCode::OK, "login failed: {}", body);
    body["data"]["access_token"].as_str().unwrap().to_string()
}

/// Register, verify, and log in. Returns the access token.
pub async fn register_and_login(
    app: &TestApp,
    email: &str,
    role: &str,
    restaurant_name: Option<&str>,
) -> String {
    register_account(app, email, role, restaurant_name).await;
    verify_email(app, email).await;
    login(app, email).await
}

/// Create an admin account directly in the database (admins cannot
/// self-register) and return its access token.
pub async fn create_admin_and_login(app: &TestApp) -> String {
    use contact_tables_backend::schema::users;

    let email = unique_email("admin");
    let password_hash = hash_password(TEST_PASSWORD).unwrap();

    let mut conn = app.diesel_pool.get().await.unwrap();
    diesel::insert_into(users::table)
        .values((
            users::email.eq(&email),
            users::password_hash.eq(&password_hash),
            users::role.eq("admin"),
            users::email_verified.eq(true),
            users::full_name.eq("Test Admin"),
        ))
        .execute(&mut conn)
        .await
        .unwrap();
    drop(conn);

    login(app, &email).await
}
