// Authentication handlers: registration, login, token refresh, email
// verification, password reset

use axum::{
    extract::{ConnectInfo, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use axum_extra::{
    extract::cookie::{Cookie, CookieJar, SameSite},
    headers::UserAgent,
    TypedHeader,
};
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::AsyncConnection;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::str::FromStr;
use time::Duration;
use validator::Validate;

use crate::{
    app::AppState,
    config::PermissionConfig,
    middleware::auth::AuthenticatedUser,
    models::{
        password_reset::{
            ForgotPasswordRequest, ForgotPasswordResponse, ResetPasswordRequest,
            ResetPasswordResponse,
        },
        refresh_token::DeviceInfo,
        restaurant::{ContractStatus, NewRestaurant, Plan, Restaurant},
        user::{NewUser, Role, User, UserError, UserUpdate},
    },
    services::{jwt::JwtError, rate_limit::RateLimitConfig, slug, VerificationError},
    utils::{
        create_auth_audit_entry, generate_device_fingerprint, hash_password, log_auth_failure,
        trim_and_validate_field, trim_optional_field, verify_password, AuthError, AuthEventType,
    },
};

// =============================================================================
// REQUEST/RESPONSE TYPES
// =============================================================================

#[derive(Debug, Deserialize, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub remember_me: bool,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RefreshRequest {
    // Optional for web clients (cookie carries the token)
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    #[validate(length(max = 320, message = "Email must be less than 320 characters"))]
    pub email: String,

    #[validate(custom(function = "validate_password"))]
    pub password: String,

    pub password_confirmation: String,

    #[validate(length(
        min = 1,
        max = 255,
        message = "Full name must be between 1 and 255 characters"
    ))]
    pub full_name: String,

    /// "customer" or "restaurant"; admin accounts cannot self-register
    pub role: String,

    /// Required when registering as a restaurant
    #[validate(length(max = 255, message = "Restaurant name must be less than 255 characters"))]
    pub restaurant_name: Option<String>,

    #[validate(length(max = 50, message = "Phone must be less than 50 characters"))]
    pub phone: Option<String>,

    pub accept_terms: bool,
}

/// Passwords need 8+ chars with upper, lower, digit, and special
fn validate_password(password: &str) -> Result<(), validator::ValidationError> {
    let has_uppercase = password.chars().any(|c| c.is_uppercase());
    let has_lowercase = password.chars().any(|c| c.is_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_special = password.chars().any(|c| !c.is_alphanumeric());

    if password.len() < 8 {
        return Err(validator::ValidationError::new("password_too_short"));
    }

    if !has_uppercase || !has_lowercase || !has_digit || !has_special {
        return Err(validator::ValidationError::new("password_complexity"));
    }

    Ok(())
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
    pub token_type: String,
    pub user: LoginUserInfo,
    pub remember_me: bool,
}

#[derive(Debug, Serialize)]
pub struct LoginUserInfo {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub role: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
    pub token_type: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: String,
    pub email: String,
    pub full_name: String,
    pub role: String,
    pub restaurant_slug: Option<String>,
    pub email_verification_required: bool,
    pub verification_sent: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub user_id: String,
    pub email: String,
    pub full_name: String,
    pub role: String,
    pub email_verified: bool,
    pub phone: Option<String>,
    pub permissions: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyEmailRequest {
    pub email: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct ResendVerificationRequest {
    pub email: String,
}

// =============================================================================
// HELPERS
// =============================================================================

fn create_auth_error_response(message: &str) -> Response {
    let response = AuthResponse::<TokenResponse> {
        success: false,
        data: None,
        message: message.to_string(),
    };
    (StatusCode::BAD_REQUEST, Json(response)).into_response()
}

/// Cookie that deletes the refresh token (negative max_age)
fn create_delete_refresh_cookie(config: &crate::app_config::AppConfig) -> Cookie<'static> {
    Cookie::build(("refresh_token", ""))
        .path("/")
        .http_only(true)
        .secure(config.is_production())
        .same_site(SameSite::Strict)
        .max_age(Duration::seconds(-1))
        .build()
}

/// Refresh token cookie; session-only unless remember_me
fn create_refresh_token_cookie(
    token: String,
    remember_me: bool,
    config: &crate::app_config::AppConfig,
) -> Cookie<'static> {
    let mut cookie_builder = Cookie::build(("refresh_token", token))
        .path("/")
        .http_only(true)
        .secure(config.is_production())
        .same_site(SameSite::Strict);

    if remember_me {
        cookie_builder = cookie_builder
            .max_age(Duration::days(config.security.remember_me_duration_days as i64));
    }

    cookie_builder.build()
}

/// A JWT has exactly three dot-separated parts
fn is_valid_jwt_format(token: &str) -> bool {
    token.split('.').count() == 3
}

/// Refresh token comes from the cookie (web) or the JSON body (mobile)
fn extract_refresh_token(jar: &CookieJar, body: &axum::body::Bytes) -> Result<String, Response> {
    if let Some(cookie) = jar.get("refresh_token") {
        let token = cookie.value();
        if !is_valid_jwt_format(token) {
            return Err(create_auth_error_response("Invalid refresh token format"));
        }
        return Ok(token.to_string());
    }

    if body.is_empty() {
        return Err(create_auth_error_response("Refresh token not provided"));
    }

    match serde_json::from_slice::<RefreshRequest>(body) {
        Ok(req) => match req.refresh_token {
            Some(token) if is_valid_jwt_format(&token) => Ok(token),
            Some(_) => Err(create_auth_error_response("Invalid refresh token format")),
            None => Err(create_auth_error_response("Refresh token not provided")),
        },
        Err(_) => Err(create_auth_error_response("Invalid JSON body")),
    }
}

fn device_info_from_request(
    user_agent: &Option<String>,
    addr: &SocketAddr,
    headers: &HeaderMap,
) -> DeviceInfo {
    DeviceInfo {
        fingerprint: generate_device_fingerprint(user_agent, addr, headers),
        ip_address: Some(addr.ip().to_string()),
        user_agent: user_agent.clone(),
    }
}

// Failed-login bookkeeping in Redis

async fn check_account_lockout_status(state: &AppState, email: &str) -> Option<u64> {
    let lockout_key = format!("lockout:{}", email);
    match state.redis_pool.get::<String>(&lockout_key).await {
        Ok(Some(locked_until)) => {
            if let Ok(locked_until_ts) = locked_until.parse::<i64>() {
                let now = chrono::Utc::now().timestamp();
                if locked_until_ts > now {
                    return Some((locked_until_ts - now) as u64);
                }
            }
        },
        Ok(None) => {},
        Err(e) => {
            tracing::warn!("Failed to check lockout status for {}: {}", email, e);
        },
    }
    None
}

async fn track_failed_login(state: &AppState, email: &str, ip: &str) {
    let config = crate::app_config::config();

    let fail_key = format!("login:failed:{}", email);
    let _ = state
        .redis_pool
        .incr(&fail_key, config.security.failed_login_expiry_seconds)
        .await;

    track_failed_login_by_ip_only(state, ip).await;
}

// Unknown emails are only tracked per IP so attackers cannot fill Redis
// with arbitrary addresses
async fn track_failed_login_by_ip_only(state: &AppState, ip: &str) {
    let config = crate::app_config::config();

    let ip_fail_key = format!("login:failed:ip:{}", ip);
    let _ = state
        .redis_pool
        .incr(&ip_fail_key, config.security.failed_login_ip_expiry_seconds)
        .await;
}

async fn get_failed_login_count(state: &AppState, email: &str) -> u32 {
    let fail_key = format!("login:failed:{}", email);
    state
        .redis_pool
        .get::<String>(&fail_key)
        .await
        .ok()
        .flatten()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(0)
}

async fn clear_failed_login_attempts(state: &AppState, email: &str) {
    let fail_key = format!("login:failed:{}", email);
    let _ = state.redis_pool.del(&fail_key).await;

    let lockout_key = format!("lockout:{}", email);
    let _ = state.redis_pool.del(&lockout_key).await;
}

// =============================================================================
// AUTHENTICATION HANDLERS
// =============================================================================

/// POST /auth/login - Authenticate and return JWT tokens.
/// Rate limited per IP and per email, with account lockout after
/// repeated failures. Sets an HttpOnly cookie for web clients.
pub async fn login(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    user_agent: Option<TypedHeader<UserAgent>>,
    headers: HeaderMap,
    jar: CookieJar,
    Json(login_req): Json<LoginRequest>,
) -> impl IntoResponse {
    let now_timestamp = chrono::Utc::now().timestamp();
    let ip_address = addr.ip().to_string();
    let user_agent = user_agent.map(|TypedHeader(ua)| ua.to_string());

    // Step 1: Validate email format
    let email = login_req.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return AuthError::InvalidCredentials.into_response();
    }

    // Step 2: IP-based rate limiting
    let config = crate::app_config::config();
    if config.features.enable_rate_limiting {
        let ip_rate_key = format!("login:ip:{}", ip_address);
        let ip_rate_config = RateLimitConfig {
            max_requests: config.security.login_rate_limit_per_ip,
            window_seconds: 60,
            burst_limit: Some(config.security.login_rate_limit_per_ip),
            block_duration: 60,
            distributed: true,
        };

        match state
            .rate_limit_service
            .check_rate_limit_with_config(&ip_rate_key, &ip_rate_config)
            .await
        {
            Ok(status) if !status.allowed => {
                let error = AuthError::RateLimited {
                    retry_after_seconds: status.retry_after.unwrap_or(60) as u64,
                };
                log_auth_failure(&email, &ip_address, &error, user_agent.as_deref());
                return error.into_response();
            },
            Err(e) => {
                tracing::warn!("Rate limit check failed for IP {}: {}", ip_address, e);
            },
            _ => {},
        }
    }

    // Step 3: Check account lockout
    if let Some(retry_after) = check_account_lockout_status(&state, &email).await {
        let error = AuthError::AccountLocked {
            retry_after_seconds: retry_after,
        };
        log_auth_failure(&email, &ip_address, &error, user_agent.as_deref());
        return error.into_response();
    }

    // Step 4: Load the user
    let mut conn = match state.diesel_pool.get().await {
        Ok(conn) => conn,
        Err(e) => {
            tracing::error!("Failed to get database connection: {}", e);
            return AuthError::InternalError.into_response();
        },
    };

    let user = match User::find_by_email(&mut conn, &email).await {
        Ok(user) => user,
        Err(UserError::NotFound) => {
            track_failed_login_by_ip_only(&state, &ip_address).await;
            log_auth_failure(
                &email,
                &ip_address,
                &AuthError::InvalidCredentials,
                user_agent.as_deref(),
            );
            return AuthError::InvalidCredentials.into_response();
        },
        Err(e) => {
            tracing::error!("Database error during login: {}", e);
            return AuthError::DatabaseError(e.to_string()).into_response();
        },
    };

    // Step 5: Email-based rate limiting (existing users only)
    let email_rate_key = format!("login:email:{}", email);
    let email_rate_config = RateLimitConfig {
        max_requests: config.security.login_rate_limit_per_email,
        window_seconds: 3600,
        burst_limit: Some(5),
        block_duration: 3600,
        distributed: true,
    };

    match state
        .rate_limit_service
        .check_rate_limit_with_config(&email_rate_key, &email_rate_config)
        .await
    {
        Ok(status) if !status.allowed => {
            let error = AuthError::RateLimited {
                retry_after_seconds: status.retry_after.unwrap_or(3600) as u64,
            };
            log_auth_failure(&email, &ip_address, &error, user_agent.as_deref());
            return error.into_response();
        },
        Err(e) => {
            tracing::warn!("Rate limit check failed for email {}: {}", email, e);
        },
        _ => {},
    }

    // Step 6: Account must be active
    if !user.is_active {
        log_auth_failure(
            &email,
            &ip_address,
            &AuthError::AccountInactive,
            user_agent.as_deref(),
        );
        return AuthError::AccountInactive.into_response();
    }

    // Step 7: Email must be verified (configurable)
    if config.security.require_email_verification && !user.email_verified {
        log_auth_failure(
            &email,
            &ip_address,
            &AuthError::EmailNotVerified,
            user_agent.as_deref(),
        );
        return AuthError::EmailNotVerified.into_response();
    }

    // Step 8: Verify the password
    match verify_password(&login_req.password, &user.password_hash) {
        Ok(true) => {},
        Ok(false) => {
            track_failed_login(&state, &email, &ip_address).await;

            let failed_attempts = get_failed_login_count(&state, &email).await;
            if failed_attempts >= config.security.login_lockout_threshold {
                let lockout_duration = config.security.login_lockout_duration_seconds;
                let locked_until = now_timestamp + lockout_duration as i64;
                let lockout_key = format!("lockout:{}", email);

                let _ = state
                    .redis_pool
                    .set_with_expiry(
                        &lockout_key,
                        locked_until.to_string(),
                        lockout_duration as usize,
                    )
                    .await;

                let audit = create_auth_audit_entry(
                    AuthEventType::AccountLocked,
                    Some(&user.id.to_string()),
                    &email,
                    &ip_address,
                    user_agent.as_deref(),
                    Some(serde_json::json!({
                        "failed_attempts": failed_attempts,
                        "lockout_duration": lockout_duration
                    })),
                );
                tracing::warn!("Account locked: {:?}", audit);

                return AuthError::AccountLocked {
                    retry_after_seconds: lockout_duration as u64,
                }
                .into_response();
            }

            log_auth_failure(
                &email,
                &ip_address,
                &AuthError::InvalidCredentials,
                user_agent.as_deref(),
            );
            return AuthError::InvalidCredentials.into_response();
        },
        Err(e) => {
            tracing::error!("Password verification error: {}", e);
            return AuthError::InternalError.into_response();
        },
    }

    // Step 9: Clear failure counters
    clear_failed_login_attempts(&state, &email).await;

    // Step 10: Issue tokens
    let device_info = device_info_from_request(&user_agent, &addr, &headers);
    let role = user.role_enum();
    let scope = PermissionConfig::scopes_for_role(&role);

    let access_token = match state.jwt_service.generate_access_token(
        &user.id.to_string(),
        &email,
        role.as_str(),
        scope,
    ) {
        Ok(token) => token,
        Err(e) => {
            tracing::error!("Failed to generate access token: {}", e);
            return AuthError::TokenError(e.to_string()).into_response();
        },
    };

    let refresh_token = match state
        .jwt_service
        .generate_refresh_token_with_device(
            &user.id.to_string(),
            device_info.clone(),
            login_req.remember_me,
        )
        .await
    {
        Ok(token) => token,
        Err(e) => {
            tracing::error!("Failed to generate refresh token: {}", e);
            return AuthError::TokenError(e.to_string()).into_response();
        },
    };

    // Step 11: Audit the successful login
    let audit = create_auth_audit_entry(
        AuthEventType::LoginSuccess,
        Some(&user.id.to_string()),
        &email,
        &ip_address,
        user_agent.as_deref(),
        Some(serde_json::json!({
            "remember_me": login_req.remember_me,
            "device_fingerprint": device_info.fingerprint
        })),
    );
    tracing::info!("Login successful: {:?}", audit);

    // Step 12: Build the response
    let response = AuthResponse {
        success: true,
        data: Some(LoginResponse {
            access_token,
            refresh_token: refresh_token.clone(), // JSON copy for mobile clients
            expires_in: state.jwt_service.access_token_expiry(),
            token_type: "Bearer".to_string(),
            user: LoginUserInfo {
                id: user.id.to_string(),
                email: user.email,
                full_name: user.full_name,
                role: user.role,
            },
            remember_me: login_req.remember_me,
        }),
        message: "Login successful".to_string(),
    };

    // Step 13: HttpOnly cookie for web clients
    let refresh_cookie = create_refresh_token_cookie(refresh_token, login_req.remember_me, config);
    let updated_jar = jar.add(refresh_cookie);

    (StatusCode::OK, updated_jar, Json(response)).into_response()
}

/// POST /auth/register - Create a customer or restaurant account.
/// Restaurant registration also creates the restaurant row (pending
/// review) with a generated slug, in the same transaction.
pub async fn register(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(register_req): Json<RegisterRequest>,
) -> impl IntoResponse {
    // Step 1: Field validation
    if let Err(validation_errors) = register_req.validate() {
        let error_messages: Vec<String> = validation_errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| {
                    let message = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string());
                    format!("{}: {}", field, message)
                })
            })
            .collect();

        let response = AuthResponse::<RegisterResponse> {
            success: false,
            data: None,
            message: error_messages.join(", "),
        };
        return (StatusCode::BAD_REQUEST, Json(response)).into_response();
    }

    if register_req.password != register_req.password_confirmation {
        let response = AuthResponse::<RegisterResponse> {
            success: false,
            data: None,
            message: "Passwords do not match".to_string(),
        };
        return (StatusCode::BAD_REQUEST, Json(response)).into_response();
    }

    if !register_req.accept_terms {
        let response = AuthResponse::<RegisterResponse> {
            success: false,
            data: None,
            message: "You must accept the terms and conditions".to_string(),
        };
        return (StatusCode::BAD_REQUEST, Json(response)).into_response();
    }

    // Step 2: Role must be self-assignable
    let role = match Role::from_str(&register_req.role) {
        Ok(role) if role.is_self_assignable() => role,
        Ok(_) | Err(_) => {
            let response = AuthResponse::<RegisterResponse> {
                success: false,
                data: None,
                message: "Role must be 'customer' or 'restaurant'".to_string(),
            };
            return (StatusCode::BAD_REQUEST, Json(response)).into_response();
        },
    };

    // Restaurant accounts need a restaurant name for the profile row
    let restaurant_name = trim_optional_field(register_req.restaurant_name.as_ref());
    if role == Role::Restaurant && restaurant_name.is_none() {
        let response = AuthResponse::<RegisterResponse> {
            success: false,
            data: None,
            message: "Restaurant name is required for restaurant accounts".to_string(),
        };
        return (StatusCode::BAD_REQUEST, Json(response)).into_response();
    }

    // Step 3: Rate limiting per IP
    let config = crate::app_config::config();
    if config.features.enable_rate_limiting {
        let rate_limit_key = format!("register:{}", addr.ip());
        let rate_limit_config = RateLimitConfig {
            max_requests: 5,
            window_seconds: 60,
            burst_limit: Some(5),
            block_duration: 60,
            distributed: false,
        };

        match state
            .rate_limit_service
            .check_rate_limit_with_config(&rate_limit_key, &rate_limit_config)
            .await
        {
            Ok(status) if !status.allowed => {
                let response = AuthResponse::<RegisterResponse> {
                    success: false,
                    data: None,
                    message: format!(
                        "Too many registration attempts. Please try again in {} seconds",
                        status.retry_after.unwrap_or(60)
                    ),
                };
                return (StatusCode::TOO_MANY_REQUESTS, Json(response)).into_response();
            },
            Err(e) => {
                tracing::warn!("Rate limit check failed for registration: {}", e);
            },
            _ => {},
        }
    }

    // Step 4: Email uniqueness (case-insensitive)
    let mut conn = match state.diesel_pool.get().await {
        Ok(conn) => conn,
        Err(e) => {
            tracing::error!("Failed to get database connection: {}", e);
            let response = AuthResponse::<RegisterResponse> {
                success: false,
                data: None,
                message: "Database connection error".to_string(),
            };
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(response)).into_response();
        },
    };

    match User::find_by_email(&mut conn, &register_req.email).await {
        Ok(_existing_user) => {
            let response = AuthResponse::<RegisterResponse> {
                success: false,
                data: None,
                message: "An account with this email address already exists".to_string(),
            };
            return (StatusCode::CONFLICT, Json(response)).into_response();
        },
        Err(UserError::NotFound) => {},
        Err(e) => {
            tracing::error!("Error checking email uniqueness: {}", e);
            let response = AuthResponse::<RegisterResponse> {
                success: false,
                data: None,
                message: "Failed to check email availability".to_string(),
            };
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(response)).into_response();
        },
    }

    // Step 5: Hash the password
    let password_hash = match hash_password(&register_req.password) {
        Ok(hash) => hash,
        Err(e) => {
            tracing::error!("Failed to hash password: {}", e);
            let response = AuthResponse::<RegisterResponse> {
                success: false,
                data: None,
                message: "Failed to process password".to_string(),
            };
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(response)).into_response();
        },
    };

    let full_name = match trim_and_validate_field(&register_req.full_name, true) {
        Ok(name) => name,
        Err(_) => {
            let response = AuthResponse::<RegisterResponse> {
                success: false,
                data: None,
                message: "Full name cannot be empty".to_string(),
            };
            return (StatusCode::BAD_REQUEST, Json(response)).into_response();
        },
    };

    let phone = trim_optional_field(register_req.phone.as_ref());

    // Step 6: Create user (and restaurant, for owner accounts) atomically
    let new_user = NewUser {
        email: register_req.email.to_lowercase(),
        password_hash,
        role: role.as_str().to_string(),
        email_verified: false,
        full_name,
        phone,
    };

    let created = conn
        .transaction::<_, UserError, _>(|conn| {
            {
                let restaurant_name = restaurant_name.clone();
                let role = role.clone();
                async move {
                    let user = User::create(conn, new_user).await?;

                    let restaurant_slug = if role == Role::Restaurant {
                        let name = restaurant_name.expect("checked above");
                        let slug_value = slug::generate_unique_slug(conn, &name, None)
                            .await
                            .map_err(|e| match e {
                                slug::SlugError::Database(e) => UserError::Database(e),
                                _ => UserError::Pool(e.to_string()),
                            })?;

                        let restaurant = Restaurant::create(
                            conn,
                            NewRestaurant {
                                owner_id: user.id,
                                name,
                                slug: slug_value,
                                contract_status: ContractStatus::Pending.as_str().to_string(),
                                plan: Plan::Basic.as_str().to_string(),
                                is_active: false,
                            },
                        )
                        .await
                        .map_err(|e| match e {
                            crate::models::restaurant::RestaurantError::Database(e) => {
                                UserError::Database(e)
                            },
                            e => UserError::Pool(e.to_string()),
                        })?;

                        Some(restaurant.slug)
                    } else {
                        None
                    };

                    Ok((user, restaurant_slug))
                }
            }
            .scope_boxed()
        })
        .await;

    let (created_user, restaurant_slug) = match created {
        Ok(result) => result,
        Err(e) => {
            tracing::error!("Failed to create account: {}", e);
            let response = AuthResponse::<RegisterResponse> {
                success: false,
                data: None,
                message: "Failed to create user account".to_string(),
            };
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(response)).into_response();
        },
    };

    // Step 7: Store and send the verification code
    let code = crate::services::VerificationService::generate_code();
    let verification_sent = match state
        .verification_service
        .store_code(&created_user.email, &created_user.id.to_string(), &code)
        .await
    {
        Ok(()) => {
            match state
                .email_service
                .send_verification_email(
                    &created_user.email,
                    &created_user.full_name,
                    &code,
                    state.verification_service.code_ttl_minutes(),
                )
                .await
            {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!("Failed to send verification email: {}", e);
                    false
                },
            }
        },
        Err(e) => {
            tracing::warn!("Failed to store verification code: {}", e);
            false
        },
    };

    // Step 8: Response
    let register_response = RegisterResponse {
        user_id: created_user.id.to_string(),
        email: created_user.email.clone(),
        full_name: created_user.full_name.clone(),
        role: created_user.role.clone(),
        restaurant_slug,
        email_verification_required: config.security.require_email_verification,
        verification_sent,
        message: if verification_sent {
            "Registration successful! Please check your email for a 6-digit verification code."
                .to_string()
        } else {
            "Registration successful! Verification email will be sent shortly.".to_string()
        },
    };

    let response = AuthResponse {
        success: true,
        data: Some(register_response),
        message: "User registered successfully".to_string(),
    };

    tracing::info!("New {} account registered: {}", created_user.role, created_user.email);
    (StatusCode::CREATED, Json(response)).into_response()
}

/// POST /auth/refresh - Rotate the refresh token and mint a new access
/// token. Accepts the token via cookie (web) or JSON body (mobile).
pub async fn refresh_token(
    State(state): State<AppState>,
    user_agent: Option<TypedHeader<UserAgent>>,
    headers: HeaderMap,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    jar: CookieJar,
    body: axum::body::Bytes,
) -> impl IntoResponse {
    let user_agent = user_agent.map(|TypedHeader(ua)| ua.to_string());
    let device_info = device_info_from_request(&user_agent, &addr, &headers);

    let refresh_token = match extract_refresh_token(&jar, &body) {
        Ok(token) => token,
        Err(response) => return response,
    };

    // Rate limiting per IP, stricter than normal endpoints
    let config = crate::app_config::config();
    if config.features.enable_rate_limiting {
        let rate_limit_key = format!("refresh:{}", addr.ip());
        let refresh_limit = config.refresh_rate_limit_config();

        match state
            .rate_limit_service
            .check_rate_limit_with_config(&rate_limit_key, &refresh_limit)
            .await
        {
            Ok(status) if !status.allowed => {
                return AuthError::RateLimited {
                    retry_after_seconds: status.retry_after.unwrap_or(60) as u64,
                }
                .into_response();
            },
            Err(e) => {
                tracing::warn!("Rate limit check failed for refresh: {}", e);
            },
            _ => {},
        }
    }

    let remember_me = jar
        .get("refresh_token")
        .map(|_| true)
        .unwrap_or(false);

    match state
        .jwt_service
        .refresh_tokens(&refresh_token, device_info)
        .await
    {
        Ok((access_token, new_refresh_token)) => {
            let response = AuthResponse {
                success: true,
                data: Some(TokenResponse {
                    access_token,
                    refresh_token: new_refresh_token.clone(),
                    expires_in: state.jwt_service.access_token_expiry(),
                    token_type: "Bearer".to_string(),
                }),
                message: "Tokens refreshed".to_string(),
            };

            let cookie = create_refresh_token_cookie(new_refresh_token, remember_me, config);
            (StatusCode::OK, jar.add(cookie), Json(response)).into_response()
        },
        Err(e) => {
            tracing::warn!("Token refresh failed: {}", e);
            let (status, message) = match e {
                JwtError::TokenExpired => (StatusCode::UNAUTHORIZED, "Refresh token expired"),
                JwtError::TokenRevoked => (StatusCode::UNAUTHORIZED, "Refresh token revoked"),
                JwtError::TokenReuseDetected => {
                    (StatusCode::UNAUTHORIZED, "Refresh token reuse detected")
                },
                JwtError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid refresh token"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "Token refresh failed"),
            };

            let response = AuthResponse::<TokenResponse> {
                success: false,
                data: None,
                message: message.to_string(),
            };
            (status, jar.add(create_delete_refresh_cookie(config)), Json(response))
                .into_response()
        },
    }
}

/// POST /auth/logout - Revoke the refresh token and blacklist the
/// presented access token until its natural expiry.
pub async fn logout(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    jar: CookieJar,
    body: axum::body::Bytes,
) -> impl IntoResponse {
    // Blacklist the access token for its remaining lifetime
    let now = chrono::Utc::now().timestamp() as u64;
    let remaining_ttl = auth_user.exp.saturating_sub(now).max(1);
    if let Err(e) = state
        .jwt_service
        .logout_token(&auth_user.token_id, remaining_ttl)
        .await
    {
        tracing::warn!("Failed to blacklist access token: {}", e);
    }

    // Revoke the refresh token when one was presented
    if let Ok(refresh_token) = extract_refresh_token(&jar, &body) {
        if let Err(e) = state
            .jwt_service
            .revoke_refresh_token(&refresh_token, "logout")
            .await
        {
            tracing::warn!("Failed to revoke refresh token on logout: {}", e);
        }
    }

    let config = crate::app_config::config();
    let response = AuthResponse::<TokenResponse> {
        success: true,
        data: None,
        message: "Logged out".to_string(),
    };

    (
        StatusCode::OK,
        jar.add(create_delete_refresh_cookie(config)),
        Json(response),
    )
        .into_response()
}

/// GET /auth/me - Current user profile
pub async fn get_current_user(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
) -> impl IntoResponse {
    let user_id = match uuid::Uuid::parse_str(&auth_user.user_id) {
        Ok(id) => id,
        Err(_) => return AuthError::InvalidToken.into_response(),
    };

    let mut conn = match state.diesel_pool.get().await {
        Ok(conn) => conn,
        Err(e) => {
            tracing::error!("Failed to get database connection: {}", e);
            return AuthError::InternalError.into_response();
        },
    };

    match User::find_by_id(&mut conn, user_id).await {
        Ok(user) => {
            let response = AuthResponse {
                success: true,
                data: Some(UserInfo {
                    user_id: user.id.to_string(),
                    email: user.email,
                    full_name: user.full_name,
                    role: user.role,
                    email_verified: user.email_verified,
                    phone: user.phone,
                    permissions: auth_user.permissions,
                }),
                message: "OK".to_string(),
            };
            (StatusCode::OK, Json(response)).into_response()
        },
        Err(UserError::NotFound) => AuthError::UserNotFound.into_response(),
        Err(e) => {
            tracing::error!("Failed to load user: {}", e);
            AuthError::InternalError.into_response()
        },
    }
}

/// POST /auth/verify-email - Verify the 6-digit code
pub async fn verify_email(
    State(state): State<AppState>,
    Json(request): Json<VerifyEmailRequest>,
) -> impl IntoResponse {
    let email = request.email.trim().to_lowercase();
    let code = request.code.trim();

    if email.is_empty() || code.len() != 6 || !code.chars().all(|c| c.is_ascii_digit()) {
        return AuthError::ValidationError("Invalid email or code format".to_string())
            .into_response();
    }

    let user_id = match state.verification_service.verify_code(&email, code).await {
        Ok(user_id) => user_id,
        Err(VerificationError::InvalidCode) | Err(VerificationError::CodeExpired) => {
            return AuthError::InvalidToken.into_response();
        },
        Err(VerificationError::TooManyAttempts) => {
            return AuthError::RateLimited {
                retry_after_seconds: 0,
            }
            .into_response();
        },
        Err(e) => {
            tracing::error!("Verification failed: {}", e);
            return AuthError::InternalError.into_response();
        },
    };

    let user_uuid = match uuid::Uuid::parse_str(&user_id) {
        Ok(id) => id,
        Err(_) => return AuthError::InternalError.into_response(),
    };

    let mut conn = match state.diesel_pool.get().await {
        Ok(conn) => conn,
        Err(e) => {
            tracing::error!("Failed to get database connection: {}", e);
            return AuthError::InternalError.into_response();
        },
    };

    match User::mark_email_verified(&mut conn, user_uuid).await {
        Ok(user) => {
            let audit = create_auth_audit_entry(
                AuthEventType::EmailVerified,
                Some(&user.id.to_string()),
                &user.email,
                "",
                None,
                None,
            );
            tracing::info!("Email verified: {:?}", audit);

            let response = AuthResponse::<serde_json::Value> {
                success: true,
                data: Some(serde_json::json!({ "email_verified": true })),
                message: "Email verified successfully".to_string(),
            };
            (StatusCode::OK, Json(response)).into_response()
        },
        Err(e) => {
            tracing::error!("Failed to mark email verified: {}", e);
            AuthError::InternalError.into_response()
        },
    }
}

/// POST /auth/resend-verification - Send a fresh code, with cooldown
/// and a daily cap. Responds 200 regardless of account existence.
pub async fn resend_verification(
    State(state): State<AppState>,
    Json(request): Json<ResendVerificationRequest>,
) -> impl IntoResponse {
    let email = request.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return AuthError::ValidationError("Invalid email format".to_string()).into_response();
    }

    let generic_response = || {
        let response = AuthResponse::<serde_json::Value> {
            success: true,
            data: None,
            message: "If the address exists and is unverified, a new code has been sent"
                .to_string(),
        };
        (StatusCode::OK, Json(response)).into_response()
    };

    let mut conn = match state.diesel_pool.get().await {
        Ok(conn) => conn,
        Err(e) => {
            tracing::error!("Failed to get database connection: {}", e);
            return AuthError::InternalError.into_response();
        },
    };

    let user = match User::find_by_email(&mut conn, &email).await {
        Ok(user) => user,
        Err(UserError::NotFound) => return generic_response(),
        Err(e) => {
            tracing::error!("Database error during resend: {}", e);
            return AuthError::InternalError.into_response();
        },
    };

    if user.email_verified {
        return generic_response();
    }

    match state.verification_service.register_resend(&email).await {
        Ok(()) => {},
        Err(VerificationError::ResendCooldown) | Err(VerificationError::ResendLimitExceeded) => {
            return AuthError::RateLimited {
                retry_after_seconds: 60,
            }
            .into_response();
        },
        Err(e) => {
            tracing::error!("Resend bookkeeping failed: {}", e);
            return AuthError::InternalError.into_response();
        },
    }

    let code = crate::services::VerificationService::generate_code();
    if let Err(e) = state
        .verification_service
        .store_code(&email, &user.id.to_string(), &code)
        .await
    {
        tracing::error!("Failed to store verification code: {}", e);
        return AuthError::InternalError.into_response();
    }

    if let Err(e) = state
        .email_service
        .send_verification_email(
            &email,
            &user.full_name,
            &code,
            state.verification_service.code_ttl_minutes(),
        )
        .await
    {
        tracing::warn!("Failed to send verification email: {}", e);
    }

    generic_response()
}

/// POST /auth/forgot-password - Request a password reset link.
/// Always responds 200; unknown addresses are not revealed.
pub async fn forgot_password(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    user_agent: Option<TypedHeader<UserAgent>>,
    Json(request): Json<ForgotPasswordRequest>,
) -> impl IntoResponse {
    if let Err(e) = request.validate() {
        return AuthError::ValidationError(e.to_string()).into_response();
    }

    let user_agent = user_agent.map(|TypedHeader(ua)| ua.to_string());

    // Rate limiting per IP
    let config = crate::app_config::config();
    if config.features.enable_rate_limiting {
        let rate_limit_key = format!("forgot:{}", addr.ip());
        let rate_limit_config = RateLimitConfig {
            max_requests: 3,
            window_seconds: 3600,
            burst_limit: None,
            block_duration: 3600,
            distributed: true,
        };

        match state
            .rate_limit_service
            .check_rate_limit_with_config(&rate_limit_key, &rate_limit_config)
            .await
        {
            Ok(status) if !status.allowed => {
                return AuthError::RateLimited {
                    retry_after_seconds: status.retry_after.unwrap_or(3600) as u64,
                }
                .into_response();
            },
            Err(e) => {
                tracing::warn!("Rate limit check failed for forgot-password: {}", e);
            },
            _ => {},
        }
    }

    match state
        .password_reset_service
        .create_reset_request(&request.email, Some(addr.ip()), user_agent)
        .await
    {
        Ok(Some((user, token_info))) => {
            if let Err(e) = state
                .email_service
                .send_password_reset_email(
                    &user.email,
                    &user.full_name,
                    &token_info.token,
                    crate::services::PasswordResetService::token_ttl_minutes(),
                )
                .await
            {
                tracing::warn!("Failed to send password reset email: {}", e);
            }
        },
        Ok(None) => {
            // Unknown email; same response as success
        },
        Err(e) => {
            tracing::error!("Password reset request failed: {}", e);
            return e.into_response();
        },
    }

    let response = ForgotPasswordResponse {
        success: true,
        message: "If the address exists, a reset link has been sent".to_string(),
    };
    (StatusCode::OK, Json(response)).into_response()
}

/// POST /auth/reset-password - Consume the token and set a new password.
/// All refresh tokens are revoked afterwards.
pub async fn reset_password(
    State(state): State<AppState>,
    Json(request): Json<ResetPasswordRequest>,
) -> impl IntoResponse {
    if let Err(e) = request.validate() {
        return AuthError::ValidationError(e.to_string()).into_response();
    }

    if let Err(message) = request.validate_passwords_match() {
        return AuthError::ValidationError(message).into_response();
    }

    if let Err(e) = validate_password(&request.new_password) {
        return AuthError::ValidationError(format!("Password too weak: {}", e.code)).into_response();
    }

    let user_id = match state
        .password_reset_service
        .validate_and_consume_token(&request.token)
        .await
    {
        Ok(user_id) => user_id,
        Err(e) => return e.into_response(),
    };

    let password_hash = match hash_password(&request.new_password) {
        Ok(hash) => hash,
        Err(e) => {
            tracing::error!("Failed to hash password: {}", e);
            return AuthError::InternalError.into_response();
        },
    };

    let mut conn = match state.diesel_pool.get().await {
        Ok(conn) => conn,
        Err(e) => {
            tracing::error!("Failed to get database connection: {}", e);
            return AuthError::InternalError.into_response();
        },
    };

    let update = UserUpdate {
        password_hash: Some(password_hash),
        ..Default::default()
    };

    if let Err(e) = User::update(&mut conn, user_id, update).await {
        tracing::error!("Failed to update password: {}", e);
        return AuthError::InternalError.into_response();
    }
    drop(conn);

    // A password reset invalidates every session
    if let Err(e) = state
        .jwt_service
        .revoke_all_user_tokens(&user_id.to_string())
        .await
    {
        tracing::warn!("Failed to revoke sessions after reset: {}", e);
    }

    let audit = create_auth_audit_entry(
        AuthEventType::PasswordReset,
        Some(&user_id.to_string()),
        "",
        "",
        None,
        None,
    );
    tracing::info!("Password reset: {:?}", audit);

    let response = ResetPasswordResponse {
        success: true,
        message: "Password has been reset. Please log in with your new password.".to_string(),
    };
    (StatusCode::OK, Json(response)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_validation() {
        assert!(validate_password("Sup3r$ecret").is_ok());

        assert!(validate_password("short1!").is_err()); // too short
        assert!(validate_password("alllowercase1!").is_err()); // no uppercase
        assert!(validate_password("ALLUPPERCASE1!").is_err()); // no lowercase
        assert!(validate_password("NoDigitsHere!").is_err()); // no digit
        assert!(validate_password("NoSpecial123").is_err()); // no special char
    }

    #[test]
    fn test_jwt_format_check() {
        assert!(is_valid_jwt_format("aaa.bbb.ccc"));
        assert!(!is_valid_jwt_format("aaa.bbb"));
        assert!(!is_valid_jwt_format("aaa.bbb.ccc.ddd"));
        assert!(!is_valid_jwt_format("not-a-jwt"));
    }

    #[test]
    fn test_register_request_validation() {
        let valid = RegisterRequest {
            email: "owner@example.com".to_string(),
            password: "Sup3r$ecret".to_string(),
            password_confirmation: "Sup3r$ecret".to_string(),
            full_name: "Restaurant Owner".to_string(),
            role: "restaurant".to_string(),
            restaurant_name: Some("Zur Goldenen Gabel".to_string()),
            phone: None,
            accept_terms: true,
        };
        assert!(valid.validate().is_ok());

        let bad_email = RegisterRequest {
            email: "not-an-email".to_string(),
            ..valid_request()
        };
        assert!(bad_email.validate().is_err());

        let weak_password = RegisterRequest {
            password: "weak".to_string(),
            password_confirmation: "weak".to_string(),
            ..valid_request()
        };
        assert!(weak_password.validate().is_err());
    }

    fn valid_request() -> RegisterRequest {
        RegisterRequest {
            email: "guest@example.com".to_string(),
            password: "Sup3r$ecret".to_string(),
            password_confirmation: "Sup3r$ecret".to_string(),
            full_name: "Guest".to_string(),
            role: "customer".to_string(),
            restaurant_name: None,
            phone: None,
            accept_terms: true,
        }
    }
}
