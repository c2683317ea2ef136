// Library exports for the Contact Tables backend

pub mod app;
pub mod app_config;
pub mod config;
pub mod db;
pub mod handlers;
pub mod middleware;
pub mod migrations;
pub mod models;
pub mod schema;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use app::AppState;
pub use app_config::{AppConfig, CONFIG};
pub use config::{GlobalRateLimitSettings, RateLimitingConfig};
pub use db::{DieselDatabaseConfig, DieselPool, RedisConfig, RedisPool};
pub use middleware::auth_middleware;
pub use middleware::AuthenticatedUser;
pub use models::auth::{AccessTokenClaims, RefreshTokenClaims};
pub use models::refresh_token::{RefreshToken, RefreshTokenError};
pub use services::{
    ContactTableService, ContractService, EmailService, JwtConfig, JwtError, JwtService,
    PasswordResetService, PlanDefinition, RateLimitConfig, RateLimitResult, RateLimitService,
    RestaurantService, StorageService, VerificationService,
};

use std::sync::Arc;
use tower_http::services::ServeDir;
use tracing::info;

/// Initialize pools and services and assemble the shared state
pub async fn initialize_app_state() -> Result<AppState, Box<dyn std::error::Error>> {
    // Load environment
    dotenv::dotenv().ok();

    let config = app_config::config();

    // Database pool
    info!("Initializing database pool...");
    let db_config = db::DieselDatabaseConfig::default();
    let max_connections = db_config.max_connections;
    let diesel_pool = db::create_diesel_pool(db_config).await?;

    // Embedded migrations
    if migrations::should_run_migrations() {
        info!("Running embedded migrations...");
        let migration_config = migrations::MigrationConfig::default();
        migrations::run_all_migrations(&diesel_pool, migration_config)
            .await
            .map_err(|e| format!("Migration failed: {}", e))?;
    }

    // Redis pool
    info!("Initializing Redis pool...");
    let redis_config = RedisConfig::from_env();
    let redis_pool = RedisPool::new(redis_config).await?;

    // Services
    let rate_limit_service = Arc::new(RateLimitService::new(redis_pool.clone()));
    let jwt_service = Arc::new(JwtService::from_env_with_diesel(
        diesel_pool.clone(),
        redis_pool.clone(),
    )?);
    let verification_service = Arc::new(VerificationService::new(redis_pool.clone()));
    let password_reset_service = Arc::new(PasswordResetService::new(diesel_pool.clone()));
    let email_service = Arc::new(EmailService::new(
        config.email.clone(),
        config.frontend_url.clone(),
    )?);
    let storage_service = Arc::new(StorageService::new(&config.storage));

    Ok(AppState {
        config: Arc::new(config.clone()),
        diesel_pool,
        redis_pool,
        jwt_service,
        rate_limit_service,
        verification_service,
        password_reset_service,
        email_service,
        storage_service,
        max_connections,
    })
}

/// Assemble the full application router
pub fn build_router(state: AppState) -> axum::Router {
    use axum::routing::get;

    let api = axum::Router::new()
        .route("/health", get(health_check))
        .nest("/auth", handlers::auth_routes())
        .nest("/auth", handlers::session_routes(state.clone()))
        .merge(handlers::discovery_routes())
        .merge(handlers::customer_routes(state.clone()))
        .merge(handlers::restaurant_routes(state.clone()))
        .merge(handlers::admin_routes(state.clone()));

    let mut router = axum::Router::new()
        .nest("/api/v1", api)
        .merge(handlers::page_routes())
        .nest_service(
            &state.config.storage.public_base_url,
            ServeDir::new(&state.config.storage.root_dir),
        );

    if state.config.features.enable_swagger_ui {
        router = router.merge(handlers::docs_routes());
    }

    router
        .layer(axum::middleware::from_fn(
            middleware::dynamic_cors_middleware,
        ))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Aggregate health check for PostgreSQL and Redis
pub async fn health_check(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> impl axum::response::IntoResponse {
    use axum::http::StatusCode;
    use axum::Json;

    let mut overall_healthy = true;
    let timestamp = chrono::Utc::now().to_rfc3339();

    let postgres_health = match db::check_diesel_health(&state.diesel_pool).await {
        Ok(_) => serde_json::json!({
            "status": "healthy",
            "max_connections": state.max_connections,
            "error": null
        }),
        Err(e) => {
            overall_healthy = false;
            serde_json::json!({
                "status": "unhealthy",
                "error": format!("Database connection failed: {}", e)
            })
        },
    };

    let redis_health_result = state.redis_pool.health_check().await;
    if !redis_health_result.is_healthy {
        overall_healthy = false;
    }

    let response = serde_json::json!({
        "status": if overall_healthy { "healthy" } else { "degraded" },
        "service": "contact-tables-backend",
        "timestamp": timestamp,
        "components": {
            "postgresql": postgres_health,
            "redis": serde_json::json!({
                "status": if redis_health_result.is_healthy { "healthy" } else { "unhealthy" },
                "latency_ms": redis_health_result.latency_ms,
                "error": redis_health_result.error
            })
        }
    });

    if overall_healthy {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}
