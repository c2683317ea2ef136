// Application state shared across handlers

use std::sync::Arc;

use crate::{
    app_config::AppConfig,
    db::{DieselPool, RedisPool},
    services::{
        EmailService, JwtService, PasswordResetService, RateLimitService, StorageService,
        VerificationService,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub diesel_pool: DieselPool,
    pub redis_pool: RedisPool,
    pub jwt_service: Arc<JwtService>,
    pub rate_limit_service: Arc<RateLimitService>,
    pub verification_service: Arc<VerificationService>,
    pub password_reset_service: Arc<PasswordResetService>,
    pub email_service: Arc<EmailService>,
    pub storage_service: Arc<StorageService>,
    pub max_connections: u32,
}
