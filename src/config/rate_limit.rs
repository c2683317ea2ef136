// Centralized rate limiting configuration
// Per-endpoint overrides on top of a single configurable default

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::services::rate_limit::RateLimitConfig;

/// Rate limiting configuration for the whole API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitingConfig {
    /// Default configuration for all endpoints
    pub default: RateLimitConfig,

    /// Endpoint-specific configurations (auth, contact form, uploads)
    pub endpoints: HashMap<String, RateLimitConfig>,

    /// Global settings
    pub global: GlobalRateLimitSettings,
}

/// Global rate limiting settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalRateLimitSettings {
    /// Enable distributed rate limiting across instances
    pub distributed: bool,

    /// Default block duration when no specific duration is set
    pub default_block_duration: u32,
}

impl Default for RateLimitingConfig {
    fn default() -> Self {
        let mut endpoints = HashMap::new();

        // Auth endpoints get stricter limits
        let auth_config = RateLimitConfig {
            max_requests: std::env::var("RATE_LIMIT_AUTH_MAX")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .unwrap_or(10),
            window_seconds: std::env::var("RATE_LIMIT_AUTH_WINDOW")
                .unwrap_or_else(|_| "900".to_string())
                .parse()
                .unwrap_or(900),
            burst_limit: None,
            block_duration: 1800,
            distributed: true,
        };

        endpoints.insert("/api/v1/auth/login".to_string(), auth_config.clone());
        endpoints.insert("/api/v1/auth/register".to_string(), auth_config.clone());
        endpoints.insert("/api/v1/auth/forgot-password".to_string(), auth_config);

        endpoints.insert(
            "/api/v1/auth/reset-password".to_string(),
            RateLimitConfig {
                max_requests: 3,
                window_seconds: 3600,
                burst_limit: None,
                block_duration: 3600,
                distributed: true,
            },
        );

        endpoints.insert(
            "/api/v1/auth/refresh".to_string(),
            RateLimitConfig {
                max_requests: 30,
                window_seconds: 3600,
                burst_limit: Some(5),
                block_duration: 600,
                distributed: true,
            },
        );

        // Public contact form
        endpoints.insert(
            "/api/v1/contact".to_string(),
            RateLimitConfig {
                max_requests: crate::app_config::config().security.contact_rate_limit_per_ip,
                window_seconds: 3600,
                burst_limit: None,
                block_duration: 3600,
                distributed: true,
            },
        );

        // Image uploads
        endpoints.insert(
            "/api/v1/restaurant/images".to_string(),
            RateLimitConfig {
                max_requests: 30,
                window_seconds: 3600,
                burst_limit: Some(5),
                block_duration: 600,
                distributed: true,
            },
        );

        Self {
            default: RateLimitConfig {
                max_requests: 300,
                window_seconds: 60,
                burst_limit: Some(50),
                block_duration: 60,
                distributed: true,
            },
            endpoints,
            global: GlobalRateLimitSettings {
                distributed: true,
                default_block_duration: 300,
            },
        }
    }
}

impl RateLimitingConfig {
    /// Load configuration, honoring environment overrides
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Configuration for a specific endpoint path, falling back to the default
    pub fn for_endpoint(&self, path: &str) -> &RateLimitConfig {
        self.endpoints.get(path).unwrap_or(&self.default)
    }
}
