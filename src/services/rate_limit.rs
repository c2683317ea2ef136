// Redis-backed rate limiting with sliding window counters

use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    time::{SystemTime, UNIX_EPOCH},
};
use thiserror::Error;
use tracing::{instrument, warn};

use crate::db::RedisPool;

// =============================================================================
// ERROR TYPES
// =============================================================================

#[derive(Debug, Error)]
pub enum RateLimitError {
    #[error("Redis connection error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Rate limit exceeded")]
    LimitExceeded,
}

// =============================================================================
// CONFIGURATION
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RateLimitConfig {
    /// Maximum requests allowed in the time window
    pub max_requests: u32,

    /// Time window in seconds
    pub window_seconds: u32,

    /// Optional burst allowance beyond the normal limit
    pub burst_limit: Option<u32>,

    /// Block duration in seconds once the limit is exceeded
    pub block_duration: u32,

    /// Whether the limit is shared across instances
    pub distributed: bool,
}

impl RateLimitConfig {
    /// Stricter limits for authentication endpoints
    pub fn auth_endpoint() -> Self {
        Self {
            max_requests: 5,
            window_seconds: 900,
            burst_limit: None,
            block_duration: 1800,
            distributed: true,
        }
    }

    /// Default limits for authenticated API endpoints
    pub fn default_api() -> Self {
        Self {
            max_requests: 1000,
            window_seconds: 3600,
            burst_limit: Some(20),
            block_duration: 300,
            distributed: true,
        }
    }
}

/// Rate limit check result
#[derive(Debug, Clone, Serialize)]
pub struct RateLimitResult {
    pub allowed: bool,
    pub remaining: u32,
    pub reset_time: u64,
    pub retry_after: Option<u32>,
    pub current_count: u32,
}

// =============================================================================
// SERVICE
// =============================================================================

pub struct RateLimitService {
    redis_pool: RedisPool,
    default_config: RateLimitConfig,
    endpoint_configs: HashMap<String, RateLimitConfig>,
}

impl RateLimitService {
    pub fn new(redis_pool: RedisPool) -> Self {
        let limits = crate::config::RateLimitingConfig::from_env();

        Self {
            redis_pool,
            default_config: limits.default.clone(),
            endpoint_configs: limits.endpoints,
        }
    }

    fn get_config_for_endpoint(&self, endpoint: &str) -> &RateLimitConfig {
        self.endpoint_configs
            .get(endpoint)
            .unwrap_or(&self.default_config)
    }

    /// Check the limit for an endpoint using its configured settings
    #[instrument(skip(self), fields(key, endpoint))]
    pub async fn check_rate_limit(
        &self,
        key: &str,
        endpoint: &str,
    ) -> Result<RateLimitResult, RateLimitError> {
        let start = std::time::Instant::now();
        let config = self.get_config_for_endpoint(endpoint).clone();

        let result = self.sliding_window_check(key, &config).await?;

        let latency_ms = start.elapsed().as_millis() as u64;
        if latency_ms > 5 {
            warn!(
                "Rate limit check exceeded 5ms target: {}ms for key: {}",
                latency_ms, key
            );
        }

        Ok(result)
    }

    /// Check the limit with an explicit configuration
    pub async fn check_rate_limit_with_config(
        &self,
        key: &str,
        config: &RateLimitConfig,
    ) -> Result<RateLimitResult, RateLimitError> {
        self.sliding_window_check(key, config).await
    }

    /// Atomic sliding window check with burst support via a Lua script
    async fn sliding_window_check(
        &self,
        key: &str,
        config: &RateLimitConfig,
    ) -> Result<RateLimitResult, RateLimitError> {
        let mut conn = self.redis_pool.get_connection().await?;

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;

        let window_start = now - (config.window_seconds as u64 * 1000);
        let window_key = format!("rate_limit:{}", key);

        let script = r#"
            local key = KEYS[1]
            local now = tonumber(ARGV[1])
            local window_start = tonumber(ARGV[2])
            local max_requests = tonumber(ARGV[3])
            local window_seconds = tonumber(ARGV[4])
            local burst_limit = tonumber(ARGV[5]) or max_requests
            local block_duration = tonumber(ARGV[6])

            -- Drop entries that fell out of the sliding window
            redis.call('ZREMRANGEBYSCORE', key, '-inf', window_start)

            local current_count = redis.call('ZCARD', key)

            local block_key = key .. ':blocked'
            local is_blocked = redis.call('EXISTS', block_key)

            if is_blocked == 1 then
                local block_ttl = redis.call('TTL', block_key)
                return {0, 0, now + (window_seconds * 1000), block_ttl > 0 and block_ttl or block_duration, current_count}
            end

            local effective_limit = math.max(max_requests, burst_limit)
            local allowed = current_count < effective_limit

            if allowed then
                local rand = math.random(1000000)
                local request_id = now .. ':' .. rand
                redis.call('ZADD', key, now, request_id)
                current_count = current_count + 1

                local expire_at = now + (window_seconds * 1000)
                redis.call('PEXPIREAT', key, expire_at)
            else
                redis.call('SETEX', block_key, block_duration, '1')
            end

            local remaining = math.max(0, effective_limit - current_count)
            local reset_time = now + (window_seconds * 1000)
            local retry_after = allowed and 0 or block_duration

            return {allowed and 1 or 0, remaining, reset_time, retry_after, current_count}
        "#;

        let burst_limit = config.burst_limit.unwrap_or(config.max_requests);
        let result: Vec<u64> = redis::Script::new(script)
            .key(&window_key)
            .arg(now)
            .arg(window_start)
            .arg(config.max_requests)
            .arg(config.window_seconds)
            .arg(burst_limit)
            .arg(config.block_duration)
            .invoke_async(&mut conn)
            .await?;

        if result.len() != 5 {
            return Err(RateLimitError::Config(
                "Unexpected rate limit script result".to_string(),
            ));
        }

        let allowed = result[0] == 1;
        Ok(RateLimitResult {
            allowed,
            remaining: result[1] as u32,
            reset_time: result[2],
            retry_after: if allowed {
                None
            } else {
                Some(result[3] as u32)
            },
            current_count: result[4] as u32,
        })
    }

    /// Clear a rate limit key (used by tests and admin tooling)
    pub async fn reset(&self, key: &str) -> Result<(), RateLimitError> {
        let window_key = format!("rate_limit:{}", key);
        let block_key = format!("{}:blocked", window_key);
        self.redis_pool.del(&window_key).await?;
        self.redis_pool.del(&block_key).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_endpoint_config_is_strict() {
        let auth = RateLimitConfig::auth_endpoint();
        let api = RateLimitConfig::default_api();

        assert!(auth.max_requests < api.max_requests);
        assert!(auth.block_duration > api.block_duration);
    }

    #[test]
    fn test_config_serialization() {
        let config = RateLimitConfig::default_api();
        let json = serde_json::to_string(&config).expect("Should serialize");
        let back: RateLimitConfig = serde_json::from_str(&json).expect("Should deserialize");
        assert_eq!(config, back);
    }
}
