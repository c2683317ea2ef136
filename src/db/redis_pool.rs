// Redis connection handling built on redis-rs ConnectionManager
// Used for rate limiting, login lockout tracking, and verification codes

use redis::{aio::ConnectionManager, AsyncCommands, Client, RedisError};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

use super::redis_config::RedisConfig;

/// Shared Redis handle. ConnectionManager multiplexes over a single
/// reconnecting connection, so cloning the pool is cheap.
#[derive(Clone)]
pub struct RedisPool {
    manager: ConnectionManager,
    config: RedisConfig,
}

/// Health check status for Redis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisHealth {
    pub is_healthy: bool,
    pub latency_ms: u64,
    pub error: Option<String>,
}

impl RedisPool {
    /// Connect to Redis with retry and exponential backoff
    #[instrument(skip(config))]
    pub async fn new(config: RedisConfig) -> Result<Self, RedisError> {
        config.validate().map_err(|e| {
            error!("Invalid Redis configuration: {}", e);
            RedisError::from((
                redis::ErrorKind::InvalidClientConfig,
                "Invalid configuration",
            ))
        })?;

        info!("Connecting to Redis at {}", mask_redis_url(&config.redis_url));

        let client = Client::open(config.redis_url.as_str())?;

        let mut attempt = 0;
        let manager = loop {
            match ConnectionManager::new(client.clone()).await {
                Ok(manager) => break manager,
                Err(e) if attempt < config.retry_attempts => {
                    attempt += 1;
                    let delay = config.retry_delay * 2u32.saturating_pow(attempt - 1);
                    warn!(
                        "Redis connection attempt {} failed ({}), retrying in {:?}",
                        attempt, e, delay
                    );
                    sleep(delay).await;
                },
                Err(e) => return Err(e),
            }
        };

        info!("Redis connection established");
        Ok(Self { manager, config })
    }

    /// Get a handle to the multiplexed connection
    pub async fn get_connection(&self) -> Result<ConnectionManager, RedisError> {
        Ok(self.manager.clone())
    }

    /// Ping Redis and report latency
    pub async fn health_check(&self) -> RedisHealth {
        let start = Instant::now();
        let mut conn = self.manager.clone();

        let ping: Result<String, RedisError> =
            redis::cmd("PING").query_async(&mut conn).await;

        match ping {
            Ok(_) => RedisHealth {
                is_healthy: true,
                latency_ms: start.elapsed().as_millis() as u64,
                error: None,
            },
            Err(e) => RedisHealth {
                is_healthy: false,
                latency_ms: start.elapsed().as_millis() as u64,
                error: Some(e.to_string()),
            },
        }
    }

    /// GET a value, parsed from its string representation
    pub async fn get<T: std::str::FromStr>(&self, key: &str) -> Result<Option<T>, RedisError> {
        let mut conn = self.manager.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value.and_then(|v| v.parse().ok()))
    }

    /// SET a value with a TTL in seconds
    pub async fn set_with_expiry(
        &self,
        key: &str,
        value: impl redis::ToRedisArgs + Send + Sync,
        expiry_seconds: usize,
    ) -> Result<(), RedisError> {
        let mut conn = self.manager.clone();
        conn.set_ex(key, value, expiry_seconds as u64).await
    }

    /// INCR a counter, setting the TTL when the key is first created
    pub async fn incr(&self, key: &str, expiry_seconds: usize) -> Result<i64, RedisError> {
        let mut conn = self.manager.clone();
        let count: i64 = conn.incr(key, 1).await?;
        if count == 1 {
            let _: () = conn.expire(key, expiry_seconds as i64).await?;
        }
        Ok(count)
    }

    /// DEL a key
    pub async fn del(&self, key: &str) -> Result<(), RedisError> {
        let mut conn = self.manager.clone();
        conn.del(key).await
    }

    pub fn pool_size(&self) -> u32 {
        self.config.pool_size
    }
}

/// Mask credentials in a Redis URL for logging
pub fn mask_redis_url(url: &str) -> String {
    if let Ok(parsed) = url::Url::parse(url) {
        let scheme = parsed.scheme();
        let host = parsed.host_str().unwrap_or("***");
        let port = parsed.port().map(|p| format!(":{}", p)).unwrap_or_default();

        if parsed.password().is_some() {
            format!("{}://***@{}{}", scheme, host, port)
        } else {
            format!("{}://{}{}", scheme, host, port)
        }
    } else {
        "redis://***".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_redis_url_with_password() {
        let masked = mask_redis_url("redis://:topsecret@cache.internal:6379");
        assert!(!masked.contains("topsecret"));
        assert!(masked.contains("cache.internal"));
    }

    #[test]
    fn test_mask_redis_url_plain() {
        assert_eq!(
            mask_redis_url("redis://localhost:6379"),
            "redis://localhost:6379"
        );
    }
}
