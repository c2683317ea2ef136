// Redis connection configuration

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub redis_url: String,
    pub pool_size: u32,
    pub connection_timeout: Duration,
    pub command_timeout: Duration,
    pub retry_attempts: u32,
    pub retry_delay: Duration,
}

impl RedisConfig {
    /// Build from the centralized application configuration
    pub fn from_env() -> Self {
        let config = crate::app_config::config();
        Self {
            redis_url: config.redis.url.clone(),
            pool_size: config.redis.pool_size,
            connection_timeout: Duration::from_secs(config.redis.connection_timeout),
            command_timeout: Duration::from_secs(config.redis.command_timeout),
            retry_attempts: config.redis.retry_attempts,
            retry_delay: Duration::from_millis(config.redis.retry_delay_ms),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.redis_url.is_empty() {
            return Err("Redis URL cannot be empty".to_string());
        }
        if !self.redis_url.starts_with("redis://") && !self.redis_url.starts_with("rediss://") {
            return Err(format!("Invalid Redis URL scheme: {}", self.redis_url));
        }
        if self.pool_size == 0 {
            return Err("Redis pool size must be at least 1".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(url: &str, pool_size: u32) -> RedisConfig {
        RedisConfig {
            redis_url: url.to_string(),
            pool_size,
            connection_timeout: Duration::from_secs(5),
            command_timeout: Duration::from_secs(5),
            retry_attempts: 3,
            retry_delay: Duration::from_millis(100),
        }
    }

    #[test]
    fn test_validate_accepts_redis_scheme() {
        assert!(test_config("redis://localhost:6379", 4).validate().is_ok());
        assert!(test_config("rediss://cache.internal", 4).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_input() {
        assert!(test_config("", 4).validate().is_err());
        assert!(test_config("http://localhost", 4).validate().is_err());
        assert!(test_config("redis://localhost", 0).validate().is_err());
    }
}
