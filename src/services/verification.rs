// Email verification codes stored in Redis with attempt and resend limits

use crate::db::RedisPool;
use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument, warn};

#[derive(Error, Debug)]
pub enum VerificationError {
    #[error("Invalid verification code")]
    InvalidCode,

    #[error("Verification code expired")]
    CodeExpired,

    #[error("Too many attempts")]
    TooManyAttempts,

    #[error("Too many resend requests")]
    ResendLimitExceeded,

    #[error("Please wait before requesting another code")]
    ResendCooldown,

    #[error("Redis error: {0}")]
    RedisError(String),

    #[error("Email already verified")]
    AlreadyVerified,
}

/// Verification code payload stored in Redis
#[derive(Debug, Serialize, Deserialize)]
struct StoredCode {
    code: String,
    user_id: String,
    created_at: i64,
    attempts: u32,
}

/// Manages email verification codes
#[derive(Clone)]
pub struct VerificationService {
    redis_pool: RedisPool,
    code_ttl: u64,
    max_attempts: u32,
    resend_limit: u32,
    resend_window: u64,
    resend_cooldown: u64,
}

impl VerificationService {
    pub fn new(redis_pool: RedisPool) -> Self {
        let security = &crate::app_config::config().security;
        Self {
            redis_pool,
            code_ttl: security.verification_code_ttl,
            max_attempts: security.verification_max_attempts,
            resend_limit: security.verification_resend_limit,
            resend_window: security.verification_resend_window,
            resend_cooldown: security.verification_resend_cooldown,
        }
    }

    fn code_key(email: &str) -> String {
        format!("verify:email:{}:code", email.to_lowercase())
    }

    fn resend_count_key(email: &str) -> String {
        format!("verify:email:{}:resends", email.to_lowercase())
    }

    fn cooldown_key(email: &str) -> String {
        format!("verify:email:{}:cooldown", email.to_lowercase())
    }

    /// Generate a 6-digit numeric verification code
    pub fn generate_code() -> String {
        let mut rng = rand::thread_rng();
        format!("{:06}", rng.gen_range(0..1_000_000))
    }

    /// Store a fresh verification code, replacing any previous one
    #[instrument(skip(self, code))]
    pub async fn store_code(
        &self,
        email: &str,
        user_id: &str,
        code: &str,
    ) -> Result<(), VerificationError> {
        let payload = StoredCode {
            code: code.to_string(),
            user_id: user_id.to_string(),
            created_at: Utc::now().timestamp(),
            attempts: 0,
        };

        let serialized = serde_json::to_string(&payload)
            .map_err(|e| VerificationError::RedisError(e.to_string()))?;

        self.redis_pool
            .set_with_expiry(&Self::code_key(email), serialized, self.code_ttl as usize)
            .await
            .map_err(|e| VerificationError::RedisError(e.to_string()))?;

        info!("Stored verification code for {}", email);
        Ok(())
    }

    /// Verify a submitted code. Returns the user id on success.
    #[instrument(skip(self, provided_code))]
    pub async fn verify_code(
        &self,
        email: &str,
        provided_code: &str,
    ) -> Result<String, VerificationError> {
        let key = Self::code_key(email);

        let data: String = self
            .redis_pool
            .get::<String>(&key)
            .await
            .map_err(|e| VerificationError::RedisError(e.to_string()))?
            .ok_or(VerificationError::InvalidCode)?;

        let mut stored: StoredCode = serde_json::from_str(&data)
            .map_err(|e| VerificationError::RedisError(e.to_string()))?;

        // TTL races can leave a stale value briefly readable
        let now = Utc::now().timestamp();
        if now - stored.created_at > self.code_ttl as i64 {
            self.redis_pool.del(&key).await.ok();
            return Err(VerificationError::CodeExpired);
        }

        if stored.attempts >= self.max_attempts {
            warn!("Too many verification attempts for {}", email);
            self.redis_pool.del(&key).await.ok();
            return Err(VerificationError::TooManyAttempts);
        }

        stored.attempts += 1;
        let serialized = serde_json::to_string(&stored)
            .map_err(|e| VerificationError::RedisError(e.to_string()))?;

        let remaining_ttl = self.code_ttl.saturating_sub((now - stored.created_at) as u64);
        self.redis_pool
            .set_with_expiry(&key, serialized, remaining_ttl as usize)
            .await
            .map_err(|e| VerificationError::RedisError(e.to_string()))?;

        if stored.code != provided_code {
            return Err(VerificationError::InvalidCode);
        }

        // Consumed: clear the code and counters
        self.redis_pool.del(&key).await.ok();
        self.redis_pool.del(&Self::resend_count_key(email)).await.ok();
        self.redis_pool.del(&Self::cooldown_key(email)).await.ok();

        info!("Email verified for {}", email);
        Ok(stored.user_id)
    }

    /// Check resend limits, then record the resend. Returns an error when
    /// either the cooldown or the daily cap is hit.
    #[instrument(skip(self))]
    pub async fn register_resend(&self, email: &str) -> Result<(), VerificationError> {
        let cooldown_key = Self::cooldown_key(email);
        let on_cooldown: Option<String> = self
            .redis_pool
            .get(&cooldown_key)
            .await
            .map_err(|e| VerificationError::RedisError(e.to_string()))?;

        if on_cooldown.is_some() {
            return Err(VerificationError::ResendCooldown);
        }

        let count = self
            .redis_pool
            .incr(&Self::resend_count_key(email), self.resend_window as usize)
            .await
            .map_err(|e| VerificationError::RedisError(e.to_string()))?;

        if count > self.resend_limit as i64 {
            return Err(VerificationError::ResendLimitExceeded);
        }

        self.redis_pool
            .set_with_expiry(&cooldown_key, "1", self.resend_cooldown as usize)
            .await
            .map_err(|e| VerificationError::RedisError(e.to_string()))?;

        Ok(())
    }

    pub fn code_ttl_minutes(&self) -> u32 {
        (self.code_ttl / 60) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_code_shape() {
        for _ in 0..100 {
            let code = VerificationService::generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_key_naming_is_case_insensitive() {
        assert_eq!(
            VerificationService::code_key("User@Example.COM"),
            VerificationService::code_key("user@example.com")
        );
    }
}
