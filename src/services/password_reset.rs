// Password reset flow: DB-backed single-use tokens, sha256 at rest

use base64::prelude::{Engine, BASE64_URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::net::IpAddr;
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::db::DieselPool;
use crate::models::password_reset::{NewPasswordResetToken, PasswordResetToken};
use crate::models::user::User;
use crate::schema::{password_reset_tokens, users};
use crate::utils::AuthError;

/// Reset tokens stay valid for one hour
const TOKEN_TTL_MINUTES: i64 = 60;

/// Artificial work for the unknown-email path so response timing does
/// not reveal whether an account exists
const TIMING_MASK_DELAY_MS: u64 = 50;

pub struct PasswordResetService {
    pool: DieselPool,
}

/// A freshly generated reset token. `token` goes into the email link,
/// only `token_hash` is persisted.
pub struct PasswordResetTokenInfo {
    pub token: String,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
}

impl PasswordResetService {
    pub fn new(pool: DieselPool) -> Self {
        Self { pool }
    }

    pub fn token_ttl_minutes() -> u32 {
        TOKEN_TTL_MINUTES as u32
    }

    /// Generate a 256-bit random token, base64url-encoded for the URL
    pub fn generate_reset_token() -> PasswordResetTokenInfo {
        let mut token_bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut token_bytes);

        let token = BASE64_URL_SAFE_NO_PAD.encode(token_bytes);
        let token_hash = Self::hash_token(&token);

        PasswordResetTokenInfo {
            token,
            token_hash,
            expires_at: Utc::now() + Duration::minutes(TOKEN_TTL_MINUTES),
        }
    }

    fn hash_token(token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Create a reset request. Returns None for unknown emails without
    /// revealing their absence to the caller's clock.
    pub async fn create_reset_request(
        &self,
        email: &str,
        ip_address: Option<IpAddr>,
        user_agent: Option<String>,
    ) -> Result<Option<(User, PasswordResetTokenInfo)>, AuthError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| AuthError::DatabaseError(format!("Database connection failed: {}", e)))?;

        let token_info = Self::generate_reset_token();

        let user: User = match users::table
            .filter(users::email.ilike(email))
            .first(&mut conn)
            .await
        {
            Ok(user) => user,
            Err(_) => {
                tracing::info!("Password reset requested for unknown email");
                tokio::time::sleep(std::time::Duration::from_millis(TIMING_MASK_DELAY_MS)).await;
                return Ok(None);
            },
        };

        // One outstanding token per user
        diesel::delete(
            password_reset_tokens::table.filter(password_reset_tokens::user_id.eq(user.id)),
        )
        .execute(&mut conn)
        .await
        .map_err(|e| AuthError::DatabaseError(format!("Failed to clean existing tokens: {}", e)))?;

        let new_token = NewPasswordResetToken {
            user_id: user.id,
            token_hash: token_info.token_hash.clone(),
            expires_at: token_info.expires_at,
            ip_address: ip_address.map(|ip| ip.to_string()),
            user_agent,
        };

        diesel::insert_into(password_reset_tokens::table)
            .values(&new_token)
            .execute(&mut conn)
            .await
            .map_err(|e| AuthError::DatabaseError(format!("Failed to create reset token: {}", e)))?;

        tracing::info!(user_id = %user.id, "Password reset token created");

        Ok(Some((user, token_info)))
    }

    /// Validate and consume a token. Matching is constant-time over all
    /// live tokens to avoid timing side channels.
    pub async fn validate_and_consume_token(&self, token: &str) -> Result<Uuid, AuthError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| AuthError::DatabaseError(format!("Database connection failed: {}", e)))?;

        let provided_hash = Self::hash_token(token);

        let active_tokens: Vec<PasswordResetToken> = password_reset_tokens::table
            .filter(password_reset_tokens::used_at.is_null())
            .filter(password_reset_tokens::expires_at.gt(Utc::now()))
            .load(&mut conn)
            .await
            .map_err(|e| AuthError::DatabaseError(format!("Failed to load reset tokens: {}", e)))?;

        let mut found: Option<PasswordResetToken> = None;
        for record in active_tokens {
            if provided_hash
                .as_bytes()
                .ct_eq(record.token_hash.as_bytes())
                .into()
            {
                found = Some(record);
                break;
            }
        }

        let reset_token = found.ok_or(AuthError::InvalidToken)?;

        diesel::update(password_reset_tokens::table.find(reset_token.id))
            .set(password_reset_tokens::used_at.eq(Utc::now()))
            .execute(&mut conn)
            .await
            .map_err(|e| AuthError::DatabaseError(format!("Failed to mark token as used: {}", e)))?;

        tracing::info!(user_id = %reset_token.user_id, "Password reset token consumed");

        Ok(reset_token.user_id)
    }

    /// Delete expired tokens
    pub async fn cleanup_expired_tokens(&self) -> Result<u64, AuthError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| AuthError::DatabaseError(format!("Database connection failed: {}", e)))?;

        let deleted = diesel::delete(
            password_reset_tokens::table.filter(password_reset_tokens::expires_at.lt(Utc::now())),
        )
        .execute(&mut conn)
        .await
        .map_err(|e| AuthError::DatabaseError(format!("Failed to cleanup expired tokens: {}", e)))?;

        if deleted > 0 {
            tracing::info!("Cleaned up {} expired password reset tokens", deleted);
        }

        Ok(deleted as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_token_shape() {
        let info = PasswordResetService::generate_reset_token();

        // 32 bytes base64url without padding -> 43 characters
        assert_eq!(info.token.len(), 43);
        assert_eq!(info.token_hash.len(), 64);
        assert!(info.expires_at > Utc::now());
    }

    #[test]
    fn test_tokens_are_unique() {
        let a = PasswordResetService::generate_reset_token();
        let b = PasswordResetService::generate_reset_token();
        assert_ne!(a.token, b.token);
        assert_ne!(a.token_hash, b.token_hash);
    }

    #[test]
    fn test_hash_matches_token() {
        let info = PasswordResetService::generate_reset_token();
        assert_eq!(PasswordResetService::hash_token(&info.token), info.token_hash);
    }
}
