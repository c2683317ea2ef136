// Refresh token persistence with rotation and reuse detection
// Only SHA-256 digests of token ids are stored at rest

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::schema::refresh_tokens;

/// Device information captured when a refresh token is issued
#[derive(Debug, Clone, Default)]
pub struct DeviceInfo {
    pub fingerprint: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(
    Debug, Clone, Serialize, Deserialize, Queryable, QueryableByName, Selectable, Identifiable,
)]
#[diesel(table_name = refresh_tokens)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct RefreshToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub jti_hash: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub token_family: String,
    pub issued_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub revoked_reason: Option<String>,
    pub device_fingerprint: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = refresh_tokens)]
pub struct NewRefreshToken {
    pub user_id: Uuid,
    pub jti_hash: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub token_family: String,
    pub issued_at: DateTime<Utc>,
    pub device_fingerprint: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum RefreshTokenError {
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("Token not found")]
    NotFound,

    #[error("Token expired")]
    Expired,

    #[error("Token revoked")]
    Revoked,

    #[error("Invalid token format")]
    InvalidFormat,

    #[error("Connection pool error")]
    Pool(String),

    #[error("Token reuse detected - possible theft attempt")]
    TokenReuseDetected,
}

impl RefreshToken {
    /// Salt for JTI hashing. Changing it invalidates all stored tokens;
    /// production refuses to start without one (see app_config).
    fn jti_hash_salt() -> Vec<u8> {
        #[cfg(test)]
        {
            // Unit tests run without full configuration
            if std::env::var("JWT_ACCESS_SECRET").is_err() {
                return b"test-only-jti-salt-never-use-in-production".to_vec();
            }
        }

        crate::app_config::config()
            .security
            .jti_hash_salt
            .as_ref()
            .map(|s| s.as_bytes().to_vec())
            .unwrap_or_else(|| b"contact-tables-dev-salt".to_vec())
    }

    /// SHA-256 digest of a JTI for at-rest storage
    pub fn hash_jti(jti: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(Self::jti_hash_salt());
        hasher.update(jti.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Store a new refresh token digest with device info
    pub async fn store(
        conn: &mut AsyncPgConnection,
        user_id_val: Uuid,
        jti: &str,
        expires_at_val: DateTime<Utc>,
        token_family_val: String,
        device_info: DeviceInfo,
    ) -> Result<Self, RefreshTokenError> {
        use crate::schema::refresh_tokens::dsl::*;

        let now = Utc::now();
        let new_token = NewRefreshToken {
            user_id: user_id_val,
            jti_hash: Self::hash_jti(jti),
            created_at: now,
            expires_at: expires_at_val,
            token_family: token_family_val,
            issued_at: now,
            device_fingerprint: device_info.fingerprint,
            ip_address: device_info.ip_address,
            user_agent: device_info.user_agent,
        };

        diesel::insert_into(refresh_tokens)
            .values(&new_token)
            .get_result::<RefreshToken>(conn)
            .await
            .map_err(RefreshTokenError::Database)
    }

    /// Look up a token by JTI without checking its state
    pub async fn find_by_jti(
        conn: &mut AsyncPgConnection,
        jti: &str,
    ) -> Result<Self, RefreshTokenError> {
        use crate::schema::refresh_tokens::dsl::*;

        refresh_tokens
            .filter(jti_hash.eq(Self::hash_jti(jti)))
            .first::<RefreshToken>(conn)
            .await
            .map_err(|e| match e {
                diesel::result::Error::NotFound => RefreshTokenError::NotFound,
                _ => RefreshTokenError::Database(e),
            })
    }

    /// Validate a token: exists, not revoked, not expired
    pub async fn validate(
        conn: &mut AsyncPgConnection,
        jti: &str,
    ) -> Result<Self, RefreshTokenError> {
        let token = Self::find_by_jti(conn, jti).await?;
        token.check_usable()
    }

    /// Validate with a pessimistic row lock so concurrent refresh
    /// requests rotate the token exactly once.
    pub async fn validate_and_lock(
        conn: &mut AsyncPgConnection,
        jti: &str,
    ) -> Result<Self, RefreshTokenError> {
        use diesel::sql_query;
        use diesel::sql_types::Text;

        let token = sql_query(
            "SELECT id, user_id, jti_hash, created_at, expires_at, revoked_at, \
             token_family, issued_at, last_used_at, revoked_reason, \
             device_fingerprint, ip_address, user_agent, updated_at \
             FROM refresh_tokens \
             WHERE jti_hash = $1 \
             FOR UPDATE",
        )
        .bind::<Text, _>(Self::hash_jti(jti))
        .get_result::<RefreshToken>(conn)
        .await
        .map_err(|e| match e {
            diesel::result::Error::NotFound => RefreshTokenError::NotFound,
            _ => RefreshTokenError::Database(e),
        })?;

        token.check_usable()
    }

    fn check_usable(self) -> Result<Self, RefreshTokenError> {
        if self.revoked_at.is_some() {
            return Err(RefreshTokenError::Revoked);
        }
        if self.expires_at <= Utc::now() {
            return Err(RefreshTokenError::Expired);
        }
        Ok(self)
    }

    /// Revoke a single token. Returns false when it was already revoked
    /// or does not exist.
    pub async fn revoke(
        conn: &mut AsyncPgConnection,
        jti: &str,
        reason: &str,
    ) -> Result<bool, RefreshTokenError> {
        use crate::schema::refresh_tokens::dsl::*;

        let now = Utc::now();
        let updated = diesel::update(
            refresh_tokens
                .filter(jti_hash.eq(Self::hash_jti(jti)))
                .filter(revoked_at.is_null()),
        )
        .set((
            revoked_at.eq(Some(now)),
            revoked_reason.eq(Some(reason.to_string())),
            updated_at.eq(now),
        ))
        .execute(conn)
        .await
        .map_err(RefreshTokenError::Database)?;

        Ok(updated > 0)
    }

    /// Revoke every active token of a user (logout everywhere,
    /// password reset)
    pub async fn revoke_all_for_user(
        conn: &mut AsyncPgConnection,
        user: Uuid,
        reason: &str,
    ) -> Result<usize, RefreshTokenError> {
        use crate::schema::refresh_tokens::dsl::*;

        let now = Utc::now();
        diesel::update(
            refresh_tokens
                .filter(user_id.eq(user))
                .filter(revoked_at.is_null()),
        )
        .set((
            revoked_at.eq(Some(now)),
            revoked_reason.eq(Some(reason.to_string())),
            updated_at.eq(now),
        ))
        .execute(conn)
        .await
        .map_err(RefreshTokenError::Database)
    }

    /// Revoke a whole token family. Called when a rotated-out token is
    /// presented again (theft indicator).
    pub async fn revoke_family(
        conn: &mut AsyncPgConnection,
        family: &str,
        reason: &str,
    ) -> Result<usize, RefreshTokenError> {
        use crate::schema::refresh_tokens::dsl::*;

        let now = Utc::now();
        diesel::update(
            refresh_tokens
                .filter(token_family.eq(family))
                .filter(revoked_at.is_null()),
        )
        .set((
            revoked_at.eq(Some(now)),
            revoked_reason.eq(Some(reason.to_string())),
            updated_at.eq(now),
        ))
        .execute(conn)
        .await
        .map_err(RefreshTokenError::Database)
    }

    /// Record a successful use of the token
    pub async fn mark_as_used(
        conn: &mut AsyncPgConnection,
        token_id: Uuid,
    ) -> Result<(), RefreshTokenError> {
        use crate::schema::refresh_tokens::dsl::*;

        let now = Utc::now();
        diesel::update(refresh_tokens.filter(id.eq(token_id)))
            .set((last_used_at.eq(Some(now)), updated_at.eq(now)))
            .execute(conn)
            .await
            .map_err(RefreshTokenError::Database)?;
        Ok(())
    }

    /// Delete tokens that expired more than the retention window ago
    pub async fn cleanup_expired(conn: &mut AsyncPgConnection) -> Result<usize, RefreshTokenError> {
        use crate::schema::refresh_tokens::dsl::*;

        diesel::delete(refresh_tokens.filter(expires_at.lt(Utc::now())))
            .execute(conn)
            .await
            .map_err(RefreshTokenError::Database)
    }

    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }

    pub fn is_active(&self) -> bool {
        !self.is_revoked() && !self.is_expired()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_jti_is_deterministic() {
        let jti = Uuid::new_v4().to_string();
        assert_eq!(RefreshToken::hash_jti(&jti), RefreshToken::hash_jti(&jti));
    }

    #[test]
    fn test_hash_jti_differs_per_token() {
        let a = RefreshToken::hash_jti("token-a");
        let b = RefreshToken::hash_jti("token-b");
        assert_ne!(a, b);
    }

    #[test]
    fn test_hash_jti_is_hex_sha256() {
        let hash = RefreshToken::hash_jti("some-jti");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_token_state_helpers() {
        let now = Utc::now();
        let mut token = RefreshToken {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            jti_hash: "hash".to_string(),
            created_at: now,
            expires_at: now + chrono::Duration::days(7),
            revoked_at: None,
            token_family: "family".to_string(),
            issued_at: now,
            last_used_at: None,
            revoked_reason: None,
            device_fingerprint: None,
            ip_address: None,
            user_agent: None,
            updated_at: now,
        };

        assert!(token.is_active());

        token.revoked_at = Some(now);
        assert!(token.is_revoked());
        assert!(!token.is_active());

        token.revoked_at = None;
        token.expires_at = now - chrono::Duration::seconds(1);
        assert!(token.is_expired());
        assert!(!token.is_active());
    }
}
