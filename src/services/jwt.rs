// JWT token service (HS256) with database-backed refresh token rotation

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use redis::AsyncCommands;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Uuid;

use crate::config::PermissionConfig;
use crate::db::{DieselPool, RedisPool};
use crate::models::auth::{AccessTokenClaims, RefreshTokenClaims};
use crate::models::refresh_token::{DeviceInfo, RefreshToken, RefreshTokenError};
use crate::models::user::{User, UserError};

#[derive(Error, Debug)]
pub enum JwtError {
    #[error("JWT encoding error: {0}")]
    EncodingError(String),

    #[error("Key generation error: {0}")]
    KeyGenerationError(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token revoked")]
    TokenRevoked,

    #[error("Token reuse detected - possible security breach")]
    TokenReuseDetected,

    #[error("Database error: {0}")]
    DatabaseError(#[from] RefreshTokenError),

    #[error("User error: {0}")]
    UserError(#[from] UserError),

    #[error("Pool error: {0}")]
    PoolError(String),
}

impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match err.kind() {
            ErrorKind::ExpiredSignature => JwtError::TokenExpired,
            ErrorKind::InvalidToken => JwtError::InvalidToken,
            _ => JwtError::EncodingError(err.to_string()),
        }
    }
}

/// JWT configuration with separate keys for access and refresh tokens
#[derive(Clone)]
pub struct JwtConfig {
    pub access_token_expiry: u64,
    pub refresh_token_expiry: u64,
    pub algorithm: Algorithm,

    pub audience: String,
    pub issuer: String,

    pub access_encoding_key: EncodingKey,
    pub access_decoding_key: DecodingKey,

    pub refresh_encoding_key: EncodingKey,
    pub refresh_decoding_key: DecodingKey,

    // Key versioning for rotation
    pub key_version: u32,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("access_token_expiry", &self.access_token_expiry)
            .field("refresh_token_expiry", &self.refresh_token_expiry)
            .field("algorithm", &self.algorithm)
            .field("audience", &self.audience)
            .field("issuer", &self.issuer)
            .field("access_encoding_key", &"<redacted>")
            .field("access_decoding_key", &"<redacted>")
            .field("refresh_encoding_key", &"<redacted>")
            .field("refresh_decoding_key", &"<redacted>")
            .field("key_version", &self.key_version)
            .finish()
    }
}

impl JwtConfig {
    fn build_from_params(
        access_secret: &str,
        refresh_secret: &str,
        access_expiry: u64,
        refresh_expiry: u64,
        audience: String,
        issuer: String,
        key_version: u32,
    ) -> Self {
        JwtConfig {
            access_token_expiry: access_expiry,
            refresh_token_expiry: refresh_expiry,
            algorithm: Algorithm::HS256,
            audience,
            issuer,
            access_encoding_key: EncodingKey::from_secret(access_secret.as_bytes()),
            access_decoding_key: DecodingKey::from_secret(access_secret.as_bytes()),
            refresh_encoding_key: EncodingKey::from_secret(refresh_secret.as_bytes()),
            refresh_decoding_key: DecodingKey::from_secret(refresh_secret.as_bytes()),
            key_version,
        }
    }

    /// Create JWT config from the centralized app configuration
    pub fn from_env() -> Result<Self, JwtError> {
        let crate::app_config::JwtConfig {
            access_secret,
            refresh_secret,
            access_expiry,
            refresh_expiry,
            audience,
            issuer,
            key_version,
        } = &crate::app_config::config().jwt;

        Ok(Self::build_from_params(
            access_secret,
            refresh_secret,
            *access_expiry,
            *refresh_expiry,
            audience.clone(),
            issuer.clone(),
            *key_version,
        ))
    }

    /// Deterministic config for tests, independent of environment
    #[cfg(test)]
    pub fn for_test() -> Self {
        Self::build_from_params(
            "test-access-secret-contact-tables-hs256",
            "test-refresh-secret-contact-tables-hs256",
            3600,
            604800,
            "test.contact-tables.app".to_string(),
            "test.contact-tables.app".to_string(),
            1,
        )
    }
}

/// JWT service. The database pool backs refresh token rotation; the
/// Redis pool backs the access-token logout blacklist.
pub struct JwtService {
    config: JwtConfig,
    db_pool: Option<DieselPool>,
    redis_pool: Option<RedisPool>,
}

impl JwtService {
    pub fn new(config: JwtConfig) -> Self {
        Self {
            config,
            db_pool: None,
            redis_pool: None,
        }
    }

    pub fn new_with_full_integration(
        config: JwtConfig,
        db_pool: DieselPool,
        redis_pool: RedisPool,
    ) -> Self {
        Self {
            config,
            db_pool: Some(db_pool),
            redis_pool: Some(redis_pool),
        }
    }

    pub fn from_env_with_diesel(
        db_pool: DieselPool,
        redis_pool: RedisPool,
    ) -> Result<Self, JwtError> {
        let config = JwtConfig::from_env()?;
        Ok(Self::new_with_full_integration(config, db_pool, redis_pool))
    }

    pub fn access_token_expiry(&self) -> u64 {
        self.config.access_token_expiry
    }

    async fn db_connection(
        &self,
    ) -> Result<
        bb8::PooledConnection<
            '_,
            diesel_async::pooled_connection::AsyncDieselConnectionManager<
                diesel_async::AsyncPgConnection,
            >,
        >,
        JwtError,
    > {
        let pool = self
            .db_pool
            .as_ref()
            .ok_or_else(|| JwtError::PoolError("Database pool not configured".to_string()))?;

        pool.get()
            .await
            .map_err(|e| JwtError::PoolError(e.to_string()))
    }

    fn now() -> Result<u64, JwtError> {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .map_err(|e| JwtError::KeyGenerationError(e.to_string()))
    }

    /// Generate an access token carrying the user's role and scopes
    pub fn generate_access_token(
        &self,
        user_id: &str,
        email: &str,
        role: &str,
        scope: Vec<String>,
    ) -> Result<String, JwtError> {
        let now = Self::now()?;

        let claims = AccessTokenClaims {
            sub: user_id.to_string(),
            jti: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
            scope,
            aud: self.config.audience.clone(),
            iss: self.config.issuer.clone(),
            iat: now,
            exp: now + self.config.access_token_expiry,
        };

        let mut header = Header::new(self.config.algorithm);
        header.kid = Some(self.config.key_version.to_string());

        encode(&header, &claims, &self.config.access_encoding_key).map_err(Into::into)
    }

    /// Validate an access token strictly (audience, issuer, zero leeway)
    pub fn validate_access_token(&self, token: &str) -> Result<AccessTokenClaims, JwtError> {
        let mut validation = Validation::new(self.config.algorithm);
        validation.set_audience(&[self.config.audience.clone()]);
        validation.set_issuer(&[self.config.issuer.clone()]);
        validation.validate_exp = true;
        validation.validate_nbf = false;
        validation.leeway = 0;

        let token_data =
            decode::<AccessTokenClaims>(token, &self.config.access_decoding_key, &validation)?;

        Ok(token_data.claims)
    }

    /// Generate a refresh token in a fresh token family, recording the
    /// device it was issued to.
    pub async fn generate_refresh_token_with_device(
        &self,
        user_id: &str,
        device_info: DeviceInfo,
        remember_me: bool,
    ) -> Result<String, JwtError> {
        let family = Uuid::new_v4().to_string();
        self.issue_refresh_token(user_id, family, device_info, remember_me)
            .await
    }

    /// Issue a refresh token inside an existing family (rotation keeps
    /// the family so reuse of a rotated-out token is attributable).
    async fn issue_refresh_token(
        &self,
        user_id: &str,
        token_family: String,
        device_info: DeviceInfo,
        remember_me: bool,
    ) -> Result<String, JwtError> {
        let now = Self::now()?;
        let jti = Uuid::new_v4().to_string();

        let expiry_seconds = if remember_me {
            crate::app_config::config()
                .security
                .remember_me_duration_days as u64
                * 86400
        } else {
            self.config.refresh_token_expiry
        };

        let claims = RefreshTokenClaims {
            sub: user_id.to_string(),
            jti: jti.clone(),
            iat: now,
            exp: now + expiry_seconds,
            remember_me,
        };

        if self.db_pool.is_some() {
            let mut conn = self.db_connection().await?;
            let expires_at = chrono::Utc::now() + chrono::Duration::seconds(expiry_seconds as i64);

            RefreshToken::store(
                &mut conn,
                Uuid::parse_str(user_id).map_err(|_| JwtError::InvalidToken)?,
                &jti,
                expires_at,
                token_family,
                device_info,
            )
            .await?;
        }

        let mut header = Header::new(self.config.algorithm);
        header.kid = Some(self.config.key_version.to_string());

        encode(&header, &claims, &self.config.refresh_encoding_key).map_err(Into::into)
    }

    /// Decode a refresh token and check it against the database
    pub async fn validate_refresh_token(
        &self,
        token: &str,
    ) -> Result<RefreshTokenClaims, JwtError> {
        let claims = self.decode_refresh_claims(token)?;

        if self.db_pool.is_some() {
            let mut conn = self.db_connection().await?;
            RefreshToken::validate(&mut conn, &claims.jti)
                .await
                .map_err(|e| match e {
                    RefreshTokenError::Expired => JwtError::TokenExpired,
                    RefreshTokenError::Revoked => JwtError::TokenRevoked,
                    RefreshTokenError::NotFound => JwtError::InvalidToken,
                    _ => JwtError::DatabaseError(e),
                })?;
        }

        Ok(claims)
    }

    fn decode_refresh_claims(&self, token: &str) -> Result<RefreshTokenClaims, JwtError> {
        let mut validation = Validation::new(self.config.algorithm);
        validation.validate_exp = true;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.leeway = 0;

        let token_data =
            decode::<RefreshTokenClaims>(token, &self.config.refresh_decoding_key, &validation)?;

        Ok(token_data.claims)
    }

    /// Rotate a refresh token: revoke the presented one and issue a new
    /// pair in the same family. Presenting an already-rotated token
    /// revokes the entire family (theft indicator).
    pub async fn refresh_tokens(
        &self,
        refresh_token: &str,
        device_info: DeviceInfo,
    ) -> Result<(String, String), JwtError> {
        let claims = self.decode_refresh_claims(refresh_token)?;

        let mut conn = self.db_connection().await?;

        // Row lock so concurrent refreshes rotate exactly once
        let stored = match RefreshToken::validate_and_lock(&mut conn, &claims.jti).await {
            Ok(token) => token,
            Err(RefreshTokenError::Revoked) => {
                // The token was already rotated out. Whoever holds it now
                // may have stolen it; kill the whole family.
                if let Ok(old) = RefreshToken::find_by_jti(&mut conn, &claims.jti).await {
                    let _ =
                        RefreshToken::revoke_family(&mut conn, &old.token_family, "reuse_detected")
                            .await;
                }
                tracing::warn!(user_id = %claims.sub, "Refresh token reuse detected");
                return Err(JwtError::TokenReuseDetected);
            },
            Err(RefreshTokenError::Expired) => return Err(JwtError::TokenExpired),
            Err(RefreshTokenError::NotFound) => return Err(JwtError::InvalidToken),
            Err(e) => return Err(JwtError::DatabaseError(e)),
        };

        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| JwtError::InvalidToken)?;
        let user = User::find_by_id(&mut conn, user_id)
            .await
            .map_err(|e| match e {
                UserError::NotFound => JwtError::InvalidToken,
                _ => JwtError::UserError(e),
            })?;

        RefreshToken::revoke(&mut conn, &claims.jti, "rotated").await?;
        RefreshToken::mark_as_used(&mut conn, stored.id).await?;
        drop(conn);

        let role = user.role_enum();
        let scope = PermissionConfig::scopes_for_role(&role);
        let access_token =
            self.generate_access_token(&user.id.to_string(), &user.email, role.as_str(), scope)?;

        let new_refresh = self
            .issue_refresh_token(
                &user.id.to_string(),
                stored.token_family,
                device_info,
                claims.remember_me,
            )
            .await?;

        Ok((access_token, new_refresh))
    }

    /// Blacklist an access token until it would have expired anyway
    pub async fn logout_token(&self, jti: &str, ttl_seconds: u64) -> Result<(), JwtError> {
        if let Some(redis_pool) = &self.redis_pool {
            let mut conn = redis_pool
                .get_connection()
                .await
                .map_err(|e| JwtError::PoolError(e.to_string()))?;

            let key = format!("blacklist:token:{}", jti);
            conn.set_ex::<_, _, ()>(key, "1", ttl_seconds)
                .await
                .map_err(|e| JwtError::PoolError(e.to_string()))?;
        }
        Ok(())
    }

    pub async fn is_token_blacklisted(&self, jti: &str) -> Result<bool, JwtError> {
        if let Some(redis_pool) = &self.redis_pool {
            let mut conn = redis_pool
                .get_connection()
                .await
                .map_err(|e| JwtError::PoolError(e.to_string()))?;

            let key = format!("blacklist:token:{}", jti);
            let exists: bool = conn
                .exists(&key)
                .await
                .map_err(|e| JwtError::PoolError(e.to_string()))?;
            Ok(exists)
        } else {
            Ok(false)
        }
    }

    /// Revoke a single refresh token (logout on one device)
    pub async fn revoke_refresh_token(&self, token: &str, reason: &str) -> Result<bool, JwtError> {
        let claims = self.decode_refresh_claims(token)?;
        let mut conn = self.db_connection().await?;
        Ok(RefreshToken::revoke(&mut conn, &claims.jti, reason).await?)
    }

    /// Revoke all refresh tokens of a user (logout everywhere)
    pub async fn revoke_all_user_tokens(&self, user_id: &str) -> Result<usize, JwtError> {
        if self.db_pool.is_none() {
            return Ok(0);
        }

        let mut conn = self.db_connection().await?;
        let user_uuid = Uuid::parse_str(user_id).map_err(|_| JwtError::InvalidToken)?;
        Ok(RefreshToken::revoke_all_for_user(&mut conn, user_uuid, "revoked_all").await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> JwtService {
        JwtService::new(JwtConfig::for_test())
    }

    #[test]
    fn test_access_token_round_trip() {
        let svc = service();
        let token = svc
            .generate_access_token(
                &Uuid::new_v4().to_string(),
                "guest@example.com",
                "customer",
                vec!["tables:join".to_string()],
            )
            .expect("Should generate token");

        let claims = svc.validate_access_token(&token).expect("Should validate");
        assert_eq!(claims.email, "guest@example.com");
        assert_eq!(claims.role, "customer");
        assert!(claims.has_scope("tables:join"));
        assert_eq!(claims.aud, "test.contact-tables.app");
    }

    #[test]
    fn test_access_token_rejects_tampered_signature() {
        let svc = service();
        let token = svc
            .generate_access_token(
                &Uuid::new_v4().to_string(),
                "guest@example.com",
                "customer",
                vec![],
            )
            .expect("Should generate token");

        let mut tampered = token.clone();
        tampered.pop();
        tampered.push(if token.ends_with('A') { 'B' } else { 'A' });

        assert!(svc.validate_access_token(&tampered).is_err());
    }

    #[test]
    fn test_access_token_rejects_wrong_audience() {
        let issuing = service();
        let token = issuing
            .generate_access_token(&Uuid::new_v4().to_string(), "a@b.c", "admin", vec![])
            .expect("Should generate token");

        let mut other_config = JwtConfig::for_test();
        other_config.audience = "some-other-service".to_string();
        let validating = JwtService::new(other_config);

        assert!(validating.validate_access_token(&token).is_err());
    }

    #[tokio::test]
    async fn test_refresh_claims_decode_without_db() {
        let svc = service();
        // Without a db pool, issue_refresh_token skips persistence
        let token = svc
            .generate_refresh_token_with_device(
                &Uuid::new_v4().to_string(),
                DeviceInfo::default(),
                false,
            )
            .await
            .expect("Should generate refresh token");

        let claims = svc.decode_refresh_claims(&token).expect("Should decode");
        assert!(!claims.remember_me);
        assert!(claims.exp > claims.iat);
    }
}
