// JWT claims structures

use serde::{Deserialize, Serialize};

/// Access token claims. Carries the user's role and permission scope so
/// handlers can authorize without a database round trip.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccessTokenClaims {
    /// User ID (subject)
    pub sub: String,

    /// JWT ID for token revocation (UUID format)
    pub jti: String,

    /// User email address
    pub email: String,

    /// Account role (customer, restaurant, admin)
    pub role: String,

    /// Permission scopes for the role
    pub scope: Vec<String>,

    /// Audience
    pub aud: String,

    /// Issuer
    pub iss: String,

    /// Issued at timestamp (Unix epoch seconds)
    pub iat: u64,

    /// Expires at timestamp (Unix epoch seconds)
    pub exp: u64,
}

/// Refresh token claims. Minimal payload; everything else lives in the
/// refresh_tokens table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RefreshTokenClaims {
    /// User ID (subject)
    pub sub: String,

    /// JWT ID for token revocation (UUID format)
    pub jti: String,

    /// Issued at timestamp (Unix epoch seconds)
    pub iat: u64,

    /// Expires at timestamp (Unix epoch seconds)
    pub exp: u64,

    /// Remember me flag - controls cookie persistence across sessions
    #[serde(default)]
    pub remember_me: bool,
}

impl AccessTokenClaims {
    pub fn is_expired(&self) -> bool {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        self.exp < now
    }

    pub fn has_scope(&self, scope: &str) -> bool {
        self.scope.iter().any(|s| s == scope)
    }
}

impl RefreshTokenClaims {
    pub fn is_expired(&self) -> bool {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        self.exp < now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn claims(iat: u64, exp: u64) -> AccessTokenClaims {
        AccessTokenClaims {
            sub: "user-123".to_string(),
            jti: Uuid::new_v4().to_string(),
            email: "user@example.com".to_string(),
            role: "customer".to_string(),
            scope: vec!["tables:join".to_string()],
            aud: "contact-tables.app".to_string(),
            iss: "contact-tables.app".to_string(),
            iat,
            exp,
        }
    }

    #[test]
    fn test_access_claims_serialization_round_trip() {
        let claims = claims(1_700_000_000, 1_700_003_600);
        let json = serde_json::to_string(&claims).expect("Should serialize");
        let back: AccessTokenClaims = serde_json::from_str(&json).expect("Should deserialize");
        assert_eq!(claims, back);
    }

    #[test]
    fn test_access_claims_field_set() {
        let value = serde_json::to_value(claims(0, 0)).expect("Should serialize");
        let obj = value.as_object().expect("Should be object");

        for key in ["sub", "jti", "email", "role", "scope", "aud", "iss", "iat", "exp"] {
            assert!(obj.contains_key(key), "missing claim field {}", key);
        }
        assert_eq!(obj.len(), 9);
    }

    #[test]
    fn test_scope_check() {
        let c = claims(0, u64::MAX);
        assert!(c.has_scope("tables:join"));
        assert!(!c.has_scope("admin"));
    }

    #[test]
    fn test_expiry_check() {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs();

        assert!(claims(now - 3600, now - 1).is_expired());
        assert!(!claims(now, now + 3600).is_expired());
    }

    #[test]
    fn test_refresh_claims_remember_me_default() {
        let json = r#"{"sub":"u","jti":"j","iat":0,"exp":0}"#;
        let parsed: RefreshTokenClaims = serde_json::from_str(json).expect("Should deserialize");
        assert!(!parsed.remember_me);
    }
}
