// Authenticated user context injected by the auth middleware

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::models::user::Role;

/// User information extracted from a validated access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub token_id: String,
    pub email: String,
    pub role: String,
    pub permissions: Vec<String>,
    pub exp: u64,
}

impl AuthenticatedUser {
    pub fn role_enum(&self) -> Role {
        Role::from_str(&self.role).unwrap_or(Role::Customer)
    }

    pub fn is_admin(&self) -> bool {
        self.role_enum() == Role::Admin
    }

    pub fn is_restaurant_owner(&self) -> bool {
        self.role_enum() == Role::Restaurant
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth_user(role: &str, permissions: &[&str]) -> AuthenticatedUser {
        AuthenticatedUser {
            user_id: uuid::Uuid::new_v4().to_string(),
            token_id: uuid::Uuid::new_v4().to_string(),
            email: "user@example.com".to_string(),
            role: role.to_string(),
            permissions: permissions.iter().map(|s| s.to_string()).collect(),
            exp: u64::MAX,
        }
    }

    #[test]
    fn test_role_helpers() {
        assert!(auth_user("admin", &[]).is_admin());
        assert!(!auth_user("customer", &[]).is_admin());
        assert!(auth_user("restaurant", &[]).is_restaurant_owner());
        // Unknown roles degrade to customer
        assert_eq!(auth_user("weird", &[]).role_enum(), Role::Customer);
    }

    #[test]
    fn test_permission_check() {
        let user = auth_user("restaurant", &["tables:manage"]);
        assert!(user.has_permission("tables:manage"));
        assert!(!user.has_permission("admin"));
    }
}
