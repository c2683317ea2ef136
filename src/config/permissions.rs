// Permission scopes per role
// The scope list is embedded in access-token claims and checked by handlers

use crate::models::user::Role;

pub struct PermissionConfig;

impl PermissionConfig {
    /// Permission scopes granted to a role
    pub fn scopes_for_role(role: &Role) -> Vec<String> {
        match role {
            Role::Customer => vec![
                "profile:manage".to_string(),
                "tables:browse".to_string(),
                "tables:join".to_string(),
            ],
            Role::Restaurant => vec![
                "profile:manage".to_string(),
                "restaurant:manage".to_string(),
                "tables:manage".to_string(),
                "images:upload".to_string(),
                "onboarding:manage".to_string(),
            ],
            Role::Admin => vec![
                "admin".to_string(),
                "restaurants:review".to_string(),
                "messages:triage".to_string(),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_customer_scopes() {
        let scopes = PermissionConfig::scopes_for_role(&Role::Customer);
        assert!(scopes.contains(&"tables:join".to_string()));
        assert!(!scopes.contains(&"admin".to_string()));
    }

    #[test]
    fn test_restaurant_scopes() {
        let scopes = PermissionConfig::scopes_for_role(&Role::Restaurant);
        assert!(scopes.contains(&"restaurant:manage".to_string()));
        assert!(scopes.contains(&"images:upload".to_string()));
        assert!(!scopes.contains(&"admin".to_string()));
    }

    #[test]
    fn test_admin_scopes() {
        let scopes = PermissionConfig::scopes_for_role(&Role::Admin);
        assert!(scopes.contains(&"admin".to_string()));
    }
}
