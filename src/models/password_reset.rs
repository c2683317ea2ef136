// Password reset token model and API request/response types

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::password_reset_tokens;

#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = password_reset_tokens)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PasswordResetToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = password_reset_tokens)]
pub struct NewPasswordResetToken {
    pub user_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

// Request/Response models for the API

#[derive(Debug, Serialize, Deserialize, validator::Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "Please provide a valid email address"))]
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize, validator::Validate)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 32, max = 64, message = "Invalid reset token format"))]
    pub token: String,

    #[validate(length(
        min = 8,
        max = 128,
        message = "Password must be between 8 and 128 characters"
    ))]
    pub new_password: String,

    pub confirm_password: String,
}

impl ResetPasswordRequest {
    pub fn validate_passwords_match(&self) -> Result<(), String> {
        if self.new_password != self.confirm_password {
            return Err("Passwords do not match".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct ForgotPasswordResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ResetPasswordResponse {
    pub success: bool,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passwords_match_validation() {
        let matching = ResetPasswordRequest {
            token: "a".repeat(43),
            new_password: "NewP@ssw0rd!".to_string(),
            confirm_password: "NewP@ssw0rd!".to_string(),
        };
        assert!(matching.validate_passwords_match().is_ok());

        let mismatched = ResetPasswordRequest {
            token: "a".repeat(43),
            new_password: "NewP@ssw0rd!".to_string(),
            confirm_password: "Different1!".to_string(),
        };
        assert!(mismatched.validate_passwords_match().is_err());
    }
}
