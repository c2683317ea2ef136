// User database model

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::schema::users;

/// Account role determining dashboard and API permissions
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, diesel::expression::AsExpression)]
#[diesel(sql_type = diesel::sql_types::Text)]
pub enum Role {
    Customer,   // Guests browsing and joining contact tables
    Restaurant, // Restaurant owners managing a profile and tables
    Admin,      // Platform operators
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Restaurant => "restaurant",
            Role::Admin => "admin",
        }
    }

    /// Roles a user may pick at registration. Admin accounts are
    /// provisioned out of band.
    pub fn is_self_assignable(&self) -> bool {
        matches!(self, Role::Customer | Role::Restaurant)
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Role::Customer),
            "restaurant" => Ok(Role::Restaurant),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

impl<DB> diesel::deserialize::FromSql<diesel::sql_types::Text, DB> for Role
where
    DB: diesel::backend::Backend,
    String: diesel::deserialize::FromSql<diesel::sql_types::Text, DB>,
{
    fn from_sql(bytes: DB::RawValue<'_>) -> diesel::deserialize::Result<Self> {
        let value = String::from_sql(bytes)?;
        Self::from_str(&value).map_err(|e| e.into())
    }
}

impl<DB> diesel::serialize::ToSql<diesel::sql_types::Text, DB> for Role
where
    DB: diesel::backend::Backend,
    str: diesel::serialize::ToSql<diesel::sql_types::Text, DB>,
{
    fn to_sql<'b>(
        &'b self,
        out: &mut diesel::serialize::Output<'b, '_, DB>,
    ) -> diesel::serialize::Result {
        self.as_str().to_sql(out)
    }
}

/// User database model - queryable from database
#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub email_verified: bool,
    pub email_verified_at: Option<DateTime<Utc>>,
    pub full_name: String,
    pub phone: Option<String>,
}

/// New user for insertion
#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub email_verified: bool,
    pub full_name: String,
    pub phone: Option<String>,
}

/// User update struct
#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = users)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub email_verified: Option<bool>,
    pub email_verified_at: Option<Option<DateTime<Utc>>>,
    pub is_active: Option<bool>,
    pub full_name: Option<String>,
    pub phone: Option<Option<String>>,
}

/// Errors for user operations
#[derive(thiserror::Error, Debug)]
pub enum UserError {
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("User not found")]
    NotFound,

    #[error("Invalid user ID format")]
    InvalidId,

    #[error("Connection pool error")]
    Pool(String),
}

impl User {
    /// Find user by ID
    pub async fn find_by_id(
        conn: &mut AsyncPgConnection,
        user_id: Uuid,
    ) -> Result<Self, UserError> {
        use crate::schema::users::dsl::*;

        users
            .filter(id.eq(user_id))
            .first::<User>(conn)
            .await
            .map_err(|e| match e {
                diesel::result::Error::NotFound => UserError::NotFound,
                _ => UserError::Database(e),
            })
    }

    /// Find user by email (case-insensitive)
    pub async fn find_by_email(
        conn: &mut AsyncPgConnection,
        email_str: &str,
    ) -> Result<Self, UserError> {
        use crate::schema::users::dsl::*;
        use diesel::PgTextExpressionMethods;

        users
            .filter(email.ilike(email_str))
            .first::<User>(conn)
            .await
            .map_err(|e| match e {
                diesel::result::Error::NotFound => UserError::NotFound,
                _ => UserError::Database(e),
            })
    }

    /// Create a new user
    pub async fn create(
        conn: &mut AsyncPgConnection,
        new_user: NewUser,
    ) -> Result<Self, UserError> {
        use crate::schema::users::dsl::*;

        diesel::insert_into(users)
            .values(&new_user)
            .get_result::<User>(conn)
            .await
            .map_err(UserError::Database)
    }

    /// Update user
    pub async fn update(
        conn: &mut AsyncPgConnection,
        user_id: Uuid,
        update: UserUpdate,
    ) -> Result<Self, UserError> {
        use crate::schema::users::dsl::*;

        diesel::update(users.filter(id.eq(user_id)))
            .set(&update)
            .get_result::<User>(conn)
            .await
            .map_err(|e| match e {
                diesel::result::Error::NotFound => UserError::NotFound,
                _ => UserError::Database(e),
            })
    }

    /// Mark the user's email address as verified
    pub async fn mark_email_verified(
        conn: &mut AsyncPgConnection,
        user_id: Uuid,
    ) -> Result<Self, UserError> {
        Self::update(
            conn,
            user_id,
            UserUpdate {
                email_verified: Some(true),
                email_verified_at: Some(Some(Utc::now())),
                ..Default::default()
            },
        )
        .await
    }

    /// Get the user's role as enum, defaulting to Customer for
    /// unexpected values (logged for monitoring)
    pub fn role_enum(&self) -> Role {
        Role::from_str(&self.role).unwrap_or_else(|e| {
            tracing::warn!(
                "Invalid role '{}' for user {}, defaulting to Customer: {}",
                self.role,
                self.id,
                e
            );
            Role::Customer
        })
    }

    pub fn is_admin(&self) -> bool {
        self.role_enum() == Role::Admin
    }

    pub fn is_restaurant_owner(&self) -> bool {
        self.role_enum() == Role::Restaurant
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_with_role(role: &str) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: "test@example.com".to_string(),
            password_hash: "hash".to_string(),
            role: role.to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
            email_verified: true,
            email_verified_at: Some(now),
            full_name: "Test User".to_string(),
            phone: None,
        }
    }

    #[test]
    fn test_role_conversion() {
        assert_eq!(Role::Customer.as_str(), "customer");
        assert_eq!(Role::Restaurant.as_str(), "restaurant");
        assert_eq!(Role::Admin.as_str(), "admin");

        assert_eq!(Role::from_str("customer"), Ok(Role::Customer));
        assert_eq!(Role::from_str("restaurant"), Ok(Role::Restaurant));
        assert_eq!(Role::from_str("admin"), Ok(Role::Admin));
        assert!(Role::from_str("superuser").is_err());
    }

    #[test]
    fn test_self_assignable_roles() {
        assert!(Role::Customer.is_self_assignable());
        assert!(Role::Restaurant.is_self_assignable());
        assert!(!Role::Admin.is_self_assignable());
    }

    #[test]
    fn test_role_helpers() {
        assert!(user_with_role("admin").is_admin());
        assert!(!user_with_role("customer").is_admin());
        assert!(user_with_role("restaurant").is_restaurant_owner());
    }

    #[test]
    fn test_invalid_role_defaults_to_customer() {
        let user = user_with_role("something-else");
        assert_eq!(user.role_enum(), Role::Customer);
        assert!(!user.is_admin());
    }
}
