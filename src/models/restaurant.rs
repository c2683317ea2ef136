// Restaurant database model and contract status state machine

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::str::FromStr;
use uuid::Uuid;

use crate::schema::restaurants;

/// Onboarding stage of a restaurant. Every transition goes through
/// `can_transition`; handlers never write the column directly.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ContractStatus {
    Pending,  // Submitted, waiting for admin review
    Approved, // Admin approved, contract offered
    Rejected, // Admin rejected, owner may edit and resubmit
    Active,   // Contract accepted (and paid where required)
}

impl ContractStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContractStatus::Pending => "pending",
            ContractStatus::Approved => "approved",
            ContractStatus::Rejected => "rejected",
            ContractStatus::Active => "active",
        }
    }

    /// Legal transitions of the onboarding state machine:
    /// pending -> approved | rejected, rejected -> pending (resubmission),
    /// approved -> active. Everything else is refused.
    pub fn can_transition(&self, to: ContractStatus) -> bool {
        use ContractStatus::*;
        matches!(
            (self, to),
            (Pending, Approved) | (Pending, Rejected) | (Rejected, Pending) | (Approved, Active)
        )
    }
}

impl FromStr for ContractStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ContractStatus::Pending),
            "approved" => Ok(ContractStatus::Approved),
            "rejected" => Ok(ContractStatus::Rejected),
            "active" => Ok(ContractStatus::Active),
            _ => Err(format!("Invalid contract status: {}", s)),
        }
    }
}

/// Subscription plan for restaurants
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Plan {
    Basic,   // Free listing, limited tables and images
    Premium, // Paid monthly, full feature set
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Basic => "basic",
            Plan::Premium => "premium",
        }
    }
}

impl FromStr for Plan {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(Plan::Basic),
            "premium" => Ok(Plan::Premium),
            _ => Err(format!("Invalid plan: {}", s)),
        }
    }
}

/// Restaurant database model
#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = restaurants)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Restaurant {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub cuisine: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub address_street: Option<String>,
    pub address_city: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub capacity: Option<i32>,
    pub opening_hours: Option<JsonValue>,
    pub contract_status: String,
    pub plan: String,
    pub rejected_reason: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = restaurants)]
pub struct NewRestaurant {
    pub owner_id: Uuid,
    pub name: String,
    pub slug: String,
    pub contract_status: String,
    pub plan: String,
    pub is_active: bool,
}

#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = restaurants)]
pub struct RestaurantUpdate {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<Option<String>>,
    pub cuisine: Option<Option<String>>,
    pub phone: Option<Option<String>>,
    pub website: Option<Option<String>>,
    pub address_street: Option<Option<String>>,
    pub address_city: Option<Option<String>>,
    pub postal_code: Option<Option<String>>,
    pub country: Option<Option<String>>,
    pub capacity: Option<Option<i32>>,
    pub opening_hours: Option<Option<JsonValue>>,
    pub contract_status: Option<String>,
    pub plan: Option<String>,
    pub rejected_reason: Option<Option<String>>,
    pub is_active: Option<bool>,
}

#[derive(thiserror::Error, Debug)]
pub enum RestaurantError {
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("Restaurant not found")]
    NotFound,

    #[error("Illegal contract status transition from {from} to {to}")]
    IllegalTransition { from: String, to: String },
}

impl Restaurant {
    pub async fn find_by_id(
        conn: &mut AsyncPgConnection,
        restaurant_id: Uuid,
    ) -> Result<Self, RestaurantError> {
        use crate::schema::restaurants::dsl::*;

        restaurants
            .filter(id.eq(restaurant_id))
            .first::<Restaurant>(conn)
            .await
            .map_err(|e| match e {
                diesel::result::Error::NotFound => RestaurantError::NotFound,
                _ => RestaurantError::Database(e),
            })
    }

    pub async fn find_by_owner(
        conn: &mut AsyncPgConnection,
        owner: Uuid,
    ) -> Result<Self, RestaurantError> {
        use crate::schema::restaurants::dsl::*;

        restaurants
            .filter(owner_id.eq(owner))
            .first::<Restaurant>(conn)
            .await
            .map_err(|e| match e {
                diesel::result::Error::NotFound => RestaurantError::NotFound,
                _ => RestaurantError::Database(e),
            })
    }

    pub async fn find_by_slug(
        conn: &mut AsyncPgConnection,
        slug_str: &str,
    ) -> Result<Self, RestaurantError> {
        use crate::schema::restaurants::dsl::*;

        restaurants
            .filter(slug.eq(slug_str))
            .first::<Restaurant>(conn)
            .await
            .map_err(|e| match e {
                diesel::result::Error::NotFound => RestaurantError::NotFound,
                _ => RestaurantError::Database(e),
            })
    }

    pub async fn create(
        conn: &mut AsyncPgConnection,
        new_restaurant: NewRestaurant,
    ) -> Result<Self, RestaurantError> {
        use crate::schema::restaurants::dsl::*;

        diesel::insert_into(restaurants)
            .values(&new_restaurant)
            .get_result::<Restaurant>(conn)
            .await
            .map_err(RestaurantError::Database)
    }

    pub async fn update(
        conn: &mut AsyncPgConnection,
        restaurant_id: Uuid,
        update: RestaurantUpdate,
    ) -> Result<Self, RestaurantError> {
        use crate::schema::restaurants::dsl::*;

        diesel::update(restaurants.filter(id.eq(restaurant_id)))
            .set(&update)
            .get_result::<Restaurant>(conn)
            .await
            .map_err(|e| match e {
                diesel::result::Error::NotFound => RestaurantError::NotFound,
                _ => RestaurantError::Database(e),
            })
    }

    /// Apply a contract status transition after checking legality against
    /// the current persisted status.
    pub async fn transition_contract_status(
        conn: &mut AsyncPgConnection,
        restaurant_id: Uuid,
        to: ContractStatus,
        extra: RestaurantUpdate,
    ) -> Result<Self, RestaurantError> {
        let current = Self::find_by_id(conn, restaurant_id).await?;
        let from = current.contract_status_enum();

        if !from.can_transition(to) {
            return Err(RestaurantError::IllegalTransition {
                from: from.as_str().to_string(),
                to: to.as_str().to_string(),
            });
        }

        let update = RestaurantUpdate {
            contract_status: Some(to.as_str().to_string()),
            ..extra
        };

        Self::update(conn, restaurant_id, update).await
    }

    /// Contract status as enum, defaulting to Pending for unexpected
    /// values (logged for monitoring)
    pub fn contract_status_enum(&self) -> ContractStatus {
        ContractStatus::from_str(&self.contract_status).unwrap_or_else(|e| {
            tracing::warn!(
                "Invalid contract status '{}' for restaurant {}, defaulting to Pending: {}",
                self.contract_status,
                self.id,
                e
            );
            ContractStatus::Pending
        })
    }

    pub fn plan_enum(&self) -> Plan {
        Plan::from_str(&self.plan).unwrap_or_else(|e| {
            tracing::warn!(
                "Invalid plan '{}' for restaurant {}, defaulting to Basic: {}",
                self.plan,
                self.id,
                e
            );
            Plan::Basic
        })
    }

    /// Whether the restaurant shows up in public discovery
    pub fn is_publicly_visible(&self) -> bool {
        self.is_active && self.contract_status_enum() == ContractStatus::Active
    }

    /// Profile completeness percentage shown on the owner dashboard.
    /// Weighted over the fields a guest cares about; 100 iff everything
    /// is filled in. `has_images` comes from the images table.
    pub fn completeness_percent(&self, has_images: bool) -> u8 {
        let address_complete = self.address_street.is_some()
            && self.address_city.is_some()
            && self.postal_code.is_some()
            && self.country.is_some();

        // (weight, filled) pairs
        let parts: [(u8, bool); 8] = [
            (20, address_complete),
            (15, self.description.as_deref().is_some_and(|d| !d.is_empty())),
            (15, has_images),
            (10, self.cuisine.is_some()),
            (10, self.opening_hours.is_some()),
            (10, self.capacity.is_some()),
            (10, self.phone.is_some()),
            (10, self.website.is_some()),
        ];

        parts
            .iter()
            .filter(|(_, filled)| *filled)
            .map(|(weight, _)| weight)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn restaurant(status: &str) -> Restaurant {
        let now = Utc::now();
        Restaurant {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            name: "Zur Goldenen Gabel".to_string(),
            slug: "zur-goldenen-gabel".to_string(),
            description: None,
            cuisine: None,
            phone: None,
            website: None,
            address_street: None,
            address_city: None,
            postal_code: None,
            country: None,
            capacity: None,
            opening_hours: None,
            contract_status: status.to_string(),
            plan: "basic".to_string(),
            rejected_reason: None,
            is_active: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_legal_transitions() {
        use ContractStatus::*;

        assert!(Pending.can_transition(Approved));
        assert!(Pending.can_transition(Rejected));
        assert!(Rejected.can_transition(Pending));
        assert!(Approved.can_transition(Active));
    }

    #[test]
    fn test_illegal_transitions() {
        use ContractStatus::*;

        assert!(!Pending.can_transition(Active));
        assert!(!Rejected.can_transition(Active));
        assert!(!Rejected.can_transition(Approved));
        assert!(!Active.can_transition(Pending));
        assert!(!Active.can_transition(Approved));
        assert!(!Approved.can_transition(Pending));
        assert!(!Approved.can_transition(Rejected));
        // Self-transitions are not legal either
        assert!(!Pending.can_transition(Pending));
        assert!(!Active.can_transition(Active));
    }

    #[test]
    fn test_contract_status_parsing() {
        assert_eq!(
            ContractStatus::from_str("pending"),
            Ok(ContractStatus::Pending)
        );
        assert_eq!(
            ContractStatus::from_str("active"),
            Ok(ContractStatus::Active)
        );
        assert!(ContractStatus::from_str("suspended").is_err());
    }

    #[test]
    fn test_public_visibility() {
        let mut r = restaurant("active");
        assert!(!r.is_publicly_visible()); // active status but is_active=false

        r.is_active = true;
        assert!(r.is_publicly_visible());

        let mut pending = restaurant("pending");
        pending.is_active = true;
        assert!(!pending.is_publicly_visible());
    }

    #[test]
    fn test_completeness_empty_profile() {
        let r = restaurant("pending");
        assert_eq!(r.completeness_percent(false), 0);
    }

    #[test]
    fn test_completeness_full_profile() {
        let mut r = restaurant("active");
        r.description = Some("A cozy place for strangers to meet.".to_string());
        r.cuisine = Some("German".to_string());
        r.phone = Some("+49 30 1234567".to_string());
        r.website = Some("https://goldene-gabel.example".to_string());
        r.address_street = Some("Hauptstr. 1".to_string());
        r.address_city = Some("Berlin".to_string());
        r.postal_code = Some("10115".to_string());
        r.country = Some("Germany".to_string());
        r.capacity = Some(40);
        r.opening_hours = Some(serde_json::json!({"mon": "11-22"}));

        assert_eq!(r.completeness_percent(true), 100);
    }

    #[test]
    fn test_completeness_is_monotone() {
        let mut r = restaurant("pending");
        let empty = r.completeness_percent(false);

        r.description = Some("Something".to_string());
        let with_description = r.completeness_percent(false);
        assert!(with_description > empty);

        r.cuisine = Some("Italian".to_string());
        let with_cuisine = r.completeness_percent(false);
        assert!(with_cuisine > with_description);

        // Partial address does not count
        r.address_street = Some("Hauptstr. 1".to_string());
        assert_eq!(r.completeness_percent(false), with_cuisine);

        // Empty description does not count
        let mut blank = restaurant("pending");
        blank.description = Some(String::new());
        assert_eq!(blank.completeness_percent(false), 0);
    }
}
