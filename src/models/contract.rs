// Contract records for restaurant onboarding

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::contracts;

/// Current terms version offered to restaurants
pub const CURRENT_TERMS_VERSION: &str = "2025-06";

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = contracts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Contract {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub plan: String,
    pub monthly_fee_cents: i32,
    pub currency: String,
    pub terms_version: String,
    pub status: String,
    pub accepted_at: Option<DateTime<Utc>>,
    pub accepted_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = contracts)]
pub struct NewContract {
    pub restaurant_id: Uuid,
    pub plan: String,
    pub monthly_fee_cents: i32,
    pub currency: String,
    pub terms_version: String,
    pub status: String,
}

#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = contracts)]
pub struct ContractUpdate {
    pub plan: Option<String>,
    pub monthly_fee_cents: Option<i32>,
    pub status: Option<String>,
    pub accepted_at: Option<Option<DateTime<Utc>>>,
    pub accepted_by: Option<Option<Uuid>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ContractState {
    Offered,
    Accepted,
    Cancelled,
}

impl ContractState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContractState::Offered => "offered",
            ContractState::Accepted => "accepted",
            ContractState::Cancelled => "cancelled",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s {
            "offered" => Some(ContractState::Offered),
            "accepted" => Some(ContractState::Accepted),
            "cancelled" => Some(ContractState::Cancelled),
            _ => None,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ContractError {
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("Contract not found")]
    NotFound,
}

impl Contract {
    pub async fn create(
        conn: &mut AsyncPgConnection,
        new_contract: NewContract,
    ) -> Result<Self, ContractError> {
        use crate::schema::contracts::dsl::*;

        diesel::insert_into(contracts)
            .values(&new_contract)
            .get_result::<Contract>(conn)
            .await
            .map_err(ContractError::Database)
    }

    /// The most recent offered contract for a restaurant, if any
    pub async fn latest_offered(
        conn: &mut AsyncPgConnection,
        restaurant: Uuid,
    ) -> Result<Option<Self>, ContractError> {
        use crate::schema::contracts::dsl::*;

        contracts
            .filter(restaurant_id.eq(restaurant))
            .filter(status.eq(ContractState::Offered.as_str()))
            .order(created_at.desc())
            .first::<Contract>(conn)
            .await
            .optional()
            .map_err(ContractError::Database)
    }

    pub async fn find_by_id(
        conn: &mut AsyncPgConnection,
        contract_id: Uuid,
    ) -> Result<Self, ContractError> {
        use crate::schema::contracts::dsl::*;

        contracts
            .filter(id.eq(contract_id))
            .first::<Contract>(conn)
            .await
            .map_err(|e| match e {
                diesel::result::Error::NotFound => ContractError::NotFound,
                _ => ContractError::Database(e),
            })
    }

    pub async fn update(
        conn: &mut AsyncPgConnection,
        contract_id: Uuid,
        update: ContractUpdate,
    ) -> Result<Self, ContractError> {
        use crate::schema::contracts::dsl::*;

        diesel::update(contracts.filter(id.eq(contract_id)))
            .set(&update)
            .get_result::<Contract>(conn)
            .await
            .map_err(|e| match e {
                diesel::result::Error::NotFound => ContractError::NotFound,
                _ => ContractError::Database(e),
            })
    }

    /// Cancel any still-open offers for a restaurant (a new offer
    /// supersedes older ones)
    pub async fn cancel_open_offers(
        conn: &mut AsyncPgConnection,
        restaurant: Uuid,
    ) -> Result<usize, ContractError> {
        use crate::schema::contracts::dsl::*;

        diesel::update(
            contracts
                .filter(restaurant_id.eq(restaurant))
                .filter(status.eq(ContractState::Offered.as_str())),
        )
        .set(status.eq(ContractState::Cancelled.as_str()))
        .execute(conn)
        .await
        .map_err(ContractError::Database)
    }

    pub fn state(&self) -> Option<ContractState> {
        ContractState::from_string(&self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_state_round_trip() {
        assert_eq!(
            ContractState::from_string("offered"),
            Some(ContractState::Offered)
        );
        assert_eq!(
            ContractState::from_string("accepted"),
            Some(ContractState::Accepted)
        );
        assert_eq!(
            ContractState::from_string("cancelled"),
            Some(ContractState::Cancelled)
        );
        assert_eq!(ContractState::from_string("draft"), None);
    }
}
