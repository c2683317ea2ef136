// Payment records for premium plan activation

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::payments;

#[derive(
    Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable, AsChangeset,
)]
#[diesel(table_name = payments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Payment {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub contract_id: Option<Uuid>,
    pub idempotency_key: String,
    pub provider: String,
    pub provider_payment_id: Option<String>,
    pub amount_cents: i32,
    pub currency: String,
    pub status: String,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = payments)]
pub struct NewPayment {
    pub restaurant_id: Uuid,
    pub contract_id: Option<Uuid>,
    pub idempotency_key: String,
    pub provider: String,
    pub provider_payment_id: Option<String>,
    pub amount_cents: i32,
    pub currency: String,
    pub status: String,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PaymentStatus::Pending),
            "completed" => Some(PaymentStatus::Completed),
            "failed" => Some(PaymentStatus::Failed),
            _ => None,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum PaymentError {
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("Payment not found")]
    NotFound,
}

impl Payment {
    pub async fn create(
        conn: &mut AsyncPgConnection,
        new_payment: NewPayment,
    ) -> Result<Self, PaymentError> {
        use crate::schema::payments::dsl::*;

        diesel::insert_into(payments)
            .values(&new_payment)
            .get_result::<Payment>(conn)
            .await
            .map_err(PaymentError::Database)
    }

    /// Look up a payment by its idempotency key. Replayed payment
    /// callbacks resolve to the original row instead of a new one.
    pub async fn find_by_idempotency_key(
        conn: &mut AsyncPgConnection,
        key: &str,
    ) -> Result<Option<Self>, PaymentError> {
        use crate::schema::payments::dsl::*;

        payments
            .filter(idempotency_key.eq(key))
            .first::<Payment>(conn)
            .await
            .optional()
            .map_err(PaymentError::Database)
    }

    pub fn status_enum(&self) -> Option<PaymentStatus> {
        PaymentStatus::from_string(&self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_status_round_trip() {
        assert_eq!(
            PaymentStatus::from_string("pending"),
            Some(PaymentStatus::Pending)
        );
        assert_eq!(
            PaymentStatus::from_string("completed"),
            Some(PaymentStatus::Completed)
        );
        assert_eq!(
            PaymentStatus::from_string("failed"),
            Some(PaymentStatus::Failed)
        );
        assert_eq!(PaymentStatus::from_string("refunded"), None);
    }
}
