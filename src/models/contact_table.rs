// Contact table (shared-table event) and participant models

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::{contact_tables, table_participants};

/// A bookable shared table offered by a restaurant
#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = contact_tables)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ContactTable {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub max_seats: i32,
    pub price_cents: i32,
    pub is_open: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = contact_tables)]
pub struct NewContactTable {
    pub restaurant_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub max_seats: i32,
    pub price_cents: i32,
    pub is_open: bool,
}

#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = contact_tables)]
pub struct ContactTableUpdate {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub max_seats: Option<i32>,
    pub price_cents: Option<i32>,
    pub is_open: Option<bool>,
}

/// Participation status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ParticipantStatus {
    Confirmed,
    Cancelled,
}

impl ParticipantStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParticipantStatus::Confirmed => "confirmed",
            ParticipantStatus::Cancelled => "cancelled",
        }
    }
}

/// A guest's seat reservation at a contact table
#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = table_participants)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TableParticipant {
    pub id: Uuid,
    pub contact_table_id: Uuid,
    pub user_id: Uuid,
    pub seats: i32,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = table_participants)]
pub struct NewTableParticipant {
    pub contact_table_id: Uuid,
    pub user_id: Uuid,
    pub seats: i32,
    pub status: String,
}

#[derive(thiserror::Error, Debug)]
pub enum ContactTableError {
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("Contact table not found")]
    NotFound,
}

impl ContactTable {
    pub async fn find_by_id(
        conn: &mut AsyncPgConnection,
        table_id: Uuid,
    ) -> Result<Self, ContactTableError> {
        use crate::schema::contact_tables::dsl::*;

        contact_tables
            .filter(id.eq(table_id))
            .first::<ContactTable>(conn)
            .await
            .map_err(|e| match e {
                diesel::result::Error::NotFound => ContactTableError::NotFound,
                _ => ContactTableError::Database(e),
            })
    }

    /// Fetch with a row lock; used inside the join/leave transaction so
    /// concurrent seat bookings serialize on the table row.
    pub async fn find_by_id_for_update(
        conn: &mut AsyncPgConnection,
        table_id: Uuid,
    ) -> Result<Self, ContactTableError> {
        use crate::schema::contact_tables::dsl::*;

        contact_tables
            .filter(id.eq(table_id))
            .for_update()
            .first::<ContactTable>(conn)
            .await
            .map_err(|e| match e {
                diesel::result::Error::NotFound => ContactTableError::NotFound,
                _ => ContactTableError::Database(e),
            })
    }

    pub async fn create(
        conn: &mut AsyncPgConnection,
        new_table: NewContactTable,
    ) -> Result<Self, ContactTableError> {
        use crate::schema::contact_tables::dsl::*;

        diesel::insert_into(contact_tables)
            .values(&new_table)
            .get_result::<ContactTable>(conn)
            .await
            .map_err(ContactTableError::Database)
    }

    pub async fn update(
        conn: &mut AsyncPgConnection,
        table_id: Uuid,
        update: ContactTableUpdate,
    ) -> Result<Self, ContactTableError> {
        use crate::schema::contact_tables::dsl::*;

        diesel::update(contact_tables.filter(id.eq(table_id)))
            .set(&update)
            .get_result::<ContactTable>(conn)
            .await
            .map_err(|e| match e {
                diesel::result::Error::NotFound => ContactTableError::NotFound,
                _ => ContactTableError::Database(e),
            })
    }

    /// Sum of confirmed seats at this table
    pub async fn seats_taken(
        conn: &mut AsyncPgConnection,
        table_id: Uuid,
    ) -> Result<i64, ContactTableError> {
        use crate::schema::table_participants::dsl::*;
        use diesel::dsl::sum;

        let taken: Option<i64> = table_participants
            .filter(contact_table_id.eq(table_id))
            .filter(status.eq(ParticipantStatus::Confirmed.as_str()))
            .select(sum(seats))
            .first(conn)
            .await
            .map_err(ContactTableError::Database)?;

        Ok(taken.unwrap_or(0))
    }

    /// Confirmed participants of this table
    pub async fn participants(
        &self,
        conn: &mut AsyncPgConnection,
    ) -> Result<Vec<TableParticipant>, ContactTableError> {
        use crate::schema::table_participants::dsl::*;

        table_participants
            .filter(contact_table_id.eq(self.id))
            .filter(status.eq(ParticipantStatus::Confirmed.as_str()))
            .order(created_at.asc())
            .load::<TableParticipant>(conn)
            .await
            .map_err(ContactTableError::Database)
    }

    pub fn has_started(&self, now: DateTime<Utc>) -> bool {
        self.starts_at <= now
    }

    /// Seats still available given a confirmed-seat count
    pub fn seats_remaining(&self, taken: i64) -> i64 {
        (self.max_seats as i64 - taken).max(0)
    }
}

impl TableParticipant {
    pub async fn find_for_table_and_user(
        conn: &mut AsyncPgConnection,
        table_id: Uuid,
        participant_user_id: Uuid,
    ) -> Result<Option<Self>, ContactTableError> {
        use crate::schema::table_participants::dsl::*;

        table_participants
            .filter(contact_table_id.eq(table_id))
            .filter(user_id.eq(participant_user_id))
            .first::<TableParticipant>(conn)
            .await
            .optional()
            .map_err(ContactTableError::Database)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn table(max: i32) -> ContactTable {
        let now = Utc::now();
        ContactTable {
            id: Uuid::new_v4(),
            restaurant_id: Uuid::new_v4(),
            title: "Friday dinner table".to_string(),
            description: None,
            starts_at: now + Duration::hours(24),
            ends_at: now + Duration::hours(27),
            max_seats: max,
            price_cents: 0,
            is_open: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_seats_remaining() {
        let t = table(6);
        assert_eq!(t.seats_remaining(0), 6);
        assert_eq!(t.seats_remaining(4), 2);
        assert_eq!(t.seats_remaining(6), 0);
        // Never negative, even if data drifted
        assert_eq!(t.seats_remaining(9), 0);
    }

    #[test]
    fn test_has_started() {
        let t = table(4);
        assert!(!t.has_started(Utc::now()));
        assert!(t.has_started(t.starts_at + Duration::minutes(1)));
    }

    #[test]
    fn test_participant_status_strings() {
        assert_eq!(ParticipantStatus::Confirmed.as_str(), "confirmed");
        assert_eq!(ParticipantStatus::Cancelled.as_str(), "cancelled");
    }
}
