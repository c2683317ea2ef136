// Contact form messages (public form -> admin inbox)

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::contact_messages;

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = contact_messages)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ContactMessage {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = contact_messages)]
pub struct NewContactMessage {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub status: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MessageStatus {
    New,
    InProgress,
    Resolved,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::New => "new",
            MessageStatus::InProgress => "in_progress",
            MessageStatus::Resolved => "resolved",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s {
            "new" => Some(MessageStatus::New),
            "in_progress" => Some(MessageStatus::InProgress),
            "resolved" => Some(MessageStatus::Resolved),
            _ => None,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ContactMessageError {
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("Message not found")]
    NotFound,
}

impl ContactMessage {
    pub async fn create(
        conn: &mut AsyncPgConnection,
        new_message: NewContactMessage,
    ) -> Result<Self, ContactMessageError> {
        use crate::schema::contact_messages::dsl::*;

        diesel::insert_into(contact_messages)
            .values(&new_message)
            .get_result::<ContactMessage>(conn)
            .await
            .map_err(ContactMessageError::Database)
    }

    pub async fn list(
        conn: &mut AsyncPgConnection,
        filter_status: Option<MessageStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, ContactMessageError> {
        use crate::schema::contact_messages::dsl::*;

        let mut query = contact_messages.into_boxed();
        if let Some(s) = filter_status {
            query = query.filter(status.eq(s.as_str()));
        }

        query
            .order(created_at.desc())
            .limit(limit)
            .offset(offset)
            .load::<ContactMessage>(conn)
            .await
            .map_err(ContactMessageError::Database)
    }

    pub async fn set_status(
        conn: &mut AsyncPgConnection,
        message_id: Uuid,
        new_status: MessageStatus,
    ) -> Result<Self, ContactMessageError> {
        use crate::schema::contact_messages::dsl::*;

        diesel::update(contact_messages.filter(id.eq(message_id)))
            .set((status.eq(new_status.as_str()), updated_at.eq(Utc::now())))
            .get_result::<ContactMessage>(conn)
            .await
            .map_err(|e| match e {
                diesel::result::Error::NotFound => ContactMessageError::NotFound,
                _ => ContactMessageError::Database(e),
            })
    }

    pub async fn count_with_status(
        conn: &mut AsyncPgConnection,
        filter_status: MessageStatus,
    ) -> Result<i64, ContactMessageError> {
        use crate::schema::contact_messages::dsl::*;

        contact_messages
            .filter(status.eq(filter_status.as_str()))
            .count()
            .get_result(conn)
            .await
            .map_err(ContactMessageError::Database)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_status_round_trip() {
        assert_eq!(MessageStatus::from_string("new"), Some(MessageStatus::New));
        assert_eq!(
            MessageStatus::from_string("in_progress"),
            Some(MessageStatus::InProgress)
        );
        assert_eq!(
            MessageStatus::from_string("resolved"),
            Some(MessageStatus::Resolved)
        );
        assert_eq!(MessageStatus::from_string("spam"), None);
    }
}
