// Contact table lifecycle and seat booking. Joins run inside a
// transaction with a row lock so capacity is never oversubscribed.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    app::AppState,
    models::contact_table::{
        ContactTable, ContactTableUpdate, NewContactTable, NewTableParticipant, ParticipantStatus,
        TableParticipant,
    },
    models::restaurant::{ContractStatus, Restaurant},
    models::user::User,
    services::plans::PlanDefinition,
    utils::booking_errors::BookingError,
};

// =============================================================================
// REQUEST/RESPONSE TYPES
// =============================================================================

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct CreateTableRequest {
    #[validate(length(min = 2, max = 255, message = "Title must be between 2 and 255 characters"))]
    pub title: String,

    #[validate(length(max = 2000, message = "Description must be less than 2000 characters"))]
    pub description: Option<String>,

    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,

    #[validate(range(min = 2, max = 50, message = "A contact table needs 2 to 50 seats"))]
    pub max_seats: i32,

    #[validate(range(min = 0, message = "Price cannot be negative"))]
    pub price_cents: Option<i32>,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct UpdateTableRequest {
    #[validate(length(min = 2, max = 255, message = "Title must be between 2 and 255 characters"))]
    pub title: Option<String>,

    #[validate(length(max = 2000, message = "Description must be less than 2000 characters"))]
    pub description: Option<String>,

    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,

    #[validate(range(min = 2, max = 50, message = "A contact table needs 2 to 50 seats"))]
    pub max_seats: Option<i32>,

    pub is_open: Option<bool>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct JoinTableRequest {
    #[serde(default = "default_seats")]
    pub seats: i32,
}

fn default_seats() -> i32 {
    1
}

#[derive(Debug, Default, Deserialize)]
pub struct OpenTablesFilter {
    pub city: Option<String>,
    pub cuisine: Option<String>,
    pub date: Option<chrono::NaiveDate>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// A contact table as shown to guests
#[derive(Debug, Serialize)]
pub struct TableResponse {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub max_seats: i32,
    pub seats_taken: i64,
    pub seats_remaining: i64,
    pub price_cents: i32,
    pub is_open: bool,
    pub restaurant_id: Uuid,
    pub restaurant_name: String,
    pub restaurant_slug: String,
    pub restaurant_city: Option<String>,
}

impl TableResponse {
    fn from_parts(table: ContactTable, taken: i64, restaurant: &Restaurant) -> Self {
        Self {
            id: table.id,
            title: table.title,
            description: table.description,
            starts_at: table.starts_at,
            ends_at: table.ends_at,
            max_seats: table.max_seats,
            seats_taken: taken,
            seats_remaining: (table.max_seats as i64 - taken).max(0),
            price_cents: table.price_cents,
            is_open: table.is_open,
            restaurant_id: restaurant.id,
            restaurant_name: restaurant.name.clone(),
            restaurant_slug: restaurant.slug.clone(),
            restaurant_city: restaurant.address_city.clone(),
        }
    }
}

// =============================================================================
// SERVICE
// =============================================================================

pub struct ContactTableService<'a> {
    state: &'a AppState,
}

impl<'a> ContactTableService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    async fn conn(
        &self,
    ) -> Result<
        bb8::PooledConnection<
            '_,
            diesel_async::pooled_connection::AsyncDieselConnectionManager<
                diesel_async::AsyncPgConnection,
            >,
        >,
        BookingError,
    > {
        self.state
            .diesel_pool
            .get()
            .await
            .map_err(|e| BookingError::DatabaseError(e.to_string()))
    }

    fn check_window(
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> Result<(), BookingError> {
        if starts_at <= Utc::now() {
            return Err(BookingError::ValidationError(
                "starts_at must be in the future".to_string(),
            ));
        }
        if ends_at <= starts_at {
            return Err(BookingError::ValidationError(
                "ends_at must be after starts_at".to_string(),
            ));
        }
        Ok(())
    }

    /// Create a table for the owner's restaurant. Requires an active
    /// restaurant and enforces the plan's open-table cap.
    pub async fn create(
        &self,
        owner_id: Uuid,
        request: CreateTableRequest,
    ) -> Result<TableResponse, BookingError> {
        request.validate()?;
        Self::check_window(request.starts_at, request.ends_at)?;

        let mut conn = self.conn().await?;
        let restaurant = Restaurant::find_by_owner(&mut conn, owner_id).await?;

        if restaurant.contract_status_enum() != ContractStatus::Active || !restaurant.is_active {
            return Err(BookingError::RestaurantNotActive);
        }

        let plan = PlanDefinition::for_plan(&restaurant.plan_enum());
        let open_count = self.count_open_upcoming(&mut conn, restaurant.id).await?;
        if open_count >= plan.max_open_tables as i64 {
            return Err(BookingError::PlanLimitExceeded(format!(
                "{} plan allows {} open tables",
                plan.display_name, plan.max_open_tables
            )));
        }

        let new_table = NewContactTable {
            restaurant_id: restaurant.id,
            title: request.title.trim().to_string(),
            description: request.description.map(|d| d.trim().to_string()),
            starts_at: request.starts_at,
            ends_at: request.ends_at,
            max_seats: request.max_seats,
            price_cents: request.price_cents.unwrap_or(0),
            is_open: true,
        };

        let table = ContactTable::create(&mut conn, new_table).await?;
        tracing::info!(table_id = %table.id, restaurant_id = %restaurant.id, "Contact table created");

        Ok(TableResponse::from_parts(table, 0, &restaurant))
    }

    /// Update an owned table. Seat reductions below the confirmed count
    /// are refused.
    pub async fn update(
        &self,
        owner_id: Uuid,
        table_id: Uuid,
        request: UpdateTableRequest,
    ) -> Result<TableResponse, BookingError> {
        request.validate()?;

        let mut conn = self.conn().await?;
        let restaurant = Restaurant::find_by_owner(&mut conn, owner_id).await?;
        let table = ContactTable::find_by_id(&mut conn, table_id).await?;

        if table.restaurant_id != restaurant.id {
            return Err(BookingError::Forbidden(
                "Contact table belongs to a different restaurant".to_string(),
            ));
        }

        let starts_at = request.starts_at.unwrap_or(table.starts_at);
        let ends_at = request.ends_at.unwrap_or(table.ends_at);
        if request.starts_at.is_some() || request.ends_at.is_some() {
            Self::check_window(starts_at, ends_at)?;
        }

        let taken = ContactTable::seats_taken(&mut conn, table.id).await?;
        if let Some(new_max) = request.max_seats {
            if (new_max as i64) < taken {
                return Err(BookingError::ValidationError(format!(
                    "{} seats are already taken",
                    taken
                )));
            }
        }

        let update = ContactTableUpdate {
            title: request.title.map(|t| t.trim().to_string()),
            description: request.description.map(|d| Some(d.trim().to_string())),
            starts_at: request.starts_at,
            ends_at: request.ends_at,
            max_seats: request.max_seats,
            price_cents: None,
            is_open: request.is_open,
        };

        let updated = ContactTable::update(&mut conn, table.id, update).await?;
        Ok(TableResponse::from_parts(updated, taken, &restaurant))
    }

    /// Cancel a table: close it and cancel all confirmed participations
    pub async fn cancel(&self, owner_id: Uuid, table_id: Uuid) -> Result<(), BookingError> {
        use crate::schema::table_participants::dsl::*;

        let mut conn = self.conn().await?;
        let restaurant = Restaurant::find_by_owner(&mut conn, owner_id).await?;
        let table = ContactTable::find_by_id(&mut conn, table_id).await?;

        if table.restaurant_id != restaurant.id {
            return Err(BookingError::Forbidden(
                "Contact table belongs to a different restaurant".to_string(),
            ));
        }

        conn.transaction::<_, BookingError, _>(|conn| {
            async move {
                ContactTable::update(
                    conn,
                    table_id,
                    ContactTableUpdate {
                        is_open: Some(false),
                        ..Default::default()
                    },
                )
                .await?;

                diesel::update(
                    table_participants
                        .filter(contact_table_id.eq(table_id))
                        .filter(status.eq(ParticipantStatus::Confirmed.as_str())),
                )
                .set((
                    status.eq(ParticipantStatus::Cancelled.as_str()),
                    updated_at.eq(Utc::now()),
                ))
                .execute(conn)
                .await?;

                Ok(())
            }
            .scope_boxed()
        })
        .await?;

        tracing::info!(table_id = %table_id, "Contact table cancelled");
        Ok(())
    }

    /// Tables of the owner's restaurant, upcoming first
    pub async fn list_for_owner(&self, owner_id: Uuid) -> Result<Vec<TableResponse>, BookingError> {
        use crate::schema::contact_tables::dsl::*;

        let mut conn = self.conn().await?;
        let restaurant = Restaurant::find_by_owner(&mut conn, owner_id).await?;

        let tables: Vec<ContactTable> = contact_tables
            .filter(restaurant_id.eq(restaurant.id))
            .order(starts_at.desc())
            .load::<ContactTable>(&mut conn)
            .await
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        let mut result = Vec::with_capacity(tables.len());
        for table in tables {
            let taken = ContactTable::seats_taken(&mut conn, table.id).await?;
            result.push(TableResponse::from_parts(table, taken, &restaurant));
        }
        Ok(result)
    }

    /// Confirmed participants of an owned table
    pub async fn participants(
        &self,
        owner_id: Uuid,
        table_id: Uuid,
    ) -> Result<Vec<TableParticipant>, BookingError> {
        let mut conn = self.conn().await?;
        let restaurant = Restaurant::find_by_owner(&mut conn, owner_id).await?;
        let table = ContactTable::find_by_id(&mut conn, table_id).await?;

        if table.restaurant_id != restaurant.id {
            return Err(BookingError::Forbidden(
                "Contact table belongs to a different restaurant".to_string(),
            ));
        }

        Ok(table.participants(&mut conn).await?)
    }

    /// Public listing of upcoming open tables at live restaurants
    pub async fn list_open(
        &self,
        filter: OpenTablesFilter,
    ) -> Result<Vec<TableResponse>, BookingError> {
        use crate::schema::contact_tables;
        use crate::schema::restaurants;

        let mut conn = self.conn().await?;

        let page = filter.page.unwrap_or(1).max(1);
        let per_page = filter.per_page.unwrap_or(20).clamp(1, 100);

        let mut query = contact_tables::table
            .inner_join(restaurants::table)
            .filter(contact_tables::is_open.eq(true))
            .filter(contact_tables::starts_at.gt(Utc::now()))
            .filter(restaurants::contract_status.eq(ContractStatus::Active.as_str()))
            .filter(restaurants::is_active.eq(true))
            .into_boxed();

        if let Some(city) = filter.city.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            query = query.filter(restaurants::address_city.ilike(format!("%{}%", city)));
        }
        if let Some(c) = filter.cuisine.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            query = query.filter(restaurants::cuisine.ilike(format!("%{}%", c)));
        }
        if let Some(date) = filter.date {
            let day_start = date
                .and_hms_opt(0, 0, 0)
                .map(|dt| dt.and_utc())
                .unwrap_or_else(Utc::now);
            let day_end = day_start + chrono::Duration::days(1);
            query = query
                .filter(contact_tables::starts_at.ge(day_start))
                .filter(contact_tables::starts_at.lt(day_end));
        }

        let rows: Vec<(ContactTable, Restaurant)> = query
            .order(contact_tables::starts_at.asc())
            .limit(per_page)
            .offset((page - 1) * per_page)
            .load::<(ContactTable, Restaurant)>(&mut conn)
            .await
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        let mut result = Vec::with_capacity(rows.len());
        for (table, restaurant) in rows {
            let taken = ContactTable::seats_taken(&mut conn, table.id).await?;
            result.push(TableResponse::from_parts(table, taken, &restaurant));
        }
        Ok(result)
    }

    /// Upcoming open tables of a single live restaurant (public profile page)
    pub async fn list_upcoming_for_restaurant(
        &self,
        restaurant: &Restaurant,
    ) -> Result<Vec<TableResponse>, BookingError> {
        use crate::schema::contact_tables::dsl::*;

        let mut conn = self.conn().await?;

        let tables: Vec<ContactTable> = contact_tables
            .filter(restaurant_id.eq(restaurant.id))
            .filter(is_open.eq(true))
            .filter(starts_at.gt(Utc::now()))
            .order(starts_at.asc())
            .load::<ContactTable>(&mut conn)
            .await
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        let mut result = Vec::with_capacity(tables.len());
        for table in tables {
            let taken = ContactTable::seats_taken(&mut conn, table.id).await?;
            result.push(TableResponse::from_parts(table, taken, restaurant));
        }
        Ok(result)
    }

    /// Public view of a single table
    pub async fn get_public(&self, table_id: Uuid) -> Result<TableResponse, BookingError> {
        let mut conn = self.conn().await?;

        let table = ContactTable::find_by_id(&mut conn, table_id).await?;
        let restaurant = Restaurant::find_by_id(&mut conn, table.restaurant_id).await?;
        if !restaurant.is_publicly_visible() {
            return Err(BookingError::NotFound);
        }

        let taken = ContactTable::seats_taken(&mut conn, table.id).await?;
        Ok(TableResponse::from_parts(table, taken, &restaurant))
    }

    /// Join a table. The whole check-and-insert runs in one transaction
    /// against a locked table row, so two concurrent joins for the last
    /// seat cannot both succeed.
    pub async fn join(
        &self,
        user: &User,
        table_id: Uuid,
        seats_requested: i32,
    ) -> Result<TableResponse, BookingError> {
        if !(1..=8).contains(&seats_requested) {
            return Err(BookingError::ValidationError(
                "Seats must be between 1 and 8".to_string(),
            ));
        }

        let mut conn = self.conn().await?;
        let user_id = user.id;

        let (table, taken, restaurant) = conn
            .transaction::<_, BookingError, _>(|conn| {
                async move {
                    let table = ContactTable::find_by_id_for_update(conn, table_id).await?;

                    if !table.is_open {
                        return Err(BookingError::TableClosed);
                    }
                    if table.has_started(Utc::now()) {
                        return Err(BookingError::TableStarted);
                    }

                    let restaurant = Restaurant::find_by_id(conn, table.restaurant_id).await?;
                    if !restaurant.is_publicly_visible() {
                        return Err(BookingError::NotFound);
                    }

                    if let Some(existing) =
                        TableParticipant::find_for_table_and_user(conn, table_id, user_id).await?
                    {
                        if existing.status == ParticipantStatus::Confirmed.as_str() {
                            return Err(BookingError::AlreadyJoined);
                        }
                        // A cancelled participation can be re-activated
                        use crate::schema::table_participants::dsl::*;
                        diesel::delete(table_participants.filter(id.eq(existing.id)))
                            .execute(conn)
                            .await?;
                    }

                    let taken = ContactTable::seats_taken(conn, table_id).await?;
                    if taken + seats_requested as i64 > table.max_seats as i64 {
                        return Err(BookingError::TableFull);
                    }

                    use crate::schema::table_participants::dsl::table_participants;
                    diesel::insert_into(table_participants)
                        .values(&NewTableParticipant {
                            contact_table_id: table_id,
                            user_id,
                            seats: seats_requested,
                            status: ParticipantStatus::Confirmed.as_str().to_string(),
                        })
                        .execute(conn)
                        .await?;

                    Ok((table, taken + seats_requested as i64, restaurant))
                }
                .scope_boxed()
            })
            .await?;

        tracing::info!(table_id = %table_id, user_id = %user.id, seats = seats_requested, "Guest joined contact table");

        // Confirmation email is best effort; the seat is already booked
        if let Err(e) = self
            .state
            .email_service
            .send_booking_confirmation_email(
                &user.email,
                &user.full_name,
                &restaurant.name,
                &table.title,
                &table.starts_at.to_rfc3339(),
                seats_requested,
            )
            .await
        {
            tracing::warn!("Failed to send booking confirmation: {}", e);
        }

        Ok(TableResponse::from_parts(table, taken, &restaurant))
    }

    /// Leave a table before it starts
    pub async fn leave(&self, user_id: Uuid, table_id: Uuid) -> Result<(), BookingError> {
        use crate::schema::table_participants::dsl::*;

        let mut conn = self.conn().await?;
        let table = ContactTable::find_by_id(&mut conn, table_id).await?;

        if table.has_started(Utc::now()) {
            return Err(BookingError::TableStarted);
        }

        let participant = TableParticipant::find_for_table_and_user(&mut conn, table_id, user_id)
            .await?
            .filter(|p| p.status == ParticipantStatus::Confirmed.as_str())
            .ok_or(BookingError::NotJoined)?;

        diesel::update(table_participants.filter(id.eq(participant.id)))
            .set((
                status.eq(ParticipantStatus::Cancelled.as_str()),
                updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)
            .await?;

        tracing::info!(table_id = %table_id, user_id = %user_id, "Guest left contact table");
        Ok(())
    }

    async fn count_open_upcoming(
        &self,
        conn: &mut diesel_async::AsyncPgConnection,
        restaurant: Uuid,
    ) -> Result<i64, BookingError> {
        use crate::schema::contact_tables::dsl::*;

        contact_tables
            .filter(restaurant_id.eq(restaurant))
            .filter(is_open.eq(true))
            .filter(starts_at.gt(Utc::now()))
            .count()
            .get_result(conn)
            .await
            .map_err(|e| BookingError::DatabaseError(e.to_string()))
    }
}
