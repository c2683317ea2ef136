// Admin handlers: review queue, contract decisions, dashboard stats,
// contact-form inbox

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::Deserialize;
use serde_json::json;
use std::str::FromStr;
use uuid::Uuid;

use crate::{
    app::AppState,
    models::contact_message::{ContactMessage, MessageStatus},
    models::restaurant::{ContractStatus, Restaurant},
    services::contract::ContractService,
    utils::booking_errors::BookingError,
};

#[derive(Debug, Deserialize)]
pub struct ReviewQueueQuery {
    pub status: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct RejectRequest {
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct MessageListQuery {
    pub status: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct MessageStatusRequest {
    pub status: String,
}

/// GET /admin/restaurants - Review queue, filterable by contract status
pub async fn list_restaurants(
    State(state): State<AppState>,
    Query(query): Query<ReviewQueueQuery>,
) -> impl IntoResponse {
    use crate::schema::restaurants::dsl::*;

    let status_filter = match query.status.as_deref() {
        Some(s) => match ContractStatus::from_str(s) {
            Ok(status) => Some(status),
            Err(_) => {
                return BookingError::BadRequest(format!("Unknown status: {}", s)).into_response()
            },
        },
        None => None,
    };

    let mut conn = match state.diesel_pool.get().await {
        Ok(conn) => conn,
        Err(e) => return BookingError::DatabaseError(e.to_string()).into_response(),
    };

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(25).clamp(1, 100);

    let mut db_query = restaurants.into_boxed();
    if let Some(s) = status_filter {
        db_query = db_query.filter(contract_status.eq(s.as_str()));
    }

    let rows: Result<Vec<Restaurant>, _> = db_query
        .order(created_at.asc())
        .limit(per_page)
        .offset((page - 1) * per_page)
        .load::<Restaurant>(&mut conn)
        .await;

    match rows {
        Ok(list) => Json(json!({ "success": true, "data": list })).into_response(),
        Err(e) => BookingError::DatabaseError(e.to_string()).into_response(),
    }
}

/// POST /admin/restaurants/:id/approve - Approve a pending restaurant
pub async fn approve_restaurant(
    State(state): State<AppState>,
    Path(restaurant_id): Path<Uuid>,
) -> impl IntoResponse {
    match ContractService::new(&state).approve(restaurant_id).await {
        Ok(restaurant) => Json(json!({
            "success": true,
            "data": restaurant,
            "message": "Restaurant approved"
        }))
        .into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /admin/restaurants/:id/reject - Reject a pending restaurant
pub async fn reject_restaurant(
    State(state): State<AppState>,
    Path(restaurant_id): Path<Uuid>,
    Json(request): Json<RejectRequest>,
) -> impl IntoResponse {
    match ContractService::new(&state)
        .reject(restaurant_id, &request.reason)
        .await
    {
        Ok(restaurant) => Json(json!({
            "success": true,
            "data": restaurant,
            "message": "Restaurant rejected"
        }))
        .into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /admin/stats - Dashboard counts
pub async fn get_stats(State(state): State<AppState>) -> impl IntoResponse {
    use crate::schema::{contact_tables, restaurants, users};

    let mut conn = match state.diesel_pool.get().await {
        Ok(conn) => conn,
        Err(e) => return BookingError::DatabaseError(e.to_string()).into_response(),
    };

    // Sequential counts; the dashboard is not a hot path
    let result: Result<serde_json::Value, diesel::result::Error> = async {
        let total_users: i64 = users::table.count().get_result(&mut conn).await?;
        let customers: i64 = users::table
            .filter(users::role.eq("customer"))
            .count()
            .get_result(&mut conn)
            .await?;
        let owners: i64 = users::table
            .filter(users::role.eq("restaurant"))
            .count()
            .get_result(&mut conn)
            .await?;

        let pending: i64 = restaurants::table
            .filter(restaurants::contract_status.eq(ContractStatus::Pending.as_str()))
            .count()
            .get_result(&mut conn)
            .await?;
        let active: i64 = restaurants::table
            .filter(restaurants::contract_status.eq(ContractStatus::Active.as_str()))
            .count()
            .get_result(&mut conn)
            .await?;
        let total_restaurants: i64 = restaurants::table.count().get_result(&mut conn).await?;

        let upcoming_tables: i64 = contact_tables::table
            .filter(contact_tables::is_open.eq(true))
            .filter(contact_tables::starts_at.gt(chrono::Utc::now()))
            .count()
            .get_result(&mut conn)
            .await?;

        Ok(json!({
            "users": {
                "total": total_users,
                "customers": customers,
                "restaurant_owners": owners,
            },
            "restaurants": {
                "total": total_restaurants,
                "pending_review": pending,
                "active": active,
            },
            "upcoming_tables": upcoming_tables,
        }))
    }
    .await;

    let mut stats = match result {
        Ok(stats) => stats,
        Err(e) => return BookingError::DatabaseError(e.to_string()).into_response(),
    };

    match ContactMessage::count_with_status(&mut conn, MessageStatus::New).await {
        Ok(unread) => {
            stats["unread_messages"] = json!(unread);
        },
        Err(e) => {
            tracing::warn!("Failed to count unread messages: {}", e);
        },
    }

    Json(json!({ "success": true, "data": stats })).into_response()
}

/// GET /admin/messages - Contact-form inbox
pub async fn list_messages(
    State(state): State<AppState>,
    Query(query): Query<MessageListQuery>,
) -> impl IntoResponse {
    let status_filter = match query.status.as_deref() {
        Some(s) => match MessageStatus::from_string(s) {
            Some(status) => Some(status),
            None => {
                return BookingError::BadRequest(format!("Unknown status: {}", s)).into_response()
            },
        },
        None => None,
    };

    let mut conn = match state.diesel_pool.get().await {
        Ok(conn) => conn,
        Err(e) => return BookingError::DatabaseError(e.to_string()).into_response(),
    };

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(25).clamp(1, 100);

    match ContactMessage::list(&mut conn, status_filter, per_page, (page - 1) * per_page).await {
        Ok(messages) => Json(json!({ "success": true, "data": messages })).into_response(),
        Err(e) => BookingError::DatabaseError(e.to_string()).into_response(),
    }
}

/// PUT /admin/messages/:id/status - Triage a contact message
pub async fn set_message_status(
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
    Json(request): Json<MessageStatusRequest>,
) -> impl IntoResponse {
    let new_status = match MessageStatus::from_string(&request.status) {
        Some(status) => status,
        None => {
            return BookingError::BadRequest(format!("Unknown status: {}", request.status))
                .into_response()
        },
    };

    let mut conn = match state.diesel_pool.get().await {
        Ok(conn) => conn,
        Err(e) => return BookingError::DatabaseError(e.to_string()).into_response(),
    };

    match ContactMessage::set_status(&mut conn, message_id, new_status).await {
        Ok(message) => Json(json!({ "success": true, "data": message })).into_response(),
        Err(crate::models::contact_message::ContactMessageError::NotFound) => {
            BookingError::NotFound.into_response()
        },
        Err(e) => BookingError::DatabaseError(e.to_string()).into_response(),
    }
}
