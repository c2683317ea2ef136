// Contact table handlers: owner CRUD, public browsing, join/leave

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    app::AppState,
    middleware::auth::AuthenticatedUser,
    models::user::{User, UserError},
    services::contact_table::{
        ContactTableService, CreateTableRequest, JoinTableRequest, OpenTablesFilter,
        UpdateTableRequest,
    },
    utils::booking_errors::BookingError,
};

fn parse_user_id(auth_user: &AuthenticatedUser) -> Result<Uuid, BookingError> {
    Uuid::parse_str(&auth_user.user_id)
        .map_err(|_| BookingError::BadRequest("Invalid user ID format".to_string()))
}

// =============================================================================
// OWNER HANDLERS (/restaurant/tables)
// =============================================================================

/// Create a contact table
/// POST /api/v1/restaurant/tables
#[utoipa::path(
    post,
    path = "/v1/restaurant/tables",
    tag = "ContactTables",
    operation_id = "createContactTable",
    responses(
        (status = 201, description = "Contact table created"),
        (status = 401, description = "Unauthorized"),
        (status = 402, description = "Plan limit reached"),
        (status = 403, description = "Restaurant not active"),
        (status = 422, description = "Validation failed")
    ),
    security(
        ("bearerAuth" = [])
    )
)]
pub async fn create_table(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Json(request): Json<CreateTableRequest>,
) -> impl IntoResponse {
    let owner_id = match parse_user_id(&auth_user) {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };

    match ContactTableService::new(&state).create(owner_id, request).await {
        Ok(table) => (
            StatusCode::CREATED,
            Json(json!({ "success": true, "data": table })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// List the restaurant's own tables with seat counts
/// GET /api/v1/restaurant/tables
pub async fn list_own_tables(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
) -> impl IntoResponse {
    let owner_id = match parse_user_id(&auth_user) {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };

    match ContactTableService::new(&state).list_for_owner(owner_id).await {
        Ok(tables) => Json(json!({ "success": true, "data": tables })).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Update an owned table
/// PUT /api/v1/restaurant/tables/:id
pub async fn update_table(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path(table_id): Path<Uuid>,
    Json(request): Json<UpdateTableRequest>,
) -> impl IntoResponse {
    let owner_id = match parse_user_id(&auth_user) {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };

    match ContactTableService::new(&state)
        .update(owner_id, table_id, request)
        .await
    {
        Ok(table) => Json(json!({ "success": true, "data": table })).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Cancel an owned table and its reservations
/// DELETE /api/v1/restaurant/tables/:id
pub async fn cancel_table(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path(table_id): Path<Uuid>,
) -> impl IntoResponse {
    let owner_id = match parse_user_id(&auth_user) {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };

    match ContactTableService::new(&state).cancel(owner_id, table_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}

/// Confirmed participants of an owned table
/// GET /api/v1/restaurant/tables/:id/participants
pub async fn list_participants(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path(table_id): Path<Uuid>,
) -> impl IntoResponse {
    let owner_id = match parse_user_id(&auth_user) {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };

    match ContactTableService::new(&state)
        .participants(owner_id, table_id)
        .await
    {
        Ok(participants) => {
            Json(json!({ "success": true, "data": participants })).into_response()
        },
        Err(e) => e.into_response(),
    }
}

// =============================================================================
// GUEST HANDLERS (/tables)
// =============================================================================

/// Browse upcoming open tables
/// GET /api/v1/tables
#[utoipa::path(
    get,
    path = "/v1/tables",
    tag = "ContactTables",
    operation_id = "listOpenTables",
    params(
        ("city" = Option<String>, Query, description = "Filter by city"),
        ("cuisine" = Option<String>, Query, description = "Filter by cuisine"),
        ("date" = Option<String>, Query, description = "Filter by date (YYYY-MM-DD)"),
        ("page" = Option<i64>, Query, description = "Page number (1-based)"),
        ("per_page" = Option<i64>, Query, description = "Page size (max 100)")
    ),
    responses(
        (status = 200, description = "Open tables retrieved successfully")
    )
)]
pub async fn list_open_tables(
    State(state): State<AppState>,
    Query(filter): Query<OpenTablesFilter>,
) -> impl IntoResponse {
    match ContactTableService::new(&state).list_open(filter).await {
        Ok(tables) => Json(json!({ "success": true, "data": tables })).into_response(),
        Err(e) => e.into_response(),
    }
}

/// View a single table
/// GET /api/v1/tables/:id
pub async fn get_table(
    State(state): State<AppState>,
    Path(table_id): Path<Uuid>,
) -> impl IntoResponse {
    match ContactTableService::new(&state).get_public(table_id).await {
        Ok(table) => Json(json!({ "success": true, "data": table })).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Join a contact table
/// POST /api/v1/tables/:id/join
#[utoipa::path(
    post,
    path = "/v1/tables/{id}/join",
    tag = "ContactTables",
    operation_id = "joinContactTable",
    params(
        ("id" = Uuid, Path, description = "Contact table ID")
    ),
    responses(
        (status = 200, description = "Seat confirmed"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Table not found"),
        (status = 409, description = "Table full, closed, started, or already joined")
    ),
    security(
        ("bearerAuth" = [])
    )
)]
pub async fn join_table(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path(table_id): Path<Uuid>,
    Json(request): Json<JoinTableRequest>,
) -> impl IntoResponse {
    let user_id = match parse_user_id(&auth_user) {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };

    // Booking confirmation emails need the full user row
    let mut conn = match state.diesel_pool.get().await {
        Ok(conn) => conn,
        Err(e) => return BookingError::DatabaseError(e.to_string()).into_response(),
    };

    let user = match User::find_by_id(&mut conn, user_id).await {
        Ok(user) => user,
        Err(UserError::NotFound) => return BookingError::Unauthorized.into_response(),
        Err(e) => return BookingError::DatabaseError(e.to_string()).into_response(),
    };
    drop(conn);

    match ContactTableService::new(&state)
        .join(&user, table_id, request.seats)
        .await
    {
        Ok(table) => Json(json!({
            "success": true,
            "data": table,
            "message": "Seat confirmed"
        }))
        .into_response(),
        Err(e) => e.into_response(),
    }
}

/// Leave a contact table before it starts
/// POST /api/v1/tables/:id/leave
pub async fn leave_table(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path(table_id): Path<Uuid>,
) -> impl IntoResponse {
    let user_id = match parse_user_id(&auth_user) {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };

    match ContactTableService::new(&state).leave(user_id, table_id).await {
        Ok(()) => Json(json!({
            "success": true,
            "message": "Reservation cancelled"
        }))
        .into_response(),
        Err(e) => e.into_response(),
    }
}
