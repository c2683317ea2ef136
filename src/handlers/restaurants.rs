// Restaurant handlers: public discovery and owner profile management

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
    services::contact_table::ContactTableService,
    services::restaurant::{DiscoveryFilter, RestaurantService, UpdateProfileRequest},
    utils::booking_errors::BookingError,
};

// =============================================================================
// PUBLIC DISCOVERY
// =============================================================================

/// List restaurants open for contact tables
/// GET /api/v1/restaurants
#[utoipa::path(
    get,
    path = "/v1/restaurants",
    tag = "Restaurants",
    operation_id = "listRestaurants",
    params(
        ("city" = Option<String>, Query, description = "Filter by city (substring match)"),
        ("cuisine" = Option<String>, Query, description = "Filter by cuisine"),
        ("q" = Option<String>, Query, description = "Search in restaurant names"),
        ("page" = Option<i64>, Query, description = "Page number (1-based)"),
        ("per_page" = Option<i64>, Query, description = "Page size (max 100)")
    ),
    responses(
        (status = 200, description = "Restaurants retrieved successfully")
    )
)]
pub async fn list_restaurants(
    State(state): State<AppState>,
    Query(filter): Query<DiscoveryFilter>,
) -> impl IntoResponse {
    let service = RestaurantService::new(&state);

    match service.list_public(filter).await {
        Ok(restaurants) => Json(json!({
            "success": true,
            "data": restaurants
        }))
        .into_response(),
        Err(e) => e.into_response(),
    }
}

/// Public restaurant profile with its upcoming tables
/// GET /api/v1/restaurants/:slug
#[utoipa::path(
    get,
    path = "/v1/restaurants/{slug}",
    tag = "Restaurants",
    operation_id = "getRestaurantBySlug",
    params(
        ("slug" = String, Path, description = "Restaurant slug", example = "zur-goldenen-gabel")
    ),
    responses(
        (status = 200, description = "Restaurant retrieved successfully"),
        (status = 404, description = "Restaurant not found or not live")
    )
)]
pub async fn get_restaurant_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> impl IntoResponse {
    let service = RestaurantService::new(&state);

    let (restaurant, images) = match service.public_by_slug(&slug).await {
        Ok(result) => result,
        Err(e) => return e.into_response(),
    };

    // Upcoming open tables shown on the profile page
    let tables = match ContactTableService::new(&state)
        .list_upcoming_for_restaurant(&restaurant)
        .await
    {
        Ok(tables) => tables,
        Err(e) => {
            tracing::warn!("Failed to load tables for {}: {}", slug, e);
            Vec::new()
        },
    };

    Json(json!({
        "success": true,
        "data": {
            "id": restaurant.id,
            "name": restaurant.name,
            "slug": restaurant.slug,
            "description": restaurant.description,
            "cuisine": restaurant.cuisine,
            "phone": restaurant.phone,
            "website": restaurant.website,
            "address": {
                "street": restaurant.address_street,
                "city": restaurant.address_city,
                "postal_code": restaurant.postal_code,
                "country": restaurant.country,
            },
            "capacity": restaurant.capacity,
            "opening_hours": restaurant.opening_hours,
            "images": images,
            "upcoming_tables": tables,
        }
    }))
    .into_response()
}

// =============================================================================
// OWNER PROFILE
// =============================================================================

fn parse_user_id(auth_user: &AuthenticatedUser) -> Result<Uuid, BookingError> {
    Uuid::parse_str(&auth_user.user_id)
        .map_err(|_| BookingError::BadRequest("Invalid user ID format".to_string()))
}

/// Owner view of the restaurant profile, including completeness
/// GET /api/v1/restaurant/profile
pub async fn get_own_profile(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
) -> impl IntoResponse {
    let owner_id = match parse_user_id(&auth_user) {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };

    match RestaurantService::new(&state).owner_profile(owner_id).await {
        Ok(profile) => Json(json!({
            "success": true,
            "data": profile
        }))
        .into_response(),
        Err(e) => e.into_response(),
    }
}

/// Update the restaurant profile
/// PUT /api/v1/restaurant/profile
#[utoipa::path(
    put,
    path = "/v1/restaurant/profile",
    tag = "Restaurants",
    operation_id = "updateRestaurantProfile",
    responses(
        (status = 200, description = "Profile updated successfully"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not a restaurant owner"),
        (status = 422, description = "Validation failed")
    ),
    security(
        ("bearerAuth" = [])
    )
)]
pub async fn update_own_profile(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Json(request): Json<UpdateProfileRequest>,
) -> impl IntoResponse {
    let owner_id = match parse_user_id(&auth_user) {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };

    match RestaurantService::new(&state)
        .update_profile(owner_id, request)
        .await
    {
        Ok(profile) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": profile,
                "message": "Profile updated"
            })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}
