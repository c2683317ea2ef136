// Restaurant image upload handlers (multipart)

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    app::AppState,
    middleware::auth::AuthenticatedUser,
    models::restaurant::Restaurant,
    models::restaurant_image::{NewRestaurantImage, RestaurantImage},
    services::plans::PlanDefinition,
    utils::booking_errors::BookingError,
};

fn parse_user_id(auth_user: &AuthenticatedUser) -> Result<Uuid, BookingError> {
    Uuid::parse_str(&auth_user.user_id)
        .map_err(|_| BookingError::BadRequest("Invalid user ID format".to_string()))
}

/// Upload one or more images for the owner's restaurant
/// POST /api/v1/restaurant/images (multipart/form-data)
#[utoipa::path(
    post,
    path = "/v1/restaurant/images",
    tag = "Restaurants",
    operation_id = "uploadRestaurantImages",
    responses(
        (status = 201, description = "Images stored"),
        (status = 401, description = "Unauthorized"),
        (status = 402, description = "Plan image limit reached"),
        (status = 413, description = "Upload too large"),
        (status = 415, description = "Unsupported media type")
    ),
    security(
        ("bearerAuth" = [])
    )
)]
pub async fn upload_images(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let owner_id = match parse_user_id(&auth_user) {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };

    let mut conn = match state.diesel_pool.get().await {
        Ok(conn) => conn,
        Err(e) => return BookingError::DatabaseError(e.to_string()).into_response(),
    };

    let restaurant = match Restaurant::find_by_owner(&mut conn, owner_id).await {
        Ok(r) => r,
        Err(e) => return BookingError::from(e).into_response(),
    };

    let plan = PlanDefinition::for_plan(&restaurant.plan_enum());
    let mut existing = match RestaurantImage::count_for_restaurant(&mut conn, restaurant.id).await {
        Ok(count) => count,
        Err(e) => return BookingError::DatabaseError(e.to_string()).into_response(),
    };

    let mut stored_images = Vec::new();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                return BookingError::BadRequest(format!("Malformed multipart body: {}", e))
                    .into_response()
            },
        };

        // Only file fields named "image" are accepted
        if field.name() != Some("image") {
            continue;
        }

        if existing >= plan.max_images as i64 {
            return BookingError::PlanLimitExceeded(format!(
                "{} plan allows {} images",
                plan.display_name, plan.max_images
            ))
            .into_response();
        }

        let content_type = field
            .content_type()
            .map(String::from)
            .unwrap_or_else(|| "application/octet-stream".to_string());

        let bytes = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                return BookingError::BadRequest(format!("Failed to read upload: {}", e))
                    .into_response()
            },
        };

        let stored = match state
            .storage_service
            .store_image(restaurant.id, &content_type, &bytes)
            .await
        {
            Ok(stored) => stored,
            Err(e) => return e.into_response(),
        };

        let record = match RestaurantImage::create(
            &mut conn,
            NewRestaurantImage {
                restaurant_id: restaurant.id,
                file_name: stored.file_name.clone(),
                content_type: content_type.clone(),
                byte_size: stored.byte_size,
                url: stored.url.clone(),
                is_primary: existing == 0, // First image becomes the cover
            },
        )
        .await
        {
            Ok(record) => record,
            Err(e) => {
                // Roll the file back; the row is the source of truth
                let _ = state
                    .storage_service
                    .delete_image(restaurant.id, &stored.file_name)
                    .await;
                return BookingError::DatabaseError(e.to_string()).into_response();
            },
        };

        existing += 1;
        stored_images.push(record);
    }

    if stored_images.is_empty() {
        return BookingError::BadRequest("No image field in upload".to_string()).into_response();
    }

    (
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "data": stored_images,
            "message": format!("{} image(s) uploaded", stored_images.len())
        })),
    )
        .into_response()
}

/// Delete an image
/// DELETE /api/v1/restaurant/images/:id
pub async fn delete_image(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path(image_id): Path<Uuid>,
) -> impl IntoResponse {
    let owner_id = match parse_user_id(&auth_user) {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };

    let mut conn = match state.diesel_pool.get().await {
        Ok(conn) => conn,
        Err(e) => return BookingError::DatabaseError(e.to_string()).into_response(),
    };

    let restaurant = match Restaurant::find_by_owner(&mut conn, owner_id).await {
        Ok(r) => r,
        Err(e) => return BookingError::from(e).into_response(),
    };

    let image = match RestaurantImage::find_by_id(&mut conn, image_id).await {
        Ok(image) => image,
        Err(crate::models::restaurant_image::ImageError::NotFound) => {
            return BookingError::NotFound.into_response()
        },
        Err(e) => return BookingError::DatabaseError(e.to_string()).into_response(),
    };

    if image.restaurant_id != restaurant.id {
        return BookingError::Forbidden("Image belongs to a different restaurant".to_string())
            .into_response();
    }

    if let Err(e) = RestaurantImage::delete(&mut conn, image.id).await {
        return BookingError::DatabaseError(e.to_string()).into_response();
    }

    if let Err(e) = state
        .storage_service
        .delete_image(restaurant.id, &image.file_name)
        .await
    {
        tracing::warn!("Failed to remove image file: {}", e);
    }

    StatusCode::NO_CONTENT.into_response()
}

/// Mark an image as the cover photo
/// POST /api/v1/restaurant/images/:id/primary
pub async fn set_primary_image(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path(image_id): Path<Uuid>,
) -> impl IntoResponse {
    let owner_id = match parse_user_id(&auth_user) {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };

    let mut conn = match state.diesel_pool.get().await {
        Ok(conn) => conn,
        Err(e) => return BookingError::DatabaseError(e.to_string()).into_response(),
    };

    let restaurant = match Restaurant::find_by_owner(&mut conn, owner_id).await {
        Ok(r) => r,
        Err(e) => return BookingError::from(e).into_response(),
    };

    match RestaurantImage::set_primary(&mut conn, restaurant.id, image_id).await {
        Ok(()) => Json(json!({
            "success": true,
            "message": "Cover image updated"
        }))
        .into_response(),
        Err(crate::models::restaurant_image::ImageError::NotFound) => {
            BookingError::NotFound.into_response()
        },
        Err(e) => BookingError::DatabaseError(e.to_string()).into_response(),
    }
}
