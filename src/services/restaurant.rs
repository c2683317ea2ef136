// Restaurant profile service: discovery queries, owner profile
// management, completeness, re-slugging

use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    app::AppState,
    models::restaurant::{ContractStatus, Restaurant, RestaurantError, RestaurantUpdate},
    models::restaurant_image::RestaurantImage,
    services::slug,
    utils::{booking_errors::BookingError, trim_optional_field},
};

// =============================================================================
// REQUEST/RESPONSE TYPES
// =============================================================================

/// Owner-editable profile fields. Omitted fields stay untouched; empty
/// strings clear the value.
#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 2, max = 255, message = "Name must be between 2 and 255 characters"))]
    pub name: Option<String>,

    #[validate(length(max = 2000, message = "Description must be less than 2000 characters"))]
    pub description: Option<String>,

    #[validate(length(max = 100, message = "Cuisine must be less than 100 characters"))]
    pub cuisine: Option<String>,

    #[validate(length(max = 50, message = "Phone must be less than 50 characters"))]
    pub phone: Option<String>,

    #[validate(url(message = "Website must be a valid URL"))]
    pub website: Option<String>,

    #[validate(length(max = 255))]
    pub address_street: Option<String>,

    #[validate(length(max = 100))]
    pub address_city: Option<String>,

    #[validate(length(max = 20))]
    pub postal_code: Option<String>,

    #[validate(length(max = 100))]
    pub country: Option<String>,

    #[validate(range(min = 1, max = 1000, message = "Capacity must be between 1 and 1000"))]
    pub capacity: Option<i32>,

    pub opening_hours: Option<serde_json::Value>,
}

/// Filters for public discovery
#[derive(Debug, Default, Deserialize)]
pub struct DiscoveryFilter {
    pub city: Option<String>,
    pub cuisine: Option<String>,
    pub q: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct PublicRestaurant {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub cuisine: Option<String>,
    pub address_city: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OwnerProfileResponse {
    pub restaurant: Restaurant,
    pub images: Vec<RestaurantImage>,
    pub completeness_percent: u8,
}

// =============================================================================
// SERVICE
// =============================================================================

pub struct RestaurantService<'a> {
    state: &'a AppState,
}

impl<'a> RestaurantService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    /// Owner dashboard view of the restaurant
    pub async fn owner_profile(&self, owner_id: Uuid) -> Result<OwnerProfileResponse, BookingError> {
        let mut conn = self
            .state
            .diesel_pool
            .get()
            .await
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        let restaurant = Restaurant::find_by_owner(&mut conn, owner_id).await?;
        let images = RestaurantImage::list_for_restaurant(&mut conn, restaurant.id)
            .await
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        let completeness = restaurant.completeness_percent(!images.is_empty());

        Ok(OwnerProfileResponse {
            restaurant,
            images,
            completeness_percent: completeness,
        })
    }

    /// Apply a validated profile update. Renames re-slug; editing a
    /// rejected restaurant resubmits it for review.
    pub async fn update_profile(
        &self,
        owner_id: Uuid,
        request: UpdateProfileRequest,
    ) -> Result<OwnerProfileResponse, BookingError> {
        request.validate()?;

        let mut conn = self
            .state
            .diesel_pool
            .get()
            .await
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        let restaurant = Restaurant::find_by_owner(&mut conn, owner_id).await?;

        let mut update = RestaurantUpdate::default();

        if let Some(name) = request.name.as_deref().map(str::trim) {
            if !name.is_empty() && name != restaurant.name {
                let new_slug = slug::generate_unique_slug(&mut conn, name, Some(restaurant.id))
                    .await
                    .map_err(|e| match e {
                        slug::SlugError::EmptySlug => {
                            BookingError::ValidationError("Name produces an empty slug".to_string())
                        },
                        slug::SlugError::Exhausted(name) => BookingError::SlugExists(name),
                        slug::SlugError::Database(e) => BookingError::DatabaseError(e.to_string()),
                    })?;

                update.name = Some(name.to_string());
                update.slug = Some(new_slug);
            }
        }

        update.description = Some(trim_optional_field(request.description.as_ref()));
        update.cuisine = Some(trim_optional_field(request.cuisine.as_ref()));
        update.phone = Some(trim_optional_field(request.phone.as_ref()));
        update.website = Some(trim_optional_field(request.website.as_ref()));
        update.address_street = Some(trim_optional_field(request.address_street.as_ref()));
        update.address_city = Some(trim_optional_field(request.address_city.as_ref()));
        update.postal_code = Some(trim_optional_field(request.postal_code.as_ref()));
        update.country = Some(trim_optional_field(request.country.as_ref()));
        update.capacity = Some(request.capacity);
        update.opening_hours = Some(request.opening_hours.clone());

        let updated = Restaurant::update(&mut conn, restaurant.id, update).await?;

        // A rejected restaurant goes back into the review queue once the
        // owner has edited it
        let updated = if updated.contract_status_enum() == ContractStatus::Rejected {
            tracing::info!(restaurant_id = %updated.id, "Rejected restaurant resubmitted for review");
            Restaurant::transition_contract_status(
                &mut conn,
                updated.id,
                ContractStatus::Pending,
                RestaurantUpdate {
                    rejected_reason: Some(None),
                    ..Default::default()
                },
            )
            .await?
        } else {
            updated
        };

        let images = RestaurantImage::list_for_restaurant(&mut conn, updated.id)
            .await
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?;
        let completeness = updated.completeness_percent(!images.is_empty());

        Ok(OwnerProfileResponse {
            restaurant: updated,
            images,
            completeness_percent: completeness,
        })
    }

    /// Public discovery listing: active restaurants only
    pub async fn list_public(
        &self,
        filter: DiscoveryFilter,
    ) -> Result<Vec<PublicRestaurant>, BookingError> {
        use crate::schema::restaurants::dsl::*;

        let mut conn = self
            .state
            .diesel_pool
            .get()
            .await
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        let page = filter.page.unwrap_or(1).max(1);
        let per_page = filter.per_page.unwrap_or(20).clamp(1, 100);

        let mut query = restaurants
            .filter(contract_status.eq(ContractStatus::Active.as_str()))
            .filter(is_active.eq(true))
            .into_boxed();

        if let Some(city) = filter.city.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            query = query.filter(address_city.ilike(format!("%{}%", city)));
        }
        if let Some(c) = filter.cuisine.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            query = query.filter(cuisine.ilike(format!("%{}%", c)));
        }
        if let Some(q) = filter.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            query = query.filter(name.ilike(format!("%{}%", q)));
        }

        let rows: Vec<Restaurant> = query
            .order(name.asc())
            .limit(per_page)
            .offset((page - 1) * per_page)
            .load::<Restaurant>(&mut conn)
            .await
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        let mut results = Vec::with_capacity(rows.len());
        for restaurant in rows {
            let images = RestaurantImage::list_for_restaurant(&mut conn, restaurant.id)
                .await
                .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

            results.push(PublicRestaurant {
                id: restaurant.id,
                name: restaurant.name,
                slug: restaurant.slug,
                description: restaurant.description,
                cuisine: restaurant.cuisine,
                address_city: restaurant.address_city,
                image_url: images.first().map(|i| i.url.clone()),
            });
        }

        Ok(results)
    }

    /// Public profile by slug. 404 for restaurants that are not live.
    pub async fn public_by_slug(
        &self,
        slug_str: &str,
    ) -> Result<(Restaurant, Vec<RestaurantImage>), BookingError> {
        let mut conn = self
            .state
            .diesel_pool
            .get()
            .await
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        let restaurant = match Restaurant::find_by_slug(&mut conn, slug_str).await {
            Ok(r) if r.is_publicly_visible() => r,
            Ok(_) => return Err(BookingError::NotFound),
            Err(RestaurantError::NotFound) => return Err(BookingError::NotFound),
            Err(e) => return Err(e.into()),
        };

        let images = RestaurantImage::list_for_restaurant(&mut conn, restaurant.id)
            .await
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        Ok((restaurant, images))
    }
}
