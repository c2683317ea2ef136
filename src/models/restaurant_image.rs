// Uploaded restaurant image records (files live on disk, rows hold URLs)

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::restaurant_images;

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = restaurant_images)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct RestaurantImage {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub file_name: String,
    pub content_type: String,
    pub byte_size: i64,
    pub url: String,
    pub is_primary: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = restaurant_images)]
pub struct NewRestaurantImage {
    pub restaurant_id: Uuid,
    pub file_name: String,
    pub content_type: String,
    pub byte_size: i64,
    pub url: String,
    pub is_primary: bool,
}

#[derive(thiserror::Error, Debug)]
pub enum ImageError {
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("Image not found")]
    NotFound,
}

impl RestaurantImage {
    pub async fn create(
        conn: &mut AsyncPgConnection,
        new_image: NewRestaurantImage,
    ) -> Result<Self, ImageError> {
        use crate::schema::restaurant_images::dsl::*;

        diesel::insert_into(restaurant_images)
            .values(&new_image)
            .get_result::<RestaurantImage>(conn)
            .await
            .map_err(ImageError::Database)
    }

    pub async fn find_by_id(
        conn: &mut AsyncPgConnection,
        image_id: Uuid,
    ) -> Result<Self, ImageError> {
        use crate::schema::restaurant_images::dsl::*;

        restaurant_images
            .filter(id.eq(image_id))
            .first::<RestaurantImage>(conn)
            .await
            .map_err(|e| match e {
                diesel::result::Error::NotFound => ImageError::NotFound,
                _ => ImageError::Database(e),
            })
    }

    pub async fn list_for_restaurant(
        conn: &mut AsyncPgConnection,
        restaurant: Uuid,
    ) -> Result<Vec<Self>, ImageError> {
        use crate::schema::restaurant_images::dsl::*;

        restaurant_images
            .filter(restaurant_id.eq(restaurant))
            .order((is_primary.desc(), created_at.asc()))
            .load::<RestaurantImage>(conn)
            .await
            .map_err(ImageError::Database)
    }

    pub async fn count_for_restaurant(
        conn: &mut AsyncPgConnection,
        restaurant: Uuid,
    ) -> Result<i64, ImageError> {
        use crate::schema::restaurant_images::dsl::*;

        restaurant_images
            .filter(restaurant_id.eq(restaurant))
            .count()
            .get_result(conn)
            .await
            .map_err(ImageError::Database)
    }

    pub async fn delete(
        conn: &mut AsyncPgConnection,
        image_id: Uuid,
    ) -> Result<usize, ImageError> {
        use crate::schema::restaurant_images::dsl::*;

        diesel::delete(restaurant_images.filter(id.eq(image_id)))
            .execute(conn)
            .await
            .map_err(ImageError::Database)
    }

    /// Make one image the cover photo, clearing the flag on the rest
    pub async fn set_primary(
        conn: &mut AsyncPgConnection,
        restaurant: Uuid,
        image_id: Uuid,
    ) -> Result<(), ImageError> {
        use crate::schema::restaurant_images::dsl::*;

        diesel::update(restaurant_images.filter(restaurant_id.eq(restaurant)))
            .set(is_primary.eq(false))
            .execute(conn)
            .await
            .map_err(ImageError::Database)?;

        let updated = diesel::update(
            restaurant_images
                .filter(id.eq(image_id))
                .filter(restaurant_id.eq(restaurant)),
        )
        .set(is_primary.eq(true))
        .execute(conn)
        .await
        .map_err(ImageError::Database)?;

        if updated == 0 {
            return Err(ImageError::NotFound);
        }
        Ok(())
    }
}
