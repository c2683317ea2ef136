// Error handling for the restaurant, contact-table, and onboarding domain

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::models::restaurant::RestaurantError;

// =============================================================================
// ERROR TYPES
// =============================================================================

#[derive(Error, Debug)]
pub enum BookingError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Unauthorized access")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Resource not found")]
    NotFound,

    #[error("Slug already exists: {0}")]
    SlugExists(String),

    #[error("Reserved slug: {0}")]
    ReservedSlug(String),

    #[error("Restaurant is not active")]
    RestaurantNotActive,

    #[error("Illegal contract status transition from {from} to {to}")]
    IllegalTransition { from: String, to: String },

    #[error("Contact table is full")]
    TableFull,

    #[error("Contact table is closed")]
    TableClosed,

    #[error("Contact table has already started")]
    TableStarted,

    #[error("Already joined this contact table")]
    AlreadyJoined,

    #[error("Not a participant of this contact table")]
    NotJoined,

    #[error("Plan limit exceeded: {0}")]
    PlanLimitExceeded(String),

    #[error("Upload too large: {size} bytes (max {max})")]
    UploadTooLarge { size: u64, max: u64 },

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Rate limit exceeded. Try again in {retry_after} seconds")]
    RateLimitExceeded { retry_after: u64 },

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Internal server error")]
    InternalError,
}

// =============================================================================
// ERROR CONVERSIONS
// =============================================================================

impl From<diesel::result::Error> for BookingError {
    fn from(err: diesel::result::Error) -> Self {
        match err {
            diesel::result::Error::NotFound => BookingError::NotFound,
            _ => BookingError::DatabaseError(err.to_string()),
        }
    }
}

impl From<RestaurantError> for BookingError {
    fn from(err: RestaurantError) -> Self {
        match err {
            RestaurantError::NotFound => BookingError::NotFound,
            RestaurantError::IllegalTransition { from, to } => {
                BookingError::IllegalTransition { from, to }
            },
            RestaurantError::Database(e) => BookingError::DatabaseError(e.to_string()),
        }
    }
}

impl From<crate::models::contact_table::ContactTableError> for BookingError {
    fn from(err: crate::models::contact_table::ContactTableError) -> Self {
        use crate::models::contact_table::ContactTableError;
        match err {
            ContactTableError::NotFound => BookingError::NotFound,
            ContactTableError::Database(e) => BookingError::DatabaseError(e.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for BookingError {
    fn from(err: validator::ValidationErrors) -> Self {
        let messages: Vec<String> = err
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors
                    .iter()
                    .map(move |e| format!("{}: {}", field, e.message.as_ref().unwrap_or(&e.code)))
            })
            .collect();

        BookingError::ValidationError(messages.join(", "))
    }
}

// =============================================================================
// ERROR RESPONSE
// =============================================================================

#[derive(Debug, Serialize)]
pub struct BookingErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl BookingError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            BookingError::BadRequest(_) => StatusCode::BAD_REQUEST,

            BookingError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,

            BookingError::Unauthorized => StatusCode::UNAUTHORIZED,

            BookingError::Forbidden(_) | BookingError::RestaurantNotActive => {
                StatusCode::FORBIDDEN
            },

            BookingError::NotFound => StatusCode::NOT_FOUND,

            BookingError::SlugExists(_)
            | BookingError::ReservedSlug(_)
            | BookingError::IllegalTransition { .. }
            | BookingError::TableFull
            | BookingError::TableClosed
            | BookingError::TableStarted
            | BookingError::AlreadyJoined
            | BookingError::NotJoined => StatusCode::CONFLICT,

            BookingError::PlanLimitExceeded(_) => StatusCode::PAYMENT_REQUIRED,

            BookingError::UploadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,

            BookingError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,

            BookingError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,

            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            BookingError::ValidationError(_) => "VALIDATION_ERROR",
            BookingError::BadRequest(_) => "BAD_REQUEST",
            BookingError::Unauthorized => "UNAUTHORIZED",
            BookingError::Forbidden(_) => "FORBIDDEN",
            BookingError::NotFound => "NOT_FOUND",
            BookingError::SlugExists(_) => "SLUG_EXISTS",
            BookingError::ReservedSlug(_) => "RESERVED_SLUG",
            BookingError::RestaurantNotActive => "RESTAURANT_NOT_ACTIVE",
            BookingError::IllegalTransition { .. } => "ILLEGAL_TRANSITION",
            BookingError::TableFull => "TABLE_FULL",
            BookingError::TableClosed => "TABLE_CLOSED",
            BookingError::TableStarted => "TABLE_STARTED",
            BookingError::AlreadyJoined => "ALREADY_JOINED",
            BookingError::NotJoined => "NOT_JOINED",
            BookingError::PlanLimitExceeded(_) => "PLAN_LIMIT_EXCEEDED",
            BookingError::UploadTooLarge { .. } => "UPLOAD_TOO_LARGE",
            BookingError::UnsupportedMediaType(_) => "UNSUPPORTED_MEDIA_TYPE",
            BookingError::RateLimitExceeded { .. } => "RATE_LIMIT_EXCEEDED",
            BookingError::DatabaseError(_) => "DATABASE_ERROR",
            BookingError::StorageError(_) => "STORAGE_ERROR",
            BookingError::InternalError => "INTERNAL_ERROR",
        }
    }

    pub fn to_response(&self) -> BookingErrorResponse {
        let details = match self {
            BookingError::RateLimitExceeded { retry_after } => {
                Some(serde_json::json!({ "retry_after": retry_after }))
            },
            BookingError::IllegalTransition { from, to } => {
                Some(serde_json::json!({ "from": from, "to": to }))
            },
            BookingError::UploadTooLarge { size, max } => {
                Some(serde_json::json!({ "size": size, "max": max }))
            },
            _ => None,
        };

        BookingErrorResponse {
            error: self.to_string(),
            code: self.error_code().to_string(),
            details,
        }
    }
}

impl IntoResponse for BookingError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = self.to_response();

        (status, Json(body)).into_response()
    }
}

// =============================================================================
// RESULT TYPE
// =============================================================================

pub type BookingResult<T> = Result<T, BookingError>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(BookingError::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(BookingError::TableFull.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            BookingError::AlreadyJoined.status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            BookingError::IllegalTransition {
                from: "pending".to_string(),
                to: "active".to_string()
            }
            .status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            BookingError::Unauthorized.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            BookingError::PlanLimitExceeded("tables".to_string()).status_code(),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(
            BookingError::UnsupportedMediaType("text/plain".to_string()).status_code(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(BookingError::TableFull.error_code(), "TABLE_FULL");
        assert_eq!(
            BookingError::SlugExists("x".to_string()).error_code(),
            "SLUG_EXISTS"
        );
        assert_eq!(
            BookingError::RestaurantNotActive.error_code(),
            "RESTAURANT_NOT_ACTIVE"
        );
    }

    #[test]
    fn test_illegal_transition_details() {
        let err = BookingError::IllegalTransition {
            from: "rejected".to_string(),
            to: "active".to_string(),
        };
        let response = err.to_response();

        assert_eq!(response.code, "ILLEGAL_TRANSITION");
        let details = response.details.unwrap();
        assert_eq!(details["from"], "rejected");
        assert_eq!(details["to"], "active");
    }

    #[test]
    fn test_from_restaurant_error() {
        let err: BookingError = RestaurantError::NotFound.into();
        assert!(matches!(err, BookingError::NotFound));

        let err: BookingError = RestaurantError::IllegalTransition {
            from: "active".to_string(),
            to: "pending".to_string(),
        }
        .into();
        assert!(matches!(err, BookingError::IllegalTransition { .. }));
    }
}
