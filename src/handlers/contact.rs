// Public contact form handler

use axum::{
    extract::{ConnectInfo, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use validator::Validate;

use crate::{
    app::AppState,
    models::contact_message::{ContactMessage, MessageStatus, NewContactMessage},
    utils::booking_errors::BookingError,
};

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct ContactFormRequest {
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,

    #[validate(email(message = "Invalid email format"))]
    #[validate(length(max = 320, message = "Email must be less than 320 characters"))]
    pub email: String,

    #[validate(length(min = 1, max = 255, message = "Subject is required"))]
    pub subject: String,

    #[validate(length(min = 10, max = 5000, message = "Message must be 10 to 5000 characters"))]
    pub message: String,
}

/// POST /api/v1/contact - Store the message and relay it to support
pub async fn submit_contact_form(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(request): Json<ContactFormRequest>,
) -> impl IntoResponse {
    if let Err(e) = request.validate() {
        return BookingError::from(e).into_response();
    }

    // Rate limited per IP; the endpoint is unauthenticated
    let config = crate::app_config::config();
    if config.features.enable_rate_limiting {
        let rate_key = format!("contact:{}", addr.ip());
        let rate_config = crate::services::rate_limit::RateLimitConfig {
            max_requests: config.security.contact_rate_limit_per_ip,
            window_seconds: 3600,
            burst_limit: None,
            block_duration: 3600,
            distributed: true,
        };

        match state
            .rate_limit_service
            .check_rate_limit_with_config(&rate_key, &rate_config)
            .await
        {
            Ok(status) if !status.allowed => {
                return BookingError::RateLimitExceeded {
                    retry_after: status.retry_after.unwrap_or(3600) as u64,
                }
                .into_response();
            },
            Err(e) => {
                tracing::warn!("Rate limit check failed for contact form: {}", e);
            },
            _ => {},
        }
    }

    let mut conn = match state.diesel_pool.get().await {
        Ok(conn) => conn,
        Err(e) => return BookingError::DatabaseError(e.to_string()).into_response(),
    };

    let message = match ContactMessage::create(
        &mut conn,
        NewContactMessage {
            name: request.name.trim().to_string(),
            email: request.email.trim().to_lowercase(),
            subject: request.subject.trim().to_string(),
            message: request.message.trim().to_string(),
            status: MessageStatus::New.as_str().to_string(),
        },
    )
    .await
    {
        Ok(message) => message,
        Err(e) => return BookingError::DatabaseError(e.to_string()).into_response(),
    };
    drop(conn);

    // The inbox row is persisted; the relay email is best effort
    if let Err(e) = state
        .email_service
        .send_contact_relay_email(
            &message.name,
            &message.email,
            &message.subject,
            &message.message,
        )
        .await
    {
        tracing::warn!("Failed to relay contact message: {}", e);
    }

    tracing::info!(message_id = %message.id, "Contact form message received");

    (
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Thanks! We'll get back to you soon."
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contact_form_validation() {
        let valid = ContactFormRequest {
            name: "Marta".to_string(),
            email: "marta@example.com".to_string(),
            subject: "Booking question".to_string(),
            message: "How far in advance can I book a table?".to_string(),
        };
        assert!(valid.validate().is_ok());

        let bad_email = ContactFormRequest {
            email: "not-an-email".to_string(),
            ..valid_request()
        };
        assert!(bad_email.validate().is_err());

        let short_message = ContactFormRequest {
            message: "Hi".to_string(),
            ..valid_request()
        };
        assert!(short_message.validate().is_err());
    }

    fn valid_request() -> ContactFormRequest {
        ContactFormRequest {
            name: "Marta".to_string(),
            email: "marta@example.com".to_string(),
            subject: "Booking question".to_string(),
            message: "How far in advance can I book a table?".to_string(),
        }
    }
}
