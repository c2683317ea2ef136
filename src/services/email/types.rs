// Shared types for the email service

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EmailError {
    #[error("Failed to send email: {0}")]
    SendError(String),

    #[error("Template rendering error: {0}")]
    TemplateError(String),

    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    #[error("Service unavailable")]
    ServiceUnavailable,

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Generic email message ready for delivery
#[derive(Debug, Clone, Serialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
    pub text: Option<String>,
    pub reply_to: Option<String>,
}

impl EmailMessage {
    pub fn new(from: String, to: Vec<String>, subject: String, html: String) -> Self {
        Self {
            from,
            to,
            subject,
            html,
            text: None,
            reply_to: None,
        }
    }

    pub fn with_text(mut self, text: String) -> Self {
        self.text = Some(text);
        self
    }

    pub fn with_reply_to(mut self, reply_to: String) -> Self {
        self.reply_to = Some(reply_to);
        self
    }
}

/// Trait implemented by all email builders
pub trait EmailBuilder {
    fn build(&self) -> Result<EmailMessage, EmailError>;
}

/// Template data for the verification code email
#[derive(Serialize)]
pub struct VerificationEmailData {
    pub code: String,
    pub user_name: String,
    pub app_name: String,
    pub app_url: String,
    pub support_email: String,
    pub expiry_minutes: u32,
}

/// Template data for the password reset email
#[derive(Serialize)]
pub struct PasswordResetEmailData {
    pub reset_url: String,
    pub user_name: String,
    pub app_name: String,
    pub support_email: String,
    pub expiry_minutes: u32,
}

/// Template data for the contract decision email (approved/rejected)
#[derive(Serialize)]
pub struct ContractDecisionEmailData {
    pub user_name: String,
    pub restaurant_name: String,
    pub approved: bool,
    pub reason: Option<String>,
    pub app_name: String,
    pub app_url: String,
    pub support_email: String,
}

/// Template data for the booking confirmation email
#[derive(Serialize)]
pub struct BookingConfirmationEmailData {
    pub user_name: String,
    pub restaurant_name: String,
    pub table_title: String,
    pub starts_at: String,
    pub seats: i32,
    pub app_name: String,
    pub app_url: String,
}

/// Template data for the contact-form relay email
#[derive(Serialize)]
pub struct ContactRelayEmailData {
    pub sender_name: String,
    pub sender_email: String,
    pub subject: String,
    pub message: String,
    pub app_name: String,
}

/// Payload for the Resend HTTP API. Optional fields are omitted from
/// the JSON body when unset.
#[derive(Debug, Serialize)]
pub struct ResendEmailPayload {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
}

impl From<EmailMessage> for ResendEmailPayload {
    fn from(message: EmailMessage) -> Self {
        Self {
            from: message.from,
            to: message.to,
            subject: message.subject,
            html: message.html,
            text: message.text,
            reply_to: message.reply_to,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resend_payload_omits_unset_fields() {
        let message = EmailMessage::new(
            "Contact Tables <no-reply@contact-tables.app>".to_string(),
            vec!["guest@example.com".to_string()],
            "Subject".to_string(),
            "<p>Hello</p>".to_string(),
        );

        let payload: ResendEmailPayload = message.into();
        let json = serde_json::to_value(&payload).expect("Should serialize");
        let obj = json.as_object().expect("Should be object");

        assert!(!obj.contains_key("text"));
        assert!(!obj.contains_key("reply_to"));
    }

    #[test]
    fn test_builder_helpers() {
        let message = EmailMessage::new(
            "from@example.com".to_string(),
            vec!["to@example.com".to_string()],
            "Subject".to_string(),
            "<p>Body</p>".to_string(),
        )
        .with_text("Body".to_string())
        .with_reply_to("reply@example.com".to_string());

        assert_eq!(message.text.as_deref(), Some("Body"));
        assert_eq!(message.reply_to.as_deref(), Some("reply@example.com"));
    }
}
