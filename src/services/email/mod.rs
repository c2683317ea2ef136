// Email service - coordinates builders and the Resend sender

pub mod builders;
pub mod sender;
pub mod types;

use self::types::EmailBuilder;
use crate::app_config::EmailConfig;
use anyhow::Result;
use builders::{
    BookingConfirmationEmailBuilder, ContactRelayEmailBuilder, ContractDecisionEmailBuilder,
    PasswordResetEmailBuilder, VerificationEmailBuilder,
};
use handlebars::Handlebars;
use sender::EmailSender;
use std::sync::Arc;
use tracing::{info, instrument};

pub use types::{EmailError, EmailMessage};

#[derive(Clone)]
pub struct EmailService {
    sender: EmailSender,
    config: EmailConfig,
    frontend_url: String,
    templates: Arc<Handlebars<'static>>,
}

impl EmailService {
    pub fn new(config: EmailConfig, frontend_url: String) -> Result<Self> {
        let mut templates = Handlebars::new();
        Self::register_templates(&mut templates)?;

        let sender = EmailSender::new(config.api_key.clone(), config.api_url.clone())
            .with_max_retries(3)
            .with_retry_delay(std::time::Duration::from_secs(1));

        Ok(Self {
            sender,
            config,
            frontend_url,
            templates: Arc::new(templates),
        })
    }

    fn register_templates(templates: &mut Handlebars) -> Result<(), EmailError> {
        let entries = [
            (
                "verification",
                include_str!("../../templates/email/verification.html"),
            ),
            (
                "password_reset",
                include_str!("../../templates/email/password_reset.html"),
            ),
            (
                "contract_decision",
                include_str!("../../templates/email/contract_decision.html"),
            ),
            (
                "booking_confirmation",
                include_str!("../../templates/email/booking_confirmation.html"),
            ),
            (
                "contact_relay",
                include_str!("../../templates/email/contact_relay.html"),
            ),
        ];

        for (name, source) in entries {
            templates
                .register_template_string(name, source)
                .map_err(|e| EmailError::TemplateError(e.to_string()))?;
        }

        Ok(())
    }

    /// Deliver a built message, or log it when sending is disabled
    /// (development and test environments)
    async fn deliver(&self, message: EmailMessage) -> Result<(), EmailError> {
        if !self.config.send_emails {
            info!(
                to = ?message.to,
                subject = %message.subject,
                "Email sending disabled; skipping delivery"
            );
            return Ok(());
        }

        self.sender.send(message).await
    }

    #[instrument(skip(self, code))]
    pub async fn send_verification_email(
        &self,
        to_email: &str,
        user_name: &str,
        code: &str,
        expiry_minutes: u32,
    ) -> Result<(), EmailError> {
        let message = VerificationEmailBuilder {
            to_email,
            user_name,
            code,
            expiry_minutes,
            config: &self.config,
            frontend_url: &self.frontend_url,
            templates: &self.templates,
        }
        .build()?;

        self.deliver(message).await
    }

    #[instrument(skip(self, reset_token))]
    pub async fn send_password_reset_email(
        &self,
        to_email: &str,
        user_name: &str,
        reset_token: &str,
        expiry_minutes: u32,
    ) -> Result<(), EmailError> {
        let message = PasswordResetEmailBuilder {
            to_email,
            user_name,
            reset_token,
            expiry_minutes,
            config: &self.config,
            frontend_url: &self.frontend_url,
            templates: &self.templates,
        }
        .build()?;

        self.deliver(message).await
    }

    #[instrument(skip(self))]
    pub async fn send_contract_decision_email(
        &self,
        to_email: &str,
        user_name: &str,
        restaurant_name: &str,
        approved: bool,
        reason: Option<&str>,
    ) -> Result<(), EmailError> {
        let message = ContractDecisionEmailBuilder {
            to_email,
            user_name,
            restaurant_name,
            approved,
            reason,
            config: &self.config,
            frontend_url: &self.frontend_url,
            templates: &self.templates,
        }
        .build()?;

        self.deliver(message).await
    }

    #[instrument(skip(self))]
    pub async fn send_booking_confirmation_email(
        &self,
        to_email: &str,
        user_name: &str,
        restaurant_name: &str,
        table_title: &str,
        starts_at: &str,
        seats: i32,
    ) -> Result<(), EmailError> {
        let message = BookingConfirmationEmailBuilder {
            to_email,
            user_name,
            restaurant_name,
            table_title,
            starts_at,
            seats,
            config: &self.config,
            frontend_url: &self.frontend_url,
            templates: &self.templates,
        }
        .build()?;

        self.deliver(message).await
    }

    #[instrument(skip(self, message))]
    pub async fn send_contact_relay_email(
        &self,
        sender_name: &str,
        sender_email: &str,
        subject: &str,
        message: &str,
    ) -> Result<(), EmailError> {
        let email = ContactRelayEmailBuilder {
            sender_name,
            sender_email,
            subject,
            message,
            config: &self.config,
            templates: &self.templates,
        }
        .build()?;

        self.deliver(email).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> EmailConfig {
        EmailConfig {
            api_key: "test-key".to_string(),
            api_url: "https://api.resend.com/emails".to_string(),
            from_email: "no-reply@contact-tables.app".to_string(),
            from_name: "Contact Tables".to_string(),
            support_email: "support@contact-tables.app".to_string(),
            send_emails: false,
        }
    }

    fn test_service() -> EmailService {
        EmailService::new(test_config(), "http://localhost:3000".to_string())
            .expect("Should build email service")
    }

    #[test]
    fn test_templates_register() {
        // Construction fails if any embedded template is malformed
        let _ = test_service();
    }

    #[test]
    fn test_verification_email_contains_code() {
        let service = test_service();
        let message = VerificationEmailBuilder {
            to_email: "guest@example.com",
            user_name: "Marta",
            code: "123456",
            expiry_minutes: 30,
            config: &service.config,
            frontend_url: &service.frontend_url,
            templates: &service.templates,
        }
        .build()
        .expect("Should build");

        assert!(message.html.contains("123456"));
        assert!(message.text.unwrap().contains("123456"));
        assert_eq!(message.to, vec!["guest@example.com".to_string()]);
    }

    #[test]
    fn test_password_reset_email_contains_link() {
        let service = test_service();
        let message = PasswordResetEmailBuilder {
            to_email: "guest@example.com",
            user_name: "Marta",
            reset_token: "tok-abc",
            expiry_minutes: 60,
            config: &service.config,
            frontend_url: &service.frontend_url,
            templates: &service.templates,
        }
        .build()
        .expect("Should build");

        assert!(message
            .html
            .contains("http://localhost:3000/reset-password?token=tok-abc"));
    }

    #[test]
    fn test_contact_relay_targets_support_inbox() {
        let service = test_service();
        let message = ContactRelayEmailBuilder {
            sender_name: "Guest",
            sender_email: "guest@example.com",
            subject: "Question about tables",
            message: "How do I book?",
            config: &service.config,
            templates: &service.templates,
        }
        .build()
        .expect("Should build");

        assert_eq!(message.to, vec!["support@contact-tables.app".to_string()]);
        assert_eq!(message.reply_to.as_deref(), Some("guest@example.com"));
    }

    #[tokio::test]
    async fn test_delivery_skipped_when_disabled() {
        let service = test_service();
        // send_emails=false: no network call is made
        service
            .send_verification_email("guest@example.com", "Marta", "123456", 30)
            .await
            .expect("Should skip delivery without error");
    }
}
