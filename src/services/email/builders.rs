// Builders for the individual email types

use super::types::{
    BookingConfirmationEmailData, ContactRelayEmailData, ContractDecisionEmailData, EmailBuilder,
    EmailError, EmailMessage, PasswordResetEmailData, VerificationEmailData,
};
use crate::app_config::EmailConfig;
use handlebars::Handlebars;
use tracing::instrument;

/// Verification code email
pub struct VerificationEmailBuilder<'a> {
    pub to_email: &'a str,
    pub user_name: &'a str,
    pub code: &'a str,
    pub expiry_minutes: u32,
    pub config: &'a EmailConfig,
    pub frontend_url: &'a str,
    pub templates: &'a Handlebars<'a>,
}

impl<'a> EmailBuilder for VerificationEmailBuilder<'a> {
    #[instrument(skip(self))]
    fn build(&self) -> Result<EmailMessage, EmailError> {
        let data = VerificationEmailData {
            code: self.code.to_string(),
            user_name: self.user_name.to_string(),
            app_name: self.config.from_name.clone(),
            app_url: self.frontend_url.to_string(),
            support_email: self.config.support_email.clone(),
            expiry_minutes: self.expiry_minutes,
        };

        let html = self
            .templates
            .render("verification", &data)
            .map_err(|e| EmailError::TemplateError(e.to_string()))?;

        let text = format!(
            "Hi {},\n\n\
            Your verification code is: {}\n\n\
            This code will expire in {} minutes.\n\n\
            If you didn't request this code, please ignore this email.\n\n\
            Best regards,\n\
            The {} Team",
            self.user_name, self.code, self.expiry_minutes, self.config.from_name
        );

        Ok(EmailMessage::new(
            format!("{} <{}>", self.config.from_name, self.config.from_email),
            vec![self.to_email.to_string()],
            format!("Your {} verification code", self.config.from_name),
            html,
        )
        .with_text(text))
    }
}

/// Password reset email with a tokenized link
pub struct PasswordResetEmailBuilder<'a> {
    pub to_email: &'a str,
    pub user_name: &'a str,
    pub reset_token: &'a str,
    pub expiry_minutes: u32,
    pub config: &'a EmailConfig,
    pub frontend_url: &'a str,
    pub templates: &'a Handlebars<'a>,
}

impl<'a> EmailBuilder for PasswordResetEmailBuilder<'a> {
    #[instrument(skip(self))]
    fn build(&self) -> Result<EmailMessage, EmailError> {
        let reset_url = format!(
            "{}/reset-password?token={}",
            self.frontend_url.trim_end_matches('/'),
            self.reset_token
        );

        let data = PasswordResetEmailData {
            reset_url: reset_url.clone(),
            user_name: self.user_name.to_string(),
            app_name: self.config.from_name.clone(),
            support_email: self.config.support_email.clone(),
            expiry_minutes: self.expiry_minutes,
        };

        let html = self
            .templates
            .render("password_reset", &data)
            .map_err(|e| EmailError::TemplateError(e.to_string()))?;

        let text = format!(
            "Hi {},\n\n\
            We received a request to reset your password.\n\n\
            Reset it here: {}\n\n\
            The link expires in {} minutes. If you didn't request a reset,\n\
            you can safely ignore this email.\n\n\
            Best regards,\n\
            The {} Team",
            self.user_name, reset_url, self.expiry_minutes, self.config.from_name
        );

        Ok(EmailMessage::new(
            format!("{} <{}>", self.config.from_name, self.config.from_email),
            vec![self.to_email.to_string()],
            format!("Reset your {} password", self.config.from_name),
            html,
        )
        .with_text(text))
    }
}

/// Contract decision email (approval or rejection)
pub struct ContractDecisionEmailBuilder<'a> {
    pub to_email: &'a str,
    pub user_name: &'a str,
    pub restaurant_name: &'a str,
    pub approved: bool,
    pub reason: Option<&'a str>,
    pub config: &'a EmailConfig,
    pub frontend_url: &'a str,
    pub templates: &'a Handlebars<'a>,
}

impl<'a> EmailBuilder for ContractDecisionEmailBuilder<'a> {
    #[instrument(skip(self))]
    fn build(&self) -> Result<EmailMessage, EmailError> {
        let data = ContractDecisionEmailData {
            user_name: self.user_name.to_string(),
            restaurant_name: self.restaurant_name.to_string(),
            approved: self.approved,
            reason: self.reason.map(String::from),
            app_name: self.config.from_name.clone(),
            app_url: self.frontend_url.to_string(),
            support_email: self.config.support_email.clone(),
        };

        let html = self
            .templates
            .render("contract_decision", &data)
            .map_err(|e| EmailError::TemplateError(e.to_string()))?;

        let subject = if self.approved {
            format!("{} has been approved", self.restaurant_name)
        } else {
            format!("Update on your {} application", self.config.from_name)
        };

        Ok(EmailMessage::new(
            format!("{} <{}>", self.config.from_name, self.config.from_email),
            vec![self.to_email.to_string()],
            subject,
            html,
        ))
    }
}

/// Booking confirmation email for guests joining a contact table
pub struct BookingConfirmationEmailBuilder<'a> {
    pub to_email: &'a str,
    pub user_name: &'a str,
    pub restaurant_name: &'a str,
    pub table_title: &'a str,
    pub starts_at: &'a str,
    pub seats: i32,
    pub config: &'a EmailConfig,
    pub frontend_url: &'a str,
    pub templates: &'a Handlebars<'a>,
}

impl<'a> EmailBuilder for BookingConfirmationEmailBuilder<'a> {
    #[instrument(skip(self))]
    fn build(&self) -> Result<EmailMessage, EmailError> {
        let data = BookingConfirmationEmailData {
            user_name: self.user_name.to_string(),
            restaurant_name: self.restaurant_name.to_string(),
            table_title: self.table_title.to_string(),
            starts_at: self.starts_at.to_string(),
            seats: self.seats,
            app_name: self.config.from_name.clone(),
            app_url: self.frontend_url.to_string(),
        };

        let html = self
            .templates
            .render("booking_confirmation", &data)
            .map_err(|e| EmailError::TemplateError(e.to_string()))?;

        Ok(EmailMessage::new(
            format!("{} <{}>", self.config.from_name, self.config.from_email),
            vec![self.to_email.to_string()],
            format!("You're in! Table at {}", self.restaurant_name),
            html,
        ))
    }
}

/// Relay of a contact-form message to the support inbox
pub struct ContactRelayEmailBuilder<'a> {
    pub sender_name: &'a str,
    pub sender_email: &'a str,
    pub subject: &'a str,
    pub message: &'a str,
    pub config: &'a EmailConfig,
    pub templates: &'a Handlebars<'a>,
}

impl<'a> EmailBuilder for ContactRelayEmailBuilder<'a> {
    #[instrument(skip(self))]
    fn build(&self) -> Result<EmailMessage, EmailError> {
        let data = ContactRelayEmailData {
            sender_name: self.sender_name.to_string(),
            sender_email: self.sender_email.to_string(),
            subject: self.subject.to_string(),
            message: self.message.to_string(),
            app_name: self.config.from_name.clone(),
        };

        let html = self
            .templates
            .render("contact_relay", &data)
            .map_err(|e| EmailError::TemplateError(e.to_string()))?;

        Ok(EmailMessage::new(
            format!("{} <{}>", self.config.from_name, self.config.from_email),
            vec![self.config.support_email.clone()],
            format!("[Contact form] {}", self.subject),
            html,
        )
        .with_reply_to(self.sender_email.to_string()))
    }
}
