// Email delivery through the Resend HTTP API

use super::types::{EmailError, EmailMessage, ResendEmailPayload};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

#[derive(Clone)]
pub struct EmailSender {
    client: Arc<Client>,
    api_key: String,
    api_url: String,
    max_retries: u32,
    retry_delay: Duration,
}

impl EmailSender {
    pub fn new(api_key: String, api_url: String) -> Self {
        Self {
            client: Arc::new(Client::new()),
            api_key,
            api_url,
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Send an email, retrying transient failures (5xx, network errors).
    /// 4xx responses are permanent and returned immediately.
    #[instrument(skip(self, message), fields(to = ?message.to, subject = %message.subject))]
    pub async fn send(&self, message: EmailMessage) -> Result<(), EmailError> {
        let payload: ResendEmailPayload = message.into();

        let mut attempt = 0;
        loop {
            attempt += 1;

            let response = self
                .client
                .post(&self.api_url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .json(&payload)
                .send()
                .await;

            match response {
                Ok(res) if res.status().is_success() => {
                    info!("Email sent successfully");
                    return Ok(());
                },
                Ok(res) if res.status().is_client_error() => {
                    let status = res.status();
                    let body = res
                        .text()
                        .await
                        .unwrap_or_else(|_| "Unknown error".to_string());
                    return Err(EmailError::SendError(format!(
                        "Email API rejected request ({}): {}",
                        status, body
                    )));
                },
                Ok(res) => {
                    let status = res.status();
                    if attempt > self.max_retries {
                        return Err(EmailError::SendError(format!(
                            "Email API error after {} attempts ({})",
                            attempt, status
                        )));
                    }
                    warn!("Email API returned {}, retrying (attempt {})", status, attempt);
                },
                Err(e) => {
                    if attempt > self.max_retries {
                        return Err(EmailError::SendError(format!(
                            "Email request failed after {} attempts: {}",
                            attempt, e
                        )));
                    }
                    warn!("Email request failed ({}), retrying (attempt {})", e, attempt);
                },
            }

            tokio::time::sleep(self.retry_delay * attempt).await;
        }
    }
}
