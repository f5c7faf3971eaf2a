// ABOUTME: SMTP mailer implementation over an async lettre transport
// ABOUTME: Builds a pooled TLS relay connection from SmtpConfig and delivers rendered templates
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 ShopVerse

use super::{render_template, Mailer};
use crate::config::environment::SmtpConfig;
use crate::errors::{AppError, AppResult};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde_json::Value;

/// Delivers mail through an authenticated SMTP relay
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl SmtpMailer {
    /// Builds a pooled relay transport from the SMTP configuration
    pub fn new(config: &SmtpConfig) -> AppResult<Self> {
        let creds = Credentials::new(config.username.clone(), config.password.clone());
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
            .map_err(|e| {
                AppError::config(format!("Invalid SMTP relay host {}: {e}", config.host))
            })?
            .port(config.port)
            .credentials(creds)
            .build();

        Ok(Self {
            transport,
            from_address: config.from_address.clone(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, template: &str, data: &Value) -> AppResult<()> {
        let body = render_template(template, data);

        let message = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|e| AppError::config(format!("Invalid sender address: {e}")))?,
            )
            .to(to
                .parse()
                .map_err(|e| AppError::invalid_input(format!("Invalid recipient address: {e}")))?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(body)
            .map_err(|e| AppError::internal(format!("Failed to build email message: {e}")))?;

        self.transport.send(message).await.map_err(|e| {
            tracing::error!(recipient = %to, error = %e, "SMTP delivery failed");
            AppError::external_service("smtp", format!("Failed to send email: {e}"))
        })?;

        tracing::debug!(recipient = %to, subject = %subject, "Email delivered");
        Ok(())
    }
}
