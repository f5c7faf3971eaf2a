// ABOUTME: Outbound email abstraction with templated HTML bodies
// ABOUTME: Provides the Mailer trait, template rendering, and a recording stub for tests
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 ShopVerse

pub mod smtp;

use crate::errors::AppResult;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

pub use smtp::SmtpMailer;

/// Shared reference to any mailer implementation
pub type SharedMailer = Arc<dyn Mailer>;

/// Sends templated HTML email
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Renders `template` with `data` and delivers the result to `to`
    async fn send(&self, to: &str, subject: &str, template: &str, data: &Value) -> AppResult<()>;
}

/// Replaces `{{key}}` placeholders in a template with string values from `data`
#[must_use]
pub fn render_template(template: &str, data: &Value) -> String {
    let mut body = template.to_owned();
    if let Some(map) = data.as_object() {
        for (key, value) in map {
            let placeholder = format!("{{{{{key}}}}}");
            body = body.replace(&placeholder, value.as_str().unwrap_or_default());
        }
    }
    body
}

/// Built-in email templates
pub mod templates {
    /// OTP delivery email, expects `name` and `code`
    pub const OTP_CODE: &str = "<html><body>\
<p>Hi {{name}},</p>\
<p>Your ShopVerse verification code is:</p>\
<h2>{{code}}</h2>\
<p>This code expires in {{ttl_minutes}} minutes. If you did not request it, you can ignore this email.</p>\
</body></html>";
}

/// Captures sent mail in memory instead of delivering it
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: std::sync::Mutex<Vec<RecordedMail>>,
}

/// One message captured by [`RecordingMailer`]
#[derive(Debug, Clone)]
pub struct RecordedMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl RecordingMailer {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Returns all captured messages in send order
    pub fn sent(&self) -> Vec<RecordedMail> {
        self.sent.lock().map(|guard| guard.clone()).unwrap_or_default()
    }

    /// Returns the most recently captured message
    pub fn last(&self) -> Option<RecordedMail> {
        self.sent().pop()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to: &str, subject: &str, template: &str, data: &Value) -> AppResult<()> {
        let body = render_template(template, data);
        if let Ok(mut guard) = self.sent.lock() {
            guard.push(RecordedMail {
                to: to.to_owned(),
                subject: subject.to_owned(),
                body,
            });
        }
        Ok(())
    }
}
