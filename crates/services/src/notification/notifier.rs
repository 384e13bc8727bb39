use async_trait::async_trait;
use creatorhub_config::NotificationSettings;
use creatorhub_db::models::{NotificationEntry, NotificationKind, User};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("No contact channel for user")]
    NoChannel,
}

/// Email/SMS delivery collaborator. Fire-and-forget from the caller's view.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, user: &User, entry: &NotificationEntry) -> Result<(), NotifyError>;
}

/// Writes deliveries to the log only.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn deliver(&self, user: &User, entry: &NotificationEntry) -> Result<(), NotifyError> {
        info!(
            user_id = ?user.id,
            kind = ?entry.kind,
            title = %entry.title,
            "Notification delivered (log only)"
        );
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    user_id: String,
    email: Option<&'a str>,
    phone: Option<&'a str>,
    title: &'a str,
    body: Option<&'a str>,
    link: Option<&'a str>,
    kind: NotificationKind,
}

/// Posts alerts to an email/SMS bridge.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
    email_enabled: bool,
    sms_enabled: bool,
}

impl WebhookNotifier {
    pub fn new(url: String, email_enabled: bool, sms_enabled: bool) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            email_enabled,
            sms_enabled,
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn deliver(&self, user: &User, entry: &NotificationEntry) -> Result<(), NotifyError> {
        let email = user.email.as_deref().filter(|_| self.email_enabled);
        let phone = user.phone.as_deref().filter(|_| self.sms_enabled);
        if email.is_none() && phone.is_none() {
            return Err(NotifyError::NoChannel);
        }

        let payload = WebhookPayload {
            user_id: user.id.to_hex(),
            email,
            phone,
            title: &entry.title,
            body: entry.body.as_deref(),
            link: entry.link.as_deref(),
            kind: entry.kind,
        };

        self.client
            .post(&self.url)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

pub fn from_settings(settings: &NotificationSettings) -> Arc<dyn Notifier> {
    match &settings.webhook_url {
        Some(url) if !url.is_empty() => Arc::new(WebhookNotifier::new(
            url.clone(),
            settings.email_enabled,
            settings.sms_enabled,
        )),
        _ => Arc::new(LogNotifier),
    }
}
