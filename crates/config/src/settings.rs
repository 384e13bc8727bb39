use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub app: AppSettings,
    pub database: DatabaseSettings,
    pub presence: PresenceSettings,
    pub matching: MatchingSettings,
    pub messaging: MessagingSettings,
    pub notifications: NotificationSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSettings {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub name: String,
    pub max_pool_size: Option<u32>,
    pub min_pool_size: Option<u32>,
    /// Bounds how long a call waits before the fallback mirror takes over.
    pub server_selection_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PresenceSettings {
    /// Lifetime of a check-in. There is no renewal call.
    pub checkin_ttl_secs: u64,
    /// Active check-ins at one hub that trigger a density alert.
    pub hub_alert_threshold: usize,
    pub hub_alert_cooldown_secs: u64,
    /// Check-ins without a hub snap to the nearest hub inside this radius.
    pub auto_hub_radius_km: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MatchingSettings {
    pub max_suggestions: usize,
    pub shared_hub_bonus: f64,
    pub shared_skill_weight: f64,
    pub missing_distance_km: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MessagingSettings {
    pub edit_window_secs: u64,
    pub typing_expiry_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NotificationSettings {
    /// Email/SMS bridge. Deliveries are only logged when unset.
    pub webhook_url: Option<String>,
    pub email_enabled: bool,
    pub sms_enabled: bool,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        let config = Self::with_defaults(
            Config::builder()
                .add_source(File::with_name("config/default").required(false))
                .add_source(File::with_name("config/local").required(false))
                .add_source(
                    Environment::default()
                        .separator("__")
                        .prefix("CREATORHUB"),
                ),
        )?
        .build()?;

        config.try_deserialize()
    }

    /// Defaults only: no files, no environment.
    pub fn for_tests() -> Result<Self, ConfigError> {
        Self::with_defaults(Config::builder())?
            .build()?
            .try_deserialize()
    }

    fn with_defaults(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        builder
            .set_default("app.host", "0.0.0.0")?
            .set_default("app.port", 3000)?
            .set_default("app.cors_origins", Vec::<String>::new())?
            .set_default("database.url", "mongodb://localhost:27017")?
            .set_default("database.name", "creatorhub")?
            .set_default("database.server_selection_timeout_ms", 2000)?
            .set_default("presence.checkin_ttl_secs", 4 * 60 * 60)?
            .set_default("presence.hub_alert_threshold", 5)?
            .set_default("presence.hub_alert_cooldown_secs", 15 * 60)?
            .set_default("presence.auto_hub_radius_km", 0.5)?
            .set_default("matching.max_suggestions", 30)?
            .set_default("matching.shared_hub_bonus", 2000.0)?
            .set_default("matching.shared_skill_weight", 100.0)?
            .set_default("matching.missing_distance_km", 5000.0)?
            .set_default("messaging.edit_window_secs", 15 * 60)?
            .set_default("messaging.typing_expiry_secs", 5)?
            .set_default("notifications.webhook_url", None::<String>)?
            .set_default("notifications.email_enabled", true)?
            .set_default("notifications.sms_enabled", false)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::load().expect("Failed to load default settings")
    }
}
