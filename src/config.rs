use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::core::EventCatalog;
use crate::models::{MatchOptions, ScoringWeights};
use crate::services::RetryPolicy;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub matching: MatchingSettings,
    #[serde(default)]
    pub scoring: ScoringSettings,
    #[serde(default)]
    pub dispatch: DispatchSettings,
    #[serde(default)]
    pub mailer: MailerSettings,
    #[serde(default)]
    pub jobs: JobSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub workers: Option<usize>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: None,
        }
    }
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }

/// Keyword -> industry pair for the event catalogue
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogEntry {
    pub keyword: String,
    pub industry: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingSettings {
    #[serde(default)]
    pub case_sensitive_cities: bool,
    #[serde(default = "default_max_builders")]
    pub max_builders_per_lead: usize,
    #[serde(default)]
    pub min_notify_score: f64,
    /// Replaces the built-in trade show catalogue when non-empty
    #[serde(default)]
    pub catalog: Vec<CatalogEntry>,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            case_sensitive_cities: false,
            max_builders_per_lead: default_max_builders(),
            min_notify_score: 0.0,
            catalog: Vec::new(),
        }
    }
}

fn default_max_builders() -> usize { 8 }

impl MatchingSettings {
    pub fn options(&self) -> MatchOptions {
        MatchOptions {
            case_sensitive_cities: self.case_sensitive_cities,
            max_builders_per_lead: self.max_builders_per_lead,
            min_notify_score: self.min_notify_score,
        }
    }

    pub fn event_catalog(&self) -> EventCatalog {
        if self.catalog.is_empty() {
            EventCatalog::builtin()
        } else {
            EventCatalog::new(
                self.catalog
                    .iter()
                    .map(|entry| (entry.keyword.as_str(), entry.industry.as_str())),
            )
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoringSettings {
    #[serde(default)]
    pub weights: WeightsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeightsConfig {
    #[serde(default = "default_base")]
    pub base: f64,
    #[serde(default = "default_specialization")]
    pub specialization: f64,
    #[serde(default = "default_generalist")]
    pub generalist: f64,
    #[serde(default = "default_verified")]
    pub verified: f64,
    #[serde(default = "default_premium")]
    pub premium: f64,
    #[serde(default = "default_rating")]
    pub rating: f64,
    #[serde(default = "default_idle")]
    pub idle: f64,
    #[serde(default = "default_light_load")]
    pub light_load: f64,
    #[serde(default = "default_responsive")]
    pub responsive: f64,
    #[serde(default = "default_budget_close")]
    pub budget_close: f64,
    #[serde(default = "default_budget_near")]
    pub budget_near: f64,
}

impl Default for WeightsConfig {
    fn default() -> Self {
        Self {
            base: default_base(),
            specialization: default_specialization(),
            generalist: default_generalist(),
            verified: default_verified(),
            premium: default_premium(),
            rating: default_rating(),
            idle: default_idle(),
            light_load: default_light_load(),
            responsive: default_responsive(),
            budget_close: default_budget_close(),
            budget_near: default_budget_near(),
        }
    }
}

fn default_base() -> f64 { 50.0 }
fn default_specialization() -> f64 { 20.0 }
fn default_generalist() -> f64 { 10.0 }
fn default_verified() -> f64 { 10.0 }
fn default_premium() -> f64 { 10.0 }
fn default_rating() -> f64 { 5.0 }
fn default_idle() -> f64 { 10.0 }
fn default_light_load() -> f64 { 5.0 }
fn default_responsive() -> f64 { 5.0 }
fn default_budget_close() -> f64 { 10.0 }
fn default_budget_near() -> f64 { 5.0 }

impl From<&WeightsConfig> for ScoringWeights {
    fn from(w: &WeightsConfig) -> Self {
        ScoringWeights {
            base: w.base,
            specialization: w.specialization,
            generalist: w.generalist,
            verified: w.verified,
            premium: w.premium,
            rating: w.rating,
            idle: w.idle,
            light_load: w.light_load,
            responsive: w.responsive,
            budget_close: w.budget_close,
            budget_near: w.budget_near,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DispatchSettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
    /// Base URL used for dashboard links in notifications
    #[serde(default = "default_app_url")]
    pub app_url: String,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
            app_url: default_app_url(),
        }
    }
}

fn default_max_attempts() -> u32 { 3 }
fn default_backoff_ms() -> u64 { 200 }
fn default_app_url() -> String { "http://localhost:3000".to_string() }

impl DispatchSettings {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            backoff: Duration::from_millis(self.backoff_ms),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MailerKind {
    Log,
    Http,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailerSettings {
    #[serde(default = "default_mailer_kind")]
    pub kind: MailerKind,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_from")]
    pub from: String,
    #[serde(default = "default_mailer_timeout")]
    pub timeout_secs: u64,
}

impl Default for MailerSettings {
    fn default() -> Self {
        Self {
            kind: default_mailer_kind(),
            endpoint: String::new(),
            api_key: String::new(),
            from: default_from(),
            timeout_secs: default_mailer_timeout(),
        }
    }
}

fn default_mailer_kind() -> MailerKind { MailerKind::Log }
fn default_from() -> String { "leads@localhost".to_string() }
fn default_mailer_timeout() -> u64 { 10 }

#[derive(Debug, Clone, Deserialize)]
pub struct JobSettings {
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,
    #[serde(default = "default_stale_after_hours")]
    pub stale_after_hours: i64,
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            max_parallel: default_max_parallel(),
            stale_after_hours: default_stale_after_hours(),
        }
    }
}

fn default_max_parallel() -> usize { 4 }
fn default_stale_after_hours() -> i64 { 48 }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml, then config/local.toml)
    /// 3. Environment variables (prefixed with LEADS__)
    pub fn load() -> Result<Self, ConfigError> {
        let mut settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., LEADS__SERVER__PORT -> server.port
            .add_source(
                Environment::with_prefix("LEADS")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings = substitute_env_vars(settings)?;

        settings.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("LEADS")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }
}

/// Apply the conventional deployment variables on top of the layered config
///
/// `APP_URL`, `FROM_EMAIL` and `MAILER_API_KEY` win over file values so
/// secrets never have to live in config files.
fn substitute_env_vars(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let overrides = [
        ("APP_URL", "dispatch.app_url"),
        ("FROM_EMAIL", "mailer.from"),
        ("MAILER_API_KEY", "mailer.api_key"),
    ];

    let mut builder = Config::builder().add_source(settings);
    for (var, key) in overrides {
        if let Ok(value) = env::var(var) {
            builder = builder.set_override(key, value)?;
        }
    }

    builder.build()
}
