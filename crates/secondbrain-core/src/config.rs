use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

fn default_confidence_threshold() -> u8 {
    80
}
fn default_morning_briefing_hour() -> u8 {
    7
}
fn default_data_dir() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.second-brain", home)
}
fn default_user_timezone() -> String {
    "UTC".to_string()
}
fn default_heartbeat_interval_s() -> u64 {
    300
}
fn default_sentry_environment() -> String {
    "production".to_string()
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.second-brain/secondbrain.db", home)
}

/// Top-level config: `~/.second-brain/config.toml` + `SECONDBRAIN_*` env
/// overrides, with a field set grounded on the original `Settings` class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecondBrainConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub channels: ChannelsConfig,
    #[serde(default)]
    pub knowledge_base: KnowledgeBaseConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub google: GoogleConfig,
    #[serde(default)]
    pub personalization: PersonalizationConfig,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

impl Default for SecondBrainConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            channels: ChannelsConfig::default(),
            knowledge_base: KnowledgeBaseConfig::default(),
            providers: ProvidersConfig::default(),
            google: GoogleConfig::default(),
            personalization: PersonalizationConfig::default(),
            monitoring: MonitoringConfig::default(),
        }
    }
}

impl SecondBrainConfig {
    /// Load config from a TOML file with `SECONDBRAIN_*` env var overrides.
    ///
    /// Checks in order: explicit path argument, then
    /// `~/.second-brain/config.toml`.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: SecondBrainConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("SECONDBRAIN_").split("_"))
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;

        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.second-brain/config.toml", home)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChannelsConfig {
    pub telegram: Option<TelegramConfig>,
    pub whatsapp: Option<WhatsappConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: String,
}

/// WhatsApp Business Cloud API credentials (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatsappConfig {
    pub phone_number_id: String,
    pub access_token: String,
    pub verify_token: String,
    pub app_secret: String,
}

/// Knowledge-base routing: one db-id per table, plus the shared API key
/// (spec §6: "kb_api_key + one db-id per table").
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct KnowledgeBaseConfig {
    pub api_key: Option<String>,
    pub tasks_db_id: Option<String>,
    pub people_db_id: Option<String>,
    pub places_db_id: Option<String>,
    pub projects_db_id: Option<String>,
    pub inbox_db_id: Option<String>,
    pub patterns_db_id: Option<String>,
    pub log_db_id: Option<String>,
    pub emails_db_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProvidersConfig {
    pub speech_to_text_api_key: Option<String>,
    pub llm_api_key: Option<String>,
}

/// Google productivity integrations (calendar + drive + maps).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GoogleConfig {
    pub calendar_client_id: Option<String>,
    pub calendar_client_secret: Option<String>,
    pub maps_api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonalizationConfig {
    #[serde(default = "default_user_timezone")]
    pub user_timezone: String,
    pub user_home_address: Option<String>,
    pub user_transport_chat_id: Option<String>,
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: u8,
    #[serde(default = "default_morning_briefing_hour")]
    pub morning_briefing_hour: u8,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

impl Default for PersonalizationConfig {
    fn default() -> Self {
        Self {
            user_timezone: default_user_timezone(),
            user_home_address: None,
            user_transport_chat_id: None,
            confidence_threshold: default_confidence_threshold(),
            morning_briefing_hour: default_morning_briefing_hour(),
            data_dir: default_data_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub heartbeat_url: Option<String>,
    #[serde(default = "default_heartbeat_interval_s")]
    pub heartbeat_interval_s: u64,
    pub error_tracking_dsn: Option<String>,
    #[serde(default = "default_sentry_environment")]
    pub error_tracking_environment: String,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            heartbeat_url: None,
            heartbeat_interval_s: default_heartbeat_interval_s(),
            error_tracking_dsn: None,
            error_tracking_environment: default_sentry_environment(),
        }
    }
}
