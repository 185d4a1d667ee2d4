use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{AppError, Result};
use crate::services::expiry_warner::MAX_DAYS_AHEAD;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub firebase: FirebaseConfig,
    pub notifications: NotificationConfig,
    pub schedules: ScheduleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub env: String,
    pub port: u16,
    /// `json` switches log output to JSON lines
    pub log_format: String,
}

/// Which document store implementation to run against
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Firestore,
    Memory,
}

/// Which push dispatcher implementation to use
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PushBackend {
    Fcm,
    Log,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "firestore" => Ok(StoreBackend::Firestore),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(format!("unknown store backend '{}'", other)),
        }
    }
}

impl FromStr for PushBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fcm" => Ok(PushBackend::Fcm),
            "log" => Ok(PushBackend::Log),
            other => Err(format!("unknown push backend '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirebaseConfig {
    pub project_id: String,
    /// Path to the service account JSON key
    pub credentials_path: Option<String>,
    pub database_id: String,
    /// `host:port` of a local Firestore emulator
    pub emulator_host: Option<String>,
    pub store_backend: StoreBackend,
    pub push_backend: PushBackend,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Topic every new job is broadcast to
    pub new_jobs_topic: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Run the interval loops in-process; disable when an external
    /// scheduler posts ticks instead
    pub enabled: bool,
    pub sweep_interval_secs: u64,
    pub sweep_batch_size: usize,
    pub warn_interval_secs: u64,
    pub warn_days_ahead: i64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            new_jobs_topic: "all_users".to_string(),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sweep_interval_secs: 24 * 60 * 60,
            sweep_batch_size: 500,
            warn_interval_secs: 24 * 60 * 60,
            warn_days_ahead: 2,
        }
    }
}

fn var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match var(key) {
        Some(raw) => raw
            .parse()
            .map_err(|e| AppError::Config(format!("{}={}: {}", key, raw, e))),
        None => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let schedule_defaults = ScheduleConfig::default();

        let config = Config {
            app: AppConfig {
                env: var("APP_ENV").unwrap_or_else(|| "development".to_string()),
                port: parse_or("APP_PORT", 8080)?,
                log_format: var("LOG_FORMAT").unwrap_or_else(|| "text".to_string()),
            },
            firebase: FirebaseConfig {
                project_id: var("FIREBASE_PROJECT_ID")
                    .or_else(|| var("GOOGLE_CLOUD_PROJECT"))
                    .unwrap_or_else(|| "demo-job-alerts".to_string()),
                credentials_path: var("GOOGLE_APPLICATION_CREDENTIALS"),
                database_id: var("FIRESTORE_DATABASE_ID")
                    .unwrap_or_else(|| "(default)".to_string()),
                emulator_host: var("FIRESTORE_EMULATOR_HOST"),
                store_backend: parse_or("STORE_BACKEND", StoreBackend::Firestore)?,
                push_backend: parse_or("PUSH_BACKEND", PushBackend::Fcm)?,
            },
            notifications: NotificationConfig {
                new_jobs_topic: var("NEW_JOBS_TOPIC")
                    .unwrap_or(NotificationConfig::default().new_jobs_topic),
            },
            schedules: ScheduleConfig {
                enabled: parse_or("SCHEDULER_ENABLED", schedule_defaults.enabled)?,
                sweep_interval_secs: parse_or(
                    "SWEEP_INTERVAL_SECS",
                    schedule_defaults.sweep_interval_secs,
                )?,
                sweep_batch_size: parse_or("SWEEP_BATCH_SIZE", schedule_defaults.sweep_batch_size)?,
                warn_interval_secs: parse_or(
                    "WARN_INTERVAL_SECS",
                    schedule_defaults.warn_interval_secs,
                )?,
                warn_days_ahead: parse_or("WARN_DAYS_AHEAD", schedule_defaults.warn_days_ahead)?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.schedules.sweep_batch_size == 0 {
            return Err(AppError::Config("SWEEP_BATCH_SIZE must be positive".to_string()));
        }
        if self.schedules.sweep_interval_secs == 0 || self.schedules.warn_interval_secs == 0 {
            return Err(AppError::Config("schedule intervals must be positive".to_string()));
        }
        if !(0..=MAX_DAYS_AHEAD).contains(&self.schedules.warn_days_ahead) {
            return Err(AppError::Config(format!(
                "WARN_DAYS_AHEAD must be between 0 and {}",
                MAX_DAYS_AHEAD
            )));
        }
        if self.notifications.new_jobs_topic.is_empty() {
            return Err(AppError::Config("NEW_JOBS_TOPIC must not be empty".to_string()));
        }
        Ok(())
    }

    /// Config for local runs and tests: in-memory store, log-only push
    pub fn local() -> Self {
        Config {
            app: AppConfig {
                env: "test".to_string(),
                port: 8080,
                log_format: "text".to_string(),
            },
            firebase: FirebaseConfig {
                project_id: "demo-job-alerts".to_string(),
                credentials_path: None,
                database_id: "(default)".to_string(),
                emulator_host: None,
                store_backend: StoreBackend::Memory,
                push_backend: PushBackend::Log,
            },
            notifications: NotificationConfig::default(),
            schedules: ScheduleConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_parsing() {
        assert_eq!("Firestore".parse::<StoreBackend>().unwrap(), StoreBackend::Firestore);
        assert_eq!("memory".parse::<StoreBackend>().unwrap(), StoreBackend::Memory);
        assert!("postgres".parse::<StoreBackend>().is_err());
        assert_eq!("LOG".parse::<PushBackend>().unwrap(), PushBackend::Log);
        assert!("apns".parse::<PushBackend>().is_err());
    }

    #[test]
    fn test_local_config_is_valid() {
        let config = Config::local();
        assert!(config.validate().is_ok());
        assert_eq!(config.notifications.new_jobs_topic, "all_users");
        assert_eq!(config.schedules.sweep_batch_size, 500);
        assert_eq!(config.schedules.warn_days_ahead, 2);
    }

    #[test]
    fn test_validate_rejects_zero_batch() {
        let mut config = Config::local();
        config.schedules.sweep_batch_size = 0;
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_validate_bounds_warn_days_ahead() {
        let mut config = Config::local();
        config.schedules.warn_days_ahead = 100_000_000;
        assert!(matches!(config.validate(), Err(AppError::Config(_))));

        config.schedules.warn_days_ahead = -1;
        assert!(matches!(config.validate(), Err(AppError::Config(_))));

        config.schedules.warn_days_ahead = 365;
        assert!(config.validate().is_ok());
    }
}
