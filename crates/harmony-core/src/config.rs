use std::{
    env,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use config as cfg;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    #[serde(default = "SmtpConfig::default_host")]
    pub host: String,
    #[serde(default = "SmtpConfig::default_port")]
    pub port: u16,
    #[serde(default)]
    pub user: String,
    #[serde(default, skip_serializing)]
    pub password: Option<SecretString>,
    /// Sender address; falls back to `user` when empty.
    #[serde(default)]
    pub from: String,
    #[serde(default = "SmtpConfig::default_from_name")]
    pub from_name: String,
    /// Upper bound for a single send, connection included.
    #[serde(default = "SmtpConfig::default_timeout_secs")]
    pub timeout_secs: u64,
}

impl SmtpConfig {
    fn default_host() -> String {
        "smtp.gmail.com".to_string()
    }

    fn default_port() -> u16 {
        587
    }

    fn default_from_name() -> String {
        "Mellon Harmony".to_string()
    }

    fn default_timeout_secs() -> u64 {
        30
    }

    /// Sending is only attempted with both a user and a password.
    pub fn is_configured(&self) -> bool {
        !self.user.is_empty() && self.password.is_some()
    }

    pub fn sender_address(&self) -> &str {
        if self.from.is_empty() {
            &self.user
        } else {
            &self.from
        }
    }
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            user: String::new(),
            password: None,
            from: String::new(),
            from_name: Self::default_from_name(),
            timeout_secs: Self::default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// Deliveries run one after another on the publishing task.
    Sequential,
    /// One background task per delivery, bounded by `max_in_flight`.
    Concurrent,
}

impl Default for DispatchMode {
    fn default() -> Self {
        Self::Concurrent
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    #[serde(default)]
    pub mode: DispatchMode,
    #[serde(default = "DispatchConfig::default_max_in_flight")]
    pub max_in_flight: usize,
}

impl DispatchConfig {
    fn default_max_in_flight() -> usize {
        64
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            mode: DispatchMode::default(),
            max_in_flight: Self::default_max_in_flight(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "Settings::default_env")]
    pub env: String,
    /// Base URL used for links inside emails.
    #[serde(default)]
    pub frontend_url: String,
    #[serde(default)]
    pub smtp: SmtpConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            env: Self::default_env(),
            frontend_url: String::new(),
            smtp: SmtpConfig::default(),
            dispatch: DispatchConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Settings {
    fn default_env() -> String {
        env::var("HARMONY_ENV")
            .ok()
            .or_else(|| env::var("ENVIRONMENT").ok())
            .unwrap_or_else(|| "development".to_string())
    }

    pub fn is_production(&self) -> bool {
        self.env == "production"
    }

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            !self.smtp.host.trim().is_empty(),
            "smtp.host cannot be empty"
        );
        anyhow::ensure!(self.smtp.port > 0, "smtp.port must be > 0");
        anyhow::ensure!(self.smtp.timeout_secs > 0, "smtp.timeout_secs must be > 0");
        anyhow::ensure!(
            (1..=10_000).contains(&self.dispatch.max_in_flight),
            "dispatch.max_in_flight must be 1..=10000"
        );
        if self.is_production() {
            anyhow::ensure!(
                !self.frontend_url.trim().is_empty(),
                "frontend_url must be set in production"
            );
        }
        Ok(())
    }
}

pub struct ConfigManager;

impl ConfigManager {
    /// Load and validate settings for `env_override` (or the ambient environment name).
    pub fn load(config_dir: Option<PathBuf>, env_override: Option<String>) -> Result<Settings> {
        // A missing .env file is the normal case outside local development.
        let _ = dotenv::dotenv();

        let env_name = env_override.unwrap_or_else(Settings::default_env);
        let config_dir = config_dir.unwrap_or_else(Self::default_config_dir);
        let mut settings = Self::load_from_sources(&config_dir, &env_name)?;
        settings.env = env_name;
        settings.validate()?;
        Ok(settings)
    }

    /// Get the default configuration directory.
    ///
    /// Priority order:
    /// 1. ~/.harmony/
    /// 2. ./config/
    /// 3. Current directory
    pub fn default_config_dir() -> PathBuf {
        if let Some(home_dir) = dirs::home_dir() {
            let harmony_dir = home_dir.join(".harmony");
            if harmony_dir.exists() {
                info!("Using config directory: {:?}", harmony_dir);
                return harmony_dir;
            }
        }

        let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let project_config = cwd.join("config");
        if project_config.exists() {
            info!("Using config directory: {:?}", project_config);
            return project_config;
        }

        info!("Using config directory: {:?}", cwd);
        cwd
    }

    pub fn load_from_sources(config_dir: &Path, env_name: &str) -> Result<Settings> {
        let builder = cfg::Config::builder()
            .add_source(cfg::File::from(config_dir.join("default.toml")).required(false))
            .add_source(cfg::File::from(config_dir.join("default.yaml")).required(false))
            .add_source(cfg::File::from(config_dir.join("default.json")).required(false))
            .add_source(
                cfg::File::from(config_dir.join(format!("{}.toml", env_name))).required(false),
            )
            .add_source(
                cfg::File::from(config_dir.join(format!("{}.yaml", env_name))).required(false),
            )
            .add_source(
                cfg::File::from(config_dir.join(format!("{}.json", env_name))).required(false),
            )
            .add_source(cfg::File::from(config_dir.join("local.toml")).required(false))
            .add_source(
                cfg::Environment::with_prefix("HARMONY")
                    .separator("__")
                    .try_parsing(true),
            );

        let settings: Settings = builder
            .build()
            .context("building configuration")?
            .try_deserialize()
            .context("deserializing configuration")?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_defaults_validate() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.smtp.port, 587);
        assert_eq!(settings.dispatch.mode, DispatchMode::Concurrent);
        assert!(!settings.smtp.is_configured());
    }

    #[test]
    fn test_sender_falls_back_to_user() {
        let mut smtp = SmtpConfig {
            user: "mailer@example.com".into(),
            ..SmtpConfig::default()
        };
        assert_eq!(smtp.sender_address(), "mailer@example.com");
        smtp.from = "noreply@example.com".into();
        assert_eq!(smtp.sender_address(), "noreply@example.com");
    }

    #[test]
    fn test_production_requires_frontend_url() {
        let mut settings = Settings {
            env: "production".into(),
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
        settings.frontend_url = "https://harmony.example.com".into();
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_in_flight() {
        let mut settings = Settings::default();
        settings.dispatch.max_in_flight = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_password_is_never_serialized() {
        let settings = Settings {
            smtp: SmtpConfig {
                user: "u".into(),
                password: Some(SecretString::from("hunter2")),
                ..SmtpConfig::default()
            },
            ..Settings::default()
        };
        assert!(settings.smtp.is_configured());
        assert_eq!(
            settings.smtp.password.as_ref().unwrap().expose_secret(),
            "hunter2"
        );
        let json = serde_json::to_string(&settings).unwrap();
        assert!(!json.contains("hunter2"));
    }
}
