use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub telegram: TelegramConfig,
    pub reminder: ReminderConfig,
    #[serde(default)]
    pub health: HealthConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    /// Left empty when the token comes from the `BOT_TOKEN` environment variable.
    #[serde(default)]
    pub bot_token: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReminderConfig {
    /// Chat that receives the alerts. Never monitored itself.
    pub alert_chat_id: i64,
    #[serde(default = "default_reply_timeout_secs")]
    pub reply_timeout_secs: u64,
    #[serde(default)]
    pub privileged_user_ids: Vec<u64>,
    /// Matched case-insensitively, with or without the leading '@'.
    #[serde(default)]
    pub privileged_usernames: Vec<String>,
    #[serde(default = "default_preview_max_chars")]
    pub preview_max_chars: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HealthConfig {
    #[serde(default = "default_health_enabled")]
    pub enabled: bool,
    #[serde(default = "default_health_host")]
    pub host: String,
    #[serde(default = "default_health_port")]
    pub port: u16,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: default_health_enabled(),
            host: default_health_host(),
            port: default_health_port(),
        }
    }
}

fn default_reply_timeout_secs() -> u64 {
    10
}

fn default_preview_max_chars() -> usize {
    200
}

fn default_health_enabled() -> bool {
    true
}

fn default_health_host() -> String {
    "0.0.0.0".to_string()
}

fn default_health_port() -> u16 {
    3000
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.apply_overrides(std::env::var("BOT_TOKEN").ok(), std::env::var("PORT").ok());
        config.validate()?;

        Ok(config)
    }

    /// Parse and validate without consulting the environment.
    #[allow(dead_code)]
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    /// `BOT_TOKEN` fills an empty token; `PORT` wins over the configured
    /// health port (hosting platforms assign it).
    pub fn apply_overrides(&mut self, bot_token: Option<String>, port: Option<String>) {
        if self.telegram.bot_token.trim().is_empty() {
            if let Some(token) = bot_token.filter(|t| !t.trim().is_empty()) {
                self.telegram.bot_token = token;
            }
        }

        if let Some(port) = port.and_then(|p| p.trim().parse::<u16>().ok()) {
            self.health.port = port;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.telegram.bot_token.trim().is_empty() {
            bail!("telegram.bot_token is empty and BOT_TOKEN is not set");
        }
        if self.reminder.reply_timeout_secs == 0 {
            bail!("reminder.reply_timeout_secs must be at least 1");
        }
        if self.reminder.preview_max_chars == 0 {
            bail!("reminder.preview_max_chars must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [telegram]
        bot_token = "123:abc"

        [reminder]
        alert_chat_id = -100999
    "#;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = Config::from_toml_str(MINIMAL).unwrap();
        assert_eq!(config.reminder.alert_chat_id, -100999);
        assert_eq!(config.reminder.reply_timeout_secs, 10);
        assert_eq!(config.reminder.preview_max_chars, 200);
        assert!(config.reminder.privileged_user_ids.is_empty());
        assert!(config.reminder.privileged_usernames.is_empty());
        assert!(config.health.enabled);
        assert_eq!(config.health.host, "0.0.0.0");
        assert_eq!(config.health.port, 3000);
    }

    #[test]
    fn test_full_config() {
        let config = Config::from_toml_str(
            r#"
            [telegram]
            bot_token = "t"

            [reminder]
            alert_chat_id = -42
            reply_timeout_secs = 30
            privileged_user_ids = [1, 2]
            privileged_usernames = ["@Admin", "helper"]
            preview_max_chars = 50

            [health]
            enabled = false
            port = 8080
            "#,
        )
        .unwrap();

        assert_eq!(config.reminder.reply_timeout_secs, 30);
        assert_eq!(config.reminder.privileged_user_ids, vec![1, 2]);
        assert_eq!(config.reminder.privileged_usernames, vec!["@Admin", "helper"]);
        assert_eq!(config.reminder.preview_max_chars, 50);
        assert!(!config.health.enabled);
        assert_eq!(config.health.port, 8080);
    }

    #[test]
    fn test_missing_alert_chat_is_rejected() {
        let result = Config::from_toml_str(
            r#"
            [telegram]
            bot_token = "t"

            [reminder]
            reply_timeout_secs = 10
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let result = Config::from_toml_str(
            r#"
            [telegram]
            bot_token = "t"

            [reminder]
            alert_chat_id = 1
            reply_timeout_secs = 0
            "#,
        );
        let err = result.unwrap_err();
        assert!(err.to_string().contains("reply_timeout_secs"));
    }

    #[test]
    fn test_empty_token_is_rejected() {
        let result = Config::from_toml_str(
            r#"
            [telegram]

            [reminder]
            alert_chat_id = 1
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_env_token_fills_empty_token() {
        let mut config: Config = toml::from_str(
            r#"
            [telegram]
            bot_token = ""

            [reminder]
            alert_chat_id = 1
            "#,
        )
        .unwrap();

        config.apply_overrides(Some("from-env".to_string()), None);
        assert_eq!(config.telegram.bot_token, "from-env");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_token_does_not_replace_configured_token() {
        let mut config: Config = toml::from_str(MINIMAL).unwrap();
        config.apply_overrides(Some("from-env".to_string()), None);
        assert_eq!(config.telegram.bot_token, "123:abc");
    }

    #[test]
    fn test_port_override() {
        let mut config: Config = toml::from_str(MINIMAL).unwrap();
        config.apply_overrides(None, Some("10000".to_string()));
        assert_eq!(config.health.port, 10000);

        config.apply_overrides(None, Some("not-a-port".to_string()));
        assert_eq!(config.health.port, 10000);
    }
}
