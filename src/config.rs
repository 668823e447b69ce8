use anyhow::Result;
use clap::Parser;
use serde::Deserialize;
use serde_yaml;
use std::env;
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "snippetbox")]
#[command(about = "Runs the snippetbox service", long_about = None)]
pub struct Cli {
    #[arg(short = 'c', long = "config")]
    pub config_path: Option<String>,
}

pub fn default_config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".snippetbox")
}

pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.yaml")
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct App {
    database: String,
    port: i32,
    #[serde(default)]
    pub turso_url: Option<String>,
    #[serde(default)]
    pub turso_auth_token: Option<String>,
    #[serde(default = "default_sync_interval")]
    pub sync_interval_seconds: u64,
}

fn default_sync_interval() -> u64 {
    60
}

impl App {
    pub fn get_db(&self) -> &str {
        &self.database
    }

    pub fn get_port(&self) -> i32 {
        self.port
    }
}

/// Bearer token settings for the identity provider's session tokens.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Auth {
    pub jwt_secret: String,
    #[serde(default)]
    pub jwt_issuer: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Webhook {
    #[serde(default)]
    pub signing_secret: Option<String>,
}

impl Webhook {
    /// An unset environment variable substitutes to "", which counts as absent.
    pub fn signing_secret(&self) -> Option<&str> {
        self.signing_secret
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub app: App,
    pub auth: Auth,
    #[serde(default)]
    pub webhook: Webhook,
}

impl Config {
    pub fn new(path: &str) -> Result<Self> {
        let cfg = Config::load_config(path)?;
        Ok(cfg)
    }

    fn load_config(path: &str) -> Result<Config> {
        let yaml_str = fs::read_to_string(path)?;
        Config::from_yaml(&yaml_str)
    }

    pub fn from_yaml(yaml_str: &str) -> Result<Config> {
        let yaml_with_env = Config::substitute_env_vars(yaml_str)?;
        let config: Config = serde_yaml::from_str(&yaml_with_env)?;
        Ok(config)
    }

    fn substitute_env_vars(yaml_str: &str) -> Result<String> {
        let mut result = yaml_str.to_string();
        let mut offset = 0;

        while let Some(start) = result[offset..].find("${") {
            let actual_start = offset + start;
            if let Some(end) = result[actual_start..].find("}") {
                let var_name = &result[actual_start + 2..actual_start + end];

                // ${VAR:-default}
                let env_value = if let Some(default_start) = var_name.find(":-") {
                    let actual_var = &var_name[..default_start];
                    let default_val = &var_name[default_start + 2..];
                    env::var(actual_var).unwrap_or_else(|_| default_val.to_string())
                } else {
                    env::var(var_name).unwrap_or_else(|_| {
                        tracing::warn!(var = var_name, "environment variable not found");
                        String::new()
                    })
                };

                result.replace_range(actual_start..actual_start + end + 1, &env_value);
                offset = actual_start + env_value.len();
            } else {
                break;
            }
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_apply_for_unset_vars() {
        let yaml = r#"
app:
  database: ${SNIPPETBOX_TEST_UNSET_DB:-snippets.db}
  port: 8080
auth:
  jwt_secret: secret
webhook:
  signing_secret: ${SNIPPETBOX_TEST_UNSET_SECRET}
"#;
        let cfg = Config::from_yaml(yaml).unwrap();
        assert_eq!(cfg.app.get_db(), "snippets.db");
        assert_eq!(cfg.app.get_port(), 8080);
        assert_eq!(cfg.app.sync_interval_seconds, 60);
        assert_eq!(cfg.webhook.signing_secret(), None);
    }

    #[test]
    fn test_webhook_section_is_optional() {
        let yaml = r#"
app:
  database: snippets.db
  port: 3000
auth:
  jwt_secret: secret
  jwt_issuer: https://issuer.example
"#;
        let cfg = Config::from_yaml(yaml).unwrap();
        assert!(cfg.webhook.signing_secret().is_none());
        assert_eq!(cfg.auth.jwt_issuer.as_deref(), Some("https://issuer.example"));
    }
}
