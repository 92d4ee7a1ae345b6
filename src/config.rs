use dotenv::dotenv;
use std::env;
use std::path::PathBuf;

use crate::error::ConfigError;
use crate::forms::bases::{default_bases, parse_bases, SharedBase};

pub const DEFAULT_FROM_EMAIL: &str = "webmaster@localhost";
pub const DEFAULT_DATABASE_DIR: &str = "/app/data";
pub const DEFAULT_PORT: u16 = 3000;

/// Settings the form machinery itself reads. Fixed at startup.
#[derive(Debug, Clone)]
pub struct FormDesignerSettings {
    /// Behaviors every synthesized form inherits, in order.
    pub form_bases: Vec<SharedBase>,
    /// Thread the inbound request into form construction.
    pub pass_request: bool,
    /// Display titles left out of formatted and exported submissions.
    pub hidden_fields: Vec<String>,
    /// Sender address for notification mails.
    pub default_from_email: String,
}

impl Default for FormDesignerSettings {
    fn default() -> Self {
        Self {
            form_bases: default_bases(),
            pass_request: false,
            hidden_fields: Vec::new(),
            default_from_email: DEFAULT_FROM_EMAIL.to_string(),
        }
    }
}

/// Whole-process configuration, built once in `main`.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub designer: FormDesignerSettings,
    pub mail_relay_url: Option<String>,
    pub database_dir: PathBuf,
    pub admin_auth_token: Option<String>,
    pub csrf_secret: Option<String>,
    pub is_production: bool,
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            designer: FormDesignerSettings::default(),
            mail_relay_url: None,
            database_dir: PathBuf::from(DEFAULT_DATABASE_DIR),
            admin_auth_token: None,
            csrf_secret: None,
            is_production: false,
            port: DEFAULT_PORT,
        }
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

impl AppConfig {
    /// Load from the process environment, after reading `.env` if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load from any key lookup. Missing keys fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let form_bases = match lookup("FORM_DESIGNER_CLASSES") {
            Some(value) => parse_bases(&value)?,
            None => default_bases(),
        };
        let pass_request = match lookup("FORM_DESIGNER_PASS_REQUEST") {
            Some(value) => parse_flag("FORM_DESIGNER_PASS_REQUEST", &value)?,
            None => false,
        };
        let hidden_fields = lookup("FORM_DESIGNER_HIDDEN_FIELDS")
            .map(|value| split_list(&value))
            .unwrap_or_default();
        let default_from_email =
            non_empty("DEFAULT_FROM_EMAIL").unwrap_or_else(|| DEFAULT_FROM_EMAIL.to_string());

        let port = match non_empty("PORT") {
            Some(value) => value.trim().parse::<u16>().map_err(|_| ConfigError::InvalidValue {
                key: "PORT".to_string(),
                value,
            })?,
            None => DEFAULT_PORT,
        };
        let is_production = lookup("ENVIRONMENT")
            .map(|value| value.to_lowercase() == "production")
            .unwrap_or(false);

        Ok(Self {
            designer: FormDesignerSettings {
                form_bases,
                pass_request,
                hidden_fields,
                default_from_email,
            },
            mail_relay_url: non_empty("MAIL_RELAY_URL"),
            database_dir: non_empty("FORM_DATABASE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_DIR)),
            admin_auth_token: non_empty("ADMIN_AUTH_TOKEN"),
            csrf_secret: non_empty("CSRF_SECRET"),
            is_production,
            port,
        })
    }
}
