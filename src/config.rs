use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{AppError, AppResult};
use crate::security::InputValidator;
use crate::uploader::transport::CredentialPolicy;

const APP_DIR_NAME: &str = "Profile Photo Uploader";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub upload_path: String,
    pub upload_field: String,
    pub with_credentials: bool,
    pub session_cookie: Option<String>,
    pub auth_token: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub progress_chunk_size: usize, // bytes per streamed body chunk
    pub history_retention_days: u32,
    pub show_upload_notifications: bool,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080/api/v1".to_string(),
            upload_path: "profile/avatar/upload".to_string(),
            upload_field: "avatar".to_string(),
            with_credentials: true,
            session_cookie: None,
            auth_token: None,
            request_timeout_secs: None,
            progress_chunk_size: 64 * 1024,
            history_retention_days: 30,
            show_upload_notifications: true,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Credential policy handed to the transport. A bearer token wins over a
    /// session cookie; neither applies when credentials are switched off.
    pub fn credential_policy(&self) -> CredentialPolicy {
        if !self.with_credentials {
            return CredentialPolicy::Anonymous;
        }

        match (&self.auth_token, &self.session_cookie) {
            (Some(token), _) if !token.trim().is_empty() => {
                CredentialPolicy::BearerToken(token.trim().to_string())
            }
            (_, Some(cookie)) if !cookie.trim().is_empty() => {
                CredentialPolicy::SessionCookie(cookie.trim().to_string())
            }
            _ => CredentialPolicy::Anonymous,
        }
    }

    pub fn request_timeout(&self) -> Option<std::time::Duration> {
        self.request_timeout_secs.map(std::time::Duration::from_secs)
    }
}

fn get_config_path() -> AppResult<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| AppError::Config("Could not find config directory".to_string()))?
        .join(APP_DIR_NAME);

    fs::create_dir_all(&config_dir)?;
    Ok(config_dir.join("config.json"))
}

pub fn load_config() -> AppResult<Config> {
    load_config_from(&get_config_path()?)
}

pub fn load_config_from(config_path: &Path) -> AppResult<Config> {
    if config_path.exists() {
        let config_str = fs::read_to_string(config_path)?;
        let config: Config = serde_json::from_str(&config_str).unwrap_or_else(|e| {
            log::warn!("Failed to parse config file: {}. Using defaults.", e);
            Config::default()
        });

        validate_config(&config)?;

        Ok(config)
    } else {
        let default_config = Config::default();
        save_config_to(config_path, &default_config)?;
        Ok(default_config)
    }
}

pub fn save_config(config: &Config) -> AppResult<()> {
    save_config_to(&get_config_path()?, config)
}

pub fn save_config_to(config_path: &Path, config: &Config) -> AppResult<()> {
    validate_config(config)?;

    if config_path.exists() {
        let backup_path = config_path.with_extension("json.bak");
        if let Err(e) = fs::copy(config_path, &backup_path) {
            log::warn!("Failed to create config backup: {}", e);
        }
    }

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let config_str = serde_json::to_string_pretty(config)?;
    fs::write(config_path, config_str)?;

    log::info!("Configuration saved to {}", config_path.display());
    Ok(())
}

pub fn get_data_directory() -> AppResult<PathBuf> {
    let data_dir = dirs::data_dir()
        .ok_or_else(|| AppError::Config("Could not find data directory".to_string()))?
        .join(APP_DIR_NAME);

    fs::create_dir_all(&data_dir)?;
    Ok(data_dir)
}

pub fn get_database_path() -> AppResult<PathBuf> {
    Ok(get_data_directory()?.join("profile.db"))
}

pub fn validate_config(config: &Config) -> AppResult<()> {
    InputValidator::validate_base_url(&config.api_base_url)?;
    InputValidator::validate_endpoint_path(&config.upload_path)?;

    if config.upload_field.trim().is_empty() {
        return Err(AppError::validation("upload_field", "Must not be empty"));
    }

    if config.progress_chunk_size < 1024 || config.progress_chunk_size > 8 * 1024 * 1024 {
        return Err(AppError::validation(
            "progress_chunk_size",
            "Must be between 1KB and 8MB",
        ));
    }

    if config.history_retention_days == 0 {
        return Err(AppError::validation(
            "history_retention_days",
            "Must be greater than 0",
        ));
    }

    if config.request_timeout_secs == Some(0) {
        return Err(AppError::validation(
            "request_timeout_secs",
            "Must be greater than 0 when set",
        ));
    }

    let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
    if !valid_log_levels.contains(&config.log_level.as_str()) {
        return Err(AppError::validation("log_level", "Must be a valid log level"));
    }

    Ok(())
}
