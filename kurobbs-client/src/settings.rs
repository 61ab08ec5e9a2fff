use config::{Config, ConfigError, Environment, File, Map};
use log::debug;
use serde::Deserialize;
use thiserror::Error;

use std::path::PathBuf;

const CONFIG_FILE_NAME: &str = ".kurobbs.json";

const ENV_KEYS: [&str; 5] = [
    "TOKEN",
    "DEBUG",
    "BARK_DEVICE_KEY",
    "BARK_SERVER_URL",
    "SERVER3_SEND_KEY",
];

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("TOKEN is required but missing.")]
    MissingToken,

    #[error("failed to read settings: {0}")]
    Source(#[from] ConfigError),
}

/// Everything the run needs, read once at startup.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Settings {
    pub token: String,
    pub debug: bool,
    pub bark_device_key: Option<String>,
    pub bark_server_url: Option<String>,
    pub server3_send_key: Option<String>,
}

// Keys as the config crate hands them over: the environment is lowercased.
#[derive(Default, Deserialize)]
struct RawSettings {
    token: Option<String>,
    debug: Option<String>,
    bark_device_key: Option<String>,
    bark_server_url: Option<String>,
    server3_send_key: Option<String>,
}

impl Settings {
    /// Reads `<config dir>/.kurobbs.json` if it exists, then the process
    /// environment on top of it.
    pub fn load() -> Result<Self, SettingsError> {
        let config_path = dirs::config_dir().map(|dir| dir.join(CONFIG_FILE_NAME));
        let vars = known_vars(|key| std::env::var(key).ok());
        Self::build(config_path, Environment::default().source(Some(vars)))
    }

    /// Same as [`Settings::load`] but with an explicit environment and no file.
    #[cfg(test)]
    pub fn from_env_map(vars: Map<String, String>) -> Result<Self, SettingsError> {
        Self::build(None, Environment::default().source(Some(vars)))
    }

    fn build(config_path: Option<PathBuf>, env: Environment) -> Result<Self, SettingsError> {
        let mut builder = Config::builder();
        if let Some(path) = config_path {
            debug!("Looking for optional settings file at {:?}", path);
            builder = builder.add_source(File::from(path).required(false));
        }
        let raw: RawSettings = builder.add_source(env).build()?.try_deserialize()?;

        let token = non_empty(raw.token).ok_or(SettingsError::MissingToken)?;
        Ok(Settings {
            token,
            debug: raw.debug.as_deref().map(parse_bool).unwrap_or(false),
            bark_device_key: non_empty(raw.bark_device_key),
            bark_server_url: non_empty(raw.bark_server_url),
            server3_send_key: non_empty(raw.server3_send_key),
        })
    }

    /// Values that must never reach the log output unmasked.
    pub fn sensitive_values(&self) -> Vec<String> {
        std::iter::once(Some(&self.token))
            .chain([
                self.bark_device_key.as_ref(),
                self.bark_server_url.as_ref(),
                self.server3_send_key.as_ref(),
            ])
            .flatten()
            .cloned()
            .collect()
    }
}

/// Picks only the keys settings are read from; unrelated variables, including
/// ones that are not valid UTF-8, are never touched.
fn known_vars(lookup: impl Fn(&str) -> Option<String>) -> Map<String, String> {
    ENV_KEYS
        .iter()
        .filter_map(|key| lookup(key).map(|value| (key.to_string(), value)))
        .collect()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
