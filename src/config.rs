use std::net::SocketAddr;
use std::path::PathBuf;

use chrono::Datelike;
use thiserror::Error;

use crate::date_utils::today;

pub const API_URL_VAR: &str = "WARNING_BOARD_API_URL";
pub const BIND_VAR: &str = "WARNING_BOARD_BIND";
pub const YEAR_VAR: &str = "WARNING_BOARD_YEAR";
pub const UPCOMING_LIMIT_VAR: &str = "WARNING_BOARD_UPCOMING_LIMIT";
pub const STATIC_DIR_VAR: &str = "WARNING_BOARD_STATIC_DIR";

pub const DEFAULT_API_URL: &str = "http://localhost:5000";
const DEFAULT_BIND: &str = "127.0.0.1:3000";
const DEFAULT_STATIC_DIR: &str = "static";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}

/// Server settings, read from `WARNING_BOARD_*` environment variables
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Base URL of the task backend
    pub api_url: String,
    pub bind: SocketAddr,
    /// Year shown by the heatmap
    pub year: i32,
    /// Length of the upcoming list; the backend decides when unset
    pub upcoming_limit: Option<u32>,
    pub static_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup. Unset or blank keys take their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_url = get(API_URL_VAR).unwrap_or_else(|| DEFAULT_API_URL.to_string());
        if !api_url.starts_with("http://") && !api_url.starts_with("https://") {
            return Err(ConfigError::Invalid {
                key: API_URL_VAR,
                value: api_url,
            });
        }

        let bind = get(BIND_VAR).unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind = parse(BIND_VAR, bind)?;

        let year = match get(YEAR_VAR) {
            Some(value) => parse(YEAR_VAR, value)?,
            None => today().year(),
        };

        let upcoming_limit = match get(UPCOMING_LIMIT_VAR) {
            Some(value) => Some(parse(UPCOMING_LIMIT_VAR, value)?),
            None => None,
        };

        let static_dir = get(STATIC_DIR_VAR)
            .unwrap_or_else(|| DEFAULT_STATIC_DIR.to_string())
            .into();

        Ok(Config {
            api_url,
            bind,
            year,
            upcoming_limit,
            static_dir,
        })
    }
}

fn parse<T: std::str::FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::Invalid { key, value })
}
