use std::env;
use std::str::FromStr;
use std::time::Duration;

use dotenv::dotenv;
use url::Url;

use crate::models::errors::ConfigError;
use crate::models::notifications::NotificationFilter;

pub const USER_INFO_URL: &str = "NOTIFY_USER_INFO_URL";
pub const NOTIFICATION_API_URL: &str = "NOTIFY_API_URL";
pub const BASE_URL: &str = "NOTIFY_BASE_URL";
pub const TOKEN_TTL_MS: &str = "NOTIFY_TOKEN_TTL_MS";
pub const REQUEST_TIMEOUT_SECS: &str = "NOTIFY_REQUEST_TIMEOUT_SECS";
pub const POLL_INTERVAL_SECS: &str = "NOTIFY_POLL_INTERVAL_SECS";
pub const FILTER_DAYS: &str = "NOTIFY_FILTER_DAYS";

pub const DEFAULT_TOKEN_TTL_MS: u64 = 180_000;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;

/// Initialize dotenv (only needs to be called once at startup)
pub fn init() {
    if dotenv().is_ok() {
        log::info!("Loaded .env file");
    } else {
        log::debug!("No .env file loaded");
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    pub user_info_url: Url,
    pub notification_api_url: Url,
    /// Relative action urls are resolved against this.
    pub base_url: Url,
    pub token_ttl: Duration,
    pub request_timeout: Duration,
    pub poll_interval: Duration,
    pub default_filter: NotificationFilter,
}

impl SyncConfig {
    pub fn new(user_info_url: &str, notification_api_url: &str) -> Result<Self, ConfigError> {
        let user_info_url = parse_url(USER_INFO_URL, user_info_url)?;
        let notification_api_url = parse_url(NOTIFICATION_API_URL, notification_api_url)?;
        let base_url = origin_of(&notification_api_url)?;

        Ok(Self {
            user_info_url,
            notification_api_url,
            base_url,
            token_ttl: Duration::from_millis(DEFAULT_TOKEN_TTL_MS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            default_filter: NotificationFilter::default(),
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new(
            &get_var(&lookup, USER_INFO_URL)?,
            &get_var(&lookup, NOTIFICATION_API_URL)?,
        )?;

        if let Some(raw) = lookup(BASE_URL).filter(|v| !v.trim().is_empty()) {
            config.base_url = parse_url(BASE_URL, &raw)?;
        }

        config.token_ttl = Duration::from_millis(parse_or(&lookup, TOKEN_TTL_MS, DEFAULT_TOKEN_TTL_MS)?);
        config.request_timeout =
            Duration::from_secs(parse_or(&lookup, REQUEST_TIMEOUT_SECS, DEFAULT_REQUEST_TIMEOUT_SECS)?);
        config.poll_interval =
            Duration::from_secs(parse_or(&lookup, POLL_INTERVAL_SECS, DEFAULT_POLL_INTERVAL_SECS)?);
        config.default_filter = parse_filter(lookup(FILTER_DAYS))?;

        // All three must be positive.
        for (key, value) in [
            (TOKEN_TTL_MS, config.token_ttl),
            (REQUEST_TIMEOUT_SECS, config.request_timeout),
            (POLL_INTERVAL_SECS, config.poll_interval),
        ] {
            if value.is_zero() {
                return Err(invalid(key, "0"));
            }
        }

        Ok(config)
    }

    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    pub fn with_default_filter(mut self, filter: NotificationFilter) -> Self {
        self.default_filter = filter;
        self
    }
}

fn get_var<F>(lookup: &F, key: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ConfigError::Missing(key.to_string()))
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| invalid(key, &raw)),
    }
}

fn parse_filter(raw: Option<String>) -> Result<NotificationFilter, ConfigError> {
    match raw.as_deref().map(str::trim) {
        None => Ok(NotificationFilter::default()),
        Some("") | Some("all") => Ok(NotificationFilter::all()),
        Some(days) => days
            .parse::<u32>()
            .map(|days| NotificationFilter { days: Some(days) })
            .map_err(|_| invalid(FILTER_DAYS, days)),
    }
}

fn parse_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw.trim()).map_err(|e| ConfigError::InvalidUrl {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

fn origin_of(url: &Url) -> Result<Url, ConfigError> {
    url.join("/").map_err(|e| ConfigError::InvalidUrl {
        key: BASE_URL.to_string(),
        reason: e.to_string(),
    })
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::Invalid {
        key: key.to_string(),
        value: value.to_string(),
    }
}
