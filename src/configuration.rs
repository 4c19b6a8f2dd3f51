use std::{
    env::{self, VarError},
    fs, io,
    ops::Deref,
    str::FromStr,
    sync::Arc,
    time::Duration,
};

use crate::{error::Error, helpers::parse_list, push::SubscriptionStore};

pub const MAX_AUTO_RECOVERY_ATTEMPTS: u32 = 3;
pub const RECOVERY_DELAY: Duration = Duration::from_secs(5);
pub const PERMISSION_TIMEOUT: Duration = Duration::from_secs(120);
pub const READY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug)]
pub struct AppState<T>(Arc<T>);

impl<T> AppState<T> {
    pub fn new(state: T) -> AppState<T> {
        AppState(Arc::new(state))
    }
}

impl<T> Clone for AppState<T> {
    fn clone(&self) -> AppState<T> {
        AppState(Arc::clone(&self.0))
    }
}

impl<T> Deref for AppState<T> {
    type Target = Arc<T>;

    fn deref(&self) -> &Arc<T> {
        &self.0
    }
}

pub struct State {
    pub config: Config,
    pub store: Arc<dyn SubscriptionStore>,
}

impl State {
    pub fn new(config: Config, store: Arc<dyn SubscriptionStore>) -> State {
        Self { config, store }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub server_host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub timeout: u64,
    pub max_connections: u32,
    /// Base URL for [`crate::provider::HTTP::new`], used by library callers
    /// that reach the store through this service instead of Postgres.
    pub store_url: Option<String>,
    /// Loaded for library callers building a `PushSession`; the service
    /// itself only stores subscriptions.
    pub push: PushConfig,
}

/// Settings of a push session, passed in explicitly by whoever owns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushConfig {
    /// Checked on the first subscribe, not at startup.
    pub vapid_public_key: Option<String>,
    pub recovery_delay: Duration,
    pub max_auto_recovery_attempts: u32,
    pub permission_timeout: Duration,
    pub ready_timeout: Duration,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            vapid_public_key: None,
            recovery_delay: RECOVERY_DELAY,
            max_auto_recovery_attempts: MAX_AUTO_RECOVERY_ATTEMPTS,
            permission_timeout: PERMISSION_TIMEOUT,
            ready_timeout: READY_TIMEOUT,
        }
    }
}

impl PushConfig {
    pub fn with_vapid_public_key(mut self, key: impl Into<String>) -> Self {
        self.vapid_public_key = Some(key.into());
        self
    }

    pub fn from_env() -> Result<PushConfig, Error> {
        let vapid_public_key = optional_var("VAPID_PUBLIC_KEY")?
            .filter(|value| !value.trim().is_empty());
        let recovery_delay = Duration::from_secs(parse_var(
            "RECOVERY_DELAY_IN_SEC",
            RECOVERY_DELAY.as_secs(),
        )?);
        let max_auto_recovery_attempts = parse_var(
            "MAX_AUTO_RECOVERY_ATTEMPTS",
            MAX_AUTO_RECOVERY_ATTEMPTS,
        )?;
        let permission_timeout = Duration::from_secs(parse_var(
            "PERMISSION_TIMEOUT_IN_SEC",
            PERMISSION_TIMEOUT.as_secs(),
        )?);
        let ready_timeout = Duration::from_secs(parse_var(
            "READY_TIMEOUT_IN_SEC",
            READY_TIMEOUT.as_secs(),
        )?);

        Ok(PushConfig {
            vapid_public_key,
            recovery_delay,
            max_auto_recovery_attempts,
            permission_timeout,
            ready_timeout,
        })
    }
}

pub fn get_configuration() -> Result<Config, Error> {
    let database_url = env::var("DATABASE_URL")?;
    let server_host = env::var("SERVER_HOST")?;
    let port: u16 = env::var("PORT")?.parse()?;
    let allowed_origins = parse_list(&env::var("ALLOWED_ORIGINS")?);
    let timeout = parse_var("TIMEOUT", 10)?;
    let max_connections = parse_var("MAX_CONNECTIONS", 20)?;
    let store_url = optional_var("STORE_URL")?;
    let push = PushConfig::from_env()?;

    let config = Config {
        database_url,
        server_host,
        port,
        allowed_origins,
        timeout,
        max_connections,
        store_url,
        push,
    };

    Ok(config)
}

/// Loads `.env` and `push.conf` from the crate directory, when present.
/// Variables already set in the process environment take precedence.
pub fn set_configuration() -> Result<(), Error> {
    let directory = env!("CARGO_MANIFEST_DIR");

    for file in [".env", "push.conf"] {
        let path = format!("{}/{}", directory, file);
        match fs::read_to_string(&path) {
            Ok(config_string) => parse_config_string(&config_string),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("Config file {} not found, skipping", path);
            },
            Err(e) => return Err(Error::Io(e)),
        }
    }

    Ok(())
}

fn parse_config_string(config: &str) {
    for (key, value) in parse_pairs(config) {
        if env::var_os(key).is_none() {
            env::set_var(key, value);
        }
    }
}

fn parse_pairs(config: &str) -> Vec<(&str, &str)> {
    config
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim(), value.trim()))
        .collect()
}

fn optional_var(key: &str) -> Result<Option<String>, Error> {
    match env::var(key) {
        Ok(value) => Ok(Some(value)),
        Err(VarError::NotPresent) => Ok(None),
        Err(e) => Err(Error::VAR(e)),
    }
}

fn parse_var<T: FromStr>(key: &str, default: T) -> Result<T, Error> {
    match optional_var(key)? {
        Some(value) => value.trim().parse::<T>().map_err(|_| {
            Error::ConfigurationError(format!("{} has invalid value", key))
        }),
        None => Ok(default),
    }
}
