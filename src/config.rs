use std::{
    env,
    fmt::{self, Display},
    str::FromStr,
};

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub secret_key: Option<String>,
    pub max_connections: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { key: &'static str, reason: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "Environment variable {key} is not set"),
            ConfigError::Invalid { key, reason } => write!(f, "Invalid {key} value: {reason}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads every setting through `lookup`, so tests can pass a map instead
    /// of the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        Ok(Self {
            database_url: var("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?,
            port: try_load(var("FOODGRAM_PORT"), "FOODGRAM_PORT", 8000)?,
            secret_key: var("FOODGRAM_SECRET_KEY"),
            max_connections: try_load(
                var("FOODGRAM_DB_MAX_CONNECTIONS"),
                "FOODGRAM_DB_MAX_CONNECTIONS",
                5,
            )?,
        })
    }
}

fn try_load<T: FromStr + Display>(
    value: Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    match value {
        None => {
            log::info!("{key} not set, using default: {default}");
            Ok(default)
        }
        Some(value) => value.trim().parse().map_err(|e: T::Err| {
            log::warn!("Invalid {key} value: {e}");
            ConfigError::Invalid {
                key,
                reason: e.to_string(),
            }
        }),
    }
}
