use crate::money::Money;
use std::env;
use std::num::ParseIntError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be an integer: {source}")]
    InvalidNumber {
        name: &'static str,
        #[source]
        source: ParseIntError,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Without a URI the service keeps groups in memory.
    pub mongodb_uri: Option<String>,
    pub database_name: String,
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub settlement_tolerance: Money,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = match lookup("PORT") {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|source| ConfigError::InvalidNumber { name: "PORT", source })?,
            None => 8080,
        };
        let tolerance = match lookup("SETTLEMENT_TOLERANCE_CENTS") {
            Some(value) => value.trim().parse().map_err(|source| ConfigError::InvalidNumber {
                name: "SETTLEMENT_TOLERANCE_CENTS",
                source,
            })?,
            None => 0,
        };
        let cors_origins = lookup("CORS_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Config {
            mongodb_uri: lookup("MONGODB_URI").filter(|uri| !uri.trim().is_empty()),
            database_name: lookup("DATABASE_NAME").unwrap_or_else(|| "OpenSplit".to_string()),
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            cors_origins,
            settlement_tolerance: Money::from_minor(tolerance),
        })
    }
}
