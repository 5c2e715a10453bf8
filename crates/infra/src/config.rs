//! Process configuration, read once at startup from environment variables.

use std::net::{IpAddr, SocketAddr};

use thiserror::Error;

pub const DEFAULT_MONGO_URL: &str = "mongodb://localhost:27017";
pub const DEFAULT_MONGO_DATABASE: &str = "chimera_flora";
pub const DEFAULT_MONGO_COLLECTION: &str = "floras";
pub const DEFAULT_POSTGRES_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_APP_HOST: &str = "0.0.0.0";
pub const DEFAULT_APP_PORT: u16 = 8000;
pub const DEFAULT_CONSUMER_TAG: &str = "flora-downstream-responder";
pub const DEFAULT_PREFETCH_COUNT: u16 = 10;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerConfig {
    pub url: String,
    pub queue_name: String,
    pub consumer_tag: String,
    /// Unacknowledged deliveries the broker may push at once. Bounds the
    /// number of requests in flight against the store pools.
    pub prefetch_count: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostgresConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MongoConfig {
    pub url: String,
    pub database: String,
    pub collection: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpConfig {
    pub host: IpAddr,
    pub port: u16,
}

impl HttpConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponderConfig {
    pub broker: BrokerConfig,
    pub postgres: PostgresConfig,
    pub mongo: MongoConfig,
    pub http: HttpConfig,
}

impl ResponderConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let required = |var: &'static str| get(var).ok_or(ConfigError::Missing(var));
        let or_default = |var: &str, default: &str| get(var).unwrap_or_else(|| default.to_string());

        let broker = BrokerConfig {
            url: required("RABBITMQ_URL")?,
            queue_name: required("QUEUE_NAME")?,
            consumer_tag: or_default("CONSUMER_TAG", DEFAULT_CONSUMER_TAG),
            prefetch_count: parse_or(
                "PREFETCH_COUNT",
                get("PREFETCH_COUNT"),
                DEFAULT_PREFETCH_COUNT,
            )?,
        };
        if broker.prefetch_count == 0 {
            return Err(ConfigError::Invalid {
                var: "PREFETCH_COUNT",
                reason: "must be at least 1".to_string(),
            });
        }

        let postgres = PostgresConfig {
            url: required("DATABASE_URL_POSTGRES")?,
            max_connections: parse_or(
                "POSTGRES_MAX_CONNECTIONS",
                get("POSTGRES_MAX_CONNECTIONS"),
                DEFAULT_POSTGRES_MAX_CONNECTIONS,
            )?,
        };
        if postgres.max_connections == 0 {
            return Err(ConfigError::Invalid {
                var: "POSTGRES_MAX_CONNECTIONS",
                reason: "must be at least 1".to_string(),
            });
        }

        let mongo = MongoConfig {
            url: or_default("DATABASE_URL_MONGO", DEFAULT_MONGO_URL),
            database: or_default("MONGO_DATABASE", DEFAULT_MONGO_DATABASE),
            collection: or_default("MONGO_COLLECTION", DEFAULT_MONGO_COLLECTION),
        };

        let http = HttpConfig {
            host: parse_or("APP_HOST", get("APP_HOST"), default_host())?,
            port: parse_or("APP_PORT", get("APP_PORT"), DEFAULT_APP_PORT)?,
        };

        Ok(Self {
            broker,
            postgres,
            mongo,
            http,
        })
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn parse_or<T>(var: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
        }),
    }
}
