use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_POSTGRES_HOST: &str = "localhost";
const DEFAULT_POSTGRES_PORT: u16 = 5432;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Process configuration, read once at startup and passed by reference.
#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub api_token: String,
    pub bind_addr: SocketAddr,
    pub metrics_addr: Option<SocketAddr>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &self.redacted_database_url())
            .field("api_token", &"<redacted>")
            .field("bind_addr", &self.bind_addr)
            .field("metrics_addr", &self.metrics_addr)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key/value source. Empty values count
    /// as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let api_token = get("API_TOKEN").ok_or(ConfigError::Missing("API_TOKEN"))?;

        let database_url = match get("DATABASE_URL") {
            Some(url) => url,
            None => postgres_url(&get)?,
        };

        let bind_addr = match get("BIND_ADDR") {
            Some(addr) => parse_addr("BIND_ADDR", &addr)?,
            None => parse_addr("BIND_ADDR", DEFAULT_BIND_ADDR)?,
        };

        let metrics_addr = get("METRICS_ADDR")
            .map(|addr| parse_addr("METRICS_ADDR", &addr))
            .transpose()?;

        Ok(Self {
            database_url,
            api_token,
            bind_addr,
            metrics_addr,
        })
    }

    /// The database URL with any password replaced, for logging.
    pub fn redacted_database_url(&self) -> String {
        match Url::parse(&self.database_url) {
            Ok(mut url) => {
                if url.password().is_some() {
                    let _ = url.set_password(Some("***"));
                }
                url.to_string()
            }
            Err(_) => "<unparseable>".to_string(),
        }
    }
}

fn postgres_url<G>(get: &G) -> Result<String, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let user = get("POSTGRES_USER").ok_or(ConfigError::Missing("DATABASE_URL or POSTGRES_USER"))?;
    let database = get("POSTGRES_DB").ok_or(ConfigError::Missing("POSTGRES_DB"))?;
    let host = get("POSTGRES_HOST").unwrap_or_else(|| DEFAULT_POSTGRES_HOST.to_string());
    let port = match get("POSTGRES_PORT") {
        Some(port) => port.parse::<u16>().map_err(|e| ConfigError::Invalid {
            key: "POSTGRES_PORT",
            reason: e.to_string(),
        })?,
        None => DEFAULT_POSTGRES_PORT,
    };

    let invalid = |key: &'static str| ConfigError::Invalid {
        key,
        reason: "not usable in a connection URL".to_string(),
    };

    let mut url = Url::parse("postgres://localhost").map_err(|e| ConfigError::Invalid {
        key: "DATABASE_URL",
        reason: e.to_string(),
    })?;
    url.set_host(Some(&host)).map_err(|e| ConfigError::Invalid {
        key: "POSTGRES_HOST",
        reason: e.to_string(),
    })?;
    url.set_port(Some(port)).map_err(|_| invalid("POSTGRES_PORT"))?;
    url.set_username(&user).map_err(|_| invalid("POSTGRES_USER"))?;
    if let Some(password) = get("POSTGRES_PASSWORD") {
        url.set_password(Some(&password))
            .map_err(|_| invalid("POSTGRES_PASSWORD"))?;
    }
    url.set_path(&database);

    Ok(url.to_string())
}

fn parse_addr(key: &'static str, value: &str) -> Result<SocketAddr, ConfigError> {
    value.parse().map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
        key,
        reason: e.to_string(),
    })
}
