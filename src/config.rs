use std::time::Duration;

use crate::core::models::vote::VotePolicy;
use crate::dotenv;
use crate::error::Error;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 72;
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 500;

/// Runtime settings, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
    pub lock_timeout: Duration,
    pub vote_policy: VotePolicy,
}

impl Config {
    /// Reads the process environment, after whatever `.env` has been loaded into it.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| dotenv::var(key))
    }

    /// Builds the config from any key lookup. Unset keys fall back to their defaults,
    /// except `JWT_SECRET` which must be present and non-empty.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Result<String, dotenv::Error>,
    {
        let jwt_secret = lookup("JWT_SECRET")?;
        if jwt_secret.trim().is_empty() {
            return Err(Error::Invalid("JWT_SECRET must not be empty".into()));
        }
        let host = lookup("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_owned());
        let port = parse_or(&lookup, "PORT", DEFAULT_PORT)?;
        let ttl_hours = parse_or(&lookup, "TOKEN_TTL_HOURS", DEFAULT_TOKEN_TTL_HOURS)?;
        if ttl_hours <= 0 {
            return Err(Error::Invalid("TOKEN_TTL_HOURS must be positive".into()));
        }
        let lock_timeout_ms = parse_or(&lookup, "LOCK_TIMEOUT_MS", DEFAULT_LOCK_TIMEOUT_MS)?;
        let vote_policy = match lookup("VOTE_POLICY") {
            Ok(v) => v.parse()?,
            Err(_) => VotePolicy::default(),
        };
        Ok(Self {
            host,
            port,
            jwt_secret,
            token_ttl: chrono::Duration::hours(ttl_hours),
            lock_timeout: Duration::from_millis(lock_timeout_ms),
            vote_policy,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, Error>
where
    F: Fn(&str) -> Result<String, dotenv::Error>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Ok(v) => v.trim().parse().map_err(|_| Error::Invalid(format!("{} has an invalid value: {}", key, v))),
        Err(_) => Ok(default),
    }
}
