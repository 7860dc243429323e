use anyhow::{Context, Result};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_DATABASE: &str = "pocketbook.db";

/// Longest reset-token lifetime accepted from configuration (one year).
pub const MAX_RESET_TOKEN_TTL_MINUTES: i64 = 365 * 24 * 60;

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashingParams {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashingParams {
    fn default() -> Self {
        Self {
            memory_kib: argon2::Params::DEFAULT_M_COST,
            iterations: argon2::Params::DEFAULT_T_COST,
            parallelism: argon2::Params::DEFAULT_P_COST,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub reset_token_ttl: chrono::Duration,
    pub hashing: HashingParams,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            reset_token_ttl: chrono::Duration::minutes(60),
            hashing: HashingParams::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NotifySettings {
    /// Unset means notifications are only logged
    pub webhook_url: Option<String>,
    pub timeout: Duration,
}

impl Default for NotifySettings {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout: Duration::from_millis(5000),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: String,
    pub auth: AuthSettings,
    pub notify: NotifySettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: DEFAULT_DATABASE.to_string(),
            auth: AuthSettings::default(),
            notify: NotifySettings::default(),
        }
    }
}

impl Config {
    /// Load `.env` if present, then read `POCKETBOOK_*` variables.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Missing keys fall back to
    /// defaults; malformed values are errors.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let database_path = lookup("POCKETBOOK_DATABASE").unwrap_or(defaults.database_path);

        let ttl_minutes: i64 = parse_var(&lookup, "POCKETBOOK_RESET_TOKEN_TTL_MINUTES", 60)?;
        if !(1..=MAX_RESET_TOKEN_TTL_MINUTES).contains(&ttl_minutes) {
            anyhow::bail!(
                "POCKETBOOK_RESET_TOKEN_TTL_MINUTES must be between 1 and {}",
                MAX_RESET_TOKEN_TTL_MINUTES
            );
        }

        let hashing = HashingParams {
            memory_kib: parse_var(
                &lookup,
                "POCKETBOOK_ARGON2_MEMORY_KIB",
                defaults.auth.hashing.memory_kib,
            )?,
            iterations: parse_var(
                &lookup,
                "POCKETBOOK_ARGON2_ITERATIONS",
                defaults.auth.hashing.iterations,
            )?,
            parallelism: parse_var(
                &lookup,
                "POCKETBOOK_ARGON2_PARALLELISM",
                defaults.auth.hashing.parallelism,
            )?,
        };

        let webhook_url = lookup("POCKETBOOK_NOTIFY_WEBHOOK_URL")
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());
        let timeout_ms: u64 = parse_var(&lookup, "POCKETBOOK_NOTIFY_TIMEOUT_MS", 5000)?;

        Ok(Self {
            database_path,
            auth: AuthSettings {
                reset_token_ttl: chrono::Duration::minutes(ttl_minutes),
                hashing,
            },
            notify: NotifySettings {
                webhook_url,
                timeout: Duration::from_millis(timeout_ms),
            },
        })
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {}: '{}'", key, raw)),
        None => Ok(default),
    }
}
