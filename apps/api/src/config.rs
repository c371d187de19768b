use std::time::Duration;

use anyhow::{bail, Context, Result};

/// Shortest accepted `ENCRYPTION_KEY`. There is no fallback secret: startup
/// fails when the key is missing or shorter than this.
pub const MIN_ENCRYPTION_KEY_LEN: usize = 16;

/// Application configuration loaded from environment variables.
/// Startup aborts if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    /// Base URL under which uploaded objects are publicly readable.
    pub s3_public_url: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub encryption_key: String,
    /// Usernames whose credential records may be read. Empty means demo login only.
    pub credential_allowlist: Vec<String>,
    pub demo_login_enabled: bool,
    pub autosave_debounce: Duration,
    pub session_ttl: Duration,
    pub login_max_attempts: u32,
    pub login_lockout: Duration,
    pub attachment_max_bytes: u64,
    pub keepalive_interval: Duration,
    pub backup_interval: Duration,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let encryption_key = require_env("ENCRYPTION_KEY")?;
        if encryption_key.trim().len() < MIN_ENCRYPTION_KEY_LEN {
            bail!("ENCRYPTION_KEY must be at least {MIN_ENCRYPTION_KEY_LEN} characters");
        }

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            redis_url: require_env("REDIS_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            s3_public_url: require_env("S3_PUBLIC_URL")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            encryption_key,
            credential_allowlist: parse_list(
                &std::env::var("CREDENTIAL_ALLOWLIST").unwrap_or_default(),
            ),
            demo_login_enabled: parse_bool(
                &std::env::var("DEMO_LOGIN_ENABLED").unwrap_or_else(|_| "true".to_string()),
            )
            .context("DEMO_LOGIN_ENABLED must be true or false")?,
            autosave_debounce: Duration::from_millis(optional_number("AUTOSAVE_DEBOUNCE_MS", 2_000)?),
            session_ttl: interval_secs("SESSION_TTL_SECS", 7 * 24 * 3600)?,
            login_max_attempts: optional_number("LOGIN_MAX_ATTEMPTS", 5)?,
            login_lockout: Duration::from_secs(optional_number("LOGIN_LOCKOUT_SECS", 300)?),
            attachment_max_bytes: optional_number("ATTACHMENT_MAX_BYTES", 5 * 1024 * 1024)?,
            keepalive_interval: interval_secs("KEEPALIVE_INTERVAL_SECS", 6 * 24 * 3600)?,
            backup_interval: interval_secs("BACKUP_INTERVAL_SECS", 24 * 3600)?,
            port: optional_number("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_number<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| anyhow::anyhow!("{key} must be a valid number, got '{raw}'")),
        Err(_) => Ok(default),
    }
}

fn interval_secs(key: &str, default: u64) -> Result<Duration> {
    parse_interval(key, std::env::var(key).ok().as_deref(), default)
}

/// Whole seconds, strictly positive.
fn parse_interval(key: &str, raw: Option<&str>, default: u64) -> Result<Duration> {
    let secs = match raw {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|_| anyhow::anyhow!("{key} must be a valid number, got '{raw}'"))?,
        None => default,
    };
    if secs == 0 {
        bail!("{key} must be greater than zero");
    }
    Ok(Duration::from_secs(secs))
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn parse_bool(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("not a boolean: '{other}'"),
    }
}
