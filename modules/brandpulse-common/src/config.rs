use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::info;

use crate::error::ConfigError;

/// Which browser renders the pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageBackend {
    /// Local Chrome driven over the DevTools protocol.
    Chrome {
        chrome_bin: Option<PathBuf>,
        headless: bool,
    },
    /// A Browserless instance reached over HTTP.
    Browserless {
        base_url: String,
        token: Option<String>,
    },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Document store
    pub database_url: String,

    // Browser
    pub page_backend: PageBackend,
    pub cookies_file: PathBuf,
    pub nav_timeout: Duration,

    // Retry policy
    pub fetch_max_attempts: u32,
    pub fetch_backoff: Duration,
    pub fetch_backoff_multiplier: u32,

    // Scroll plan
    pub scroll_count: u32,
    pub scroll_pause: Duration,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let backend = var("PAGE_BACKEND").unwrap_or_else(|| "chrome".to_string());
        let page_backend = match backend.to_ascii_lowercase().as_str() {
            "chrome" => PageBackend::Chrome {
                chrome_bin: var("CHROME_BIN").map(PathBuf::from),
                headless: parse_or(&var, "HEADLESS", true)?,
            },
            "browserless" => PageBackend::Browserless {
                base_url: required(&var, "BROWSERLESS_URL")?,
                token: var("BROWSERLESS_TOKEN"),
            },
            _ => {
                return Err(ConfigError::Invalid {
                    key: "PAGE_BACKEND",
                    value: backend,
                    reason: "expected chrome or browserless".to_string(),
                })
            }
        };

        let fetch_max_attempts: u32 = parse_or(&var, "FETCH_MAX_ATTEMPTS", 3)?;
        if fetch_max_attempts == 0 {
            return Err(ConfigError::Invalid {
                key: "FETCH_MAX_ATTEMPTS",
                value: "0".to_string(),
                reason: "at least one attempt is required".to_string(),
            });
        }

        let fetch_backoff_multiplier: u32 = parse_or(&var, "FETCH_BACKOFF_MULTIPLIER", 1)?;
        if fetch_backoff_multiplier == 0 {
            return Err(ConfigError::Invalid {
                key: "FETCH_BACKOFF_MULTIPLIER",
                value: "0".to_string(),
                reason: "multiplier must be at least 1".to_string(),
            });
        }

        Ok(Self {
            database_url: required(&var, "DATABASE_URL")?,
            page_backend,
            cookies_file: var("COOKIES_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("cookies.json")),
            nav_timeout: Duration::from_secs(parse_or(&var, "NAV_TIMEOUT_SECS", 60)?),
            fetch_max_attempts,
            fetch_backoff: Duration::from_secs(parse_or(&var, "FETCH_BACKOFF_SECS", 5)?),
            fetch_backoff_multiplier,
            scroll_count: parse_or(&var, "SCROLL_COUNT", 5)?,
            scroll_pause: Duration::from_millis(parse_or(&var, "SCROLL_PAUSE_MS", 3000)?),
        })
    }

    /// Log the effective configuration with credentials masked.
    pub fn log_redacted(&self) {
        let backend = match &self.page_backend {
            PageBackend::Chrome { headless, .. } => format!("chrome (headless={headless})"),
            PageBackend::Browserless { base_url, token } => format!(
                "browserless ({base_url}, token={})",
                if token.is_some() { "set" } else { "unset" }
            ),
        };
        info!(
            database_url = %redact_url(&self.database_url),
            page_backend = %backend,
            cookies_file = %self.cookies_file.display(),
            nav_timeout_secs = self.nav_timeout.as_secs(),
            fetch_max_attempts = self.fetch_max_attempts,
            fetch_backoff_secs = self.fetch_backoff.as_secs(),
            fetch_backoff_multiplier = self.fetch_backoff_multiplier,
            scroll_count = self.scroll_count,
            "Configuration loaded"
        );
    }
}

fn required<F>(var: &F, key: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    var(key).ok_or(ConfigError::Missing(key))
}

fn parse_or<F, T>(var: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match var(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            value: raw,
            reason: e.to_string(),
        }),
    }
}

/// Mask the password component of a connection URL.
fn redact_url(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(mut parsed) if parsed.password().is_some() => {
            let _ = parsed.set_password(Some("***"));
            parsed.to_string()
        }
        Ok(parsed) => parsed.to_string(),
        Err(_) => "<unparseable>".to_string(),
    }
}
