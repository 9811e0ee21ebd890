//! Process configuration for the contact API.
//! Read once at startup and shared read-only with every request.

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_RATE_LIMIT_MAX: u32 = 30;
const DEFAULT_RATE_LIMIT_WINDOW_SECONDS: u64 = 10 * 60;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Outbound SMTP settings
///
/// Required values stay optional here: their absence is reported by the
/// transport factory on each request instead of preventing startup.
#[derive(Clone, Default)]
pub struct SmtpSettings {
    pub host: Option<String>,
    pub port: u16,
    pub secure: bool,
    pub user: Option<String>,
    pub password: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub reuse_transport: bool,
}

impl SmtpSettings {
    pub fn host(&self) -> Result<&str, ConfigError> {
        self.host.as_deref().ok_or(ConfigError::MissingEnv("SMTP_HOST"))
    }

    pub fn from_address(&self) -> Result<&str, ConfigError> {
        self.from.as_deref().ok_or(ConfigError::MissingEnv("SMTP_FROM"))
    }

    pub fn to_address(&self) -> Result<&str, ConfigError> {
        self.to.as_deref().ok_or(ConfigError::MissingEnv("SMTP_TO"))
    }

    /// Credentials are only used when both user and password are present
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.user.as_deref(), self.password.as_deref()) {
            (Some(user), Some(password)) => Some((user, password)),
            _ => None,
        }
    }
}

impl fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("secure", &self.secure)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("from", &self.from)
            .field("to", &self.to)
            .field("reuse_transport", &self.reuse_transport)
            .finish()
    }
}

/// Origins accepted by the CORS layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedOrigins {
    Any,
    List(Vec<String>),
}

impl AllowedOrigins {
    fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return AllowedOrigins::Any;
        };

        let origins: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect();

        if origins.is_empty() || origins.iter().any(|origin| origin == "*") {
            AllowedOrigins::Any
        } else {
            AllowedOrigins::List(origins)
        }
    }
}

/// Sliding-window limit applied per client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_RATE_LIMIT_MAX,
            window: Duration::from_secs(DEFAULT_RATE_LIMIT_WINDOW_SECONDS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub allowed_origins: AllowedOrigins,
    pub trust_proxy: bool,
    pub smtp: SmtpSettings,
    pub rate_limit: RateLimitConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let source = Source { lookup };

        let smtp = SmtpSettings {
            host: source.string("SMTP_HOST"),
            port: source.number("SMTP_PORT", DEFAULT_SMTP_PORT),
            secure: source.flag("SMTP_SECURE", false),
            user: source.string("SMTP_USER"),
            password: source.string("SMTP_PASS"),
            from: source.string("SMTP_FROM"),
            to: source.string("SMTP_TO"),
            reuse_transport: source.flag("SMTP_REUSE_TRANSPORT", false),
        };

        let rate_limit = RateLimitConfig {
            max_requests: source.number("RATE_LIMIT_MAX", DEFAULT_RATE_LIMIT_MAX),
            window: Duration::from_secs(
                source.number("RATE_LIMIT_WINDOW_SECONDS", DEFAULT_RATE_LIMIT_WINDOW_SECONDS),
            ),
        };

        let config = Self {
            port: source.number("PORT", DEFAULT_PORT),
            allowed_origins: AllowedOrigins::parse(source.string("ALLOWED_ORIGIN").as_deref()),
            trust_proxy: source.flag("TRUST_PROXY", true),
            smtp,
            rate_limit,
        };

        info!(
            port = config.port,
            smtp_host = config.smtp.host.as_deref().unwrap_or("<unset>"),
            smtp_port = config.smtp.port,
            smtp_secure = config.smtp.secure,
            smtp_auth = config.smtp.credentials().is_some(),
            reuse_transport = config.smtp.reuse_transport,
            rate_limit_max = config.rate_limit.max_requests,
            rate_limit_window_secs = config.rate_limit.window.as_secs(),
            "Configuration loaded"
        );

        config
    }
}

struct Source<F> {
    lookup: F,
}

impl<F> Source<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn flag(&self, key: &str, default: bool) -> bool {
        match self.string(key) {
            Some(raw) => raw.eq_ignore_ascii_case("true"),
            None => default,
        }
    }

    fn number<T>(&self, key: &str, default: T) -> T
    where
        T: std::str::FromStr + PartialOrd + Default + fmt::Display + Copy,
    {
        match self.string(key) {
            Some(raw) => match raw.parse::<T>() {
                Ok(value) if value > T::default() => value,
                _ => {
                    warn!("Invalid value for {key} (`{raw}`), using default {default}");
                    default
                }
            },
            None => default,
        }
    }
}

/// Build a lookup from fixed pairs, for tests and embedding
pub fn lookup_from_pairs<'a>(
    pairs: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_unset() {
        let config = AppConfig::from_lookup(|_| None);

        assert_eq!(config.port, 3000);
        assert_eq!(config.allowed_origins, AllowedOrigins::Any);
        assert!(config.trust_proxy);
        assert_eq!(config.smtp.port, 587);
        assert!(!config.smtp.secure);
        assert!(!config.smtp.reuse_transport);
        assert_eq!(config.rate_limit.max_requests, 30);
        assert_eq!(config.rate_limit.window, Duration::from_secs(600));
    }

    #[test]
    fn missing_required_smtp_values_are_named() {
        let config = AppConfig::from_lookup(|_| None);

        assert_eq!(config.smtp.host(), Err(ConfigError::MissingEnv("SMTP_HOST")));
        assert_eq!(
            config.smtp.from_address(),
            Err(ConfigError::MissingEnv("SMTP_FROM"))
        );
        assert_eq!(config.smtp.to_address(), Err(ConfigError::MissingEnv("SMTP_TO")));
    }

    #[test]
    fn empty_values_count_as_unset() {
        let config = AppConfig::from_lookup(lookup_from_pairs([
            ("SMTP_HOST", "   "),
            ("PORT", ""),
        ]));

        assert!(config.smtp.host.is_none());
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn secure_flag_only_accepts_true() {
        let on = AppConfig::from_lookup(lookup_from_pairs([("SMTP_SECURE", "TRUE")]));
        let off = AppConfig::from_lookup(lookup_from_pairs([("SMTP_SECURE", "yes")]));

        assert!(on.smtp.secure);
        assert!(!off.smtp.secure);
    }

    #[test]
    fn invalid_numbers_fall_back_to_defaults() {
        let config = AppConfig::from_lookup(lookup_from_pairs([
            ("SMTP_PORT", "not-a-port"),
            ("RATE_LIMIT_MAX", "0"),
            ("PORT", "8080"),
        ]));

        assert_eq!(config.smtp.port, 587);
        assert_eq!(config.rate_limit.max_requests, 30);
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn credentials_require_user_and_password() {
        let only_user = AppConfig::from_lookup(lookup_from_pairs([("SMTP_USER", "relay")]));
        let both = AppConfig::from_lookup(lookup_from_pairs([
            ("SMTP_USER", "relay"),
            ("SMTP_PASS", "hunter2"),
        ]));

        assert_eq!(only_user.smtp.credentials(), None);
        assert_eq!(both.smtp.credentials(), Some(("relay", "hunter2")));
    }

    #[test]
    fn debug_output_redacts_password() {
        let config = AppConfig::from_lookup(lookup_from_pairs([("SMTP_PASS", "hunter2")]));
        let rendered = format!("{:?}", config.smtp);

        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn allowed_origin_accepts_lists_and_wildcard() {
        let list = AppConfig::from_lookup(lookup_from_pairs([(
            "ALLOWED_ORIGIN",
            "https://pilot999.example, https://www.pilot999.example",
        )]));
        let wildcard = AppConfig::from_lookup(lookup_from_pairs([("ALLOWED_ORIGIN", "*")]));

        assert_eq!(
            list.allowed_origins,
            AllowedOrigins::List(vec![
                "https://pilot999.example".to_string(),
                "https://www.pilot999.example".to_string(),
            ])
        );
        assert_eq!(wildcard.allowed_origins, AllowedOrigins::Any);
    }
}
