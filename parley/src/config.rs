//! Environment-driven application settings.
//!
//! ```rust
//! use std::time::Duration;
//!
//! use parley::{AppConfig, SequencePolicy, SecretString, StoreConfig};
//!
//! let config = AppConfig::new(SecretString::new("not-a-real-key"))
//!     .with_store(StoreConfig::InMemory)
//!     .with_provider_timeout(Duration::from_secs(30))
//!     .with_anthropic_sequence_policy(SequencePolicy::Reject);
//!
//! assert_eq!(config.store, StoreConfig::InMemory);
//! assert!(config.serialize_turns);
//! ```

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

use pmemory::{StoreConfig, default_sqlite_path};
use pprovider::{DEFAULT_PROVIDER_TIMEOUT, SecretString, SequencePolicy};

pub const ENCRYPTION_KEY_VAR: &str = "FIELD_ENCRYPTION_KEY";
pub const STORE_VAR: &str = "PARLEY_STORE";
pub const SQLITE_PATH_VAR: &str = "PARLEY_SQLITE_PATH";
pub const PROVIDER_TIMEOUT_VAR: &str = "PARLEY_PROVIDER_TIMEOUT_SECS";
pub const SEQUENCE_POLICY_VAR: &str = "PARLEY_ANTHROPIC_SEQUENCE_POLICY";
pub const SERIALIZE_TURNS_VAR: &str = "PARLEY_SERIALIZE_TURNS";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigErrorKind {
    MissingSetting,
    InvalidSetting,
    Startup,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub kind: ConfigErrorKind,
    pub message: String,
}

impl ConfigError {
    pub fn new(kind: ConfigErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn missing(name: &str) -> Self {
        Self::new(
            ConfigErrorKind::MissingSetting,
            format!("{name} must be set"),
        )
    }

    pub fn invalid(name: &str, value: &str, expected: &str) -> Self {
        Self::new(
            ConfigErrorKind::InvalidSetting,
            format!("{name} has invalid value '{value}', expected {expected}"),
        )
    }

    pub fn startup(message: impl Into<String>) -> Self {
        Self::new(ConfigErrorKind::Startup, message)
    }
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub encryption_key: SecretString,
    pub store: StoreConfig,
    pub provider_timeout: Duration,
    pub anthropic_sequence_policy: SequencePolicy,
    pub serialize_turns: bool,
}

impl AppConfig {
    pub fn new(encryption_key: SecretString) -> Self {
        Self {
            encryption_key,
            store: StoreConfig::default(),
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
            anthropic_sequence_policy: SequencePolicy::default(),
            serialize_turns: true,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds settings from any name-to-value lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let encryption_key = read(ENCRYPTION_KEY_VAR)
            .map(SecretString::new)
            .ok_or_else(|| ConfigError::missing(ENCRYPTION_KEY_VAR))?;
        let mut config = Self::new(encryption_key);

        let sqlite_path = read(SQLITE_PATH_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(default_sqlite_path);
        config.store = match read(STORE_VAR).as_deref().map(str::to_ascii_lowercase) {
            None => StoreConfig::Sqlite { path: sqlite_path },
            Some(value) => match value.as_str() {
                "sqlite" => StoreConfig::Sqlite { path: sqlite_path },
                "memory" | "in-memory" | "in_memory" => StoreConfig::InMemory,
                _ => return Err(ConfigError::invalid(STORE_VAR, &value, "'sqlite' or 'memory'")),
            },
        };

        if let Some(value) = read(PROVIDER_TIMEOUT_VAR) {
            let seconds = value
                .parse::<u64>()
                .ok()
                .filter(|seconds| *seconds > 0)
                .ok_or_else(|| {
                    ConfigError::invalid(PROVIDER_TIMEOUT_VAR, &value, "a positive number of seconds")
                })?;
            config.provider_timeout = Duration::from_secs(seconds);
        }

        if let Some(value) = read(SEQUENCE_POLICY_VAR) {
            config.anthropic_sequence_policy = SequencePolicy::parse(&value).ok_or_else(|| {
                ConfigError::invalid(SEQUENCE_POLICY_VAR, &value, "'warn' or 'reject'")
            })?;
        }

        if let Some(value) = read(SERIALIZE_TURNS_VAR) {
            config.serialize_turns = parse_bool(&value)
                .ok_or_else(|| ConfigError::invalid(SERIALIZE_TURNS_VAR, &value, "a boolean"))?;
        }

        Ok(config)
    }

    pub fn with_store(mut self, store: StoreConfig) -> Self {
        self.store = store;
        self
    }

    pub fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = timeout;
        self
    }

    pub fn with_anthropic_sequence_policy(mut self, policy: SequencePolicy) -> Self {
        self.anthropic_sequence_policy = policy;
        self
    }

    pub fn with_serialize_turns(mut self, serialize_turns: bool) -> Self {
        self.serialize_turns = serialize_turns;
        self
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let values = pairs
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect::<HashMap<_, _>>();
        move |name: &str| values.get(name).cloned()
    }

    #[test]
    fn missing_encryption_key_is_rejected() {
        let error = AppConfig::from_lookup(lookup(&[(STORE_VAR, "memory")]))
            .expect_err("config should fail");

        assert_eq!(error.kind, ConfigErrorKind::MissingSetting);
        assert!(error.message.contains(ENCRYPTION_KEY_VAR));
    }

    #[test]
    fn defaults_apply_when_only_key_is_set() {
        let config = AppConfig::from_lookup(lookup(&[(ENCRYPTION_KEY_VAR, "key")]))
            .expect("config should load");

        assert_eq!(config.encryption_key.expose(), "key");
        assert!(matches!(config.store, StoreConfig::Sqlite { .. }));
        assert_eq!(config.provider_timeout, Duration::from_secs(90));
        assert_eq!(config.anthropic_sequence_policy, SequencePolicy::Warn);
        assert!(config.serialize_turns);
    }

    #[test]
    fn explicit_settings_override_defaults() {
        let config = AppConfig::from_lookup(lookup(&[
            (ENCRYPTION_KEY_VAR, "key"),
            (STORE_VAR, "sqlite"),
            (SQLITE_PATH_VAR, "/tmp/parley-test.sqlite3"),
            (PROVIDER_TIMEOUT_VAR, "15"),
            (SEQUENCE_POLICY_VAR, "Reject"),
            (SERIALIZE_TURNS_VAR, "false"),
        ]))
        .expect("config should load");

        assert_eq!(
            config.store,
            StoreConfig::Sqlite {
                path: PathBuf::from("/tmp/parley-test.sqlite3")
            }
        );
        assert_eq!(config.provider_timeout, Duration::from_secs(15));
        assert_eq!(config.anthropic_sequence_policy, SequencePolicy::Reject);
        assert!(!config.serialize_turns);
    }

    #[test]
    fn memory_store_ignores_sqlite_path() {
        let config = AppConfig::from_lookup(lookup(&[
            (ENCRYPTION_KEY_VAR, "key"),
            (STORE_VAR, "memory"),
            (SQLITE_PATH_VAR, "/tmp/unused.sqlite3"),
        ]))
        .expect("config should load");

        assert_eq!(config.store, StoreConfig::InMemory);
    }

    #[test]
    fn invalid_values_name_the_setting() {
        for (name, value) in [
            (STORE_VAR, "postgres"),
            (PROVIDER_TIMEOUT_VAR, "0"),
            (PROVIDER_TIMEOUT_VAR, "soon"),
            (SEQUENCE_POLICY_VAR, "ignore"),
            (SERIALIZE_TURNS_VAR, "maybe"),
        ] {
            let error = AppConfig::from_lookup(lookup(&[(ENCRYPTION_KEY_VAR, "key"), (name, value)]))
                .expect_err("config should fail");
            assert_eq!(error.kind, ConfigErrorKind::InvalidSetting);
            assert!(error.message.contains(name), "{error}");
        }
    }

    #[test]
    fn debug_output_hides_the_key() {
        let config = AppConfig::new(SecretString::new("super-secret"));
        assert!(!format!("{config:?}").contains("super-secret"));
    }
}
