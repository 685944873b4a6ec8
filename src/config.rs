use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigurationError;

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_MAX_RETRIES: u32 = 2;
const MAX_RETRIES_LIMIT: u32 = 10;
pub const DEFAULT_RECENT_COMMITS: usize = 10;

/// Settings resolved once at startup and handed to the components that need them.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub model: String,
    pub api_base: String,
    pub timeout: Duration,
    pub max_retries: u32,
    /// Bound for every "most recent commits" fallback listing
    pub recent_commits: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigurationError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("GEMINI_API_KEY")
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or(ConfigurationError::MissingApiKey)?;

        let model = lookup("VUMIT_MODEL")
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let api_base = lookup("VUMIT_API_BASE")
            .filter(|b| !b.trim().is_empty())
            .map(|b| b.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        let timeout_secs: u64 = parse_or(&lookup, "VUMIT_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            return Err(ConfigurationError::InvalidValue {
                key: "VUMIT_TIMEOUT_SECS",
                value: "0".into(),
            });
        }

        let max_retries: u32 = parse_or(&lookup, "VUMIT_MAX_RETRIES", DEFAULT_MAX_RETRIES)?;
        if max_retries > MAX_RETRIES_LIMIT {
            return Err(ConfigurationError::InvalidValue {
                key: "VUMIT_MAX_RETRIES",
                value: max_retries.to_string(),
            });
        }

        let recent_commits: usize = parse_or(&lookup, "VUMIT_RECENT_COMMITS", DEFAULT_RECENT_COMMITS)?;
        if recent_commits == 0 {
            return Err(ConfigurationError::InvalidValue {
                key: "VUMIT_RECENT_COMMITS",
                value: "0".into(),
            });
        }

        Ok(Self {
            api_key,
            model,
            api_base,
            timeout: Duration::from_secs(timeout_secs),
            max_retries,
            recent_commits,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigurationError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigurationError::InvalidValue { key, value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn missing_key_is_rejected() {
        let err = Config::from_lookup(lookup_from(&[])).unwrap_err();
        assert_eq!(err, ConfigurationError::MissingApiKey);

        let err = Config::from_lookup(lookup_from(&[("GEMINI_API_KEY", "   ")])).unwrap_err();
        assert_eq!(err, ConfigurationError::MissingApiKey);
    }

    #[test]
    fn defaults_apply() {
        let config = Config::from_lookup(lookup_from(&[("GEMINI_API_KEY", "abc")])).unwrap();
        assert_eq!(config.api_key, "abc");
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.recent_commits, 10);
    }

    #[test]
    fn overrides_are_parsed() {
        let config = Config::from_lookup(lookup_from(&[
            ("GEMINI_API_KEY", "abc"),
            ("VUMIT_MODEL", "gemini-1.5-pro"),
            ("VUMIT_API_BASE", "http://localhost:8080/v1/"),
            ("VUMIT_TIMEOUT_SECS", "5"),
            ("VUMIT_MAX_RETRIES", "0"),
            ("VUMIT_RECENT_COMMITS", "3"),
        ]))
        .unwrap();
        assert_eq!(config.model, "gemini-1.5-pro");
        assert_eq!(config.api_base, "http://localhost:8080/v1");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.max_retries, 0);
        assert_eq!(config.recent_commits, 3);
    }

    #[test]
    fn bad_numbers_are_rejected() {
        let err = Config::from_lookup(lookup_from(&[
            ("GEMINI_API_KEY", "abc"),
            ("VUMIT_TIMEOUT_SECS", "soon"),
        ]))
        .unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::InvalidValue { key: "VUMIT_TIMEOUT_SECS", value: "soon".into() }
        );

        let err = Config::from_lookup(lookup_from(&[
            ("GEMINI_API_KEY", "abc"),
            ("VUMIT_RECENT_COMMITS", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidValue { key: "VUMIT_RECENT_COMMITS", .. }));

        let err = Config::from_lookup(lookup_from(&[
            ("GEMINI_API_KEY", "abc"),
            ("VUMIT_MAX_RETRIES", "50"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidValue { key: "VUMIT_MAX_RETRIES", .. }));
    }
}
