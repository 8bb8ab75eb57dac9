//! Remote store configuration parsing from environment variables.
//!
//! Two settings are required:
//! - `SUPABASE_URL` - project URL (e.g. `https://abcd.supabase.co`)
//! - `SUPABASE_KEY` - service role key (admin access is needed to list users)

use crate::domain::errors::ConfigError;
use std::env;
use url::Url;

pub const URL_VAR: &str = "SUPABASE_URL";
pub const KEY_VAR: &str = "SUPABASE_KEY";

/// Fragments left in the sample `.env` that must be replaced before use.
const PLACEHOLDER_MARKERS: &[&str] = &["YOUR_SERVICE", "YOUR_PROJECT", "your-project"];

/// Store credentials, validated once at startup.
#[derive(Clone)]
pub struct StoreConfig {
    pub url: Url,
    pub key: String,
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("url", &self.url.as_str())
            .field("key", &"<redacted>")
            .finish()
    }
}

impl StoreConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_values(env::var(URL_VAR).ok(), env::var(KEY_VAR).ok())
    }

    pub fn from_values(url: Option<String>, key: Option<String>) -> Result<Self, ConfigError> {
        let url = required(URL_VAR, url)?;
        let key = required(KEY_VAR, key)?;

        let parsed = Url::parse(&url).map_err(|e| ConfigError::InvalidUrl {
            value: url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl {
                value: url,
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        Ok(Self { url: parsed, key })
    }

    /// Joins a path onto the project URL, keeping any path prefix the URL has.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

fn required(name: &'static str, value: Option<String>) -> Result<String, ConfigError> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing { name })?;

    if PLACEHOLDER_MARKERS.iter().any(|m| value.contains(m)) {
        return Err(ConfigError::Placeholder { name });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: Option<&str>, key: Option<&str>) -> Result<StoreConfig, ConfigError> {
        StoreConfig::from_values(url.map(String::from), key.map(String::from))
    }

    #[test]
    fn test_valid_values() {
        let cfg = config(Some("https://abcd.supabase.co"), Some("service-key")).unwrap();
        assert_eq!(cfg.key, "service-key");
        assert_eq!(
            cfg.endpoint("/rest/v1/ml_models"),
            "https://abcd.supabase.co/rest/v1/ml_models"
        );
    }

    #[test]
    fn test_missing_values() {
        assert!(matches!(
            config(None, Some("k")),
            Err(ConfigError::Missing { name: URL_VAR })
        ));
        assert!(matches!(
            config(Some("https://abcd.supabase.co"), Some("   ")),
            Err(ConfigError::Missing { name: KEY_VAR })
        ));
    }

    #[test]
    fn test_placeholder_key_is_rejected() {
        assert!(matches!(
            config(Some("https://abcd.supabase.co"), Some("YOUR_SERVICE_ROLE_KEY")),
            Err(ConfigError::Placeholder { name: KEY_VAR })
        ));
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        assert!(matches!(
            config(Some("not a url"), Some("k")),
            Err(ConfigError::InvalidUrl { .. })
        ));
        assert!(matches!(
            config(Some("ftp://abcd.supabase.co"), Some("k")),
            Err(ConfigError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_debug_redacts_key() {
        let cfg = config(Some("https://abcd.supabase.co"), Some("secret")).unwrap();
        assert!(!format!("{:?}", cfg).contains("secret"));
    }
}
