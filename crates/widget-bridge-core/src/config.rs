//! Startup configuration read from the environment.

use thiserror::Error;
use url::Url;

/// Real-time endpoint.
pub const ENV_WS_LINK: &str = "WS_LINK";
/// Base path the widget is served under.
pub const ENV_BASE: &str = "BASE";
/// Facebook application id used by the login flow.
pub const ENV_FB_APP_ID: &str = "FB_APP_ID";

/// Configuration error. Fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required!")]
    Missing(&'static str),
    #[error("{name} is not a valid URL: {source}")]
    InvalidUrl {
        name: &'static str,
        #[source]
        source: url::ParseError,
    },
    #[error("{0} must use the ws or wss scheme, got {1}")]
    UnsupportedScheme(&'static str, String),
}

/// Bridge configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Real-time endpoint. Used verbatim; credentials are never appended.
    pub ws_link: Url,
    pub base: String,
    pub fb_app_id: String,
}

impl BridgeConfig {
    /// Read configuration from process environment variables.
    ///
    /// # Errors
    /// Returns error if a required variable is missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    /// Returns error if a required variable is missing or invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |name: &'static str| {
            lookup(name)
                .filter(|value| !value.is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        let ws_link = require(ENV_WS_LINK)?;
        let ws_link = Url::parse(&ws_link).map_err(|source| ConfigError::InvalidUrl {
            name: ENV_WS_LINK,
            source,
        })?;
        if !matches!(ws_link.scheme(), "ws" | "wss") {
            return Err(ConfigError::UnsupportedScheme(
                ENV_WS_LINK,
                ws_link.scheme().to_owned(),
            ));
        }

        Ok(Self {
            ws_link,
            base: require(ENV_BASE)?,
            fb_app_id: require(ENV_FB_APP_ID)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_reads_all_variables() {
        let vars = env(&[
            (ENV_WS_LINK, "ws://remote.mock.com/"),
            (ENV_BASE, "/widget/"),
            (ENV_FB_APP_ID, "123"),
        ]);
        let config = BridgeConfig::from_lookup(|k| vars.get(k).cloned()).unwrap();

        assert_eq!(config.ws_link.as_str(), "ws://remote.mock.com/");
        assert_eq!(config.base, "/widget/");
        assert_eq!(config.fb_app_id, "123");
    }

    #[test]
    fn test_missing_variable_is_fatal() {
        let vars = env(&[(ENV_WS_LINK, "ws://remote.mock.com/"), (ENV_BASE, "/")]);
        let err = BridgeConfig::from_lookup(|k| vars.get(k).cloned()).unwrap_err();

        assert!(matches!(err, ConfigError::Missing(ENV_FB_APP_ID)));
        assert_eq!(err.to_string(), "FB_APP_ID environment variable is required!");
    }

    #[test]
    fn test_rejects_non_websocket_endpoint() {
        let vars = env(&[
            (ENV_WS_LINK, "https://remote.mock.com/"),
            (ENV_BASE, "/"),
            (ENV_FB_APP_ID, "1"),
        ]);
        let err = BridgeConfig::from_lookup(|k| vars.get(k).cloned()).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedScheme(ENV_WS_LINK, _)));

        let vars = env(&[(ENV_WS_LINK, "not a url"), (ENV_BASE, "/"), (ENV_FB_APP_ID, "1")]);
        let err = BridgeConfig::from_lookup(|k| vars.get(k).cloned()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUrl { .. }));
    }
}
