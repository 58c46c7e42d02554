//! Client configuration from the environment.
//!
//! | Variable             | Default                                      |
//! |----------------------|----------------------------------------------|
//! | `STOCKCART_API_URL`  | `http://localhost:5000`                      |
//! | `STOCKCART_WS_URL`   | API URL with `ws`/`wss` scheme, path `/ws`   |
//! | `STOCKCART_KEY_FILE` | `<config dir>/stockcart/session_key`         |
//!
//! The defaults only make sense against a relay running locally.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;

use crate::channel::ReconnectPolicy;
use crate::error::ConfigError;

pub const DEFAULT_API_URL: &str = "http://localhost:5000";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: String,
    pub ws_url: String,
    pub key_file: PathBuf,
    pub request_timeout: Duration,
    pub reconnect: ReconnectPolicy,
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from an arbitrary variable lookup (tests pass a map).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let api_url = var("STOCKCART_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let ws_url = match var("STOCKCART_WS_URL") {
            Some(url) => url,
            None => default_ws_url(&api_url)?,
        };
        let key_file = var("STOCKCART_KEY_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(default_key_file);

        let config = Self {
            api_url,
            ws_url,
            key_file,
            request_timeout: REQUEST_TIMEOUT,
            reconnect: ReconnectPolicy::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Applies command-line overrides on top of the environment.
    pub fn with_overrides(
        mut self,
        api_url: Option<String>,
        ws_url: Option<String>,
        key_file: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        if let Some(api_url) = api_url {
            self.api_url = api_url;
        }
        if let Some(ws_url) = ws_url {
            self.ws_url = ws_url;
        }
        if let Some(key_file) = key_file {
            self.key_file = key_file;
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        check_scheme("STOCKCART_API_URL", &self.api_url, &["http", "https"], "http/https")?;
        check_scheme("STOCKCART_WS_URL", &self.ws_url, &["ws", "wss"], "ws/wss")?;
        Ok(())
    }
}

/// Realtime endpoint derived from the API base: `http://h:p` -> `ws://h:p/ws`.
pub fn default_ws_url(api_url: &str) -> Result<String, ConfigError> {
    let mut url = Url::parse(api_url).map_err(|_| ConfigError::InvalidUrl {
        name: "STOCKCART_API_URL",
        value: api_url.to_string(),
    })?;
    let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
    let unsupported = || ConfigError::UnsupportedScheme {
        name: "STOCKCART_API_URL",
        value: api_url.to_string(),
        expected: "http/https",
    };
    url.set_scheme(scheme).map_err(|_| unsupported())?;
    let path = format!("{}/ws", url.path().trim_end_matches('/'));
    url.set_path(&path);
    Ok(url.to_string())
}

pub fn default_key_file() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("stockcart")
        .join("session_key")
}

fn check_scheme(
    name: &'static str,
    value: &str,
    allowed: &[&str],
    expected: &'static str,
) -> Result<(), ConfigError> {
    let url = Url::parse(value).map_err(|_| ConfigError::InvalidUrl {
        name,
        value: value.to_string(),
    })?;
    if !allowed.contains(&url.scheme()) {
        return Err(ConfigError::UnsupportedScheme {
            name,
            value: value.to_string(),
            expected,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_point_at_local_relay() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.api_url, "http://localhost:5000");
        assert_eq!(config.ws_url, "ws://localhost:5000/ws");
        assert!(config.key_file.ends_with("stockcart/session_key"));
    }

    #[test]
    fn ws_url_follows_api_scheme_and_path() {
        assert_eq!(
            default_ws_url("https://estoque.example.com/api/").unwrap(),
            "wss://estoque.example.com/api/ws"
        );
    }

    #[test]
    fn explicit_values_win() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("STOCKCART_API_URL", "http://10.0.0.5:8000"),
            ("STOCKCART_WS_URL", "ws://10.0.0.5:8001/socket"),
            ("STOCKCART_KEY_FILE", "/tmp/key"),
        ]))
        .unwrap();
        assert_eq!(config.api_url, "http://10.0.0.5:8000");
        assert_eq!(config.ws_url, "ws://10.0.0.5:8001/socket");
        assert_eq!(config.key_file, PathBuf::from("/tmp/key"));
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = ClientConfig::from_lookup(lookup(&[("STOCKCART_API_URL", "  ")])).unwrap();
        assert_eq!(config.api_url, DEFAULT_API_URL);
    }

    #[test]
    fn rejects_wrong_schemes() {
        let err = ClientConfig::from_lookup(lookup(&[("STOCKCART_WS_URL", "http://localhost/ws")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedScheme { name: "STOCKCART_WS_URL", .. }));

        let err = ClientConfig::from_lookup(lookup(&[("STOCKCART_API_URL", "not a url")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUrl { .. }));
    }

    #[test]
    fn overrides_are_validated() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        let err = config
            .clone()
            .with_overrides(None, Some("ftp://x".into()), None)
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedScheme { .. }));

        let config = config
            .with_overrides(Some("http://127.0.0.1:9".into()), None, None)
            .unwrap();
        assert_eq!(config.api_url, "http://127.0.0.1:9");
    }
}
