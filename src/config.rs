//! Service configuration, read from `FLEETVIEW_*` environment variables.
//!
//! | Variable                       | Default                              |
//! |--------------------------------|--------------------------------------|
//! | `FLEETVIEW_PORT`               | `3000`                               |
//! | `FLEETVIEW_API_BASE`           | `https://track.onepointgps.com/api`  |
//! | `FLEETVIEW_LOGO_PATH`          | unset (exports carry no logo)        |
//! | `FLEETVIEW_FONT_PATH`          | unset (JPEG exports carry no text)   |
//! | `FLEETVIEW_POLL_API_HASH`      | unset (status poller disabled)       |
//! | `FLEETVIEW_FETCH_TIMEOUT_SECS` | `30`                                 |
//!
//! Unparseable numbers fall back to their defaults.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::fetcher::DEFAULT_FETCH_TIMEOUT;
use crate::upstream::TRACKING_API_BASE;

/// Default port if not specified via environment variable.
pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub port: u16,
    pub api_base: String,
    pub logo_path: Option<PathBuf>,
    pub font_path: Option<PathBuf>,

    /// Credential for the background status poller. Never logged.
    pub poll_api_hash: Option<String>,

    pub fetch_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            api_base: TRACKING_API_BASE.to_string(),
            logo_path: None,
            font_path: None,
            poll_api_hash: None,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup` (for testing).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            port: non_empty("FLEETVIEW_PORT")
                .and_then(|p| p.trim().parse().ok())
                .unwrap_or(defaults.port),
            api_base: non_empty("FLEETVIEW_API_BASE").unwrap_or(defaults.api_base),
            logo_path: non_empty("FLEETVIEW_LOGO_PATH").map(PathBuf::from),
            font_path: non_empty("FLEETVIEW_FONT_PATH").map(PathBuf::from),
            poll_api_hash: non_empty("FLEETVIEW_POLL_API_HASH"),
            fetch_timeout: non_empty("FLEETVIEW_FETCH_TIMEOUT_SECS")
                .and_then(|s| s.trim().parse::<u64>().ok())
                .filter(|s| *s > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.fetch_timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        assert_eq!(config(&[]), AppConfig::default());
        assert_eq!(AppConfig::default().port, 3000);
        assert_eq!(AppConfig::default().fetch_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_overrides() {
        let cfg = config(&[
            ("FLEETVIEW_PORT", "8080"),
            ("FLEETVIEW_API_BASE", "http://127.0.0.1:9000/api"),
            ("FLEETVIEW_LOGO_PATH", "/srv/logo.png"),
            ("FLEETVIEW_POLL_API_HASH", "abc"),
            ("FLEETVIEW_FETCH_TIMEOUT_SECS", "5"),
        ]);

        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.api_base, "http://127.0.0.1:9000/api");
        assert_eq!(cfg.logo_path, Some(PathBuf::from("/srv/logo.png")));
        assert_eq!(cfg.font_path, None);
        assert_eq!(cfg.poll_api_hash.as_deref(), Some("abc"));
        assert_eq!(cfg.fetch_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_bad_values_fall_back() {
        let cfg = config(&[
            ("FLEETVIEW_PORT", "not-a-port"),
            ("FLEETVIEW_FETCH_TIMEOUT_SECS", "0"),
            ("FLEETVIEW_POLL_API_HASH", "  "),
        ]);

        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.fetch_timeout, Duration::from_secs(30));
        assert_eq!(cfg.poll_api_hash, None);
    }
}
