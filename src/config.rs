use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::gateway::GatewayConfig;

pub struct Config {
    /// Base URL of the REST API, e.g. `http://localhost:8000/api`.
    pub api_url: String,
    /// Base URL of the web front end, used for "open in browser".
    pub web_url: String,
    pub per_page: u32,
    pub token: Option<String>,
    pub timeout: Duration,
    pub debounce: Duration,
}

impl Config {
    pub fn load() -> Result<Self> {
        Ok(Self {
            api_url: try_load("CAMPUS_SHELF_API_URL", "http://localhost:8000/api")?,
            web_url: try_load("CAMPUS_SHELF_WEB_URL", "http://localhost:5173")?,
            per_page: try_load("CAMPUS_SHELF_PER_PAGE", "9")?,
            token: env::var("CAMPUS_SHELF_TOKEN").ok().filter(|t| !t.trim().is_empty()),
            timeout: Duration::from_secs(try_load("CAMPUS_SHELF_TIMEOUT_SECS", "15")?),
            debounce: Duration::from_millis(try_load("CAMPUS_SHELF_DEBOUNCE_MS", "300")?),
        })
    }

    pub fn gateway(&self) -> GatewayConfig {
        GatewayConfig {
            base_url: self.api_url.clone(),
            per_page: self.per_page.max(1),
            bearer_token: self.token.clone(),
            timeout: self.timeout,
        }
    }

    /// Web detail page of one record, e.g. `http://localhost:5173/notes/12`.
    pub fn detail_url(&self, kind: &str, id: &str) -> String {
        format!("{}/{}/{}", self.web_url.trim_end_matches('/'), kind, id)
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    raw.trim()
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
            anyhow::anyhow!("{e}")
        })
        .with_context(|| format!("{key}={raw:?} is not valid"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_url_trims_trailing_slash() {
        let config = Config {
            api_url: "http://api".into(),
            web_url: "https://shelf.example/".into(),
            per_page: 0,
            token: None,
            timeout: Duration::from_secs(1),
            debounce: Duration::from_millis(10),
        };
        assert_eq!(config.detail_url("notes", "12"), "https://shelf.example/notes/12");
        assert_eq!(config.gateway().per_page, 1);
    }

    #[test]
    fn invalid_numbers_are_errors() {
        assert!(try_load::<u32>("CAMPUS_SHELF_TEST_UNSET_VARIABLE", "nine").is_err());
        assert_eq!(try_load::<u32>("CAMPUS_SHELF_TEST_UNSET_VARIABLE", "9").unwrap(), 9);
    }
}
