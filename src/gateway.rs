use std::marker::PhantomData;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use serde_json::Value;

use crate::envelope::{normalize_item, normalize_page};
use crate::error::GatewayError;
use crate::filter::FilterState;
use crate::types::{CatalogItem, HealthStatus, ItemId, PageResult, Resource};

/// Page size the web client has always requested.
pub const DEFAULT_PER_PAGE: u32 = 9;

/// Source of catalog pages. One gateway serves one collection.
#[async_trait]
pub trait CollectionGateway: Send + Sync + 'static {
    type Item: CatalogItem + Clone + Send + Sync + 'static;

    async fn fetch_page(
        &self,
        page: u32,
        filter: &FilterState,
    ) -> Result<PageResult<Self::Item>, GatewayError>;
}

/// Everything a gateway needs to reach the API. Auth travels here
/// explicitly instead of being read from ambient state.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub per_page: u32,
    pub bearer_token: Option<String>,
    pub timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            per_page: DEFAULT_PER_PAGE,
            bearer_token: None,
            timeout: Duration::from_secs(15),
        }
    }
}

impl GatewayConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Join `path` onto the base URL with exactly one slash between them.
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// REST gateway for the public collection of `T`.
pub struct HttpGateway<T> {
    client: reqwest::Client,
    config: GatewayConfig,
    _record: PhantomData<fn() -> T>,
}

impl<T: Resource> HttpGateway<T> {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let client = build_client(&config)?;
        Ok(Self::with_client(client, config))
    }

    /// Share one connection pool across the gateways of several collections.
    pub fn with_client(client: reqwest::Client, config: GatewayConfig) -> Self {
        Self {
            client,
            config,
            _record: PhantomData,
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Fetch a single record for its detail view.
    pub async fn fetch_item(&self, id: &ItemId) -> Result<T, GatewayError> {
        let path = format!("{}/{}", T::KIND.collection_path(), id);
        let body = get_json(&self.client, &self.config, &path, &[]).await?;
        normalize_item(body, T::KIND)
    }
}

#[async_trait]
impl<T: Resource> CollectionGateway for HttpGateway<T> {
    type Item = T;

    async fn fetch_page(&self, page: u32, filter: &FilterState) -> Result<PageResult<T>, GatewayError> {
        let mut params = vec![
            ("page", page.to_string()),
            ("per_page", self.config.per_page.to_string()),
        ];
        params.extend(filter.query_params());

        let body = get_json(&self.client, &self.config, &T::KIND.collection_path(), &params).await?;
        normalize_page(body, T::KIND, page, self.config.per_page)
    }
}

/// Build the HTTP client every gateway uses: JSON in, AJAX marker, timeout.
pub fn build_client(config: &GatewayConfig) -> Result<reqwest::Client, GatewayError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert("X-Requested-With", HeaderValue::from_static("XMLHttpRequest"));
    Ok(reqwest::Client::builder()
        .default_headers(headers)
        .timeout(config.timeout)
        .build()?)
}

/// Probe `GET /v1/health`. Never fails: an unreachable backend is offline.
pub async fn check_health(client: &reqwest::Client, config: &GatewayConfig) -> HealthStatus {
    let offline = |status: &str| HealthStatus {
        online: false,
        status: status.to_string(),
    };
    match get_json(client, config, "v1/health", &[]).await {
        Ok(body) => match body.get("status").and_then(Value::as_str) {
            Some("OK") => HealthStatus {
                online: true,
                status: "OK".to_string(),
            },
            _ => offline("Unexpected response"),
        },
        Err(e) => {
            tracing::warn!("Health check failed: {e}");
            offline("Error")
        }
    }
}

async fn get_json(
    client: &reqwest::Client,
    config: &GatewayConfig,
    path: &str,
    params: &[(&str, String)],
) -> Result<Value, GatewayError> {
    let mut request = client.get(config.url(path)).query(params);
    if let Some(token) = &config.bearer_token {
        request = request.bearer_auth(token);
    }

    let response = request.send().await?;
    let status = response.status();
    let bytes = response.bytes().await?;

    if !status.is_success() {
        return Err(GatewayError::Status {
            status: status.as_u16(),
            message: error_message(&bytes)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string()),
        });
    }

    serde_json::from_slice(&bytes).map_err(|e| GatewayError::Malformed(format!("invalid JSON body: {e}")))
}

/// The API reports failures as `{"message": ..}` or `{"error": ..}`.
fn error_message(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    ["message", "error"]
        .into_iter()
        .find_map(|key| value.get(key).and_then(Value::as_str))
        .map(str::to_string)
}
