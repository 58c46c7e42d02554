//! Request/response calls against the inventory backend.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use stockcart_types::{CartItem, MovementFilter, Product, ProductQuery, SessionKey};
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::ClientError;

/// Longest plain-text error body passed through to the user.
const MAX_PLAIN_ERROR_LEN: usize = 200;

/// The backend calls the client state depends on.
#[async_trait]
pub trait InventoryApi: Send + Sync {
    async fn search_movements(&self, filter: &MovementFilter) -> Result<Vec<CartItem>, ClientError>;
    async fn find_product(&self, query: &ProductQuery) -> Result<Product, ClientError>;
    async fn fetch_cart(&self, key: &SessionKey) -> Result<Vec<CartItem>, ClientError>;
}

#[derive(Debug, Clone)]
pub struct QueryClient {
    http: Client,
    base_url: String,
}

impl QueryClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|source| ClientError::Network {
                url: config.api_url.clone(),
                source,
            })?;
        Ok(Self::with_client(http, &config.api_url))
    }

    pub fn with_client(http: Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl InventoryApi for QueryClient {
    async fn search_movements(
        &self,
        filter: &MovementFilter,
    ) -> Result<Vec<CartItem>, ClientError> {
        let url = self.url("/movimentacoes");
        debug!(%url, ?filter, "searching movements");
        let response = self
            .http
            .get(&url)
            .query(&filter.query_pairs())
            .send()
            .await
            .map_err(|source| ClientError::Network { url: url.clone(), source })?;
        decode(url, response).await
    }

    async fn find_product(&self, query: &ProductQuery) -> Result<Product, ClientError> {
        let url = self.url("/buscar_produto");
        debug!(%url, valor = %query.as_text(), "looking up product");
        let response = self
            .http
            .post(&url)
            .json(&serde_json::json!({ "valor": query }))
            .send()
            .await
            .map_err(|source| ClientError::Network { url: url.clone(), source })?;
        decode(url, response).await
    }

    async fn fetch_cart(&self, key: &SessionKey) -> Result<Vec<CartItem>, ClientError> {
        let url = self.url(&format!("/carrinho/{}", urlencoding::encode(key.as_str())));
        debug!(%url, "fetching cart");
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|source| ClientError::Network { url: url.clone(), source })?;
        decode(url, response).await
    }
}

async fn decode<T: DeserializeOwned>(url: String, response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ClientError::Status {
            url,
            status: status.as_u16(),
            message: extract_error_message(&body),
        });
    }
    response
        .json::<T>()
        .await
        .map_err(|source| ClientError::Decode { url, source })
}

/// Best-effort error text from a failed response body.
///
/// JSON bodies are searched for the usual message fields; short plain-text
/// bodies are used as-is; HTML error pages are ignored.
pub fn extract_error_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        return ["erro", "error", "mensagem", "message", "detail"]
            .iter()
            .find_map(|field| value.get(field).and_then(|v| v.as_str()))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
    }

    if body.starts_with('<') || body.len() > MAX_PLAIN_ERROR_LEN {
        return None;
    }
    Some(body.to_string())
}
