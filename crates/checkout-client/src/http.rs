//! JSON transport
//!
//! Thin `reqwest` wrapper. Every non-2xx response and every network fault
//! comes back as `CheckoutError::Transport(ApiError)`; nothing is retried.

use checkout_core::{ApiError, CheckoutError, Result};
use reqwest::{Method, RequestBuilder, Response, Url, header};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::config::ClientConfig;

/// Shared HTTP client bound to one base URL
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| CheckoutError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let request = self.http.get(self.url(path));
        self.send(Method::GET, path, request).await
    }

    /// GET `{base}/{prefix}/{segment}`, with `segment` percent-encoded as a
    /// single path segment
    pub async fn get_segment<T: DeserializeOwned>(&self, prefix: &str, segment: &str) -> Result<T> {
        let url = self.segment_url(prefix, segment)?;
        let path = url.path().to_string();
        let request = self.http.get(url);
        self.send(Method::GET, &path, request).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.http.post(self.url(path)).json(body);
        self.send(Method::POST, path, request).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn segment_url(&self, prefix: &str, segment: &str) -> Result<Url> {
        let mut url = Url::parse(&self.url(prefix))
            .map_err(|e| CheckoutError::Config(format!("Invalid API URL: {e}")))?;
        let url_display = url.to_string();
        url.path_segments_mut()
            .map_err(|()| {
                CheckoutError::Config(format!("API URL cannot take a path: {url_display}"))
            })?
            .pop_if_empty()
            .push(segment);
        Ok(url)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        request: RequestBuilder,
    ) -> Result<T> {
        tracing::debug!(%method, path, "Calling checkout API");

        let response = request.send().await.map_err(|e| {
            tracing::warn!(%method, path, error = %e, "Checkout API unreachable");
            CheckoutError::Transport(ApiError::network(e.to_string()))
        })?;

        let status = response.status();
        let data = read_body(response).await?;

        if !status.is_success() {
            let err = ApiError::from_response(status.as_u16(), Some(data));
            tracing::warn!(%method, path, status = status.as_u16(), message = %err.message, "Checkout API error");
            return Err(CheckoutError::Transport(err));
        }

        serde_json::from_value(data)
            .map_err(|e| CheckoutError::Decode(format!("{method} {path}: {e}")))
    }
}

/// JSON bodies are parsed, anything else is kept as a string
async fn read_body(response: Response) -> Result<Value> {
    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("application/json"));

    let bytes = response
        .bytes()
        .await
        .map_err(|e| CheckoutError::Transport(ApiError::network(e.to_string())))?;

    if is_json {
        if let Ok(value) = serde_json::from_slice(&bytes) {
            return Ok(value);
        }
    }
    Ok(Value::String(String::from_utf8_lossy(&bytes).into_owned()))
}
