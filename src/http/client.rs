use reqwest::{Client, Method, RequestBuilder, Response, header};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::storage::{Store, keys};

/// Thin wrapper over reqwest bound to one backend origin. Every request
/// picks up the bearer token currently in storage.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    store: Store,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout_secs: Option<u64>, store: Store) -> Result<Self> {
        let mut builder = Client::builder().danger_accept_invalid_certs(false);
        if let Some(secs) = timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build()?;

        let base_url = base_url.trim_end_matches('/').to_string();

        Ok(Self {
            client,
            base_url,
            store,
        })
    }

    pub fn from_config(config: &Config, store: Store) -> Result<Self> {
        Self::new(&config.base_url, config.timeout_secs, store)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Request with JSON headers and, when a token is stored, a bearer
    /// `Authorization` header. A missing token never blocks the request.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = self.url(path);
        let mut request = self
            .client
            .request(method.clone(), &url)
            .header(header::ACCEPT, "application/json")
            .header(header::CONTENT_TYPE, "application/json");

        match self.store.get(keys::AUTH_TOKEN) {
            Ok(Some(token)) => {
                debug!(%method, %url, "attaching bearer credential");
                request = request.bearer_auth(token);
            }
            Ok(None) => debug!(%method, %url, "no stored credential"),
            Err(e) => debug!(%method, %url, error = %e, "credential unreadable, sending without it"),
        }

        request
    }

    /// Sends and turns any non-2xx status into [`Error::Backend`], using the
    /// backend's `detail` field or `fallback` as the message.
    pub async fn send(&self, request: RequestBuilder, fallback: &str) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let bytes = response.bytes().await.unwrap_or_default();
        let message = extract_detail(&bytes).unwrap_or_else(|| fallback.to_string());
        debug!(status = status.as_u16(), %message, "backend rejected request");

        Err(Error::Backend {
            status: status.as_u16(),
            message,
        })
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str, fallback: &str) -> Result<Option<T>> {
        let response = self.send(self.request(Method::GET, path), fallback).await?;
        read_json(response).await
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B, fallback: &str) -> Result<Option<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.request(Method::POST, path).json(body);
        let response = self.send(request, fallback).await?;
        read_json(response).await
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// Parses a JSON body. Empty bodies and a literal `null` come back as `None`.
pub async fn read_json<T: DeserializeOwned>(response: Response) -> Result<Option<T>> {
    let bytes = response.bytes().await?;
    parse_json_body(&bytes)
}

pub fn parse_json_body<T: DeserializeOwned>(bytes: &[u8]) -> Result<Option<T>> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    let value: serde_json::Value = serde_json::from_slice(bytes)?;
    if value.is_null() {
        return Ok(None);
    }

    Ok(Some(serde_json::from_value(value)?))
}

/// Pulls a human-readable message out of a FastAPI-style error body:
/// `{"detail": "..."}` or `{"detail": [{"msg": "..."}, ...]}`.
pub fn extract_detail(bytes: &[u8]) -> Option<String> {
    let body: serde_json::Value = serde_json::from_slice(bytes).ok()?;
    let detail = body.get("detail")?;

    let message = match detail {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Array(items) => items
            .iter()
            .map(|item| match item.get("msg").and_then(|m| m.as_str()) {
                Some(msg) => msg.to_string(),
                None => item.as_str().map(String::from).unwrap_or_else(|| item.to_string()),
            })
            .collect::<Vec<_>>()
            .join("; "),
        serde_json::Value::Null => return None,
        other => other.to_string(),
    };

    let message = message.trim().to_string();
    if message.is_empty() { None } else { Some(message) }
}
