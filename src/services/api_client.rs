use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use super::auth_store::AuthStore;
use crate::config::AppConfig;

pub use reqwest::Method;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Transport(String),

    #[error("Not authorized")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Server returned {status}: {detail}")]
    Status { status: u16, detail: String },

    #[error("Unexpected response body: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    pub headers: Vec<(String, String)>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            headers: Vec::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn with_json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body).map_err(|e| ApiError::Decode(e.to_string()))?;
        self.body = Some(value);
        Ok(self)
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn set_header(&mut self, name: &str, value: String) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value));
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn json<T: Serialize>(status: u16, body: &T) -> Self {
        Self::new(status, serde_json::to_string(body).unwrap_or_default())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        let body = if self.body.trim().is_empty() {
            "null"
        } else {
            self.body.as_str()
        };
        serde_json::from_str(body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// The backend reports failures as `{"detail": "..."}`.
    pub fn detail(&self) -> String {
        serde_json::from_str::<serde_json::Value>(&self.body)
            .ok()
            .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(str::to_string))
            .unwrap_or_else(|| {
                if self.body.trim().is_empty() {
                    format!("HTTP {}", self.status)
                } else {
                    self.body.clone()
                }
            })
    }
}

/// Executes a fully prepared request. Everything above this seam (auth
/// injection, status handling, decoding) is transport independent.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(&self, base_url: &str, request: ApiRequest) -> Result<ApiResponse, ApiError>;
}

pub struct ReqwestTransport {
    client: reqwest::Client,
    timeout: Duration,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout,
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, base_url: &str, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let url = join_url(base_url, &request.path);
        let mut builder = self
            .client
            .request(request.method, &url)
            .timeout(self.timeout);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(ApiResponse { status, body })
    }
}

pub fn join_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Path without query string or surrounding slashes, so `auth/login`,
/// `/auth/login` and `/auth/login/` compare equal.
fn normalize_path(path: &str) -> &str {
    let path = path.split('?').next().unwrap_or(path);
    path.trim_matches('/')
}

/// Backend client with bearer-token injection and central 401 handling.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    public_endpoints: Arc<Vec<String>>,
    transport: Arc<dyn HttpTransport>,
    auth: AuthStore,
}

impl ApiClient {
    pub fn new(
        base_url: impl Into<String>,
        public_endpoints: Vec<String>,
        transport: Arc<dyn HttpTransport>,
        auth: AuthStore,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            public_endpoints: Arc::new(public_endpoints),
            transport,
            auth,
        }
    }

    pub fn from_config(config: &AppConfig, auth: AuthStore) -> Self {
        Self::new(
            config.api_base_url.clone(),
            config.public_endpoints.clone(),
            Arc::new(ReqwestTransport::new(config.request_timeout())),
            auth,
        )
    }

    pub fn auth(&self) -> &AuthStore {
        &self.auth
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn is_public(&self, path: &str) -> bool {
        let path = normalize_path(path);
        self.public_endpoints
            .iter()
            .any(|endpoint| normalize_path(endpoint) == path)
    }

    /// Request phase: attach the bearer token to every non-public request
    /// while a session exists.
    pub fn authorize(&self, request: &mut ApiRequest) {
        if self.is_public(&request.path) {
            request.headers.retain(|(k, _)| !k.eq_ignore_ascii_case("authorization"));
            return;
        }

        if let Some(token) = self.auth.token() {
            request.set_header("Authorization", format!("Bearer {}", token));
        }
    }

    pub async fn send(&self, mut request: ApiRequest) -> Result<ApiResponse, ApiError> {
        self.authorize(&mut request);

        let request_id = Uuid::new_v4();
        let method = request.method.clone();
        let path = request.path.clone();
        debug!(
            request_id = %request_id,
            method = %method,
            path = %path,
            authenticated = request.header("authorization").is_some(),
            "Sending request"
        );

        let response = match self.transport.execute(&self.base_url, request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(request_id = %request_id, method = %method, path = %path, error = %e, "Request failed");
                return Err(e);
            }
        };

        debug!(request_id = %request_id, status = response.status, "Received response");

        match response.status {
            s if (200..300).contains(&s) => Ok(response),
            401 => {
                // Navigation is left to the route gate
                if self.auth.logout().await {
                    warn!(request_id = %request_id, path = %path, "Server rejected credentials; session cleared");
                }
                Err(ApiError::Unauthorized)
            }
            404 => Err(ApiError::NotFound(response.detail())),
            status => Err(ApiError::Status {
                status,
                detail: response.detail(),
            }),
        }
    }

    pub async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        self.send(request).await?.decode()
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send_json(ApiRequest::get(path)).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(ApiRequest::post(path).with_json(body)?).await
    }

    pub async fn patch<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(ApiRequest::patch(path).with_json(body)?).await
    }
}
