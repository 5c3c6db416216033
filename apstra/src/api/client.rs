use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::common::{ApiErrorDetails, ApiErrorResponse, ApiQueryParams};
use super::error::ApiError;
use super::transport::{Attempt, RequestStats, StatsRecorder, TransportConfig};

/// Header carrying the session token returned by `/api/aaa/login`
pub const AUTH_TOKEN_HEADER: &str = "AuthToken";

const LOGIN_PATH: &str = "/api/aaa/login";

/// Apstra API client
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
    auth_token: RwLock<Option<String>>,
    retry_config: RetryConfig,
    stats: StatsRecorder,
}

#[derive(Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub timeout_seconds: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 10000,
            timeout_seconds: 30,
        }
    }
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
}

impl Client {
    /// Create a new API client with default configuration. No request is
    /// made until [`Client::login`].
    pub fn new(url: &str, username: &str, password: &str, insecure: bool) -> Result<Self, ApiError> {
        Self::with_config(url, username, password, insecure, RetryConfig::default())
    }

    /// Create a new API client with custom retry configuration
    pub fn with_config(
        url: &str,
        username: &str,
        password: &str,
        insecure: bool,
        retry_config: RetryConfig,
    ) -> Result<Self, ApiError> {
        let parsed = url::Url::parse(url)?;

        let transport = TransportConfig {
            request_timeout: std::time::Duration::from_secs(retry_config.timeout_seconds),
            ..Default::default()
        };
        let http_client = transport.build_client(insecure)?;

        let base_url = parsed.as_str().trim_end_matches('/').to_string();

        Ok(Self {
            inner: Arc::new(ClientInner {
                http_client,
                base_url,
                username: username.to_string(),
                password: password.to_string(),
                auth_token: RwLock::new(None),
                retry_config,
                stats: StatsRecorder::default(),
            }),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Authenticates and keeps the session token for later requests
    pub async fn login(&self) -> Result<(), ApiError> {
        let body = LoginRequest {
            username: &self.inner.username,
            password: &self.inner.password,
        };
        let response: LoginResponse = self.send(Method::POST, LOGIN_PATH, Some(&body)).await?;
        *self.inner.auth_token.write().await = Some(response.token);
        tracing::info!("logged in to {} as {}", self.inner.base_url, self.inner.username);
        Ok(())
    }

    pub async fn is_logged_in(&self) -> bool {
        self.inner.auth_token.read().await.is_some()
    }

    /// Execute a GET request with retry logic
    pub async fn get<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, ApiError> {
        self.send::<T, ()>(Method::GET, path, None).await
    }

    /// Execute a GET request with query parameters
    pub async fn get_with_params<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        params: &ApiQueryParams,
    ) -> Result<T, ApiError> {
        let full_path = format!("{}{}", path, params.to_query_string());
        self.get(&full_path).await
    }

    /// Execute a POST request with retry logic
    pub async fn post<T: for<'de> Deserialize<'de>, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.send(Method::POST, path, Some(body)).await
    }

    /// Execute a PUT request with retry logic
    pub async fn put<T: for<'de> Deserialize<'de>, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.send(Method::PUT, path, Some(body)).await
    }

    /// Execute a DELETE request with retry logic
    pub async fn delete<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, ApiError> {
        self.send::<T, ()>(Method::DELETE, path, None).await
    }

    /// Execute a DELETE request with query parameters
    pub async fn delete_with_params<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        params: &ApiQueryParams,
    ) -> Result<T, ApiError> {
        let full_path = format!("{}{}", path, params.to_query_string());
        self.delete(&full_path).await
    }

    /// Attempt counters since the client was built
    pub async fn request_stats(&self) -> RequestStats {
        self.inner.stats.snapshot().await
    }

    /// ASN, VNI, integer and IP pool operations
    pub fn resources(&self) -> crate::api::resources::ResourcesApi<'_> {
        crate::api::resources::ResourcesApi::new(self)
    }

    /// System agent operations
    pub fn system_agents(&self) -> crate::api::system_agents::SystemAgentsApi<'_> {
        crate::api::system_agents::SystemAgentsApi::new(self)
    }

    /// System agent profile operations
    pub fn agent_profiles(&self) -> crate::api::agent_profiles::AgentProfilesApi<'_> {
        crate::api::agent_profiles::AgentProfilesApi::new(self)
    }

    /// Managed system operations
    pub fn systems(&self) -> crate::api::systems::SystemsApi<'_> {
        crate::api::systems::SystemsApi::new(self)
    }

    /// Connectivity template operations within one blueprint
    pub fn connectivity_templates<'a>(
        &'a self,
        blueprint_id: &'a str,
    ) -> crate::api::connectivity_templates::ConnectivityTemplatesApi<'a> {
        crate::api::connectivity_templates::ConnectivityTemplatesApi::new(self, blueprint_id)
    }

    async fn send<T, B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T, ApiError>
    where
        T: for<'de> Deserialize<'de>,
        B: Serialize,
    {
        let token = self.inner.auth_token.read().await.clone();
        let url = format!("{}{}", self.inner.base_url, path);

        self.execute_with_retry(
            || {
                tracing::debug!("{} request to: {}", method, url);

                let mut request = self.inner.http_client.request(method.clone(), &url);
                if let Some(token) = &token {
                    request = request.header(AUTH_TOKEN_HEADER, token);
                }
                if let Some(body) = body {
                    request = request.json(body);
                }
                request.send()
            },
            path,
        )
        .await
    }

    /// Execute request with retry logic
    async fn execute_with_retry<F, Fut, T>(&self, request_fn: F, path: &str) -> Result<T, ApiError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<reqwest::Response, reqwest::Error>>,
        T: for<'de> Deserialize<'de>,
    {
        let mut attempt = 0;
        let mut last_error = None;

        while attempt <= self.inner.retry_config.max_retries {
            if attempt > 0 {
                let backoff = std::cmp::min(
                    self.inner.retry_config.initial_backoff_ms * (2_u64.pow(attempt - 1)),
                    self.inner.retry_config.max_backoff_ms,
                );
                tracing::debug!(
                    "Retrying request to {} after {}ms (attempt {})",
                    path,
                    backoff,
                    attempt
                );
                tokio::time::sleep(tokio::time::Duration::from_millis(backoff)).await;
            }

            let retry = attempt > 0;
            match request_fn().await {
                Ok(response) => {
                    let status = response.status();
                    self.inner
                        .stats
                        .record(Attempt::Status(status.as_u16()), retry)
                        .await;

                    if status.is_success() {
                        return self.parse_success_response(response).await;
                    }

                    if status == reqwest::StatusCode::UNAUTHORIZED {
                        return Err(ApiError::AuthError);
                    }

                    if status == reqwest::StatusCode::NOT_FOUND {
                        return Err(ApiError::NotFound(path.to_string()));
                    }

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        last_error = Some(ApiError::RateLimited);
                    } else if status.is_server_error() {
                        last_error = Some(ApiError::ServiceUnavailable);
                    } else {
                        return self.handle_error_response(response).await;
                    }
                }
                Err(e) => {
                    self.inner.stats.record(Attempt::Transport, retry).await;

                    if e.is_timeout() {
                        last_error =
                            Some(ApiError::Timeout(self.inner.retry_config.timeout_seconds));
                    } else if e.is_connect() || e.is_request() {
                        last_error = Some(ApiError::ServiceUnavailable);
                    } else {
                        return Err(ApiError::RequestError(e));
                    }
                }
            }

            attempt += 1;
        }

        tracing::warn!("giving up on {} after {} attempts", path, attempt);
        Err(last_error.unwrap_or(ApiError::ServiceUnavailable))
    }

    /// Parse successful response. Empty bodies (204, most PUT and DELETE
    /// calls) decode as JSON null.
    async fn parse_success_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let text = response.text().await?;
        tracing::debug!("API response body: {}", text);

        let body = if text.trim().is_empty() { "null" } else { text.as_str() };
        serde_json::from_str::<T>(body).map_err(|e| {
            tracing::error!("Failed to deserialize response: {}, body: {}", e, text);
            ApiError::ParseError(format!("Failed to parse response: {}", e))
        })
    }

    /// Handle error response
    async fn handle_error_response<T>(&self, response: reqwest::Response) -> Result<T, ApiError> {
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        let details = match serde_json::from_str::<ApiErrorResponse>(&text) {
            Ok(err_resp) => Some(Box::new(ApiErrorDetails {
                error: err_resp.error,
                field_errors: err_resp.errors,
            })),
            Err(_) => None,
        };

        Err(ApiError::ApiError {
            status,
            message: text,
            details,
        })
    }
}
