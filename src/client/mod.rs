// This file is part of the terraform-provider-port project
//
// Copyright (C) ANEO, 2024-2024. All rights reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License")
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::header::AUTHORIZATION;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

mod action;
mod blueprint;
mod entity;
mod error;
mod page;

pub use action::{Action, ActionUserInputs, InvocationMethod};
pub use blueprint::{
    AggregationProperty, Blueprint, BlueprintProperty, BlueprintSchema, CalculationProperty,
    CalculationSpec, ChangelogDestination, MirrorProperty, PropertyItems, Relation,
    SpecAuthentication,
};
pub use entity::Entity;
pub use error::{ApiError, NotFoundExt};
pub use page::Page;

use error::ErrorBody;

pub const DEFAULT_BASE_URL: &str = "https://api.getport.io";

/// Tokens are refreshed this long before they expire
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
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

/// Port API client
#[derive(Clone)]
pub struct PortClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    base_url: String,
    client_id: String,
    secret: String,
    retry_config: RetryConfig,
    token: Mutex<Option<AccessToken>>,
}

struct AccessToken {
    value: String,
    expires_at: Instant,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Credentials<'a> {
    client_id: &'a str,
    client_secret: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccessTokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

impl std::fmt::Debug for PortClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortClient")
            .field("base_url", &self.inner.base_url)
            .field("client_id", &self.inner.client_id)
            .finish_non_exhaustive()
    }
}

impl PortClient {
    /// Create a new API client with default configuration
    pub fn new(base_url: &str, client_id: &str, secret: &str) -> Result<Self, ApiError> {
        Self::with_config(base_url, client_id, secret, RetryConfig::default())
    }

    /// Create a new API client with custom retry configuration
    pub fn with_config(
        base_url: &str,
        client_id: &str,
        secret: &str,
        retry_config: RetryConfig,
    ) -> Result<Self, ApiError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(retry_config.timeout_seconds))
            .user_agent(concat!("terraform-provider-port/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                http_client,
                base_url: base_url.trim_end_matches('/').to_string(),
                client_id: client_id.to_owned(),
                secret: secret.to_owned(),
                retry_config,
                token: Mutex::new(None),
            }),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Return a valid access token, fetching a new one if needed
    async fn access_token(&self, force_refresh: bool) -> Result<String, ApiError> {
        let mut token = self.inner.token.lock().await;
        if let Some(current) = token.as_ref() {
            if !force_refresh && current.expires_at > Instant::now() + TOKEN_EXPIRY_MARGIN {
                return Ok(current.value.clone());
            }
        }

        let parsed = self.fetch_token().await?;
        let value = parsed.access_token;
        *token = Some(AccessToken {
            value: value.clone(),
            expires_at: Instant::now() + Duration::from_secs(parsed.expires_in),
        });
        Ok(value)
    }

    /// Request a new token, retrying on rate limits and unavailability
    async fn fetch_token(&self) -> Result<AccessTokenResponse, ApiError> {
        let url = format!("{}/v1/auth/access_token", self.inner.base_url);
        let mut last_error = None;

        for attempt in 0..=self.inner.retry_config.max_retries {
            self.backoff(&url, attempt).await;
            tracing::debug!("Requesting access token from {}", url);

            let sent = self
                .inner
                .http_client
                .post(&url)
                .json(&Credentials {
                    client_id: &self.inner.client_id,
                    client_secret: &self.inner.secret,
                })
                .send()
                .await;

            let response = match sent {
                Ok(response) => response,
                Err(e) if e.is_timeout() || e.is_connect() => {
                    last_error = Some(ApiError::ServiceUnavailable);
                    continue;
                }
                Err(e) => return Err(ApiError::Request(e)),
            };

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS {
                last_error = Some(ApiError::RateLimited);
                continue;
            }
            if status.is_server_error() {
                last_error = Some(ApiError::ServiceUnavailable);
                continue;
            }

            let text = response.text().await?;
            if !status.is_success() {
                let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
                return Err(ApiError::Auth(if body.message.is_empty() {
                    format!("HTTP {}", status.as_u16())
                } else {
                    body.message
                }));
            }
            return serde_json::from_str(&text).map_err(|e| ApiError::Parse(e.to_string()));
        }

        Err(last_error.unwrap_or(ApiError::ServiceUnavailable))
    }

    /// Sleep before a retry, the first attempt goes out immediately
    async fn backoff(&self, target: &str, attempt: u32) {
        if attempt == 0 {
            return;
        }
        let retry = &self.inner.retry_config;
        let backoff = std::cmp::min(
            retry.initial_backoff_ms * (2_u64.pow(attempt - 1)),
            retry.max_backoff_ms,
        );
        tracing::debug!(
            "Retrying request to {} after {}ms (attempt {})",
            target,
            backoff,
            attempt
        );
        tokio::time::sleep(Duration::from_millis(backoff)).await;
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.execute::<T, ()>(Method::GET, path, None).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.execute(Method::POST, path, Some(body)).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.execute(Method::PUT, path, Some(body)).await
    }

    pub async fn patch<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.execute(Method::PATCH, path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.execute::<serde_json::Value, ()>(Method::DELETE, path, None)
            .await
            .map(|_| ())
    }

    /// Execute a request with retry logic, POST is only replayed on 429 and connect errors
    async fn execute<T, B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + Sync,
    {
        let url = format!("{}{}", self.inner.base_url, path);
        let max_retries = self.inner.retry_config.max_retries;
        // A create may have landed before a 5xx or a timeout
        let replayable = method != Method::POST;
        let mut attempt = 0;
        let mut refreshed = false;
        let mut last_error = None;

        while attempt <= max_retries {
            self.backoff(path, attempt).await;

            let token = self.access_token(false).await?;
            tracing::debug!("{} request to: {}", method, url);

            let mut request = self
                .inner
                .http_client
                .request(method.clone(), &url)
                .header(AUTHORIZATION, format!("Bearer {token}"));
            if let Some(body) = body {
                request = request.json(body);
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return Self::parse_success_response(response).await;
                    }

                    if status == StatusCode::UNAUTHORIZED && !refreshed {
                        // The cached token may have been revoked
                        refreshed = true;
                        self.access_token(true).await?;
                        continue;
                    }

                    if status == StatusCode::TOO_MANY_REQUESTS {
                        last_error = Some(ApiError::RateLimited);
                    } else if status.is_server_error() && replayable {
                        last_error = Some(ApiError::ServiceUnavailable);
                    } else {
                        return Err(Self::error_response(path, response).await);
                    }
                }
                Err(e) => {
                    if e.is_connect() || (e.is_timeout() && replayable) {
                        last_error = Some(ApiError::ServiceUnavailable);
                    } else {
                        return Err(ApiError::Request(e));
                    }
                }
            }

            attempt += 1;
        }

        Err(last_error.unwrap_or(ApiError::ServiceUnavailable))
    }

    async fn parse_success_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let text = response.text().await?;
        tracing::debug!("API response body: {}", text);

        let text = if text.trim().is_empty() { "null" } else { &text };
        serde_json::from_str::<T>(text).map_err(|e| {
            tracing::error!("Failed to deserialize response: {}, body: {}", e, text);
            ApiError::Parse(e.to_string())
        })
    }

    async fn error_response(path: &str, response: reqwest::Response) -> ApiError {
        let status = response.status();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        if status == StatusCode::NOT_FOUND {
            return ApiError::NotFound {
                path: path.to_owned(),
            };
        }

        match serde_json::from_str::<ErrorBody>(&text) {
            Ok(body) => ApiError::Api {
                status: status.as_u16(),
                error: body.error,
                message: body.message,
            },
            Err(_) => ApiError::Api {
                status: status.as_u16(),
                error: String::new(),
                message: text,
            },
        }
    }
}

/// Percent-encode a path segment
pub(crate) fn segment(value: &str) -> std::borrow::Cow<'_, str> {
    urlencoding::encode(value)
}

#[cfg(test)]
pub(crate) mod test_helpers {
    use mockito::{Mock, ServerGuard};

    use super::{PortClient, RetryConfig};

    pub fn create_test_client(url: &str) -> PortClient {
        PortClient::with_config(
            url,
            "client",
            "secret",
            RetryConfig {
                max_retries: 2,
                initial_backoff_ms: 1,
                max_backoff_ms: 2,
                timeout_seconds: 5,
            },
        )
        .unwrap()
    }

    pub async fn mock_token(server: &mut ServerGuard) -> Mock {
        server
            .mock("POST", "/v1/auth/access_token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"ok": true, "accessToken": "token", "expiresIn": 3600}"#)
            .create_async()
            .await
    }
}
