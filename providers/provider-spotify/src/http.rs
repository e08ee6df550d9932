//! Thin request executor over `reqwest`.
//!
//! Performs a request, classifies the status code and decodes the JSON
//! payload into the caller's type. Nothing here retries.

use reqwest::header::RETRY_AFTER;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use tunebridge_core::{MusicServiceError, Result};

const USER_AGENT: &str = concat!("Tunebridge/", env!("CARGO_PKG_VERSION"), " (Spotify Provider)");

/// Structured error body returned by the Web API.
#[derive(Debug, Deserialize)]
struct SpotifyErrorResponse {
    error: SpotifyErrorDetail,
}

#[derive(Debug, Deserialize)]
struct SpotifyErrorDetail {
    message: String,
}

/// Executes HTTP requests and maps failures onto [`MusicServiceError`].
#[derive(Debug, Clone)]
pub struct HttpExecutor {
    client: Client,
}

impl HttpExecutor {
    /// Create an executor with the provider's default client settings.
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| MusicServiceError::Unknown(Some(format!("Failed to create HTTP client: {e}"))))?;

        Ok(Self { client })
    }

    /// Create an executor around an existing client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// The underlying client, for building requests.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Send `request` and decode a successful JSON response as `T`.
    pub async fn perform<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let request = request.build().map_err(|_| MusicServiceError::InvalidRequest)?;
        debug!("Spotify request: {} {}", request.method(), request.url().path());

        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| MusicServiceError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            let body = response
                .bytes()
                .await
                .map_err(|e| MusicServiceError::Network(e.to_string()))?;
            return serde_json::from_slice(&body).map_err(|e| MusicServiceError::Decoding(e.to_string()));
        }

        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok());
        let body = response.text().await.ok();

        Err(classify_failure(status, retry_after, body))
    }
}

/// Map a non-success response onto the error taxonomy.
pub fn classify_failure(status: StatusCode, retry_after: Option<u64>, body: Option<String>) -> MusicServiceError {
    match status.as_u16() {
        401 => MusicServiceError::NotAuthorized,
        429 => MusicServiceError::RateLimitExceeded(retry_after),
        code @ (400..=499 | 500..=599) => MusicServiceError::Api {
            status: code,
            message: body.and_then(error_message),
        },
        _ => MusicServiceError::InvalidResponse,
    }
}

/// Prefer the message of a structured error body over the raw text.
fn error_message(body: String) -> Option<String> {
    if body.trim().is_empty() {
        return None;
    }

    match serde_json::from_str::<SpotifyErrorResponse>(&body) {
        Ok(parsed) => Some(parsed.error.message),
        Err(_) => Some(body),
    }
}
