//! The interactive consent step of the authorization flow.
//!
//! Rendering the consent screen belongs to the host application. The token
//! manager only needs a suspension point that yields the callback URL (or a
//! failure) once the user has finished.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;
use tunebridge_core::MusicServiceError;
use url::Url;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConsentError {
    #[error("Authorization was cancelled")]
    Cancelled,

    #[error("Consent flow failed: {0}")]
    Failed(String),
}

impl From<ConsentError> for MusicServiceError {
    fn from(err: ConsentError) -> Self {
        MusicServiceError::AuthorizationFailed(Some(err.to_string()))
    }
}

/// Presents the authorization URL to the user and captures the callback.
#[async_trait]
pub trait ConsentFlow: Send + Sync {
    /// Show `authorize_url` and resolve with the URL the provider redirected
    /// to (which starts with `redirect_uri`).
    async fn present(&self, authorize_url: &Url, redirect_uri: &str) -> Result<Url, ConsentError>;
}

/// A pending consent step awaiting the host's answer.
///
/// Resolve it exactly once with [`complete`](Self::complete),
/// [`fail`](Self::fail) or [`cancel`](Self::cancel). Dropping it unresolved
/// counts as cancellation.
#[derive(Debug)]
pub struct ConsentRequest {
    pub authorize_url: Url,
    pub redirect_uri: String,
    responder: oneshot::Sender<Result<Url, ConsentError>>,
}

impl ConsentRequest {
    /// Hand back the callback URL the provider redirected to.
    pub fn complete(self, callback_url: Url) {
        let _ = self.responder.send(Ok(callback_url));
    }

    /// Report that the consent step could not be carried out.
    pub fn fail(self, reason: impl Into<String>) {
        let _ = self.responder.send(Err(ConsentError::Failed(reason.into())));
    }

    pub fn cancel(self) {
        let _ = self.responder.send(Err(ConsentError::Cancelled));
    }
}

/// Consent flow that forwards each request to the host over a channel.
///
/// # Example
///
/// ```no_run
/// use provider_spotify::consent::ChannelConsentFlow;
///
/// # async fn example() {
/// let (flow, mut requests) = ChannelConsentFlow::new();
///
/// tokio::spawn(async move {
///     while let Some(request) = requests.recv().await {
///         println!("Open {}", request.authorize_url);
///         // ... wait for the redirect, then:
///         // request.complete(callback_url);
///     }
/// });
/// # let _ = flow;
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ChannelConsentFlow {
    requests: mpsc::Sender<ConsentRequest>,
}

impl ChannelConsentFlow {
    /// Create the flow and the receiver the host listens on.
    pub fn new() -> (Self, mpsc::Receiver<ConsentRequest>) {
        let (requests, receiver) = mpsc::channel(1);
        (Self { requests }, receiver)
    }
}

#[async_trait]
impl ConsentFlow for ChannelConsentFlow {
    async fn present(&self, authorize_url: &Url, redirect_uri: &str) -> Result<Url, ConsentError> {
        let (responder, response) = oneshot::channel();
        let request = ConsentRequest {
            authorize_url: authorize_url.clone(),
            redirect_uri: redirect_uri.to_string(),
            responder,
        };

        self.requests
            .send(request)
            .await
            .map_err(|_| ConsentError::Failed("No consent host is listening".to_string()))?;
        debug!("Consent request handed to host");

        response.await.unwrap_or(Err(ConsentError::Cancelled))
    }
}
