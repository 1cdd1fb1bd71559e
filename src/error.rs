//! Error types for client resolution and request execution.

use reqwest::header::HeaderMap;
use reqwest::{Response, StatusCode};
use std::borrow::Cow;
use std::sync::Arc;

/// Errors surfaced by client resolution and request execution.
///
/// Clonable so that a resolution failure embedded in a client can be
/// replayed on every use of that client.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// A resolver actively failed (e.g. a credential lookup failed).
    /// Terminates the resolver chain; there is no fallback.
    #[error("client resolution failed: {0}")]
    Resolution(#[source] Arc<dyn std::error::Error + Send + Sync + 'static>),

    /// The governing context was cancelled before the exchange completed.
    #[error("request cancelled")]
    Cancelled,

    /// The governing context's deadline passed before the exchange completed.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// The underlying transport failed to produce a response.
    #[error("transport failure: {0}")]
    Transport(#[source] Arc<reqwest::Error>),

    /// The server answered with a status outside `[200, 299]`.
    #[error(transparent)]
    Status(#[from] ResponseError),
}

impl Error {
    /// Wraps an arbitrary resolver failure.
    pub fn resolution(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Error::Resolution(Arc::new(err))
    }

    /// Returns the structured response error if the server answered with a
    /// non-success status.
    pub fn as_status(&self) -> Option<&ResponseError> {
        match self {
            Error::Status(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(Arc::new(err))
    }
}

/// A structurally valid HTTP response outside the success range, captured
/// in full so the caller can inspect it after the response itself has been
/// consumed.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{status_text}: {}", String::from_utf8_lossy(.body))]
pub struct ResponseError {
    /// Status code of the response.
    pub status: StatusCode,
    /// Status line, e.g. `"400 Bad Request"`.
    pub status_text: String,
    /// Response headers.
    pub headers: HeaderMap,
    /// Full response body.
    pub body: Vec<u8>,
}

impl ResponseError {
    /// Drains a non-success response into a structured error, closing the
    /// body. If the body cannot be read, a placeholder describing the read
    /// failure is captured instead.
    pub async fn from_response(response: Response) -> Self {
        let status = response.status();
        let status_text = match status.canonical_reason() {
            Some(reason) => format!("{} {}", status.as_u16(), reason),
            None => status.as_u16().to_string(),
        };
        let headers = response.headers().clone();
        let body = match response.bytes().await {
            Ok(bytes) => bytes.to_vec(),
            Err(err) => format!("<failed to read response body: {}>", err).into_bytes(),
        };
        Self {
            status,
            status_text,
            headers,
            body,
        }
    }

    /// The response body as text, lossily decoded.
    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}
