//! The transport seam between resolved clients and the executor.

use async_trait::async_trait;
use reqwest::{Request, Response};

use crate::error::Error;
use crate::exec::fail_request;

/// A single HTTP exchange, performed by whatever a resolver supplied.
///
/// Implementations must be safe to share across concurrent requests;
/// nothing beyond `Send + Sync` is imposed here. Custom transports can
/// decorate a resolved one, e.g. to inject per-call headers.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Performs the exchange. Implementations that fail before consuming
    /// the request should finish through [`fail_request`].
    async fn round_trip(&self, req: Request) -> Result<Response, Error>;

    /// The embedded resolution error, if this transport is a deferred
    /// error carrier rather than a real transport.
    fn resolution_error(&self) -> Option<&Error> {
        None
    }
}

/// Transport backed by a [`reqwest::Client`].
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Wraps the given reqwest client.
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn round_trip(&self, req: Request) -> Result<Response, Error> {
        self.client.execute(req).await.map_err(Error::from)
    }
}

/// A transport holding a single error, substituted for a real client when
/// resolution fails so the failure surfaces only once the client is used.
pub struct ErrorTransport {
    err: Error,
}

impl ErrorTransport {
    /// Carries `err` into every future round trip.
    pub fn new(err: Error) -> Self {
        Self { err }
    }
}

#[async_trait]
impl Transport for ErrorTransport {
    async fn round_trip(&self, req: Request) -> Result<Response, Error> {
        fail_request(req, self.err.clone())
    }

    fn resolution_error(&self) -> Option<&Error> {
        Some(&self.err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Method;

    fn get_request() -> Request {
        Request::new(Method::GET, "http://localhost/".parse().unwrap())
    }

    #[tokio::test]
    async fn test_error_transport_short_circuits_every_round_trip() {
        let transport = ErrorTransport::new(Error::resolution(std::io::Error::other(
            "no credentials for tenant",
        )));

        for _ in 0..2 {
            let err = transport.round_trip(get_request()).await.unwrap_err();
            assert!(err.to_string().contains("no credentials for tenant"));
        }
    }

    #[tokio::test]
    async fn test_error_transport_exposes_embedded_error() {
        let transport = ErrorTransport::new(Error::Cancelled);
        assert!(matches!(
            transport.resolution_error(),
            Some(Error::Cancelled)
        ));
    }

    #[tokio::test]
    async fn test_reqwest_transport_has_no_resolution_error() {
        let transport = ReqwestTransport::new(reqwest::Client::new());
        assert!(transport.resolution_error().is_none());
    }
}
