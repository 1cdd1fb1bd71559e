//! Opaque client handles and the transports behind them.

mod transport;

pub use transport::{ErrorTransport, ReqwestTransport, Transport};

use once_cell::sync::Lazy;
use reqwest::{Request, Response};
use std::fmt;
use std::sync::Arc;

use crate::error::Error;

static DEFAULT_CLIENT: Lazy<Client> = Lazy::new(|| Client::new(reqwest::Client::new()));

/// The process-wide default client, used whenever no resolver claims a
/// request. Built lazily on first use and shared from then on.
pub fn default_client() -> Client {
    DEFAULT_CLIENT.clone()
}

/// An opaque handle to a transport configured to perform HTTP exchanges.
///
/// Cheap to clone; clones share the same transport. A handle produced
/// from a failed resolution carries the failure in its transport and
/// short-circuits every exchange with it; see [`Client::resolution_error`].
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
}

impl Client {
    /// A client backed by the given reqwest client.
    pub fn new(client: reqwest::Client) -> Self {
        Self::from_transport(ReqwestTransport::new(client))
    }

    /// A client backed by a custom transport.
    pub fn from_transport(transport: impl Transport + 'static) -> Self {
        Self {
            transport: Arc::new(transport),
        }
    }

    /// A client that fails every exchange with `err`. Used to postpone
    /// resolution failures to the point the client is exercised.
    pub fn from_error(err: Error) -> Self {
        Self::from_transport(ErrorTransport::new(err))
    }

    /// The resolution failure embedded in this client, if any. Returns
    /// `None` for every client backed by a real transport.
    pub fn resolution_error(&self) -> Option<&Error> {
        self.transport.resolution_error()
    }

    /// The transport behind this client, for composing into another
    /// transport.
    pub fn transport(&self) -> Arc<dyn Transport> {
        Arc::clone(&self.transport)
    }

    pub(crate) async fn round_trip(&self, req: Request) -> Result<Response, Error> {
        self.transport.round_trip(req).await
    }
}

impl Default for Client {
    /// The process-wide default client.
    fn default() -> Self {
        default_client()
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("resolution_error", &self.resolution_error())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_real_client_has_no_resolution_error() {
        let client = Client::new(reqwest::Client::new());
        assert!(client.resolution_error().is_none());
    }

    #[test]
    fn test_deferred_client_exposes_embedded_error() {
        let client = Client::from_error(Error::resolution(std::io::Error::other(
            "tenant lookup failed",
        )));
        let err = client.resolution_error().expect("embedded error");
        assert!(err.to_string().contains("tenant lookup failed"));
    }

    #[test]
    fn test_clones_share_the_transport() {
        let client = Client::new(reqwest::Client::new());
        let clone = client.clone();
        assert!(Arc::ptr_eq(&client.transport(), &clone.transport()));
    }

    #[test]
    fn test_default_client_is_shared() {
        assert!(Arc::ptr_eq(
            &default_client().transport(),
            &Client::default().transport()
        ));
    }
}
