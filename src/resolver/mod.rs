//! Resolvers: callbacks that pick an HTTP client for a request context.
//!
//! A resolver inspects the ambient [`RequestContext`] and either supplies
//! a client, declines in favor of the next resolver or the default, or
//! fails the selection outright. Chains of resolvers live in
//! [`ResolverChain`].

mod chain;

pub use chain::ResolverChain;

use async_trait::async_trait;
use reqwest::{Request, Response};
use std::sync::Arc;

use crate::client::{Client, Transport, default_client};
use crate::context::RequestContext;
use crate::error::Error;
use crate::exec;

/// The outcome of asking one resolver for a client.
#[derive(Debug)]
pub enum Resolution {
    /// A concrete client to use; ends the chain.
    Resolved(Client),
    /// No opinion; defer to the next resolver or the default client.
    Declined,
    /// Selection is definitively broken; ends the chain with no fallback.
    Failed(Error),
}

impl Resolution {
    /// Fails the resolution with an arbitrary error.
    pub fn fail(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Resolution::Failed(Error::resolution(err))
    }
}

/// Picks a client for a request context.
///
/// Implemented by anything that can decide which transport should carry a
/// request, such as a credential store or a sandboxed-environment
/// fetcher. Plain closures of type `Fn(&RequestContext) -> Resolution`
/// implement it for free. Resolvers may perform I/O and may therefore
/// block or fail.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Resolve: Send + Sync {
    /// Produces a client for the context, declines, or fails.
    async fn resolve(&self, ctx: &RequestContext) -> Resolution;
}

#[async_trait]
impl<F> Resolve for F
where
    F: Fn(&RequestContext) -> Resolution + Send + Sync,
{
    async fn resolve(&self, ctx: &RequestContext) -> Resolution {
        self(ctx)
    }
}

/// Conveniences available on every resolver.
#[async_trait]
pub trait ResolveExt: Resolve {
    /// Resolves to a usable client, never failing: a resolution failure is
    /// embedded in the returned client and surfaces when it is exercised;
    /// a decline falls back to the process default client.
    async fn client(&self, ctx: &RequestContext) -> Client {
        match self.resolve(ctx).await {
            Resolution::Resolved(client) => client,
            Resolution::Declined => default_client(),
            Resolution::Failed(err) => Client::from_error(err),
        }
    }

    /// Executes `req` on this resolver's chosen client.
    async fn execute(&self, ctx: &RequestContext, req: Request) -> Result<Response, Error> {
        let client = self.client(ctx).await;
        exec::execute(ctx, &client, req).await
    }

    /// Resolves to the chosen client's raw transport, for composing into
    /// another transport. Resolution failures come back as an error
    /// carrier, so the returned transport is always usable.
    async fn transport(&self, ctx: &RequestContext) -> Arc<dyn Transport> {
        self.client(ctx).await.transport()
    }
}

impl<R: Resolve + ?Sized> ResolveExt for R {}
