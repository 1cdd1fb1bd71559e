//! Caller-owned ordered chain of resolvers.

use log::{debug, warn};
use reqwest::{Request, Response, Url};
use std::fmt;
use std::sync::Arc;

use crate::client::{Client, Transport, default_client};
use crate::context::RequestContext;
use crate::error::Error;
use crate::exec;
use crate::resolver::{Resolution, Resolve};

/// An ordered sequence of resolvers consulted for every resolution, most
/// recently registered first, falling back to a default client when every
/// resolver declines.
///
/// Construct and register during startup, then resolve freely: resolution
/// takes `&self` and may run concurrently, while registration requires
/// `&mut self`. Last-registered-wins priority lets application code
/// override a platform default registered earlier, while the lowest
/// priority fallback stays last.
pub struct ResolverChain {
    resolvers: Vec<Arc<dyn Resolve>>,
    default_client: Client,
}

impl ResolverChain {
    /// An empty chain falling back to the process default client.
    pub fn new() -> Self {
        Self::with_default(default_client())
    }

    /// An empty chain falling back to the given client.
    pub fn with_default(default_client: Client) -> Self {
        Self {
            resolvers: Vec::new(),
            default_client,
        }
    }

    /// Registers a resolver ahead of all previously registered ones.
    pub fn register(&mut self, resolver: impl Resolve + 'static) {
        self.resolvers.insert(0, Arc::new(resolver));
    }

    /// Walks the chain: the first resolver with an opinion wins. An
    /// exhausted (or empty) chain yields the default client.
    #[tracing::instrument(skip(self, ctx))]
    pub async fn resolve(&self, ctx: &RequestContext) -> Result<Client, Error> {
        for resolver in &self.resolvers {
            match resolver.resolve(ctx).await {
                Resolution::Resolved(client) => return Ok(client),
                Resolution::Declined => continue,
                Resolution::Failed(err) => {
                    warn!("client resolution failed: {}", err);
                    return Err(err);
                }
            }
        }
        debug!("no resolver claimed the request, using the default client");
        Ok(self.default_client.clone())
    }

    /// Resolves to a usable client, never failing: a resolution failure
    /// is embedded in the returned client and surfaces when the client is
    /// exercised, so selection and transport errors share one code path.
    pub async fn client(&self, ctx: &RequestContext) -> Client {
        match self.resolve(ctx).await {
            Ok(client) => client,
            Err(err) => Client::from_error(err),
        }
    }

    /// Executes `req` on the chain-resolved client.
    pub async fn execute(&self, ctx: &RequestContext, req: Request) -> Result<Response, Error> {
        let client = self.client(ctx).await;
        exec::execute(ctx, &client, req).await
    }

    /// Executes a POST with a URL-encoded form body on the chain-resolved
    /// client.
    pub async fn post_form(
        &self,
        ctx: &RequestContext,
        url: Url,
        form: &[(&str, &str)],
    ) -> Result<Response, Error> {
        let client = self.client(ctx).await;
        exec::post_form(ctx, &client, url, form).await
    }

    /// Resolves to the chosen client's raw transport, for composing into
    /// another transport. Resolution failures come back as an error
    /// carrier, so the returned transport is always usable.
    pub async fn transport(&self, ctx: &RequestContext) -> Arc<dyn Transport> {
        self.client(ctx).await.transport()
    }
}

impl Default for ResolverChain {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ResolverChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverChain")
            .field("resolvers", &self.resolvers.len())
            .finish_non_exhaustive()
    }
}
