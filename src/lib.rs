//! Per-call selection and execution of HTTP clients, driven by a
//! request-scoped context.
//!
//! Callers that need different transports per request (differing
//! credentials, or a sandboxed network stack) register resolvers on a
//! [`ResolverChain`]. Each resolution walks the chain with the
//! ambient [`RequestContext`]; the first resolver with an opinion wins,
//! and a selection failure is postponed into the returned client so that
//! selection and transport errors surface through the same execution
//! path.
//!
//! ```no_run
//! use ctxhttp::{Client, RequestContext, Resolution, ResolverChain};
//!
//! // Per-call user key carried in the request context.
//! #[derive(Clone)]
//! struct UserKey(String);
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let mut chain = ResolverChain::new();
//! chain.register(|ctx: &RequestContext| {
//!     let Some(UserKey(key)) = ctx.value::<UserKey>() else {
//!         return Resolution::Declined;
//!     };
//!     let value = match key.parse() {
//!         Ok(value) => value,
//!         Err(err) => return Resolution::fail(err),
//!     };
//!     let mut headers = reqwest::header::HeaderMap::new();
//!     headers.insert("x-user-key", value);
//!     match reqwest::Client::builder().default_headers(headers).build() {
//!         Ok(client) => Resolution::Resolved(Client::new(client)),
//!         Err(err) => Resolution::fail(err),
//!     }
//! });
//!
//! let ctx = RequestContext::new().with_value(UserKey("USER_GUID".into()));
//! let req = reqwest::Request::new(reqwest::Method::GET, "https://example.com".parse()?);
//! let res = chain.execute(&ctx, req).await?;
//! println!("{}", res.status());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod context;
pub mod error;
pub mod exec;
pub mod resolver;

pub use client::{Client, ErrorTransport, ReqwestTransport, Transport, default_client};
pub use context::{CancelHandle, RequestContext};
pub use error::{Error, ResponseError};
pub use exec::{execute, fail_request, post_form};
pub use resolver::{Resolution, Resolve, ResolveExt, ResolverChain};
