//! Request execution with cancellation reconciliation and uniform
//! response-status validation.

use log::{debug, warn};
use reqwest::header::{self, HeaderValue};
use reqwest::{Method, Request, Response, Url};
use std::time::Instant;

use crate::client::Client;
use crate::context::RequestContext;
use crate::error::{Error, ResponseError};

/// Executes `req` on `client` under the governing context.
///
/// The context's remaining deadline is bound into the request before the
/// exchange, and the exchange races against the context's cancellation.
/// If the transport fails while the context is already done, the
/// context's own error is returned in place of the transport error; the
/// caller's cancellation reason is the more diagnostic of the two.
///
/// A status in `[200, 299]` returns the response untouched. Any other
/// status drains the body and returns [`Error::Status`]; the response is
/// consumed on that branch.
#[tracing::instrument(skip(ctx, client, req), fields(method = %req.method(), url = %req.url()))]
pub async fn execute(
    ctx: &RequestContext,
    client: &Client,
    mut req: Request,
) -> Result<Response, Error> {
    if let Some(deadline) = ctx.deadline() {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return fail_request(req, ctx.done_error().unwrap_or(Error::DeadlineExceeded));
        }
        let timeout = req.timeout_mut();
        if timeout.map_or(true, |t| t > remaining) {
            *timeout = Some(remaining);
        }
    }

    let outcome = tokio::select! {
        result = client.round_trip(req) => result,
        _ = ctx.done() => Err(ctx.done_error().unwrap_or(Error::Cancelled)),
    };

    let response = match outcome {
        Ok(response) => response,
        Err(err) => {
            return Err(match ctx.done_error() {
                Some(ctx_err) => {
                    debug!("context done, superseding transport error: {}", err);
                    ctx_err
                }
                None => err,
            });
        }
    };

    if response.status().is_success() {
        return Ok(response);
    }

    let err = ResponseError::from_response(response).await;
    warn!("request failed with status {}", err.status_text);
    Err(Error::Status(err))
}

/// Executes a POST with a URL-encoded form body through [`execute`].
pub async fn post_form(
    ctx: &RequestContext,
    client: &Client,
    url: Url,
    form: &[(&str, &str)],
) -> Result<Response, Error> {
    let body = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(form)
        .finish();
    let mut req = Request::new(Method::POST, url);
    req.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/x-www-form-urlencoded"),
    );
    *req.body_mut() = Some(body.into());
    execute(ctx, client, req).await
}

/// Fails a request without performing it, releasing any streaming body.
///
/// One half of the transport contract, reusable by custom transports and
/// resolvers that must abandon a request they will never send.
pub fn fail_request<T>(req: Request, err: Error) -> Result<T, Error> {
    debug!("failing request to {}: {}", req.url(), err);
    drop(req);
    Err(err)
}
