//! Tower middleware running the request processor in front of a service
//!
//! ```ignore
//! let processor = RequestProcessor::new(config, source, sessions);
//!
//! // route rules must be inserted outside the layer
//! Router::new().route(
//!     "/docs/:id",
//!     get(show_doc)
//!         .layer(RbacLayer::new(processor))
//!         .layer(Extension(RouteRules::new(AuthorizationRule::new().any(["editor"])))),
//! );
//!
//! async fn show_doc(facts: AccessFacts) -> Response {
//!     if let Err(denied) = require_authorized(&facts).await {
//!         return denied;
//!     }
//!     // ...
//! }
//! ```

use crate::error::RbacError;
use crate::processor::{AccessFacts, Outcome, RequestProcessor};
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::future::BoxFuture;
use serde_json::json;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::warn;

/// Layer applying [`RequestProcessor::process`] to every request
#[derive(Clone)]
pub struct RbacLayer {
    processor: RequestProcessor,
}

impl RbacLayer {
    pub fn new(processor: RequestProcessor) -> Self {
        Self { processor }
    }
}

impl<S> Layer<S> for RbacLayer {
    type Service = RbacService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RbacService {
            inner,
            processor: self.processor.clone(),
        }
    }
}

/// Service wrapper for [`RbacLayer`]
#[derive(Clone)]
pub struct RbacService<S> {
    inner: S,
    processor: RequestProcessor,
}

impl<S, B> Service<Request<B>> for RbacService<S>
where
    S: Service<Request<B>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<B>) -> Self::Future {
        let processor = self.processor.clone();
        // the ready service goes into the future; keep a fresh clone behind
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            match processor.process(request).await {
                Ok(Outcome::Forward(request)) => inner.call(request).await,
                Ok(Outcome::Deny(response)) => Ok(response),
                Err(e) => {
                    warn!("Access control failed, rejecting request: {}", e);
                    Ok(e.into_response())
                }
            }
        })
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AccessFacts
where
    S: Send + Sync,
{
    type Rejection = RbacError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AccessFacts>()
            .cloned()
            .ok_or_else(|| RbacError::Internal("access facts missing from request".to_string()))
    }
}

/// Reject with `403 Forbidden` unless the request is authorized
///
/// For routes that handle denial themselves instead of redirecting.
pub async fn require_authorized(facts: &AccessFacts) -> Result<(), Response> {
    match facts.authorized().await {
        Ok(true) => Ok(()),
        Ok(false) => Err(forbidden_response()),
        Err(e) => Err(e.into_response()),
    }
}

fn forbidden_response() -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(json!({
            "error": "forbidden",
            "message": "Insufficient permissions",
        })),
    )
        .into_response()
}
