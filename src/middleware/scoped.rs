//! Controller-scoped request filter.
//!
//! Applies a request transform only when the request's endpoint group (the
//! "controller" segment of the route) is in a configured allow-list.
//! Everything else passes through untouched. Responses are never modified.
//!
//! Responsibility:
//! - `RequestTransform`: the concrete per-request behavior
//! - `EndpointGroupResolver`: route → endpoint-group name lookup
//! - `ScopedFilter`: the allow-list check
//! - `ScopedFilterLayer`: tower wiring so the filter can wrap a Router

use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use axum::{
    body::Body,
    extract::MatchedPath,
    http::Request,
    response::Response,
};
use tower::{Layer, Service};

/// Per-request behavior run for allow-listed endpoint groups.
pub trait RequestTransform: Send + Sync + 'static {
    fn transform(&self, req: Request<Body>) -> Request<Body>;
}

impl<F> RequestTransform for F
where
    F: Fn(Request<Body>) -> Request<Body> + Send + Sync + 'static,
{
    fn transform(&self, req: Request<Body>) -> Request<Body> {
        self(req)
    }
}

/// Resolves the endpoint-group name of a request, if any.
pub trait EndpointGroupResolver: Send + Sync + 'static {
    fn resolve(&self, req: &Request<Body>) -> Option<String>;
}

impl<F> EndpointGroupResolver for F
where
    F: Fn(&Request<Body>) -> Option<String> + Send + Sync + 'static,
{
    fn resolve(&self, req: &Request<Body>) -> Option<String> {
        self(req)
    }
}

/// First path segment after a mount prefix.
///
/// `/api/v1/orders/{id}` with prefix `/api/v1` resolves to `orders`.
/// Uses axum's `MatchedPath` when routing has already happened, otherwise the raw URI path.
/// A leading path parameter (`/{id}`) resolves to nothing.
#[derive(Debug, Clone, Default)]
pub struct PathSegmentResolver {
    prefix: String,
}

impl PathSegmentResolver {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into().trim_end_matches('/').to_string(),
        }
    }
}

impl EndpointGroupResolver for PathSegmentResolver {
    fn resolve(&self, req: &Request<Body>) -> Option<String> {
        let path = req
            .extensions()
            .get::<MatchedPath>()
            .map(MatchedPath::as_str)
            .unwrap_or_else(|| req.uri().path());

        // Nested routers may already see the prefix stripped.
        // `/api/v10` is not under `/api/v1`: the prefix must end on a segment boundary.
        let rest = path
            .strip_prefix(self.prefix.as_str())
            .filter(|rest| rest.is_empty() || rest.starts_with('/'))
            .unwrap_or(path);

        rest.split('/')
            .find(|s| !s.is_empty())
            .filter(|s| !s.starts_with('{'))
            .map(str::to_owned)
    }
}

/// Inserts a clone of `value` into the request extensions.
#[derive(Debug, Clone)]
pub struct InsertExtension<V>(pub V);

impl<V> RequestTransform for InsertExtension<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn transform(&self, mut req: Request<Body>) -> Request<Body> {
        req.extensions_mut().insert(self.0.clone());
        req
    }
}

/// Marker left on requests the app-level scoped filter transformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopedFilterApplied;

/// Allow-list gate around a `RequestTransform`.
///
/// - `allow_list == None`: transform every request
/// - otherwise: transform only when the endpoint group equals an entry (case-insensitive,
///   including non-ASCII letters)
pub struct ScopedFilter<T> {
    // Stored case-folded.
    allow_list: Option<Vec<String>>,
    resolver: Arc<dyn EndpointGroupResolver>,
    transform: T,
}

impl<T> std::fmt::Debug for ScopedFilter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedFilter")
            .field("allow_list", &self.allow_list)
            .finish()
    }
}

impl<T: RequestTransform> ScopedFilter<T> {
    pub fn new(
        allow_list: Option<Vec<String>>,
        resolver: impl EndpointGroupResolver,
        transform: T,
    ) -> Self {
        Self {
            allow_list: allow_list
                .map(|names| names.iter().map(|name| fold_case(name)).collect()),
            resolver: Arc::new(resolver),
            transform,
        }
    }

    // Unresolvable routes count as the empty group name.
    pub fn endpoint_group(&self, req: &Request<Body>) -> String {
        self.resolver.resolve(req).unwrap_or_default()
    }

    pub fn should_apply(&self, req: &Request<Body>) -> bool {
        let Some(allow_list) = &self.allow_list else {
            return true;
        };

        let group = fold_case(&self.endpoint_group(req));
        allow_list.iter().any(|c| *c == group)
    }

    pub fn process_request(&self, req: Request<Body>) -> Request<Body> {
        if self.should_apply(&req) {
            self.transform.transform(req)
        } else {
            req
        }
    }

    pub fn process_response(&self, res: Response) -> Response {
        res
    }
}

fn fold_case(name: &str) -> String {
    name.to_lowercase()
}

/// Layer that runs a `ScopedFilter` around the wrapped service.
///
/// # Example
/// ```ignore
/// let filter = ScopedFilter::new(Some(vec!["Orders".into()]), PathSegmentResolver::new("/api/v1"), transform);
/// router = router.layer(ScopedFilterLayer::new(filter));
/// ```
pub struct ScopedFilterLayer<T> {
    filter: Arc<ScopedFilter<T>>,
}

impl<T> Clone for ScopedFilterLayer<T> {
    fn clone(&self) -> Self {
        Self {
            filter: Arc::clone(&self.filter),
        }
    }
}

impl<T: RequestTransform> ScopedFilterLayer<T> {
    pub fn new(filter: ScopedFilter<T>) -> Self {
        Self {
            filter: Arc::new(filter),
        }
    }
}

impl<S, T> Layer<S> for ScopedFilterLayer<T> {
    type Service = ScopedFilterService<S, T>;

    fn layer(&self, inner: S) -> Self::Service {
        ScopedFilterService {
            inner,
            filter: Arc::clone(&self.filter),
        }
    }
}

pub struct ScopedFilterService<S, T> {
    inner: S,
    filter: Arc<ScopedFilter<T>>,
}

impl<S: Clone, T> Clone for ScopedFilterService<S, T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            filter: Arc::clone(&self.filter),
        }
    }
}

impl<S, T> Service<Request<Body>> for ScopedFilterService<S, T>
where
    S: Service<Request<Body>, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
    T: RequestTransform,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let req = self.filter.process_request(req);
        let filter = Arc::clone(&self.filter);
        let fut = self.inner.call(req);

        Box::pin(async move {
            let res = fut.await?;
            Ok(filter.process_response(res))
        })
    }
}
