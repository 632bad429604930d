#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Authentication gate against a stub validation authority.
//!
//! These tests verify that:
//! 1. Missing / foreign-scheme / rejected credentials get 401 + suppression header
//! 2. Rejected requests never reach the downstream handler
//! 3. Admitted requests carry an authenticated principal and reach the handler unchanged
//! 4. The authority is loaded exactly once under concurrent first use

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
    response::IntoResponse,
    routing::get,
};
use tower::ServiceExt;

use oauth_gate::api::v1::extractors::{CurrentUser, RequestPrincipalExt, current_user};
use oauth_gate::middleware::auth::{SUPPRESS_REDIRECT_HEADER, access};
use oauth_gate::services::auth::{
    AuthorityLoader, Claim, Credential, LazyAuthority, RejectReason, ValidationAuthority,
    ValidationGateway, authority::AuthorityInitError,
};
use oauth_gate::state::AppState;

const GOOD_TOKEN: &str = "good-token";

struct StubAuthority;

#[async_trait]
impl ValidationAuthority for StubAuthority {
    async fn validate(&self, credential: Option<&Credential>) -> Result<Vec<Claim>, RejectReason> {
        match credential.map(Credential::as_str) {
            Some(GOOD_TOKEN) => Ok(vec![
                Claim::new("sub", "user-7"),
                Claim::new("name", "alice"),
                Claim::new("role", "admin"),
            ]),
            Some(_) => Err(RejectReason::InvalidSignature),
            None => Err(RejectReason::MissingCredential),
        }
    }
}

#[derive(Default)]
struct CountingLoader {
    constructs: AtomicUsize,
    initializes: AtomicUsize,
    fail: bool,
}

#[async_trait]
impl AuthorityLoader for CountingLoader {
    type Authority = StubAuthority;

    async fn construct(&self) -> Result<StubAuthority, AuthorityInitError> {
        self.constructs.fetch_add(1, Ordering::SeqCst);
        Ok(StubAuthority)
    }

    async fn initialize(&self, _: &mut StubAuthority) -> Result<(), AuthorityInitError> {
        self.initializes.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        if self.fail {
            return Err(AuthorityInitError::Unavailable("offline".into()));
        }
        Ok(())
    }
}

struct Harness {
    router: Router,
    hits: Arc<AtomicUsize>,
    loader: Arc<CountingLoader>,
}

fn harness_with(loader: CountingLoader) -> Harness {
    let loader = Arc::new(loader);
    let gateway = ValidationGateway::new(LazyAuthority::new(loader.clone()));
    let state = AppState::new(Arc::new(gateway));

    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();

    // Downstream handler: counts calls and reports what it saw.
    let handler = move |req: Request<Body>| {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);

            let via_ext = req.user();
            let via_fn = current_user(req.extensions());
            let same_instance = match (&via_ext, &via_fn) {
                (Some(a), Some(b)) => Arc::ptr_eq(a, b),
                _ => false,
            };

            let body = serde_json::json!({
                "user": via_ext.as_ref().and_then(|p| p.name().map(str::to_owned)),
                "authenticated": via_ext.as_ref().map(|p| p.is_authenticated()),
                "same_instance": same_instance,
                "path": req.uri().path(),
                "x_custom": req.headers().get("x-custom").and_then(|v| v.to_str().ok()),
            });
            axum::Json(body).into_response()
        }
    };

    let router = Router::new()
        .route("/orders", get(handler))
        .route(
            "/me",
            get(|CurrentUser(p): CurrentUser| async move { p.find_first("role").unwrap_or("").to_owned() }),
        );
    let router = access::apply(router, state.clone()).with_state(state);

    Harness {
        router,
        hits,
        loader,
    }
}

fn harness() -> Harness {
    harness_with(CountingLoader::default())
}

fn get_with(auth: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri("/orders").header("x-custom", "kept");
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    builder.body(Body::empty()).unwrap()
}

async fn json_body(res: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn assert_rejected(res: &axum::response::Response) {
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(res.headers().get(SUPPRESS_REDIRECT_HEADER).unwrap(), "true");
}

#[tokio::test]
async fn missing_header_is_rejected_without_forwarding() {
    let h = harness();

    let res = h.router.oneshot(get_with(None)).await.unwrap();

    assert_rejected(&res);
    assert_eq!(h.hits.load(Ordering::SeqCst), 0);
    let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    assert!(body.is_empty());
}

#[tokio::test]
async fn foreign_scheme_is_rejected_without_forwarding() {
    let h = harness();

    for auth in ["Bearer good-token", "oauth good-token", "Basic Zm9vOmJhcg=="] {
        let res = h.router.clone().oneshot(get_with(Some(auth))).await.unwrap();
        assert_rejected(&res);
    }

    assert_eq!(h.hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn rejected_credential_never_reaches_downstream() {
    let h = harness();

    let res = h
        .router
        .oneshot(get_with(Some("OAuth forged-token")))
        .await
        .unwrap();

    assert_rejected(&res);
    assert_eq!(h.hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn accepted_credential_attaches_principal_and_forwards_unchanged() {
    let h = harness();

    let res = h
        .router
        .oneshot(get_with(Some("OAuth good-token")))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().get(SUPPRESS_REDIRECT_HEADER).is_none());
    assert_eq!(h.hits.load(Ordering::SeqCst), 1);

    let body = json_body(res).await;
    assert_eq!(body["user"], "alice");
    assert_eq!(body["authenticated"], true);
    assert_eq!(body["same_instance"], true);
    assert_eq!(body["path"], "/orders");
    assert_eq!(body["x_custom"], "kept");
}

#[tokio::test]
async fn extractor_sees_claims() {
    let h = harness();

    let req = Request::builder()
        .uri("/me")
        .header(header::AUTHORIZATION, "OAuth good-token")
        .body(Body::empty())
        .unwrap();
    let res = h.router.oneshot(req).await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"admin");
}

#[tokio::test]
async fn every_request_is_validated_afresh() {
    let h = harness();

    let ok = h
        .router
        .clone()
        .oneshot(get_with(Some("OAuth good-token")))
        .await
        .unwrap();
    assert_eq!(ok.status(), StatusCode::OK);

    // A later request on the same router gets no credit for the earlier success.
    let res = h.router.clone().oneshot(get_with(None)).await.unwrap();
    assert_rejected(&res);
    assert_eq!(h.hits.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_requests_load_authority_once() {
    let h = harness();

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..24 {
        let router = h.router.clone();
        tasks.spawn(async move {
            router
                .oneshot(get_with(Some("OAuth good-token")))
                .await
                .unwrap()
                .status()
        });
    }

    while let Some(status) = tasks.join_next().await {
        assert_eq!(status.unwrap(), StatusCode::OK);
    }

    assert_eq!(h.loader.constructs.load(Ordering::SeqCst), 1);
    assert_eq!(h.loader.initializes.load(Ordering::SeqCst), 1);
    assert_eq!(h.hits.load(Ordering::SeqCst), 24);
}

#[tokio::test]
async fn authority_init_failure_is_a_server_error_and_retried() {
    let h = harness_with(CountingLoader {
        fail: true,
        ..Default::default()
    });

    for _ in 0..2 {
        let res = h
            .router
            .clone()
            .oneshot(get_with(Some("OAuth good-token")))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(res.headers().get(SUPPRESS_REDIRECT_HEADER).is_none());
    }

    // Same instance, initialize attempted again.
    assert_eq!(h.loader.constructs.load(Ordering::SeqCst), 1);
    assert_eq!(h.loader.initializes.load(Ordering::SeqCst), 2);
    assert_eq!(h.hits.load(Ordering::SeqCst), 0);
}
