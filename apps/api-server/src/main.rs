//! api-server — HTTP endpoint for the CMS redirect validation webhook.
//!
//! Exposes `POST /api/validate-redirects`, which the CMS calls before an
//! editor publishes content. The answer is always `200` with a JSON verdict
//! (`{"isValid": ..., "messages": [...]}`); internal failures are logged and
//! answered with `isValid: true` so a broken validator never blocks editors.
//!
//! Run:
//! ```bash
//! KONTENT_ENVIRONMENT_ID=... \
//! KONTENT_PREVIEW_API_KEY=... \
//!   cargo run -p api-server
//!
//! # also require targets to point at published pages
//! VALIDATE_TARGET_URL=1 LOG_FORMAT=json cargo run -p api-server
//! ```
//!
//! Configuration: See `config.rs` for all environment variables.
//!

mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{any, get},
    Json, Router,
};
use domain::service::RedirectValidator;
use domain::{ContentQuery, PublishedUrls};
use kontent_client::KontentClient;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() {
    // Load and validate config first (fail fast on misconfiguration)
    let cfg = match config::Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    init_tracing(&cfg);
    cfg.log_summary();

    let client = KontentClient::new(cfg.kontent.clone());
    let validator = Arc::new(RedirectValidator::new(
        client.clone(),
        client,
        cfg.validator_options(),
    ));

    // Request ID header name
    let x_request_id = axum::http::HeaderName::from_static("x-request-id");

    let app = router(validator)
        .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }),
        )
        .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid));

    let addr: SocketAddr = ([0, 0, 0, 0], cfg.port).into();
    info!(%addr, "api-server listening");
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        eprintln!("server error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing(cfg: &config::Config) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);
    match cfg.log_format {
        config::LogFormat::Json => {
            registry
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_timer(fmt::time::SystemTime)
                        .with_writer(std::io::stdout),
                )
                .init();
        }
        config::LogFormat::Pretty => {
            registry
                .with(
                    fmt::layer()
                        .pretty()
                        .with_target(true)
                        .with_writer(std::io::stdout),
                )
                .init();
        }
    }
}

fn router<Q, U>(validator: Arc<RedirectValidator<Q, U>>) -> Router
where
    Q: ContentQuery + 'static,
    U: PublishedUrls + 'static,
{
    Router::new()
        // Any method, any size: the CMS must always get a 200 verdict back.
        .route(
            "/api/validate-redirects",
            any(validate_redirects::<Q, U>).layer(DefaultBodyLimit::disable()),
        )
        .route("/healthz", get(healthz))
        .fallback(not_found)
        .with_state(validator)
}

// The body is taken as raw bytes: a payload that is not valid JSON must reach
// the validator (and its fail-open path) instead of being rejected with a 4xx.
async fn validate_redirects<Q, U>(
    State(validator): State<Arc<RedirectValidator<Q, U>>>,
    body: Bytes,
) -> impl IntoResponse
where
    Q: ContentQuery,
    U: PublishedUrls,
{
    let result = validator.handle(&body).await;
    if result.is_valid {
        info!("redirect accepted");
    } else {
        warn!(messages = result.messages.len(), "redirect rejected");
    }
    (StatusCode::OK, Json(http_common::validation_json(&result)))
}

async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({"status": "ok"})))
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(http_common::json_error_with_message(
            "not_found",
            "Resource not found",
        )),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use domain::adapters::memory::{FailingBackend, InMemoryContent, StaticPublishedUrls};
    use domain::service::ValidatorOptions;
    use domain::{ContentItem, SOURCE_URLS_ELEMENT};
    use serde_json::{json, Value};
    use tower::util::ServiceExt;

    fn app_with(store: InMemoryContent, validate_target: bool) -> Router {
        let options = ValidatorOptions {
            validate_target,
            ..ValidatorOptions::default()
        };
        router(Arc::new(RedirectValidator::new(
            store,
            StaticPublishedUrls::new(["/", "/about"]),
            options,
        )))
    }

    fn webhook(id: &str, sources: &[&str], target: &str) -> Request<Body> {
        let body = json!({
            "data": {"items": [{
                "system": {"id": id, "type": {"codename": "url_redirect"}},
                "elements": {
                    "source_urls": {"value": sources},
                    "target_url": {"value": target}
                }
            }]}
        });
        raw_webhook(body.to_string())
    }

    fn raw_webhook(body: String) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/validate-redirects")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    async fn send(router: Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = router.oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn duplicate_source_returns_200_with_error() {
        let store = InMemoryContent::new();
        store
            .insert(
                "published",
                ContentItem::new("other", "url_redirect")
                    .with_element(SOURCE_URLS_ELEMENT, json!(["/old-page/"])),
            )
            .unwrap();

        let (status, body) = send(app_with(store, false), webhook("me", &["/Old-Page"], "/new")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"isValid": false, "messages": [{
                "severity": "error",
                "message": "Source URL '/old-page' already exists in another published redirect."
            }]})
        );
    }

    #[tokio::test]
    async fn valid_redirect_omits_messages() {
        let (status, body) = send(
            app_with(InMemoryContent::new(), true),
            webhook("me", &["/unique-path"], "/about/"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"isValid": true}));
    }

    #[tokio::test]
    async fn unpublished_target_is_reported() {
        let (_, body) = send(
            app_with(InMemoryContent::new(), true),
            webhook("me", &["/x"], "/contact"),
        )
        .await;
        assert_eq!(body["isValid"], json!(false));
        assert_eq!(
            body["messages"][0]["message"],
            json!("Target URL '/contact' does not exist or is not published.")
        );
    }

    #[tokio::test]
    async fn malformed_body_still_answers_200_valid() {
        let (status, body) = send(
            app_with(InMemoryContent::new(), true),
            raw_webhook("{{ definitely not json".into()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"isValid": true}));
    }

    #[tokio::test]
    async fn oversized_body_reaches_the_validator() {
        let store = InMemoryContent::new();
        store
            .insert(
                "published",
                ContentItem::new("other", "url_redirect")
                    .with_element(SOURCE_URLS_ELEMENT, json!(["/old-page"])),
            )
            .unwrap();
        let body = json!({
            "data": {"items": [{
                "system": {"id": "me", "type": {"codename": "url_redirect"}},
                "elements": {"source_urls": {"value": ["/old-page"]}}
            }]},
            "padding": "x".repeat(3 * 1024 * 1024),
        });

        let (status, body) = send(app_with(store, false), raw_webhook(body.to_string())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["isValid"], json!(false));
    }

    #[tokio::test]
    async fn non_post_methods_still_get_a_verdict() {
        for method in ["GET", "PUT"] {
            let req = Request::builder()
                .method(method)
                .uri("/api/validate-redirects")
                .body(Body::empty())
                .unwrap();
            let (status, body) = send(app_with(InMemoryContent::new(), false), req).await;
            assert_eq!(status, StatusCode::OK, "method {method}");
            assert_eq!(body, json!({"isValid": true}));
        }
    }

    #[tokio::test]
    async fn backend_failure_fails_open() {
        let app = router(Arc::new(RedirectValidator::new(
            FailingBackend,
            FailingBackend,
            ValidatorOptions::default(),
        )));
        let (status, body) = send(app, webhook("me", &["/a"], "/b")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"isValid": true}));
    }

    #[tokio::test]
    async fn health_and_unknown_routes() {
        let router = app_with(InMemoryContent::new(), false);
        let (status, body) = send(
            router.clone(),
            Request::builder().uri("/healthz").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "ok"}));

        let (status, body) = send(
            router,
            Request::builder().uri("/nope").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], json!("not_found"));
    }
}
