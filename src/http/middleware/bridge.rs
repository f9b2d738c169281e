//! Fetch bridge middleware.
//!
//! Classifies each request, then either defers to the next stage, serves
//! the SPA entry document, or runs the handler module and writes its
//! response.
//!
//! ```text
//! MATCHING ─┬─ Excluded ──────────────────────────────────────▶ pass-through
//!           ├─ SpaFallback ─ index.html? ─ yes ─▶ respond
//!           │                            └ no ──▶ pass-through
//!           └─ ServerRoute ─▶ LOADING ─▶ INVOKING ─▶ WRITING ─▶ DONE
//!                               │ err       │ err
//!                               └───────────┴──────────────────▶ pass-through
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config::BridgeOptions;
use crate::http::request::{adapt_request, request_id};
use crate::http::response::ResponseWriter;
use crate::http::sink::ChannelSink;
use crate::module::{FetchResponse, ModuleLoader};
use crate::routing::{RouteClass, RouteMatcher};

/// Stage a request is in, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    Matching,
    Loading,
    Invoking,
    Writing,
}

impl std::fmt::Display for BridgeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BridgeState::Matching => "matching",
            BridgeState::Loading => "loading",
            BridgeState::Invoking => "invoking",
            BridgeState::Writing => "writing",
        };
        f.write_str(name)
    }
}

/// Result of running a request through the bridge.
pub enum Dispatch {
    /// Hand the request to the next stage.
    PassThrough(Request),
    /// The bridge produced the response.
    Respond(Response),
}

/// Per-server bridge state, immutable and shared by every request.
pub struct Bridge {
    matcher: RouteMatcher,
    loader: Arc<dyn ModuleLoader>,
    entry: String,
    writer: ResponseWriter,
    index_html: PathBuf,
}

impl Bridge {
    pub fn new(options: &BridgeOptions, loader: Arc<dyn ModuleLoader>) -> Self {
        Self {
            matcher: RouteMatcher::new(options.match_options.clone()),
            loader,
            entry: options.entry.clone(),
            writer: ResponseWriter::new(options.client_script.clone()),
            index_html: options.index_html(),
        }
    }

    pub fn matcher(&self) -> &RouteMatcher {
        &self.matcher
    }

    /// Run one request through the state machine.
    pub async fn dispatch(&self, request: Request) -> Dispatch {
        let target = request
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let class = self.matcher.classify(target);

        tracing::debug!(
            request_id = %request_id(&request),
            method = %request.method(),
            target = %target,
            class = %class,
            "Request classified"
        );

        match class {
            RouteClass::Excluded => Dispatch::PassThrough(request),
            RouteClass::SpaFallback => match self.serve_index().await {
                Some(response) => Dispatch::Respond(response),
                None => Dispatch::PassThrough(request),
            },
            RouteClass::ServerRoute => self.forward(request).await,
        }
    }

    async fn forward(&self, request: Request) -> Dispatch {
        let id = request_id(&request).to_string();

        let handler = match self
            .loader
            .load(&self.entry)
            .await
            .and_then(|module| module.resolve(&self.entry))
        {
            Ok(handler) => handler,
            Err(e) => {
                tracing::debug!(
                    request_id = %id,
                    state = %BridgeState::Loading,
                    error = %e,
                    "Entry module unavailable, passing through"
                );
                return Dispatch::PassThrough(request);
            }
        };

        // The body moves into the fetch request; keep the rest for pass-through.
        let fallback = strip_body(&request);
        let fetch_request = adapt_request(request);

        let response = match handler.fetch(fetch_request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(
                    request_id = %id,
                    state = %BridgeState::Invoking,
                    error = %e,
                    "Handler failed, passing through"
                );
                return Dispatch::PassThrough(fallback);
            }
        };

        tracing::debug!(
            request_id = %id,
            state = %BridgeState::Writing,
            status = response.status().as_u16(),
            "Writing handler response"
        );
        Dispatch::Respond(self.write(id, response).await)
    }

    /// Spawn the writer and return as soon as the head is committed; the body
    /// keeps flowing from the spawned task.
    async fn write(&self, request_id: String, response: FetchResponse) -> Response {
        let (mut sink, head) = ChannelSink::new();
        let writer = self.writer.clone();

        tokio::spawn(async move {
            let outcome = writer.write(response, &mut sink).await;
            tracing::trace!(request_id = %request_id, outcome = ?outcome, "Response written");
        });

        match head.await {
            Ok(response) => response,
            Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }

    /// Serve `index.html` from the project root, with the client script
    /// injected. `None` when the file does not exist.
    async fn serve_index(&self) -> Option<Response> {
        let html = match tokio::fs::read(&self.index_html).await {
            Ok(html) => Bytes::from(html),
            Err(e) => {
                tracing::trace!(path = ?self.index_html, error = %e, "No index.html to serve");
                return None;
            }
        };

        let html = match self.writer.client_script() {
            Some(script) => script.inject(&html, None).unwrap_or(html),
            None => html,
        };

        let response = Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, HeaderValue::from_static("text/html"))
            .header(header::CONTENT_LENGTH, html.len())
            .body(Body::from(html));
        match response {
            Ok(response) => Some(response),
            Err(e) => {
                tracing::error!(error = %e, "Failed to build index response");
                None
            }
        }
    }
}

/// Copy of the request head with an empty body.
fn strip_body(request: &Request) -> Request {
    let mut copy = Request::new(Body::empty());
    *copy.method_mut() = request.method().clone();
    *copy.uri_mut() = request.uri().clone();
    *copy.version_mut() = request.version();
    *copy.headers_mut() = request.headers().clone();
    *copy.extensions_mut() = request.extensions().clone();
    copy
}

/// Axum middleware entry point, for `middleware::from_fn_with_state`.
pub async fn bridge_middleware(
    State(bridge): State<Arc<Bridge>>,
    request: Request,
    next: Next,
) -> Response {
    match bridge.dispatch(request).await {
        Dispatch::PassThrough(request) => next.run(request).await,
        Dispatch::Respond(response) => response,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BridgeConfig, PatternConfig};
    use crate::module::{fetch_fn, FetchRequest, HandlerError, HandlerModule, ModuleRegistry, loader_fn, LoadError};
    use axum::{middleware, Router};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;
    use tower::ServiceExt;

    const NEXT_BODY: &str = "next stage";

    fn options(root: &std::path::Path, routes: &[&str], exclude: Option<Vec<PatternConfig>>) -> BridgeOptions {
        let mut config = BridgeConfig::default();
        config.server.root = root.to_path_buf();
        config.dev.server_routes = routes.iter().map(|r| PatternConfig::from(*r)).collect();
        config.dev.exclude = exclude;
        BridgeOptions::from_config(&config).unwrap()
    }

    fn counting_module(calls: Arc<AtomicUsize>) -> HandlerModule {
        HandlerModule::with_default(fetch_fn(move |req: FetchRequest| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                let path = req.uri().path().to_string();
                let response = match path.as_str() {
                    "/api/hello" => Response::builder()
                        .header(header::CONTENT_TYPE, "application/json")
                        .body(Body::from(r#"{"msg":"hi"}"#))
                        .unwrap(),
                    "/api/page" => Response::builder()
                        .header(header::CONTENT_TYPE, "text/html")
                        .body(Body::from("<html><head></head><body>page</body></html>"))
                        .unwrap(),
                    "/api/echo" => {
                        let url = req.uri().to_string();
                        let body = axum::body::to_bytes(req.into_body(), usize::MAX)
                            .await
                            .map_err(HandlerError::new)?;
                        Response::builder()
                            .header("x-url", url)
                            .body(Body::from(body))
                            .unwrap()
                    }
                    "/api/fail" => return Err(HandlerError::new("boom")),
                    _ => Response::builder()
                        .status(StatusCode::NOT_FOUND)
                        .body(Body::from("Not Found"))
                        .unwrap(),
                };
                Ok(response)
            }
        }))
    }

    fn app(options: &BridgeOptions, loader: Arc<dyn ModuleLoader>) -> Router {
        let bridge = Arc::new(Bridge::new(options, loader));
        Router::new()
            .fallback(|| async { (StatusCode::IM_A_TEAPOT, NEXT_BODY) })
            .layer(middleware::from_fn_with_state(bridge, bridge_middleware))
    }

    fn registry(calls: &Arc<AtomicUsize>) -> Arc<dyn ModuleLoader> {
        Arc::new(ModuleRegistry::new().register("./src/server.rs", counting_module(calls.clone())))
    }

    async fn send(app: Router, method: &str, uri: &str, body: &'static str) -> (StatusCode, axum::http::HeaderMap, String) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::HOST, "dev.local:5173")
            .body(Body::from(body))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_server_route_json() {
        let temp = TempDir::new().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let app = app(&options(temp.path(), &["/api/*"], Some(vec![])), registry(&calls));

        let (status, headers, body) = send(app, "GET", "/api/hello", "").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_TYPE], "application/json");
        assert_eq!(body, r#"{"msg":"hi"}"#);
        assert!(!body.contains("<script"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_spa_fallback_without_index_passes_through() {
        let temp = TempDir::new().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let app = app(&options(temp.path(), &["/api/*"], Some(vec![])), registry(&calls));

        let (status, _, body) = send(app, "GET", "/dashboard", "").await;

        assert_eq!(status, StatusCode::IM_A_TEAPOT);
        assert_eq!(body, NEXT_BODY);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_spa_fallback_serves_index_with_script() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("index.html"),
            "<html><head><title>app</title></head><body></body></html>",
        )
        .unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let app = app(&options(temp.path(), &["/api/*"], Some(vec![])), registry(&calls));

        let (status, headers, body) = send(app, "GET", "/dashboard", "").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_TYPE], "text/html");
        assert_eq!(headers[header::CONTENT_LENGTH], body.len().to_string().as_str());
        assert!(body.contains(r#"<script type="module" src="/@bridge/client"></script></head>"#));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_latin1_index_keeps_its_bytes() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("index.html"), b"<head></head><p>caf\xe9</p>").unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let app = app(&options(temp.path(), &["/api/*"], Some(vec![])), registry(&calls));

        let request = Request::builder().uri("/dashboard").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let length = response.headers()[header::CONTENT_LENGTH].clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();

        let expected: &[u8] = b"<head><script type=\"module\" src=\"/@bridge/client\"></script></head><p>caf\xe9</p>";
        assert_eq!(&body[..], expected);
        assert_eq!(length, expected.len().to_string().as_str());
    }

    #[tokio::test]
    async fn test_excluded_paths_never_load_module() {
        let temp = TempDir::new().unwrap();
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = loads.clone();
        let loader: Arc<dyn ModuleLoader> = Arc::new(loader_fn(move |entry| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<HandlerModule, _>(LoadError::NotFound { entry })
            }
        }));
        // Default exclude list
        let app = app(&options(temp.path(), &["/*"], None), loader);

        for uri in ["/src/main.ts", "/@bridge/client", "/node_modules/x/index.js", "/styles.css?import"] {
            let (status, _, _) = send(app.clone(), "GET", uri, "").await;
            assert_eq!(status, StatusCode::IM_A_TEAPOT, "{}", uri);
        }
        assert_eq!(loads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_public_file_passes_through() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("public")).unwrap();
        std::fs::write(temp.path().join("public/robots.txt"), "User-agent: *").unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let app = app(&options(temp.path(), &[], Some(vec![])), registry(&calls));

        let (status, _, _) = send(app, "GET", "/robots.txt", "").await;

        assert_eq!(status, StatusCode::IM_A_TEAPOT);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_module_passes_through() {
        let temp = TempDir::new().unwrap();
        let app = app(&options(temp.path(), &["/api/*"], Some(vec![])), Arc::new(ModuleRegistry::new()));

        let (status, _, body) = send(app, "GET", "/api/hello", "").await;

        assert_eq!(status, StatusCode::IM_A_TEAPOT);
        assert_eq!(body, NEXT_BODY);
    }

    #[tokio::test]
    async fn test_module_without_fetch_passes_through() {
        let temp = TempDir::new().unwrap();
        let loader = Arc::new(ModuleRegistry::new().register("./src/server.rs", HandlerModule::default()));
        let app = app(&options(temp.path(), &["/api/*"], Some(vec![])), loader);

        let (status, _, _) = send(app, "GET", "/api/hello", "").await;
        assert_eq!(status, StatusCode::IM_A_TEAPOT);
    }

    #[tokio::test]
    async fn test_handler_error_passes_through() {
        let temp = TempDir::new().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let app = app(&options(temp.path(), &["/api/*"], Some(vec![])), registry(&calls));

        let (status, _, body) = send(app, "POST", "/api/fail", "data").await;

        assert_eq!(status, StatusCode::IM_A_TEAPOT);
        assert_eq!(body, NEXT_BODY);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_post_body_and_url_reach_handler() {
        let temp = TempDir::new().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let app = app(&options(temp.path(), &["/api/*"], Some(vec![])), registry(&calls));

        let (status, headers, body) = send(app, "POST", "/api/echo?x=1", "payload").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers["x-url"], "http://dev.local:5173/api/echo?x=1");
        assert_eq!(body, "payload");
    }

    #[tokio::test]
    async fn test_html_response_gets_script() {
        let temp = TempDir::new().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let app = app(&options(temp.path(), &["/api/*"], Some(vec![])), registry(&calls));

        let (status, headers, body) = send(app, "GET", "/api/page", "").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            r#"<html><head><script type="module" src="/@bridge/client"></script></head><body>page</body></html>"#
        );
        assert_eq!(headers[header::CONTENT_LENGTH], body.len().to_string().as_str());
    }

    #[tokio::test]
    async fn test_legacy_mode_forwards_everything_but_index() {
        let temp = TempDir::new().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let app = app(&options(temp.path(), &[], Some(vec![])), registry(&calls));

        let (status, _, _) = send(app.clone(), "GET", "/", "").await;
        assert_eq!(status, StatusCode::IM_A_TEAPOT);

        let (status, _, body) = send(app, "GET", "/unknown", "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, "Not Found");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_overlapping_requests_run_concurrently() {
        let temp = TempDir::new().unwrap();
        // Both handlers must be in flight at once to get past the barrier.
        let barrier = Arc::new(tokio::sync::Barrier::new(2));
        let module = HandlerModule::with_default(fetch_fn(move |_req: FetchRequest| {
            let barrier = barrier.clone();
            async move {
                barrier.wait().await;
                Ok::<_, HandlerError>(Response::new(Body::from("done")))
            }
        }));
        let loader = Arc::new(ModuleRegistry::new().register("./src/server.rs", module));
        let app = app(&options(temp.path(), &["/api/*"], Some(vec![])), loader);

        let both = async {
            tokio::join!(
                send(app.clone(), "GET", "/api/a", ""),
                send(app.clone(), "GET", "/api/b", ""),
            )
        };
        let ((first, _, a), (second, _, b)) =
            tokio::time::timeout(std::time::Duration::from_secs(5), both)
                .await
                .expect("handler invocations were serialized");

        assert_eq!((first, a.as_str()), (StatusCode::OK, "done"));
        assert_eq!((second, b.as_str()), (StatusCode::OK, "done"));
    }
}
