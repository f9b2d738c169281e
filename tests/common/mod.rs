//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Response, StatusCode};
use tokio::net::TcpListener;

use fetch_bridge::config::{BridgeConfig, BridgeOptions};
use fetch_bridge::module::{FetchRequest, HandlerError};
use fetch_bridge::{fetch_fn, DevServer, HandlerModule, ModuleLoader, ModuleRegistry, Shutdown};

/// A running dev server bound to an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub task: tokio::task::JoinHandle<Result<(), fetch_bridge::http::ServerError>>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Trigger shutdown and wait for the server task to finish.
    pub async fn stop(self) {
        self.shutdown.trigger();
        let result = tokio::time::timeout(Duration::from_secs(5), self.task)
            .await
            .expect("server did not stop in time");
        result.unwrap().unwrap();
    }
}

/// Config rooted at `root` with the watcher off.
pub fn config(root: &Path) -> BridgeConfig {
    let mut config = BridgeConfig::default();
    config.server.root = root.to_path_buf();
    config.dev.watch = false;
    config
}

/// Start a dev server for `config`, serving handlers from `loader`.
pub async fn start_server(config: &BridgeConfig, loader: Arc<dyn ModuleLoader>) -> TestServer {
    let options = BridgeOptions::from_config(config).unwrap();
    let server = DevServer::new(options, loader);
    let shutdown = server.shutdown_handle();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let task = tokio::spawn(server.run(listener));

    TestServer { addr, shutdown, task }
}

/// Registry with the sample application under the default entry.
#[allow(dead_code)]
pub fn sample_app() -> Arc<dyn ModuleLoader> {
    let module = HandlerModule::with_default(fetch_fn(|req: FetchRequest| async move {
        let response = match req.uri().path() {
            "/api/hello" => Response::builder()
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"message":"Hello"}"#)),
            "/api/echo" => {
                let url = req.uri().to_string();
                let method = req.method().to_string();
                let body = axum::body::to_bytes(req.into_body(), usize::MAX)
                    .await
                    .map_err(HandlerError::new)?;
                Response::builder()
                    .header("x-url", url)
                    .header("x-method", method)
                    .body(Body::from(body))
            }
            "/api/cookies" => Response::builder()
                .header(header::SET_COOKIE, "a=1")
                .header(header::SET_COOKIE, "b=2")
                .body(Body::empty()),
            "/api/stream" => {
                let chunks = futures_util::stream::iter(
                    ["one,", "two,", "three"].map(|c| Ok::<_, std::io::Error>(bytes::Bytes::from(c))),
                );
                Response::builder()
                    .header(header::CONTENT_TYPE, "text/plain")
                    .body(Body::from_stream(chunks))
            }
            "/about" => Response::builder()
                .header(header::CONTENT_TYPE, "text/html; charset=utf-8")
                .header("content-security-policy-nonce", "abc123")
                .body(Body::from("<html><head><title>About</title></head><body>About</body></html>")),
            _ => Response::builder()
                .status(StatusCode::NOT_FOUND)
                .body(Body::from("Not Found")),
        };
        response.map_err(HandlerError::new)
    }));

    Arc::new(ModuleRegistry::new().register("./src/server.rs", module))
}
