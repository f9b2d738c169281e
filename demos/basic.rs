//! Dev server with a compiled-in handler.
//!
//! ```text
//! cargo run --example basic
//! curl http://127.0.0.1:5173/api/hello
//! ```

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::body::Body;
use axum::http::{header, Response, StatusCode};

use fetch_bridge::config::{BridgeConfig, BridgeOptions, PatternConfig};
use fetch_bridge::lifecycle::shutdown_on_signal;
use fetch_bridge::module::HandlerError;
use fetch_bridge::observability::init_logging;
use fetch_bridge::{fetch_fn, DevServer, FetchRequest, FetchResponse, HandlerModule, ModuleRegistry};

const ABOUT: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <title>About</title>
</head>
<body>
  <h1>About</h1>
  <p>A fetch handler running inside the dev server.</p>
  <p><a href="/">Back to home</a></p>
</body>
</html>"#;

async fn handle(request: FetchRequest) -> Result<FetchResponse, HandlerError> {
    let unix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(HandlerError::new)?
        .as_millis() as u64;

    let response = match request.uri().path() {
        "/api/hello" => json(serde_json::json!({
            "message": "Hello from fetch-bridge!",
            "timestamp": unix,
        })),
        "/api/time" => json(serde_json::json!({ "unix": unix })),
        "/about" => Response::builder()
            .header(header::CONTENT_TYPE, "text/html")
            .body(Body::from(ABOUT)),
        _ => Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Body::from("Not Found")),
    };
    response.map_err(HandlerError::new)
}

fn json(value: serde_json::Value) -> Result<FetchResponse, axum::http::Error> {
    Response::builder()
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(value.to_string()))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = BridgeConfig::default();
    config.dev.server_routes = vec![PatternConfig::from("/api/*"), PatternConfig::from("/about")];
    init_logging(&config.logging.level)?;

    let options = BridgeOptions::from_config(&config)?;
    let registry = ModuleRegistry::new().register(&options.entry, HandlerModule::with_default(fetch_fn(handle)));

    let server = DevServer::new(options, Arc::new(registry));
    shutdown_on_signal(server.shutdown_handle());
    server.serve().await?;
    Ok(())
}
