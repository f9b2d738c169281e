//! End-to-end tests against a bound dev server.

use std::sync::Arc;

use reqwest::StatusCode;
use tempfile::TempDir;

use fetch_bridge::config::PatternConfig;
use fetch_bridge::ModuleRegistry;

mod common;

fn api_routes(config: &mut fetch_bridge::BridgeConfig) {
    config.dev.server_routes = vec![PatternConfig::from("/api/*"), PatternConfig::from("/about")];
}

#[tokio::test]
async fn test_server_route_returns_handler_response() {
    let temp = TempDir::new().unwrap();
    let mut config = common::config(temp.path());
    api_routes(&mut config);
    config.dev.exclude = Some(vec![]);
    let server = common::start_server(&config, common::sample_app()).await;

    let res = reqwest::get(server.url("/api/hello")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["content-type"], "application/json");
    assert!(res.headers().contains_key("x-request-id"));
    assert_eq!(res.text().await.unwrap(), r#"{"message":"Hello"}"#);

    server.stop().await;
}

#[tokio::test]
async fn test_spa_fallback_serves_index_with_client_script() {
    let temp = TempDir::new().unwrap();
    std::fs::write(
        temp.path().join("index.html"),
        "<!DOCTYPE html><html><head><title>App</title></head><body><div id=\"app\"></div></body></html>",
    )
    .unwrap();
    let mut config = common::config(temp.path());
    api_routes(&mut config);
    let server = common::start_server(&config, common::sample_app()).await;

    let res = reqwest::get(server.url("/dashboard")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.text().await.unwrap();
    assert_eq!(body.matches("<script").count(), 1);
    assert!(body.contains(r#"<script type="module" src="/@bridge/client"></script></head>"#));

    server.stop().await;
}

#[tokio::test]
async fn test_spa_fallback_without_index_is_not_found() {
    let temp = TempDir::new().unwrap();
    let mut config = common::config(temp.path());
    api_routes(&mut config);
    let server = common::start_server(&config, common::sample_app()).await;

    let res = reqwest::get(server.url("/dashboard")).await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    server.stop().await;
}

#[tokio::test]
async fn test_excluded_and_public_paths_skip_handler() {
    let temp = TempDir::new().unwrap();
    std::fs::create_dir(temp.path().join("public")).unwrap();
    std::fs::write(temp.path().join("public/logo.svg"), "<svg/>").unwrap();
    std::fs::write(temp.path().join("public/robots.txt"), "User-agent: *").unwrap();
    let server = common::start_server(&common::config(temp.path()), common::sample_app()).await;

    // Default exclusions, then ServeDir
    let res = reqwest::get(server.url("/logo.svg")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "<svg/>");

    // Public file that no exclusion covers
    let res = reqwest::get(server.url("/robots.txt")).await.unwrap();
    assert_eq!(res.text().await.unwrap(), "User-agent: *");

    server.stop().await;
}

#[tokio::test]
async fn test_post_body_and_absolute_url() {
    let temp = TempDir::new().unwrap();
    let mut config = common::config(temp.path());
    api_routes(&mut config);
    let server = common::start_server(&config, common::sample_app()).await;

    let client = reqwest::Client::new();
    let res = client
        .post(server.url("/api/echo?debug=1"))
        .body("hello body")
        .send()
        .await
        .unwrap();

    assert_eq!(res.headers()["x-method"], "POST");
    assert_eq!(
        res.headers()["x-url"].to_str().unwrap(),
        format!("http://{}/api/echo?debug=1", server.addr)
    );
    assert_eq!(res.text().await.unwrap(), "hello body");

    server.stop().await;
}

#[tokio::test]
async fn test_get_request_has_no_body() {
    let temp = TempDir::new().unwrap();
    let mut config = common::config(temp.path());
    api_routes(&mut config);
    let server = common::start_server(&config, common::sample_app()).await;

    let res = reqwest::get(server.url("/api/echo")).await.unwrap();
    assert_eq!(res.headers()["x-method"], "GET");
    assert_eq!(res.text().await.unwrap(), "");

    server.stop().await;
}

#[tokio::test]
async fn test_multi_value_headers_preserved() {
    let temp = TempDir::new().unwrap();
    let mut config = common::config(temp.path());
    api_routes(&mut config);
    let server = common::start_server(&config, common::sample_app()).await;

    let res = reqwest::get(server.url("/api/cookies")).await.unwrap();
    let cookies: Vec<_> = res
        .headers()
        .get_all("set-cookie")
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    assert_eq!(cookies, vec!["a=1", "b=2"]);

    server.stop().await;
}

#[tokio::test]
async fn test_streamed_body_arrives_intact() {
    let temp = TempDir::new().unwrap();
    let mut config = common::config(temp.path());
    api_routes(&mut config);
    let server = common::start_server(&config, common::sample_app()).await;

    let res = reqwest::get(server.url("/api/stream")).await.unwrap();
    assert_eq!(res.text().await.unwrap(), "one,two,three");

    server.stop().await;
}

#[tokio::test]
async fn test_html_response_gets_nonce_script() {
    let temp = TempDir::new().unwrap();
    let mut config = common::config(temp.path());
    api_routes(&mut config);
    let server = common::start_server(&config, common::sample_app()).await;

    let res = reqwest::get(server.url("/about")).await.unwrap();
    let length: usize = res.headers()["content-length"].to_str().unwrap().parse().unwrap();
    let body = res.text().await.unwrap();

    assert!(body.contains(
        r#"<script type="module" nonce="abc123" src="/@bridge/client"></script></head>"#
    ));
    assert_eq!(length, body.len());

    server.stop().await;
}

#[tokio::test]
async fn test_injection_disabled_leaves_html_alone() {
    let temp = TempDir::new().unwrap();
    let mut config = common::config(temp.path());
    api_routes(&mut config);
    config.dev.inject_client_script = false;
    let server = common::start_server(&config, common::sample_app()).await;

    let body = reqwest::get(server.url("/about")).await.unwrap().text().await.unwrap();
    assert_eq!(body, "<html><head><title>About</title></head><body>About</body></html>");

    server.stop().await;
}

#[tokio::test]
async fn test_missing_module_falls_through() {
    let temp = TempDir::new().unwrap();
    let mut config = common::config(temp.path());
    api_routes(&mut config);
    let server = common::start_server(&config, Arc::new(ModuleRegistry::new())).await;

    let res = reqwest::get(server.url("/api/hello")).await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    server.stop().await;
}

#[tokio::test]
async fn test_reload_endpoints() {
    let temp = TempDir::new().unwrap();
    let server = common::start_server(&common::config(temp.path()), common::sample_app()).await;

    let res = reqwest::get(server.url("/@bridge/client")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.text().await.unwrap().contains("EventSource"));

    let mut res = reqwest::get(server.url("/@bridge/events")).await.unwrap();
    assert_eq!(res.headers()["content-type"], "text/event-stream");
    let first = res.chunk().await.unwrap().unwrap();
    assert!(String::from_utf8_lossy(&first).contains(r#"data: {"type":"connected"}"#));

    // The open event stream must not block shutdown.
    server.stop().await;
}
