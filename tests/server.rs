//! Tests running the full HTTP server on a real socket.

use std::time::Duration;

use api_gateway::config::RouteSpec;
use api_gateway::{HttpServer, Shutdown};
use axum::http::StatusCode;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

mod common;
use common::{gateway_config, upstream};

#[tokio::test]
async fn test_server_proxies_and_reloads() {
    let backend = common::start_echo_backend().await;
    let config = gateway_config(vec![RouteSpec::new("search", "/search", upstream(backend))]);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let proxy_addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let (updates_tx, updates_rx) = mpsc::unbounded_channel();
    let server = HttpServer::new(config).unwrap();
    let handle = tokio::spawn(server.run(listener, updates_rx, shutdown.subscribe()));

    let client = reqwest::Client::builder().no_proxy().build().unwrap();

    let response = client
        .get(format!("http://{proxy_addr}/search?q=invoices"))
        .header("x-request-id", "req-1")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-request-id"], "req-1");
    assert_eq!(response.headers()["x-echo-request-id"], "req-1");
    assert_eq!(response.headers()["x-echo-forwarded-for"], "127.0.0.1");
    assert_eq!(response.text().await.unwrap(), "GET /search?q=invoices");

    let response = client
        .get(format!("http://{proxy_addr}/labels"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.text().await.unwrap(), "No matching route found");

    updates_tx
        .send(gateway_config(vec![RouteSpec::new("labels", "/labels", upstream(backend))]))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let response = client
        .get(format!("http://{proxy_addr}/labels"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "GET /labels");

    let response = client
        .get(format!("http://{proxy_addr}/search"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    drop(client);
    shutdown.trigger();
    let result = tokio::time::timeout(Duration::from_secs(5), handle).await;
    assert!(matches!(result, Ok(Ok(Ok(())))));
}

#[tokio::test]
async fn test_server_serves_fallback_for_dead_upstream() {
    let dead = common::refused_addr().await;
    let config = gateway_config(vec![RouteSpec::new("search", "/search", upstream(dead))]);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let proxy_addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let (_updates_tx, updates_rx) = mpsc::unbounded_channel();
    let server = HttpServer::new(config).unwrap();
    tokio::spawn(server.run(listener, updates_rx, shutdown.subscribe()));

    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    let response = client
        .get(format!("http://{proxy_addr}/search"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.headers()["x-gateway-failure"], "unreachable");
    assert_eq!(response.text().await.unwrap(), "Generic fallback");

    shutdown.trigger();
}
