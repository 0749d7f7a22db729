// Copyright (c) 2025 - Cowboy AI, Inc.
//! End-to-end publish flow through the HTTP router
//!
//! Cloudflare is a wiremock server, the proxy reload runs `true`, sites and
//! the Caddyfile live in a temp dir.

#![cfg(unix)]

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use flate2::{write::GzEncoder, Compression};
use serde_json::json;
use std::io::{Cursor, Write};
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use lizcel_host::adapters::{CaddyReloader, CloudflareConfig, CloudflareProvider};
use lizcel_host::dns::DnsReconciler;
use lizcel_host::proxy::ProxyReconciler;
use lizcel_host::scheduler::ActivationScheduler;
use lizcel_host::staging::ContentStager;
use lizcel_host::{create_router, ApiKeyHash, DeploymentService, Notifier};

const SECRET: &str = "hunter2";
const TARGET_IP: Ipv4Addr = Ipv4Addr::new(203, 0, 113, 7);

struct Host {
    _dir: tempfile::TempDir,
    sites: PathBuf,
    caddyfile: PathBuf,
    router: axum::Router,
}

fn host(cloudflare: &MockServer) -> Host {
    let dir = tempfile::tempdir().unwrap();
    let sites = dir.path().join("sites");
    let caddyfile = dir.path().join("Caddyfile");
    std::fs::write(&caddyfile, "# managed\n").unwrap();

    let provider = CloudflareProvider::new(CloudflareConfig {
        base_url: cloudflare.uri(),
        email: "ops@example.com".into(),
        api_token: "token".into(),
        timeout_secs: 5,
    })
    .unwrap();

    let notifier = Notifier::disabled();
    let proxy = Arc::new(ProxyReconciler::new(
        &caddyfile,
        &sites,
        Box::new(CaddyReloader::new("true")),
    ));
    let service = DeploymentService::new(
        ApiKeyHash::of_secret(SECRET),
        Arc::new(ContentStager::new(&sites)),
        DnsReconciler::new(Arc::new(provider), TARGET_IP, notifier.clone()),
        ActivationScheduler::new(proxy, notifier),
        Duration::ZERO,
    );

    Host {
        _dir: dir,
        sites,
        caddyfile,
        router: create_router(Arc::new(service), 1024 * 1024),
    }
}

fn bundle(files: &[(&str, &str)]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in files {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    let zipped = zip.finish().unwrap().into_inner();

    let mut gz = GzEncoder::new(Vec::new(), Compression::default());
    gz.write_all(&zipped).unwrap();
    gz.finish().unwrap()
}

fn push(secret: Option<&str>, config: &str, body: Vec<u8>) -> Request<Body> {
    let mut builder = Request::post("/push")
        .header("config", config)
        .header("Content-Type", "application/octet-stream");
    if let Some(secret) = secret {
        builder = builder.header("X-Lizcel-Auth", secret);
    }
    builder.body(Body::from(body)).unwrap()
}

async fn send(router: &axum::Router, request: Request<Body>) -> (StatusCode, String) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

async fn mount_zone(server: &MockServer, records: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/zones"))
        .and(query_param("name", "example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "errors": [],
            "result": [{ "id": "zone-1" }]
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/zones/zone-1/dns_records"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "errors": [],
            "result": records
        })))
        .mount(server)
        .await;
}

async fn wait_for_route(caddyfile: &Path, hostname: &str) -> String {
    let needle = format!("{} {{", hostname);
    for _ in 0..100 {
        let content = std::fs::read_to_string(caddyfile).unwrap();
        if content.contains(&needle) {
            return content;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("route for {} never appeared", hostname);
}

#[tokio::test]
async fn test_first_publish_creates_record_and_route() {
    let cloudflare = MockServer::start().await;
    mount_zone(&cloudflare, json!([])).await;
    Mock::given(method("POST"))
        .and(path("/zones/zone-1/dns_records"))
        .and(body_partial_json(json!({
            "type": "A",
            "name": "abc.example.com",
            "content": "203.0.113.7",
            "ttl": 1,
            "proxied": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "errors": [],
            "result": {
                "id": "rec-1",
                "type": "A",
                "name": "abc.example.com",
                "content": "203.0.113.7"
            }
        })))
        .expect(1)
        .mount(&cloudflare)
        .await;

    let host = host(&cloudflare);
    let (status, body) = send(
        &host.router,
        push(
            Some(SECRET),
            r#"{"domain":["abc","example","com"]}"#,
            bundle(&[("index.html", "<h1>hello</h1>"), ("css/site.css", "body{}")]),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.starts_with("DNS says: Domain abc.example.com added\n"));
    assert!(body.ends_with("URL: https://abc.example.com"));

    let site = host.sites.join("abc_example_com");
    assert_eq!(
        std::fs::read_to_string(site.join("index.html")).unwrap(),
        "<h1>hello</h1>"
    );
    assert!(site.join("css/site.css").exists());

    let caddyfile = wait_for_route(&host.caddyfile, "abc.example.com").await;
    assert!(caddyfile.starts_with("# managed\n"));
    assert!(caddyfile.contains(&format!("root * {}", site.display())));
    assert!(caddyfile.contains("file_server"));
}

#[tokio::test]
async fn test_republish_keeps_record_and_single_route() {
    let cloudflare = MockServer::start().await;
    mount_zone(
        &cloudflare,
        json!([{
            "id": "rec-1",
            "type": "A",
            "name": "abc.example.com",
            "content": "198.51.100.1"
        }]),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/zones/zone-1/dns_records"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&cloudflare)
        .await;

    let host = host(&cloudflare);
    let config = r#"{"domain":["abc","example","com"]}"#;

    for version in ["v1", "v2"] {
        let (status, body) = send(
            &host.router,
            push(Some(SECRET), config, bundle(&[("index.html", version)])),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains(
            "DNS says: Domain abc.example.com already exists, it's pointing to 198.51.100.1"
        ));
        wait_for_route(&host.caddyfile, "abc.example.com").await;
    }

    // Give a late duplicate activation a chance to show up
    tokio::time::sleep(Duration::from_millis(100)).await;
    let caddyfile = std::fs::read_to_string(&host.caddyfile).unwrap();
    assert_eq!(caddyfile.matches("abc.example.com {").count(), 1);
    assert_eq!(
        std::fs::read_to_string(host.sites.join("abc_example_com/index.html")).unwrap(),
        "v2"
    );
}

#[tokio::test]
async fn test_credentials_checked_before_anything_else() {
    let cloudflare = MockServer::start().await;
    let host = host(&cloudflare);
    let config = r#"{"domain":["abc","example","com"]}"#;

    let (missing, _) = send(&host.router, push(None, config, bundle(&[]))).await;
    let (wrong, _) = send(&host.router, push(Some("hunter3"), config, bundle(&[]))).await;

    assert_eq!(missing, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong, StatusCode::FORBIDDEN);
    assert!(!host.sites.exists());
    assert!(cloudflare.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_invalid_hostname_is_rejected_without_side_effects() {
    let cloudflare = MockServer::start().await;
    let host = host(&cloudflare);

    let (status, body) = send(
        &host.router,
        push(
            Some(SECRET),
            r#"{"domain":["a","b","example","com"]}"#,
            bundle(&[("index.html", "x")]),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body,
        "Error processing the files: Invalid domain: expected 2 or 3 labels, got 4"
    );
    assert!(!host.sites.exists());
    assert!(cloudflare.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_zone_is_server_error() {
    let cloudflare = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/zones"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "errors": [],
            "result": []
        })))
        .mount(&cloudflare)
        .await;

    let host = host(&cloudflare);
    let (status, body) = send(
        &host.router,
        push(
            Some(SECRET),
            r#"{"domain":["abc","example","com"]}"#,
            bundle(&[("index.html", "x")]),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body,
        "Error processing the files: Zone not found for the given domain: example.com"
    );
    assert_eq!(
        std::fs::read_to_string(&host.caddyfile).unwrap(),
        "# managed\n"
    );
}

#[tokio::test]
async fn test_corrupt_bundle_is_server_error() {
    let cloudflare = MockServer::start().await;
    let host = host(&cloudflare);

    let (status, body) = send(
        &host.router,
        push(
            Some(SECRET),
            r#"{"domain":["abc","example","com"]}"#,
            b"definitely not gzip".to_vec(),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.starts_with("Error processing the files: "));
    assert!(cloudflare.received_requests().await.unwrap().is_empty());
}
