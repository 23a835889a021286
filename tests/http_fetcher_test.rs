//! HTTP transport tests against a local axum server.

use axum::extract::{Path, Query};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use content_kit::fetch::{Fetcher, HttpFetcher};
use content_kit::storage::StorageKind;
use content_kit::{AssetOptions, CacheConfig, Client, ClientConfig, Error};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

async fn list_items(
    Path(slug): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let locale = query.get("locale").cloned().unwrap_or_default();
    match slug.as_str() {
        "posts" => Json(json!([
            {"id": "p1", "data": {"title": format!("Hello {}", locale)}, "locale": locale}
        ]))
        .into_response(),
        "broken" => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"detail": {"message": "database unavailable"}})),
        )
            .into_response(),
        _ => (StatusCode::NOT_FOUND, Json(json!({"message": "no such collection"}))).into_response(),
    }
}

async fn get_item(Path((_slug, id)): Path<(String, String)>) -> impl IntoResponse {
    if id == "p1" {
        Json(json!({"id": "p1", "data": {"title": "Hello"}})).into_response()
    } else {
        (StatusCode::NOT_FOUND, "not here").into_response()
    }
}

async fn get_asset(
    Path(id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    match id.as_str() {
        "logo" => {
            let width = query.get("width").cloned().unwrap_or_else(|| "orig".to_string());
            (
                [
                    (header::CONTENT_TYPE, "image/png".to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("inline; filename=\"logo-{}.png\"", width),
                    ),
                ],
                vec![0x89u8, b'P', b'N', b'G'],
            )
                .into_response()
        }
        "slow" => {
            tokio::time::sleep(Duration::from_secs(2)).await;
            (StatusCode::OK, "late").into_response()
        }
        _ => (StatusCode::FORBIDDEN, "asset is private").into_response(),
    }
}

async fn spawn_server() -> SocketAddr {
    let app = Router::new()
        .route("/api/projects/proj/collections/{slug}/items", get(list_items))
        .route("/api/projects/proj/collections/{slug}/items/{id}", get(get_item))
        .route("/api/projects/proj/assets/{id}", get(get_asset));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind listener");
    let addr = listener.local_addr().expect("Failed to read local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });
    addr
}

fn base_url(addr: SocketAddr) -> String {
    format!("http://{}/api", addr)
}

fn client(addr: SocketAddr, namespace: &str) -> Client {
    let config = ClientConfig::new("proj", &base_url(addr)).with_cache(
        CacheConfig::default()
            .with_storage(StorageKind::Memory)
            .with_namespace(namespace),
    );
    Client::new(config).expect("Failed to build client")
}

#[tokio::test]
async fn test_get_json_and_error_translation() {
    let addr = spawn_server().await;
    let fetcher =
        HttpFetcher::new(&base_url(addr), Duration::from_secs(5)).expect("Failed to build fetcher");

    let body: Value = fetcher
        .get_json("projects/proj/collections/posts/items?locale=en-US")
        .await
        .expect("Request should succeed");
    assert_eq!(body[0]["data"]["title"], "Hello en-US");

    let err = fetcher
        .get_json("projects/proj/collections/broken/items?locale=en-US")
        .await
        .unwrap_err();
    match err {
        Error::Http {
            status,
            message,
            details,
        } => {
            assert_eq!(status, 500);
            assert_eq!(message, "database unavailable");
            assert!(details.is_some());
        }
        other => panic!("unexpected error {:?}", other),
    }

    let err = fetcher
        .get_json("projects/proj/collections/posts/items/zzz?locale=en-US")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(matches!(err, Error::Http { ref message, .. } if message == "HTTP 404 Not Found"));
}

#[tokio::test]
async fn test_client_over_http() {
    let addr = spawn_server().await;
    let client = client(addr, "http-client");
    let posts = client.collection("posts").expect("Failed to build query");

    let first = posts.first().await.expect("Query should succeed");
    assert_eq!(first.field("title").single(), Some(&json!("Hello en-US")));

    let item = posts.item("p1").await.expect("Query should succeed");
    assert_eq!(item.ids(), vec!["p1"]);

    let missing = posts.item("nope").await.expect("404 should not error");
    assert!(missing.is_empty());

    let info = posts.collection_info().await.expect("Query should succeed");
    assert_eq!(info.item_count, 1);
}

#[tokio::test]
async fn test_download_asset_over_http() {
    let addr = spawn_server().await;
    let client = client(addr, "http-asset");

    let asset = client
        .download_asset("logo", &AssetOptions::new().with_width(64))
        .await
        .expect("Download should succeed");
    assert_eq!(asset.bytes, vec![0x89, b'P', b'N', b'G']);
    assert_eq!(asset.content_type, "image/png");
    assert_eq!(asset.content_length, 4);
    assert_eq!(asset.file_name.as_deref(), Some("logo-64.png"));

    let err = client
        .download_asset("secret", &AssetOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(403));
    assert!(matches!(err, Error::Http { ref message, .. } if message == "asset is private"));
}

#[tokio::test]
async fn test_timeout_is_per_request() {
    let addr = spawn_server().await;
    let fetcher = HttpFetcher::new(&base_url(addr), Duration::from_millis(200))
        .expect("Failed to build fetcher");

    let err = fetcher
        .get_binary("projects/proj/assets/slow", &[])
        .await
        .unwrap_err();
    assert!(err.is_timeout());

    let ok = fetcher
        .get_binary("projects/proj/assets/logo", &[])
        .await
        .expect("Request should succeed");
    assert!(ok.is_success());
}
