//! Basic usage example of the content client.
//!
//! Runs against an in-memory fetcher, so no server is needed.

use content_kit::storage::StorageKind;
use content_kit::{
    error::Result, AssetOptions, BinaryResponse, CacheConfig, Client, ClientConfig, QueryOptions,
    StaticFetcher,
};
use serde_json::json;
use std::sync::Arc;

/// Canned API responses for a small blog.
fn blog_fetcher() -> StaticFetcher {
    StaticFetcher::new()
        .with_json(
            "projects/demo/collections/blog_posts/items?locale=en-US",
            json!([
                {"id": "p1", "data": {"title": "Hello", "cover": "cover-1"}, "locale": "en-US"},
                {"id": "p2", "data": {"title": "Second post", "gallery": ["g1", "g2"]}, "locale": "en-US"},
                {"id": "p3", "data": {"title": "Third post"}, "locale": "en-US"}
            ]),
        )
        .with_json(
            "projects/demo/collections/blog_posts/items?locale=fr-FR",
            json!([
                {"id": "p1", "data": {"title": "Bonjour"}, "locale": "fr-FR"}
            ]),
        )
        .with_json(
            "projects/demo/collections/blog_posts/items/p2?locale=en-US",
            json!({"id": "p2", "data": {"title": "Second post"}, "locale": "en-US"}),
        )
        .with_binary(
            "projects/demo/assets/cover-1",
            BinaryResponse::ok(vec![0x89, b'P', b'N', b'G'], "image/png")
                .with_header("content-disposition", "inline; filename=\"cover.png\""),
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Debug)
        .try_init()
        .ok();

    println!("\n=== Content Kit - Basic Example ===\n");

    // 1. Build the client
    println!("1. Creating client with in-memory cache...");
    let fetcher = Arc::new(blog_fetcher());
    let config = ClientConfig::new("demo", "https://cms.example.com/api")
        .with_cache(CacheConfig::default().with_storage(StorageKind::Memory));
    let client = Client::with_fetcher(config, fetcher.clone())?;
    println!("   ✓ Client ready (locale {})\n", client.locale());

    // 2. First query - cache miss
    println!("2. Latest blog post:");
    let posts = client.collection("blog_posts")?;
    let latest = posts.first().await?;
    if let Some(title) = latest.field("title").single() {
        println!("   ✓ {} (network calls so far: {})\n", title, fetcher.call_count());
    }

    // 3. Same query - cache hit
    println!("3. Same query again:");
    posts.first().await?;
    println!(
        "   ✓ Served from cache (network calls so far: {})\n",
        fetcher.call_count()
    );

    // 4. Limited listing
    println!("4. Two most recent posts:");
    let recent = posts.many(&QueryOptions::new().with_limit(2)).await?;
    for post in &recent {
        println!("   - {}", post.id);
    }
    println!();

    // 5. Item lookups, found and missing
    println!("5. Item lookups:");
    let found = posts.item("p2").await?;
    println!("   ✓ p2 found: {}", !found.is_empty());
    let missing = posts.item("p404").await?;
    println!("   ✓ p404 is empty: {}\n", missing.is_empty());

    // 6. Assets
    println!("6. Assets:");
    let all = posts.all().await?;
    let gallery = all.asset_url("gallery", &AssetOptions::new().with_width(640))?;
    for url in gallery.into_vec() {
        println!("   - {}", url);
    }
    let cover = client
        .download_asset("cover-1", &AssetOptions::default())
        .await?;
    println!(
        "   ✓ Downloaded {:?} ({} bytes, {})\n",
        cover.file_name, cover.content_length, cover.content_type
    );

    // 7. Switch locale
    println!("7. Switching to fr-FR:");
    client.set_locale("fr-FR")?;
    let latest_fr = client.collection("blog_posts")?.first().await?;
    if let Some(title) = latest_fr.field("title").single() {
        println!("   ✓ {}\n", title);
    }

    // 8. Cache maintenance
    println!("8. Cache maintenance:");
    println!("   cached entries: {}", client.cache().keys().len());
    client.clear_locale_cache(Some("en-US"))?;
    println!("   after clearing en-US: {}", client.cache().keys().len());
    client.clear_cache();
    println!("   after clear_cache: {}", client.cache().keys().len());

    println!("\n=== Example Complete ===\n");

    Ok(())
}
