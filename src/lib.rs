//! # content-kit
//!
//! A cached, fluent client for querying published content collections and
//! their binary assets.
//!
//! ## Features
//!
//! - **Fluent queries:** `client.collection("blog_posts")?.first().await?`
//! - **Transparent caching:** every query result is cached with a TTL in
//!   persistent, session or in-memory storage, with automatic fallback
//! - **Locale aware:** content and its cache entries are scoped per locale;
//!   assets are not
//! - **One result type:** single items and lists share field access, asset
//!   URL synthesis and iteration through [`CollectionResult`]
//! - **Best-effort cache:** storage failures degrade to cache misses and
//!   never fail a query
//! - **Pluggable transport:** [`HttpFetcher`] in production, [`StaticFetcher`]
//!   in tests, or your own [`Fetcher`]
//!
//! ## Quick Start
//!
//! ```
//! use content_kit::{AssetOptions, CacheConfig, Client, ClientConfig, QueryOptions, StaticFetcher};
//! use content_kit::storage::StorageKind;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> content_kit::Result<()> {
//! let fetcher = StaticFetcher::new().with_json(
//!     "projects/my-project/collections/blog_posts/items?locale=en-US",
//!     json!([{"id": "p1", "data": {"title": "Hello", "cover": "img1"}, "locale": "en-US"}]),
//! );
//! let config = ClientConfig::new("my-project", "https://cms.example.com/api")
//!     .with_cache(CacheConfig::default().with_storage(StorageKind::Memory));
//! let client = Client::with_fetcher(config, Arc::new(fetcher))?;
//!
//! let posts = client.collection("blog_posts")?;
//! let latest = posts.first().await?;
//! assert_eq!(latest.field("title").single(), Some(&json!("Hello")));
//!
//! let recent = posts.many(&QueryOptions::new().with_limit(5)).await?;
//! assert_eq!(recent.count(), 1);
//!
//! let cover = latest.asset_url("cover", &AssetOptions::new().with_width(300))?;
//! assert_eq!(
//!     cover.single(),
//!     Some("https://cms.example.com/api/projects/my-project/assets/img1?width=300")
//! );
//! # Ok(())
//! # }
//! ```
//!
//! ## Logging
//!
//! The crate logs through the [`log`](https://docs.rs/log) facade. Install
//! any logger (e.g. `env_logger`) and set `RUST_LOG=content_kit=debug` to see
//! cache hits, misses and fetches.

#[macro_use]
extern crate log;

pub mod asset;
pub mod cache;
pub mod client;
pub mod collection;
pub mod config;
pub mod error;
pub mod fetch;
pub mod item;
pub mod key;
pub mod observability;
pub mod result;
pub mod serialization;
pub mod storage;
pub mod validate;

// Re-exports for convenience
pub use asset::{AssetData, AssetManager, AssetOptions};
pub use cache::Cache;
pub use client::Client;
pub use collection::{CollectionInfo, CollectionQuery, QueryOptions};
pub use config::{CacheConfig, ClientConfig};
pub use error::{Error, Result};
pub use fetch::{BinaryResponse, Fetcher, HttpFetcher, StaticFetcher};
pub use item::{CollectionItem, ContentItem, ItemData};
pub use result::{AssetDownloads, AssetUrls, CollectionResult, FieldValues, Payload};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
