//! Asset URL synthesis and cached binary downloads.
//!
//! Assets are locale-independent: neither their URLs nor their cache keys
//! vary with the client's locale. Downloads are cached like any other value,
//! but because cache entries are text, binary payloads are base64 encoded on
//! the way in and decoded on the way out. That transcoding lives here; the
//! [`Cache`] never knows it is holding binary data.

use crate::cache::Cache;
use crate::error::{Error, Result};
use crate::fetch::{endpoints, http_error, BinaryResponse, Fetcher};
use crate::key::{AssetQueryKind, KeyComponents};
use crate::validate;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Content type assumed when the response does not declare one.
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Transform and caching options for one asset request.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AssetOptions {
    /// Named server-side variant (e.g. `thumbnail`).
    pub variant: Option<String>,
    /// Target width in pixels; must be positive.
    pub width: Option<u32>,
    /// Target height in pixels; must be positive.
    pub height: Option<u32>,
    /// Read and write the download cache. Defaults to `true`.
    pub use_cache: Option<bool>,
    /// Lifetime of the cached download, overriding the cache default.
    pub cache_ttl: Option<Duration>,
}

impl AssetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_variant(mut self, variant: &str) -> Self {
        self.variant = Some(variant.to_string());
        self
    }

    pub fn with_width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }

    pub fn with_height(mut self, height: u32) -> Self {
        self.height = Some(height);
        self
    }

    pub fn with_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = Some(use_cache);
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    fn validate(&self) -> Result<()> {
        validate::dimension("width", self.width)?;
        validate::dimension("height", self.height)
    }

    /// Transform query parameters, always in `variant`, `width`, `height` order.
    pub fn query(&self) -> Vec<(String, String)> {
        let mut query = Vec::new();
        if let Some(variant) = &self.variant {
            query.push(("variant".to_string(), variant.clone()));
        }
        if let Some(width) = self.width {
            query.push(("width".to_string(), width.to_string()));
        }
        if let Some(height) = self.height {
            query.push(("height".to_string(), height.to_string()));
        }
        query
    }
}

/// A downloaded asset. Owned by the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetData {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub content_length: u64,
    pub file_name: Option<String>,
    pub asset_id: String,
}

impl AssetData {
    fn from_response(asset_id: &str, resp: BinaryResponse) -> Self {
        let content_type = resp
            .header("content-type")
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();
        let content_length = resp
            .header("content-length")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|len| *len > 0)
            .unwrap_or(resp.body.len() as u64);
        let file_name = resp.header("content-disposition").and_then(parse_file_name);

        AssetData {
            bytes: resp.body,
            content_type,
            content_length,
            file_name,
            asset_id: asset_id.to_string(),
        }
    }
}

/// Cached, text-safe form of [`AssetData`].
#[derive(Serialize, Deserialize)]
struct StoredAsset {
    data: String,
    content_type: String,
    content_length: u64,
    #[serde(default)]
    file_name: Option<String>,
    asset_id: String,
}

impl StoredAsset {
    fn encode(asset: &AssetData) -> Self {
        StoredAsset {
            data: BASE64.encode(&asset.bytes),
            content_type: asset.content_type.clone(),
            content_length: asset.content_length,
            file_name: asset.file_name.clone(),
            asset_id: asset.asset_id.clone(),
        }
    }

    fn decode(self) -> Option<AssetData> {
        let bytes = BASE64.decode(self.data.as_bytes()).ok()?;
        Some(AssetData {
            bytes,
            content_type: self.content_type,
            content_length: self.content_length,
            file_name: self.file_name,
            asset_id: self.asset_id,
        })
    }
}

/// Pull the file name out of a `Content-Disposition` header.
fn parse_file_name(disposition: &str) -> Option<String> {
    disposition
        .split(';')
        .filter_map(|part| part.split_once('='))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("filename"))
        .map(|(_, value)| value.trim().trim_matches('"').to_string())
        .filter(|name| !name.is_empty())
}

/// Builds asset URLs and downloads asset payloads through the shared cache.
pub struct AssetManager {
    project_id: String,
    base_url: String,
    cache: Arc<Cache>,
    fetcher: Arc<dyn Fetcher>,
}

impl AssetManager {
    pub fn new(
        project_id: &str,
        base_url: &str,
        cache: Arc<Cache>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        AssetManager {
            project_id: project_id.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            cache,
            fetcher,
        }
    }

    /// Deterministic download URL for `asset_id`. No network access.
    ///
    /// # Errors
    /// `Error::InvalidArgument` for a malformed asset id or a zero dimension;
    /// `Error::ConfigError` when the base URL does not form a valid URL.
    pub fn build_asset_url(&self, asset_id: &str, options: &AssetOptions) -> Result<String> {
        validate::asset_id(asset_id)?;
        options.validate()?;

        let raw = format!(
            "{}/{}",
            self.base_url,
            endpoints::asset(&self.project_id, asset_id)
        );
        let mut url = Url::parse(&raw)
            .map_err(|e| Error::ConfigError(format!("invalid asset URL {}: {}", raw, e)))?;

        let query = options.query();
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(&query);
        }
        Ok(url.into())
    }

    /// Download `asset_id`, serving it from the cache when possible.
    ///
    /// # Errors
    /// Validation errors as for [`build_asset_url`](Self::build_asset_url);
    /// `Error::Http` for non-2xx responses (message taken from a JSON
    /// `message`/`detail` field, else the body text, else the status line);
    /// transport errors unchanged.
    pub async fn download_asset(&self, asset_id: &str, options: &AssetOptions) -> Result<AssetData> {
        validate::asset_id(asset_id)?;
        options.validate()?;

        let mut components =
            KeyComponents::asset(&self.project_id, AssetQueryKind::AssetDownload, asset_id);
        for (name, value) in options.query() {
            components = components.with_param(&name, value);
        }
        let key = self.cache.generate_key(&components)?;
        let use_cache = options.use_cache.unwrap_or(true);

        if use_cache {
            if let Some(stored) = self.cache.get::<StoredAsset>(&key) {
                match stored.decode() {
                    Some(asset) => {
                        debug!("✓ Asset {} served from cache", asset_id);
                        return Ok(asset);
                    }
                    None => {
                        warn!("⚠ Cached asset {} failed to decode, refetching", asset_id);
                        self.cache.remove(&key);
                    }
                }
            }
        }

        let path = endpoints::asset(&self.project_id, asset_id);
        let resp = self.fetcher.get_binary(&path, &options.query()).await?;
        if !resp.is_success() {
            return Err(http_error(resp.status, &resp.body, true));
        }

        let asset = AssetData::from_response(asset_id, resp);
        debug!(
            "✓ Asset {} downloaded ({} bytes, {})",
            asset_id, asset.content_length, asset.content_type
        );

        if use_cache {
            self.cache
                .set(&key, &StoredAsset::encode(&asset), options.cache_ttl);
        }
        Ok(asset)
    }

    /// Remove every cached asset download of this project.
    pub fn clear_asset_cache(&self) {
        let prefix = self.cache.key_builder().asset_prefix(&self.project_id);
        let removed = self.cache.remove_prefix(&prefix);
        debug!("✓ Cleared {} cached assets", removed);
    }
}
