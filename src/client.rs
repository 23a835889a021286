//! The library facade.

use crate::asset::{AssetData, AssetManager, AssetOptions};
use crate::cache::Cache;
use crate::collection::CollectionQuery;
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::fetch::{Fetcher, HttpFetcher};
use crate::item::{CollectionItem, ContentItem};
use crate::validate;
use std::sync::{Arc, RwLock};

/// Cached client for one content project.
///
/// The client owns the current locale. Each query copies the locale when it
/// is created, so [`set_locale`](Client::set_locale) only affects queries
/// issued afterwards.
///
/// # Example
///
/// ```no_run
/// use content_kit::{Client, ClientConfig};
///
/// # async fn run() -> content_kit::Result<()> {
/// let client = Client::new(ClientConfig::new("my-project", "https://cms.example.com/api"))?;
///
/// let latest = client.collection("blog_posts")?.first().await?;
/// if let Some(title) = latest.field("title").single() {
///     println!("latest post: {}", title);
/// }
///
/// client.set_locale("fr-FR")?;
/// let posts = client.collection("blog_posts")?.all().await?;
/// println!("{} posts in French", posts.count());
/// # Ok(())
/// # }
/// ```
pub struct Client {
    config: ClientConfig,
    locale: RwLock<String>,
    cache: Arc<Cache>,
    fetcher: Arc<dyn Fetcher>,
    assets: Arc<AssetManager>,
}

impl Client {
    /// Create a client talking HTTP to `config.base_url`.
    ///
    /// # Errors
    /// `Error::InvalidArgument` for a malformed project id or locale;
    /// `Error::ConfigError` for an unusable base URL.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let fetcher = HttpFetcher::new(&config.base_url, config.timeout)?;
        Self::with_fetcher(config, Arc::new(fetcher))
    }

    /// Create a client on a custom transport.
    ///
    /// # Errors
    /// As for [`Client::new`].
    pub fn with_fetcher(config: ClientConfig, fetcher: Arc<dyn Fetcher>) -> Result<Self> {
        validate::project_id(&config.project_id)?;
        validate::locale(&config.locale)?;
        if config.base_url.trim().is_empty() {
            return Err(Error::ConfigError("base URL must not be empty".to_string()));
        }
        if config.cache.namespace.is_empty() || config.cache.namespace.contains(':') {
            return Err(Error::ConfigError(format!(
                "invalid cache namespace: {:?}",
                config.cache.namespace
            )));
        }

        let cache = Arc::new(Cache::from_config(&config.cache));
        let assets = Arc::new(AssetManager::new(
            &config.project_id,
            &config.base_url,
            Arc::clone(&cache),
            Arc::clone(&fetcher),
        ));

        info!(
            "✓ Content client ready for project {} (locale {}, cache {})",
            config.project_id,
            config.locale,
            if cache.is_enabled() {
                cache.storage().kind().to_string()
            } else {
                "disabled".to_string()
            }
        );

        Ok(Client {
            locale: RwLock::new(config.locale.clone()),
            config,
            cache,
            fetcher,
            assets,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn project_id(&self) -> &str {
        &self.config.project_id
    }

    /// Shared cache (for advanced use).
    pub fn cache(&self) -> &Arc<Cache> {
        &self.cache
    }

    /// Shared asset manager.
    pub fn assets(&self) -> &Arc<AssetManager> {
        &self.assets
    }

    /// Current locale.
    pub fn locale(&self) -> String {
        self.locale
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Switch locale for subsequent queries. Cached entries of other locales
    /// are kept.
    ///
    /// # Errors
    /// `Error::InvalidArgument` for a malformed locale; the current locale is
    /// left unchanged.
    pub fn set_locale(&self, locale: &str) -> Result<()> {
        validate::locale(locale)?;
        let mut current = self.locale.write().unwrap_or_else(|e| e.into_inner());
        debug!("Locale {} -> {}", current, locale);
        *current = locale.to_string();
        Ok(())
    }

    /// Query `slug` as plain [`CollectionItem`]s in the current locale.
    ///
    /// # Errors
    /// `Error::InvalidArgument` for a malformed slug.
    pub fn collection(&self, slug: &str) -> Result<CollectionQuery<CollectionItem>> {
        self.collection_as(slug)
    }

    /// Query `slug` decoding items as `T`.
    ///
    /// # Errors
    /// `Error::InvalidArgument` for a malformed slug.
    pub fn collection_as<T: ContentItem>(&self, slug: &str) -> Result<CollectionQuery<T>> {
        validate::collection_slug(slug)?;
        Ok(CollectionQuery::new(
            &self.config.project_id,
            slug,
            &self.locale(),
            Arc::clone(&self.cache),
            Arc::clone(&self.fetcher),
            Arc::clone(&self.assets),
            self.config.cache.null_ttl,
        ))
    }

    /// Drop cached entries for `locale`, or the current locale when `None`.
    ///
    /// # Errors
    /// `Error::InvalidArgument` for a malformed locale.
    pub fn clear_locale_cache(&self, locale: Option<&str>) -> Result<()> {
        let locale = match locale {
            Some(locale) => {
                validate::locale(locale)?;
                locale.to_string()
            }
            None => self.locale(),
        };
        self.cache
            .clear_locale_cache(&self.config.project_id, &locale);
        Ok(())
    }

    /// Drop every cached entry of this client's namespace.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Delete expired and corrupted cache entries.
    pub fn cleanup_cache(&self) {
        self.cache.cleanup();
    }

    /// Drop every cached asset download.
    pub fn clear_asset_cache(&self) {
        self.assets.clear_asset_cache();
    }

    /// URL of an asset. Independent of the current locale.
    ///
    /// # Errors
    /// See [`AssetManager::build_asset_url`].
    pub fn asset_url(&self, asset_id: &str, options: &AssetOptions) -> Result<String> {
        self.assets.build_asset_url(asset_id, options)
    }

    /// Download an asset through the cache.
    ///
    /// # Errors
    /// See [`AssetManager::download_asset`].
    pub async fn download_asset(&self, asset_id: &str, options: &AssetOptions) -> Result<AssetData> {
        self.assets.download_asset(asset_id, options).await
    }
}
