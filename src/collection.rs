//! Cached queries over one collection.
//!
//! A [`CollectionQuery`] is bound to a `(project, slug, locale)` triple when
//! it is created. The locale is copied in, so changing the client's locale
//! afterwards does not affect queries already handed out.
//!
//! Every query follows the same order: cache read, then on a miss a fetch of
//! the collection, then a cache write. Empty lookups are cached too, with the
//! short "null" TTL, so missing content is not refetched on every call.

use crate::asset::AssetManager;
use crate::cache::Cache;
use crate::error::Result;
use crate::fetch::{endpoints, fetch_as, Fetcher};
use crate::item::{CollectionItem, ContentItem};
use crate::key::{CollectionQueryKind, KeyComponents};
use crate::result::{CollectionResult, Payload};
use crate::validate;
use serde::Serialize;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

/// Options for [`CollectionQuery::many`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueryOptions {
    /// Maximum number of items returned. Applied after fetching the whole
    /// collection; `0` means no limit.
    pub limit: Option<usize>,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Summary of a collection in one locale.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CollectionInfo {
    pub slug: String,
    pub item_count: usize,
    pub locale: String,
}

/// Queries over one collection in one locale.
pub struct CollectionQuery<T: ContentItem = CollectionItem> {
    project_id: String,
    slug: String,
    locale: String,
    cache: Arc<Cache>,
    fetcher: Arc<dyn Fetcher>,
    assets: Arc<AssetManager>,
    null_ttl: Duration,
    _item: PhantomData<fn() -> T>,
}

impl<T: ContentItem> CollectionQuery<T> {
    pub(crate) fn new(
        project_id: &str,
        slug: &str,
        locale: &str,
        cache: Arc<Cache>,
        fetcher: Arc<dyn Fetcher>,
        assets: Arc<AssetManager>,
        null_ttl: Duration,
    ) -> Self {
        CollectionQuery {
            project_id: project_id.to_string(),
            slug: slug.to_string(),
            locale: locale.to_string(),
            cache,
            fetcher,
            assets,
            null_ttl,
            _item: PhantomData,
        }
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    /// Locale captured when this query was created.
    pub fn locale(&self) -> &str {
        &self.locale
    }

    fn components(&self, kind: CollectionQueryKind) -> KeyComponents {
        KeyComponents::collection(&self.project_id, &self.slug, kind).with_locale(&self.locale)
    }

    fn wrap(&self, payload: Payload<T>) -> CollectionResult<T> {
        CollectionResult::new(payload, Arc::clone(&self.assets))
    }

    async fn fetch_items(&self) -> Result<Vec<T>> {
        let path = endpoints::collection_items(&self.project_id, &self.slug, &self.locale);
        let items: Vec<T> = fetch_as(self.fetcher.as_ref(), &path).await?;
        debug!(
            "✓ Fetched {} items from {} ({})",
            items.len(),
            self.slug,
            self.locale
        );
        Ok(items)
    }

    /// Cache an optional item; `None` is kept only for the null TTL.
    fn store_optional(&self, key: &str, item: &Option<T>) {
        let ttl = item.is_none().then_some(self.null_ttl);
        self.cache.set(key, item, ttl);
    }

    /// The first item of the collection, or an empty result.
    ///
    /// # Errors
    /// Transport and decoding errors from the listing fetch.
    pub async fn first(&self) -> Result<CollectionResult<T>> {
        let key = self.cache.generate_key(&self.components(CollectionQueryKind::First))?;

        if let Some(cached) = self.cache.get::<Option<T>>(&key) {
            debug!("✓ Cache hit for {}", key);
            return Ok(self.wrap(cached.into()));
        }

        let first = self.fetch_items().await?.into_iter().next();
        self.store_optional(&key, &first);
        Ok(self.wrap(first.into()))
    }

    /// Up to `options.limit` items of the collection.
    ///
    /// The whole collection is always fetched; the limit is applied locally
    /// and is part of the cache key, so different limits are cached apart.
    ///
    /// # Errors
    /// Transport and decoding errors from the listing fetch.
    pub async fn many(&self, options: &QueryOptions) -> Result<CollectionResult<T>> {
        self.list(CollectionQueryKind::Many, options).await
    }

    /// Every item of the collection.
    ///
    /// # Errors
    /// Transport and decoding errors from the listing fetch.
    pub async fn all(&self) -> Result<CollectionResult<T>> {
        self.list(CollectionQueryKind::All, &QueryOptions::default())
            .await
    }

    async fn list(
        &self,
        kind: CollectionQueryKind,
        options: &QueryOptions,
    ) -> Result<CollectionResult<T>> {
        let mut components = self.components(kind);
        if let Some(limit) = options.limit {
            components = components.with_param("limit", limit);
        }
        let key = self.cache.generate_key(&components)?;

        if let Some(cached) = self.cache.get::<Vec<T>>(&key) {
            debug!("✓ Cache hit for {}", key);
            return Ok(self.wrap(Payload::Many(cached)));
        }

        let mut items = self.fetch_items().await?;
        if let Some(limit) = options.limit.filter(|l| *l > 0) {
            items.truncate(limit);
        }

        let ttl = items.is_empty().then_some(self.null_ttl);
        self.cache.set(&key, &items, ttl);
        Ok(self.wrap(Payload::Many(items)))
    }

    /// One item by id.
    ///
    /// A 404 from the API is not an error: the miss is cached for the null
    /// TTL and an empty result is returned.
    ///
    /// # Errors
    /// `Error::InvalidArgument` for a malformed id; any transport error other
    /// than 404.
    pub async fn item(&self, id: &str) -> Result<CollectionResult<T>> {
        validate::item_id(id)?;
        let key = self.cache.generate_key(
            &self
                .components(CollectionQueryKind::Item)
                .with_item_id(id),
        )?;

        if let Some(cached) = self.cache.get::<Option<T>>(&key) {
            debug!("✓ Cache hit for {}", key);
            return Ok(self.wrap(cached.into()));
        }

        let path = endpoints::collection_item(&self.project_id, &self.slug, id, &self.locale);
        let item = match fetch_as::<T>(self.fetcher.as_ref(), &path).await {
            Ok(item) => Some(item),
            Err(e) if e.is_not_found() => {
                debug!("Item {} not found in {}, caching miss", id, self.slug);
                None
            }
            Err(e) => return Err(e),
        };

        self.store_optional(&key, &item);
        Ok(self.wrap(item.into()))
    }

    /// Remove the base cache entries of every query kind for this collection
    /// and locale. Entries for specific limits or item ids are left to
    /// expire.
    pub fn clear_cache(&self) {
        for kind in CollectionQueryKind::ALL {
            match self.cache.generate_key(&self.components(kind)) {
                Ok(key) => self.cache.remove(&key),
                Err(e) => warn!("⚠ Skipping cache clear for {}: {}", self.slug, e),
            }
        }
        debug!("✓ Cleared cache for {} ({})", self.slug, self.locale);
    }

    /// Fetch the collection (bypassing the cache) and summarize it.
    ///
    /// # Errors
    /// Transport and decoding errors from the listing fetch.
    pub async fn collection_info(&self) -> Result<CollectionInfo> {
        let items = self.fetch_items().await?;
        Ok(CollectionInfo {
            slug: self.slug.clone(),
            item_count: items.len(),
            locale: self.locale.clone(),
        })
    }
}
