//! Cache key derivation.
//!
//! Keys are colon-separated segments:
//!
//! ```text
//! {namespace}:{project}:{locale}:{slug}:{first|many|all|item}[:{item_id}][:{param_hash}]
//! {namespace}:{project}:{locale}:asset:{asset-url|asset-download}:{asset_id}[:{param_hash}]
//! ```
//!
//! The locale segment is always present (falling back to [`DEFAULT_LOCALE`]),
//! so entries for different locales never collide. The parameter hash is
//! present only when extra parameters affect the result and is computed over
//! the parameters serialized with sorted keys, so insertion order never
//! matters.

use crate::error::{Error, Result};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Locale segment used when none is given.
pub const DEFAULT_LOCALE: &str = "default";

/// Segment marking asset keys.
pub const ASSET_SEGMENT: &str = "asset";

/// Number of digest bytes kept in the parameter hash.
const PARAM_HASH_BYTES: usize = 8;

/// Extra parameters folded into a key. Sorted by construction.
pub type KeyParams = BTreeMap<String, Value>;

/// Query shapes over a collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CollectionQueryKind {
    First,
    Many,
    All,
    Item,
}

impl CollectionQueryKind {
    /// Every collection query kind, in key order.
    pub const ALL: [CollectionQueryKind; 4] = [
        CollectionQueryKind::First,
        CollectionQueryKind::Many,
        CollectionQueryKind::All,
        CollectionQueryKind::Item,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionQueryKind::First => "first",
            CollectionQueryKind::Many => "many",
            CollectionQueryKind::All => "all",
            CollectionQueryKind::Item => "item",
        }
    }
}

impl std::fmt::Display for CollectionQueryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Query shapes over assets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AssetQueryKind {
    AssetUrl,
    AssetDownload,
}

impl AssetQueryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetQueryKind::AssetUrl => "asset-url",
            AssetQueryKind::AssetDownload => "asset-download",
        }
    }
}

impl std::fmt::Display for AssetQueryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The operation a key identifies.
#[derive(Clone, Debug, PartialEq)]
pub enum Operation {
    Collection {
        slug: Option<String>,
        kind: CollectionQueryKind,
        item_id: Option<String>,
    },
    Asset {
        kind: AssetQueryKind,
        asset_id: Option<String>,
    },
}

/// Everything that distinguishes one cached query from another.
#[derive(Clone, Debug, PartialEq)]
pub struct KeyComponents {
    pub project_id: String,
    pub locale: Option<String>,
    pub operation: Operation,
    pub params: KeyParams,
}

impl KeyComponents {
    /// Components for a query over collection `slug`.
    pub fn collection(project_id: &str, slug: &str, kind: CollectionQueryKind) -> Self {
        KeyComponents {
            project_id: project_id.to_string(),
            locale: None,
            operation: Operation::Collection {
                slug: Some(slug.to_string()),
                kind,
                item_id: None,
            },
            params: KeyParams::new(),
        }
    }

    /// Components for an asset operation.
    pub fn asset(project_id: &str, kind: AssetQueryKind, asset_id: &str) -> Self {
        KeyComponents {
            project_id: project_id.to_string(),
            locale: None,
            operation: Operation::Asset {
                kind,
                asset_id: Some(asset_id.to_string()),
            },
            params: KeyParams::new(),
        }
    }

    pub fn with_locale(mut self, locale: &str) -> Self {
        self.locale = Some(locale.to_string());
        self
    }

    /// Attach an item id. Ignored for asset operations.
    pub fn with_item_id(mut self, id: &str) -> Self {
        if let Operation::Collection { item_id, .. } = &mut self.operation {
            *item_id = Some(id.to_string());
        }
        self
    }

    pub fn with_param(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.params.insert(name.to_string(), value.into());
        self
    }
}

/// Builds namespaced cache keys.
#[derive(Clone, Debug)]
pub struct CacheKeyBuilder {
    namespace: String,
}

impl CacheKeyBuilder {
    pub fn new(namespace: &str) -> Self {
        CacheKeyBuilder {
            namespace: namespace.to_string(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Prefix shared by every key this builder produces.
    pub fn namespace_prefix(&self) -> String {
        format!("{}:", self.namespace)
    }

    /// Prefix shared by every key of one project and locale.
    pub fn locale_prefix(&self, project_id: &str, locale: &str) -> String {
        format!("{}:{}:{}:", self.namespace, project_id, locale)
    }

    /// Prefix shared by every asset key of one project.
    pub fn asset_prefix(&self, project_id: &str) -> String {
        format!(
            "{}{}:",
            self.locale_prefix(project_id, DEFAULT_LOCALE),
            ASSET_SEGMENT
        )
    }

    /// Derive the key for `components`.
    ///
    /// # Errors
    /// `Error::InvalidArgument` when a collection operation has no slug, an
    /// asset operation has no asset id, or a slug, item id or asset id
    /// contains the `:` separator.
    pub fn build(&self, components: &KeyComponents) -> Result<String> {
        let locale = components
            .locale
            .as_deref()
            .filter(|l| !l.is_empty())
            .unwrap_or(DEFAULT_LOCALE);

        let hash = (!components.params.is_empty()).then(|| param_hash(&components.params));

        let mut parts: Vec<&str> = vec![
            self.namespace.as_str(),
            components.project_id.as_str(),
            locale,
        ];

        match &components.operation {
            Operation::Collection {
                slug,
                kind,
                item_id,
            } => {
                let slug = non_empty(slug.as_deref()).ok_or_else(|| {
                    Error::invalid("collection slug is required for collection cache keys")
                })?;
                parts.push(segment(slug, "collection slug")?);
                parts.push(kind.as_str());
                if let Some(id) = non_empty(item_id.as_deref()) {
                    parts.push(segment(id, "item id")?);
                }
            }
            Operation::Asset { kind, asset_id } => {
                let asset_id = non_empty(asset_id.as_deref()).ok_or_else(|| {
                    Error::invalid("asset id is required for asset cache keys")
                })?;
                parts.push(ASSET_SEGMENT);
                parts.push(kind.as_str());
                parts.push(segment(asset_id, "asset id")?);
            }
        }

        if let Some(hash) = hash.as_deref() {
            parts.push(hash);
        }

        Ok(parts.join(":"))
    }

    /// Split a key into its segments.
    pub fn parse(key: &str) -> Vec<&str> {
        key.split(':').collect()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn segment<'a>(value: &'a str, what: &str) -> Result<&'a str> {
    if value.contains(':') {
        return Err(Error::invalid(format!("{} must not contain ':': {}", what, value)));
    }
    Ok(value)
}

/// Stable hash of a parameter set.
///
/// Parameters are serialized as JSON with sorted keys (nested objects
/// included) and digested with SHA-256; the first bytes are hex encoded.
pub fn param_hash(params: &KeyParams) -> String {
    let canonical = serde_json::to_string(params).unwrap_or_default();
    let digest = Sha256::digest(canonical.as_bytes());
    hex::encode(&digest[..PARAM_HASH_BYTES])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn builder() -> CacheKeyBuilder {
        CacheKeyBuilder::new("ck")
    }

    #[test]
    fn test_collection_key_shape() {
        let components = KeyComponents::collection("proj", "blog_posts", CollectionQueryKind::First)
            .with_locale("en-US");
        let key = builder().build(&components).expect("Failed to build key");
        assert_eq!(key, "ck:proj:en-US:blog_posts:first");
    }

    #[test]
    fn test_item_key_includes_id() {
        let components = KeyComponents::collection("proj", "blog_posts", CollectionQueryKind::Item)
            .with_locale("en-US")
            .with_item_id("p1");
        let key = builder().build(&components).expect("Failed to build key");
        assert_eq!(key, "ck:proj:en-US:blog_posts:item:p1");
    }

    #[test]
    fn test_separator_in_segments_is_rejected() {
        let item = KeyComponents::collection("proj", "posts", CollectionQueryKind::Item)
            .with_item_id("a:b");
        let slug = KeyComponents::collection("proj", "blog:posts", CollectionQueryKind::All);
        let asset = KeyComponents::asset("proj", AssetQueryKind::AssetDownload, "x:y");

        for components in [item, slug, asset] {
            let err = builder().build(&components).unwrap_err();
            assert!(matches!(err, Error::InvalidArgument(_)));
        }
    }

    #[test]
    fn test_asset_key_shape() {
        let components =
            KeyComponents::asset("proj", AssetQueryKind::AssetDownload, "abc123");
        let key = builder().build(&components).expect("Failed to build key");
        assert_eq!(key, "ck:proj:default:asset:asset-download:abc123");
        assert!(key.starts_with(&builder().asset_prefix("proj")));
    }

    #[test]
    fn test_locale_defaults_when_missing() {
        let components = KeyComponents::collection("proj", "posts", CollectionQueryKind::All);
        let key = builder().build(&components).expect("Failed to build key");
        assert_eq!(CacheKeyBuilder::parse(&key)[2], DEFAULT_LOCALE);
    }

    #[test]
    fn test_params_append_hash() {
        let plain = KeyComponents::collection("proj", "posts", CollectionQueryKind::Many)
            .with_locale("en-US");
        let limited = plain.clone().with_param("limit", 5);

        let plain_key = builder().build(&plain).expect("Failed to build key");
        let limited_key = builder().build(&limited).expect("Failed to build key");

        assert_eq!(CacheKeyBuilder::parse(&plain_key).len(), 5);
        let parts = CacheKeyBuilder::parse(&limited_key);
        assert_eq!(parts.len(), 6);
        assert_eq!(parts[5].len(), PARAM_HASH_BYTES * 2);
    }

    #[test]
    fn test_param_order_does_not_matter() {
        let a = KeyComponents::asset("proj", AssetQueryKind::AssetDownload, "abc")
            .with_param("width", 300)
            .with_param("height", 200);
        let b = KeyComponents::asset("proj", AssetQueryKind::AssetDownload, "abc")
            .with_param("height", 200)
            .with_param("width", 300);

        assert_eq!(builder().build(&a).ok(), builder().build(&b).ok());
    }

    #[test]
    fn test_nested_param_order_does_not_matter() {
        let mut first = KeyParams::new();
        first.insert("filter".to_string(), json!({"a": 1, "b": 2}));
        let mut second = KeyParams::new();
        second.insert(
            "filter".to_string(),
            serde_json::from_str(r#"{"b": 2, "a": 1}"#).expect("Failed to parse"),
        );

        assert_eq!(param_hash(&first), param_hash(&second));
    }

    #[test]
    fn test_each_component_changes_key() {
        let base = KeyComponents::collection("proj", "posts", CollectionQueryKind::Item)
            .with_locale("en-US")
            .with_item_id("1")
            .with_param("limit", 5);
        let base_key = builder().build(&base).expect("Failed to build key");

        let variants = vec![
            base.clone().with_locale("fr-FR"),
            KeyComponents {
                project_id: "other".to_string(),
                ..base.clone()
            },
            base.clone().with_item_id("2"),
            base.clone().with_param("limit", 6),
            KeyComponents::collection("proj", "pages", CollectionQueryKind::Item)
                .with_locale("en-US")
                .with_item_id("1")
                .with_param("limit", 5),
            KeyComponents::collection("proj", "posts", CollectionQueryKind::First)
                .with_locale("en-US")
                .with_item_id("1")
                .with_param("limit", 5),
        ];

        for variant in variants {
            let key = builder().build(&variant).expect("Failed to build key");
            assert_ne!(key, base_key, "{:?} collided", variant);
        }
    }

    #[test]
    fn test_missing_slug_is_rejected() {
        let components = KeyComponents {
            project_id: "proj".to_string(),
            locale: None,
            operation: Operation::Collection {
                slug: None,
                kind: CollectionQueryKind::First,
                item_id: None,
            },
            params: KeyParams::new(),
        };
        let err = builder().build(&components).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_missing_asset_id_is_rejected() {
        let components = KeyComponents::asset("proj", AssetQueryKind::AssetUrl, "");
        let err = builder().build(&components).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(CollectionQueryKind::Many.to_string(), "many");
        assert_eq!(AssetQueryKind::AssetUrl.to_string(), "asset-url");
        assert_eq!(AssetQueryKind::AssetDownload.to_string(), "asset-download");
    }
}
