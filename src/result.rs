//! Uniform wrapper over "nothing", one item, or a list of items.
//!
//! Queries return a [`CollectionResult`] regardless of shape so callers can
//! read fields, resolve assets and iterate without checking which query
//! produced it.

use crate::asset::{AssetData, AssetManager, AssetOptions};
use crate::error::Result;
use crate::item::{CollectionItem, ContentItem};
use futures::future::try_join_all;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::sync::Arc;

/// Shape of a query result.
#[derive(Clone, Debug, PartialEq)]
pub enum Payload<T> {
    Empty,
    Single(T),
    Many(Vec<T>),
}

impl<T> Payload<T> {
    fn as_slice(&self) -> &[T] {
        match self {
            Payload::Empty => &[],
            Payload::Single(item) => std::slice::from_ref(item),
            Payload::Many(items) => items,
        }
    }
}

impl<T> From<Option<T>> for Payload<T> {
    fn from(item: Option<T>) -> Self {
        item.map_or(Payload::Empty, Payload::Single)
    }
}

/// Field values read from a result. Absent and `null` fields are `None`.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValues<'a> {
    Single(Option<&'a Value>),
    Many(Vec<Option<&'a Value>>),
}

impl<'a> FieldValues<'a> {
    /// The value of a single-shaped read.
    pub fn single(&self) -> Option<&'a Value> {
        match self {
            FieldValues::Single(value) => *value,
            FieldValues::Many(_) => None,
        }
    }

    /// The values of a list-shaped read; a single read yields zero or one.
    pub fn to_vec(&self) -> Vec<Option<&'a Value>> {
        match self {
            FieldValues::Single(None) => Vec::new(),
            FieldValues::Single(value) => vec![*value],
            FieldValues::Many(values) => values.clone(),
        }
    }
}

/// Asset URLs resolved from a field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AssetUrls {
    Single(Option<String>),
    Many(Vec<String>),
}

impl AssetUrls {
    pub fn single(&self) -> Option<&str> {
        match self {
            AssetUrls::Single(url) => url.as_deref(),
            AssetUrls::Many(_) => None,
        }
    }

    pub fn into_vec(self) -> Vec<String> {
        match self {
            AssetUrls::Single(url) => url.into_iter().collect(),
            AssetUrls::Many(urls) => urls,
        }
    }
}

/// Assets downloaded from a field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AssetDownloads {
    Single(Option<AssetData>),
    Many(Vec<AssetData>),
}

impl AssetDownloads {
    pub fn into_vec(self) -> Vec<AssetData> {
        match self {
            AssetDownloads::Single(asset) => asset.into_iter().collect(),
            AssetDownloads::Many(assets) => assets,
        }
    }
}

/// An asset reference is either a bare id or an object carrying an `id`.
fn asset_ref(value: &Value) -> Option<&str> {
    match value {
        Value::String(id) => Some(id),
        Value::Object(map) => map.get("id").and_then(Value::as_str),
        _ => None,
    }
}

/// Asset ids held by one field value, one level of arrays flattened.
fn asset_refs(value: &Value) -> Vec<&str> {
    match value {
        Value::Array(values) => values.iter().filter_map(asset_ref).collect(),
        other => asset_ref(other).into_iter().collect(),
    }
}

/// Result of a collection query.
///
/// Serializes as exactly the wrapped value: `null`, the item, or the list.
pub struct CollectionResult<T: ContentItem = CollectionItem> {
    payload: Payload<T>,
    assets: Arc<AssetManager>,
}

impl<T: ContentItem> CollectionResult<T> {
    pub(crate) fn new(payload: Payload<T>, assets: Arc<AssetManager>) -> Self {
        CollectionResult { payload, assets }
    }

    pub fn payload(&self) -> &Payload<T> {
        &self.payload
    }

    pub fn into_payload(self) -> Payload<T> {
        self.payload
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    pub fn is_single(&self) -> bool {
        matches!(self.payload, Payload::Single(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self.payload, Payload::Many(_))
    }

    pub fn count(&self) -> usize {
        self.as_slice().len()
    }

    /// The items as a slice: empty, one item, or the list.
    pub fn as_slice(&self) -> &[T] {
        self.payload.as_slice()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.as_slice().iter()
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.as_slice().to_vec()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.iter().map(ContentItem::id).collect()
    }

    /// Read field `name` of each item.
    ///
    /// An empty result reads as `Single(None)`; lists yield one entry per
    /// item with `None` where the field is missing.
    pub fn field(&self, name: &str) -> FieldValues<'_> {
        match &self.payload {
            Payload::Empty => FieldValues::Single(None),
            Payload::Single(item) => FieldValues::Single(item.field(name)),
            Payload::Many(items) => {
                FieldValues::Many(items.iter().map(|item| item.field(name)).collect())
            }
        }
    }

    /// Asset ids referenced by field `name`, and whether the read is
    /// list-shaped.
    fn field_asset_refs(&self, name: &str) -> (Vec<&str>, bool) {
        match &self.payload {
            Payload::Empty => (Vec::new(), false),
            Payload::Single(item) => match item.field(name) {
                Some(value) => (asset_refs(value), value.is_array()),
                None => (Vec::new(), false),
            },
            Payload::Many(items) => (
                items
                    .iter()
                    .filter_map(|item| item.field(name))
                    .flat_map(asset_refs)
                    .collect(),
                true,
            ),
        }
    }

    /// Build asset URLs for the ids held in field `name`.
    ///
    /// A single item with a scalar field yields `Single`; lists (and
    /// array-valued fields such as galleries) yield `Many` with one level of
    /// nesting flattened and missing values dropped. No network access.
    ///
    /// # Errors
    /// `Error::InvalidArgument` when a referenced id or a transform
    /// dimension is invalid.
    pub fn asset_url(&self, field: &str, options: &AssetOptions) -> Result<AssetUrls> {
        let (ids, many) = self.field_asset_refs(field);
        let urls = ids
            .into_iter()
            .map(|id| self.assets.build_asset_url(id, options))
            .collect::<Result<Vec<_>>>()?;

        Ok(if many {
            AssetUrls::Many(urls)
        } else {
            AssetUrls::Single(urls.into_iter().next())
        })
    }

    /// Download the assets held in field `name`, shaped like
    /// [`asset_url`](Self::asset_url). List downloads run concurrently.
    ///
    /// # Errors
    /// The first download error encountered.
    pub async fn download_asset(
        &self,
        field: &str,
        options: &AssetOptions,
    ) -> Result<AssetDownloads> {
        let (ids, many) = self.field_asset_refs(field);
        let assets = &self.assets;
        let downloads =
            try_join_all(ids.into_iter().map(|id| assets.download_asset(id, options))).await?;

        Ok(if many {
            AssetDownloads::Many(downloads)
        } else {
            AssetDownloads::Single(downloads.into_iter().next())
        })
    }

    /// Transform every item into a plain `Vec`, one entry per item. Unlike
    /// [`filter`](Self::filter) this does not return a `CollectionResult`.
    pub fn map<U, F: FnMut(&T) -> U>(&self, f: F) -> Vec<U> {
        self.iter().map(f).collect()
    }

    /// Keep matching items. Always list-shaped, even for zero or one match.
    pub fn filter<P: FnMut(&T) -> bool>(&self, mut predicate: P) -> CollectionResult<T> {
        let items = self.iter().filter(|item| predicate(*item)).cloned().collect();
        CollectionResult::new(Payload::Many(items), Arc::clone(&self.assets))
    }

    pub fn find<P: FnMut(&T) -> bool>(&self, mut predicate: P) -> Option<&T> {
        self.iter().find(|item| predicate(*item))
    }

    pub fn first(&self) -> Option<&T> {
        self.as_slice().first()
    }

    pub fn last(&self) -> Option<&T> {
        self.as_slice().last()
    }
}

impl<T: ContentItem> Clone for CollectionResult<T> {
    fn clone(&self) -> Self {
        CollectionResult::new(self.payload.clone(), Arc::clone(&self.assets))
    }
}

impl<T: ContentItem + std::fmt::Debug> std::fmt::Debug for CollectionResult<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("CollectionResult").field(&self.payload).finish()
    }
}

impl<'a, T: ContentItem> IntoIterator for &'a CollectionResult<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: ContentItem> Serialize for CollectionResult<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match &self.payload {
            Payload::Empty => serializer.serialize_none(),
            Payload::Single(item) => item.serialize(serializer),
            Payload::Many(items) => items.serialize(serializer),
        }
    }
}
