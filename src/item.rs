//! Content items and their open field bag.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Trait that every item type a collection can be queried as must implement.
///
/// [`CollectionItem`] covers the wire shape; implement this for your own
/// types to query collections with stronger typing.
///
/// # Example
///
/// ```
/// use content_kit::ContentItem;
/// use serde::{Deserialize, Serialize};
/// use serde_json::{Map, Value};
///
/// #[derive(Clone, Serialize, Deserialize)]
/// struct Post {
///     id: String,
///     data: Map<String, Value>,
/// }
///
/// impl ContentItem for Post {
///     fn id(&self) -> &str {
///         &self.id
///     }
///
///     fn field(&self, name: &str) -> Option<&Value> {
///         self.data.get(name).filter(|v| !v.is_null())
///     }
/// }
/// ```
pub trait ContentItem: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// Identifier of the item within its collection.
    fn id(&self) -> &str;

    /// Look up a field of the item's data. Missing and `null` fields are `None`.
    fn field(&self, name: &str) -> Option<&Value>;
}

/// Open string-keyed map of an item's field values.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemData(Map<String, Value>);

impl ItemData {
    pub fn new() -> Self {
        Self::default()
    }

    /// The value of `name`, or `None` when absent or `null`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name).filter(|v| !v.is_null())
    }

    /// The value of `name` when it is a string.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn insert(&mut self, name: &str, value: impl Into<Value>) {
        self.0.insert(name.to_string(), value.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl From<Map<String, Value>> for ItemData {
    fn from(map: Map<String, Value>) -> Self {
        ItemData(map)
    }
}

/// One published content record as returned by the API.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CollectionItem {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub data: ItemData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
}

impl CollectionItem {
    pub fn new(id: &str) -> Self {
        CollectionItem {
            id: id.to_string(),
            data: ItemData::new(),
            locale: None,
        }
    }

    pub fn with_field(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.data.insert(name, value);
        self
    }

    pub fn with_locale(mut self, locale: &str) -> Self {
        self.locale = Some(locale.to_string());
        self
    }
}

impl ContentItem for CollectionItem {
    fn id(&self) -> &str {
        &self.id
    }

    fn field(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}
