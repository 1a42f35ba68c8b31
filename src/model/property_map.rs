//! Property maps: the key-value store on nodes and relationships.
//!
//! A missing key and a key set to null are the same thing: setting a key
//! to [`Value::Null`] removes it.

use hashbrown::HashMap;
use serde::Serialize;
use serde_json::Value as JsonValue;

use super::Value;
use crate::Result;

/// A map of property names to values.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PropertyMap {
    inner: HashMap<String, Value>,
}

impl PropertyMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.inner.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    /// Set `key` to `value`, returning the previous value.
    /// A null value removes the key.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let key = key.into();
        match value.into() {
            Value::Null => self.inner.remove(&key),
            value => self.inner.insert(key, value),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.inner.remove(key)
    }

    /// Merge `other` into this map. Keys in `other` win; null values in
    /// `other` remove the key here.
    pub fn update(&mut self, other: impl IntoIterator<Item = (String, Value)>) {
        for (k, v) in other {
            self.set(k, v);
        }
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.inner.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Entries sorted by key, for stable rendering.
    pub fn sorted(&self) -> Vec<(&str, &Value)> {
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }

    /// Build from the `data` object of a raw record.
    pub fn from_json(object: &serde_json::Map<String, JsonValue>) -> Result<Self> {
        let mut map = Self::new();
        for (k, v) in object {
            map.set(k.clone(), Value::from_json(v)?);
        }
        Ok(map)
    }

    /// Fails on the first value with no JSON form.
    pub fn to_json(&self) -> Result<serde_json::Map<String, JsonValue>> {
        self.inner.iter().map(|(k, v)| Ok((k.clone(), v.to_json()?))).collect()
    }
}

impl<K, V> FromIterator<(K, V)> for PropertyMap
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.set(k, v);
        }
        map
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for PropertyMap
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl IntoIterator for PropertyMap {
    type Item = (String, Value);
    type IntoIter = hashbrown::hash_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.into_iter()
    }
}
