//! Graph configuration.

use serde::{Deserialize, Deserializer, Serialize};

/// Root that remote references are formed against when nothing else is
/// configured.
pub const DEFAULT_BASE_URI: &str = "http://localhost:7474/db/data/";

/// Environment variable read by [`GraphConfig::from_env`].
pub const URI_ENV_VAR: &str = "NEO4J_URI";

/// Configuration for a [`Graph`](crate::Graph) context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Graph root URI; always ends with `/`. Node references look like
    /// `{base_uri}node/{id}`.
    #[serde(deserialize_with = "deserialize_base_uri")]
    pub base_uri: String,
    /// Identity cache size past which dead entries are swept.
    pub cache_prune_threshold: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            base_uri: DEFAULT_BASE_URI.to_owned(),
            cache_prune_threshold: 1024,
        }
    }
}

impl GraphConfig {
    pub fn with_base_uri(mut self, uri: &str) -> Self {
        self.base_uri = normalize_base_uri(uri);
        self
    }

    /// Defaults, with `base_uri` taken from `NEO4J_URI` when set.
    pub fn from_env() -> Self {
        match std::env::var(URI_ENV_VAR) {
            Ok(uri) if !uri.trim().is_empty() => Self::default().with_base_uri(uri.trim()),
            _ => Self::default(),
        }
    }
}

fn deserialize_base_uri<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    let uri = String::deserialize(deserializer)?;
    Ok(normalize_base_uri(&uri))
}

/// `http://host:7474` → `http://host:7474/db/data/`
pub(crate) fn normalize_base_uri(uri: &str) -> String {
    let mut base = uri.trim_end_matches('/').to_owned();
    if !base.ends_with("/db/data") {
        base.push_str("/db/data");
    }
    base.push('/');
    base
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base_uri() {
        assert_eq!(normalize_base_uri("http://example.com:7474"), "http://example.com:7474/db/data/");
        assert_eq!(normalize_base_uri("http://example.com:7474/"), "http://example.com:7474/db/data/");
        assert_eq!(normalize_base_uri("http://example.com/db/data"), "http://example.com/db/data/");
        assert_eq!(normalize_base_uri(DEFAULT_BASE_URI), DEFAULT_BASE_URI);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: GraphConfig = serde_json::from_str(r#"{"cache_prune_threshold": 8}"#).unwrap();
        assert_eq!(config.base_uri, DEFAULT_BASE_URI);
        assert_eq!(config.cache_prune_threshold, 8);
    }

    #[test]
    fn test_deserialized_base_uri_is_normalized() {
        let config: GraphConfig = serde_json::from_str(r#"{"base_uri": "http://db.example:7474"}"#).unwrap();
        assert_eq!(config.base_uri, "http://db.example:7474/db/data/");
    }
}
