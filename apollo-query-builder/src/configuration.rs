//! Query builder configuration.
//!
//! The crate reads no files or environment: hosts deserialize a [`Configuration`] from
//! whatever source they own.

use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;

/// Configuration of a [`Client`](crate::Client) or [`QueryCompiler`](crate::QueryCompiler).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Configuration {
    /// Maximum nesting of selection sets the analyzer accepts.
    /// default: 512
    #[serde(default = "default_recursion_limit")]
    pub recursion_limit: usize,

    /// Document rendering options.
    #[serde(default)]
    pub document: DocumentConfiguration,

    /// Compilation cache options.
    #[serde(default)]
    pub cache: CacheConfiguration,
}

/// Document rendering options.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct DocumentConfiguration {
    /// Render one field per line with two space indentation. Otherwise the document is a
    /// single line.
    /// default: true
    #[serde(default = "default_pretty")]
    pub pretty: bool,
}

/// Compilation cache options.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct CacheConfiguration {
    /// Reuse compiled documents across calls with the same shape.
    /// When disabled every call recompiles.
    /// default: true
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
}

fn default_recursion_limit() -> usize {
    512
}

fn default_pretty() -> bool {
    true
}

fn default_cache_enabled() -> bool {
    true
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            recursion_limit: default_recursion_limit(),
            document: Default::default(),
            cache: Default::default(),
        }
    }
}

impl Default for DocumentConfiguration {
    fn default() -> Self {
        Self {
            pretty: default_pretty(),
        }
    }
}

impl Default for CacheConfiguration {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
        }
    }
}

#[cfg(test)]
mod tests {
    use insta::assert_json_snapshot;
    use serde_json::json;

    use super::*;

    #[test]
    fn empty_configuration_uses_defaults() {
        let configuration: Configuration = serde_json::from_value(json!({})).unwrap();
        assert_eq!(configuration, Configuration::default());
        assert_json_snapshot!(configuration, @r###"
        {
          "recursion_limit": 512,
          "document": {
            "pretty": true
          },
          "cache": {
            "enabled": true
          }
        }
        "###);
    }

    #[test]
    fn partial_sections_are_filled_in() {
        let configuration: Configuration =
            serde_json::from_value(json!({"document": {"pretty": false}})).unwrap();
        assert!(!configuration.document.pretty);
        assert!(configuration.cache.enabled);
        assert_eq!(configuration.recursion_limit, 512);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let error = serde_json::from_value::<Configuration>(json!({"cache": {"size": 10}}))
            .unwrap_err();
        assert!(error.to_string().contains("unknown field `size`"));
    }

    #[test]
    fn exposes_a_json_schema() {
        let schema = schemars::schema_for!(Configuration);
        let schema = serde_json::to_value(schema).unwrap();
        assert!(schema["properties"]["recursion_limit"].is_object());
        assert!(schema["definitions"]["DocumentConfiguration"].is_object());
    }
}
