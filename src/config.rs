//! Decoder configuration.

use alloc::string::String;

use indexmap::IndexSet as IndexSetRaw;
use serde::{Deserialize, Serialize};

use crate::record::REQUIRED_FIELDS;

/// `IndexSet` alias using hashbrown's default hasher for `no_std` compatibility.
pub type IndexSet<T> = IndexSetRaw<T, hashbrown::DefaultHashBuilder>;

/// Prefix of reconstructed column names unless configured otherwise.
pub const DEFAULT_COLUMN_PREFIX: &str = "th2_";

/// Settings of a [`LogMinerDecoder`](crate::LogMinerDecoder).
///
/// Every key is optional; missing keys take their default value.
///
/// ```
/// use logminer_redo::Configuration;
///
/// let config = Configuration::from_json(
///     r#"{"column-prefix": "my_prefix_", "save-columns": ["A", "B"]}"#,
/// )
/// .unwrap();
/// assert_eq!(config.column_prefix, "my_prefix_");
/// assert!(config.truncate_update_query_from_where_clause);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Configuration {
    /// Prefix for reconstructed columns.
    pub column_prefix: String,
    /// Source fields copied verbatim into every output record, in this order.
    pub save_columns: IndexSet<String>,
    /// Whether `UPDATE` statements are cut at their `WHERE` clause before parsing.
    pub truncate_update_query_from_where_clause: bool,
    /// Whether string literals are stripped of surrounding whitespace.
    pub trim_parsed_content: bool,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            column_prefix: DEFAULT_COLUMN_PREFIX.into(),
            save_columns: REQUIRED_FIELDS.iter().map(|&field| field.into()).collect(),
            truncate_update_query_from_where_clause: true,
            trim_parsed_content: true,
        }
    }
}

impl Configuration {
    /// Load a configuration from its JSON form.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if the text is not a JSON object with
    /// correctly typed keys.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    #[test]
    fn test_defaults() {
        let config = Configuration::default();
        assert_eq!(config.column_prefix, "th2_");
        assert!(config.truncate_update_query_from_where_clause);
        assert!(config.trim_parsed_content);
        let saved: Vec<&str> = config.save_columns.iter().map(String::as_str).collect();
        assert_eq!(
            saved,
            ["OPERATION", "SQL_REDO", "ROW_ID", "TIMESTAMP", "TABLE_NAME"]
        );
    }

    #[test]
    fn test_empty_object_is_default() {
        assert_eq!(
            Configuration::from_json("{}").unwrap(),
            Configuration::default()
        );
    }

    #[test]
    fn test_deserialize() {
        let config = Configuration::from_json(
            r#"{
                "column-prefix": "my_prefix_",
                "save-columns": ["B", "A", "B"],
                "truncate-update-query-from-where-clause": false,
                "trim-parsed-content": false,
                "unknown": 1
            }"#,
        )
        .unwrap();
        assert_eq!(config.column_prefix, "my_prefix_");
        let saved: Vec<&str> = config.save_columns.iter().map(String::as_str).collect();
        assert_eq!(saved, ["B", "A"]);
        assert!(!config.truncate_update_query_from_where_clause);
        assert!(!config.trim_parsed_content);
    }

    #[test]
    fn test_wrong_type_is_rejected() {
        assert!(Configuration::from_json(r#"{"trim-parsed-content": "yes"}"#).is_err());
    }
}
