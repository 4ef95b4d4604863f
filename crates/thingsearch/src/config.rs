//! Command line configuration.
//!
//! Every setting can also be given through the environment.
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `THINGSEARCH_LOG_LEVEL` | info | Log level |
//! | `THINGSEARCH_DEFAULT_PAGE_SIZE` | 25 | Page size without a `limit` option |
//! | `THINGSEARCH_MAX_PAGE_SIZE` | 200 | Largest accepted `limit` count |
//! | `THINGSEARCH_MAX_INDEX_CONTENT_LENGTH` | 950 | Byte budget of one index entry |
//! | `THINGSEARCH_THINGS_COLLECTION` | searchThings | Thing index collection |
//! | `THINGSEARCH_POLICIES_COLLECTION` | searchPolicies | Policy index collection |

use clap::Args;
use thingsearch_persistence::SearchConfig;

/// Settings shared by all subcommands.
#[derive(Debug, Clone, Args)]
pub struct CliConfig {
    /// Log level (error, warn, info, debug, trace).
    #[arg(long, global = true, env = "THINGSEARCH_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Page size applied when a request has no limit option.
    #[arg(
        long,
        global = true,
        env = "THINGSEARCH_DEFAULT_PAGE_SIZE",
        default_value = "25"
    )]
    pub default_page_size: u64,

    /// Maximum page size a request may ask for.
    #[arg(long, global = true, env = "THINGSEARCH_MAX_PAGE_SIZE", default_value = "200")]
    pub max_page_size: u64,

    /// Maximum byte length of one index entry, thing ID included.
    #[arg(
        long,
        global = true,
        env = "THINGSEARCH_MAX_INDEX_CONTENT_LENGTH",
        default_value = "950"
    )]
    pub max_index_content_length: usize,

    /// Name of the thing index collection.
    #[arg(
        long,
        global = true,
        env = "THINGSEARCH_THINGS_COLLECTION",
        default_value = "searchThings"
    )]
    pub things_collection: String,

    /// Name of the policy index collection.
    #[arg(
        long,
        global = true,
        env = "THINGSEARCH_POLICIES_COLLECTION",
        default_value = "searchPolicies"
    )]
    pub policies_collection: String,
}

impl Default for CliConfig {
    fn default() -> Self {
        let search = SearchConfig::default();
        Self {
            log_level: "info".to_string(),
            default_page_size: search.default_page_size,
            max_page_size: search.max_page_size,
            max_index_content_length: search.max_index_content_length,
            things_collection: search.things_collection,
            policies_collection: search.policies_collection,
        }
    }
}

impl CliConfig {
    /// Returns the index configuration.
    pub fn search_config(&self) -> SearchConfig {
        SearchConfig::default()
            .with_default_page_size(self.default_page_size)
            .with_max_page_size(self.max_page_size)
            .with_max_index_content_length(self.max_index_content_length)
            .with_things_collection(self.things_collection.clone())
            .with_policies_collection(self.policies_collection.clone())
    }

    /// Validates the configuration and returns errors if any.
    pub fn validate(&self) -> Result<SearchConfig, Vec<String>> {
        let mut errors = Vec::new();

        if !matches!(
            self.log_level.to_ascii_lowercase().as_str(),
            "error" | "warn" | "info" | "debug" | "trace"
        ) {
            errors.push(format!("Unknown log level '{}'", self.log_level));
        }

        let search = self.search_config();
        if let Err(search_errors) = search.validate() {
            errors.extend(search_errors);
        }

        if errors.is_empty() {
            Ok(search)
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let search = CliConfig::default().validate().unwrap();
        assert_eq!(search, SearchConfig::default());
    }

    #[test]
    fn test_validate_collects_errors() {
        let config = CliConfig {
            log_level: "loud".to_string(),
            default_page_size: 500,
            ..Default::default()
        };
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("loud"));
    }

    #[test]
    fn test_search_config_carries_collections() {
        let config = CliConfig {
            things_collection: "things".to_string(),
            policies_collection: "policies".to_string(),
            ..Default::default()
        };
        let search = config.search_config();
        assert_eq!(search.things_collection, "things");
        assert_eq!(search.policies_collection, "policies");
    }
}
