//! Configuration of the search index.
//!
//! Loading the configuration is up to the caller; this module only defines
//! the values and their defaults.
//!
//! | Setting | Default | Description |
//! |---------|---------|-------------|
//! | `defaultPageSize` | 25 | Page size when a request has no `limit` option |
//! | `maxPageSize` | 200 | Largest accepted `limit` count |
//! | `maxIndexContentLength` | 950 | Byte budget of one index entry, thing ID included |
//! | `thingsCollection` | searchThings | Collection of thing index documents |
//! | `policiesCollection` | searchPolicies | Collection of policy index entries |

use serde::{Deserialize, Serialize};

/// Settings shared by the query compiler and the index maintainer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchConfig {
    /// Page size applied when a request carries no `limit` option.
    #[serde(default = "default_page_size")]
    pub default_page_size: u64,

    /// Maximum `limit` count a request may ask for.
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u64,

    /// Maximum byte length of one index entry, thing ID included.
    #[serde(default = "default_max_index_content_length")]
    pub max_index_content_length: usize,

    /// Name of the thing index collection.
    #[serde(default = "default_things_collection")]
    pub things_collection: String,

    /// Name of the policy index collection.
    #[serde(default = "default_policies_collection")]
    pub policies_collection: String,
}

fn default_page_size() -> u64 {
    25
}

fn default_max_page_size() -> u64 {
    200
}

fn default_max_index_content_length() -> usize {
    950
}

fn default_things_collection() -> String {
    "searchThings".to_string()
}

fn default_policies_collection() -> String {
    "searchPolicies".to_string()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            max_index_content_length: default_max_index_content_length(),
            things_collection: default_things_collection(),
            policies_collection: default_policies_collection(),
        }
    }
}

impl SearchConfig {
    /// Sets the default page size.
    pub fn with_default_page_size(mut self, size: u64) -> Self {
        self.default_page_size = size;
        self
    }

    /// Sets the maximum page size.
    pub fn with_max_page_size(mut self, size: u64) -> Self {
        self.max_page_size = size;
        self
    }

    /// Sets the byte budget of one index entry.
    pub fn with_max_index_content_length(mut self, length: usize) -> Self {
        self.max_index_content_length = length;
        self
    }

    /// Sets the name of the thing index collection.
    pub fn with_things_collection(mut self, name: impl Into<String>) -> Self {
        self.things_collection = name.into();
        self
    }

    /// Sets the name of the policy index collection.
    pub fn with_policies_collection(mut self, name: impl Into<String>) -> Self {
        self.policies_collection = name.into();
        self
    }

    /// Validates the configuration, returning every problem found.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.default_page_size == 0 {
            errors.push("Default page size cannot be 0".to_string());
        }

        if self.max_page_size == 0 {
            errors.push("Max page size cannot be 0".to_string());
        }

        if self.default_page_size > self.max_page_size {
            errors.push("Default page size cannot exceed max page size".to_string());
        }

        if self.max_index_content_length == 0 {
            errors.push("Max index content length cannot be 0".to_string());
        }

        if self.things_collection.trim().is_empty() {
            errors.push("Things collection name cannot be empty".to_string());
        }

        if self.policies_collection.trim().is_empty() {
            errors.push("Policies collection name cannot be empty".to_string());
        }

        if self.things_collection == self.policies_collection {
            errors.push("Things and policies collections must differ".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
