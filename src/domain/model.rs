use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Request parameters in the order they were received.
pub type QueryParams = IndexMap<String, String>;

/// Values that count as "no value": the empty string and `"0"`.
pub fn is_falsy(value: &str) -> bool {
    value.is_empty() || value == "0"
}

/// One row of source data, keyed by sanitized field name.
///
/// A missing key means the cell had no value; empty values are never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    data: IndexMap<String, String>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a field value; falsy values are dropped and `false` is returned.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) -> bool {
        let value = value.into();
        if is_falsy(&value) {
            return false;
        }
        self.data.insert(field.into(), value);
        true
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.data.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.data.contains_key(field)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.data.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (field, value) in iter {
            record.insert(field, value);
        }
        record
    }
}

/// Records in source row order.
pub type RecordSet = Vec<Record>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    /// Only the exact value `desc` selects descending order.
    pub fn from_param(value: &str) -> Self {
        if value == "desc" {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        }
    }
}

/// Settings resolved from one request's parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryConfig {
    pub source_url: Option<String>,
    pub source_format: String,
    pub output_format: String,
    pub jsonp_callback: Option<String>,
    pub sort_field: Option<String>,
    pub sort_direction: SortDirection,
    pub has_header_row: bool,
    pub cache_ttl: u64,
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: String,
    pub value: RecordSet,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Cache key for a parsed source; depends on the source URL only.
pub fn cache_key(source_url: &str) -> String {
    format!("csv_to_api_{:x}", Sha256::digest(source_url.as_bytes()))
}

/// A rendered payload and the content type to declare for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub body: String,
    pub content_type: &'static str,
}
