use crate::domain::model::{QueryConfig, QueryParams, SortDirection};
use crate::utils::esc_url::{sanitize_url, unescape_ampersands};
use crate::utils::jsonp::jsonp_callback_filter;
use std::path::Path;
use url::Url;

pub const DEFAULT_CACHE_TTL: u64 = 3600;
pub const DEFAULT_OUTPUT_FORMAT: &str = "json";

/// Decode a raw query string (with or without the leading `?`).
///
/// When a key is repeated the last value wins.
pub fn parse_query_string(query: &str) -> QueryParams {
    let query = query.strip_prefix('?').unwrap_or(query);
    url::form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

/// Lowercased file extension of the URL's path, or `""` if there is none.
pub fn get_extension(source: &str) -> String {
    let path = match Url::parse(source) {
        Ok(url) => url.path().to_string(),
        Err(_) => source
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };

    Path::new(&path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default()
}

impl QueryConfig {
    /// 從請求參數建立設定，只讀取傳入的 map
    pub fn resolve(params: &QueryParams, cache_ttl: u64) -> Self {
        let source_url = params
            .get("source")
            .map(|raw| sanitize_url(raw))
            .filter(|url| !url.is_empty());

        let source_format = match params.get("source_format") {
            Some(format) => format.clone(),
            None => source_url.as_deref().map(get_extension).unwrap_or_default(),
        };

        let output_format = params
            .get("format")
            .cloned()
            .unwrap_or_else(|| DEFAULT_OUTPUT_FORMAT.to_string());

        let jsonp_callback = params
            .get("callback")
            .and_then(|cb| jsonp_callback_filter(cb))
            .map(str::to_string);

        let sort_field = params.get("sort").filter(|s| !s.is_empty()).cloned();

        let sort_direction = params
            .get("sort_dir")
            .map(|dir| SortDirection::from_param(dir))
            .unwrap_or_default();

        let has_header_row = params.get("header_row").map_or(true, |v| v != "n");

        Self {
            source_url,
            source_format,
            output_format,
            jsonp_callback,
            sort_field,
            sort_direction,
            has_header_row,
            cache_ttl,
        }
    }

    pub fn from_params(params: &QueryParams) -> Self {
        Self::resolve(params, DEFAULT_CACHE_TTL)
    }

    pub fn from_query_str(query: &str) -> Self {
        Self::from_params(&parse_query_string(query))
    }

    /// The source URL in the form sent over the wire.
    pub fn fetch_url(&self) -> Option<String> {
        self.source_url.as_deref().map(unescape_ampersands)
    }
}
