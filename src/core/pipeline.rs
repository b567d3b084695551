use crate::config::DEFAULT_CACHE_TTL;
use crate::core::parser::{decode_source, SourceFormat};
use crate::core::query::query;
use crate::core::serializer::render_response;
use crate::domain::model::{cache_key, ApiResponse, QueryConfig, QueryParams, RecordSet};
use crate::domain::ports::{RecordCache, SourceFetcher};
use crate::utils::error::{ApiError, Result};
use std::time::Duration;

/// Request pipeline: resolve, load (cache or fetch + parse), query, render.
pub struct CsvApi<C: RecordCache, F: SourceFetcher> {
    cache: C,
    fetcher: F,
    default_ttl: u64,
}

impl<C: RecordCache, F: SourceFetcher> CsvApi<C, F> {
    pub fn new(cache: C, fetcher: F) -> Self {
        Self {
            cache,
            fetcher,
            default_ttl: DEFAULT_CACHE_TTL,
        }
    }

    pub fn with_cache_ttl(mut self, seconds: u64) -> Self {
        self.default_ttl = seconds;
        self
    }

    pub fn parse_query(&self, params: &QueryParams) -> QueryConfig {
        QueryConfig::resolve(params, self.default_ttl)
    }

    /// Load the source named by `config` as records.
    ///
    /// The source format is checked before anything else; a cache hit skips
    /// both the fetcher and the parser.
    pub async fn parse(&self, config: &QueryConfig) -> Result<RecordSet> {
        let format: SourceFormat = config.source_format.parse()?;
        let source_url = config.source_url.as_deref().ok_or(ApiError::MissingSource)?;

        let key = cache_key(source_url);
        if let Some(records) = self.cache.get(&key) {
            tracing::debug!("Cache hit for {} ({} records)", source_url, records.len());
            return Ok(records);
        }
        tracing::debug!("Cache miss for {}", source_url);

        let fetch_url = config.fetch_url().ok_or(ApiError::MissingSource)?;
        let raw = self.fetcher.fetch(&fetch_url).await?;
        if raw.is_empty() {
            return Err(ApiError::Fetch {
                url: fetch_url,
                reason: "empty response body".to_string(),
            });
        }

        let records = format.parse(&decode_source(&raw), config.has_header_row)?;
        self.cache
            .put(&key, records.clone(), Duration::from_secs(config.cache_ttl));

        Ok(records)
    }

    pub fn query(&self, records: RecordSet, params: &QueryParams, config: &QueryConfig) -> RecordSet {
        query(records, params, config)
    }

    pub fn output(&self, records: &RecordSet, config: &QueryConfig) -> Result<ApiResponse> {
        render_response(records, config)
    }

    /// Run one request from its parameter map.
    pub async fn handle(&self, params: &QueryParams) -> Result<ApiResponse> {
        let config = self.parse_query(params);
        tracing::debug!("Resolved query config: {:?}", config);

        let records = self.parse(&config).await?;
        let records = self.query(records, params, &config);
        self.output(&records, &config)
    }

    pub async fn handle_query_str(&self, query: &str) -> Result<ApiResponse> {
        self.handle(&crate::config::parse_query_string(query)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::cache::MemoryCache;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const PEOPLE: &[u8] = b"name,age\nAda,36\nLinus,54\n";

    struct StaticFetcher {
        body: Vec<u8>,
        calls: AtomicUsize,
    }

    impl StaticFetcher {
        fn new(body: &[u8]) -> Self {
            Self {
                body: body.to_vec(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SourceFetcher for StaticFetcher {
        async fn fetch(&self, _url: &str) -> Result<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.body.clone())
        }
    }

    fn api(body: &[u8]) -> (CsvApi<MemoryCache, Arc<StaticFetcher>>, Arc<StaticFetcher>) {
        let fetcher = Arc::new(StaticFetcher::new(body));
        (CsvApi::new(MemoryCache::new(), fetcher.clone()), fetcher)
    }

    #[tokio::test]
    async fn test_handle_sorted_json() {
        let (api, _) = api(PEOPLE);
        let response = api
            .handle_query_str("source=http://data.test/people.csv&sort=age&sort_dir=asc")
            .await
            .unwrap();

        assert_eq!(response.body, r#"[{"name":"Ada","age":"36"},{"name":"Linus","age":"54"}]"#);
        assert_eq!(response.content_type, "application/json");
    }

    #[tokio::test]
    async fn test_second_request_is_served_from_cache() {
        let (api, fetcher) = api(PEOPLE);

        api.handle_query_str("source=http://data.test/people.csv").await.unwrap();
        let response = api
            .handle_query_str("source=http://data.test/people.csv&name=Linus")
            .await
            .unwrap();

        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(response.body, r#"[{"name":"Linus","age":"54"}]"#);
    }

    #[tokio::test]
    async fn test_unsupported_format_fails_before_fetch() {
        let (api, fetcher) = api(PEOPLE);
        let err = api
            .handle_query_str("source=http://data.test/people.xlsx")
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::UnsupportedSourceFormat { .. }));
        assert_eq!(err.status_code(), 400);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_source() {
        let (api, fetcher) = api(PEOPLE);
        let err = api.handle_query_str("format=json&source_format=csv").await.unwrap_err();

        assert!(matches!(err, ApiError::MissingSource));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rejected_source_url_is_missing() {
        let (api, _) = api(PEOPLE);
        let err = api
            .handle_query_str("source=javascript:alert(1)&source_format=csv")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::MissingSource));
    }

    #[tokio::test]
    async fn test_empty_body_is_fetch_error_and_not_cached() {
        let (api, fetcher) = api(b"");
        let query = "source=http://data.test/empty.csv";

        let err = api.handle_query_str(query).await.unwrap_err();
        assert!(matches!(err, ApiError::Fetch { .. }));
        assert_eq!(err.status_code(), 502);

        let _ = api.handle_query_str(query).await;
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_latin1_source_is_decoded_before_parsing() {
        let (api, _) = api(b"Ann\xE9e,Ville\n2024,Montr\xE9al\n");
        let response = api
            .handle_query_str("source=http://data.test/villes.csv")
            .await
            .unwrap();

        assert_eq!(response.body, r#"[{"annee":"2024","ville":"Montréal"}]"#);
    }

    #[tokio::test]
    async fn test_configured_ttl_seeds_query_config() {
        let (api, _) = api(PEOPLE);
        let api = api.with_cache_ttl(60);
        let config = api.parse_query(&QueryParams::new());
        assert_eq!(config.cache_ttl, 60);
    }

    #[tokio::test]
    async fn test_unknown_output_format_after_load() {
        let (api, fetcher) = api(PEOPLE);
        let err = api
            .handle_query_str("source=http://data.test/people.csv&format=yaml")
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::FormatNotFound { .. }));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }
}
