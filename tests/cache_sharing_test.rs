use async_trait::async_trait;
use csv_to_api::domain::ports::SourceFetcher;
use csv_to_api::{CsvApi, MemoryCache, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Fetcher that serves one body per URL and counts every call.
#[derive(Default)]
struct CountingFetcher {
    calls: AtomicUsize,
}

impl CountingFetcher {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceFetcher for CountingFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if url.ends_with("cities.csv") {
            Ok(b"city,country\nLondon,UK\nOslo,NO\n".to_vec())
        } else {
            Ok(b"name,age\nAda,36\nLinus,54\n".to_vec())
        }
    }
}

fn api(fetcher: &Arc<CountingFetcher>) -> CsvApi<Arc<MemoryCache>, Arc<CountingFetcher>> {
    CsvApi::new(Arc::new(MemoryCache::new()), fetcher.clone())
}

#[tokio::test]
async fn test_distinct_queries_share_one_parse() {
    let fetcher = Arc::new(CountingFetcher::default());
    let api = api(&fetcher);

    let queries = [
        "source=http://data.test/people.csv",
        "source=http://data.test/people.csv&name=Ada",
        "source=http://data.test/people.csv&sort=age&sort_dir=asc&format=xml",
        "source=http://data.test/people.csv&format=html&callback=cb",
    ];
    for query in queries {
        api.handle_query_str(query).await.unwrap();
    }

    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test]
async fn test_filtered_result_is_not_what_gets_cached() {
    let fetcher = Arc::new(CountingFetcher::default());
    let api = api(&fetcher);

    let first = api
        .handle_query_str("source=http://data.test/people.csv&name=Ada")
        .await
        .unwrap();
    let second = api
        .handle_query_str("source=http://data.test/people.csv")
        .await
        .unwrap();

    assert_eq!(first.body, r#"[{"name":"Ada","age":"36"}]"#);
    assert_eq!(
        second.body,
        r#"[{"name":"Ada","age":"36"},{"name":"Linus","age":"54"}]"#
    );
}

#[tokio::test]
async fn test_each_source_has_its_own_entry() {
    let fetcher = Arc::new(CountingFetcher::default());
    let cache = Arc::new(MemoryCache::new());
    let api = CsvApi::new(cache.clone(), fetcher.clone());

    api.handle_query_str("source=http://data.test/people.csv").await.unwrap();
    let cities = api
        .handle_query_str("source=http://data.test/cities.csv&country=NO")
        .await
        .unwrap();

    assert_eq!(fetcher.calls(), 2);
    assert_eq!(cache.len(), 2);
    assert_eq!(cities.body, r#"[{"city":"Oslo","country":"NO"}]"#);
}

#[tokio::test]
async fn test_zero_ttl_refetches() {
    let fetcher = Arc::new(CountingFetcher::default());
    let api = api(&fetcher).with_cache_ttl(0);

    api.handle_query_str("source=http://data.test/people.csv").await.unwrap();
    api.handle_query_str("source=http://data.test/people.csv").await.unwrap();

    assert_eq!(fetcher.calls(), 2);
}

#[test]
fn test_cache_is_shared_across_threads() {
    let fetcher = Arc::new(CountingFetcher::default());
    let api = Arc::new(api(&fetcher));

    // warm the cache once, then read it from several threads
    tokio_test::block_on(api.handle_query_str("source=http://data.test/people.csv")).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let api = api.clone();
            std::thread::spawn(move || {
                tokio_test::block_on(
                    api.handle_query_str("source=http://data.test/people.csv&sort=age"),
                )
                .map(|response| response.body)
            })
        })
        .collect();

    for handle in handles {
        let body = handle.join().unwrap().unwrap();
        assert!(body.starts_with(r#"[{"name":"Linus""#));
    }
    assert_eq!(fetcher.calls(), 1);
}
