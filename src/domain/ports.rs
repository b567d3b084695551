use crate::domain::model::RecordSet;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Key/value store for parsed sources.
///
/// Implementations must treat entries older than their TTL as absent and
/// must be safe to share between concurrent requests.
pub trait RecordCache: Send + Sync {
    fn get(&self, key: &str) -> Option<RecordSet>;
    fn put(&self, key: &str, value: RecordSet, ttl: Duration);
}

/// Retrieves the raw bytes of a source URL; decoding is left to the parser.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

impl<T: RecordCache + ?Sized> RecordCache for Arc<T> {
    fn get(&self, key: &str) -> Option<RecordSet> {
        (**self).get(key)
    }

    fn put(&self, key: &str, value: RecordSet, ttl: Duration) {
        (**self).put(key, value, ttl)
    }
}

#[async_trait]
impl<T: SourceFetcher + ?Sized> SourceFetcher for Arc<T> {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        (**self).fetch(url).await
    }
}
