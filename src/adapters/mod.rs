// Adapters layer: concrete implementations of the domain ports and the
// transport boundary.

pub mod cache;
pub mod http;
pub mod output;

pub use cache::MemoryCache;
pub use http::HttpFetcher;
pub use output::ResponseSink;
