#[cfg(feature = "cli")]
pub mod cli;
pub mod query;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::CliConfig;
pub use query::{get_extension, parse_query_string, DEFAULT_CACHE_TTL};
pub use toml_config::{CacheConfig, FetchConfig, ServiceConfig};
