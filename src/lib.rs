pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use crate::adapters::{HttpFetcher, MemoryCache, ResponseSink};
pub use crate::config::ServiceConfig;
pub use crate::core::parser::SourceFormat;
pub use crate::core::pipeline::CsvApi;
pub use crate::core::query::FilterOperator;
pub use crate::core::serializer::OutputFormat;
pub use crate::domain::model::{ApiResponse, QueryConfig, QueryParams, Record, RecordSet, SortDirection};
pub use crate::utils::error::{ApiError, Result};
