pub mod parser;
pub mod pipeline;
pub mod query;
pub mod serializer;

pub use crate::domain::model::{ApiResponse, QueryConfig, QueryParams, Record, RecordSet};
pub use crate::domain::ports::{RecordCache, SourceFetcher};
pub use crate::utils::error::Result;
