use crate::config::query::parse_query_string;
use crate::domain::model::QueryParams;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "csv-to-api")]
#[command(about = "Serve a remote CSV file as JSON, JSONP, XML or HTML")]
pub struct CliConfig {
    /// Raw query string, e.g. "source=https://example.com/data.csv&format=xml"
    pub query: Option<String>,

    /// Extra request parameter; overrides the same key in the query string
    #[arg(short, long = "param", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub params: Vec<(String, String)>,

    /// Service configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Print a CGI-style header block before the body
    #[arg(long)]
    pub headers: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub log_json: bool,
}

impl CliConfig {
    /// Request parameters: the decoded query string, then every `--param`.
    pub fn request_params(&self) -> QueryParams {
        let mut params = self
            .query
            .as_deref()
            .map(parse_query_string)
            .unwrap_or_default();

        for (key, value) in &self.params {
            params.insert(key.clone(), value.clone());
        }
        params
    }
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", raw))?;
    if key.is_empty() {
        return Err(format!("missing key in '{}'", raw));
    }
    Ok((key.to_string(), value.to_string()))
}
