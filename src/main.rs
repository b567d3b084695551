use anyhow::Context;
use clap::Parser;
use csv_to_api::utils::error::ErrorSeverity;
use csv_to_api::utils::{logger, validation::Validate};
use csv_to_api::{CliConfig, CsvApi, HttpFetcher, MemoryCache, ResponseSink, ServiceConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.log_json {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }
    tracing::debug!("CLI config: {:?}", cli);

    let service = match &cli.config {
        Some(path) => ServiceConfig::from_file(path)
            .with_context(|| format!("cannot load {}", path.display()))?,
        None => ServiceConfig::default(),
    };

    // 驗證配置
    if let Err(e) = service.validate() {
        tracing::error!("Configuration validation failed: {}", e);
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());
        std::process::exit(1);
    }

    let fetcher = HttpFetcher::from_config(&service.fetch).context("cannot build HTTP client")?;
    let api = CsvApi::new(MemoryCache::new(), fetcher).with_cache_ttl(service.cache.ttl_seconds);

    let result = api.handle(&cli.request_params()).await;
    let mut sink = ResponseSink::new(std::io::stdout().lock(), cli.headers);

    match result {
        Ok(response) => {
            sink.send(&response).context("cannot write response")?;
            Ok(())
        }
        Err(e) if e.is_recoverable() => {
            // 沒有對應的輸出格式：不輸出任何內容
            tracing::warn!("{}", e);
            Ok(())
        }
        Err(e) => {
            tracing::error!(
                "Request failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );

            if cli.headers {
                sink.set_status(e.status_code());
                sink.finish().context("cannot write response")?;
            }
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());

            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2, // 上游錯誤，可重試
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };
            std::process::exit(exit_code);
        }
    }
}
