use crate::config::query::DEFAULT_CACHE_TTL;
use crate::utils::error::{ApiError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_positive_number, validate_range, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;

static ENV_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("static env var pattern"));

/// Deployment settings shared by every request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub cache: CacheConfig,
    pub fetch: FetchConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: DEFAULT_CACHE_TTL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub connect_timeout_ms: u64,
    pub timeout_ms: u64,
    pub max_redirects: usize,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 1000,
            timeout_ms: 1200,
            max_redirects: 10,
            user_agent: concat!("csv-to-api/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ServiceConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| ApiError::ConfigValidation {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${CSV_API_TTL})；未設定的變數保留原字串
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    pub fn validate_config(&self) -> Result<()> {
        validate_range("cache.ttl_seconds", self.cache.ttl_seconds, 0, 31_536_000)?;
        validate_positive_number("fetch.connect_timeout_ms", self.fetch.connect_timeout_ms, 1)?;
        validate_positive_number("fetch.timeout_ms", self.fetch.timeout_ms, 1)?;
        validate_range("fetch.max_redirects", self.fetch.max_redirects, 0, 20)?;
        validate_non_empty_string("fetch.user_agent", &self.fetch.user_agent)?;

        if self.fetch.connect_timeout_ms > self.fetch.timeout_ms {
            return Err(ApiError::ConfigValidation {
                field: "fetch.connect_timeout_ms".to_string(),
                message: "connect timeout cannot exceed the total timeout".to_string(),
            });
        }

        Ok(())
    }
}

impl Validate for ServiceConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_match_fetch_contract() {
        let config = ServiceConfig::default();
        assert_eq!(config.cache.ttl_seconds, 3600);
        assert_eq!(config.fetch.connect_timeout_ms, 1000);
        assert_eq!(config.fetch.timeout_ms, 1200);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ServiceConfig::from_toml_str(
            r#"
[cache]
ttl_seconds = 60
"#,
        )
        .unwrap();

        assert_eq!(config.cache.ttl_seconds, 60);
        assert_eq!(config.fetch, FetchConfig::default());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("CSV_API_TEST_TIMEOUT", "900");

        let config = ServiceConfig::from_toml_str(
            r#"
[fetch]
timeout_ms = ${CSV_API_TEST_TIMEOUT}
connect_timeout_ms = 500
"#,
        )
        .unwrap();
        assert_eq!(config.fetch.timeout_ms, 900);
        assert_eq!(config.fetch.connect_timeout_ms, 500);

        std::env::remove_var("CSV_API_TEST_TIMEOUT");
    }

    #[test]
    fn test_config_validation() {
        let config = ServiceConfig::from_toml_str(
            r#"
[fetch]
connect_timeout_ms = 5000
timeout_ms = 1200
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());

        let zero = ServiceConfig::from_toml_str("[fetch]\ntimeout_ms = 0\n").unwrap();
        assert!(zero.validate().is_err());
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = ServiceConfig::from_toml_str("[cache\nttl_seconds = ").unwrap_err();
        assert!(matches!(err, ApiError::ConfigValidation { .. }));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[fetch]\nuser_agent = \"sheet-mirror/2.0\"\n")
            .unwrap();

        let config = ServiceConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.fetch.user_agent, "sheet-mirror/2.0");
        assert_eq!(config.cache.ttl_seconds, 3600);
    }
}
