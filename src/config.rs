use serde::Deserialize;

/// Default Messages API host.
pub const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
/// Model used for every customer analysis unless overridden.
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-20250514";
/// Output-token budget sent with every analysis request.
pub const ANALYSIS_MAX_TOKENS: u32 = 1000;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub customers_csv: String,
    pub anthropic_api_key: Option<String>, // Absent key fails analysis calls, not startup
    pub anthropic_base_url: String,
    pub anthropic_model: String,
    pub analysis_timeout_secs: u64,
    pub max_batch_size: Option<usize>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            customers_csv: std::env::var("CUSTOMERS_CSV")
                .unwrap_or_else(|_| "customers_data.csv".to_string())
                .trim()
                .to_string(),
            anthropic_api_key: std::env::var("ANTHROPIC_API_KEY")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            anthropic_base_url: std::env::var("ANTHROPIC_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_ANTHROPIC_BASE_URL.to_string())
                .trim()
                .trim_end_matches('/')
                .to_string(),
            anthropic_model: std::env::var("ANTHROPIC_MODEL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_ANTHROPIC_MODEL.to_string()),
            analysis_timeout_secs: std::env::var("ANALYSIS_TIMEOUT_SECS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("ANALYSIS_TIMEOUT_SECS must be a positive integer"))?,
            max_batch_size: match std::env::var("MAX_BATCH_SIZE") {
                Ok(raw) if !raw.trim().is_empty() => {
                    let cap = raw.trim().parse().map_err(|_| {
                        anyhow::anyhow!("MAX_BATCH_SIZE must be a positive integer")
                    })?;
                    Some(cap)
                }
                _ => None,
            },
        };

        config.validate()?;

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Customers CSV: {}", config.customers_csv);
        tracing::debug!("Anthropic Base URL: {}", config.anthropic_base_url);
        tracing::debug!("Anthropic Model: {}", config.anthropic_model);
        if config.anthropic_api_key.is_none() {
            tracing::warn!("ANTHROPIC_API_KEY not set; analysis endpoints will fail");
        }
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.customers_csv.is_empty() {
            anyhow::bail!("CUSTOMERS_CSV cannot be empty");
        }
        if !self.anthropic_base_url.starts_with("http://")
            && !self.anthropic_base_url.starts_with("https://")
        {
            anyhow::bail!("ANTHROPIC_BASE_URL must start with http:// or https://");
        }
        if self.analysis_timeout_secs == 0 {
            anyhow::bail!("ANALYSIS_TIMEOUT_SECS must be a positive integer");
        }
        if self.max_batch_size == Some(0) {
            anyhow::bail!("MAX_BATCH_SIZE must be a positive integer");
        }
        Ok(())
    }

    /// Configuration pointing at a given Messages API host, used by tests and tools.
    pub fn for_base_url(base_url: impl Into<String>, api_key: Option<&str>) -> Self {
        Self {
            port: 3000,
            customers_csv: "customers_data.csv".to_string(),
            anthropic_api_key: api_key.map(str::to_string),
            anthropic_base_url: base_url.into().trim_end_matches('/').to_string(),
            anthropic_model: DEFAULT_ANTHROPIC_MODEL.to_string(),
            analysis_timeout_secs: 60,
            max_batch_size: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_non_http_base_url() {
        let config = Config::for_base_url("ftp://example.com", Some("key"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_batch_cap() {
        let mut config = Config::for_base_url("https://example.com", None);
        config.max_batch_size = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_for_base_url_trims_trailing_slash() {
        let config = Config::for_base_url("http://127.0.0.1:9999/", Some("key"));
        assert_eq!(config.anthropic_base_url, "http://127.0.0.1:9999");
        assert!(config.validate().is_ok());
    }
}
