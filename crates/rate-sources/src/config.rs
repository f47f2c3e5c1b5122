use std::time::Duration;

/// Provider endpoints and HTTP settings for the rate sources.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub eu_base_url: String,
    pub us_base_url: String,
    /// The UK source serves its built-in table when no endpoint is set.
    pub uk_base_url: Option<String>,
    pub timeout: Duration,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            eu_base_url: std::env::var("EU_RATES_API_URL")
                .unwrap_or_else(|_| "https://rates.taxation-customs.example.eu/api/v1".to_string()),
            us_base_url: std::env::var("US_HTS_API_URL")
                .unwrap_or_else(|_| "https://hts.usitc.gov/reststop".to_string()),
            uk_base_url: std::env::var("UK_RATES_API_URL").ok().filter(|v| !v.is_empty()),
            timeout: Duration::from_secs(
                std::env::var("RATE_SOURCE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(10),
            ),
        }
    }
}

impl SourceConfig {
    pub fn from_env() -> Self {
        Self::default()
    }
}

pub(crate) fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}
