use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub provider: ProviderConfig,
    #[serde(default)]
    pub directory: DirectoryConfig,
    #[serde(default)]
    pub drill: DrillConfig,
}

/// Identity provider connection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderConfig {
    /// Provider domain (e.g. "acme.okta.com") or a full origin URL.
    pub domain: String,
    /// API token sent as `SSWS <token>`.
    pub api_token: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

impl ProviderConfig {
    /// Origin of the provider without a trailing slash.
    ///
    /// Bare domains are assumed to be served over https.
    pub fn origin(&self) -> String {
        let domain = self.domain.trim().trim_end_matches('/');
        if domain.starts_with("https://") || domain.starts_with("http://") {
            domain.to_string()
        } else {
            format!("https://{}", domain)
        }
    }
}

fn default_timeout() -> u32 {
    30
}

/// User selection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DirectoryConfig {
    /// Search expression passed to the directory (empty = all users).
    #[serde(default)]
    pub filter: String,
    /// Users requested per page.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            filter: String::new(),
            page_size: default_page_size(),
        }
    }
}

fn default_page_size() -> u32 {
    200
}

/// Drill execution settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DrillConfig {
    /// How many users are prompted in parallel.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Wait between two status polls of the same push (milliseconds).
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Pause after a worker is admitted, before it contacts the provider (milliseconds).
    #[serde(default = "default_start_delay")]
    pub worker_start_delay_ms: u64,

    /// Optional client-side ceiling on how long a single push is polled.
    /// When unset, polling ends only on a provider verdict or cancellation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_deadline_secs: Option<u64>,
}

impl DrillConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn worker_start_delay(&self) -> Duration {
        Duration::from_millis(self.worker_start_delay_ms)
    }

    pub fn poll_deadline(&self) -> Option<Duration> {
        self.poll_deadline_secs.map(Duration::from_secs)
    }
}

fn default_max_concurrent() -> usize {
    10
}

fn default_poll_interval() -> u64 {
    3000 // 3 seconds
}

fn default_start_delay() -> u64 {
    1000
}

impl Default for DrillConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            poll_interval_ms: default_poll_interval(),
            worker_start_delay_ms: default_start_delay(),
            poll_deadline_secs: None,
        }
    }
}

/// Sanitized config for logging (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub provider: SanitizedProviderConfig,
    pub directory: DirectoryConfig,
    pub drill: DrillConfig,
}

/// Sanitized provider config (API token hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedProviderConfig {
    pub origin: String,
    pub api_token_configured: bool,
    pub timeout_secs: u32,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            provider: SanitizedProviderConfig {
                origin: config.provider.origin(),
                api_token_configured: !config.provider.api_token.is_empty(),
                timeout_secs: config.provider.timeout_secs,
            },
            directory: config.directory.clone(),
            drill: config.drill.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_minimal_config() {
        let toml = r#"
[provider]
domain = "acme.okta.com"
api_token = "secret"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.provider.timeout_secs, 30);
        assert_eq!(config.directory.page_size, 200);
        assert!(config.directory.filter.is_empty());
        assert_eq!(config.drill.max_concurrent, 10);
        assert_eq!(config.drill.poll_interval_ms, 3000);
        assert_eq!(config.drill.worker_start_delay_ms, 1000);
        assert!(config.drill.poll_deadline_secs.is_none());
    }

    #[test]
    fn test_deserialize_full_config() {
        let toml = r#"
[provider]
domain = "https://acme.oktapreview.com/"
api_token = "secret"
timeout_secs = 10

[directory]
filter = 'profile.department eq "Finance"'
page_size = 50

[drill]
max_concurrent = 4
poll_interval_ms = 500
worker_start_delay_ms = 0
poll_deadline_secs = 120
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.provider.timeout_secs, 10);
        assert_eq!(config.directory.filter, r#"profile.department eq "Finance""#);
        assert_eq!(config.directory.page_size, 50);
        assert_eq!(config.drill.max_concurrent, 4);
        assert_eq!(config.drill.poll_interval(), Duration::from_millis(500));
        assert_eq!(config.drill.worker_start_delay(), Duration::ZERO);
        assert_eq!(config.drill.poll_deadline(), Some(Duration::from_secs(120)));
    }

    #[test]
    fn test_deserialize_missing_provider_fails() {
        let toml = r#"
[drill]
max_concurrent = 2
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_origin_from_bare_domain() {
        let provider = ProviderConfig {
            domain: "acme.okta.com".to_string(),
            api_token: String::new(),
            timeout_secs: 30,
        };
        assert_eq!(provider.origin(), "https://acme.okta.com");
    }

    #[test]
    fn test_origin_keeps_scheme_and_trims_slash() {
        let provider = ProviderConfig {
            domain: "http://localhost:8080/".to_string(),
            api_token: String::new(),
            timeout_secs: 30,
        };
        assert_eq!(provider.origin(), "http://localhost:8080");
    }

    #[test]
    fn test_sanitized_config_hides_token() {
        let config = Config {
            provider: ProviderConfig {
                domain: "acme.okta.com".to_string(),
                api_token: "super-secret".to_string(),
                timeout_secs: 30,
            },
            directory: DirectoryConfig::default(),
            drill: DrillConfig::default(),
        };
        let sanitized = SanitizedConfig::from(&config);
        assert!(sanitized.provider.api_token_configured);
        assert_eq!(sanitized.provider.origin, "https://acme.okta.com");

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("super-secret"));
    }
}
