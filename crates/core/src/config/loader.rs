use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Bare `OKTA_*` variables, mapped onto their config keys.
const LEGACY_ENV_KEYS: [&str; 3] = ["OKTA_API_TOKEN", "OKTA_DOMAIN", "OKTA_QUERY"];

/// Environment layers shared by every loader: legacy variables first,
/// then `PUSHDRILL_` prefixed ones (with `__` as the nesting separator).
fn with_env(figment: Figment) -> Figment {
    figment
        .merge(
            Env::raw()
                .only(&LEGACY_ENV_KEYS)
                .map(|key| match key.as_str().to_ascii_uppercase().as_str() {
                    "OKTA_API_TOKEN" => "provider.api_token".into(),
                    "OKTA_DOMAIN" => "provider.domain".into(),
                    _ => "directory.filter".into(),
                }),
        )
        .merge(Env::prefixed("PUSHDRILL_").split("__"))
}

/// Load configuration from file with environment variable overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    with_env(Figment::new().merge(Toml::file(path)))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Load configuration from environment variables only
pub fn load_config_from_env() -> Result<Config, ConfigError> {
    with_env(Figment::new())
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}
