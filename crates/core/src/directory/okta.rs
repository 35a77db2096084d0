//! Okta users API client.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex_lite::Regex;
use reqwest::header::LINK;
use reqwest::Client;
use tracing::debug;

use crate::config::{DirectoryConfig, ProviderConfig};
use crate::provider::{build_http_client, ensure_success};

use super::{DirectoryError, DirectoryUser, UserDirectory, UserPage};

static NEXT_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<([^>]+)>\s*;\s*rel="?next"?"#).unwrap());

/// Extract the `rel="next"` target from one or more `Link` header values.
pub fn next_link<'a>(values: impl IntoIterator<Item = &'a str>) -> Option<String> {
    values.into_iter().find_map(|value| {
        NEXT_LINK
            .captures(value)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    })
}

/// Okta user directory.
pub struct OktaDirectory {
    client: Client,
    origin: String,
    page_size: u32,
}

impl OktaDirectory {
    /// Create a new Okta directory client.
    pub fn new(
        provider: &ProviderConfig,
        directory: &DirectoryConfig,
    ) -> Result<Self, DirectoryError> {
        Ok(Self {
            client: build_http_client(provider)?,
            origin: provider.origin(),
            page_size: directory.page_size,
        })
    }

    fn first_page_url(&self, filter: &str) -> String {
        let mut url = format!("{}/api/v1/users?limit={}", self.origin, self.page_size);
        if !filter.trim().is_empty() {
            url.push_str("&search=");
            url.push_str(&urlencoding::encode(filter.trim()));
        }
        url
    }
}

#[async_trait]
impl UserDirectory for OktaDirectory {
    async fn list_page(
        &self,
        filter: &str,
        cursor: Option<&str>,
    ) -> Result<UserPage, DirectoryError> {
        let url = match cursor {
            None => self.first_page_url(filter),
            // The token must never be sent to a host other than the provider.
            Some(next) if next.starts_with(&format!("{}/", self.origin)) => next.to_string(),
            Some(next) => return Err(DirectoryError::InvalidCursor(next.to_string())),
        };
        debug!("Okta list users: {}", url);

        let response = self.client.get(&url).send().await?;
        let response = ensure_success(response).await?;

        let next_cursor = next_link(
            response
                .headers()
                .get_all(LINK)
                .iter()
                .filter_map(|value| value.to_str().ok()),
        );

        let users: Vec<DirectoryUser> = response.json().await.map_err(|e| {
            DirectoryError::ParseError(format!("Failed to parse users response: {}", e))
        })?;

        Ok(UserPage { users, next_cursor })
    }
}
