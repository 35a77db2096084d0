//! Okta factors API client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Response};
use serde::Deserialize;
use tracing::debug;

use crate::config::ProviderConfig;

use super::{Factor, IdentityProvider, PollReference, ProviderError, PushInitiation, PushStatus};

/// Build an HTTP client that authenticates every request with the API token.
pub(crate) fn build_http_client(config: &ProviderConfig) -> Result<Client, ProviderError> {
    let mut headers = HeaderMap::new();
    let token = HeaderValue::from_str(&format!("SSWS {}", config.api_token))
        .map_err(|_| ProviderError::Unauthorized("API token is not a valid header value".into()))?;
    headers.insert(AUTHORIZATION, token);
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let client = Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs as u64))
        .default_headers(headers)
        .build()?;
    Ok(client)
}

/// Map non-success statuses to provider errors.
pub(crate) async fn ensure_success(response: Response) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == 401 || status == 403 {
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::Unauthorized(body));
    }
    if status == 429 {
        return Err(ProviderError::RateLimited);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::ApiError {
        status: status.as_u16(),
        message: body,
    })
}

/// Okta identity provider client.
pub struct OktaProvider {
    client: Client,
    origin: String,
}

impl OktaProvider {
    /// Create a new Okta client.
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_http_client(config)?,
            origin: config.origin(),
        })
    }

    async fn factor_result(response: Response) -> Result<FactorResultResponse, ProviderError> {
        ensure_success(response).await?.json().await.map_err(|e| {
            ProviderError::ParseError(format!("Failed to parse factor result: {}", e))
        })
    }
}

#[async_trait]
impl IdentityProvider for OktaProvider {
    fn origin(&self) -> &str {
        &self.origin
    }

    async fn list_factors(&self, user_id: &str) -> Result<Vec<Factor>, ProviderError> {
        let url = format!(
            "{}/api/v1/users/{}/factors",
            self.origin,
            urlencoding::encode(user_id)
        );
        debug!("Okta list factors: user={}", user_id);

        let response = self.client.get(&url).send().await?;
        ensure_success(response).await?.json().await.map_err(|e| {
            ProviderError::ParseError(format!("Failed to parse factors response: {}", e))
        })
    }

    async fn initiate_push(
        &self,
        user_id: &str,
        factor_id: &str,
    ) -> Result<PushInitiation, ProviderError> {
        let url = format!(
            "{}/api/v1/users/{}/factors/{}/verify",
            self.origin,
            urlencoding::encode(user_id),
            urlencoding::encode(factor_id)
        );
        debug!("Okta verify factor: user={}, factor={}", user_id, factor_id);

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({}))
            .send()
            .await?;
        let result = Self::factor_result(response).await?;

        Ok(PushInitiation {
            status: PushStatus::parse(&result.factor_result),
            poll_href: result
                .links
                .and_then(|links| links.poll)
                .map(|poll| poll.href),
        })
    }

    async fn poll_push_status(
        &self,
        poll_ref: &PollReference,
    ) -> Result<PushStatus, ProviderError> {
        let url = format!("{}{}", self.origin, poll_ref);
        debug!("Okta poll push: {}", poll_ref);

        let response = self.client.get(&url).send().await?;
        let result = Self::factor_result(response).await?;
        Ok(PushStatus::parse(&result.factor_result))
    }
}

// Okta API response types

#[derive(Debug, Deserialize)]
struct FactorResultResponse {
    #[serde(rename = "factorResult")]
    factor_result: String,
    #[serde(rename = "_links", default)]
    links: Option<FactorLinks>,
}

#[derive(Debug, Deserialize)]
struct FactorLinks {
    #[serde(default)]
    poll: Option<Link>,
}

#[derive(Debug, Deserialize)]
struct Link {
    href: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(domain: &str) -> ProviderConfig {
        ProviderConfig {
            domain: domain.to_string(),
            api_token: "token".to_string(),
            timeout_secs: 5,
        }
    }

    #[test]
    fn test_provider_origin() {
        let provider = OktaProvider::new(&config("acme.okta.com")).unwrap();
        assert_eq!(provider.origin(), "https://acme.okta.com");
    }

    #[test]
    fn test_invalid_token_header_is_rejected() {
        let mut config = config("acme.okta.com");
        config.api_token = "bad\ntoken".to_string();
        assert!(matches!(
            build_http_client(&config),
            Err(ProviderError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_parse_waiting_verify_response() {
        let json = r#"{
            "factorResult": "WAITING",
            "profile": {"credentialId": "jane@example.com"},
            "_links": {
                "poll": {"href": "https://acme.okta.com/api/v1/users/u1/factors/f1/transactions/t1", "hints": {"allow": ["GET"]}},
                "cancel": {"href": "https://acme.okta.com/api/v1/users/u1/factors/f1/transactions/t1"}
            }
        }"#;
        let parsed: FactorResultResponse = serde_json::from_str(json).unwrap();
        assert_eq!(PushStatus::parse(&parsed.factor_result), PushStatus::Waiting);
        let href = parsed.links.unwrap().poll.unwrap().href;
        assert!(href.ends_with("/transactions/t1"));
    }

    #[test]
    fn test_parse_poll_response_without_links() {
        let parsed: FactorResultResponse =
            serde_json::from_str(r#"{"factorResult": "REJECTED"}"#).unwrap();
        assert_eq!(PushStatus::parse(&parsed.factor_result), PushStatus::Rejected);
        assert!(parsed.links.is_none());
    }
}
