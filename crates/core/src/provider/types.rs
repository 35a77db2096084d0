//! Types for identity provider factors and push challenges.

use std::fmt;
use std::time::{Duration, Instant};

use reqwest::Url;
use serde::{Deserialize, Serialize};

use super::ProviderError;

/// Factor type tag as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FactorType {
    Push,
    Other(String),
}

impl From<String> for FactorType {
    fn from(value: String) -> Self {
        if value == "push" {
            FactorType::Push
        } else {
            FactorType::Other(value)
        }
    }
}

impl From<FactorType> for String {
    fn from(value: FactorType) -> Self {
        match value {
            FactorType::Push => "push".to_string(),
            FactorType::Other(other) => other,
        }
    }
}

/// An MFA factor enrolled for a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Factor {
    pub id: String,
    pub factor_type: FactorType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl Factor {
    pub fn is_push(&self) -> bool {
        self.factor_type == FactorType::Push
    }
}

/// Status of a push verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushStatus {
    Waiting,
    Success,
    Rejected,
    Timeout,
    Other(String),
}

impl PushStatus {
    pub fn parse(value: &str) -> Self {
        match value {
            "WAITING" => PushStatus::Waiting,
            "SUCCESS" => PushStatus::Success,
            "REJECTED" => PushStatus::Rejected,
            "TIMEOUT" => PushStatus::Timeout,
            other => PushStatus::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            PushStatus::Waiting => "WAITING",
            PushStatus::Success => "SUCCESS",
            PushStatus::Rejected => "REJECTED",
            PushStatus::Timeout => "TIMEOUT",
            PushStatus::Other(other) => other,
        }
    }
}

impl fmt::Display for PushStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of sending a push challenge.
#[derive(Debug, Clone)]
pub struct PushInitiation {
    /// Immediate status; a usable push starts out `Waiting`.
    pub status: PushStatus,
    /// Absolute poll link returned by the provider.
    pub poll_href: Option<String>,
}

/// Relative path (and query) used to poll an in-flight push.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PollReference(String);

impl PollReference {
    /// Derive a poll reference from the provider's poll link.
    ///
    /// The provider origin is stripped so only path and query remain. Links on
    /// a different origin keep just their path and query.
    pub fn from_link(href: &str, origin: &str) -> Result<Self, ProviderError> {
        let href = href.trim();
        if href.is_empty() {
            return Err(ProviderError::InvalidPollLink("empty poll link".to_string()));
        }

        let origin = origin.trim_end_matches('/');
        let relative = match href.strip_prefix(origin) {
            Some(rest)
                if !origin.is_empty()
                    && (rest.is_empty() || rest.starts_with('/') || rest.starts_with('?')) =>
            {
                rest.to_string()
            }
            _ if href.starts_with('/') => href.to_string(),
            _ => {
                let url = Url::parse(href)
                    .map_err(|e| ProviderError::InvalidPollLink(format!("{}: {}", href, e)))?;
                match url.query() {
                    Some(query) => format!("{}?{}", url.path(), query),
                    None => url.path().to_string(),
                }
            }
        };

        if relative.is_empty() || relative == "/" {
            return Err(ProviderError::InvalidPollLink(format!(
                "no path in poll link {}",
                href
            )));
        }

        if relative.starts_with('/') {
            Ok(Self(relative))
        } else {
            Ok(Self(format!("/{}", relative)))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PollReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An initiated push being polled.
#[derive(Debug, Clone)]
pub struct PushChallenge {
    pub poll_ref: PollReference,
    pub started_at: Instant,
}

impl PushChallenge {
    pub fn new(poll_ref: PollReference, started_at: Instant) -> Self {
        Self {
            poll_ref,
            started_at,
        }
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started_at)
    }
}
