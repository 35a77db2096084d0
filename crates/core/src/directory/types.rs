//! Types for directory users.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::stats::UNKNOWN_REGION;

use super::DirectoryError;

/// User as returned by the directory, with an untyped profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryUser {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default)]
    pub profile: Map<String, Value>,
}

/// One page of directory results.
#[derive(Debug, Clone, Default)]
pub struct UserPage {
    pub users: Vec<DirectoryUser>,
    /// Opaque cursor for the next page; `None` on the last page.
    pub next_cursor: Option<String>,
}

/// A user selected for the drill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Provider-side user id.
    pub provider_id: String,
    pub email: String,
    /// Region code from the profile; see [`UserRecord::region`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login: Option<String>,
}

impl UserRecord {
    pub fn new(provider_id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            email: email.into(),
            region: None,
            login: None,
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Region used for statistics, `"UNKNOWN"` when the profile has none.
    pub fn region(&self) -> &str {
        match self.region.as_deref() {
            Some(region) if !region.trim().is_empty() => region,
            _ => UNKNOWN_REGION,
        }
    }
}

fn profile_str(profile: &Map<String, Value>, key: &str) -> Option<String> {
    profile
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

impl TryFrom<DirectoryUser> for UserRecord {
    type Error = DirectoryError;

    fn try_from(user: DirectoryUser) -> Result<Self, Self::Error> {
        let email =
            profile_str(&user.profile, "email").ok_or_else(|| DirectoryError::MissingField {
                user_id: user.id.clone(),
                field: "email",
            })?;

        Ok(Self {
            region: profile_str(&user.profile, "countryCode"),
            login: profile_str(&user.profile, "login"),
            provider_id: user.id,
            email,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn directory_user(profile: Value) -> DirectoryUser {
        serde_json::from_value(json!({
            "id": "00u1",
            "status": "ACTIVE",
            "profile": profile,
        }))
        .unwrap()
    }

    #[test]
    fn test_maps_full_profile() {
        let user = directory_user(json!({
            "email": "jane@example.com",
            "login": "jane",
            "countryCode": "DE",
        }));
        let record = UserRecord::try_from(user).unwrap();
        assert_eq!(record.provider_id, "00u1");
        assert_eq!(record.email, "jane@example.com");
        assert_eq!(record.login.as_deref(), Some("jane"));
        assert_eq!(record.region(), "DE");
    }

    #[test]
    fn test_missing_region_falls_back_to_unknown() {
        let record = UserRecord::try_from(directory_user(json!({
            "email": "joe@example.com",
            "countryCode": null,
        })))
        .unwrap();
        assert!(record.region.is_none());
        assert_eq!(record.region(), UNKNOWN_REGION);
    }

    #[test]
    fn test_non_string_region_is_ignored() {
        let record = UserRecord::try_from(directory_user(json!({
            "email": "joe@example.com",
            "countryCode": 49,
        })))
        .unwrap();
        assert_eq!(record.region(), UNKNOWN_REGION);
    }

    #[test]
    fn test_missing_email_is_a_typed_error() {
        let err = UserRecord::try_from(directory_user(json!({"login": "nomail"}))).unwrap_err();
        match err {
            DirectoryError::MissingField { user_id, field } => {
                assert_eq!(user_id, "00u1");
                assert_eq!(field, "email");
            }
            other => panic!("Expected MissingField, got {:?}", other),
        }
    }

    #[test]
    fn test_blank_region_on_record_resolves_to_unknown() {
        let record = UserRecord::new("u1", "a@example.com").with_region("  ");
        assert_eq!(record.region(), UNKNOWN_REGION);
    }
}
