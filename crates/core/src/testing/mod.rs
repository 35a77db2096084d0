//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the directory and identity
//! provider traits plus a manual timer, allowing whole drills to run in tests
//! without a real tenant or real waiting.
//!
//! # Example
//!
//! ```rust,ignore
//! use pushdrill_core::testing::{fixtures, ManualTimer, MockIdentityProvider};
//!
//! let provider = MockIdentityProvider::new();
//! provider.enroll_push("00u1").await;
//! provider.script_polls("00u1", vec![PushStatus::Waiting, PushStatus::Success]).await;
//!
//! let timer = ManualTimer::new();
//! // Build a PushVerifier with both and assert on provider.poll_count("00u1")...
//! ```

mod manual_timer;
mod mock_directory;
mod mock_provider;

pub use manual_timer::ManualTimer;
pub use mock_directory::{MockDirectory, RecordedPageRequest};
pub use mock_provider::{MockIdentityProvider, MOCK_ORIGIN};

/// Test fixtures and helper functions.
pub mod fixtures {
    use serde_json::{json, Map, Value};

    use crate::directory::{DirectoryUser, UserRecord};
    use crate::provider::{Factor, FactorType};

    /// Create a raw directory user with an email and optional country code.
    pub fn directory_user(id: &str, email: &str, region: Option<&str>) -> DirectoryUser {
        let mut profile = Map::new();
        profile.insert("email".to_string(), json!(email));
        profile.insert("login".to_string(), json!(email));
        if let Some(region) = region {
            profile.insert("countryCode".to_string(), json!(region));
        } else {
            profile.insert("countryCode".to_string(), Value::Null);
        }
        DirectoryUser {
            id: id.to_string(),
            status: Some("ACTIVE".to_string()),
            profile,
        }
    }

    /// Create a mapped user record.
    pub fn user_record(id: &str, email: &str, region: Option<&str>) -> UserRecord {
        let record = UserRecord::new(id, email);
        match region {
            Some(region) => record.with_region(region),
            None => record,
        }
    }

    /// Create `count` users spread round-robin over `regions`.
    pub fn user_records(count: usize, regions: &[&str]) -> Vec<UserRecord> {
        (0..count)
            .map(|i| {
                let region = if regions.is_empty() {
                    None
                } else {
                    Some(regions[i % regions.len()])
                };
                user_record(&format!("u{}", i), &format!("user{}@example.com", i), region)
            })
            .collect()
    }

    /// Create a factor of the given provider type tag.
    pub fn factor(id: &str, factor_type: &str) -> Factor {
        Factor {
            id: id.to_string(),
            factor_type: FactorType::from(factor_type.to_string()),
            provider: Some("OKTA".to_string()),
            status: Some("ACTIVE".to_string()),
        }
    }
}
