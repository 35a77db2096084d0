//! User directory abstraction.
//!
//! This module provides a `UserDirectory` trait for paging through the users
//! selected by a filter expression, the mapping of raw directory users into
//! typed [`UserRecord`]s, and an Okta implementation.

mod okta;
mod types;

pub use okta::{next_link, OktaDirectory};
pub use types::*;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that can occur when listing directory users.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Provider-level failure (auth, rate limit, API error).
    #[error(transparent)]
    Provider(#[from] crate::provider::ProviderError),

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Pagination cursor does not belong to this directory.
    #[error("Invalid page cursor: {0}")]
    InvalidCursor(String),

    /// A required profile attribute is absent.
    #[error("user {user_id} has no {field} in profile")]
    MissingField { user_id: String, field: &'static str },
}

/// Source of the users selected for a drill.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Fetch one page of users matching `filter`.
    ///
    /// `cursor` is `None` for the first page, then the `next_cursor` of the
    /// previous page.
    async fn list_page(
        &self,
        filter: &str,
        cursor: Option<&str>,
    ) -> Result<UserPage, DirectoryError>;
}

/// Users collected from a directory, plus everything that went wrong on the way.
#[derive(Debug, Default)]
pub struct CollectedUsers {
    pub users: Vec<UserRecord>,
    pub errors: Vec<DirectoryError>,
    pub pages: usize,
}

/// Page through the directory until it is exhausted.
///
/// A failing page stops pagination but keeps what was collected so far;
/// records that cannot be mapped are skipped.
pub async fn collect_users(directory: &dyn UserDirectory, filter: &str) -> CollectedUsers {
    let mut collected = CollectedUsers::default();
    let mut cursor: Option<String> = None;

    loop {
        let page = match directory.list_page(filter, cursor.as_deref()).await {
            Ok(page) => page,
            Err(e) => {
                warn!("Failed to fetch directory page {}: {}", collected.pages + 1, e);
                collected.errors.push(e);
                break;
            }
        };
        collected.pages += 1;
        debug!(
            "Directory page {} returned {} users",
            collected.pages,
            page.users.len()
        );

        for user in page.users {
            match UserRecord::try_from(user) {
                Ok(record) => collected.users.push(record),
                Err(e) => {
                    warn!("Skipping directory user: {}", e);
                    collected.errors.push(e);
                }
            }
        }

        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    info!(
        "Collected {} users from {} directory pages ({} errors)",
        collected.users.len(),
        collected.pages,
        collected.errors.len()
    );
    collected
}
