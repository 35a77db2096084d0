//! Mock user directory for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::directory::{DirectoryError, DirectoryUser, UserDirectory, UserPage};

/// A recorded page request for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedPageRequest {
    pub filter: String,
    pub cursor: Option<String>,
}

/// Mock implementation of the UserDirectory trait.
///
/// Serves a fixed list of pages. Page `n` hands out cursor `"page-{n+1}"`
/// while more pages remain.
#[derive(Debug, Default)]
pub struct MockDirectory {
    pages: Arc<RwLock<Vec<Vec<DirectoryUser>>>>,
    /// Page index that fails once, with its error.
    failure: Arc<RwLock<Option<(usize, DirectoryError)>>>,
    requests: Arc<RwLock<Vec<RecordedPageRequest>>>,
}

impl MockDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock directory serving the given pages.
    pub fn with_pages(pages: Vec<Vec<DirectoryUser>>) -> Self {
        Self {
            pages: Arc::new(RwLock::new(pages)),
            ..Self::default()
        }
    }

    /// Make the request for page `index` (0-based) fail with `error`.
    pub async fn fail_page(&self, index: usize, error: DirectoryError) {
        *self.failure.write().await = Some((index, error));
    }

    pub async fn recorded_requests(&self) -> Vec<RecordedPageRequest> {
        self.requests.read().await.clone()
    }

    fn page_index(cursor: Option<&str>) -> Result<usize, DirectoryError> {
        match cursor {
            None => Ok(0),
            Some(c) => c
                .strip_prefix("page-")
                .and_then(|n| n.parse().ok())
                .ok_or_else(|| DirectoryError::InvalidCursor(c.to_string())),
        }
    }
}

#[async_trait]
impl UserDirectory for MockDirectory {
    async fn list_page(
        &self,
        filter: &str,
        cursor: Option<&str>,
    ) -> Result<UserPage, DirectoryError> {
        self.requests.write().await.push(RecordedPageRequest {
            filter: filter.to_string(),
            cursor: cursor.map(str::to_string),
        });

        let index = Self::page_index(cursor)?;

        {
            let mut failure = self.failure.write().await;
            if failure.as_ref().is_some_and(|(failing, _)| *failing == index) {
                if let Some((_, error)) = failure.take() {
                    return Err(error);
                }
            }
        }

        let pages = self.pages.read().await;
        let users = pages.get(index).cloned().unwrap_or_default();
        let next_cursor = (index + 1 < pages.len()).then(|| format!("page-{}", index + 1));
        Ok(UserPage { users, next_cursor })
    }
}
