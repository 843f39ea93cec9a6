//! User-directory screen state: server-side paging and search over the user
//! list, plus the create/update/delete operations behind the modal form.
//!
//! The state is a snapshot mutated through one entry point; pagination
//! queries (`total_pages`, `can_next`, ...) are derived from it on demand.

use super::{ApiClient, ApiError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;

/// Rows fetched per page.
pub const PAGE_SIZE: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserPage {
    pub items: Vec<UserRow>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
}

/// Body of the create/update form.
#[derive(Debug, Clone, Serialize)]
pub struct UserPayload {
    pub name: String,
    pub email: String,
    pub role: String,
}

#[derive(Debug, Clone)]
pub struct UsersState {
    pub loading: bool,
    pub items: Vec<UserRow>,
    pub page: u64,
    pub total: u64,
    pub q: String,
    pub error: String,
}

impl Default for UsersState {
    fn default() -> Self {
        Self {
            loading: false,
            items: Vec::new(),
            page: 1,
            total: 0,
            q: String::new(),
            error: String::new(),
        }
    }
}

pub struct UsersScreen {
    api: Arc<ApiClient>,
    state: UsersState,
}

impl UsersScreen {
    #[must_use]
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            api,
            state: UsersState::default(),
        }
    }

    #[must_use]
    pub fn state(&self) -> &UsersState {
        &self.state
    }

    /// Single mutation entry point for the screen state.
    fn update(&mut self, apply: impl FnOnce(&mut UsersState)) {
        apply(&mut self.state);
    }

    #[must_use]
    pub fn total_pages(&self) -> u64 {
        self.state.total.div_ceil(PAGE_SIZE).max(1)
    }

    #[must_use]
    pub fn can_prev(&self) -> bool {
        self.state.page > 1 && !self.state.loading
    }

    #[must_use]
    pub fn can_next(&self) -> bool {
        self.state.page < self.total_pages() && !self.state.loading
    }

    #[must_use]
    pub fn range_text(&self) -> String {
        let total = self.state.total;
        if total == 0 {
            return "0 results".to_string();
        }
        let start = (self.state.page - 1) * PAGE_SIZE + 1;
        let end = (self.state.page * PAGE_SIZE).min(total);
        format!("{start}-{end} of {total}")
    }

    /// Fetches the current page with the current query.
    #[instrument(skip(self))]
    pub async fn load(&mut self) -> Result<(), ApiError> {
        self.update(|state| {
            state.error.clear();
            state.loading = true;
        });

        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("q", &self.state.q)
            .append_pair("page", &self.state.page.to_string())
            .append_pair("limit", &PAGE_SIZE.to_string())
            .finish();

        match self.api.get_json::<UserPage>(&format!("/users?{query}")).await {
            Ok(page) => {
                self.update(|state| {
                    state.items = page.items;
                    state.total = page.total;
                    state.loading = false;
                    state.error.clear();
                });
                Ok(())
            }
            Err(err) => {
                let message = err.message.clone();
                self.update(|state| {
                    state.error = message;
                    state.loading = false;
                });
                Err(err)
            }
        }
    }

    pub fn set_query(&mut self, q: impl Into<String>) {
        let q = q.into();
        self.update(|state| state.q = q);
    }

    /// Applies the query from page 1.
    pub async fn search(&mut self) -> Result<(), ApiError> {
        self.update(|state| state.page = 1);
        self.load().await
    }

    pub async fn reset(&mut self) -> Result<(), ApiError> {
        self.update(|state| {
            state.q.clear();
            state.page = 1;
        });
        self.load().await
    }

    pub async fn next_page(&mut self) -> Result<(), ApiError> {
        if !self.can_next() {
            return Ok(());
        }
        self.update(|state| state.page += 1);
        self.load().await
    }

    pub async fn prev_page(&mut self) -> Result<(), ApiError> {
        if !self.can_prev() {
            return Ok(());
        }
        self.update(|state| state.page -= 1);
        self.load().await
    }

    /// Creates a user and reloads the current page. Validation and conflict
    /// failures propagate without retry.
    pub async fn create(&mut self, payload: &UserPayload) -> Result<UserRow, ApiError> {
        let created = self.api.post_json("/users", payload).await?;
        self.load().await?;
        Ok(created)
    }

    pub async fn update_user(&mut self, id: &str, payload: &UserPayload) -> Result<UserRow, ApiError> {
        let updated = self.api.put_json(&format!("/users/{id}"), payload).await?;
        self.load().await?;
        Ok(updated)
    }

    /// Deletes a user, clamps the current page to the new maximum valid page,
    /// and reloads.
    pub async fn delete_user(&mut self, id: &str) -> Result<(), ApiError> {
        self.api.delete(&format!("/users/{id}")).await?;

        let max_page = max_page_after_removal(self.state.total, PAGE_SIZE);
        if self.state.page > max_page {
            self.update(|state| state.page = max_page);
        }
        self.load().await
    }
}

/// Highest valid page once one row is gone from `total` at the given page
/// size. Never below 1.
fn max_page_after_removal(total: u64, limit: u64) -> u64 {
    let remaining = total.saturating_sub(1);
    remaining.div_ceil(limit).max(1)
}
