//! Credential store contract consumed by identities.
//!
//! The store owns persistence: lookups, validated or unvalidated saves,
//! filtered pagination and the password history table.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::entities::users;
use crate::search::SearchFilter;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Record not found: {0}")]
    NotFound(String),
}

/// Exact-match criteria for [`CredentialStore::find_one`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup<'a> {
    Id(i32),
    Username(&'a str),
    AccessToken(&'a str),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    /// Validation rejected the record; nothing was written.
    Invalid(Vec<FieldError>),
}

impl SaveOutcome {
    #[must_use]
    pub const fn is_saved(&self) -> bool {
        matches!(self, Self::Saved)
    }
}

/// 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub page_size: u64,
}

impl PageRequest {
    /// Clamps `page` to at least 1 and `page_size` to `1..=max_page_size`.
    #[must_use]
    pub fn new(page: u64, page_size: u64, max_page_size: u64) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.clamp(1, max_page_size.max(1)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u64,
    pub page_size: u64,
    pub total_items: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            page_size: self.page_size,
            total_items: self.total_items,
            total_pages: self.total_pages,
        }
    }
}

/// A password hash that was replaced by a reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordHistoryEntry {
    pub password: String,
    pub set_on: Option<String>,
    pub replaced_on: String,
}

#[async_trait::async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_one(&self, lookup: Lookup<'_>) -> Result<Option<users::Model>, StoreError>;

    /// Inserts when `is_new`, updates otherwise, and writes the stored row
    /// back into `record`. With `validate`, field rules and uniqueness are
    /// checked first and reported as [`SaveOutcome::Invalid`].
    ///
    /// A `replaced` hash is appended to the password history in the same
    /// transaction as the row write; either both are stored or neither is.
    async fn save(
        &self,
        record: &mut users::Model,
        is_new: bool,
        validate: bool,
        replaced: Option<PasswordHistoryEntry>,
    ) -> Result<SaveOutcome, StoreError>;

    async fn find_page(
        &self,
        filter: &SearchFilter,
        page: PageRequest,
    ) -> Result<Page<users::Model>, StoreError>;

    /// Newest first.
    async fn password_history(&self, user_id: i32)
    -> Result<Vec<PasswordHistoryEntry>, StoreError>;
}
