//! Domain service for account flows.
//!
//! Composes the identity contracts into login, registration, email
//! verification, password changes and administrative listing.

use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::domain::{StatusKind, UserId};
use crate::identity::{
    ActivatedIdentity, Identity, IdentityError, IdentityLookup, ManagedIdentity, Timestamps,
};
use crate::search::{FilterError, SearchFilter};
use crate::store::Page;

/// Errors specific to account operations.
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("User account has not been activated yet")]
    Inactive,

    #[error("User account has been disabled")]
    Disabled,

    #[error("User not found")]
    UserNotFound,

    #[error("Invalid activation key")]
    InvalidActivationKey,

    #[error("Activation key has expired")]
    ActivationKeyExpired,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not supported: {0}")]
    Unsupported(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<IdentityError> for AccountError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::Unsupported(msg) => Self::Unsupported(msg),
            IdentityError::Store(e) => Self::Database(e.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<FilterError> for AccountError {
    fn from(err: FilterError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// User info DTO for listings and responses. Never carries secrets.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Option<UserId>,
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email_verified: bool,
    pub is_active: bool,
    pub is_disabled: bool,
    pub timestamps: Timestamps,
}

impl From<&Identity> for UserSummary {
    fn from(identity: &Identity) -> Self {
        Self {
            id: identity.id(),
            username: identity.username().to_string(),
            email: identity.email().to_string(),
            first_name: identity.first_name().map(str::to_string),
            last_name: identity.last_name().map(str::to_string),
            email_verified: identity.is_verified(),
            is_active: identity.is_active(),
            is_disabled: identity.is_disabled(),
            timestamps: identity.timestamps(None),
        }
    }
}

/// Login result containing the session validation key.
#[derive(Debug, Clone, Serialize)]
pub struct LoginResult {
    pub id: UserId,
    pub username: String,
    pub auth_key: String,
}

#[derive(Debug, Clone, Default)]
pub struct RegistrationRequest {
    /// Profile fields keyed by external name (username, email, firstName, lastName).
    pub attributes: BTreeMap<String, String>,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub user: UserSummary,
    /// Issued when the account must verify its email before logging in.
    pub activation_key: Option<String>,
}

/// Domain service trait for account management.
#[async_trait::async_trait]
pub trait AccountService: Send + Sync {
    /// # Errors
    ///
    /// Unknown users and wrong passwords both yield
    /// [`AccountError::InvalidCredentials`].
    async fn login(&self, username: &str, password: &str) -> Result<LoginResult, AccountError>;

    /// Resolves a remember-me cookie: user id plus auth key.
    async fn resume_session(&self, id: UserId, auth_key: &str) -> Result<UserSummary, AccountError>;

    async fn find_by_access_token(&self, token: &str) -> Result<UserSummary, AccountError>;

    async fn register(&self, request: RegistrationRequest) -> Result<Registration, AccountError>;

    async fn update_profile(
        &self,
        username: &str,
        attributes: &BTreeMap<String, String>,
    ) -> Result<UserSummary, AccountError>;

    async fn request_activation_key(&self, username: &str) -> Result<String, AccountError>;

    async fn confirm_email(&self, username: &str, activation_key: &str) -> Result<(), AccountError>;

    /// # Errors
    ///
    /// Returns [`AccountError::Validation`] if the current password is wrong,
    /// the new one is too short, unchanged, or was used before.
    async fn change_password(
        &self,
        username: &str,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AccountError>;

    async fn list_users(
        &self,
        filter: SearchFilter,
        page: u64,
        page_size: Option<u64>,
    ) -> Result<Page<UserSummary>, AccountError>;

    async fn toggle_status(&self, id: UserId, status: StatusKind)
    -> Result<UserSummary, AccountError>;
}
