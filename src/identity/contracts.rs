//! Capability contracts an account type can satisfy.
//!
//! Each trait stands alone; a caller that only needs lookups depends only on
//! [`IdentityLookup`], an admin screen only on [`ManagedIdentity`], and so on.

use async_trait::async_trait;
use std::collections::BTreeMap;

use super::{AuthOutcome, IdentityContext, IdentityError, Timestamps};
use crate::domain::{ActivationKeyStatus, StatusKind, UserId};
use crate::search::SearchFilter;
use crate::store::{Page, PageRequest};

#[async_trait]
pub trait IdentityLookup: Sized + Send + Sync {
    async fn find_by_username(
        ctx: &IdentityContext,
        username: &str,
    ) -> Result<Option<Self>, IdentityError>;

    async fn find_by_id(ctx: &IdentityContext, id: UserId) -> Result<Option<Self>, IdentityError>;

    /// # Errors
    ///
    /// Returns [`IdentityError::Unsupported`] when `token_type` is given;
    /// tokens are not typed.
    async fn find_by_access_token(
        ctx: &IdentityContext,
        token: &str,
        token_type: Option<&str>,
    ) -> Result<Option<Self>, IdentityError>;

    /// `None` until the identity has been stored.
    fn id(&self) -> Option<UserId>;

    fn auth_key(&self) -> Option<&str>;

    fn validate_auth_key(&self, candidate: &str) -> bool;

    /// Rejects inactive accounts first, then disabled ones, then a wrong
    /// password. On success records the visit.
    async fn authenticate(
        &mut self,
        ctx: &IdentityContext,
        password: &str,
    ) -> Result<AuthOutcome, IdentityError>;
}

#[async_trait]
pub trait PasswordHistory: Send + Sync {
    /// With `None`, when the current password was set. With a password, when
    /// that password was last set, or `None` if it was never used.
    async fn password_date(
        &self,
        ctx: &IdentityContext,
        password: Option<&str>,
    ) -> Result<Option<String>, IdentityError>;

    /// Hashes and stores `password`, keeping the replaced hash in history.
    async fn reset_password(
        &mut self,
        ctx: &IdentityContext,
        password: &str,
    ) -> Result<bool, IdentityError>;
}

#[async_trait]
pub trait EditableIdentity: Send + Sync {
    /// External profile name to stored column. The password is not editable
    /// here; use [`PasswordHistory::reset_password`].
    fn identity_attributes_map(&self) -> &'static [(&'static str, &'static str)];

    /// Unknown keys are ignored.
    fn set_identity_attributes(&mut self, attributes: &BTreeMap<String, String>);

    fn identity_attributes(&self) -> BTreeMap<String, String>;

    async fn save_identity(
        &mut self,
        ctx: &IdentityContext,
        require_verified_email: bool,
    ) -> Result<bool, IdentityError>;
}

#[async_trait]
pub trait ActivatedIdentity: Send + Sync {
    fn is_active(&self) -> bool;

    fn is_disabled(&self) -> bool;

    fn is_verified(&self) -> bool;

    fn email(&self) -> &str;

    /// Issues and stores a new key, invalidating any previous one.
    /// `None` if it could not be stored.
    async fn generate_activation_key(
        &mut self,
        ctx: &IdentityContext,
    ) -> Result<Option<String>, IdentityError>;

    /// Never mutates the identity.
    fn verify_activation_key(&self, ctx: &IdentityContext, candidate: &str) -> ActivationKeyStatus;

    /// Idempotent. Call only after the activation key was verified.
    async fn verify_email(
        &mut self,
        ctx: &IdentityContext,
        require_verified_email: bool,
    ) -> Result<bool, IdentityError>;
}

#[async_trait]
pub trait ManagedIdentity: Sized + Send + Sync {
    async fn filtered_page(
        ctx: &IdentityContext,
        filter: &SearchFilter,
        page: PageRequest,
    ) -> Result<Page<Self>, IdentityError>;

    async fn toggle_status(
        &mut self,
        ctx: &IdentityContext,
        status: StatusKind,
    ) -> Result<bool, IdentityError>;

    /// A single timestamp for a known key, otherwise all of them.
    fn timestamps(&self, key: Option<&str>) -> Timestamps;
}
