//! User identity and its capability contracts.
//!
//! [`Identity`] wraps one `users` row. Behaviour is split across independent
//! traits (see [`contracts`]) that the single concrete type implements
//! jointly. Every operation that touches storage or secrets receives an
//! explicit [`IdentityContext`].

pub mod contracts;

mod activation;
mod editable;
mod lookup;
mod managed;
mod password;

pub use contracts::{
    ActivatedIdentity, EditableIdentity, IdentityLookup, ManagedIdentity, PasswordHistory,
};

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::task;
use tracing::warn;

use crate::config::IdentityConfig;
use crate::domain::{AuthErrorCode, UserId, now_timestamp};
use crate::entities::users;
use crate::security::{Security, SecurityError};
use crate::store::{CredentialStore, PasswordHistoryEntry, SaveOutcome, StoreError};

/// Stored in place of a hash until the first real password is set. Never
/// parses as a PHC string, so it can never verify.
pub const PASSWORD_PLACEHOLDER: &str = "x";

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Not supported: {0}")]
    Unsupported(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Security(#[from] SecurityError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for IdentityError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Store(StoreError::Database(err))
    }
}

/// Services an identity operation may need.
#[derive(Clone)]
pub struct IdentityContext {
    pub store: Arc<dyn CredentialStore>,
    pub security: Arc<dyn Security>,
    pub policy: IdentityConfig,
}

impl IdentityContext {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        security: Arc<dyn Security>,
        policy: IdentityConfig,
    ) -> Self {
        Self {
            store,
            security,
            policy,
        }
    }

    /// Argon2 is CPU-bound, so hashing runs on the blocking pool.
    pub async fn hash_password(&self, password: &str) -> Result<String, IdentityError> {
        let security = Arc::clone(&self.security);
        let password = password.to_string();

        task::spawn_blocking(move || security.generate_password_hash(&password))
            .await
            .map_err(|e| IdentityError::Internal(format!("Password hashing task failed: {e}")))?
            .map_err(IdentityError::from)
    }

    /// Any failure of the comparison itself counts as a mismatch.
    pub async fn verify_password(&self, password: &str, hash: &str) -> bool {
        let security = Arc::clone(&self.security);
        let password = password.to_string();
        let hash = hash.to_string();

        match task::spawn_blocking(move || security.validate_password(&password, &hash)).await {
            Ok(Ok(valid)) => valid,
            Ok(Err(e)) => {
                warn!("Password verification failed: {}", e);
                false
            }
            Err(e) => {
                warn!("Password verification task failed: {}", e);
                false
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AuthFailure {
    pub code: AuthErrorCode,
    pub message: &'static str,
}

impl From<AuthErrorCode> for AuthFailure {
    fn from(code: AuthErrorCode) -> Self {
        Self {
            code,
            message: code.message(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    Authenticated,
    Rejected(AuthFailure),
}

impl AuthOutcome {
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated)
    }

    #[must_use]
    pub fn error_code(&self) -> Option<AuthErrorCode> {
        match self {
            Self::Authenticated => None,
            Self::Rejected(failure) => Some(failure.code),
        }
    }
}

/// Timestamp keys exposed by [`ManagedIdentity::timestamps`].
pub const TIMESTAMP_KEYS: [&str; 4] = ["createdOn", "updatedOn", "lastVisitOn", "passwordSetOn"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Timestamps {
    /// A known key; `None` when the timestamp is present but unset.
    Single(Option<String>),
    All(BTreeMap<&'static str, Option<String>>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    record: users::Model,
    new_record: bool,
    /// Email as last loaded from or written to the store.
    stored_email: Option<String>,
}

impl Default for Identity {
    fn default() -> Self {
        Self::new()
    }
}

impl Identity {
    /// A fresh, unsaved identity.
    #[must_use]
    pub fn new() -> Self {
        Self {
            record: users::Model::default(),
            new_record: true,
            stored_email: None,
        }
    }

    #[must_use]
    pub fn from_model(record: users::Model) -> Self {
        let stored_email = Some(record.email.clone());
        Self {
            record,
            new_record: false,
            stored_email,
        }
    }

    #[must_use]
    pub const fn record(&self) -> &users::Model {
        &self.record
    }

    #[must_use]
    pub const fn is_new_record(&self) -> bool {
        self.new_record
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.record.username
    }

    #[must_use]
    pub fn first_name(&self) -> Option<&str> {
        self.record.firstname.as_deref()
    }

    #[must_use]
    pub fn last_name(&self) -> Option<&str> {
        self.record.lastname.as_deref()
    }

    #[must_use]
    pub fn access_token(&self) -> Option<&str> {
        self.record.access_token.as_deref()
    }

    /// Takes effect on the next save.
    pub fn set_access_token(&mut self, token: Option<String>) {
        self.record.access_token = token;
    }

    /// Checks `password` against the stored hash. Placeholder or malformed
    /// hashes never verify.
    pub async fn verify_password(&self, ctx: &IdentityContext, password: &str) -> bool {
        ctx.verify_password(password, &self.record.password).await
    }

    /// Stamps created/updated times, assigns an auth key on first insert and
    /// hands the row to the store. Validation failures are logged and
    /// reported as `Ok(false)`.
    async fn persist(&mut self, ctx: &IdentityContext, validate: bool) -> Result<bool, IdentityError> {
        self.persist_replacing(ctx, validate, None).await
    }

    /// [`Self::persist`], storing `replaced` in the password history
    /// atomically with the row.
    async fn persist_replacing(
        &mut self,
        ctx: &IdentityContext,
        validate: bool,
        replaced: Option<PasswordHistoryEntry>,
    ) -> Result<bool, IdentityError> {
        let now = now_timestamp();
        if self.new_record {
            self.record.created_on = now;
            if self.record.auth_key.is_none() {
                self.record.auth_key = Some(ctx.security.generate_random_string());
            }
        } else {
            self.record.updated_on = Some(now);
        }

        match ctx
            .store
            .save(&mut self.record, self.new_record, validate, replaced)
            .await?
        {
            SaveOutcome::Saved => {
                self.new_record = false;
                self.stored_email = Some(self.record.email.clone());
                Ok(true)
            }
            SaveOutcome::Invalid(errors) => {
                let details = errors
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; ");
                warn!(username = %self.record.username, "Failed to save user: {}", details);
                Ok(false)
            }
        }
    }

    fn user_id(&self) -> Option<UserId> {
        (!self.new_record).then(|| UserId::new(self.record.id))
    }
}
