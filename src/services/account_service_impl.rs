//! `SeaORM`-backed implementation of the `AccountService` trait.

use async_trait::async_trait;
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::config::SearchConfig;
use crate::domain::{ActivationKeyStatus, AuthErrorCode, StatusKind, UserId};
use crate::identity::{
    ActivatedIdentity, AuthOutcome, EditableIdentity, Identity, IdentityContext, IdentityLookup,
    ManagedIdentity, PasswordHistory,
};
use crate::search::SearchFilter;
use crate::services::account_service::{
    AccountError, AccountService, LoginResult, Registration, RegistrationRequest, UserSummary,
};
use crate::store::{Page, PageRequest};

pub struct SeaOrmAccountService {
    ctx: IdentityContext,
    search: SearchConfig,
}

impl SeaOrmAccountService {
    #[must_use]
    pub const fn new(ctx: IdentityContext, search: SearchConfig) -> Self {
        Self { ctx, search }
    }

    async fn require_user(&self, username: &str) -> Result<Identity, AccountError> {
        Identity::find_by_username(&self.ctx, username)
            .await?
            .ok_or(AccountError::UserNotFound)
    }

    fn validate_new_password(&self, password: &str) -> Result<(), AccountError> {
        let min = self.ctx.policy.min_password_length;
        if password.chars().count() < min {
            return Err(AccountError::Validation(format!(
                "Password must be at least {min} characters"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl AccountService for SeaOrmAccountService {
    async fn login(&self, username: &str, password: &str) -> Result<LoginResult, AccountError> {
        let Some(mut identity) = Identity::find_by_username(&self.ctx, username).await? else {
            warn!(username, "Login attempt for unknown user");
            return Err(AccountError::InvalidCredentials);
        };

        match identity.authenticate(&self.ctx, password).await? {
            AuthOutcome::Authenticated => {}
            AuthOutcome::Rejected(failure) => {
                warn!(username, code = failure.code.code(), "Login rejected: {}", failure.message);
                return Err(match failure.code {
                    AuthErrorCode::Inactive => AccountError::Inactive,
                    AuthErrorCode::Disabled => AccountError::Disabled,
                    AuthErrorCode::Invalid => AccountError::InvalidCredentials,
                });
            }
        }

        let id = identity
            .id()
            .ok_or_else(|| AccountError::Internal("Authenticated user has no id".to_string()))?;
        let auth_key = identity
            .auth_key()
            .ok_or_else(|| AccountError::Internal("Authenticated user has no auth key".to_string()))?
            .to_string();

        Ok(LoginResult {
            id,
            username: identity.username().to_string(),
            auth_key,
        })
    }

    async fn resume_session(&self, id: UserId, auth_key: &str) -> Result<UserSummary, AccountError> {
        let identity = Identity::find_by_id(&self.ctx, id)
            .await?
            .ok_or(AccountError::UserNotFound)?;

        if !identity.validate_auth_key(auth_key) {
            return Err(AccountError::InvalidCredentials);
        }

        Ok(UserSummary::from(&identity))
    }

    async fn find_by_access_token(&self, token: &str) -> Result<UserSummary, AccountError> {
        let identity = Identity::find_by_access_token(&self.ctx, token, None)
            .await?
            .ok_or(AccountError::InvalidCredentials)?;

        Ok(UserSummary::from(&identity))
    }

    async fn register(&self, request: RegistrationRequest) -> Result<Registration, AccountError> {
        self.validate_new_password(&request.password)?;

        let require_verified_email = self.ctx.policy.require_verified_email;

        let mut identity = Identity::new();
        identity.set_identity_attributes(&request.attributes);

        if !identity
            .save_identity(&self.ctx, require_verified_email)
            .await?
        {
            return Err(AccountError::Validation(
                "Username or email is missing or already taken".to_string(),
            ));
        }

        if !identity.reset_password(&self.ctx, &request.password).await? {
            return Err(AccountError::Internal(
                "Failed to set password for new user".to_string(),
            ));
        }

        let activation_key = if require_verified_email {
            identity.generate_activation_key(&self.ctx).await?
        } else {
            None
        };

        info!(username = identity.username(), "Account registered");

        Ok(Registration {
            user: UserSummary::from(&identity),
            activation_key,
        })
    }

    async fn update_profile(
        &self,
        username: &str,
        attributes: &BTreeMap<String, String>,
    ) -> Result<UserSummary, AccountError> {
        let mut identity = self.require_user(username).await?;
        identity.set_identity_attributes(attributes);

        if !identity
            .save_identity(&self.ctx, self.ctx.policy.require_verified_email)
            .await?
        {
            return Err(AccountError::Validation(
                "Username or email is missing or already taken".to_string(),
            ));
        }

        Ok(UserSummary::from(&identity))
    }

    async fn request_activation_key(&self, username: &str) -> Result<String, AccountError> {
        let mut identity = self.require_user(username).await?;

        identity
            .generate_activation_key(&self.ctx)
            .await?
            .ok_or_else(|| AccountError::Internal("Failed to store activation key".to_string()))
    }

    async fn confirm_email(&self, username: &str, activation_key: &str) -> Result<(), AccountError> {
        let mut identity = self.require_user(username).await?;

        match identity.verify_activation_key(&self.ctx, activation_key) {
            ActivationKeyStatus::None => {}
            ActivationKeyStatus::Invalid => return Err(AccountError::InvalidActivationKey),
            ActivationKeyStatus::TooOld => return Err(AccountError::ActivationKeyExpired),
        }

        if !identity
            .verify_email(&self.ctx, self.ctx.policy.require_verified_email)
            .await?
        {
            return Err(AccountError::Internal(
                "Failed to store email verification".to_string(),
            ));
        }

        Ok(())
    }

    async fn change_password(
        &self,
        username: &str,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AccountError> {
        self.validate_new_password(new_password)?;

        if current_password == new_password {
            return Err(AccountError::Validation(
                "New password must be different from current password".to_string(),
            ));
        }

        let mut identity = self.require_user(username).await?;

        if !identity.verify_password(&self.ctx, current_password).await {
            return Err(AccountError::Validation(
                "Current password is incorrect".to_string(),
            ));
        }

        if let Some(used_on) = identity
            .password_date(&self.ctx, Some(new_password))
            .await?
        {
            return Err(AccountError::Validation(format!(
                "This password was already used on {used_on}"
            )));
        }

        if !identity.reset_password(&self.ctx, new_password).await? {
            return Err(AccountError::Internal("Failed to update password".to_string()));
        }

        Ok(())
    }

    async fn list_users(
        &self,
        filter: SearchFilter,
        page: u64,
        page_size: Option<u64>,
    ) -> Result<Page<UserSummary>, AccountError> {
        let filter = filter.normalized();
        filter.validate()?;

        let request = PageRequest::new(
            page,
            page_size.unwrap_or(self.search.default_page_size),
            self.search.max_page_size,
        );

        let page = Identity::filtered_page(&self.ctx, &filter, request).await?;
        Ok(page.map(|identity| UserSummary::from(&identity)))
    }

    async fn toggle_status(
        &self,
        id: UserId,
        status: StatusKind,
    ) -> Result<UserSummary, AccountError> {
        let mut identity = Identity::find_by_id(&self.ctx, id)
            .await?
            .ok_or(AccountError::UserNotFound)?;

        if !identity.toggle_status(&self.ctx, status).await? {
            return Err(AccountError::Internal(
                "Failed to store account status".to_string(),
            ));
        }

        Ok(UserSummary::from(&identity))
    }
}
