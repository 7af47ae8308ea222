use async_trait::async_trait;
use subtle::ConstantTimeEq;
use tracing::{debug, info};

use super::{AuthOutcome, Identity, IdentityContext, IdentityError, IdentityLookup};
use crate::domain::{AuthErrorCode, UserId, now_timestamp};
use crate::store::Lookup;

impl Identity {
    async fn find(ctx: &IdentityContext, lookup: Lookup<'_>) -> Result<Option<Self>, IdentityError> {
        Ok(ctx.store.find_one(lookup).await?.map(Self::from_model))
    }
}

#[async_trait]
impl IdentityLookup for Identity {
    async fn find_by_username(
        ctx: &IdentityContext,
        username: &str,
    ) -> Result<Option<Self>, IdentityError> {
        Self::find(ctx, Lookup::Username(username)).await
    }

    async fn find_by_id(ctx: &IdentityContext, id: UserId) -> Result<Option<Self>, IdentityError> {
        Self::find(ctx, Lookup::Id(id.value())).await
    }

    async fn find_by_access_token(
        ctx: &IdentityContext,
        token: &str,
        token_type: Option<&str>,
    ) -> Result<Option<Self>, IdentityError> {
        if let Some(token_type) = token_type {
            return Err(IdentityError::Unsupported(format!(
                "access token type '{token_type}'"
            )));
        }

        Self::find(ctx, Lookup::AccessToken(token)).await
    }

    fn id(&self) -> Option<UserId> {
        self.user_id()
    }

    fn auth_key(&self) -> Option<&str> {
        self.record.auth_key.as_deref()
    }

    fn validate_auth_key(&self, candidate: &str) -> bool {
        self.record
            .auth_key
            .as_deref()
            .is_some_and(|stored| stored.as_bytes().ct_eq(candidate.as_bytes()).into())
    }

    async fn authenticate(
        &mut self,
        ctx: &IdentityContext,
        password: &str,
    ) -> Result<AuthOutcome, IdentityError> {
        let rejection = if !self.record.is_active {
            Some(AuthErrorCode::Inactive)
        } else if self.record.is_disabled {
            Some(AuthErrorCode::Disabled)
        } else if !self.verify_password(ctx, password).await {
            Some(AuthErrorCode::Invalid)
        } else {
            None
        };

        if let Some(code) = rejection {
            debug!(username = %self.record.username, code = code.code(), "Authentication rejected");
            return Ok(AuthOutcome::Rejected(code.into()));
        }

        self.record.last_visit_on = Some(now_timestamp());
        self.persist(ctx, false).await?;
        info!(username = %self.record.username, "User authenticated");

        Ok(AuthOutcome::Authenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_key_validation_is_exact() {
        let mut identity = Identity::new();
        assert!(!identity.validate_auth_key(""));

        identity.record.auth_key = Some("k3y-value".to_string());
        assert!(identity.validate_auth_key("k3y-value"));
        assert!(!identity.validate_auth_key("k3y-valu"));
        assert!(!identity.validate_auth_key("K3Y-VALUE"));
        assert!(!identity.validate_auth_key("k3y-value "));
    }

    #[test]
    fn unsaved_identity_has_no_id() {
        assert_eq!(Identity::new().id(), None);
    }
}
