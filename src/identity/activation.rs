use async_trait::async_trait;
use chrono::{Duration, Utc};
use subtle::ConstantTimeEq;
use tracing::info;

use super::{ActivatedIdentity, Identity, IdentityContext, IdentityError};
use crate::domain::{ActivationKeyStatus, now_timestamp, parse_timestamp};

impl Identity {
    /// Only meaningful when a TTL is configured; keys without a readable
    /// issue time are treated as expired.
    fn activation_key_expired(&self, ttl_minutes: u64) -> bool {
        let Some(issued) = self
            .record
            .activation_key_on
            .as_deref()
            .and_then(parse_timestamp)
        else {
            return true;
        };

        let minutes = i64::try_from(ttl_minutes)
            .unwrap_or(i64::MAX)
            .min(i64::MAX / 60_000);
        let ttl = Duration::minutes(minutes);
        Utc::now().naive_utc() - issued > ttl
    }
}

#[async_trait]
impl ActivatedIdentity for Identity {
    fn is_active(&self) -> bool {
        self.record.is_active
    }

    fn is_disabled(&self) -> bool {
        self.record.is_disabled
    }

    fn is_verified(&self) -> bool {
        self.record.email_verified
    }

    fn email(&self) -> &str {
        &self.record.email
    }

    async fn generate_activation_key(
        &mut self,
        ctx: &IdentityContext,
    ) -> Result<Option<String>, IdentityError> {
        let key = ctx.security.generate_random_key();
        self.record.activation_key = Some(key.clone());
        self.record.activation_key_on = Some(now_timestamp());

        Ok(self.persist(ctx, false).await?.then_some(key))
    }

    fn verify_activation_key(&self, ctx: &IdentityContext, candidate: &str) -> ActivationKeyStatus {
        let matches = self
            .record
            .activation_key
            .as_deref()
            .is_some_and(|stored| stored.as_bytes().ct_eq(candidate.as_bytes()).into());

        if !matches {
            return ActivationKeyStatus::Invalid;
        }

        match ctx.policy.activation_key_ttl_minutes {
            Some(ttl) if self.activation_key_expired(ttl) => ActivationKeyStatus::TooOld,
            _ => ActivationKeyStatus::None,
        }
    }

    async fn verify_email(
        &mut self,
        ctx: &IdentityContext,
        require_verified_email: bool,
    ) -> Result<bool, IdentityError> {
        if self.record.email_verified {
            return Ok(true);
        }

        self.record.email_verified = true;
        if require_verified_email && !self.record.is_active {
            self.record.is_active = true;
        }

        let saved = self.persist(ctx, false).await?;
        if saved {
            info!(username = %self.record.username, "Email verified");
        }
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TIMESTAMP_FORMAT;

    #[test]
    fn key_issued_long_ago_is_expired() {
        let mut identity = Identity::new();
        let old = Utc::now().naive_utc() - Duration::minutes(90);
        identity.record.activation_key_on = Some(old.format(TIMESTAMP_FORMAT).to_string());

        assert!(identity.activation_key_expired(60));
        assert!(!identity.activation_key_expired(120));
    }

    #[test]
    fn key_without_issue_time_is_expired() {
        let identity = Identity::new();
        assert!(identity.activation_key_expired(60));
    }
}
