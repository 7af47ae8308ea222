use async_trait::async_trait;
use tracing::info;

use super::{Identity, IdentityContext, IdentityError, PASSWORD_PLACEHOLDER, PasswordHistory};
use crate::domain::now_timestamp;
use crate::store::PasswordHistoryEntry;

#[async_trait]
impl PasswordHistory for Identity {
    async fn password_date(
        &self,
        ctx: &IdentityContext,
        password: Option<&str>,
    ) -> Result<Option<String>, IdentityError> {
        let Some(password) = password else {
            return Ok(self.record.password_set_on.clone());
        };

        if self.verify_password(ctx, password).await {
            return Ok(self.record.password_set_on.clone());
        }

        if self.new_record {
            return Ok(None);
        }

        for entry in ctx.store.password_history(self.record.id).await? {
            if ctx.verify_password(password, &entry.password).await {
                // Rows written before set_on was tracked still prove prior use.
                return Ok(entry.set_on.or(Some(entry.replaced_on)));
            }
        }

        Ok(None)
    }

    async fn reset_password(
        &mut self,
        ctx: &IdentityContext,
        password: &str,
    ) -> Result<bool, IdentityError> {
        let hashed = ctx.hash_password(password).await?;
        let now = now_timestamp();

        let previous = (!self.new_record && has_usable_hash(&self.record.password)).then(|| {
            PasswordHistoryEntry {
                password: self.record.password.clone(),
                set_on: self.record.password_set_on.clone(),
                replaced_on: now.clone(),
            }
        });

        let old_password = std::mem::replace(&mut self.record.password, hashed);
        let old_set_on = self.record.password_set_on.replace(now);

        match self.persist_replacing(ctx, true, previous).await {
            Ok(true) => {}
            unsaved => {
                // Nothing was stored; keep the identity in step with its row
                self.record.password = old_password;
                self.record.password_set_on = old_set_on;
                return unsaved;
            }
        }

        info!(username = %self.record.username, "Password reset");
        Ok(true)
    }
}

fn has_usable_hash(hash: &str) -> bool {
    !hash.is_empty() && hash != PASSWORD_PLACEHOLDER
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_is_not_recorded_as_history() {
        assert!(!has_usable_hash(""));
        assert!(!has_usable_hash(PASSWORD_PLACEHOLDER));
        assert!(has_usable_hash("$argon2id$v=19$m=64,t=1,p=1$c2FsdA$aGFzaA"));
    }
}
