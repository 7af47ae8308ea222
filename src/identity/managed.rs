use async_trait::async_trait;
use std::collections::BTreeMap;
use tracing::info;

use super::{
    Identity, IdentityContext, IdentityError, ManagedIdentity, TIMESTAMP_KEYS, Timestamps,
};
use crate::domain::StatusKind;
use crate::search::SearchFilter;
use crate::store::{Page, PageRequest};

impl Identity {
    fn timestamp_value(&self, key: &str) -> Option<Option<String>> {
        let value = match key {
            "createdOn" => Some(self.record.created_on.clone()).filter(|v| !v.is_empty()),
            "updatedOn" => self.record.updated_on.clone(),
            "lastVisitOn" => self.record.last_visit_on.clone(),
            "passwordSetOn" => self.record.password_set_on.clone(),
            _ => return None,
        };
        Some(value)
    }
}

#[async_trait]
impl ManagedIdentity for Identity {
    async fn filtered_page(
        ctx: &IdentityContext,
        filter: &SearchFilter,
        page: PageRequest,
    ) -> Result<Page<Self>, IdentityError> {
        let page = ctx.store.find_page(filter, page).await?;
        Ok(page.map(Self::from_model))
    }

    async fn toggle_status(
        &mut self,
        ctx: &IdentityContext,
        status: StatusKind,
    ) -> Result<bool, IdentityError> {
        let flag = match status {
            StatusKind::EmailVerified => &mut self.record.email_verified,
            StatusKind::IsActive => &mut self.record.is_active,
            StatusKind::IsDisabled => &mut self.record.is_disabled,
        };
        *flag = !*flag;
        let value = *flag;

        let saved = self.persist(ctx, false).await?;
        if saved {
            info!(username = %self.record.username, ?status, value, "Toggled account status");
        }
        Ok(saved)
    }

    fn timestamps(&self, key: Option<&str>) -> Timestamps {
        if let Some(value) = key.and_then(|k| self.timestamp_value(k)) {
            return Timestamps::Single(value);
        }

        let all: BTreeMap<_, _> = TIMESTAMP_KEYS
            .iter()
            .map(|k| (*k, self.timestamp_value(k).flatten()))
            .collect();
        Timestamps::All(all)
    }
}
