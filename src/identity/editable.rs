use async_trait::async_trait;
use std::collections::BTreeMap;
use tracing::info;

use super::{EditableIdentity, Identity, IdentityContext, IdentityError, PASSWORD_PLACEHOLDER};

/// Profile form names (note the capital N) to `users` columns.
const IDENTITY_ATTRIBUTES: [(&str, &str); 4] = [
    ("username", "username"),
    ("email", "email"),
    ("firstName", "firstname"),
    ("lastName", "lastname"),
];

impl Identity {
    fn column_value(&self, column: &str) -> Option<&str> {
        match column {
            "username" => Some(self.record.username.as_str()),
            "email" => Some(self.record.email.as_str()),
            "firstname" => self.record.firstname.as_deref(),
            "lastname" => self.record.lastname.as_deref(),
            _ => None,
        }
    }

    fn set_column(&mut self, column: &str, value: &str) {
        match column {
            "username" => self.record.username = value.to_string(),
            "email" => self.record.email = value.to_string(),
            "firstname" => self.record.firstname = Some(value.to_string()),
            "lastname" => self.record.lastname = Some(value.to_string()),
            _ => {}
        }
    }

    fn email_changed(&self) -> bool {
        self.stored_email.as_deref() != Some(self.record.email.as_str())
    }
}

#[async_trait]
impl EditableIdentity for Identity {
    fn identity_attributes_map(&self) -> &'static [(&'static str, &'static str)] {
        &IDENTITY_ATTRIBUTES
    }

    fn set_identity_attributes(&mut self, attributes: &BTreeMap<String, String>) {
        for (name, column) in IDENTITY_ATTRIBUTES {
            if let Some(value) = attributes.get(name) {
                self.set_column(column, value);
            }
        }
    }

    fn identity_attributes(&self) -> BTreeMap<String, String> {
        IDENTITY_ATTRIBUTES
            .iter()
            .filter_map(|(name, column)| {
                self.column_value(column)
                    .map(|value| ((*name).to_string(), value.to_string()))
            })
            .collect()
    }

    async fn save_identity(
        &mut self,
        ctx: &IdentityContext,
        require_verified_email: bool,
    ) -> Result<bool, IdentityError> {
        if self.new_record {
            self.record.password = PASSWORD_PLACEHOLDER.to_string();
            self.record.is_active = !require_verified_email;
            self.record.is_disabled = false;
            self.record.email_verified = false;
        } else if ctx.policy.reverify_on_email_change && self.email_changed() {
            self.record.email_verified = false;
            if require_verified_email {
                self.record.is_active = false;
            }
        }

        let is_new = self.new_record;
        let saved = self.persist(ctx, true).await?;
        if saved && is_new {
            info!(username = %self.record.username, "Registered new user");
        }

        Ok(saved)
    }
}
