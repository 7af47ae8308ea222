use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use tracing::debug;

use super::password_history::PasswordHistoryRepository;
use crate::entities::{prelude::*, users};
use crate::search::SearchFilter;
use crate::store::{
    FieldError, Lookup, Page, PageRequest, PasswordHistoryEntry, SaveOutcome, StoreError,
};

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn find_one(&self, lookup: Lookup<'_>) -> Result<Option<users::Model>, StoreError> {
        debug!(?lookup, "Looking up user");

        let query = match lookup {
            Lookup::Id(id) => Users::find_by_id(id),
            Lookup::Username(username) => {
                Users::find().filter(users::Column::Username.eq(username))
            }
            Lookup::AccessToken(token) => {
                Users::find().filter(users::Column::AccessToken.eq(token))
            }
        };

        Ok(query.one(&self.conn).await?)
    }

    pub async fn save(
        &self,
        record: &mut users::Model,
        is_new: bool,
        validate: bool,
        replaced: Option<PasswordHistoryEntry>,
    ) -> Result<SaveOutcome, StoreError> {
        if validate {
            let errors = self.validate(record).await?;
            if !errors.is_empty() {
                return Ok(SaveOutcome::Invalid(errors));
            }
        }

        // reset_all marks every column as changed so the full row is written
        let mut active = record.clone().into_active_model().reset_all();

        let txn = self.conn.begin().await?;

        let stored = if is_new {
            active.id = NotSet;
            active.insert(&txn).await?
        } else {
            active.update(&txn).await?
        };

        if let Some(entry) = replaced {
            PasswordHistoryRepository::add(&txn, stored.id, entry).await?;
        }

        txn.commit().await?;
        *record = stored;
        Ok(SaveOutcome::Saved)
    }

    pub async fn find_page(
        &self,
        filter: &SearchFilter,
        page: PageRequest,
    ) -> Result<Page<users::Model>, StoreError> {
        // Requests built without PageRequest::new may carry zeroes
        let page_number = page.page.max(1);
        let page_size = page.page_size.max(1);

        let paginator = Users::find()
            .filter(filter.to_condition())
            .order_by_asc(users::Column::Id)
            .paginate(&self.conn, page_size);

        let totals = paginator.num_items_and_pages().await?;
        let items = paginator.fetch_page(page_number - 1).await?;

        Ok(Page {
            items,
            page: page_number,
            page_size,
            total_items: totals.number_of_items,
            total_pages: totals.number_of_pages,
        })
    }

    /// Normalizes the editable fields in place, then checks the rules that
    /// hold for every stored account.
    async fn validate(&self, record: &mut users::Model) -> Result<Vec<FieldError>, StoreError> {
        record.username = record.username.trim().to_string();
        record.email = record.email.trim().to_string();
        record.firstname = trimmed_or_none(record.firstname.take());
        record.lastname = trimmed_or_none(record.lastname.take());

        let mut errors = Vec::new();

        if record.username.is_empty() {
            errors.push(FieldError::new("username", "Username cannot be blank."));
        } else if self
            .is_taken(users::Column::Username, &record.username, record.id)
            .await?
        {
            errors.push(FieldError::new(
                "username",
                format!("Username \"{}\" has already been taken.", record.username),
            ));
        }

        if record.email.is_empty() {
            errors.push(FieldError::new("email", "Email cannot be blank."));
        } else if self
            .is_taken(users::Column::Email, &record.email, record.id)
            .await?
        {
            errors.push(FieldError::new(
                "email",
                format!("Email \"{}\" has already been taken.", record.email),
            ));
        }

        Ok(errors)
    }

    async fn is_taken(
        &self,
        column: users::Column,
        value: &str,
        own_id: i32,
    ) -> Result<bool, StoreError> {
        let count = Users::find()
            .filter(column.eq(value))
            .filter(users::Column::Id.ne(own_id))
            .count(&self.conn)
            .await?;

        Ok(count > 0)
    }
}

fn trimmed_or_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
