use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::entities::{password_history, prelude::*};
use crate::store::{PasswordHistoryEntry, StoreError};

/// Repository for hashes replaced by password resets
pub struct PasswordHistoryRepository {
    conn: DatabaseConnection,
}

impl PasswordHistoryRepository {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Runs on `db` so the insert can join a caller's transaction.
    pub async fn add<C: ConnectionTrait>(
        db: &C,
        user_id: i32,
        entry: PasswordHistoryEntry,
    ) -> Result<(), StoreError> {
        let active_model = password_history::ActiveModel {
            user_id: Set(user_id),
            password: Set(entry.password),
            set_on: Set(entry.set_on),
            replaced_on: Set(entry.replaced_on),
            ..Default::default()
        };

        PasswordHistory::insert(active_model).exec(db).await?;
        Ok(())
    }

    pub async fn list_for_user(&self, user_id: i32) -> Result<Vec<PasswordHistoryEntry>, StoreError> {
        let rows = PasswordHistory::find()
            .filter(password_history::Column::UserId.eq(user_id))
            .order_by_desc(password_history::Column::Id)
            .all(&self.conn)
            .await?;

        Ok(rows
            .into_iter()
            .map(|r| PasswordHistoryEntry {
                password: r.password,
                set_on: r.set_on,
                replaced_on: r.replaced_on,
            })
            .collect())
    }
}
