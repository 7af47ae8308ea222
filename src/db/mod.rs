use anyhow::Result;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::entities::users;
use crate::search::SearchFilter;
use crate::store::{
    CredentialStore, Lookup, Page, PageRequest, PasswordHistoryEntry, SaveOutcome, StoreError,
};

pub mod migrator;
pub mod repositories;

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn password_history_repo(&self) -> repositories::password_history::PasswordHistoryRepository {
        repositories::password_history::PasswordHistoryRepository::new(self.conn.clone())
    }
}

#[async_trait::async_trait]
impl CredentialStore for Store {
    async fn find_one(&self, lookup: Lookup<'_>) -> Result<Option<users::Model>, StoreError> {
        self.user_repo().find_one(lookup).await
    }

    async fn save(
        &self,
        record: &mut users::Model,
        is_new: bool,
        validate: bool,
        replaced: Option<PasswordHistoryEntry>,
    ) -> Result<SaveOutcome, StoreError> {
        self.user_repo().save(record, is_new, validate, replaced).await
    }

    async fn find_page(
        &self,
        filter: &SearchFilter,
        page: PageRequest,
    ) -> Result<Page<users::Model>, StoreError> {
        self.user_repo().find_page(filter, page).await
    }

    async fn password_history(
        &self,
        user_id: i32,
    ) -> Result<Vec<PasswordHistoryEntry>, StoreError> {
        self.password_history_repo().list_for_user(user_id).await
    }
}
