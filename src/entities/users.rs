use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, Default, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub username: String,

    /// Argon2id password hash, or a placeholder that never verifies
    pub password: String,

    #[sea_orm(unique)]
    pub email: String,

    pub firstname: Option<String>,

    pub lastname: Option<String>,

    /// Remember-me / session validation secret, assigned on first insert
    pub auth_key: Option<String>,

    pub access_token: Option<String>,

    /// Only the most recently issued key is stored
    pub activation_key: Option<String>,

    pub activation_key_on: Option<String>,

    pub created_on: String,

    pub updated_on: Option<String>,

    pub last_visit_on: Option<String>,

    pub password_set_on: Option<String>,

    pub email_verified: bool,

    pub is_active: bool,

    pub is_disabled: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::password_history::Entity")]
    PasswordHistory,
}

impl Related<super::password_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PasswordHistory.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
