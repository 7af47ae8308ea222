pub use super::password_history::Entity as PasswordHistory;
pub use super::users::Entity as Users;
