pub mod prelude;

pub mod password_history;
pub mod users;
