pub mod models;
pub mod store;

pub use models::user::User;
pub use store::{BaseUserStore, InMemoryUserStore, SqlUserStore};
