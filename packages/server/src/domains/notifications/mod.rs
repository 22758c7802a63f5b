pub mod dispatcher;
pub mod messages;

pub use dispatcher::NotificationDispatcher;
pub use messages::{Currency, PushMessage};
