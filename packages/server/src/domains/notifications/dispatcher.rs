//! Notification dispatcher.
//!
//! Resolves a recipient account to a push credential and hands the typed
//! message to the push transport. A recipient without a credential is not a
//! failure: the warning is recorded and the caller proceeds. Transport
//! errors are surfaced to the caller; the dispatch engine logs them and
//! leaves state untouched (the offer timer advances past an unreachable
//! driver).

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, warn};

use crate::domains::notifications::messages::PushMessage;
use crate::domains::users::BaseUserStore;
use crate::kernel::BasePushNotificationService;

#[derive(Clone)]
pub struct NotificationDispatcher {
    users: Arc<dyn BaseUserStore>,
    push: Arc<dyn BasePushNotificationService>,
}

impl NotificationDispatcher {
    pub fn new(
        users: Arc<dyn BaseUserStore>,
        push: Arc<dyn BasePushNotificationService>,
    ) -> Self {
        Self { users, push }
    }

    /// Send a typed push message to a user account
    pub async fn send(&self, account: &str, message: PushMessage) -> Result<()> {
        let user = match self.users.find_by_account(account).await? {
            Some(user) => user,
            None => {
                warn!(account = %account, kind = message.kind(), "push recipient unknown, skipping");
                return Ok(());
            }
        };

        let token = match user.expo_push_token {
            Some(token) => token,
            None => {
                warn!(account = %account, kind = message.kind(), "push recipient has no credential, skipping");
                return Ok(());
            }
        };

        debug!(account = %account, kind = message.kind(), "sending push");

        self.push
            .send_notification(&token, &message.title(), &message.body(), message.data())
            .await
    }
}
