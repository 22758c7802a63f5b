// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// Business logic (like "advance to the next candidate") lives in domain
// code that uses these traits.
//
// Naming convention: Base* for trait names (e.g., BasePushNotificationService)

use anyhow::Result;
use async_trait::async_trait;

use crate::common::utils::ExpoClient;

// =============================================================================
// Push Notification Trait (Infrastructure)
// =============================================================================

#[async_trait]
pub trait BasePushNotificationService: Send + Sync {
    /// Send a push notification to a push token
    async fn send_notification(
        &self,
        push_token: &str,
        title: &str,
        body: &str,
        data: serde_json::Value,
    ) -> Result<()>;
}

#[async_trait]
impl BasePushNotificationService for ExpoClient {
    async fn send_notification(
        &self,
        push_token: &str,
        title: &str,
        body: &str,
        data: serde_json::Value,
    ) -> Result<()> {
        ExpoClient::send_notification(self, push_token, title, body, data).await
    }
}
