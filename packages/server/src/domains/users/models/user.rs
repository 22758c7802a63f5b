use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

/// User model - SQL persistence layer
///
/// Account-name keyed: passengers and drivers are both rows here. The
/// dispatch engine only ever reads display names, phone numbers and push
/// credentials; registration and profile management live elsewhere.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct User {
    pub account: String,
    pub display_name: String,
    pub phone: String,

    /// Expo push token; a user without one simply receives no pushes
    pub expo_push_token: Option<String>,

    pub role: String, // "passenger" | "driver"
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Find user by account name
    pub async fn find_by_account(account: &str, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM users WHERE account = $1")
            .bind(account)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    /// Insert new user
    pub async fn insert(&self, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            "INSERT INTO users (account, display_name, phone, expo_push_token, role)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING *",
        )
        .bind(&self.account)
        .bind(&self.display_name)
        .bind(&self.phone)
        .bind(&self.expo_push_token)
        .bind(&self.role)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    /// Update push credential (app re-registers its token on login)
    pub async fn update_push_token(
        account: &str,
        token: Option<&str>,
        pool: &PgPool,
    ) -> Result<()> {
        sqlx::query("UPDATE users SET expo_push_token = $2 WHERE account = $1")
            .bind(account)
            .bind(token)
            .execute(pool)
            .await?;

        Ok(())
    }
}
