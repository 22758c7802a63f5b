//! User store contract.
//!
//! The engine and the notification dispatcher look users up by account name
//! to resolve display names and push credentials. One production (Postgres)
//! implementation, one in-memory implementation for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;

use crate::domains::users::models::user::User;

#[async_trait]
pub trait BaseUserStore: Send + Sync {
    async fn find_by_account(&self, account: &str) -> Result<Option<User>>;
}

/// Postgres-backed user store
pub struct SqlUserStore {
    pool: PgPool,
}

impl SqlUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BaseUserStore for SqlUserStore {
    async fn find_by_account(&self, account: &str) -> Result<Option<User>> {
        User::find_by_account(account, &self.pool).await
    }
}

/// In-memory user store for tests
#[derive(Default)]
pub struct InMemoryUserStore {
    users: Mutex<HashMap<String, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, user: User) {
        self.users.lock().unwrap().insert(user.account.clone(), user);
    }
}

#[async_trait]
impl BaseUserStore for InMemoryUserStore {
    async fn find_by_account(&self, account: &str) -> Result<Option<User>> {
        Ok(self.users.lock().unwrap().get(account).cloned())
    }
}
