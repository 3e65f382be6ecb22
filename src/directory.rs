//! Workspace user directory, mirrored into the `users` table.

use crate::DirectoryUser;
use crate::db::{Db, QueryMode, QueryOutcome, SqlParam};
use crate::messaging::Messaging;
use crate::notify::ActiveUsers;

use std::collections::HashSet;
use std::sync::Arc;

/// `users` table access.
#[derive(Debug, Clone)]
pub struct UserStore {
    db: Db,
}

impl UserStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Insert or refresh one directory member. Deleted members are stored as inactive.
    pub async fn upsert(&self, user: &DirectoryUser, updated_at: i64) -> QueryOutcome {
        let status = if user.deleted { "inactive" } else { "active" };
        self.db
            .run(
                "INSERT INTO users (id, username, real_name, email, status, is_bot, updated_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?) \
                 ON CONFLICT(id) DO UPDATE SET \
                   username = excluded.username, \
                   real_name = excluded.real_name, \
                   email = excluded.email, \
                   status = excluded.status, \
                   is_bot = excluded.is_bot, \
                   updated_at = excluded.updated_at",
                &[
                    user.id.as_str().into(),
                    user.username.clone().into(),
                    user.real_name.clone().into(),
                    user.email.clone().into(),
                    status.into(),
                    SqlParam::Bool(user.is_bot),
                    SqlParam::Int(updated_at),
                ],
                QueryMode::Mutate,
            )
            .await
    }
}

impl ActiveUsers for UserStore {
    async fn active_user_ids(&self) -> crate::Result<HashSet<String>> {
        let outcome = self
            .db
            .run(
                "SELECT id FROM users WHERE status = 'active' AND is_bot = 0",
                &[],
                QueryMode::FetchAll,
            )
            .await;

        if let QueryOutcome::Failed(message) = outcome {
            return Err(anyhow::anyhow!("active user lookup failed: {message}").into());
        }

        Ok(outcome
            .into_records()
            .into_iter()
            .filter_map(|record| record.get("id")?.as_str().map(str::to_string))
            .collect())
    }
}

/// Keeps the `users` table in step with the platform directory.
pub struct UserDirectory<M> {
    messaging: Arc<M>,
    store: UserStore,
}

impl<M: Messaging> UserDirectory<M> {
    pub fn new(messaging: Arc<M>, store: UserStore) -> Self {
        Self { messaging, store }
    }

    /// Re-read the directory, upsert every member, and return the non-deleted ids.
    pub async fn refresh(&self) -> crate::Result<Vec<String>> {
        let users = self.messaging.list_users().await?;
        let now = chrono::Utc::now().timestamp();

        let mut ids = Vec::with_capacity(users.len());
        for user in &users {
            if self.store.upsert(user, now).await.is_failed() {
                tracing::warn!(user_id = %user.id, "failed to store directory user");
            }
            if !user.deleted {
                ids.push(user.id.clone());
            }
        }

        tracing::info!(
            listed = users.len(),
            stored = ids.len(),
            "user directory refreshed"
        );
        Ok(ids)
    }
}
