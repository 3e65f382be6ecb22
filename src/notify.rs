//! Welcome notifications.

use crate::messaging::Messaging;
use crate::report::messages;

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

/// Source of the user ids that may receive notifications.
pub trait ActiveUsers: Send + Sync {
    /// Ids of active, non-bot users. An error means nobody counts as active.
    fn active_user_ids(&self) -> impl Future<Output = crate::Result<HashSet<String>>> + Send;
}

/// Sends the welcome message to users.
pub struct Notifier<M, A> {
    messaging: Arc<M>,
    active_users: A,
    bot_user_id: String,
}

impl<M: Messaging, A: ActiveUsers> Notifier<M, A> {
    pub fn new(messaging: Arc<M>, active_users: A, bot_user_id: impl Into<String>) -> Self {
        Self {
            messaging,
            active_users,
            bot_user_id: bot_user_id.into(),
        }
    }

    /// Send the welcome to every listed user that is active and isn't the bot.
    ///
    /// Returns how many welcomes were delivered.
    pub async fn send_welcome(&self, user_ids: &[String]) -> usize {
        let active = match self.active_users.active_user_ids().await {
            Ok(active) => active,
            Err(error) => {
                tracing::error!(%error, "failed to load active users, skipping welcomes");
                return 0;
            }
        };

        let mut sent = 0;
        for user_id in user_ids {
            if *user_id == self.bot_user_id || !active.contains(user_id) {
                continue;
            }
            match self
                .messaging
                .send_direct_message(user_id, messages::welcome())
                .await
            {
                Ok(()) => sent += 1,
                Err(error) => {
                    tracing::warn!(%error, user_id = %user_id, "failed to send welcome");
                }
            }
        }

        tracing::info!(sent, requested = user_ids.len(), "welcome messages sent");
        sent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::fake::{FAKE_BOT_ID, FakeMessaging};

    struct Fixed(Vec<&'static str>);

    impl ActiveUsers for Fixed {
        async fn active_user_ids(&self) -> crate::Result<HashSet<String>> {
            Ok(self.0.iter().map(|id| id.to_string()).collect())
        }
    }

    struct Broken;

    impl ActiveUsers for Broken {
        async fn active_user_ids(&self) -> crate::Result<HashSet<String>> {
            Err(anyhow::anyhow!("db down").into())
        }
    }

    fn ids(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    #[tokio::test]
    async fn never_welcomes_the_bot_itself() {
        let messaging = Arc::new(FakeMessaging::default());
        // Even if the bot slipped into the active set.
        let notifier = Notifier::new(
            messaging.clone(),
            Fixed(vec!["U1", FAKE_BOT_ID]),
            FAKE_BOT_ID,
        );

        let sent = notifier.send_welcome(&ids(&["U1", FAKE_BOT_ID])).await;

        assert_eq!(sent, 1);
        assert_eq!(messaging.direct_recipients(), vec!["U1".to_string()]);
    }

    #[tokio::test]
    async fn skips_inactive_users_and_survives_send_errors() {
        let messaging = Arc::new(FakeMessaging {
            fail_direct_to: vec!["U2".into()],
            ..Default::default()
        });
        let notifier = Notifier::new(
            messaging.clone(),
            Fixed(vec!["U1", "U2", "U3"]),
            FAKE_BOT_ID,
        );

        let sent = notifier
            .send_welcome(&ids(&["U1", "U2", "U3", "U_GONE"]))
            .await;

        assert_eq!(sent, 2);
        assert_eq!(messaging.direct_recipients(), ids(&["U1", "U3"]));
    }

    #[tokio::test]
    async fn sends_nothing_when_the_active_set_is_unavailable() {
        let messaging = Arc::new(FakeMessaging::default());
        let notifier = Notifier::new(messaging.clone(), Broken, FAKE_BOT_ID);

        assert_eq!(notifier.send_welcome(&ids(&["U1"])).await, 0);
        assert!(messaging.calls().is_empty());
    }
}
