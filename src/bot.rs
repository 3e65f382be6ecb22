//! Event dispatch for the bot process.

use crate::db::Db;
use crate::directory::{UserDirectory, UserStore};
use crate::events::{ActionEvent, BotEvent, MessageEvent};
use crate::messaging::{InboundStream, Messaging};
use crate::notify::Notifier;
use crate::report::ReportFlow;
use crate::report::form::{CHECK_ACCOUNT_ACTION, START_REPORT_ACTION};
use crate::report::messages;
use crate::responses::ResponseStore;

use futures::StreamExt as _;
use std::sync::Arc;
use tokio::sync::watch;

/// Message subtype Slack uses for uploads; still answered.
const FILE_SHARE_SUBTYPE: &str = "file_share";

/// A plain-text command typed to the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Help,
    Account,
    Report,
    /// Anything unrecognised.
    Menu,
}

impl Command {
    pub fn parse(text: &str) -> Self {
        match text.trim().to_lowercase().as_str() {
            "help" | "?" => Command::Help,
            "account" => Command::Account,
            "report" => Command::Report,
            _ => Command::Menu,
        }
    }
}

pub struct Bot<M> {
    messaging: Arc<M>,
    bot_user_id: String,
    flow: ReportFlow<M>,
    directory: UserDirectory<M>,
    notifier: Notifier<M, UserStore>,
}

impl<M: Messaging> Bot<M> {
    /// Wire the components together. Looks up the bot's own user id.
    pub async fn new(messaging: Arc<M>, db: Db) -> crate::Result<Self> {
        let bot_user_id = messaging.bot_user_id().await?;
        let users = UserStore::new(db.clone());

        Ok(Self {
            flow: ReportFlow::new(messaging.clone(), ResponseStore::new(db)),
            directory: UserDirectory::new(messaging.clone(), users.clone()),
            notifier: Notifier::new(messaging.clone(), users, bot_user_id.clone()),
            messaging,
            bot_user_id,
        })
    }

    pub fn bot_user_id(&self) -> &str {
        &self.bot_user_id
    }

    /// Mirror the directory and optionally welcome everyone in it.
    pub async fn bootstrap(&self, welcome_on_start: bool) {
        match self.directory.refresh().await {
            Ok(user_ids) if welcome_on_start => {
                self.notifier.send_welcome(&user_ids).await;
            }
            Ok(_) => {}
            Err(error) => tracing::error!(%error, "initial directory refresh failed"),
        }
    }

    /// Handle events one at a time until the stream ends or shutdown is signalled.
    pub async fn run(&self, mut events: InboundStream, mut shutdown_rx: watch::Receiver<bool>) {
        tracing::info!(adapter = self.messaging.name(), "bot event loop started");
        loop {
            tokio::select! {
                event = events.next() => match event {
                    Some(event) => self.handle_event(event).await,
                    None => {
                        tracing::warn!("inbound event stream closed");
                        break;
                    }
                },
                _ = shutdown_rx.changed() => {
                    tracing::info!("bot event loop stopping");
                    break;
                }
            }
        }
    }

    pub async fn handle_event(&self, event: BotEvent) {
        match event {
            BotEvent::Message(message) => self.handle_message(message).await,
            BotEvent::Action(action) => self.handle_action(action).await,
            BotEvent::FormSubmitted(submission) => {
                self.flow.submit_report(&submission).await;
            }
            BotEvent::TeamJoin(join) => {
                tracing::info!(user_id = %join.user_id, "new workspace member");
                match self.directory.refresh().await {
                    Ok(_) => {
                        self.notifier.send_welcome(&[join.user_id]).await;
                    }
                    Err(error) => {
                        tracing::error!(%error, "directory refresh after team_join failed");
                    }
                }
            }
        }
    }

    async fn handle_message(&self, message: MessageEvent) {
        let plain_or_upload = message
            .subtype
            .as_deref()
            .is_none_or(|subtype| subtype == FILE_SHARE_SUBTYPE);
        if !plain_or_upload || message.bot_id.is_some() {
            return;
        }
        let Some(user_id) = message.user_id.as_deref() else {
            return;
        };
        if user_id == self.bot_user_id {
            return;
        }

        let channel_id = message.channel_id.as_str();
        if message.file_count > 0 {
            self.reply(channel_id, messages::files_unsupported()).await;
            return;
        }

        let command = Command::parse(&message.text);
        tracing::debug!(user_id, channel_id, ?command, "text command");
        match command {
            Command::Help => self.reply(channel_id, messages::help()).await,
            Command::Account => self.flow.show_account(user_id, channel_id).await,
            Command::Report => {
                self.flow.start_report(user_id, channel_id).await;
            }
            Command::Menu => self.reply(channel_id, messages::welcome()).await,
        }
    }

    async fn handle_action(&self, action: ActionEvent) {
        match action.action_id.as_str() {
            START_REPORT_ACTION => {
                self.flow
                    .start_report(&action.user_id, &action.channel_id)
                    .await;
            }
            CHECK_ACCOUNT_ACTION => {
                self.flow
                    .show_account(&action.user_id, &action.channel_id)
                    .await;
            }
            // Selects and checkboxes inside the form fire their own actions.
            other => tracing::trace!(action_id = other, "ignoring action"),
        }
    }

    async fn reply(&self, channel_id: &str, response: crate::OutboundResponse) {
        if let Err(error) = self.messaging.post_message(channel_id, response).await {
            tracing::warn!(%error, channel_id, "failed to post reply");
        }
    }
}
