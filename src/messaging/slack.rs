//! Slack messaging adapter using slack-morphism.
//!
//! **Inbound** (Socket Mode)
//! - `message` and `team_join` push events
//! - `block_actions` interactions, including the report form's submit button
//!
//! Every payload is serialised back to its wire JSON and decoded by
//! [`crate::events`], so handlers only ever see typed [`BotEvent`]s.
//!
//! **Outbound**
//! - Plain text and Block Kit messages (`chat.postMessage`)
//! - DMs via `conversations.open`
//! - Private report channels (`conversations.create`, `conversations.invite`)
//! - Directory listing (`users.list`)

use crate::config::SlackConfig;
use crate::events::{self, BotEvent};
use crate::messaging::traits::{InboundStream, Messaging};
use crate::{DirectoryUser, OutboundResponse};

use anyhow::Context as _;
use slack_morphism::prelude::*;
use std::sync::Arc;
use tokio::sync::{OnceCell, RwLock, mpsc};

/// Slack rejects `text` fields longer than this.
const MAX_TEXT_LEN: usize = 12_000;

/// State shared with socket mode callbacks via `SlackClientEventsUserState`.
struct SlackAdapterState {
    inbound_tx: mpsc::Sender<BotEvent>,
}

/// Slack adapter.
pub struct SlackAdapter {
    app_token: String,
    /// Shared HTTP client for REST calls, reused so its connection pool survives.
    client: Arc<SlackHyperClient>,
    /// Pre-built API token wrapping the bot token.
    token: SlackApiToken,
    bot_user_id: OnceCell<String>,
    shutdown_tx: Arc<RwLock<Option<mpsc::Sender<()>>>>,
}

impl SlackAdapter {
    pub fn new(config: &SlackConfig) -> anyhow::Result<Self> {
        let client = Arc::new(SlackClient::new(
            SlackClientHyperConnector::new().context("failed to create slack HTTP connector")?,
        ));
        let token = SlackApiToken::new(SlackApiTokenValue(config.bot_token.clone()));
        Ok(Self {
            app_token: config.app_token.clone(),
            client,
            token,
            bot_user_id: OnceCell::new(),
            shutdown_tx: Arc::new(RwLock::new(None)),
        })
    }

    /// Open a session against the cached client using the cached bot token.
    fn session(&self) -> SlackClientSession<'_, SlackClientHyperHttpsConnector> {
        self.client.open_session(&self.token)
    }

    async fn open_dm(&self, user_id: &str) -> anyhow::Result<SlackChannelId> {
        let request = SlackApiConversationsOpenRequest::new()
            .with_users(vec![SlackUserId(user_id.to_string())]);
        let response = self
            .session()
            .conversations_open(&request)
            .await
            .context("failed to open Slack DM conversation")?;
        Ok(response.channel.id)
    }

    async fn post(&self, channel_id: SlackChannelId, response: OutboundResponse) -> anyhow::Result<()> {
        let session = self.session();
        match response {
            OutboundResponse::Text(text) => {
                for chunk in split_message(&text, MAX_TEXT_LEN) {
                    let request = SlackApiChatPostMessageRequest::new(
                        channel_id.clone(),
                        SlackMessageContent::new().with_text(chunk),
                    );
                    session
                        .chat_post_message(&request)
                        .await
                        .context("failed to send slack message")?;
                }
            }
            OutboundResponse::RichMessage { text, blocks } => {
                let slack_blocks = deserialize_blocks(&blocks);
                let content = if slack_blocks.is_empty() {
                    SlackMessageContent::new().with_text(text)
                } else {
                    SlackMessageContent::new()
                        .with_text(text)
                        .with_blocks(slack_blocks)
                };
                let request = SlackApiChatPostMessageRequest::new(channel_id, content);
                session
                    .chat_post_message(&request)
                    .await
                    .context("failed to send slack rich message")?;
            }
        }
        Ok(())
    }
}

// Socket Mode callbacks. slack-morphism takes plain fn pointers, so the
// event sender reaches them through the listener's user state.

async fn adapter_state(states: &SlackClientEventsUserState) -> Option<Arc<SlackAdapterState>> {
    let state_guard = states.read().await;
    let state = state_guard.get_user_state::<Arc<SlackAdapterState>>().cloned();
    if state.is_none() {
        tracing::error!("slack listener is missing its adapter state");
    }
    state
}

async fn handle_push_event(
    event: SlackPushEventCallback,
    _client: Arc<SlackHyperClient>,
    states: SlackClientEventsUserState,
) -> UserCallbackResult<()> {
    let payload = match serde_json::to_value(&event.event) {
        Ok(payload) => payload,
        Err(error) => {
            tracing::warn!(%error, "failed to re-encode slack push event");
            return Ok(());
        }
    };

    let decoded = match payload.get("type").and_then(|kind| kind.as_str()) {
        Some("message") => events::decode_message(&payload).map(BotEvent::Message),
        Some("team_join") => events::decode_team_join(&payload).map(BotEvent::TeamJoin),
        other => {
            tracing::trace!(event_type = ?other, "ignoring slack push event");
            None
        }
    };

    if let Some(event) = decoded
        && let Some(state) = adapter_state(&states).await
    {
        send_inbound(&state.inbound_tx, event).await;
    }
    Ok(())
}

async fn handle_interaction_event(
    event: SlackInteractionEvent,
    _client: Arc<SlackHyperClient>,
    states: SlackClientEventsUserState,
) -> UserCallbackResult<()> {
    let SlackInteractionEvent::BlockActions(block_actions) = event else {
        tracing::debug!("received non-block-action interaction event, ignoring");
        return Ok(());
    };

    let payload = match serde_json::to_value(&block_actions) {
        Ok(payload) => payload,
        Err(error) => {
            tracing::warn!(%error, "failed to re-encode slack block_actions");
            return Ok(());
        }
    };

    let decoded = events::decode_block_actions(&payload);
    if decoded.is_empty() {
        tracing::debug!("block_actions interaction had no actions, ignoring");
        return Ok(());
    }

    let Some(state) = adapter_state(&states).await else {
        return Ok(());
    };
    for event in decoded {
        send_inbound(&state.inbound_tx, event).await;
    }
    Ok(())
}

fn slack_error_handler(
    err: Box<dyn std::error::Error + Send + Sync>,
    _client: Arc<SlackHyperClient>,
    _states: SlackClientEventsUserState,
) -> HttpStatusCode {
    tracing::warn!(error = %err, "slack socket mode error");
    HttpStatusCode::OK
}

async fn send_inbound(tx: &mpsc::Sender<BotEvent>, event: BotEvent) {
    if let Err(error) = tx.send(event).await {
        tracing::warn!(%error, "failed to enqueue slack event");
    }
}

/// Connect with the app token and pump events until Slack closes the socket
/// or [`Messaging::shutdown`] fires.
async fn run_socket_mode(
    listener: SlackClientSocketModeListener<SlackClientHyperHttpsConnector>,
    app_token: SlackApiToken,
    mut shutdown_rx: mpsc::Receiver<()>,
) {
    if let Err(error) = listener.listen_for(&app_token).await {
        tracing::error!(%error, "report bot could not open a socket mode connection");
        return;
    }
    tracing::info!("report bot listening for slack events");

    tokio::select! {
        exit_code = listener.serve() => {
            tracing::info!(exit_code, "slack closed the socket mode connection");
        }
        _ = shutdown_rx.recv() => {
            listener.shutdown().await;
            tracing::info!("socket mode connection closed for shutdown");
        }
    }
}

impl Messaging for SlackAdapter {
    fn name(&self) -> &str {
        "slack"
    }

    async fn start(&self) -> crate::Result<InboundStream> {
        let (inbound_tx, inbound_rx) = mpsc::channel(256);
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);

        *self.shutdown_tx.write().await = Some(shutdown_tx);

        let adapter_state = Arc::new(SlackAdapterState { inbound_tx });

        let callbacks = SlackSocketModeListenerCallbacks::new()
            .with_push_events(handle_push_event)
            .with_interaction_events(handle_interaction_event);

        // Socket Mode gets its own client; `self.client` serves the REST calls.
        let listener_client = Arc::new(SlackClient::new(
            SlackClientHyperConnector::new()
                .context("failed to create slack socket mode connector")?,
        ));

        let listener_environment = Arc::new(
            SlackClientEventsListenerEnvironment::new(listener_client)
                .with_error_handler(slack_error_handler)
                .with_user_state(adapter_state),
        );

        let listener = SlackClientSocketModeListener::new(
            &SlackClientSocketModeConfig::new(),
            listener_environment,
            callbacks,
        );

        let app_token = SlackApiToken::new(SlackApiTokenValue(self.app_token.clone()));
        tokio::spawn(run_socket_mode(listener, app_token, shutdown_rx));

        Ok(Box::pin(tokio_stream::wrappers::ReceiverStream::new(
            inbound_rx,
        )))
    }

    async fn bot_user_id(&self) -> crate::Result<String> {
        let bot_user_id = self
            .bot_user_id
            .get_or_try_init(|| async {
                let auth_response = self
                    .session()
                    .auth_test()
                    .await
                    .context("failed to call auth.test for bot user ID")?;
                let bot_user_id = auth_response.user_id.0;
                tracing::info!(bot_user_id = %bot_user_id, "slack bot user ID resolved");
                anyhow::Ok(bot_user_id)
            })
            .await?;
        Ok(bot_user_id.clone())
    }

    async fn post_message(&self, channel_id: &str, response: OutboundResponse) -> crate::Result<()> {
        self.post(SlackChannelId(channel_id.to_string()), response)
            .await?;
        Ok(())
    }

    async fn send_direct_message(
        &self,
        user_id: &str,
        response: OutboundResponse,
    ) -> crate::Result<()> {
        let channel_id = self.open_dm(user_id).await?;
        self.post(channel_id, response).await?;
        Ok(())
    }

    async fn create_private_channel(&self, name: &str) -> crate::Result<String> {
        let request =
            SlackApiConversationsCreateRequest::new(name.to_string()).with_is_private(true);
        let response = self
            .session()
            .conversations_create(&request)
            .await
            .with_context(|| format!("failed to create slack channel {name}"))?;
        let channel_id = response.channel.id.0;
        tracing::debug!(channel_id = %channel_id, name, "slack private channel created");
        Ok(channel_id)
    }

    async fn invite_to_channel(&self, channel_id: &str, user_ids: &[String]) -> crate::Result<()> {
        let request = SlackApiConversationsInviteRequest::new(
            SlackChannelId(channel_id.to_string()),
            user_ids.iter().cloned().map(SlackUserId).collect(),
        );
        self.session()
            .conversations_invite(&request)
            .await
            .with_context(|| format!("failed to invite users to slack channel {channel_id}"))?;
        Ok(())
    }

    async fn list_users(&self) -> crate::Result<Vec<DirectoryUser>> {
        let response = self
            .session()
            .users_list(&SlackApiUsersListRequest::new())
            .await
            .context("failed to list slack users")?;

        let users: Vec<DirectoryUser> = response
            .members
            .iter()
            .filter_map(|member| {
                serde_json::to_value(member)
                    .ok()
                    .and_then(|payload| events::decode_directory_user(&payload))
            })
            .collect();

        tracing::debug!(
            members = response.members.len(),
            decoded = users.len(),
            "fetched slack user directory"
        );
        Ok(users)
    }

    async fn health_check(&self) -> crate::Result<()> {
        self.session()
            .api_test(&SlackApiTestRequest::new())
            .await
            .context("slack health check failed")?;
        Ok(())
    }

    async fn shutdown(&self) -> crate::Result<()> {
        if let Some(tx) = self.shutdown_tx.write().await.take() {
            let _ = tx.send(()).await;
        }
        tracing::info!("slack adapter shut down");
        Ok(())
    }
}

/// Convert the JSON blocks of a menu or report form into slack-morphism blocks.
///
/// A block slack-morphism can't represent is dropped and logged with its
/// position; the message still goes out with the text fallback.
fn deserialize_blocks(values: &[serde_json::Value]) -> Vec<SlackBlock> {
    let mut blocks = Vec::with_capacity(values.len());
    for (index, value) in values.iter().enumerate() {
        match serde_json::from_value::<SlackBlock>(value.clone()) {
            Ok(block) => blocks.push(block),
            Err(error) => {
                let block_type = value.get("type").and_then(|kind| kind.as_str());
                tracing::warn!(%error, index, ?block_type, "dropping unsupported block kit block");
            }
        }
    }
    blocks
}

/// Break `text` into pieces no longer than `max_len` bytes for `chat.postMessage`.
///
/// Cuts land on the last newline, else the last space, before the limit;
/// a run with neither is cut at the nearest char boundary.
fn split_message(text: &str, max_len: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut rest = text;

    while rest.len() > max_len {
        let limit = (0..=max_len)
            .rev()
            .find(|&index| rest.is_char_boundary(index))
            .unwrap_or(0);
        let window = &rest[..limit];
        let cut = match window.rfind('\n').or_else(|| window.rfind(' ')) {
            Some(position) if position > 0 => position,
            _ => limit.max(rest.chars().next().map_or(1, char::len_utf8)),
        };

        chunks.push(rest[..cut].to_string());
        rest = rest[cut..].trim_start();
    }

    if !rest.is_empty() || chunks.is_empty() {
        chunks.push(rest.to_string());
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::messages;

    #[test]
    fn welcome_blocks_deserialise_into_slack_blocks() {
        let OutboundResponse::RichMessage { blocks, .. } = messages::welcome() else {
            panic!("expected a rich message");
        };
        assert_eq!(deserialize_blocks(&blocks).len(), blocks.len());
    }

    #[test]
    fn bad_blocks_are_skipped() {
        let blocks = vec![
            serde_json::json!({"type": "definitely_not_a_block"}),
            serde_json::json!({"type": "divider"}),
        ];
        assert_eq!(deserialize_blocks(&blocks).len(), 1);
    }

    #[test]
    fn split_message_prefers_line_breaks() {
        let text = "first line\nsecond line";
        assert_eq!(split_message(text, 15), vec!["first line", "second line"]);
        assert_eq!(split_message("short", 15), vec!["short"]);
    }

    #[test]
    fn split_message_falls_back_to_spaces_then_hard_cuts() {
        assert_eq!(split_message("aaaa bbbb", 6), vec!["aaaa", "bbbb"]);
        assert_eq!(split_message("abcdefgh", 3), vec!["abc", "def", "gh"]);
    }

    #[test]
    fn split_message_respects_char_boundaries() {
        let text = "ééééé";
        let chunks = split_message(text, 3);
        assert!(chunks.iter().all(|chunk| chunk.len() <= 3));
        assert_eq!(chunks.concat(), text);
    }
}
