//! Messaging trait: the bot's only view of the chat platform.

use crate::error::Result;
use crate::events::BotEvent;
use crate::{DirectoryUser, OutboundResponse};

use futures::Stream;
use std::pin::Pin;

/// Event stream type.
pub type InboundStream = Pin<Box<dyn Stream<Item = BotEvent> + Send>>;

/// Static trait for messaging adapters.
pub trait Messaging: Send + Sync + 'static {
    /// Unique name for this adapter.
    fn name(&self) -> &str;

    /// Start the adapter and return the inbound event stream.
    fn start(&self) -> impl std::future::Future<Output = Result<InboundStream>> + Send;

    /// The bot's own user id.
    fn bot_user_id(&self) -> impl std::future::Future<Output = Result<String>> + Send;

    /// Post a message into a channel.
    fn post_message(
        &self,
        channel_id: &str,
        response: OutboundResponse,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Open (or reuse) a DM with a user and post into it.
    fn send_direct_message(
        &self,
        user_id: &str,
        response: OutboundResponse,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Create a private channel and return its id.
    fn create_private_channel(
        &self,
        name: &str,
    ) -> impl std::future::Future<Output = Result<String>> + Send;

    fn invite_to_channel(
        &self,
        channel_id: &str,
        user_ids: &[String],
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Every member of the workspace directory, deleted ones included.
    fn list_users(&self) -> impl std::future::Future<Output = Result<Vec<DirectoryUser>>> + Send;

    /// Health check.
    fn health_check(&self) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Graceful shutdown.
    fn shutdown(&self) -> impl std::future::Future<Output = Result<()>> + Send {
        async { Ok(()) }
    }
}
