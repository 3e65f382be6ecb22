//! In-memory adapter that records every outbound call.

use super::traits::{InboundStream, Messaging};
use crate::error::Result;
use crate::{DirectoryUser, OutboundResponse};

use std::sync::Mutex;

pub(crate) const FAKE_BOT_ID: &str = "UBOT";

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Post { channel_id: String, response: OutboundResponse },
    Direct { user_id: String, response: OutboundResponse },
    CreateChannel { name: String },
    Invite { channel_id: String, user_ids: Vec<String> },
}

#[derive(Debug, Default)]
pub(crate) struct FakeMessaging {
    pub users: Vec<DirectoryUser>,
    pub fail_channel_creation: bool,
    pub fail_invite: bool,
    pub fail_direct_to: Vec<String>,
    pub calls: Mutex<Vec<Call>>,
    pub channels_created: Mutex<u32>,
}

impl FakeMessaging {
    pub fn with_users(users: Vec<DirectoryUser>) -> Self {
        Self {
            users,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn posts_to(&self, channel_id: &str) -> Vec<OutboundResponse> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Post {
                    channel_id: target,
                    response,
                } if target == channel_id => Some(response),
                _ => None,
            })
            .collect()
    }

    pub fn direct_recipients(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Direct { user_id, .. } => Some(user_id),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().expect("calls lock").push(call);
    }
}

impl Messaging for FakeMessaging {
    fn name(&self) -> &str {
        "fake"
    }

    async fn start(&self) -> Result<InboundStream> {
        Ok(Box::pin(futures::stream::empty()))
    }

    async fn bot_user_id(&self) -> Result<String> {
        Ok(FAKE_BOT_ID.to_string())
    }

    async fn post_message(&self, channel_id: &str, response: OutboundResponse) -> Result<()> {
        self.record(Call::Post {
            channel_id: channel_id.to_string(),
            response,
        });
        Ok(())
    }

    async fn send_direct_message(&self, user_id: &str, response: OutboundResponse) -> Result<()> {
        if self.fail_direct_to.iter().any(|id| id == user_id) {
            return Err(anyhow::anyhow!("cannot open a DM with {user_id}").into());
        }
        self.record(Call::Direct {
            user_id: user_id.to_string(),
            response,
        });
        Ok(())
    }

    async fn create_private_channel(&self, name: &str) -> Result<String> {
        self.record(Call::CreateChannel {
            name: name.to_string(),
        });
        if self.fail_channel_creation {
            return Err(anyhow::anyhow!("name_taken").into());
        }
        let mut count = self.channels_created.lock().expect("channel counter lock");
        *count += 1;
        Ok(format!("CNEW{count}"))
    }

    async fn invite_to_channel(&self, channel_id: &str, user_ids: &[String]) -> Result<()> {
        self.record(Call::Invite {
            channel_id: channel_id.to_string(),
            user_ids: user_ids.to_vec(),
        });
        if self.fail_invite {
            return Err(anyhow::anyhow!("cant_invite").into());
        }
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<DirectoryUser>> {
        Ok(self.users.clone())
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}
