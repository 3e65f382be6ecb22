//! Typed inbound events and the decoding step that builds them.
//!
//! The Slack adapter serialises each slack-morphism payload back to its wire
//! JSON and hands it to the `decode_*` functions here. Every wire record is
//! `#[serde(default)]`, so a missing key becomes an empty value instead of an
//! error and handlers never have to dig through nested maps themselves.

use crate::DirectoryUser;
use crate::report::form::SUBMIT_REPORT_ACTION;

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::HashMap;

/// An inbound platform event the bot reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum BotEvent {
    Message(MessageEvent),
    Action(ActionEvent),
    FormSubmitted(FormSubmission),
    TeamJoin(TeamJoinEvent),
}

/// A channel or DM message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageEvent {
    pub channel_id: String,
    pub user_id: Option<String>,
    pub text: String,
    /// Set for edits, deletes, joins and other non-plain messages.
    pub subtype: Option<String>,
    pub bot_id: Option<String>,
    pub file_count: usize,
}

/// A button click or other interactive component action.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionEvent {
    pub action_id: String,
    pub user_id: String,
    pub channel_id: String,
}

/// The report form's submit button was clicked.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormSubmission {
    pub user_id: String,
    pub channel_id: String,
    pub state: FormState,
}

/// A new member joined the workspace.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TeamJoinEvent {
    pub user_id: String,
}

/// Input values of a message's blocks, keyed by block id then action id.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FormState {
    pub values: HashMap<String, HashMap<String, FieldValue>>,
}

impl FormState {
    pub fn field(&self, block_id: &str, action_id: &str) -> Option<&FieldValue> {
        self.values.get(block_id)?.get(action_id)
    }
}

/// One input element's state. Which fields are set depends on the element type.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FieldValue {
    pub value: Option<String>,
    pub selected_option: Option<SelectedOption>,
    pub selected_options: Option<Vec<SelectedOption>>,
    #[serde(deserialize_with = "lenient_i64")]
    pub selected_date_time: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SelectedOption {
    pub value: String,
}

// -- Wire records --

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireMessage {
    channel: Option<String>,
    user: Option<String>,
    text: Option<String>,
    subtype: Option<String>,
    bot_id: Option<String>,
    files: Option<Vec<Value>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireId {
    id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireContainer {
    channel_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireAction {
    action_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireBlockActions {
    user: Option<WireId>,
    channel: Option<WireId>,
    container: Option<WireContainer>,
    actions: Option<Vec<WireAction>>,
    state: Option<FormState>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireProfile {
    email: Option<String>,
    real_name: Option<String>,
    display_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireUser {
    id: String,
    name: Option<String>,
    real_name: Option<String>,
    deleted: bool,
    is_bot: bool,
    profile: Option<WireProfile>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireTeamJoin {
    user: WireUser,
}

/// Decode a `message` event body.
pub fn decode_message(payload: &Value) -> Option<MessageEvent> {
    let wire = WireMessage::deserialize(payload).ok()?;
    Some(MessageEvent {
        channel_id: wire.channel.unwrap_or_default(),
        user_id: wire.user.filter(|user| !user.is_empty()),
        text: wire.text.unwrap_or_default(),
        subtype: wire.subtype,
        bot_id: wire.bot_id,
        file_count: wire.files.map_or(0, |files| files.len()),
    })
}

/// Decode a `team_join` event body.
pub fn decode_team_join(payload: &Value) -> Option<TeamJoinEvent> {
    let wire = WireTeamJoin::deserialize(payload).ok()?;
    if wire.user.id.is_empty() {
        return None;
    }
    Some(TeamJoinEvent {
        user_id: wire.user.id,
    })
}

/// Decode a `block_actions` interaction into one event per action.
///
/// A click on the report form's submit button becomes
/// [`BotEvent::FormSubmitted`] carrying the message's input state.
pub fn decode_block_actions(payload: &Value) -> Vec<BotEvent> {
    let wire = match WireBlockActions::deserialize(payload) {
        Ok(wire) => wire,
        Err(error) => {
            tracing::warn!(%error, "undecodable block_actions payload");
            return Vec::new();
        }
    };

    let user_id = wire.user.map(|user| user.id).unwrap_or_default();
    let channel_id = wire
        .channel
        .map(|channel| channel.id)
        .filter(|id| !id.is_empty())
        .or(wire.container.and_then(|container| container.channel_id))
        .unwrap_or_default();
    let state = wire.state.unwrap_or_default();

    wire.actions
        .into_iter()
        .flatten()
        .map(|action| {
            if action.action_id == SUBMIT_REPORT_ACTION {
                BotEvent::FormSubmitted(FormSubmission {
                    user_id: user_id.clone(),
                    channel_id: channel_id.clone(),
                    state: state.clone(),
                })
            } else {
                BotEvent::Action(ActionEvent {
                    action_id: action.action_id,
                    user_id: user_id.clone(),
                    channel_id: channel_id.clone(),
                })
            }
        })
        .collect()
}

/// Decode a `users.list` member.
pub fn decode_directory_user(payload: &Value) -> Option<DirectoryUser> {
    let mut wire = WireUser::deserialize(payload).ok()?;
    if wire.id.is_empty() {
        return None;
    }
    let non_empty = |value: Option<String>| value.filter(|text| !text.trim().is_empty());
    let profile = wire.profile.take().unwrap_or_default();
    Some(DirectoryUser {
        id: wire.id,
        username: non_empty(wire.name),
        real_name: non_empty(wire.real_name)
            .or_else(|| non_empty(profile.real_name))
            .or_else(|| non_empty(profile.display_name)),
        email: non_empty(profile.email),
        deleted: wire.deleted,
        is_bot: wire.is_bot,
    })
}

/// Accept Unix seconds as a number or a numeric string.
fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(number)) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|float| float as i64)),
        Some(Value::String(text)) => text.trim().parse::<f64>().ok().map(|float| float as i64),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn message_defaults_missing_keys() {
        let event = decode_message(&json!({
            "channel": "D123",
            "user": "U1",
            "text": "help",
            "ts": "1700000000.000100"
        }))
        .expect("message should decode");

        assert_eq!(event.channel_id, "D123");
        assert_eq!(event.user_id.as_deref(), Some("U1"));
        assert_eq!(event.text, "help");
        assert_eq!(event.subtype, None);
        assert_eq!(event.file_count, 0);

        let bare = decode_message(&json!({})).expect("empty message still decodes");
        assert_eq!(bare, MessageEvent::default());
    }

    #[test]
    fn message_counts_attached_files() {
        let event = decode_message(&json!({
            "channel": "C1",
            "user": "U1",
            "files": [{"id": "F1", "mimetype": "image/png"}]
        }))
        .expect("message should decode");
        assert_eq!(event.file_count, 1);
    }

    #[test]
    fn submit_click_becomes_form_submission() {
        let events = decode_block_actions(&json!({
            "type": "block_actions",
            "user": {"id": "U1", "username": "amy"},
            "channel": {"id": "C9"},
            "container": {"type": "message", "channel_id": "C9", "message_ts": "1.2"},
            "trigger_id": "t-1",
            "actions": [{"action_id": SUBMIT_REPORT_ACTION, "block_id": "submit", "type": "button"}],
            "state": {"values": {
                "exact_location": {"exact_location_input": {"type": "plain_text_input", "value": "Corner of 5th"}},
                "heard_at": {"heard_at_input": {"type": "datetimepicker", "selected_date_time": 1741722179}}
            }}
        }));

        assert_eq!(events.len(), 1);
        let BotEvent::FormSubmitted(submission) = &events[0] else {
            panic!("expected form submission, got {:?}", events[0]);
        };
        assert_eq!(submission.user_id, "U1");
        assert_eq!(submission.channel_id, "C9");
        assert_eq!(
            submission
                .state
                .field("exact_location", "exact_location_input")
                .and_then(|field| field.value.as_deref()),
            Some("Corner of 5th")
        );
        assert_eq!(
            submission
                .state
                .field("heard_at", "heard_at_input")
                .and_then(|field| field.selected_date_time),
            Some(1_741_722_179)
        );
    }

    #[test]
    fn other_clicks_become_actions_and_fall_back_to_container_channel() {
        let events = decode_block_actions(&json!({
            "user": {"id": "U2"},
            "container": {"channel_id": "D7"},
            "actions": [{"action_id": "start_report", "value": "go"}]
        }));

        assert_eq!(
            events,
            vec![BotEvent::Action(ActionEvent {
                action_id: "start_report".into(),
                user_id: "U2".into(),
                channel_id: "D7".into(),
            })]
        );
    }

    #[test]
    fn date_time_accepts_strings() {
        let field: FieldValue =
            serde_json::from_value(json!({"selected_date_time": "1741722179"})).expect("decodes");
        assert_eq!(field.selected_date_time, Some(1_741_722_179));
    }

    #[test]
    fn team_join_requires_a_user_id() {
        let event = decode_team_join(&json!({"user": {"id": "U5", "name": "new"}}));
        assert_eq!(event, Some(TeamJoinEvent { user_id: "U5".into() }));
        assert_eq!(decode_team_join(&json!({"user": {}})), None);
    }

    #[test]
    fn directory_user_reads_profile_fields() {
        let user = decode_directory_user(&json!({
            "id": "U1",
            "name": "amy",
            "deleted": false,
            "is_bot": false,
            "profile": {"email": "amy@example.com", "real_name": "Amy F", "display_name": ""}
        }))
        .expect("user should decode");

        assert_eq!(user.username.as_deref(), Some("amy"));
        assert_eq!(user.real_name.as_deref(), Some("Amy F"));
        assert_eq!(user.email.as_deref(), Some("amy@example.com"));
        assert!(!user.deleted);
    }
}
