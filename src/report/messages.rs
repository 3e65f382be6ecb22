//! Canned bot messages.

use super::form::{CHECK_ACCOUNT_ACTION, START_REPORT_ACTION, form_blocks, option_label};
use crate::OutboundResponse;
use crate::display::{NOT_PROVIDED, render_flag, render_text, render_timestamp};
use crate::responses::{AccountSummary, Response};

use serde_json::json;

const PLANT_EMOJI: &[&str] = &["🪴", "🌺", "🍀", "✨", "🌻"];

/// Main menu sent to new members and as the fallback reply.
pub fn welcome() -> OutboundResponse {
    OutboundResponse::RichMessage {
        text: "Welcome to Language Reports!".into(),
        blocks: vec![
            json!({
                "type": "section",
                "text": {
                    "type": "mrkdwn",
                    "text": "*Welcome to Language Reports!* :wave:\nHeard a language out in the wild? Tell us where and how, and we'll add it to the map.",
                },
            }),
            json!({
                "type": "actions",
                "block_id": "main_menu",
                "elements": [
                    {
                        "type": "button",
                        "action_id": START_REPORT_ACTION,
                        "style": "primary",
                        "text": {"type": "plain_text", "text": "Report a language"},
                        "value": "start",
                    },
                    {
                        "type": "button",
                        "action_id": CHECK_ACCOUNT_ACTION,
                        "text": {"type": "plain_text", "text": "My reports"},
                        "value": "account",
                    },
                ],
            }),
        ],
    }
}

/// First message in a new report channel, carrying the form.
pub fn report_form(user_id: &str) -> OutboundResponse {
    let mut blocks = vec![json!({
        "type": "section",
        "text": {
            "type": "mrkdwn",
            "text": format!(
                "Hi <@{user_id}>! This channel is just for this report. Fill in what you can and press *Submit report*. Anything you leave blank is fine."
            ),
        },
    })];
    blocks.extend(form_blocks());

    OutboundResponse::RichMessage {
        text: "Please fill in your language report.".into(),
        blocks,
    }
}

/// Posted where the report was requested, pointing at the new channel.
pub fn channel_created(channel_id: &str, channel_name: &str) -> OutboundResponse {
    OutboundResponse::Text(format!(
        "I made a private channel for your report: <#{channel_id}|{channel_name}>. Head over there to fill it in."
    ))
}

pub fn channel_failed() -> OutboundResponse {
    OutboundResponse::Text(
        "Sorry, I couldn't set up a channel for your report. Please press *Report a language* again."
            .into(),
    )
}

pub fn pending_failed() -> OutboundResponse {
    OutboundResponse::Text(
        "Sorry, I couldn't start your report just now. Please try again in a moment.".into(),
    )
}

/// Confirmation after a successful submission, echoing what was stored.
pub fn submission_saved(response: Option<&Response>, seed: i64) -> OutboundResponse {
    let emoji = PLANT_EMOJI[seed.rem_euclid(PLANT_EMOJI.len() as i64) as usize];
    let summary = response
        .map(response_summary)
        .unwrap_or_else(|| NOT_PROVIDED.to_string());

    OutboundResponse::RichMessage {
        text: "Thanks! Your report has been saved.".into(),
        blocks: vec![
            json!({
                "type": "section",
                "text": {"type": "mrkdwn", "text": format!("*Thanks! Your report has been saved.* {emoji}")},
            }),
            json!({
                "type": "section",
                "text": {"type": "mrkdwn", "text": summary},
            }),
        ],
    }
}

pub fn submission_without_report() -> OutboundResponse {
    OutboundResponse::Text(
        ":warning: I couldn't find an open report for this channel, so nothing was saved. Start a new one from the main menu."
            .into(),
    )
}

pub fn submission_failed() -> OutboundResponse {
    OutboundResponse::Text(
        ":warning: Something went wrong saving your report. Please press *Submit report* again."
            .into(),
    )
}

pub fn help() -> OutboundResponse {
    OutboundResponse::Text(
        [
            "Here's what I understand:",
            "• `report`: start a new language report",
            "• `account`: see your reports",
            "• `help` or `?`: this message",
            "Anything else brings up the main menu.",
        ]
        .join("\n"),
    )
}

pub fn files_unsupported() -> OutboundResponse {
    OutboundResponse::Text(
        "I can't read uploads yet. Please describe what you heard in a report instead.".into(),
    )
}

pub fn account(summary: Option<&AccountSummary>) -> OutboundResponse {
    let Some(summary) = summary else {
        return OutboundResponse::Text(
            "Sorry, I couldn't look up your reports right now. Please try again later.".into(),
        );
    };

    OutboundResponse::Text(format!(
        "*Your reports*\n• Submitted: {}\n• Waiting for answers: {}\n• Last report started: {}",
        summary.submitted,
        summary.pending,
        render_timestamp(summary.latest_submission_time),
    ))
}

fn response_summary(response: &Response) -> String {
    let choice = |value: Option<&str>, other: Option<&str>| match value {
        Some("other") => format!("Other: {}", render_text(other)),
        Some(value) => option_label(value).to_string(),
        None => render_text(None),
    };

    [
        format!(
            "*General area:* {}",
            choice(
                response.general_area.as_deref(),
                response.general_area_other.as_deref()
            )
        ),
        format!(
            "*Exact location:* {}",
            render_text(response.exact_location.as_deref())
        ),
        format!(
            "*Language:* {}",
            choice(response.language.as_deref(), response.language_other.as_deref())
        ),
        format!("*Heard at:* {}", render_timestamp(response.heard_at)),
        format!(
            "*Heard it spoken:* {}",
            render_flag(response.method_heard_spoken)
        ),
        format!(
            "*Asked the speaker:* {}",
            render_flag(response.method_asked_speaker)
        ),
        format!(
            "*Saw it written:* {}",
            render_flag(response.method_saw_written)
        ),
        format!(
            "*Other method:* {}",
            match response.method_other {
                Some(true) => render_text(response.method_other_details.as_deref()),
                other => render_flag(other),
            }
        ),
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::responses::ReportState;

    fn blank_response() -> Response {
        Response {
            response_id: 1,
            user_id: "U1".into(),
            channel_id: "C1".into(),
            submission_time: Some(1_700_000_000),
            report_state: ReportState::Submitted,
            general_area: None,
            general_area_other: None,
            exact_location: None,
            language: None,
            language_other: None,
            heard_at: None,
            method_heard_spoken: None,
            method_asked_speaker: None,
            method_saw_written: None,
            method_other: None,
            method_other_details: None,
        }
    }

    #[test]
    fn summary_marks_missing_fields() {
        let summary = response_summary(&blank_response());
        assert!(summary.contains("*Exact location:* [Not Provided]"));
        assert!(summary.contains("*Heard at:* [Not Provided]"));
        assert!(summary.contains("*Other method:* [Not Provided]"));
    }

    #[test]
    fn summary_spells_out_other_choices() {
        let response = Response {
            general_area: Some("transit".into()),
            language: Some("other".into()),
            language_other: Some("Tagalog".into()),
            method_other: Some(true),
            method_other_details: Some("saw a menu".into()),
            ..blank_response()
        };
        let summary = response_summary(&response);
        assert!(summary.contains("*General area:* Public transit"));
        assert!(summary.contains("*Language:* Other: Tagalog"));
        assert!(summary.contains("*Other method:* saw a menu"));
    }

    #[test]
    fn welcome_offers_start_and_account_buttons() {
        let OutboundResponse::RichMessage { blocks, .. } = welcome() else {
            panic!("welcome should be a rich message");
        };
        let actions = &blocks[1]["elements"];
        assert_eq!(actions[0]["action_id"], START_REPORT_ACTION);
        assert_eq!(actions[1]["action_id"], CHECK_ACCOUNT_ACTION);
    }
}
