//! Report lifecycle: request a report, collect the form, store the answers.

use super::form::SurveyAnswers;
use super::messages;
use crate::OutboundResponse;
use crate::db::QueryOutcome;
use crate::events::FormSubmission;
use crate::messaging::Messaging;
use crate::responses::{ReportState, Response, ResponseStore};

use std::sync::Arc;

/// Name of the private channel a report is collected in.
pub fn report_channel_name(user_id: &str, now: i64) -> String {
    format!("language-report-{now}-{}", user_id.to_lowercase())
}

pub struct ReportFlow<M> {
    messaging: Arc<M>,
    responses: ResponseStore,
}

impl<M: Messaging> ReportFlow<M> {
    pub fn new(messaging: Arc<M>, responses: ResponseStore) -> Self {
        Self {
            messaging,
            responses,
        }
    }

    /// Open a private report channel for `user_id` and post the form into it.
    ///
    /// `reply_channel_id` is where the request came from; confirmations and
    /// failures go there. Returns the new channel id once the pending row exists.
    pub async fn start_report(&self, user_id: &str, reply_channel_id: &str) -> Option<String> {
        let now = chrono::Utc::now().timestamp();
        let channel_name = report_channel_name(user_id, now);

        let channel_id = match self.messaging.create_private_channel(&channel_name).await {
            Ok(channel_id) => channel_id,
            Err(error) => {
                tracing::error!(%error, user_id, %channel_name, "failed to create report channel");
                self.reply(reply_channel_id, messages::channel_failed()).await;
                return None;
            }
        };

        if let Err(error) = self
            .messaging
            .invite_to_channel(&channel_id, &[user_id.to_string()])
            .await
        {
            tracing::error!(%error, user_id, %channel_id, "failed to invite reporter");
            self.reply(reply_channel_id, messages::channel_failed()).await;
            return None;
        }

        if !self
            .responses
            .create_pending(user_id, &channel_id, now)
            .await
            .is_success()
        {
            tracing::error!(user_id, %channel_id, "failed to record pending report");
            self.reply(reply_channel_id, messages::pending_failed()).await;
            return None;
        }

        self.reply(&channel_id, messages::report_form(user_id)).await;
        self.reply(
            reply_channel_id,
            messages::channel_created(&channel_id, &channel_name),
        )
        .await;

        tracing::info!(user_id, %channel_id, "report started");
        Some(channel_id)
    }

    /// Store the submitted form on the channel's row and confirm in the channel.
    pub async fn submit_report(&self, submission: &FormSubmission) -> QueryOutcome {
        let channel_id = submission.channel_id.as_str();
        let answers = SurveyAnswers::extract(&submission.state);

        if let Some(existing) = self.fetch(channel_id).await
            && existing.report_state == ReportState::Submitted
        {
            tracing::warn!(channel_id, "report already submitted, overwriting answers");
        }

        let outcome = self.responses.apply_answers(channel_id, &answers).await;
        let reply = match &outcome {
            QueryOutcome::Success(_) => {
                let stored = self.fetch(channel_id).await;
                tracing::info!(
                    channel_id,
                    user_id = %submission.user_id,
                    answered = answers.assignments().len(),
                    "report submitted"
                );
                messages::submission_saved(stored.as_ref(), chrono::Utc::now().timestamp())
            }
            QueryOutcome::NoRows => {
                tracing::warn!(channel_id, "submission for a channel with no report");
                messages::submission_without_report()
            }
            QueryOutcome::Failed(message) => {
                tracing::error!(channel_id, error = %message, "failed to store submission");
                messages::submission_failed()
            }
        };
        self.reply(channel_id, reply).await;

        outcome
    }

    /// Post the user's report counts into `reply_channel_id`.
    pub async fn show_account(&self, user_id: &str, reply_channel_id: &str) {
        let summary = self.responses.account_summary(user_id).await;
        self.reply(reply_channel_id, messages::account(summary.as_ref()))
            .await;
    }

    async fn fetch(&self, channel_id: &str) -> Option<Response> {
        self.responses
            .get_by_channel(channel_id)
            .await
            .into_record()
            .and_then(Response::from_record)
    }

    async fn reply(&self, channel_id: &str, response: OutboundResponse) {
        if let Err(error) = self.messaging.post_message(channel_id, response).await {
            tracing::warn!(%error, channel_id, "failed to post message");
        }
    }
}
