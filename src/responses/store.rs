//! Response CRUD storage (SQLite).

use crate::db::{Db, QueryMode, QueryOutcome, Record, SqlParam};
use crate::report::form::SurveyAnswers;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Lifecycle of a response row.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReportState {
    #[default]
    Pending,
    Submitted,
}

impl ReportState {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportState::Pending => "pending",
            ReportState::Submitted => "submitted",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(ReportState::Pending),
            "submitted" => Some(ReportState::Submitted),
            _ => None,
        }
    }
}

impl std::fmt::Display for ReportState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One survey submission, tied to the private channel it was collected in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub response_id: i64,
    pub user_id: String,
    pub channel_id: String,
    pub submission_time: Option<i64>,
    #[serde(default)]
    pub report_state: ReportState,
    pub general_area: Option<String>,
    pub general_area_other: Option<String>,
    pub exact_location: Option<String>,
    pub language: Option<String>,
    pub language_other: Option<String>,
    pub heard_at: Option<i64>,
    #[serde(default, deserialize_with = "int_flag")]
    pub method_heard_spoken: Option<bool>,
    #[serde(default, deserialize_with = "int_flag")]
    pub method_asked_speaker: Option<bool>,
    #[serde(default, deserialize_with = "int_flag")]
    pub method_saw_written: Option<bool>,
    #[serde(default, deserialize_with = "int_flag")]
    pub method_other: Option<bool>,
    pub method_other_details: Option<String>,
}

impl Response {
    /// Build a typed response from a `responses` row.
    pub fn from_record(record: Record) -> Option<Self> {
        match serde_json::from_value(Value::Object(record)) {
            Ok(response) => Some(response),
            Err(error) => {
                tracing::warn!(%error, "unreadable response row");
                None
            }
        }
    }

    /// True while no survey field has been written.
    pub fn has_no_answers(&self) -> bool {
        self.general_area.is_none()
            && self.general_area_other.is_none()
            && self.exact_location.is_none()
            && self.language.is_none()
            && self.language_other.is_none()
            && self.heard_at.is_none()
            && self.method_heard_spoken.is_none()
            && self.method_asked_speaker.is_none()
            && self.method_saw_written.is_none()
            && self.method_other.is_none()
            && self.method_other_details.is_none()
    }
}

/// Per-user report counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AccountSummary {
    #[serde(default, deserialize_with = "zero_if_null")]
    pub submitted: i64,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub pending: i64,
    #[serde(default)]
    pub latest_submission_time: Option<i64>,
}

const JOINED_SELECT: &str = "SELECT r.*, u.username, u.email, u.status \
     FROM responses r \
     LEFT JOIN users u ON r.user_id = u.id";

#[derive(Debug, Clone)]
pub struct ResponseStore {
    db: Db,
}

impl ResponseStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Insert a pending row: only user, channel and time are set.
    pub async fn create_pending(
        &self,
        user_id: &str,
        channel_id: &str,
        submission_time: i64,
    ) -> QueryOutcome {
        self.db
            .run(
                "INSERT INTO responses (user_id, channel_id, submission_time, report_state) \
                 VALUES (?, ?, ?, 'pending')",
                &[
                    user_id.into(),
                    channel_id.into(),
                    SqlParam::Int(submission_time),
                ],
                QueryMode::Mutate,
            )
            .await
    }

    /// Write the present answers to the row for `channel_id` and mark it submitted.
    ///
    /// Columns whose answer is absent are left out of the `SET` list, so they
    /// keep whatever value they had.
    pub async fn apply_answers(&self, channel_id: &str, answers: &SurveyAnswers) -> QueryOutcome {
        let assignments = answers.assignments();

        let mut query = String::from("UPDATE responses SET ");
        for (column, _) in &assignments {
            query.push_str(column);
            query.push_str(" = ?, ");
        }
        query.push_str("report_state = ? WHERE channel_id = ?");

        let mut params: Vec<SqlParam> = assignments.into_iter().map(|(_, value)| value).collect();
        params.push(ReportState::Submitted.as_str().into());
        params.push(channel_id.into());

        self.db.run(&query, &params, QueryMode::Mutate).await
    }

    pub async fn get_by_channel(&self, channel_id: &str) -> QueryOutcome {
        self.db
            .run(
                "SELECT * FROM responses WHERE channel_id = ?",
                &[channel_id.into()],
                QueryMode::FetchOne,
            )
            .await
    }

    /// Every response joined with its user's directory fields.
    pub async fn list_with_users(&self) -> QueryOutcome {
        self.db
            .run(
                &format!("{JOINED_SELECT} ORDER BY r.response_id"),
                &[],
                QueryMode::FetchAll,
            )
            .await
    }

    pub async fn get_with_user(&self, response_id: i64) -> QueryOutcome {
        self.db
            .run(
                &format!("{JOINED_SELECT} WHERE r.response_id = ?"),
                &[SqlParam::Int(response_id)],
                QueryMode::FetchOne,
            )
            .await
    }

    /// Responses with a submission time, newer than `cursor_millis` when one is given.
    ///
    /// Submission times are whole seconds; the cursor is in milliseconds.
    pub async fn list_submitted_since(&self, cursor_millis: Option<i64>) -> QueryOutcome {
        let mut query = format!("{JOINED_SELECT} WHERE r.submission_time IS NOT NULL");
        let mut params = Vec::new();
        if let Some(cursor_millis) = cursor_millis {
            query.push_str(" AND r.submission_time * 1000 > ?");
            params.push(SqlParam::Int(cursor_millis));
        }
        query.push_str(" ORDER BY r.submission_time, r.response_id");

        self.db.run(&query, &params, QueryMode::FetchAll).await
    }

    /// Report counts for one user. `None` when the lookup failed.
    pub async fn account_summary(&self, user_id: &str) -> Option<AccountSummary> {
        let outcome = self
            .db
            .run(
                "SELECT \
                   SUM(CASE WHEN report_state = 'submitted' THEN 1 ELSE 0 END) AS submitted, \
                   SUM(CASE WHEN report_state = 'pending' THEN 1 ELSE 0 END) AS pending, \
                   MAX(submission_time) AS latest_submission_time \
                 FROM responses WHERE user_id = ?",
                &[user_id.into()],
                QueryMode::FetchOne,
            )
            .await;

        match outcome {
            QueryOutcome::Failed(_) => None,
            QueryOutcome::NoRows => Some(AccountSummary::default()),
            other => {
                let record = other.into_record().unwrap_or_default();
                serde_json::from_value(Value::Object(record))
                    .map_err(|error| tracing::warn!(%error, "unreadable account summary row"))
                    .ok()
            }
        }
    }
}

/// SQLite stores booleans as 0/1.
fn int_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Bool(flag)) => Some(flag),
        Some(Value::Number(number)) => Some(number.as_i64().unwrap_or(0) != 0),
        _ => None,
    })
}

fn zero_if_null<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<i64>::deserialize(deserializer)?.unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{QueryOutput, test_db};
    use crate::report::form::DeterminationMethods;

    async fn setup_store() -> ResponseStore {
        ResponseStore::new(test_db().await)
    }

    async fn fetch(store: &ResponseStore, channel_id: &str) -> Response {
        store
            .get_by_channel(channel_id)
            .await
            .into_record()
            .and_then(Response::from_record)
            .expect("response should exist")
    }

    #[tokio::test]
    async fn pending_row_has_channel_and_no_answers() {
        let store = setup_store().await;

        let outcome = store.create_pending("U1", "C1", 1_700_000_000).await;
        assert_eq!(outcome, QueryOutcome::Success(QueryOutput::Affected(1)));

        let response = fetch(&store, "C1").await;
        assert_eq!(response.user_id, "U1");
        assert_eq!(response.submission_time, Some(1_700_000_000));
        assert_eq!(response.report_state, ReportState::Pending);
        assert!(response.has_no_answers());
    }

    #[tokio::test]
    async fn second_pending_row_for_a_channel_is_rejected() {
        let store = setup_store().await;
        store.create_pending("U1", "C1", 1).await;

        let duplicate = store.create_pending("U2", "C1", 2).await;
        assert!(duplicate.is_failed(), "expected unique violation, got {duplicate:?}");
    }

    #[tokio::test]
    async fn apply_answers_keeps_absent_fields() {
        let store = setup_store().await;
        store.create_pending("U1", "C1", 1_700_000_000).await;

        let first = SurveyAnswers {
            general_area: Some("campus".into()),
            exact_location: Some("Library steps".into()),
            methods: Some(DeterminationMethods {
                heard_spoken: true,
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(store.apply_answers("C1", &first).await.is_success());

        let second = SurveyAnswers {
            language: Some("korean".into()),
            ..Default::default()
        };
        assert!(store.apply_answers("C1", &second).await.is_success());

        let response = fetch(&store, "C1").await;
        assert_eq!(response.report_state, ReportState::Submitted);
        assert_eq!(response.general_area.as_deref(), Some("campus"));
        assert_eq!(response.exact_location.as_deref(), Some("Library steps"));
        assert_eq!(response.language.as_deref(), Some("korean"));
        assert_eq!(response.method_heard_spoken, Some(true));
        assert_eq!(response.method_saw_written, Some(false));
        assert_eq!(response.heard_at, None);
    }

    #[tokio::test]
    async fn apply_answers_without_a_row_reports_no_rows() {
        let store = setup_store().await;
        let outcome = store
            .apply_answers(
                "C404",
                &SurveyAnswers {
                    language: Some("french".into()),
                    ..Default::default()
                },
            )
            .await;
        assert_eq!(outcome, QueryOutcome::NoRows);
    }

    #[tokio::test]
    async fn joined_queries_include_user_fields() {
        let store = setup_store().await;
        sqlx::query("INSERT INTO users (id, username, email, status) VALUES ('U1', 'amy', 'amy@example.com', 'active')")
            .execute(store.db.pool())
            .await
            .expect("user insert");
        store.create_pending("U1", "C1", 100).await;
        store.create_pending("U2", "C2", 200).await;

        let rows = store.list_with_users().await.into_records();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["username"], Value::from("amy"));
        assert_eq!(rows[1]["username"], Value::Null);

        let newer = store.list_submitted_since(Some(100_000)).await.into_records();
        assert_eq!(newer.len(), 1);
        assert_eq!(newer[0]["channel_id"], Value::from("C2"));

        let id = rows[0]["response_id"].as_i64().expect("id");
        let one = store.get_with_user(id).await.into_record().expect("row");
        assert_eq!(one["email"], Value::from("amy@example.com"));
        assert_eq!(store.get_with_user(9_999).await, QueryOutcome::NoRows);
    }

    #[tokio::test]
    async fn account_summary_counts_by_state() {
        let store = setup_store().await;
        let empty = store.account_summary("U1").await.expect("lookup works");
        assert_eq!(empty, AccountSummary::default());

        store.create_pending("U1", "C1", 100).await;
        store.create_pending("U1", "C2", 300).await;
        store
            .apply_answers(
                "C1",
                &SurveyAnswers {
                    language: Some("arabic".into()),
                    ..Default::default()
                },
            )
            .await;

        let summary = store.account_summary("U1").await.expect("lookup works");
        assert_eq!(summary.submitted, 1);
        assert_eq!(summary.pending, 1);
        assert_eq!(summary.latest_submission_time, Some(300));
    }
}
