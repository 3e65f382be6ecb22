use super::state::ApiState;
use crate::db::QueryOutcome;

use axum::Json;
use axum::extract::{Path, State};
use serde_json::{Value, json};
use std::sync::Arc;

pub(super) async fn hello() -> Json<Value> {
    Json(json!({ "message": "Hello World!" }))
}

/// `GET /responses`: every row, joined with user fields.
pub(super) async fn list_responses(State(state): State<Arc<ApiState>>) -> Json<Value> {
    let outcome = state.responses.list_with_users().await;
    Json(rows_json(outcome))
}

/// `GET /responses/{id}`: one row, or `{}` when there is none.
pub(super) async fn get_response(
    State(state): State<Arc<ApiState>>,
    Path(response_id): Path<String>,
) -> Json<Value> {
    let Ok(response_id) = response_id.parse::<i64>() else {
        tracing::debug!(%response_id, "non-numeric response id requested");
        return Json(json!({}));
    };

    let record = state
        .responses
        .get_with_user(response_id)
        .await
        .into_record()
        .unwrap_or_default();
    Json(Value::Object(record))
}

/// `GET /responses/new`: rows submitted since the previous poll.
pub(super) async fn new_responses(State(state): State<Arc<ApiState>>) -> Json<Value> {
    let now = chrono::Utc::now().timestamp_millis();
    let outcome = state
        .cursor
        .poll(now, |cursor| state.responses.list_submitted_since(cursor))
        .await;
    Json(rows_json(outcome))
}

fn rows_json(outcome: QueryOutcome) -> Value {
    Value::Array(
        outcome
            .into_records()
            .into_iter()
            .map(Value::Object)
            .collect(),
    )
}
